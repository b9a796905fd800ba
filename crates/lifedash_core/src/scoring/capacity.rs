//! Pure capacity scoring functions.
//!
//! # Invariants
//! - Accumulation uses unrounded `f64`; only `display_percent` rounds.
//! - Every returned percentage is within `[0, 100]`.
//! - Time-of-day depletion counts toward "used", never toward "completed".

use crate::clock::Clock;
use crate::model::capacity_task::{clamp_percent, CapacitySource, CapacityTask};
use serde::Serialize;

/// Minutes of duration per capacity point for undecorated tasks.
const MINUTES_PER_POINT: f64 = 3.0;
/// Ceiling for any single duration-derived weight.
const MAX_DURATION_WEIGHT: f64 = 25.0;

/// Capacity points one task costs.
pub fn task_energy_weight(task: &CapacityTask) -> f64 {
    match &task.source {
        CapacitySource::Calculator {
            calculated_capacity,
        } => clamp_percent(*calculated_capacity),
        CapacitySource::QuickAdd {
            adjusted_capacity, ..
        } => clamp_percent(*adjusted_capacity),
        CapacitySource::Project { .. }
        | CapacitySource::BrainSpace { .. }
        | CapacitySource::Manual => {
            (f64::from(task.duration) / MINUTES_PER_POINT).min(MAX_DURATION_WEIGHT)
        }
    }
}

/// Energy already spent by the time of day, in capacity points.
///
/// Fixed curve over the local hour: flat morning, then steeper
/// declines through the afternoon and evening, flat 40 overnight.
pub fn time_depletion(hour: u32) -> u32 {
    match hour % 24 {
        6..=10 => 0,
        hour @ 11..=13 => hour - 11,
        hour @ 14..=16 => 2 + (hour - 14) * 3,
        hour @ 17..=19 => 8 + (hour - 17) * 6,
        hour @ 20..=22 => 20 + (hour - 20) * 8,
        hour => 40 + hour.saturating_sub(23) * 10,
    }
}

/// Task weights plus time depletion at `hour`, capped at 100.
pub fn total_capacity_used(tasks: &[CapacityTask], hour: u32) -> f64 {
    let spent: f64 = tasks.iter().map(task_energy_weight).sum();
    clamp_percent(spent + f64::from(time_depletion(hour)))
}

/// `total_capacity_used` at the clock's current local hour.
pub fn total_capacity_used_now(tasks: &[CapacityTask], clock: &dyn Clock) -> f64 {
    total_capacity_used(tasks, clock.local_hour())
}

/// Weights of completed tasks only, capped at 100.
pub fn completed_capacity(tasks: &[CapacityTask]) -> f64 {
    let done: f64 = tasks
        .iter()
        .filter(|task| task.completed)
        .map(task_energy_weight)
        .sum();
    clamp_percent(done)
}

/// Rounded whole percentage for display.
pub fn display_percent(value: f64) -> u32 {
    clamp_percent(value).round() as u32
}

/// Display-ready capacity summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    pub used: u32,
    pub completed: u32,
    pub depletion: u32,
    pub remaining: u32,
}

pub fn snapshot(tasks: &[CapacityTask], hour: u32) -> CapacitySnapshot {
    let used = total_capacity_used(tasks, hour);
    CapacitySnapshot {
        used: display_percent(used),
        completed: display_percent(completed_capacity(tasks)),
        depletion: time_depletion(hour),
        remaining: display_percent(100.0 - used),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        completed_capacity, display_percent, snapshot, task_energy_weight, time_depletion,
        total_capacity_used,
    };
    use crate::model::capacity_task::{CapacitySource, CapacityTask};

    #[test]
    fn depletion_curve_matches_fixed_table() {
        let table: Vec<u32> = (0..24).map(time_depletion).collect();
        assert_eq!(
            table,
            vec![
                40, 40, 40, 40, 40, 40, // 0-5
                0, 0, 0, 0, 0, // 6-10
                0, 1, 2, // 11-13
                2, 5, 8, // 14-16
                8, 14, 20, // 17-19
                20, 28, 36, // 20-22
                40, // 23
            ]
        );
    }

    #[test]
    fn depletion_boundaries() {
        assert_eq!(time_depletion(13), 2);
        assert_eq!(time_depletion(19), 20);
        assert_eq!(time_depletion(23), 40);
        assert_eq!(time_depletion(2), 40);
    }

    #[test]
    fn weight_prefers_explicit_capacities() {
        assert_eq!(
            task_energy_weight(&CapacityTask::calculated("a", 600, 42.0, 0)),
            42.0
        );
        assert_eq!(
            task_energy_weight(&CapacityTask::quick_add("b", 600, 7.5, 1.5, 0)),
            7.5
        );
    }

    #[test]
    fn weight_falls_back_to_capped_duration() {
        assert_eq!(task_energy_weight(&CapacityTask::manual("a", 30, 0)), 10.0);
        assert_eq!(task_energy_weight(&CapacityTask::manual("b", 600, 0)), 25.0);

        let project = CapacityTask::with_source(
            "c",
            120,
            0,
            CapacitySource::Project {
                project_id: 1,
                project_name: "P".to_string(),
                calculated_capacity: 40.0,
            },
        );
        assert_eq!(task_energy_weight(&project), 25.0);
    }

    #[test]
    fn total_is_clamped_to_one_hundred() {
        let tasks: Vec<CapacityTask> = (0..5)
            .map(|i| CapacityTask::manual(format!("t{i}"), 90, 0))
            .collect();
        assert_eq!(total_capacity_used(&tasks, 9), 100.0);
        assert_eq!(total_capacity_used(&tasks, 22), 100.0);
    }

    #[test]
    fn completed_ignores_depletion_and_open_tasks() {
        let mut done = CapacityTask::manual("done", 30, 0);
        done.completed = true;
        let open = CapacityTask::manual("open", 30, 0);
        let tasks = vec![done, open];
        assert_eq!(completed_capacity(&tasks), 10.0);
        assert_eq!(total_capacity_used(&tasks, 19), 40.0);
    }

    #[test]
    fn display_rounds_and_clamps() {
        assert_eq!(display_percent(33.5), 34);
        assert_eq!(display_percent(-4.0), 0);
        assert_eq!(display_percent(180.0), 100);
    }

    #[test]
    fn snapshot_reports_remaining_headroom() {
        let tasks = vec![CapacityTask::manual("a", 45, 0)];
        let summary = snapshot(&tasks, 17);
        assert_eq!(summary.used, 23);
        assert_eq!(summary.depletion, 8);
        assert_eq!(summary.remaining, 77);
        assert_eq!(summary.completed, 0);
    }
}
