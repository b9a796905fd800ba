//! Capacity/energy scoring shared by every "% capacity used" display.

pub mod capacity;

pub use capacity::{
    completed_capacity, display_percent, snapshot, task_energy_weight, time_depletion,
    total_capacity_used, total_capacity_used_now, CapacitySnapshot,
};
