//! Command-line front end for the dashboard core.
//!
//! Every command prints one JSON document on stdout so the output can be
//! piped into other tools.

use clap::{Args, Parser, Subcommand};
use lifedash_core::{
    default_log_level, BrainDumpId, BrainDumpPriority, Dashboard, DashboardConfig, LogLevel,
    NewProject, ProjectPriority, TaskComponent, TaskFilters, TaskId, TaskSource, TaskStatus,
};
use log::error;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "lifedash", version, about = "Personal dashboard task core")]
struct Cli {
    /// SQLite store file (default: in-memory session).
    #[arg(long, global = true, env = "LIFEDASH_DB_PATH", value_name = "PATH")]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "LIFEDASH_LOG_LEVEL", default_value_t = default_log_level())]
    log_level: LogLevel,

    /// Absolute directory for rolling log files.
    #[arg(long, global = true, env = "LIFEDASH_LOG_DIR", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture comma/newline separated thoughts.
    Dump { text: String },
    /// Move a brain-dump item to high, low or unsorted.
    Triage { id: BrainDumpId, priority: String },
    /// Complete a unified task and everything derived from it.
    Done { id: TaskId },
    /// Commit project work to today's plan.
    Pull {
        project_id: i64,
        description: String,
        hours: f64,
    },
    /// Project table commands.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// List unified tasks for a widget.
    Tasks(TasksArgs),
    /// Show capacity used, completed and remaining.
    Status {
        /// Score as if it were this local hour.
        #[arg(long)]
        hour: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Create a project row.
    Add {
        name: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Print every project.
    List,
}

#[derive(Args, Debug)]
struct TasksArgs {
    /// brain_space|projects|capacity|all
    #[arg(long, default_value = "all")]
    component: String,
    /// active|completed
    #[arg(long)]
    status: Option<String>,
    /// brain_space|projects|capacity
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    active_project_work: Option<bool>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn config(&self) -> DashboardConfig {
        DashboardConfig {
            db_path: self.db.clone(),
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
        }
    }
}

fn run(cli: Cli) -> Result<serde_json::Value, Box<dyn Error>> {
    let config = cli.config();
    config.start_logging()?;
    let dashboard = Dashboard::open(&config)?;

    let output = match cli.command {
        Command::Dump { text } => json!(dashboard.brain_dump.capture(&text)?),
        Command::Triage { id, priority } => {
            let priority = BrainDumpPriority::parse(&priority)
                .ok_or_else(|| format!("unknown priority `{priority}`"))?;
            json!({ "updated": dashboard.brain_dump.set_priority(id, priority)? })
        }
        Command::Done { id } => complete(&dashboard, id)?,
        Command::Pull {
            project_id,
            description,
            hours,
        } => {
            let pulled = dashboard
                .projects
                .commit_today(project_id, &description, hours)?;
            json!({
                "unifiedTaskId": pulled.unified_task_id,
                "capacityTaskId": pulled.capacity_task_id,
            })
        }
        Command::Project(ProjectCommand::Add {
            name,
            priority,
            category,
        }) => {
            let priority = ProjectPriority::parse(&priority)
                .ok_or_else(|| format!("unknown project priority `{priority}`"))?;
            json!(dashboard.projects.create(NewProject {
                name,
                priority,
                category,
                todos: String::new(),
            })?)
        }
        Command::Project(ProjectCommand::List) => json!(dashboard.projects.list()),
        Command::Tasks(args) => {
            let component = TaskComponent::parse(&args.component)
                .ok_or_else(|| format!("unknown component `{}`", args.component))?;
            let filters = TaskFilters {
                status: parse_optional(args.status.as_deref(), TaskStatus::parse, "status")?,
                source: parse_optional(args.source.as_deref(), TaskSource::parse, "source")?,
                active_project_work: args.active_project_work,
            };
            json!(dashboard.hub.get_tasks_for_component(component, &filters))
        }
        Command::Status { hour: Some(hour) } => json!(dashboard.capacity_snapshot_at(hour)),
        Command::Status { hour: None } => json!(dashboard.capacity_snapshot()),
    };
    Ok(output)
}

fn complete(dashboard: &Dashboard, id: TaskId) -> Result<serde_json::Value, Box<dyn Error>> {
    let report = dashboard.hub.complete_task(id)?;
    Ok(json!({
        "unified": report.unified,
        "capacity": report.capacity,
        "brainItem": report.brain_item,
    }))
}

fn parse_optional<T>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
) -> Result<Option<T>, String> {
    value
        .map(|raw| parse(raw).ok_or_else(|| format!("unknown {field} `{raw}`")))
        .transpose()
}
