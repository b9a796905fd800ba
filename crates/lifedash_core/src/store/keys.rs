//! Well-known store keys shared by every dashboard widget.

pub const BRAIN_DUMP_ITEMS: &str = "simpleBrainDumpItems";
pub const CAPACITY_TASKS: &str = "enoughTasks";
pub const UNIFIED_TASKS: &str = "unifiedTasks";
pub const PROJECTS: &str = "projects";
