//! Config schema - Configuration for funnelboard

use serde::{Deserialize, Serialize};

/// Main configuration for funnelboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for forward compatibility
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Whether rollback refetches include archived opportunities
    #[serde(default)]
    pub resync_include_archived: bool,

    /// Whether entering a stage instantiates its required tasks
    #[serde(default = "default_auto_generate_tasks")]
    pub auto_generate_tasks: bool,

    /// Due-date offset for generated tasks whose definition has no duration
    #[serde(default = "default_task_duration_days")]
    pub default_task_duration_days: u32,
}

fn default_schema_version() -> u32 {
    1
}

fn default_auto_generate_tasks() -> bool {
    true
}

fn default_task_duration_days() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schema_version: 1,
            resync_include_archived: false,
            auto_generate_tasks: true,
            default_task_duration_days: 1,
        }
    }
}
