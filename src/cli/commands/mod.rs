//! CLI command implementations

pub mod check;
pub mod doctor;
pub mod init;
pub mod move_cmd;
pub mod show;
pub mod status;

use std::path::{Path, PathBuf};

use crate::config::load_config;
use crate::domain::StageColumn;
use crate::errors::{FunnelError, Result};
use crate::fs::{find_board_root, resolve_cwd};
use crate::schemas::Config;

/// Find the board root above `cwd` and load its config
pub(crate) fn open_board(cwd: Option<&Path>) -> Result<(PathBuf, Config)> {
    let root = find_board_root(&resolve_cwd(cwd))?;
    let config = load_config(&root)?;
    Ok((root, config))
}

/// Find the column currently holding an opportunity
pub(crate) fn locate<'a>(columns: &'a [StageColumn], opportunity_id: &str) -> Result<&'a StageColumn> {
    columns
        .iter()
        .find(|c| c.position(opportunity_id).is_some())
        .ok_or_else(|| FunnelError::OpportunityNotFound(opportunity_id.to_string()))
}
