//! Path resolution utilities for funnelboard
//!
//! Provides functions to locate the board root and construct paths
//! to the files kept under `.funnelboard`.

use std::path::{Path, PathBuf};

use crate::errors::{FunnelError, Result};

/// Name of the directory holding board data
pub const BOARD_DIR: &str = ".funnelboard";

/// Find the nearest directory containing a .funnelboard directory.
///
/// Walks up the directory tree from the starting directory.
///
/// # Errors
/// * `BoardNotFound` - If no ancestor holds a .funnelboard directory
pub fn find_board_root(start_cwd: &Path) -> Result<PathBuf> {
    let mut current = start_cwd
        .canonicalize()
        .map_err(|e| FunnelError::BoardNotFound(format!("Cannot resolve path: {}", e)))?;

    loop {
        if current.join(BOARD_DIR).is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent.to_path_buf();
            }
            _ => {
                return Err(FunnelError::BoardNotFound(format!(
                    "Could not find a {} directory; run `funnelboard init` first",
                    BOARD_DIR
                )));
            }
        }
    }
}

/// Resolve the current working directory, optionally using an override.
pub fn resolve_cwd(cwd_option: Option<&Path>) -> PathBuf {
    match cwd_option {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Get the path to the .funnelboard directory.
pub fn get_board_dir(root: &Path) -> PathBuf {
    root.join(BOARD_DIR)
}

/// Get the path to the config.json file.
pub fn get_config_path(root: &Path) -> PathBuf {
    get_board_dir(root).join("config.json")
}

/// Get the path to the board.json file.
pub fn get_board_path(root: &Path) -> PathBuf {
    get_board_dir(root).join("board.json")
}
