//! File system utilities for funnelboard
//!
//! Provides path resolution and JSON file operations.

mod json;
mod paths;

pub use json::{read_board, read_config, read_json, write_board, write_config, write_json};
pub use paths::{
    find_board_root, get_board_dir, get_board_path, get_config_path, resolve_cwd, BOARD_DIR,
};
