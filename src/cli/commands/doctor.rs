//! Doctor command - Validate the board document

use std::path::Path;

use crate::errors::{FunnelError, Result};
use crate::fs::read_board;

use super::open_board;

/// Print every problem found in the board; fails if there are any
pub async fn run(cwd: Option<&Path>) -> Result<()> {
    let (root, _config) = open_board(cwd)?;
    let board = read_board(&root)?;
    let issues = board.validate();

    if issues.is_empty() {
        println!("Board OK");
        return Ok(());
    }

    for issue in &issues {
        tracing::warn!(%issue, "board problem");
        println!("  - {}", issue);
    }
    Err(FunnelError::wrap(
        format!("{} problem(s) found", issues.len()),
        "doctor",
    ))
}
