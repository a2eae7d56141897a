//! Init command - Create a board with a starter sales funnel

use std::path::Path;

use crate::errors::{FunnelError, Result};
use crate::fs::{get_board_dir, get_board_path, resolve_cwd, write_board, write_config};
use crate::schemas::{Board, Config};

/// Create `.funnelboard/` with a default config and the starter board
pub async fn run(cwd: Option<&Path>, force: bool, dry_run: bool) -> Result<()> {
    let root = resolve_cwd(cwd);
    let board_path = get_board_path(&root);

    if board_path.exists() && !force {
        return Err(FunnelError::ConfigError(format!(
            "{} already exists; use --force to overwrite it",
            board_path.display()
        )));
    }

    if dry_run {
        println!("Would create {}", get_board_dir(&root).display());
        return Ok(());
    }

    write_config(&root, &Config::default())?;
    write_board(&root, &Board::starter())?;
    tracing::info!(path = %board_path.display(), "board initialized");
    println!("Initialized funnelboard in {}", get_board_dir(&root).display());
    Ok(())
}
