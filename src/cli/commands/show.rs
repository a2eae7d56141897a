//! Show command - Show details of a specific opportunity

use std::path::Path;

use crate::errors::{FunnelError, Result};
use crate::fs::read_board;

use super::open_board;

/// Show details of a specific opportunity
pub async fn run(cwd: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let (root, _config) = open_board(cwd)?;
    let board = read_board(&root)?;
    let opp = board
        .opportunity(id)
        .ok_or_else(|| FunnelError::OpportunityNotFound(id.to_string()))?;

    if json {
        let out =
            serde_json::to_string_pretty(opp).map_err(|e| FunnelError::InvalidJson(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    let stage_name = board
        .stage(&opp.stage_id)
        .map(|s| s.name.as_str())
        .unwrap_or("?");

    println!("{}  {}", opp.id, opp.title);
    println!("  stage:   {} ({})", stage_name, opp.stage_id);
    println!("  value:   {:.2}", opp.value);
    if let Some(client) = &opp.client_name {
        println!("  client:  {}", client);
    }
    if opp.archived {
        println!("  archived");
    }
    for (name, value) in &opp.custom_fields {
        println!("  {} = {}", name, value);
    }
    for task in &opp.scheduled_tasks {
        let mark = if task.completed { "x" } else { " " };
        println!("  [{}] {} (due {})", mark, task.name, task.due_at.format("%Y-%m-%d"));
    }
    if let Some(reason) = &opp.win_reason {
        println!("  won:     {}", reason);
    }
    if let Some(reason) = &opp.loss_reason {
        println!("  lost:    {}", reason);
    }
    Ok(())
}
