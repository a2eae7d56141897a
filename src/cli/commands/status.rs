//! Status command - Show every stage with its opportunities

use std::path::Path;

use serde::Serialize;

use crate::domain::{columns_from_board, StageColumn};
use crate::errors::{FunnelError, Result};
use crate::fs::read_board;

use super::open_board;

/// Per-stage totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage_id: String,
    pub name: String,
    pub count: usize,
    pub total_value: f64,
}

/// Summarize columns in display order
pub fn summarize(columns: &[StageColumn]) -> Vec<StageSummary> {
    columns
        .iter()
        .map(|c| StageSummary {
            stage_id: c.stage.id.clone(),
            name: c.stage.name.clone(),
            count: c.opportunities.len(),
            total_value: c.total_value(),
        })
        .collect()
}

/// Show status of every stage
pub async fn run(cwd: Option<&Path>, json: bool) -> Result<()> {
    let (root, config) = open_board(cwd)?;
    let board = read_board(&root)?;
    let columns = columns_from_board(&board, config.resync_include_archived);
    let summaries = summarize(&columns);

    if json {
        let out = serde_json::to_string_pretty(&summaries)
            .map_err(|e| FunnelError::InvalidJson(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    for (summary, column) in summaries.iter().zip(&columns) {
        println!(
            "{:<16} {:>4} {:>14.2}",
            summary.name, summary.count, summary.total_value
        );
        for opp in &column.opportunities {
            println!("    {:<12} {}", opp.id, opp.title);
        }
    }
    Ok(())
}
