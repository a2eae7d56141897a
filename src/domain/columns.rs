//! Local kanban columns
//!
//! The in-memory stage lists the executor patches after a confirmed move.

use serde::Serialize;

use crate::errors::{FunnelError, Result};
use crate::schemas::{Board, Opportunity, Stage};

/// One stage and the opportunities shown in it, in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageColumn {
    pub stage: Stage,
    pub opportunities: Vec<Opportunity>,
}

impl StageColumn {
    pub fn new(stage: Stage, opportunities: Vec<Opportunity>) -> Self {
        StageColumn {
            stage,
            opportunities,
        }
    }

    /// Sum of the opportunities' values
    pub fn total_value(&self) -> f64 {
        self.opportunities.iter().map(|o| o.value).sum()
    }

    /// Position of an opportunity in this column
    pub fn position(&self, opportunity_id: &str) -> Option<usize> {
        self.opportunities.iter().position(|o| o.id == opportunity_id)
    }
}

/// Build the columns of every funnel from a board snapshot
pub fn columns_from_board(board: &Board, include_archived: bool) -> Vec<StageColumn> {
    board
        .all_stages_in_order()
        .into_iter()
        .map(|stage| {
            let opportunities = board
                .opportunities_in_stage(&stage.id, include_archived)
                .into_iter()
                .cloned()
                .collect();
            StageColumn::new(stage.clone(), opportunities)
        })
        .collect()
}

/// Find a column by stage id.
///
/// # Errors
/// * `StageNotFound` - If no column has that stage
pub fn find_column<'a>(columns: &'a [StageColumn], stage_id: &str) -> Result<&'a StageColumn> {
    columns
        .iter()
        .find(|c| c.stage.id == stage_id)
        .ok_or_else(|| FunnelError::StageNotFound(stage_id.to_string()))
}

/// Find an opportunity inside a specific column.
///
/// # Errors
/// * `StageNotFound` - If the column does not exist
/// * `OpportunityNotFound` - If the opportunity is not in that column
pub fn find_opportunity<'a>(
    columns: &'a [StageColumn],
    stage_id: &str,
    opportunity_id: &str,
) -> Result<&'a Opportunity> {
    find_column(columns, stage_id)?
        .opportunities
        .iter()
        .find(|o| o.id == opportunity_id)
        .ok_or_else(|| {
            FunnelError::OpportunityNotFound(format!("{} in stage {}", opportunity_id, stage_id))
        })
}

/// Find an opportunity that may be dragged out of a column.
///
/// # Errors
/// * `StageNotFound` / `OpportunityNotFound` - As [`find_opportunity`]
/// * `OpportunityArchived` - If the opportunity is archived
pub fn find_movable_opportunity<'a>(
    columns: &'a [StageColumn],
    stage_id: &str,
    opportunity_id: &str,
) -> Result<&'a Opportunity> {
    let opportunity = find_opportunity(columns, stage_id, opportunity_id)?;
    if opportunity.archived {
        return Err(FunnelError::OpportunityArchived(opportunity_id.to_string()));
    }
    Ok(opportunity)
}

/// Move an opportunity between columns, replacing it with `placed`.
///
/// The index is clamped to the destination length (after removal when the
/// source and destination are the same column). Both columns are checked
/// before anything is modified.
///
/// # Returns
/// The index the opportunity ended up at
pub fn place_opportunity(
    columns: &mut [StageColumn],
    placed: Opportunity,
    source_stage_id: &str,
    destination_stage_id: &str,
    destination_index: usize,
) -> Result<usize> {
    let source = columns
        .iter()
        .position(|c| c.stage.id == source_stage_id)
        .ok_or_else(|| FunnelError::StageNotFound(source_stage_id.to_string()))?;
    let destination = columns
        .iter()
        .position(|c| c.stage.id == destination_stage_id)
        .ok_or_else(|| FunnelError::StageNotFound(destination_stage_id.to_string()))?;
    let from = columns[source].position(&placed.id).ok_or_else(|| {
        FunnelError::OpportunityNotFound(format!("{} in stage {}", placed.id, source_stage_id))
    })?;

    columns[source].opportunities.remove(from);

    let list = &mut columns[destination].opportunities;
    let index = destination_index.min(list.len());
    list.insert(index, placed);
    Ok(index)
}
