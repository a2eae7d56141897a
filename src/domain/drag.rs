//! Drag operation builder
//!
//! Packages a drop gesture with the destination stage's requirement verdict.

use crate::schemas::{Opportunity, RequiredField, RequiredTask, Stage};

use super::requirements::{evaluate_requirements, ReasonKind, RequirementCheck};

/// What the UI has to ask before a move can be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPrompt {
    /// Nothing is missing, commit straight away
    None,
    /// Only a closing reason is missing
    ReasonOnly(ReasonKind),
    /// Fields or tasks are missing; the dialog also asks for the reason if set
    RequiredFields { reason: Option<ReasonKind> },
}

/// A pending move of one opportunity, created per drop gesture
#[derive(Debug, Clone, PartialEq)]
pub struct DragOperation {
    pub opportunity: Opportunity,
    pub source_stage_id: String,
    pub destination_stage: Stage,
    pub destination_index: usize,
    pub requirements: RequirementCheck,
}

impl DragOperation {
    pub fn missing_fields(&self) -> &[RequiredField] {
        &self.requirements.missing_fields
    }

    pub fn missing_tasks(&self) -> &[RequiredTask] {
        &self.requirements.missing_tasks
    }

    pub fn requires_reason(&self) -> bool {
        self.requirements.requires_reason()
    }

    /// Whether the drop lands in the stage it started from
    pub fn is_reorder(&self) -> bool {
        self.source_stage_id == self.destination_stage.id
    }

    /// Pick the dialog to show for this operation
    pub fn prompt(&self) -> DragPrompt {
        let check = &self.requirements;
        if !check.has_any_requirement() {
            DragPrompt::None
        } else if check.requires_only_reason() {
            match check.missing_reason {
                Some(kind) => DragPrompt::ReasonOnly(kind),
                None => DragPrompt::None,
            }
        } else {
            DragPrompt::RequiredFields {
                reason: check.missing_reason,
            }
        }
    }
}

/// Build the operation for a drop.
///
/// Never fails and never touches the store; a drop inside the source stage
/// carries no requirements since the opportunity already sits there.
pub fn build_drag_operation(
    opportunity: &Opportunity,
    source_stage_id: &str,
    destination_stage: &Stage,
    destination_index: usize,
) -> DragOperation {
    let requirements = if source_stage_id == destination_stage.id {
        RequirementCheck::default()
    } else {
        evaluate_requirements(opportunity, destination_stage)
    };

    DragOperation {
        opportunity: opportunity.clone(),
        source_stage_id: source_stage_id.to_string(),
        destination_stage: destination_stage.clone(),
        destination_index,
        requirements,
    }
}
