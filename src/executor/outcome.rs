//! Structured results of a move, rendered by the caller

use serde::Serialize;

use crate::domain::{DragOperation, DragPrompt, MoveLifecycle, MoveState};
use crate::errors::FunnelError;
use crate::schemas::{Opportunity, OpportunityPatch};

/// Which step of a move failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Stage or opportunity missing locally; nothing was sent
    Lookup,
    /// The update or move call failed
    Persistence,
    /// Stage-entry processing failed after the move was stored
    SideEffect,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Lookup => write!(f, "lookup"),
            FailureKind::Persistence => write!(f, "persistence"),
            FailureKind::SideEffect => write!(f, "side_effect"),
        }
    }
}

/// Diagnostic detail of a failed commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl MoveFailure {
    pub(crate) fn from_error(error: &FunnelError) -> Self {
        let kind = match error {
            FunnelError::SideEffect(_) => FailureKind::SideEffect,
            e if e.is_lookup() => FailureKind::Lookup,
            _ => FailureKind::Persistence,
        };
        MoveFailure {
            kind,
            message: error.to_string(),
        }
    }
}

/// Whether the local lists were refetched after a failed commit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ResyncStatus {
    /// Every stage list now mirrors the store
    Resynced,
    /// Some stage lists could not be fetched and may be stale
    Failed { stages: Vec<String>, message: String },
}

/// User-facing message for a finished move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notification {
    MoveSucceeded { opportunity_id: String, stage_name: String },
    MoveFailed { message: String },
}

impl Notification {
    pub fn message(&self) -> String {
        match self {
            Notification::MoveSucceeded { stage_name, .. } => {
                format!("Opportunity moved to {}", stage_name)
            }
            Notification::MoveFailed { message } => message.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Notification::MoveSucceeded { .. })
    }
}

/// A move paused until the user fills in what the destination stage asks for
#[derive(Debug, Clone)]
pub struct PendingMove {
    /// The drop, with requirements evaluated against the record plus `input`
    pub operation: DragOperation,

    /// Everything the user has supplied so far
    pub input: OpportunityPatch,

    /// Why the last resume did not go through
    pub issue: Option<String>,

    pub(crate) lifecycle: MoveLifecycle,
}

impl PendingMove {
    /// The dialog to show
    pub fn prompt(&self) -> DragPrompt {
        self.operation.prompt()
    }

    pub fn state(&self) -> MoveState {
        self.lifecycle.state()
    }
}

/// How a drag ended
#[derive(Debug)]
pub enum MoveOutcome {
    /// Stored and applied to the local lists
    Reconciled {
        opportunity: Opportunity,
        source_stage_id: String,
        destination_stage_id: String,
        destination_index: usize,
        stage_name: String,
        history: Vec<MoveState>,
    },
    /// Dropped within its own stage; only the local order changed
    Reordered {
        opportunity_id: String,
        stage_id: String,
        destination_index: usize,
        history: Vec<MoveState>,
    },
    /// Waiting for the user
    AwaitingInput(PendingMove),
    /// Store rejected the move; local lists were refetched
    RolledBack {
        failure: MoveFailure,
        resync: ResyncStatus,
        history: Vec<MoveState>,
    },
    /// Nothing was sent to the store
    Aborted { error: FunnelError },
    /// User dismissed the dialog
    Cancelled {
        opportunity_id: String,
        history: Vec<MoveState>,
    },
}

impl MoveOutcome {
    /// The notification to show, if any
    pub fn notification(&self) -> Option<Notification> {
        match self {
            MoveOutcome::Reconciled {
                opportunity,
                stage_name,
                ..
            } => Some(Notification::MoveSucceeded {
                opportunity_id: opportunity.id.clone(),
                stage_name: stage_name.clone(),
            }),
            MoveOutcome::RolledBack { .. } => Some(Notification::MoveFailed {
                message: "Failed to move opportunity".to_string(),
            }),
            MoveOutcome::Aborted { error } => Some(Notification::MoveFailed {
                message: error.to_string(),
            }),
            MoveOutcome::Reordered { .. }
            | MoveOutcome::AwaitingInput(_)
            | MoveOutcome::Cancelled { .. } => None,
        }
    }

    /// State the move was left in
    pub fn state(&self) -> MoveState {
        match self {
            MoveOutcome::AwaitingInput(pending) => pending.state(),
            _ => MoveState::Idle,
        }
    }

    /// Path the move took through the state machine
    pub fn history(&self) -> &[MoveState] {
        match self {
            MoveOutcome::Reconciled { history, .. }
            | MoveOutcome::Reordered { history, .. }
            | MoveOutcome::RolledBack { history, .. }
            | MoveOutcome::Cancelled { history, .. } => history,
            MoveOutcome::AwaitingInput(pending) => pending.lifecycle.history(),
            MoveOutcome::Aborted { .. } => &[],
        }
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(self, MoveOutcome::Reconciled { .. })
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, MoveOutcome::RolledBack { .. })
    }

    /// Get the pending move if the outcome is waiting for input
    pub fn pending(self) -> Option<PendingMove> {
        match self {
            MoveOutcome::AwaitingInput(pending) => Some(pending),
            _ => None,
        }
    }
}
