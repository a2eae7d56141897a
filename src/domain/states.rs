//! Move lifecycle state machine
//!
//! Every drag follows:
//! idle → validating → (awaiting_user_input | committing) → (reconciled | rolled_back) → idle

use serde::{Deserialize, Serialize};

use crate::errors::{FunnelError, Result};

/// State of a single move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    Idle,
    /// Looking up stages and evaluating requirements
    Validating,
    /// Paused until the user supplies missing data or cancels
    AwaitingUserInput,
    /// Remote writes and side-effect processing in progress
    Committing,
    Reconciled,
    RolledBack,
}

impl std::fmt::Display for MoveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveState::Idle => write!(f, "idle"),
            MoveState::Validating => write!(f, "validating"),
            MoveState::AwaitingUserInput => write!(f, "awaiting_user_input"),
            MoveState::Committing => write!(f, "committing"),
            MoveState::Reconciled => write!(f, "reconciled"),
            MoveState::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Returns the states reachable in one step from `current`.
///
/// Validating and AwaitingUserInput may drop back to Idle: a failed lookup
/// aborts, and a dismissed dialog discards the operation.
pub fn get_allowed_next_states(current: MoveState) -> Vec<MoveState> {
    match current {
        MoveState::Idle => vec![MoveState::Validating],
        MoveState::Validating => vec![
            MoveState::AwaitingUserInput,
            MoveState::Committing,
            MoveState::Idle,
        ],
        MoveState::AwaitingUserInput => vec![MoveState::Committing, MoveState::Idle],
        MoveState::Committing => vec![MoveState::Reconciled, MoveState::RolledBack],
        MoveState::Reconciled | MoveState::RolledBack => vec![MoveState::Idle],
    }
}

/// Check if a state ends a commit attempt
pub fn is_terminal_state(state: MoveState) -> bool {
    matches!(state, MoveState::Reconciled | MoveState::RolledBack)
}

/// Tracks one move through the state machine, keeping the path taken
#[derive(Debug, Clone, PartialEq)]
pub struct MoveLifecycle {
    history: Vec<MoveState>,
}

impl MoveLifecycle {
    pub fn new() -> Self {
        MoveLifecycle {
            history: vec![MoveState::Idle],
        }
    }

    /// Current state
    pub fn state(&self) -> MoveState {
        self.history.last().copied().unwrap_or(MoveState::Idle)
    }

    /// Every state visited so far, starting with Idle
    pub fn history(&self) -> &[MoveState] {
        &self.history
    }

    /// Step to `next`.
    ///
    /// # Errors
    /// * `StateTransition` - If `next` is not reachable from the current state
    pub fn advance(&mut self, next: MoveState) -> Result<()> {
        let current = self.state();
        if !get_allowed_next_states(current).contains(&next) {
            return Err(FunnelError::StateTransition(format!(
                "cannot move from {} to {}",
                current, next
            )));
        }
        tracing::debug!(from = %current, to = %next, "move state");
        self.history.push(next);
        Ok(())
    }

    /// Consume the lifecycle, returning the full path
    pub fn into_history(self) -> Vec<MoveState> {
        self.history
    }
}

impl Default for MoveLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
