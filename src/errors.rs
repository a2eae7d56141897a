//! Error types for funnelboard
//!
//! Each error type has a corresponding error code for programmatic handling.

use thiserror::Error;

/// Result type alias for funnelboard operations
pub type Result<T> = std::result::Result<T, FunnelError>;

/// Main error type for all funnelboard operations
#[derive(Debug, Error)]
pub enum FunnelError {
    /// Stage is not present in the local board state
    #[error("Stage not found: {0}")]
    StageNotFound(String),

    /// Opportunity is not present in the expected stage list
    #[error("Opportunity not found: {0}")]
    OpportunityNotFound(String),

    /// Archived opportunities stay on the board but cannot be moved
    #[error("Opportunity is archived: {0}")]
    OpportunityArchived(String),

    /// Remote update or move call failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Post-move stage requirement processing failed
    #[error("Side effect error: {0}")]
    SideEffect(String),

    /// Refetching stage lists after a failed move failed
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    /// Move lifecycle state transition error
    #[error("State transition error: {0}")]
    StateTransition(String),

    /// Stage definition breaks a board invariant
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    /// User-supplied value does not match the field type
    #[error("Invalid value for field {field}: {message}")]
    InvalidFieldValue { field: String, message: String },

    /// Move is waiting for values the destination stage asks for
    #[error("Input required: {0}")]
    InputRequired(String),

    /// No .funnelboard directory found
    #[error("Board not found: {0}")]
    BoardNotFound(String),

    /// Invalid JSON format
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error with context
    #[error("{context}: {message}")]
    Wrapped { context: String, message: String },
}

impl FunnelError {
    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            FunnelError::StageNotFound(_) => "STAGE_NOT_FOUND",
            FunnelError::OpportunityNotFound(_) => "OPPORTUNITY_NOT_FOUND",
            FunnelError::OpportunityArchived(_) => "OPPORTUNITY_ARCHIVED",
            FunnelError::Persistence(_) => "PERSISTENCE",
            FunnelError::SideEffect(_) => "SIDE_EFFECT",
            FunnelError::Reconciliation(_) => "RECONCILIATION",
            FunnelError::StateTransition(_) => "STATE_TRANSITION",
            FunnelError::InvalidStage(_) => "INVALID_STAGE",
            FunnelError::InvalidFieldValue { .. } => "INVALID_FIELD_VALUE",
            FunnelError::InputRequired(_) => "INPUT_REQUIRED",
            FunnelError::BoardNotFound(_) => "BOARD_NOT_FOUND",
            FunnelError::InvalidJson(_) => "INVALID_JSON",
            FunnelError::FileNotFound(_) => "FILE_NOT_FOUND",
            FunnelError::ConfigError(_) => "CONFIG_ERROR",
            FunnelError::Io(_) => "IO_ERROR",
            FunnelError::Wrapped { .. } => "WRAPPED_ERROR",
        }
    }

    /// Whether this is a local lookup failure (no backend call was made)
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            FunnelError::StageNotFound(_)
                | FunnelError::OpportunityNotFound(_)
                | FunnelError::OpportunityArchived(_)
        )
    }

    /// Wrap an error with additional context
    pub fn wrap<E: std::fmt::Display>(error: E, context: impl Into<String>) -> Self {
        FunnelError::Wrapped {
            context: context.into(),
            message: error.to_string(),
        }
    }
}

/// Convert an error to an appropriate exit code
pub fn to_exit_code(error: &FunnelError) -> i32 {
    match error {
        FunnelError::StageNotFound(_)
        | FunnelError::OpportunityNotFound(_)
        | FunnelError::OpportunityArchived(_) => 2,
        FunnelError::InvalidFieldValue { .. } | FunnelError::InputRequired(_) => 3,
        _ => 1,
    }
}
