//! Funnelboard - kanban sales-pipeline core
//!
//! This library provides the core functionality for the funnelboard CLI, including:
//! - Schema definitions for funnels, stages, opportunities and config
//! - Domain logic for stage requirements, drag operations and the move state machine
//! - The move executor that commits drags and reconciles local stage lists
//! - Stores backed by a JSON file or by memory
//! - File system utilities for reading/writing JSON

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod fs;
pub mod schemas;
pub mod store;

// Re-export commonly used types
pub use errors::{FunnelError, Result};
pub use executor::{MoveExecutor, MoveOutcome, Notification, PendingMove};
pub use schemas::{Board, Config, Opportunity, OpportunityPatch, Stage};
pub use store::PipelineStore;
