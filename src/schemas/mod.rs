//! Schema types for funnelboard
//!
//! Every type round-trips through the board and config JSON files.

mod board;
mod config;
mod opportunity;
mod stage;

pub use board::Board;
pub use config::Config;
pub use opportunity::{Opportunity, OpportunityPatch, ScheduledTask};
pub use stage::{FieldType, Funnel, RequiredField, RequiredTask, Stage};
