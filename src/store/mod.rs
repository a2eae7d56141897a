//! Data access for funnels, stages and opportunities
//!
//! The executor only talks to storage through [`PipelineStore`]; every call
//! is fallible and may suspend.

mod board_ops;
mod json_file;
mod memory;

use async_trait::async_trait;

use crate::errors::Result;
use crate::schemas::{Board, Opportunity, OpportunityPatch};

pub use board_ops::generate_stage_tasks;
pub use json_file::JsonFileStore;
pub use memory::{MemoryStore, StoreOp};

/// Remote store the move executor persists to
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Load every funnel, stage and opportunity
    async fn load_board(&self) -> Result<Board>;

    /// Persist a partial update, including a stage reassignment
    async fn update(&self, opportunity_id: &str, patch: &OpportunityPatch) -> Result<()>;

    /// Persist a stage-only change
    async fn move_to_stage(&self, opportunity_id: &str, stage_id: &str) -> Result<()>;

    /// Fetch the full opportunity list of one stage
    async fn get_by_stage_id(&self, stage_id: &str, include_archived: bool) -> Result<Vec<Opportunity>>;

    /// Apply stage-entry side effects to a moved opportunity.
    ///
    /// Returns `None` when nothing changed and the input should be used as-is.
    async fn process_stage_requirements(
        &self,
        opportunity: &Opportunity,
        stage_id: &str,
    ) -> Result<Option<Opportunity>>;
}
