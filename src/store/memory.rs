//! In-memory store with failure injection

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::{FunnelError, Result};
use crate::schemas::{Board, Config, Opportunity, OpportunityPatch};

use super::board_ops::{apply_update, process_requirements, stage_list};
use super::PipelineStore;

/// Store operations that can be counted and made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Load,
    Update,
    Move,
    Fetch,
    Process,
}

impl StoreOp {
    const ALL: [StoreOp; 5] = [
        StoreOp::Load,
        StoreOp::Update,
        StoreOp::Move,
        StoreOp::Fetch,
        StoreOp::Process,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOp::Load => write!(f, "load"),
            StoreOp::Update => write!(f, "update"),
            StoreOp::Move => write!(f, "move"),
            StoreOp::Fetch => write!(f, "fetch"),
            StoreOp::Process => write!(f, "process"),
        }
    }
}

/// A [`PipelineStore`] over a board held in memory.
///
/// Used for `--dry-run` and as the backend double in tests.
#[derive(Debug)]
pub struct MemoryStore {
    board: RwLock<Board>,
    config: Config,
    failing: [AtomicBool; 5],
    calls: [AtomicUsize; 5],
}

impl MemoryStore {
    pub fn new(board: Board, config: Config) -> Self {
        MemoryStore {
            board: RwLock::new(board),
            config,
            failing: Default::default(),
            calls: Default::default(),
        }
    }

    /// Make every later call of `op` fail
    pub fn fail_on(&self, op: StoreOp) {
        self.failing[op.slot()].store(true, Ordering::SeqCst);
    }

    /// Let `op` succeed again
    pub fn recover(&self, op: StoreOp) {
        self.failing[op.slot()].store(false, Ordering::SeqCst);
    }

    /// Number of times `op` was called, failed calls included
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls[op.slot()].load(Ordering::SeqCst)
    }

    /// Calls of every write or side-effect operation
    pub fn write_calls(&self) -> usize {
        StoreOp::ALL
            .iter()
            .filter(|op| matches!(op, StoreOp::Update | StoreOp::Move | StoreOp::Process))
            .map(|op| self.call_count(*op))
            .sum()
    }

    /// Copy of the stored board
    pub async fn snapshot(&self) -> Board {
        self.board.read().await.clone()
    }

    /// Change the stored board behind the executor's back
    pub async fn edit<F>(&self, edit: F)
    where
        F: FnOnce(&mut Board),
    {
        let mut board = self.board.write().await;
        edit(&mut *board);
    }

    fn enter(&self, op: StoreOp) -> Result<()> {
        self.calls[op.slot()].fetch_add(1, Ordering::SeqCst);
        if self.failing[op.slot()].load(Ordering::SeqCst) {
            return Err(FunnelError::wrap("injected failure", format!("memory store {}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn load_board(&self) -> Result<Board> {
        self.enter(StoreOp::Load)?;
        Ok(self.board.read().await.clone())
    }

    async fn update(&self, opportunity_id: &str, patch: &OpportunityPatch) -> Result<()> {
        self.enter(StoreOp::Update)?;
        let mut board = self.board.write().await;
        apply_update(&mut board, opportunity_id, patch).map(|_| ())
    }

    async fn move_to_stage(&self, opportunity_id: &str, stage_id: &str) -> Result<()> {
        self.enter(StoreOp::Move)?;
        let mut board = self.board.write().await;
        let patch = OpportunityPatch::default().with_stage(stage_id);
        apply_update(&mut board, opportunity_id, &patch).map(|_| ())
    }

    async fn get_by_stage_id(&self, stage_id: &str, include_archived: bool) -> Result<Vec<Opportunity>> {
        self.enter(StoreOp::Fetch)?;
        let board = self.board.read().await;
        stage_list(&board, stage_id, include_archived)
    }

    async fn process_stage_requirements(
        &self,
        opportunity: &Opportunity,
        stage_id: &str,
    ) -> Result<Option<Opportunity>> {
        self.enter(StoreOp::Process)?;
        let mut board = self.board.write().await;
        process_requirements(&mut board, &self.config, opportunity, stage_id)
    }
}
