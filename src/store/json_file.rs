//! Store backed by the board.json file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::Result;
use crate::fs;
use crate::schemas::{Board, Config, Opportunity, OpportunityPatch};

use super::board_ops::{apply_update, process_requirements, stage_list};
use super::PipelineStore;

/// A [`PipelineStore`] that reads and rewrites `.funnelboard/board.json`.
///
/// Every write re-reads the file under a lock and replaces it atomically.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    config: Config,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: &Path, config: Config) -> Self {
        JsonFileStore {
            root: root.to_path_buf(),
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn modify<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Board) -> Result<T>,
    {
        let _guard = self.write_lock.lock().await;
        let mut board = fs::read_board(&self.root)?;
        let value = change(&mut board)?;
        fs::write_board(&self.root, &board)?;
        Ok(value)
    }
}

#[async_trait]
impl PipelineStore for JsonFileStore {
    async fn load_board(&self) -> Result<Board> {
        fs::read_board(&self.root)
    }

    async fn update(&self, opportunity_id: &str, patch: &OpportunityPatch) -> Result<()> {
        self.modify(|board| apply_update(board, opportunity_id, patch).map(|_| ()))
            .await
    }

    async fn move_to_stage(&self, opportunity_id: &str, stage_id: &str) -> Result<()> {
        let patch = OpportunityPatch::default().with_stage(stage_id);
        self.modify(|board| apply_update(board, opportunity_id, &patch).map(|_| ()))
            .await
    }

    async fn get_by_stage_id(&self, stage_id: &str, include_archived: bool) -> Result<Vec<Opportunity>> {
        let board = fs::read_board(&self.root)?;
        stage_list(&board, stage_id, include_archived)
    }

    async fn process_stage_requirements(
        &self,
        opportunity: &Opportunity,
        stage_id: &str,
    ) -> Result<Option<Opportunity>> {
        let config = &self.config;
        self.modify(|board| process_requirements(board, config, opportunity, stage_id))
            .await
    }
}
