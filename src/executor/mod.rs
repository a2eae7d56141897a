//! Move executor
//!
//! Drives a drag through validation, the optional user-input pause, the
//! remote commit and the local reconciliation of stage lists.
//!
//! Local lists are patched only after the store accepted the move. If any
//! remote step fails, every stage list is refetched from the store instead.

mod outcome;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    build_drag_operation, columns_from_board, evaluate_requirements, find_column,
    find_movable_opportunity, find_opportunity, place_opportunity, DragOperation, MoveLifecycle,
    MoveState, StageColumn,
};
use crate::errors::{FunnelError, Result};
use crate::schemas::{Config, Opportunity, OpportunityPatch};
use crate::store::PipelineStore;

pub use outcome::{FailureKind, MoveFailure, MoveOutcome, Notification, PendingMove, ResyncStatus};

/// Flags shared by every move on one board
#[derive(Debug, Default)]
pub struct OperationContext {
    is_dragging: AtomicBool,
    /// Held for the whole commit; later moves queue on it
    commit_gate: Mutex<()>,
}

impl OperationContext {
    pub fn is_dragging(&self) -> bool {
        self.is_dragging.load(Ordering::SeqCst)
    }
}

/// Clears `is_dragging` when the commit scope ends, early returns included
struct DraggingFlag<'a>(&'a AtomicBool);

impl<'a> DraggingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        DraggingFlag(flag)
    }
}

impl Drop for DraggingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Moves opportunities between stages of a board
pub struct MoveExecutor {
    store: Arc<dyn PipelineStore>,
    config: Config,
    columns: RwLock<Vec<StageColumn>>,
    context: OperationContext,
}

impl MoveExecutor {
    /// Create an executor over already-loaded columns
    pub fn new(store: Arc<dyn PipelineStore>, config: Config, columns: Vec<StageColumn>) -> Self {
        MoveExecutor {
            store,
            config,
            columns: RwLock::new(columns),
            context: OperationContext::default(),
        }
    }

    /// Create an executor with columns loaded from the store
    pub async fn load(store: Arc<dyn PipelineStore>, config: Config) -> Result<Self> {
        let board = store.load_board().await?;
        let columns = columns_from_board(&board, config.resync_include_archived);
        Ok(Self::new(store, config, columns))
    }

    /// Whether a commit is in flight; the UI disables dragging while set
    pub fn is_dragging(&self) -> bool {
        self.context.is_dragging()
    }

    /// Copy of the local stage lists
    pub async fn columns(&self) -> Vec<StageColumn> {
        self.columns.read().await.clone()
    }

    /// Replace the local stage lists with a fresh load from the store
    pub async fn refresh(&self) -> Result<()> {
        let _gate = self.context.commit_gate.lock().await;
        let board = self.store.load_board().await?;
        *self.columns.write().await = columns_from_board(&board, self.config.resync_include_archived);
        Ok(())
    }

    /// Handle a finished drag gesture.
    ///
    /// Commits straight away when the destination stage asks for nothing,
    /// otherwise pauses with [`MoveOutcome::AwaitingInput`] and no remote call.
    pub async fn handle_opportunity_drag(
        &self,
        opportunity_id: &str,
        source_stage_id: &str,
        destination_stage_id: &str,
        destination_index: usize,
    ) -> MoveOutcome {
        let lifecycle = MoveLifecycle::new();
        let result = self
            .drag(lifecycle, opportunity_id, source_stage_id, destination_stage_id, destination_index)
            .await;
        self.settle(result)
    }

    /// Commit a move with user-supplied data, e.g. after a required-fields dialog.
    ///
    /// Supplied values are type-checked and requirements are re-evaluated on
    /// the merged record; anything still missing pauses the move again.
    pub async fn complete_opportunity_move(
        &self,
        opportunity: &Opportunity,
        source_stage_id: &str,
        destination_stage_id: &str,
        destination_index: usize,
        updated_fields: Option<OpportunityPatch>,
    ) -> MoveOutcome {
        let mut lifecycle = MoveLifecycle::new();
        let result = match lifecycle.advance(MoveState::Validating) {
            Ok(()) => {
                self.finish(
                    lifecycle,
                    opportunity,
                    source_stage_id,
                    destination_stage_id,
                    destination_index,
                    updated_fields.unwrap_or_default(),
                )
                .await
            }
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    /// Resume a paused move with more user input
    pub async fn resume(&self, pending: PendingMove, input: OpportunityPatch) -> MoveOutcome {
        let PendingMove {
            operation,
            input: earlier,
            lifecycle,
            ..
        } = pending;
        let combined = earlier.merged(&input);
        let result = self
            .finish(
                lifecycle,
                &operation.opportunity,
                &operation.source_stage_id,
                &operation.destination_stage.id,
                operation.destination_index,
                combined,
            )
            .await;
        self.settle(result)
    }

    /// Discard a paused move; nothing is sent and nothing changes locally
    pub fn cancel(&self, pending: PendingMove) -> MoveOutcome {
        let opportunity_id = pending.operation.opportunity.id.clone();
        let mut lifecycle = pending.lifecycle;
        if let Err(error) = lifecycle.advance(MoveState::Idle) {
            return self.settle(Err(error));
        }
        tracing::debug!(opportunity = %opportunity_id, "move cancelled");
        MoveOutcome::Cancelled {
            opportunity_id,
            history: lifecycle.into_history(),
        }
    }

    // ===== PRIVATE HELPERS =====

    fn settle(&self, result: Result<MoveOutcome>) -> MoveOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(code = error.code(), %error, "move aborted");
                MoveOutcome::Aborted { error }
            }
        }
    }

    async fn drag(
        &self,
        mut lifecycle: MoveLifecycle,
        opportunity_id: &str,
        source_stage_id: &str,
        destination_stage_id: &str,
        destination_index: usize,
    ) -> Result<MoveOutcome> {
        lifecycle.advance(MoveState::Validating)?;

        let operation = {
            let columns = self.columns.read().await;
            let opportunity = find_movable_opportunity(&columns, source_stage_id, opportunity_id)?;
            let destination = find_column(&columns, destination_stage_id)?;
            build_drag_operation(opportunity, source_stage_id, &destination.stage, destination_index)
        };

        if operation.is_reorder() {
            return self.reorder(lifecycle, operation).await;
        }

        if operation.requirements.has_any_requirement() {
            lifecycle.advance(MoveState::AwaitingUserInput)?;
            tracing::debug!(
                opportunity = %opportunity_id,
                stage = %destination_stage_id,
                prompt = ?operation.prompt(),
                "move waiting for user input"
            );
            return Ok(MoveOutcome::AwaitingInput(PendingMove {
                operation,
                input: OpportunityPatch::default(),
                issue: None,
                lifecycle,
            }));
        }

        self.commit(lifecycle, operation, OpportunityPatch::default()).await
    }

    async fn finish(
        &self,
        mut lifecycle: MoveLifecycle,
        opportunity: &Opportunity,
        source_stage_id: &str,
        destination_stage_id: &str,
        destination_index: usize,
        input: OpportunityPatch,
    ) -> Result<MoveOutcome> {
        let destination = {
            let columns = self.columns.read().await;
            find_movable_opportunity(&columns, source_stage_id, &opportunity.id)?;
            find_column(&columns, destination_stage_id)?.stage.clone()
        };

        let mut operation =
            build_drag_operation(opportunity, source_stage_id, &destination, destination_index);
        if operation.is_reorder() {
            return self.reorder(lifecycle, operation).await;
        }

        let mut input = input;
        let mut issue = None;
        for (name, value) in input.custom_fields.iter_mut() {
            if let Some(field) = destination.field(name) {
                match field.coerce_value(value) {
                    Ok(coerced) => *value = coerced,
                    Err(e) => {
                        issue.get_or_insert_with(|| e.to_string());
                    }
                }
            }
        }

        let merged = opportunity.clone().with_patch(&input);
        operation.requirements = evaluate_requirements(&merged, &destination);

        if issue.is_some() || operation.requirements.has_any_requirement() {
            if lifecycle.state() != MoveState::AwaitingUserInput {
                lifecycle.advance(MoveState::AwaitingUserInput)?;
            }
            let issue = issue.or_else(|| Some("required information is still missing".to_string()));
            tracing::debug!(
                opportunity = %opportunity.id,
                stage = %destination_stage_id,
                issue = ?issue,
                "move still waiting for user input"
            );
            return Ok(MoveOutcome::AwaitingInput(PendingMove {
                operation,
                input,
                issue,
                lifecycle,
            }));
        }

        self.commit(lifecycle, operation, input).await
    }

    async fn reorder(&self, mut lifecycle: MoveLifecycle, operation: DragOperation) -> Result<MoveOutcome> {
        let _gate = self.context.commit_gate.lock().await;
        let stage_id = operation.source_stage_id.clone();
        let opportunity_id = operation.opportunity.id.clone();

        let destination_index = {
            let mut columns = self.columns.write().await;
            let current = find_opportunity(&columns, &stage_id, &opportunity_id)?.clone();
            place_opportunity(&mut columns, current, &stage_id, &stage_id, operation.destination_index)?
        };

        lifecycle.advance(MoveState::Idle)?;
        tracing::debug!(opportunity = %opportunity_id, stage = %stage_id, destination_index, "opportunity reordered");
        Ok(MoveOutcome::Reordered {
            opportunity_id,
            stage_id,
            destination_index,
            history: lifecycle.into_history(),
        })
    }

    async fn commit(
        &self,
        mut lifecycle: MoveLifecycle,
        operation: DragOperation,
        input: OpportunityPatch,
    ) -> Result<MoveOutcome> {
        let _gate = self.context.commit_gate.lock().await;

        // An earlier queued move may have changed the lists while we waited
        {
            let columns = self.columns.read().await;
            find_movable_opportunity(&columns, &operation.source_stage_id, &operation.opportunity.id)?;
            find_column(&columns, &operation.destination_stage.id)?;
        }

        lifecycle.advance(MoveState::Committing)?;
        let _dragging = DraggingFlag::raise(&self.context.is_dragging);

        match self.persist(&operation, &input).await {
            Ok(stored) => self.reconcile(lifecycle, &operation, stored).await,
            Err(error) => self.roll_back(lifecycle, error).await,
        }
    }

    /// Remote half of a commit: persist the move, then run stage-entry processing
    async fn persist(&self, operation: &DragOperation, input: &OpportunityPatch) -> Result<Opportunity> {
        let opportunity_id = &operation.opportunity.id;
        let destination_id = &operation.destination_stage.id;
        let patch = input.clone().with_stage(destination_id);

        let stored = if input.has_field_updates() {
            self.store.update(opportunity_id, &patch).await
        } else {
            self.store.move_to_stage(opportunity_id, destination_id).await
        };
        stored.map_err(|e| FunnelError::Persistence(e.to_string()))?;

        let merged = operation.opportunity.clone().with_patch(&patch);
        let processed = self
            .store
            .process_stage_requirements(&merged, destination_id)
            .await
            .map_err(|e| FunnelError::SideEffect(e.to_string()))?;

        Ok(processed.unwrap_or(merged))
    }

    async fn reconcile(
        &self,
        mut lifecycle: MoveLifecycle,
        operation: &DragOperation,
        stored: Opportunity,
    ) -> Result<MoveOutcome> {
        lifecycle.advance(MoveState::Reconciled)?;

        let source_id = operation.source_stage_id.clone();
        let destination_id = operation.destination_stage.id.clone();
        let placed = stored.with_stage_change_timestamp();

        let placement = {
            let mut columns = self.columns.write().await;
            place_opportunity(
                &mut columns,
                placed.clone(),
                &source_id,
                &destination_id,
                operation.destination_index,
            )
        };

        let destination_index = match placement {
            Ok(index) => index,
            Err(error) => {
                // Stored but not placeable locally; take the store's lists instead
                tracing::warn!(%error, opportunity = %placed.id, "local placement failed after commit");
                self.resynchronize().await;
                let columns = self.columns.read().await;
                find_column(&columns, &destination_id)
                    .ok()
                    .and_then(|c| c.position(&placed.id))
                    .unwrap_or(0)
            }
        };

        lifecycle.advance(MoveState::Idle)?;
        tracing::info!(
            opportunity = %placed.id,
            from = %source_id,
            to = %destination_id,
            destination_index,
            "opportunity moved"
        );

        Ok(MoveOutcome::Reconciled {
            opportunity: placed,
            source_stage_id: source_id,
            destination_stage_id: destination_id,
            destination_index,
            stage_name: operation.destination_stage.name.clone(),
            history: lifecycle.into_history(),
        })
    }

    async fn roll_back(&self, mut lifecycle: MoveLifecycle, error: FunnelError) -> Result<MoveOutcome> {
        let failure = MoveFailure::from_error(&error);
        tracing::error!(kind = %failure.kind, %error, "move failed, resynchronizing stages");

        lifecycle.advance(MoveState::RolledBack)?;
        let resync = self.resynchronize().await;
        lifecycle.advance(MoveState::Idle)?;

        Ok(MoveOutcome::RolledBack {
            failure,
            resync,
            history: lifecycle.into_history(),
        })
    }

    /// Refetch every stage list from the store.
    ///
    /// Lists that fetched fine are applied even if others failed; failures
    /// are logged and reported, never retried.
    async fn resynchronize(&self) -> ResyncStatus {
        let stage_ids: Vec<String> = self
            .columns
            .read()
            .await
            .iter()
            .map(|c| c.stage.id.clone())
            .collect();

        let mut fetched = Vec::with_capacity(stage_ids.len());
        let mut failed = Vec::new();
        let mut last_error = None;

        for stage_id in stage_ids {
            match self
                .store
                .get_by_stage_id(&stage_id, self.config.resync_include_archived)
                .await
            {
                Ok(list) => fetched.push((stage_id, list)),
                Err(e) => {
                    let error = FunnelError::Reconciliation(format!("stage {}: {}", stage_id, e));
                    tracing::error!(kind = "reconciliation", stage = %stage_id, %error, "stage refetch failed");
                    failed.push(stage_id);
                    last_error = Some(error);
                }
            }
        }

        {
            let mut columns = self.columns.write().await;
            for (stage_id, list) in fetched {
                if let Some(column) = columns.iter_mut().find(|c| c.stage.id == stage_id) {
                    column.opportunities = list;
                }
            }
        }

        match last_error {
            None => ResyncStatus::Resynced,
            Some(error) => ResyncStatus::Failed {
                stages: failed,
                message: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DragPrompt, ReasonKind};
    use crate::schemas::Board;
    use crate::store::{MemoryStore, StoreOp};
    use serde_json::json;

    fn make_board() -> Board {
        let mut board = Board::starter();
        for (id, stage) in [
            ("l1", "lead"),
            ("l2", "lead"),
            ("q1", "qualified"),
            ("q2", "qualified"),
            ("q3", "qualified"),
            ("n1", "negotiation"),
        ] {
            board.opportunities.push(Opportunity::new(id, "sales", stage, id));
        }
        board
    }

    async fn setup() -> (Arc<MemoryStore>, MoveExecutor) {
        let store = Arc::new(MemoryStore::new(make_board(), Config::default()));
        let executor = MoveExecutor::load(store.clone(), Config::default()).await.unwrap();
        (store, executor)
    }

    async fn ids(executor: &MoveExecutor, stage_id: &str) -> Vec<String> {
        let columns = executor.columns().await;
        find_column(&columns, stage_id)
            .unwrap()
            .opportunities
            .iter()
            .map(|o| o.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_unconstrained_move_commits_and_places() {
        let (store, executor) = setup().await;
        let before = chrono::Utc::now();

        let outcome = executor.handle_opportunity_drag("l1", "lead", "qualified", 2).await;

        assert!(outcome.is_reconciled());
        assert_eq!(
            outcome.history(),
            &[
                MoveState::Idle,
                MoveState::Validating,
                MoveState::Committing,
                MoveState::Reconciled,
                MoveState::Idle,
            ]
        );
        assert_eq!(
            outcome.notification().unwrap().message(),
            "Opportunity moved to Qualified"
        );
        match &outcome {
            MoveOutcome::Reconciled {
                opportunity,
                destination_index,
                ..
            } => {
                assert_eq!(opportunity.stage_id, "qualified");
                assert!(opportunity.last_stage_change_at >= before);
                assert_eq!(*destination_index, 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        assert_eq!(ids(&executor, "lead").await, vec!["l2"]);
        assert_eq!(ids(&executor, "qualified").await, vec!["q1", "q2", "l1", "q3"]);
        assert_eq!(store.call_count(StoreOp::Move), 1);
        assert_eq!(store.call_count(StoreOp::Update), 0);
        assert_eq!(store.call_count(StoreOp::Process), 1);
        assert_eq!(store.snapshot().await.opportunity("l1").unwrap().stage_id, "qualified");
        assert!(!executor.is_dragging());
    }

    #[tokio::test]
    async fn test_required_field_pauses_then_commits_with_input() {
        let (store, executor) = setup().await;
        let columns_before = executor.columns().await;

        let outcome = executor.handle_opportunity_drag("l1", "lead", "proposal", 0).await;
        assert_eq!(outcome.state(), MoveState::AwaitingUserInput);
        assert!(outcome.notification().is_none());

        let pending = outcome.pending().unwrap();
        assert_eq!(pending.prompt(), DragPrompt::RequiredFields { reason: None });
        assert_eq!(pending.operation.missing_fields()[0].name, "budget");
        assert_eq!(pending.operation.missing_tasks()[0].id, "proposal-discovery");
        assert_eq!(store.write_calls(), 0);
        assert_eq!(executor.columns().await, columns_before);

        let input = OpportunityPatch::default()
            .with_custom_field("budget", json!(5000))
            .with_completed_task("proposal-discovery");
        let outcome = executor.resume(pending, input).await;

        assert!(outcome.is_reconciled());
        assert_eq!(
            outcome.history(),
            &[
                MoveState::Idle,
                MoveState::Validating,
                MoveState::AwaitingUserInput,
                MoveState::Committing,
                MoveState::Reconciled,
                MoveState::Idle,
            ]
        );
        assert_eq!(store.call_count(StoreOp::Update), 1);
        assert_eq!(store.call_count(StoreOp::Move), 0);

        let stored = store.snapshot().await;
        let opp = stored.opportunity("l1").unwrap();
        assert_eq!(opp.stage_id, "proposal");
        assert_eq!(opp.custom_fields.get("budget"), Some(&json!(5000)));
        assert_eq!(opp.scheduled_tasks.len(), 1);

        let columns = executor.columns().await;
        let placed = find_opportunity(&columns, "proposal", "l1").unwrap();
        assert_eq!(placed.custom_fields.get("budget"), Some(&json!(5000)));
        assert!(placed.scheduled_tasks[0].completed);
    }

    #[tokio::test]
    async fn test_partial_input_keeps_move_pending() {
        let (store, executor) = setup().await;
        let pending = executor
            .handle_opportunity_drag("l1", "lead", "proposal", 0)
            .await
            .pending()
            .unwrap();

        let outcome = executor
            .resume(pending, OpportunityPatch::default().with_custom_field("budget", json!(100)))
            .await;
        let pending = outcome.pending().unwrap();
        assert!(pending.operation.missing_fields().is_empty());
        assert_eq!(pending.operation.missing_tasks().len(), 1);
        assert!(pending.issue.is_some());
        assert_eq!(pending.state(), MoveState::AwaitingUserInput);
        assert_eq!(store.write_calls(), 0);

        // The earlier budget is kept across resumes
        let outcome = executor
            .resume(pending, OpportunityPatch::default().with_completed_task("proposal-discovery"))
            .await;
        assert!(outcome.is_reconciled());
        let stored = store.snapshot().await;
        assert_eq!(
            stored.opportunity("l1").unwrap().custom_fields.get("budget"),
            Some(&json!(100))
        );
    }

    #[tokio::test]
    async fn test_mistyped_value_keeps_move_pending() {
        let (store, executor) = setup().await;
        let pending = executor
            .handle_opportunity_drag("l1", "lead", "proposal", 0)
            .await
            .pending()
            .unwrap();

        let input = OpportunityPatch::default()
            .with_custom_field("budget", json!("lots"))
            .with_completed_task("proposal-discovery");
        let pending = executor.resume(pending, input).await.pending().unwrap();

        let issue = pending.issue.clone().unwrap();
        assert!(issue.contains("budget"));
        assert!(issue.contains("expected a number"));
        assert_eq!(store.write_calls(), 0);

        let fixed = OpportunityPatch::default().with_custom_field("budget", json!("2500"));
        assert!(executor.resume(pending, fixed).await.is_reconciled());

        // Numeric text is stored as a number
        assert_eq!(
            store.snapshot().await.opportunity("l1").unwrap().custom_fields.get("budget"),
            Some(&json!(2500))
        );
    }

    #[tokio::test]
    async fn test_archived_opportunity_cannot_be_moved() {
        let mut board = make_board();
        board
            .opportunities
            .push(Opportunity::new("a1", "sales", "lead", "Shelved").with_archived(true));
        let config = Config {
            resync_include_archived: true,
            ..Config::default()
        };
        let store = Arc::new(MemoryStore::new(board, config.clone()));
        let executor = MoveExecutor::load(store.clone(), config).await.unwrap();
        assert!(ids(&executor, "lead").await.contains(&"a1".to_string()));

        let outcome = executor.handle_opportunity_drag("a1", "lead", "qualified", 0).await;
        match &outcome {
            MoveOutcome::Aborted { error } => {
                assert!(matches!(error, FunnelError::OpportunityArchived(_)))
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let archived = store.snapshot().await.opportunity("a1").unwrap().clone();
        let outcome = executor
            .complete_opportunity_move(&archived, "lead", "qualified", 0, None)
            .await;
        assert!(matches!(outcome, MoveOutcome::Aborted { .. }));

        assert_eq!(store.write_calls(), 0);
        assert_eq!(store.snapshot().await.opportunity("a1").unwrap().stage_id, "lead");
    }

    #[tokio::test]
    async fn test_commit_keeps_edits_made_in_the_store() {
        let (store, executor) = setup().await;
        store
            .edit(|board| {
                if let Some(opp) = board.opportunities.iter_mut().find(|o| o.id == "l1") {
                    opp.title = "Renamed".to_string();
                    opp.value = 42.0;
                }
            })
            .await;

        let pending = executor
            .handle_opportunity_drag("l1", "lead", "proposal", 0)
            .await
            .pending()
            .unwrap();
        let input = OpportunityPatch::default()
            .with_custom_field("budget", json!(5000))
            .with_completed_task("proposal-discovery");
        let outcome = executor.resume(pending, input).await;

        match &outcome {
            MoveOutcome::Reconciled { opportunity, .. } => {
                assert_eq!(opportunity.title, "Renamed");
                assert_eq!(opportunity.scheduled_tasks.len(), 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let stored = store.snapshot().await;
        let opp = stored.opportunity("l1").unwrap();
        assert_eq!(opp.title, "Renamed");
        assert_eq!(opp.value, 42.0);
        assert_eq!(opp.custom_fields.get("budget"), Some(&json!(5000)));
    }

    #[tokio::test]
    async fn test_refetch_places_moved_record_last() {
        let (_store, executor) = setup().await;

        let outcome = executor.handle_opportunity_drag("l1", "lead", "qualified", 0).await;
        assert!(outcome.is_reconciled());
        assert_eq!(ids(&executor, "qualified").await, vec!["l1", "q1", "q2", "q3"]);

        // The store keeps no per-stage position; a moved record is listed last
        executor.refresh().await.unwrap();
        assert_eq!(ids(&executor, "qualified").await, vec!["q1", "q2", "q3", "l1"]);
    }

    #[tokio::test]
    async fn test_reason_only_prompt_for_win_stage() {
        let (store, executor) = setup().await;

        let pending = executor
            .handle_opportunity_drag("n1", "negotiation", "won", 0)
            .await
            .pending()
            .unwrap();
        assert_eq!(pending.prompt(), DragPrompt::ReasonOnly(ReasonKind::Win));

        let blank = OpportunityPatch::default().with_win_reason("   ");
        let pending = executor.resume(pending, blank).await.pending().unwrap();
        assert_eq!(pending.prompt(), DragPrompt::ReasonOnly(ReasonKind::Win));
        assert_eq!(store.write_calls(), 0);

        let outcome = executor
            .resume(pending, OpportunityPatch::default().with_win_reason("Best price"))
            .await;
        assert!(outcome.is_reconciled());
        assert_eq!(
            store.snapshot().await.opportunity("n1").unwrap().win_reason.as_deref(),
            Some("Best price")
        );
    }

    #[tokio::test]
    async fn test_cancel_discards_pending_move() {
        let (store, executor) = setup().await;
        let columns_before = executor.columns().await;

        let pending = executor
            .handle_opportunity_drag("l1", "lead", "lost", 0)
            .await
            .pending()
            .unwrap();
        let outcome = executor.cancel(pending);

        assert!(matches!(outcome, MoveOutcome::Cancelled { .. }));
        assert_eq!(outcome.history().last(), Some(&MoveState::Idle));
        assert!(outcome.notification().is_none());
        assert_eq!(store.write_calls(), 0);
        assert_eq!(executor.columns().await, columns_before);
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_without_store_calls() {
        let (store, executor) = setup().await;

        let outcome = executor.handle_opportunity_drag("ghost", "lead", "qualified", 0).await;
        match &outcome {
            MoveOutcome::Aborted { error } => {
                assert!(matches!(error, FunnelError::OpportunityNotFound(_)))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!outcome.notification().unwrap().is_success());

        let outcome = executor.handle_opportunity_drag("l1", "lead", "nowhere", 0).await;
        assert!(matches!(
            outcome,
            MoveOutcome::Aborted {
                error: FunnelError::StageNotFound(_)
            }
        ));

        assert_eq!(store.write_calls(), 0);
        assert_eq!(store.call_count(StoreOp::Fetch), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back_to_store_state() {
        let (store, executor) = setup().await;
        store.fail_on(StoreOp::Move);
        store
            .edit(|board| {
                board
                    .opportunities
                    .push(Opportunity::new("q4", "sales", "qualified", "Added elsewhere"))
            })
            .await;

        let outcome = executor.handle_opportunity_drag("l1", "lead", "qualified", 0).await;

        assert!(outcome.is_rolled_back());
        assert_eq!(
            outcome.history(),
            &[
                MoveState::Idle,
                MoveState::Validating,
                MoveState::Committing,
                MoveState::RolledBack,
                MoveState::Idle,
            ]
        );
        match &outcome {
            MoveOutcome::RolledBack { failure, resync, .. } => {
                assert_eq!(failure.kind, FailureKind::Persistence);
                assert_eq!(*resync, ResyncStatus::Resynced);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(
            outcome.notification().unwrap().message(),
            "Failed to move opportunity"
        );

        let expected = columns_from_board(&store.snapshot().await, false);
        assert_eq!(executor.columns().await, expected);
        assert_eq!(ids(&executor, "lead").await, vec!["l1", "l2"]);
        assert_eq!(ids(&executor, "qualified").await, vec!["q1", "q2", "q3", "q4"]);
        assert!(!executor.is_dragging());
    }

    #[tokio::test]
    async fn test_side_effect_failure_rolls_back_after_move_was_stored() {
        let (store, executor) = setup().await;
        store.fail_on(StoreOp::Process);

        let outcome = executor.handle_opportunity_drag("l1", "lead", "qualified", 0).await;

        match &outcome {
            MoveOutcome::RolledBack { failure, .. } => {
                assert_eq!(failure.kind, FailureKind::SideEffect)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // The move itself went through, so the refetched lists show it
        assert_eq!(ids(&executor, "lead").await, vec!["l2"]);
        assert!(ids(&executor, "qualified").await.contains(&"l1".to_string()));
    }

    #[tokio::test]
    async fn test_failed_resync_is_reported() {
        let (store, executor) = setup().await;
        let columns_before = executor.columns().await;
        store.fail_on(StoreOp::Move);
        store.fail_on(StoreOp::Fetch);

        let outcome = executor.handle_opportunity_drag("l1", "lead", "qualified", 0).await;

        match &outcome {
            MoveOutcome::RolledBack {
                resync: ResyncStatus::Failed { stages, message },
                ..
            } => {
                assert_eq!(stages.len(), columns_before.len());
                assert!(message.contains("Reconciliation"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(executor.columns().await, columns_before);
        assert_eq!(outcome.state(), MoveState::Idle);
    }

    #[tokio::test]
    async fn test_reorder_within_stage_stays_local() {
        let (store, executor) = setup().await;

        let outcome = executor
            .handle_opportunity_drag("q1", "qualified", "qualified", 2)
            .await;

        match &outcome {
            MoveOutcome::Reordered {
                destination_index, ..
            } => assert_eq!(*destination_index, 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(
            outcome.history(),
            &[MoveState::Idle, MoveState::Validating, MoveState::Idle]
        );
        assert_eq!(ids(&executor, "qualified").await, vec!["q2", "q3", "q1"]);
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_complete_move_with_supplied_fields() {
        let (store, executor) = setup().await;
        let opportunity = store.snapshot().await.opportunity("l1").unwrap().clone();
        let fields = OpportunityPatch::default()
            .with_custom_field("budget", json!(900))
            .with_completed_task("proposal-discovery");

        let outcome = executor
            .complete_opportunity_move(&opportunity, "lead", "proposal", 99, Some(fields))
            .await;

        match &outcome {
            MoveOutcome::Reconciled {
                destination_index, ..
            } => assert_eq!(*destination_index, 0),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.call_count(StoreOp::Update), 1);
    }

    #[tokio::test]
    async fn test_complete_move_without_fields_still_checks_requirements() {
        let (store, executor) = setup().await;
        let opportunity = store.snapshot().await.opportunity("n1").unwrap().clone();

        let outcome = executor
            .complete_opportunity_move(&opportunity, "negotiation", "lost", 0, None)
            .await;

        let pending = outcome.pending().unwrap();
        assert_eq!(pending.prompt(), DragPrompt::ReasonOnly(ReasonKind::Loss));
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_moves_are_serialized() {
        let (store, executor) = setup().await;

        let (first, second) = tokio::join!(
            executor.handle_opportunity_drag("l1", "lead", "qualified", 0),
            executor.handle_opportunity_drag("l2", "lead", "negotiation", 0),
        );

        assert!(first.is_reconciled());
        assert!(second.is_reconciled());
        assert!(ids(&executor, "lead").await.is_empty());
        assert_eq!(ids(&executor, "negotiation").await, vec!["l2", "n1"]);
        assert_eq!(store.call_count(StoreOp::Move), 2);
        assert!(!executor.is_dragging());
    }

    #[tokio::test]
    async fn test_queued_move_of_same_opportunity_is_rejected() {
        let (store, executor) = setup().await;

        let (first, second) = tokio::join!(
            executor.handle_opportunity_drag("l1", "lead", "qualified", 0),
            executor.handle_opportunity_drag("l1", "lead", "negotiation", 0),
        );

        let reconciled = [&first, &second].iter().filter(|o| o.is_reconciled()).count();
        let aborted = [&first, &second]
            .iter()
            .filter(|o| matches!(o, MoveOutcome::Aborted { .. }))
            .count();
        assert_eq!((reconciled, aborted), (1, 1));
        assert_eq!(store.call_count(StoreOp::Move), 1);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_store_changes() {
        let (store, executor) = setup().await;
        store
            .edit(|board| {
                board
                    .opportunities
                    .push(Opportunity::new("l3", "sales", "lead", "Three"))
            })
            .await;

        assert_eq!(ids(&executor, "lead").await.len(), 2);
        executor.refresh().await.unwrap();
        assert_eq!(ids(&executor, "lead").await, vec!["l1", "l2", "l3"]);
    }
}
