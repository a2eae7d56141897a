//! Move command - Move an opportunity to another stage

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::find_opportunity;
use crate::errors::{FunnelError, Result};
use crate::executor::{MoveExecutor, MoveOutcome, PendingMove, ResyncStatus};
use crate::fs::read_board;
use crate::schemas::OpportunityPatch;
use crate::store::{JsonFileStore, MemoryStore, PipelineStore};

use super::check::describe_requirements;
use super::{locate, open_board};

/// Arguments of `funnelboard move`
#[derive(Debug, Clone, Default)]
pub struct MoveArgs {
    pub id: String,
    pub to: String,
    /// Defaults to the end of the destination stage
    pub index: Option<usize>,
    /// `name=value` pairs
    pub fields: Vec<String>,
    pub tasks: Vec<String>,
    pub win_reason: Option<String>,
    pub loss_reason: Option<String>,
}

impl MoveArgs {
    /// Build the patch the user supplied on the command line
    pub fn input(&self) -> Result<OpportunityPatch> {
        let mut patch = OpportunityPatch::default();
        for arg in &self.fields {
            let (name, value) = parse_field(arg)?;
            patch = patch.with_custom_field(&name, value);
        }
        for task in &self.tasks {
            patch = patch.with_completed_task(task);
        }
        if let Some(reason) = &self.win_reason {
            patch = patch.with_win_reason(reason);
        }
        if let Some(reason) = &self.loss_reason {
            patch = patch.with_loss_reason(reason);
        }
        Ok(patch)
    }
}

/// Split `name=value`; the value is read as JSON when it parses, as text otherwise
pub fn parse_field(arg: &str) -> Result<(String, Value)> {
    let (name, raw) = arg
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| FunnelError::InvalidFieldValue {
            field: arg.to_string(),
            message: "expected NAME=VALUE".to_string(),
        })?;

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.trim().to_string(), value))
}

/// Move with the input given in `args`.
///
/// Without input this is a plain drag, which may pause for what the stage
/// asks for. With input the move is completed with it, so values are stored
/// even when the stage asks for nothing.
pub async fn move_opportunity(executor: &MoveExecutor, args: &MoveArgs) -> Result<MoveOutcome> {
    let input = args.input()?;
    let (opportunity, source_stage_id) = {
        let columns = executor.columns().await;
        let source = locate(&columns, &args.id)?;
        let opportunity = find_opportunity(&columns, &source.stage.id, &args.id)?.clone();
        (opportunity, source.stage.id.clone())
    };
    let index = args.index.unwrap_or(usize::MAX);

    let outcome = if input.has_field_updates() {
        executor
            .complete_opportunity_move(&opportunity, &source_stage_id, &args.to, index, Some(input))
            .await
    } else {
        executor
            .handle_opportunity_drag(&args.id, &source_stage_id, &args.to, index)
            .await
    };
    Ok(outcome)
}

fn still_missing(pending: &PendingMove) -> FunnelError {
    let mut parts = describe_requirements(&pending.operation.requirements);
    if let Some(issue) = &pending.issue {
        if parts.is_empty() {
            parts.push(issue.clone());
        }
    }
    FunnelError::InputRequired(parts.join(", "))
}

/// Move an opportunity, writing the board unless `dry_run` is set
pub async fn run(cwd: Option<&Path>, args: MoveArgs, dry_run: bool) -> Result<()> {
    let (root, config) = open_board(cwd)?;
    let store: Arc<dyn PipelineStore> = if dry_run {
        Arc::new(MemoryStore::new(read_board(&root)?, config.clone()))
    } else {
        Arc::new(JsonFileStore::new(&root, config.clone()))
    };
    let executor = MoveExecutor::load(store, config).await?;

    let outcome = move_opportunity(&executor, &args).await?;
    if let Some(notification) = outcome.notification().filter(|n| n.is_success()) {
        println!("{}", notification.message());
    }

    match outcome {
        MoveOutcome::Reconciled {
            destination_index, ..
        } => {
            if dry_run {
                println!("(dry run) would land at position {}; board not written", destination_index);
            }
            Ok(())
        }
        MoveOutcome::Reordered {
            destination_index, ..
        } => {
            println!("Reordered to position {}", destination_index);
            Ok(())
        }
        MoveOutcome::AwaitingInput(pending) => Err(still_missing(&pending)),
        MoveOutcome::RolledBack {
            failure, resync, ..
        } => {
            if let ResyncStatus::Failed { stages, .. } = &resync {
                eprintln!("Could not refresh stages: {}", stages.join(", "));
            }
            Err(FunnelError::wrap(failure.message, "move rolled back"))
        }
        MoveOutcome::Aborted { error } => Err(error),
        MoveOutcome::Cancelled { .. } => Ok(()),
    }
}
