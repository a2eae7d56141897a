//! Store operations applied to an in-memory board document
//!
//! Shared by the memory and JSON file stores so both behave identically.

use chrono::{Duration, Utc};

use crate::errors::{FunnelError, Result};
use crate::schemas::{Board, Config, Opportunity, OpportunityPatch, ScheduledTask, Stage};

/// Apply a partial update to the stored opportunity.
///
/// A stage change moves the record to the end of the board's list so it
/// shows last in the destination stage until the next reorder.
pub(crate) fn apply_update(
    board: &mut Board,
    opportunity_id: &str,
    patch: &OpportunityPatch,
) -> Result<Opportunity> {
    if let Some(stage_id) = &patch.stage_id {
        if board.stage(stage_id).is_none() {
            return Err(FunnelError::StageNotFound(stage_id.clone()));
        }
    }

    let index = board
        .opportunities
        .iter()
        .position(|o| o.id == opportunity_id)
        .ok_or_else(|| FunnelError::OpportunityNotFound(opportunity_id.to_string()))?;

    let current = board.opportunities.remove(index);
    let stage_changed = patch.stage_id.as_ref().is_some_and(|s| *s != current.stage_id);
    let updated = current.with_patch(patch);

    if stage_changed {
        board.opportunities.push(updated.clone());
    } else {
        board.opportunities.insert(index, updated.clone());
    }
    Ok(updated)
}

/// Opportunities of one stage in stored order.
///
/// # Errors
/// * `StageNotFound` - If the stage does not exist
pub(crate) fn stage_list(board: &Board, stage_id: &str, include_archived: bool) -> Result<Vec<Opportunity>> {
    if board.stage(stage_id).is_none() {
        return Err(FunnelError::StageNotFound(stage_id.to_string()));
    }
    Ok(board
        .opportunities_in_stage(stage_id, include_archived)
        .into_iter()
        .cloned()
        .collect())
}

/// Run stage-entry processing on the stored record and store the result.
///
/// Only the id of `opportunity` is used; tasks are generated on the record
/// as the store holds it, so edits the caller has not seen are kept.
pub(crate) fn process_requirements(
    board: &mut Board,
    config: &Config,
    opportunity: &Opportunity,
    stage_id: &str,
) -> Result<Option<Opportunity>> {
    let stage = board
        .stage(stage_id)
        .ok_or_else(|| FunnelError::StageNotFound(stage_id.to_string()))?;

    if !config.auto_generate_tasks {
        return Ok(None);
    }

    let slot = board
        .opportunities
        .iter()
        .position(|o| o.id == opportunity.id)
        .ok_or_else(|| FunnelError::OpportunityNotFound(opportunity.id.clone()))?;

    let stored = &board.opportunities[slot];
    let processed = match generate_stage_tasks(stage, stored, config.default_task_duration_days) {
        Some(processed) => processed,
        None => return Ok(None),
    };

    board.opportunities[slot] = processed.clone();
    Ok(Some(processed))
}

/// Instantiate the stage's task definitions on an opportunity.
///
/// Tasks already scheduled for this stage are skipped; a task counts as done
/// when its id is marked complete on the opportunity. Due dates fall
/// `default_duration_days` (or the fallback) days from now.
///
/// # Returns
/// The updated opportunity, or None if no task was added
pub fn generate_stage_tasks(
    stage: &Stage,
    opportunity: &Opportunity,
    fallback_duration_days: u32,
) -> Option<Opportunity> {
    let now = Utc::now();
    let new_tasks: Vec<ScheduledTask> = stage
        .required_tasks
        .iter()
        .filter(|task| {
            !opportunity
                .scheduled_tasks
                .iter()
                .any(|s| s.task_id == task.id && s.stage_id == stage.id)
        })
        .map(|task| {
            let days = task.default_duration_days.unwrap_or(fallback_duration_days);
            ScheduledTask {
                task_id: task.id.clone(),
                stage_id: stage.id.clone(),
                name: task.name.clone(),
                due_at: now + Duration::days(i64::from(days)),
                completed: opportunity.completed_tasks.get(&task.id).copied().unwrap_or(false),
            }
        })
        .collect();

    if new_tasks.is_empty() {
        return None;
    }

    let mut updated = opportunity.clone();
    updated.scheduled_tasks.extend(new_tasks);
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::RequiredTask;
    use serde_json::json;

    fn make_board() -> Board {
        let mut board = Board::starter();
        board.opportunities.push(Opportunity::new("o1", "sales", "lead", "One"));
        board.opportunities.push(Opportunity::new("o2", "sales", "lead", "Two"));
        board.opportunities.push(Opportunity::new("o3", "sales", "qualified", "Three"));
        board
    }

    #[test]
    fn test_apply_update_moves_record_to_destination_tail() {
        let mut board = make_board();
        let patch = OpportunityPatch::default()
            .with_stage("qualified")
            .with_custom_field("budget", json!(10));

        let updated = apply_update(&mut board, "o1", &patch).unwrap();
        assert_eq!(updated.stage_id, "qualified");

        let ids: Vec<String> = stage_list(&board, "qualified", false)
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["o3", "o1"]);
        assert_eq!(board.opportunity("o1").unwrap().custom_fields.get("budget"), Some(&json!(10)));
    }

    #[test]
    fn test_apply_update_keeps_position_without_stage_change() {
        let mut board = make_board();
        let patch = OpportunityPatch {
            title: Some("Renamed".to_string()),
            ..OpportunityPatch::default()
        };

        apply_update(&mut board, "o1", &patch).unwrap();
        assert_eq!(board.opportunities[0].title, "Renamed");
    }

    #[test]
    fn test_apply_update_unknown_targets() {
        let mut board = make_board();
        let to_nowhere = OpportunityPatch::default().with_stage("nowhere");
        assert!(matches!(
            apply_update(&mut board, "o1", &to_nowhere).unwrap_err(),
            FunnelError::StageNotFound(_)
        ));
        assert!(matches!(
            apply_update(&mut board, "ghost", &OpportunityPatch::default()).unwrap_err(),
            FunnelError::OpportunityNotFound(_)
        ));
    }

    #[test]
    fn test_stage_list_unknown_stage() {
        assert!(stage_list(&make_board(), "nowhere", false).is_err());
    }

    #[test]
    fn test_generate_stage_tasks() {
        let stage = Stage::new("proposal", "sales", "Proposal", 2)
            .with_required_task(RequiredTask::new("t1", "proposal", "Call").with_duration_days(3))
            .with_required_task(RequiredTask::new("t2", "proposal", "Deck"));
        let opp = Opportunity::new("o1", "sales", "proposal", "One").with_completed_task("t1");

        let updated = generate_stage_tasks(&stage, &opp, 1).unwrap();
        assert_eq!(updated.scheduled_tasks.len(), 2);
        assert!(updated.scheduled_tasks[0].completed);
        assert!(!updated.scheduled_tasks[1].completed);
        assert!(updated.scheduled_tasks[0].due_at > updated.scheduled_tasks[1].due_at);

        // Second pass adds nothing
        assert!(generate_stage_tasks(&stage, &updated, 1).is_none());
    }

    #[test]
    fn test_generate_stage_tasks_without_definitions() {
        let stage = Stage::new("lead", "sales", "Lead", 0);
        let opp = Opportunity::new("o1", "sales", "lead", "One");
        assert!(generate_stage_tasks(&stage, &opp, 1).is_none());
    }

    #[test]
    fn test_process_requirements_keeps_stored_edits() {
        let mut board = make_board();
        let stale = board.opportunity("o1").unwrap().clone().with_stage("proposal");
        apply_update(
            &mut board,
            "o1",
            &OpportunityPatch {
                title: Some("Renamed".to_string()),
                value: Some(42.0),
                ..Default::default()
            }
            .with_stage("proposal"),
        )
        .unwrap();

        let processed = process_requirements(&mut board, &Config::default(), &stale, "proposal")
            .unwrap()
            .unwrap();
        assert_eq!(processed.title, "Renamed");

        let stored = board.opportunity("o1").unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.value, 42.0);
        assert_eq!(stored.scheduled_tasks.len(), 1);
    }

    #[test]
    fn test_process_requirements_respects_config() {
        let mut board = make_board();
        let opp = board.opportunity("o1").unwrap().clone().with_stage("proposal");
        let config = Config {
            auto_generate_tasks: false,
            ..Config::default()
        };

        assert!(process_requirements(&mut board, &config, &opp, "proposal").unwrap().is_none());

        let processed = process_requirements(&mut board, &Config::default(), &opp, "proposal")
            .unwrap()
            .unwrap();
        assert_eq!(processed.scheduled_tasks.len(), 1);
        assert_eq!(board.opportunity("o1").unwrap().scheduled_tasks.len(), 1);
    }
}
