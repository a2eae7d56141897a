//! Stage entry requirements
//!
//! Pure checks of an opportunity against the fields, tasks and reasons a
//! destination stage asks for.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schemas::{Opportunity, RequiredField, RequiredTask, Stage};

/// Which closing reason a stage asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Win,
    Loss,
}

impl std::fmt::Display for ReasonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonKind::Win => write!(f, "win"),
            ReasonKind::Loss => write!(f, "loss"),
        }
    }
}

/// Unmet requirements of a destination stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementCheck {
    /// Required fields whose value is absent or empty
    pub missing_fields: Vec<RequiredField>,

    /// Required tasks not marked complete
    pub missing_tasks: Vec<RequiredTask>,

    /// Closing reason the stage asks for and the opportunity lacks
    pub missing_reason: Option<ReasonKind>,
}

impl RequirementCheck {
    /// Whether a win or loss reason is still needed
    pub fn requires_reason(&self) -> bool {
        self.missing_reason.is_some()
    }

    /// Whether anything at all blocks the move
    pub fn has_any_requirement(&self) -> bool {
        !self.missing_fields.is_empty() || !self.missing_tasks.is_empty() || self.requires_reason()
    }

    /// Whether a reason is the only thing missing
    pub fn requires_only_reason(&self) -> bool {
        self.requires_reason() && self.missing_fields.is_empty() && self.missing_tasks.is_empty()
    }
}

/// Check whether a custom-field value counts as empty.
///
/// Absent, null, blank strings, empty arrays and empty objects are empty.
/// `false` and `0` are real answers and count as present.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

fn has_reason(reason: Option<&String>) -> bool {
    reason.is_some_and(|r| !r.trim().is_empty())
}

/// Required fields of the stage the opportunity has not filled in
pub fn missing_required_fields(opportunity: &Opportunity, stage: &Stage) -> Vec<RequiredField> {
    stage
        .required_fields
        .iter()
        .filter(|f| f.is_required && is_empty_value(opportunity.custom_fields.get(&f.name)))
        .cloned()
        .collect()
}

/// Required tasks of the stage the opportunity has not completed
pub fn missing_required_tasks(opportunity: &Opportunity, stage: &Stage) -> Vec<RequiredTask> {
    stage
        .required_tasks
        .iter()
        .filter(|t| t.is_required && !opportunity.completed_tasks.get(&t.id).copied().unwrap_or(false))
        .cloned()
        .collect()
}

/// The closing reason the stage asks for, if the opportunity lacks it
pub fn required_reason(opportunity: &Opportunity, stage: &Stage) -> Option<ReasonKind> {
    if stage.is_win_stage && stage.win_reason_required && !has_reason(opportunity.win_reason.as_ref()) {
        return Some(ReasonKind::Win);
    }
    if stage.is_loss_stage && stage.loss_reason_required && !has_reason(opportunity.loss_reason.as_ref()) {
        return Some(ReasonKind::Loss);
    }
    None
}

/// Evaluate every entry requirement of a destination stage.
///
/// Pure: the same inputs always produce the same check.
pub fn evaluate_requirements(opportunity: &Opportunity, destination: &Stage) -> RequirementCheck {
    RequirementCheck {
        missing_fields: missing_required_fields(opportunity, destination),
        missing_tasks: missing_required_tasks(opportunity, destination),
        missing_reason: required_reason(opportunity, destination),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::FieldType;
    use serde_json::json;

    fn make_opportunity() -> Opportunity {
        Opportunity::new("opp-1", "sales", "lead", "Acme")
    }

    fn proposal_stage() -> Stage {
        Stage::new("proposal", "sales", "Proposal", 2)
            .with_required_field(RequiredField::new("rf-budget", "proposal", "budget", FieldType::Number))
            .with_required_field(
                RequiredField::new("rf-notes", "proposal", "notes", FieldType::Text).optional(),
            )
            .with_required_task(RequiredTask::new("t-call", "proposal", "Discovery call"))
            .with_required_task(RequiredTask::new("t-deck", "proposal", "Send deck").optional())
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&json!(null))));
        assert!(is_empty_value(Some(&json!("   "))));
        assert!(is_empty_value(Some(&json!([]))));
        assert!(is_empty_value(Some(&json!({}))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!(false))));
        assert!(!is_empty_value(Some(&json!("x"))));
        assert!(!is_empty_value(Some(&json!(["a"]))));
    }

    #[test]
    fn test_plain_stage_has_no_requirements() {
        let stage = Stage::new("qualified", "sales", "Qualified", 1);
        let check = evaluate_requirements(&make_opportunity(), &stage);
        assert!(!check.has_any_requirement());
        assert!(!check.requires_only_reason());
    }

    #[test]
    fn test_missing_field_and_task() {
        let check = evaluate_requirements(&make_opportunity(), &proposal_stage());

        let fields: Vec<&str> = check.missing_fields.iter().map(|f| f.name.as_str()).collect();
        let tasks: Vec<&str> = check.missing_tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(fields, vec!["budget"]);
        assert_eq!(tasks, vec!["t-call"]);
        assert!(check.has_any_requirement());
        assert!(!check.requires_only_reason());
    }

    #[test]
    fn test_blank_field_value_is_missing() {
        let opp = make_opportunity().with_custom_field("budget", json!(""));
        assert_eq!(missing_required_fields(&opp, &proposal_stage()).len(), 1);
    }

    #[test]
    fn test_satisfied_requirements() {
        let opp = make_opportunity()
            .with_custom_field("budget", json!(5000))
            .with_completed_task("t-call");
        assert!(!evaluate_requirements(&opp, &proposal_stage()).has_any_requirement());
    }

    #[test]
    fn test_task_marked_incomplete_is_missing() {
        let mut opp = make_opportunity();
        opp.completed_tasks.insert("t-call".to_string(), false);
        assert_eq!(missing_required_tasks(&opp, &proposal_stage()).len(), 1);
    }

    #[test]
    fn test_win_reason_only() {
        let stage = Stage::new("won", "sales", "Won", 4).as_win_stage(true);
        let check = evaluate_requirements(&make_opportunity(), &stage);

        assert_eq!(check.missing_reason, Some(ReasonKind::Win));
        assert!(check.requires_only_reason());

        let opp = make_opportunity().with_win_reason(Some("best price".to_string()));
        assert!(!evaluate_requirements(&opp, &stage).has_any_requirement());
    }

    #[test]
    fn test_blank_reason_does_not_count() {
        let stage = Stage::new("lost", "sales", "Lost", 5).as_loss_stage(true);
        let opp = make_opportunity().with_loss_reason(Some("  ".to_string()));
        assert_eq!(required_reason(&opp, &stage), Some(ReasonKind::Loss));
    }

    #[test]
    fn test_win_reason_does_not_satisfy_loss_stage() {
        let stage = Stage::new("lost", "sales", "Lost", 5).as_loss_stage(true);
        let opp = make_opportunity().with_win_reason(Some("great fit".to_string()));
        assert_eq!(required_reason(&opp, &stage), Some(ReasonKind::Loss));
    }

    #[test]
    fn test_reason_not_required_when_flag_off() {
        let stage = Stage::new("won", "sales", "Won", 4).as_win_stage(false);
        assert_eq!(required_reason(&make_opportunity(), &stage), None);
    }

    #[test]
    fn test_reason_with_missing_fields_is_not_reason_only() {
        let stage = Stage::new("won", "sales", "Won", 4)
            .as_win_stage(true)
            .with_required_field(RequiredField::new("rf-po", "won", "po_number", FieldType::Text));
        let check = evaluate_requirements(&make_opportunity(), &stage);

        assert!(check.requires_reason());
        assert!(!check.requires_only_reason());
        assert!(check.has_any_requirement());
    }
}
