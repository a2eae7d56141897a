//! Board schema - The persisted document holding funnels, stages and opportunities

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{FieldType, Funnel, Opportunity, RequiredField, RequiredTask, Stage};

/// Everything a local board file stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    #[serde(default)]
    pub funnels: Vec<Funnel>,

    #[serde(default)]
    pub stages: Vec<Stage>,

    /// Opportunities in stage-list order
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            schema_version: 1,
            funnels: Vec::new(),
            stages: Vec::new(),
            opportunities: Vec::new(),
        }
    }

    /// Create a board with one funnel of six conventional sales stages.
    ///
    /// Proposal asks for a budget and a discovery call, Won and Lost ask
    /// for a reason.
    pub fn starter() -> Self {
        let funnel_id = "sales";
        let stages = vec![
            Stage::new("lead", funnel_id, "Lead", 0).with_color("#94a3b8"),
            Stage::new("qualified", funnel_id, "Qualified", 1).with_color("#38bdf8"),
            Stage::new("proposal", funnel_id, "Proposal", 2)
                .with_color("#a78bfa")
                .with_required_field(RequiredField::new(
                    "proposal-budget",
                    "proposal",
                    "budget",
                    FieldType::Number,
                ))
                .with_required_task(
                    RequiredTask::new("proposal-discovery", "proposal", "Discovery call")
                        .with_duration_days(2),
                ),
            Stage::new("negotiation", funnel_id, "Negotiation", 3).with_color("#fbbf24"),
            Stage::new("won", funnel_id, "Won", 4)
                .with_color("#22c55e")
                .as_win_stage(true),
            Stage::new("lost", funnel_id, "Lost", 5)
                .with_color("#ef4444")
                .as_loss_stage(true),
        ];

        let funnel = stages
            .iter()
            .fold(Funnel::new(funnel_id, "Sales"), |f, s| f.with_stage(&s.id));

        Board {
            schema_version: 1,
            funnels: vec![funnel],
            stages,
            opportunities: Vec::new(),
        }
    }

    /// Look up a stage by id
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Look up an opportunity by id
    pub fn opportunity(&self, id: &str) -> Option<&Opportunity> {
        self.opportunities.iter().find(|o| o.id == id)
    }

    /// Stages of a funnel, ordered for display
    pub fn stages_in_order(&self, funnel_id: &str) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self
            .stages
            .iter()
            .filter(|s| s.funnel_id == funnel_id)
            .collect();
        stages.sort_by_key(|s| s.order);
        stages
    }

    /// Every stage across all funnels, funnel by funnel
    pub fn all_stages_in_order(&self) -> Vec<&Stage> {
        self.funnels
            .iter()
            .flat_map(|f| self.stages_in_order(&f.id))
            .collect()
    }

    /// Opportunities currently placed on a stage
    pub fn opportunities_in_stage(&self, stage_id: &str, include_archived: bool) -> Vec<&Opportunity> {
        self.opportunities
            .iter()
            .filter(|o| o.stage_id == stage_id && (include_archived || !o.archived))
            .collect()
    }

    /// Check cross-record invariants and collect every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut funnel_ids = HashSet::new();
        for funnel in &self.funnels {
            if !funnel_ids.insert(funnel.id.as_str()) {
                errors.push(format!("duplicate funnel id {}", funnel.id));
            }
            for stage_id in &funnel.stage_ids {
                if self.stage(stage_id).is_none() {
                    errors.push(format!("funnel {} lists unknown stage {}", funnel.id, stage_id));
                }
            }
        }

        let mut stage_ids = HashSet::new();
        for stage in &self.stages {
            if !stage_ids.insert(stage.id.as_str()) {
                errors.push(format!("duplicate stage id {}", stage.id));
            }
            if !funnel_ids.contains(stage.funnel_id.as_str()) {
                errors.push(format!("stage {} references unknown funnel {}", stage.id, stage.funnel_id));
            }
            if let Err(e) = stage.validate() {
                errors.push(e.to_string());
            }
            for field in &stage.required_fields {
                if field.stage_id != stage.id {
                    errors.push(format!("field {} is attached to {} but belongs to {}", field.id, stage.id, field.stage_id));
                }
            }
            for task in &stage.required_tasks {
                if task.stage_id != stage.id {
                    errors.push(format!("task {} is attached to {} but belongs to {}", task.id, stage.id, task.stage_id));
                }
            }
        }

        let mut opportunity_ids = HashSet::new();
        for opp in &self.opportunities {
            if !opportunity_ids.insert(opp.id.as_str()) {
                errors.push(format!("duplicate opportunity id {}", opp.id));
            }
            match self.stage(&opp.stage_id) {
                None => errors.push(format!("opportunity {} sits on unknown stage {}", opp.id, opp.stage_id)),
                Some(stage) if stage.funnel_id != opp.funnel_id => errors.push(format!(
                    "opportunity {} belongs to funnel {} but sits on stage {} of funnel {}",
                    opp.id, opp.funnel_id, stage.id, stage.funnel_id
                )),
                Some(_) => {}
            }
        }

        errors
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
