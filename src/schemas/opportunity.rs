//! Opportunity schema - A deal moving through a funnel

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A task instantiated on an opportunity when it enters a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Id of the stage's RequiredTask this was generated from
    pub task_id: String,

    pub stage_id: String,

    pub name: String,

    pub due_at: DateTime<Utc>,

    #[serde(default)]
    pub completed: bool,
}

/// A sales opportunity placed on one stage of a funnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,

    pub funnel_id: String,

    /// Stage the opportunity currently sits in
    pub stage_id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,

    /// Monetary value of the deal
    #[serde(default)]
    pub value: f64,

    /// Custom-field values keyed by field name
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,

    /// Completion state of stage-required tasks keyed by task id
    #[serde(default)]
    pub completed_tasks: BTreeMap<String, bool>,

    #[serde(default)]
    pub scheduled_tasks: Vec<ScheduledTask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_reason: Option<String>,

    /// Archived opportunities are kept but hidden from stage lists
    #[serde(default)]
    pub archived: bool,

    pub last_stage_change_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Create a new opportunity on the given stage
    pub fn new(id: &str, funnel_id: &str, stage_id: &str, title: &str) -> Self {
        let now = Utc::now();
        Opportunity {
            id: id.to_string(),
            funnel_id: funnel_id.to_string(),
            stage_id: stage_id.to_string(),
            title: title.to_string(),
            client_name: None,
            company: None,
            contact_email: None,
            contact_phone: None,
            value: 0.0,
            custom_fields: BTreeMap::new(),
            completed_tasks: BTreeMap::new(),
            scheduled_tasks: Vec::new(),
            win_reason: None,
            loss_reason: None,
            archived: false,
            last_stage_change_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    // ===== IMMUTABLE BUILDER METHODS =====

    /// Return a new Opportunity placed on the given stage, stamping the stage change
    pub fn with_stage(mut self, stage_id: &str) -> Self {
        self.stage_id = stage_id.to_string();
        self.with_stage_change_timestamp()
    }

    /// Return a new Opportunity with last_stage_change_at set to now
    pub fn with_stage_change_timestamp(mut self) -> Self {
        self.last_stage_change_at = Utc::now();
        self.touch_returning()
    }

    /// Return a new Opportunity with the given value
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self.touch_returning()
    }

    /// Return a new Opportunity with a custom field set
    pub fn with_custom_field(mut self, name: &str, value: Value) -> Self {
        self.custom_fields.insert(name.to_string(), value);
        self.touch_returning()
    }

    /// Return a new Opportunity with a required task marked complete
    pub fn with_completed_task(mut self, task_id: &str) -> Self {
        self.completed_tasks.insert(task_id.to_string(), true);
        self.touch_returning()
    }

    /// Return a new Opportunity with the given win reason
    pub fn with_win_reason(mut self, reason: Option<String>) -> Self {
        self.win_reason = reason;
        self.touch_returning()
    }

    /// Return a new Opportunity with the given loss reason
    pub fn with_loss_reason(mut self, reason: Option<String>) -> Self {
        self.loss_reason = reason;
        self.touch_returning()
    }

    /// Return a new Opportunity with the archived flag set
    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self.touch_returning()
    }

    /// Return a new Opportunity with a partial update merged in.
    ///
    /// Custom fields and completed tasks are merged key by key; a stage change
    /// in the patch stamps last_stage_change_at.
    pub fn with_patch(mut self, patch: &OpportunityPatch) -> Self {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        for (name, value) in &patch.custom_fields {
            self.custom_fields.insert(name.clone(), value.clone());
        }
        for (task_id, done) in &patch.completed_tasks {
            self.completed_tasks.insert(task_id.clone(), *done);
        }
        if let Some(reason) = &patch.win_reason {
            self.win_reason = Some(reason.clone());
        }
        if let Some(reason) = &patch.loss_reason {
            self.loss_reason = Some(reason.clone());
        }
        match &patch.stage_id {
            Some(stage_id) if *stage_id != self.stage_id => self.with_stage(stage_id),
            _ => self.touch_returning(),
        }
    }

    // ===== PRIVATE HELPER =====

    fn touch_returning(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }
}

/// A partial update to an opportunity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpportunityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub completed_tasks: BTreeMap<String, bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_reason: Option<String>,
}

impl OpportunityPatch {
    /// Whether the patch carries anything besides a stage change
    pub fn has_field_updates(&self) -> bool {
        self.title.is_some()
            || self.value.is_some()
            || !self.custom_fields.is_empty()
            || !self.completed_tasks.is_empty()
            || self.win_reason.is_some()
            || self.loss_reason.is_some()
    }

    /// Return a new patch with `later` applied on top.
    ///
    /// Values set in `later` win; map entries are merged key by key.
    pub fn merged(mut self, later: &OpportunityPatch) -> Self {
        if later.stage_id.is_some() {
            self.stage_id = later.stage_id.clone();
        }
        if later.title.is_some() {
            self.title = later.title.clone();
        }
        if later.value.is_some() {
            self.value = later.value;
        }
        self.custom_fields
            .extend(later.custom_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.completed_tasks
            .extend(later.completed_tasks.iter().map(|(k, v)| (k.clone(), *v)));
        if later.win_reason.is_some() {
            self.win_reason = later.win_reason.clone();
        }
        if later.loss_reason.is_some() {
            self.loss_reason = later.loss_reason.clone();
        }
        self
    }

    /// Return a new patch that also reassigns the stage
    pub fn with_stage(mut self, stage_id: &str) -> Self {
        self.stage_id = Some(stage_id.to_string());
        self
    }

    /// Return a new patch with a custom field value
    pub fn with_custom_field(mut self, name: &str, value: Value) -> Self {
        self.custom_fields.insert(name.to_string(), value);
        self
    }

    /// Return a new patch marking a required task complete
    pub fn with_completed_task(mut self, task_id: &str) -> Self {
        self.completed_tasks.insert(task_id.to_string(), true);
        self
    }

    /// Return a new patch with a win reason
    pub fn with_win_reason(mut self, reason: &str) -> Self {
        self.win_reason = Some(reason.to_string());
        self
    }

    /// Return a new patch with a loss reason
    pub fn with_loss_reason(mut self, reason: &str) -> Self {
        self.loss_reason = Some(reason.to_string());
        self
    }
}
