//! Funnel and stage schema - Pipeline layout and stage entry requirements

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{FunnelError, Result};

/// Type of a stage-required custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    Multiselect,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Number => write!(f, "number"),
            FieldType::Date => write!(f, "date"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Select => write!(f, "select"),
            FieldType::Multiselect => write!(f, "multiselect"),
        }
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "boolean" => Ok(FieldType::Boolean),
            "select" => Ok(FieldType::Select),
            "multiselect" => Ok(FieldType::Multiselect),
            _ => Err(format!("Unknown field type: {}", s)),
        }
    }
}

/// A custom field a stage asks for on entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredField {
    pub id: String,

    pub stage_id: String,

    /// Key of the value in the opportunity's custom-field map
    pub name: String,

    pub field_type: FieldType,

    /// Optional fields are offered in the dialog but never block a move
    #[serde(default = "default_true")]
    pub is_required: bool,

    /// Allowed values for select and multiselect fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl RequiredField {
    pub fn new(id: &str, stage_id: &str, name: &str, field_type: FieldType) -> Self {
        RequiredField {
            id: id.to_string(),
            stage_id: stage_id.to_string(),
            name: name.to_string(),
            field_type,
            is_required: true,
            options: None,
        }
    }

    /// Return a new RequiredField restricted to the given options
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Return a new RequiredField marked optional
    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    /// Normalize a user-supplied value to this field's type, then check it.
    ///
    /// Numbers and booleans become strings for text fields; numeric strings
    /// become numbers for number fields. Anything else is checked as given.
    ///
    /// # Errors
    /// * `InvalidFieldValue` - If the normalized value fails [`Self::check_value`]
    pub fn coerce_value(&self, value: &Value) -> Result<Value> {
        let coerced = match (self.field_type, value) {
            (FieldType::Text, Value::Number(n)) => Value::String(n.to_string()),
            (FieldType::Text, Value::Bool(b)) => Value::String(b.to_string()),
            (FieldType::Number, Value::String(s)) => {
                parse_number(s.trim()).unwrap_or_else(|| value.clone())
            }
            _ => value.clone(),
        };
        self.check_value(&coerced)?;
        Ok(coerced)
    }

    /// Check that a user-supplied value fits this field's type.
    ///
    /// Null is accepted for every type; emptiness is judged by the
    /// requirement evaluator, not here.
    ///
    /// # Errors
    /// * `InvalidFieldValue` - If the value does not match the field type or options
    pub fn check_value(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        let fail = |message: String| -> Result<()> {
            Err(FunnelError::InvalidFieldValue {
                field: self.name.clone(),
                message,
            })
        };

        match self.field_type {
            FieldType::Text => {
                if !value.is_string() {
                    return fail("expected text".to_string());
                }
            }
            FieldType::Number => {
                let numeric = value.is_number()
                    || value
                        .as_str()
                        .is_some_and(|s| s.trim().parse::<f64>().is_ok_and(f64::is_finite));
                if !numeric {
                    return fail("expected a number".to_string());
                }
            }
            FieldType::Date => {
                let parsed = value.as_str().is_some_and(|s| {
                    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                        || chrono::DateTime::parse_from_rfc3339(s).is_ok()
                });
                if !parsed {
                    return fail("expected a YYYY-MM-DD or RFC 3339 date".to_string());
                }
            }
            FieldType::Boolean => {
                if !value.is_boolean() {
                    return fail("expected true or false".to_string());
                }
            }
            FieldType::Select => match value.as_str() {
                Some(choice) => {
                    if !self.allows(choice) {
                        return fail(format!("'{}' is not one of the allowed options", choice));
                    }
                }
                None => return fail("expected a single option".to_string()),
            },
            FieldType::Multiselect => match value.as_array() {
                Some(choices) => {
                    for choice in choices {
                        match choice.as_str() {
                            Some(c) if self.allows(c) => {}
                            _ => {
                                return fail(format!(
                                    "{} is not one of the allowed options",
                                    choice
                                ))
                            }
                        }
                    }
                }
                None => return fail("expected a list of options".to_string()),
            },
        }

        Ok(())
    }

    fn allows(&self, choice: &str) -> bool {
        match &self.options {
            Some(options) => options.iter().any(|o| o == choice),
            None => true,
        }
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// A task a stage asks to be completed on entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredTask {
    pub id: String,

    pub stage_id: String,

    pub name: String,

    #[serde(default = "default_true")]
    pub is_required: bool,

    /// Days until a generated task falls due
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration_days: Option<u32>,
}

impl RequiredTask {
    pub fn new(id: &str, stage_id: &str, name: &str) -> Self {
        RequiredTask {
            id: id.to_string(),
            stage_id: stage_id.to_string(),
            name: name.to_string(),
            is_required: true,
            default_duration_days: None,
        }
    }

    /// Return a new RequiredTask with a default duration
    pub fn with_duration_days(mut self, days: u32) -> Self {
        self.default_duration_days = Some(days);
        self
    }

    /// Return a new RequiredTask marked optional
    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }
}

/// A column of the kanban board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,

    pub funnel_id: String,

    pub name: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Position of the stage within its funnel
    pub order: u32,

    #[serde(default)]
    pub is_win_stage: bool,

    #[serde(default)]
    pub is_loss_stage: bool,

    #[serde(default)]
    pub win_reason_required: bool,

    #[serde(default)]
    pub loss_reason_required: bool,

    #[serde(default)]
    pub required_fields: Vec<RequiredField>,

    #[serde(default)]
    pub required_tasks: Vec<RequiredTask>,
}

impl Stage {
    /// Create a new plain stage with no requirements
    pub fn new(id: &str, funnel_id: &str, name: &str, order: u32) -> Self {
        Stage {
            id: id.to_string(),
            funnel_id: funnel_id.to_string(),
            name: name.to_string(),
            color: default_color(),
            order,
            is_win_stage: false,
            is_loss_stage: false,
            win_reason_required: false,
            loss_reason_required: false,
            required_fields: Vec::new(),
            required_tasks: Vec::new(),
        }
    }

    // ===== IMMUTABLE BUILDER METHODS =====

    /// Return a new Stage with the given color
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    /// Return a new Stage with an extra required field
    pub fn with_required_field(mut self, field: RequiredField) -> Self {
        self.required_fields.push(field);
        self
    }

    /// Return a new Stage with an extra required task
    pub fn with_required_task(mut self, task: RequiredTask) -> Self {
        self.required_tasks.push(task);
        self
    }

    /// Return a new Stage flagged as the win stage
    pub fn as_win_stage(mut self, reason_required: bool) -> Self {
        self.is_win_stage = true;
        self.is_loss_stage = false;
        self.win_reason_required = reason_required;
        self
    }

    /// Return a new Stage flagged as the loss stage
    pub fn as_loss_stage(mut self, reason_required: bool) -> Self {
        self.is_loss_stage = true;
        self.is_win_stage = false;
        self.loss_reason_required = reason_required;
        self
    }

    /// Look up a required field by its custom-field key
    pub fn field(&self, name: &str) -> Option<&RequiredField> {
        self.required_fields.iter().find(|f| f.name == name)
    }

    /// Check the stage's own invariants.
    ///
    /// # Errors
    /// * `InvalidStage` - If the stage is flagged as both win and loss, or two
    ///   required fields share a key
    pub fn validate(&self) -> Result<()> {
        if self.is_win_stage && self.is_loss_stage {
            return Err(FunnelError::InvalidStage(format!(
                "stage {} cannot be both a win and a loss stage",
                self.id
            )));
        }

        for (i, field) in self.required_fields.iter().enumerate() {
            if self.required_fields[..i].iter().any(|f| f.name == field.name) {
                return Err(FunnelError::InvalidStage(format!(
                    "stage {} declares field '{}' more than once",
                    self.id, field.name
                )));
            }
        }

        Ok(())
    }
}

/// A sales pipeline: an ordered set of stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funnel {
    pub id: String,

    pub name: String,

    /// Stage ids in display order
    #[serde(default)]
    pub stage_ids: Vec<String>,
}

impl Funnel {
    pub fn new(id: &str, name: &str) -> Self {
        Funnel {
            id: id.to_string(),
            name: name.to_string(),
            stage_ids: Vec::new(),
        }
    }

    /// Return a new Funnel with a stage appended
    pub fn with_stage(mut self, stage_id: &str) -> Self {
        self.stage_ids.push(stage_id.to_string());
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_color() -> String {
    "#64748b".to_string()
}
