//! Typed parameter definitions attached to each rule.
//!
//! The kind of a field decides which constraints exist: bounds only on
//! numbers, options only on selects. A default value is stored inside its
//! kind, so a default of the wrong type cannot be built.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::catalog::EventType;
use crate::path::{PathError, PolicyPath};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("invalid field name '{name}'")]
    InvalidName { name: String },

    #[error("select field declares no options")]
    EmptyOptions,

    #[error("number bounds are inverted: min {min} > max {max}")]
    InvertedBounds { min: f64, max: f64 },

    #[error("number bounds must be finite")]
    NonFiniteBound,

    #[error("default value must be a {expected}")]
    DefaultTypeMismatch { expected: &'static str },

    #[error("attribute '{attribute}' is not allowed on {kind} fields")]
    UnexpectedAttribute {
        attribute: &'static str,
        kind: &'static str,
    },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Value of a select option. Stored documents hold either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(i64),
    Text(String),
}

impl OptionValue {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Strict comparison against a stored value: `1` never matches `"1"`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Integer(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (Self::Text(s), Value::String(v)) => s == v,
            _ => false,
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Integer),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: OptionValue,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: OptionValue, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
        }
    }
}

/// Non-empty list of select options.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOptions(Vec<SelectOption>);

impl SelectOptions {
    pub fn new(options: Vec<SelectOption>) -> Result<Self, FieldError> {
        if options.is_empty() {
            return Err(FieldError::EmptyOptions);
        }
        Ok(Self(options))
    }

    pub fn as_slice(&self) -> &[SelectOption] {
        &self.0
    }

    pub fn contains(&self, value: &OptionValue) -> bool {
        self.0.iter().any(|option| &option.value == value)
    }

    fn find(&self, stored: &Value) -> Option<&OptionValue> {
        self.0
            .iter()
            .map(|option| &option.value)
            .find(|value| value.matches(stored))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumberBounds {
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberBounds {
    pub const UNBOUNDED: Self = Self {
        min: None,
        max: None,
    };

    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, FieldError> {
        if min.iter().chain(max.iter()).any(|v| !v.is_finite()) {
            return Err(FieldError::NonFiniteBound);
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(FieldError::InvertedBounds { min, max });
            }
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Number {
        bounds: NumberBounds,
        default: Option<f64>,
    },
    Text {
        default: Option<String>,
    },
    Select {
        options: SelectOptions,
        default: Option<OptionValue>,
    },
    Boolean {
        default: Option<bool>,
    },
}

impl FieldKind {
    pub fn number(min: Option<f64>, max: Option<f64>, default: Option<f64>) -> Result<Self, FieldError> {
        Ok(Self::Number {
            bounds: NumberBounds::new(min, max)?,
            default,
        })
    }

    pub fn text(default: Option<&str>) -> Self {
        Self::Text {
            default: default.map(str::to_string),
        }
    }

    pub fn select(options: Vec<SelectOption>, default: Option<OptionValue>) -> Result<Self, FieldError> {
        Ok(Self::Select {
            options: SelectOptions::new(options)?,
            default,
        })
    }

    pub fn boolean(default: Option<bool>) -> Self {
        Self::Boolean { default }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Number { .. } => "number",
            Self::Text { .. } => "string",
            Self::Select { .. } => "select",
            Self::Boolean { .. } => "boolean",
        }
    }

    /// Runtime type guard. Returns `None` for any stored value whose JSON type
    /// disagrees with the kind; a select value must be one of its options.
    pub fn guard(&self, value: &Value) -> Option<FieldValue> {
        match self {
            Self::Number { .. } => value.as_f64().map(FieldValue::Number),
            Self::Text { .. } => value.as_str().map(|s| FieldValue::Text(s.to_string())),
            Self::Boolean { .. } => value.as_bool().map(FieldValue::Boolean),
            Self::Select { options, .. } => options.find(value).cloned().map(FieldValue::Choice),
        }
    }

    pub fn default_value(&self) -> Option<FieldValue> {
        match self {
            Self::Number { default, .. } => default.map(FieldValue::Number),
            Self::Text { default } => default.clone().map(FieldValue::Text),
            Self::Select { default, .. } => default.clone().map(FieldValue::Choice),
            Self::Boolean { default } => default.map(FieldValue::Boolean),
        }
    }

    /// Numeric defaults must sit inside their bounds, select defaults must be
    /// one of the options.
    pub fn default_is_consistent(&self) -> bool {
        match self {
            Self::Number { bounds, default } => default.map_or(true, |d| bounds.contains(d)),
            Self::Select { options, default } => default.as_ref().map_or(true, |d| options.contains(d)),
            Self::Text { .. } | Self::Boolean { .. } => true,
        }
    }
}

/// A parameter value that passed its field's type guard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Choice(OptionValue),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Choice(option) => option.to_json(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => match integral(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Choice(option) => write!(f, "{option}"),
        }
    }
}

// 2^53: the largest range where every integer is exactly representable.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER).then_some(n as i64)
}

/// Whole numbers are written as JSON integers so defaults read back as `3`, not `3.0`.
pub(crate) fn number_to_json(n: f64) -> Value {
    match integral(n) {
        Some(i) => Value::from(i),
        None => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldDefinition", into = "RawFieldDefinition")]
pub struct FieldDefinition {
    field: String,
    label: String,
    kind: FieldKind,
    policy_path: PolicyPath,
}

impl FieldDefinition {
    /// Field stored at `auto_notification.<event>.<field>`.
    pub fn new(event: &str, field: &str, label: &str, kind: FieldKind) -> Result<Self, FieldError> {
        check_name(field)?;
        Ok(Self {
            field: field.to_string(),
            label: label.to_string(),
            kind,
            policy_path: PolicyPath::for_event(event, field)?,
        })
    }

    /// Field stored below a group, e.g. `throttle_daily_limit` at
    /// `auto_notification.<event>.throttle.daily_limit`.
    pub fn grouped(
        event: &str,
        field: &str,
        label: &str,
        nested_path: &str,
        kind: FieldKind,
    ) -> Result<Self, FieldError> {
        check_name(field)?;
        Ok(Self {
            field: field.to_string(),
            label: label.to_string(),
            kind,
            policy_path: PolicyPath::for_event(event, nested_path)?,
        })
    }

    /// Definition with an explicit path. Registries loaded from files use
    /// this shape; the consistency validator checks the path's owner.
    pub fn with_policy_path(field: &str, label: &str, kind: FieldKind, policy_path: PolicyPath) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
            kind,
            policy_path,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn policy_path(&self) -> &PolicyPath {
        &self.policy_path
    }
}

fn check_name(name: &str) -> Result<(), FieldError> {
    if name.is_empty() || name.contains('.') {
        return Err(FieldError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Flat on-disk shape: `{ field, label, type, policyPath, min?, max?, options?, defaultValue? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldDefinition {
    field: String,
    label: String,
    #[serde(rename = "type")]
    kind: RawKind,
    policy_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Number,
    String,
    Select,
    Boolean,
}

impl TryFrom<RawFieldDefinition> for FieldDefinition {
    type Error = FieldError;

    fn try_from(raw: RawFieldDefinition) -> Result<Self, Self::Error> {
        check_name(&raw.field)?;
        let policy_path = PolicyPath::parse(&raw.policy_path)?;
        let default = raw.default_value.filter(|v| !v.is_null());

        let kind = match raw.kind {
            RawKind::Number => {
                reject(raw.options.is_some(), "options", "number")?;
                let default = default
                    .map(|v| v.as_f64().ok_or(FieldError::DefaultTypeMismatch { expected: "number" }))
                    .transpose()?;
                FieldKind::number(raw.min, raw.max, default)?
            }
            RawKind::String => {
                reject_bounds_and_options(&raw.min, &raw.max, &raw.options, "string")?;
                let default = default
                    .map(|v| match v {
                        Value::String(s) => Ok(s),
                        _ => Err(FieldError::DefaultTypeMismatch { expected: "string" }),
                    })
                    .transpose()?;
                FieldKind::Text { default }
            }
            RawKind::Select => {
                reject(raw.min.is_some(), "min", "select")?;
                reject(raw.max.is_some(), "max", "select")?;
                let default = default
                    .map(|v| {
                        OptionValue::from_json(&v).ok_or(FieldError::DefaultTypeMismatch {
                            expected: "string or integer",
                        })
                    })
                    .transpose()?;
                FieldKind::select(raw.options.unwrap_or_default(), default)?
            }
            RawKind::Boolean => {
                reject_bounds_and_options(&raw.min, &raw.max, &raw.options, "boolean")?;
                let default = default
                    .map(|v| v.as_bool().ok_or(FieldError::DefaultTypeMismatch { expected: "boolean" }))
                    .transpose()?;
                FieldKind::Boolean { default }
            }
        };

        Ok(Self {
            field: raw.field,
            label: raw.label,
            kind,
            policy_path,
        })
    }
}

fn reject(present: bool, attribute: &'static str, kind: &'static str) -> Result<(), FieldError> {
    if present {
        return Err(FieldError::UnexpectedAttribute { attribute, kind });
    }
    Ok(())
}

fn reject_bounds_and_options(
    min: &Option<f64>,
    max: &Option<f64>,
    options: &Option<Vec<SelectOption>>,
    kind: &'static str,
) -> Result<(), FieldError> {
    reject(min.is_some(), "min", kind)?;
    reject(max.is_some(), "max", kind)?;
    reject(options.is_some(), "options", kind)
}

impl From<FieldDefinition> for RawFieldDefinition {
    fn from(def: FieldDefinition) -> Self {
        let mut raw = RawFieldDefinition {
            field: def.field,
            label: def.label,
            kind: RawKind::Boolean,
            policy_path: def.policy_path.as_str().to_string(),
            min: None,
            max: None,
            options: None,
            default_value: def.kind.default_value().map(|v| v.to_json()),
        };
        match def.kind {
            FieldKind::Number { bounds, .. } => {
                raw.kind = RawKind::Number;
                raw.min = bounds.min();
                raw.max = bounds.max();
            }
            FieldKind::Text { .. } => raw.kind = RawKind::String,
            FieldKind::Select { options, .. } => {
                raw.kind = RawKind::Select;
                raw.options = Some(options.0);
            }
            FieldKind::Boolean { .. } => {}
        }
        raw
    }
}

/// Per-rule parameter lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchemaRegistry {
    by_event: BTreeMap<EventType, Vec<FieldDefinition>>,
}

impl FieldSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        event: impl Into<EventType>,
        fields: Vec<FieldDefinition>,
    ) -> Option<Vec<FieldDefinition>> {
        self.by_event.insert(event.into(), fields)
    }

    /// Parameters of a rule; an empty slice for rules without parameters.
    pub fn fields_for(&self, event: &str) -> &[FieldDefinition] {
        self.by_event.get(event).map_or(&[], Vec::as_slice)
    }

    pub fn field(&self, event: &str, name: &str) -> Option<&FieldDefinition> {
        self.fields_for(event).iter().find(|def| def.field() == name)
    }

    /// Whether the rule has an entry at all (possibly empty).
    pub fn contains(&self, event: &str) -> bool {
        self.by_event.contains_key(event)
    }

    pub fn events(&self) -> impl Iterator<Item = &EventType> + '_ {
        self.by_event.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventType, &[FieldDefinition])> + '_ {
        self.by_event.iter().map(|(event, defs)| (event, defs.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel_options() -> Vec<SelectOption> {
        vec![
            SelectOption::new(OptionValue::text("sms"), "SMS"),
            SelectOption::new(OptionValue::text("kakao_at"), "Kakao AlimTalk"),
        ]
    }

    #[test]
    fn select_without_options_cannot_be_built() {
        assert_eq!(
            FieldKind::select(Vec::new(), None),
            Err(FieldError::EmptyOptions)
        );
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(matches!(
            FieldKind::number(Some(10.0), Some(1.0), None),
            Err(FieldError::InvertedBounds { .. })
        ));
        assert!(FieldKind::number(Some(1.0), Some(1.0), Some(1.0)).is_ok());
        assert_eq!(
            NumberBounds::new(Some(f64::NAN), None),
            Err(FieldError::NonFiniteBound)
        );
    }

    #[test]
    fn guards_never_coerce() {
        let boolean = FieldKind::boolean(None);
        assert_eq!(boolean.guard(&json!(true)), Some(FieldValue::Boolean(true)));
        assert_eq!(boolean.guard(&json!("true")), None);
        assert_eq!(boolean.guard(&json!(1)), None);

        let number = FieldKind::number(None, None, None).unwrap();
        assert_eq!(number.guard(&json!(5)), Some(FieldValue::Number(5.0)));
        assert_eq!(number.guard(&json!("5")), None);

        let select = FieldKind::select(channel_options(), None).unwrap();
        assert_eq!(
            select.guard(&json!("sms")),
            Some(FieldValue::Choice(OptionValue::text("sms")))
        );
        assert_eq!(select.guard(&json!("email")), None);
    }

    #[test]
    fn integer_options_do_not_match_strings() {
        let weekday = FieldKind::select(
            vec![
                SelectOption::new(OptionValue::Integer(0), "Sunday"),
                SelectOption::new(OptionValue::Integer(1), "Monday"),
            ],
            Some(OptionValue::Integer(1)),
        )
        .unwrap();
        assert!(weekday.guard(&json!(1)).is_some());
        assert!(weekday.guard(&json!("1")).is_none());
        assert!(weekday.default_is_consistent());
    }

    #[test]
    fn definitions_derive_their_path() {
        let def = FieldDefinition::new(
            "payment_due_reminder",
            "days_before_first",
            "First reminder",
            FieldKind::number(Some(1.0), None, Some(3.0)).unwrap(),
        )
        .unwrap();
        assert_eq!(
            def.policy_path().as_str(),
            "auto_notification.payment_due_reminder.days_before_first"
        );
        assert!(FieldDefinition::new("x", "a.b", "dotted", FieldKind::boolean(None)).is_err());
    }

    #[test]
    fn raw_shape_round_trips_and_rejects_duck_typing() {
        let def: FieldDefinition = serde_json::from_value(json!({
            "field": "channel",
            "label": "Channel",
            "type": "select",
            "policyPath": "auto_notification.refund_spike.channel",
            "options": [{"value": "sms", "label": "SMS"}],
            "defaultValue": "sms"
        }))
        .unwrap();
        assert_eq!(def.kind().name(), "select");
        let back = serde_json::to_value(&def).unwrap();
        assert_eq!(back["type"], "select");
        assert_eq!(back["defaultValue"], "sms");

        let empty_select = serde_json::from_value::<FieldDefinition>(json!({
            "field": "channel",
            "label": "Channel",
            "type": "select",
            "policyPath": "auto_notification.refund_spike.channel"
        }));
        assert!(empty_select.is_err());

        let wrong_default = serde_json::from_value::<FieldDefinition>(json!({
            "field": "threshold",
            "label": "Threshold",
            "type": "number",
            "policyPath": "auto_notification.refund_spike.threshold",
            "defaultValue": "2"
        }));
        assert!(wrong_default.is_err());

        let bounds_on_boolean = serde_json::from_value::<FieldDefinition>(json!({
            "field": "require_approval",
            "label": "Approval",
            "type": "boolean",
            "policyPath": "auto_notification.refund_spike.require_approval",
            "min": 1
        }));
        assert!(bounds_on_boolean.is_err());
    }

    #[test]
    fn registry_returns_empty_slice_for_rules_without_parameters() {
        let mut registry = FieldSchemaRegistry::new();
        registry.insert("ai_suggest_class_merge", Vec::new());
        assert!(registry.contains("ai_suggest_class_merge"));
        assert!(registry.fields_for("ai_suggest_class_merge").is_empty());
        assert!(registry.fields_for("unknown").is_empty());
        assert!(!registry.contains("unknown"));
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(FieldValue::Number(3.0).to_json(), json!(3));
        assert_eq!(FieldValue::Number(0.7).to_json(), json!(0.7));
        assert_eq!(FieldValue::Number(20.0).to_string(), "20");
    }
}
