//! # Field Manifests
//!
//! Every content type declares an ordered, static list of its schema fields.
//! Field values live in a JSON map keyed by field name; typed accessors on
//! each entity sit on top of that map. Copying "all fields except X" walks
//! the source manifest instead of introspecting the destination at runtime.

use crate::models::ids::Uid;
use crate::state_machine::history::TransitionRecord;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Raw field values keyed by schema field name
pub type FieldValues = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Value is persisted on the object
    Stored,
    /// Value is derived on read and never copied or assigned
    Computed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn stored(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Stored,
        }
    }

    pub const fn computed(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Computed,
        }
    }

    pub fn is_computed(&self) -> bool {
        self.kind == FieldKind::Computed
    }
}

/// Behaviour shared by every content object the orchestrator touches
pub trait Content: Send + Sync {
    fn uid(&self) -> &Uid;

    fn portal_type(&self) -> &'static str;

    fn manifest(&self) -> &'static [FieldDescriptor];

    fn field_values(&self) -> &FieldValues;

    fn field_values_mut(&mut self) -> &mut FieldValues;

    fn workflow_history(&self) -> &[TransitionRecord];

    fn workflow_history_mut(&mut self) -> &mut Vec<TransitionRecord>;

    fn id(&self) -> &str {
        self.field_values()
            .get(crate::constants::fields::ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn descriptor(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.manifest().iter().find(|field| field.name == name)
    }

    /// Current value of a field; explicit nulls read as unset
    fn get_field(&self, name: &str) -> Option<&Value> {
        self.field_values().get(name).filter(|value| !value.is_null())
    }

    /// Assign a stored field. Unknown and computed fields are refused.
    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match self.descriptor(name) {
            Some(field) if !field.is_computed() => {
                self.field_values_mut().insert(name.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Latest recorded lifecycle state
    fn review_state(&self) -> Option<&str> {
        self.workflow_history()
            .last()
            .map(|record| record.review_state.as_str())
    }
}

/// Apply submitted form values through the object's manifest, ignoring
/// names the schema does not declare as stored fields
pub fn apply_field_values(object: &mut dyn Content, values: &FieldValues) -> usize {
    let mut applied = 0;
    for (name, value) in values {
        if object.set_field(name, value.clone()) {
            applied += 1;
        }
    }
    applied
}

/// Normalise a raw value into a list: strings become one-element lists,
/// arrays pass through, empty values become empty lists
pub fn value_to_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::String(_)) => vec![value.cloned().unwrap_or(Value::Null)],
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            tracing::warn!(value = %other, "Cannot convert to a list");
            Vec::new()
        }
    }
}

/// Non-empty string elements of a raw value
pub fn value_to_strings(value: Option<&Value>) -> Vec<String> {
    value_to_list(value)
        .into_iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn value_to_uid(value: Option<&Value>) -> Option<Uid> {
    value.and_then(Value::as_str).and_then(Uid::parse)
}

pub fn value_to_uids(value: Option<&Value>) -> Vec<Uid> {
    value_to_strings(value)
        .iter()
        .filter_map(|item| Uid::parse(item))
        .collect()
}

pub fn value_to_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|date| date.with_timezone(&Utc))
}

pub fn datetime_to_value(date: Option<DateTime<Utc>>) -> Value {
    date.map(|d| Value::String(d.to_rfc3339()))
        .unwrap_or(Value::Null)
}

pub fn uid_to_value(uid: Option<&Uid>) -> Value {
    uid.map(|u| Value::String(u.to_string()))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_list() {
        assert!(value_to_list(None).is_empty());
        assert!(value_to_list(Some(&json!(""))).is_empty());
        assert_eq!(value_to_list(Some(&json!("Ca"))), vec![json!("Ca")]);
        assert_eq!(value_to_list(Some(&json!(["Ca", "Mg"]))).len(), 2);
        assert!(value_to_list(Some(&json!(42))).is_empty());
    }

    #[test]
    fn test_datetime_roundtrip_through_value() {
        let now = Utc::now();
        let value = datetime_to_value(Some(now));
        assert_eq!(value_to_datetime(Some(&value)), Some(now));
        assert_eq!(datetime_to_value(None), Value::Null);
        assert_eq!(value_to_datetime(Some(&json!("yesterday"))), None);
    }

    #[test]
    fn test_value_to_uids_skips_malformed() {
        let uid = Uid::generate();
        let uids = value_to_uids(Some(&json!([uid.as_str(), "0", "nope"])));
        assert_eq!(uids, vec![uid]);
    }
}
