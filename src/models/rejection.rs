use crate::constants::fields;
use crate::models::fields::{value_to_strings, FieldValues};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a sample was rejected: predefined reasons plus free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RejectionReason {
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub other: String,
}

impl RejectionReason {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.other.is_empty()
    }
}

/// Resolve the submitted rejection widget values into rejection records.
///
/// The first `RejectionReasons` entry contributes its `multiselection` only
/// when its `checkbox` is `"on"`; the first `RejectionReasons.textfield`
/// entry contributes its `other` text. Nothing set yields an empty list.
pub fn resolve_rejection_reasons(values: &FieldValues) -> Vec<RejectionReason> {
    let selected = first_entry(values.get(fields::REJECTION_REASONS))
        .filter(|entry| entry.get("checkbox").and_then(Value::as_str) == Some("on"))
        .map(|entry| value_to_strings(entry.get("multiselection")))
        .unwrap_or_default();

    let other = first_entry(values.get(fields::REJECTION_REASONS_TEXTFIELD))
        .and_then(|entry| entry.get("other"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let reason = RejectionReason { selected, other };
    if reason.is_empty() {
        return Vec::new();
    }
    vec![reason]
}

fn first_entry(value: Option<&Value>) -> Option<&serde_json::Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(Value::as_object)
}
