use crate::constants::{fields, portal_types};
use crate::models::fields::{Content, FieldDescriptor, FieldValues};
use crate::models::ids::Uid;
use crate::models::service::{AnalysisService, ResultsRange};
use crate::state_machine::history::TransitionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ANALYSIS_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::stored("id"),
    FieldDescriptor::stored("title"),
    FieldDescriptor::stored("Service"),
    FieldDescriptor::stored("Keyword"),
    FieldDescriptor::stored("Price"),
    FieldDescriptor::stored("Hidden"),
    FieldDescriptor::stored("ResultsRange"),
    FieldDescriptor::stored("Result"),
    FieldDescriptor::stored("ResultCaptureDate"),
    FieldDescriptor::stored("Uncertainty"),
    FieldDescriptor::stored("Method"),
    FieldDescriptor::stored("Instrument"),
    FieldDescriptor::stored("Analyst"),
    FieldDescriptor::stored("Remarks"),
    FieldDescriptor::stored("DataAnalysisPublished"),
    FieldDescriptor::computed("ServiceUID"),
    FieldDescriptor::computed("ResultFormatted"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Regular analysis requested on a sample
    #[default]
    Routine,
    /// Analysis on a reference sample
    Reference,
    /// Duplicate of a routine analysis
    Duplicate,
}

/// One requested measurement on a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    uid: Uid,
    #[serde(default)]
    kind: AnalysisKind,
    #[serde(default)]
    fields: FieldValues,
    #[serde(default)]
    workflow_history: Vec<TransitionRecord>,
}

impl Analysis {
    /// Create an empty analysis shell with the given id
    pub fn new(uid: Uid, id: impl Into<String>) -> Self {
        let mut fields = FieldValues::new();
        fields.insert(fields::ID.to_string(), Value::String(id.into()));
        Self {
            uid,
            kind: AnalysisKind::Routine,
            fields,
            workflow_history: Vec::new(),
        }
    }

    /// Copy a service definition onto this analysis
    pub fn apply_service(
        &mut self,
        service: &AnalysisService,
        price: f64,
        range: Option<&ResultsRange>,
    ) {
        self.set_field(fields::SERVICE, Value::String(service.uid.to_string()));
        self.set_field(fields::KEYWORD, Value::String(service.keyword.clone()));
        self.set_field(fields::TITLE, Value::String(service.title.clone()));
        self.set_field(fields::PRICE, Value::from(price));
        self.set_field(fields::HIDDEN, Value::Bool(false));
        if let Some(range) = range {
            if let Ok(value) = serde_json::to_value(range) {
                self.set_field(fields::RESULTS_RANGE, value);
            }
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: AnalysisKind) {
        self.kind = kind;
    }

    pub fn is_routine(&self) -> bool {
        self.kind == AnalysisKind::Routine
    }

    pub fn service_uid(&self) -> Option<Uid> {
        crate::models::fields::value_to_uid(self.get_field(fields::SERVICE))
    }

    pub fn keyword(&self) -> &str {
        self.get_field(fields::KEYWORD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn price(&self) -> Option<f64> {
        self.get_field(fields::PRICE).and_then(Value::as_f64)
    }

    pub fn is_hidden(&self) -> bool {
        self.get_field(fields::HIDDEN)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.set_field(fields::HIDDEN, Value::Bool(hidden));
    }

    pub fn results_range(&self) -> Option<ResultsRange> {
        self.get_field(fields::RESULTS_RANGE)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

impl Content for Analysis {
    fn uid(&self) -> &Uid {
        &self.uid
    }

    fn portal_type(&self) -> &'static str {
        portal_types::ANALYSIS
    }

    fn manifest(&self) -> &'static [FieldDescriptor] {
        ANALYSIS_FIELDS
    }

    fn field_values(&self) -> &FieldValues {
        &self.fields
    }

    fn field_values_mut(&mut self) -> &mut FieldValues {
        &mut self.fields
    }

    fn workflow_history(&self) -> &[TransitionRecord] {
        &self.workflow_history
    }

    fn workflow_history_mut(&mut self) -> &mut Vec<TransitionRecord> {
        &mut self.workflow_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_service() {
        let service = AnalysisService::new("Ca", "Calcium").with_price(12.5);
        let range = ResultsRange::new("Ca", "5", "10");
        let mut analysis = Analysis::new(Uid::generate(), "Ca");
        analysis.apply_service(&service, 9.0, Some(&range));

        assert_eq!(analysis.id(), "Ca");
        assert_eq!(analysis.keyword(), "Ca");
        assert_eq!(analysis.service_uid(), Some(service.uid.clone()));
        assert_eq!(analysis.price(), Some(9.0));
        assert_eq!(analysis.results_range(), Some(range));
        assert!(!analysis.is_hidden());
        assert!(analysis.is_routine());
    }

    #[test]
    fn test_computed_fields_cannot_be_set() {
        let mut analysis = Analysis::new(Uid::generate(), "Ca");
        assert!(!analysis.set_field("ServiceUID", Value::String("x".to_string())));
        assert!(!analysis.set_field("NotAField", Value::Bool(true)));
        assert!(analysis.set_field("Remarks", Value::String("ok".to_string())));
    }
}
