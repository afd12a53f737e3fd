use crate::constants::{fields, portal_types};
use crate::models::analysis::Analysis;
use crate::models::fields::{
    datetime_to_value, uid_to_value, value_to_datetime, value_to_uid, value_to_uids, Content,
    FieldDescriptor, FieldValues,
};
use crate::models::ids::Uid;
use crate::models::rejection::RejectionReason;
use crate::models::service::ResultsRange;
use crate::state_machine::history::TransitionRecord;
use crate::state_machine::states::SampleState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const SAMPLE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::stored("id"),
    FieldDescriptor::stored("title"),
    FieldDescriptor::stored("creation_date"),
    FieldDescriptor::stored("modification_date"),
    FieldDescriptor::stored("Client"),
    FieldDescriptor::stored("Contact"),
    FieldDescriptor::stored("CCContact"),
    FieldDescriptor::stored("CCEmails"),
    FieldDescriptor::stored("ClientReference"),
    FieldDescriptor::stored("ClientSampleID"),
    FieldDescriptor::stored("Batch"),
    FieldDescriptor::stored("SamplePoint"),
    FieldDescriptor::stored("StorageLocation"),
    FieldDescriptor::stored("SampleType"),
    FieldDescriptor::stored("Container"),
    FieldDescriptor::stored("Preservation"),
    FieldDescriptor::stored("Template"),
    FieldDescriptor::stored("Profile"),
    FieldDescriptor::stored("Profiles"),
    FieldDescriptor::stored("Specification"),
    FieldDescriptor::stored("ResultsRange"),
    FieldDescriptor::stored("Analyses"),
    FieldDescriptor::stored("Sample"),
    FieldDescriptor::stored("SamplingDate"),
    FieldDescriptor::stored("DateSampled"),
    FieldDescriptor::stored("Sampler"),
    FieldDescriptor::stored("DateReceived"),
    FieldDescriptor::stored("DatePublished"),
    FieldDescriptor::stored("EnvironmentalConditions"),
    FieldDescriptor::stored("Priority"),
    FieldDescriptor::stored("InternalUse"),
    FieldDescriptor::stored("Composite"),
    FieldDescriptor::stored("Remarks"),
    FieldDescriptor::stored("ResultsInterpretation"),
    FieldDescriptor::stored("ResultsInterpretationDepts"),
    FieldDescriptor::stored("RejectionReasons"),
    FieldDescriptor::stored("Attachment"),
    FieldDescriptor::stored("PrimaryAnalysisRequest"),
    FieldDescriptor::stored("ParentAnalysisRequest"),
    FieldDescriptor::stored("DetachedFrom"),
    FieldDescriptor::stored("Invalidated"),
    FieldDescriptor::computed("ClientUID"),
    FieldDescriptor::computed("SampleTypeTitle"),
    FieldDescriptor::computed("ProfilesUID"),
    FieldDescriptor::computed("getDescendantsUIDs"),
];

/// Capabilities an object is marked with as it moves through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// Linked to a primary sample and synchronised with it
    Secondary,
    /// Physically received by the laboratory
    Received,
    /// Created to re-measure an invalidated sample
    Retest,
}

/// A submitted physical sample (Analysis Request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    uid: Uid,
    #[serde(default)]
    fields: FieldValues,
    #[serde(default)]
    analyses: Vec<Analysis>,
    #[serde(default)]
    markers: BTreeSet<Marker>,
    /// Back-reference to the retest created from this sample
    #[serde(default)]
    retest: Option<Uid>,
    #[serde(default)]
    workflow_history: Vec<TransitionRecord>,
}

impl Sample {
    /// Create an empty sample shell inside a client
    pub fn new(uid: Uid, id: impl Into<String>, client: &Uid) -> Self {
        let mut fields = FieldValues::new();
        fields.insert(fields::ID.to_string(), Value::String(id.into()));
        fields.insert(fields::CLIENT.to_string(), uid_to_value(Some(client)));
        fields.insert(
            fields::CREATION_DATE.to_string(),
            datetime_to_value(Some(Utc::now())),
        );
        Self {
            uid,
            fields,
            analyses: Vec::new(),
            markers: BTreeSet::new(),
            retest: None,
            workflow_history: Vec::new(),
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set_field(fields::ID, Value::String(id.into()));
    }

    pub fn client_uid(&self) -> Option<Uid> {
        value_to_uid(self.get_field(fields::CLIENT))
    }

    pub fn contact_uid(&self) -> Option<Uid> {
        value_to_uid(self.get_field(fields::CONTACT))
    }

    pub fn cc_contact_uids(&self) -> Vec<Uid> {
        value_to_uids(self.get_field(fields::CC_CONTACT))
    }

    pub fn template_uid(&self) -> Option<Uid> {
        value_to_uid(self.get_field(fields::TEMPLATE))
    }

    pub fn profile_uids(&self) -> Vec<Uid> {
        value_to_uids(self.get_field(fields::PROFILES))
    }

    pub fn primary_uid(&self) -> Option<Uid> {
        value_to_uid(self.get_field(fields::PRIMARY_ANALYSIS_REQUEST))
    }

    pub fn parent_uid(&self) -> Option<Uid> {
        value_to_uid(self.get_field(fields::PARENT_ANALYSIS_REQUEST))
    }

    pub fn invalidated_uid(&self) -> Option<Uid> {
        value_to_uid(self.get_field(fields::INVALIDATED))
    }

    pub fn set_invalidated(&mut self, source: Option<&Uid>) {
        self.set_field(fields::INVALIDATED, uid_to_value(source));
    }

    pub fn retest_uid(&self) -> Option<&Uid> {
        self.retest.as_ref()
    }

    pub fn set_retest(&mut self, retest: Option<Uid>) {
        self.retest = retest;
    }

    pub fn date_sampled(&self) -> Option<DateTime<Utc>> {
        value_to_datetime(self.get_field(fields::DATE_SAMPLED))
    }

    pub fn set_date_sampled(&mut self, date: Option<DateTime<Utc>>) {
        self.set_field(fields::DATE_SAMPLED, datetime_to_value(date));
    }

    pub fn sampling_date(&self) -> Option<DateTime<Utc>> {
        value_to_datetime(self.get_field(fields::SAMPLING_DATE))
    }

    pub fn set_sampling_date(&mut self, date: Option<DateTime<Utc>>) {
        self.set_field(fields::SAMPLING_DATE, datetime_to_value(date));
    }

    pub fn date_received(&self) -> Option<DateTime<Utc>> {
        value_to_datetime(self.get_field(fields::DATE_RECEIVED))
    }

    pub fn set_date_received(&mut self, date: Option<DateTime<Utc>>) {
        self.set_field(fields::DATE_RECEIVED, datetime_to_value(date));
    }

    pub fn internal_use(&self) -> bool {
        self.get_field(fields::INTERNAL_USE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Rejection records; malformed stored values read as none
    pub fn rejection_reasons(&self) -> Vec<RejectionReason> {
        self.get_field(fields::REJECTION_REASONS)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_rejection_reasons(&mut self, reasons: &[RejectionReason]) {
        let value = serde_json::to_value(reasons).unwrap_or(Value::Array(Vec::new()));
        self.set_field(fields::REJECTION_REASONS, value);
    }

    pub fn results_ranges(&self) -> Vec<ResultsRange> {
        self.get_field(fields::RESULTS_RANGE)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Merge ranges into the stored ones; a later range replaces an earlier
    /// one for the same keyword
    pub fn merge_results_ranges(&mut self, ranges: &[ResultsRange]) {
        let mut merged = self.results_ranges();
        for range in ranges {
            match merged.iter_mut().find(|r| r.keyword == range.keyword) {
                Some(existing) => *existing = range.clone(),
                None => merged.push(range.clone()),
            }
        }
        let value = serde_json::to_value(&merged).unwrap_or(Value::Array(Vec::new()));
        self.set_field(fields::RESULTS_RANGE, value);
    }

    pub fn attachment_uids(&self) -> Vec<Uid> {
        value_to_uids(self.get_field(fields::ATTACHMENT))
    }

    pub fn add_attachment(&mut self, attachment: &Uid) {
        let mut uids = self.attachment_uids();
        if !uids.contains(attachment) {
            uids.push(attachment.clone());
        }
        let value = Value::Array(
            uids.iter()
                .map(|uid| Value::String(uid.to_string()))
                .collect(),
        );
        self.set_field(fields::ATTACHMENT, value);
    }

    pub fn analyses(&self) -> &[Analysis] {
        &self.analyses
    }

    pub fn analyses_mut(&mut self) -> &mut [Analysis] {
        &mut self.analyses
    }

    /// Add an analysis unless one with the same keyword already exists
    pub fn add_analysis(&mut self, analysis: Analysis) -> bool {
        if self
            .analyses
            .iter()
            .any(|existing| existing.keyword() == analysis.keyword())
        {
            return false;
        }
        self.analyses.push(analysis);
        true
    }

    pub fn analysis(&self, uid: &Uid) -> Option<&Analysis> {
        self.analyses.iter().find(|analysis| analysis.uid() == uid)
    }

    pub fn mark(&mut self, marker: Marker) {
        self.markers.insert(marker);
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    pub fn markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.markers.iter().copied()
    }

    pub fn is_invalid(&self) -> bool {
        self.review_state() == Some(SampleState::Invalid.as_str())
    }

    pub fn is_partition(&self) -> bool {
        self.parent_uid().is_some()
    }
}

impl Content for Sample {
    fn uid(&self) -> &Uid {
        &self.uid
    }

    fn portal_type(&self) -> &'static str {
        portal_types::ANALYSIS_REQUEST
    }

    fn manifest(&self) -> &'static [FieldDescriptor] {
        SAMPLE_FIELDS
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
