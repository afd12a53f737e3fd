//! # System Constants
//!
//! Transition names, portal types, field names and the fixed skip lists that
//! drive sample creation, retests and partitions.

/// Workflow transitions invoked by the orchestrator
pub mod transitions {
    pub const NO_SAMPLING_WORKFLOW: &str = "no_sampling_workflow";
    pub const TO_BE_SAMPLED: &str = "to_be_sampled";
    pub const RECEIVE: &str = "receive";
    pub const REJECT: &str = "reject";
    pub const INITIALIZE: &str = "initialize";
}

/// Content type names understood by the object factory
pub mod portal_types {
    pub const ANALYSIS_REQUEST: &str = "AnalysisRequest";
    pub const ANALYSIS: &str = "Analysis";
    pub const ANALYSIS_SERVICE: &str = "AnalysisService";
    pub const ATTACHMENT: &str = "Attachment";
    pub const SAMPLE_POINT: &str = "SamplePoint";
    pub const SAMPLE_TYPE: &str = "SampleType";
}

/// Schema field names referenced by the orchestrator
pub mod fields {
    pub const ID: &str = "id";
    pub const CREATION_DATE: &str = "creation_date";
    pub const MODIFICATION_DATE: &str = "modification_date";
    pub const CLIENT: &str = "Client";
    pub const CONTACT: &str = "Contact";
    pub const CC_CONTACT: &str = "CCContact";
    pub const ANALYSES: &str = "Analyses";
    pub const PROFILES: &str = "Profiles";
    pub const TEMPLATE: &str = "Template";
    pub const SAMPLE_TYPE: &str = "SampleType";
    pub const CONTAINER: &str = "Container";
    pub const PRESERVATION: &str = "Preservation";
    pub const INTERNAL_USE: &str = "InternalUse";
    pub const RESULTS_RANGE: &str = "ResultsRange";
    pub const DATE_SAMPLED: &str = "DateSampled";
    pub const SAMPLING_DATE: &str = "SamplingDate";
    pub const DATE_RECEIVED: &str = "DateReceived";
    pub const DATE_PUBLISHED: &str = "DatePublished";
    pub const REJECTION_REASONS: &str = "RejectionReasons";
    pub const REJECTION_REASONS_TEXTFIELD: &str = "RejectionReasons.textfield";
    pub const PRIMARY_ANALYSIS_REQUEST: &str = "PrimaryAnalysisRequest";
    pub const PARENT_ANALYSIS_REQUEST: &str = "ParentAnalysisRequest";
    pub const INVALIDATED: &str = "Invalidated";
    pub const ATTACHMENT: &str = "Attachment";

    // Analysis fields
    pub const SERVICE: &str = "Service";
    pub const KEYWORD: &str = "Keyword";
    pub const TITLE: &str = "title";
    pub const PRICE: &str = "Price";
    pub const HIDDEN: &str = "Hidden";
    pub const DATA_ANALYSIS_PUBLISHED: &str = "DataAnalysisPublished";
}

/// Catalog indexes reindexed selectively
pub mod indexes {
    pub const IS_ROOT_ANCESTOR: &str = "isRootAncestor";
    pub const DATE_RECEIVED: &str = "getDateReceived";
}

/// Lifecycle events published by the orchestrator
pub mod events {
    pub const SAMPLE_CREATED: &str = "sample.created";
    pub const SAMPLE_MODIFIED: &str = "sample.modified";
    pub const SAMPLE_RETEST_CREATED: &str = "sample.retest_created";
    pub const SAMPLE_PARTITION_CREATED: &str = "sample.partition_created";
    pub const SAMPLE_REJECTION_NOTIFIED: &str = "sample.rejection_notified";
}

/// Identifier that looks like a uid but never resolves to a service
pub const UNSET_UID: &str = "0";

/// Fields never copied from a parent sample into a new partition
pub const PARTITION_SKIP_FIELDS: &[&str] = &[
    "Analyses",
    "Attachment",
    "Client",
    "DetachedFrom",
    "Profile",
    "Profiles",
    "RejectionReasons",
    "Remarks",
    "ResultsInterpretation",
    "ResultsInterpretationDepts",
    "Sample",
    "Template",
    "creation_date",
    "id",
    "modification_date",
    "ParentAnalysisRequest",
    "PrimaryAnalysisRequest",
];

/// Fields never copied from an invalidated sample into its retest
pub const RETEST_SKIP_FIELDS: &[&str] = &["Analyses", "DatePublished", "Invalidated", "Sample"];

/// Fields never copied from a source analysis into its retest copy
pub const RETEST_ANALYSIS_SKIP_FIELDS: &[&str] = &["DataAnalysisPublished"];

pub const REJECTED_PDF_SUFFIX: &str = "-rejected";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_skip_fields_have_no_duplicates() {
        let mut names: Vec<&str> = PARTITION_SKIP_FIELDS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PARTITION_SKIP_FIELDS.len());
        assert_eq!(names.len(), 17);
    }

    #[test]
    fn test_retest_skip_fields() {
        assert!(RETEST_SKIP_FIELDS.contains(&fields::INVALIDATED));
        assert!(RETEST_SKIP_FIELDS.contains(&fields::ANALYSES));
        assert!(!RETEST_SKIP_FIELDS.contains(&fields::DATE_RECEIVED));
    }
}
