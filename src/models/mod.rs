pub mod analysis;
pub mod attachment;
pub mod contact;
pub mod fields;
pub mod ids;
pub mod rejection;
pub mod request;
pub mod sample;
pub mod sample_point;
pub mod service;

// Re-export core models for easy access
pub use analysis::{Analysis, AnalysisKind, ANALYSIS_FIELDS};
pub use attachment::Attachment;
pub use contact::Contact;
pub use fields::{Content, FieldDescriptor, FieldKind, FieldValues};
pub use ids::{temporary_id, Uid};
pub use rejection::{resolve_rejection_reasons, RejectionReason};
pub use request::RequestContext;
pub use sample::{Marker, Sample, SAMPLE_FIELDS};
pub use sample_point::{Bearing, Coordinate, SamplePoint, SampleType, SamplingFrequency};
pub use service::{
    get_hidden_service_uids, AnalysisService, Profile, ResultsRange, SampleTemplate,
    ServiceSetting, ServiceSettingsSource,
};
