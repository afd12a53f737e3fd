use crate::models::fields::FieldValues;
use serde::{Deserialize, Serialize};

/// The inbound request an orchestrator operation runs within
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// User the operation is performed on behalf of
    pub actor: String,
    /// Raw submitted form data
    #[serde(default)]
    pub form: FieldValues,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            form: FieldValues::new(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("system")
    }
}
