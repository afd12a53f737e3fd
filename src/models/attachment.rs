use crate::models::ids::Uid;
use serde::{Deserialize, Serialize};

/// File attached to a sample, such as a rendered rejection report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub uid: Uid,
    pub id: String,
    pub filename: String,
    pub content_type: String,
    #[serde(default)]
    pub data: Vec<u8>,
}
