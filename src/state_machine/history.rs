use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of an object's workflow history. The latest entry's
/// `review_state` is the object's current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub workflow_id: String,
    /// Transition that produced this entry, `None` for forced states
    pub action: Option<String>,
    pub review_state: String,
    pub actor: String,
    #[serde(default)]
    pub comments: String,
    pub time: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(
        workflow_id: impl Into<String>,
        action: Option<&str>,
        review_state: impl Into<String>,
        actor: impl Into<String>,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            action: action.map(str::to_string),
            review_state: review_state.into(),
            actor: actor.into(),
            comments: comments.into(),
            time: Utc::now(),
        }
    }
}
