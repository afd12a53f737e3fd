use crate::models::{Content, Sample};
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Broadcasts sample lifecycle events to any interested observer
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event and return how many observers received it. Having
    /// no observers is not an error.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) -> usize {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };
        self.sender.send(event).unwrap_or(0)
    }

    /// Publish an event describing `sample` as it is now
    pub fn publish_sample_event(
        &self,
        event_name: &str,
        sample: &Sample,
        extra: Option<Value>,
    ) -> usize {
        let mut context = json!({
            "uid": sample.uid().as_str(),
            "id": sample.id(),
            "review_state": sample.review_state(),
        });
        if let (Some(Value::Object(extra)), Some(map)) = (extra, context.as_object_mut()) {
            map.extend(extra);
        }
        self.publish(event_name, context)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}
