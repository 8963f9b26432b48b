use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single emission travelling through the bus.
///
/// Built by [`EventBus::emit`](super::EventBus::emit) and handed to every
/// listener by reference. Nothing keeps it after the emission returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Handle returned by every registration, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_carries_name_and_payload() {
        let event = Event::new("messageLogged", json!({"id": 1, "url": "some url here"}));
        assert_eq!(event.name, "messageLogged");
        assert_eq!(event.payload["id"], 1);
        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = Event::new("x", Value::Null);
        let b = Event::new("x", Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new("tick", json!([1, 2, 3]));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"name\":\"tick\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId(7).to_string(), "sub-7");
        assert_eq!(SubscriptionId(7).as_u64(), 7);
    }
}
