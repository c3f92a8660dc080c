//! Customer change events.

use clientele_core::{Customer, CustomerId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const TOPIC_CUSTOMER_CREATED: &str = "customer-created";
pub const TOPIC_CUSTOMER_UPDATED: &str = "customer-updated";
pub const TOPIC_CUSTOMER_DELETED: &str = "customer-deleted";

/// Every topic the service publishes to.
pub const CUSTOMER_TOPICS: [&str; 3] = [
    TOPIC_CUSTOMER_CREATED,
    TOPIC_CUSTOMER_UPDATED,
    TOPIC_CUSTOMER_DELETED,
];

/// A committed change to a customer row.
///
/// Published only after the record store transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CustomerEvent {
    /// A customer was inserted. Carries the full row.
    Created { customer: Customer },

    /// A customer was replaced. Carries the full new row.
    Updated { customer: Customer },

    /// A customer was deleted. Carries only the id.
    Deleted { id: CustomerId },
}

impl CustomerEvent {
    /// Topic this event is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            CustomerEvent::Created { .. } => TOPIC_CUSTOMER_CREATED,
            CustomerEvent::Updated { .. } => TOPIC_CUSTOMER_UPDATED,
            CustomerEvent::Deleted { .. } => TOPIC_CUSTOMER_DELETED,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        match self {
            CustomerEvent::Created { customer } | CustomerEvent::Updated { customer } => {
                customer.id
            }
            CustomerEvent::Deleted { id } => *id,
        }
    }

    /// Wire payload: the customer JSON for created/updated, `{"id": id}` for
    /// deleted.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            CustomerEvent::Created { customer } | CustomerEvent::Updated { customer } => {
                serde_json::to_value(customer)
            }
            CustomerEvent::Deleted { id } => Ok(json!({ "id": id })),
        }
    }
}

/// An event delivered to the subscription endpoint.
///
/// The sidecar normally wraps payloads in a CloudEvents envelope, but raw
/// payloads (a bare customer, or `{"id": 9}` for a delete) are accepted too.
/// Only the fields needed for logging are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliveredEvent {
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub id: Option<Value>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub pubsubname: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub data: Option<Value>,
}

impl DeliveredEvent {
    /// Read an event from any JSON object.
    ///
    /// Envelope fields of the wrong JSON type are ignored. A body without a
    /// `data` member is treated as the payload itself. Returns `None` when
    /// the body is not an object.
    pub fn from_body(body: Value) -> Option<Self> {
        let Value::Object(mut fields) = body else {
            return None;
        };
        let text = |fields: &serde_json::Map<String, Value>, key: &str| {
            fields.get(key).and_then(Value::as_str).map(str::to_string)
        };

        let topic = text(&fields, "topic");
        let pubsubname = text(&fields, "pubsubname");
        let event_type = text(&fields, "type");
        let id = fields.get("id").cloned();
        let data = match fields.remove("data") {
            Some(data) => data,
            None => Value::Object(fields),
        };

        Some(Self {
            id,
            topic,
            pubsubname,
            event_type,
            data: Some(data),
        })
    }

    /// Customer id carried in `data.id`, if any.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.data.as_ref()?.get("id")?.as_i64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn customer() -> Customer {
        Customer {
            id: 3,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "a@b.com".to_string(),
            phone: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_topics() {
        assert_eq!(
            CustomerEvent::Created { customer: customer() }.topic(),
            "customer-created"
        );
        assert_eq!(
            CustomerEvent::Updated { customer: customer() }.topic(),
            "customer-updated"
        );
        assert_eq!(CustomerEvent::Deleted { id: 3 }.topic(), "customer-deleted");
    }

    #[test]
    fn test_created_payload_is_full_customer() -> Result<(), serde_json::Error> {
        let c = customer();
        let payload = CustomerEvent::Created { customer: c.clone() }.payload()?;
        let decoded: Customer = serde_json::from_value(payload)?;
        assert_eq!(decoded, c);
        Ok(())
    }

    #[test]
    fn test_deleted_payload_is_id_only() -> Result<(), serde_json::Error> {
        let payload = CustomerEvent::Deleted { id: 7 }.payload()?;
        assert_eq!(payload, json!({"id": 7}));
        Ok(())
    }

    #[test]
    fn test_delivered_event_from_cloud_event() {
        let event = DeliveredEvent::from_body(json!({
            "id": "5929aaac-a5e2-4ca1-859c-edfe73f11565",
            "specversion": "1.0",
            "type": "com.dapr.event.sent",
            "topic": "customer-deleted",
            "pubsubname": "pubsub",
            "data": {"id": 12}
        }))
        .unwrap_or_default();
        assert_eq!(event.topic.as_deref(), Some("customer-deleted"));
        assert_eq!(event.pubsubname.as_deref(), Some("pubsub"));
        assert_eq!(event.customer_id(), Some(12));
    }

    #[test]
    fn test_delivered_event_from_raw_delete_payload() {
        let event = DeliveredEvent::from_body(json!({"id": 9})).unwrap_or_default();
        assert!(event.topic.is_none());
        assert_eq!(event.id, Some(json!(9)));
        assert_eq!(event.customer_id(), Some(9));
    }

    #[test]
    fn test_delivered_event_from_raw_customer() -> Result<(), serde_json::Error> {
        let body = CustomerEvent::Created { customer: customer() }.payload()?;
        let event = DeliveredEvent::from_body(body).unwrap_or_default();
        assert_eq!(event.customer_id(), Some(3));
        assert!(event.event_type.is_none());
        Ok(())
    }

    #[test]
    fn test_delivered_event_rejects_non_object() {
        assert!(DeliveredEvent::from_body(json!([1, 2])).is_none());
        assert!(DeliveredEvent::from_body(json!("customer-created")).is_none());
    }
}
