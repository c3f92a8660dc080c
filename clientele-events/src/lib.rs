//! Clientele Events - Customer change events and publishing
//!
//! Every committed customer mutation is announced on one of three topics:
//!
//! ```text
//! customer-created  -> full customer
//! customer-updated  -> full customer
//! customer-deleted  -> {"id": <id>}
//! ```
//!
//! Publishing is best-effort. The [`EventPublisher`] trait is the seam
//! between the request path and the broker sidecar; [`InMemoryEventBus`]
//! stands in for the broker in tests.

mod event;
mod publisher;

pub use event::{
    CustomerEvent, DeliveredEvent, CUSTOMER_TOPICS, TOPIC_CUSTOMER_CREATED,
    TOPIC_CUSTOMER_DELETED, TOPIC_CUSTOMER_UPDATED,
};
pub use publisher::{publish_event, EventPublisher, InMemoryEventBus, PublishedMessage};
