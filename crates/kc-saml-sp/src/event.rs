//! Audit events for authentication initiation.
//!
//! Every initiation ends with one event: the request that was sent, the
//! discovery redirect, or the error that stopped it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Web Browser SSO request sent.
    SsoRequestSent,
    /// Holder-of-Key Web Browser SSO request sent.
    HokSsoRequestSent,
    /// ECP request returned to the client.
    EcpRequestSent,
    /// User sent to the discovery service.
    DiscoveryRedirect,
    /// Initiation failed.
    SsoInitiationError,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: EventType,
    /// Outcome of the event.
    pub outcome: EventOutcome,
    /// Local entity id.
    pub local_entity_id: Option<String>,
    /// Peer entity id.
    pub peer_entity_id: Option<String>,
    /// ID of the sent message.
    pub message_id: Option<String>,
    /// Source IP address.
    pub ip_address: Option<String>,
    /// Error message (for failure events).
    pub error: Option<String>,
    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Returns the value of detail `key`.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the details as space-separated `key=value` pairs.
    #[must_use]
    pub fn details_text(&self) -> String {
        self.details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    local_entity_id: Option<String>,
    peer_entity_id: Option<String>,
    message_id: Option<String>,
    ip_address: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            local_entity_id: None,
            peer_entity_id: None,
            message_id: None,
            ip_address: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to failure with an error message.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the local entity.
    #[must_use]
    pub fn local_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.local_entity_id = Some(entity_id.into());
        self
    }

    /// Sets the peer entity, if known.
    #[must_use]
    pub fn peer_entity(mut self, entity_id: Option<&str>) -> Self {
        self.peer_entity_id = entity_id.map(String::from);
        self
    }

    /// Sets the sent message id.
    #[must_use]
    pub fn message(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Sets the IP address, if known.
    #[must_use]
    pub fn ip_address(mut self, ip: Option<&str>) -> Self {
        self.ip_address = ip.map(String::from);
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            local_entity_id: self.local_entity_id,
            peer_entity_id: self.peer_entity_id,
            message_id: self.message_id,
            ip_address: self.ip_address,
            error: self.error,
            details: self.details,
        }
    }
}

// ============================================================================
// Event Loggers
// ============================================================================

/// Destination for audit events.
#[async_trait]
pub trait SamlEventLogger: Send + Sync {
    /// Records an event. Failures are logged, never propagated.
    async fn log(&self, event: Event);
}

/// Event logger that keeps events in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventLogger {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventLogger {
    /// Creates a new in-memory logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all logged events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }
}

#[async_trait]
impl SamlEventLogger for InMemoryEventLogger {
    async fn log(&self, event: Event) {
        self.events.write().push(event);
    }
}

/// Event logger that writes to the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLogger;

#[async_trait]
impl SamlEventLogger for TracingEventLogger {
    async fn log(&self, event: Event) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            local_entity_id = ?event.local_entity_id,
            peer_entity_id = ?event.peer_entity_id,
            message_id = ?event.message_id,
            ip_address = ?event.ip_address,
            error = ?event.error,
            details = %event.details_text(),
            "saml_event"
        );
    }
}
