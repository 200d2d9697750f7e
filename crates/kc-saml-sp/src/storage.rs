//! Storage of in-flight protocol messages.
//!
//! Sent requests are kept so the response leg, which runs with a fresh
//! context, can be correlated through `InResponseTo`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SpResult;
use crate::transport::InboundRequest;
use crate::types::AuthnRequest;

/// How long a sent request waits for its response by default.
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(300);

/// Store for sent authentication requests.
///
/// Entries are single-use and expire after their TTL.
#[async_trait]
pub trait MessageStorage: Send + Sync {
    /// Stores `message` under `id` for at most `ttl`.
    async fn store(&self, id: &str, message: &AuthnRequest, ttl: Duration) -> SpResult<()>;

    /// Removes and returns the message stored under `id`.
    ///
    /// Returns `None` if the id is unknown, expired or already taken.
    async fn take(&self, id: &str) -> SpResult<Option<AuthnRequest>>;
}

/// Selects the message storage for a request.
pub trait MessageStorageFactory: Send + Sync {
    /// Returns the storage scoped to `request`.
    fn storage_for(&self, request: &InboundRequest) -> Arc<dyn MessageStorage>;
}

#[derive(Debug)]
struct StoredMessage {
    message: AuthnRequest,
    expires_at: Instant,
}

impl StoredMessage {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory message storage.
///
/// Expired entries are evicted on every write.
#[derive(Debug, Default)]
pub struct InMemoryMessageStorage {
    messages: Mutex<HashMap<String, StoredMessage>>,
}

impl InMemoryMessageStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drops every expired entry.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.messages.lock().retain(|_, stored| stored.is_live(now));
    }
}

#[async_trait]
impl MessageStorage for InMemoryMessageStorage {
    async fn store(&self, id: &str, message: &AuthnRequest, ttl: Duration) -> SpResult<()> {
        let now = Instant::now();
        let mut messages = self.messages.lock();
        messages.retain(|_, stored| stored.is_live(now));
        messages.insert(
            id.to_string(),
            StoredMessage {
                message: message.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn take(&self, id: &str) -> SpResult<Option<AuthnRequest>> {
        let now = Instant::now();
        Ok(self
            .messages
            .lock()
            .remove(id)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.message))
    }
}

/// Factory handing every request the same storage.
#[derive(Debug, Clone, Default)]
pub struct SharedMessageStorageFactory {
    storage: Arc<InMemoryMessageStorage>,
}

impl SharedMessageStorageFactory {
    /// Creates a factory over a new in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn storage(&self) -> Arc<InMemoryMessageStorage> {
        Arc::clone(&self.storage)
    }
}

impl MessageStorageFactory for SharedMessageStorageFactory {
    fn storage_for(&self, _request: &InboundRequest) -> Arc<dyn MessageStorage> {
        self.storage.clone()
    }
}
