//! Event handler table
//!
//! Built once at startup, then shared read-only with the client.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::protocol::Envelope;

/// Receives dispatch frames of the event types it is registered for.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope);
}

/// Maps an event type (`t`) to its handler.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`, replacing any previous one.
    pub fn register(&mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.handlers.insert(event_type.into(), handler);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        self.register(event_type, handler);
        self
    }

    pub fn get(&self, event_type: &str) -> Option<Arc<dyn EventHandler>> {
        self.handlers.get(event_type).cloned()
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("event_types", &self.event_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle(&self, _envelope: Envelope) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_lookup_by_event_type() {
        let counter = Arc::new(Counter::default());
        let table = HandlerTable::new()
            .with("GROUP_AT_MESSAGE_CREATE", counter.clone())
            .with("C2C_MESSAGE_CREATE", counter.clone());

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.event_types(),
            vec!["C2C_MESSAGE_CREATE", "GROUP_AT_MESSAGE_CREATE"]
        );
        assert!(table.get("AT_MESSAGE_CREATE").is_none());

        let handler = table.get("C2C_MESSAGE_CREATE").unwrap();
        handler
            .handle(Envelope::dispatch(1, "C2C_MESSAGE_CREATE", json!({})))
            .await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
