//! Event system for pipeline progress reporting
//!
//! Crates publish events to an [`EventEmitter`] without knowing who listens.
//! The emitter is an explicit value owned by whoever drives a run; it fans
//! events out to async subscribers and to a broadcast channel.

pub mod console;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error};

pub use console::{ConsoleSubscriber, ConsoleVerbosity};

/// Pipeline run lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A run started
    PipelineStarted {
        run_id: String,
        action: String,
        template: String,
        total_components: usize,
    },
    /// A run finished, successfully or not
    PipelineCompleted {
        run_id: String,
        action: String,
        success: bool,
        duration_ms: u64,
        errors: Vec<String>,
    },
}

/// Per-component events within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ComponentEvent {
    /// The component was resolved and is about to run
    ComponentStarted {
        component: String,
        action: String,
        index: usize,
    },
    /// The action returned a result
    ComponentCompleted {
        component: String,
        action: String,
        success: bool,
        duration_ms: u64,
        message: Option<String>,
    },
    /// The component does not implement the requested action
    ComponentSkipped {
        component: String,
        action: String,
    },
    /// Resolution or the action itself raised an error
    ComponentFailed {
        component: String,
        action: String,
        error: String,
    },
}

/// Main event enum that encompasses all event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SystemEvent {
    Pipeline(PipelineEvent),
    Component(ComponentEvent),
}

/// Event with metadata and correlation tracking
#[derive(Debug, Clone)]
pub struct EnhancedEvent {
    /// The actual event
    pub event: SystemEvent,
    /// Timestamp when the event occurred
    pub timestamp: SystemTime,
    /// Optional correlation ID for tracing related events
    pub correlation_id: Option<String>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for event subscribers
#[async_trait::async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle an event
    async fn handle_event(
        &self,
        event: &EnhancedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Subscriber name for debugging
    fn name(&self) -> &'static str;

    /// Check if subscriber is interested in this event type
    fn is_interested(&self, event: &SystemEvent) -> bool;
}

/// Event emitter for publishing events
pub struct EventEmitter {
    /// Event channel sender
    sender: broadcast::Sender<EnhancedEvent>,
    /// Registered subscribers
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
    /// Event correlation context
    correlation_context: RwLock<HashMap<String, String>>,
}

impl EventEmitter {
    /// Create a new event emitter with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscribers: RwLock::new(Vec::new()),
            correlation_context: RwLock::new(HashMap::new()),
        }
    }

    /// Add a subscriber
    pub async fn add_subscriber(&self, subscriber: Arc<dyn EventSubscriber>) {
        debug!("Event subscriber added: {}", subscriber.name());
        self.subscribers.write().await.push(subscriber);
    }

    /// Remove a subscriber by name
    pub async fn remove_subscriber(&self, name: &str) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let initial_len = subscribers.len();
        subscribers.retain(|s| s.name() != name);
        subscribers.len() != initial_len
    }

    /// Set correlation context for subsequent events
    pub async fn set_correlation_context(&self, context: HashMap<String, String>) {
        *self.correlation_context.write().await = context;
    }

    /// Clear correlation context
    pub async fn clear_correlation_context(&self) {
        self.correlation_context.write().await.clear();
    }

    /// Emit an event to all interested subscribers
    pub async fn emit(&self, event: SystemEvent) {
        self.emit_with_metadata(event, HashMap::new()).await;
    }

    /// Emit an event with custom metadata
    pub async fn emit_with_metadata(&self, event: SystemEvent, metadata: HashMap<String, String>) {
        let enhanced_event = {
            let correlation_context = self.correlation_context.read().await;
            let mut combined_metadata = correlation_context.clone();
            combined_metadata.extend(metadata);

            EnhancedEvent {
                event,
                timestamp: SystemTime::now(),
                correlation_id: correlation_context.get("correlation_id").cloned(),
                metadata: combined_metadata,
            }
        };

        // No receivers is the common case outside tests
        if let Err(e) = self.sender.send(enhanced_event.clone()) {
            debug!("No broadcast receivers for event: {}", e);
        }

        self.notify_subscribers(&enhanced_event).await;
    }

    /// Notify all interested subscribers in parallel
    async fn notify_subscribers(&self, event: &EnhancedEvent) {
        let subscribers = self.subscribers.read().await;

        let handles: Vec<_> = subscribers
            .iter()
            .filter(|subscriber| subscriber.is_interested(&event.event))
            .map(|subscriber| {
                let subscriber = Arc::clone(subscriber);
                async move {
                    if let Err(e) = subscriber.handle_event(event).await {
                        error!(
                            subscriber = subscriber.name(),
                            error = %e,
                            "Event subscriber failed to handle event"
                        );
                    }
                }
            })
            .collect();

        futures::future::join_all(handles).await;
    }

    /// Get the number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Create a receiver for the broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<EnhancedEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CAPACITY)
    }
}

/// Shorthand constructors for common events
pub mod utils {
    use super::*;

    /// Create a component started event
    pub fn component_started(component: &str, action: &str, index: usize) -> SystemEvent {
        SystemEvent::Component(ComponentEvent::ComponentStarted {
            component: component.to_string(),
            action: action.to_string(),
            index,
        })
    }

    /// Create a component failed event
    pub fn component_failed(component: &str, action: &str, error: &str) -> SystemEvent {
        SystemEvent::Component(ComponentEvent::ComponentFailed {
            component: component.to_string(),
            action: action.to_string(),
            error: error.to_string(),
        })
    }

    /// Create a component skipped event
    pub fn component_skipped(component: &str, action: &str) -> SystemEvent {
        SystemEvent::Component(ComponentEvent::ComponentSkipped {
            component: component.to_string(),
            action: action.to_string(),
        })
    }
}
