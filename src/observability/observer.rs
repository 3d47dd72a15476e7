use std::sync::{Arc, Mutex};

use super::event::Event;

/// Capability that receives every trace event from the orchestration core.
///
/// Observers must be side-effect-bounded (logging, metrics, forwarding);
/// they never mutate workflow state. Emission is synchronous, so
/// implementations should return quickly and push any buffering or I/O
/// behind a channel.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: Event);
}

impl std::fmt::Debug for dyn Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Observer").finish_non_exhaustive()
    }
}

/// Discards every event.
///
/// Used when observability is not wanted and substituted automatically when
/// a component is handed no observer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _event: Event) {}
}

/// Emits events through the host `tracing` subscriber.
///
/// This is the structured-log observer: each event becomes one `info!`
/// record carrying the event type, source, and metadata map. Formatting is
/// left entirely to the installed subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: Event) {
        tracing::info!(
            target: "orchestrion::event",
            event_type = event.event_type.as_str(),
            source = %event.source,
            data = %serde_json::Value::Object(
                event
                    .data
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            ),
            "workflow event"
        );
    }
}

/// Fans each event out to a set of child observers.
///
/// Absent children are filtered at construction so emission never has to
/// re-check them.
pub struct MultiObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl MultiObserver {
    #[must_use]
    pub fn new(observers: impl IntoIterator<Item = Option<Arc<dyn Observer>>>) -> Self {
        Self {
            observers: observers.into_iter().flatten().collect(),
        }
    }

    /// Number of live children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Observer for MultiObserver {
    fn on_event(&self, event: Event) {
        for obs in &self.observers {
            obs.on_event(event.clone());
        }
    }
}

/// Forwards events into a flume channel for async consumers.
///
/// The send never blocks; once the receiver is gone, events are dropped
/// silently, keeping emission side-effect-bounded.
#[derive(Clone)]
pub struct ChannelObserver {
    tx: flume::Sender<Event>,
}

impl ChannelObserver {
    #[must_use]
    pub fn new(tx: flume::Sender<Event>) -> Self {
        Self { tx }
    }
}

impl Observer for ChannelObserver {
    fn on_event(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// In-memory observer for tests and snapshots.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use orchestrion::observability::{MemoryObserver, Observer, Event, EventType};
///
/// let memory = Arc::new(MemoryObserver::new());
/// memory.on_event(Event::new(EventType::GraphStart, "g"));
/// assert_eq!(memory.snapshot().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryObserver {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events captured so far, in emission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Event types captured so far, in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<super::event::EventType> {
        self.events.lock().unwrap().iter().map(|e| e.event_type).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Observer for MemoryObserver {
    fn on_event(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
