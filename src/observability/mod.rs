//! Uniform event emission for every orchestration component.
//!
//! All state operations, graph traversal steps, checkpoint interactions,
//! and workflow patterns report through a single [`Observer`] capability so
//! composed workflows produce one coherent trace. Event payloads carry
//! metadata only (node names, indices, counts, flags), never application
//! data.
//!
//! Observers are resolved by name through a process-wide [`registry`],
//! enabling configuration-driven selection ("noop", "tracing", or any
//! registered custom implementation).

pub mod event;
pub mod observer;
pub mod registry;

pub use event::{Event, EventType};
pub use observer::{
    ChannelObserver, MemoryObserver, MultiObserver, NoopObserver, Observer, TracingObserver,
};
pub use registry::{get_observer, register_observer, ObserverError};
