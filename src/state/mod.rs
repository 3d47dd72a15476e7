//! Immutable workflow state with execution provenance.
//!
//! [`State`] is the value that flows through graph execution: a string-keyed
//! map of JSON values plus provenance (run id, last checkpointed node,
//! timestamp) and a non-persisted observer capability. Every mutating
//! operation returns a new `State`; the receiver is never touched.
//!
//! Checkpointing treats `State` itself as the checkpoint: the
//! [`CheckpointStore`] trait persists one snapshot per run id, and
//! [`PersistedState`] is the serde-friendly shape used by serializing
//! backends.

pub mod checkpoint;
pub mod persistence;
#[allow(clippy::module_inception)]
pub mod state;

pub use checkpoint::{
    get_checkpoint_store, register_checkpoint_store, CheckpointError, CheckpointStore,
    InMemoryCheckpointStore,
};
pub use persistence::PersistedState;
pub use state::State;
