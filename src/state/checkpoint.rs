use std::sync::{Arc, LazyLock, RwLock};

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::state::State;

/// Errors from checkpoint persistence and store resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointError {
    /// No checkpoint exists for the requested run id.
    #[error("checkpoint not found: {run_id}")]
    #[diagnostic(
        code(orchestrion::checkpoint::not_found),
        help("The run may never have reached a checkpoint interval, or its checkpoint was deleted on completion.")
    )]
    NotFound { run_id: String },

    /// The requested store name has never been registered.
    #[error("unknown checkpoint store: {name}")]
    #[diagnostic(
        code(orchestrion::checkpoint::unknown_store),
        help("\"memory\" is preregistered; register custom stores with register_checkpoint_store.")
    )]
    UnknownStore { name: String },

    /// Backend-specific persistence failure.
    #[error("checkpoint store failure: {message}")]
    #[diagnostic(code(orchestrion::checkpoint::storage))]
    Storage { message: String },
}

/// Pluggable persistence for state snapshots.
///
/// One checkpoint per run id: `save` overwrites any previous snapshot for
/// the same run. Implementations must be safe for concurrent use, since
/// independent graph runs may share one store.
///
/// The `State` itself is the checkpoint; there is no wrapper type. Stores
/// that serialize must use [`super::PersistedState`], which excludes the
/// observer reference.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persists `state` under its run id, replacing any prior snapshot.
    async fn save(&self, state: &State) -> Result<(), CheckpointError>;

    /// Loads the snapshot for `run_id`, failing with
    /// [`CheckpointError::NotFound`] for unknown runs.
    async fn load(&self, run_id: &str) -> Result<State, CheckpointError>;

    /// Removes the snapshot for `run_id`. Deleting an absent run succeeds.
    async fn delete(&self, run_id: &str) -> Result<(), CheckpointError>;

    /// Run ids with a stored snapshot, in no particular order.
    async fn list(&self) -> Result<Vec<String>, CheckpointError>;
}

impl std::fmt::Debug for dyn CheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn CheckpointStore").finish_non_exhaustive()
    }
}

/// Reference in-memory store: a single map guarded by a reader/writer lock.
///
/// Snapshots are held by value, observer reference included, so a state
/// loaded from this store keeps emitting through the same observer it was
/// saved with. Serializing backends re-attach an observer on load instead.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    states: RwLock<FxHashMap<String, State>>,
}

impl InMemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, state: &State) -> Result<(), CheckpointError> {
        self.states
            .write()
            .expect("checkpoint store poisoned")
            .insert(state.run_id().to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<State, CheckpointError> {
        self.states
            .read()
            .expect("checkpoint store poisoned")
            .get(run_id)
            .cloned()
            .ok_or_else(|| CheckpointError::NotFound {
                run_id: run_id.to_string(),
            })
    }

    async fn delete(&self, run_id: &str) -> Result<(), CheckpointError> {
        self.states
            .write()
            .expect("checkpoint store poisoned")
            .remove(run_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self
            .states
            .read()
            .expect("checkpoint store poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

static STORES: LazyLock<RwLock<FxHashMap<String, Arc<dyn CheckpointStore>>>> =
    LazyLock::new(|| {
        let mut table: FxHashMap<String, Arc<dyn CheckpointStore>> = FxHashMap::default();
        table.insert("memory".to_string(), Arc::new(InMemoryCheckpointStore::new()));
        RwLock::new(table)
    });

/// Resolves a registered checkpoint store by name.
///
/// # Examples
///
/// ```
/// let store = orchestrion::state::get_checkpoint_store("memory").unwrap();
/// assert!(orchestrion::state::get_checkpoint_store("s3").is_err());
/// ```
pub fn get_checkpoint_store(name: &str) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    STORES
        .read()
        .expect("checkpoint store registry poisoned")
        .get(name)
        .cloned()
        .ok_or_else(|| CheckpointError::UnknownStore {
            name: name.to_string(),
        })
}

/// Registers a store under a name, overwriting any previous entry.
///
/// Safe for concurrent use; expected during process initialization.
pub fn register_checkpoint_store(name: impl Into<String>, store: Arc<dyn CheckpointStore>) {
    STORES
        .write()
        .expect("checkpoint store registry poisoned")
        .insert(name.into(), store);
}
