use std::sync::{Arc, LazyLock, RwLock};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::observer::{NoopObserver, Observer, TracingObserver};

/// Errors from named observer resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum ObserverError {
    /// The requested name has never been registered.
    #[error("unknown observer: {name}")]
    #[diagnostic(
        code(orchestrion::observability::unknown_observer),
        help("Built-in names are \"noop\" and \"tracing\"; register custom observers with register_observer.")
    )]
    Unknown { name: String },
}

static OBSERVERS: LazyLock<RwLock<FxHashMap<String, Arc<dyn Observer>>>> = LazyLock::new(|| {
    let mut table: FxHashMap<String, Arc<dyn Observer>> = FxHashMap::default();
    table.insert("noop".to_string(), Arc::new(NoopObserver));
    table.insert("tracing".to_string(), Arc::new(TracingObserver));
    RwLock::new(table)
});

/// Resolves a registered observer by name.
///
/// Enables configuration-driven selection: configs carry observer names as
/// strings and components resolve them during construction, so an unknown
/// name fails before any execution starts.
///
/// # Examples
///
/// ```
/// let observer = orchestrion::observability::get_observer("noop").unwrap();
/// assert!(orchestrion::observability::get_observer("nope").is_err());
/// ```
pub fn get_observer(name: &str) -> Result<Arc<dyn Observer>, ObserverError> {
    OBSERVERS
        .read()
        .expect("observer registry poisoned")
        .get(name)
        .cloned()
        .ok_or_else(|| ObserverError::Unknown {
            name: name.to_string(),
        })
}

/// Registers an observer under a name, overwriting any previous entry.
///
/// Safe for concurrent use. Registration is expected during process
/// initialization, before graphs and patterns resolve their configuration.
pub fn register_observer(name: impl Into<String>, observer: Arc<dyn Observer>) {
    OBSERVERS
        .write()
        .expect("observer registry poisoned")
        .insert(name.into(), observer);
}
