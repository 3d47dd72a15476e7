//! ```text
//! GraphConfig ──► Graph::new ─► add_node / add_edge / entry / exits
//!                  │
//!                  ├─► execute / resume ─► Node::run ─► State (immutable)
//!                  │                        │             │
//!                  │                        │             └─► Observer (events)
//!                  │                        └─► workflows (chain / parallel / conditional)
//!                  │
//!                  └─► CheckpointStore (in-memory / registered)
//! ```
//!
//! Orchestrion is a library for building stateful multi-agent workflows as
//! directed graphs. Immutable [`state::State`] flows through named nodes,
//! every execution carries a stable run id, and the interpreter can suspend
//! after any node and resume later from a checkpoint store. The composable
//! patterns in [`workflows`] (sequential fold, bounded parallel fan-out,
//! predicate-based routing) work standalone or embedded as graph nodes, and
//! all components emit a uniform event trace through the [`observability`]
//! layer.

pub mod config;
pub mod graph;
pub mod observability;
pub mod state;
pub mod workflows;

/// Error type produced by user-supplied processors and handlers.
///
/// Patterns wrap these in their structured error types; the original error
/// stays reachable through `std::error::Error::source`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
