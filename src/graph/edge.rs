use super::predicate::TransitionPredicate;

/// A directed transition between two named nodes.
///
/// An edge with no predicate is unconditional. When a node has several
/// outgoing edges, they are evaluated in insertion order and the first edge
/// whose predicate passes (or that has none) wins.
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Optional label for diagnostics; unnamed edges are the common case.
    pub name: Option<String>,
    pub predicate: Option<TransitionPredicate>,
}

impl Edge {
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        predicate: Option<TransitionPredicate>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            name: None,
            predicate,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this edge transitions for `state`; unconditional edges
    /// behave as predicate-true.
    #[must_use]
    pub fn matches(&self, state: &crate::state::State) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(state))
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("name", &self.name)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}
