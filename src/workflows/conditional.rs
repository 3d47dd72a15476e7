use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use rustc_hash::FxHashMap;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::ConditionalConfig;
use crate::observability::{get_observer, Event, EventType};
use crate::BoxError;

use super::error::{Cancelled, ConditionalError, NoHandler};

const EVENT_SOURCE: &str = "conditional";

/// Async handler bound to one route.
pub type RouteHandler<S> =
    Arc<dyn Fn(CancellationToken, S) -> BoxFuture<'static, Result<S, BoxError>> + Send + Sync>;

/// Named handlers plus an optional fallback.
///
/// # Examples
///
/// ```
/// use orchestrion::workflows::Routes;
///
/// let routes: Routes<i64> = Routes::new()
///     .route("double", |_ctx, n| async move { Ok(n * 2) })
///     .default_route(|_ctx, n| async move { Ok(n) });
/// assert_eq!(routes.len(), 1);
/// assert!(routes.has_default());
/// ```
pub struct Routes<S> {
    handlers: FxHashMap<String, RouteHandler<S>>,
    default: Option<RouteHandler<S>>,
}

impl<S> Default for Routes<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Routes<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: FxHashMap::default(),
            default: None,
        }
    }

    /// Registers a handler under `name`, replacing any previous one.
    #[must_use]
    pub fn route<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CancellationToken, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, BoxError>> + Send + 'static,
    {
        self.handlers.insert(
            name.into(),
            Arc::new(move |ctx, state| Box::pin(handler(ctx, state))),
        );
        self
    }

    /// Registers the fallback used when the selected name has no handler.
    #[must_use]
    pub fn default_route<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(CancellationToken, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, BoxError>> + Send + 'static,
    {
        self.default = Some(Arc::new(move |ctx, state| Box::pin(handler(ctx, state))));
        self
    }

    /// Number of named handlers, default excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn select(&self, name: &str) -> Option<&RouteHandler<S>> {
        self.handlers.get(name).or(self.default.as_ref())
    }
}

/// Selects and runs one handler based on a routing predicate.
///
/// Single-shot: the predicate maps the state to a route name, the matching
/// handler (or the default) runs once, and its output state is returned.
/// Failures carry the route name and the state before the failing step.
pub async fn process_conditional<S, P>(
    ctx: CancellationToken,
    config: &ConditionalConfig,
    state: S,
    predicate: P,
    routes: &Routes<S>,
) -> Result<S, ConditionalError<S>>
where
    S: Clone,
    P: Fn(&S) -> Result<String, BoxError>,
{
    let observer = get_observer(&config.observer)?;

    if ctx.is_cancelled() {
        return Err(ConditionalError::Route {
            route: String::new(),
            state,
            source: Box::new(Cancelled),
        });
    }

    observer.on_event(
        Event::new(EventType::RouteEvaluate, EVENT_SOURCE)
            .with("route_count", json!(routes.len()))
            .with("has_default", json!(routes.has_default())),
    );

    let route = match predicate(&state) {
        Ok(route) => route,
        Err(source) => {
            return Err(ConditionalError::Route {
                route: String::new(),
                state,
                source,
            });
        }
    };

    let handler = match routes.select(&route) {
        Some(handler) => handler.clone(),
        None => {
            return Err(ConditionalError::Route {
                route: route.clone(),
                state,
                source: Box::new(NoHandler { route }),
            });
        }
    };

    observer
        .on_event(Event::new(EventType::RouteSelect, EVENT_SOURCE).with("route", json!(route)));

    if ctx.is_cancelled() {
        return Err(ConditionalError::Route {
            route,
            state,
            source: Box::new(Cancelled),
        });
    }

    let result = handler(ctx.clone(), state.clone()).await;
    observer.on_event(
        Event::new(EventType::RouteExecute, EVENT_SOURCE)
            .with("route", json!(route))
            .with("error", json!(result.is_err())),
    );

    match result {
        Ok(next) => Ok(next),
        Err(source) => Err(ConditionalError::Route {
            route,
            state,
            source,
        }),
    }
}
