//! Route table and request dispatch.
//!
//! # Responsibilities
//! - Hold (mode, template, handler) bindings, changeable at any time
//! - Pick the best binding for a resource name, or fail loudly on ties
//! - Forward the unmatched suffix with a router frame pushed on the context
//!
//! # Design Decisions
//! - The table is an `ArcSwap` snapshot: readers take a lock-free load and
//!   writers publish a whole new vector, so no reader sees half a binding
//! - Selection is pure and synchronous; the handler's future is returned
//!   without being awaited
//! - Routing never retries: the same table and name give the same answer

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::context::{Context, RouterFrame};
use crate::error::{ResourceError, ResourceResult};
use crate::name::ResourceName;
use crate::observability::metrics;
use crate::request::handler::ready;
use crate::request::{Request, RequestHandler, ResponseFuture};
use crate::routing::matcher::{RouteMatch, RouteMatcher, RouteMode};
use crate::routing::template::RouteTemplate;

/// Handle for removing one specific binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route-{}", self.0)
    }
}

/// One registered route.
pub struct RouteBinding {
    id: RouteId,
    matcher: RouteMatcher,
    handler: Arc<dyn RequestHandler>,
}

impl RouteBinding {
    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("id", &self.id)
            .field("mode", &self.matcher.mode())
            .field("pattern", &self.matcher.template().to_string())
            .finish()
    }
}

/// Outcome of route selection, before dispatch.
#[derive(Debug, Clone)]
pub struct Selected {
    pub binding: Arc<RouteBinding>,
    pub matched: RouteMatch,
}

/// Routes requests to handlers by resource name.
pub struct Router {
    routes: ArcSwap<Vec<Arc<RouteBinding>>>,
    default_route: ArcSwapOption<RouteBinding>,
    next_id: AtomicU64,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
            default_route: ArcSwapOption::empty(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> RouteId {
        RouteId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Register `handler` for `pattern`.
    ///
    /// Safe to call while other threads are routing.
    pub fn add_route<H>(&self, mode: RouteMode, pattern: &str, handler: H) -> ResourceResult<RouteId>
    where
        H: RequestHandler + 'static,
    {
        let matcher = RouteMatcher::parse(mode, pattern)?;
        let binding = Arc::new(RouteBinding {
            id: self.next_id(),
            matcher,
            handler: Arc::new(handler),
        });
        let id = binding.id;

        self.routes.rcu(|routes| {
            let mut next = Vec::with_capacity(routes.len() + 1);
            next.extend(routes.iter().cloned());
            next.push(binding.clone());
            next
        });

        let count = self.routes.load().len();
        metrics::set_route_count(count);
        tracing::info!(route_id = %id, mode = %mode, pattern = %pattern, routes = count, "Route added");
        Ok(id)
    }

    /// Remove every binding whose pattern canonically equals `pattern`.
    ///
    /// Returns how many bindings were removed.
    pub fn remove_route(&self, pattern: &str) -> ResourceResult<usize> {
        let template = RouteTemplate::parse(pattern)?;
        let removed = self.remove_where(|b| b.matcher.template() == &template);
        tracing::info!(pattern = %pattern, removed, "Routes removed");
        Ok(removed)
    }

    /// Remove the binding returned by [`Router::add_route`].
    pub fn remove_route_by_id(&self, id: RouteId) -> bool {
        let removed = self.remove_where(|b| b.id == id) > 0;
        if removed {
            tracing::info!(route_id = %id, "Route removed");
        }
        removed
    }

    fn remove_where<F>(&self, doomed: F) -> usize
    where
        F: Fn(&RouteBinding) -> bool,
    {
        let mut removed = 0;
        self.routes.rcu(|routes| {
            let kept: Vec<Arc<RouteBinding>> =
                routes.iter().filter(|b| !doomed(b)).cloned().collect();
            removed = routes.len() - kept.len();
            kept
        });
        metrics::set_route_count(self.routes.load().len());
        removed
    }

    /// Handler used when no binding matches. It receives the whole name.
    pub fn set_default_route<H>(&self, handler: H)
    where
        H: RequestHandler + 'static,
    {
        let binding = RouteBinding {
            id: self.next_id(),
            matcher: RouteMatcher::new(RouteMode::StartsWith, RouteTemplate::empty()),
            handler: Arc::new(handler),
        };
        self.default_route.store(Some(Arc::new(binding)));
        tracing::info!("Default route set");
    }

    pub fn clear_default_route(&self) {
        self.default_route.store(None);
    }

    /// Snapshot of the current bindings, in registration order.
    pub fn routes(&self) -> Vec<Arc<RouteBinding>> {
        self.routes.load().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }

    /// Choose the binding for `name` without dispatching.
    pub fn select(&self, name: &ResourceName) -> ResourceResult<Selected> {
        let routes = self.routes.load();
        let mut best: Option<(&Arc<RouteBinding>, RouteMatch)> = None;
        let mut tied: Vec<&Arc<RouteBinding>> = Vec::new();

        for binding in routes.iter() {
            let Some(candidate) = binding.matcher.matches(name) else {
                continue;
            };
            let rank = match &best {
                None => Ordering::Greater,
                Some((leader, lead)) => {
                    binding
                        .matcher
                        .rank(&candidate, &leader.matcher, lead)
                }
            };
            match rank {
                Ordering::Greater => {
                    best = Some((binding, candidate));
                    tied.clear();
                }
                Ordering::Equal => tied.push(binding),
                Ordering::Less => {}
            }
        }

        match best {
            Some((binding, _)) if !tied.is_empty() => {
                let patterns: Vec<String> = std::iter::once(binding)
                    .chain(tied)
                    .map(|b| format!("{} {}", b.matcher.mode(), b.matcher.template()))
                    .collect();
                metrics::record_route("ambiguous");
                tracing::error!(
                    resource = %name,
                    patterns = ?patterns,
                    "Ambiguous routes; refusing to guess"
                );
                Err(ResourceError::RouteAmbiguous {
                    resource: name.to_string(),
                    patterns,
                })
            }
            Some((binding, matched)) => {
                metrics::record_route("matched");
                Ok(Selected {
                    binding: binding.clone(),
                    matched,
                })
            }
            None => match self.default_route.load_full() {
                Some(binding) => {
                    metrics::record_route("default");
                    Ok(Selected {
                        binding,
                        matched: RouteMatch {
                            consumed: 0,
                            variables: Default::default(),
                        },
                    })
                }
                None => {
                    metrics::record_route("not_found");
                    tracing::warn!(resource = %name, "No route matched");
                    Err(ResourceError::RouteNotFound(name.to_string()))
                }
            },
        }
    }

    fn dispatch(&self, context: Context, request: Request) -> ResourceResult<ResponseFuture> {
        let name = request.resource_name().clone();
        let Selected { binding, matched } = self.select(&name)?;

        let prefix = name.head(matched.consumed)?;
        let suffix = name.tail(matched.consumed)?;
        tracing::debug!(
            resource = %name,
            route_id = %binding.id,
            pattern = %binding.matcher.template(),
            remaining = %suffix,
            "Route matched"
        );

        let context = context.with_router(RouterFrame {
            matched_uri: prefix.to_string(),
            remaining_uri: suffix.to_string(),
            uri_template_variables: matched.variables,
        });
        Ok(binding
            .handler
            .handle(context, request.with_resource_name(suffix)))
    }
}

impl RequestHandler for Router {
    fn handle(&self, context: Context, request: Request) -> ResponseFuture {
        match self.dispatch(context, request) {
            Ok(pending) => pending,
            Err(error) => ready(Err(error)),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.load())
            .field("has_default_route", &self.default_route.load().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{handler_fn, ActionResponse, Response};
    use serde_json::json;

    /// Echoes the route it was reached through.
    fn tagged(tag: &'static str) -> impl RequestHandler {
        handler_fn(move |context: Context, request: Request| async move {
            let frame = context.get::<RouterFrame>()?;
            Ok::<_, ResourceError>(Response::Action(ActionResponse::new(json!({
                "tag": tag,
                "suffix": request.resource_name().to_string(),
                "matched": frame.matched_uri,
                "variables": frame.uri_template_variables,
            }))))
        })
    }

    async fn route(router: &Router, path: &str) -> ResourceResult<serde_json::Value> {
        let request = Request::read(ResourceName::parse(path).unwrap())
            .build()
            .unwrap();
        router
            .handle(Context::root(), request)
            .await
            .map(|r| r.to_json())
    }

    #[tokio::test]
    async fn test_exact_beats_prefix() {
        let router = Router::new();
        router.add_route(RouteMode::StartsWith, "users", tagged("h1")).unwrap();
        router.add_route(RouteMode::Equals, "users/admin", tagged("h2")).unwrap();

        let admin = route(&router, "users/admin").await.unwrap();
        assert_eq!(admin["tag"], "h2");
        assert_eq!(admin["suffix"], "");

        let other = route(&router, "users/42").await.unwrap();
        assert_eq!(other["tag"], "h1");
        assert_eq!(other["suffix"], "42");
        assert_eq!(other["matched"], "users");
    }

    #[tokio::test]
    async fn test_literal_beats_template() {
        let router = Router::new();
        router.add_route(RouteMode::StartsWith, "users/{id}", tagged("template")).unwrap();
        router.add_route(RouteMode::StartsWith, "users/me", tagged("literal")).unwrap();

        assert_eq!(route(&router, "users/me/profile").await.unwrap()["tag"], "literal");
        let other = route(&router, "users/bjensen/profile").await.unwrap();
        assert_eq!(other["tag"], "template");
        assert_eq!(other["variables"]["id"], "bjensen");
        assert_eq!(other["suffix"], "profile");
    }

    #[tokio::test]
    async fn test_literal_prefix_beats_exact_template() {
        let router = Router::new();
        router.add_route(RouteMode::Equals, "users/{id}", tagged("template")).unwrap();
        router.add_route(RouteMode::StartsWith, "users/admin", tagged("literal")).unwrap();

        let admin = route(&router, "users/admin").await.unwrap();
        assert_eq!(admin["tag"], "literal");
        assert_eq!(admin["suffix"], "");
        assert_eq!(route(&router, "users/bjensen").await.unwrap()["tag"], "template");
    }

    #[tokio::test]
    async fn test_identical_routes_are_ambiguous() {
        let router = Router::new();
        router.add_route(RouteMode::StartsWith, "users", tagged("a")).unwrap();
        router.add_route(RouteMode::StartsWith, "users", tagged("b")).unwrap();

        let err = route(&router, "users/1").await.unwrap_err();
        assert!(matches!(err, ResourceError::RouteAmbiguous { ref patterns, .. } if patterns.len() == 2));
    }

    #[tokio::test]
    async fn test_not_found_and_default() {
        let router = Router::new();
        router.add_route(RouteMode::Equals, "users", tagged("users")).unwrap();
        assert!(matches!(
            route(&router, "groups").await,
            Err(ResourceError::RouteNotFound(_))
        ));

        router.set_default_route(tagged("fallback"));
        let fallback = route(&router, "groups/1").await.unwrap();
        assert_eq!(fallback["tag"], "fallback");
        assert_eq!(fallback["suffix"], "groups/1");
    }

    #[tokio::test]
    async fn test_remove_route() {
        let router = Router::new();
        let first = router.add_route(RouteMode::StartsWith, "users", tagged("a")).unwrap();
        router.add_route(RouteMode::Equals, "Users", tagged("b")).unwrap();
        router.add_route(RouteMode::Equals, "groups", tagged("c")).unwrap();

        assert!(router.remove_route_by_id(first));
        assert!(!router.remove_route_by_id(first));
        assert_eq!(router.remove_route("/users/").unwrap(), 1);
        assert_eq!(router.len(), 1);
        assert!(router.remove_route("a//b").is_err());
    }

    #[tokio::test]
    async fn test_nested_routers() {
        let inner = Router::new();
        inner.add_route(RouteMode::Equals, "devices/{deviceId}", tagged("device")).unwrap();
        let outer = Router::new();
        outer.add_route(RouteMode::StartsWith, "users/{userId}", inner).unwrap();

        let hit = route(&outer, "users/bjensen/devices/d1").await.unwrap();
        assert_eq!(hit["tag"], "device");
        assert_eq!(hit["matched"], "devices/d1");
        assert_eq!(hit["variables"]["deviceId"], "d1");
    }

    #[test]
    fn test_handle_does_not_await() {
        let router = Router::new();
        router
            .add_route(
                RouteMode::Equals,
                "slow",
                handler_fn(|_, _| std::future::pending::<ResourceResult<Response>>()),
            )
            .unwrap();
        let request = Request::read(ResourceName::parse("slow").unwrap()).build().unwrap();
        let _pending = router.handle(Context::root(), request);
    }
}
