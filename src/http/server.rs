//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, timeout, limits)
//! - Translate each HTTP exchange into a context chain and request
//! - Dispatch to the resource router and render the result
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, Request as HttpRequest, State},
    http::{header, HeaderValue},
    response::Response as HttpResponse,
    routing::any,
    Router as AxumRouter,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::context::AdviceFrame;
use crate::error::{ResourceError, ResourceResult};
use crate::http::request::{build_context, parse_request, ApiSettings, PARAM_PRETTY_PRINT};
use crate::http::response::{error_response, render, RenderOptions};
use crate::observability::metrics;
use crate::request::{RequestHandler, RequestType};
use crate::routing::Router;

/// Largest request body the adapter will buffer.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const SERVER_NAME: &str = concat!("resource-router/", env!("CARGO_PKG_VERSION"));

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<Router>,
    pub api: Arc<ApiSettings>,
}

/// HTTP front end for a resource router.
pub struct HttpServer {
    router: AxumRouter,
}

impl HttpServer {
    /// Fails only when the configured protocol version is malformed.
    pub fn new(config: &ServerConfig, resources: Arc<Router>) -> ResourceResult<Self> {
        let state = AppState {
            resources,
            api: Arc::new(ApiSettings::from_config(&config.api)?),
        };
        Ok(Self {
            router: Self::build_router(config, state),
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &ServerConfig, state: AppState) -> AxumRouter {
        AxumRouter::new()
            .route("/{*path}", any(resource_handler))
            .route("/", any(resource_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::SERVER,
                HeaderValue::from_static(SERVER_NAME),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured Axum router, for embedding or in-process testing.
    pub fn router(&self) -> AxumRouter {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn wants_pretty_print(query: &[(String, String)]) -> bool {
    query
        .iter()
        .any(|(k, v)| k.eq_ignore_ascii_case(PARAM_PRETTY_PRINT) && v.eq_ignore_ascii_case("true"))
}

/// Adapt one HTTP exchange onto the resource router.
async fn resource_handler(State(state): State<AppState>, request: HttpRequest) -> HttpResponse {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let response = async {
        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .map_err(|e| ResourceError::BadRequest(format!("malformed query string: {}", e)));
        let query = match query {
            Ok(query) => query,
            Err(e) => return error_response(&e, false),
        };
        let pretty_print = wants_pretty_print(&query);

        let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(body) => body,
            Err(e) => {
                let error = ResourceError::BadRequest(format!("unreadable request body: {}", e));
                return error_response(&error, pretty_print);
            }
        };

        let context = match build_context(&state.api, &method, &path, &query, &parts.headers) {
            Ok(context) => context,
            Err(e) => return error_response(&e, pretty_print),
        };
        let adapted = match parse_request(&method, &path, &query, &parts.headers, &body) {
            Ok(adapted) => adapted,
            Err(e) => return error_response(&e, pretty_print),
        };

        let request_type = adapted.request.request_type();
        let fields = adapted.request.fields().to_vec();
        let location_base = (request_type == RequestType::Create)
            .then(|| format!("/{}", adapted.request.resource_name()));

        tracing::debug!(
            request_id = %request_id,
            request_type = %request_type,
            resource = %adapted.request.resource_name(),
            "Dispatching request"
        );
        let result = state.resources.handle(context.clone(), adapted.request).await;
        if let Err(e) = &result {
            if e.is_client_error() {
                tracing::debug!(request_id = %request_id, error = %e, "Request rejected");
            } else {
                tracing::error!(request_id = %request_id, error = %e, "Request failed");
            }
        }

        let advice = context
            .get::<AdviceFrame>()
            .map(AdviceFrame::advices)
            .unwrap_or_default();
        render(
            result,
            RenderOptions {
                request_type: Some(request_type),
                fields: &fields,
                pretty_print: adapted.pretty_print,
                location_base,
                advice,
            },
        )
    }
    .await;

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "Request complete"
    );
    response
}
