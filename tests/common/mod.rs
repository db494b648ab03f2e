//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use resource_router::config::ServerConfig;
use resource_router::context::RouterFrame;
use resource_router::lifecycle::Shutdown;
use resource_router::request::{handler_fn, ActionResponse, RequestHandler, Response};
use resource_router::{Context, HttpServer, Request, ResourceError, ResourceName, ResourceResult, Router};

/// A handler that reports how it was reached.
pub fn tagged(tag: &'static str) -> impl RequestHandler {
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

/// Route a read of `path` and return the response as JSON.
pub async fn read(router: &Router, path: &str) -> ResourceResult<Value> {
    let request = Request::read(ResourceName::parse(path)?).build()?;
    router
        .handle(Context::root(), request)
        .await
        .map(|r| r.to_json())
}

/// A running HTTP adapter on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `router` with default settings until the returned server drops.
pub async fn start_server(router: Arc<Router>) -> TestServer {
    let mut config = ServerConfig::default();
    config.observability.metrics_enabled = false;
    let server = HttpServer::new(&config, router).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    TestServer { addr, shutdown }
}

/// Client with no pooling, so tests never share connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
