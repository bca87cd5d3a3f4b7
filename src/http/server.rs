//! HTTP server wrapper.

use std::any::Any;
use std::net::SocketAddr;

use axum::response::Response;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info};

use super::response;
use crate::error::Result;

/// HTTP server for a guarded router.
///
/// Wraps the router in the outermost failure boundary: a panic anywhere in
/// the handler chain becomes a generic 500 instead of tearing down the
/// connection or leaking internals.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    router: Router,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router: harden(router),
        }
    }

    /// Start the server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(listener, self.router).await?;
        Ok(())
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Starting HTTP server with graceful shutdown");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}

fn harden(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(handle_panic))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic"
    };
    error!(detail, "handler panicked");
    response::internal_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum_test::TestServer;
    use serde_json::Value;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let _server = HttpServer::new(addr, Router::new());
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_a_generic_500() {
        async fn broken() -> &'static str {
            panic!("connection pool exhausted: 10.0.0.3:5432");
        }

        let router = harden(Router::new().route("/api/broken", get(broken)));
        let server = TestServer::new(router).unwrap();

        let response = server.get("/api/broken").await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        // The panic message never reaches the client.
        assert_eq!(body["error"], "Internal server error");
    }
}
