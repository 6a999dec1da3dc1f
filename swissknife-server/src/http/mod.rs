//! HTTP control endpoint
//!
//! JSON in, JSON out. Routing lives in [`routes`]; this module only owns the
//! listener loop and body plumbing.

mod catalog;
mod routes;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::process::ProcessController;

/// State shared by every connection
#[derive(Debug)]
pub struct AppState {
    pub controller: ProcessController,
}

impl AppState {
    pub fn new(controller: ProcessController) -> Self {
        Self { controller }
    }
}

/// Accept connections until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Control server listening on http://{}", addr);
    }

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                let (stream, remote_addr) = match accept_result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Control server accept error: {}", e);
                        continue;
                    }
                };

                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(req, state, remote_addr).await }
                    });

                    if let Err(e) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        if !e.is_incomplete_message() {
                            warn!("Connection error from {}: {}", remote_addr, e);
                        }
                    }
                });
            }

            _ = shutdown.recv() => {
                info!("Control server shutting down");
                break;
            }
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    let (status, value) = match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            routes::route(&state, &parts.method, &path, &bytes).await
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "error": "invalid_request", "detail": e.to_string()}),
        ),
    };

    debug!(method = %parts.method, %path, status = status.as_u16(), %remote_addr, "Handled request");
    Ok(json_response(status, &value))
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
