//! Request routing, independent of the transport

use std::time::Duration;

use hyper::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use swissknife_protocol::{ToolsListResponse, HEALTH_PATH, TOOLS_LIST_PATH};
use tracing::debug;

use super::catalog::{
    self, PROCESS_KILL_PATH, PROCESS_LIST_PATH, PROCESS_READ_PATH, PROCESS_START_PATH,
    PROCESS_STATUS_PATH, SHELL_EXEC_PATH,
};
use super::AppState;
use crate::process::{envelope, KillRequest, PidRequest, ReadRequest, StartRequest};
use crate::shell::{self, ExecRequest};

type Reply = (StatusCode, Value);

/// Dispatch one request to its handler
pub async fn route(state: &AppState, method: &Method, path: &str, body: &[u8]) -> Reply {
    let expected = match path {
        HEALTH_PATH | TOOLS_LIST_PATH => Method::GET,
        SHELL_EXEC_PATH | PROCESS_START_PATH | PROCESS_STATUS_PATH | PROCESS_KILL_PATH
        | PROCESS_READ_PATH | PROCESS_LIST_PATH => Method::POST,
        _ => return (StatusCode::NOT_FOUND, json!({"ok": false, "error": "not_found"})),
    };
    if *method != expected {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({"ok": false, "error": "method_not_allowed"}),
        );
    }

    match handle(state, path, body).await {
        Ok(value) => (StatusCode::OK, value),
        Err(reply) => reply,
    }
}

async fn handle(state: &AppState, path: &str, body: &[u8]) -> Result<Value, Reply> {
    let controller = &state.controller;
    let value = match path {
        HEALTH_PATH => json!({"ok": true}),
        TOOLS_LIST_PATH => to_value(ToolsListResponse {
            ok: true,
            tools: catalog::descriptors(),
        }),
        SHELL_EXEC_PATH => {
            let req: ExecRequest = parse(body)?;
            to_value(shell::exec(controller.base(), req).await)
        }
        PROCESS_START_PATH => envelope(controller.start(parse::<StartRequest>(body)?)),
        PROCESS_STATUS_PATH => envelope(controller.status(parse::<PidRequest>(body)?.pid)),
        PROCESS_KILL_PATH => {
            let req: KillRequest = parse(body)?;
            let timeout = req.timeout_s.map(Duration::from_secs);
            envelope(controller.kill(req.pid, req.force, timeout).await)
        }
        PROCESS_READ_PATH => {
            let req: ReadRequest = parse(body)?;
            envelope(
                controller
                    .read(req.pid, &req.stream, req.max_bytes, req.tail)
                    .await,
            )
        }
        PROCESS_LIST_PATH => envelope(Ok(controller.list())),
        _ => return Err((StatusCode::NOT_FOUND, json!({"ok": false, "error": "not_found"}))),
    };
    Ok(value)
}

/// Parse a JSON body; an empty body counts as `{}`
fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, Reply> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejecting request body");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"ok": false, "error": "invalid_request", "detail": e.to_string()}),
        )
    })
}

fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({"ok": false, "error": e.to_string()}))
}
