//! HTTP API endpoints for the preview frontend.
//!
//! | Endpoint                  | Purpose                                  |
//! |---------------------------|------------------------------------------|
//! | `GET /`                   | Embedded viewer page                     |
//! | `GET /health`             | Liveness check                           |
//! | `/api/v1/preview`         | Synchronous render, JSON envelope        |
//! | `/api/v1/preview.webp`    | Synchronous render, raw bytes            |
//! | `/api/v1/preview.gif`     | Synchronous render, raw bytes            |
//! | `/api/v1/push`            | Replace the retained config              |
//! | `GET /api/v1/schema`      | Schema document (blocks on first load)   |
//! | `POST /api/v1/handlers/*` | Invoke a named schema handler            |

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tiny_http::{Method, Request};

use super::{ServerState, get_actual_ws_port, response};
use crate::embed::{ViewerVars, render_viewer};
use crate::runtime::AppConfig;

/// JSON envelope returned by `/api/v1/preview`.
#[derive(Debug, Serialize)]
struct PreviewResponse {
    img: String,
    img_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Body of a `/api/v1/handlers/{id}` request.
#[derive(Debug, Deserialize)]
struct HandlerRequest {
    #[serde(default)]
    #[allow(dead_code)] // Echoed by richer frontends, the path names the handler
    id: String,
    #[serde(default)]
    param: String,
}

/// Route a single HTTP request.
pub(super) fn handle_request(mut request: Request, state: &ServerState) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/");

    match (request.method().clone(), path) {
        (_, "/health") => response::respond_empty(request),
        (Method::Get, "/") | (Method::Get, "/index.html") => {
            let ws_port = get_actual_ws_port(state.config.serve.ws_port);
            response::respond_html(request, render_viewer(&ViewerVars { ws_port }))
        }
        (_, "/api/v1/preview") => preview_handler(request, state),
        (_, "/api/v1/preview.webp") | (_, "/api/v1/preview.gif") => image_handler(request, state),
        (_, "/api/v1/push") => push_handler(request, state),
        (Method::Get, "/api/v1/schema") => schema_handler(request, state),
        (Method::Post, path) if path.starts_with("/api/v1/handlers/") => {
            let name = path.trim_start_matches("/api/v1/handlers/").to_string();
            handler_handler(request, state, &name)
        }
        _ => response::respond_not_found(request),
    }
}

/// Decode the request's config mapping: form body values first (POST),
/// query string fills the gaps. First value per key wins.
fn parse_config(request: &mut Request) -> AppConfig {
    let query = request
        .url()
        .split_once('?')
        .map(|(_, qs)| qs.to_string())
        .unwrap_or_default();

    let mut config = AppConfig::new();

    if *request.method() == Method::Post {
        let mut body = String::new();
        let _ = request.as_reader().read_to_string(&mut body);
        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            config.entry(key.into_owned()).or_insert(value.into_owned());
        }
    }

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        config.entry(key.into_owned()).or_insert(value.into_owned());
    }

    config
}

/// Synchronous render returning the JSON envelope. Render failures travel
/// inside the envelope, not as an HTTP error.
fn preview_handler(mut request: Request, state: &ServerState) -> Result<()> {
    let config = parse_config(&mut request);
    let result = state.rt.block_on(state.handle.render(config));

    let img_type = state.config.render.format().as_str();
    let payload = match result {
        Ok(image) => PreviewResponse {
            img: image.to_base64(),
            img_type,
            error: None,
        },
        Err(e) => PreviewResponse {
            img: String::new(),
            img_type,
            error: Some(e.to_string()),
        },
    };

    response::respond_json(request, &payload)
}

/// Synchronous render returning raw image bytes.
fn image_handler(mut request: Request, state: &ServerState) -> Result<()> {
    let config = parse_config(&mut request);

    match state.rt.block_on(state.handle.render(config)) {
        Ok(image) => response::respond_bytes(request, image.format.mime(), image.data),
        Err(_) => response::respond_error(request, 500, "rendering app failed"),
    }
}

/// Replace the retained config for future file-triggered cycles. No cycle
/// is triggered and no body is returned.
fn push_handler(mut request: Request, state: &ServerState) -> Result<()> {
    let config = parse_config(&mut request);

    match state.rt.block_on(state.handle.push_config(config)) {
        Ok(()) => response::respond_empty(request),
        Err(e) => response::respond_error(request, 500, &e.to_string()),
    }
}

/// Schema document; blocks until the first load attempt completes.
fn schema_handler(request: Request, state: &ServerState) -> Result<()> {
    let schema = state.rt.block_on(state.handle.schema_json());
    response::respond_json_str(request, schema)
}

/// Invoke a named schema handler.
fn handler_handler(mut request: Request, state: &ServerState, name: &str) -> Result<()> {
    if name.is_empty() {
        return response::respond_error(request, 404, "no handler");
    }

    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let msg: HandlerRequest = match serde_json::from_str(&body) {
        Ok(msg) => msg,
        Err(e) => return response::respond_error(request, 500, &e.to_string()),
    };

    match state.rt.block_on(state.handle.call_handler(name, &msg.param)) {
        Ok(data) => response::respond_json_str(request, data),
        Err(e) => response::respond_error(request, 500, &e.to_string()),
    }
}
