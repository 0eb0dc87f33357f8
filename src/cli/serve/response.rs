//! HTTP response helpers.

use anyhow::Result;
use serde::Serialize;
use tiny_http::{Header, Request, Response, StatusCode};

fn content_type(value: &str) -> Header {
    Header::from_bytes("Content-Type", value).unwrap()
}

/// Respond with a serialized JSON payload.
pub fn respond_json<T: Serialize>(request: Request, payload: &T) -> Result<()> {
    match serde_json::to_string(payload) {
        Ok(body) => respond_json_str(request, body),
        Err(e) => respond_error(request, 500, &e.to_string()),
    }
}

/// Respond with a pre-serialized JSON document.
pub fn respond_json_str(request: Request, body: String) -> Result<()> {
    let response = Response::from_string(body).with_header(content_type("application/json"));
    request.respond(response)?;
    Ok(())
}

/// Respond with raw bytes and an explicit content type.
pub fn respond_bytes(request: Request, mime: &str, bytes: Vec<u8>) -> Result<()> {
    let response = Response::from_data(bytes).with_header(content_type(mime));
    request.respond(response)?;
    Ok(())
}

/// Respond with an HTML page.
pub fn respond_html(request: Request, html: String) -> Result<()> {
    let response = Response::from_string(html).with_header(content_type("text/html"));
    request.respond(response)?;
    Ok(())
}

/// Respond 200 with no body (health checks).
pub fn respond_empty(request: Request) -> Result<()> {
    request.respond(Response::empty(StatusCode(200)))?;
    Ok(())
}

/// Respond with a plain-text error status.
pub fn respond_error(request: Request, status: u16, message: &str) -> Result<()> {
    let response = Response::from_string(format!("{message}\n"))
        .with_status_code(StatusCode(status))
        .with_header(content_type("text/plain"));
    request.respond(response)?;
    Ok(())
}

/// Respond 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    respond_error(request, 404, "not found")
}

/// Respond 503 while shutting down.
pub fn respond_unavailable(request: Request) -> Result<()> {
    respond_error(request, 503, "shutting down")
}
