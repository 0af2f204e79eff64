//! Local HTTP transport binding.
//!
//! Serves the same analyze contract as the file bridge over a synchronous
//! loopback endpoint: `GET /ping` for liveness, `POST /analyze` with a JSON
//! `{"path": ...}` body.

use std::io::Cursor;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;
use tiny_http::{Header, Method, Response, Server};

use crate::pipeline;
use crate::protocol::{BridgeRequest, ResultEnvelope, INVALID_REQUEST};

/// Startup errors for the HTTP delegate.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The loopback socket could not be bound.
    #[error("Failed to bind 127.0.0.1:{port}: {message}")]
    Bind { port: u16, message: String },
}

/// Serves `/ping` and `/analyze` on the loopback interface until killed.
pub fn serve(port: u16, extract_dir: PathBuf) -> Result<(), ServeError> {
    let server = Server::http(("127.0.0.1", port)).map_err(|source| ServeError::Bind {
        port,
        message: source.to_string(),
    })?;
    info!("delegate listening on 127.0.0.1:{port}");

    for mut request in server.incoming_requests() {
        let response = match (request.method(), request.url()) {
            (Method::Get, "/ping") => {
                json_response(&serde_json::json!({"ok": true, "message": "Delegate alive"}))
            }
            (Method::Post, "/analyze") => {
                let mut body = String::new();
                match request.as_reader().read_to_string(&mut body) {
                    Ok(_) => json_response(&handle_analyze(&body, &extract_dir)),
                    Err(source) => json_response(&ResultEnvelope::failure(format!(
                        "Failed to read request body: {source}"
                    ))),
                }
            }
            _ => Response::from_string("Not found").with_status_code(404),
        };
        if let Err(source) = request.respond(response) {
            warn!("failed to send response: {source}");
        }
    }
    Ok(())
}

/// Runs one analyze request; every failure mode folds into the envelope.
fn handle_analyze(body: &str, extract_dir: &Path) -> ResultEnvelope {
    let request: BridgeRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(source) => return ResultEnvelope::failure(format!("Malformed request: {source}")),
    };
    let Some(path) = request.path.filter(|path| !path.is_empty()) else {
        return ResultEnvelope::failure(INVALID_REQUEST);
    };
    match pipeline::analyze_document(Path::new(&path), extract_dir) {
        Ok(layers) => ResultEnvelope::success(layers, path),
        Err(source) => ResultEnvelope::failure(source.to_string()),
    }
}

fn json_response<T: serde::Serialize>(body: &T) -> Response<Cursor<Vec<u8>>> {
    let payload = serde_json::to_string(body)
        .unwrap_or_else(|_| r#"{"ok":false,"error":"Result serialization failed"}"#.to_string());
    let mut response = Response::from_string(payload);
    if let Ok(header) = Header::from_bytes(
        &b"Content-Type"[..],
        &b"application/json; charset=utf-8"[..],
    ) {
        response = response.with_header(header);
    }
    response
}
