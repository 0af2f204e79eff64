//! Request/result envelope shared by every transport binding.

use layerbridge_extract::LayerRecord;
use serde::{Deserialize, Serialize};

/// Failure message for requests with a missing or unknown command or path.
pub const INVALID_REQUEST: &str = "Invalid command or path";

/// Command request consumed from `request.json` or an HTTP body.
///
/// Parsing is tolerant: unknown fields are ignored and missing fields
/// surface as `None`, so a malformed request becomes an inline failure
/// result rather than a crash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl BridgeRequest {
    /// Creates an `analyze` request for `path`.
    pub fn analyze(path: impl Into<String>) -> Self {
        Self {
            cmd: Some("analyze".to_string()),
            path: Some(path.into()),
        }
    }
}

/// Result published to `result.json` or returned over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerRecord>>,
    /// Unix timestamp in float seconds, stamped at envelope creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<f64>,
    /// The analyzed document path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    /// Success envelope stamped with the current time.
    pub fn success(layers: Vec<LayerRecord>, source: impl Into<String>) -> Self {
        Self {
            ok: true,
            layers: Some(layers),
            generated_at: Some(unix_now()),
            source: Some(source.into()),
            error: None,
        }
    }

    /// Failure envelope.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            layers: None,
            generated_at: None,
            source: None,
            error: Some(error.into()),
        }
    }
}

/// Current time as float seconds since the Unix epoch.
fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
