//! In-process analysis pipeline.
//!
//! Dispatches a document path to a model backend, walks the layer tree, and
//! returns the wire records. This is the code path every transport binding
//! ultimately funnels into.

use std::path::Path;

use layerbridge_doc::{DocumentError, DocumentSource, FieldError, JsonDocument};
use layerbridge_extract::{LayerRecord, Walker};
use thiserror::Error;

/// Errors analyzing one document. Always request-scoped: the caller wraps
/// the message into a failure envelope and keeps serving.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The document could not be opened.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The opened document could not enumerate its top-level layers.
    #[error("Failed to enumerate document layers: {0}")]
    Layers(FieldError),
}

/// Opens `path` and walks its layer tree, materializing embedded smart
/// objects into `extract_dir`.
pub fn analyze_document(path: &Path, extract_dir: &Path) -> Result<Vec<LayerRecord>, AnalyzeError> {
    let document = open_document(path)?;
    let layers = document.root_layers().map_err(AnalyzeError::Layers)?;
    let walker = Walker::new(extract_dir);
    Ok(walker.walk(&layers, 0))
}

/// Dispatches on file extension to a document model backend.
///
/// The built-in model reads JSON node trees; proprietary decoders integrate
/// by implementing [`layerbridge_doc::DocumentSource`] and adding an arm
/// here.
fn open_document(path: &Path) -> Result<JsonDocument, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.display().to_string()));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "json" => JsonDocument::open(path),
        other => Err(DocumentError::UnsupportedFormat(if other.is_empty() {
            "extensionless".to_string()
        } else {
            format!(".{other}")
        })),
    }
}
