//! JSON-backed document model.
//!
//! A document is a `.json` file holding a node tree: each node carries the
//! same fields the capability traits expose, children live under `layers`
//! (presence of the key marks a group), and embedded smart-object bytes are
//! base64-encoded under `smart_object.data_base64`. Fields other than `name`
//! are optional; an absent field surfaces as a [`FieldError`] so the caller's
//! per-field defaults apply.

use std::path::Path;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::{DocumentSource, FieldError, FieldResult, LayerSource, SmartObjectRef};

/// Errors opening a document through the built-in model.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document path does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The document could not be read.
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid JSON node tree.
    #[error("Failed to parse document '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// No document model is registered for this file type.
    #[error("No document model registered for '{0}' documents")]
    UnsupportedFormat(String),
}

/// A complete document described as a JSON node tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    /// Top-level layers in document order.
    #[serde(default)]
    pub layers: Vec<JsonLayer>,
}

/// One node of a JSON document tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonLayer {
    /// Layer name. The only required field.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[i64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Child layers. Presence of this key marks the node as a group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<JsonLayer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_object: Option<JsonSmartObject>,
}

/// Smart object attachment on a JSON node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSmartObject {
    /// Filename of the linked external document, when linked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_path: Option<String>,
    /// Base64-encoded bytes of the embedded sub-document, when embedded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
}

impl JsonDocument {
    /// Opens a JSON node-tree document.
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DocumentError::NotFound(display.clone())
            } else {
                DocumentError::Read {
                    path: display.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&contents).map_err(|source| DocumentError::Parse {
            path: display,
            source,
        })
    }
}

impl JsonLayer {
    fn field<T>(value: Option<T>, field: &'static str) -> FieldResult<T> {
        value.ok_or_else(|| FieldError::unavailable(field, "not present in document"))
    }
}

impl LayerSource for JsonLayer {
    fn name(&self) -> FieldResult<String> {
        Ok(self.name.clone())
    }

    fn visible(&self) -> FieldResult<bool> {
        Self::field(self.visible, "visible")
    }

    fn opacity(&self) -> FieldResult<f64> {
        Self::field(self.opacity, "opacity")
    }

    fn blend_mode(&self) -> FieldResult<String> {
        Self::field(self.blend_mode.clone(), "blend_mode")
    }

    fn bbox(&self) -> FieldResult<[i64; 4]> {
        Self::field(self.bbox, "bbox")
    }

    fn kind(&self) -> FieldResult<String> {
        Self::field(self.kind.clone(), "kind")
    }

    fn is_group(&self) -> FieldResult<bool> {
        Ok(self.layers.is_some())
    }

    fn smart_object(&self) -> FieldResult<Option<SmartObjectRef>> {
        let Some(smart) = &self.smart_object else {
            return Ok(None);
        };
        if let Some(linked) = &smart.linked_path {
            return Ok(Some(SmartObjectRef::linked(linked.clone())));
        }
        let data = match &smart.data_base64 {
            Some(encoded) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| {
                        FieldError::unavailable("smart_object", format!("invalid base64: {e}"))
                    })?,
            ),
            None => None,
        };
        Ok(Some(SmartObjectRef {
            linked_path: None,
            data,
        }))
    }

    fn children(&self) -> FieldResult<Vec<&dyn LayerSource>> {
        Ok(self
            .layers
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|layer| layer as &dyn LayerSource)
            .collect())
    }
}

impl DocumentSource for JsonDocument {
    fn root_layers(&self) -> FieldResult<Vec<&dyn LayerSource>> {
        Ok(self
            .layers
            .iter()
            .map(|layer| layer as &dyn LayerSource)
            .collect())
    }
}
