//! Capability traits for opened documents and their layer nodes.

use thiserror::Error;

/// Error raised by a single accessor on a document node.
///
/// Accessors are best-effort: a failure describes one field of one node and
/// carries enough context for the caller to degrade or report it without
/// giving up on the rest of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The field is not present or not readable on this node.
    #[error("field '{field}' unavailable: {reason}")]
    Unavailable { field: &'static str, reason: String },

    /// The backing decoder failed while producing the value.
    #[error("document backend error: {0}")]
    Backend(String),
}

impl FieldError {
    /// Creates an unavailable-field error.
    pub fn unavailable(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type for node accessors.
pub type FieldResult<T> = Result<T, FieldError>;

/// Reference to a smart object attached to a layer.
///
/// A smart object is either linked (a filename pointing at an external
/// document) or embedded (the sub-document's raw bytes stored inline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartObjectRef {
    /// Filename of the linked external document, when linked.
    pub linked_path: Option<String>,
    /// Raw bytes of the embedded sub-document, when embedded.
    pub data: Option<Vec<u8>>,
}

impl SmartObjectRef {
    /// Creates a reference to a linked smart object.
    pub fn linked(path: impl Into<String>) -> Self {
        Self {
            linked_path: Some(path.into()),
            data: None,
        }
    }

    /// Creates a reference to an embedded smart object.
    pub fn embedded(data: Vec<u8>) -> Self {
        Self {
            linked_path: None,
            data: Some(data),
        }
    }

    /// True when the smart object references an external document.
    pub fn is_linked(&self) -> bool {
        self.linked_path.is_some()
    }
}

/// One node in a document's layer hierarchy.
///
/// Every accessor returns a [`FieldResult`] so a caller can apply a
/// documented default for one unreadable field while still using the rest of
/// the node.
pub trait LayerSource {
    /// Layer name as stored in the document.
    fn name(&self) -> FieldResult<String>;

    /// Layer visibility flag.
    fn visible(&self) -> FieldResult<bool>;

    /// Layer opacity in `[0.0, 1.0]`.
    fn opacity(&self) -> FieldResult<f64>;

    /// Blend mode identifier (e.g. `"normal"`, `"multiply"`).
    fn blend_mode(&self) -> FieldResult<String>;

    /// Bounding box as `[left, top, right, bottom]`.
    fn bbox(&self) -> FieldResult<[i64; 4]>;

    /// Node kind tag (e.g. `"pixel"`, `"group"`, `"smartobject"`).
    fn kind(&self) -> FieldResult<String>;

    /// Whether this node is a group containing child layers.
    fn is_group(&self) -> FieldResult<bool>;

    /// Smart object attached to this layer, if any.
    fn smart_object(&self) -> FieldResult<Option<SmartObjectRef>>;

    /// Child layers in document order. Meaningful only for groups.
    fn children(&self) -> FieldResult<Vec<&dyn LayerSource>>;
}

/// An opened document exposing its top-level layers.
pub trait DocumentSource {
    /// Top-level layers in document order.
    fn root_layers(&self) -> FieldResult<Vec<&dyn LayerSource>>;
}
