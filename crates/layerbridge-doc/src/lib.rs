//! Document-model capability for layerbridge.
//!
//! Layered-image decoding is deliberately not implemented here. This crate
//! defines the capability surface a decoder must provide: an opened document
//! that enumerates its layer hierarchy through per-field, result-typed
//! accessors. It also ships the built-in JSON node-tree model that backs
//! tests, fixtures, and callers that serialize a document tree to disk.

pub mod json;
pub mod source;

pub use json::{DocumentError, JsonDocument, JsonLayer, JsonSmartObject};
pub use source::{DocumentSource, FieldError, FieldResult, LayerSource, SmartObjectRef};
