//! Layer-tree extraction engine.
//!
//! Turns an opened document (any [`layerbridge_doc::DocumentSource`]) into a
//! flat-to-nested sequence of wire-format [`LayerRecord`]s, materializing
//! embedded smart objects to disk along the way. A fault in any single node
//! is confined to that node's record; siblings and ancestors are unaffected.

pub mod materialize;
pub mod record;
pub mod sanitize;
pub mod walker;

pub use materialize::{materialize, MaterializeError};
pub use record::{LayerFailure, LayerInfo, LayerRecord, SmartObjectRecord};
pub use sanitize::sanitize;
pub use walker::{Walker, MAX_DEPTH};
