//! layerbridge CLI library.
//!
//! Three transport bindings share one analysis pipeline and one
//! request/result contract: the in-process file-poll bridge, the
//! subprocess-isolated file-poll bridge, and the local HTTP delegate.

pub mod bridge;
pub mod commands;
pub mod pipeline;
pub mod protocol;
pub mod server;
pub mod subprocess;
