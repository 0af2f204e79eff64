//! Recursive layer-tree walker.

use std::path::{Path, PathBuf};

use layerbridge_doc::{FieldResult, LayerSource, SmartObjectRef};

use crate::materialize::materialize;
use crate::record::{LayerInfo, LayerRecord, SmartObjectRecord};
use crate::sanitize::sanitize;

/// Nodes deeper than this are reported as failures instead of recursed into.
/// Real documents are trees a few levels deep; the cap only keeps a corrupted
/// or cyclic model from recursing without bound.
pub const MAX_DEPTH: u32 = 256;

/// Name recorded for nodes whose own name cannot be read.
const UNNAMED: &str = "Unnamed";

/// Walks a document hierarchy into wire records, materializing embedded
/// smart objects into the configured extraction directory.
#[derive(Debug, Clone)]
pub struct Walker {
    extract_dir: PathBuf,
}

impl Walker {
    /// Creates a walker extracting into `extract_dir`. The directory is
    /// created on first use, not up front.
    pub fn new(extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            extract_dir: extract_dir.into(),
        }
    }

    /// Extraction directory for embedded sub-documents.
    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    /// Visits `layers` in source order, producing exactly one record per
    /// node. A failure in one node never aborts its siblings.
    pub fn walk(&self, layers: &[&dyn LayerSource], depth: u32) -> Vec<LayerRecord> {
        layers
            .iter()
            .map(|layer| self.visit(*layer, depth))
            .collect()
    }

    fn visit(&self, layer: &dyn LayerSource, depth: u32) -> LayerRecord {
        if depth > MAX_DEPTH {
            return LayerRecord::failed(
                best_effort_name(layer),
                format!("Maximum nesting depth ({MAX_DEPTH}) exceeded"),
            );
        }
        match self.inspect(layer, depth) {
            Ok(record) => record,
            Err(error) => LayerRecord::failed(
                best_effort_name(layer),
                format!("Failed to read layer: {error}"),
            ),
        }
    }

    /// Builds the record for one node. Field-level failures degrade to the
    /// documented defaults; only the name, group flag, and child enumeration
    /// are load-bearing enough to fail the whole node.
    fn inspect(&self, layer: &dyn LayerSource, depth: u32) -> FieldResult<LayerRecord> {
        let name = layer.name()?;
        let is_group = layer.is_group()?;

        let visible = layer.visible().unwrap_or(true);
        let opacity = scale_opacity(layer.opacity().unwrap_or(1.0));
        let blend_mode = layer
            .blend_mode()
            .unwrap_or_else(|_| "normal".to_string());
        let bbox = layer.bbox().unwrap_or([0, 0, 0, 0]);
        let kind = layer.kind().unwrap_or_else(|_| "unknown".to_string());

        // An unreadable smart-object attachment is treated as no attachment.
        let smart = layer.smart_object().unwrap_or(None);
        let smart_object = smart.map(|smart| self.smart_object_record(&name, smart));

        let children = if is_group {
            let child_layers = layer.children()?;
            Some(self.walk(&child_layers, depth + 1))
        } else {
            None
        };

        Ok(LayerRecord::Layer(LayerInfo {
            name,
            visible,
            opacity,
            blend_mode,
            is_group,
            is_smart_object: smart_object.is_some(),
            bbox,
            kind,
            depth,
            smart_object,
            children,
        }))
    }

    /// Resolves a smart-object attachment: linked objects are recorded
    /// as-is, embedded ones are materialized to disk. Extraction failures
    /// land in `temp_extract_error` and never propagate.
    fn smart_object_record(&self, name: &str, smart: SmartObjectRef) -> SmartObjectRecord {
        if let Some(linked) = smart.linked_path {
            return SmartObjectRecord::linked(linked);
        }

        let mut record = SmartObjectRecord::embedded();
        match smart.data {
            Some(data) if !data.is_empty() => {
                match materialize(&data, &sanitize(name), &self.extract_dir) {
                    Ok(path) => {
                        record.temp_extracted_path = Some(path.to_string_lossy().into_owned());
                    }
                    Err(error) => {
                        record.temp_extract_error =
                            Some(format!("Failed to save embedded smart object: {error}"));
                    }
                }
            }
            _ => {
                record.temp_extract_error =
                    Some("Embedded smart object has no data".to_string());
            }
        }
        record
    }
}

/// Scales a source opacity in `[0.0, 1.0]` to the wire integer in `[0, 255]`.
fn scale_opacity(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn best_effort_name(layer: &dyn LayerSource) -> String {
    layer.name().unwrap_or_else(|_| UNNAMED.to_string())
}
