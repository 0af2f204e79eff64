//! Wire-format layer records.
//!
//! One [`LayerRecord`] is produced per document node. A node whose inspection
//! failed is represented by the stub form carrying only a best-effort name
//! and the error message, so no node is ever silently dropped.

use serde::{Deserialize, Serialize};

/// Smart-object details, flattened into the record's JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartObjectRecord {
    /// True when the sub-document is embedded rather than linked.
    pub is_embedded: bool,
    /// Filename of the linked external document; `null` when embedded.
    #[serde(default)]
    pub linked_path: Option<String>,
    /// Path the embedded sub-document was materialized to; `null` unless
    /// extraction succeeded.
    #[serde(default)]
    pub temp_extracted_path: Option<String>,
    /// Present only when materialization failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_extract_error: Option<String>,
}

impl SmartObjectRecord {
    /// Record for a linked smart object. Linked objects are never
    /// materialized.
    pub fn linked(path: impl Into<String>) -> Self {
        Self {
            is_embedded: false,
            linked_path: Some(path.into()),
            temp_extracted_path: None,
            temp_extract_error: None,
        }
    }

    /// Record for an embedded smart object, before extraction outcome is
    /// known.
    pub fn embedded() -> Self {
        Self {
            is_embedded: true,
            linked_path: None,
            temp_extracted_path: None,
            temp_extract_error: None,
        }
    }
}

/// A fully inspected document node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub name: String,
    pub visible: bool,
    /// Opacity scaled to an integer in `[0, 255]`.
    pub opacity: u8,
    pub blend_mode: String,
    pub is_group: bool,
    pub is_smart_object: bool,
    /// `[left, top, right, bottom]`.
    pub bbox: [i64; 4],
    pub kind: String,
    /// Nesting depth; top-level nodes are depth 0.
    pub depth: u32,
    /// Smart-object block, present iff `is_smart_object`.
    #[serde(flatten)]
    pub smart_object: Option<SmartObjectRecord>,
    /// Child records in document order, present iff `is_group`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LayerRecord>>,
}

// Deserialization is written by hand: a flattened `Option` insists on
// deserializing its inner struct even when none of its keys are present,
// which would reject every plain layer. Presence of `is_embedded` is the
// marker for the smart-object block, mirroring how it is serialized.
impl<'de> Deserialize<'de> for LayerInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wire {
            name: String,
            visible: bool,
            opacity: u8,
            blend_mode: String,
            is_group: bool,
            is_smart_object: bool,
            bbox: [i64; 4],
            kind: String,
            depth: u32,
            #[serde(default)]
            is_embedded: Option<bool>,
            #[serde(default)]
            linked_path: Option<String>,
            #[serde(default)]
            temp_extracted_path: Option<String>,
            #[serde(default)]
            temp_extract_error: Option<String>,
            #[serde(default)]
            children: Option<Vec<LayerRecord>>,
        }

        let wire = Wire::deserialize(deserializer)?;
        let smart_object = wire.is_embedded.map(|is_embedded| SmartObjectRecord {
            is_embedded,
            linked_path: wire.linked_path,
            temp_extracted_path: wire.temp_extracted_path,
            temp_extract_error: wire.temp_extract_error,
        });
        Ok(Self {
            name: wire.name,
            visible: wire.visible,
            opacity: wire.opacity,
            blend_mode: wire.blend_mode,
            is_group: wire.is_group,
            is_smart_object: wire.is_smart_object,
            bbox: wire.bbox,
            kind: wire.kind,
            depth: wire.depth,
            smart_object,
            children: wire.children,
        })
    }
}

/// Stub emitted for a node whose inspection failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFailure {
    /// Best-effort node name.
    pub name: String,
    /// Why the node could not be inspected.
    pub error: String,
}

/// One node of an analyzed document: either a full record or an error stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerRecord {
    /// Node inspected successfully.
    Layer(LayerInfo),
    /// Node inspection failed; siblings are unaffected.
    Failed(LayerFailure),
}

impl LayerRecord {
    /// Creates an error-stub record.
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed(LayerFailure {
            name: name.into(),
            error: error.into(),
        })
    }

    /// Node name, regardless of form.
    pub fn name(&self) -> &str {
        match self {
            Self::Layer(info) => &info.name,
            Self::Failed(failure) => &failure.name,
        }
    }

    /// True for error-stub records.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Child records, when this is a group.
    pub fn children(&self) -> Option<&[LayerRecord]> {
        match self {
            Self::Layer(info) => info.children.as_deref(),
            Self::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pixel(name: &str) -> LayerInfo {
        LayerInfo {
            name: name.to_string(),
            visible: true,
            opacity: 255,
            blend_mode: "normal".to_string(),
            is_group: false,
            is_smart_object: false,
            bbox: [0, 0, 64, 64],
            kind: "pixel".to_string(),
            depth: 0,
            smart_object: None,
            children: None,
        }
    }

    #[test]
    fn test_plain_layer_omits_conditional_fields() {
        let value = serde_json::to_value(LayerRecord::Layer(pixel("Base"))).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("children"));
        assert!(!object.contains_key("is_embedded"));
        assert!(!object.contains_key("linked_path"));
        assert!(!object.contains_key("temp_extract_error"));
        assert_eq!(object["opacity"], 255);
        assert_eq!(object["depth"], 0);
    }

    #[test]
    fn test_smart_object_block_is_flattened() {
        let mut info = pixel("Logo");
        info.is_smart_object = true;
        info.smart_object = Some(SmartObjectRecord {
            is_embedded: true,
            linked_path: None,
            temp_extracted_path: Some("/tmp/embedded_Logo.psb".to_string()),
            temp_extract_error: None,
        });
        let value = serde_json::to_value(LayerRecord::Layer(info)).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["is_embedded"], true);
        assert_eq!(object["linked_path"], serde_json::Value::Null);
        assert_eq!(object["temp_extracted_path"], "/tmp/embedded_Logo.psb");
        assert!(!object.contains_key("temp_extract_error"));
    }

    #[test]
    fn test_error_stub_shape() {
        let stub = LayerRecord::failed("Broken", "Failed to read layer: boom");
        let json = serde_json::to_string(&stub).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Broken","error":"Failed to read layer: boom"}"#
        );
    }

    #[test]
    fn test_round_trip_mixed_tree() {
        let mut linked = pixel("Header");
        linked.is_smart_object = true;
        linked.kind = "smartobject".to_string();
        linked.smart_object = Some(SmartObjectRecord::linked("shared/header.psb"));

        let mut group = pixel("Group");
        group.is_group = true;
        group.kind = "group".to_string();
        group.children = Some(vec![
            LayerRecord::Layer(pixel("Child")),
            LayerRecord::Layer(linked),
            LayerRecord::failed("Bad", "Failed to read layer: nope"),
        ]);
        let record = LayerRecord::Layer(group);

        let json = serde_json::to_string(&record).unwrap();
        let parsed: LayerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        // A second round trip is byte-stable.
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);

        let children = parsed.children().unwrap();
        assert_eq!(children.len(), 3);
        assert!(children[2].is_failure());
    }

    #[test]
    fn test_deserialize_distinguishes_stub_from_layer() {
        let stub: LayerRecord = serde_json::from_str(r#"{"name":"X","error":"gone"}"#).unwrap();
        assert!(stub.is_failure());

        let layer: LayerRecord = serde_json::from_str(
            r#"{"name":"X","visible":true,"opacity":128,"blend_mode":"normal",
                "is_group":false,"is_smart_object":false,"bbox":[0,0,1,1],
                "kind":"pixel","depth":3}"#,
        )
        .unwrap();
        assert!(!layer.is_failure());
        match layer {
            LayerRecord::Layer(info) => assert!(info.smart_object.is_none()),
            LayerRecord::Failed(_) => unreachable!(),
        }
    }
}
