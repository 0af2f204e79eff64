//! End-to-end tests for the file-poll bridge.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use layerbridge_cli::bridge::{Bridge, Executor, Tick, REQUEST_FILE, RESULT_FILE};
use layerbridge_cli::protocol::{BridgeRequest, ResultEnvelope};
use pretty_assertions::assert_eq;

const FIXTURE: &str = r#"{
    "layers": [
        {
            "name": "Scene",
            "visible": true,
            "opacity": 1.0,
            "blend_mode": "normal",
            "bbox": [0, 0, 800, 600],
            "kind": "group",
            "layers": [
                {
                    "name": "Logo",
                    "kind": "smartobject",
                    "opacity": 0.5,
                    "smart_object": { "data_base64": "OEJQUw==" }
                },
                {
                    "name": "Base",
                    "kind": "pixel",
                    "visible": false
                }
            ]
        }
    ]
}"#;

struct Harness {
    _dir: tempfile::TempDir,
    data_dir: PathBuf,
    bridge: Bridge,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        let bridge = Bridge::new(
            &data_dir,
            dir.path().join("extracted"),
            Executor::InProcess,
        );
        Self {
            _dir: dir,
            data_dir,
            bridge,
        }
    }

    fn write_document(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.data_dir.parent().unwrap().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn write_request(&self, request: &BridgeRequest) {
        let body = serde_json::to_string(request).unwrap();
        fs::write(self.data_dir.join(REQUEST_FILE), body).unwrap();
    }

    fn write_raw_request(&self, body: &str) {
        fs::write(self.data_dir.join(REQUEST_FILE), body).unwrap();
    }

    fn read_result(&self) -> ResultEnvelope {
        let contents = fs::read_to_string(self.data_dir.join(RESULT_FILE)).unwrap();
        serde_json::from_str(&contents).unwrap()
    }
}

#[test]
fn test_idle_when_no_request_present() {
    let harness = Harness::new();
    assert_eq!(harness.bridge.poll_once(), Tick::Idle);
    assert!(!harness.data_dir.join(RESULT_FILE).exists());
}

#[test]
fn test_analyze_round_trip() {
    let harness = Harness::new();
    let doc = harness.write_document("doc.json", FIXTURE);

    harness.write_request(&BridgeRequest::analyze(doc.to_str().unwrap()));
    assert_eq!(harness.bridge.poll_once(), Tick::Handled);

    // The consumed request is gone, the result is in place.
    assert!(!harness.data_dir.join(REQUEST_FILE).exists());
    let result = harness.read_result();
    assert!(result.ok);
    assert_eq!(result.source.as_deref(), doc.to_str());
    assert!(result.generated_at.unwrap() > 1.0e9);

    let layers = result.layers.unwrap();
    assert_eq!(layers.len(), 1);
    let scene = &layers[0];
    assert_eq!(scene.name(), "Scene");
    let children = scene.children().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].name(), "Logo");
    assert_eq!(children[1].name(), "Base");

    // The embedded smart object was materialized.
    let value = serde_json::to_value(&children[0]).unwrap();
    assert_eq!(value["depth"], 1);
    assert_eq!(value["is_embedded"], true);
    assert_eq!(value["opacity"], 128);
    let extracted = value["temp_extracted_path"].as_str().unwrap();
    assert_eq!(fs::read(extracted).unwrap(), b"8BPS");
}

#[test]
fn test_missing_document_fails_without_killing_the_loop() {
    let harness = Harness::new();

    harness.write_request(&BridgeRequest::analyze("/nowhere/missing.psd"));
    assert_eq!(harness.bridge.poll_once(), Tick::Handled);
    let result = harness.read_result();
    assert!(!result.ok);
    assert!(result.error.unwrap().starts_with("File not found:"));

    // The loop keeps serving subsequent valid requests.
    let doc = harness.write_document("doc.json", FIXTURE);
    harness.write_request(&BridgeRequest::analyze(doc.to_str().unwrap()));
    assert_eq!(harness.bridge.poll_once(), Tick::Handled);
    assert!(harness.read_result().ok);
}

#[test]
fn test_unknown_command_is_rejected_inline() {
    let harness = Harness::new();
    harness.write_raw_request(r#"{"cmd":"launch","path":"/tmp/x.json"}"#);
    assert_eq!(harness.bridge.poll_once(), Tick::Handled);
    let result = harness.read_result();
    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some("Invalid command or path"));
}

#[test]
fn test_analyze_without_path_is_rejected_inline() {
    let harness = Harness::new();
    harness.write_raw_request(r#"{"cmd":"analyze"}"#);
    assert_eq!(harness.bridge.poll_once(), Tick::Handled);
    assert_eq!(
        harness.read_result().error.as_deref(),
        Some("Invalid command or path")
    );
}

#[test]
fn test_malformed_request_yields_failure_result() {
    let harness = Harness::new();
    harness.write_raw_request("this is not json");
    assert_eq!(harness.bridge.poll_once(), Tick::Handled);
    let result = harness.read_result();
    assert!(!result.ok);
    assert!(result.error.unwrap().starts_with("Malformed request:"));
    assert!(!harness.data_dir.join(REQUEST_FILE).exists());
}

/// A reader polling at high frequency during repeated publishes must only
/// ever observe complete result documents: either the previous one or the
/// new one, never a truncated write.
#[test]
fn test_result_file_is_never_partially_visible() {
    let harness = Harness::new();
    let doc = harness.write_document("doc.json", FIXTURE);
    let result_path = harness.data_dir.join(RESULT_FILE);

    let stop = Arc::new(AtomicBool::new(false));
    let reader_stop = Arc::clone(&stop);
    let reader_path = result_path.clone();
    let reader = thread::spawn(move || {
        let mut observed = 0u32;
        while !reader_stop.load(Ordering::Relaxed) {
            if let Ok(contents) = fs::read_to_string(&reader_path) {
                serde_json::from_str::<ResultEnvelope>(&contents)
                    .unwrap_or_else(|e| panic!("observed torn result ({e}): {contents:?}"));
                observed += 1;
            }
        }
        observed
    });

    for _ in 0..25 {
        harness.write_request(&BridgeRequest::analyze(doc.to_str().unwrap()));
        assert_eq!(harness.bridge.poll_once(), Tick::Handled);
    }

    stop.store(true, Ordering::Relaxed);
    let observed = reader.join().unwrap();
    assert!(observed > 0, "reader never saw a result file");
}
