// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

use std::io::Write;
use tempfile::NamedTempFile;
use triage_core::domain::node_config::{ProviderType, TriageConfigManifest};

const MANIFEST: &str = r#"
apiVersion: heartpredict.io/v1
kind: TriageConfig
metadata:
  name: cardiology-ward
spec:
  gateway:
    port: 8890
  workers:
    explainer: AgenteExplicador
  scoring:
    endpoint: http://scoring:8002/predict_risk
    timeout_seconds: 15
  generation:
    type: openai
    endpoint: http://vllm:8000/v1
    model: qwen2.5
  storage:
    enabled: true
    endpoint: http://backend:3000
  correlation:
    reply_timeout_seconds: 90
"#;

#[test]
fn test_load_manifest_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(MANIFEST.as_bytes()).unwrap();

    let manifest = TriageConfigManifest::from_yaml_file(file.path()).unwrap();
    manifest.validate().unwrap();

    assert_eq!(manifest.metadata.name, "cardiology-ward");
    assert_eq!(manifest.spec.gateway.port, 8890);
    assert_eq!(manifest.spec.workers.explainer_id().as_str(), "AgenteExplicador");
    assert_eq!(manifest.spec.workers.judge_id().as_str(), "judge");
    assert_eq!(manifest.spec.generation.provider_type, ProviderType::OpenAI);
    assert_eq!(
        manifest.spec.correlation.reply_timeout(),
        Some(std::time::Duration::from_secs(90))
    );
}

#[test]
fn test_write_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triage-config.yaml");

    let mut manifest = TriageConfigManifest::default();
    manifest.metadata.name = "ward-3".to_string();
    manifest.spec.scoring.timeout_seconds = 5;
    manifest.to_yaml_file(&path).unwrap();

    let reloaded = TriageConfigManifest::from_yaml_file(&path).unwrap();
    assert_eq!(reloaded.metadata.name, "ward-3");
    assert_eq!(reloaded.spec.scoring.timeout_seconds, 5);
    assert!(reloaded.validate().is_ok());
}

#[test]
fn test_explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");

    let err = TriageConfigManifest::load_or_default(Some(missing)).unwrap_err();
    assert!(err.to_string().contains("Failed to load config"));
}

#[test]
fn test_explicit_path_is_loaded() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(MANIFEST.as_bytes()).unwrap();

    let manifest = TriageConfigManifest::load_or_default(Some(file.path().to_path_buf())).unwrap();
    assert_eq!(manifest.metadata.name, "cardiology-ward");
}
