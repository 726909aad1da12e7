// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Triage Node Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing one
// triage node:
// - HTTP intake (gateway) bind address and port
// - Worker addresses
// - Risk-scoring, text-generation and storage collaborators
// - Scheduler and correlation tuning
// - Logging and metrics
//
// Secrets are resolved once at startup (see GenerationConfig::resolve_api_key);
// the workers never read the environment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use triage_swarm::WorkerId;

pub const API_VERSION: &str = "heartpredict.io/v1";
pub const KIND: &str = "TriageConfig";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfigManifest {
    /// Must be "heartpredict.io/v1"
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Must be "TriageConfig"
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: TriageConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageConfigSpec {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_gateway_port(),
        }
    }
}

/// Local addresses of the five workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_gateway_id")]
    pub gateway: String,
    #[serde(default = "default_classifier_id")]
    pub classifier: String,
    #[serde(default = "default_judge_id")]
    pub judge: String,
    #[serde(default = "default_explainer_id")]
    pub explainer: String,
    #[serde(default = "default_notifier_id")]
    pub notifier: String,
}

impl WorkersConfig {
    pub fn all(&self) -> [&str; 5] {
        [
            self.gateway.as_str(),
            self.classifier.as_str(),
            self.judge.as_str(),
            self.explainer.as_str(),
            self.notifier.as_str(),
        ]
    }

    pub fn gateway_id(&self) -> WorkerId {
        WorkerId::new(&self.gateway)
    }

    pub fn classifier_id(&self) -> WorkerId {
        WorkerId::new(&self.classifier)
    }

    pub fn judge_id(&self) -> WorkerId {
        WorkerId::new(&self.judge)
    }

    pub fn explainer_id(&self) -> WorkerId {
        WorkerId::new(&self.explainer)
    }

    pub fn notifier_id(&self) -> WorkerId {
        WorkerId::new(&self.notifier)
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway_id(),
            classifier: default_classifier_id(),
            judge: default_judge_id(),
            explainer: default_explainer_id(),
            notifier: default_notifier_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Full URL of the prediction endpoint.
    #[serde(default = "default_scoring_endpoint")]
    pub endpoint: String,

    /// Connect + read timeout.
    #[serde(default = "default_scoring_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scoring_endpoint(),
            timeout_seconds: default_scoring_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    OpenAI,
    Ollama,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini",
            ProviderType::OpenAI => "openai",
            ProviderType::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: ProviderType,

    /// API base URL.
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            endpoint: default_generation_endpoint(),
            api_key: Some("env:GEMINI_API_KEY".to_string()),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            timeout_seconds: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    /// Resolve the API key, following `env:VAR_NAME` indirection.
    pub fn resolve_api_key(&self) -> anyhow::Result<Option<String>> {
        resolve_secret(self.api_key.as_deref(), |name| std::env::var(name).ok())
    }

    pub fn options(&self) -> crate::domain::llm::GenerationOptions {
        crate::domain::llm::GenerationOptions {
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_k: Some(self.top_k),
            top_p: Some(self.top_p),
            stop_sequences: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

pub(crate) fn resolve_secret(
    value: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Option<String>> {
    match value {
        Some(k) => match k.strip_prefix("env:") {
            Some(var_name) => lookup(var_name)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("Environment variable not set: {}", var_name)),
            None => Ok(Some(k.to_string())),
        },
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// When disabled, explanations are only logged.
    #[serde(default)]
    pub enabled: bool,

    /// Backend base URL; explanations go to `{endpoint}/explanation/{user_id}`.
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_storage_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_storage_endpoint(),
            timeout_seconds: default_storage_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Suspension after an idle scheduling round.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Expire explanation requests left unanswered this long. Unset means
    /// wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_timeout_seconds: Option<u64>,

    /// How often the sweeper looks for stale correlations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval_seconds: Option<u64>,
}

impl CorrelationConfig {
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_seconds.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.unwrap_or(default_sweep_interval()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// e.g. "info", "debug", "triage_core=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    8888
}

fn default_gateway_id() -> String {
    "gateway".to_string()
}

fn default_classifier_id() -> String {
    "classifier".to_string()
}

fn default_judge_id() -> String {
    "judge".to_string()
}

fn default_explainer_id() -> String {
    "explainer".to_string()
}

fn default_notifier_id() -> String {
    "notifier".to_string()
}

fn default_scoring_endpoint() -> String {
    "http://127.0.0.1:8002/predict_risk".to_string()
}

fn default_scoring_timeout() -> u64 {
    30
}

fn default_provider_type() -> ProviderType {
    ProviderType::Gemini
}

fn default_generation_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f32 {
    0.95
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_storage_endpoint() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_storage_timeout() -> u64 {
    10
}

fn default_idle_backoff_ms() -> u64 {
    50
}

fn default_sweep_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for TriageConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "triage-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: TriageConfigSpec::default(),
        }
    }
}

impl TriageConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate locations, in precedence order:
    /// 1. TRIAGE_CONFIG_PATH environment variable
    /// 2. ./triage-config.yaml (working directory)
    /// 3. ~/.triage/config.yaml (user home)
    /// 4. /etc/triage/config.yaml (system, Unix) or C:\ProgramData\Triage\config.yaml (Windows)
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("TRIAGE_CONFIG_PATH") {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./triage-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".triage").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/triage/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\Triage\\config.yaml"));
        paths
    }

    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Load configuration with discovery, falling back to defaults.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!(path = ?path, "Loading configuration from explicit path");
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!(path = ?config_path, "Loading configuration from discovered path");
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides so container deployments can
    /// repoint collaborators without editing the manifest.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TRIAGE_SCORING_ENDPOINT") {
            tracing::info!(endpoint = %val, "Environment override: TRIAGE_SCORING_ENDPOINT");
            self.spec.scoring.endpoint = val;
        }

        if let Some(val) = lookup("TRIAGE_STORAGE_ENDPOINT") {
            tracing::info!(endpoint = %val, "Environment override: TRIAGE_STORAGE_ENDPOINT");
            self.spec.storage.endpoint = val;
            self.spec.storage.enabled = true;
        }

        if let Some(val) = lookup("TRIAGE_GATEWAY_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!(port, "Environment override: TRIAGE_GATEWAY_PORT");
                    self.spec.gateway.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for TRIAGE_GATEWAY_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;

        let ids = spec.workers.all();
        for (i, id) in ids.iter().enumerate() {
            if id.trim().is_empty() {
                anyhow::bail!("spec.workers entries cannot be empty");
            }
            if ids[..i].contains(id) {
                anyhow::bail!("Worker id '{}' is used more than once in spec.workers", id);
            }
        }

        if !is_http_url(&spec.scoring.endpoint) {
            anyhow::bail!(
                "spec.scoring.endpoint must be an http(s) URL, got '{}'",
                spec.scoring.endpoint
            );
        }
        if spec.scoring.timeout_seconds == 0 {
            anyhow::bail!("spec.scoring.timeout_seconds must be greater than zero");
        }

        if !is_http_url(&spec.generation.endpoint) {
            anyhow::bail!(
                "spec.generation.endpoint must be an http(s) URL, got '{}'",
                spec.generation.endpoint
            );
        }
        if spec.generation.model.is_empty() {
            anyhow::bail!("spec.generation.model cannot be empty");
        }
        if !(0.0..=2.0).contains(&spec.generation.temperature) {
            anyhow::bail!(
                "spec.generation.temperature must be within 0.0..=2.0, got {}",
                spec.generation.temperature
            );
        }
        if spec.generation.timeout_seconds == 0 {
            anyhow::bail!("spec.generation.timeout_seconds must be greater than zero");
        }

        if spec.storage.enabled && !is_http_url(&spec.storage.endpoint) {
            anyhow::bail!(
                "spec.storage.endpoint must be an http(s) URL when storage is enabled, got '{}'",
                spec.storage.endpoint
            );
        }

        if spec.scheduler.idle_backoff_ms == 0 || spec.scheduler.idle_backoff_ms > 1000 {
            anyhow::bail!(
                "spec.scheduler.idle_backoff_ms must be within 1..=1000, got {}",
                spec.scheduler.idle_backoff_ms
            );
        }

        if spec.correlation.reply_timeout_seconds == Some(0) {
            anyhow::bail!("spec.correlation.reply_timeout_seconds must be greater than zero");
        }
        if spec.correlation.sweep_interval_seconds == Some(0) {
            anyhow::bail!("spec.correlation.sweep_interval_seconds must be greater than zero");
        }

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
