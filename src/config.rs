//! Runtime configuration.
//!
//! Defaults match the original service: ten entities per batch and one
//! deterministic model. Environment variables override individual fields.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// How the oracle talks to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Send the JSON Schema as `response_format`; otherwise plain JSON mode.
    #[serde(default = "default_true")]
    pub schema_response_format: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_tokens: None,
            schema_response_format: true,
        }
    }
}

/// Batching and fan-out knobs shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Entities per attribute-assignment call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrent oracle calls per fan-out step; `0` means unbounded.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Map out-of-scheme attribute values to the fallback sentinel.
    #[serde(default = "default_true")]
    pub normalize_values: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            normalize_values: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl AnnotatorConfig {
    /// Defaults overlaid with `ANNOTATOR_MODEL`, `ANNOTATOR_TEMPERATURE`,
    /// `ANNOTATOR_MAX_TOKENS`, `ANNOTATOR_BATCH_SIZE`,
    /// `ANNOTATOR_MAX_CONCURRENCY` and `ANNOTATOR_NORMALIZE_VALUES`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(model) = lookup("ANNOTATOR_MODEL").filter(|m| !m.trim().is_empty()) {
            config.oracle.model = model;
        }
        if let Some(t) = parsed(&lookup, "ANNOTATOR_TEMPERATURE") {
            config.oracle.temperature = t;
        }
        if let Some(max) = parsed(&lookup, "ANNOTATOR_MAX_TOKENS") {
            config.oracle.max_tokens = Some(max);
        }
        if let Some(size) = parsed::<usize>(&lookup, "ANNOTATOR_BATCH_SIZE") {
            if size == 0 {
                warn!("ANNOTATOR_BATCH_SIZE must be >= 1; keeping {}", config.pipeline.batch_size);
            } else {
                config.pipeline.batch_size = size;
            }
        }
        if let Some(width) = parsed(&lookup, "ANNOTATOR_MAX_CONCURRENCY") {
            config.pipeline.max_concurrency = width;
        }
        if let Some(normalize) = parsed(&lookup, "ANNOTATOR_NORMALIZE_VALUES") {
            config.pipeline.normalize_values = normalize;
        }

        config
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_true() -> bool {
    true
}
