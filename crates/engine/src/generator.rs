//! Content generation.
//!
//! Turns a topic and its context into rows of text. The completion service is
//! tried first, walking the backup model list on "model unavailable"; any
//! other failure, or the absence of a credential, falls back to deterministic
//! content. Callers always get rows back.

use std::cell::RefCell;
use tcfd_core::fallback::fallback_rows;
use tcfd_core::prompt::build_instruction;
use tcfd_core::{ContentRow, GenerationContext, ParseStrategy, RowParser, TopicSpec};
use thiserror::Error;

use crate::client::AnthropicClient;

/// Backup model identifiers, tried in order.
pub const DEFAULT_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-sonnet-20240620",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Settings for the content generator and its completion client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    models: Vec<String>,
    pub max_tokens: u32,
    /// Skip the completion service even when a credential is present.
    pub deterministic: bool,
    pub endpoint: String,
    pub api_version: String,
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            max_tokens: DEFAULT_MAX_TOKENS,
            deterministic: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Replace the backup model list. Blank entries and repeats are dropped,
    /// keeping the first occurrence; an empty result keeps the defaults.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for model in models {
            let model = model.into().trim().to_string();
            if !model.is_empty() && !unique.contains(&model) {
                unique.push(model);
            }
        }
        if !unique.is_empty() {
            self.models = unique;
        }
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Backup models in the order they are tried.
    pub fn models(&self) -> &[String] {
        &self.models
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub instruction: String,
    pub max_tokens: u32,
}

/// Why a completion call failed.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// The model id is unknown or retired; the next backup may work.
    #[error("model '{0}' is unavailable")]
    ModelUnavailable(String),

    /// The service answered with an error status.
    #[error("completion service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never got an answer.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The answer could not be read.
    #[error("malformed completion response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Whether the next backup model should be tried.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, CompletionError::ModelUnavailable(_))
    }
}

/// A text-completion backend.
pub trait CompletionService: Send + Sync {
    fn complete(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> std::result::Result<String, CompletionError>;
}

/// Per-run counters of how content was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub delimited: usize,
    pub bulleted: usize,
    pub truncated: usize,
    /// Topics served from the deterministic library.
    pub fallback: usize,
}

impl ParseStats {
    fn record(&mut self, strategy: ParseStrategy) {
        match strategy {
            ParseStrategy::Delimited => self.delimited += 1,
            ParseStrategy::Bulleted => self.bulleted += 1,
            ParseStrategy::Truncated => self.truncated += 1,
        }
    }

    /// Completions that were parsed at all.
    pub fn parsed(&self) -> usize {
        self.delimited + self.bulleted + self.truncated
    }

    /// Share of parsed completions that needed a degraded strategy.
    pub fn failure_rate(&self) -> f64 {
        match self.parsed() {
            0 => 0.0,
            n => (self.bulleted + self.truncated) as f64 / n as f64,
        }
    }
}

/// Produces content rows for topics.
pub struct ContentGenerator {
    config: GeneratorConfig,
    service: Option<Box<dyn CompletionService>>,
    parser: RowParser,
    stats: RefCell<ParseStats>,
}

impl ContentGenerator {
    /// A generator with no completion service; every topic uses fallback content.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            service: None,
            parser: RowParser::new(),
            stats: RefCell::new(ParseStats::default()),
        }
    }

    /// Attach a completion service.
    pub fn with_service(mut self, service: impl CompletionService + 'static) -> Self {
        self.service = Some(Box::new(service));
        self
    }

    /// Build a generator from an optional credential.
    ///
    /// A missing or blank key leaves the generator in deterministic mode.
    pub fn from_api_key(config: GeneratorConfig, api_key: Option<&str>) -> tcfd_core::Result<Self> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => {
                let client = AnthropicClient::new(key)?
                    .with_endpoint(config.endpoint.clone())
                    .with_api_version(config.api_version.clone());
                Ok(Self::new(config).with_service(client))
            }
            None => {
                log::info!("No completion credential supplied; using deterministic content");
                Ok(Self::new(config))
            }
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Whether generation will skip the completion service.
    pub fn is_deterministic(&self) -> bool {
        self.config.deterministic || self.service.is_none()
    }

    /// Counters accumulated since construction or the last reset.
    pub fn stats(&self) -> ParseStats {
        *self.stats.borrow()
    }

    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = ParseStats::default();
    }

    /// Produce rows for a topic. Never fails.
    ///
    /// Completion output yields between 1 and 10 rows; fallback content
    /// yields exactly the topic's expected row count.
    pub fn generate(&self, topic: &TopicSpec, context: &GenerationContext) -> Vec<ContentRow> {
        let service = match &self.service {
            Some(service) if !self.config.deterministic => service,
            _ => return self.fallback(topic, context),
        };

        let request = CompletionRequest {
            instruction: build_instruction(topic, context),
            max_tokens: self.config.max_tokens,
        };

        for model in self.config.models() {
            match service.complete(model, &request) {
                Ok(text) => {
                    let outcome = self.parser.parse_with_strategy(&text);
                    self.stats.borrow_mut().record(outcome.strategy);
                    if outcome.strategy.is_degraded() {
                        log::warn!(
                            "Completion for {} was not delimited; parsed with {:?} strategy",
                            topic.topic_id,
                            outcome.strategy
                        );
                    }
                    log::debug!(
                        "Generated {} row(s) for {} with {}",
                        outcome.rows.len(),
                        topic.topic_id,
                        model
                    );
                    return outcome.rows;
                }
                Err(e) if e.is_model_unavailable() => {
                    log::warn!("{}; trying next backup model", e);
                }
                Err(e) => {
                    log::warn!("Completion for {} failed: {}", topic.topic_id, e);
                    return self.fallback(topic, context);
                }
            }
        }

        log::warn!(
            "No backup model available for {}; using fallback content",
            topic.topic_id
        );
        self.fallback(topic, context)
    }

    fn fallback(&self, topic: &TopicSpec, context: &GenerationContext) -> Vec<ContentRow> {
        self.stats.borrow_mut().fallback += 1;
        fallback_rows(topic, context)
    }
}
