//! Generation Service
//!
//! Turns text into an outline tree through an `LlmProvider`:
//!
//! ```text
//! input ─▶ chunk ─▶ prompt ─▶ model (timeout + retry) ─▶ combine ─▶ parse ─▶ OutlineNode
//!                                                                    │
//!                                                        fallback: flat list under title
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mindmap_core::{
    CoreError, LlmProvider, Message, OutlineNode, parse_markdown,
    provider::{Completion, GenerationOptions},
    strip_code_fences,
};
use serde::{Deserialize, Serialize};

use crate::cache::GenerationCache;
use crate::chunk::split_into_chunks;
use crate::error::{GenerationError, Result};
use crate::language::Language;
use crate::prompt::{GenerationInput, build_messages};

const DEFAULT_TITLE: &str = "Mind Map";

/// Tunables for the Generation Service
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub options: GenerationOptions,

    /// Deadline for a single model call
    pub request_timeout: Duration,

    /// Total attempts per chunk, first try included
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each subsequent one
    pub initial_backoff: Duration,

    /// Token budget per chunk
    pub max_chunk_tokens: u32,

    /// Cached results kept in memory
    pub cache_capacity: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            options: GenerationOptions::default(),
            request_timeout: Duration::from_secs(120),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_chunk_tokens: 12_000,
            cache_capacity: 256,
        }
    }
}

/// A request to build one mind map
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Used as the root label when the model output has no single root
    pub title: String,

    pub input: GenerationInput,

    #[serde(default)]
    pub language: Language,
}

impl GenerationRequest {
    pub fn new(title: impl Into<String>, input: GenerationInput) -> Self {
        Self {
            title: title.into(),
            input,
            language: Language::Auto,
        }
    }

    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    fn root_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() { DEFAULT_TITLE } else { title }
    }
}

pub struct GenerationService {
    provider: Arc<dyn LlmProvider>,
    config: GenerationConfig,
    cache: GenerationCache,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        let cache = GenerationCache::new(config.cache_capacity);
        Self {
            provider,
            config,
            cache,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate an outline for `request`.
    ///
    /// Blank input fails with `EmptyInput` before the provider is called.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<OutlineNode> {
        if request.input.is_blank() {
            return Err(GenerationError::EmptyInput);
        }

        let text = request.input.render();
        let language = request.language.resolve(&text);
        let key = GenerationCache::key(language, request.root_title(), &text);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(%language, "Generation cache hit");
            return Ok(cached);
        }

        let chunks = split_into_chunks(&text, self.config.max_chunk_tokens, |s| {
            self.provider.estimate_tokens(s)
        });
        let total = chunks.len();
        tracing::info!(%language, chunks = total, chars = text.len(), "Generating mind map");

        let mut results = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(chunk = index + 1, total, "Processing chunk");
            let messages = build_messages(language, chunk, index + 1, total);
            let completion = self.complete_with_retry(&messages).await?;
            if completion.truncated() {
                tracing::warn!(chunk = index + 1, "Model output was cut off at the token limit");
            }
            results.push(completion.content);
        }

        let combined = combine_chunk_results(&results);
        let outline = outline_from_output(&combined, request.root_title())?;

        self.cache.insert(key, outline.clone()).await;
        Ok(outline)
    }

    async fn complete_with_retry(&self, messages: &[Message]) -> Result<Completion> {
        let mut delay = self.config.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let call = self.provider.complete(messages, &self.config.options);
            let err = match tokio::time::timeout(self.config.request_timeout, call).await {
                Ok(Ok(completion)) => return Ok(completion),
                Ok(Err(CoreError::Timeout(_))) | Err(_) => GenerationError::Timeout { attempts: attempt },
                Ok(Err(err)) if err.is_retryable() => GenerationError::Provider(err),
                Ok(Err(err)) => return Err(err.into()),
            };

            if attempt >= self.config.max_attempts {
                tracing::error!(attempts = attempt, error = %err, "Model call failed");
                return Err(err);
            }

            tracing::warn!(
                attempt,
                error = %err,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Model call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }
}

/// Merge per-chunk outputs: keep the first level-1 heading, drop later ones,
/// and drop repeated lines (compared trimmed and case-insensitively)
pub fn combine_chunk_results(results: &[String]) -> String {
    let mut combined = Vec::new();
    let mut seen = HashSet::new();
    let mut has_title = false;

    for line in results.iter().flat_map(|r| r.lines()) {
        if line.starts_with("# ") {
            if !has_title {
                has_title = true;
                combined.push(line);
            }
            continue;
        }

        let normalized = line.trim().to_lowercase();
        if !normalized.is_empty() && seen.insert(normalized) {
            combined.push(line);
        }
    }

    combined.join("\n")
}

/// Parse model output into a tree, falling back to a flat list of lines
pub fn outline_from_output(output: &str, title: &str) -> Result<OutlineNode> {
    let stripped = strip_code_fences(output);
    if let Some(outline) = parse_markdown(&stripped, title) {
        return Ok(outline);
    }

    let lines: Vec<OutlineNode> = stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(OutlineNode::new)
        .collect();

    if lines.is_empty() {
        return Err(GenerationError::MalformedOutput("empty response".into()));
    }

    tracing::warn!(lines = lines.len(), "Model output had no outline structure; using flat list");
    Ok(OutlineNode::new(title).with_children(lines))
}
