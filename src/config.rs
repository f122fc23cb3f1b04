//! Configuration types for the extraction pipeline.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks and to diff two runs to understand
//! why their outputs differ.

use crate::error::PipelineError;
use crate::progress::ExtractionProgressCallback;
use crate::provider::StatementExtractor;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for one extraction run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use finstmt::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .top_k(4)
///     .concurrency(3)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// How many top-ranked classified pages to extract. Default: 10.
    ///
    /// A filing carries up to four statement types and statements routinely
    /// span multiple pages, so the default covers a realistic document.
    /// Lower it to bound API spend on long documents.
    pub top_k: usize,

    /// Number of concurrent extraction calls. Default: 5.
    ///
    /// Vision APIs are network-bound, not CPU-bound. If you hit rate-limit
    /// errors (`429`), lower this; if the API is fast and your quota is
    /// wide, you can raise it safely.
    pub concurrency: usize,

    /// Page count at which classification fans out over the blocking pool.
    /// Default: 8. Below it pages are scored inline.
    pub parallel_classify_threshold: usize,

    /// Concurrent scoring tasks when classification runs in parallel.
    /// Default: 4.
    pub classify_concurrency: usize,

    /// Minimum trimmed text length (chars) a page needs before extraction is
    /// attempted. Default: 20. Shorter pages fail fast, non-retryable.
    pub min_text_len: usize,

    /// Total attempts per page on rate-limit failures. Default: 3.
    ///
    /// Rate-limit errors are transient and frequent under concurrent load;
    /// anything else is not retried at all. 3 attempts = up to 2 retries.
    pub max_retries: u32,

    /// Base retry delay in milliseconds. Default: 1000.
    ///
    /// The n-th retry waits `base × 2ⁿ` plus up to one second of uniform
    /// jitter, capped at [`PipelineConfig::retry_max_delay_ms`]. The jitter
    /// keeps N concurrent workers from retrying in lockstep against a
    /// recovering endpoint.
    pub retry_base_delay_ms: u64,

    /// Retry delay ceiling in milliseconds. Default: 60 000.
    pub retry_max_delay_ms: u64,

    /// Model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic"). If None along with
    /// `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed extraction service. Takes precedence over every
    /// provider field; tests inject fakes here.
    pub extractor: Option<Arc<dyn StatementExtractor>>,

    /// Sampling temperature for the extraction completion. Default: 0.0.
    ///
    /// Transcribing figures from a page wants the model fully deterministic.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Per-page progress events. Default: none.
    pub progress_callback: Option<Arc<dyn ExtractionProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            concurrency: 5,
            parallel_classify_threshold: 8,
            classify_concurrency: 4,
            min_text_len: 20,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 60_000,
            model: None,
            provider_name: None,
            provider: None,
            extractor: None,
            temperature: 0.0,
            max_tokens: 4096,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("top_k", &self.top_k)
            .field("concurrency", &self.concurrency)
            .field(
                "parallel_classify_threshold",
                &self.parallel_classify_threshold,
            )
            .field("classify_concurrency", &self.classify_concurrency)
            .field("min_text_len", &self.min_text_len)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "extractor",
                &self.extractor.as_ref().map(|_| "<dyn StatementExtractor>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn parallel_classify_threshold(mut self, n: usize) -> Self {
        self.config.parallel_classify_threshold = n;
        self
    }

    pub fn classify_concurrency(mut self, n: usize) -> Self {
        self.config.classify_concurrency = n.max(1);
        self
    }

    pub fn min_text_len(mut self, n: usize) -> Self {
        self.config.min_text_len = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_max_delay_ms = ms;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn StatementExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ExtractionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.top_k == 0 {
            return Err(PipelineError::InvalidConfig("top_k must be ≥ 1".into()));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_retries == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_retries must be ≥ 1".into(),
            ));
        }
        if c.retry_base_delay_ms > c.retry_max_delay_ms {
            return Err(PipelineError::InvalidConfig(format!(
                "retry_base_delay_ms ({}) exceeds retry_max_delay_ms ({})",
                c.retry_base_delay_ms, c.retry_max_delay_ms
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.top_k, 10);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay_ms, 1_000);
        assert_eq!(config.retry_max_delay_ms, 60_000);
    }

    #[test]
    fn builder_clamps_zeroes() {
        let config = PipelineConfig::builder()
            .top_k(0)
            .concurrency(0)
            .max_retries(0)
            .build()
            .unwrap();
        assert_eq!(config.top_k, 1);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn build_rejects_inverted_backoff_bounds() {
        let result = PipelineConfig::builder()
            .retry_base_delay_ms(90_000)
            .retry_max_delay_ms(60_000)
            .build();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn temperature_is_clamped() {
        let config = PipelineConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }
}
