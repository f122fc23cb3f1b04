//! The vision extraction service seam.
//!
//! The pipeline talks to the service through the [`StatementExtractor`]
//! trait so the orchestrator can be tested against scripted fakes. The
//! production implementation, [`VisionExtractor`], drives an
//! `edgequake_llm` provider: it sends the page image plus the classifier's
//! type hint and raw text, and parses the model's JSON reply into an
//! [`ExtractedStatement`].
//!
//! This module is intentionally thin on policy — retry and backoff live in
//! [`crate::pipeline::extract`]; its obligations here are the message
//! layout, response parsing, and correct classification of provider errors
//! into retryable vs fatal.

use crate::config::PipelineConfig;
use crate::error::{ExtractError, PipelineError};
use crate::prompts::{page_context, DEFAULT_EXTRACTION_PROMPT};
use crate::statement::{ExtractedStatement, LineItemTree, StatementType};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One extraction request: everything the service needs for one page.
#[derive(Clone)]
pub struct ExtractionRequest {
    pub page_num: usize,
    /// The rendered page image (authoritative content).
    pub image: ImageData,
    /// The classifier's winning type for this page.
    pub statement_hint: StatementType,
    /// The renderer's raw text layer, passed as cross-reference material.
    pub raw_text: String,
}

/// Interface to the vision extraction capability.
///
/// Implementations must classify their failures through [`ExtractError`]:
/// only [`ExtractError::RateLimited`] is retried by the orchestrator.
#[async_trait]
pub trait StatementExtractor: Send + Sync {
    /// Extract structured financial data from a single page.
    async fn extract(&self, req: &ExtractionRequest) -> Result<ExtractedStatement, ExtractError>;
}

// ── Production implementation ────────────────────────────────────────────

/// [`StatementExtractor`] backed by an `edgequake_llm` vision provider.
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl StatementExtractor for VisionExtractor {
    /// ## Message Layout
    ///
    /// 1. **System message** — the 7-rule extraction prompt with the JSON
    ///    response contract
    /// 2. **User message** — the type hint and raw text layer as text, the
    ///    page image as an attachment
    async fn extract(&self, req: &ExtractionRequest) -> Result<ExtractedStatement, ExtractError> {
        let context = page_context(req.statement_hint, &req.raw_text);
        let messages = vec![
            ChatMessage::system(DEFAULT_EXTRACTION_PROMPT),
            ChatMessage::user_with_images(context.as_str(), vec![req.image.clone()]),
        ];

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Page {}: {} input tokens, {} output tokens",
                    req.page_num, response.prompt_tokens, response.completion_tokens
                );
                parse_response(&response.content, req.statement_hint)
            }
            Err(e) => Err(classify_provider_error(&format!("{e}"))),
        }
    }
}

// ── Error classification ─────────────────────────────────────────────────

/// Sort a provider error message into the retryable rate-limit class or the
/// fatal API class. Providers surface 429s with differing wording, so this
/// matches the three formulations seen across OpenAI, Anthropic, and Gemini.
pub(crate) fn classify_provider_error(message: &str) -> ExtractError {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429")
    {
        ExtractError::RateLimited {
            retry_after_secs: None,
        }
    } else {
        ExtractError::Api {
            message: message.to_string(),
        }
    }
}

// ── Response parsing ─────────────────────────────────────────────────────

/// Wire format of the model's reply. Everything except the line items is
/// optional: a model that omits `statement_type` gets the classifier's hint.
#[derive(Deserialize)]
struct RawStatement {
    statement_type: Option<StatementType>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    line_items: LineItemTree,
    #[serde(default)]
    summary_metrics: BTreeMap<String, f64>,
    #[serde(default)]
    years_detected: Vec<String>,
    #[serde(default)]
    base_year: Option<String>,
    #[serde(default)]
    notes: Vec<String>,
}

static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Parse the model's reply into an [`ExtractedStatement`].
///
/// Models occasionally disobey the prompt and wrap the object in fences or
/// prefix it with commentary; both are stripped before parsing. An empty
/// reply is [`ExtractError::EmptyResponse`]; anything that still fails to
/// parse is [`ExtractError::MalformedResponse`]. Confidences are clamped to
/// `[0, 1]`.
pub(crate) fn parse_response(
    content: &str,
    hint: StatementType,
) -> Result<ExtractedStatement, ExtractError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::EmptyResponse);
    }

    let unfenced = match RE_JSON_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    };

    // Tolerate commentary around the object: parse from the outermost braces.
    let json = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => {
            return Err(ExtractError::MalformedResponse {
                detail: "no JSON object in response".into(),
            })
        }
    };

    let raw: RawStatement =
        serde_json::from_str(json).map_err(|e| ExtractError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let mut line_items = raw.line_items;
    for fields in line_items.values_mut() {
        for item in fields.values_mut() {
            item.confidence = item.confidence.clamp(0.0, 1.0);
        }
    }

    Ok(ExtractedStatement {
        statement_type: raw.statement_type.unwrap_or(hint),
        confidence: raw.confidence.clamp(0.0, 1.0),
        line_items,
        summary_metrics: raw.summary_metrics,
        years_detected: raw.years_detected,
        base_year: raw.base_year,
        notes: raw.notes,
    })
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the extraction service, from most-specific to least-specific.
///
/// 1. **Pre-built extractor** (`config.extractor`) — used as-is; this is how
///    tests inject fakes and how callers add middleware.
/// 2. **Pre-built provider** (`config.provider`) — wrapped in a
///    [`VisionExtractor`].
/// 3. **Named provider + model** (`config.provider_name`) — instantiated via
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key from the environment.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured before full auto-detection so an explicit environment-level
///    model choice wins even when multiple API keys are present.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`), preferring
///    OpenAI when `OPENAI_API_KEY` is set.
pub(crate) fn resolve_extractor(
    config: &PipelineConfig,
) -> Result<Arc<dyn StatementExtractor>, PipelineError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(VisionExtractor::new(provider, config)))
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PipelineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
