//! Vision-model recognition engine.
//!
//! [`VisionRecognizer`] implements [`RecognitionEngine`] by sending each page
//! image to a vision-capable LLM through `edgequake-llm`. It stays
//! thin: prompt wording lives in [`crate::prompts`], and the OCR operation
//! cleans the returned text with [`super::postprocess`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) spaces the retries out: with 500 ms base
//! and 3 retries the waits are 500 ms → 1 s → 2 s.

use super::encode;
use super::ocr::RecognitionEngine;
use super::recolor::PixelBuffer;
use crate::config::JobConfig;
use crate::error::PdfOpsError;
use crate::prompts::ocr_system_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Settings the recogniser takes from [`JobConfig`].
#[derive(Clone)]
pub struct VisionSettings {
    pub provider: Option<Arc<dyn LLMProvider>>,
    pub provider_name: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub system_prompt: Option<String>,
}

impl VisionSettings {
    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            provider_name: config.provider_name.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            system_prompt: config.system_prompt.clone(),
        }
    }
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self::from_config(&JobConfig::default())
    }
}

/// Recognition engine backed by a vision LLM.
///
/// The provider is resolved in [`RecognitionEngine::start`], not at
/// construction, so building a `Pipeline` never needs an API key unless an
/// OCR job actually runs.
pub struct VisionRecognizer {
    settings: VisionSettings,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    pages: usize,
}

impl VisionRecognizer {
    pub fn new(settings: VisionSettings) -> Self {
        Self {
            settings,
            active: None,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(VisionSettings::from_config(config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
            ..Default::default()
        }
    }
}

impl RecognitionEngine for VisionRecognizer {
    async fn start(&mut self, languages: &[String]) -> Result<(), PdfOpsError> {
        let provider = resolve_provider(&self.settings)?;
        info!(
            "Vision recogniser started for {} language(s), provider {}",
            languages.len(),
            self.settings.provider_name.as_deref().unwrap_or("auto")
        );
        self.active = Some(ActiveSession {
            provider,
            system_prompt: ocr_system_prompt(languages, self.settings.system_prompt.as_deref()),
            pages: 0,
        });
        Ok(())
    }

    async fn recognize(&mut self, image: &PixelBuffer) -> Result<String, PdfOpsError> {
        let options = self.options();
        let max_retries = self.settings.max_retries;
        let backoff_ms = self.settings.retry_backoff_ms;
        let session = self
            .active
            .as_mut()
            .ok_or_else(|| PdfOpsError::Internal("recognize called before start".into()))?;
        session.pages += 1;
        let page = session.pages;

        let image_data = encode::encode_page(image)
            .map_err(|e| PdfOpsError::ProcessingFailed(format!("Image encoding failed: {}", e)))?;

        // The empty user text is intentional: the image carries the content.
        let messages = vec![
            ChatMessage::system(session.system_prompt.as_str()),
            ChatMessage::user_with_images("", vec![image_data]),
        ];

        let start = Instant::now();
        let mut last_err: Option<String> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Image {}: retry {}/{} after {}ms",
                    page, attempt, max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match session.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Image {}: {} input tokens, {} output tokens, {:?}",
                        page,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Image {}: attempt {} failed: {}", page, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(PdfOpsError::ProcessingFailed(format!(
            "vision model gave no answer after {} attempt(s): {}",
            max_retries + 1,
            last_err.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    async fn terminate(&mut self) {
        if let Some(session) = self.active.take() {
            debug!("Vision recogniser released after {} image(s)", session.pages);
        }
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PdfOpsError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfOpsError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, most specific first:
///
/// 1. a pre-built provider from the settings,
/// 2. a named provider plus optional model,
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set,
/// 4. OpenAI when `OPENAI_API_KEY` is present,
/// 5. `ProviderFactory::from_env()` auto-detection.
fn resolve_provider(settings: &VisionSettings) -> Result<Arc<dyn LLMProvider>, PdfOpsError> {
    if let Some(ref provider) = settings.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = settings.provider_name {
        let model = settings.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
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
            let model = settings.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PdfOpsError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_settings() {
        let recogniser = VisionRecognizer::new(VisionSettings::default());
        let opts = recogniser.options();
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[tokio::test]
    async fn recognize_before_start_is_an_error() {
        let mut recogniser = VisionRecognizer::new(VisionSettings::default());
        let err = recogniser
            .recognize(&PixelBuffer::filled(1, 1, [0, 0, 0, 255]))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfOpsError::Internal(_)));
    }

    #[tokio::test]
    async fn terminate_without_start_is_harmless() {
        let mut recogniser = VisionRecognizer::new(VisionSettings::default());
        recogniser.terminate().await;
        assert!(recogniser.active.is_none());
    }
}
