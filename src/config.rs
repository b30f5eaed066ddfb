//! Configuration shared by every operation.
//!
//! Per-operation options (tint colour, split ranges, ...) travel inside
//! [`crate::job::Operation`]. Everything that applies across operations lives
//! in [`JobConfig`], built via its [`JobConfigBuilder`].

use crate::error::PdfOpsError;
use crate::progress::{CancellationToken, ProgressCallback};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a job run.
///
/// Built via [`JobConfig::builder()`] or using [`JobConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfops::JobConfig;
///
/// let config = JobConfig::builder()
///     .render_scale(3.0)
///     .languages(["deu", "eng"])
///     .build()
///     .unwrap();
/// assert_eq!(config.languages, vec!["deu", "eng"]);
/// ```
#[derive(Clone)]
pub struct JobConfig {
    /// Rasterisation scale for OCR and recolor. Range: 0.5–6.0. Default: 2.0.
    ///
    /// 1.0 renders one pixel per point (72 DPI). Recolored text edges look
    /// jagged at low scales because each pixel is classified on its own;
    /// rendering larger and placing the result back at page size hides that.
    pub render_scale: f32,

    /// Retry a failed parse after trimming bytes outside `%PDF` … `%%EOF`.
    /// Default: true.
    pub tolerant_load: bool,

    /// OCR languages, in priority order. Default: `["eng"]`.
    pub languages: Vec<String>,

    /// How pages are separated in assembled OCR text. Default: blank line.
    pub page_separator: PageSeparator,

    /// Receives progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,

    /// Checked between units of work. Default: a fresh, unset token.
    pub cancellation: CancellationToken,

    /// Vision model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for recognition. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Retries per page on a failed vision call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom OCR system prompt; `{languages}` is substituted.
    pub system_prompt: Option<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            tolerant_load: true,
            languages: vec!["eng".to_string()],
            page_separator: PageSeparator::default(),
            progress_callback: None,
            cancellation: CancellationToken::new(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("render_scale", &self.render_scale)
            .field("tolerant_load", &self.tolerant_load)
            .field("languages", &self.languages)
            .field("page_separator", &self.page_separator)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn JobProgressCallback>"),
            )
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn tolerant_load(mut self, v: bool) -> Self {
        self.config.tolerant_load = v;
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.config.cancellation = token;
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

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, PdfOpsError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl JobConfig {
    /// Check the constraints [`JobConfigBuilder::build`] enforces. Jobs call
    /// this too, since a `JobConfig` can be built by hand.
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        if !(0.5..=6.0).contains(&self.render_scale) {
            return Err(PdfOpsError::InvalidOptions(format!(
                "render scale must be 0.5–6.0, got {}",
                self.render_scale
            )));
        }
        if self.languages.is_empty() || self.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(PdfOpsError::InvalidOptions(
                "at least one non-empty OCR language is required".into(),
            ));
        }
        Ok(())
    }
}

/// How to separate pages in assembled OCR text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Pages joined with one blank line. (default)
    #[default]
    None,
    /// A line of dashes: "\n---\n"
    HorizontalRule,
    /// A page marker line: "--- page N ---"
    PageNumber,
    /// Custom string on its own line between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n".to_string(),
            PageSeparator::HorizontalRule => "\n---\n\n".to_string(),
            PageSeparator::PageNumber => format!("\n--- page {} ---\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = JobConfig::default();
        assert_eq!(c.render_scale, 2.0);
        assert!(c.tolerant_load);
        assert_eq!(c.languages, vec!["eng"]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn out_of_range_scale_is_rejected() {
        let err = JobConfig::builder().render_scale(9.0).build().unwrap_err();
        assert!(matches!(err, PdfOpsError::InvalidOptions(_)));
        assert!(JobConfig::builder().render_scale(0.5).build().is_ok());
    }

    #[test]
    fn empty_languages_are_rejected() {
        let err = JobConfig::builder()
            .languages(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn debug_lists_settings_without_trait_objects() {
        let c = JobConfig::builder()
            .progress_callback(Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{:?}", c);
        assert!(dbg.contains("<dyn JobProgressCallback>"));
        assert!(dbg.contains("tolerant_load: true"));
        assert!(!dbg.contains("password"));
    }

    #[test]
    fn separators() {
        assert_eq!(PageSeparator::None.render(2), "\n");
        assert_eq!(PageSeparator::PageNumber.render(3), "\n--- page 3 ---\n\n");
        assert_eq!(
            PageSeparator::Custom("***".into()).render(2),
            "\n***\n\n"
        );
    }
}
