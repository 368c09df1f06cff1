//! Configuration types for synopsis extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`].

use crate::error::SynopsisError;
use crate::pipeline::chunk::DEFAULT_MAX_CHUNK_CHARS;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default model when the OpenAI provider is selected without a model name.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Smallest accepted chunk size.
pub const MIN_CHUNK_CHARS: usize = 1_000;

/// Configuration for a synopsis extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_synopsis::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .max_chunk_chars(60_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_chunk_chars, 60_000);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`] for named providers and the provider
    /// default for auto-detected ones.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the
    /// environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per chunk. Default: 16384.
    ///
    /// A fully populated synopsis of a large oncology protocol (long
    /// eligibility lists, many arms) runs to several thousand tokens; a
    /// truncated reply is invalid JSON and fails the whole run.
    pub max_tokens: usize,

    /// Maximum characters of protocol text per request. Default: 100 000.
    pub max_chunk_chars: usize,

    /// Custom system prompt. If None, uses the built-in schema prompt.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-request model timeout in seconds. Default: 300.
    ///
    /// Large chunks with long replies routinely take a minute or more.
    pub api_timeout_secs: u64,

    /// Optional per-chunk progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 16_384,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            system_prompt: None,
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system prompt that will actually be sent.
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYSTEM_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
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

    pub fn max_chunk_chars(mut self, n: usize) -> Self {
        self.config.max_chunk_chars = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, SynopsisError> {
        let c = &self.config;
        if c.max_chunk_chars < MIN_CHUNK_CHARS {
            return Err(SynopsisError::InvalidConfig(format!(
                "max_chunk_chars must be ≥ {MIN_CHUNK_CHARS}, got {}",
                c.max_chunk_chars
            )));
        }
        if c.max_tokens == 0 {
            return Err(SynopsisError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(SynopsisError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if let Some(ref p) = c.system_prompt {
            if p.trim().is_empty() {
                return Err(SynopsisError::InvalidConfig(
                    "system_prompt must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 16_384);
        assert_eq!(c.max_chunk_chars, 100_000);
        assert_eq!(c.api_timeout_secs, 300);
        assert!(c.effective_system_prompt().contains("Required JSON Schema"));
    }

    #[test]
    fn builder_rejects_tiny_chunks() {
        let err = ExtractionConfig::builder()
            .max_chunk_chars(10)
            .build()
            .unwrap_err();
        assert!(matches!(err, SynopsisError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_tokens_and_blank_prompt() {
        assert!(ExtractionConfig::builder().max_tokens(0).build().is_err());
        assert!(ExtractionConfig::builder().system_prompt("  ").build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ExtractionConfig::builder().temperature(7.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn custom_system_prompt_takes_effect() {
        let c = ExtractionConfig::builder()
            .system_prompt("Return {}")
            .build()
            .unwrap();
        assert_eq!(c.effective_system_prompt(), "Return {}");
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
