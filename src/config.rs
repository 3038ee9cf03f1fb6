//! Configuration for the intake clients and the analysis server.
//!
//! Endpoints are explicit values handed to the clients at construction. The
//! library never reads the environment to find them; the binary does that
//! (through clap's `env` fallbacks) and passes the result in. This keeps tests
//! free to point the clients at any local address.

use crate::error::IntakeError;
use std::fmt;
use tracing::warn;

/// Analysis endpoint used when none is configured.
pub const DEFAULT_ANALYSIS_ENDPOINT: &str = "http://127.0.0.1:8787/api/analyze";

/// Webhook used when no override is supplied.
pub const DEFAULT_DELIVERY_ENDPOINT: &str = "http://127.0.0.1:5678/webhook/pdf-intake";

/// Environment variable the binary reads the webhook override from.
pub const DELIVERY_ENDPOINT_ENV: &str = "WEBHOOK_URL";

/// Environment variable the model provider reads its key from, or `None`
/// for providers that run without one (e.g. a local Ollama).
pub fn provider_key_env(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        _ => None,
    }
}

/// Pick the delivery endpoint: a non-empty override wins, otherwise the
/// built-in default. A missing override is only worth a warning.
pub fn resolve_delivery_endpoint(override_url: Option<&str>) -> String {
    match override_url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            warn!(
                "{} is not set; using default webhook {}. Set {} for production use.",
                DELIVERY_ENDPOINT_ENV, DEFAULT_DELIVERY_ENDPOINT, DELIVERY_ENDPOINT_ENV
            );
            DEFAULT_DELIVERY_ENDPOINT.to_string()
        }
    }
}

/// Configuration for one intake session's collaborators.
///
/// Built via [`IntakeConfig::builder()`] or [`IntakeConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_intake::IntakeConfig;
///
/// let config = IntakeConfig::builder()
///     .analysis_endpoint("http://localhost:8787/api/analyze")
///     .delivery_endpoint("https://hooks.example.com/intake")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// URL of the analysis service (`POST`, one call per file).
    pub analysis_endpoint: String,

    /// URL of the webhook that receives the reviewed results.
    pub delivery_endpoint: String,

    /// `User-Agent` sent with both calls.
    pub user_agent: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            analysis_endpoint: DEFAULT_ANALYSIS_ENDPOINT.to_string(),
            delivery_endpoint: DEFAULT_DELIVERY_ENDPOINT.to_string(),
            user_agent: concat!("pdf-intake/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl IntakeConfig {
    /// Create a new builder for `IntakeConfig`.
    pub fn builder() -> IntakeConfigBuilder {
        IntakeConfigBuilder {
            config: Self::default(),
        }
    }

    /// A `reqwest` client carrying the configured user agent.
    ///
    /// No timeout is set: a hung collaborator hangs the session in
    /// `Processing` or `Sending` until the transport gives up.
    pub fn http_client(&self) -> Result<reqwest::Client, IntakeError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| IntakeError::Internal(format!("Failed to build HTTP client: {e}")))
    }
}

/// Builder for [`IntakeConfig`].
#[derive(Debug)]
pub struct IntakeConfigBuilder {
    config: IntakeConfig,
}

impl IntakeConfigBuilder {
    pub fn analysis_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.analysis_endpoint = url.into();
        self
    }

    pub fn delivery_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.delivery_endpoint = url.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating both endpoints.
    pub fn build(self) -> Result<IntakeConfig, IntakeError> {
        check_http_url("analysis endpoint", &self.config.analysis_endpoint)?;
        check_http_url("delivery endpoint", &self.config.delivery_endpoint)?;
        Ok(self.config)
    }
}

fn check_http_url(what: &str, url: &str) -> Result<(), IntakeError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| IntakeError::InvalidConfig(format!("{what} '{url}' is not a URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(IntakeError::InvalidConfig(format!(
            "{what} must be http or https, got '{other}'"
        ))),
    }
}

/// Configuration for the analysis server (`pdf-intake serve`).
#[derive(Clone)]
pub struct ServerConfig {
    /// Interface to bind. Default: `127.0.0.1`.
    pub host: String,

    /// Port to bind. Default: 8787.
    pub port: u16,

    /// LLM provider name understood by `edgequake-llm`. Default: `gemini`.
    pub provider_name: String,

    /// Model identifier. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Value of the provider's key variable (see [`provider_key_env`]).
    /// When the provider needs a key and this is `None`, every analysis
    /// request is answered with a server configuration error.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction should repeat what the document says, not embellish it.
    pub temperature: f32,

    /// Output token budget per document. Default: 8192.
    ///
    /// The response carries the document's full text as well as the
    /// structured fields, so this is larger than a summary would need.
    pub max_tokens: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            provider_name: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 8192,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The credential, if one was supplied and is not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// The key variable the configured provider needs but was not given.
    pub fn missing_credential(&self) -> Option<&'static str> {
        provider_key_env(&self.provider_name).filter(|_| self.credential().is_none())
    }
}
