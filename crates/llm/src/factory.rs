//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a ready client.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;
use uniguide_core::{AppError, AppResult};

/// Connection settings shared by every provider.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Custom endpoint; the provider default is used when absent
    pub endpoint: Option<String>,

    /// API key for providers that require one
    pub api_key: Option<String>,

    /// Request timeout in seconds; 0 disables the timeout
    pub timeout_secs: u64,
}

/// Create an LLM client based on the provider name.
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required API key is missing
/// - The HTTP client cannot be built
pub fn create_client(provider: &str, options: &ClientOptions) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let endpoint = options
        .endpoint
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(provider_type.default_endpoint());
    let timeout = (options.timeout_secs > 0).then(|| Duration::from_secs(options.timeout_secs));

    tracing::debug!(provider = provider_type.as_str(), endpoint, "Creating LLM client");

    match provider_type {
        ProviderType::Gemini => {
            let api_key = options
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Config(
                        "Gemini provider requires an API key (set GEMINI_API_KEY)".to_string(),
                    )
                })?;

            let mut client = GeminiClient::with_base_url(endpoint, api_key);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout)?;
            }
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let mut client = OllamaClient::with_base_url(endpoint);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout)?;
            }
            Ok(Arc::new(client))
        }
    }
}
