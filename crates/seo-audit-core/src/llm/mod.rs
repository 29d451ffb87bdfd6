mod fixture;
mod gemini;
mod openai;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::analysis::AnalysisRequest;

pub use fixture::FixtureClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use settings::{LlmSettings, ProviderKind};

/// Client abstraction for the model that produces the audit.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Send the request and return the raw response text. The caller validates it.
    async fn generate(&self, request: &AnalysisRequest) -> Result<String>;
}

/// Construct the client selected by `settings.provider`.
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn AnalysisClient>> {
    let client: Arc<dyn AnalysisClient> = match settings.provider {
        ProviderKind::Gemini => Arc::new(GeminiClient::new(settings)?),
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(settings)?),
        ProviderKind::Fixture => Arc::new(FixtureClient::new(settings)?),
    };
    Ok(client)
}

fn http_client(settings: &LlmSettings, provider: &str) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("seo-audit/", env!("CARGO_PKG_VERSION")));
    if let Some(secs) = settings.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .with_context(|| format!("failed to build {provider} HTTP client"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: ProviderKind) -> LlmSettings {
        LlmSettings {
            provider,
            api_key: "key".into(),
            endpoint: None,
            model: None,
            timeout_secs: None,
            fixture_path: Some("report.json".into()),
            debug_payloads: false,
        }
    }

    #[test]
    fn builds_every_provider() {
        for provider in [ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::Fixture] {
            assert!(build_client(&settings(provider)).is_ok(), "{provider}");
        }
    }

    #[test]
    fn network_providers_reject_blank_key() {
        let mut settings = settings(ProviderKind::OpenAi);
        settings.api_key = "  ".into();
        assert!(build_client(&settings).is_err());
    }
}
