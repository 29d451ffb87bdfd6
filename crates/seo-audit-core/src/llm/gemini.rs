use super::{http_client, AnalysisClient, LlmSettings};
use crate::analysis::AnalysisRequest;
use crate::report::schema::response_schema;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// `generateContent` client that constrains output with `responseSchema`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    url: String,
    api_key: String,
    debug_payloads: bool,
}

impl GeminiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("Gemini API key must be provided via {}", LlmSettings::API_KEY_ENV);
        }
        let base = settings.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let model = settings.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            base.trim_end_matches('/'),
            model
        );
        Ok(Self {
            http: http_client(settings, "Gemini")?,
            url,
            api_key: settings.api_key.clone(),
            debug_payloads: settings.debug_payloads,
        })
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        let payload = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };
        debug!(url = %self.url, "sending Gemini generateContent request");

        let response = self
            .http
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&payload)
            .send()
            .await
            .context("failed to call Gemini generateContent API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, body);
        }

        let message: GeminiResponse = response
            .json()
            .await
            .context("failed to parse Gemini response")?;
        let candidate = message
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response contained no candidates"))?;
        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            bail!("Gemini response missing message content");
        }
        if self.debug_payloads {
            debug!(payload = %text, "raw Gemini payload");
        }
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;
    use httpmock::prelude::*;
    use serde_json::json;

    fn base_settings(url: String) -> LlmSettings {
        LlmSettings {
            provider: ProviderKind::Gemini,
            api_key: "test-key".into(),
            endpoint: Some(url),
            model: Some("gemini-test".into()),
            timeout_secs: Some(5),
            fixture_path: None,
            debug_payloads: false,
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::for_url("https://example.com")
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn generate_sends_schema_and_joins_parts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-test:generateContent")
                .query_param("key", "test-key")
                .body_contains("\"responseMimeType\":\"application/json\"")
                .body_contains("\"responseSchema\"")
                .body_contains("https://example.com");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "candidates": [
                        {
                            "content": {
                                "role": "model",
                                "parts": [
                                    {"text": "{\"overallScore\":"},
                                    {"text": "82}"}
                                ]
                            }
                        }
                    ]
                }));
        });

        let client = GeminiClient::new(&base_settings(server.base_url())).unwrap();
        let text = client.generate(&request()).await.unwrap();
        assert_eq!(text, "{\"overallScore\":82}");
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn server_error_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-test:generateContent");
            then.status(500).body("boom");
        });

        let client = GeminiClient::new(&base_settings(server.base_url())).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("Gemini API error"));
        mock.assert_hits(1);
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn empty_candidates_are_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({ "candidates": [] }));
        });

        let client = GeminiClient::new(&base_settings(server.base_url())).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn url_uses_default_model() {
        let mut settings = base_settings("https://example.test/".into());
        settings.model = None;
        let client = GeminiClient::new(&settings).unwrap();
        assert_eq!(
            client.url,
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }
}
