use super::{http_client, AnalysisClient, LlmSettings};
use crate::analysis::AnalysisRequest;
use crate::report::schema::openai_json_schema;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    debug_payloads: bool,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("OpenAI API key must be provided via {}", LlmSettings::API_KEY_ENV);
        }
        let base = settings.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
        Ok(Self {
            http: http_client(settings, "OpenAI")?,
            url,
            api_key: settings.api_key.clone(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            debug_payloads: settings.debug_payloads,
        })
    }
}

#[async_trait]
impl AnalysisClient for OpenAiClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_instruction.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt.clone(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "seo_report",
                    strict: true,
                    schema: openai_json_schema(),
                },
            },
        };
        debug!(url = %self.url, model = %self.model, "sending OpenAI chat completion request");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to call OpenAI chat completions API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI API error ({}): {}", status, body);
        }

        let chat: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to parse OpenAI response")?;
        let content = chat
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI response missing message content"))?;
        if self.debug_payloads {
            debug!(payload = %content, "raw OpenAI payload");
        }
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;
    use httpmock::prelude::*;
    use serde_json::json;

    fn base_settings(url: String) -> LlmSettings {
        LlmSettings {
            provider: ProviderKind::OpenAi,
            api_key: "test-key".into(),
            endpoint: Some(url),
            model: Some("gpt-test".into()),
            timeout_secs: None,
            fixture_path: None,
            debug_payloads: true,
        }
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn generate_requests_strict_json_schema() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .body_contains("\"type\":\"json_schema\"")
                .body_contains("\"strict\":true")
                .body_contains("\"model\":\"gpt-test\"");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "{\"overallScore\":82}"}}
                    ]
                }));
        });

        let client = OpenAiClient::new(&base_settings(server.base_url())).unwrap();
        let text = client
            .generate(&AnalysisRequest::for_url("https://example.com"))
            .await
            .unwrap();
        assert_eq!(text, "{\"overallScore\":82}");
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn surfaces_api_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("unauthorized");
        });

        let client = OpenAiClient::new(&base_settings(server.base_url())).unwrap();
        let err = client
            .generate(&AnalysisRequest::for_url("https://example.com"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OpenAI API error"));
        assert!(err.to_string().contains("unauthorized"));
    }
}
