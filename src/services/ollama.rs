use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::gateway::{interpret_output, GatewayError, GeneratedReply, TextGenerator};

/// Sampling options forwarded verbatim to the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub num_predict: i32,
    pub num_ctx: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            num_predict: 512,
            num_ctx: 4096,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: &'a GenerationOptions,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama `/api/generate` client
pub struct OllamaClient {
    base_url: String,
    model: String,
    options: GenerationOptions,
    client: Client,
}

impl OllamaClient {
    pub fn new(
        base_url: String,
        model: String,
        options: GenerationOptions,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            model,
            options,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReply, GatewayError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        tracing::debug!("Generating with {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                options: &self.options,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Generation backend returned {}: {}", status, body);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse generation: {}", e)))?;

        Ok(interpret_output(&body.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let options = GenerationOptions::default();
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3",
            prompt: "hi",
            options: &options,
            stream: false,
        })
        .unwrap();

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["top_k"], 40);
        assert_eq!(body["options"]["num_predict"], 512);
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
            GenerationOptions::default(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.model(), "llama3");
    }
}
