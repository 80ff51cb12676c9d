use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::InferenceGateway;
use crate::core::config::normalize_host;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Talks to a local Ollama server through `POST /api/generate`.
pub struct OllamaApiGateway {
    client: Client,
    endpoint: Url,
    model: String,
}

impl OllamaApiGateway {
    pub fn new(host: &str, model: &str) -> Result<Self> {
        let endpoint = generate_endpoint(host)?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            model: model.to_string(),
        })
    }
}

pub fn generate_endpoint(host: &str) -> Result<Url> {
    let base = Url::parse(&format!("{}/", normalize_host(host)))?;
    Ok(base.join("api/generate")?)
}

#[async_trait]
impl InferenceGateway for OllamaApiGateway {
    async fn query(&self, prompt: &str) -> Result<String> {
        log::debug!("POST {} model={}", self.endpoint, self.model);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama returned {}: {}", status, body.trim()));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }
}
