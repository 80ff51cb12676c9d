pub mod answer;
pub mod command;
pub mod ollama;
pub mod prompts;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use answer::Answer;
pub use command::CommandGateway;
pub use ollama::OllamaApiGateway;

use crate::core::config::{Backend, ScanConfig};

pub const DEFAULT_MODEL: &str = "deepseek-r1:8b";
pub const DEFAULT_OLLAMA_BIN: &str = "ollama";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// A local text-generation model. Returns the raw reply, trimmed.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn query(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl<G: InferenceGateway + ?Sized> InferenceGateway for Arc<G> {
    async fn query(&self, prompt: &str) -> Result<String> {
        (**self).query(prompt).await
    }
}

#[async_trait]
impl<G: InferenceGateway + ?Sized> InferenceGateway for Box<G> {
    async fn query(&self, prompt: &str) -> Result<String> {
        (**self).query(prompt).await
    }
}

/// Builds the gateway selected by `config.backend`.
pub fn gateway_from_config(config: &ScanConfig) -> Result<Box<dyn InferenceGateway>> {
    let gateway: Box<dyn InferenceGateway> = match config.backend {
        Backend::Command => Box::new(CommandGateway::new(&config.ollama_bin, &config.model)),
        Backend::Api => Box::new(OllamaApiGateway::new(&config.ollama_host, &config.model)?),
    };
    Ok(gateway)
}

/// Asks questions and reads the replies through a strict parser.
///
/// A reply that does not parse, or a failed invocation, is asked again up to
/// `attempts` times in total. When nothing usable comes back the question is
/// treated as answered with "absent" and a warning is logged.
pub struct Oracle<G> {
    gateway: G,
    attempts: usize,
}

impl<G: InferenceGateway> Oracle<G> {
    pub fn new(gateway: G, attempts: usize) -> Self {
        Self {
            gateway,
            attempts: attempts.max(1),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn ask<T>(
        &self,
        question: &str,
        prompt: &str,
        parse: fn(&str) -> Answer<T>,
    ) -> Option<T> {
        for attempt in 1..=self.attempts {
            let raw = match self.gateway.query(prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!(
                        "Inference failed for {} (attempt {}/{}): {:#}",
                        question,
                        attempt,
                        self.attempts,
                        e
                    );
                    continue;
                }
            };
            match parse(&raw) {
                Answer::Value(v) => return Some(v),
                Answer::Absent => {
                    log::debug!("Model answered NA for {}", question);
                    return None;
                }
                Answer::Unparsable(reply) => {
                    log::warn!(
                        "Unexpected reply for {} (attempt {}/{}): {:?}",
                        question,
                        attempt,
                        self.attempts,
                        reply
                    );
                }
            }
        }
        log::warn!("Giving up on {}, treating it as absent", question);
        None
    }
}
