//! In-memory stand-ins for the network and the model, used to drive the
//! pipeline without either.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::fetch::Fetch;
use crate::inference::InferenceGateway;

/// Serves fixed bodies by exact URL and remembers every request.
#[derive(Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requested().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn get(&self, url: &str) -> Option<String> {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        self.bodies.get(url).cloned()
    }
}

struct Rule {
    needle: String,
    answers: Vec<String>,
    served: usize,
}

/// Answers by the first rule whose needle occurs in the prompt. A rule's
/// answers are handed out in order and the last one repeats. Prompts that
/// match no rule get the default answer, `NA` unless changed.
pub struct ScriptedGateway {
    rules: Mutex<Vec<Rule>>,
    default_answer: String,
    failures_left: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default_answer: "NA".to_string(),
            failures_left: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn rule(self, needle: &str, answers: &[&str]) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Rule {
                needle: needle.to_string(),
                answers: answers.iter().map(|a| a.to_string()).collect(),
                served: 0,
            });
        self
    }

    pub fn with_default(mut self, answer: &str) -> Self {
        self.default_answer = answer.to_string();
        self
    }

    /// The first `n` queries fail as if the model process crashed.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    async fn query(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow!("scripted failure"));
        }

        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        for rule in rules.iter_mut() {
            if !prompt.contains(&rule.needle) || rule.answers.is_empty() {
                continue;
            }
            let idx = rule.served.min(rule.answers.len() - 1);
            rule.served += 1;
            return Ok(rule.answers[idx].clone());
        }
        Ok(self.default_answer.clone())
    }
}
