use crate::error::GenerationError;
use crate::industry::Industry;
use crate::retry::{backoff, retryable_status, retryable_transport};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama-3.3-70b-versatile";

// Answers are decoded at temperature zero.
const COMPLETION_TEMPERATURE: f32 = 0.0;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (Groq by
/// default). Same retry discipline as the remote embedder: bounded
/// backoff on 429/5xx/transport errors, explicit timeout surfaced as
/// `GenerationError::Timeout`.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_retries: usize,
}

impl ChatCompletionClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, GenerationError> {
        let base = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base.as_str().trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
            max_retries: max_retries.max(1),
        })
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionClient {
    async fn answer(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: COMPLETION_TEMPERATURE,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 0usize;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(self.api_key.trim())
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: ChatResponse = resp.json().await?;
                        let answer = parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|choice| choice.message.content)
                            .unwrap_or_default();
                        if answer.trim().is_empty() {
                            return Err(GenerationError::EmptyCompletion);
                        }
                        return Ok(answer);
                    }

                    let details = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if retryable_status(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(GenerationError::Backend {
                        status: status.as_u16(),
                        details,
                    });
                }
                Err(error) => {
                    if retryable_transport(&error) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        sleep(backoff(attempt)).await;
                        continue;
                    }
                    if error.is_timeout() {
                        return Err(GenerationError::Timeout { after: self.timeout });
                    }
                    return Err(error.into());
                }
            }
        }
    }
}

/// Builds the grounding prompt sent to the model.
///
/// Deterministic for a given industry, context, and question; the model is
/// told to answer only from the context and to admit when it cannot.
pub fn build_prompt(industry: Industry, context: &str, question: &str) -> String {
    format!(
        "You are a specialist in {industry}.\n\
         Use ONLY the context below to answer the question accurately.\n\
         If the answer is not in the context, say \"I don't have enough information to answer that.\"\n\
         \n\
         Context: {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
