use crate::config::ProcessingConfig;
use crate::error::{PipelineError, Result};
use crate::traits::GenerativeService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "gemini-chat";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Output stays bounded and sampling stays cold: a grounded answer should
/// restate retrieved context, not improvise beyond it.
const MAX_OUTPUT_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest<'a> {
    system_instruction: Turn<'a>,
    contents: Vec<Turn<'a>>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<TurnPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TurnPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub(crate) fn build_request<'a>(system_prompt: &'a str, user_prompt: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        system_instruction: Turn {
            role: None,
            parts: vec![TurnPart {
                text: system_prompt,
            }],
        },
        contents: vec![Turn {
            role: Some("user"),
            parts: vec![TurnPart { text: user_prompt }],
        }],
        generation_config: GenerationSettings {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(config: &ProcessingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl GenerativeService for GeminiGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = build_request(system_prompt, user_prompt);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| PipelineError::from_http(SERVICE, error))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PipelineError::rejected(
                SERVICE,
                format!("{status}: {details}"),
            ));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        let answer = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(PipelineError::rejected(SERVICE, "no candidates returned"));
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::build_request;

    #[test]
    fn request_uses_the_wire_field_names() {
        let request = build_request("be factual", "what is the leave policy?");
        let value = serde_json::to_value(&request).expect("request should serialize");

        assert!(value.get("systemInstruction").is_some());
        assert_eq!(
            value.pointer("/contents/0/role").and_then(|v| v.as_str()),
            Some("user")
        );
        assert_eq!(
            value
                .pointer("/generationConfig/maxOutputTokens")
                .and_then(|v| v.as_u64()),
            Some(1024)
        );
        let temperature = value
            .pointer("/generationConfig/temperature")
            .and_then(|v| v.as_f64())
            .expect("temperature present");
        assert!(temperature < 0.5);
    }
}
