//! Google Gemini judge implementation.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use speakdrill_core::traits::{
    parse_verdict, parse_word_list, related_words_prompt, AudioClip, HintRequest, Judge,
    JudgeRequest, ModelInfo, Verdict, JUDGE_SYSTEM_PROMPT,
};

use crate::http::{check_status, client, parse_error, send_error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Judge backed by the Gemini `generateContent` API.
pub struct GeminiJudge {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiJudge {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: client(),
        }
    }

    async fn generate(
        &self,
        model: &str,
        temperature: Option<f64>,
        system: Option<&str>,
        parts: Vec<Part>,
        json_reply: bool,
    ) -> anyhow::Result<String> {
        let body = GenerateContentRequest {
            system_instruction: system.map(|text| Content {
                role: None,
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature,
                response_mime_type: json_reply.then(|| "application/json".to_string()),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let response = check_status(response, model).await?;
        let api_response: GenerateContentResponse = response.json().await.map_err(parse_error)?;

        let text = api_response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    fn audio(clip: &AudioClip) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: clip.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&clip.bytes),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Judge for GeminiJudge {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %request.model, skill = %request.rubric.skill()))]
    async fn evaluate(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        let parts = vec![
            Part::audio(&request.audio),
            Part::Text {
                text: request.rubric.prompt(),
            },
        ];
        let text = self
            .generate(
                &request.model,
                Some(request.temperature),
                Some(JUDGE_SYSTEM_PROMPT),
                parts,
                true,
            )
            .await?;
        Ok(parse_verdict(&text, request.rubric.skill())?)
    }

    #[instrument(skip(self, request), fields(model = %request.model, word = %request.word))]
    async fn hint(&self, request: &HintRequest) -> anyhow::Result<String> {
        let parts = vec![Part::Text {
            text: request.prompt(),
        }];
        let text = self
            .generate(&request.model, None, None, parts, false)
            .await?;
        Ok(text.trim().to_string())
    }

    #[instrument(skip(self))]
    async fn related_words(&self, model: &str, word: &str) -> anyhow::Result<Vec<String>> {
        let parts = vec![Part::Text {
            text: related_words_prompt(word),
        }];
        let text = self.generate(model, None, None, parts, false).await?;
        Ok(parse_word_list(&text))
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.5-flash-lite".into(),
                name: "Gemini 2.5 Flash-Lite".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                cost_per_1k_input: 0.0003,
                cost_per_1k_output: 0.0004,
            },
            ModelInfo {
                id: "gemini-2.5-flash".into(),
                name: "Gemini 2.5 Flash".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                cost_per_1k_input: 0.001,
                cost_per_1k_output: 0.0025,
            },
            ModelInfo {
                id: "gemini-2.5-pro".into(),
                name: "Gemini 2.5 Pro".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                cost_per_1k_input: 0.00125,
                cost_per_1k_output: 0.01,
            },
        ]
    }
}
