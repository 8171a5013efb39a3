//! OpenAI judge implementation (audio-capable chat completions).

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use speakdrill_core::traits::{
    parse_verdict, parse_word_list, related_words_prompt, AudioClip, HintRequest, Judge,
    JudgeRequest, ModelInfo, Verdict, JUDGE_SYSTEM_PROMPT,
};

use crate::http::{check_status, client, parse_error, send_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible judge.
pub struct OpenAiJudge {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiJudge {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client: client(),
        }
    }

    async fn complete(
        &self,
        model: &str,
        temperature: Option<f64>,
        system: Option<&str>,
        parts: Vec<ContentPart>,
    ) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: vec![ContentPart::Text {
                    text: system.to_string(),
                }],
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: parts,
        });

        let body = ChatRequest {
            model: model.to_string(),
            temperature,
            messages,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.json(&body).send().await.map_err(send_error)?;
        let response = check_status(response, model).await?;
        let api_response: ChatResponse = response.json().await.map_err(parse_error)?;

        Ok(api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
}

impl ContentPart {
    fn audio(clip: &AudioClip) -> Self {
        ContentPart::InputAudio {
            input_audio: InputAudio {
                data: base64::engine::general_purpose::STANDARD.encode(&clip.bytes),
                format: clip.format().to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct InputAudio {
    data: String,
    format: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Judge for OpenAiJudge {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model, skill = %request.rubric.skill()))]
    async fn evaluate(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        let parts = vec![
            ContentPart::Text {
                text: request.rubric.prompt(),
            },
            ContentPart::audio(&request.audio),
        ];
        let text = self
            .complete(
                &request.model,
                Some(request.temperature),
                Some(JUDGE_SYSTEM_PROMPT),
                parts,
            )
            .await?;
        Ok(parse_verdict(&text, request.rubric.skill())?)
    }

    #[instrument(skip(self, request), fields(model = %request.model, word = %request.word))]
    async fn hint(&self, request: &HintRequest) -> anyhow::Result<String> {
        let text = self
            .complete(
                &request.model,
                None,
                None,
                vec![ContentPart::Text {
                    text: request.prompt(),
                }],
            )
            .await?;
        Ok(text.trim().to_string())
    }

    #[instrument(skip(self))]
    async fn related_words(&self, model: &str, word: &str) -> anyhow::Result<Vec<String>> {
        let text = self
            .complete(
                model,
                None,
                None,
                vec![ContentPart::Text {
                    text: related_words_prompt(word),
                }],
            )
            .await?;
        Ok(parse_word_list(&text))
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4o-audio-preview".into(),
                name: "GPT-4o Audio".into(),
                provider: "openai".into(),
                max_context: 128_000,
                cost_per_1k_input: 0.0025,
                cost_per_1k_output: 0.01,
            },
            ModelInfo {
                id: "gpt-4o-mini-audio-preview".into(),
                name: "GPT-4o Mini Audio".into(),
                provider: "openai".into(),
                max_context: 128_000,
                cost_per_1k_input: 0.00015,
                cost_per_1k_output: 0.0006,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speakdrill_core::error::JudgeError;
    use speakdrill_core::traits::{Rubric, VerdictOutcome};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"content": content, "role": "assistant"}, "index": 0}],
            "model": "gpt-4o-audio-preview",
            "usage": {"prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55}
        })
    }

    fn definition_request() -> JudgeRequest {
        JudgeRequest {
            model: "gpt-4o-audio-preview".into(),
            temperature: 0.0,
            audio: AudioClip::wav(b"RIFF".to_vec()),
            rubric: Rubric::Definition {
                word: "Journey".into(),
                definition: "an act of travelling from one place to another".into(),
            },
        }
    }

    #[tokio::test]
    async fn definition_verdict() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "system"}, {"role": "user", "content": [
                    {"type": "text"},
                    {"type": "input_audio", "input_audio": {"format": "wav", "data": "UklGRg=="}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"transcription": "a long trip", "is_correct": "false", "comment": "もう少し"}"#,
            )))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("test-key", Some(server.uri()), None);
        let verdict = judge.evaluate(&definition_request()).await.unwrap();
        assert_eq!(verdict.transcript, "a long trip");
        assert_eq!(verdict.outcome, VerdictOutcome::Pass(false));
        assert_eq!(verdict.feedback, "もう少し");
    }

    #[tokio::test]
    async fn organization_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("OpenAI-Organization", "org-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Trip, Travel, Voyage")))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("key", Some(server.uri()), Some("org-1".into()));
        let words = judge
            .related_words("gpt-4o-audio-preview", "Journey")
            .await
            .unwrap();
        assert_eq!(words, vec!["trip", "travel", "voyage"]);
    }

    #[tokio::test]
    async fn rate_limit_honours_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("key", Some(server.uri()), None);
        let err = judge.evaluate(&definition_request()).await.unwrap_err();
        let judge_err = err.downcast_ref::<JudgeError>().unwrap();
        assert_eq!(judge_err.retry_after_ms(), Some(2000));
        assert!(!judge_err.is_permanent());
    }

    #[tokio::test]
    async fn unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("bad", Some(server.uri()), None);
        let err = judge.evaluate(&definition_request()).await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn hint_sends_no_system_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                "\"trip\", \"voyage\", \"travel\"",
            )))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("key", Some(server.uri()), None);
        let hint = judge
            .hint(&HintRequest {
                model: "gpt-4o-audio-preview".into(),
                word: "Journey".into(),
                definition: "an act of travelling".into(),
            })
            .await
            .unwrap();
        assert!(hint.contains("voyage"));
        let words = judge
            .related_words("gpt-4o-audio-preview", "Journey")
            .await
            .unwrap();
        assert_eq!(words, vec!["trip", "voyage", "travel"]);

        for request in server.received_requests().await.unwrap() {
            let body: serde_json::Value = request.body_json().unwrap();
            let messages = body["messages"].as_array().unwrap();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0]["role"], "user");
        }
    }
}
