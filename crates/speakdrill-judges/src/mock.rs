//! Mock judge for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use speakdrill_core::traits::{
    parse_verdict, HintRequest, Judge, JudgeRequest, ModelInfo, Verdict,
};

/// A mock judge for exercising sessions without real API calls.
///
/// Replies are raw judge text, run through the same verdict parser as the
/// HTTP judges. Scripted replies are used first, in order; after that the
/// reply registered for the rubric's target (sentence or word) is used,
/// then the default.
pub struct MockJudge {
    /// Replies keyed by rubric target.
    responses: HashMap<String, String>,
    /// Replies consumed one per call before anything else.
    script: Mutex<VecDeque<String>>,
    default_response: String,
    hint: String,
    related: Vec<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<JudgeRequest>>,
}

impl MockJudge {
    /// Create a mock with target → reply mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            script: Mutex::new(VecDeque::new()),
            default_response: r#"{"transcription": "", "score": 100, "is_correct": true, "advice": "", "comment": ""}"#
                .to_string(),
            hint: "Keyword1, Keyword2, Keyword3".to_string(),
            related: Vec::new(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always replies with the same text.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock that replays `replies` in order, then the default.
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new(HashMap::new());
        *mock.script.lock().unwrap_or_else(|e| e.into_inner()) =
            replies.into_iter().map(Into::into).collect();
        mock
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }

    pub fn with_related_words(mut self, words: &[&str]) -> Self {
        self.related = words.iter().map(|w| w.to_lowercase()).collect();
        self
    }

    /// Number of `evaluate` calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request passed to `evaluate`.
    pub fn last_request(&self) -> Option<JudgeRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Judge for MockJudge {
    fn name(&self) -> &str {
        "mock"
    }

    async fn evaluate(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let reply = scripted.unwrap_or_else(|| {
            self.responses
                .get(request.rubric.target())
                .cloned()
                .unwrap_or_else(|| self.default_response.clone())
        });

        Ok(parse_verdict(&reply, request.rubric.skill())?)
    }

    async fn hint(&self, _request: &HintRequest) -> anyhow::Result<String> {
        Ok(self.hint.clone())
    }

    async fn related_words(&self, _model: &str, _word: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.related.clone())
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}
