use crate::config::InsightConfig;
use crate::report::summary::insight_prompt;
use crate::report::summary::SYSTEM_PROMPT;
use crate::report::summary::TEMPLATE_INSIGHTS;
use crate::report::AnalysisBundle;
use crate::report::InsightOrigin;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("No API key configured for the text-generation service")]
    MissingApiKey,

    #[error("Text-generation request failed: {0}")]
    Transport(String),

    #[error("Text-generation service answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unreadable text-generation response: {0}")]
    Body(#[from] std::io::Error),

    #[error("Text-generation response has no content")]
    EmptyResponse,
}

/// Produces free-form insight text from a prompt.
pub trait InsightService {
    fn generate(&self, prompt: &str) -> Result<String, InsightError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Client of an OpenAI-compatible chat-completion endpoint.
pub struct ChatCompletionClient {
    agent: ureq::Agent,
    config: InsightConfig,
}

impl ChatCompletionClient {
    pub fn new(config: InsightConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { agent, config }
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

impl InsightService for ChatCompletionClient {
    fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(InsightError::MissingApiKey);
        };
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_json(self.request_body(prompt))
            .map_err(|error| match error {
                ureq::Error::Status(status, response) => InsightError::Status {
                    status,
                    message: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => InsightError::Transport(transport.to_string()),
            })?;
        let response: ChatResponse = response.into_json()?;
        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(InsightError::EmptyResponse)
    }
}

/// Insight text for a bundle. Any service failure falls back to the
/// template text; this never fails.
pub fn generate_insights(
    service: &dyn InsightService,
    bundle: &AnalysisBundle,
    store: Option<&str>,
) -> (String, InsightOrigin) {
    match service.generate(&insight_prompt(bundle, store)) {
        Ok(text) => {
            info!("insights generated");
            (text, InsightOrigin::Service)
        }
        Err(error) => {
            warn!(%error, "insight generation failed, using template");
            (TEMPLATE_INSIGHTS.to_owned(), InsightOrigin::Template)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::set::ClassifiedWorksheetSet;
    use std::cell::RefCell;

    struct FakeService {
        answer: Option<&'static str>,
        prompts: RefCell<Vec<String>>,
    }

    impl InsightService for FakeService {
        fn generate(&self, prompt: &str) -> Result<String, InsightError> {
            self.prompts.borrow_mut().push(prompt.to_owned());
            self.answer.map(str::to_owned).ok_or(InsightError::EmptyResponse)
        }
    }

    fn bundle() -> AnalysisBundle {
        AnalysisBundle::from_worksheets("abc123", &ClassifiedWorksheetSet::new())
    }

    #[test]
    fn test_service_text_is_used() {
        let service = FakeService { answer: Some("Great NPS"), prompts: RefCell::default() };
        let (text, origin) = generate_insights(&service, &bundle(), Some("Centro"));
        assert_eq!(text, "Great NPS");
        assert_eq!(origin, InsightOrigin::Service);
        assert!(service.prompts.borrow()[0].contains("of Centro"));
    }

    #[test]
    fn test_failure_falls_back_to_template() {
        let service = FakeService { answer: None, prompts: RefCell::default() };
        let (text, origin) = generate_insights(&service, &bundle(), None);
        assert_eq!(text, TEMPLATE_INSIGHTS);
        assert_eq!(origin, InsightOrigin::Template);
    }

    #[test]
    fn test_missing_key_never_calls_out() {
        let client = ChatCompletionClient::new(InsightConfig::default());
        assert!(matches!(client.generate("hello"), Err(InsightError::MissingApiKey)));
        let (_, origin) = generate_insights(&client, &bundle(), None);
        assert_eq!(origin, InsightOrigin::Template);
    }

    #[test]
    fn test_request_body_shape() {
        let client = ChatCompletionClient::new(InsightConfig::default());
        let body = serde_json::to_value(client.request_body("prompt")).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "prompt");
        assert_eq!(body["max_tokens"], 1500);
    }
}
