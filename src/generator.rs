use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::GeneratorConfig;
use crate::quiz::{Question, QuestionError, Quiz, new_id, now};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no API key configured for quiz generation")]
    MissingApiKey,
    #[error("a topic is required to generate a quiz")]
    EmptyTopic,
    #[error("generation request failed: {reason}")]
    Transport { reason: String },
    #[error("generation service returned no content")]
    EmptyResponse,
    #[error("generated content is not valid JSON: {source}")]
    MalformedJson { source: serde_json::Error },
    #[error("generated quiz is unusable: {reason}")]
    Invalid { reason: String },
    #[error("generated question {index} is unusable: {source}")]
    InvalidQuestion {
        index: usize,
        source: QuestionError,
    },
}

impl GenerationError {
    /// What the author is shown for any generation failure. The cause is only logged.
    pub const USER_MESSAGE: &'static str =
        "Failed to generate quiz. Please check your API key and try again.";
}

/// A fully prepared call to the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub url: String,
    pub api_key: String,
    pub body: Value,
}

/// Sends a [`GenerationRequest`] and returns the raw response body.
#[allow(async_fn_in_trait)]
pub trait GenerationTransport {
    async fn send(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, serde::Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, serde::Deserialize)]
struct Part {
    text: Option<String>,
}

/// The quiz shape the service is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl GeneratedQuiz {
    /// Validates the generated content and turns it into a [`Quiz`] with fresh ids.
    pub fn into_quiz(self) -> Result<Quiz, GenerationError> {
        if self.title.trim().is_empty() {
            return Err(GenerationError::Invalid {
                reason: "title is empty".to_string(),
            });
        }

        if self.questions.is_empty() {
            return Err(GenerationError::Invalid {
                reason: "no questions were returned".to_string(),
            });
        }

        let mut questions = Vec::with_capacity(self.questions.len());
        for (index, generated) in self.questions.into_iter().enumerate() {
            let question =
                Question::new(generated.text, generated.options, generated.correct_answer);
            question
                .validate()
                .map_err(|source| GenerationError::InvalidQuestion {
                    index: index + 1,
                    source,
                })?;
            questions.push(question);
        }

        Ok(Quiz {
            id: new_id(),
            title: self.title,
            description: self
                .description
                .filter(|description| !description.trim().is_empty()),
            questions,
            created_at: now(),
        })
    }
}

/// Parses the JSON text the service produced into a validated [`Quiz`].
pub fn parse_generated_quiz(payload: &str) -> Result<Quiz, GenerationError> {
    let generated: GeneratedQuiz = serde_json::from_str(payload)
        .map_err(|source| GenerationError::MalformedJson { source })?;

    generated.into_quiz()
}

/// Pulls the generated text out of a `generateContent` response body.
pub fn extract_response_text(body: &str) -> Result<String, GenerationError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|source| GenerationError::MalformedJson { source })?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    Ok(text)
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": { "type": "STRING" },
                        "options": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" }
                        },
                        "correctAnswer": { "type": "STRING" }
                    },
                    "required": ["text", "options", "correctAnswer"]
                }
            }
        },
        "required": ["title", "questions"]
    })
}

/// Turns a topic into a quiz with one call to the generation service.
#[derive(Debug, Clone)]
pub struct QuizGenerator<T> {
    transport: T,
    config: GeneratorConfig,
}

impl<T: GenerationTransport> QuizGenerator<T> {
    pub fn new(transport: T, config: GeneratorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn prompt(&self, topic: &str) -> String {
        format!(
            "Create a multiple-choice quiz about \"{}\".\n\
             Include a title, a short description, and {} questions.\n\
             For each question, provide {} options and the correct answer text.",
            topic.trim(),
            self.config.question_count,
            self.config.option_count
        )
    }

    pub fn request(&self, topic: &str) -> Result<GenerationRequest, GenerationError> {
        if topic.trim().is_empty() {
            return Err(GenerationError::EmptyTopic);
        }

        let api_key = self
            .config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        Ok(GenerationRequest {
            url: self.config.request_url(),
            api_key,
            body: json!({
                "contents": [{ "parts": [{ "text": self.prompt(topic) }] }],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": response_schema()
                }
            }),
        })
    }

    /// Generates a quiz about `topic`. No retries: any failure fails the whole attempt.
    pub async fn generate(&self, topic: &str) -> Result<Quiz, GenerationError> {
        let result = self.try_generate(topic).await;

        match &result {
            Ok(quiz) => info!(quiz_id = %quiz.id, questions = quiz.questions.len(), "quiz generated"),
            Err(error) => warn!(%error, topic, "quiz generation failed"),
        }

        result
    }

    async fn try_generate(&self, topic: &str) -> Result<Quiz, GenerationError> {
        let request = self.request(topic)?;
        let body = self.transport.send(&request).await?;
        let text = extract_response_text(&body)?;

        parse_generated_quiz(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;

    struct CannedTransport {
        reply: Result<String, String>,
        sent: RefCell<Vec<GenerationRequest>>,
    }

    impl CannedTransport {
        fn replying(text: &str) -> Self {
            let body = json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            });
            Self {
                reply: Ok(body.to_string()),
                sent: RefCell::new(Vec::new()),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl GenerationTransport for CannedTransport {
        async fn send(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.sent.borrow_mut().push(request.clone());
            self.reply
                .clone()
                .map_err(|reason| GenerationError::Transport { reason })
        }
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            api_key: Some("test-key".to_string()),
            ..GeneratorConfig::default()
        }
    }

    const PLANETS: &str = r#"{
        "title": "Planets",
        "description": "",
        "questions": [
            {
                "text": "Largest planet?",
                "options": ["Mars", "Jupiter", "Venus", "Mercury"],
                "correctAnswer": "Jupiter"
            },
            {
                "text": "Closest to the sun?",
                "options": ["A) Mercury", "B) Earth"],
                "correctAnswer": "A) Mercury"
            }
        ]
    }"#;

    #[test]
    fn generates_quiz_from_service_reply() {
        let generator = QuizGenerator::new(CannedTransport::replying(PLANETS), config());

        let quiz = block_on(generator.generate("the solar system")).expect("quiz should generate");

        assert_eq!(quiz.title, "Planets");
        assert_eq!(quiz.description, None);
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[1].correct_answer, "A) Mercury");

        let sent = generator.transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].api_key, "test-key");
        assert!(sent[0].url.ends_with("/models/gemini-2.5-flash:generateContent"));
        let prompt = sent[0].body["contents"][0]["parts"][0]["text"]
            .as_str()
            .expect("prompt should be text");
        assert!(prompt.contains("\"the solar system\""));
        assert!(prompt.contains("5 questions"));
        assert_eq!(
            sent[0].body["generationConfig"]["responseSchema"]["required"],
            json!(["title", "questions"])
        );
    }

    #[test]
    fn refuses_to_send_without_key_or_topic() {
        let generator =
            QuizGenerator::new(CannedTransport::replying(PLANETS), GeneratorConfig::default());
        assert!(matches!(
            block_on(generator.generate("planets")),
            Err(GenerationError::MissingApiKey)
        ));

        let generator = QuizGenerator::new(CannedTransport::replying(PLANETS), config());
        assert!(matches!(
            block_on(generator.generate("   ")),
            Err(GenerationError::EmptyTopic)
        ));
        assert!(generator.transport.sent.borrow().is_empty());
    }

    #[test]
    fn transport_failure_fails_generation() {
        let generator = QuizGenerator::new(CannedTransport::failing("offline"), config());

        let error = block_on(generator.generate("planets")).expect_err("transport is down");
        assert!(matches!(error, GenerationError::Transport { ref reason } if reason == "offline"));
    }

    #[test]
    fn empty_reply_is_an_error() {
        assert!(matches!(
            extract_response_text(r#"{"candidates": []}"#),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            extract_response_text("not json"),
            Err(GenerationError::MalformedJson { .. })
        ));
    }

    #[test]
    fn rejects_malformed_or_incomplete_quizzes() {
        assert!(matches!(
            parse_generated_quiz(r#"{"title": "Planets"}"#),
            Err(GenerationError::MalformedJson { .. })
        ));
        assert!(matches!(
            parse_generated_quiz(r#"{"title": "Planets", "questions": []}"#),
            Err(GenerationError::Invalid { .. })
        ));
        assert!(matches!(
            parse_generated_quiz(
                r#"{"title": "Planets", "questions": [
                    {"text": "Largest planet?", "options": ["Mars"], "correctAnswer": "Jupiter"}
                ]}"#
            ),
            Err(GenerationError::InvalidQuestion {
                index: 1,
                source: QuestionError::AnswerNotInOptions { .. }
            })
        ));
    }

    #[test]
    fn keeps_non_empty_description() {
        let quiz = parse_generated_quiz(
            r#"{"title": "Planets", "description": "Our neighbours", "questions": [
                {"text": "Largest planet?", "options": ["Jupiter"], "correctAnswer": "Jupiter"}
            ]}"#,
        )
        .expect("quiz should parse");

        assert_eq!(quiz.description.as_deref(), Some("Our neighbours"));
    }
}
