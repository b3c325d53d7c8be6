use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};

/// Reported when a submission has no attachment eligible for content
/// retrieval. Produced locally, never by the scoring service.
pub const NO_ANSWER_REASON: &str = "No answer submitted or Wrong file format";

const SYSTEM_INSTRUCTION: &str = "You are an assistant helping teacher score assignment according to requirements. Score is 0-100. Keep reason simple.";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const GENERATE_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The grading context sent to the scoring service, serialized as a single
/// JSON text payload.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest<'a> {
    pub title: &'a str,
    pub requirements: &'a str,
    pub answer: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: u8,
    pub reason: String,
}

/// How a submission's score came to be: either the service was consulted, or
/// the submission had no eligible answer and the fixed fallback applies. The
/// two are kept distinct so a service failure can never be mistaken for the
/// no-answer case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreOutcome {
    NoEligibleAnswer,
    Scored(ScoreResponse),
}

impl ScoreOutcome {
    pub fn into_response(self) -> ScoreResponse {
        match self {
            Self::NoEligibleAnswer => ScoreResponse {
                score: 0,
                reason: NO_ANSWER_REASON.to_owned(),
            },
            Self::Scored(response) => response,
        }
    }
}

/// External scoring service: takes the grading context, returns a 0-100
/// score with a short justification.
#[async_trait]
pub trait ScoreService: Send + Sync {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<ScoreResponse>;
}

#[async_trait]
impl<S: ScoreService + ?Sized> ScoreService for std::sync::Arc<S> {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<ScoreResponse> {
        (**self).score(request).await
    }
}

/// Scoring client backed by Gemini structured generation. The API key is
/// injected at construction; nothing is read from the process environment
/// here.
#[derive(Debug, Clone)]
pub struct GeminiScorer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiScorer {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Self::with_model(api_key, DEFAULT_MODEL.to_owned())
    }

    pub fn with_model(api_key: String, model: String) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn request_body(payload: &str) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": payload }] }],
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "score": { "type": "INTEGER" },
                        "reason": { "type": "STRING" },
                    },
                    "required": ["score", "reason"],
                },
            },
        })
    }

    fn decode(body: GenerateContentResponse) -> Result<ScoreResponse> {
        let part = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .ok_or_else(|| Error::Scoring {
                detail: "response carried no candidate text".to_owned(),
            })?;

        let response: ScoreResponse =
            serde_json::from_str(&part.text).map_err(|err| Error::Scoring {
                detail: format!("candidate text does not conform to the score schema: {err}"),
            })?;

        if response.score > 100 {
            return Err(Error::Scoring {
                detail: format!("score {} is out of the 0-100 range", response.score),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ScoreService for GeminiScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<ScoreResponse> {
        let payload = serde_json::to_string(request).map_err(|err| Error::Scoring {
            detail: format!("could not serialize grading context: {err}"),
        })?;

        debug!(model = %self.model, title = request.title, "requesting score");

        let url = format!("{GENERATE_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(&payload))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| Error::Scoring {
                detail: format!("request failed: {err}"),
            })?;

        let body: GenerateContentResponse = response.json().await.map_err(|err| Error::Scoring {
            detail: format!("could not decode response body: {err}"),
        })?;

        Self::decode(body)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}
