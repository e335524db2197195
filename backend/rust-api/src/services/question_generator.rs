use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::metrics::QUESTION_GENERATION_TOTAL;
use crate::models::Question;

/// Instruction block sent ahead of the lecture material on every generation
/// call. The output contract (exactly 3 questions, options A-D, one correct
/// answer, JSON only) is what the parser and validator downstream rely on.
const MCQ_SYSTEM_PROMPT: &str = r#"You are a highly qualified MCQ generator for an engineering college lecture. Your task is to create exactly 3 multiple-choice questions (MCQs) based strictly on the list of topics provided from a lecture. These MCQs serve as exit ticket questions to assess students' understanding of core concepts.

Instructions:
- Only use concepts that were explicitly covered in the given topic list
- Do not include or infer content beyond the provided topics
- Focus on the most essential technical points, definitions, principles, or equations
- Each question must have one correct answer and three plausible distractors
- The correct answer must be factually accurate
- Write short, clear, and professional questions and answer choices
- Use standard engineering terminology and units
- Keep all technical details precise and concise
- You must strictly follow any additional instructions provided by the user below.
- The explanation for each question should be clear, educational, and consist of 2-5 sentences.

Output Format (JSON):
{
  "questions": [
    {
      "question": "Question text here?",
      "options": {
        "A": "Option A text",
        "B": "Option B text",
        "C": "Option C text",
        "D": "Option D text"
      },
      "correct_answer": "C",
      "explanation": "Brief explanation of why this answer is correct (2-5 sentences)"
    }
  ]
}

Requirements:
- Return ONLY valid JSON format
- Ensure all questions are relevant to the provided topics
- Make explanations educational and clear (2-5 sentences)
- Use engineering-appropriate language and precision"#;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("could not reach the generation API: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("generation API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("generation API returned an unexpected response shape: {0}")]
    InvalidEnvelope(serde_json::Error),
    #[error("generation API returned no text content")]
    NoContent,
    #[error("model returned malformed JSON: {source}")]
    MalformedJson {
        /// Full model output, surfaced to faculty as a debugging aid.
        raw: String,
        source: serde_json::Error,
    },
    #[error("model response has no {0:?} field")]
    MissingKey(&'static str),
}

/// Client for the Gemini `generateContent` endpoint.
///
/// One call per ticket, no retry and no caching. No request timeout is set
/// either; a slow call simply blocks the faculty action that triggered it.
pub struct QuestionGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl QuestionGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            api_key: config.google_api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn generate(
        &self,
        lecture_topics: &str,
        extra_instructions: &str,
    ) -> Result<Vec<Question>, GenerationError> {
        let result = self.request_questions(lecture_topics, extra_instructions).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        QUESTION_GENERATION_TOTAL
            .with_label_values(&[outcome])
            .inc();

        result
    }

    async fn request_questions(
        &self,
        lecture_topics: &str,
        extra_instructions: &str,
    ) -> Result<Vec<Question>, GenerationError> {
        let prompt = build_prompt(lecture_topics, extra_instructions);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        tracing::debug!("Requesting MCQ generation from model {}", self.model);

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Api { status, body });
        }

        let body = response.text().await?;
        let payload = decode_envelope(&body)?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::NoContent)?;

        parse_question_payload(&text)
    }
}

/// Decodes the `generateContent` envelope. A 2xx response that is not the
/// expected shape is its own failure, distinct from not reaching the API.
fn decode_envelope(body: &str) -> Result<GenerateContentResponse, GenerationError> {
    serde_json::from_str(body).map_err(GenerationError::InvalidEnvelope)
}

fn build_prompt(lecture_topics: &str, extra_instructions: &str) -> String {
    let instructions = if extra_instructions.trim().is_empty() {
        "No additional instructions provided."
    } else {
        extra_instructions
    };

    format!(
        "{MCQ_SYSTEM_PROMPT}\n\nLecture Topics:\n{lecture_topics}\n\nAdditional Instructions:\n{instructions}\n\nPlease generate exactly 3 MCQs based on the above topics and instructions.\nReturn ONLY the JSON format as specified above."
    )
}

fn parse_question_payload(text: &str) -> Result<Vec<Question>, GenerationError> {
    let value = extract_json(text)?;
    let questions = value
        .get("questions")
        .cloned()
        .ok_or(GenerationError::MissingKey("questions"))?;

    serde_json::from_value(questions).map_err(|source| GenerationError::MalformedJson {
        raw: text.to_string(),
        source,
    })
}

/// Parses the model output as JSON. The whole trimmed text is tried first;
/// only when that fails does the widest brace-delimited span get a second
/// attempt, since models occasionally wrap the JSON in prose or a code fence.
/// The span heuristic cannot distinguish two concatenated objects; that input
/// fails the second parse and is reported as malformed.
fn extract_json(text: &str) -> Result<serde_json::Value, GenerationError> {
    let trimmed = text.trim();

    let strict_error = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(GenerationError::MalformedJson {
            raw: text.to_string(),
            source: strict_error,
        });
    };
    if end < start {
        return Err(GenerationError::MalformedJson {
            raw: text.to_string(),
            source: strict_error,
        });
    }

    tracing::warn!(
        "Generation response was not pure JSON; retrying with the brace-delimited span"
    );

    serde_json::from_str(&trimmed[start..=end]).map_err(|source| GenerationError::MalformedJson {
        raw: text.to_string(),
        source,
    })
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "questions": [
            {
                "question": "What is Ohm's law?",
                "options": {"A": "V=IR", "B": "P=VI", "C": "F=ma", "D": "E=mc^2"},
                "correct_answer": "A",
                "explanation": "Ohm's law relates voltage, current and resistance."
            }
        ]
    }"#;

    #[test]
    fn strict_json_parses_without_the_fallback() {
        let questions = parse_question_payload(WELL_FORMED).expect("strict parse should succeed");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, "A");
    }

    #[test]
    fn prose_wrapped_json_parses_through_the_span_fallback() {
        let wrapped = format!("Sure! Here are your questions:\n{}\nHope this helps!", WELL_FORMED);
        let questions = parse_question_payload(&wrapped).expect("fallback parse should succeed");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "What is Ohm's law?");
    }

    #[test]
    fn missing_questions_key_is_reported() {
        let result = parse_question_payload(r#"{"items": []}"#);
        assert!(matches!(result, Err(GenerationError::MissingKey("questions"))));
    }

    #[test]
    fn garbage_output_carries_the_raw_text() {
        let result = parse_question_payload("the model refused to answer");
        match result {
            Err(GenerationError::MalformedJson { raw, .. }) => {
                assert_eq!(raw, "the model refused to answer");
            }
            other => panic!("expected MalformedJson, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn concatenated_objects_span_both_and_fail() {
        // The widest-span retry covers both objects, which is not valid JSON.
        let doubled = format!("{WELL_FORMED}{WELL_FORMED}");
        assert!(matches!(
            parse_question_payload(&doubled),
            Err(GenerationError::MalformedJson { .. })
        ));
    }

    #[test]
    fn envelope_decode_failure_is_not_reported_as_unreachable() {
        let result = decode_envelope("<!doctype html><html>gateway error</html>");
        assert!(matches!(result, Err(GenerationError::InvalidEnvelope(_))));
    }

    #[test]
    fn envelope_with_candidates_decodes() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "hi"}]}}]}"#;
        let payload = decode_envelope(body).expect("envelope should decode");
        assert_eq!(payload.candidates.len(), 1);
    }

    #[test]
    fn prompt_carries_topics_and_default_instructions() {
        let prompt = build_prompt("Thermodynamics, entropy", "  ");
        assert!(prompt.contains("Lecture Topics:\nThermodynamics, entropy"));
        assert!(prompt.contains("No additional instructions provided."));
    }

    #[test]
    fn prompt_keeps_explicit_instructions() {
        let prompt = build_prompt("Circuits", "Focus on conceptual understanding");
        assert!(prompt.contains("Additional Instructions:\nFocus on conceptual understanding"));
    }
}
