//! The inference service boundary.
//!
//! [`VisionClassifier`] is the capability seam: production code talks to
//! the hosted Responses API through [`OpenAiClient`], tests substitute
//! [`MockClassifier`] so no live network dependency exists anywhere in the
//! suite. One outbound request per classification, no retry, no streaming.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedImage;
use crate::schema::{suggestion_schema, SCHEMA_NAME};
use crate::SuggestError;

/// Default endpoint of the hosted inference service.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Vision-capable model the suggestion task runs on.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Bounded output budget — the schema-constrained reply is tiny, and the
/// cap controls cost and latency.
pub const MAX_OUTPUT_TOKENS: u32 = 220;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// One classification request: instruction block, optional reference
/// swatches, and the subject selfie. Constructed fresh per call.
pub struct ClassificationRequest {
    pub instruction: String,
    /// Optional 8-swatch reference image to anchor the labels.
    ///
    /// Accepted ambiguity: the image is forwarded without validating that
    /// it actually depicts swatches; if it shows something unrelated, the
    /// outcome is left to the service's discretion.
    pub reference: Option<NormalizedImage>,
    /// The subject selfie — always the final content item on the wire.
    pub selfie: NormalizedImage,
}

/// Classifier abstraction over the hosted vision model (allows mocking).
///
/// Returns the raw JSON text of the schema-constrained response; parsing
/// and validation happen in the caller.
pub trait VisionClassifier: Send + Sync {
    fn classify(&self, request: &ClassificationRequest) -> Result<String, SuggestError>;
}

// ──────────────────────────────────────────────
// Wire types (Responses API)
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    max_output_tokens: u32,
    text: TextOptions<'a>,
}

#[derive(Serialize)]
struct InputMessage<'a> {
    role: &'a str,
    content: Vec<ContentItem>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentItem {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Serialize)]
struct TextOptions<'a> {
    format: OutputFormat<'a>,
}

#[derive(Serialize)]
struct OutputFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
    schema: serde_json::Value,
    strict: bool,
}

/// Response envelope. Only the output text is of interest; everything else
/// the service includes is ignored.
#[derive(Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Concatenate the `output_text` items of a reply.
fn extract_output_text(reply: &ResponsesReply) -> Result<String, SuggestError> {
    let mut text = String::new();
    for item in &reply.output {
        if item.kind != "message" {
            continue;
        }
        for content in &item.content {
            if content.kind == "output_text" {
                text.push_str(&content.text);
            }
        }
    }

    if text.is_empty() {
        return Err(SuggestError::ResponseParsing(
            "response contained no output_text".into(),
        ));
    }
    Ok(text)
}

// ──────────────────────────────────────────────
// OpenAiClient
// ──────────────────────────────────────────────

/// Blocking HTTP client for the hosted Responses API.
#[derive(Debug)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, model: &str, api_key: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        }
    }

    /// Default client with the key resolved from `host` then `env`.
    ///
    /// Fails fast with [`SuggestError::MissingCredential`] before any
    /// network activity when neither source holds a key.
    pub fn from_secrets(
        host: &dyn crate::credentials::SecretSource,
        env: &dyn crate::credentials::SecretSource,
    ) -> Result<Self, SuggestError> {
        let api_key = crate::credentials::resolve_api_key(host, env)?;
        Ok(Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL, api_key))
    }

    /// Assemble the request body: instruction text, then the reference
    /// image if present, then the selfie — always last.
    fn build_body<'a>(&'a self, request: &ClassificationRequest) -> ResponsesRequest<'a> {
        let mut content = vec![ContentItem::InputText {
            text: request.instruction.clone(),
        }];

        if let Some(reference) = &request.reference {
            content.push(ContentItem::InputImage {
                image_url: reference.to_data_url(),
            });
        }

        content.push(ContentItem::InputImage {
            image_url: request.selfie.to_data_url(),
        });

        ResponsesRequest {
            model: &self.model,
            input: vec![InputMessage {
                role: "user",
                content,
            }],
            max_output_tokens: MAX_OUTPUT_TOKENS,
            text: TextOptions {
                format: OutputFormat {
                    kind: "json_schema",
                    name: SCHEMA_NAME,
                    schema: suggestion_schema(),
                    strict: true,
                },
            },
        }
    }
}

impl VisionClassifier for OpenAiClient {
    fn classify(&self, request: &ClassificationRequest) -> Result<String, SuggestError> {
        let _span = tracing::info_span!(
            "classify_tone",
            model = %self.model,
            selfie_size = request.selfie.jpeg_bytes.len(),
            has_reference = request.reference.is_some(),
        )
        .entered();

        let url = format!("{}/responses", self.base_url);
        let body = self.build_body(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    SuggestError::ServiceUnreachable(self.base_url.clone())
                } else if e.is_timeout() {
                    SuggestError::Http(format!(
                        "Request timed out after {REQUEST_TIMEOUT_SECS}s"
                    ))
                } else {
                    SuggestError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SuggestError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ResponsesReply = response
            .json()
            .map_err(|e| SuggestError::ResponseParsing(e.to_string()))?;

        extract_output_text(&reply)
    }
}

// ──────────────────────────────────────────────
// MockClassifier (testing)
// ──────────────────────────────────────────────

/// Mock classifier — returns a configurable raw response and counts calls,
/// so memoization and fail-fast properties are observable in tests.
pub struct MockClassifier {
    response: String,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A classifier that always fails with an HTTP-layer error.
    pub fn failing(message: &str) -> Self {
        Self {
            response: String::new(),
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `classify` has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionClassifier for MockClassifier {
    fn classify(&self, _request: &ClassificationRequest) -> Result<String, SuggestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(SuggestError::Http(message.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_image(tag: u8) -> NormalizedImage {
        NormalizedImage {
            jpeg_bytes: vec![tag; 16],
            width: 4,
            height: 4,
        }
    }

    fn request_with_reference() -> ClassificationRequest {
        ClassificationRequest {
            instruction: "pick a tone".into(),
            reference: Some(fake_image(1)),
            selfie: fake_image(2),
        }
    }

    // ── OpenAiClient construction ──

    #[test]
    fn client_trims_trailing_slash() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", DEFAULT_MODEL, "sk".into());
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn from_secrets_without_key_fails_fast() {
        let empty = crate::credentials::StaticSecrets::empty();
        let err = OpenAiClient::from_secrets(&empty, &empty).unwrap_err();
        assert!(matches!(err, SuggestError::MissingCredential), "{err}");
    }

    // ── Request body shape ──

    #[test]
    fn body_places_selfie_last() {
        let client = OpenAiClient::new(DEFAULT_BASE_URL, DEFAULT_MODEL, "sk".into());
        let request = request_with_reference();
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        let content = body["input"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["type"], "input_text");
        assert_eq!(content[1]["type"], "input_image");
        assert_eq!(content[2]["type"], "input_image");
        assert_eq!(
            content[2]["image_url"],
            serde_json::Value::String(request.selfie.to_data_url())
        );
    }

    #[test]
    fn body_without_reference_has_two_items() {
        let client = OpenAiClient::new(DEFAULT_BASE_URL, DEFAULT_MODEL, "sk".into());
        let request = ClassificationRequest {
            instruction: "pick a tone".into(),
            reference: None,
            selfie: fake_image(2),
        };
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        let content = body["input"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "input_text");
        assert_eq!(content[1]["type"], "input_image");
    }

    #[test]
    fn body_declares_strict_schema_and_token_cap() {
        let client = OpenAiClient::new(DEFAULT_BASE_URL, DEFAULT_MODEL, "sk".into());
        let body = serde_json::to_value(client.build_body(&request_with_reference())).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_output_tokens"], MAX_OUTPUT_TOKENS);
        assert_eq!(body["input"][0]["role"], "user");

        let format = &body["text"]["format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["name"], SCHEMA_NAME);
        assert_eq!(format["strict"], serde_json::Value::Bool(true));
        assert_eq!(
            format["schema"]["additionalProperties"],
            serde_json::Value::Bool(false)
        );
    }

    // ── Response envelope ──

    #[test]
    fn extract_concatenates_output_text() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{"id":"resp_1","output":[
                {"type":"reasoning","content":[]},
                {"type":"message","content":[
                    {"type":"output_text","text":"{\"skin_tone\":"},
                    {"type":"output_text","text":"\"TAN\"}"}
                ]}
            ]}"#,
        )
        .unwrap();

        let text = extract_output_text(&reply).unwrap();
        assert_eq!(text, r#"{"skin_tone":"TAN"}"#);
    }

    #[test]
    fn extract_ignores_non_text_content() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{"output":[{"type":"message","content":[
                {"type":"refusal","refusal":"no"},
                {"type":"output_text","text":"ok"}
            ]}]}"#,
        )
        .unwrap();

        assert_eq!(extract_output_text(&reply).unwrap(), "ok");
    }

    #[test]
    fn empty_output_is_parsing_error() {
        let reply: ResponsesReply = serde_json::from_str(r#"{"output":[]}"#).unwrap();
        let err = extract_output_text(&reply).unwrap_err();
        assert!(matches!(err, SuggestError::ResponseParsing(_)), "{err}");
    }

    // ── MockClassifier ──

    #[test]
    fn mock_returns_configured_response_and_counts() {
        let mock = MockClassifier::new("{}");
        let request = request_with_reference();
        assert_eq!(mock.classify(&request).unwrap(), "{}");
        assert_eq!(mock.classify(&request).unwrap(), "{}");
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn failing_mock_returns_http_error() {
        let mock = MockClassifier::failing("connection reset");
        let err = mock.classify(&request_with_reference()).unwrap_err();
        assert!(matches!(err, SuggestError::Http(_)), "{err}");
        assert_eq!(mock.calls(), 1);
    }
}
