use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::analyze::AnalysisError;
use crate::fetch::FetchedImage;

// ── Constants ────────────────────────────────────────────────────────────────

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// ── Request wire format ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Handle on the Gemini generateContent endpoint. Built once at startup and
/// shared read-only across requests.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint, for proxies and tests.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Send `prompt` and the image to the model and return the raw text of
    /// the first candidate.
    pub async fn generate_content(
        &self,
        prompt: &str,
        image: &FetchedImage,
    ) -> Result<String, AnalysisError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(prompt.to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: image.mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                        }),
                    },
                ],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("Model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Upstream(format!(
                "Model API returned status {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("Undecodable model response: {}", e)))?;

        candidate_text(&body)
            .ok_or_else(|| AnalysisError::Upstream("Model response contained no text".to_string()))
    }
}

// ── Response parsing ─────────────────────────────────────────────────────────

/// Join the text parts of the first candidate: candidates[0].content.parts[].text.
fn candidate_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut out = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
    }

    if out.trim().is_empty() {
        None
    } else {
        Some(out)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is the analysis:"},
                        {"text": "{\"Product Name\": \"X\"}"}
                    ]
                }
            }]
        });
        assert_eq!(
            candidate_text(&body).unwrap(),
            "Here is the analysis:\n{\"Product Name\": \"X\"}"
        );
    }

    #[test]
    fn skips_non_text_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"inline_data": {"mime_type": "image/png", "data": ""}},
                        {"text": "hello"}
                    ]
                }
            }]
        });
        assert_eq!(candidate_text(&body).unwrap(), "hello");
    }

    #[test]
    fn missing_candidates_yields_none() {
        assert!(candidate_text(&json!({})).is_none());
        assert!(candidate_text(&json!({"candidates": []})).is_none());
    }

    #[test]
    fn whitespace_only_text_yields_none() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "   "}]}}]
        });
        assert!(candidate_text(&body).is_none());
    }

    #[test]
    fn request_serializes_expected_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some("describe".to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: "aGk=".to_string(),
                        }),
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0], json!({"text": "describe"}));
        assert_eq!(
            value["contents"][0]["parts"][1],
            json!({"inline_data": {"mime_type": "image/jpeg", "data": "aGk="}})
        );
    }
}
