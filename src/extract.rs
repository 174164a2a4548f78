use serde_json::{Map, Value};

use crate::analyze::AnalysisError;

// ── JSON extraction ──────────────────────────────────────────────────────────

/// Locate and parse the single JSON object embedded in a free-text model
/// response.
///
/// The span runs from the first `{` to the last `}` inclusive, so prose
/// before and after the object is tolerated. If the model emits more than
/// one independent JSON object the combined span will not parse and the
/// response is rejected; callers that need multiple objects must request a
/// stricter output format from the model instead.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, AnalysisError> {
    let text = text.trim();

    let start = text.find('{').ok_or(AnalysisError::MalformedModelResponse)?;
    let end = text.rfind('}').ok_or(AnalysisError::MalformedModelResponse)?;
    if end < start {
        return Err(AnalysisError::MalformedModelResponse);
    }

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|_| AnalysisError::MalformedModelResponse)?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AnalysisError::MalformedModelResponse),
    }
}

// ── brand_id merge ───────────────────────────────────────────────────────────

/// Insert `brand_id` into the extracted mapping, overwriting any key of the
/// same name produced by the model. A missing or zero id is left out.
pub fn merge_brand_id(details: &mut Map<String, Value>, brand_id: Option<i64>) {
    if let Some(id) = brand_id {
        if id != 0 {
            details.insert("brand_id".to_string(), Value::from(id));
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
