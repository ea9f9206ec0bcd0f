//! Decoding of caption service response bodies.

use serde_json::{Map, Value};

use crate::{
    error::CaptionError,
    model::{AltText, CaptionResult},
};

pub const CREDENTIAL_PARAM: &str = "hugging_face_api_key";
pub const FILE_FIELD: &str = "file";
pub const DEFAULT_ENDPOINT_PATH: &str = "/api/py/generate-caption";

const ERROR_MESSAGE_FIELDS: [&str; 3] = ["message", "error", "detail"];

pub fn parse_caption_body(body: &[u8]) -> Result<CaptionResult, CaptionError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| CaptionError::Parse(err.to_string()))?;

    let alt_text = match value.get("alt_text") {
        None | Some(Value::Null) => None,
        Some(Value::Object(fields)) => Some(AltText {
            en: text_field(fields, "en"),
            ms: text_field(fields, "ms"),
        }),
        Some(Value::String(text)) => split_translated(text),
        Some(other) => {
            tracing::warn!(kind = json_kind(other), "alt_text has unexpected shape");
            Some(AltText::default())
        }
    };

    Ok(CaptionResult { alt_text })
}

/// Builds the error for a non-success status, pulling a message out of the
/// body when it is JSON.
pub fn protocol_error(status: u16, body: &[u8]) -> CaptionError {
    let message = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        ERROR_MESSAGE_FIELDS.iter().find_map(|field| {
            value
                .get(*field)
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        })
    });
    CaptionError::Protocol { status, message }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

// The deployed backend joins the Malay translation and the English caption
// with a newline into a single string.
fn split_translated(text: &str) -> Option<AltText> {
    if text.trim().is_empty() {
        return None;
    }
    let alt = match text.split_once('\n') {
        Some((ms, en)) => AltText {
            en: Some(en.trim().to_string()),
            ms: Some(ms.trim().to_string()),
        },
        None => AltText {
            en: Some(text.trim().to_string()),
            ms: None,
        },
    };
    Some(alt)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
