//! # Callback Codec Module
//!
//! Encodes the `(action, value)` tuples carried by inline-button callback
//! data as `ACTION|VALUE`. The delimiter and the escape character are
//! percent-escaped inside either half (`%` → `%25`, `|` → `%7C`), so a value
//! that itself contains a pipe round-trips unambiguously instead of
//! corrupting the split.

/// Telegram rejects callback data longer than this many bytes.
pub const CALLBACK_DATA_MAX_BYTES: usize = 64;

const DELIMITER: char = '|';
const ESCAPE: char = '%';

/// A decoded button payload: the action tag and its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub action: String,
    pub value: String,
}

impl CallbackPayload {
    pub fn new(action: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            value: value.into(),
        }
    }
}

/// Encoding/decoding failures for callback payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Encoded form would exceed the transport's callback-data limit
    TooLong(usize),
    /// Input does not parse as `ACTION|VALUE`
    Malformed(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::TooLong(len) => write!(
                f,
                "encoded payload is {len} bytes, limit is {CALLBACK_DATA_MAX_BYTES}"
            ),
            CodecError::Malformed(msg) => write!(f, "malformed payload: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encode an action/value pair into callback data.
///
/// Fails loudly with [`CodecError::TooLong`] rather than truncating: a
/// truncated payload would decode into a different value.
pub fn encode(action: &str, value: &str) -> Result<String, CodecError> {
    if action.is_empty() {
        return Err(CodecError::Malformed("empty action".to_string()));
    }
    let data = format!("{}{}{}", escape(action), DELIMITER, escape(value));
    if data.len() > CALLBACK_DATA_MAX_BYTES {
        return Err(CodecError::TooLong(data.len()));
    }
    Ok(data)
}

/// Decode callback data into its action/value pair
pub fn decode(data: &str) -> Result<CallbackPayload, CodecError> {
    let (action, value) = data
        .split_once(DELIMITER)
        .ok_or_else(|| CodecError::Malformed("missing delimiter".to_string()))?;
    if value.contains(DELIMITER) {
        return Err(CodecError::Malformed(
            "unescaped delimiter in value".to_string(),
        ));
    }
    let action = unescape(action)?;
    if action.is_empty() {
        return Err(CodecError::Malformed("empty action".to_string()));
    }
    let value = unescape(value)?;
    Ok(CallbackPayload { action, value })
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for ch in part.chars() {
        match ch {
            ESCAPE => out.push_str("%25"),
            DELIMITER => out.push_str("%7C"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(part: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(part.len());
    let mut chars = part.chars();
    while let Some(ch) = chars.next() {
        if ch != ESCAPE {
            out.push(ch);
            continue;
        }
        let code: String = chars.by_ref().take(2).collect();
        match code.as_str() {
            "25" => out.push(ESCAPE),
            "7C" | "7c" => out.push(DELIMITER),
            other => {
                return Err(CodecError::Malformed(format!(
                    "unknown escape sequence %{other}"
                )))
            }
        }
    }
    Ok(out)
}
