//! Typed extraction of the check-in headers and info payload.

use axum::http::HeaderMap;
use thiserror::Error;

use tally_store::ExecutionFields;

/// Device identifier header.
pub const HARDWARE_ID_HEADER: &str = "x-k9dl1ap";
/// Encoded info string header.
pub const INFO_HEADER: &str = "x-b7mt4qz";
/// Session identifier header.
pub const SESSION_ID_HEADER: &str = "x-y8vr2ws";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required header {0}")]
    MissingHeader(&'static str),
}

/// One validated check-in request. Header presence is the only validation
/// applied; the info payload itself is parsed permissively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub hardware_id: String,
    pub session_id: String,
    pub fields: ExecutionFields,
}

impl IngestRequest {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ValidationError> {
        let hardware_id = required_header(headers, HARDWARE_ID_HEADER)?;
        let info = required_header(headers, INFO_HEADER)?;
        let session_id = required_header(headers, SESSION_ID_HEADER)?;
        Ok(Self {
            hardware_id,
            session_id,
            fields: parse_info_fields(&info),
        })
    }

    /// Composite store key for this request.
    pub fn composite_key(&self) -> String {
        format!("{}-{}", self.hardware_id, self.session_id)
    }
}

fn required_header(headers: &HeaderMap, name: &'static str) -> Result<String, ValidationError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingHeader(name))
}

/// Decodes the comma-separated `key=value` info payload. Recognized short
/// codes map to the execution fields; unknown keys and malformed pairs are
/// ignored rather than rejected.
pub fn parse_info_fields(raw: &str) -> ExecutionFields {
    let mut fields = ExecutionFields::default();
    for pair in raw.split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let slot = match key.trim() {
            "A1xY" => &mut fields.origin,
            "B2zW" => &mut fields.user,
            "C3kP" => &mut fields.display_name,
            "D4mN" => &mut fields.created_timestamp,
            "G5nM" => &mut fields.game_name,
            "G6oN" => &mut fields.game_id,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }
    fields
}
