use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use logtide_types::{LogEvent, LogLevel};

/// Why an inbound frame could not become a log event
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("frame is JSON but not an object")]
    NotAnObject,

    #[error("frame has neither a `message` nor a `content` field")]
    MissingMessage,
}

/// Turns inbound text frames into log events
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode one frame. `received_at` is used when the payload carries no
    /// usable timestamp.
    pub fn decode(frame: &str, received_at: DateTime<Utc>) -> Result<LogEvent, DecodeError> {
        let value: Value = serde_json::from_str(frame.trim())?;
        let Value::Object(fields) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let message = Self::extract_message(&fields).ok_or(DecodeError::MissingMessage)?;

        let raw_level = match fields.get("level") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        let level = raw_level
            .as_deref()
            .map(LogLevel::from_wire)
            .unwrap_or_default();

        let timestamp = fields
            .get("timestamp")
            .and_then(Self::parse_timestamp)
            .unwrap_or(received_at);

        Ok(LogEvent {
            id: 0,
            timestamp,
            received_at,
            level,
            raw_level,
            message,
            fields,
        })
    }

    /// First present of `message` then `content`
    fn extract_message(fields: &Map<String, Value>) -> Option<String> {
        ["message", "content"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }

    /// RFC 3339 strings or epoch milliseconds
    fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        }
    }
}
