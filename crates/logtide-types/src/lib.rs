//! Shared types for logtide
//!
//! This crate contains data structures used across multiple logtide crates.

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// Parse a wire level, case-insensitively. Returns `None` for anything
    /// outside the four known levels.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            _ => None,
        }
    }

    /// Level used for display, defaulting to `Info` for unknown values
    pub fn from_wire(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Error => Color::Red,
            Self::Warn => Color::Yellow,
            Self::Info => Color::Green,
            Self::Debug => Color::Cyan,
        }
    }

    /// Normalized uppercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ingested log event
#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    /// Sequence number assigned by the stream buffer
    pub id: u64,

    /// When the event was produced (receipt time if the payload had none)
    pub timestamp: DateTime<Utc>,

    /// When the frame carrying this event arrived
    pub received_at: DateTime<Utc>,

    /// Normalized level
    pub level: LogLevel,

    /// Verbatim `level` value from the payload, if it was a string
    pub raw_level: Option<String>,

    /// Message text (`message` or `content` in the payload)
    pub message: String,

    /// Every field of the decoded payload, untouched
    pub fields: Map<String, Value>,
}

impl LogEvent {
    /// Create an event with no extra payload fields
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            timestamp,
            received_at: timestamp,
            level,
            raw_level: Some(level.as_str().to_string()),
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Look up an additional payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

// ============================================================================
// Connection Types
// ============================================================================

/// Health of the active streaming session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }

    /// Get display color for this status
    pub fn color(&self) -> Color {
        match self {
            Self::Disconnected => Color::DarkGray,
            Self::Connecting => Color::Yellow,
            Self::Connected => Color::Green,
            Self::Error => Color::Red,
        }
    }

    /// Status glyph for headers
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Disconnected => "○",
            Self::Connecting => "◌",
            Self::Connected => "●",
            Self::Error => "✖",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Provider Types
// ============================================================================

/// Cloud log provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderKind {
    Aws,
    Azure,
    Gcp,
    Other(String),
}

impl ProviderKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::Other(name) => name,
        }
    }

    /// Human-friendly provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Aws => "AWS CloudWatch",
            Self::Azure => "Azure Monitor",
            Self::Gcp => "Google Cloud Logging",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ProviderKind {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Self::Aws,
            "azure" => Self::Azure,
            "gcp" => Self::Gcp,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for ProviderKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata about the connected log source.
///
/// Supplied by the provider connect exchange and passed through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderContext {
    pub provider: ProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, alias = "logGroup", skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,

    #[serde(default, alias = "workspaceId", skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,

    #[serde(default, alias = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Anything else the exchange returned
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderContext {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            region: None,
            log_group: None,
            workspace_id: None,
            project_id: None,
            extra: Map::new(),
        }
    }

    /// Source identifier shown next to the provider name
    pub fn source_label(&self) -> Option<&str> {
        self.log_group
            .as_deref()
            .or(self.workspace_id.as_deref())
            .or(self.project_id.as_deref())
    }

    /// One-line summary, e.g. "AWS CloudWatch │ us-east-1 │ /app/api"
    pub fn summary(&self) -> String {
        let mut parts = vec![self.provider.display_name().to_string()];
        if let Some(region) = &self.region {
            parts.push(region.clone());
        }
        if let Some(source) = self.source_label() {
            parts.push(source.to_string());
        }
        parts.join(" │ ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_is_case_insensitive() {
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("Warn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("fatal"), None);
        assert_eq!(LogLevel::from_wire("verbose"), LogLevel::Info);
    }

    #[test]
    fn test_provider_context_accepts_camel_case() {
        let json = r#"{"provider":"AWS","region":"us-east-1","logGroup":"/app/api","accountId":"123"}"#;
        let ctx: ProviderContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.provider, ProviderKind::Aws);
        assert_eq!(ctx.log_group.as_deref(), Some("/app/api"));
        assert_eq!(ctx.extra.get("accountId"), Some(&Value::from("123")));
        assert_eq!(ctx.summary(), "AWS CloudWatch │ us-east-1 │ /app/api");
    }

    #[test]
    fn test_unknown_provider_is_preserved() {
        let kind = ProviderKind::from("datadog");
        assert_eq!(kind, ProviderKind::Other("datadog".to_string()));
        assert_eq!(String::from(kind), "datadog");
    }
}
