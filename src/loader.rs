//! Chat export loader.
//!
//! Reads a Telegram-style `result.json` export: a top-level object with a
//! chat `name` and a `messages` array. Only the timestamp matters for
//! analysis; records with a missing or unparseable date are skipped, since
//! partial data is normal in real-world exports.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A parsed chat export file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatExport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A single message record from the export. Only the timestamp is read
/// here; the conversion pipeline consumes the rest of the record and serde
/// skips those fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub date: Option<String>,
}

impl Message {
    /// Calendar date of the message, or `None` for malformed timestamps.
    ///
    /// Accepts RFC 3339 (`2024-01-05T12:34:56+00:00`) and the bare local
    /// form Telegram writes (`2024-01-05T12:34:56`).
    pub fn naive_date(&self) -> Option<NaiveDate> {
        let raw = self.date.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|dt| dt.date())
    }
}

#[cfg(test)]
impl Message {
    /// Test helper: a message with only a timestamp.
    pub fn at(date: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            ..Self::default()
        }
    }
}

/// Load and parse a chat export file.
///
/// File-level failures (missing file, invalid JSON shape) are errors;
/// per-record problems are not.
pub fn load_export(path: &Path) -> Result<ChatExport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading chat export {}", path.display()))?;
    let export: ChatExport = serde_json::from_str(&raw)
        .with_context(|| format!("parsing chat export {}", path.display()))?;
    tracing::debug!(messages = export.messages.len(), "loaded chat export");
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let json = r#"{
            "name": "Work chat",
            "messages": [
                {"id": 1, "date": "2024-01-05T12:34:56", "from": "alice", "text": "hi"},
                {"id": 2, "date": "2024-01-06T08:00:00+00:00", "from": "bob", "text": ["run ", {"type": "code", "text": "make"}]}
            ]
        }"#;
        let export: ChatExport = serde_json::from_str(json).unwrap();
        assert_eq!(export.name.as_deref(), Some("Work chat"));
        assert_eq!(export.messages.len(), 2);
        assert!(export.messages.iter().all(|m| m.naive_date().is_some()));
    }

    #[test]
    fn test_naive_date_formats() {
        let bare = Message::at("2024-03-09T23:59:59");
        assert_eq!(
            bare.naive_date(),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );

        let rfc = Message::at("2024-03-09T23:59:59.123+02:00");
        assert_eq!(rfc.naive_date(), NaiveDate::from_ymd_opt(2024, 3, 9));
    }

    #[test]
    fn test_malformed_date_is_none() {
        assert!(Message::at("not a date").naive_date().is_none());
        assert!(Message::at("2024-13-40T00:00:00").naive_date().is_none());
        assert!(Message::default().naive_date().is_none());
    }
}
