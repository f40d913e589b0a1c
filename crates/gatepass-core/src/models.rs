//! Resident-facing read models returned by the estate API.
//!
//! The server owns these records; the client only holds ephemeral copies.
//! Fields the client does not model are kept in `extra` so that payloads can
//! be handed on unmodified.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Parses the timestamp layouts the server emits: RFC 3339 and Laravel's
/// `YYYY-MM-DD HH:MM:SS` (read as UTC).
pub fn parse_server_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A timestamp that does not parse becomes `None` instead of failing the
/// whole record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_server_timestamp))
}

/// Lifecycle state of an access code, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Active,
    Expired,
    Revoked,
    /// Anything newer than this client knows about
    #[serde(untagged)]
    Other(String),
}

impl CodeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CodeStatus::Active => "active",
            CodeStatus::Expired => "expired",
            CodeStatus::Revoked => "revoked",
            CodeStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time left before a code expires, pre-computed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remaining {
    pub value: f64,
    pub unit: String,
}

/// A visitor access code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessCode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub code: String,
    pub visitor_name: String,
    pub status: CodeStatus,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<Remaining>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_persons: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessCode {
    /// Active and with time left. Codes without a `remaining` block are
    /// treated as already run out.
    pub fn is_active(&self) -> bool {
        self.status == CodeStatus::Active && self.remaining.as_ref().is_some_and(|r| r.value > 0.0)
    }
}

/// One entry of the dashboard activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Dashboard snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    #[serde(default)]
    pub active_codes: u64,
    #[serde(default)]
    pub monthly_visitors: u64,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// Payload returned by the server for a freshly generated code.
///
/// Only `code` and `visitor_name` are guaranteed; everything else the server
/// sends is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeData {
    pub code: String,
    pub visitor_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /access-codes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCodeRequest {
    pub visitor_name: String,
    pub visit_purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub notes: String,
    pub multiple_persons: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_count: Option<u32>,
}
