// src/client/response.rs
//! Tagged interpretation of SOLIDserver REST replies.
//!
//! The backend answers with a JSON array whose first element carries either
//! the requested fields or an `errmsg`. That convention is decided once
//! here, so call sites match on [`ApiReply`] instead of re-checking status
//! codes and optional fields.

use serde_json::{Map, Value};

use crate::config::constants::{ERRMSG_FIELD, ERRNO_FIELD, RET_OID_FIELD};
use crate::types::{IpamError, ObjectKind, Result};

/// One object of a reply body
pub type Record = Map<String, Value>;

/// Structured domain-level failure reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    pub errno: Option<String>,
    pub message: String,
}

/// Reply of a single REST call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    /// 200/201 with at least one object
    Records { status: u16, records: Vec<Record> },
    /// 204, an empty body, or 404 without objects
    Empty { status: u16 },
    /// Any other status, or an `errmsg` in the first object
    Failure(ApiFailure),
}

impl ApiReply {
    /// Classify a raw status and body
    pub fn from_parts(status: u16, body: &str) -> Result<Self> {
        let success = status == 200 || status == 201;

        let records = match parse_records(body) {
            Ok(records) => records,
            Err(e) if success => return Err(IpamError::Json(e)),
            Err(_) => {
                return Ok(ApiReply::Failure(ApiFailure {
                    status,
                    errno: None,
                    message: truncate(body.trim(), 200),
                }))
            }
        };

        if let Some(first) = records.first() {
            if let Some(message) = text_field(first, ERRMSG_FIELD) {
                return Ok(ApiReply::Failure(ApiFailure {
                    status,
                    errno: text_field(first, ERRNO_FIELD),
                    message,
                }));
            }
        }

        if records.is_empty() {
            return Ok(match status {
                200 | 201 | 204 | 404 => ApiReply::Empty { status },
                _ => ApiReply::Failure(ApiFailure {
                    status,
                    errno: None,
                    message: format!("unexpected HTTP status {}", status),
                }),
            });
        }

        if success {
            Ok(ApiReply::Records { status, records })
        } else {
            Ok(ApiReply::Failure(ApiFailure {
                status,
                errno: None,
                message: format!("unexpected HTTP status {}", status),
            }))
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiReply::Records { status, .. } | ApiReply::Empty { status } => *status,
            ApiReply::Failure(failure) => failure.status,
        }
    }

    /// Returned objects; `NotFound` when there are none
    pub fn into_records(self, kind: ObjectKind, name: &str) -> Result<Vec<Record>> {
        match self {
            ApiReply::Records { records, .. } => Ok(records),
            ApiReply::Empty { .. } => Err(IpamError::not_found(kind, name)),
            ApiReply::Failure(failure) => Err(failure.into_error(kind, name)),
        }
    }

    /// First returned object; `NotFound` when there is none
    pub fn into_first(self, kind: ObjectKind, name: &str) -> Result<Record> {
        self.into_records(kind, name)?
            .into_iter()
            .next()
            .ok_or_else(|| IpamError::not_found(kind, name))
    }

    /// Identifier of the object a write call created or modified
    pub fn created_oid(&self) -> Option<String> {
        match self {
            ApiReply::Records { records, .. } => records.first().and_then(|r| text_field(r, RET_OID_FIELD)),
            _ => None,
        }
    }
}

impl ApiFailure {
    pub fn into_error(self, kind: ObjectKind, name: &str) -> IpamError {
        IpamError::backend(self.status, format!("{} {}: {}", kind, name, self.message))
    }
}

fn parse_records(body: &str) -> std::result::Result<Vec<Record>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        Value::Object(map) => Ok(vec![map]),
        _ => Ok(Vec::new()),
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// String value of a field; numbers and booleans are rendered as text
pub fn text_field(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

/// Required string field of a record
pub fn required_field(record: &Record, key: &str) -> Result<String> {
    text_field(record, key).ok_or_else(|| {
        IpamError::backend(200, format!("reply is missing the '{}' field", key))
    })
}
