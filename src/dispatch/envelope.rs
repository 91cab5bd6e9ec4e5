use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Status code recorded when no response was received at all.
pub const NO_RESPONSE: u16 = 0;

/// Normalized result of one dispatched request: `{ status, ok, ...body }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub ok: bool,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

pub fn is_ok_status(status: u16) -> bool {
    (200..400).contains(&status)
}

impl ResponseEnvelope {
    /// Merge a decoded body into the envelope root.
    ///
    /// Object bodies are merged field by field; `status` and `ok` always come from
    /// the HTTP exchange. Any other body shape is kept under `data`.
    pub fn from_parts(status: u16, body: Value) -> Self {
        let mut merged = Map::new();
        match body {
            Value::Object(map) => {
                for (k, v) in map {
                    if k == "status" || k == "ok" { continue; }
                    merged.insert(k, v);
                }
            }
            Value::Null => {}
            other => { merged.insert("data".to_string(), other); }
        }
        Self { status, ok: is_ok_status(status), body: merged }
    }

    pub fn network_failure(message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(message.into()));
        Self { status: NO_RESPONSE, ok: false, body }
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.body.get(key) }

    /// Human-readable message the API attached, if any.
    pub fn message(&self) -> Option<String> {
        match self.body.get("message")? {
            Value::String(s) => Some(s.clone()),
            // validation errors come back as a list of strings
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                if parts.is_empty() { None } else { Some(parts.join("; ")) }
            }
            _ => None,
        }
    }

    /// Decode the merged body into a typed structure.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_value(Value::Object(self.body.clone()))?)
    }

    /// Decode a single field of the body.
    pub fn decode_field<T: DeserializeOwned>(&self, key: &str) -> AppResult<T> {
        let v = self.body.get(key).cloned()
            .ok_or_else(|| AppError::upstream("missing_field".to_string(), format!("response has no '{}' field", key)))?;
        Ok(serde_json::from_value(v)?)
    }

    /// Convert a failed envelope into the matching application error.
    pub fn to_error(&self) -> AppError {
        let message = self.message().unwrap_or_else(|| format!("request failed with status {}", self.status));
        match self.status {
            NO_RESPONSE => AppError::network("no_response".to_string(), message),
            400 | 422 => AppError::user("bad_request".to_string(), message),
            409 => AppError::user("conflict".to_string(), message),
            401 => AppError::auth("unauthorized".to_string(), message),
            403 => AppError::forbidden("forbidden".to_string(), message),
            404 => AppError::not_found("not_found".to_string(), message),
            _ => AppError::upstream("upstream_error".to_string(), message),
        }
    }

    pub fn into_result(self) -> AppResult<Self> {
        if self.ok { Ok(self) } else { Err(self.to_error()) }
    }
}
