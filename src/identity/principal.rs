use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::role::RoleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Identity record as returned by the records API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(rename = "role", default)]
    pub roles: RoleSet,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            id: id.into(),
            full_name: String::new(),
            email: email.into(),
            avatar: None,
            roles,
            gender: None,
            created_at: None,
            updated_at: None,
        }
    }
}

// The API is inconsistent about numeric vs string ids.
fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid user id: {}", other))),
    }
}
