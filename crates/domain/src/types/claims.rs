//! Verified claims and authenticated identities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AuthError, Result};

/// Claims extracted from a token whose signature and standard claims have
/// been checked. Produced per verification, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub subject: String,
    pub object_id: Option<String>,
    pub tenant_id: Option<String>,
    pub app_id: Option<String>,
    pub roles: Vec<String>,
    /// First non-empty of `preferred_username`, `email`, `name`, `sub`
    pub username: String,
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl VerifiedClaims {
    /// Map a decoded claims object.
    ///
    /// Fails with `InvalidToken` when `sub` is missing or empty.
    pub fn from_claims(claims: &Value) -> Result<Self> {
        let subject = non_empty_str(claims, "sub")
            .ok_or_else(|| AuthError::InvalidToken("token has no subject".into()))?;

        let username = ["preferred_username", "email", "name"]
            .iter()
            .find_map(|field| non_empty_str(claims, field))
            .unwrap_or_else(|| subject.clone());

        let roles = claims
            .get("roles")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|r| r.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let audience = match claims.get("aud") {
            Some(Value::String(aud)) => vec![aud.clone()],
            Some(Value::Array(items)) => {
                items.iter().filter_map(|a| a.as_str().map(str::to_string)).collect()
            }
            _ => Vec::new(),
        };

        Ok(Self {
            subject,
            object_id: non_empty_str(claims, "oid"),
            tenant_id: non_empty_str(claims, "tid"),
            app_id: non_empty_str(claims, "appid").or_else(|| non_empty_str(claims, "azp")),
            roles,
            username,
            issuer: non_empty_str(claims, "iss"),
            audience,
            issued_at: timestamp(claims, "iat"),
            expires_at: timestamp(claims, "exp"),
        })
    }
}

fn non_empty_str(claims: &Value, field: &str) -> Option<String> {
    claims
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn timestamp(claims: &Value, field: &str) -> Option<DateTime<Utc>> {
    claims.get(field).and_then(Value::as_i64).and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Which credential authenticated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSource {
    Bearer,
    Session,
}

/// Identity resolved from a bearer token or a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub source: AuthSource,
}
