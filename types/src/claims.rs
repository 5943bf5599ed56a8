use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

pub const SUBJECT: &str = "sub";
pub const ISSUER: &str = "iss";
pub const AUDIENCE: &str = "aud";
pub const ISSUED_AT: &str = "iat";
pub const EXPIRES_AT: &str = "exp";
pub const NOT_BEFORE: &str = "nbf";
pub const NONCE: &str = "nonce";
pub const JWT_ID: &str = "jti";

/// Claim set of an identity token.
///
/// Backed by a sorted JSON object, so two equal claim sets always serialize to
/// the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claim<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn with_subject<S: Into<String>>(self, subject: S) -> Self {
        self.with_claim(SUBJECT, subject.into())
    }

    pub fn with_issuer<S: Into<String>>(self, issuer: S) -> Self {
        self.with_claim(ISSUER, issuer.into())
    }

    pub fn with_nonce<S: Into<String>>(self, nonce: S) -> Self {
        self.with_claim(NONCE, nonce.into())
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_claim(SUBJECT)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.str_claim(ISSUER)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.str_claim(NONCE)
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.str_claim(JWT_ID)
    }

    /// `aud` may be a single string or an array of strings.
    pub fn audience(&self) -> Vec<&str> {
        match self.0.get(AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn issued_at(&self) -> Option<OffsetDateTime> {
        self.time_claim(ISSUED_AT)
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.time_claim(EXPIRES_AT)
    }

    pub fn not_before(&self) -> Option<OffsetDateTime> {
        self.time_claim(NOT_BEFORE)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    fn time_claim(&self, name: &str) -> Option<OffsetDateTime> {
        let seconds = self.0.get(name).and_then(Value::as_u64)?;
        OffsetDateTime::from_unix_timestamp(i64::try_from(seconds).ok()?).ok()
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Claims(map)
    }
}

/// Converts an instant to a JWT NumericDate, dropping sub-second precision.
pub fn numeric_date(instant: OffsetDateTime) -> SystemTime {
    let seconds = instant.unix_timestamp().max(0) as u64;
    UNIX_EPOCH + Duration::from_secs(seconds)
}
