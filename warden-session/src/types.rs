//! Session record
//!
//! The wire shape is one JSON object:
//! `{"user": {"uuid", "name", "slug", "email", "admin", "locked"}, "token", "creation", "expiration"}`
//! with RFC 3339 timestamps. The anonymous session carries empty strings.

use chrono::{DateTime, Utc};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const REDACTED: &str = "************";

/// Structural failures of a session record
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Malformed session record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Session identity is missing {field}")]
    MissingField { field: &'static str },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Session storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the stored record itself is bad, as opposed to the storage being unreachable
    pub fn is_structural(&self) -> bool {
        !matches!(self, SessionError::Storage(_))
    }
}

/// The authenticated identity a session belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "uuid")]
    pub id: String,
    pub name: String,
    pub slug: String,
    pub email: String,
    pub admin: bool,
    pub locked: bool,
}

impl Identity {
    fn anonymous() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            slug: String::new(),
            email: String::new(),
            admin: false,
            locked: true,
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        for (field, value) in [
            ("uuid", &self.id),
            ("name", &self.name),
            ("slug", &self.slug),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(SessionError::MissingField { field });
            }
        }
        if !EmailAddress::is_valid(&self.email) {
            return Err(SessionError::InvalidEmail {
                email: self.email.clone(),
            });
        }
        Ok(())
    }
}

/// One persisted login: identity, bearer token and validity window.
///
/// Mutated only by full replacement. An empty token marks the anonymous session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "user")]
    pub identity: Identity,
    pub token: String,
    #[serde(rename = "creation", with = "wire_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "expiration", with = "wire_time")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl Session {
    pub fn new(
        identity: Identity,
        token: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            token: token.into(),
            created_at: Some(created_at),
            expires_at: Some(expires_at),
        }
    }

    /// The "not logged in" sentinel
    pub fn anonymous() -> Self {
        Self {
            identity: Identity::anonymous(),
            token: String::new(),
            created_at: None,
            expires_at: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_empty()
    }

    /// A non-empty token whose expiration is at or before `now`.
    ///
    /// A missing expiration on a token-bearing session counts as expired.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_anonymous() && self.expires_at.map_or(true, |expires_at| expires_at <= now)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.identity.validate()
    }

    /// Deserialize and validate in one step
    pub fn parse(json: &str) -> Result<Self, SessionError> {
        let session: Session = serde_json::from_str(json)?;
        session.validate()?;
        Ok(session)
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Copy with the bearer token masked, safe to put in reports
    pub fn sanitized(&self) -> Self {
        let mut session = self.clone();
        if !session.token.is_empty() {
            session.token = REDACTED.to_string();
        }
        session
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field(
                "token",
                &if self.token.is_empty() { "" } else { REDACTED },
            )
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// RFC 3339 on the wire; the empty string stands for "no timestamp"
mod wire_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => {
                serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|time| Some(time.with_timezone(&Utc)))
            .map_err(de::Error::custom)
    }
}
