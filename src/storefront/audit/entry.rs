//! One line of the login audit log.
//!
//! Wire format (UTF-8, newline terminated, no header):
//!
//! ```text
//! 2025-04-15T10:00:00.000Z - SUCCESS - Login for email: admin@example.com
//! 2025-04-15T10:05:00.000Z - FAILED - Login attempt for email: admin@example.com
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use std::{fmt, str::FromStr};

/// Placeholder written when an attempt carries no identity at all.
pub const UNKNOWN_IDENTITY: &str = "unknown";

const FIELD_SEPARATOR: &str = " - ";
const SUCCESS_PHRASE: &str = "Login for email: ";
const FAILED_PHRASE: &str = "Login attempt for email: ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    const fn phrase(self) -> &'static str {
        match self {
            Self::Success => SUCCESS_PHRASE,
            Self::Failed => FAILED_PHRASE,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = AuditParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(AuditParseError::Outcome(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditParseError {
    #[error("missing field separator")]
    Separator,
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
    #[error("unknown outcome: {0}")]
    Outcome(String),
    #[error("missing identity field")]
    Identity,
}

/// Immutable record of one adjudicated login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    timestamp: DateTime<Utc>,
    outcome: Outcome,
    identity: String,
}

impl AuditEntry {
    /// Build an entry, normalising the identity into something that fits on a
    /// single log line.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, outcome: Outcome, identity: &str) -> Self {
        Self {
            timestamp,
            outcome,
            identity: loggable_identity(identity),
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    /// Exact comparison against a submitted identity, using the same
    /// normalisation that was applied on write.
    #[must_use]
    pub fn is_for(&self, identity: &str) -> bool {
        self.identity == loggable_identity(identity)
    }

    /// Render the entry as one newline-terminated log line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.outcome,
            self.outcome.phrase(),
            self.identity
        )
    }
}

impl FromStr for AuditEntry {
    type Err = AuditParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);

        let (timestamp, rest) = line
            .split_once(FIELD_SEPARATOR)
            .ok_or(AuditParseError::Separator)?;
        let (outcome, rest) = rest
            .split_once(FIELD_SEPARATOR)
            .ok_or(AuditParseError::Separator)?;

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| AuditParseError::Timestamp(timestamp.to_string()))?
            .with_timezone(&Utc);
        let outcome = outcome.parse::<Outcome>()?;

        // The identity runs from the phrase to the end of the line.
        let identity = rest
            .strip_prefix(FAILED_PHRASE)
            .or_else(|| rest.strip_prefix(SUCCESS_PHRASE))
            .ok_or(AuditParseError::Identity)?;

        Ok(Self {
            timestamp,
            outcome,
            identity: identity.to_string(),
        })
    }
}

fn loggable_identity(identity: &str) -> String {
    if identity.is_empty() {
        return UNKNOWN_IDENTITY.to_string();
    }
    identity.replace(['\r', '\n'], " ")
}
