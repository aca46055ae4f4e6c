use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One file discovered in the legacy attachment tree.
///
/// Produced by inventory discovery and immutable afterwards. The
/// `normalized_legacy_id` is always derived through
/// [`crate::ids::normalize_legacy_id`], never constructed by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub entity_type: String,
    pub raw_legacy_id: String,
    pub normalized_legacy_id: String,
    pub file_name: String,
    pub file_path: String,
}

/// One row of the mapping export relating a normalized legacy id to a
/// target ledger entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    pub normalized_legacy_id: String,
    pub entity_type: String,
    pub target_entity_id: String,
}

/// Classification of an attachment by the mapping verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Mapped,
    Unmapped,
    Excluded,
}

impl VerificationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Mapped => "mapped",
            VerificationStatus::Unmapped => "unmapped",
            VerificationStatus::Excluded => "excluded",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid verification status: {value}")]
pub struct InvalidVerificationStatus {
    pub value: String,
}

impl FromStr for VerificationStatus {
    type Err = InvalidVerificationStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mapped" => Ok(VerificationStatus::Mapped),
            "unmapped" => Ok(VerificationStatus::Unmapped),
            "excluded" => Ok(VerificationStatus::Excluded),
            _ => Err(InvalidVerificationStatus {
                value: value.to_string(),
            }),
        }
    }
}

/// Verifier output: the attachment, its mapping decision, and any
/// data-quality flags picked up along the way. Created exactly once per
/// attachment and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub attachment: AttachmentRecord,
    pub target_entity_id: Option<String>,
    pub status: VerificationStatus,
    pub reason: Option<String>,
}

/// Outcome of a single upload attempt, including deliberate skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
    SkippedAlreadyUploaded,
}

impl AttemptOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
            AttemptOutcome::SkippedAlreadyUploaded => "skipped_already_uploaded",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid attempt outcome: {value}")]
pub struct InvalidAttemptOutcome {
    pub value: String,
}

impl FromStr for AttemptOutcome {
    type Err = InvalidAttemptOutcome;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(AttemptOutcome::Success),
            "failure" => Ok(AttemptOutcome::Failure),
            "skipped_already_uploaded" => Ok(AttemptOutcome::SkippedAlreadyUploaded),
            _ => Err(InvalidAttemptOutcome {
                value: value.to_string(),
            }),
        }
    }
}

/// The unique identity of "this file attached to this entity".
///
/// Two inventory rows that agree on both halves are the same logical unit
/// of work, and a success for one settles both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub target_entity_id: String,
    pub file_name: String,
}

impl IdempotencyKey {
    pub fn new(target_entity_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            target_entity_id: target_entity_id.into(),
            file_name: file_name.into(),
        }
    }
}

/// One row of the append-only run log: a single upload attempt and its
/// outcome, plus the attachment context that makes triage possible
/// without a join back to the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogRecord {
    pub timestamp: String,
    pub target_entity_id: String,
    pub file_name: String,
    pub outcome: AttemptOutcome,
    pub status_code: Option<u16>,
    pub remote_id: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub entity_type: String,
    pub raw_legacy_id: String,
    pub normalized_legacy_id: String,
    pub file_path: String,
}

impl RunLogRecord {
    pub fn key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.target_entity_id.clone(), self.file_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            VerificationStatus::Mapped,
            VerificationStatus::Unmapped,
            VerificationStatus::Excluded,
        ] {
            assert_eq!(status.as_str().parse::<VerificationStatus>(), Ok(status));
        }
        assert!("bogus".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn outcome_round_trips_through_str() {
        for outcome in [
            AttemptOutcome::Success,
            AttemptOutcome::Failure,
            AttemptOutcome::SkippedAlreadyUploaded,
        ] {
            assert_eq!(outcome.as_str().parse::<AttemptOutcome>(), Ok(outcome));
        }
        assert!("file_missing".parse::<AttemptOutcome>().is_err());
    }
}
