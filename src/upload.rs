//! The upload orchestrator: drives verified attachments through the
//! idempotency gate and the remote endpoint, one attempt at a time, with
//! a durable run-log row for every decision.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::csvio::CsvError;
use crate::endpoint::{AttachRequest, AttachmentEndpoint};
use crate::model::{AttemptOutcome, IdempotencyKey, RunLogRecord, VerificationStatus};
use crate::runlog::{IdempotencyIndex, RunLogWriter};
use crate::verify::read_verification_log;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Csv(#[from] CsvError),
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UploadSummary {
    /// Mapped attachments considered this run (attempts + skips).
    pub candidates: u64,
    pub uploaded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Unmapped rows seen in the verification log; reported, never tried.
    pub unmapped: u64,
}

/// Run the upload stage over the current verification log.
///
/// Per mapped record the state machine is:
/// key already in the index ⇒ skip row (no remote call); otherwise one
/// endpoint call, classified by status code. Successes enter the index
/// before the next record is processed, so an intra-run duplicate key is
/// skipped too. Failures are logged and left for the next invocation —
/// never retried in-run. Every attempt appends exactly one run-log row,
/// synced before the loop moves on.
pub fn run_upload(
    config: &Config,
    endpoint: &mut dyn AttachmentEndpoint,
) -> Result<UploadSummary, UploadError> {
    config.ensure_log_dir()?;
    config.require_input(&config.verification_log_csv())?;

    let records = read_verification_log(&config.verification_log_csv())?;
    let mut index = IdempotencyIndex::load(&config.run_log_csv())?;

    let mut run_writer = RunLogWriter::append(&config.run_log_csv(), true)?;
    let mut err_writer = RunLogWriter::append(&config.error_log_csv(), false)?;
    let mut dup_writer = RunLogWriter::append(&config.duplicate_log_csv(), false)?;

    let mut summary = UploadSummary::default();

    for record in &records {
        match record.status {
            VerificationStatus::Unmapped => {
                summary.unmapped += 1;
                continue;
            }
            VerificationStatus::Excluded => {
                // Excluded rows live in the skip stream, not here; tolerate
                // a hand-assembled log without attempting them.
                continue;
            }
            VerificationStatus::Mapped => {}
        }
        let Some(target_entity_id) = record.target_entity_id.as_deref() else {
            // A mapped row without a target violates the verifier's
            // invariant; isolate the row rather than abort the stream.
            tracing::warn!(
                target: "ledgerbridge",
                event = "mapped_row_without_target",
                file_name = %record.attachment.file_name,
            );
            continue;
        };

        summary.candidates += 1;
        let key = IdempotencyKey::new(target_entity_id, record.attachment.file_name.clone());

        let mut row = RunLogRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            target_entity_id: target_entity_id.to_string(),
            file_name: record.attachment.file_name.clone(),
            outcome: AttemptOutcome::SkippedAlreadyUploaded,
            status_code: None,
            remote_id: None,
            error_message: None,
            duration_ms: 0,
            entity_type: record.attachment.entity_type.clone(),
            raw_legacy_id: record.attachment.raw_legacy_id.clone(),
            normalized_legacy_id: record.attachment.normalized_legacy_id.clone(),
            file_path: record.attachment.file_path.clone(),
        };

        if index.contains(&key) {
            summary.skipped += 1;
            run_writer.write(&row)?;
            dup_writer.write(&row)?;
            continue;
        }

        let response = endpoint.attach(&AttachRequest {
            entity_type: &record.attachment.entity_type,
            entity_id: target_entity_id,
            file_name: &record.attachment.file_name,
            file_path: record.attachment.file_path.as_ref(),
        });

        row.status_code = Some(response.status_code);
        row.duration_ms = response.duration_ms;
        if response.is_success() {
            summary.uploaded += 1;
            row.outcome = AttemptOutcome::Success;
            row.remote_id = response.remote_id;
            run_writer.write(&row)?;
            // Visible to the rest of this run before the next record.
            index.mark_success(key);
        } else {
            summary.failed += 1;
            row.outcome = AttemptOutcome::Failure;
            row.error_message = response.error_message;
            run_writer.write(&row)?;
            err_writer.write(&row)?;
        }
    }

    err_writer.sync()?;
    dup_writer.sync()?;

    tracing::info!(
        target: "ledgerbridge",
        event = "upload_complete",
        candidates = summary.candidates,
        uploaded = summary.uploaded,
        failed = summary.failed,
        skipped = summary.skipped,
        unmapped = summary.unmapped,
    );
    Ok(summary)
}
