//! Mapping verification: join the attachment inventory against the
//! mapping export and classify every attachment as mapped, unmapped or
//! excluded before anything is allowed near the upload path.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::csvio::{CsvError, CsvTable, CsvWriter};
use crate::ids::has_legacy_prefix;
use crate::mapping::MappingLookup;
use crate::model::{AttachmentRecord, VerificationRecord, VerificationStatus};

pub const VERIFICATION_HEADERS: [&str; 8] = [
    "normalized_legacy_id",
    "entity_type",
    "raw_legacy_id",
    "file_name",
    "file_path",
    "target_entity_id",
    "status",
    "reason",
];

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Csv(#[from] CsvError),
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct VerificationSummary {
    pub mapped: u64,
    pub unmapped: u64,
    pub excluded: u64,
    pub mapping_conflicts: u64,
}

/// Run the verification stage.
///
/// Every inventory row lands in exactly one of the two output streams:
/// the verification log (mapped + unmapped, everything the uploader must
/// reason about) or the skip log (excluded by configuration). No row is
/// dropped, and nothing here performs an upload.
pub fn run_verification(config: &Config) -> Result<VerificationSummary, VerifyError> {
    config.ensure_log_dir()?;
    config.require_input(&config.inventory_csv())?;
    config.require_input(&config.mapping_export_csv())?;

    let lookup = MappingLookup::load(&config.mapping_export_csv())?;
    let attachments = read_inventory(&config.inventory_csv())?;

    let mut log_writer = CsvWriter::create(&config.verification_log_csv(), &VERIFICATION_HEADERS)?;
    let mut skip_writer =
        CsvWriter::create(&config.verification_skips_csv(), &VERIFICATION_HEADERS)?;

    let mut summary = VerificationSummary {
        mapping_conflicts: lookup.conflicts.len() as u64,
        ..VerificationSummary::default()
    };

    for attachment in attachments {
        let record = classify(attachment, &lookup, config);
        match record.status {
            VerificationStatus::Excluded => {
                summary.excluded += 1;
                write_verification_row(&mut skip_writer, &record)?;
            }
            VerificationStatus::Mapped => {
                summary.mapped += 1;
                write_verification_row(&mut log_writer, &record)?;
            }
            VerificationStatus::Unmapped => {
                summary.unmapped += 1;
                write_verification_row(&mut log_writer, &record)?;
            }
        }
    }

    log_writer.sync()?;
    skip_writer.sync()?;

    tracing::info!(
        target: "ledgerbridge",
        event = "verification_complete",
        mapped = summary.mapped,
        unmapped = summary.unmapped,
        excluded = summary.excluded,
        mapping_conflicts = summary.mapping_conflicts,
    );
    Ok(summary)
}

/// Classify one attachment against the mapping lookup and the excluded
/// type set. Pure apart from the record it returns; flags are additive
/// and never change the status itself.
fn classify(
    attachment: AttachmentRecord,
    lookup: &MappingLookup,
    config: &Config,
) -> VerificationRecord {
    let mut reasons: Vec<&str> = Vec::new();
    if !has_legacy_prefix(&attachment.raw_legacy_id) {
        reasons.push("raw id missing legacy prefix");
    }

    let (status, target_entity_id) = if config.excluded_types.contains(&attachment.entity_type) {
        reasons.push("entity type excluded by configuration");
        (VerificationStatus::Excluded, None)
    } else if let Some(target) =
        lookup.target_for(&attachment.normalized_legacy_id, &attachment.entity_type)
    {
        if lookup.is_conflicted(&attachment.normalized_legacy_id, &attachment.entity_type) {
            reasons.push("conflicting mapping entries (first match used)");
        }
        (VerificationStatus::Mapped, Some(target.to_string()))
    } else {
        reasons.push("no mapping for (normalized_legacy_id, entity_type)");
        (VerificationStatus::Unmapped, None)
    };

    let reason = if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    };
    VerificationRecord {
        attachment,
        target_entity_id,
        status,
        reason,
    }
}

fn write_verification_row(
    writer: &mut CsvWriter,
    record: &VerificationRecord,
) -> Result<(), CsvError> {
    writer.write_row(&[
        &record.attachment.normalized_legacy_id,
        &record.attachment.entity_type,
        &record.attachment.raw_legacy_id,
        &record.attachment.file_name,
        &record.attachment.file_path,
        record.target_entity_id.as_deref().unwrap_or(""),
        record.status.as_str(),
        record.reason.as_deref().unwrap_or(""),
    ])
}

/// Read the inventory CSV back into attachment records, preserving file
/// order so downstream processing stays deterministic.
pub fn read_inventory(path: &Path) -> Result<Vec<AttachmentRecord>, CsvError> {
    let table = CsvTable::read(path)?;
    let type_col = table.column("entity_type")?;
    let raw_col = table.column("raw_legacy_id")?;
    let norm_col = table.column("normalized_legacy_id")?;
    let name_col = table.column("file_name")?;
    let path_col = table.column("file_path")?;

    Ok(table
        .rows()
        .map(|row| AttachmentRecord {
            entity_type: row[type_col].clone(),
            raw_legacy_id: row[raw_col].clone(),
            normalized_legacy_id: row[norm_col].clone(),
            file_name: row[name_col].clone(),
            file_path: row[path_col].clone(),
        })
        .collect())
}

/// Read a verification log back into records, e.g. for the uploader.
pub fn read_verification_log(path: &Path) -> Result<Vec<VerificationRecord>, CsvError> {
    let table = CsvTable::read(path)?;
    let norm_col = table.column("normalized_legacy_id")?;
    let type_col = table.column("entity_type")?;
    let raw_col = table.column("raw_legacy_id")?;
    let name_col = table.column("file_name")?;
    let path_col = table.column("file_path")?;
    let target_col = table.column("target_entity_id")?;
    let status_col = table.column("status")?;
    let reason_col = table.column("reason")?;

    let mut records = Vec::new();
    for row in table.rows() {
        let status = match row[status_col].parse::<VerificationStatus>() {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(
                    target: "ledgerbridge",
                    event = "verification_row_skipped",
                    path = %path.display(),
                    error = %err,
                );
                continue;
            }
        };
        let target = &row[target_col];
        let reason = &row[reason_col];
        records.push(VerificationRecord {
            attachment: AttachmentRecord {
                normalized_legacy_id: row[norm_col].clone(),
                entity_type: row[type_col].clone(),
                raw_legacy_id: row[raw_col].clone(),
                file_name: row[name_col].clone(),
                file_path: row[path_col].clone(),
            },
            target_entity_id: (!target.is_empty()).then(|| target.clone()),
            status,
            reason: (!reason.is_empty()).then(|| reason.clone()),
        });
    }
    Ok(records)
}
