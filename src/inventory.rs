//! Attachment inventory discovery: walk the legacy file tree and emit one
//! inventory row per file. The expected layout is
//! `<files_dir>/<entity_type>/<raw_legacy_id>/<file_name>`.

use std::path::Path;

use walkdir::WalkDir;

use crate::csvio::{CsvError, CsvWriter};
use crate::ids::normalize_legacy_id;
use crate::model::AttachmentRecord;

pub const INVENTORY_HEADERS: [&str; 5] = [
    "entity_type",
    "raw_legacy_id",
    "normalized_legacy_id",
    "file_name",
    "file_path",
];

/// Seed a tiny synthetic legacy tree when the files root is empty, so the
/// demo pipeline is runnable on a fresh checkout. Mirrors the ids used by
/// the sample mapping export; "80MISSING" is intentionally unmapped there.
pub fn ensure_sample_tree(files_dir: &Path) -> std::io::Result<()> {
    let has_files = files_dir.is_dir()
        && WalkDir::new(files_dir)
            .into_iter()
            .filter_map(Result::ok)
            .any(|e| e.file_type().is_file());
    if has_files {
        return Ok(());
    }

    let sample = [
        ("Bill", "80ABC123", "invoice_ABC123.txt"),
        ("Bill", "80DEF456", "invoice_DEF456.txt"),
        ("Bill", "80MISSING", "invoice_MISSING.txt"),
    ];
    for (entity_type, raw_id, file_name) in sample {
        let dir = files_dir.join(entity_type).join(raw_id);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        if !path.exists() {
            std::fs::write(&path, format!("Synthetic attachment for {entity_type} {raw_id}\n"))?;
        }
    }
    tracing::info!(
        target: "ledgerbridge",
        event = "sample_tree_seeded",
        files_dir = %files_dir.display(),
    );
    Ok(())
}

/// Walk the files root and collect attachment records in a stable
/// (path-sorted) order. Files outside the expected three-level layout are
/// skipped with a warning rather than guessed at.
pub fn discover_attachments(files_dir: &Path) -> Vec<AttachmentRecord> {
    let mut records = Vec::new();
    for entry in WalkDir::new(files_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(files_dir) else {
            continue;
        };
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.len() < 3 {
            tracing::warn!(
                target: "ledgerbridge",
                event = "inventory_unexpected_layout",
                path = %entry.path().display(),
            );
            continue;
        }
        let entity_type = parts[0].clone();
        let raw_legacy_id = parts[1].clone();
        let file_name = parts[parts.len() - 1].clone();
        records.push(AttachmentRecord {
            normalized_legacy_id: normalize_legacy_id(&raw_legacy_id),
            entity_type,
            raw_legacy_id,
            file_name,
            file_path: entry.path().display().to_string(),
        });
    }
    records
}

/// Write the inventory CSV from a freshly discovered record set.
pub fn write_inventory(path: &Path, records: &[AttachmentRecord]) -> Result<(), CsvError> {
    let mut writer = CsvWriter::create(path, &INVENTORY_HEADERS)?;
    for record in records {
        writer.write_row(&[
            &record.entity_type,
            &record.raw_legacy_id,
            &record.normalized_legacy_id,
            &record.file_name,
            &record.file_path,
        ])?;
    }
    writer.sync()
}
