//! The append-only run log and the idempotency index derived from it.
//!
//! The log is the source of truth: no mutable state survives between
//! runs. At startup the index is rebuilt by a single scan over success
//! rows; during a run each fresh success is added in memory so a
//! colliding attachment later in the same run is skipped, not re-sent.

use std::collections::HashSet;
use std::path::Path;

use crate::csvio::{CsvError, CsvTable, CsvWriter};
use crate::model::{AttemptOutcome, IdempotencyKey, RunLogRecord};

pub const RUN_LOG_HEADERS: [&str; 12] = [
    "timestamp",
    "target_entity_id",
    "file_name",
    "outcome",
    "status_code",
    "remote_id",
    "error_message",
    "duration_ms",
    "entity_type",
    "raw_legacy_id",
    "normalized_legacy_id",
    "file_path",
];

#[derive(Debug, Default)]
pub struct IdempotencyIndex {
    keys: HashSet<IdempotencyKey>,
}

impl IdempotencyIndex {
    /// Rebuild the index from the run log. A missing or empty log means
    /// no prior successes, not an error. Rows with outcomes other than
    /// `success` are never taken as evidence of success; duplicate
    /// success rows are absorbed by set semantics.
    pub fn load(run_log: &Path) -> Result<Self, CsvError> {
        if !run_log.exists() {
            return Ok(Self::default());
        }
        let table = CsvTable::read(run_log)?;
        if table.is_empty() {
            return Ok(Self::default());
        }
        let outcome_col = table.column("outcome")?;
        let target_col = table.column("target_entity_id")?;
        let name_col = table.column("file_name")?;

        let mut keys = HashSet::new();
        for row in table.rows() {
            if row[outcome_col].parse::<AttemptOutcome>() == Ok(AttemptOutcome::Success) {
                keys.insert(IdempotencyKey::new(
                    row[target_col].clone(),
                    row[name_col].clone(),
                ));
            }
        }
        tracing::debug!(
            target: "ledgerbridge",
            event = "idempotency_index_loaded",
            prior_successes = keys.len(),
        );
        Ok(Self { keys })
    }

    pub fn contains(&self, key: &IdempotencyKey) -> bool {
        self.keys.contains(key)
    }

    /// Record a success for the rest of the current run.
    pub fn mark_success(&mut self, key: IdempotencyKey) {
        self.keys.insert(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Append-mode writer for the run/error/duplicate logs, one row per
/// attempt. `durable` syncs after every row; the run log uses it so an
/// interrupted run always leaves a valid prefix on disk.
pub struct RunLogWriter {
    writer: CsvWriter,
    durable: bool,
}

impl RunLogWriter {
    pub fn append(path: &Path, durable: bool) -> Result<Self, CsvError> {
        Ok(Self {
            writer: CsvWriter::append(path, &RUN_LOG_HEADERS)?,
            durable,
        })
    }

    pub fn write(&mut self, record: &RunLogRecord) -> Result<(), CsvError> {
        let status_code = record
            .status_code
            .map(|c| c.to_string())
            .unwrap_or_default();
        let duration_ms = record.duration_ms.to_string();
        self.writer.write_row(&[
            &record.timestamp,
            &record.target_entity_id,
            &record.file_name,
            record.outcome.as_str(),
            &status_code,
            record.remote_id.as_deref().unwrap_or(""),
            record.error_message.as_deref().unwrap_or(""),
            &duration_ms,
            &record.entity_type,
            &record.raw_legacy_id,
            &record.normalized_legacy_id,
            &record.file_path,
        ])?;
        if self.durable {
            self.writer.sync()?;
        }
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), CsvError> {
        self.writer.sync()
    }
}

/// Read a run log back into records, skipping rows whose outcome does not
/// parse. Used by tests and audit tooling; the index itself only needs
/// the key columns.
pub fn read_run_log(path: &Path) -> Result<Vec<RunLogRecord>, CsvError> {
    let table = CsvTable::read(path)?;
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let ts = table.column("timestamp")?;
    let target = table.column("target_entity_id")?;
    let name = table.column("file_name")?;
    let outcome = table.column("outcome")?;
    let status = table.column("status_code")?;
    let remote = table.column("remote_id")?;
    let error = table.column("error_message")?;
    let duration = table.column("duration_ms")?;
    let etype = table.column("entity_type")?;
    let raw = table.column("raw_legacy_id")?;
    let norm = table.column("normalized_legacy_id")?;
    let fpath = table.column("file_path")?;

    let mut records = Vec::new();
    for row in table.rows() {
        let Ok(parsed_outcome) = row[outcome].parse::<AttemptOutcome>() else {
            continue;
        };
        records.push(RunLogRecord {
            timestamp: row[ts].clone(),
            target_entity_id: row[target].clone(),
            file_name: row[name].clone(),
            outcome: parsed_outcome,
            status_code: row[status].parse().ok(),
            remote_id: (!row[remote].is_empty()).then(|| row[remote].clone()),
            error_message: (!row[error].is_empty()).then(|| row[error].clone()),
            duration_ms: row[duration].parse().unwrap_or(0),
            entity_type: row[etype].clone(),
            raw_legacy_id: row[raw].clone(),
            normalized_legacy_id: row[norm].clone(),
            file_path: row[fpath].clone(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = IdempotencyIndex::load(&dir.path().join("nope.csv")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn empty_log_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        let index = IdempotencyIndex::load(&path).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn only_success_rows_count_and_duplicates_absorb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runlog.csv");
        let mut w = CsvWriter::create(&path, &["target_entity_id", "file_name", "outcome"]).unwrap();
        w.write_row(&["1001", "a.pdf", "success"]).unwrap();
        w.write_row(&["1001", "a.pdf", "failure"]).unwrap();
        w.write_row(&["1001", "a.pdf", "success"]).unwrap();
        w.write_row(&["1002", "b.pdf", "skipped_already_uploaded"])
            .unwrap();
        w.write_row(&["1003", "c.pdf", "failure"]).unwrap();
        drop(w);

        let index = IdempotencyIndex::load(&path).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains(&IdempotencyKey::new("1001", "a.pdf")));
        assert!(!index.contains(&IdempotencyKey::new("1002", "b.pdf")));
        assert!(!index.contains(&IdempotencyKey::new("1003", "c.pdf")));
    }

    #[test]
    fn mark_success_is_visible_immediately() {
        let mut index = IdempotencyIndex::default();
        let key = IdempotencyKey::new("1001", "a.pdf");
        assert!(!index.contains(&key));
        index.mark_success(key.clone());
        assert!(index.contains(&key));
    }
}
