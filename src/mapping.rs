//! Mapping-export loading and the (normalized id, entity type) lookup the
//! verifier joins against.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::csvio::{CsvError, CsvTable, CsvWriter};
use crate::ids::normalize_legacy_id;
use crate::model::MappingRecord;

pub const MAPPING_HEADERS: [&str; 3] = ["normalized_legacy_id", "entity_type", "target_entity_id"];

/// Two mapping rows claimed the same (normalized id, entity type) with
/// different targets. The export is supposed to be unique on that key, so
/// this is a data-quality defect to surface, never to resolve silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingConflict {
    pub normalized_legacy_id: String,
    pub entity_type: String,
    pub kept_target: String,
    pub dropped_target: String,
}

#[derive(Debug, Default)]
pub struct MappingLookup {
    by_key: HashMap<(String, String), String>,
    conflicted: HashSet<(String, String)>,
    pub conflicts: Vec<MappingConflict>,
}

impl MappingLookup {
    /// Load the mapping export and build the join lookup.
    ///
    /// Duplicate keys with identical targets are absorbed. Duplicate keys
    /// with different targets keep the first row (export order is the
    /// deterministic tie-break) and record a conflict; affected rows are
    /// flagged downstream.
    pub fn load(path: &Path) -> Result<Self, CsvError> {
        let table = CsvTable::read(path)?;
        let id_col = table.column("normalized_legacy_id")?;
        let type_col = table.column("entity_type")?;
        let target_col = table.column("target_entity_id")?;

        let mut lookup = MappingLookup::default();
        for row in table.rows() {
            // Re-normalize defensively so a hand-edited export still joins.
            let record = MappingRecord {
                normalized_legacy_id: normalize_legacy_id(&row[id_col]),
                entity_type: row[type_col].clone(),
                target_entity_id: row[target_col].clone(),
            };
            let key = (record.normalized_legacy_id, record.entity_type);
            let target = record.target_entity_id;
            match lookup.by_key.get(&key) {
                None => {
                    lookup.by_key.insert(key, target);
                }
                Some(kept) if *kept == target => {}
                Some(kept) => {
                    let conflict = MappingConflict {
                        normalized_legacy_id: key.0.clone(),
                        entity_type: key.1.clone(),
                        kept_target: kept.clone(),
                        dropped_target: target,
                    };
                    tracing::warn!(
                        target: "ledgerbridge",
                        event = "mapping_conflict",
                        normalized_legacy_id = %conflict.normalized_legacy_id,
                        entity_type = %conflict.entity_type,
                        kept_target = %conflict.kept_target,
                        dropped_target = %conflict.dropped_target,
                    );
                    lookup.conflicted.insert(key);
                    lookup.conflicts.push(conflict);
                }
            }
        }
        Ok(lookup)
    }

    pub fn target_for(&self, normalized_legacy_id: &str, entity_type: &str) -> Option<&str> {
        self.by_key
            .get(&(normalized_legacy_id.to_string(), entity_type.to_string()))
            .map(String::as_str)
    }

    pub fn is_conflicted(&self, normalized_legacy_id: &str, entity_type: &str) -> bool {
        self.conflicted
            .contains(&(normalized_legacy_id.to_string(), entity_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Write the synthetic mapping export that matches the seeded demo tree.
/// One seeded id is deliberately left unmapped to exercise the unmapped
/// path end to end.
pub fn write_sample_mapping_export(path: &Path) -> Result<usize, CsvError> {
    let sample = [
        ("Bill", "80ABC123", "1001"),
        ("Bill", "80DEF456", "1002"),
        // "80MISSING" exists in the seeded tree but gets no mapping row.
    ];

    let mut writer = CsvWriter::create(path, &MAPPING_HEADERS)?;
    for (entity_type, raw_id, target_id) in sample {
        let normalized = normalize_legacy_id(raw_id);
        writer.write_row(&[&normalized, entity_type, target_id])?;
    }
    writer.sync()?;
    Ok(sample.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_export(dir: &Path, rows: &[[&str; 3]]) -> std::path::PathBuf {
        let path = dir.join("mapping_export.csv");
        let mut w = CsvWriter::create(&path, &MAPPING_HEADERS).unwrap();
        for row in rows {
            w.write_row(row).unwrap();
        }
        path
    }

    #[test]
    fn loads_unique_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(
            dir.path(),
            &[["ABC123", "Bill", "1001"], ["DEF456", "Invoice", "2001"]],
        );
        let lookup = MappingLookup::load(&path).unwrap();
        assert_eq!(lookup.target_for("ABC123", "Bill"), Some("1001"));
        assert_eq!(lookup.target_for("ABC123", "Invoice"), None);
        assert!(lookup.conflicts.is_empty());
    }

    #[test]
    fn first_target_wins_and_conflict_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(
            dir.path(),
            &[["ABC123", "Bill", "1001"], ["ABC123", "Bill", "9999"]],
        );
        let lookup = MappingLookup::load(&path).unwrap();
        assert_eq!(lookup.target_for("ABC123", "Bill"), Some("1001"));
        assert!(lookup.is_conflicted("ABC123", "Bill"));
        assert_eq!(lookup.conflicts.len(), 1);
        assert_eq!(lookup.conflicts[0].dropped_target, "9999");
    }

    #[test]
    fn exact_duplicate_rows_are_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(
            dir.path(),
            &[["ABC123", "Bill", "1001"], ["ABC123", "Bill", "1001"]],
        );
        let lookup = MappingLookup::load(&path).unwrap();
        assert_eq!(lookup.len(), 1);
        assert!(lookup.conflicts.is_empty());
        assert!(!lookup.is_conflicted("ABC123", "Bill"));
    }

    #[test]
    fn export_ids_are_renormalized_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), &[["80abc123", "Bill", "1001"]]);
        let lookup = MappingLookup::load(&path).unwrap();
        assert_eq!(lookup.target_for("ABC123", "Bill"), Some("1001"));
    }
}
