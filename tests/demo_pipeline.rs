//! End-to-end pass over the seeded demo data: seed → inventory → verify →
//! upload, twice, asserting the idempotent convergence a fresh checkout
//! should observe.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use tempfile::tempdir;

use ledgerbridge_lib::config::LatencyBounds;
use ledgerbridge_lib::endpoint::SimulatedEndpoint;
use ledgerbridge_lib::model::AttemptOutcome;
use ledgerbridge_lib::runlog::read_run_log;
use ledgerbridge_lib::session::acquire_session;
use ledgerbridge_lib::{inventory, mapping, upload, verify, Config};

fn test_config(root: &Path) -> Config {
    Config {
        data_dir: root.join("data"),
        files_dir: root.join("files"),
        log_dir: root.join("logs"),
        excluded_types: BTreeSet::new(),
        fail_rate: 0.0,
        latency: LatencyBounds {
            min_ms: 0,
            max_ms: 0,
        },
    }
}

fn run_upload_stage(config: &Config) -> Result<upload::UploadSummary> {
    let (session, tenant_id) = acquire_session();
    let mut endpoint = SimulatedEndpoint::new(config, session, tenant_id);
    Ok(upload::run_upload(config, &mut endpoint)?)
}

#[test]
fn seeded_demo_converges_after_two_runs() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());

    inventory::ensure_sample_tree(&config.files_dir)?;
    std::fs::create_dir_all(&config.data_dir)?;
    mapping::write_sample_mapping_export(&config.mapping_export_csv())?;

    let records = inventory::discover_attachments(&config.files_dir);
    inventory::write_inventory(&config.inventory_csv(), &records)?;

    let verification = verify::run_verification(&config)?;
    // The seed deliberately leaves one id out of the mapping export.
    assert_eq!(verification.mapped, 2);
    assert_eq!(verification.unmapped, 1);
    assert_eq!(verification.excluded, 0);
    assert_eq!(verification.mapping_conflicts, 0);

    let first = run_upload_stage(&config)?;
    assert_eq!(first.candidates, 2);
    assert_eq!(first.uploaded, 2);
    assert_eq!(first.unmapped, 1);

    // Re-running the whole pipeline changes nothing but skip rows.
    let second = run_upload_stage(&config)?;
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.skipped, 2);

    let rows = read_run_log(&config.run_log_csv())?;
    let successes = rows
        .iter()
        .filter(|r| r.outcome == AttemptOutcome::Success)
        .count();
    assert_eq!(successes, 2);
    assert!(rows
        .iter()
        .filter(|r| r.outcome == AttemptOutcome::Success)
        .all(|r| r.remote_id.is_some()));
    Ok(())
}
