use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ledgerbridge_lib::endpoint::SimulatedEndpoint;
use ledgerbridge_lib::session::acquire_session;
use ledgerbridge_lib::{inventory, mapping, report, upload, verify, Config};

#[derive(Debug, Parser)]
#[command(
    name = "ledgerbridge",
    about = "Migrate legacy file attachments into ledger records",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seed a synthetic legacy file tree and mapping export for the demo.
    Seed,
    /// Walk the files root and rebuild the attachment inventory CSV.
    Inventory,
    /// Join the inventory against the mapping export and classify rows.
    Verify,
    /// Upload verified attachments, skipping prior successes.
    Upload,
}

fn main() {
    ledgerbridge_lib::init_logging();

    if let Err(err) = run() {
        tracing::error!(
            target: "ledgerbridge",
            event = "command_failed",
            error = %format!("{err:#}"),
        );
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("load configuration")?;

    match cli.command {
        Commands::Seed => seed(&config),
        Commands::Inventory => build_inventory(&config),
        Commands::Verify => verify_mappings(&config),
        Commands::Upload => upload_attachments(&config),
    }
}

fn seed(config: &Config) -> Result<()> {
    inventory::ensure_sample_tree(&config.files_dir)
        .with_context(|| format!("seed sample tree under {}", config.files_dir.display()))?;
    let rows = mapping::write_sample_mapping_export(&config.mapping_export_csv())
        .context("write sample mapping export")?;
    println!(
        "seeded sample tree under {} and {} mapping rows in {}",
        config.files_dir.display(),
        rows,
        config.mapping_export_csv().display()
    );
    Ok(())
}

fn build_inventory(config: &Config) -> Result<()> {
    let records = inventory::discover_attachments(&config.files_dir);
    inventory::write_inventory(&config.inventory_csv(), &records)
        .context("write attachment inventory")?;
    println!(
        "wrote {} attachment rows to {}",
        records.len(),
        config.inventory_csv().display()
    );
    Ok(())
}

fn verify_mappings(config: &Config) -> Result<()> {
    let summary = verify::run_verification(config).context("run mapping verification")?;
    let report_path = report::write_verification_report(&config.log_dir, &summary)?;
    println!(
        "verification complete: {} mapped, {} unmapped, {} excluded, {} mapping conflicts (report: {})",
        summary.mapped,
        summary.unmapped,
        summary.excluded,
        summary.mapping_conflicts,
        report_path.display()
    );
    Ok(())
}

fn upload_attachments(config: &Config) -> Result<()> {
    let (session, tenant_id) = acquire_session();
    let mut endpoint = SimulatedEndpoint::new(config, session, tenant_id);
    let summary = upload::run_upload(config, &mut endpoint).context("run attachment upload")?;
    let report_path = report::write_upload_report(&config.log_dir, &summary)?;
    println!(
        "upload finished: {} candidates, {} uploaded, {} skipped, {} failed, {} unmapped (report: {})",
        summary.candidates,
        summary.uploaded,
        summary.skipped,
        summary.failed,
        summary.unmapped,
        report_path.display()
    );
    Ok(())
}
