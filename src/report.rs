//! Machine-readable run reports: summary counts only, written alongside
//! the CSV logs. Per-row detail stays in the logs themselves.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::upload::UploadSummary;
use crate::verify::VerificationSummary;

#[derive(Serialize)]
struct ReportFile<'a, T: Serialize> {
    generated_at: String,
    stage: &'a str,
    summary: &'a T,
}

fn write_report<T: Serialize>(log_dir: &Path, stage: &str, summary: &T) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create report directory {}", log_dir.display()))?;

    let pattern = format!("{stage}-%Y%m%d-%H%M%S.json");
    let file_name = Utc::now().format(&pattern).to_string();
    let path = log_dir.join(file_name);
    let payload = ReportFile {
        generated_at: Utc::now().to_rfc3339(),
        stage,
        summary,
    };
    let json = serde_json::to_string_pretty(&payload).context("serialize run report")?;
    fs::write(&path, json).with_context(|| format!("write run report {}", path.display()))?;
    Ok(path)
}

pub fn write_verification_report(log_dir: &Path, summary: &VerificationSummary) -> Result<PathBuf> {
    write_report(log_dir, "verify", summary)
}

pub fn write_upload_report(log_dir: &Path, summary: &UploadSummary) -> Result<PathBuf> {
    write_report(log_dir, "upload", summary)
}
