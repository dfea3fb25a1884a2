//! Save recorded documents to disk
//!
//! Each record is fetched from its `source_url` and written to
//! `<out_dir>/<company>/<file_name>`. A failed file is reported and the
//! remaining downloads continue.

use crate::error::ScrapeError;
use crate::fetchers::ReqwestTransport;
use crate::sink::DocumentRecord;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a download run
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Files written, in record order
    pub saved: Vec<PathBuf>,
    /// `(source_url, error)` for every record that was not saved
    pub failed: Vec<(String, String)>,
}

/// Download every record into `out_dir`
///
/// Only failing to create a company directory aborts the run.
pub async fn download_documents(
    transport: &ReqwestTransport,
    records: &[DocumentRecord],
    out_dir: &Path,
) -> Result<DownloadReport, ScrapeError> {
    let mut report = DownloadReport::default();

    for record in records {
        let source_url = record.source_url.trim();
        let (Some(company), Some(file_name)) = (
            path_component(&record.company),
            path_component(&record.file_name),
        ) else {
            warn!(company = %record.company, file_name = %record.file_name, "Unsafe file name, skipped");
            report
                .failed
                .push((source_url.to_string(), "unsafe file name".to_string()));
            continue;
        };

        let dir = out_dir.join(company);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);

        info!(url = %source_url, "Downloading");
        let body = match transport.fetch_document(source_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %source_url, error = %e, "Download failed");
                report.failed.push((source_url.to_string(), e.to_string()));
                continue;
            }
        };

        match tokio::fs::write(&path, &body).await {
            Ok(()) => {
                info!(path = %path.display(), bytes = body.len(), "Saved");
                report.saved.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Write failed");
                report.failed.push((source_url.to_string(), e.to_string()));
            }
        }
    }

    Ok(report)
}

/// A name usable as a single path component, or `None`
fn path_component(name: &str) -> Option<&str> {
    let name = name.trim();
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    (!unsafe_name).then_some(name)
}
