//! Result archive generation.
//!
//! Each request gets a fresh scratch directory holding the zip. The
//! [`ScratchDir`] guard removes it exactly once, off the async reactor,
//! when it is released or dropped.

use super::orchestrator::{Summary, TriageReport};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const HIGH_PRIORITY_ENTRY: &str = "high_priority_complaints.json";
pub const LOW_PRIORITY_ENTRY: &str = "low_priority_complaints.json";
pub const SUMMARY_ENTRY: &str = "summary.json";
pub const ARCHIVE_NAME: &str = "sorted_complaints.zip";

/// Request-scoped temporary directory, removed on release or drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("complaint-triage-")
            .tempdir()?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schedule removal of the directory. Later calls are no-ops.
    ///
    /// Inside a Tokio runtime the removal runs on the blocking pool so the
    /// caller never waits on the filesystem; errors are logged.
    pub fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_dir(dir));
            }
            Err(_) => remove_dir(dir),
        }
    }

    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.release();
    }
}

fn remove_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => tracing::debug!(path = %path.display(), "removed scratch directory"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch directory"),
    }
}

/// A finished archive and the scratch directory that backs it.
#[derive(Debug)]
pub struct Bundle {
    scratch: ScratchDir,
    archive_path: PathBuf,
    size: u64,
    summary: Summary,
}

impl Bundle {
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Archive size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Hand over the archive path and the guard that must outlive reads of it.
    pub fn into_parts(self) -> (PathBuf, ScratchDir) {
        (self.archive_path, self.scratch)
    }
}

/// Pretty-printed JSON for the three archive entries, in archive order.
pub fn render_documents(report: &TriageReport) -> anyhow::Result<[(&'static str, Vec<u8>); 3]> {
    Ok([
        (HIGH_PRIORITY_ENTRY, to_pretty_json(&report.high_priority)?),
        (LOW_PRIORITY_ENTRY, to_pretty_json(&report.low_priority)?),
        (SUMMARY_ENTRY, to_pretty_json(&report.summary)?),
    ])
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Write the report's three documents into a fresh zip archive.
///
/// On failure the scratch directory is dropped with the error, so no
/// partial archive outlives the call.
pub fn package(report: &TriageReport) -> anyhow::Result<Bundle> {
    let scratch = ScratchDir::new()?;
    let archive_path = scratch.path().join(ARCHIVE_NAME);

    write_archive(&archive_path, &render_documents(report)?)?;

    let size = std::fs::metadata(&archive_path)?.len();
    tracing::info!(
        path = %archive_path.display(),
        bytes = size,
        "packaged complaint archive"
    );

    Ok(Bundle {
        scratch,
        archive_path,
        size,
        summary: report.summary,
    })
}

fn write_archive(path: &Path, documents: &[(&'static str, Vec<u8>)]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (name, bytes) in documents {
        zip.start_file(*name, options)?;
        zip.write_all(bytes)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}
