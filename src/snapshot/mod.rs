pub mod types;

pub use types::SnapshotFile;

use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::generation::AiReport;

/// Per-PR snapshots live here, under the documentation directory.
pub const PR_HISTORY_DIR: &str = "pr-history";

pub const ARCHITECTURE_FILE: &str = "architecture.md";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot of one PR's analysis: `<docs>/pr-history/pr-<number>.md`.
pub fn pr_snapshot(docs_dir: &Path, pr_number: u64, report: &AiReport) -> SnapshotFile {
    SnapshotFile {
        path: docs_dir
            .join(PR_HISTORY_DIR)
            .join(format!("pr-{pr_number}.md")),
        content: format!("# PR #{pr_number} Technical Snapshot\n\n{}", report.result_text),
    }
}

/// Repository-wide architecture document: `<docs>/architecture.md`.
pub fn architecture_doc(docs_dir: &Path, report: &AiReport) -> SnapshotFile {
    SnapshotFile {
        path: docs_dir.join(ARCHITECTURE_FILE),
        content: format!("# System Architecture\n\n{}", report.result_text),
    }
}

/// Write a snapshot, replacing any previous content.
#[instrument(skip(snapshot), fields(path = %snapshot.path.display()))]
pub fn write(snapshot: &SnapshotFile) -> Result<(), SnapshotError> {
    let io_err = |source: std::io::Error| SnapshotError::FileWrite {
        path: snapshot.path.display().to_string(),
        source,
    };
    if let Some(parent) = snapshot.path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&snapshot.path, &snapshot.content).map_err(io_err)?;
    debug!(bytes = snapshot.content.len(), "snapshot written");
    Ok(())
}
