use std::path::PathBuf;

/// A markdown document destined for the documentation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Target path; written as-is, parents created on demand
    pub path: PathBuf,
    /// Full file contents, replacing whatever was there
    pub content: String,
}
