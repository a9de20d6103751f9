//! Source tree collection for the architecture prompt.

use std::fs;
use std::path::{Component, Path};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::pr::diff::truncate_chars;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to walk source tree at {root}: {source}")]
    Walk {
        root: String,
        #[source]
        source: walkdir::Error,
    },
}

/// Source files selected for the architecture prompt, in path order.
#[derive(Debug, Clone, Default)]
pub struct CodebaseBundle {
    /// (relative path with `/` separators, file text)
    pub files: Vec<(String, String)>,
    /// Rendered concatenation, bounded to `max_bundle_chars`
    pub text: String,
    /// Whether the rendered concatenation reached the budget
    pub truncated: bool,
}

/// File selection rule: extension allow-list plus path-segment deny-list.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    excluded_segments: Vec<String>,
}

impl FileFilter {
    pub fn new(extensions: Vec<String>, excluded_segments: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            extensions,
            excluded_segments,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.collector.extensions.clone(),
            settings.excluded_segments(),
        )
    }

    /// Whether any segment of `relative` is on the deny-list.
    fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(segment) => self
                .excluded_segments
                .iter()
                .any(|denied| segment.to_str() == Some(denied.as_str())),
            _ => false,
        })
    }

    fn has_allowed_extension(&self, relative: &Path) -> bool {
        relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    pub fn accepts(&self, relative: &Path) -> bool {
        self.has_allowed_extension(relative) && !self.is_excluded(relative)
    }
}

/// Walk `root` and concatenate every accepted source file.
///
/// Entries are sorted by relative path so an unchanged tree always renders
/// the same bundle. Unreadable or non-UTF-8 files are skipped.
#[instrument(skip(filter), fields(root = %root.display()))]
pub fn collect(
    root: &Path,
    filter: &FileFilter,
    max_chars: usize,
) -> Result<CodebaseBundle, CollectError> {
    let mut files = Vec::new();
    let mut skipped = 0usize;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // Prune denied directories without descending into them.
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || entry
                    .path()
                    .strip_prefix(root)
                    .map(|rel| !filter.is_excluded(rel))
                    .unwrap_or(true)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(CollectError::Walk {
                    root: root.display().to_string(),
                    source: err,
                })
            }
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !filter.accepts(relative) {
            continue;
        }
        let text = match fs::read(entry.path()).map(String::from_utf8) {
            Ok(Ok(text)) => text,
            Ok(Err(_)) => {
                debug!(path = %relative.display(), "skipping non-UTF-8 file");
                skipped += 1;
                continue;
            }
            Err(err) => {
                debug!(path = %relative.display(), error = %err, "skipping unreadable file");
                skipped += 1;
                continue;
            }
        };
        files.push((to_slash_path(relative), text));
    }

    // Walk order sorts per directory; re-sort on the full string so ordering
    // is plain lexicographic on the rendered path.
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let rendered = render(&files);
    let (text, truncated) = truncate_chars(&rendered, max_chars);
    if truncated {
        warn!(
            original_chars = rendered.chars().count(),
            kept_chars = max_chars,
            "codebase bundle truncated to character budget"
        );
    }
    info!(files = files.len(), skipped, bundle_chars = text.chars().count(), "collected codebase");

    Ok(CodebaseBundle {
        files,
        text,
        truncated,
    })
}

fn to_slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn render(files: &[(String, String)]) -> String {
    let mut out = String::new();
    for (path, text) in files {
        out.push_str(&format!("### File: {path}\n```\n{text}\n```\n\n"));
    }
    out
}
