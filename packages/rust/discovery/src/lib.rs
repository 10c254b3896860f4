//! Markdown file discovery.
//!
//! Walks a repository tree for contribution files and parses their
//! `<chapter>장/아이템_<item>/<title>_<author>.md` paths.

mod parser;

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use readme_index_shared::{ReadmeIndexError, Result};

pub use parser::{FILENAME_PATTERN, parse_filename};

/// Files whose name contains this marker are never collected.
const README_MARKER: &str = "README";

/// Collect every Markdown file under `root`, as paths relative to `root`.
///
/// Files whose name contains `README` are skipped, and directories named in
/// `exclude_dirs` are not descended into. The result is sorted.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn collect_markdown_files(root: &Path, exclude_dirs: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ReadmeIndexError::Walk {
            path: root.to_path_buf(),
            message: "not a directory".into(),
        });
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, exclude_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ReadmeIndexError::Walk {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_markdown(&entry) {
            continue;
        }

        // Entries always live under the walk root.
        let Ok(rel_path) = entry.path().strip_prefix(root) else {
            continue;
        };

        debug!(path = %rel_path.display(), "found markdown file");
        files.push(rel_path.to_path_buf());
    }

    files.sort();
    debug!(count = files.len(), "markdown collection complete");

    Ok(files)
}

fn is_markdown(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.ends_with(".md") && !name.contains(README_MARKER)
}

fn is_excluded_dir(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    exclude_dirs.iter().any(|excluded| *excluded == name)
}
