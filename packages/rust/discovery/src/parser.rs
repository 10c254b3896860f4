//! Contribution filename parser.
//!
//! Paths look like `<chapter>장/아이템_<item>/<title>_<author>.md`:
//! - `chapter` and `item` are digit runs
//! - `title` is everything up to the last `_` in the file name
//! - `author` is the trailing word-character run before `.md`

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use readme_index_shared::{ParsedName, ReadmeIndexError, Result};

/// The filename convention, anchored at both ends.
pub const FILENAME_PATTERN: &str = r"^(\d+)장/아이템_(\d+)/([^/]+)_(\w+)\.md$";

static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FILENAME_PATTERN).expect("filename regex"));

/// Parse a path relative to the repository root.
///
/// Returns [`ReadmeIndexError::Filename`] carrying `rel_path` when the path
/// does not follow the convention.
pub fn parse_filename(rel_path: &Path) -> Result<ParsedName> {
    let malformed = || ReadmeIndexError::filename(rel_path);

    let normalized = rel_path.to_str().ok_or_else(malformed)?.replace('\\', "/");
    let caps = FILENAME_RE.captures(&normalized).ok_or_else(malformed)?;

    let chapter = caps[1].parse::<u32>().map_err(|_| malformed())?;
    let item = caps[2].parse::<u32>().map_err(|_| malformed())?;

    Ok(ParsedName {
        chapter,
        item,
        title: caps[3].to_string(),
        author: caps[4].to_string(),
    })
}
