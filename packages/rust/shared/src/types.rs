//! Core domain types for README index entries.

use serde::{Deserialize, Serialize};

/// Placeholder used in links when no repository identifier is configured.
pub const MISSING_REPOSITORY: &str = "None";

// ---------------------------------------------------------------------------
// ParsedName
// ---------------------------------------------------------------------------

/// Fields extracted from a `<chapter>장/아이템_<item>/<title>_<author>.md` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    pub chapter: u32,
    pub item: u32,
    /// Raw title, underscores preserved.
    pub title: String,
    pub author: String,
}

impl ParsedName {
    /// The grouping key for this file.
    pub fn key(&self) -> EntryKey {
        EntryKey {
            chapter: self.chapter,
            item: self.item,
            title: self.title.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Uniqueness key of an entry. Orders by chapter, then item, then title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub chapter: u32,
    pub item: u32,
    pub title: String,
}

/// One author's contribution link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorLink {
    pub author: String,
    pub link: String,
}

/// A (chapter, item, title) record with every author who wrote about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: EntryKey,
    pub authors: Vec<AuthorLink>,
}

impl Entry {
    /// Title with underscores rendered as spaces.
    pub fn display_title(&self) -> String {
        self.key.title.replace('_', " ")
    }
}

// ---------------------------------------------------------------------------
// LinkBuilder
// ---------------------------------------------------------------------------

/// Builds `https://github.com/<repository>/blob/<branch>/<path>` links.
///
/// The repository identifier is passed in explicitly rather than read from
/// the environment here, so link construction stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    repository: Option<String>,
    branch: String,
}

impl LinkBuilder {
    pub fn new(repository: Option<String>, branch: impl Into<String>) -> Self {
        Self {
            repository,
            branch: branch.into(),
        }
    }

    /// Whether a repository identifier is configured.
    pub fn has_repository(&self) -> bool {
        self.repository.is_some()
    }

    /// Link for a path relative to the repository root. Separators are normalized to `/`.
    pub fn link(&self, rel_path: &str) -> String {
        let repository = self.repository.as_deref().unwrap_or(MISSING_REPOSITORY);
        let path = rel_path.replace('\\', "/");
        format!(
            "https://github.com/{repository}/blob/{}/{path}",
            self.branch
        )
    }
}
