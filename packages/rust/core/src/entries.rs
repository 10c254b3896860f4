//! Groups parsed files into README entries.
//!
//! Files sharing a (chapter, item, title) key accumulate into one entry
//! with several authors. Files that do not follow the naming convention are
//! kept aside with their path for reporting.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use readme_index_discovery::parse_filename;
use readme_index_shared::{AuthorLink, Entry, EntryKey, LinkBuilder};

/// Entries derived from one collection pass.
#[derive(Debug, Default)]
pub struct GroupedEntries {
    entries: BTreeMap<EntryKey, Vec<AuthorLink>>,
    /// Paths that did not match the filename convention, in input order.
    pub skipped: Vec<PathBuf>,
}

impl GroupedEntries {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct chapters, largest first.
    pub fn chapters_desc(&self) -> Vec<u32> {
        let chapters: BTreeSet<u32> = self.entries.keys().map(|key| key.chapter).collect();
        chapters.into_iter().rev().collect()
    }

    /// All entries, largest key first.
    pub fn entries_desc(&self) -> Vec<Entry> {
        self.entries
            .iter()
            .rev()
            .map(|(key, authors)| Entry {
                key: key.clone(),
                authors: authors.clone(),
            })
            .collect()
    }

    /// Entries of one chapter, largest key first.
    pub fn chapter_entries_desc(&self, chapter: u32) -> Vec<Entry> {
        self.entries_desc()
            .into_iter()
            .filter(|entry| entry.key.chapter == chapter)
            .collect()
    }

    /// Item numbers backed by at least one file, per chapter.
    pub fn items_by_chapter(&self) -> BTreeMap<u32, BTreeSet<u32>> {
        let mut items: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for key in self.entries.keys() {
            items.entry(key.chapter).or_default().insert(key.item);
        }
        items
    }
}

/// Parse every collected path and group the results.
///
/// Authors within an entry keep the order of `files`, which the collector
/// already sorts.
pub fn group_entries(files: &[PathBuf], links: &LinkBuilder) -> GroupedEntries {
    let mut grouped = GroupedEntries::default();

    for path in files {
        match parse_filename(path) {
            Ok(parsed) => {
                let link = links.link(&path.to_string_lossy());
                debug!(
                    chapter = parsed.chapter,
                    item = parsed.item,
                    author = %parsed.author,
                    "parsed contribution"
                );
                grouped
                    .entries
                    .entry(parsed.key())
                    .or_default()
                    .push(AuthorLink {
                        author: parsed.author,
                        link,
                    });
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "filename does not follow the convention");
                grouped.skipped.push(path.clone());
            }
        }
    }

    grouped
}
