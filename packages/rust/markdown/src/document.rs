//! In-memory README document with list-section splicing operations.
//!
//! Line indices are recomputed from the text on every operation, so callers
//! never hold offsets across mutations.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use readme_index_shared::{ReadmeIndexError, Result};

use crate::{LIST_SECTION_END, LIST_SECTION_MARKER, TABLE_HEADER, render_heading};

const TABLE_OPEN: &str = "<table>";
const TABLE_CLOSE: &str = "</table>";
const ROW_MARKER: &str = "<tr><td>";

/// Matches `### <N> 장` chapter headings.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*### (\d+) 장").expect("chapter heading regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Line indices of a `<table>` … `</table>` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpan {
    pub open: usize,
    pub close: usize,
}

impl TableSpan {
    /// Indices of the lines strictly inside the table.
    pub fn body(&self) -> Range<usize> {
        self.open + 1..self.close
    }
}

/// A chapter heading inside the list section and the table that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterTable {
    pub heading: usize,
    pub table: Option<TableSpan>,
}

/// What [`ReadmeDocument::ensure_table`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    Existing,
    /// The heading was present; an empty table was added below it.
    CreatedTable,
    /// Neither heading nor table existed.
    CreatedHeading,
}

/// What [`ReadmeDocument::upsert_row`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Inserted,
    Replaced,
    Unchanged,
}

// ---------------------------------------------------------------------------
// ReadmeDocument
// ---------------------------------------------------------------------------

/// README lines held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeDocument {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl ReadmeDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Join the lines back into text. Line endings are written as `\n`.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines strictly between the `## 글 목록` marker and the `------` terminator.
    pub fn list_section(&self) -> Result<Range<usize>> {
        let start = self
            .lines
            .iter()
            .position(|line| line.trim_end() == LIST_SECTION_MARKER)
            .ok_or_else(|| ReadmeIndexError::missing_marker(LIST_SECTION_MARKER))?;

        let end = self.lines[start + 1..]
            .iter()
            .position(|line| line.trim_end() == LIST_SECTION_END)
            .map(|offset| start + 1 + offset)
            .ok_or_else(|| ReadmeIndexError::missing_marker(LIST_SECTION_END))?;

        Ok(start + 1..end)
    }

    /// Scan the list section for chapter headings and their tables.
    ///
    /// A table belongs to the closest heading above it. Repeated headings for
    /// the same chapter are ignored after the first.
    pub fn chapter_tables(&self) -> Result<BTreeMap<u32, ChapterTable>> {
        let section = self.list_section()?;
        let mut tables: BTreeMap<u32, ChapterTable> = BTreeMap::new();
        let mut current: Option<u32> = None;
        let mut open: Option<usize> = None;

        for i in section {
            let line = &self.lines[i];

            if let Some(caps) = HEADING_RE.captures(line) {
                if let (Some(chapter), Some(_)) = (current, open) {
                    return Err(unclosed_table(chapter));
                }
                current = None;

                let Ok(chapter) = caps[1].parse::<u32>() else {
                    warn!(line = i + 1, "chapter number out of range, ignoring heading");
                    continue;
                };
                if tables.contains_key(&chapter) {
                    warn!(chapter, line = i + 1, "duplicate chapter heading ignored");
                    continue;
                }

                tables.insert(
                    chapter,
                    ChapterTable {
                        heading: i,
                        table: None,
                    },
                );
                current = Some(chapter);
                continue;
            }

            let Some(chapter) = current else {
                continue;
            };

            if open.is_none() && line.contains(TABLE_OPEN) {
                open = Some(i);
            }
            if line.contains(TABLE_CLOSE) {
                if let Some(open_at) = open.take() {
                    if let Some(entry) = tables.get_mut(&chapter) {
                        entry.table = Some(TableSpan {
                            open: open_at,
                            close: i,
                        });
                    }
                    current = None;
                }
            }
        }

        if let (Some(chapter), Some(_)) = (current, open) {
            return Err(unclosed_table(chapter));
        }

        Ok(tables)
    }

    /// Make sure `chapter` has a heading and a table in the list section.
    ///
    /// New headings go before the first heading of a smaller chapter, or at
    /// the end of the section, so chapters stay in descending order.
    pub fn ensure_table(&mut self, chapter: u32) -> Result<TableChange> {
        let tables = self.chapter_tables()?;

        match tables.get(&chapter) {
            Some(ChapterTable { table: Some(_), .. }) => Ok(TableChange::Existing),
            Some(ChapterTable {
                heading,
                table: None,
            }) => {
                let at = heading + 1;
                let mut block = empty_table();
                if self.lines.get(at).is_some_and(|line| !line.trim().is_empty()) {
                    block.push(String::new());
                }
                self.splice(at, block);
                debug!(chapter, "created table under existing heading");
                Ok(TableChange::CreatedTable)
            }
            None => {
                let section = self.list_section()?;
                let at = tables
                    .iter()
                    .filter(|(number, _)| **number < chapter)
                    .map(|(_, table)| table.heading)
                    .min()
                    .unwrap_or(section.end);

                let mut block = Vec::new();
                if at > 0 && !self.lines[at - 1].trim().is_empty() {
                    block.push(String::new());
                }
                block.push(render_heading(chapter));
                block.extend(empty_table());
                block.push(String::new());
                self.splice(at, block);
                debug!(chapter, "created chapter heading and table");
                Ok(TableChange::CreatedHeading)
            }
        }
    }

    /// Item numbers of the rows currently in a chapter's table, top to bottom.
    pub fn row_items(&self, chapter: u32) -> Result<Vec<u32>> {
        let span = self.table_span(chapter)?;
        Ok(self
            .rows(span)
            .into_iter()
            .map(|(_, item)| item)
            .collect())
    }

    /// Replace the row for `item`, or insert `line` keeping items in descending order.
    ///
    /// The chapter must already have a table (see [`Self::ensure_table`]).
    pub fn upsert_row(&mut self, chapter: u32, item: u32, line: &str) -> Result<RowChange> {
        let span = self.writable_span(chapter)?;
        let rows = self.rows(span);

        if let Some(&(index, _)) = rows.iter().find(|(_, existing)| *existing == item) {
            if self.lines[index] == line {
                return Ok(RowChange::Unchanged);
            }
            self.lines[index] = line.to_string();
            debug!(chapter, item, "replaced row");
            return Ok(RowChange::Replaced);
        }

        let at = rows
            .iter()
            .find(|(_, existing)| *existing < item)
            .map(|(index, _)| *index)
            .unwrap_or(span.close);
        self.lines.insert(at, line.to_string());
        debug!(chapter, item, "inserted row");
        Ok(RowChange::Inserted)
    }

    /// Remove rows whose item number is not in `keep`. Returns how many were removed.
    ///
    /// Chapters without a table have nothing to prune.
    pub fn prune_rows(&mut self, chapter: u32, keep: &BTreeSet<u32>) -> Result<usize> {
        let Some(span) = self.chapter_tables()?.get(&chapter).and_then(|t| t.table) else {
            return Ok(0);
        };

        let stale: Vec<usize> = self
            .rows(span)
            .into_iter()
            .filter(|(_, item)| !keep.contains(item))
            .map(|(index, _)| index)
            .collect();

        for index in stale.iter().rev() {
            self.lines.remove(*index);
        }

        if !stale.is_empty() {
            debug!(chapter, removed = stale.len(), "pruned rows");
        }
        Ok(stale.len())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn table_span(&self, chapter: u32) -> Result<TableSpan> {
        self.chapter_tables()?
            .get(&chapter)
            .and_then(|t| t.table)
            .ok_or_else(|| {
                ReadmeIndexError::validation(format!("chapter {chapter} has no table"))
            })
    }

    /// Table span with room for rows. A `<table></table>` written on one line
    /// is split so the close marker sits on its own line.
    fn writable_span(&mut self, chapter: u32) -> Result<TableSpan> {
        let span = self.table_span(chapter)?;
        if span.open != span.close {
            return Ok(span);
        }

        let line = &self.lines[span.open];
        let split_at = line
            .find(TABLE_OPEN)
            .and_then(|open_at| {
                line[open_at..]
                    .find(TABLE_CLOSE)
                    .map(|offset| open_at + offset)
            })
            .ok_or_else(|| unclosed_table(chapter))?;

        let (head, tail) = line.split_at(split_at);
        let (head, tail) = (head.trim_end().to_string(), tail.to_string());
        self.lines[span.open] = head;
        self.lines.insert(span.open + 1, tail);
        debug!(chapter, "split single-line table");

        Ok(TableSpan {
            open: span.open,
            close: span.open + 1,
        })
    }

    fn rows(&self, span: TableSpan) -> Vec<(usize, u32)> {
        span.body()
            .filter_map(|i| row_item(&self.lines[i]).map(|item| (i, item)))
            .collect()
    }

    fn splice(&mut self, at: usize, block: Vec<String>) {
        self.lines.splice(at..at, block);
    }
}

/// Item number in the first cell of a `<tr><td>` row, if the line is one.
pub fn row_item(line: &str) -> Option<u32> {
    if !line.contains(ROW_MARKER) {
        return None;
    }
    let (_, rest) = line.split_once("<td>")?;
    let (cell, _) = rest.split_once("</td>")?;
    cell.trim().parse().ok()
}

fn empty_table() -> Vec<String> {
    vec![
        TABLE_OPEN.to_string(),
        TABLE_HEADER.to_string(),
        TABLE_CLOSE.to_string(),
    ]
}

fn unclosed_table(chapter: u32) -> ReadmeIndexError {
    ReadmeIndexError::validation(format!("chapter {chapter} table is missing {TABLE_CLOSE}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
