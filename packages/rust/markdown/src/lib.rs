//! README list-section model and row rendering.
//!
//! The README holds one HTML table per chapter between the `## 글 목록`
//! marker and the `------` terminator. [`ReadmeDocument`] exposes the
//! splicing operations; [`render_row`] produces a single table row.

mod document;

use readme_index_shared::Entry;

pub use document::{ChapterTable, ReadmeDocument, RowChange, TableChange, TableSpan, row_item};

/// Line that opens the list section.
pub const LIST_SECTION_MARKER: &str = "## 글 목록";

/// Line that closes the list section.
pub const LIST_SECTION_END: &str = "------";

/// Header row written into every newly created chapter table.
pub const TABLE_HEADER: &str = "<tr><th>아이템🍳</th><th>주제</th><th>작성자의 글</th></tr>";

/// Render one `<tr>` line for an entry.
///
/// `<tr><td> {item} </td><td> {title} </td><td> {authors} </td></tr>`, where
/// underscores in the title become spaces and every author links to their file.
pub fn render_row(entry: &Entry) -> String {
    let authors = entry
        .authors
        .iter()
        .map(|a| format!("<a href=\"{}\">{}의 글</a>", a.link, a.author))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "<tr><td> {} </td><td> {} </td><td> {authors} </td></tr>",
        entry.key.item,
        entry.display_title()
    )
}

/// Render the heading line for a chapter.
pub fn render_heading(chapter: u32) -> String {
    format!("### {chapter} 장")
}
