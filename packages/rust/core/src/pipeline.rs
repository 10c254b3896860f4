//! End-to-end README update: collect → parse → splice → write.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use readme_index_discovery::collect_markdown_files;
use readme_index_markdown::{ReadmeDocument, RowChange, TableChange, render_row};
use readme_index_shared::{AppConfig, Entry, LinkBuilder, ReadmeIndexError, Result};

use crate::entries::{GroupedEntries, group_entries};

/// Configuration for the `update_readme` pipeline.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Repository root to scan.
    pub root: PathBuf,
    /// README path, relative to `root` unless absolute.
    pub readme: PathBuf,
    /// Link construction (repository identifier and branch).
    pub links: LinkBuilder,
    /// Directory names the collector skips.
    pub exclude_dirs: Vec<String>,
    /// Remove rows whose files no longer exist.
    pub prune: bool,
    /// Compute the update without writing the README.
    pub dry_run: bool,
}

impl UpdateConfig {
    /// Build a runtime config from the file config. `prune` and `dry_run` start off.
    pub fn from_app_config(root: impl Into<PathBuf>, app: &AppConfig) -> Self {
        Self {
            root: root.into(),
            readme: app.readme.clone(),
            links: LinkBuilder::new(app.repository.clone(), app.branch.clone()),
            exclude_dirs: app.exclude_dirs.clone(),
            prune: false,
            dry_run: false,
        }
    }

    pub fn readme_path(&self) -> PathBuf {
        self.root.join(&self.readme)
    }
}

/// Counters from applying entries to a README document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    pub tables_created: usize,
    pub rows_inserted: usize,
    pub rows_replaced: usize,
    pub rows_unchanged: usize,
    pub rows_pruned: usize,
}

/// Result of the `update_readme` pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// README that was (or would have been) rewritten.
    pub readme: PathBuf,
    /// Markdown files found by the collector.
    pub files_scanned: usize,
    /// Distinct (chapter, item, title) entries.
    pub entries: usize,
    /// Distinct chapters among the entries.
    pub chapters: usize,
    /// Files skipped for not following the naming convention.
    pub skipped: Vec<PathBuf>,
    #[serde(flatten)]
    pub stats: ApplyStats,
    /// Whether the rendered README differs from the file on disk.
    pub changed: bool,
    /// Whether the README was written.
    pub written: bool,
    pub elapsed_ms: u64,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for every file that does not follow the naming convention.
    fn file_skipped(&self, path: &Path);
    /// Called when the pipeline completes.
    fn done(&self, report: &UpdateReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_skipped(&self, _path: &Path) {}
    fn done(&self, _report: &UpdateReport) {}
}

/// Run the full README update.
///
/// 1. Collect Markdown files under the root
/// 2. Parse filenames and group them into entries
/// 3. Splice per-chapter tables in memory
/// 4. Write the README back if anything changed
///
/// A README without the list-section markers fails before anything is written.
#[instrument(skip_all, fields(root = %config.root.display()))]
pub fn update_readme(
    config: &UpdateConfig,
    progress: &dyn ProgressReporter,
) -> Result<UpdateReport> {
    let start = Instant::now();

    if !config.links.has_repository() {
        warn!("no repository identifier configured, links will contain a placeholder segment");
    }

    // --- Phase 1: Collect ---
    progress.phase("Collecting Markdown files");
    let files = collect_markdown_files(&config.root, &config.exclude_dirs)?;

    // --- Phase 2: Parse ---
    progress.phase("Parsing filenames");
    let grouped = group_entries(&files, &config.links);
    for path in &grouped.skipped {
        let joined = config.root.join(path);
        let shown = std::path::absolute(&joined).unwrap_or(joined);
        progress.file_skipped(&shown);
    }
    if !grouped.skipped.is_empty() {
        warn!(
            count = grouped.skipped.len(),
            "skipped files that do not follow the naming convention"
        );
    }

    // --- Phase 3: Splice ---
    progress.phase("Updating README");
    let readme_path = config.readme_path();
    let original = std::fs::read_to_string(&readme_path)
        .map_err(|e| ReadmeIndexError::io(&readme_path, e))?;

    let mut doc = ReadmeDocument::parse(&original);
    let stats = apply_entries(&mut doc, &grouped, config.prune)?;
    let updated = doc.render();

    // --- Phase 4: Write ---
    let changed = updated != original;
    let written = changed && !config.dry_run;
    if written {
        write_atomic(&readme_path, &updated)?;
    } else {
        debug!(changed, dry_run = config.dry_run, "README not written");
    }

    let report = UpdateReport {
        readme: readme_path,
        files_scanned: files.len(),
        entries: grouped.len(),
        chapters: grouped.chapters_desc().len(),
        skipped: grouped.skipped.clone(),
        stats,
        changed,
        written,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    progress.done(&report);

    info!(
        files = report.files_scanned,
        entries = report.entries,
        skipped = report.skipped.len(),
        inserted = stats.rows_inserted,
        replaced = stats.rows_replaced,
        pruned = stats.rows_pruned,
        changed,
        written,
        "README update complete"
    );

    Ok(report)
}

/// Apply grouped entries to a README document.
///
/// Chapters are handled largest first. Within a chapter, each item gets one
/// row; when several titles share an item the smallest title is shown with
/// the authors of all of them.
pub fn apply_entries(
    doc: &mut ReadmeDocument,
    grouped: &GroupedEntries,
    prune: bool,
) -> Result<ApplyStats> {
    let mut stats = ApplyStats::default();

    for chapter in grouped.chapters_desc() {
        if doc.ensure_table(chapter)? != TableChange::Existing {
            stats.tables_created += 1;
        }

        let rows = rows_by_item(chapter, grouped.chapter_entries_desc(chapter));
        for entry in rows.into_values().rev() {
            let line = render_row(&entry);
            match doc.upsert_row(chapter, entry.key.item, &line)? {
                RowChange::Inserted => stats.rows_inserted += 1,
                RowChange::Replaced => stats.rows_replaced += 1,
                RowChange::Unchanged => stats.rows_unchanged += 1,
            }
        }
    }

    if prune {
        let items = grouped.items_by_chapter();
        let none = BTreeSet::new();
        let chapters: Vec<u32> = doc.chapter_tables()?.keys().copied().collect();
        for chapter in chapters {
            stats.rows_pruned += doc.prune_rows(chapter, items.get(&chapter).unwrap_or(&none))?;
        }
    }

    Ok(stats)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collapse a chapter's entries (given largest key first) to one entry per item.
///
/// When several titles share an item, the row takes the smallest title and
/// lists the authors of every title, ordered by link.
fn rows_by_item(chapter: u32, entries: Vec<Entry>) -> BTreeMap<u32, Entry> {
    let mut rows: BTreeMap<u32, Entry> = BTreeMap::new();
    for mut entry in entries {
        let item = entry.key.item;
        if let Some(previous) = rows.remove(&item) {
            warn!(
                chapter,
                item,
                kept = %entry.key.title,
                merged = %previous.key.title,
                "several titles share one item, merging authors into one row"
            );
            entry.authors.extend(previous.authors);
            entry.authors.sort_by(|a, b| a.link.cmp(&b.link));
        }
        rows.insert(item, entry);
    }
    rows
}

/// Write via a temp file in the same directory, then rename over the target.
///
/// A symlinked README is written through to its target, and the target's
/// permissions carry over to the new file.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let target = if path.is_symlink() {
        std::fs::canonicalize(path).map_err(|e| ReadmeIndexError::io(path, e))?
    } else {
        path.to_path_buf()
    };

    let file_name = target
        .file_name()
        .ok_or_else(|| ReadmeIndexError::validation(format!("{} has no file name", target.display())))?;
    let temp = target.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| ReadmeIndexError::io(&temp, e))?;

    if let Ok(metadata) = std::fs::metadata(&target) {
        if let Err(e) = std::fs::set_permissions(&temp, metadata.permissions()) {
            let _ = std::fs::remove_file(&temp);
            return Err(ReadmeIndexError::io(&temp, e));
        }
    }

    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(ReadmeIndexError::io(&target, e));
    }

    debug!(path = %target.display(), size = content.len(), "wrote README");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use readme_index_markdown::TABLE_HEADER;

    const README: &str = "# 이펙티브 자바 스터디\n\n## 글 목록\n\n------\n\n## 규칙\n";

    struct Repo {
        dir: tempfile::TempDir,
    }

    impl Repo {
        fn new(readme: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("README.md"), readme).unwrap();
            Self { dir }
        }

        fn add(&self, rel: &str) {
            let path = self.dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "내용\n").unwrap();
        }

        fn remove(&self, rel: &str) {
            std::fs::remove_file(self.dir.path().join(rel)).unwrap();
        }

        fn readme(&self) -> String {
            std::fs::read_to_string(self.dir.path().join("README.md")).unwrap()
        }

        fn config(&self) -> UpdateConfig {
            let app = AppConfig {
                repository: Some("org/repo".into()),
                ..AppConfig::default()
            };
            UpdateConfig::from_app_config(self.dir.path(), &app)
        }

        fn run(&self) -> UpdateReport {
            update_readme(&self.config(), &SilentProgress).unwrap()
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        skipped: RefCell<Vec<PathBuf>>,
        phases: RefCell<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.borrow_mut().push(name.to_string());
        }
        fn file_skipped(&self, path: &Path) {
            self.skipped.borrow_mut().push(path.to_path_buf());
        }
        fn done(&self, _report: &UpdateReport) {}
    }

    #[test]
    fn end_to_end_example_row() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_3/제목_홍길동.md");

        let report = repo.run();
        assert!(report.written);
        assert_eq!(report.entries, 1);
        assert_eq!(report.stats.tables_created, 1);

        let link = "https://github.com/org/repo/blob/master/1장/아이템_3/제목_홍길동.md";
        let expected = format!(
            "# 이펙티브 자바 스터디\n\n## 글 목록\n\n### 1 장\n<table>\n{TABLE_HEADER}\n\
             <tr><td> 3 </td><td> 제목 </td><td> <a href=\"{link}\">홍길동의 글</a> </td></tr>\n\
             </table>\n\n------\n\n## 규칙\n"
        );
        assert_eq!(repo.readme(), expected);
    }

    #[test]
    fn second_run_is_idempotent() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/정적_팩터리_kim.md");
        repo.add("1장/아이템_1/정적_팩터리_lee.md");
        repo.add("1장/아이템_2/빌더_park.md");
        repo.add("2장/아이템_7/equals_choi.md");

        let first = repo.run();
        assert!(first.written);
        let after_first = repo.readme();

        let second = repo.run();
        assert!(!second.changed);
        assert!(!second.written);
        assert_eq!(second.stats.rows_inserted, 0);
        assert_eq!(second.stats.tables_created, 0);
        assert_eq!(second.stats.rows_unchanged, 3);
        assert_eq!(repo.readme(), after_first);
        assert_eq!(after_first.matches("<tr><td>").count(), 3);
    }

    #[test]
    fn single_line_table_is_filled_and_stable() {
        let repo = Repo::new("## 글 목록\n### 1 장\n<table></table>\n------\n");
        repo.add("1장/아이템_2/b_kim.md");
        repo.add("1장/아이템_1/a_kim.md");

        let first = repo.run();
        assert_eq!(first.stats.rows_inserted, 2);
        assert_eq!(first.stats.tables_created, 0);
        let after_first = repo.readme();
        assert_eq!(after_first.matches("<tr><td>").count(), 2);
        assert_eq!(ReadmeDocument::parse(&after_first).row_items(1).unwrap(), vec![2, 1]);

        let second = repo.run();
        assert!(!second.changed);
        assert_eq!(second.stats.rows_unchanged, 2);
        assert_eq!(repo.readme(), after_first);
    }

    #[test]
    fn chapters_render_in_descending_order() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/a_kim.md");
        repo.add("3장/아이템_9/b_kim.md");
        repo.add("2장/아이템_5/c_kim.md");
        repo.run();

        let text = repo.readme();
        let pos = |needle: &str| text.find(needle).unwrap();
        assert!(pos("### 3 장") < pos("### 2 장"));
        assert!(pos("### 2 장") < pos("### 1 장"));
    }

    #[test]
    fn new_item_lands_between_existing_rows() {
        let repo = Repo::new(README);
        repo.add("3장/아이템_2/b_kim.md");
        repo.add("3장/아이템_5/e_kim.md");
        repo.run();

        repo.add("3장/아이템_3/c_kim.md");
        let report = repo.run();
        assert_eq!(report.stats.rows_inserted, 1);

        let doc = ReadmeDocument::parse(&repo.readme());
        assert_eq!(doc.row_items(3).unwrap(), vec![5, 3, 2]);
    }

    #[test]
    fn new_author_replaces_row_in_place() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/t_kim.md");
        repo.run();
        let lines_before = repo.readme().lines().count();

        repo.add("1장/아이템_1/t_lee.md");
        let report = repo.run();
        assert_eq!(report.stats.rows_replaced, 1);

        let text = repo.readme();
        assert_eq!(text.lines().count(), lines_before);
        assert!(text.contains("kim의 글</a>, <a href="));
        assert!(text.contains("lee의 글</a>"));
    }

    #[test]
    fn malformed_files_are_reported_and_skipped() {
        let repo = Repo::new(README);
        repo.add("foo/bar.md");
        repo.add("1장/아이템_1/t_kim.md");

        let progress = RecordingProgress::default();
        let report = update_readme(&repo.config(), &progress).unwrap();

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.entries, 1);
        assert_eq!(report.skipped, vec![PathBuf::from("foo/bar.md")]);
        let skipped = progress.skipped.borrow();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].is_absolute());
        assert!(skipped[0].ends_with("foo/bar.md"));
        assert!(progress.phases.borrow().len() >= 3);
        assert!(repo.readme().contains("kim의 글"));
    }

    #[test]
    fn missing_markers_abort_without_writing() {
        let original = "# no list section here\n";
        let repo = Repo::new(original);
        repo.add("1장/아이템_1/t_kim.md");

        let err = update_readme(&repo.config(), &SilentProgress).unwrap_err();
        assert!(matches!(err, ReadmeIndexError::MissingMarker { .. }));
        assert_eq!(repo.readme(), original);
    }

    #[test]
    fn missing_readme_is_io_error() {
        let repo = Repo::new(README);
        std::fs::remove_file(repo.dir.path().join("README.md")).unwrap();
        let err = update_readme(&repo.config(), &SilentProgress).unwrap_err();
        assert!(matches!(err, ReadmeIndexError::Io { .. }));
    }

    #[test]
    fn dry_run_reports_change_without_writing() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/t_kim.md");

        let mut config = repo.config();
        config.dry_run = true;
        let report = update_readme(&config, &SilentProgress).unwrap();

        assert!(report.changed);
        assert!(!report.written);
        assert_eq!(repo.readme(), README);
    }

    #[test]
    fn prune_drops_rows_for_deleted_files() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/a_kim.md");
        repo.add("1장/아이템_2/b_kim.md");
        repo.run();

        repo.remove("1장/아이템_2/b_kim.md");
        let kept = repo.run();
        assert_eq!(kept.stats.rows_pruned, 0);
        assert_eq!(repo.readme().matches("<tr><td>").count(), 2);

        let mut config = repo.config();
        config.prune = true;
        let pruned = update_readme(&config, &SilentProgress).unwrap();
        assert_eq!(pruned.stats.rows_pruned, 1);

        let doc = ReadmeDocument::parse(&repo.readme());
        assert_eq!(doc.row_items(1).unwrap(), vec![1]);
    }

    #[test]
    fn shared_item_keeps_one_row_with_every_author() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_4/alpha_kim.md");
        repo.add("1장/아이템_4/beta_lee.md");
        repo.run();

        let text = repo.readme();
        assert_eq!(text.matches("<tr><td>").count(), 1);
        assert!(text.contains("<td> alpha </td>"));
        assert!(!text.contains("<td> beta </td>"));

        let kim = "https://github.com/org/repo/blob/master/1장/아이템_4/alpha_kim.md";
        let lee = "https://github.com/org/repo/blob/master/1장/아이템_4/beta_lee.md";
        assert!(text.contains(&format!(
            "<a href=\"{kim}\">kim의 글</a>, <a href=\"{lee}\">lee의 글</a>"
        )));

        let second = repo.run();
        assert!(!second.changed);
    }

    #[test]
    fn rows_by_item_merges_authors_across_titles() {
        let links = LinkBuilder::new(Some("org/repo".into()), "master");
        let files = vec![
            PathBuf::from("2장/아이템_6/zeta_park.md"),
            PathBuf::from("2장/아이템_6/alpha_kim.md"),
            PathBuf::from("2장/아이템_6/alpha_choi.md"),
            PathBuf::from("2장/아이템_1/other_lee.md"),
        ];
        let grouped = group_entries(&files, &links);

        let rows = rows_by_item(2, grouped.chapter_entries_desc(2));
        assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![1, 6]);

        let merged = &rows[&6];
        assert_eq!(merged.key.title, "alpha");
        let authors: Vec<&str> = merged.authors.iter().map(|a| a.author.as_str()).collect();
        assert_eq!(authors, vec!["choi", "kim", "park"]);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/t_kim.md");
        repo.run();

        let leftovers: Vec<_> = std::fs::read_dir(repo.dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn skipped_paths_are_absolute_for_a_relative_root() {
        let repo = Repo::new(README);
        repo.add("foo/bar.md");

        let cwd = std::env::current_dir().unwrap();
        let relative = relative_to(repo.dir.path(), &cwd);
        let mut config = repo.config();
        config.root = relative;

        let progress = RecordingProgress::default();
        update_readme(&config, &progress).unwrap();

        let skipped = progress.skipped.borrow();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].is_absolute());
        assert!(skipped[0].ends_with("foo/bar.md"));
    }

    /// `to` expressed relative to `from`, using `..` segments.
    fn relative_to(to: &Path, from: &Path) -> PathBuf {
        let to: Vec<_> = to.components().collect();
        let from: Vec<_> = from.components().collect();
        let common = to.iter().zip(&from).take_while(|(a, b)| a == b).count();

        let mut out = PathBuf::new();
        for _ in common..from.len() {
            out.push("..");
        }
        for part in &to[common..] {
            out.push(part);
        }
        out
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_symlinked_readme() {
        let repo = Repo::new(README);
        let docs = repo.dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        let real = docs.join("README.md");
        std::fs::rename(repo.dir.path().join("README.md"), &real).unwrap();
        std::os::unix::fs::symlink(&real, repo.dir.path().join("README.md")).unwrap();
        repo.add("1장/아이템_1/t_kim.md");

        let report = repo.run();
        assert!(report.written);

        let link = repo.dir.path().join("README.md");
        assert!(link.is_symlink());
        assert!(std::fs::read_to_string(&real).unwrap().contains("kim의 글"));
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let repo = Repo::new(README);
        let readme = repo.dir.path().join("README.md");
        std::fs::set_permissions(&readme, std::fs::Permissions::from_mode(0o640)).unwrap();
        repo.add("1장/아이템_1/t_kim.md");

        assert!(repo.run().written);

        let mode = std::fs::metadata(&readme).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn report_serializes_flat() {
        let repo = Repo::new(README);
        repo.add("1장/아이템_1/t_kim.md");
        let report = repo.run();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rows_inserted"], 1);
        assert_eq!(json["written"], true);
    }
}
