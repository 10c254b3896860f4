//! Core orchestration for readme-index.
//!
//! Ties together collection, filename parsing, and README splicing into the
//! single `update_readme` workflow.

pub mod entries;
pub mod pipeline;

pub use entries::{GroupedEntries, group_entries};
pub use pipeline::{
    ApplyStats, ProgressReporter, SilentProgress, UpdateConfig, UpdateReport, apply_entries,
    update_readme,
};
