//! Shared types, error model, and configuration for readme-index.
//!
//! This crate is the foundation depended on by all other readme-index crates.
//! It provides:
//! - [`ReadmeIndexError`] — the unified error type
//! - Domain types ([`ParsedName`], [`Entry`], [`EntryKey`], [`AuthorLink`], [`LinkBuilder`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, REPOSITORY_ENV, config_file_path, load_config, load_config_from,
};
pub use error::{ReadmeIndexError, Result};
pub use types::{AuthorLink, Entry, EntryKey, LinkBuilder, MISSING_REPOSITORY, ParsedName};
