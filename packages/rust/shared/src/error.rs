//! Error types for readme-index.
//!
//! Library crates use [`ReadmeIndexError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all readme-index operations.
#[derive(Debug, thiserror::Error)]
pub enum ReadmeIndexError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Directory traversal failed at the collection root.
    #[error("failed to walk {path:?}: {message}")]
    Walk { path: PathBuf, message: String },

    /// A Markdown file does not follow the `<chapter>장/아이템_<item>/<title>_<author>.md` convention.
    #[error("malformed filename: {path:?}")]
    Filename { path: PathBuf },

    /// The README lacks a marker line the list section depends on.
    #[error("README is missing the marker line {marker:?}")]
    MissingMarker { marker: String },

    /// Structural problem inside the README list section.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReadmeIndexError>;

impl ReadmeIndexError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn filename(path: impl Into<PathBuf>) -> Self {
        Self::Filename { path: path.into() }
    }

    pub fn missing_marker(marker: impl Into<String>) -> Self {
        Self::MissingMarker {
            marker: marker.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ReadmeIndexError::config("unknown field `readmee`");
        assert_eq!(err.to_string(), "config error: unknown field `readmee`");

        let err = ReadmeIndexError::missing_marker("## 글 목록");
        assert!(err.to_string().contains("## 글 목록"));

        let err = ReadmeIndexError::filename("foo/bar.md");
        assert!(err.to_string().contains("foo/bar.md"));
    }
}
