//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// This enum encapsulates all possible errors that can occur during
/// core operations like directory listing, ignore matching, token counting
/// and saved-prompt persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// Represents an error that occurred when a Tokio task was joined.
    /// This is often due to a task panicking or being cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Represents an error while building an ignore matcher.
    #[error("Invalid ignore pattern: {0}")]
    IgnorePattern(#[from] ignore::Error),

    /// No project folder is open, so there is nothing to read from.
    #[error("No project folder is open")]
    NoProjectRoot,

    /// Represents a path that was expected to be a directory but was not.
    #[error("Path is not a valid directory: {0}")]
    NotADirectory(PathBuf),

    /// A relative path tried to leave the project root (e.g. via `..`).
    #[error("Path escapes the project root: {0}")]
    OutsideRoot(String),

    /// The tokenizer could not be initialised or failed to encode.
    #[error("Token counting failed: {0}")]
    Tokenizer(String),

    /// The clipboard could not be written.
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    /// Saved prompts could not be (de)serialized.
    #[error("Saved prompt library error: {0}")]
    Library(#[from] serde_json::Error),

    /// A pending directory expansion was dropped before it resolved.
    #[error("Expansion of '{0}' did not complete")]
    ExpansionAborted(String),
}
