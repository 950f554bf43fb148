//! Error type for translation.
//!
//! Errors format in the usual `name:line: error` style so they can be
//! printed straight to stderr:
//! ```text
//! main:3: bad line "~ two names": unexpected token `names`
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal translation error.
#[derive(Debug, Error)]
pub enum TranslatorError {
    /// An `%` line named a source that no namespace holds.
    #[error("{0:?} is a missing include")]
    MissingInclude(String),
    /// Two sources in one namespace share a name.
    #[error("name collision with {0:?}")]
    NameCollision(String),
    /// A line could not be translated.
    #[error("{name}:{line}: bad line {text:?}: {reason}")]
    BadLine {
        /// Name of the source holding the line.
        name: String,
        /// 1-indexed line number in that source; 0 for the source itself.
        line: usize,
        /// The offending line as written.
        text: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A file-backed source could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        error: io::Error,
    },
}

impl TranslatorError {
    pub(crate) fn bad_line(
        name: &str,
        line: usize,
        text: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::BadLine {
            name: name.to_string(),
            line,
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}
