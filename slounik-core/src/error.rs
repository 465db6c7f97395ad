//! # Error Taxonomy
//!
//! Errors shared by every stage of the annotation pipeline.
//!
//! | Variant              | Raised by                          | Effect                                   |
//! |----------------------|------------------------------------|------------------------------------------|
//! | `InvalidQuery`       | lexicon query validation           | that lookup yields no matches            |
//! | `LexiconUnavailable` | store open/query failure           | tree mode aborts, tabular mode degrades  |
//! | `Config`             | TOML config and stop-word sources  | construction fails                       |
//! | `Io`                 | configuration file reads           | construction fails                       |
//!
//! Tabular completion ([`crate::conllu::complete`]) never surfaces an error:
//! rows it cannot handle are passed through verbatim.

use thiserror::Error;

/// Errors produced by the annotation core.
#[derive(Error, Debug)]
pub enum SlounikError {
    /// A lexicon query contains a character outside the query alphabet.
    #[error("invalid query {query:?}: character {character:?} is not allowed")]
    InvalidQuery {
        /// The rejected query
        query: String,
        /// The first offending character
        character: char,
    },

    /// The lexicon store could not be opened or queried.
    #[error("lexicon unavailable: {0}")]
    LexiconUnavailable(String),

    /// Malformed configuration or stop-word source.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while reading configuration files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlounikError {
    /// Whether this error only invalidates a single lookup.
    pub fn is_validation(&self) -> bool {
        matches!(self, SlounikError::InvalidQuery { .. })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SlounikError {
    fn from(err: rusqlite::Error) -> Self {
        SlounikError::LexiconUnavailable(err.to_string())
    }
}

impl From<toml::de::Error> for SlounikError {
    fn from(err: toml::de::Error) -> Self {
        SlounikError::Config(err.to_string())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, SlounikError>;
