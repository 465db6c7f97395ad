//! # Annotator Configuration
//!
//! Settings read once at start-up from a TOML file. Every field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! extended = true
//! parallel = true
//! stop_words = [101, 2048]
//! stop_words_file = "assets/stop_words.txt"
//! database = "assets/dictionary.db"
//! ```
//!
//! The stop-word list resolved from it ([`StopWords`]) is immutable and is
//! attached to the [`crate::pipeline::Annotator`] at construction.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SlounikError};
use crate::lexicon::LemmaId;

/// Lemma IDs excluded from lexicon results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopWords(BTreeSet<LemmaId>);

impl StopWords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = LemmaId>) -> Self {
        StopWords(ids.into_iter().collect())
    }

    /// Parses a comma-separated list of lemma IDs.
    ///
    /// Items that are not non-negative integers are skipped with a warning;
    /// duplicates collapse.
    pub fn parse_list(contents: &str) -> Self {
        let mut ids = BTreeSet::new();
        for item in contents.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.parse::<LemmaId>() {
                Ok(id) if item.chars().all(|c| c.is_ascii_digit()) => {
                    ids.insert(id);
                }
                _ => warn!(item, "skipping invalid stop-word entry"),
            }
        }
        StopWords(ids)
    }

    /// Reads a stop-word file (`.txt`, comma-separated lemma IDs).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().map_or(true, |ext| ext != "txt") {
            return Err(SlounikError::Config(format!(
                "stop-word file must be a .txt file: {}",
                path.display()
            )));
        }
        let stop_words = Self::parse_list(&fs::read_to_string(path)?);
        info!(path = %path.display(), count = stop_words.len(), "stop words loaded");
        Ok(stop_words)
    }

    pub fn contains(&self, id: LemmaId) -> bool {
        self.0.contains(&id)
    }

    pub fn merge(&mut self, other: StopWords) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LemmaId> + '_ {
        self.0.iter().copied()
    }
}

fn default_true() -> bool {
    true
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotatorConfig {
    /// Classify tokens outside the dictionary through the heuristic categories
    #[serde(default = "default_true")]
    pub extended: bool,
    /// Annotate the tokens of a sentence on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub stop_words: Vec<LemmaId>,
    #[serde(default)]
    pub stop_words_file: Option<PathBuf>,
    /// Dictionary database used by the web service
    #[serde(default)]
    pub database: Option<PathBuf>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        AnnotatorConfig {
            extended: true,
            parallel: true,
            stop_words: Vec::new(),
            stop_words_file: None,
            database: None,
        }
    }
}

impl AnnotatorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Inline stop words merged with the stop-word file, if any.
    pub fn stop_words(&self) -> Result<StopWords> {
        let mut stop_words = StopWords::from_ids(self.stop_words.iter().copied());
        if let Some(file) = &self.stop_words_file {
            stop_words.merge(StopWords::load(file)?);
        }
        Ok(stop_words)
    }
}
