//! # slounik-core: Rule-Based Annotation of Belarusian Text
//!
//! This crate splits raw Belarusian text into paragraphs, sentences and
//! tokens, annotates every token through a dictionary lookup or a heuristic
//! category, and serializes the result either as a nested tree (JSON) or as
//! a CoNLL-U table that can later be re-parsed and completed.
//!
//! ## Architecture
//!
//! The pass is a linear pipeline:
//!
//! 1.  **Input**: raw text; paragraphs are split on `\n`.
//! 2.  **Tokenization** ([`tokenizer`]): an ordered cascade of matchers
//!     (phones, dates, URLs, abbreviations, words, numbers...).
//! 3.  **Segmentation** ([`segmenter`]): abbreviation merge and sentence
//!     boundaries.
//! 4.  **Annotation** ([`pipeline`]): heuristic categories ([`rule_based`])
//!     and lexicon lookups ([`lexicon`], and `sqlite` behind the feature of
//!     the same name).
//! 5.  **Output**: an [`AnnotatedDocument`] ([`tagger`]), optionally encoded
//!     by [`conllu`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use slounik_core::{conllu, corpus, Annotator, OutputMode};
//!
//! let annotator = Annotator::new(Arc::new(corpus::sample_lexicon()));
//!
//! let document = annotator
//!     .annotate_text("Ён спаў.", OutputMode::Tabular, true)
//!     .unwrap();
//! let table = conllu::encode(&document);
//! assert!(table.starts_with("# newpar id = p1\n"));
//!
//! // Rows with `_ X _` are filled in; everything else passes through.
//! let completed = conllu::complete(&annotator, "1\tЁн\t_\tX\t_\t_\t_\t_\t_\t_", true);
//! assert!(completed.starts_with("1\tЁн\tён\tPRON"));
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: the orchestrator tying all stages together.
//! - [`config`]: TOML configuration and stop words.
//! - [`error`]: the error taxonomy shared by all stages.
//! - [`corpus`]: demo texts and a sample dictionary.

pub mod config;
pub mod conllu;
pub mod corpus;
pub mod error;
pub mod lexicon;
pub mod pipeline;
pub mod rule_based;
pub mod segmenter;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod tagger;
pub mod tokenizer;

pub use config::{AnnotatorConfig, StopWords};
pub use error::{Result, SlounikError};
pub use lexicon::{FormRecord, LexiconStore, MemoryLexicon};
pub use pipeline::{Annotator, PipelineEvent};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLexicon;
pub use tagger::{AnalysisResult, AnnotatedDocument, AnnotatedToken, Features, OutputMode, Upos};
pub use tokenizer::{tokenize, Token};
