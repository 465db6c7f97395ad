//! # Lexicon Store
//!
//! The dictionary the annotator consults for word-shaped tokens. The store is
//! read-only; the annotator only ever asks two questions:
//!
//! - which form IDs match a glob pattern ([`LexiconStore::search_forms`]),
//! - what is the full record of a form ([`LexiconStore::form_record`]).
//!
//! Two implementations ship with the crate: [`MemoryLexicon`], a small
//! in-memory dictionary used by tests and the web demo, and
//! `SqliteLexicon` (feature `sqlite`) over the dictionary database.
//!
//! ## Query syntax
//!
//! Queries are glob patterns over Belarusian letters: `?` (one character),
//! `*` (any run), `[абв]`, `[а-в]` and `[!абв]`. Any other character makes
//! the query invalid ([`validate_query`]).

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SlounikError};
use crate::tagger::{AnalysisResult, Features, Upos};

pub type FormId = i64;
pub type LemmaId = i64;

/// Glob syntax characters accepted in queries besides the letters.
pub const QUERY_SYNTAX: &[char] = &['-', '\'', '‘', '’', '!', '?', '*', '[', ']'];

fn is_query_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё' | 'ў' | 'Ў' | 'і' | 'І')
}

/// Rejects queries with characters outside the query alphabet.
pub fn validate_query(query: &str) -> Result<()> {
    match query
        .chars()
        .find(|&c| !is_query_letter(c) && !QUERY_SYNTAX.contains(&c))
    {
        Some(character) => Err(SlounikError::InvalidQuery {
            query: query.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

/// Validates and normalises a query before it reaches a store.
///
/// Word-initial `ў` is stored as `у` in the dictionary, so a leading `ў`/`Ў`
/// is replaced; case-insensitive queries are lowercased.
pub fn normalize_query(query: &str, case_sensitive: bool) -> Result<String> {
    validate_query(query)?;
    let mut normalized = if let Some(rest) = query.strip_prefix('ў') {
        format!("у{rest}")
    } else if let Some(rest) = query.strip_prefix('Ў') {
        format!("У{rest}")
    } else {
        query.to_string()
    };
    if !case_sensitive {
        normalized = normalized.to_lowercase();
    }
    Ok(normalized)
}

/// Full record of one word form: the form, its lemma and the merged features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub form_id: FormId,
    pub lemma_id: LemmaId,
    pub form: String,
    pub lemma: String,
    pub upos: Upos,
    /// Form features overridden by lemma features of the same name
    pub features: Features,
    pub variant: Option<u32>,
    pub accent: Option<String>,
}

impl FormRecord {
    pub fn into_analysis(self) -> AnalysisResult {
        AnalysisResult::LexiconMatch {
            form_id: self.form_id,
            lemma: self.lemma,
            upos: self.upos,
            features: self.features,
            variant: self.variant,
            accent: self.accent,
        }
    }
}

/// Read-only dictionary consulted by the annotator.
///
/// Implementations must be shareable across the worker threads that annotate
/// the tokens of a sentence.
pub trait LexiconStore: Send + Sync {
    /// IDs of the forms matching `pattern`, ordered by form text.
    ///
    /// With `case_sensitive == false` the lowercased pattern is matched
    /// against lowercased forms.
    fn search_forms(&self, pattern: &str, case_sensitive: bool) -> Result<Vec<FormId>>;

    /// The full record of a form, or `None` for an unknown ID.
    fn form_record(&self, id: FormId) -> Result<Option<FormRecord>>;
}

/// A lemma of the in-memory dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LemmaEntry {
    pub id: LemmaId,
    pub lemma: String,
    pub upos: Upos,
    pub features: Features,
}

/// A word form of the in-memory dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntry {
    pub id: FormId,
    pub lemma_id: LemmaId,
    pub form: String,
    pub features: Features,
    pub variant: Option<u32>,
    pub accent: Option<String>,
}

/// In-memory [`LexiconStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLexicon {
    lemmas: BTreeMap<LemmaId, LemmaEntry>,
    forms: BTreeMap<FormId, FormEntry>,
}

impl MemoryLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_lemma(&mut self, entry: LemmaEntry) {
        self.lemmas.insert(entry.id, entry);
    }

    pub fn insert_form(&mut self, entry: FormEntry) {
        self.forms.insert(entry.id, entry);
    }

    /// Adds a lemma together with its forms, given as `(form, features)`
    /// pairs. Form IDs continue from the highest one in use.
    pub fn add_paradigm(&mut self, lemma: LemmaEntry, forms: &[(&str, &[(&str, &str)])]) {
        let lemma_id = lemma.id;
        self.insert_lemma(lemma);
        for (form, features) in forms {
            let id = self.forms.keys().next_back().map_or(1, |last| last + 1);
            self.insert_form(FormEntry {
                id,
                lemma_id,
                form: form.to_string(),
                features: features.iter().copied().collect(),
                variant: Some(1),
                accent: None,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

fn compile_pattern(query: &str) -> Result<Pattern> {
    Pattern::new(query).map_err(|err| SlounikError::InvalidQuery {
        query: query.to_string(),
        character: query.chars().nth(err.pos).unwrap_or('['),
    })
}

impl LexiconStore for MemoryLexicon {
    fn search_forms(&self, pattern: &str, case_sensitive: bool) -> Result<Vec<FormId>> {
        let query = normalize_query(pattern, case_sensitive)?;
        let glob = compile_pattern(&query)?;
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let mut matches: Vec<(&str, FormId)> = self
            .forms
            .values()
            .filter(|entry| {
                if case_sensitive {
                    glob.matches_with(&entry.form, options)
                } else {
                    glob.matches_with(&entry.form.to_lowercase(), options)
                }
            })
            .map(|entry| (entry.form.as_str(), entry.id))
            .collect();
        matches.sort();
        debug!(query = %query, case_sensitive, found = matches.len(), "memory lexicon search");
        Ok(matches.into_iter().map(|(_, id)| id).collect())
    }

    fn form_record(&self, id: FormId) -> Result<Option<FormRecord>> {
        let Some(form) = self.forms.get(&id) else {
            return Ok(None);
        };
        let Some(lemma) = self.lemmas.get(&form.lemma_id) else {
            return Ok(None);
        };
        let mut features = form.features.clone();
        features.extend(lemma.features.clone());
        Ok(Some(FormRecord {
            form_id: form.id,
            lemma_id: lemma.id,
            form: form.form.clone(),
            lemma: lemma.lemma.clone(),
            upos: lemma.upos,
            features,
            variant: form.variant,
            accent: form.accent.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> MemoryLexicon {
        let mut lexicon = MemoryLexicon::new();
        lexicon.add_paradigm(
            LemmaEntry {
                id: 10,
                lemma: "вуліца".to_string(),
                upos: Upos::Noun,
                features: [("Gender", "Fem")].into_iter().collect(),
            },
            &[
                ("вуліца", &[("Case", "Nom"), ("Number", "Sing")]),
                ("вуліцы", &[("Case", "Gen"), ("Number", "Sing")]),
                ("Вуліца", &[("Case", "Nom"), ("Number", "Sing"), ("Gender", "Masc")]),
            ],
        );
        lexicon
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("вул*").is_ok());
        assert!(validate_query("[!а]ўся").is_ok());
        let err = validate_query("street").unwrap_err();
        assert!(matches!(err, SlounikError::InvalidQuery { character: 's', .. }));
        assert!(validate_query("12:34").is_err());
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("ўсё", true).unwrap(), "усё");
        assert_eq!(normalize_query("Ўладзімір", false).unwrap(), "уладзімір");
        assert_eq!(normalize_query("праўда", true).unwrap(), "праўда");
    }

    #[test]
    fn test_case_sensitive_search() {
        let lexicon = lexicon();
        assert_eq!(lexicon.search_forms("вуліца", true).unwrap(), vec![1]);
        assert_eq!(lexicon.search_forms("Вуліца", true).unwrap(), vec![3]);
        assert!(lexicon.search_forms("ВУЛІЦА", true).unwrap().is_empty());
    }

    #[test]
    fn test_case_insensitive_search_orders_by_form() {
        let lexicon = lexicon();
        assert_eq!(lexicon.search_forms("ВУЛІЦА", false).unwrap(), vec![3, 1]);
        assert_eq!(lexicon.search_forms("вуліц?", false).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_invalid_query_is_rejected() {
        let lexicon = lexicon();
        assert!(lexicon.search_forms("vulica", true).unwrap_err().is_validation());
        assert!(lexicon.search_forms("[вуліца", true).unwrap_err().is_validation());
    }

    #[test]
    fn test_lemma_features_override_form_features() {
        let lexicon = lexicon();
        let record = lexicon.form_record(3).unwrap().unwrap();
        assert_eq!(record.lemma, "вуліца");
        assert_eq!(record.features.to_conllu(), "Case=Nom|Gender=Fem|Number=Sing");
        assert!(lexicon.form_record(99).unwrap().is_none());
    }
}
