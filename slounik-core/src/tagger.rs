//! # Annotation Data Model
//!
//! Types produced by the annotation pass and consumed by the tabular codec.
//!
//! ## Hierarchy
//!
//! ```text
//! AnnotatedDocument
//! └── AnnotatedParagraph (id, text)
//!     └── AnnotatedSentence (id, text)
//!         └── AnnotatedToken (id, form, space_after)
//!             └── AnalysisResult × N
//! ```
//!
//! IDs are 1-based and dense, assigned in production order. A token in tree
//! mode may carry no results at all; in tabular mode it always carries at
//! least one (a [`AnalysisResult::Placeholder`] when nothing else matched).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Placeholder for an unset CoNLL-U column.
pub const PLACEHOLDER: &str = "_";

/// Feature names agreed between the lexicon store and the annotator.
///
/// `<Pos>Type` names are derived from the part of speech (`PronType`,
/// `NumType`, ...), so only the common ones are listed here.
pub const FEATURE_VOCABULARY: &[&str] = &[
    "Abbr", "AdjType", "Animacy", "Aspect", "Case", "Degree", "Gender", "InflClass",
    "Mood", "NounType", "NumForm", "NumType", "Number", "Origin", "Person", "Personal",
    "Poss", "PronType", "Reflex", "Short", "SubCat", "Tense", "VerbForm", "VerbType",
    "Voice",
];

/// Universal part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Upos {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    X,
}

impl Upos {
    /// Tag as written in the UPOS column (ex: "NOUN", "PUNCT")
    pub fn tag(&self) -> &'static str {
        match self {
            Upos::Adj => "ADJ",
            Upos::Adp => "ADP",
            Upos::Adv => "ADV",
            Upos::Aux => "AUX",
            Upos::Cconj => "CCONJ",
            Upos::Det => "DET",
            Upos::Intj => "INTJ",
            Upos::Noun => "NOUN",
            Upos::Num => "NUM",
            Upos::Part => "PART",
            Upos::Pron => "PRON",
            Upos::Propn => "PROPN",
            Upos::Punct => "PUNCT",
            Upos::Sconj => "SCONJ",
            Upos::Sym => "SYM",
            Upos::Verb => "VERB",
            Upos::X => "X",
        }
    }

    /// Parses a UPOS column value (ex: "PRON" → Some(Pron))
    pub fn from_tag(s: &str) -> Option<Self> {
        let upos = match s {
            "ADJ" => Upos::Adj,
            "ADP" => Upos::Adp,
            "ADV" => Upos::Adv,
            "AUX" => Upos::Aux,
            "CCONJ" => Upos::Cconj,
            "DET" => Upos::Det,
            "INTJ" => Upos::Intj,
            "NOUN" => Upos::Noun,
            "NUM" => Upos::Num,
            "PART" => Upos::Part,
            "PRON" => Upos::Pron,
            "PROPN" => Upos::Propn,
            "PUNCT" => Upos::Punct,
            "SCONJ" => Upos::Sconj,
            "SYM" => Upos::Sym,
            "VERB" => Upos::Verb,
            "X" => Upos::X,
            _ => return None,
        };
        Some(upos)
    }
}

/// Morphological features, kept sorted by name.
///
/// The sort order is what the FEATS column requires, so serialization is a
/// plain walk over the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(BTreeMap<String, String>);

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a feature. Later values win.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !is_known_feature(&name) {
            debug!(feature = %name, "feature outside the shared vocabulary");
        }
        self.0.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merges `other` into `self`; features of `other` override.
    pub fn extend(&mut self, other: Features) {
        self.0.extend(other.0);
    }

    /// FEATS column value: `Name=Value` pairs joined by `|`, or `_`.
    pub fn to_conllu(&self) -> String {
        if self.0.is_empty() {
            return PLACEHOLDER.to_string();
        }
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Parses a FEATS column value. `_` yields an empty set; malformed pairs
    /// are skipped.
    pub fn from_conllu(column: &str) -> Self {
        if column == PLACEHOLDER {
            return Self::default();
        }
        column
            .split('|')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

impl FromIterator<(String, String)> for Features {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Features(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Features {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Features(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Whether `name` belongs to the shared feature vocabulary.
pub fn is_known_feature(name: &str) -> bool {
    FEATURE_VOCABULARY.contains(&name) || (name.len() > 4 && name.ends_with("Type"))
}

/// One analysis of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    /// A record resolved through the lexicon store.
    LexiconMatch {
        form_id: i64,
        lemma: String,
        upos: Upos,
        features: Features,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<u32>,
        /// Stress position(s) as stored in the dictionary (ex: "2", "0-3").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accent: Option<String>,
    },
    /// A category assigned by the heuristic rules (numbers, punctuation...).
    HeuristicMatch {
        lemma: String,
        upos: Upos,
        features: Features,
    },
    /// Unknown token; only emitted where tabular output requires a result.
    Placeholder,
}

impl AnalysisResult {
    pub fn lemma(&self) -> &str {
        match self {
            AnalysisResult::LexiconMatch { lemma, .. }
            | AnalysisResult::HeuristicMatch { lemma, .. } => lemma,
            AnalysisResult::Placeholder => PLACEHOLDER,
        }
    }

    pub fn upos(&self) -> Upos {
        match self {
            AnalysisResult::LexiconMatch { upos, .. }
            | AnalysisResult::HeuristicMatch { upos, .. } => *upos,
            AnalysisResult::Placeholder => Upos::X,
        }
    }

    /// FEATS column value for this analysis
    pub fn feats(&self) -> String {
        match self {
            AnalysisResult::LexiconMatch { features, .. }
            | AnalysisResult::HeuristicMatch { features, .. } => features.to_conllu(),
            AnalysisResult::Placeholder => PLACEHOLDER.to_string(),
        }
    }

    /// Projection onto the (LEMMA, UPOS, FEATS) columns.
    ///
    /// Two analyses that differ only in stress position or variant collapse
    /// to the same projection.
    pub fn tabular_key(&self) -> (String, Upos, String) {
        (self.lemma().to_string(), self.upos(), self.feats())
    }
}

/// Output structure requested for an annotation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Nested analysis tree; unmatched tokens carry no results.
    Tree,
    /// Rows for the tabular codec; every token carries at least one result.
    Tabular,
}

impl OutputMode {
    /// Results for a token nothing could classify
    pub fn unmatched(&self) -> Vec<AnalysisResult> {
        match self {
            OutputMode::Tree => vec![],
            OutputMode::Tabular => vec![AnalysisResult::Placeholder],
        }
    }
}

/// A token with its analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    /// 1-based position among the sentence's non-whitespace tokens
    pub id: usize,
    pub form: String,
    /// `false` when the next raw token in the sentence is not whitespace
    pub space_after: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<AnalysisResult>,
}

impl AnnotatedToken {
    /// MISC column value
    pub fn misc(&self) -> &'static str {
        if self.space_after {
            PLACEHOLDER
        } else {
            "SpaceAfter=No"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub id: usize,
    /// Concatenated raw forms, without the stripped leading space
    pub text: String,
    pub tokens: Vec<AnnotatedToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedParagraph {
    pub id: usize,
    /// Trimmed paragraph text
    pub text: String,
    pub sentences: Vec<AnnotatedSentence>,
}

impl AnnotatedParagraph {
    /// Paragraph label used in the tabular comments (ex: "p2")
    pub fn label(&self) -> String {
        format!("p{}", self.id)
    }

    /// Sentence label used in the tabular comments (ex: "p2s1")
    pub fn sentence_label(&self, sentence: &AnnotatedSentence) -> String {
        format!("p{}s{}", self.id, sentence.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub paragraphs: Vec<AnnotatedParagraph>,
}

impl AnnotatedDocument {
    /// Iterates over all tokens in document order
    pub fn tokens(&self) -> impl Iterator<Item = &AnnotatedToken> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.sentences.iter())
            .flat_map(|s| s.tokens.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upos_tag_round_trip() {
        for upos in [Upos::Cconj, Upos::Propn, Upos::Punct, Upos::X] {
            assert_eq!(Upos::from_tag(upos.tag()), Some(upos));
        }
        assert_eq!(Upos::from_tag("noun"), None);
    }

    #[test]
    fn test_features_sorted_by_name() {
        let mut features = Features::new();
        features.insert("Number", "Sing");
        features.insert("Case", "Nom");
        features.insert("Gender", "Fem");
        assert_eq!(features.to_conllu(), "Case=Nom|Gender=Fem|Number=Sing");
    }

    #[test]
    fn test_empty_features_placeholder() {
        assert_eq!(Features::new().to_conllu(), "_");
        assert!(Features::from_conllu("_").is_empty());
    }

    #[test]
    fn test_features_from_conllu() {
        let features = Features::from_conllu("Abbr=Yes|Case=Gen|broken");
        assert_eq!(features.len(), 2);
        assert_eq!(features.get("Case"), Some("Gen"));
    }

    #[test]
    fn test_later_feature_overrides() {
        let mut form: Features = [("Gender", "Masc")].into_iter().collect();
        let lemma: Features = [("Gender", "Fem"), ("Animacy", "Anim")].into_iter().collect();
        form.extend(lemma);
        assert_eq!(form.get("Gender"), Some("Fem"));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn test_known_feature_vocabulary() {
        assert!(is_known_feature("Case"));
        assert!(is_known_feature("PropnType"));
        assert!(!is_known_feature("Type"));
        assert!(!is_known_feature("Colour"));
    }

    #[test]
    fn test_tabular_key_ignores_accent() {
        let a = AnalysisResult::LexiconMatch {
            form_id: 1,
            lemma: "мука".into(),
            upos: Upos::Noun,
            features: Features::new(),
            variant: Some(1),
            accent: Some("2".into()),
        };
        let b = AnalysisResult::LexiconMatch {
            form_id: 2,
            lemma: "мука".into(),
            upos: Upos::Noun,
            features: Features::new(),
            variant: Some(2),
            accent: Some("4".into()),
        };
        assert_ne!(a, b);
        assert_eq!(a.tabular_key(), b.tabular_key());
    }

    #[test]
    fn test_placeholder_columns() {
        let p = AnalysisResult::Placeholder;
        assert_eq!(p.tabular_key(), ("_".to_string(), Upos::X, "_".to_string()));
    }

    #[test]
    fn test_results_omitted_when_empty() {
        let token = AnnotatedToken {
            id: 1,
            form: "👻".into(),
            space_after: true,
            results: vec![],
        };
        let json = serde_json::to_value(&token).unwrap();
        assert!(json.get("results").is_none());
    }

    #[test]
    fn test_misc_column() {
        let mut token = AnnotatedToken {
            id: 1,
            form: "спаў".into(),
            space_after: true,
            results: vec![],
        };
        assert_eq!(token.misc(), "_");
        token.space_after = false;
        assert_eq!(token.misc(), "SpaceAfter=No");
    }
}
