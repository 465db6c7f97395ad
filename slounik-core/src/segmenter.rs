//! # Sentence Segmenter
//!
//! Groups the tokens of one paragraph into sentences in two stages:
//!
//! 1. **Abbreviation merge** ([`merge_abbreviations`]): a bare `.` that follows
//!    an abbreviation which never ends a sentence (`гл`, `напр`) is glued to it,
//!    so `гл.` cannot be mistaken for a boundary.
//! 2. **Boundary split** ([`split_sentences`]): a sentence ends at (and
//!    includes) a terminator such as `.`, `?!`, `…` or an emoticon like `:)`.
//!
//! A single whitespace token at the start of each sentence is moved out of the
//! sentence into [`Sentence::leading_space`], so the segmentation stays
//! reversible.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rule_based::{is_non_final_abbreviation, is_sentence_end};
use crate::tokenizer::{tokenize, Token};

/// One sentence of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    /// The whitespace token stripped from the start of the sentence, if any
    pub leading_space: Option<Token>,
}

impl Sentence {
    /// Text of the sentence, without the stripped leading space.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in source order, with the stripped leading space put back.
    pub fn source_tokens(&self) -> impl Iterator<Item = &Token> {
        self.leading_space.iter().chain(self.tokens.iter())
    }
}

/// Glues a bare `.` to a preceding non-final abbreviation and re-indexes.
pub fn merge_abbreviations(tokens: Vec<Token>) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match merged.last_mut() {
            Some(prev) if token.text == "." && is_non_final_abbreviation(&prev.text) => {
                debug!(abbreviation = %prev.text, "merging full stop into abbreviation");
                prev.text.push('.');
                prev.end = token.end;
            }
            _ => merged.push(token),
        }
    }
    for (i, token) in merged.iter_mut().enumerate() {
        token.index = i;
    }
    merged
}

/// Splits a token sequence into sentences at inclusive boundaries.
///
/// An empty sequence has no sentences; a sequence without boundaries is one
/// sentence.
pub fn split_sentences(tokens: Vec<Token>) -> Vec<Sentence> {
    let mut segments: Vec<Vec<Token>> = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        let boundary = is_sentence_end(&token.text);
        current.push(token);
        if boundary {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
        .into_iter()
        .map(|mut tokens| {
            let leading_space = if tokens.first().is_some_and(Token::is_whitespace) {
                Some(tokens.remove(0))
            } else {
                None
            };
            Sentence {
                tokens,
                leading_space,
            }
        })
        .collect()
}

/// Tokenizes one paragraph and segments it into sentences.
pub fn segment_paragraph(paragraph: &str) -> Vec<Sentence> {
    let sentences = split_sentences(merge_abbreviations(tokenize(paragraph)));
    debug!(count = sentences.len(), "paragraph segmented");
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn detached(texts: &[&str]) -> Vec<Token> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Token::detached(*t, i))
            .collect()
    }

    fn sentence_texts(sentences: &[Sentence]) -> Vec<Vec<String>> {
        sentences
            .iter()
            .map(|s| s.tokens.iter().map(|t| t.text.clone()).collect())
            .collect()
    }

    #[test]
    fn test_single_sentence_with_boundary() {
        let sentences = segment_paragraph("Ён спаў.");
        assert_eq!(sentence_texts(&sentences), vec![vec!["Ён", " ", "спаў", "."]]);
        assert_eq!(sentences[0].text(), "Ён спаў.");
    }

    #[test]
    fn test_abbreviation_merge() {
        let merged = merge_abbreviations(tokenize("гл. вышэй"));
        let texts: Vec<&str> = merged.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["гл.", " ", "вышэй"]);
        assert_eq!(merged[0].end, "гл.".len());
        assert_eq!(merged[2].index, 2);
        assert_eq!(segment_paragraph("гл. вышэй").len(), 1);
    }

    #[test]
    fn test_abbreviation_merge_ignores_case() {
        let merged = merge_abbreviations(detached(&["Напр", ".", " ", "так"]));
        assert_eq!(merged[0].text, "Напр.");
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_ambiguous_abbreviation_is_not_merged() {
        let merged = merge_abbreviations(detached(&["тыс", "."]));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_emoticon_ends_sentence() {
        let sentences = segment_paragraph("Прывітанне :) Як справы?");
        assert_eq!(
            sentence_texts(&sentences),
            vec![
                vec!["Прывітанне", " ", ":)"],
                vec!["Як", " ", "справы", "?"],
            ]
        );
        assert_eq!(
            sentences[1].leading_space.as_ref().map(|t| t.text.as_str()),
            Some(" ")
        );
    }

    #[test]
    fn test_only_one_leading_space_is_stripped() {
        let sentences = split_sentences(detached(&["Так", ".", " ", " ", "Не"]));
        assert_eq!(sentence_texts(&sentences)[1], vec![" ", "Не"]);
    }

    #[test]
    fn test_remainder_without_boundary() {
        let sentences = split_sentences(detached(&["а", ".", " ", "б"]));
        assert_eq!(sentence_texts(&sentences), vec![vec!["а", "."], vec!["б"]]);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(split_sentences(Vec::new()).is_empty());
        assert!(segment_paragraph("").is_empty());
    }

    proptest! {
        #[test]
        fn prop_segmentation_is_reversible(
            parts in proptest::collection::vec(
                prop_oneof![
                    Just("."), Just(" "), Just("слова"), Just(":)"), Just("?!"),
                    Just(","), Just("гл"), Just("\t"),
                ],
                0..30,
            )
        ) {
            let tokens = detached(&parts);
            let sentences = split_sentences(tokens.clone());
            let rebuilt: Vec<Token> = sentences
                .iter()
                .flat_map(|s| s.source_tokens().cloned())
                .collect();
            prop_assert_eq!(rebuilt, tokens);
        }
    }
}
