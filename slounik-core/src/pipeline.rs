//! # Annotation Pipeline
//!
//! The [`Annotator`] drives the whole pass over a text:
//!
//! ```text
//! text ─► paragraphs (split on '\n', trimmed)
//!      ─► tokenizer ─► abbreviation merge ─► sentence split
//!      ─► per-token annotation (heuristics / lexicon)
//!      ─► AnnotatedDocument
//! ```
//!
//! ## Per-token decision order
//!
//! 1. With `extended`, the cheap checks ([`cheap_category`]): punctuation,
//!    symbols, digits, stop-less abbreviations, emoticons, spaced numbers.
//! 2. Word-shaped tokens go to the lexicon: a case-sensitive search first,
//!    then a case-insensitive one if nothing (outside the stop words) matched.
//! 3. With `extended`, the pattern checks ([`pattern_category`]): numbers,
//!    codes, abbreviations.
//! 4. Anything left gets [`OutputMode::unmatched`].
//!
//! The output mode is chosen once per call and passed down; tabular mode
//! always yields at least one result per token.
//!
//! ## Events
//!
//! [`Annotator::annotate_streaming`] pushes a [`PipelineEvent`] for every
//! stage over an `mpsc` channel, so the WebSocket server can replay the pass
//! step by step.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{AnnotatorConfig, StopWords};
use crate::error::{Result, SlounikError};
use crate::lexicon::{FormRecord, LexiconStore};
use crate::rule_based::{cheap_category, is_word, pattern_category};
use crate::segmenter::segment_paragraph;
use crate::tagger::{
    AnalysisResult, AnnotatedDocument, AnnotatedParagraph, AnnotatedSentence, AnnotatedToken,
    OutputMode,
};
use crate::tokenizer::Token;

/// Events emitted while a text is being annotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// A paragraph was tokenized and split into sentences
    ParagraphSegmented {
        paragraph_id: usize,
        text: String,
        sentences: usize,
    },
    /// The raw tokens of one sentence, before annotation
    SentenceSegmented {
        paragraph_id: usize,
        sentence_id: usize,
        tokens: Vec<Token>,
    },
    TokenAnnotated {
        paragraph_id: usize,
        sentence_id: usize,
        token: AnnotatedToken,
    },
    /// The pass finished; carries the whole document
    Done {
        document: AnnotatedDocument,
        total_tokens: usize,
        processing_ms: u64,
    },
    /// The pass was aborted
    Error { message: String },
}

/// The annotation orchestrator.
///
/// Holds the lexicon and the stop words; both are read-only for the lifetime
/// of the annotator, so one instance can serve concurrent requests.
#[derive(Clone)]
pub struct Annotator {
    lexicon: Arc<dyn LexiconStore>,
    stop_words: StopWords,
    parallel: bool,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("stop_words", &self.stop_words.len())
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Annotator {
    pub fn new(lexicon: Arc<dyn LexiconStore>) -> Self {
        Self {
            lexicon,
            stop_words: StopWords::default(),
            parallel: true,
        }
    }

    /// Builds an annotator with the stop words and threading policy of `config`.
    pub fn with_config(lexicon: Arc<dyn LexiconStore>, config: &AnnotatorConfig) -> Result<Self> {
        Ok(Self::new(lexicon)
            .with_stop_words(config.stop_words()?)
            .with_parallel(config.parallel))
    }

    pub fn with_stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = stop_words;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Records for one search pass, with stop-word lemmas removed.
    fn search(&self, token: &str, case_sensitive: bool) -> Result<Vec<FormRecord>> {
        let ids = match self.lexicon.search_forms(token, case_sensitive) {
            Ok(ids) => ids,
            Err(err) if err.is_validation() => {
                debug!(token, %err, "query rejected");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.lexicon.form_record(id)? {
                if !self.stop_words.contains(record.lemma_id) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Lexicon analyses of a word-shaped token.
    fn lookup(&self, token: &str, mode: OutputMode) -> Result<Vec<AnalysisResult>> {
        let mut records = self.search(token, true)?;
        if records.is_empty() {
            records = self.search(token, false)?;
        }

        let mut results: Vec<AnalysisResult> = Vec::with_capacity(records.len());
        for analysis in records.into_iter().map(FormRecord::into_analysis) {
            // rows cannot express stress, so analyses differing only in it collapse
            if mode == OutputMode::Tabular
                && results
                    .iter()
                    .any(|seen| seen.tabular_key() == analysis.tabular_key())
            {
                continue;
            }
            results.push(analysis);
        }
        Ok(results)
    }

    /// Resolves the analyses of a single token.
    ///
    /// A lexicon failure aborts the call in tree mode; in tabular mode the
    /// token degrades to a placeholder.
    pub fn annotate_token(
        &self,
        token: &str,
        mode: OutputMode,
        extended: bool,
    ) -> Result<Vec<AnalysisResult>> {
        if extended {
            if let Some(category) = cheap_category(token) {
                return Ok(vec![category.analysis(token)]);
            }
        }

        if is_word(token) {
            return match self.lookup(token, mode) {
                Ok(results) if results.is_empty() => Ok(mode.unmatched()),
                Ok(results) => Ok(results),
                Err(err) if mode == OutputMode::Tabular => {
                    warn!(token, %err, "lexicon lookup failed, emitting placeholder");
                    Ok(vec![AnalysisResult::Placeholder])
                }
                Err(err) => Err(err),
            };
        }

        if extended {
            if let Some(category) = pattern_category(token) {
                return Ok(vec![category.analysis(token)]);
            }
        }
        Ok(mode.unmatched())
    }

    /// Annotates the non-whitespace tokens of one sentence, numbered from 1.
    ///
    /// A token has no space after it when the next raw token is not
    /// whitespace; the last token of the sentence keeps its space.
    pub fn annotate_sentence(
        &self,
        tokens: &[Token],
        mode: OutputMode,
        extended: bool,
    ) -> Result<Vec<AnnotatedToken>> {
        let words: Vec<(usize, &Token)> = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| !token.is_whitespace())
            .collect();

        let annotate = |(id, (i, token)): (usize, &(usize, &Token))| -> Result<AnnotatedToken> {
            let space_after = tokens.get(i + 1).map_or(true, Token::is_whitespace);
            Ok(AnnotatedToken {
                id: id + 1,
                form: token.text.clone(),
                space_after,
                results: self.annotate_token(&token.text, mode, extended)?,
            })
        };

        if self.parallel {
            words.par_iter().enumerate().map(annotate).collect()
        } else {
            words.iter().enumerate().map(annotate).collect()
        }
    }

    fn annotate_document(
        &self,
        text: &str,
        mode: OutputMode,
        extended: bool,
        tx: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<AnnotatedDocument> {
        let emit = |event: PipelineEvent| {
            if let Some(tx) = tx {
                let _ = tx.send(event);
            }
        };

        let mut document = AnnotatedDocument::default();
        for paragraph_text in text.split('\n').map(str::trim).filter(|p| !p.is_empty()) {
            let paragraph_id = document.paragraphs.len() + 1;

            // === Stage 1: tokenization and segmentation ===
            let segmented: Vec<_> = segment_paragraph(paragraph_text)
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            debug!(paragraph_id, sentences = segmented.len(), "paragraph segmented");
            emit(PipelineEvent::ParagraphSegmented {
                paragraph_id,
                text: paragraph_text.to_string(),
                sentences: segmented.len(),
            });

            // === Stage 2: per-sentence annotation ===
            let mut sentences = Vec::with_capacity(segmented.len());
            for (i, sentence) in segmented.iter().enumerate() {
                let sentence_id = i + 1;
                emit(PipelineEvent::SentenceSegmented {
                    paragraph_id,
                    sentence_id,
                    tokens: sentence.tokens.clone(),
                });
                let tokens = self.annotate_sentence(&sentence.tokens, mode, extended)?;
                for token in &tokens {
                    emit(PipelineEvent::TokenAnnotated {
                        paragraph_id,
                        sentence_id,
                        token: token.clone(),
                    });
                }
                sentences.push(AnnotatedSentence {
                    id: sentence_id,
                    text: sentence.text(),
                    tokens,
                });
            }

            document.paragraphs.push(AnnotatedParagraph {
                id: paragraph_id,
                text: paragraph_text.to_string(),
                sentences,
            });
        }
        Ok(document)
    }

    /// Segments and annotates a whole text.
    pub fn annotate_text(
        &self,
        text: &str,
        mode: OutputMode,
        extended: bool,
    ) -> Result<AnnotatedDocument> {
        self.annotate_document(text, mode, extended, None)
    }

    /// Runs the pass while pushing progress events through `tx`.
    ///
    /// The last event is always either `Done` or `Error`.
    pub fn annotate_streaming(
        &self,
        text: &str,
        mode: OutputMode,
        extended: bool,
        tx: mpsc::Sender<PipelineEvent>,
    ) {
        let start = Instant::now();
        let event = match self.annotate_document(text, mode, extended, Some(&tx)) {
            Ok(document) => PipelineEvent::Done {
                total_tokens: document.tokens().count(),
                document,
                processing_ms: start.elapsed().as_millis() as u64,
            },
            Err(err) => {
                warn!(%err, "annotation aborted");
                err.into()
            }
        };
        let _ = tx.send(event);
    }
}

impl From<SlounikError> for PipelineEvent {
    fn from(err: SlounikError) -> Self {
        PipelineEvent::Error {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{FormId, LemmaEntry, MemoryLexicon};
    use crate::tagger::Upos;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixture() -> MemoryLexicon {
        let mut lexicon = MemoryLexicon::new();
        lexicon.add_paradigm(
            LemmaEntry {
                id: 1,
                lemma: "ён".to_string(),
                upos: Upos::Pron,
                features: [("PronType", "Prs"), ("Person", "3")].into_iter().collect(),
            },
            &[("ён", &[("Case", "Nom"), ("Gender", "Masc"), ("Number", "Sing")])],
        );
        lexicon.add_paradigm(
            LemmaEntry {
                id: 2,
                lemma: "спаць".to_string(),
                upos: Upos::Verb,
                features: [("Aspect", "Imp")].into_iter().collect(),
            },
            &[("спаў", &[("Gender", "Masc"), ("Number", "Sing"), ("Tense", "Past")])],
        );
        lexicon.add_paradigm(
            LemmaEntry {
                id: 3,
                lemma: "мой".to_string(),
                upos: Upos::Pron,
                features: [("Poss", "Yes")].into_iter().collect(),
            },
            &[("мая", &[("Case", "Nom"), ("Gender", "Fem")])],
        );
        lexicon.add_paradigm(
            LemmaEntry {
                id: 4,
                lemma: "май".to_string(),
                upos: Upos::Noun,
                features: [("Gender", "Masc")].into_iter().collect(),
            },
            &[("мая", &[("Case", "Gen"), ("Number", "Sing")])],
        );
        lexicon
    }

    fn annotator() -> Annotator {
        Annotator::new(Arc::new(fixture()))
    }

    /// Fails the test if any query reaches it.
    struct UnreachableLexicon;

    impl LexiconStore for UnreachableLexicon {
        fn search_forms(&self, pattern: &str, _: bool) -> Result<Vec<FormId>> {
            panic!("lexicon queried for {pattern:?}");
        }
        fn form_record(&self, id: FormId) -> Result<Option<FormRecord>> {
            panic!("lexicon queried for form {id}");
        }
    }

    struct BrokenLexicon;

    impl LexiconStore for BrokenLexicon {
        fn search_forms(&self, _: &str, _: bool) -> Result<Vec<FormId>> {
            Err(SlounikError::LexiconUnavailable("disk I/O error".to_string()))
        }
        fn form_record(&self, _: FormId) -> Result<Option<FormRecord>> {
            Err(SlounikError::LexiconUnavailable("disk I/O error".to_string()))
        }
    }

    struct CountingLexicon {
        inner: MemoryLexicon,
        searches: AtomicUsize,
    }

    impl LexiconStore for CountingLexicon {
        fn search_forms(&self, pattern: &str, case_sensitive: bool) -> Result<Vec<FormId>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.inner.search_forms(pattern, case_sensitive)
        }
        fn form_record(&self, id: FormId) -> Result<Option<FormRecord>> {
            self.inner.form_record(id)
        }
    }

    #[test]
    fn test_time_never_reaches_lexicon() {
        let annotator = Annotator::new(Arc::new(UnreachableLexicon));
        let results = annotator
            .annotate_token("12:34", OutputMode::Tabular, true)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].upos(), Upos::Num);
        assert_eq!(results[0].lemma(), "12:34");

        let document = annotator
            .annotate_text("12:34, 01.02.2003 :)", OutputMode::Tabular, true)
            .unwrap();
        assert_eq!(document.tokens().count(), 4);
    }

    #[test]
    fn test_cheap_checks_skip_lexicon() {
        let annotator = Annotator::new(Arc::new(UnreachableLexicon));
        for token in [".", "№", "2025", "км", ":)", "1 000"] {
            let results = annotator.annotate_token(token, OutputMode::Tree, true).unwrap();
            assert_eq!(results.len(), 1, "token {token:?}");
        }
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let results = annotator()
            .annotate_token("Ён", OutputMode::Tree, true)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lemma(), "ён");
        assert_eq!(
            results[0].feats(),
            "Case=Nom|Gender=Masc|Number=Sing|Person=3|PronType=Prs"
        );
    }

    #[test]
    fn test_case_sensitive_hit_skips_fallback() {
        let lexicon = Arc::new(CountingLexicon {
            inner: fixture(),
            searches: AtomicUsize::new(0),
        });
        let annotator = Annotator::new(lexicon.clone());
        annotator.annotate_token("спаў", OutputMode::Tree, true).unwrap();
        assert_eq!(lexicon.searches.load(Ordering::SeqCst), 1);
        annotator.annotate_token("Спаў", OutputMode::Tree, true).unwrap();
        assert_eq!(lexicon.searches.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stop_words_trigger_fallback_and_filter() {
        let annotator = annotator().with_stop_words(StopWords::from_ids([3]));
        let results = annotator
            .annotate_token("мая", OutputMode::Tabular, true)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lemma(), "май");
    }

    #[test]
    fn test_unknown_word_by_mode() {
        let annotator = annotator();
        assert!(annotator
            .annotate_token("невядомае", OutputMode::Tree, true)
            .unwrap()
            .is_empty());
        assert_eq!(
            annotator
                .annotate_token("невядомае", OutputMode::Tabular, true)
                .unwrap(),
            vec![AnalysisResult::Placeholder]
        );
    }

    #[test]
    fn test_not_extended_skips_heuristics() {
        let annotator = Annotator::new(Arc::new(UnreachableLexicon));
        assert!(annotator
            .annotate_token(".", OutputMode::Tree, false)
            .unwrap()
            .is_empty());
        assert_eq!(
            annotator.annotate_token("12:34", OutputMode::Tabular, false).unwrap(),
            vec![AnalysisResult::Placeholder]
        );
    }

    #[test]
    fn test_pattern_checks_after_lexicon() {
        let annotator = Annotator::new(Arc::new(UnreachableLexicon));
        let code = annotator
            .annotate_token("BY1A2C3", OutputMode::Tabular, true)
            .unwrap();
        assert_eq!(code[0].upos(), Upos::Propn);
        let abbreviation = annotator
            .annotate_token("н.э.", OutputMode::Tabular, true)
            .unwrap();
        assert_eq!(abbreviation[0].feats(), "Abbr=Yes");
        assert_eq!(abbreviation[0].lemma(), "_");
        assert!(annotator
            .annotate_token("👻", OutputMode::Tree, true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_lexicon_failure_by_mode() {
        let annotator = Annotator::new(Arc::new(BrokenLexicon));
        assert_eq!(
            annotator.annotate_token("слова", OutputMode::Tabular, true).unwrap(),
            vec![AnalysisResult::Placeholder]
        );
        let err = annotator
            .annotate_text("Гэта слова.", OutputMode::Tree, true)
            .unwrap_err();
        assert!(matches!(err, SlounikError::LexiconUnavailable(_)));
    }

    #[test]
    fn test_ambiguous_form_keeps_all_analyses() {
        let results = annotator()
            .annotate_token("мая", OutputMode::Tabular, true)
            .unwrap();
        let lemmas: Vec<&str> = results.iter().map(|r| r.lemma()).collect();
        assert_eq!(lemmas, vec!["мой", "май"]);
    }

    #[test]
    fn test_tabular_mode_collapses_stress_variants() {
        let mut lexicon = fixture();
        let record = lexicon.form_record(2).unwrap().unwrap();
        lexicon.insert_form(crate::lexicon::FormEntry {
            id: 50,
            lemma_id: record.lemma_id,
            form: "спаў".to_string(),
            features: [("Gender", "Masc"), ("Number", "Sing"), ("Tense", "Past")]
                .into_iter()
                .collect(),
            variant: Some(2),
            accent: Some("3".to_string()),
        });
        let annotator = Annotator::new(Arc::new(lexicon));
        assert_eq!(
            annotator.annotate_token("спаў", OutputMode::Tree, true).unwrap().len(),
            2
        );
        assert_eq!(
            annotator.annotate_token("спаў", OutputMode::Tabular, true).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_annotate_sentence_ids_and_spacing() {
        let tokens = crate::tokenizer::tokenize("Ён спаў.");
        for parallel in [true, false] {
            let annotated = annotator()
                .with_parallel(parallel)
                .annotate_sentence(&tokens, OutputMode::Tabular, true)
                .unwrap();
            let summary: Vec<(usize, &str, bool)> = annotated
                .iter()
                .map(|t| (t.id, t.form.as_str(), t.space_after))
                .collect();
            assert_eq!(
                summary,
                vec![(1, "Ён", true), (2, "спаў", false), (3, ".", true)]
            );
        }
    }

    #[test]
    fn test_annotate_text_structure() {
        let document = annotator()
            .annotate_text("Ён спаў. Ён спаў :)\n\n  гл. вышэй  ", OutputMode::Tree, true)
            .unwrap();
        assert_eq!(document.paragraphs.len(), 2);
        let first = &document.paragraphs[0];
        assert_eq!(first.sentences.len(), 2);
        assert_eq!(first.sentences[1].text, "Ён спаў :)");
        let second = &document.paragraphs[1];
        assert_eq!(second.id, 2);
        assert_eq!(second.text, "гл. вышэй");
        assert_eq!(second.sentences[0].tokens[0].form, "гл.");
    }

    #[test]
    fn test_streaming_events_order() {
        let (tx, rx) = mpsc::channel();
        annotator().annotate_streaming("Ён спаў.", OutputMode::Tree, true, tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();

        assert!(matches!(&events[0], PipelineEvent::ParagraphSegmented { sentences: 1, .. }));
        assert!(matches!(&events[1], PipelineEvent::SentenceSegmented { .. }));
        let annotated = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::TokenAnnotated { .. }))
            .count();
        assert_eq!(annotated, 3);
        match events.last() {
            Some(PipelineEvent::Done { total_tokens, .. }) => assert_eq!(*total_tokens, 3),
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn test_streaming_reports_errors() {
        let (tx, rx) = mpsc::channel();
        Annotator::new(Arc::new(BrokenLexicon)).annotate_streaming(
            "слова",
            OutputMode::Tree,
            true,
            tx,
        );
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(PipelineEvent::Error { .. })));
    }
}
