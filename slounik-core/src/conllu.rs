//! # Tabular Codec (CoNLL-U)
//!
//! Serializes an [`AnnotatedDocument`] into the 10-column CoNLL-U table and
//! completes existing tables by re-annotating their unknown rows.
//!
//! ## Layout
//!
//! ```text
//! # newpar id = p1
//! # sent_id = p1s1
//! # text = Ён спаў.
//! 1	Ён	ён	PRON	_	Case=Nom|Person=3|PronType=Prs	_	_	_	_
//! 2	спаў	спаць	VERB	_	Aspect=Imp|Tense=Past	_	_	_	SpaceAfter=No
//! 3	.	.	PUNCT	_	_	_	_	_	_
//!
//! ```
//!
//! A token with several analyses is written as a header row (LEMMA, UPOS and
//! FEATS left as `_`) followed by one sub-row per analysis, numbered
//! `id.1`, `id.2`, ... Every sentence block ends with a blank line.
//!
//! HEAD, DEPREL and DEPS are never filled in.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::Annotator;
use crate::tagger::{AnalysisResult, AnnotatedDocument, OutputMode, Upos, PLACEHOLDER};

/// Number of columns of a data row
pub const COLUMNS: usize = 10;

/// Prefix of the paragraph marker comment
pub const PARAGRAPH_PREFIX: &str = "# newpar id = ";
/// Prefix of the sentence ID comment
pub const SENTENCE_ID_PREFIX: &str = "# sent_id = ";
/// Prefix of the sentence text comment
pub const SENTENCE_TEXT_PREFIX: &str = "# text = ";

const LINE_BREAKERS: [char; 3] = ['\t', '\n', '\r'];

/// One data row of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRow {
    pub id: String,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    pub feats: String,
    pub head: String,
    pub deprel: String,
    pub deps: String,
    pub misc: String,
}

impl TabularRow {
    /// A row with every column but ID and FORM set to `_`.
    pub fn empty(id: impl Into<String>, form: impl Into<String>) -> Self {
        let blank = || PLACEHOLDER.to_string();
        TabularRow {
            id: id.into(),
            form: form.into(),
            lemma: blank(),
            upos: blank(),
            xpos: blank(),
            feats: blank(),
            head: blank(),
            deprel: blank(),
            deps: blank(),
            misc: blank(),
        }
    }

    /// Parses a line with exactly [`COLUMNS`] tab-separated fields.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [id, form, lemma, upos, xpos, feats, head, deprel, deps, misc] = fields.as_slice()
        else {
            return None;
        };
        Some(TabularRow {
            id: id.to_string(),
            form: form.to_string(),
            lemma: lemma.to_string(),
            upos: upos.to_string(),
            xpos: xpos.to_string(),
            feats: feats.to_string(),
            head: head.to_string(),
            deprel: deprel.to_string(),
            deps: deps.to_string(),
            misc: misc.to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        let columns: [&str; COLUMNS] = [
            &self.id,
            &self.form,
            &self.lemma,
            &self.upos,
            &self.xpos,
            &self.feats,
            &self.head,
            &self.deprel,
            &self.deps,
            &self.misc,
        ];
        columns
            .iter()
            .map(|column| single_line(column))
            .collect::<Vec<_>>()
            .join("\t")
    }

    /// Copies LEMMA, UPOS and FEATS from an analysis.
    fn with_analysis(mut self, result: &AnalysisResult) -> Self {
        self.lemma = result.lemma().to_string();
        self.upos = result.upos().tag().to_string();
        self.feats = result.feats();
        self
    }

    /// Whether LEMMA, UPOS and FEATS hold the unknown-token triple `_ X _`.
    pub fn is_unknown(&self) -> bool {
        self.lemma == PLACEHOLDER && self.upos == Upos::X.tag() && self.feats == PLACEHOLDER
    }

    /// Whether the ID is a plain token number (not `1.2` or `1-2`).
    pub fn has_token_id(&self) -> bool {
        !self.id.is_empty() && self.id.chars().all(|c| c.is_ascii_digit())
    }

    /// Whether this row is a sub-row of token `parent_id`.
    pub fn is_child_of(&self, parent_id: &str) -> bool {
        is_child_id(&self.id, parent_id)
    }
}

/// Replaces tabs and line breaks so a value stays inside one column of one line.
fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains(LINE_BREAKERS) {
        Cow::Owned(value.replace(LINE_BREAKERS, " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// `2.1` is a child of `2`; `21` and `2-3` are not.
fn is_child_id(id: &str, parent_id: &str) -> bool {
    id.strip_prefix(parent_id)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// A decoded line of a tabular document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabularLine {
    Blank,
    /// Any line without a tab: comments, paragraph markers
    Comment(String),
    Row(TabularRow),
    /// A tab-separated line with the wrong number of fields
    Malformed(String),
}

impl TabularLine {
    pub fn parse(line: &str) -> Self {
        if line.is_empty() {
            TabularLine::Blank
        } else if !line.contains('\t') {
            TabularLine::Comment(line.to_string())
        } else {
            match TabularRow::parse(line) {
                Some(row) => TabularLine::Row(row),
                None => TabularLine::Malformed(line.to_string()),
            }
        }
    }
}

/// Splits a tabular document into lines without interpreting comments.
pub fn decode(text: &str) -> Vec<TabularLine> {
    text.split('\n').map(TabularLine::parse).collect()
}

/// Rows for one token: a single row, or a header plus one sub-row per analysis.
///
/// `template` supplies ID, FORM and every column the analyses do not set.
fn token_rows(template: TabularRow, results: &[AnalysisResult]) -> Vec<TabularRow> {
    match results {
        [] => vec![template.with_analysis(&AnalysisResult::Placeholder)],
        [single] => vec![template.with_analysis(single)],
        many => {
            let id = template.id.clone();
            let mut rows = Vec::with_capacity(many.len() + 1);
            rows.push(TabularRow {
                upos: PLACEHOLDER.to_string(),
                ..template
            });
            for (k, result) in many.iter().enumerate() {
                let sub_id = format!("{id}.{}", k + 1);
                rows.push(TabularRow::empty(sub_id, PLACEHOLDER).with_analysis(result));
            }
            rows
        }
    }
}

/// Writes a document as a CoNLL-U table.
pub fn encode(document: &AnnotatedDocument) -> String {
    let mut output = String::new();
    for paragraph in &document.paragraphs {
        output.push_str(PARAGRAPH_PREFIX);
        output.push_str(&paragraph.label());
        output.push('\n');

        for sentence in &paragraph.sentences {
            output.push_str(SENTENCE_ID_PREFIX);
            output.push_str(&paragraph.sentence_label(sentence));
            output.push('\n');
            output.push_str(SENTENCE_TEXT_PREFIX);
            output.push_str(&single_line(&sentence.text));
            output.push('\n');

            for token in &sentence.tokens {
                let mut template = TabularRow::empty(token.id.to_string(), token.form.as_str());
                template.misc = token.misc().to_string();
                for row in token_rows(template, &token.results) {
                    output.push_str(&row.to_line());
                    output.push('\n');
                }
            }
            output.push('\n');
        }
    }
    output
}

/// Fills in the unknown rows of a CoNLL-U table.
///
/// A row is re-annotated only when its ID is a plain number, it has exactly
/// ten fields, LEMMA/UPOS/FEATS are `_`/`X`/`_`, and the next line is not one
/// of its sub-rows. The row keeps its ID, FORM, XPOS, HEAD, DEPREL, DEPS and
/// MISC. Every other line, including malformed ones, is copied verbatim.
pub fn complete(annotator: &Annotator, conllu: &str, extended: bool) -> String {
    let lines: Vec<&str> = conllu.split('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let row = match TabularLine::parse(line) {
            TabularLine::Row(row) if row.has_token_id() && row.is_unknown() => row,
            _ => {
                output.push(line.to_string());
                continue;
            }
        };

        let has_children = lines
            .get(i + 1)
            .and_then(|next| next.split('\t').next())
            .is_some_and(|next_id| is_child_id(next_id, &row.id));
        if has_children {
            output.push(line.to_string());
            continue;
        }

        match annotator.annotate_token(&row.form, OutputMode::Tabular, extended) {
            Ok(results) => {
                debug!(id = %row.id, form = %row.form, results = results.len(), "row completed");
                output.extend(token_rows(row, &results).iter().map(TabularRow::to_line));
            }
            Err(_) => output.push(line.to_string()),
        }
    }
    output.join("\n")
}
