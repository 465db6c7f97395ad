//! # Rule Tables: Closed Sets and Category Patterns
//!
//! Explicit linguistic knowledge shared by the tokenizer, the sentence
//! segmenter and the annotator: enumerated punctuation and symbol sets,
//! abbreviation lists, and full-match patterns for the heuristic categories
//! (numbers, codes, abbreviations, emoticons).
//!
//! ## Heuristic cascade
//!
//! Tokens that are not dictionary words are approximated in two passes:
//!
//! 1. **Cheap checks** ([`cheap_category`]): set membership and short
//!    patterns, tried before any dictionary lookup.
//! 2. **Pattern checks** ([`pattern_category`]): the broader numeric, code
//!    and abbreviation patterns, tried after the dictionary.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tagger::{AnalysisResult, Features, Upos, PLACEHOLDER};

/// Cyrillic letters of the Belarusian alphabet, as a character-class body.
pub const LETTERS: &str = "а-яА-ЯЁёЎўІі";
/// Uppercase Belarusian letters, as a character-class body.
pub const UPPER_LETTERS: &str = "А-ЯЁЎІ";
/// Lowercase Belarusian letters, as a character-class body.
pub const LOWER_LETTERS: &str = "а-яёўі";

/// Token sequences that end a sentence
pub const SENTENCE_END: &[&str] = &[
    "...", "?..", "!..", "?!", "???", "!!!", ".", "!", "?", "…", "⁈",
];

/// Punctuation marks, including the multi-character ones the tokenizer emits
pub const PUNCTUATION: &[&str] = &[
    "...", "?..", "!..", "!!!", "???", "?!", "⁈", ",-", ", -", "-,", "- ,", "–,", "– ,",
    ".", ",", ":", ";", "!", "?", "…", "-", "–", "—", "«", "»", "„", "“", "\"", "(", ")",
    "[", "]", "{", "}",
];

/// Symbols
pub const SYMBOLS: &[&str] = &[
    "\\", "/", "%", "№", "#", "^", "+", "=", "*", "<", ">", "~", "×", "÷", "@", "_", "&",
    "$", "§", "€", "£", "₽", "℃", "°С", "°C", "℉", "°", "®", "©", "™",
];

/// Single characters the tokenizer emits as stand-alone punctuation/symbol tokens
pub const SINGLE_CHAR_MARKS: &[char] = &[
    '.', ',', ':', ';', '!', '?', '…', '-', '–', '—', '«', '»', '„', '“', '"', '(', ')',
    '[', ']', '{', '}', '\\', '/', '%', '№', '#', '^', '@', '_', '+', '=', '*', '<', '>',
    '~', '$', '€', '£', '₽', '℃', '℉', '×', '÷', '&', '§', '⁈', '°', '®', '©', '™',
];

/// Abbreviations written without a full stop (`км`, `р-н`)
pub const ABBR_NO_STOP: &[&str] = &[
    "в-аў", "п-аў", "р-н", "т-ва", "ун-т", "млн", "млрд", "см", "га", "м", "мм", "мг", "кг",
    "км", "л", "дж", "кал", "ккал", "гц", "мін", "сут",
];

/// Abbreviations with a full stop that may also end a sentence (`г.`, `тыс.`)
pub const ABBR_STOP_AMBIGUOUS: &[&str] = &[
    "вобл", "г", "гг", "інш", "пад", "руб", "с", "сс", "ст", "стст", "т", "тт", "тыс",
];

/// Abbreviations with a full stop that practically never end a sentence (`гл.`, `напр.`)
pub const ABBR_STOP_NON_FINAL: &[&str] = &[
    "акад", "б", "бухг", "в", "воз", "вул", "гл", "гр", "дац", "заг", "зб", "нам", "напр",
    "параўн", "праф", "р", "св", "сп", "тав",
];

fn full_match(body: &str) -> Regex {
    Regex::new(&format!("^(?:{body})$")).expect("built-in pattern must compile")
}

lazy_static! {
    /// Word-like tokens sent to the lexicon: `аб'ект`, `ха-ха`
    static ref WORD: Regex = full_match(&format!("[{LETTERS}]+(?:[-'‘’][{LETTERS}]+)*"));

    /// Abbreviation shapes: `м2`, `н.э.`, `с.-г.`, `к/т`, `Д.`, `1-шы`, `тыс.`
    static ref ABBREVIATION: Regex = full_match(&format!(
        "[{l}]{{1,2}}[23²³]\
         |[{l}]+\\.[{l}]+\\.\
         |[{u}]?[{lo}]+\\.-[{lo}]+\\.\
         |[{l}]+/[{l}]+\
         |[{u}]\\.\
         |\\d+-[{lo}]+(?:['‘’][{lo}]+)*\
         |[{l}]+\\.",
        l = LETTERS,
        u = UPPER_LETTERS,
        lo = LOWER_LETTERS,
    ));

    /// Alphanumeric codes: `BY1A2C33330000`, `М1`
    static ref CODE: Regex = full_match(&format!(
        "\\d*[A-Z{UPPER_LETTERS}]+(?:\\d+[A-Z{UPPER_LETTERS}]*)+"
    ));

    /// Text emoticons: `:)`, `;-(`, `)))`
    static ref EMOTICON: Regex = full_match(r"\({3,}|\){3,}|[:;]-?[()]+");

    /// Dates, times, Roman numerals, plain numbers and phone numbers
    static ref NUMERIC: Regex = full_match(
        r"[0123]\d\.[01]\d(?:\.(?:\d{2}|\d{4}))?|[012]?\d:[0-5]\d(?::[0-5]\d)?|M*(?:C[MD]|D?C{0,3})(?:X[CL]|L?X{0,3})(?:I[XV]|V?I{0,3})|\d+(?:[,.]\d+)?|(?:8 ?\(?\d{3}\)?|\(?\+?\d{3} ?\(?\d{2}\)?) ?\d{3}[- ]?\d{2}[- ]?\d{2}"
    );

    /// Decimal digits only: `2025`, `٢٠٢٥`
    static ref DIGITS: Regex = full_match(r"\d+");

    /// Numbers with space-separated thousand groups: `1 000 000`
    static ref SPACED_NUMBER: Regex = full_match(r"[1-9]\d{0,2}(?: \d{3})+");
}

/// Whether the token is word-shaped and should be looked up in the lexicon.
pub fn is_word(token: &str) -> bool {
    WORD.is_match(token)
}

/// Whether the token is a text emoticon such as `:)` or `)))`.
pub fn is_emoticon(token: &str) -> bool {
    token.contains(['(', ')']) && token.chars().count() > 1 && EMOTICON.is_match(token)
}

/// Whether the token is a number written with space-separated thousand groups.
pub fn is_spaced_number(token: &str) -> bool {
    token.contains(' ') && token.chars().count() > 4 && SPACED_NUMBER.is_match(token)
}

/// Whether `token` ends a sentence.
pub fn is_sentence_end(token: &str) -> bool {
    SENTENCE_END.contains(&token) || is_emoticon(token)
}

/// Whether `token` is an abbreviation whose full stop is never final.
pub fn is_non_final_abbreviation(token: &str) -> bool {
    ABBR_STOP_NON_FINAL.contains(&token.to_lowercase().as_str())
}

/// Categories assigned to tokens outside the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicCategory {
    Punctuation,
    Symbol,
    /// A string of digits only
    Digits,
    /// An abbreviation from the no-full-stop list
    StopLessAbbreviation,
    Emoticon,
    SpacedNumber,
    /// Dates, times, Roman numerals, numbers, phone numbers
    Numeric,
    Code,
    Abbreviation,
}

impl HeuristicCategory {
    pub fn upos(&self) -> Upos {
        match self {
            HeuristicCategory::Punctuation => Upos::Punct,
            HeuristicCategory::Symbol | HeuristicCategory::Emoticon => Upos::Sym,
            HeuristicCategory::Digits
            | HeuristicCategory::SpacedNumber
            | HeuristicCategory::Numeric => Upos::Num,
            HeuristicCategory::Code => Upos::Propn,
            HeuristicCategory::StopLessAbbreviation | HeuristicCategory::Abbreviation => Upos::X,
        }
    }

    fn is_abbreviation(&self) -> bool {
        matches!(
            self,
            HeuristicCategory::StopLessAbbreviation | HeuristicCategory::Abbreviation
        )
    }

    /// The single analysis this category yields for `token`.
    ///
    /// Abbreviations get `Abbr=Yes` and no lemma; every other category uses
    /// the token itself as the lemma.
    pub fn analysis(&self, token: &str) -> AnalysisResult {
        let mut features = Features::new();
        let lemma = if self.is_abbreviation() {
            features.insert("Abbr", "Yes");
            PLACEHOLDER.to_string()
        } else {
            token.to_string()
        };
        AnalysisResult::HeuristicMatch {
            lemma,
            upos: self.upos(),
            features,
        }
    }
}

/// Cheap checks run before the lexicon, in fixed order.
pub fn cheap_category(token: &str) -> Option<HeuristicCategory> {
    if PUNCTUATION.contains(&token) {
        Some(HeuristicCategory::Punctuation)
    } else if SYMBOLS.contains(&token) {
        Some(HeuristicCategory::Symbol)
    } else if DIGITS.is_match(token) {
        Some(HeuristicCategory::Digits)
    } else if ABBR_NO_STOP.contains(&token) {
        Some(HeuristicCategory::StopLessAbbreviation)
    } else if is_emoticon(token) {
        Some(HeuristicCategory::Emoticon)
    } else if is_spaced_number(token) {
        Some(HeuristicCategory::SpacedNumber)
    } else {
        None
    }
}

/// Pattern checks run after the lexicon, in fixed order.
pub fn pattern_category(token: &str) -> Option<HeuristicCategory> {
    if token.is_empty() {
        None
    } else if NUMERIC.is_match(token) {
        Some(HeuristicCategory::Numeric)
    } else if CODE.is_match(token) {
        Some(HeuristicCategory::Code)
    } else if ABBREVIATION.is_match(token) {
        Some(HeuristicCategory::Abbreviation)
    } else {
        None
    }
}
