//! # Tokenizer: Ordered Matcher Cascade
//!
//! Splits a paragraph of Belarusian text into tokens. Every character of the
//! trimmed input lands in exactly one token; whitespace is a token too, so
//! concatenating the token texts reproduces the trimmed input.
//!
//! ## Cascade
//!
//! At each position the matchers of [`CASCADE`] are tried in order and the
//! first one that matches wins. The order matters: `BY1A2C` is an
//! alphanumeric code and not a Latin word because [`TokenRule::Code`] comes
//! first. Each matcher is an anchored regular expression plus, where needed,
//! explicit checks on the neighbouring characters.
//!
//! When no matcher fires, the text is consumed as an opaque run of grapheme
//! clusters ([`TokenRule::Opaque`]) up to the next whitespace or the next
//! position where some matcher fires.
//!
//! ## Example
//!
//! ```rust
//! use slounik_core::tokenizer::tokenize;
//!
//! let tokens = tokenize("Ён спаў.");
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, vec!["Ён", " ", "спаў", "."]);
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::rule_based::{LETTERS, LOWER_LETTERS, SINGLE_CHAR_MARKS, UPPER_LETTERS};

/// A token extracted from the input text.
///
/// `start` and `end` are byte offsets into the text passed to [`tokenize`]
/// (not the trimmed copy), so `&text[token.start..token.end] == token.text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    /// Surface text of the token
    pub text: String,
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Position of the token in its sequence
    pub index: usize,
}

impl Token {
    /// Builds a token that is not tied to a source text, with zeroed offsets.
    pub fn detached(text: impl Into<String>, index: usize) -> Self {
        let text = text.into();
        Token {
            end: text.len(),
            text,
            start: 0,
            index,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        !self.text.is_empty() && self.text.chars().all(char::is_whitespace)
    }
}

/// The matchers of the tokenizer cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRule {
    /// Unit with a power suffix: `м2`, `км²`
    Unit,
    /// Phone number: `8 (029) 123-45-67`, `+375 29 123 45 67`
    Phone,
    /// Dotted date: `01.02`, `01.02.03`, `01.02.2003`
    Date,
    /// `@user_name`
    Username,
    Email,
    /// URL with optional scheme and `www.`
    Url,
    /// Roman numeral: `XXI`
    Roman,
    /// Multi-character symbol clusters: `...`, `?!`, `:-)`, `°C`, `, -`
    SymbolCluster,
    /// `н.э.`
    DottedAbbreviation,
    /// `с.-г.`
    HyphenatedAbbreviation,
    /// `к/т`
    SlashAbbreviation,
    /// A capital letter with a full stop, followed by another capital: `Я. Купала`
    Initial,
    /// A lowercase abbreviation inside a sentence: `тыс. рублёў`
    MidTextAbbreviation,
    /// `12:34`, `1:02:03`
    Time,
    /// Alphanumeric code: `BY1A2C3`
    Code,
    /// Cyrillic word, with inner hyphens and apostrophes: `аб'ект`
    Word,
    LatinWord,
    /// Number with space-separated thousand groups: `1 000 000`
    SpacedNumber,
    /// Numeral with a case ending: `1-шы`
    OrdinalNumeral,
    /// `42`, `3,14`
    Number,
    /// A single punctuation mark or symbol
    Mark,
    /// A single whitespace character
    Whitespace,
    /// Anything no other matcher accepts
    Opaque,
}

/// The cascade, in priority order. [`TokenRule::Opaque`] is the implicit fallback.
pub const CASCADE: [TokenRule; 22] = [
    TokenRule::Unit,
    TokenRule::Phone,
    TokenRule::Date,
    TokenRule::Username,
    TokenRule::Email,
    TokenRule::Url,
    TokenRule::Roman,
    TokenRule::SymbolCluster,
    TokenRule::DottedAbbreviation,
    TokenRule::HyphenatedAbbreviation,
    TokenRule::SlashAbbreviation,
    TokenRule::Initial,
    TokenRule::MidTextAbbreviation,
    TokenRule::Time,
    TokenRule::Code,
    TokenRule::Word,
    TokenRule::LatinWord,
    TokenRule::SpacedNumber,
    TokenRule::OrdinalNumeral,
    TokenRule::Number,
    TokenRule::Mark,
    TokenRule::Whitespace,
];

fn anchored(body: &str) -> Regex {
    Regex::new(&format!("^(?:{body})")).expect("built-in pattern must compile")
}

lazy_static! {
    static ref UNIT: Regex = anchored(&format!("[{LETTERS}]{{1,2}}[23²³]"));
    static ref PHONE_TRUNK: Regex =
        anchored(r"8 ?\(?\d{3}\)? ?\d{3}[- ]?\d{2}[- ]?\d{2}");
    static ref PHONE_INTERNATIONAL: Regex =
        anchored(r"\(?\+?\d{3} ?\(?\d{2}\)? ?\d{3}[- ]?\d{2}[- ]?\d{2}");
    static ref DATE_SHORT_YEAR: Regex = anchored(r"[0123]\d\.[01]\d\.\d{2}");
    static ref DATE_FULL_YEAR: Regex = anchored(r"[0123]\d\.[01]\d\.\d{4}");
    static ref DATE_NO_YEAR: Regex = anchored(r"[0123]\d\.[01]\d");
    static ref USERNAME: Regex = anchored(r"@[a-zA-Z_.]+");
    static ref EMAIL: Regex = anchored(r"[a-zA-Z_.]+@[a-zA-Z-]+(?:\.[a-zA-Z]+)+");
    static ref URL: Regex =
        anchored(r"(?:https?://)?(?:www\.)?[a-zA-Z-]+(?:\.[a-zA-Z]+)+(?:/\S*)?");
    static ref ROMAN: Regex =
        anchored(r"M*(?:C[MD]|D?C{0,3})(?:X[CL]|L?X{0,3})(?:I[XV]|V?I{0,3})");
    static ref SYMBOL_CLUSTER: Regex =
        anchored(r"[()]{3,}|\.\.\.|\?\.\.|!\.\.|\?!|, ?-|[:;]-?[()]+|°[CС]");
    static ref DOTTED_ABBREVIATION: Regex =
        anchored(&format!("[{LETTERS}]+\\.[{LETTERS}]+\\."));
    static ref HYPHENATED_ABBREVIATION: Regex = anchored(&format!(
        "[{UPPER_LETTERS}]?[{LOWER_LETTERS}]+\\.-[{LOWER_LETTERS}]+\\."
    ));
    static ref SLASH_ABBREVIATION: Regex = anchored(&format!("[{LETTERS}]+/[{LETTERS}]+"));
    static ref INITIAL: Regex = anchored(&format!("[{UPPER_LETTERS}]\\."));
    static ref MID_TEXT_ABBREVIATION: Regex = anchored(&format!("[{LOWER_LETTERS}]+\\."));
    static ref TIME_WITH_SECONDS: Regex = anchored(r"[012]?\d:[0-5]\d:[0-5]\d");
    static ref TIME: Regex = anchored(r"[012]?\d:[0-5]\d");
    static ref CODE: Regex = anchored(&format!(
        "\\d*[A-Z{UPPER_LETTERS}]+(?:\\d+[A-Z{UPPER_LETTERS}]*)+"
    ));
    static ref WORD: Regex = anchored(&format!("[{LETTERS}]+(?:[-'‘’][{LETTERS}]+)*"));
    static ref LATIN_WORD: Regex = anchored("[a-zA-Z]+");
    static ref SPACED_NUMBER_HEAD: Regex = anchored(r"[1-9]\d{0,2}");
    static ref ORDINAL_NUMERAL: Regex = anchored(&format!(
        "\\d+-[{LOWER_LETTERS}]+(?:['‘’][{LOWER_LETTERS}]+)*"
    ));
    static ref NUMBER: Regex = anchored(r"\d+(?:,\d+)?");
}

fn is_digit(c: char) -> bool {
    c.is_numeric()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_upper_letter(c: char) -> bool {
    matches!(c, 'А'..='Я' | 'Ё' | 'Ў' | 'І')
}

fn prev_char(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

fn next_char(rest: &str, len: usize) -> Option<char> {
    rest[len..].chars().next()
}

fn not_preceded_by_digit(text: &str, pos: usize) -> bool {
    !prev_char(text, pos).is_some_and(is_digit)
}

fn not_followed_by_digit(rest: &str, len: usize) -> bool {
    !next_char(rest, len).is_some_and(is_digit)
}

/// Length of a non-empty match of `re` at the start of `rest`.
fn prefix_len(re: &Regex, rest: &str) -> Option<usize> {
    re.find(rest).map(|m| m.end()).filter(|&len| len > 0)
}

/// First candidate, in preference order, whose match is not followed by a digit.
fn first_digit_bounded(candidates: &[&Regex], rest: &str) -> Option<usize> {
    candidates
        .iter()
        .filter_map(|re| prefix_len(re, rest))
        .find(|&len| not_followed_by_digit(rest, len))
}

/// `1 000 000`: tries the longest run of thousand groups first.
fn spaced_number_len(rest: &str) -> Option<usize> {
    let head = prefix_len(&SPACED_NUMBER_HEAD, rest)?;
    let mut ends = Vec::new();
    let mut cursor = head;
    loop {
        let mut chars = rest[cursor..].chars();
        // groups are separated by exactly one plain space
        if chars.next() != Some(' ') {
            break;
        }
        let digits: Vec<char> = chars.take(3).collect();
        if digits.len() < 3 || !digits.iter().all(char::is_ascii_digit) {
            break;
        }
        cursor += 4;
        ends.push(cursor);
    }
    ends.into_iter()
        .rev()
        .find(|&len| not_followed_by_digit(rest, len))
}

impl TokenRule {
    /// Tries this matcher at byte offset `pos` of `text` and returns the end
    /// offset of the match.
    pub fn match_at(&self, text: &str, pos: usize) -> Option<usize> {
        let rest = text.get(pos..)?;
        let len = match self {
            TokenRule::Unit => prefix_len(&UNIT, rest),
            TokenRule::Phone => {
                if !not_preceded_by_digit(text, pos) {
                    return None;
                }
                first_digit_bounded(&[&*PHONE_TRUNK, &*PHONE_INTERNATIONAL], rest)
            }
            TokenRule::Date => {
                if !not_preceded_by_digit(text, pos) {
                    return None;
                }
                first_digit_bounded(
                    &[&*DATE_SHORT_YEAR, &*DATE_FULL_YEAR, &*DATE_NO_YEAR],
                    rest,
                )
            }
            TokenRule::Username => prefix_len(&USERNAME, rest)
                .filter(|&len| !next_char(rest, len).is_some_and(|c| c == '.' || is_word_char(c))),
            TokenRule::Email => prefix_len(&EMAIL, rest),
            TokenRule::Url => prefix_len(&URL, rest),
            TokenRule::Roman => prefix_len(&ROMAN, rest)
                .filter(|&len| !next_char(rest, len).is_some_and(|c| c.is_ascii_alphabetic())),
            TokenRule::SymbolCluster => prefix_len(&SYMBOL_CLUSTER, rest),
            TokenRule::DottedAbbreviation => prefix_len(&DOTTED_ABBREVIATION, rest),
            TokenRule::HyphenatedAbbreviation => prefix_len(&HYPHENATED_ABBREVIATION, rest),
            TokenRule::SlashAbbreviation => prefix_len(&SLASH_ABBREVIATION, rest),
            TokenRule::Initial => prefix_len(&INITIAL, rest).filter(|&len| {
                let mut after = rest[len..].chars().peekable();
                after.next_if(|c| c.is_whitespace());
                after.next().is_some_and(is_upper_letter)
            }),
            TokenRule::MidTextAbbreviation => {
                if !prev_char(text, pos).is_some_and(char::is_whitespace) {
                    return None;
                }
                prefix_len(&MID_TEXT_ABBREVIATION, rest).filter(|&len| {
                    let mut after = rest[len..].chars();
                    after.next().is_some_and(char::is_whitespace)
                        && after
                            .next()
                            .is_some_and(|c| !c.is_whitespace() && !is_upper_letter(c))
                })
            }
            TokenRule::Time => {
                if !not_preceded_by_digit(text, pos) {
                    return None;
                }
                first_digit_bounded(&[&*TIME_WITH_SECONDS, &*TIME], rest)
            }
            TokenRule::Code => prefix_len(&CODE, rest),
            TokenRule::Word => prefix_len(&WORD, rest),
            TokenRule::LatinWord => prefix_len(&LATIN_WORD, rest),
            TokenRule::SpacedNumber => {
                if !not_preceded_by_digit(text, pos) {
                    return None;
                }
                spaced_number_len(rest)
            }
            TokenRule::OrdinalNumeral => prefix_len(&ORDINAL_NUMERAL, rest),
            TokenRule::Number => prefix_len(&NUMBER, rest),
            TokenRule::Mark => rest
                .chars()
                .next()
                .filter(|c| SINGLE_CHAR_MARKS.contains(c))
                .map(char::len_utf8),
            TokenRule::Whitespace => rest
                .chars()
                .next()
                .filter(|c| c.is_whitespace())
                .map(char::len_utf8),
            TokenRule::Opaque => opaque_len(text, pos),
        }?;
        Some(pos + len)
    }
}

fn cascade_match(text: &str, pos: usize) -> Option<(TokenRule, usize)> {
    CASCADE
        .iter()
        .find_map(|rule| rule.match_at(text, pos).map(|end| (*rule, end)))
}

/// Grapheme clusters from `pos` up to whitespace or the next cascade match.
/// Always consumes at least one cluster.
fn opaque_len(text: &str, pos: usize) -> Option<usize> {
    let rest = text.get(pos..)?;
    let mut graphemes = rest.grapheme_indices(true);
    let (_, first) = graphemes.next()?;
    let mut len = first.len();
    for (offset, grapheme) in graphemes {
        if grapheme.starts_with(char::is_whitespace) || cascade_match(text, pos + offset).is_some()
        {
            break;
        }
        len = offset + grapheme.len();
    }
    Some(len)
}

/// Tokenizes `text`, returning each token with the matcher that produced it.
pub fn tokenize_traced(text: &str) -> Vec<(Token, TokenRule)> {
    let trimmed = text.trim();
    let base = text.len() - text.trim_start().len();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < trimmed.len() {
        let (rule, end) = match cascade_match(trimmed, pos) {
            Some(found) => found,
            None => match opaque_len(trimmed, pos) {
                Some(len) => (TokenRule::Opaque, pos + len),
                None => break,
            },
        };
        let index = tokens.len();
        tokens.push((
            Token {
                text: trimmed[pos..end].to_string(),
                start: base + pos,
                end: base + end,
                index,
            },
            rule,
        ));
        pos = end;
    }
    tokens
}

/// Tokenizes `text` into a sequence that partitions its trimmed content.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_traced(text)
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}
