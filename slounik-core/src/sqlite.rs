//! # SQLite Dictionary Adapter
//!
//! [`LexiconStore`] over the dictionary database (`Form`, `Lemma` and
//! `Variant` tables). Every call opens its own read-only connection and drops
//! it before returning, so the store holds no connection between lookups and
//! can be shared freely between threads.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use crate::error::{Result, SlounikError};
use crate::lexicon::{normalize_query, FormId, FormRecord, LexiconStore};
use crate::tagger::{Features, Upos};

const FORM_COLUMNS: &str =
    "ID, LemID, VarID, Form, Accent, Gender, Person, Cas, Number, Degree, Tense, Mood, VerbForm, Animacy, Short";

/// Feature names of the `Form` columns from `Gender` on (`Cas` is `Case`).
const FORM_FEATURES: [&str; 10] = [
    "Gender", "Person", "Case", "Number", "Degree", "Tense", "Mood", "VerbForm", "Animacy",
    "Short",
];

const LEMMA_COLUMNS: &str = "Lemma, POS, Type, InflClass, Degree, Person, Gender, Voice, Tense, \
     Aspect, Animacy, Abbr, NumForm, VerbForm, Personal, Origin, Poss, Reflex, SubCat";

/// Feature names of the `Lemma` columns from `Type` on. `Type` itself is
/// renamed after the part of speech.
const LEMMA_FEATURES: [&str; 17] = [
    "Type", "InflClass", "Degree", "Person", "Gender", "Voice", "Tense", "Aspect", "Animacy",
    "Abbr", "NumForm", "VerbForm", "Personal", "Origin", "Poss", "Reflex", "SubCat",
];

/// Integer flags written as `Yes`/`No` in the FEATS column
const YES_NO_FEATURES: [&str; 5] = ["Short", "Abbr", "Personal", "Poss", "Reflex"];

/// Dictionary database opened lazily, one connection per lookup.
#[derive(Debug, Clone)]
pub struct SqliteLexicon {
    path: PathBuf,
}

impl SqliteLexicon {
    /// Checks that `path` names an existing `.db` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_db = path.extension().is_some_and(|ext| ext == "db");
        if !is_db || !path.exists() {
            return Err(SlounikError::LexiconUnavailable(format!(
                "invalid database file path: {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), "dictionary database registered");
        Ok(SqliteLexicon {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let connection = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(connection)
    }
}

/// Column value as feature text. NULL, zero and empty values carry no feature.
fn column_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Integer(0) | Value::Blob(_) => None,
        Value::Integer(n) => Some(n.to_string()),
        Value::Real(r) if r == 0.0 => None,
        Value::Real(r) => Some(r.to_string()),
        Value::Text(s) if s.is_empty() => None,
        Value::Text(s) => Some(s),
    }
}

fn feature_value(name: &str, raw: String) -> String {
    match (name, raw.as_str()) {
        ("Animacy", "1") => "Anim".to_string(),
        ("Animacy", "0") => "Inan".to_string(),
        (flag, "1") if YES_NO_FEATURES.contains(&flag) => "Yes".to_string(),
        (flag, "0") if YES_NO_FEATURES.contains(&flag) => "No".to_string(),
        _ => raw,
    }
}

/// `PRON` → `PronType`
fn type_feature_name(pos: &str) -> String {
    let mut chars = pos.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}Type",
            first.to_uppercase(),
            chars.as_str().to_lowercase()
        ),
        None => "Type".to_string(),
    }
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width).map(|i| row.get::<_, Value>(i)).collect()
}

impl LexiconStore for SqliteLexicon {
    fn search_forms(&self, pattern: &str, case_sensitive: bool) -> Result<Vec<FormId>> {
        let query = normalize_query(pattern, case_sensitive)?;
        let column = if case_sensitive { "Form" } else { "Lowercase" };
        let connection = self.connect()?;
        let mut statement = connection.prepare(&format!(
            "SELECT ID FROM Form WHERE {column} GLOB ?1 ORDER BY Form, ID"
        ))?;
        let ids = statement
            .query_map(params![query], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(query = %query, case_sensitive, found = ids.len(), "dictionary search");
        Ok(ids)
    }

    fn form_record(&self, id: FormId) -> Result<Option<FormRecord>> {
        let connection = self.connect()?;

        let form_row = connection
            .query_row(
                &format!("SELECT {FORM_COLUMNS} FROM Form WHERE ID = ?1"),
                params![id],
                |row| read_row(row, 15),
            )
            .optional()?;
        let Some(mut form_row) = form_row else {
            return Ok(None);
        };
        let feature_values = form_row.split_off(5);
        let mut head = form_row.into_iter();
        let (_, lemma_id, variant_id, form, accent) = (
            head.next(),
            head.next(),
            head.next(),
            head.next(),
            head.next(),
        );
        let lemma_id = match lemma_id {
            Some(Value::Integer(lemma_id)) => lemma_id,
            _ => return Ok(None),
        };

        let mut features = Features::new();
        for (name, value) in FORM_FEATURES.iter().zip(feature_values) {
            if let Some(raw) = column_text(value) {
                features.insert(*name, feature_value(name, raw));
            }
        }

        let lemma_row = connection
            .query_row(
                &format!("SELECT {LEMMA_COLUMNS} FROM Lemma WHERE ID = ?1"),
                params![lemma_id],
                |row| read_row(row, 19),
            )
            .optional()?;
        let Some(mut lemma_row) = lemma_row else {
            warn!(form_id = id, lemma_id, "form refers to a missing lemma");
            return Ok(None);
        };
        let lemma_values = lemma_row.split_off(2);
        let mut head = lemma_row.into_iter();
        let lemma = head.next().and_then(column_text).unwrap_or_default();
        let pos = head.next().and_then(column_text).unwrap_or_default();

        // lemma-level values override form-level ones
        for (name, value) in LEMMA_FEATURES.iter().zip(lemma_values) {
            if let Some(raw) = column_text(value) {
                if *name == "Type" {
                    features.insert(type_feature_name(&pos), raw);
                } else {
                    features.insert(*name, feature_value(name, raw));
                }
            }
        }

        let variant = match variant_id {
            Some(Value::Integer(variant_id)) => connection
                .query_row(
                    "SELECT Variant FROM Variant WHERE ID = ?1",
                    params![variant_id],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()?
                .flatten()
                .and_then(|v| u32::try_from(v).ok()),
            _ => None,
        };

        let upos = Upos::from_tag(&pos).unwrap_or_else(|| {
            warn!(form_id = id, pos = %pos, "unknown part of speech, using X");
            Upos::X
        });

        Ok(Some(FormRecord {
            form_id: id,
            lemma_id,
            form: form.and_then(column_text).unwrap_or_default(),
            lemma,
            upos,
            features,
            variant,
            accent: accent.and_then(column_text),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCHEMA: &str = "
        CREATE TABLE Lemma (ID INTEGER PRIMARY KEY, Lemma TEXT, Lowercase TEXT, POS TEXT,
            Type TEXT, InflClass TEXT, Degree TEXT, Person INTEGER, Gender TEXT, Voice TEXT,
            Tense TEXT, Aspect TEXT, Animacy INTEGER, Abbr INTEGER, NumForm TEXT, VerbForm TEXT,
            Personal INTEGER, Origin TEXT, Poss INTEGER, Reflex INTEGER, SubCat TEXT);
        CREATE TABLE Form (ID INTEGER PRIMARY KEY, LemID INTEGER, VarID INTEGER, Form TEXT,
            Lowercase TEXT, Accent TEXT, Gender TEXT, Person INTEGER, Cas TEXT, Number TEXT,
            Degree TEXT, Tense TEXT, Mood TEXT, VerbForm TEXT, Animacy INTEGER, Short INTEGER);
        CREATE TABLE Variant (ID INTEGER PRIMARY KEY, Variant INTEGER);

        INSERT INTO Variant VALUES (1, 1), (2, 2);
        INSERT INTO Lemma (ID, Lemma, Lowercase, POS, Type, Gender, Animacy, Poss)
            VALUES (1, 'мой', 'мой', 'PRON', 'Prs', NULL, 0, 1);
        INSERT INTO Lemma (ID, Lemma, Lowercase, POS, Gender, Animacy)
            VALUES (2, 'май', 'май', 'NOUN', 'Masc', 0);
        INSERT INTO Form (ID, LemID, VarID, Form, Lowercase, Accent, Gender, Cas, Number)
            VALUES (1, 1, 1, 'мая', 'мая', '2', 'Fem', 'Nom', 'Sing');
        INSERT INTO Form (ID, LemID, VarID, Form, Lowercase, Accent, Cas, Number, Animacy)
            VALUES (2, 2, 2, 'мая', 'мая', '1', 'Gen', 'Sing', 0);
        INSERT INTO Form (ID, LemID, VarID, Form, Lowercase, Cas, Number)
            VALUES (3, 2, 1, 'Май', 'май', 'Nom', 'Sing');
    ";

    fn dictionary() -> (TempDir, SqliteLexicon) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictionary.db");
        let connection = Connection::open(&path).unwrap();
        connection.execute_batch(SCHEMA).unwrap();
        drop(connection);
        let lexicon = SqliteLexicon::open(&path).unwrap();
        (dir, lexicon)
    }

    #[test]
    fn test_open_rejects_bad_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        assert!(matches!(
            SqliteLexicon::open(&missing),
            Err(SlounikError::LexiconUnavailable(_))
        ));
        let wrong_extension = dir.path().join("dictionary.txt");
        std::fs::write(&wrong_extension, "").unwrap();
        assert!(SqliteLexicon::open(&wrong_extension).is_err());
    }

    #[test]
    fn test_search_is_case_aware() {
        let (_dir, lexicon) = dictionary();
        assert_eq!(lexicon.search_forms("мая", true).unwrap(), vec![1, 2]);
        assert!(lexicon.search_forms("май", true).unwrap().is_empty());
        assert_eq!(lexicon.search_forms("МАЙ", false).unwrap(), vec![3]);
        assert_eq!(lexicon.search_forms("ма?", false).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_invalid_query_never_reaches_database() {
        let (_dir, lexicon) = dictionary();
        let err = lexicon.search_forms("may", true).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_form_record_projection() {
        let (_dir, lexicon) = dictionary();

        let pronoun = lexicon.form_record(1).unwrap().unwrap();
        assert_eq!(pronoun.lemma, "мой");
        assert_eq!(pronoun.upos, Upos::Pron);
        assert_eq!(
            pronoun.features.to_conllu(),
            "Case=Nom|Gender=Fem|Number=Sing|Poss=Yes|PronType=Prs"
        );
        assert_eq!(pronoun.variant, Some(1));
        assert_eq!(pronoun.accent.as_deref(), Some("2"));

        let noun = lexicon.form_record(2).unwrap().unwrap();
        assert_eq!(noun.upos, Upos::Noun);
        assert_eq!(noun.features.to_conllu(), "Case=Gen|Gender=Masc|Number=Sing");
        assert_eq!(noun.variant, Some(2));

        assert!(lexicon.form_record(42).unwrap().is_none());
    }

    #[test]
    fn test_missing_tables_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE Other (ID INTEGER);")
            .unwrap();
        let lexicon = SqliteLexicon::open(&path).unwrap();
        let err = lexicon.search_forms("мая", true).unwrap_err();
        assert!(matches!(err, SlounikError::LexiconUnavailable(_)));
    }

    #[test]
    fn test_type_feature_name() {
        assert_eq!(type_feature_name("PRON"), "PronType");
        assert_eq!(type_feature_name("NUM"), "NumType");
    }
}
