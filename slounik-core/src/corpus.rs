//! # Demo Corpus
//!
//! Belarusian demo texts for the web interface and a small built-in
//! dictionary, so the pipeline can run without the full SQLite database.
//!
//! The sample dictionary is deliberately tiny but covers the interesting
//! lexicon behaviours:
//! - `Ён` is only found by the case-insensitive search (the form is `ён`);
//! - `мая` is ambiguous between the pronoun `мой` and the noun `май`;
//! - `мука` has two records that differ only in stress position.

use crate::lexicon::{FormEntry, LemmaEntry, MemoryLexicon};
use crate::tagger::{Features, Upos};

/// Demo texts as `(title, text)` pairs
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Просты тэкст",
            "Ён спаў. Мінск — сталіца Беларусі, у горадзе жыве каля 2 млн чалавек, а плошча складае 409,5 км².",
        ),
        (
            "Скарачэнні",
            "Гл. вышэй: Я. Купала нарадзіўся ў 1882 г. у в. Вязынка. Напр. у 1905–1907 гг. ён працаваў на розных работах, каля 5 тыс. дзён.",
        ),
        (
            "Даты і нумары",
            "Сустрэча адбудзецца 01.09.2025 а 12:30. Тэлефон: +375 29 123-45-67, пошта info@slounik.by.\nКошт квітка — 1 500 руб., пачатак у 18:00.",
        ),
        (
            "Эмоцыі",
            "Дзякуй за дапамогу :) Да сустрэчы!!! Што, зноў?! Ну... добра ;-)",
        ),
        (
            "Коды і лацініца",
            "Рахунак BY86AKBB30120000000040000000 адкрыты ў банку. Сайт https://www.example.by/pravila працуе з XXI стагоддзя, пішыце @slounik_by.",
        ),
        (
            "Неадназначнасць",
            "Мая мука вялікая. У пачатку мая мука на млыне скончылася.",
        ),
    ]
}

fn lemma(id: i64, lemma: &str, upos: Upos, features: &[(&str, &str)]) -> LemmaEntry {
    LemmaEntry {
        id,
        lemma: lemma.to_string(),
        upos,
        features: features.iter().copied().collect::<Features>(),
    }
}

/// The built-in sample dictionary.
pub fn sample_lexicon() -> MemoryLexicon {
    let mut lexicon = MemoryLexicon::new();

    lexicon.add_paradigm(
        lemma(1, "ён", Upos::Pron, &[("Person", "3"), ("PronType", "Prs")]),
        &[
            ("ён", &[("Case", "Nom"), ("Gender", "Masc"), ("Number", "Sing")]),
            ("яго", &[("Case", "Gen"), ("Gender", "Masc"), ("Number", "Sing")]),
        ],
    );
    lexicon.add_paradigm(
        lemma(2, "спаць", Upos::Verb, &[("Aspect", "Imp")]),
        &[
            ("спаць", &[("VerbForm", "Inf")]),
            (
                "спаў",
                &[("Gender", "Masc"), ("Number", "Sing"), ("Tense", "Past"), ("VerbForm", "Fin")],
            ),
        ],
    );
    lexicon.add_paradigm(
        lemma(3, "высока", Upos::Adv, &[]),
        &[("вышэй", &[("Degree", "Cmp")])],
    );
    lexicon.add_paradigm(
        lemma(4, "мой", Upos::Det, &[("Poss", "Yes"), ("PronType", "Prs")]),
        &[
            ("мой", &[("Case", "Nom"), ("Gender", "Masc"), ("Number", "Sing")]),
            ("мая", &[("Case", "Nom"), ("Gender", "Fem"), ("Number", "Sing")]),
        ],
    );
    lexicon.add_paradigm(
        lemma(5, "май", Upos::Noun, &[("Animacy", "Inan"), ("Gender", "Masc")]),
        &[
            ("май", &[("Case", "Nom"), ("Number", "Sing")]),
            ("мая", &[("Case", "Gen"), ("Number", "Sing")]),
        ],
    );
    lexicon.add_paradigm(
        lemma(6, "Мінск", Upos::Propn, &[("Animacy", "Inan"), ("Gender", "Masc")]),
        &[("Мінск", &[("Case", "Nom"), ("Number", "Sing")])],
    );
    lexicon.add_paradigm(
        lemma(7, "у", Upos::Adp, &[]),
        &[("у", &[])],
    );

    lexicon.insert_lemma(lemma(8, "мука", Upos::Noun, &[("Animacy", "Inan"), ("Gender", "Fem")]));
    for (id, variant, accent) in [(100, 1, "1"), (101, 2, "3")] {
        lexicon.insert_form(FormEntry {
            id,
            lemma_id: 8,
            form: "мука".to_string(),
            features: [("Case", "Nom"), ("Number", "Sing")].into_iter().collect(),
            variant: Some(variant),
            accent: Some(accent.to_string()),
        });
    }

    lexicon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconStore;
    use crate::tokenizer::tokenize;

    #[test]
    fn test_demo_texts_are_nonempty() {
        let texts = demo_texts();
        assert!(texts.len() >= 5);
        for (title, text) in texts {
            assert!(!title.is_empty());
            assert!(tokenize(text).len() > 5, "demo text {title:?} too short");
        }
    }

    #[test]
    fn test_sample_lexicon_ambiguity() {
        let lexicon = sample_lexicon();
        let ids = lexicon.search_forms("мая", true).unwrap();
        assert_eq!(ids.len(), 2);
        let lemmas: Vec<String> = ids
            .into_iter()
            .filter_map(|id| lexicon.form_record(id).unwrap())
            .map(|r| r.lemma)
            .collect();
        assert_eq!(lemmas, vec!["мой", "май"]);
    }

    #[test]
    fn test_sample_lexicon_case() {
        let lexicon = sample_lexicon();
        assert!(lexicon.search_forms("Ён", true).unwrap().is_empty());
        assert_eq!(lexicon.search_forms("Ён", false).unwrap().len(), 1);
    }

    #[test]
    fn test_stress_duplicates() {
        let lexicon = sample_lexicon();
        let ids = lexicon.search_forms("мука", true).unwrap();
        assert_eq!(ids, vec![100, 101]);
    }
}
