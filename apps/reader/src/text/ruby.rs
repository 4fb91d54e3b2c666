//! Ruby annotation: furigana over every kanji of the target grade.
//!
//! Runs on text that has already been sanitized for the same grade, so the
//! only kanji left are at or below it. Kanji of earlier grades are assumed
//! known and stay bare; kanji of the target grade get `<ruby>` markup.
//!
//! Okurigana never gets a reading: the trailing kana shared by surface and
//! reading (食べる / たべる → べる) is cut off and emitted after the ruby.

use crate::text::grades::is_kana;
use crate::text::TextContext;

/// A token split into the annotated stem and its literal okurigana.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubySplit {
    /// Surface prefix that receives the annotation.
    pub core: String,
    /// Reading of `core`.
    pub ruby: String,
    /// Trailing kana copied verbatim after the annotation.
    pub okurigana: String,
}

/// Strips the trailing run where the surface is kana and matches the reading
/// position for position from the end.
pub fn split_okurigana(surface: &str, reading: &str) -> RubySplit {
    let surf: Vec<char> = surface.chars().collect();
    let read: Vec<char> = reading.chars().collect();

    let okuri_len = surf
        .iter()
        .rev()
        .zip(read.iter().rev())
        .take_while(|(s, r)| is_kana(**s) && s == r)
        .count();

    RubySplit {
        core: surf[..surf.len() - okuri_len].iter().collect(),
        ruby: read[..read.len() - okuri_len].iter().collect(),
        okurigana: surf[surf.len() - okuri_len..].iter().collect(),
    }
}

/// Wraps every token containing a kanji of `grade` in ruby markup.
///
/// Tokens whose computed ruby is empty (pure okurigana, analyzer anomalies)
/// are emitted bare rather than with an empty annotation.
pub fn inject_ruby(text: &str, grade: u8, ctx: &TextContext) -> String {
    let mut out = String::with_capacity(text.len() * 2);

    for token in ctx.tokenizer.tokenize(text) {
        let surface = &token.surface;
        if !surface.chars().any(|c| ctx.grades.in_grade(c, grade)) {
            push_escaped(&mut out, surface);
            continue;
        }

        let Some(reading) = ctx.reading_of(&token) else {
            push_escaped(&mut out, surface);
            continue;
        };

        let split = split_okurigana(surface, &reading);
        if split.ruby.is_empty() {
            push_escaped(&mut out, surface);
            continue;
        }

        out.push_str("<ruby>");
        push_escaped(&mut out, &split.core);
        out.push_str("<rt>");
        push_escaped(&mut out, &split.ruby);
        out.push_str("</rt></ruby>");
        push_escaped(&mut out, &split.okurigana);
    }

    out
}

/// Appends `text` with the XML-significant characters escaped.
fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::text::phonetic::test_support::TableTransliterator;
    use crate::text::sanitize::sanitize;
    use crate::text::test_support::{context, grades, LexiconTokenizer};

    #[test]
    fn test_split_taberu() {
        let split = split_okurigana("食べる", "たべる");
        assert_eq!(split.core, "食");
        assert_eq!(split.ruby, "た");
        assert_eq!(split.okurigana, "べる");
    }

    #[test]
    fn test_split_yomi() {
        let split = split_okurigana("読み", "よみ");
        assert_eq!(split.core, "読");
        assert_eq!(split.ruby, "よ");
        assert_eq!(split.okurigana, "み");
    }

    #[test]
    fn test_split_without_okurigana() {
        let split = split_okurigana("先生", "せんせい");
        assert_eq!(split.core, "先生");
        assert_eq!(split.ruby, "せんせい");
        assert_eq!(split.okurigana, "");
    }

    #[test]
    fn test_split_stops_at_first_mismatch() {
        // は is read わ as a particle: the tail differs, nothing is stripped.
        let split = split_okurigana("山は", "やまわ");
        assert_eq!(split.okurigana, "");
        assert_eq!(split.core, "山は");
    }

    #[test]
    fn test_split_reading_shorter_than_surface() {
        let split = split_okurigana("見る", "る");
        assert_eq!(split.core, "見");
        assert_eq!(split.ruby, "");
        assert_eq!(split.okurigana, "る");
    }

    #[test]
    fn test_inject_annotates_target_grade_only() {
        let ctx = context();
        // 海 and 食 are grade 2, 山 is grade 1.
        let html = inject_ruby("山の海で食べる", 2, &ctx);
        assert_eq!(
            html,
            "山の<ruby>海<rt>うみ</rt></ruby>で<ruby>食<rt>た</rt></ruby>べる"
        );
    }

    #[test]
    fn test_inject_long_vowel_reading() {
        let ctx = context();
        let html = inject_ruby("学校", 1, &ctx);
        assert_eq!(html, "<ruby>学校<rt>がっこう</rt></ruby>");
    }

    #[test]
    fn test_inject_without_target_grade_kanji_is_identity() {
        let ctx = context();
        assert_eq!(inject_ruby("山と川", 2, &ctx), "山と川");
    }

    #[test]
    fn test_inject_escapes_markup_characters() {
        let ctx = context();
        assert_eq!(
            inject_ruby("海<&>", 2, &ctx),
            "<ruby>海<rt>うみ</rt></ruby>&lt;&amp;&gt;"
        );
    }

    #[test]
    fn test_empty_ruby_falls_back_to_bare_surface() {
        // The analyzer reads 見る as just ル: after okurigana stripping the
        // stem 見 has no reading left.
        let ctx = TextContext::new(
            grades(),
            Arc::new(LexiconTokenizer::new(vec![("見る", Some("ル")), ("。", None)])),
            Arc::new(TableTransliterator::new()),
        );
        let html = inject_ruby("見る。", 1, &ctx);
        assert_eq!(html, "見る。");
        assert!(!html.contains("<ruby>"));
        assert!(!html.contains("<rt></rt>"));
    }

    #[test]
    fn test_every_target_kanji_annotated_after_sanitize() {
        let ctx = context();
        let text = "先生は海で泳ぐ魚を見る。猫が読む。";
        for grade in 1..=3 {
            let html = inject_ruby(&sanitize(text, grade, &ctx), grade, &ctx);
            // Strip each <ruby>…</ruby> group; no target-grade kanji may remain bare.
            let mut bare = String::new();
            let mut rest = html.as_str();
            while let Some(start) = rest.find("<ruby>") {
                bare.push_str(&rest[..start]);
                let end = rest[start..].find("</ruby>").unwrap() + start;
                let rt = &rest[start..end];
                let ruby_text = &rt[rt.find("<rt>").unwrap() + 4..rt.find("</rt>").unwrap()];
                assert!(!ruby_text.is_empty(), "empty ruby in {html}");
                rest = &rest[end + "</ruby>".len()..];
            }
            bare.push_str(rest);
            assert!(
                !bare.chars().any(|c| ctx.grades.in_grade(c, grade)),
                "grade {grade}: unannotated kanji in {html}"
            );
        }
    }
}
