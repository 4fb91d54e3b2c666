// Grade-aware text transformation: classification, sanitizing, furigana.
// Everything here is synchronous and CPU-bound; async callers hop onto the
// blocking pool (tokio::task::spawn_blocking) before calling in.

pub mod grades;
pub mod phonetic;
pub mod ruby;
pub mod sanitize;
pub mod slug;
pub mod tokenizer;
pub mod validation;

use std::sync::Arc;

pub use grades::GradeTable;
pub use phonetic::{KakasiTransliterator, Transliterator};
pub use ruby::inject_ruby;
pub use sanitize::sanitize;
pub use slug::romaji_slug;
pub use tokenizer::{Token, Tokenizer, VibratoTokenizer};
pub use validation::{validate_story, StoryValidationError, ValidationMode};

/// Everything the text pipeline reads: the grade table, the analyzer and the
/// fallback transliterator. Built once at startup, never mutated, cheap to clone.
#[derive(Clone)]
pub struct TextContext {
    pub grades: Arc<GradeTable>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub transliterator: Arc<dyn Transliterator>,
}

impl TextContext {
    pub fn new(
        grades: GradeTable,
        tokenizer: Arc<dyn Tokenizer>,
        transliterator: Arc<dyn Transliterator>,
    ) -> Self {
        Self {
            grades: Arc::new(grades),
            tokenizer,
            transliterator,
        }
    }

    /// Hiragana reading of a token: the analyzer's reading when present,
    /// otherwise the per-character transliteration of the surface.
    /// `None` when neither source yields anything.
    pub fn reading_of(&self, token: &Token) -> Option<String> {
        let reading = match token.reading.as_deref() {
            Some(kata) if !kata.is_empty() => {
                phonetic::normalize_reading(kata, self.transliterator.as_ref())
            }
            _ => self.transliterator.to_hiragana(&token.surface),
        };
        (!reading.is_empty()).then_some(reading)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::grades::GradeTable;
    use super::phonetic::test_support::TableTransliterator;
    use super::tokenizer::{Token, Tokenizer};
    use super::TextContext;

    /// Greedy longest-match tokenizer over a fixed lexicon. Characters not
    /// covered by any entry become single-character tokens without a reading.
    pub struct LexiconTokenizer {
        entries: Vec<(&'static str, Option<&'static str>)>,
    }

    impl LexiconTokenizer {
        pub fn new(mut entries: Vec<(&'static str, Option<&'static str>)>) -> Self {
            entries.sort_by_key(|(surface, _)| std::cmp::Reverse(surface.chars().count()));
            Self { entries }
        }
    }

    impl Tokenizer for LexiconTokenizer {
        fn tokenize(&self, text: &str) -> Vec<Token> {
            let mut tokens = Vec::new();
            let mut rest = text;
            while !rest.is_empty() {
                if let Some((surface, reading)) =
                    self.entries.iter().find(|(s, _)| rest.starts_with(*s))
                {
                    tokens.push(Token::new(*surface, *reading));
                    rest = &rest[surface.len()..];
                } else {
                    let c = rest.chars().next().unwrap();
                    tokens.push(Token::new(c.to_string(), None));
                    rest = &rest[c.len_utf8()..];
                }
            }
            tokens
        }
    }

    /// Lexicon shared by the text-pipeline tests. Readings are katakana the way
    /// a UniDic `pron` column delivers them.
    pub fn lexicon() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("食べる", Some("タベル")),
            ("食べ", Some("タベ")),
            ("読み", Some("ヨミ")),
            ("読む", Some("ヨム")),
            ("山", Some("ヤマ")),
            ("川", Some("カワ")),
            ("海", Some("ウミ")),
            ("泳ぐ", Some("オヨグ")),
            ("魚", Some("サカナ")),
            ("鬱", None),
            ("猫", None),
            ("先生", Some("センセー")),
            ("学校", Some("ガッコー")),
            ("見る", Some("ミル")),
            ("大きい", Some("オーキイ")),
            ("ます", Some("マス")),
            ("は", Some("ワ")),
            ("を", Some("オ")),
            ("に", Some("ニ")),
            ("で", Some("デ")),
            ("が", Some("ガ")),
            ("の", Some("ノ")),
            ("と", Some("ト")),
            ("。", None),
        ]
    }

    /// Grade table used by the text tests: 山川先生学校見大 grade 1,
    /// 海魚読食 grade 2, 泳 grade 3. 猫 and 鬱 are untabulated.
    pub fn grades() -> GradeTable {
        GradeTable::from_grades([
            (1, vec!['山', '川', '先', '生', '学', '校', '見', '大']),
            (2, vec!['海', '魚', '読', '食']),
            (3, vec!['泳']),
        ])
        .unwrap()
    }

    pub fn context() -> TextContext {
        TextContext::new(
            grades(),
            Arc::new(LexiconTokenizer::new(lexicon())),
            Arc::new(TableTransliterator::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;

    #[test]
    fn test_reading_prefers_tokenizer_reading() {
        let ctx = context();
        let token = Token::new("先生", Some("センセー"));
        assert_eq!(ctx.reading_of(&token).as_deref(), Some("せんせい"));
    }

    #[test]
    fn test_reading_falls_back_to_transliteration() {
        let ctx = context();
        let token = Token::new("猫", None);
        assert_eq!(ctx.reading_of(&token).as_deref(), Some("ねこ"));
    }

    #[test]
    fn test_reading_empty_surface_is_none() {
        let ctx = context();
        assert_eq!(ctx.reading_of(&Token::new("", None)), None);
    }
}
