//! Filesystem-safe romanized identifiers for book titles.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::Transliterator;

pub const DEFAULT_SLUG_LEN: usize = 50;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("static regex"));

/// Romanizes `text` and reduces it to `[a-z0-9_]`, at most `maxlen` characters.
/// Returns `"untitled"` when nothing survives.
pub fn romaji_slug(text: &str, maxlen: usize, translit: &dyn Transliterator) -> String {
    let romaji = translit.to_romaji(text);
    let collapsed = NON_ALNUM.replace_all(&romaji, "_");
    let mut slug = collapsed.trim_matches('_').to_ascii_lowercase();
    // Only ASCII remains, so byte truncation is char-safe.
    slug.truncate(maxlen);

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::phonetic::test_support::TableTransliterator;

    #[test]
    fn test_slug_romanizes_japanese() {
        let t = TableTransliterator::new();
        assert_eq!(romaji_slug("山と川", DEFAULT_SLUG_LEN, &t), "yamatokawa");
    }

    #[test]
    fn test_slug_collapses_punctuation_and_lowercases() {
        let t = TableTransliterator::new();
        assert_eq!(
            romaji_slug("  My Story: Part 2!! ", DEFAULT_SLUG_LEN, &t),
            "my_story_part_2"
        );
    }

    #[test]
    fn test_slug_mixed_script_separator() {
        let t = TableTransliterator::new();
        assert_eq!(romaji_slug("猫 Cat。", DEFAULT_SLUG_LEN, &t), "neko_cat");
    }

    #[test]
    fn test_slug_truncated() {
        let t = TableTransliterator::new();
        let slug = romaji_slug(&"a".repeat(80), DEFAULT_SLUG_LEN, &t);
        assert_eq!(slug.len(), 50);
        assert_eq!(romaji_slug("abcdef", 3, &t), "abc");
    }

    #[test]
    fn test_slug_empty_is_untitled() {
        let t = TableTransliterator::new();
        assert_eq!(romaji_slug("", DEFAULT_SLUG_LEN, &t), "untitled");
        assert_eq!(romaji_slug("!!!。", DEFAULT_SLUG_LEN, &t), "untitled");
    }
}
