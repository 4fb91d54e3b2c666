//! Phonetic normalization: katakana readings to hiragana, and the
//! per-character transliteration used when the analyzer has no reading.

/// Per-character kana/romaji conversion for arbitrary Japanese text.
///
/// Used as the fallback reading source and for romanization (long-vowel
/// resolution, slugs).
pub trait Transliterator: Send + Sync {
    /// Reading of `text` in hiragana; characters without a known reading pass through.
    fn to_hiragana(&self, text: &str) -> String;

    /// Hepburn romanization of `text`.
    fn to_romaji(&self, text: &str) -> String;
}

/// Dictionary-backed transliterator (KAKASI kanji/kana tables).
#[derive(Debug, Clone, Copy, Default)]
pub struct KakasiTransliterator;

impl Transliterator for KakasiTransliterator {
    fn to_hiragana(&self, text: &str) -> String {
        kakasi::convert(text).hiragana
    }

    fn to_romaji(&self, text: &str) -> String {
        kakasi::convert(text).romaji
    }
}

const LONG_VOWEL_MARK: char = 'ー';

/// Converts katakana to hiragana by code point. Characters outside the
/// convertible katakana range (including ー) are returned unchanged.
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ァ'..='ヶ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Converts a katakana reading into hiragana, spelling out each long-vowel mark
/// as the vowel that continues the previous mora.
///
/// The e and o rows fold onto い and う (せんせー → せんせい, こーひー → こうひい),
/// which is how these long vowels are written in hiragana. A leading ー is dropped.
pub fn normalize_reading(katakana: &str, translit: &dyn Transliterator) -> String {
    let mut out: Vec<char> = Vec::with_capacity(katakana.chars().count());

    for c in katakana_to_hiragana(katakana).chars() {
        if c != LONG_VOWEL_MARK {
            out.push(c);
            continue;
        }
        let Some(&prev) = out.last() else {
            continue;
        };
        let romaji = translit.to_romaji(prev.encode_utf8(&mut [0u8; 4]));
        out.push(continuation_vowel(&romaji));
    }

    out.into_iter().collect()
}

/// Hiragana vowel for the last vowel letter of a romanized mora; `u` when none.
fn continuation_vowel(romaji: &str) -> char {
    let vowel = romaji
        .chars()
        .rev()
        .find(|c| matches!(c, 'a' | 'i' | 'u' | 'e' | 'o'))
        .unwrap_or('u');
    match vowel {
        'a' => 'あ',
        'i' | 'e' => 'い',
        _ => 'う',
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use super::Transliterator;

    /// Table-driven transliterator for deterministic tests. Unknown characters
    /// pass through unchanged in both directions.
    #[derive(Debug, Default)]
    pub struct TableTransliterator {
        hiragana: HashMap<char, &'static str>,
        romaji: HashMap<char, &'static str>,
    }

    impl TableTransliterator {
        pub fn new() -> Self {
            #[rustfmt::skip]
            let romaji = [
                ('あ', "a"), ('い', "i"), ('う', "u"), ('え', "e"), ('お', "o"),
                ('か', "ka"), ('き', "ki"), ('く', "ku"), ('け', "ke"), ('こ', "ko"),
                ('さ', "sa"), ('し', "shi"), ('す', "su"), ('せ', "se"), ('そ', "so"),
                ('た', "ta"), ('ち', "chi"), ('つ', "tsu"), ('て', "te"), ('と', "to"),
                ('な', "na"), ('に', "ni"), ('ぬ', "nu"), ('ね', "ne"), ('の', "no"),
                ('は', "ha"), ('ひ', "hi"), ('ふ', "fu"), ('へ', "he"), ('ほ', "ho"),
                ('ま', "ma"), ('み', "mi"), ('む', "mu"), ('め', "me"), ('も', "mo"),
                ('や', "ya"), ('ゆ', "yu"), ('よ', "yo"),
                ('ら', "ra"), ('り', "ri"), ('る', "ru"), ('れ', "re"), ('ろ', "ro"),
                ('わ', "wa"), ('を', "wo"), ('ん', "n"),
                ('が', "ga"), ('ぎ', "gi"), ('ぐ', "gu"), ('げ', "ge"), ('ご', "go"),
                ('だ', "da"), ('で', "de"), ('ど', "do"), ('ば', "ba"), ('べ', "be"),
                ('ぼ', "bo"), ('ぱ', "pa"), ('ぴ', "pi"), ('ぽ', "po"), ('っ', ""),
                ('ゃ', "ya"), ('ゅ', "yu"), ('ょ', "yo"),
                ('山', "yama"), ('川', "kawa"), ('猫', "neko"), ('魚', "sakana"),
            ]
            .into_iter()
            .collect();
            let hiragana = [
                ('山', "やま"), ('川', "かわ"), ('猫', "ねこ"), ('魚', "さかな"), ('鬱', "うつ"),
            ]
            .into_iter()
            .collect();
            Self { hiragana, romaji }
        }
    }

    impl Transliterator for TableTransliterator {
        fn to_hiragana(&self, text: &str) -> String {
            let kana = super::katakana_to_hiragana(text);
            kana.chars()
                .map(|c| self.hiragana.get(&c).map(|s| s.to_string()).unwrap_or(c.to_string()))
                .collect()
        }

        fn to_romaji(&self, text: &str) -> String {
            let kana = super::katakana_to_hiragana(text);
            kana.chars()
                .map(|c| self.romaji.get(&c).map(|s| s.to_string()).unwrap_or(c.to_string()))
                .collect()
        }
    }
}
