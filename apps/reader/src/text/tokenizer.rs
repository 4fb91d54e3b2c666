//! Tokenizer adapter: the seam between the text pipeline and a morphological analyzer.
//!
//! The pipeline only needs, per token, the surface text and (when the dictionary
//! has one) a katakana reading. `VibratoTokenizer` provides that on top of the
//! `vibrato` analyzer with a MeCab-format system dictionary (UniDic by default).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::info;

/// UniDic feature column holding the pronunciation (`pron`), which keeps the
/// long-vowel mark as spoken.
pub const DEFAULT_READING_FIELD: usize = 9;

/// One analyzer token. Surfaces of consecutive tokens concatenate back to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub surface: String,
    /// Katakana reading; absent for out-of-vocabulary spans.
    pub reading: Option<String>,
}

impl Token {
    pub fn new(surface: impl Into<String>, reading: Option<&str>) -> Self {
        Self {
            surface: surface.into(),
            reading: reading.map(str::to_string),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to open dictionary {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load dictionary {path}: {message}")]
    Dictionary { path: String, message: String },
}

/// Splits text into ordered tokens. Implementations must be shareable across
/// concurrent pipeline runs.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// `vibrato`-backed tokenizer.
pub struct VibratoTokenizer {
    inner: vibrato::Tokenizer,
    reading_field: usize,
}

impl VibratoTokenizer {
    /// Loads a compiled system dictionary. Files ending in `.zst` are
    /// decompressed on the fly (the form vibrato's prebuilt dictionaries ship in).
    pub fn from_path(path: &Path, reading_field: usize) -> Result<Self, TokenizerError> {
        let shown = path.display().to_string();
        let file = File::open(path).map_err(|source| TokenizerError::Io {
            path: shown.clone(),
            source,
        })?;

        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "zst") {
            let decoder = zstd::Decoder::new(file).map_err(|source| TokenizerError::Io {
                path: shown.clone(),
                source,
            })?;
            Box::new(decoder)
        } else {
            Box::new(BufReader::new(file))
        };

        let dict =
            vibrato::Dictionary::read(reader).map_err(|e| TokenizerError::Dictionary {
                path: shown.clone(),
                message: e.to_string(),
            })?;

        info!("Loaded tokenizer dictionary from {shown} (reading field {reading_field})");

        Ok(Self {
            inner: vibrato::Tokenizer::new(dict),
            reading_field,
        })
    }
}

impl Tokenizer for VibratoTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut worker = self.inner.new_worker();
        worker.reset_sentence(text);
        worker.tokenize();

        let mut tokens = Vec::with_capacity(worker.num_tokens());
        let mut cursor = 0usize;

        for t in worker.token_iter() {
            let range = t.range_byte();
            // Spans the analyzer skipped (e.g. ignored whitespace) stay in the
            // output as reading-less tokens.
            if range.start > cursor {
                tokens.push(Token::new(&text[cursor..range.start], None));
            }
            tokens.push(Token {
                surface: t.surface().to_string(),
                reading: reading_from_feature(t.feature(), self.reading_field),
            });
            cursor = range.end;
        }
        if cursor < text.len() {
            tokens.push(Token::new(&text[cursor..], None));
        }

        tokens
    }
}

/// Extracts the reading column from a CSV feature string. `*` and missing
/// columns mean the dictionary has no reading for the token.
pub fn reading_from_feature(feature: &str, field: usize) -> Option<String> {
    split_feature(feature)
        .into_iter()
        .nth(field)
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty() && f != "*")
}

/// Quote-aware CSV split. UniDic quotes fields that themselves contain commas.
fn split_feature(feature: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = feature.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIDIC_TABERU: &str =
        "動詞,一般,*,*,下一段-バ行,連用形-一般,タベル,食べる,食べ,タベ,食べる,タベル,和,*,*,*,*";

    #[test]
    fn test_reading_from_unidic_feature() {
        assert_eq!(
            reading_from_feature(UNIDIC_TABERU, DEFAULT_READING_FIELD),
            Some("タベ".to_string())
        );
    }

    #[test]
    fn test_reading_missing_column_is_none() {
        // Unknown-word features carry only the part-of-speech columns.
        let unk = "名詞,普通名詞,一般,*,*,*";
        assert_eq!(reading_from_feature(unk, DEFAULT_READING_FIELD), None);
    }

    #[test]
    fn test_reading_asterisk_is_none() {
        let feature = "記号,一般,*,*,*,*,*,*,*,*";
        assert_eq!(reading_from_feature(feature, DEFAULT_READING_FIELD), None);
    }

    #[test]
    fn test_split_feature_respects_quotes() {
        let fields = split_feature(r#"補助記号,読点,*,*,*,*,,,",",*"#);
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[8], ",");
    }

    #[test]
    fn test_split_feature_escaped_quote() {
        let fields = split_feature(r#"a,"say ""hi""",b"#);
        assert_eq!(fields, vec!["a", r#"say "hi""#, "b"]);
    }

    #[test]
    fn test_missing_dictionary_is_io_error() {
        let result = VibratoTokenizer::from_path(Path::new("/nonexistent/system.dic.zst"), 9);
        assert!(matches!(result, Err(TokenizerError::Io { .. })));
    }
}
