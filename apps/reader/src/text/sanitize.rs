//! Sanitizer: rewrites every token that contains a kanji above the target
//! grade into its hiragana reading.

use tracing::debug;

use crate::text::TextContext;

/// Replaces over-grade tokens with their reading; every other token is kept verbatim.
///
/// A token with no reading from either source is left as-is, so an over-grade
/// kanji can survive here. `validate_story` reports such leftovers.
pub fn sanitize(text: &str, grade: u8, ctx: &TextContext) -> String {
    let tokens = ctx.tokenizer.tokenize(text);
    let mut out = String::with_capacity(text.len());
    let mut replaced = 0usize;

    for token in &tokens {
        let over_grade = token.surface.chars().any(|c| ctx.grades.exceeds(c, grade));
        if !over_grade {
            out.push_str(&token.surface);
            continue;
        }
        match ctx.reading_of(token) {
            Some(reading) => {
                out.push_str(&reading);
                replaced += 1;
            }
            None => out.push_str(&token.surface),
        }
    }

    debug!(tokens = tokens.len(), replaced, grade, "sanitized text");
    out
}
