//! Story validation: no kanji above the target grade, and each required kanji
//! used often enough.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::text::GradeTable;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoryValidationError {
    #[error("disallowed kanji {kanji} (grade {found}) in a grade {grade} story")]
    DisallowedKanji { kanji: char, found: u8, grade: u8 },

    #[error("kanji {kanji} appears {count} times, {required} required")]
    InsufficientFrequency {
        kanji: char,
        count: usize,
        required: usize,
    },
}

/// Checks `text` against the grade ceiling, then the minimum frequency of each
/// required kanji in the caller's order. The first violation is returned.
pub fn validate_story(
    text: &str,
    grade: u8,
    required: &[char],
    min_freq: usize,
    grades: &GradeTable,
) -> Result<(), StoryValidationError> {
    let mut counts = vec![0usize; required.len()];

    for ch in text.chars() {
        if let Some(found) = grades.grade_of(ch) {
            if found > grade {
                return Err(StoryValidationError::DisallowedKanji {
                    kanji: ch,
                    found,
                    grade,
                });
            }
        }
        for (slot, _) in required.iter().enumerate().filter(|(_, k)| **k == ch) {
            counts[slot] += 1;
        }
    }

    match required
        .iter()
        .zip(&counts)
        .find(|(_, count)| **count < min_freq)
    {
        Some((&kanji, &count)) => Err(StoryValidationError::InsufficientFrequency {
            kanji,
            count,
            required: min_freq,
        }),
        None => Ok(()),
    }
}

/// How the pipeline treats a validation failure on the sanitized story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Skip validation entirely.
    #[default]
    Off,
    /// Log the violation and keep going.
    Warn,
    /// Abort the run.
    Enforce,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "warn" => Ok(Self::Warn),
            "enforce" => Ok(Self::Enforce),
            other => Err(format!("unknown validation mode '{other}' (off|warn|enforce)")),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Warn => "warn",
            Self::Enforce => "enforce",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::test_support::grades;

    #[test]
    fn test_valid_story_passes() {
        let table = grades();
        let text = "海で魚を見る。海の魚。";
        assert_eq!(validate_story(text, 2, &['海', '魚'], 2, &table), Ok(()));
    }

    #[test]
    fn test_over_grade_kanji_rejected() {
        let table = grades();
        let err = validate_story("海で泳ぐ", 2, &['海'], 1, &table).unwrap_err();
        assert_eq!(
            err,
            StoryValidationError::DisallowedKanji {
                kanji: '泳',
                found: 3,
                grade: 2
            }
        );
    }

    #[test]
    fn test_untabulated_kanji_rejected_at_any_grade() {
        let table = grades();
        let err = validate_story("猫", 6, &[], 0, &table).unwrap_err();
        assert!(matches!(
            err,
            StoryValidationError::DisallowedKanji { kanji: '猫', found: 99, .. }
        ));
    }

    #[test]
    fn test_first_insufficient_kanji_in_caller_order() {
        let table = grades();
        let err = validate_story("海海魚", 2, &['読', '魚', '海'], 2, &table).unwrap_err();
        assert_eq!(
            err,
            StoryValidationError::InsufficientFrequency {
                kanji: '読',
                count: 0,
                required: 2
            }
        );
    }

    #[test]
    fn test_zero_min_freq_always_satisfied() {
        let table = grades();
        assert!(validate_story("", 1, &['山'], 0, &table).is_ok());
    }

    #[test]
    fn test_validation_mode_parse() {
        assert_eq!("off".parse::<ValidationMode>(), Ok(ValidationMode::Off));
        assert_eq!(" WARN ".parse::<ValidationMode>(), Ok(ValidationMode::Warn));
        assert_eq!("enforce".parse::<ValidationMode>(), Ok(ValidationMode::Enforce));
        assert!("strict".parse::<ValidationMode>().is_err());
        assert_eq!(ValidationMode::default(), ValidationMode::Off);
    }
}
