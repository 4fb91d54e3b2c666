//! Curriculum grade table: which elementary school grade teaches each kanji.
//!
//! The table ships with the binary (`data/kanji_by_grade.json`, the 2020 MEXT
//! allocation, 1,026 kanji over grades 1–6) and is loaded once into an
//! immutable `GradeTable`. Lookups go through a precomputed char → grade index.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// Grade reported for kanji that appear in no grade's set (secondary-school or rarer).
/// Greater than every real grade, so such kanji are always over-grade.
pub const UNGRADED: u8 = 99;

/// Elementary grades run from `MIN_GRADE` to `MAX_GRADE` inclusive.
pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 6;

const BUILTIN_TABLE: &str = include_str!("../../data/kanji_by_grade.json");

#[derive(Debug, Error)]
pub enum GradeTableError {
    #[error("grade table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("grade key '{0}' is not a grade between 1 and 6")]
    InvalidGrade(String),

    #[error("grade {grade} entry '{entry}' is not a single kanji")]
    InvalidEntry { grade: u8, entry: String },

    #[error("kanji {kanji} listed in both grade {first} and grade {second}")]
    Duplicate { kanji: char, first: u8, second: u8 },
}

/// Immutable grade → kanji mapping with an O(1) reverse index.
#[derive(Debug, Clone)]
pub struct GradeTable {
    by_grade: BTreeMap<u8, Vec<char>>,
    index: HashMap<char, u8>,
}

impl GradeTable {
    /// Loads the embedded MEXT table.
    pub fn builtin() -> Result<Self, GradeTableError> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Parses `{"1": ["一", "右", ...], "2": [...], ...}`.
    pub fn from_json(json: &str) -> Result<Self, GradeTableError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;

        let mut grades = Vec::with_capacity(raw.len());
        for (key, entries) in raw {
            let grade = key
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|g| (MIN_GRADE..=MAX_GRADE).contains(g))
                .ok_or_else(|| GradeTableError::InvalidGrade(key.clone()))?;

            let mut chars = Vec::with_capacity(entries.len());
            for entry in entries {
                let mut it = entry.chars();
                match (it.next(), it.next()) {
                    (Some(c), None) if is_kanji(c) => chars.push(c),
                    _ => return Err(GradeTableError::InvalidEntry { grade, entry }),
                }
            }
            grades.push((grade, chars));
        }

        Self::from_grades(grades)
    }

    /// Builds a table from explicit per-grade kanji lists.
    ///
    /// Curriculum kanji are grade-exclusive: a character listed under two grades
    /// is rejected rather than silently resolved.
    pub fn from_grades<I>(grades: I) -> Result<Self, GradeTableError>
    where
        I: IntoIterator<Item = (u8, Vec<char>)>,
    {
        let mut by_grade: BTreeMap<u8, Vec<char>> = BTreeMap::new();
        let mut index = HashMap::new();

        for (grade, chars) in grades {
            if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
                return Err(GradeTableError::InvalidGrade(grade.to_string()));
            }
            let slot = by_grade.entry(grade).or_default();
            for c in chars {
                if let Some(&first) = index.get(&c) {
                    if first == grade {
                        continue;
                    }
                    return Err(GradeTableError::Duplicate {
                        kanji: c,
                        first,
                        second: grade,
                    });
                }
                index.insert(c, grade);
                slot.push(c);
            }
        }

        Ok(Self { by_grade, index })
    }

    /// Classifies a character: `None` for non-kanji, the teaching grade for
    /// curriculum kanji, `UNGRADED` for every other kanji.
    pub fn grade_of(&self, ch: char) -> Option<u8> {
        if !is_kanji(ch) {
            return None;
        }
        Some(self.index.get(&ch).copied().unwrap_or(UNGRADED))
    }

    /// True when `ch` is a kanji taught after `grade` (ungraded kanji included).
    pub fn exceeds(&self, ch: char, grade: u8) -> bool {
        self.grade_of(ch).is_some_and(|g| g > grade)
    }

    /// True when `ch` is taught in exactly `grade`.
    pub fn in_grade(&self, ch: char, grade: u8) -> bool {
        self.index.get(&ch) == Some(&grade)
    }

    /// Kanji of one grade, in table order. Empty for unknown grades.
    pub fn kanji_for(&self, grade: u8) -> &[char] {
        self.by_grade.get(&grade).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of tabulated kanji across all grades.
    pub fn len(&self) -> usize {
        self.index.len()
    }
}

/// CJK unified ideographs, base block and extensions. Compatibility ideographs
/// and the iteration mark 々 are deliberately outside.
pub fn is_kanji(ch: char) -> bool {
    matches!(ch as u32,
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2EBEF
        | 0x30000..=0x323AF)
}

/// Hiragana or katakana, including the prolonged sound mark, voicing marks
/// and halfwidth katakana.
pub fn is_kana(ch: char) -> bool {
    matches!(ch as u32,
        0x3041..=0x309F
        | 0x30A0..=0x30FF
        | 0x31F0..=0x31FF
        | 0xFF66..=0xFF9F
        | 0x1B000..=0x1B16F)
}
