//! Page layout: turns annotated pieces into the ordered section list that both
//! document builders consume.
//!
//! # Rule
//! For each piece, with `T` the character threshold:
//! - image present and visible text shorter than `T` → one `side` section
//!   (text and picture on the same page)
//! - otherwise → a `solo` text section, followed by a `picture` section when
//!   the piece has an image
//!
//! `plan_sections` is the pure decision; `assemble` additionally takes
//! ownership of the images and renders their previews.

use std::sync::LazyLock;

use bytes::Bytes;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::layout::images::{data_uri, halve_image, ImageAsset, ImageAssetError};

pub const DEFAULT_CHAR_THRESHOLD: usize = 500;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").expect("static regex")
});

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Text and image on one page.
    Side,
    /// Text only.
    Solo,
    /// Image only.
    Picture,
}

impl SectionKind {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Side => "side",
            Self::Solo => "solo",
            Self::Picture => "picture",
        }
    }
}

/// One annotated piece awaiting layout.
#[derive(Debug, Clone)]
pub struct LayoutUnit {
    pub piece_index: usize,
    /// Annotated XHTML fragment.
    pub html: String,
    pub image: Option<ImageAsset>,
}

/// One page of the book. `image` indexes into `BookLayout::images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSection {
    pub kind: SectionKind,
    pub piece_index: usize,
    pub text_html: Option<String>,
    pub image: Option<usize>,
}

/// An illustration as it appears in the book: the full asset for the EPUB and a
/// half-size JPEG for the flattened document.
#[derive(Debug, Clone)]
pub struct ImageSlot {
    /// Name inside the EPUB container, e.g. `img2.png`.
    pub file_name: String,
    pub full: ImageAsset,
    pub preview: Bytes,
}

impl ImageSlot {
    pub fn preview_data_uri(&self) -> String {
        data_uri("image/jpeg", &self.preview)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookLayout {
    pub sections: Vec<PageSection>,
    pub images: Vec<ImageSlot>,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Length of the text a reader sees: markup removed, each entity one character.
/// Ruby readings count, as they did when the piece was measured for layout.
pub fn visible_len(html: &str) -> usize {
    let text = TAG.replace_all(html, "");
    let entities = ENTITY.find_iter(&text).count();
    let entity_chars: usize = ENTITY.find_iter(&text).map(|m| m.as_str().chars().count()).sum();
    text.chars().count() - entity_chars + entities
}

/// Decides the section sequence for `units` in order. Image indices count the
/// units that carry an image.
pub fn plan_sections(units: &[LayoutUnit], threshold: usize) -> Vec<PageSection> {
    let mut sections = Vec::with_capacity(units.len() * 2);
    let mut next_image = 0usize;

    for unit in units {
        let image = unit.image.as_ref().map(|_| {
            next_image += 1;
            next_image - 1
        });
        let len = visible_len(&unit.html);

        match image {
            Some(slot) if len < threshold => sections.push(PageSection {
                kind: SectionKind::Side,
                piece_index: unit.piece_index,
                text_html: Some(unit.html.clone()),
                image: Some(slot),
            }),
            _ => {
                sections.push(PageSection {
                    kind: SectionKind::Solo,
                    piece_index: unit.piece_index,
                    text_html: Some(unit.html.clone()),
                    image: None,
                });
                if let Some(slot) = image {
                    sections.push(PageSection {
                        kind: SectionKind::Picture,
                        piece_index: unit.piece_index,
                        text_html: None,
                        image: Some(slot),
                    });
                }
            }
        }
    }

    sections
}

/// Plans the sections and renders every image preview. CPU-bound.
pub fn assemble(units: Vec<LayoutUnit>, threshold: usize) -> Result<BookLayout, ImageAssetError> {
    let sections = plan_sections(&units, threshold);

    let mut images = Vec::new();
    for unit in units {
        let Some(full) = unit.image else { continue };
        let preview = Bytes::from(halve_image(&full.bytes)?);
        images.push(ImageSlot {
            file_name: format!("img{}.{}", unit.piece_index, full.extension),
            full,
            preview,
        });
    }

    debug!(
        sections = sections.len(),
        images = images.len(),
        threshold,
        "assembled book layout"
    );
    Ok(BookLayout { sections, images })
}
