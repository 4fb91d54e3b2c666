// Page layout: section planning under the character threshold, plus the image
// assets those sections reference. Preview rendering is CPU-bound and must run
// inside tokio::task::spawn_blocking.

pub mod assembler;
pub mod images;

pub use assembler::{
    assemble, BookLayout, ImageSlot, LayoutUnit, PageSection, SectionKind, DEFAULT_CHAR_THRESHOLD,
};
pub use images::{ImageAsset, ImageAssetError};
