// Document builders. Both outputs are driven by the same BookLayout section
// list; the only difference between an EPUB page and a flattened page is where
// the <img> source points.

pub mod epub;
pub mod html;

use crate::layout::{BookLayout, ImageSlot, PageSection, SectionKind};

pub use epub::{write_epub, EpubMetadata};
pub use html::render_document;

/// Where a section's `<img src>` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// File name of the full-size image inside the EPUB container.
    Asset,
    /// Base64 `data:` URI of the half-size preview.
    Inline,
}

/// Renders one section as an XHTML `<section>` fragment.
pub fn render_section(section: &PageSection, images: &[ImageSlot], source: ImageSource) -> String {
    let class = section.kind.css_class();
    let text = section.text_html.as_deref().unwrap_or_default();
    let img = section
        .image
        .and_then(|i| images.get(i))
        .map(|slot| {
            let src = match source {
                ImageSource::Asset => slot.file_name.clone(),
                ImageSource::Inline => slot.preview_data_uri(),
            };
            format!(r#"<img src="{}" alt=""/>"#, escape_xml(&src))
        })
        .unwrap_or_default();

    match section.kind {
        SectionKind::Side => {
            format!(r#"<section class="{class}"><div class="text">{text}</div>{img}</section>"#)
        }
        SectionKind::Solo => format!(r#"<section class="{class}">{text}</section>"#),
        SectionKind::Picture => format!(r#"<section class="{class}">{img}</section>"#),
    }
}

/// Section fragments for the EPUB, one per spine page.
pub fn epub_pages(layout: &BookLayout) -> Vec<String> {
    pages(layout, ImageSource::Asset)
}

/// Section fragments for the flattened document, one per printed page.
pub fn html_pages(layout: &BookLayout) -> Vec<String> {
    pages(layout, ImageSource::Inline)
}

fn pages(layout: &BookLayout, source: ImageSource) -> Vec<String> {
    layout
        .sections
        .iter()
        .map(|s| render_section(s, &layout.images, source))
        .collect()
}

/// Escapes text for XML content and attribute values.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::layout::images::test_support::png;
    use crate::layout::{assemble, BookLayout, ImageAsset, LayoutUnit};

    /// Two pieces: a short illustrated one (side) and a long illustrated one
    /// (solo + picture). The images differ so their previews do too.
    pub fn sample_layout() -> BookLayout {
        let units = vec![
            LayoutUnit {
                piece_index: 1,
                html: "<ruby>海<rt>うみ</rt></ruby>で".to_string(),
                image: Some(ImageAsset::from_bytes(png(16, 16)).unwrap()),
            },
            LayoutUnit {
                piece_index: 2,
                html: "あ".repeat(600),
                image: Some(ImageAsset::from_bytes(png(24, 12)).unwrap()),
            },
        ];
        assemble(units, 500).unwrap()
    }
}
