//! EPUB 3 writer for vertical, right-to-left readers.
//!
//! Layout of the container:
//! ```text
//! mimetype                  (stored, first entry)
//! META-INF/container.xml
//! OEBPS/content.opf
//! OEBPS/nav.xhtml
//! OEBPS/toc.ncx
//! OEBPS/style.css
//! OEBPS/p{n}.xhtml          one per section, in section order
//! OEBPS/img{n}.{ext}        full-size illustrations
//! ```

use std::io::{self, Seek, Write};

use chrono::{DateTime, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::layout::BookLayout;
use crate::render::{epub_pages, escape_xml};

pub const DEFAULT_AUTHOR: &str = "Offline AI";

const STYLE_CSS: &str = r#"body{writing-mode:vertical-rl;-epub-writing-mode:vertical-rl;font-family:"Noto Serif JP",serif;}
img{max-width:100%;}
section.side .text{writing-mode:vertical-rl;}
section.solo,section.picture{page-break-after:always;}
div.pagebreak{page-break-after:always;}
ruby{ruby-position:over;}
"#;

const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

#[derive(Debug, Clone)]
pub struct EpubMetadata {
    pub title: String,
    pub author: String,
    /// `kanji_reader_{slug}`.
    pub identifier: String,
    pub language: String,
    pub modified: DateTime<Utc>,
}

impl EpubMetadata {
    pub fn for_book(title: &str, slug: &str, author: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            identifier: format!("kanji_reader_{slug}"),
            language: "ja".to_string(),
            modified: Utc::now(),
        }
    }
}

/// Writes the whole book into `writer` and hands the writer back.
pub fn write_epub<W: Write + Seek>(
    writer: W,
    meta: &EpubMetadata,
    layout: &BookLayout,
) -> io::Result<W> {
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).map_err(io_error)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)
        .map_err(io_error)?;
    zip.write_all(CONTAINER_XML)?;

    let pages = epub_pages(layout);
    let page_names: Vec<String> = (1..=pages.len()).map(|n| format!("p{n}.xhtml")).collect();

    let mut manifest = vec![
        ManifestItem::new("nav", "nav.xhtml", "application/xhtml+xml").with_properties("nav"),
        ManifestItem::new("ncx", "toc.ncx", "application/x-dtbncx+xml"),
        ManifestItem::new("style", "style.css", "text/css"),
    ];
    for (i, name) in page_names.iter().enumerate() {
        manifest.push(ManifestItem::new(
            &format!("p{}", i + 1),
            name,
            "application/xhtml+xml",
        ));
    }
    for (i, slot) in layout.images.iter().enumerate() {
        manifest.push(ManifestItem::new(
            &format!("img{}", i + 1),
            &slot.file_name,
            slot.full.content_type,
        ));
    }

    zip.start_file("OEBPS/content.opf", deflated)
        .map_err(io_error)?;
    zip.write_all(generate_opf(meta, &manifest, pages.len()).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated).map_err(io_error)?;
    zip.write_all(generate_nav(meta, &page_names).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated).map_err(io_error)?;
    zip.write_all(generate_ncx(meta, &page_names).as_bytes())?;

    zip.start_file("OEBPS/style.css", deflated)
        .map_err(io_error)?;
    zip.write_all(STYLE_CSS.as_bytes())?;

    for (n, (name, body)) in page_names.iter().zip(&pages).enumerate() {
        zip.start_file(format!("OEBPS/{name}"), deflated)
            .map_err(io_error)?;
        zip.write_all(xhtml_page(&format!("p{}", n + 1), body).as_bytes())?;
    }

    // Already-compressed formats gain nothing from deflate.
    for slot in &layout.images {
        zip.start_file(format!("OEBPS/{}", slot.file_name), stored)
            .map_err(io_error)?;
        zip.write_all(&slot.full.bytes)?;
    }

    zip.finish().map_err(io_error)
}

fn io_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::other(e)
}

struct ManifestItem {
    id: String,
    href: String,
    media_type: String,
    properties: Option<&'static str>,
}

impl ManifestItem {
    fn new(id: &str, href: &str, media_type: &str) -> Self {
        Self {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: None,
        }
    }

    fn with_properties(mut self, properties: &'static str) -> Self {
        self.properties = Some(properties);
        self
    }
}

fn generate_opf(meta: &EpubMetadata, manifest: &[ManifestItem], page_count: usize) -> String {
    let mut opf = String::new();
    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId" xml:lang="ja">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&meta.identifier)
    ));
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(&meta.title)));
    opf.push_str(&format!(
        "    <dc:creator>{}</dc:creator>\n",
        escape_xml(&meta.author)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&meta.language)
    ));
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        meta.modified.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    opf.push_str("  </metadata>\n  <manifest>\n");

    for item in manifest {
        let props = item
            .properties
            .map(|p| format!(" properties=\"{p}\""))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type),
            props
        ));
    }
    opf.push_str("  </manifest>\n");

    opf.push_str("  <spine toc=\"ncx\" page-progression-direction=\"rtl\">\n");
    opf.push_str("    <itemref idref=\"nav\" linear=\"no\"/>\n");
    for n in 1..=page_count {
        opf.push_str(&format!("    <itemref idref=\"p{n}\"/>\n"));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_nav(meta: &EpubMetadata, page_names: &[String]) -> String {
    let mut nav = String::new();
    nav.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="ja" xml:lang="ja">
<head><title>{title}</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
"#,
        title = escape_xml(&meta.title)
    ));
    for (i, name) in page_names.iter().enumerate() {
        nav.push_str(&format!(
            "      <li><a href=\"{name}\">{}</a></li>\n",
            i + 1
        ));
    }
    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

fn generate_ncx(meta: &EpubMetadata, page_names: &[String]) -> String {
    let mut ncx = String::new();
    ncx.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
"#,
        uid = escape_xml(&meta.identifier),
        title = escape_xml(&meta.title)
    ));
    for (i, name) in page_names.iter().enumerate() {
        let order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{order}\" playOrder=\"{order}\">\n      <navLabel><text>{order}</text></navLabel>\n      <content src=\"{name}\"/>\n    </navPoint>\n"
        ));
    }
    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn xhtml_page(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="ja" xml:lang="ja">
<head>
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
{body}
</body>
</html>
"#
    )
}
