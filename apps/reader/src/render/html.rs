//! Flattened single-file document for printing. Every section becomes one page,
//! with previews inlined as data URIs so the file is self-contained.

use crate::layout::BookLayout;
use crate::render::{escape_xml, html_pages};

const PRINT_CSS: &str = r#"@font-face {
  font-family: "NotoSerifJP";
  src: local("Noto Serif JP Regular"),
       url("https://fonts.gstatic.com/ea/notoserifjpv8/NotoSerifJP-Regular.otf") format("opentype");
}
html {
  writing-mode: vertical-rl;
  font-family: "NotoSerifJP", serif;
  font-size: 1.0rem;
  line-height: 1.6;
  margin-block: 15mm;
  margin-inline: 10mm 4mm;
  inline-size: 26rem;
  -webkit-line-break: strict;
  line-break: strict;
}
body { margin: 0; }
section.side {
  writing-mode: horizontal-tb;
  display: flex;
  flex-direction: row-reverse;
  align-items: flex-start;
  gap: 4mm;
  height: 85vh;
  page-break-after: always;
}
section.side .text {
  writing-mode: vertical-rl;
  flex: 1 1 50%;
  inline-size: 26rem;
  margin-inline-end: 5mm;
}
section.side img {
  flex: 1 1 50%;
  max-block-size: 85vh;
  object-fit: contain;
  margin-inline-end: 4mm;
}
section.solo, section.picture { break-after: page; }
section.picture img { max-width: 100%; height: auto; max-block-size: 85vh; object-fit: contain; }
ruby { ruby-position: over; }
img { max-width: 100%; break-after: page; }
div.pagebreak { break-after: page; }
@media print and (-webkit-min-device-pixel-ratio: 0) {
  div.pagebreak { break-after: auto; }
}
"#;

/// Renders the whole book as one HTML document, each section followed by a page break.
pub fn render_document(title: &str, layout: &BookLayout) -> String {
    let mut content = String::new();
    for page in html_pages(layout) {
        content.push_str("<div>");
        content.push_str(&page);
        content.push_str("</div><div class='pagebreak'></div>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{PRINT_CSS}</style>\n</head>\n<body>\n{content}</body>\n</html>\n",
        escape_xml(title)
    )
}
