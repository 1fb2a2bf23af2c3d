// src/services/extractor.rs

//! Text extraction from list payloads.
//!
//! Extraction never fails: unreadable payloads produce no lines and a
//! warning, so a bad page costs its records and nothing else.

use scraper::{ElementRef, Html};
use tracing::warn;

use crate::models::ContentKind;

/// Turns a fetched payload into lines of text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, body: &[u8], kind: ContentKind) -> Vec<String>;
}

/// Default extractor for HTML, PDF and plain payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, body: &[u8], kind: ContentKind) -> Vec<String> {
        match kind {
            ContentKind::Html => html_lines(body),
            ContentKind::Pdf => pdf_lines(body),
            ContentKind::Unknown => {
                warn!("Unknown content type, decoding payload as UTF-8 text");
                String::from_utf8_lossy(body)
                    .lines()
                    .map(str::to_string)
                    .collect()
            }
        }
    }
}

/// Elements whose boundaries end a line of text. Table cells are left out
/// so that a row reads as one line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

/// Elements whose text is never list content.
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

fn html_lines(body: &[u8]) -> Vec<String> {
    let document = Html::parse_document(&String::from_utf8_lossy(body));
    let mut lines = Vec::new();
    let mut current = String::new();
    collect_text(document.root_element(), &mut current, &mut lines);
    flush_line(&mut current, &mut lines);
    lines
}

fn collect_text(element: ElementRef, current: &mut String, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            current.push_str(text);
            current.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            let breaks = BLOCK_ELEMENTS.contains(&name);
            if breaks {
                flush_line(current, lines);
            }
            collect_text(child_element, current, lines);
            if breaks {
                flush_line(current, lines);
            }
        }
    }
}

fn flush_line(current: &mut String, lines: &mut Vec<String>) {
    let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

#[cfg(feature = "pdf")]
fn pdf_lines(body: &[u8]) -> Vec<String> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(body)) {
        Ok(Ok(text)) => {
            if text.trim().is_empty() {
                warn!("PDF had no extractable text");
            }
            text.lines().map(str::to_string).collect()
        }
        Ok(Err(error)) => {
            warn!(error = ?error, "Failed to extract PDF text");
            Vec::new()
        }
        Err(_) => {
            warn!("PDF text extraction aborted on a malformed document");
            Vec::new()
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn pdf_lines(_body: &[u8]) -> Vec<String> {
    warn!("PDF support is disabled in this build; skipping page");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_rows_become_lines() {
        let html = r#"
            <html><head><title>Liste</title><style>td { color: red }</style></head>
            <body>
                <h1>Liste de rappel</h1>
                <table>
                    <tr><th>Rang</th><th>Matricule</th></tr>
                    <tr><td>1</td><td>A1234</td><td>07:00 - 15:00</td></tr>
                    <tr><td>2</td><td>B5678</td></tr>
                </table>
                <p>Mise à jour<br>14/03/2025</p>
                <script>var x = "Z9999";</script>
            </body></html>
        "#;

        let lines = DocumentExtractor.extract(html.as_bytes(), ContentKind::Html);
        assert_eq!(
            lines,
            vec![
                "Liste de rappel",
                "Rang Matricule",
                "1 A1234 07:00 - 15:00",
                "2 B5678",
                "Mise à jour",
                "14/03/2025",
            ]
        );
    }

    #[test]
    fn test_unknown_is_decoded_as_text() {
        let lines = DocumentExtractor.extract(b"1 A1234\n2 B5678", ContentKind::Unknown);
        assert_eq!(lines, vec!["1 A1234", "2 B5678"]);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let lines = DocumentExtractor.extract(b"3 C\xff9012", ContentKind::Unknown);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("3 C"));
    }

    #[test]
    fn test_garbage_pdf_yields_nothing() {
        let lines = DocumentExtractor.extract(b"not a pdf at all", ContentKind::Pdf);
        assert!(lines.is_empty());
    }
}
