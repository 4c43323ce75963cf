//! Paginated PDF rendering of report text.
//!
//! Lines are wrapped to a fixed character width and laid out top to bottom with a
//! fixed line spacing; a new page starts once the bottom margin is reached.

use crate::error::{CaseLinkError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tracing::{debug, instrument};

/// Page geometry in PDF points, plus the wrap width in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub wrap_width: usize,
    pub page_width: i64,
    pub page_height: i64,
    pub left_margin: i64,
    pub top: i64,
    pub bottom: i64,
    pub line_height: i64,
    pub font_size: i64,
}

impl Default for PageLayout {
    /// US Letter, Helvetica 12.
    fn default() -> Self {
        Self {
            wrap_width: 80,
            page_width: 612,
            page_height: 792,
            left_margin: 50,
            top: 750,
            bottom: 50,
            line_height: 20,
            font_size: 12,
        }
    }
}

/// A line of text at a fixed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub x: i64,
    pub y: i64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<PlacedLine>,
}

/// Wrap one line on word boundaries. Blank input yields no lines.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        // Words longer than a full line are split across lines.
        while word.len() > width {
            let room = if current_len == 0 { width } else { width.saturating_sub(current_len + 1) };
            if room == 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            let head: String = word.drain(..room).collect();
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(&head);
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !word.is_empty() {
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Lay out `text` onto pages.
pub fn paginate(text: &str, layout: &PageLayout) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut page = Page::default();
    let mut y = layout.top;

    for line in text.lines().flat_map(|l| wrap_line(l, layout.wrap_width)) {
        page.lines.push(PlacedLine {
            x: layout.left_margin,
            y,
            text: line,
        });
        y -= layout.line_height;
        if y < layout.bottom {
            pages.push(std::mem::take(&mut page));
            y = layout.top;
        }
    }

    if !page.lines.is_empty() {
        pages.push(page);
    }
    pages
}

/// Map text to single-byte WinAnsi codes for the standard Helvetica font.
fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{2022}' => b'*',
            '\t' => b' ',
            c if (c as u32) < 0x20 => b' ',
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Render pages to PDF bytes. An empty page list produces a single blank page.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn render_pdf(pages: &[Page], layout: &PageLayout) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let blank = [Page::default()];
    let pages = if pages.is_empty() { &blank[..] } else { pages };

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::with_capacity(page.lines.len() * 5);
        for line in &page.lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), Object::Integer(layout.font_size)]));
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(line.x), Object::Integer(line.y)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_winansi(&line.text))],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(layout.page_width),
                Object::Integer(layout.page_height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    debug!("Rendered {} pages ({} bytes)", count, buffer.len());
    Ok(buffer)
}

/// Paginate `text` and write it as a PDF to `path`.
pub fn write_report_pdf(text: &str, path: &Path) -> Result<usize> {
    if path.is_dir() {
        return Err(CaseLinkError::Document(format!(
            "{} is a directory, expected a file name",
            path.display()
        )));
    }
    let layout = PageLayout::default();
    let pages = paginate(text, &layout);
    let bytes = render_pdf(&pages, &layout)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(pages.len().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_line_on_words() {
        let wrapped = wrap_line("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(wrapped, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn test_wrap_blank_line_is_empty() {
        assert!(wrap_line("", 80).is_empty());
        assert!(wrap_line("   \t ", 80).is_empty());
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let wrapped = wrap_line("plate KA05MX1234ABCDEF end", 8);
        assert_eq!(wrapped, vec!["plate KA", "05MX1234", "ABCDEF", "end"]);
    }

    #[test]
    fn test_paginate_fills_36_lines_per_page() {
        let layout = PageLayout::default();
        let text = (0..40).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");

        let pages = paginate(&text, &layout);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 36);
        assert_eq!(pages[1].lines.len(), 4);

        assert_eq!(pages[0].lines[0].y, 750);
        assert_eq!(pages[0].lines[35].y, 50);
        assert_eq!(pages[1].lines[0].y, 750);
        assert_eq!(pages[1].lines[0].text, "line 36");
        assert!(pages[0].lines.iter().all(|l| l.x == 50));
    }

    #[test]
    fn test_paginate_exact_page_has_no_trailing_blank() {
        let layout = PageLayout::default();
        let text = vec!["x"; 36].join("\n");
        assert_eq!(paginate(&text, &layout).len(), 1);
        assert!(paginate("", &layout).is_empty());
    }

    #[test]
    fn test_render_pdf_bytes() {
        let layout = PageLayout::default();
        let pages = paginate("Incident Overview:\nTwo suspects \u{2014} masked.", &layout);
        let bytes = render_pdf(&pages, &layout).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);

        let empty = render_pdf(&[], &layout).unwrap();
        assert_eq!(Document::load_mem(&empty).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn test_encode_winansi() {
        assert_eq!(encode_winansi("caf\u{e9} \u{201C}x\u{201D} \u{4e2d}"), b"caf\xe9 \"x\" ?".to_vec());
    }

    #[test]
    fn test_write_report_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("Crime_Report.pdf");
        let pages = write_report_pdf("Report body", &path).unwrap();
        assert_eq!(pages, 1);
        assert!(path.exists());

        let result = write_report_pdf("Report body", dir.path());
        assert!(matches!(result, Err(CaseLinkError::Document(_))));
    }
}
