//! Paginated PDF output for the in-process engine.
//!
//! Maps the block layout onto A4 pages with a Helvetica text run per line.
//! Layout pixels are taken as points one-to-one, so print geometry matches
//! the screen layout the inspector reports.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{ConversionError, Result};
use crate::rendering::layout::LayoutResult;

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 36.0;
const CONTENT_HEIGHT: f64 = PAGE_HEIGHT - MARGIN * 2.0;

fn sanitize_line(line: &str) -> Vec<u8> {
    // Helvetica with WinAnsi covers Latin-1; everything else is replaced.
    line.chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..0x7f).contains(&code) || (0xa0..0x100).contains(&code) {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

/// Paginate a layout result into a finished PDF document.
///
/// Always emits at least one page, so an empty document still produces a
/// valid (blank) PDF.
pub fn paginate_to_pdf(layout: &LayoutResult) -> Result<Vec<u8>> {
    // Bucket lines into pages by their layout y coordinate.
    let mut pages: Vec<Vec<Operation>> = vec![Vec::new()];
    for block in &layout.blocks {
        let font_size = (8 * block.scale) as f64;
        let line_height = font_size;
        let mut y = block.rect.y;
        for line in block.text.lines() {
            let page_index = (y / CONTENT_HEIGHT).max(0.0) as usize;
            while pages.len() <= page_index {
                pages.push(Vec::new());
            }
            let page_y = PAGE_HEIGHT - MARGIN - (y - page_index as f64 * CONTENT_HEIGHT) - font_size;
            let ops = &mut pages[page_index];
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec!["F1".into(), font_size.into()],
            ));
            ops.push(Operation::new(
                "Td",
                vec![(MARGIN + block.rect.x).into(), page_y.into()],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(
                    sanitize_line(line),
                    lopdf::StringFormat::Literal,
                )],
            ));
            ops.push(Operation::new("ET", vec![]));
            y += line_height;
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| ConversionError::rendering_failed(&format!("PDF content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ConversionError::rendering_failed(&format!("PDF serialization: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::layout_document;
    use crate::Viewport;
    use scraper::Html;

    fn pdf_of(html: &str) -> Vec<u8> {
        let layout = layout_document(&Html::parse_document(html), Viewport::default());
        paginate_to_pdf(&layout).unwrap()
    }

    #[test]
    fn output_carries_pdf_header() {
        let pdf = pdf_of("<html><body><p>hello print</p></body></html>");
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn empty_document_still_yields_one_page() {
        let pdf = pdf_of("<html><body></body></html>");
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn tall_document_paginates() {
        let body = "<p>line of text</p>".repeat(200);
        let pdf = pdf_of(&format!("<html><body>{}</body></html>", body));
        let doc = Document::load_mem(&pdf).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn non_latin_text_is_replaced_not_rejected() {
        let pdf = pdf_of("<html><body><p>héllo 世界</p></body></html>");
        assert!(pdf.starts_with(b"%PDF-"));
    }
}
