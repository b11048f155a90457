//! Block layout over a parsed document.
//!
//! Stacks the block-level elements vertically with fixed margins and a
//! monospace text metric (8px character cell, scaled for headings). The
//! result carries both the paintable boxes and a per-node geometry map so
//! element queries report the same coordinates the painter uses.

use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::{ElementRef, Html};

use crate::element::Rect;
use crate::Viewport;

const PAGE_PADDING: u32 = 8;
const CHAR_CELL: u32 = 8;

/// One laid-out block of text.
#[derive(Debug, Clone)]
pub struct BlockBox {
    pub rect: Rect,
    /// Wrapped text, one line per `\n`.
    pub text: String,
    /// Text scale factor (2 for top-level headings, otherwise 1).
    pub scale: u32,
}

/// The outcome of a layout pass.
#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub blocks: Vec<BlockBox>,
    /// Bounding box per laid-out DOM node, keyed by tree node id.
    pub geometry: HashMap<NodeId, Rect>,
    /// Total laid-out content size; height grows past the viewport when the
    /// document does.
    pub content_size: Viewport,
}

impl LayoutResult {
    /// Geometry for a node, walking up to the nearest laid-out ancestor when
    /// the node itself produced no box (inline elements, containers).
    pub fn geometry_for(&self, element: ElementRef<'_>) -> Rect {
        if let Some(rect) = self.geometry.get(&element.id()) {
            return *rect;
        }
        for ancestor in element.ancestors() {
            if let Some(rect) = self.geometry.get(&ancestor.id()) {
                return *rect;
            }
        }
        Rect::default()
    }
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "pre" | "blockquote"
    )
}

fn scale_for(tag: &str) -> u32 {
    match tag {
        "h1" | "h2" => 2,
        _ => 1,
    }
}

/// Greedy word wrap at a fixed character width.
fn wrap_text(text: &str, chars_per_line: usize) -> String {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.chars().count() + word.chars().count() + 1 > chars_per_line {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines.join("\n")
}

/// Lay out the block-level elements of `document` for the given viewport.
///
/// Blocks stack in document order; each gets the full content width and a
/// height derived from its wrapped line count. Non-block elements inherit
/// their nearest block ancestor's geometry via [`LayoutResult::geometry_for`].
pub fn layout_document(document: &Html, viewport: Viewport) -> LayoutResult {
    let mut result = LayoutResult::default();
    let mut y = PAGE_PADDING;
    let content_width = viewport.width.saturating_sub(PAGE_PADDING * 2).max(CHAR_CELL);

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let tag = element.value().name();
        if !is_block_tag(tag) {
            continue;
        }
        let text = element.text().collect::<String>();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let scale = scale_for(tag);
        let padding = PAGE_PADDING / 2;
        let chars_per_line = (content_width / (CHAR_CELL * scale)).max(1) as usize;
        let wrapped = wrap_text(text, chars_per_line);
        let line_count = wrapped.lines().count().max(1) as u32;
        let height = line_count * CHAR_CELL * scale + padding * 2;

        let rect = Rect::new(
            PAGE_PADDING as f64,
            y as f64,
            content_width as f64,
            height as f64,
        );
        result.geometry.insert(element.id(), rect);
        result.blocks.push(BlockBox {
            rect,
            text: wrapped,
            scale,
        });
        y += height + padding;
    }

    result.content_size = Viewport {
        width: viewport.width,
        height: y.max(viewport.height),
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn blocks_stack_in_document_order() {
        let html = doc("<html><body><h1>Title</h1><p>First</p><p>Second</p></body></html>");
        let layout = layout_document(&html, Viewport::default());
        assert_eq!(layout.blocks.len(), 3);
        assert_eq!(layout.blocks[0].scale, 2);
        assert!(layout.blocks[1].rect.y > layout.blocks[0].rect.y);
        assert!(layout.blocks[2].rect.y > layout.blocks[1].rect.y);
    }

    #[test]
    fn empty_blocks_are_skipped() {
        let html = doc("<html><body><p>   </p><p>kept</p></body></html>");
        let layout = layout_document(&html, Viewport::default());
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].text, "kept");
    }

    #[test]
    fn long_text_wraps_and_grows_content_height() {
        let word = "word ".repeat(400);
        let html = doc(&format!("<html><body><p>{}</p></body></html>", word));
        let narrow = Viewport {
            width: 160,
            height: 120,
        };
        let layout = layout_document(&html, narrow);
        assert!(layout.blocks[0].text.lines().count() > 1);
        assert!(layout.content_size.height > narrow.height);
    }

    #[test]
    fn inline_elements_inherit_block_geometry() {
        let html = doc("<html><body><p>before <b>bold</b> after</p></body></html>");
        let layout = layout_document(&html, Viewport::default());
        let b_sel = Selector::parse("b").unwrap();
        let p_sel = Selector::parse("p").unwrap();
        let b = html.select(&b_sel).next().unwrap();
        let p = html.select(&p_sel).next().unwrap();
        assert_eq!(layout.geometry_for(b), layout.geometry_for(p));
        assert!(!layout.geometry_for(p).is_empty());
    }

    #[test]
    fn unlaid_document_yields_zero_geometry() {
        let html = doc("<html><body><div></div></body></html>");
        let layout = layout_document(&html, Viewport::default());
        let sel = Selector::parse("div").unwrap();
        let div = html.select(&sel).next().unwrap();
        assert!(layout.geometry_for(div).is_empty());
        assert!(layout.blocks.is_empty());
    }
}
