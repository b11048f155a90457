//! Display-list build and rasterization.
//!
//! Text is greeked: each glyph is painted as a filled cell rather than a
//! real outline, which keeps output deterministic and dependency-free while
//! preserving block geometry for layout inspection.

use crate::element::Rect;
use crate::rendering::layout::LayoutResult;
use crate::surface::PixelSurface;

const INK: (u8, u8, u8, u8) = (32, 32, 32, 255);
const PAPER: (u8, u8, u8, u8) = (255, 255, 255, 255);

/// A single paint operation, in back-to-front order.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        rgba: (u8, u8, u8, u8),
    },
    TextRun {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        rgba: (u8, u8, u8, u8),
    },
}

/// Build the display list for a layout result.
///
/// `background` controls whether an opaque page rectangle is emitted first;
/// without it the surface keeps whatever the caller put there.
pub fn display_list(layout: &LayoutResult, background: bool) -> Vec<PaintCommand> {
    let mut commands = Vec::with_capacity(layout.blocks.len() + 1);
    if background {
        commands.push(PaintCommand::SolidRect {
            rect: Rect::new(
                0.0,
                0.0,
                layout.content_size.width as f64,
                layout.content_size.height as f64,
            ),
            rgba: PAPER,
        });
    }
    for block in &layout.blocks {
        commands.push(PaintCommand::TextRun {
            x: block.rect.x as i32,
            y: block.rect.y as i32,
            text: block.text.clone(),
            scale: block.scale,
            rgba: INK,
        });
    }
    commands
}

fn rect_intersects(rect: &Rect, clip: &Rect) -> bool {
    rect.x < clip.x + clip.width
        && clip.x < rect.x + rect.width
        && rect.y < clip.y + clip.height
        && clip.y < rect.y + rect.height
}

fn command_bounds(command: &PaintCommand) -> Rect {
    match command {
        PaintCommand::SolidRect { rect, .. } => *rect,
        PaintCommand::TextRun { x, y, text, scale, .. } => {
            let lines = text.lines().count().max(1) as f64;
            let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as f64;
            Rect::new(
                *x as f64,
                *y as f64,
                widest * (6 * scale) as f64,
                lines * (8 * scale) as f64,
            )
        }
    }
}

/// Execute a display list against a pixel surface.
///
/// Clipping is coarse: commands fully outside the clip are skipped, commands
/// that intersect it are painted whole.
pub fn rasterize(commands: &[PaintCommand], surface: &mut PixelSurface, clip: Option<Rect>) {
    for command in commands {
        if let Some(clip) = &clip {
            if !rect_intersects(&command_bounds(command), clip) {
                continue;
            }
        }
        match command {
            PaintCommand::SolidRect { rect, rgba } => {
                surface.fill_rect(
                    rect.x as i32,
                    rect.y as i32,
                    rect.width as u32,
                    rect.height as u32,
                    *rgba,
                );
            }
            PaintCommand::TextRun {
                x,
                y,
                text,
                scale,
                rgba,
            } => {
                let cell_w = 5 * *scale;
                let cell_h = 7 * *scale;
                let advance = (6 * *scale) as i32;
                let line_height = (8 * *scale) as i32;
                let mut pen_y = *y;
                for line in text.lines() {
                    let mut pen_x = *x;
                    for ch in line.chars() {
                        if !ch.is_whitespace() {
                            surface.fill_rect(pen_x, pen_y, cell_w, cell_h, *rgba);
                        }
                        pen_x += advance;
                    }
                    pen_y += line_height;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::layout_document;
    use crate::Viewport;
    use scraper::Html;

    fn layout_of(html: &str) -> LayoutResult {
        layout_document(&Html::parse_document(html), Viewport::default())
    }

    #[test]
    fn background_flag_controls_page_rect() {
        let layout = layout_of("<html><body><p>x</p></body></html>");
        let with_bg = display_list(&layout, true);
        let without_bg = display_list(&layout, false);
        assert!(matches!(with_bg[0], PaintCommand::SolidRect { .. }));
        assert_eq!(with_bg.len(), without_bg.len() + 1);
    }

    #[test]
    fn text_marks_the_surface() {
        let layout = layout_of("<html><body><p>hello</p></body></html>");
        let commands = display_list(&layout, false);
        let mut surface = PixelSurface::new(200, 100);
        rasterize(&commands, &mut surface, None);
        assert!(!surface.is_blank());
    }

    #[test]
    fn clip_skips_commands_outside_it() {
        let layout = layout_of("<html><body><p>hello</p></body></html>");
        let commands = display_list(&layout, false);
        let mut surface = PixelSurface::new(200, 100);
        // Clip region far below the only text block.
        rasterize(
            &commands,
            &mut surface,
            Some(crate::element::Rect::new(0.0, 5000.0, 100.0, 100.0)),
        );
        assert!(surface.is_blank());
    }

    #[test]
    fn empty_layout_paints_nothing_without_background() {
        let layout = layout_of("<html><body></body></html>");
        let commands = display_list(&layout, false);
        assert!(commands.is_empty());
    }
}
