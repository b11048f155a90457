//! Output surfaces.
//!
//! Two sinks exist: an in-memory pixel surface that frames paint into (and
//! that can be encoded to a PNG bitmap), and a paginated print surface that
//! receives finished PDF documents. Both are engine-agnostic; backends only
//! ever see the abstractions here.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{ConversionError, Result};

/// RGBA8 raster surface supplied by the caller for frame painting.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelSurface {
    /// A transparent surface of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True when every pixel is still fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&b| b == 0)
    }

    /// Fill an axis-aligned rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, rgba: (u8, u8, u8, u8)) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = ((x + width as i32).max(0) as u32).min(self.width);
        let y1 = ((y + height as i32).max(0) as u32).min(self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                let idx = ((py * self.width + px) * 4) as usize;
                self.pixels[idx] = rgba.0;
                self.pixels[idx + 1] = rgba.1;
                self.pixels[idx + 2] = rgba.2;
                self.pixels[idx + 3] = rgba.3;
            }
        }
    }

    /// Copy a decoded RGBA image onto the surface at the origin, clipping to
    /// the smaller of the two extents. Used by backends that emulate direct
    /// painting via a screenshot primitive.
    pub fn blit_rgba(&mut self, src: &[u8], src_width: u32, src_height: u32) {
        let copy_w = src_width.min(self.width);
        let copy_h = src_height.min(self.height);
        for row in 0..copy_h {
            let src_start = ((row * src_width) * 4) as usize;
            let dst_start = ((row * self.width) * 4) as usize;
            let len = (copy_w * 4) as usize;
            self.pixels[dst_start..dst_start + len]
                .copy_from_slice(&src[src_start..src_start + len]);
        }
    }

    /// Encode the surface to a PNG bitmap.
    pub fn into_bitmap(self) -> Result<Bitmap> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.pixels)
            .ok_or_else(|| ConversionError::rendering_failed("pixel buffer size mismatch"))?;
        let mut png = Vec::new();
        image
            .write_to(
                &mut Cursor::new(&mut png),
                image::ImageOutputFormat::Png,
            )
            .map_err(|e| ConversionError::rendering_failed(&format!("PNG encoding: {}", e)))?;
        Ok(Bitmap {
            width: self.width,
            height: self.height,
            png_data: png,
        })
    }
}

/// An encoded raster output of a page.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

/// Result of a render-to-bitmap request.
///
/// `Unsupported` is a distinct capability signal: it can never be confused
/// with a successfully rendered blank page, which arrives as `Image` with
/// valid PNG bytes.
#[derive(Debug, Clone)]
pub enum BitmapOutput {
    Image(Bitmap),
    Unsupported,
}

impl BitmapOutput {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, BitmapOutput::Unsupported)
    }

    pub fn image(&self) -> Option<&Bitmap> {
        match self {
            BitmapOutput::Image(bitmap) => Some(bitmap),
            BitmapOutput::Unsupported => None,
        }
    }
}

/// Paginated document sink: receives one finished PDF per conversion.
pub trait PrintSurface: Send {
    /// Consume the finished document. Called at most once per conversion.
    fn write_document(&mut self, pdf: &[u8]) -> Result<()>;

    /// Where the output goes, for logs and diagnostics.
    fn describe(&self) -> String;
}

/// Print surface that writes the document to a file path.
pub struct FilePrintSurface {
    path: PathBuf,
}

impl FilePrintSurface {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PrintSurface for FilePrintSurface {
    fn write_document(&mut self, pdf: &[u8]) -> Result<()> {
        std::fs::write(&self.path, pdf).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ConversionError::permission_denied(&self.path.display().to_string())
            }
            _ => ConversionError::system_error(&format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            )),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Print surface that buffers the document in memory. Used by tests and by
/// the facade when the caller wants bytes rather than a file.
#[derive(Default)]
pub struct MemoryPrintSurface {
    data: Vec<u8>,
}

impl MemoryPrintSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl PrintSurface for MemoryPrintSurface {
    fn write_document(&mut self, pdf: &[u8]) -> Result<()> {
        self.data = pdf.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_clips_to_surface() {
        let mut surface = PixelSurface::new(4, 4);
        surface.fill_rect(-2, -2, 4, 4, (255, 0, 0, 255));
        // Top-left 2x2 painted, rest untouched.
        assert_eq!(&surface.pixels()[0..4], &[255, 0, 0, 255]);
        assert!(!surface.is_blank());
        let last = surface.pixels().len() - 4;
        assert_eq!(&surface.pixels()[last..], &[0, 0, 0, 0]);
    }

    #[test]
    fn into_bitmap_produces_png_magic() {
        let mut surface = PixelSurface::new(8, 8);
        surface.fill_rect(0, 0, 8, 8, (0, 0, 0, 255));
        let bitmap = surface.into_bitmap().unwrap();
        assert_eq!(&bitmap.png_data[0..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(bitmap.width, 8);
    }

    #[test]
    fn unsupported_is_distinguishable_from_blank_image() {
        let blank = PixelSurface::new(2, 2).into_bitmap().unwrap();
        let rendered = BitmapOutput::Image(blank);
        assert!(!rendered.is_unsupported());
        assert!(rendered.image().is_some());
        assert!(BitmapOutput::Unsupported.is_unsupported());
    }

    #[test]
    fn memory_surface_buffers_document() {
        let mut surface = MemoryPrintSurface::new();
        surface.write_document(b"%PDF-1.5 fake").unwrap();
        assert!(surface.data().starts_with(b"%PDF"));
    }
}
