//! pagepress: HTML to PDF and image conversion over swappable render
//! backends.
//!
//! Two engines sit behind one abstraction. The `dom` backend is a
//! synchronous in-process engine: it fetches, parses and walks the DOM
//! directly, evaluates scripts inline, and renders with a built-in layout
//! pipeline. The `cdp` backend drives Chromium over the DevTools Protocol
//! and reaches the document only through injected scripts. Callers program
//! against [`Page`] and [`Frame`] and never branch on which engine they
//! hold.
//!
//! ```no_run
//! use pagepress::{create_page, BackendKind, WebSettings};
//!
//! let mut page = create_page(BackendKind::Dom, &WebSettings::default())?;
//! page.set_content("<html><body><p>hi</p></body></html>", "about:blank", Box::new(|ok| {
//!     assert!(ok);
//! }));
//! # Ok::<(), pagepress::ConversionError>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod element;
pub mod error;
pub mod facade;
pub mod frame;
pub mod page;
pub mod surface;
pub mod validator;

#[cfg(feature = "cdp")]
pub mod cdp_backend;
#[cfg(feature = "dom")]
pub mod dom_backend;
#[cfg(feature = "dom")]
pub mod rendering;

pub use backend::{
    available_backends, default_backend, set_default_backend, BackendKind, BackendRegistry,
};
pub use element::{ElementSnapshot, Rect};
pub use error::{ConversionError, ErrorCode, Result};
pub use facade::Converter;
pub use frame::{
    ElementCallback, ElementsCallback, Frame, LoadCallback, ScriptCallback,
};
pub use page::{create_page, DialogHandlers, LoadState, NetworkHook, Page};
pub use surface::{
    Bitmap, BitmapOutput, FilePrintSurface, MemoryPrintSurface, PixelSurface, PrintSurface,
};
pub use validator::{
    check_compatibility, detect_css_features, validate_css, validate_html, CssFeature, Severity,
    ValidationMessage, ValidationResult,
};

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

/// Engine-agnostic page settings.
///
/// A settings value is a snapshot: backends copy it at construction and on
/// [`Page::apply_settings`], mapping each flag onto a native engine switch
/// where one exists and logging a best-effort note where none does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSettings {
    pub load_images: bool,
    pub enable_javascript: bool,
    pub enable_plugins: bool,
    pub minimum_font_size: u32,
    pub default_encoding: String,
    /// Path to a user stylesheet applied to every document. The Chromium
    /// backend translates this to a script-injected `<style>` element.
    pub user_style_sheet: String,
    /// Paint the page background in rendered output.
    pub background: bool,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            load_images: true,
            enable_javascript: true,
            enable_plugins: false,
            minimum_font_size: 0,
            default_encoding: "UTF-8".to_string(),
            user_style_sheet: String::new(),
            background: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_viewport_is_desktop_sized() {
        let viewport = Viewport::default();
        assert_eq!((viewport.width, viewport.height), (1024, 768));
    }

    #[test]
    fn default_settings_enable_javascript_and_background() {
        let settings = WebSettings::default();
        assert!(settings.enable_javascript);
        assert!(settings.background);
        assert!(!settings.enable_plugins);
        assert_eq!(settings.default_encoding, "UTF-8");
    }

    #[test]
    fn viewport_serializes_as_width_height() {
        let json = serde_json::to_string(&Viewport::default()).unwrap();
        assert!(json.contains("\"width\":1024"));
        let back: Viewport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Viewport::default());
    }
}
