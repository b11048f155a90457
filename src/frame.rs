//! Frame contract: per-frame operations, uniform across backends.
//!
//! The calling convention is always completion-channel shaped. Every
//! result-bearing operation takes a one-shot callback; the synchronous
//! backend invokes it inline before the call returns, the CDP backend
//! invokes it when the protocol answers. Callers never branch on which
//! variant they hold.

use crate::element::{ElementSnapshot, Rect};
use crate::error::Result;
use crate::surface::PixelSurface;
use crate::Viewport;

/// One-shot load/print completion: `true` on success, fired exactly once.
pub type LoadCallback = Box<dyn FnOnce(bool) + Send>;

/// One-shot script evaluation result (serialized to a string).
pub type ScriptCallback = Box<dyn FnOnce(String) + Send>;

/// One-shot single-element query result; `None` when nothing matched.
pub type ElementCallback = Box<dyn FnOnce(Option<ElementSnapshot>) + Send>;

/// One-shot multi-element query result; empty when nothing matched.
pub type ElementsCallback = Box<dyn FnOnce(Vec<ElementSnapshot>) + Send>;

/// The renderable document context within a page. This design models a
/// single main frame per page.
///
/// When the owning page has no live document, every operation completes its
/// channel with an empty or false result; absence of content is a valid
/// terminal state, not an error.
pub trait Frame {
    /// Document title, empty when no document is loaded.
    fn title(&self) -> String;

    /// Final document URL, empty when no document is loaded.
    fn url(&self) -> String;

    /// Size of the laid-out content in pixels.
    ///
    /// The CDP backend cannot query this live; it returns the last value
    /// observed via an out-of-band measurement taken after load. This is a
    /// documented fidelity gap callers must tolerate.
    fn contents_size(&self) -> Viewport;

    /// Paint the frame into the caller-supplied surface, optionally clipped.
    ///
    /// Backends whose engine has no direct-paint primitive either emulate
    /// this via a native screenshot capture or return a distinct error;
    /// they never leave the surface silently blank on success.
    fn render(&mut self, surface: &mut PixelSurface, clip: Option<Rect>) -> Result<()>;

    /// Evaluate script in the page context and deliver the stringified
    /// result through the completion channel.
    fn evaluate_script(&mut self, code: &str, callback: ScriptCallback);

    /// Find the first element matching `selector` (the engine's own CSS
    /// selector dialect) and deliver its snapshot, or `None`.
    fn find_first_element(&mut self, selector: &str, callback: ElementCallback);

    /// Find all elements matching `selector` and deliver their snapshots in
    /// document order. Zero matches delivers an empty vector, not a failure.
    fn find_all_elements(&mut self, selector: &str, callback: ElementsCallback);
}
