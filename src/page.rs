//! Page contract and load lifecycle.
//!
//! A page owns exactly one main frame for its whole lifetime and moves
//! through `Created -> Loading -> {Loaded, LoadFailed}`, with `Loaded`
//! re-enterable by a later navigation. Load completions are tracked per
//! generation so a stale completion from a superseded navigation is
//! discarded instead of being delivered to the wrong caller.

use std::sync::Arc;

use crate::backend::BackendKind;
use crate::error::Result;
use crate::frame::{Frame, LoadCallback, ScriptCallback};
use crate::surface::{BitmapOutput, PrintSurface};
use crate::{Viewport, WebSettings};

/// Load lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Created,
    Loading,
    Loaded,
    LoadFailed,
}

/// Handlers for JavaScript dialogs raised by the page.
///
/// An installed handler suppresses the engine's native UI and supplies the
/// decision. Without a handler the defaults are deterministic: alerts are
/// dropped, `confirm` answers `false`, `prompt` answers cancel (`None`).
#[derive(Clone, Default)]
pub struct DialogHandlers {
    pub alert: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub confirm: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
    pub prompt: Option<Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>>,
}

impl DialogHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_alert(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.alert = Some(Arc::new(handler));
        self
    }

    pub fn on_confirm(mut self, handler: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.confirm = Some(Arc::new(handler));
        self
    }

    pub fn on_prompt(
        mut self,
        handler: impl Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.prompt = Some(Arc::new(handler));
        self
    }
}

/// Request policy consulted before the page fetches a resource.
///
/// Without an installed policy every request is allowed. The in-process
/// engine enforces the policy on its own HTTP client; engines whose network
/// stack lives out of process record the policy as engine-owned.
#[derive(Clone, Default)]
pub struct NetworkHook {
    pub allow_request: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl NetworkHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request(mut self, policy: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.allow_request = Some(Arc::new(policy));
        self
    }

    /// Whether a fetch of `url` may proceed.
    pub fn allows(&self, url: &str) -> bool {
        self.allow_request.as_ref().map(|policy| policy(url)).unwrap_or(true)
    }
}

/// A web page bound to one backend engine instance.
///
/// The page exclusively owns its frame and engine handle; settings are
/// copied snapshots applied at construction and on explicit re-apply.
pub trait Page {
    /// Begin navigating to `url`. `on_complete(success)` fires exactly once
    /// for this call: on success, on failure, or with `false` if the page is
    /// dropped before the load finishes. A second `load`/`set_content`
    /// issued while this one is in flight fails this completion first.
    fn load(&mut self, url: &str, on_complete: LoadCallback);

    /// Load inline HTML with `base_url` for relative resource resolution.
    /// Completion semantics are identical to [`Page::load`].
    fn set_content(&mut self, html: &str, base_url: &str, on_complete: LoadCallback);

    /// Document title (empty before the first successful load).
    fn title(&self) -> String;

    /// Current document URL.
    fn url(&self) -> String;

    /// The page's single owned main frame.
    fn main_frame(&mut self) -> &mut dyn Frame;

    /// Current lifecycle state.
    fn load_state(&self) -> LoadState;

    /// Map the settings snapshot onto engine-native flags. Idempotent;
    /// engine-specific gaps are translated to a native equivalent where
    /// possible and otherwise logged as a best-effort fidelity boundary.
    fn apply_settings(&mut self, settings: &WebSettings);

    /// Produce a paginated document into `surface`. `on_complete` fires
    /// exactly once regardless of path taken or outcome.
    fn render_to_print_surface(&mut self, surface: &mut dyn PrintSurface, on_complete: LoadCallback);

    /// Rasterize the page at the given pixel size. Backends without a paint
    /// primitive return [`BitmapOutput::Unsupported`], which is
    /// distinguishable from a rendered blank page.
    fn render_to_bitmap(&mut self, size: Viewport) -> BitmapOutput;

    fn set_viewport_size(&mut self, size: Viewport);

    fn viewport_size(&self) -> Viewport;

    /// Install JavaScript dialog handlers (see [`DialogHandlers`]).
    fn set_dialog_handlers(&mut self, handlers: DialogHandlers);

    /// Install the network request policy (see [`NetworkHook`]). Applies to
    /// fetches started after this call; an in-flight load keeps the policy
    /// it began under.
    fn set_network_hook(&mut self, hook: NetworkHook);

    /// Evaluate script in the main frame's context.
    fn evaluate_script(&mut self, code: &str, callback: ScriptCallback);
}

/// Construct a page bound to the given backend kind.
pub fn create_page(kind: BackendKind, settings: &WebSettings) -> Result<Box<dyn Page>> {
    match kind {
        BackendKind::Dom => {
            #[cfg(feature = "dom")]
            {
                Ok(Box::new(crate::dom_backend::DomPage::new(settings)?))
            }
            #[cfg(not(feature = "dom"))]
            {
                let _ = settings;
                Err(crate::error::ConversionError::backend_unavailable("dom"))
            }
        }
        BackendKind::Cdp => {
            #[cfg(feature = "cdp")]
            {
                Ok(Box::new(crate::cdp_backend::CdpPage::new(settings)?))
            }
            #[cfg(not(feature = "cdp"))]
            {
                let _ = settings;
                Err(crate::error::ConversionError::backend_unavailable("cdp"))
            }
        }
    }
}

/// Tracks the in-flight load of a page: its generation, lifecycle state and
/// pending completion callback.
///
/// Every completion is tagged with the generation it belongs to; a
/// completion for any other generation is stale and discarded. Dropping the
/// tracker with a load still pending fires that completion with `false`
/// before teardown finishes, so no continuation ever dangles.
pub(crate) struct LoadTracker {
    generation: u64,
    state: LoadState,
    pending: Option<(u64, LoadCallback)>,
}

impl LoadTracker {
    pub(crate) fn new() -> Self {
        Self {
            generation: 0,
            state: LoadState::Created,
            pending: None,
        }
    }

    pub(crate) fn state(&self) -> LoadState {
        self.state
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a new load generation. A superseded in-flight load has its
    /// completion fired with `false` before the new one is registered.
    pub(crate) fn begin(&mut self, on_complete: LoadCallback) -> u64 {
        if let Some((_, superseded)) = self.pending.take() {
            superseded(false);
        }
        self.generation += 1;
        self.state = LoadState::Loading;
        self.pending = Some((self.generation, on_complete));
        self.generation
    }

    /// Complete the load of `generation`. Stale generations are discarded.
    pub(crate) fn complete(&mut self, generation: u64, ok: bool) {
        match self.pending.take() {
            Some((pending_generation, callback)) if pending_generation == generation => {
                self.state = if ok {
                    LoadState::Loaded
                } else {
                    LoadState::LoadFailed
                };
                callback(ok);
            }
            other => {
                self.pending = other;
                log::debug!("discarding stale load completion (generation {})", generation);
            }
        }
    }
}

impl Drop for LoadTracker {
    fn drop(&mut self) {
        if let Some((_, callback)) = self.pending.take() {
            callback(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_callback(counter: &Arc<AtomicU32>, successes: &Arc<AtomicU32>) -> LoadCallback {
        let counter = counter.clone();
        let successes = successes.clone();
        Box::new(move |ok| {
            counter.fetch_add(1, Ordering::SeqCst);
            if ok {
                successes.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[test]
    fn two_loads_fire_exactly_two_completions() {
        let fired = Arc::new(AtomicU32::new(0));
        let ok = Arc::new(AtomicU32::new(0));

        let mut tracker = LoadTracker::new();
        let g1 = tracker.begin(counting_callback(&fired, &ok));
        tracker.complete(g1, true);
        let g2 = tracker.begin(counting_callback(&fired, &ok));
        tracker.complete(g2, true);

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(ok.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.state(), LoadState::Loaded);
    }

    #[test]
    fn drop_with_pending_load_fires_failure_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let ok = Arc::new(AtomicU32::new(0));
        {
            let mut tracker = LoadTracker::new();
            tracker.begin(counting_callback(&fired, &ok));
            assert_eq!(tracker.state(), LoadState::Loading);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(ok.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stale_generation_completion_is_discarded() {
        let fired = Arc::new(AtomicU32::new(0));
        let ok = Arc::new(AtomicU32::new(0));

        let mut tracker = LoadTracker::new();
        let stale = tracker.begin(counting_callback(&fired, &ok));
        // The second load supersedes the first, failing it.
        let current = tracker.begin(counting_callback(&fired, &ok));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(ok.load(Ordering::SeqCst), 0);

        // A completion from the superseded navigation must not reach the
        // current callback.
        tracker.complete(stale, true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tracker.complete(current, true);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(ok.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_completion_fires_only_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let ok = Arc::new(AtomicU32::new(0));

        let mut tracker = LoadTracker::new();
        let generation = tracker.begin(counting_callback(&fired, &ok));
        tracker.complete(generation, true);
        tracker.complete(generation, true);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn network_hook_defaults_to_allow() {
        let hook = NetworkHook::new();
        assert!(hook.allows("http://example.com/"));

        let scoped = NetworkHook::new().on_request(|url| url.starts_with("https://"));
        assert!(scoped.allows("https://example.com/"));
        assert!(!scoped.allows("http://example.com/"));
    }

    #[test]
    fn dialog_handler_builders() {
        let handlers = DialogHandlers::new()
            .on_confirm(|_| true)
            .on_prompt(|_, default| Some(default.to_string()));
        assert!(handlers.alert.is_none());
        assert!(handlers.confirm.as_ref().map(|h| h("sure?")).unwrap_or(false));
        assert_eq!(
            handlers.prompt.as_ref().and_then(|h| h("name?", "anon")),
            Some("anon".to_string())
        );
    }
}
