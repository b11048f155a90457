//! Chromium backend over the DevTools Protocol.
//!
//! The DOM is reachable only through injected scripts, so element queries
//! serialize snapshots to a JSON wire form in the page and deserialize them
//! here. Direct painting is emulated with a screenshot capture; print output
//! comes back from the protocol as bytes.

use std::sync::{Arc, Mutex};

use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Emulation, Page as ProtoPage, Page::DialogType};
use headless_chrome::{Browser, LaunchOptions};

use crate::element::{self, Rect};
use crate::error::{ConversionError, Result};
use crate::frame::{
    ElementCallback, ElementsCallback, Frame, LoadCallback, ScriptCallback,
};
use crate::page::{DialogHandlers, LoadState, LoadTracker, NetworkHook, Page};
use crate::surface::{Bitmap, BitmapOutput, PixelSurface, PrintSurface};
use crate::{Viewport, WebSettings};

pub struct CdpPage {
    // The browser handle must outlive the tab.
    _browser: Browser,
    frame: CdpFrame,
    tracker: LoadTracker,
    viewport: Viewport,
    settings: WebSettings,
    dialogs: Arc<Mutex<DialogHandlers>>,
    // Stylesheet path already injected, so re-applying identical settings
    // does not stack a second injection.
    injected_style_sheet: Option<String>,
}

pub(crate) struct CdpFrame {
    tab: Arc<Tab>,
    /// Content size observed out-of-band after the last load; the protocol
    /// cannot answer this synchronously.
    contents_size: Viewport,
    has_document: bool,
}

impl CdpPage {
    pub fn new(settings: &WebSettings) -> Result<Self> {
        let viewport = Viewport::default();
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((viewport.width, viewport.height)))
            .build()
            .map_err(|e| {
                ConversionError::backend_unavailable("cdp").with_detail(&e.to_string())
            })?;
        let browser = Browser::new(launch_options)
            .map_err(|e| ConversionError::backend_unavailable("cdp").with_detail(&e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ConversionError::backend_unavailable("cdp").with_detail(&e.to_string()))?;

        let dialogs: Arc<Mutex<DialogHandlers>> = Arc::new(Mutex::new(DialogHandlers::default()));
        register_dialog_listener(&tab, dialogs.clone());

        let mut page = Self {
            _browser: browser,
            frame: CdpFrame {
                tab,
                contents_size: viewport,
                has_document: false,
            },
            tracker: LoadTracker::new(),
            viewport,
            settings: settings.clone(),
            dialogs,
            injected_style_sheet: None,
        };
        page.apply_settings(settings);
        Ok(page)
    }

    fn finish_load(&mut self, generation: u64, ok: bool) {
        if ok {
            self.frame.has_document = true;
            self.frame.measure_contents_size();
        }
        self.tracker.complete(generation, ok);
    }
}

/// Answer JavaScript dialogs from the installed handlers; unhandled dialogs
/// get the deterministic defaults (dismiss, `false`, cancel).
fn register_dialog_listener(tab: &Arc<Tab>, dialogs: Arc<Mutex<DialogHandlers>>) {
    let responder = tab.clone();
    let result = tab.add_event_listener(Arc::new(move |event: &Event| {
        let Event::PageJavascriptDialogOpening(opening) = event else {
            return;
        };
        let message = opening.params.message.clone();
        let default = opening.params.default_prompt.clone().unwrap_or_default();
        let handlers = dialogs
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone();
        let (accept, prompt_text) = match opening.params.Type {
            DialogType::Alert => {
                if let Some(handler) = &handlers.alert {
                    handler(&message);
                }
                (true, None)
            }
            DialogType::Confirm => {
                let answer = handlers
                    .confirm
                    .as_ref()
                    .map(|handler| handler(&message))
                    .unwrap_or(false);
                (answer, None)
            }
            DialogType::Prompt => match handlers
                .prompt
                .as_ref()
                .and_then(|handler| handler(&message, &default))
            {
                Some(text) => (true, Some(text)),
                None => (false, None),
            },
            DialogType::Beforeunload => (true, None),
        };
        if let Err(err) = responder.call_method(ProtoPage::HandleJavaScriptDialog {
            accept,
            prompt_text,
        }) {
            log::warn!("failed to answer JavaScript dialog: {}", err);
        }
    }));
    if let Err(err) = result {
        log::warn!("failed to install dialog listener: {}", err);
    }
}

impl Page for CdpPage {
    fn load(&mut self, url: &str, on_complete: LoadCallback) {
        let generation = self.tracker.begin(on_complete);
        let ok = self
            .frame
            .tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| true)
            .unwrap_or_else(|err| {
                log::warn!("navigation to {} failed: {}", url, err);
                false
            });
        self.finish_load(generation, ok);
    }

    fn set_content(&mut self, html: &str, base_url: &str, on_complete: LoadCallback) {
        if !base_url.is_empty() && base_url != "about:blank" {
            // Data-URL navigation cannot carry a base URL.
            log::debug!("base_url is not honored by the cdp engine's inline loads");
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(html);
        let data_url = format!("data:text/html;base64,{}", encoded);
        self.load(&data_url, on_complete);
    }

    fn title(&self) -> String {
        self.frame.title()
    }

    fn url(&self) -> String {
        self.frame.url()
    }

    fn main_frame(&mut self) -> &mut dyn Frame {
        &mut self.frame
    }

    fn load_state(&self) -> LoadState {
        self.tracker.state()
    }

    fn apply_settings(&mut self, settings: &WebSettings) {
        if let Err(err) = self
            .frame
            .tab
            .call_method(Emulation::SetScriptExecutionDisabled {
                value: !settings.enable_javascript,
            })
        {
            log::warn!("failed to toggle script execution: {}", err);
        }
        if !settings.user_style_sheet.is_empty()
            && self.injected_style_sheet.as_deref() != Some(settings.user_style_sheet.as_str())
        {
            self.frame.inject_user_style_sheet(&settings.user_style_sheet);
            self.injected_style_sheet = Some(settings.user_style_sheet.clone());
        }
        if !settings.load_images {
            log::debug!("load_images has no native toggle over this protocol surface");
        }
        if settings.minimum_font_size != 0 {
            log::debug!("minimum_font_size is not mapped for the cdp engine");
        }
        self.settings = settings.clone();
    }

    fn render_to_print_surface(
        &mut self,
        surface: &mut dyn PrintSurface,
        on_complete: LoadCallback,
    ) {
        let outcome = self.frame.print_pdf(self.settings.background);
        match outcome.and_then(|pdf| surface.write_document(&pdf)) {
            Ok(()) => on_complete(true),
            Err(err) => {
                log::warn!("print to {} failed: {}", surface.describe(), err);
                on_complete(false);
            }
        }
    }

    fn render_to_bitmap(&mut self, size: Viewport) -> BitmapOutput {
        if !self.frame.has_document {
            // No attached view surface to capture from.
            return BitmapOutput::Unsupported;
        }
        match self.frame.capture_png() {
            Ok(png_data) => match image::load_from_memory(&png_data) {
                Ok(decoded) => BitmapOutput::Image(Bitmap {
                    width: decoded.width(),
                    height: decoded.height(),
                    png_data,
                }),
                Err(err) => {
                    log::warn!("screenshot decode failed: {}", err);
                    BitmapOutput::Unsupported
                }
            },
            Err(err) => {
                log::warn!(
                    "screenshot capture at {}x{} failed: {}",
                    size.width,
                    size.height,
                    err
                );
                BitmapOutput::Unsupported
            }
        }
    }

    fn set_viewport_size(&mut self, size: Viewport) {
        // The window size is fixed at launch; later changes are recorded
        // for callers but not pushed to the live browser.
        log::debug!(
            "viewport change to {}x{} recorded; live window keeps its launch size",
            size.width,
            size.height
        );
        self.viewport = size;
    }

    fn viewport_size(&self) -> Viewport {
        self.viewport
    }

    fn set_dialog_handlers(&mut self, handlers: DialogHandlers) {
        *self
            .dialogs
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = handlers;
    }

    fn set_network_hook(&mut self, _hook: NetworkHook) {
        // The browser process owns its network stack; there is no protocol
        // surface to route individual requests through a caller policy.
        log::debug!("network request policy is engine-owned for the cdp backend");
    }

    fn evaluate_script(&mut self, code: &str, callback: ScriptCallback) {
        if !self.settings.enable_javascript {
            log::debug!("script evaluation skipped: JavaScript is disabled");
            callback(String::new());
            return;
        }
        self.frame.evaluate_script(code, callback);
    }
}

impl CdpFrame {
    fn eval_string(&self, script: &str) -> Result<String> {
        let evaluated = self
            .tab
            .evaluate(script, false)
            .map_err(|e| ConversionError::rendering_failed(&format!("evaluation: {}", e)))?;
        Ok(match evaluated.value {
            Some(value) => match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            },
            None => "null".to_string(),
        })
    }

    fn measure_contents_size(&mut self) {
        let script = "JSON.stringify({width: document.documentElement.scrollWidth, \
                      height: document.documentElement.scrollHeight})";
        match self.eval_string(script) {
            Ok(json) => {
                if let Ok(size) = serde_json::from_str::<Viewport>(&json) {
                    self.contents_size = size;
                }
            }
            Err(err) => log::debug!("content size measurement failed: {}", err),
        }
    }

    fn inject_user_style_sheet(&self, path: &str) {
        let css = match std::fs::read_to_string(path) {
            Ok(css) => css,
            Err(err) => {
                log::warn!("cannot read user stylesheet {}: {}", path, err);
                return;
            }
        };
        // Translated to an injected <style> element on every new document.
        let source = format!(
            "(function() {{ var s = document.createElement('style'); \
             s.textContent = {}; \
             document.documentElement.appendChild(s); }})();",
            serde_json::to_string(&css).unwrap_or_default()
        );
        if let Err(err) = self.tab.call_method(ProtoPage::AddScriptToEvaluateOnNewDocument {
            source,
            world_name: None,
            include_command_line_api: None,
            run_immediately: Some(true),
        }) {
            log::warn!("user stylesheet injection failed: {}", err);
        }
    }

    fn capture_png(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(ProtoPage::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| ConversionError::rendering_failed(&format!("screenshot: {}", e)))
    }

    fn print_pdf(&self, background: bool) -> Result<Vec<u8>> {
        self.tab
            .print_to_pdf(Some(ProtoPage::PrintToPdfOptions {
                print_background: Some(background),
                ..Default::default()
            }))
            .map_err(|e| ConversionError::rendering_failed(&format!("print: {}", e)))
    }

    fn query_snapshots(&self, selector: &str) -> Vec<element::ElementSnapshot> {
        if !self.has_document {
            return Vec::new();
        }
        let selector_literal = match serde_json::to_string(selector) {
            Ok(literal) => literal,
            Err(_) => return Vec::new(),
        };
        let script = format!(
            r#"(function() {{
                function snap(el, depth) {{
                    var r = el.getBoundingClientRect();
                    var attrs = {{}};
                    for (var i = 0; i < el.attributes.length; i++) {{
                        attrs[el.attributes[i].name] = el.attributes[i].value;
                    }}
                    var children = [];
                    if (depth > 0) {{
                        for (var j = 0; j < el.children.length; j++) {{
                            children.push(snap(el.children[j], depth - 1));
                        }}
                    }}
                    return {{ tagName: el.tagName, attributes: attrs,
                              x: r.x, y: r.y, width: r.width, height: r.height,
                              children: children }};
                }}
                var out = [];
                try {{
                    var matches = document.querySelectorAll({selector});
                    for (var k = 0; k < matches.length; k++) {{
                        out.push(snap(matches[k], 3));
                    }}
                }} catch (e) {{}}
                return JSON.stringify(out);
            }})()"#,
            selector = selector_literal
        );
        match self.eval_string(&script) {
            Ok(json) => element::snapshots_from_wire(&json),
            Err(err) => {
                log::warn!("element query for '{}' failed: {}", selector, err);
                Vec::new()
            }
        }
    }
}

impl Frame for CdpFrame {
    fn title(&self) -> String {
        if !self.has_document {
            return String::new();
        }
        self.tab.get_title().unwrap_or_default()
    }

    fn url(&self) -> String {
        if !self.has_document {
            return String::new();
        }
        self.tab.get_url()
    }

    fn contents_size(&self) -> Viewport {
        self.contents_size
    }

    fn render(&mut self, surface: &mut PixelSurface, clip: Option<Rect>) -> Result<()> {
        if !self.has_document {
            return Err(ConversionError::rendering_failed("no document loaded"));
        }
        // Emulated via a native screenshot capture; the decoded pixels are
        // blitted so the surface is never silently left blank on success.
        let png = match clip {
            Some(clip) => self
                .tab
                .capture_screenshot(
                    ProtoPage::CaptureScreenshotFormatOption::Png,
                    None,
                    Some(ProtoPage::Viewport {
                        x: clip.x,
                        y: clip.y,
                        width: clip.width,
                        height: clip.height,
                        scale: 1.0,
                    }),
                    true,
                )
                .map_err(|e| ConversionError::rendering_failed(&format!("screenshot: {}", e)))?,
            None => self.capture_png()?,
        };
        let decoded = image::load_from_memory(&png)
            .map_err(|e| ConversionError::rendering_failed(&format!("screenshot decode: {}", e)))?
            .to_rgba8();
        surface.blit_rgba(decoded.as_raw(), decoded.width(), decoded.height());
        Ok(())
    }

    fn evaluate_script(&mut self, code: &str, callback: ScriptCallback) {
        if !self.has_document {
            callback(String::new());
            return;
        }
        match self.eval_string(code) {
            Ok(value) => callback(value),
            Err(err) => {
                log::warn!("script evaluation failed: {}", err);
                callback(format!("Error: {}", err));
            }
        }
    }

    fn find_first_element(&mut self, selector: &str, callback: ElementCallback) {
        callback(self.query_snapshots(selector).into_iter().next());
    }

    fn find_all_elements(&mut self, selector: &str, callback: ElementsCallback) {
        callback(self.query_snapshots(selector));
    }
}
