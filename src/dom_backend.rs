//! Synchronous in-process backend: direct DOM traversal over a parsed
//! document, inline script evaluation, and the built-in rendering pipeline.
//!
//! Every completion channel is invoked inline before the call returns, so
//! this backend never leaves a callback pending past teardown. Element
//! queries walk the live tree directly rather than going through a wire
//! form.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::element::{ElementSnapshot, Rect};
use crate::error::{ConversionError, Result};
use crate::frame::{
    ElementCallback, ElementsCallback, Frame, LoadCallback, ScriptCallback,
};
use crate::page::{DialogHandlers, LoadState, LoadTracker, NetworkHook, Page};
use crate::rendering::{self, LayoutResult};
use crate::surface::{BitmapOutput, PixelSurface, PrintSurface};
use crate::{Viewport, WebSettings};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

thread_local! {
    // Dialog handlers for the script evaluation currently on this thread.
    // Set for the duration of one eval, cleared on exit.
    static ACTIVE_DIALOGS: RefCell<Option<DialogHandlers>> = const { RefCell::new(None) };
}

pub struct DomPage {
    frame: DomFrame,
    tracker: LoadTracker,
    settings: WebSettings,
    client: reqwest::blocking::Client,
    network_hook: NetworkHook,
}

pub(crate) struct DomFrame {
    document: Option<Html>,
    layout: Option<LayoutResult>,
    url: String,
    viewport: Viewport,
    settings: WebSettings,
    dialogs: DialogHandlers,
}

impl DomPage {
    pub fn new(settings: &WebSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| {
                ConversionError::system_error(&format!("HTTP client initialization: {}", e))
            })?;
        Ok(Self {
            frame: DomFrame {
                document: None,
                layout: None,
                url: String::new(),
                viewport: Viewport::default(),
                settings: settings.clone(),
                dialogs: DialogHandlers::default(),
            },
            tracker: LoadTracker::new(),
            settings: settings.clone(),
            client,
            network_hook: NetworkHook::default(),
        })
    }

    fn fetch_http(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ConversionError::network_error(url, &e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConversionError::network_error(
                url,
                &format!("HTTP status {}", response.status()),
            ));
        }
        response
            .text()
            .map_err(|e| ConversionError::network_error(url, &e.to_string()))
    }

    fn read_local(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| {
            let shown = path.display().to_string();
            match e.kind() {
                std::io::ErrorKind::NotFound => ConversionError::file_not_found(&shown),
                std::io::ErrorKind::PermissionDenied => ConversionError::permission_denied(&shown),
                _ => ConversionError::system_error(&format!("reading {}: {}", shown, e)),
            }
        })
    }

    fn fetch(&self, target: &str) -> Result<String> {
        // The policy sees every fetch, local files included.
        if !self.network_hook.allows(target) {
            return Err(ConversionError::network_error(
                target,
                "blocked by request policy",
            ));
        }
        match Url::parse(target) {
            Ok(parsed) => match parsed.scheme() {
                "http" | "https" => self.fetch_http(target),
                "file" => {
                    let path = parsed
                        .to_file_path()
                        .map_err(|_| ConversionError::file_not_found(target))?;
                    Self::read_local(&path)
                }
                other => Err(ConversionError::network_error(
                    target,
                    &format!("unsupported scheme '{}'", other),
                )),
            },
            // Bare paths are treated as local files, matching CLI usage.
            Err(_) => Self::read_local(Path::new(target)),
        }
    }
}

impl Page for DomPage {
    fn load(&mut self, url: &str, on_complete: LoadCallback) {
        let generation = self.tracker.begin(on_complete);
        match self.fetch(url) {
            Ok(body) => {
                self.frame.set_document(Html::parse_document(&body), url);
                self.tracker.complete(generation, true);
            }
            Err(err) => {
                log::warn!("load of {} failed: {}", url, err);
                self.tracker.complete(generation, false);
            }
        }
    }

    fn set_content(&mut self, html: &str, base_url: &str, on_complete: LoadCallback) {
        let generation = self.tracker.begin(on_complete);
        self.frame.set_document(Html::parse_document(html), base_url);
        self.tracker.complete(generation, true);
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
        // This engine applies settings at use sites: JavaScript gating in
        // evaluate, background in the display list. Flags with no native
        // equivalent here are logged once as best-effort.
        if settings.user_style_sheet != self.settings.user_style_sheet {
            log::debug!("user_style_sheet is not applied by the dom engine");
        }
        if settings.minimum_font_size != self.settings.minimum_font_size {
            log::debug!("minimum_font_size has no native equivalent in the dom engine");
        }
        if settings.default_encoding != self.settings.default_encoding {
            log::debug!("default_encoding is fixed to UTF-8 in the dom engine");
        }
        self.settings = settings.clone();
        self.frame.settings = settings.clone();
    }

    fn render_to_print_surface(
        &mut self,
        surface: &mut dyn PrintSurface,
        on_complete: LoadCallback,
    ) {
        let outcome = self
            .frame
            .current_layout()
            .ok_or_else(|| ConversionError::rendering_failed("no document loaded"))
            .and_then(|layout| rendering::paginate_to_pdf(&layout))
            .and_then(|pdf| surface.write_document(&pdf));
        match outcome {
            Ok(()) => on_complete(true),
            Err(err) => {
                log::warn!("print to {} failed: {}", surface.describe(), err);
                on_complete(false);
            }
        }
    }

    fn render_to_bitmap(&mut self, size: Viewport) -> BitmapOutput {
        let mut surface = PixelSurface::new(size.width, size.height);
        if let Err(err) = self.frame.render(&mut surface, None) {
            log::warn!("bitmap render failed: {}", err);
            return BitmapOutput::Unsupported;
        }
        match surface.into_bitmap() {
            Ok(bitmap) => BitmapOutput::Image(bitmap),
            Err(err) => {
                log::warn!("bitmap encoding failed: {}", err);
                BitmapOutput::Unsupported
            }
        }
    }

    fn set_viewport_size(&mut self, size: Viewport) {
        self.frame.viewport = size;
        self.frame.relayout();
    }

    fn viewport_size(&self) -> Viewport {
        self.frame.viewport
    }

    fn set_dialog_handlers(&mut self, handlers: DialogHandlers) {
        self.frame.dialogs = handlers;
    }

    fn set_network_hook(&mut self, hook: NetworkHook) {
        self.network_hook = hook;
    }

    fn evaluate_script(&mut self, code: &str, callback: ScriptCallback) {
        self.frame.evaluate_script(code, callback);
    }
}

impl DomFrame {
    fn set_document(&mut self, document: Html, url: &str) {
        self.document = Some(document);
        self.url = url.to_string();
        self.relayout();
    }

    fn relayout(&mut self) {
        self.layout = self
            .document
            .as_ref()
            .map(|doc| rendering::layout_document(doc, self.viewport));
    }

    fn current_layout(&mut self) -> Option<LayoutResult> {
        if self.layout.is_none() {
            self.relayout();
        }
        self.layout.clone()
    }

    fn snapshot(&self, element: ElementRef<'_>, layout: Option<&LayoutResult>) -> ElementSnapshot {
        let attributes: HashMap<String, String> = element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let bounding_box = layout
            .map(|l| l.geometry_for(element))
            .unwrap_or_else(Rect::default);
        ElementSnapshot {
            // Uppercase to match the DOM's tagName convention, keeping both
            // backends' snapshots interchangeable.
            tag_name: element.value().name().to_ascii_uppercase(),
            id: attributes.get("id").cloned().unwrap_or_default(),
            attributes,
            children: element
                .children()
                .filter_map(ElementRef::wrap)
                .map(|child| self.snapshot(child, layout))
                .collect(),
            bounding_box,
        }
    }

    fn select_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("invalid selector '{}'", selector);
                return Vec::new();
            }
        };
        document
            .select(&parsed)
            .map(|el| self.snapshot(el, self.layout.as_ref()))
            .collect()
    }
}

fn js_dialog_argument(args: &[boa_engine::JsValue], index: usize) -> String {
    args.get(index)
        .map(|a| format!("{}", a.display()))
        .unwrap_or_default()
}

fn js_alert(
    _this: &boa_engine::JsValue,
    args: &[boa_engine::JsValue],
    _ctx: &mut boa_engine::Context,
) -> boa_engine::JsResult<boa_engine::JsValue> {
    let message = js_dialog_argument(args, 0);
    ACTIVE_DIALOGS.with(|slot| {
        if let Some(handler) = slot.borrow().as_ref().and_then(|d| d.alert.clone()) {
            handler(&message);
        }
    });
    Ok(boa_engine::JsValue::undefined())
}

fn js_confirm(
    _this: &boa_engine::JsValue,
    args: &[boa_engine::JsValue],
    _ctx: &mut boa_engine::Context,
) -> boa_engine::JsResult<boa_engine::JsValue> {
    let message = js_dialog_argument(args, 0);
    // Without an installed handler the deterministic answer is false.
    let answer = ACTIVE_DIALOGS.with(|slot| {
        slot.borrow()
            .as_ref()
            .and_then(|d| d.confirm.clone())
            .map(|handler| handler(&message))
            .unwrap_or(false)
    });
    Ok(boa_engine::JsValue::from(answer))
}

fn js_prompt(
    _this: &boa_engine::JsValue,
    args: &[boa_engine::JsValue],
    _ctx: &mut boa_engine::Context,
) -> boa_engine::JsResult<boa_engine::JsValue> {
    let message = js_dialog_argument(args, 0);
    let default = js_dialog_argument(args, 1);
    // Without an installed handler the deterministic answer is cancel.
    let answer = ACTIVE_DIALOGS.with(|slot| {
        slot.borrow()
            .as_ref()
            .and_then(|d| d.prompt.clone())
            .and_then(|handler| handler(&message, &default))
    });
    Ok(match answer {
        Some(text) => boa_engine::JsValue::from(boa_engine::JsString::from(text.as_str())),
        None => boa_engine::JsValue::null(),
    })
}

fn evaluate_with_dialogs(code: &str, dialogs: &DialogHandlers) -> String {
    let mut ctx: boa_engine::Context = boa_engine::Context::default();
    for (name, arity, native) in [
        ("alert", 1usize, js_alert as boa_engine::native_function::NativeFunctionPointer),
        ("confirm", 1usize, js_confirm as boa_engine::native_function::NativeFunctionPointer),
        ("prompt", 2usize, js_prompt as boa_engine::native_function::NativeFunctionPointer),
    ] {
        let nf = boa_engine::native_function::NativeFunction::from_fn_ptr(native);
        let _ = ctx.register_global_builtin_callable(boa_engine::JsString::from(name), arity, nf);
    }

    ACTIVE_DIALOGS.with(|slot| *slot.borrow_mut() = Some(dialogs.clone()));
    let result = match ctx.eval(boa_engine::Source::from_bytes(code.as_bytes())) {
        Ok(value) => format!("{}", value.display()),
        Err(err) => {
            log::warn!("script evaluation failed: {}", err);
            format!("Error: {}", err)
        }
    };
    ACTIVE_DIALOGS.with(|slot| *slot.borrow_mut() = None);
    result
}

impl Frame for DomFrame {
    fn title(&self) -> String {
        let Some(document) = &self.document else {
            return String::new();
        };
        match Selector::parse("title") {
            Ok(selector) => document
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        }
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn contents_size(&self) -> Viewport {
        self.layout
            .as_ref()
            .map(|l| l.content_size)
            .unwrap_or(self.viewport)
    }

    fn render(&mut self, surface: &mut PixelSurface, clip: Option<Rect>) -> Result<()> {
        let layout = self
            .current_layout()
            .ok_or_else(|| ConversionError::rendering_failed("no document loaded"))?;
        let commands = rendering::display_list(&layout, self.settings.background);
        rendering::rasterize(&commands, surface, clip);
        Ok(())
    }

    fn evaluate_script(&mut self, code: &str, callback: ScriptCallback) {
        if !self.settings.enable_javascript {
            log::debug!("script evaluation skipped: JavaScript is disabled");
            callback(String::new());
            return;
        }
        let result = evaluate_with_dialogs(code, &self.dialogs);
        callback(result);
    }

    fn find_first_element(&mut self, selector: &str, callback: ElementCallback) {
        callback(self.select_all(selector).into_iter().next());
    }

    fn find_all_elements(&mut self, selector: &str, callback: ElementsCallback) {
        callback(self.select_all(selector));
    }
}
