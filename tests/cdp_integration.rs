//! Chromium backend integration tests.
//!
//! All tests here launch a real browser and are ignored by default.

#![cfg(feature = "cdp")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use pagepress::{create_page, BackendKind, MemoryPrintSurface, Page, Viewport, WebSettings};

const SAMPLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>CDP Sample</title></head>
<body>
<h1 id="headline">Chromium path</h1>
<p>First paragraph.</p>
<p>Second paragraph.</p>
</body>
</html>"#;

fn loaded_page() -> Box<dyn Page> {
    let mut page = create_page(BackendKind::Cdp, &WebSettings::default()).unwrap();
    let ok = Arc::new(AtomicBool::new(false));
    let flag = ok.clone();
    page.set_content(SAMPLE, "about:blank", Box::new(move |s| flag.store(s, Ordering::SeqCst)));
    assert!(ok.load(Ordering::SeqCst));
    page
}

#[test]
#[ignore] // Requires Chrome to be installed
fn set_content_and_title() {
    let page = loaded_page();
    assert_eq!(page.title(), "CDP Sample");
}

#[test]
#[ignore] // Requires Chrome to be installed
fn injected_queries_return_wire_snapshots() {
    let mut page = loaded_page();
    let found = Arc::new(Mutex::new(Vec::new()));
    let sink = found.clone();
    page.main_frame()
        .find_all_elements("p", Box::new(move |els| *sink.lock().unwrap() = els));
    let found = found.lock().unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].tag_name, "P");
    assert!(found[0].bounding_box.y < found[1].bounding_box.y);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn screenshot_emulation_fills_the_surface() {
    let mut page = loaded_page();
    let output = page.render_to_bitmap(Viewport {
        width: 800,
        height: 600,
    });
    let bitmap = output.image().expect("live tab captures a screenshot");
    assert!(bitmap.png_data.starts_with(b"\x89PNG"));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn print_delivers_pdf_bytes_to_the_surface() {
    let mut page = loaded_page();
    let mut surface = MemoryPrintSurface::new();
    let ok = Arc::new(AtomicBool::new(false));
    let flag = ok.clone();
    page.render_to_print_surface(&mut surface, Box::new(move |s| flag.store(s, Ordering::SeqCst)));
    assert!(ok.load(Ordering::SeqCst));
    assert!(surface.data().starts_with(b"%PDF-"));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn bitmap_without_a_document_is_unsupported() {
    let mut page = create_page(BackendKind::Cdp, &WebSettings::default()).unwrap();
    let output = page.render_to_bitmap(Viewport::default());
    assert!(output.is_unsupported());
}

#[test]
#[ignore] // Requires Chrome to be installed
fn contents_size_is_measured_out_of_band() {
    let mut page = loaded_page();
    let size = page.main_frame().contents_size();
    assert!(size.width > 0);
    assert!(size.height > 0);
}
