//! In-process rendering pipeline for the DOM backend.
//!
//! Three stages: block layout of the parsed document, a display-list build,
//! and rasterization into a caller-supplied pixel surface. The same layout
//! result also feeds PDF pagination, so screen and print output agree on
//! geometry.

pub mod layout;
pub mod paint;
pub mod pdf;

pub use layout::{layout_document, BlockBox, LayoutResult};
pub use paint::{display_list, rasterize, PaintCommand};
pub use pdf::paginate_to_pdf;
