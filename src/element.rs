//! Engine-agnostic DOM element snapshots.
//!
//! A snapshot reflects an element at the instant of capture and is never
//! updated afterwards. The synchronous backend builds snapshots by walking
//! the live DOM; the CDP backend receives them as a JSON wire form produced
//! by an injected query script and deserializes them here.

use serde::Deserialize;
use std::collections::HashMap;

/// Axis-aligned bounding box in viewport pixels at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Immutable snapshot of one DOM element.
///
/// Children are owned exclusively by their parent snapshot; there are no
/// back-references. Snapshots are created on demand by a query operation and
/// dropped by the caller, never pooled or cached across queries.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshot {
    pub tag_name: String,
    pub id: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<ElementSnapshot>,
    pub bounding_box: Rect,
}

impl ElementSnapshot {
    /// Attribute value by name, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Transportable element form emitted by the injected query script.
#[derive(Debug, Deserialize)]
pub(crate) struct WireElement {
    #[serde(rename = "tagName")]
    pub tag_name: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub children: Vec<WireElement>,
}

impl From<WireElement> for ElementSnapshot {
    fn from(wire: WireElement) -> Self {
        let id = wire.attributes.get("id").cloned().unwrap_or_default();
        ElementSnapshot {
            tag_name: wire.tag_name,
            id,
            attributes: wire.attributes,
            children: wire.children.into_iter().map(ElementSnapshot::from).collect(),
            bounding_box: Rect::new(wire.x, wire.y, wire.width, wire.height),
        }
    }
}

/// Deserialize the wire form of a multi-element query result.
pub(crate) fn snapshots_from_wire(json: &str) -> Vec<ElementSnapshot> {
    match serde_json::from_str::<Vec<WireElement>>(json) {
        Ok(wire) => wire.into_iter().map(ElementSnapshot::from).collect(),
        Err(err) => {
            log::warn!("discarding malformed element query result: {}", err);
            Vec::new()
        }
    }
}

/// Deserialize the wire form of a single-element query result.
/// A JSON `null` (no match) maps to `None`.
pub(crate) fn snapshot_from_wire(json: &str) -> Option<ElementSnapshot> {
    match serde_json::from_str::<Option<WireElement>>(json) {
        Ok(wire) => wire.map(ElementSnapshot::from),
        Err(err) => {
            log::warn!("discarding malformed element query result: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup() {
        let mut snapshot = ElementSnapshot {
            tag_name: "DIV".to_string(),
            ..Default::default()
        };
        snapshot
            .attributes
            .insert("class".to_string(), "header".to_string());
        assert_eq!(snapshot.attribute("class"), Some("header"));
        assert_eq!(snapshot.attribute("id"), None);
    }

    #[test]
    fn wire_list_round_trips_geometry_and_id() {
        let json = r#"[{
            "tagName": "P",
            "attributes": {"id": "intro", "class": "lede"},
            "x": 8.0, "y": 24.5, "width": 300.0, "height": 18.0
        }]"#;
        let snapshots = snapshots_from_wire(json);
        assert_eq!(snapshots.len(), 1);
        let el = &snapshots[0];
        assert_eq!(el.tag_name, "P");
        assert_eq!(el.id, "intro");
        assert_eq!(el.attribute("class"), Some("lede"));
        assert_eq!(el.bounding_box.y, 24.5);
    }

    #[test]
    fn wire_null_means_no_match() {
        assert!(snapshot_from_wire("null").is_none());
    }

    #[test]
    fn malformed_wire_yields_empty_not_panic() {
        assert!(snapshots_from_wire("{not json").is_empty());
    }

    #[test]
    fn nested_children_are_owned() {
        let json = r#"[{
            "tagName": "UL",
            "children": [{"tagName": "LI"}, {"tagName": "LI"}]
        }]"#;
        let snapshots = snapshots_from_wire(json);
        assert_eq!(snapshots[0].children.len(), 2);
        assert_eq!(snapshots[0].children[0].tag_name, "LI");
    }
}
