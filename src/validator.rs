//! CSS compatibility validation and input sanity checks.
//!
//! Detection is lightweight pattern matching over whitespace-normalized
//! source, not a CSS parse. Compatibility findings are always warnings:
//! unsupported CSS degrades output quality but never blocks a conversion.

use crate::backend::BackendKind;

/// CSS features the validator knows how to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CssFeature {
    Flexbox,
    Grid,
    Transforms,
    Animations,
    Gradients,
    CustomProperties,
    Calc,
}

impl CssFeature {
    pub const ALL: [CssFeature; 7] = [
        CssFeature::Flexbox,
        CssFeature::Grid,
        CssFeature::Transforms,
        CssFeature::Animations,
        CssFeature::Gradients,
        CssFeature::CustomProperties,
        CssFeature::Calc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CssFeature::Flexbox => "CSS Flexbox",
            CssFeature::Grid => "CSS Grid",
            CssFeature::Transforms => "CSS Transforms",
            CssFeature::Animations => "CSS Animations",
            CssFeature::Gradients => "CSS Gradients",
            CssFeature::CustomProperties => "CSS Custom Properties",
            CssFeature::Calc => "CSS calc()",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One validation finding.
#[derive(Debug, Clone)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
    pub line: Option<u32>,
}

/// Outcome of a validation pass. `is_valid` reflects errors only; warnings
/// never invalidate the input.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub messages: Vec<ValidationMessage>,
    pub detected_features: Vec<CssFeature>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warning)
            .count()
    }

    fn error(&mut self, message: impl Into<String>, suggestion: Option<String>) {
        self.messages.push(ValidationMessage {
            severity: Severity::Error,
            message: message.into(),
            suggestion,
            line: None,
        });
    }

    fn warning(&mut self, message: impl Into<String>, suggestion: Option<String>) {
        self.messages.push(ValidationMessage {
            severity: Severity::Warning,
            message: message.into(),
            suggestion,
            line: None,
        });
    }
}

/// Strip whitespace and lowercase, so `display : FLEX` and `display:flex`
/// detect identically.
fn normalize(source: &str) -> String {
    source
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn detects(normalized: &str, feature: CssFeature) -> bool {
    match feature {
        CssFeature::Flexbox => {
            normalized.contains("display:flex") || normalized.contains("display:inline-flex")
        }
        CssFeature::Grid => {
            normalized.contains("display:grid") || normalized.contains("grid-template")
        }
        CssFeature::Transforms => normalized.contains("transform:"),
        CssFeature::Animations => {
            normalized.contains("@keyframes") || normalized.contains("animation:")
        }
        CssFeature::Gradients => {
            normalized.contains("linear-gradient(")
                || normalized.contains("radial-gradient(")
                || normalized.contains("conic-gradient(")
        }
        CssFeature::CustomProperties => normalized.contains("var(--"),
        CssFeature::Calc => normalized.contains("calc("),
    }
}

/// Support per backend kind and feature, expressed as data: adding a
/// backend or a feature is an edit to this table, not to call sites.
///
/// The in-process engine is a text-block renderer, so its row is uniformly
/// false. A WebKit-class legacy engine would carry a mixed row here
/// (transforms, animations and gradients supported); this engine makes no
/// such claim.
const SUPPORT_TABLE: &[(BackendKind, CssFeature, bool)] = &[
    (BackendKind::Dom, CssFeature::Flexbox, false),
    (BackendKind::Dom, CssFeature::Grid, false),
    (BackendKind::Dom, CssFeature::Transforms, false),
    (BackendKind::Dom, CssFeature::Animations, false),
    (BackendKind::Dom, CssFeature::Gradients, false),
    (BackendKind::Dom, CssFeature::CustomProperties, false),
    (BackendKind::Dom, CssFeature::Calc, false),
    (BackendKind::Cdp, CssFeature::Flexbox, true),
    (BackendKind::Cdp, CssFeature::Grid, true),
    (BackendKind::Cdp, CssFeature::Transforms, true),
    (BackendKind::Cdp, CssFeature::Animations, true),
    (BackendKind::Cdp, CssFeature::Gradients, true),
    (BackendKind::Cdp, CssFeature::CustomProperties, true),
    (BackendKind::Cdp, CssFeature::Calc, true),
];

fn supports(backend: BackendKind, feature: CssFeature) -> bool {
    SUPPORT_TABLE
        .iter()
        .find(|(kind, entry, _)| *kind == backend && *entry == feature)
        .map(|(_, _, supported)| *supported)
        // A missing entry is a table bug; claim nothing rather than panic.
        .unwrap_or(false)
}

/// Detect which known CSS features appear in `css`.
pub fn detect_css_features(css: &str) -> Vec<CssFeature> {
    let normalized = normalize(css);
    CssFeature::ALL
        .into_iter()
        .filter(|feature| detects(&normalized, *feature))
        .collect()
}

fn suggestion_for(feature: CssFeature, backend: BackendKind) -> String {
    if supports(backend, feature) {
        return format!("{} is supported by the current backend", feature.name());
    }
    let fallback = match feature {
        CssFeature::Flexbox => "use float or table-based layout as a fallback",
        CssFeature::Grid => "use nested block elements as a fallback",
        CssFeature::Transforms => "pre-transform assets or drop the effect for static output",
        CssFeature::Animations => "remove animations; they never apply to static output",
        CssFeature::Gradients => "use a solid fallback background color",
        CssFeature::CustomProperties => "inline the property values directly",
        CssFeature::Calc => "precompute the expression to a fixed value",
    };
    format!(
        "Use --backend cdp for full {} support, or {}",
        feature.name(),
        fallback
    )
}

/// Check a stylesheet against a backend's capabilities. Every unsupported
/// detected feature becomes a warning with a remediation hint; the result
/// stays valid.
pub fn check_compatibility(css: &str, backend: BackendKind) -> ValidationResult {
    let mut result = ValidationResult {
        detected_features: detect_css_features(css),
        ..Default::default()
    };
    for feature in result.detected_features.clone() {
        if !supports(backend, feature) {
            result.warning(
                format!(
                    "{} detected but not fully supported by the {} backend",
                    feature.name(),
                    backend.short_name()
                ),
                Some(suggestion_for(feature, backend)),
            );
        }
    }
    result
}

/// Structural sanity checks on an HTML document.
///
/// Empty input is the only hard error; a missing DOCTYPE or `<html>` element
/// degrades to a warning because every engine will still render the page.
pub fn validate_html(html: &str) -> ValidationResult {
    let mut result = ValidationResult::default();
    if html.trim().is_empty() {
        result.error(
            "HTML content is empty",
            Some("Provide a non-empty HTML document".to_string()),
        );
        return result;
    }
    let normalized = normalize(html);
    if !normalized.starts_with("<!doctype") {
        result.warning(
            "Missing DOCTYPE declaration",
            Some("Add <!DOCTYPE html> as the first line".to_string()),
        );
    }
    if !normalized.contains("<html") {
        result.warning(
            "Missing <html> element",
            Some("Wrap the document in <html>...</html>".to_string()),
        );
    }
    result
}

/// Structural sanity checks on a stylesheet: only brace balance, since the
/// engines tolerate everything else.
pub fn validate_css(css: &str) -> ValidationResult {
    let mut result = ValidationResult::default();
    let open = css.chars().filter(|&c| c == '{').count();
    let close = css.chars().filter(|&c| c == '}').count();
    if open != close {
        result.error(
            format!("Unbalanced braces: {} opening, {} closing", open, close),
            Some("Check for a missing '{' or '}' in the stylesheet".to_string()),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_flexbox_with_arbitrary_whitespace() {
        let features = detect_css_features(".a { display :\n\tFLEX ; }");
        assert_eq!(features, vec![CssFeature::Flexbox]);
    }

    #[test]
    fn detects_multiple_features_once_each() {
        let css = ".a { display: grid; grid-template-columns: 1fr; width: calc(100% - 10px); \
                   color: var(--fg); }";
        let features = detect_css_features(css);
        assert_eq!(
            features,
            vec![
                CssFeature::Grid,
                CssFeature::CustomProperties,
                CssFeature::Calc
            ]
        );
    }

    #[test]
    fn plain_css_detects_nothing() {
        assert!(detect_css_features("p { color: red; margin: 4px; }").is_empty());
    }

    #[test]
    fn flexbox_warns_on_dom_backend_but_stays_valid() {
        let result = check_compatibility(".a { display: flex; }", BackendKind::Dom);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
        assert!(result.messages[0].message.contains("CSS Flexbox"));
        assert!(result.messages[0]
            .suggestion
            .as_deref()
            .unwrap()
            .contains("--backend cdp"));
    }

    #[test]
    fn flexbox_is_clean_on_cdp_backend() {
        let result = check_compatibility(".a { display: flex; }", BackendKind::Cdp);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
        assert_eq!(result.detected_features, vec![CssFeature::Flexbox]);
    }

    #[test]
    fn empty_html_is_an_error() {
        let result = validate_html("   \n  ");
        assert!(!result.is_valid());
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn missing_doctype_and_html_are_warnings_only() {
        let result = validate_html("<body><p>hi</p></body>");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn complete_document_validates_clean() {
        let result = validate_html("<!DOCTYPE html><html><body></body></html>");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn unbalanced_braces_are_an_error() {
        assert!(!validate_css(".a { color: red;").is_valid());
        assert!(validate_css(".a { color: red; }").is_valid());
    }

    #[test]
    fn every_feature_has_a_name() {
        for feature in CssFeature::ALL {
            assert!(feature.name().starts_with("CSS"));
        }
    }

    #[test]
    fn support_table_covers_every_kind_and_feature() {
        for kind in BackendKind::ALL {
            for feature in CssFeature::ALL {
                assert!(
                    SUPPORT_TABLE
                        .iter()
                        .any(|(k, f, _)| *k == kind && *f == feature),
                    "missing table entry for {:?} x {:?}",
                    kind,
                    feature
                );
            }
        }
    }

    #[test]
    fn support_is_resolved_per_feature_not_per_backend() {
        // Every lookup must come from its own table entry; warnings and
        // remediation text follow the feature, not a backend-wide constant.
        let transforms = check_compatibility("h1 { transform: rotate(3deg); }", BackendKind::Dom);
        assert_eq!(transforms.warning_count(), 1);
        assert!(transforms.messages[0].message.contains("CSS Transforms"));

        let flex = check_compatibility(".a { display: flex; }", BackendKind::Dom);
        let flex_hint = flex.messages[0].suggestion.clone().unwrap();
        let calc = check_compatibility(".a { width: calc(100% - 1px); }", BackendKind::Dom);
        let calc_hint = calc.messages[0].suggestion.clone().unwrap();
        assert_ne!(flex_hint, calc_hint, "remediation must be per feature");
        assert!(flex_hint.contains("--backend cdp"));
        assert!(calc_hint.contains("precompute"));
    }
}
