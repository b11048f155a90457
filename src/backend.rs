//! Backend capability registry.
//!
//! Enumerates which render backends are compiled in, selects a default, and
//! exposes human-readable capability descriptions. The process-wide default
//! is lazily computed once and cached; `set_default_backend` overwrites it
//! under a single-writer-wins rule. Tests construct their own
//! [`BackendRegistry`] instead of touching the global one.

use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

/// Render backend variants.
///
/// `Dom` is the synchronous in-process engine with direct DOM traversal;
/// `Cdp` drives Chromium over the DevTools Protocol and reaches the DOM only
/// through injected scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Dom,
    Cdp,
}

impl BackendKind {
    /// All variants in stable registry order (Dom before Cdp).
    pub const ALL: [BackendKind; 2] = [BackendKind::Dom, BackendKind::Cdp];

    /// Whether the backend is compiled into this build. Total, never panics.
    pub fn compiled_in(self) -> bool {
        match self {
            BackendKind::Dom => cfg!(feature = "dom"),
            BackendKind::Cdp => cfg!(feature = "cdp"),
        }
    }

    /// Human-readable backend name. Total over the enum.
    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Dom => "Native DOM engine",
            BackendKind::Cdp => "Chromium (CDP)",
        }
    }

    /// One-paragraph capability description. Total over the enum.
    pub fn capability_summary(self) -> &'static str {
        match self {
            BackendKind::Dom => {
                "In-process HTML engine with direct DOM traversal and inline script \
                 evaluation. Limited CSS support: no flexbox, grid, custom properties \
                 or calc(). Suitable for simple documents and deterministic output."
            }
            BackendKind::Cdp => {
                "Chromium driven over the DevTools Protocol. Full modern CSS3 support \
                 including flexbox, grid, transforms, animations. Recommended for \
                 modern HTML/CSS."
            }
        }
    }

    /// Short name used on the command line and in error messages.
    pub fn short_name(self) -> &'static str {
        match self {
            BackendKind::Dom => "dom",
            BackendKind::Cdp => "cdp",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "dom" => Ok(BackendKind::Dom),
            "cdp" | "chromium" => Ok(BackendKind::Cdp),
            _ => Err(()),
        }
    }
}

/// Registry of available backends with a cached default selection.
///
/// The default-backend cache is explicit lifecycle state: initialized lazily
/// on the first `default_backend` call, mutable only through
/// `set_default_backend`, last writer wins.
pub struct BackendRegistry {
    available: Vec<BackendKind>,
    default: Mutex<Option<BackendKind>>,
}

impl BackendRegistry {
    /// Registry reflecting the backends compiled into this build.
    pub fn new() -> Self {
        Self::with_available(
            BackendKind::ALL
                .iter()
                .copied()
                .filter(|k| k.compiled_in())
                .collect(),
        )
    }

    /// Registry with an explicit availability set. Used by tests to model
    /// builds with a different feature selection.
    pub fn with_available(mut available: Vec<BackendKind>) -> Self {
        // Keep the stable Dom-before-Cdp order regardless of input order.
        available.sort_by_key(|k| BackendKind::ALL.iter().position(|a| a == k));
        available.dedup();
        Self {
            available,
            default: Mutex::new(None),
        }
    }

    /// Whether `kind` is available in this registry. Total, never panics.
    pub fn is_available(&self, kind: BackendKind) -> bool {
        self.available.contains(&kind)
    }

    /// Available backends in stable order. An empty list means the build has
    /// no usable backend, which callers must treat as a configuration error.
    pub fn available_backends(&self) -> Vec<BackendKind> {
        self.available.clone()
    }

    /// Deterministic preference: the modern Cdp engine when available,
    /// otherwise the legacy Dom engine.
    pub fn best_available(&self) -> Option<BackendKind> {
        if self.is_available(BackendKind::Cdp) {
            Some(BackendKind::Cdp)
        } else if self.is_available(BackendKind::Dom) {
            Some(BackendKind::Dom)
        } else {
            None
        }
    }

    /// The cached default backend. The first call computes it via
    /// `best_available` and caches the result for the registry lifetime.
    pub fn default_backend(&self) -> Option<BackendKind> {
        let mut cached = self
            .default
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        if cached.is_none() {
            *cached = self.best_available();
        }
        *cached
    }

    /// Overwrite the cached default. Silently ignored when `kind` is not
    /// available, so a bad override can never select a dead backend.
    pub fn set_default_backend(&self, kind: BackendKind) {
        if !self.is_available(kind) {
            log::warn!(
                "ignoring default-backend override: '{}' is not available",
                kind.short_name()
            );
            return;
        }
        let mut cached = self
            .default
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        *cached = Some(kind);
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry instance.
pub fn global() -> &'static BackendRegistry {
    static GLOBAL: OnceLock<BackendRegistry> = OnceLock::new();
    GLOBAL.get_or_init(BackendRegistry::new)
}

/// Process-wide default backend (see [`BackendRegistry::default_backend`]).
pub fn default_backend() -> Option<BackendKind> {
    global().default_backend()
}

/// Override the process-wide default backend.
pub fn set_default_backend(kind: BackendKind) {
    global().set_default_backend(kind)
}

/// Backends available in this build, in stable order.
pub fn available_backends() -> Vec<BackendKind> {
    global().available_backends()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_is_total_over_all_kinds() {
        let registry = BackendRegistry::new();
        for kind in BackendKind::ALL {
            // Must return a boolean for every variant without panicking.
            let _ = registry.is_available(kind);
            let _ = kind.display_name();
            let _ = kind.capability_summary();
        }
    }

    #[test]
    fn default_backend_is_idempotent() {
        let registry = BackendRegistry::with_available(vec![BackendKind::Dom, BackendKind::Cdp]);
        let first = registry.default_backend();
        let second = registry.default_backend();
        assert_eq!(first, second);
        assert_eq!(first, Some(BackendKind::Cdp));
    }

    #[test]
    fn best_available_prefers_the_modern_engine() {
        let both = BackendRegistry::with_available(vec![BackendKind::Cdp, BackendKind::Dom]);
        assert_eq!(both.best_available(), Some(BackendKind::Cdp));

        let legacy_only = BackendRegistry::with_available(vec![BackendKind::Dom]);
        assert_eq!(legacy_only.best_available(), Some(BackendKind::Dom));

        let none = BackendRegistry::with_available(vec![]);
        assert_eq!(none.best_available(), None);
        assert!(none.available_backends().is_empty());
    }

    #[test]
    fn set_default_ignores_unavailable_kind() {
        let registry = BackendRegistry::with_available(vec![BackendKind::Dom]);
        assert_eq!(registry.default_backend(), Some(BackendKind::Dom));
        registry.set_default_backend(BackendKind::Cdp);
        assert_eq!(registry.default_backend(), Some(BackendKind::Dom));
    }

    #[test]
    fn set_default_overrides_when_available() {
        let registry = BackendRegistry::with_available(vec![BackendKind::Dom, BackendKind::Cdp]);
        registry.set_default_backend(BackendKind::Dom);
        assert_eq!(registry.default_backend(), Some(BackendKind::Dom));
    }

    #[test]
    fn available_backends_order_is_stable() {
        let registry = BackendRegistry::with_available(vec![BackendKind::Cdp, BackendKind::Dom]);
        assert_eq!(
            registry.available_backends(),
            vec![BackendKind::Dom, BackendKind::Cdp]
        );
    }

    #[test]
    fn parse_accepts_short_names() {
        assert_eq!("dom".parse::<BackendKind>(), Ok(BackendKind::Dom));
        assert_eq!("CDP".parse::<BackendKind>(), Ok(BackendKind::Cdp));
        assert!("webkit".parse::<BackendKind>().is_err());
    }
}
