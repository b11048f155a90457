//! Structured error taxonomy for conversion failures.
//!
//! Errors are built by the named factory functions at the failure site and
//! flow upward unchanged until a single formatting boundary (the CLI or the
//! facade). The numeric codes are grouped into bands and rendered as
//! `ERR_###`; that numbering is an external contract and must not be
//! renumbered.

use std::fmt::Write as _;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Error codes, partitioned into bands:
/// file 1-10, content 11-20, backend 21-30, resource 31-40, system 41-50,
/// configuration 51-60, unknown 99.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    // File errors (1-10)
    FileNotFound = 1,
    FileReadError = 2,
    FileWriteError = 3,
    PermissionDenied = 4,

    // HTML/CSS content errors (11-20)
    InvalidHtml = 11,
    CssParseError = 12,
    MalformedUrl = 13,

    // Backend errors (21-30)
    BackendNotAvailable = 21,
    BackendInitFailed = 22,
    RenderingFailed = 23,

    // Resource errors (31-40)
    ResourceNotFound = 31,
    NetworkError = 32,
    Timeout = 33,

    // System errors (41-50)
    MemoryError = 41,
    OutOfDiskSpace = 42,
    SystemError = 43,

    // Configuration errors (51-60)
    InvalidOption = 51,
    InvalidPageSize = 52,
    InvalidOrientation = 53,

    // Unknown
    Unknown = 99,
}

impl ErrorCode {
    /// Stable `ERR_###` rendering of the numeric code.
    pub fn code_string(self) -> String {
        format!("ERR_{:03}", self as u8)
    }

    /// Human-readable name of the code. Total over the enum.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "File Not Found",
            ErrorCode::FileReadError => "File Read Error",
            ErrorCode::FileWriteError => "File Write Error",
            ErrorCode::PermissionDenied => "Permission Denied",
            ErrorCode::InvalidHtml => "Invalid HTML",
            ErrorCode::CssParseError => "CSS Parse Error",
            ErrorCode::MalformedUrl => "Malformed URL",
            ErrorCode::BackendNotAvailable => "Backend Not Available",
            ErrorCode::BackendInitFailed => "Backend Initialization Failed",
            ErrorCode::RenderingFailed => "Rendering Failed",
            ErrorCode::ResourceNotFound => "Resource Not Found",
            ErrorCode::NetworkError => "Network Error",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::MemoryError => "Memory Error",
            ErrorCode::OutOfDiskSpace => "Out of Disk Space",
            ErrorCode::SystemError => "System Error",
            ErrorCode::InvalidOption => "Invalid Option",
            ErrorCode::InvalidPageSize => "Invalid Page Size",
            ErrorCode::InvalidOrientation => "Invalid Orientation",
            ErrorCode::Unknown => "Unknown Error",
        }
    }
}

/// A structured conversion failure.
///
/// Carries the error band code, a message, an optional source location, one
/// actionable suggestion and a non-empty list of possible causes. The
/// factories below populate all of these; callers pass the value through
/// unchanged.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ConversionError {
    pub code: ErrorCode,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub suggestion: Option<String>,
    pub possible_causes: Vec<String>,
}

impl ConversionError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            suggestion: None,
            possible_causes: Vec::new(),
        }
    }

    /// File could not be found.
    pub fn file_not_found(path: &str) -> Self {
        let mut e = Self::new(ErrorCode::FileNotFound, "File not found");
        e.file = Some(path.to_string());
        e.suggestion =
            Some("Check the file path and ensure you have read permissions".to_string());
        e.possible_causes = vec![
            "File does not exist".to_string(),
            "Incorrect file path".to_string(),
            "Missing read permissions".to_string(),
            "File is in a different directory".to_string(),
        ];
        e
    }

    /// File or output directory is not accessible.
    pub fn permission_denied(path: &str) -> Self {
        let mut e = Self::new(ErrorCode::PermissionDenied, "Permission denied");
        e.file = Some(path.to_string());
        e.suggestion =
            Some("Check file permissions and ensure you have read/write access".to_string());
        e.possible_causes = vec![
            "File is read-only".to_string(),
            "Directory is not writable".to_string(),
            "File is locked by another process".to_string(),
        ];
        e
    }

    /// The requested render backend is not compiled in or cannot start.
    pub fn backend_unavailable(backend_name: &str) -> Self {
        let mut e = Self::new(
            ErrorCode::BackendNotAvailable,
            format!("Backend '{}' is not available", backend_name),
        );
        match backend_name {
            "cdp" | "Cdp" => {
                e.suggestion = Some(
                    "Install Chromium and rebuild with the `cdp` feature enabled".to_string(),
                );
                e.possible_causes = vec![
                    "Chromium/Chrome is not installed".to_string(),
                    "pagepress was built without the `cdp` feature".to_string(),
                    "The browser process failed to launch".to_string(),
                ];
            }
            "dom" | "Dom" => {
                e.suggestion = Some("Rebuild with the default `dom` feature enabled".to_string());
                e.possible_causes =
                    vec!["pagepress was built without the `dom` feature".to_string()];
            }
            _ => {
                e.suggestion =
                    Some("Valid backends: dom, cdp. Use --backend to specify.".to_string());
                e.possible_causes = vec!["Unrecognized backend name".to_string()];
            }
        }
        e
    }

    /// The input markup is unusable.
    pub fn invalid_html(details: &str) -> Self {
        let message = if details.is_empty() {
            "Invalid HTML".to_string()
        } else {
            format!("Invalid HTML: {}", details)
        };
        let mut e = Self::new(ErrorCode::InvalidHtml, message);
        e.suggestion =
            Some("Validate your HTML using a validator like validator.w3.org".to_string());
        e.possible_causes = vec![
            "Malformed HTML tags".to_string(),
            "Missing closing tags".to_string(),
            "Invalid HTML structure".to_string(),
        ];
        e
    }

    /// Layout/paint or PDF production failed.
    pub fn rendering_failed(reason: &str) -> Self {
        let message = if reason.is_empty() {
            "Rendering failed".to_string()
        } else {
            format!("Rendering failed: {}", reason)
        };
        let mut e = Self::new(ErrorCode::RenderingFailed, message);
        e.suggestion = Some(
            "Check your HTML/CSS for errors and ensure the backend supports your CSS features"
                .to_string(),
        );
        e.possible_causes = vec![
            "Unsupported CSS features for current backend".to_string(),
            "JavaScript errors in the page".to_string(),
            "Resource loading failures".to_string(),
            "Memory limit exceeded".to_string(),
        ];
        e
    }

    /// A remote resource could not be fetched.
    pub fn network_error(url: &str, details: &str) -> Self {
        let message = if details.is_empty() {
            "Network error".to_string()
        } else {
            format!("Network error: {}", details)
        };
        let mut e = Self::new(ErrorCode::NetworkError, message);
        e.file = Some(url.to_string());
        e.suggestion =
            Some("Check your internet connection and ensure the URL is accessible".to_string());
        e.possible_causes = vec![
            "No internet connection".to_string(),
            "URL is not accessible".to_string(),
            "DNS resolution failed".to_string(),
            "Firewall blocking connection".to_string(),
        ];
        e
    }

    /// Host-level failure (disk, memory, process spawn).
    pub fn system_error(details: &str) -> Self {
        let message = if details.is_empty() {
            "System error".to_string()
        } else {
            format!("System error: {}", details)
        };
        let mut e = Self::new(ErrorCode::SystemError, message);
        e.suggestion = Some("Check free disk space and system resources".to_string());
        e.possible_causes = vec![
            "Out of disk space".to_string(),
            "Out of memory".to_string(),
            "Operating system denied the operation".to_string(),
        ];
        e
    }

    /// A caller-supplied option has an invalid value.
    pub fn invalid_option(option: &str, details: &str) -> Self {
        let message = if details.is_empty() {
            format!("Invalid option '{}'", option)
        } else {
            format!("Invalid option '{}': {}", option, details)
        };
        let mut e = Self::new(ErrorCode::InvalidOption, message);
        e.suggestion = Some("Run with --help to see accepted values".to_string());
        e.possible_causes = vec![
            "Typo in the option value".to_string(),
            "Value out of the accepted range".to_string(),
        ];
        e
    }

    /// Attach a source location after construction.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Append an engine-supplied detail to the message.
    pub fn with_detail(mut self, detail: &str) -> Self {
        if !detail.is_empty() {
            self.message = format!("{}: {}", self.message, detail);
        }
        self
    }

    /// Multi-line human-readable rendering without decoration.
    pub fn format_plain(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "Error: {}", self.message);
        if let Some(file) = &self.file {
            let _ = write!(out, "\n  File: {}", file);
            if let Some(line) = self.line {
                let _ = write!(out, " (line {}", line);
                if let Some(column) = self.column {
                    let _ = write!(out, ", column {}", column);
                }
                out.push(')');
            }
        }
        if let Some(suggestion) = &self.suggestion {
            let _ = write!(out, "\n  Suggestion: {}", suggestion);
        }
        if !self.possible_causes.is_empty() {
            out.push_str("\n  Possible causes:");
            for cause in &self.possible_causes {
                let _ = write!(out, "\n    • {}", cause);
            }
        }
        out
    }

    /// Decorated CLI rendering with header glyphs and a trailing help pointer.
    fn format_decorated(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "❌ Error: {} ({})",
            self.message,
            self.code.code_string()
        );
        if let Some(file) = &self.file {
            let _ = write!(out, "\n   File: {}", file);
            if let Some(line) = self.line {
                let _ = write!(out, " (line {}", line);
                if let Some(column) = self.column {
                    let _ = write!(out, ", column {}", column);
                }
                out.push(')');
            }
        }
        if let Some(suggestion) = &self.suggestion {
            let _ = write!(out, "\n\n   💡 Suggestion: {}", suggestion);
        }
        if !self.possible_causes.is_empty() {
            out.push_str("\n\n   Possible causes:");
            for cause in &self.possible_causes {
                let _ = write!(out, "\n   • {}", cause);
            }
        }
        out.push_str("\n\n   For help, run: pagepress --help");
        out
    }

    /// Choose between the plain and decorated renderings.
    pub fn format_for_display(&self, colored: bool) -> String {
        if colored {
            self.format_decorated()
        } else {
            self.format_plain()
        }
    }
}

/// CLI-actionable follow-up commands for an error code.
pub fn suggestions_for(code: ErrorCode) -> Vec<&'static str> {
    match code {
        ErrorCode::FileNotFound => vec![
            "Check if the file exists: ls <filename>",
            "Use absolute path: /full/path/to/file.html",
            "Check current directory: pwd",
        ],
        ErrorCode::BackendNotAvailable => vec![
            "Install Chromium for the cdp backend",
            "Check available backends: pagepress backends",
            "Rebuild with backend support: cargo build --features cdp",
        ],
        ErrorCode::RenderingFailed => vec![
            "Validate the input first: pagepress validate input.html",
            "Try a different backend: --backend cdp",
            "Check the page for script errors",
        ],
        ErrorCode::NetworkError => vec![
            "Check internet connection: ping 8.8.8.8",
            "Test the URL in a browser first",
            "Use a local file instead: file:///path/to/file.html",
            "Check proxy settings",
        ],
        _ => vec![
            "Check documentation: pagepress --help",
            "Enable verbose output: RUST_LOG=debug",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_string_is_zero_padded() {
        assert_eq!(ErrorCode::FileNotFound.code_string(), "ERR_001");
        assert_eq!(ErrorCode::PermissionDenied.code_string(), "ERR_004");
        assert_eq!(ErrorCode::BackendNotAvailable.code_string(), "ERR_021");
        assert_eq!(ErrorCode::Unknown.code_string(), "ERR_099");
    }

    #[test]
    fn code_string_is_stable_across_calls() {
        let a = ErrorCode::RenderingFailed.code_string();
        let b = ErrorCode::RenderingFailed.code_string();
        assert_eq!(a, b);
    }

    #[test]
    fn factories_populate_causes_and_suggestion() {
        let e = ConversionError::file_not_found("missing.html");
        assert_eq!(e.code, ErrorCode::FileNotFound);
        assert_eq!(e.file.as_deref(), Some("missing.html"));
        assert!(e.suggestion.is_some());
        assert!(!e.possible_causes.is_empty());

        let e = ConversionError::network_error("http://example.com", "connection refused");
        assert_eq!(e.code, ErrorCode::NetworkError);
        assert!(e.message.contains("connection refused"));
        assert!(!e.possible_causes.is_empty());
    }

    #[test]
    fn plain_format_includes_location() {
        let mut e = ConversionError::invalid_html("unexpected token").at(3, 14);
        e.file = Some("input.html".to_string());
        let text = e.format_plain();
        assert!(text.starts_with("Error: Invalid HTML"));
        assert!(text.contains("input.html"));
        assert!(text.contains("line 3, column 14"));
        assert!(text.contains("Possible causes:"));
    }

    #[test]
    fn decorated_format_carries_code_and_help_pointer() {
        let e = ConversionError::rendering_failed("blank output");
        let text = e.format_for_display(true);
        assert!(text.contains("ERR_023"));
        assert!(text.ends_with("For help, run: pagepress --help"));
        assert_eq!(e.format_for_display(false), e.format_plain());
    }
}
