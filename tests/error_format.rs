//! Error code and formatting contract.

use pagepress::error::suggestions_for;
use pagepress::{ConversionError, ErrorCode};

#[test]
fn codes_keep_their_band_assignments() {
    assert_eq!(ErrorCode::FileNotFound as u8, 1);
    assert_eq!(ErrorCode::InvalidHtml as u8, 11);
    assert_eq!(ErrorCode::BackendNotAvailable as u8, 21);
    assert_eq!(ErrorCode::NetworkError as u8, 32);
    assert_eq!(ErrorCode::SystemError as u8, 43);
    assert_eq!(ErrorCode::InvalidOption as u8, 51);
    assert_eq!(ErrorCode::Unknown as u8, 99);
}

#[test]
fn permission_denied_renders_err_004() {
    let err = ConversionError::permission_denied("/etc/out.pdf");
    assert_eq!(err.code.code_string(), "ERR_004");
    let decorated = err.format_for_display(true);
    assert!(decorated.contains("ERR_004"));
    assert!(decorated.contains("/etc/out.pdf"));
    assert!(decorated.contains("For help, run: pagepress --help"));
}

#[test]
fn backend_unavailable_names_the_backend() {
    let err = ConversionError::backend_unavailable("cdp");
    assert!(err.message.contains("'cdp'"));
    assert!(err
        .possible_causes
        .iter()
        .any(|cause| cause.contains("Chromium")));
}

#[test]
fn every_code_has_fallback_suggestions() {
    for code in [
        ErrorCode::FileNotFound,
        ErrorCode::BackendNotAvailable,
        ErrorCode::RenderingFailed,
        ErrorCode::NetworkError,
        ErrorCode::Unknown,
    ] {
        assert!(!suggestions_for(code).is_empty());
    }
}

#[test]
fn errors_propagate_through_the_question_mark_operator() {
    fn inner() -> pagepress::Result<()> {
        Err(ConversionError::file_not_found("a.html"))
    }
    fn outer() -> pagepress::Result<()> {
        inner()?;
        Ok(())
    }
    let err = outer().unwrap_err();
    assert_eq!(err.code, ErrorCode::FileNotFound);
}
