//! FFI bindings for ADX Pulse
//!
//! This module provides C-compatible functions for calling Pulse from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `pulse_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use crate::adapters::CsvAdapter;
use crate::config::PipelineConfig;
use crate::error::ReportError;
use crate::pipeline::ReportProcessor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// A NULL config pointer means the default configuration
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<PipelineConfig, ReportError> {
    if config_json.is_null() {
        return Ok(PipelineConfig::default());
    }
    match cstr_to_string(config_json) {
        Some(json) => PipelineConfig::from_json(&json),
        None => Err(ReportError::Config("config is not valid UTF-8".to_string())),
    }
}

fn finish(result: Result<String, ReportError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Analysis API
// ============================================================================

/// Analyze CSV report text and return the report payload as JSON.
///
/// # Safety
/// - `csv` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_analyze_csv(
    csv: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let csv_str = match cstr_to_string(csv) {
        Some(s) => s,
        None => {
            set_last_error("Invalid CSV string pointer");
            return ptr::null_mut();
        }
    };

    finish((|| {
        let config = config_from_ptr(config_json)?;
        let table = CsvAdapter::parse_str(&csv_str)?;
        let payload = ReportProcessor::with_config(config).process_table(&table, "<memory>")?;
        serde_json::to_string(&payload).map_err(ReportError::Json)
    })())
}

/// Analyze a CSV or XLSX report file and return the report payload as JSON.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_analyze_file(
    path: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return ptr::null_mut();
        }
    };

    finish((|| {
        let config = config_from_ptr(config_json)?;
        let payload = ReportProcessor::with_config(config).process_file(Path::new(&path_str))?;
        serde_json::to_string(&payload).map_err(ReportError::Json)
    })())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pulse functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pulse function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulse_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Pulse function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pulse_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Pulse library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pulse_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn sample_csv() -> CString {
        CString::new(
            "Date,Hour,Ad Exchange revenue (US$),Ad Exchange average eCPM (US$),Ad Exchange ad requests,Ad Exchange impressions,Ad Exchange match rate\n\
             2024-01-15,0,10.0,0.6,1000,400,0.1\n\
             2024-01-15,1,0.005,0.2,200,10,0.5\n\
             Total,,10.005,0.4,1200,410,0.3\n",
        )
        .unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        pulse_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_analyze_csv() {
        let csv = sample_csv();

        unsafe {
            let json = take_string(pulse_analyze_csv(csv.as_ptr(), ptr::null()));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();

            assert_eq!(value["producer"]["name"], "adx-pulse");
            assert_eq!(value["hourly"].as_array().unwrap().len(), 2);
            assert_eq!(value["hourly"][0]["recommendation"], "floor_pricing");
            assert_eq!(value["quality"]["totals_row_removed"], true);
            assert_eq!(value["next_day"][0]["timestamp"], "2024-01-16 00:00:00");
            assert!(pulse_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_analyze_csv_with_config() {
        let csv = sample_csv();
        // eCPM 0.6 no longer clears the floor pricing threshold
        let config = CString::new(r#"{"thresholds": {"floor_min_ecpm": 1.0}}"#).unwrap();

        unsafe {
            let json = take_string(pulse_analyze_csv(csv.as_ptr(), config.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["hourly"][0]["recommendation"], "no_change");
        }
    }

    #[test]
    fn test_ffi_analyze_file() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();
        let path = CString::new(file.path().to_str().unwrap()).unwrap();

        unsafe {
            let json = take_string(pulse_analyze_file(path.as_ptr(), ptr::null()));
            assert!(json.contains("\"report_version\""));
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let path = CString::new("missing-report.csv").unwrap();

        unsafe {
            let result = pulse_analyze_file(path.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = pulse_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("missing-report.csv"));

            let bad_config = CString::new("not json").unwrap();
            let csv = sample_csv();
            assert!(pulse_analyze_csv(csv.as_ptr(), bad_config.as_ptr()).is_null());
            assert!(!pulse_last_error().is_null());

            assert!(pulse_analyze_csv(ptr::null(), ptr::null()).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = pulse_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::PULSE_VERSION);
        }
    }
}
