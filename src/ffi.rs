//! FFI bindings for Synheart Mood
//!
//! This module provides C-compatible functions for calling Mood from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `mood_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalysisConfig;
use crate::pipeline::{analyze_json, MoodAnalyzer};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Read the two required document arguments, recording an error on failure
unsafe fn read_documents(
    users_json: *const c_char,
    records_json: *const c_char,
) -> Option<(String, String)> {
    let Some(users) = cstr_to_string(users_json) else {
        set_last_error("Invalid users JSON string pointer");
        return None;
    };
    let Some(records) = cstr_to_string(records_json) else {
        set_last_error("Invalid records JSON string pointer");
        return None;
    };
    Some((users, records))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze roster and record JSON arrays with the default configuration.
///
/// # Safety
/// - `users_json` and `records_json` must be valid null-terminated C strings.
/// - Returns a newly allocated report JSON string that must be freed with `mood_free_string`.
/// - Returns NULL on error; call `mood_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mood_analyze(
    users_json: *const c_char,
    records_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some((users, records)) = read_documents(users_json, records_json) else {
        return ptr::null_mut();
    };

    match analyze_json(&users, &records, &AnalysisConfig::default()) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Analyze roster and record JSON arrays with a JSON configuration.
///
/// # Safety
/// - `users_json`, `records_json` and `config_json` must be valid null-terminated C strings.
/// - Returns a newly allocated report JSON string that must be freed with `mood_free_string`.
/// - Returns NULL on error; call `mood_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mood_analyze_with_config(
    users_json: *const c_char,
    records_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some((users, records)) = read_documents(users_json, records_json) else {
        return ptr::null_mut();
    };

    let config_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config JSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = match AnalysisConfig::from_json(&config_str) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match analyze_json(&users, &records, &config) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Analyzer Handle API
// ============================================================================

/// Opaque handle to a MoodAnalyzer
pub struct MoodAnalyzerHandle {
    analyzer: MoodAnalyzer,
}

/// Create a new MoodAnalyzer.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer to a newly allocated MoodAnalyzer.
/// - Must be freed with `mood_analyzer_free`.
/// - Returns NULL on error; call `mood_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mood_analyzer_new(config_json: *const c_char) -> *mut MoodAnalyzerHandle {
    clear_last_error();

    let mut analyzer = MoodAnalyzer::new();
    if !config_json.is_null() {
        let Some(config_str) = cstr_to_string(config_json) else {
            set_last_error("Invalid config JSON string pointer");
            return ptr::null_mut();
        };
        if let Err(e) = analyzer.load_config(&config_str) {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    }

    Box::into_raw(Box::new(MoodAnalyzerHandle { analyzer }))
}

/// Free a MoodAnalyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `mood_analyzer_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mood_analyzer_free(analyzer: *mut MoodAnalyzerHandle) {
    if !analyzer.is_null() {
        drop(Box::from_raw(analyzer));
    }
}

/// Run an analysis with a MoodAnalyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `mood_analyzer_new`.
/// - `users_json` and `records_json` must be valid null-terminated C strings.
/// - Returns a newly allocated report JSON string that must be freed with `mood_free_string`.
/// - Returns NULL on error; call `mood_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mood_analyzer_run(
    analyzer: *const MoodAnalyzerHandle,
    users_json: *const c_char,
    records_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }

    let handle = &*analyzer;

    let Some((users, records)) = read_documents(users_json, records_json) else {
        return ptr::null_mut();
    };

    match handle.analyzer.run_json(&users, &records) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Mood functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Mood function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mood_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Mood function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn mood_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Mood library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn mood_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
