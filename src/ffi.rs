//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Buffers and strings returned by `rf_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `rf_free_buffer` / `rf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`: `0` success, `1` null pointer,
//!   `2` malformed or unpaginatable input, `3` export failure.
//! - Error details can be retrieved via `rf_last_error`.
//!
//! ## Thread safety
//! - `rf_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::capture::{CapturedImage, RasterCapturer};
use crate::color::{resolve_color, CssColorProbe, HexColor};
use crate::editor::ResumeEditor;
use crate::error::Error;
use crate::fonts::FontManager;
use crate::page_layout::Slicing;
use crate::pagination::{plan_pages, Orientation};
use crate::pipeline::{ExportConfig, Exporter};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Record `err` and return its code: `2` when the input itself cannot be
/// exported, `3` for every other failure.
fn export_failure(err: &Error) -> c_int {
    set_last_error(&err.to_string());
    match err {
        Error::TooManyPages { .. } | Error::InvalidPage { .. } => 2,
        _ => 3,
    }
}

// ---------------------------------------------------------------------------
// C-compatible configuration types
// ---------------------------------------------------------------------------

/// Page orientation for use in [`RfExportConfig`].
#[repr(C)]
#[derive(Clone, Copy)]
pub enum RfOrientation {
    /// Portrait mode (default).
    Portrait = 0,
    Landscape = 1,
}

/// Page slicing mode for use in [`RfExportConfig`].
#[repr(C)]
#[derive(Clone, Copy)]
pub enum RfSlicing {
    /// One embedded image redrawn on every page (default).
    Slide = 0,
    /// One cropped image per page.
    Crop = 1,
}

/// Optional export configuration. Pass `NULL` for defaults (A4 portrait,
/// slide, scale 2.0). A `scale` of `0.0` also selects the default.
#[repr(C)]
pub struct RfExportConfig {
    pub orientation: RfOrientation,
    pub slicing: RfSlicing,
    pub scale: f32,
}

/// # Safety
/// `cfg`, if non-null, must point to a valid [`RfExportConfig`].
unsafe fn export_config_from_c(cfg: *const RfExportConfig) -> ExportConfig {
    let mut config = ExportConfig::default();
    if let Some(cfg) = cfg.as_ref() {
        config.orientation = match cfg.orientation {
            RfOrientation::Portrait => Orientation::Portrait,
            RfOrientation::Landscape => Orientation::Landscape,
        };
        config.slicing = match cfg.slicing {
            RfSlicing::Slide => Slicing::Slide,
            RfSlicing::Crop => Slicing::Crop,
        };
        if cfg.scale > 0.0 {
            config.scale = cfg.scale;
        }
    }
    config
}

/// # Safety
/// `s` must be null or a valid null-terminated string.
unsafe fn optional_str<'a>(s: *const c_char) -> Result<Option<&'a str>, String> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s)
        .to_str()
        .map(Some)
        .map_err(|e| format!("Invalid UTF-8: {e}"))
}

/// # Safety
/// `out_buf` and `out_len` must be valid pointers.
unsafe fn write_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Resolve a CSS color value to a lowercase `#rrggbb` string.
///
/// `fallback` may be `NULL` (or not a hex color), in which case the default
/// accent `#0ea5a4` is used. Never fails for valid pointers; returns `NULL`
/// only when `input` is not valid UTF-8.
///
/// # Safety
/// `input` and `fallback` must be null or valid null-terminated strings. The
/// result must be freed with `rf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn rf_resolve_color(input: *const c_char, fallback: *const c_char) -> *mut c_char {
    let input = match optional_str(input) {
        Ok(s) => s.unwrap_or(""),
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };
    let fallback = optional_str(fallback)
        .ok()
        .flatten()
        .and_then(HexColor::parse)
        .unwrap_or_default();

    let resolved = resolve_color(input, &fallback, Some(&mut CssColorProbe));
    match CString::new(resolved.as_str()) {
        Ok(cs) => cs.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Export a resume described as JSON to PDF.
///
/// # Parameters
/// - `json_ptr`, `json_len`: UTF-8 resume JSON (not necessarily null-terminated)
/// - `cfg`: optional pointer to an [`RfExportConfig`]; pass `NULL` for defaults
/// - `out_buf`, `out_len`: PDF output (free with `rf_free_buffer`)
/// - `out_name`: optional; receives the suggested file name (free with `rf_free_string`)
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `rf_last_error`.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `out_buf` and `out_len` must be valid pointers; `out_name` may be null.
#[no_mangle]
pub unsafe extern "C" fn rf_export_resume_json(
    json_ptr: *const u8,
    json_len: u32,
    cfg: *const RfExportConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_name: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let json_bytes = slice::from_raw_parts(json_ptr, json_len as usize);
    let editor = match std::str::from_utf8(json_bytes)
        .map_err(|e| format!("Invalid UTF-8: {e}"))
        .and_then(|json| ResumeEditor::from_json(json).map_err(|e| e.to_string()))
    {
        Ok(editor) => editor,
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };

    let exporter = match Exporter::new(export_config_from_c(cfg)) {
        Ok(exporter) => exporter,
        Err(e) => {
            set_last_error(&e.to_string());
            return 3;
        }
    };

    match editor.export(&exporter) {
        Ok(Some(pdf)) => {
            if !out_name.is_null() {
                *out_name = CString::new(pdf.file_name.as_str())
                    .map(CString::into_raw)
                    .unwrap_or(ptr::null_mut());
            }
            write_buffer(pdf.bytes, out_buf, out_len);
            0
        }
        Ok(None) => {
            set_last_error("Preview root element not found");
            3
        }
        Err(e) => export_failure(&e),
    }
}

/// Paginate an already captured RGBA raster (`width * height * 4` bytes,
/// straight alpha) into a PDF.
///
/// # Safety
/// - `rgba_ptr` must point to `width * height * 4` valid bytes.
/// - `name` must be null or a valid null-terminated string.
/// - `out_buf` and `out_len` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn rf_export_rgba(
    rgba_ptr: *const u8,
    width: u32,
    height: u32,
    cfg: *const RfExportConfig,
    name: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if rgba_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let name = match optional_str(name) {
        Ok(name) => name.unwrap_or(""),
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };

    let len = width as usize * height as usize * 4;
    let config = export_config_from_c(cfg);
    let rgba = slice::from_raw_parts(rgba_ptr, len).to_vec();
    let Some(capture) = CapturedImage::from_rgba(width, height, rgba, config.scale) else {
        set_last_error("RGBA buffer does not match the given dimensions");
        return 2;
    };

    let exporter = Exporter::with_capturer(RasterCapturer::with_fonts(FontManager::new()), config);
    match exporter.export_capture(&capture, name) {
        Ok(pdf) => {
            write_buffer(pdf.bytes, out_buf, out_len);
            0
        }
        Err(e) => export_failure(&e),
    }
}

/// Compute only the page plan for a `width` x `height` px capture. Returns JSON.
///
/// # Safety
/// `out_json_ptr` must be a valid pointer; free the result with `rf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn rf_plan_pages(
    width: u32,
    height: u32,
    cfg: *const RfExportConfig,
    out_json_ptr: *mut *mut c_char,
) -> c_int {
    if out_json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let config = export_config_from_c(cfg);
    let json = plan_pages(width, height, config.geometry(), config.slicing, "Resume")
        .map_err(|e| e.to_string())
        .and_then(|plan| plan.to_json().map_err(|e| e.to_string()));

    match json.map(CString::new) {
        Ok(Ok(cs)) => {
            *out_json_ptr = cs.into_raw();
            0
        }
        Ok(Err(_)) => {
            set_last_error("JSON contained null byte");
            3
        }
        Err(e) => {
            set_last_error(&e);
            2
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `rf_export_*`.
///
/// # Safety
/// `buf` must have been returned by a previous `rf_export_*` call, and `len`
/// must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn rf_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a string returned by an `rf_*` function.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn rf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next failing `rf_*` call on the
/// same thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn rf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn rf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn take_string(p: *mut c_char) -> String {
        assert!(!p.is_null());
        let s = unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
        unsafe { rf_free_string(p) };
        s
    }

    #[test]
    fn ffi_resolve_color() {
        let input = CString::new("rgba(255, 0, 0, 0.5)").unwrap();
        let out = unsafe { rf_resolve_color(input.as_ptr(), ptr::null()) };
        assert_eq!(take_string(out), "#ff0000");

        let garbage = CString::new("nope").unwrap();
        let fallback = CString::new("#123").unwrap();
        let out = unsafe { rf_resolve_color(garbage.as_ptr(), fallback.as_ptr()) };
        assert_eq!(take_string(out), "#112233");

        let out = unsafe { rf_resolve_color(ptr::null(), ptr::null()) };
        assert_eq!(take_string(out), "#0ea5a4");
    }

    #[test]
    fn ffi_export_rgba() {
        let rgba = vec![255u8; 8 * 20 * 4];
        let name = CString::new("Ivan Petrov").unwrap();
        let cfg = RfExportConfig {
            orientation: RfOrientation::Portrait,
            slicing: RfSlicing::Crop,
            scale: 0.0,
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { rf_export_rgba(rgba.as_ptr(), 8, 20, &cfg, name.as_ptr(), &mut out_buf, &mut out_len) };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { rf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_export_rgba_rejects_empty() {
        let rgba = [0u8; 4];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { rf_export_rgba(rgba.as_ptr(), 0, 1, ptr::null(), ptr::null(), &mut out_buf, &mut out_len) };
        assert_eq!(rc, 3);
        let msg = unsafe { CStr::from_ptr(rf_last_error()) }.to_str().unwrap();
        assert!(msg.contains("empty"), "{msg}");
    }

    #[test]
    fn ffi_plan_pages() {
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe { rf_plan_pages(210, 595, ptr::null(), &mut json_ptr) };
        assert_eq!(rc, 0);
        let json = take_string(json_ptr);
        let plan = crate::page_layout::PaginatedDocument::from_json(&json).unwrap();
        assert_eq!(plan.page_count(), 3);
    }

    #[test]
    fn ffi_rejects_unpaginatable_sizes() {
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe { rf_plan_pages(1, u32::MAX, ptr::null(), &mut json_ptr) };
        assert_eq!(rc, 2);
        assert!(json_ptr.is_null());

        // 1 px wide, 100 000 px tall: 21 km of paper.
        let rgba = vec![255u8; 100_000 * 4];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe {
            rf_export_rgba(rgba.as_ptr(), 1, 100_000, ptr::null(), ptr::null(), &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, 2);
        assert!(out_buf.is_null());
        let msg = unsafe { CStr::from_ptr(rf_last_error()) }.to_str().unwrap();
        assert!(msg.contains("pages"), "{msg}");
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe {
            rf_export_resume_json(ptr::null(), 0, ptr::null(), &mut out_buf, &mut out_len, ptr::null_mut())
        };
        assert_eq!(rc, 1, "Should fail on null input");
    }

    #[test]
    fn ffi_bad_json() {
        let json = b"{not json";
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe {
            rf_export_resume_json(
                json.as_ptr(),
                json.len() as u32,
                ptr::null(),
                &mut out_buf,
                &mut out_len,
                ptr::null_mut(),
            )
        };
        assert_eq!(rc, 2);
    }

    #[test]
    fn ffi_version() {
        let version = unsafe { CStr::from_ptr(rf_version()) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
