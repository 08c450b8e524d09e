//! C ABI over [`Model`].
//!
//! Handles are opaque heap pointers created by `ob_model_load*` and released
//! with [`ob_model_free`]. Failures are reported through sentinel return values
//! (null handle, NaN score, `-1` status, `0` feature count); the message of the
//! last failure on the calling thread is available from
//! [`ob_model_last_error`] until the next failure or an explicit
//! [`ob_model_last_error_clear`].

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::model::{Model, ModelError};

/// Opaque model handle.
pub struct ObModel {
    model: Model,
}

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

fn set_last_error(message: impl std::fmt::Display) {
    let message = CString::new(message.to_string().replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Run `f`, turning errors and panics into `fallback` plus a last-error message.
fn guard<T>(fallback: T, f: impl FnOnce() -> Result<T, ModelError>) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            set_last_error(&error);
            fallback
        }
        Err(_) => {
            set_last_error("unknown error");
            fallback
        }
    }
}

fn null_argument(name: &str) -> ModelError {
    ModelError::InvalidModel(format!("{name} is null"))
}

fn into_handle(model: Model) -> *mut ObModel {
    Box::into_raw(Box::new(ObModel { model }))
}

/// Load a model description from a file path.
///
/// Returns null on failure.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ob_model_load(path: *const c_char) -> *mut ObModel {
    guard(std::ptr::null_mut(), || {
        if path.is_null() {
            return Err(null_argument("path"));
        }
        let path = unsafe { CStr::from_ptr(path) }.to_string_lossy().into_owned();
        let mut model = Model::new();
        model.load_path(path)?;
        Ok(into_handle(model))
    })
}

/// Load a model description from a memory buffer.
///
/// Returns null on failure.
///
/// # Safety
///
/// `data` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn ob_model_load_from_buffer(data: *const u8, len: usize) -> *mut ObModel {
    guard(std::ptr::null_mut(), || {
        if data.is_null() {
            return Err(null_argument("data"));
        }
        let bytes = unsafe { std::slice::from_raw_parts(data, len) };
        let mut model = Model::new();
        model.load_slice(bytes)?;
        Ok(into_handle(model))
    })
}

/// Release a handle. Null is ignored.
///
/// # Safety
///
/// `model` must be null or a handle returned by `ob_model_load*` that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn ob_model_free(model: *mut ObModel) {
    if !model.is_null() {
        drop(unsafe { Box::from_raw(model) });
    }
}

/// Score one example of `count` features.
///
/// Returns NaN on failure.
///
/// # Safety
///
/// `model` must be null or a live handle; `features` must point to `count`
/// readable floats.
#[no_mangle]
pub unsafe extern "C" fn ob_model_apply(
    model: *const ObModel,
    features: *const f32,
    count: usize,
) -> f64 {
    guard(f64::NAN, || {
        let model = unsafe { model.as_ref() }.ok_or_else(|| null_argument("model"))?;
        if features.is_null() {
            return Err(null_argument("features"));
        }
        let features = unsafe { std::slice::from_raw_parts(features, count) };
        model.model.apply(features)
    })
}

/// Score `size` examples of `count` features each into `out`.
///
/// Returns 0 on success and -1 on failure.
///
/// # Safety
///
/// `model` must be null or a live handle; `features` must point to `size`
/// pointers, each to `count` readable floats; `out` must point to `size`
/// writable doubles.
#[no_mangle]
pub unsafe extern "C" fn ob_model_apply_many(
    model: *const ObModel,
    features: *const *const f32,
    size: usize,
    count: usize,
    out: *mut f64,
) -> c_int {
    guard(-1, || {
        let model = unsafe { model.as_ref() }.ok_or_else(|| null_argument("model"))?;
        if size == 0 {
            // Still reports NotLoaded on an empty handle
            model.model.apply_many(&[])?;
            return Ok(0);
        }
        if features.is_null() {
            return Err(null_argument("features"));
        }
        if out.is_null() {
            return Err(null_argument("out"));
        }
        let pointers = unsafe { std::slice::from_raw_parts(features, size) };
        let mut rows = Vec::with_capacity(size);
        for &row in pointers {
            if row.is_null() {
                return Err(null_argument("feature row"));
            }
            rows.push(unsafe { std::slice::from_raw_parts(row, count) });
        }
        let out = unsafe { std::slice::from_raw_parts_mut(out, size) };
        model.model.apply_batch_into(&rows, out)?;
        Ok(0)
    })
}

/// Declared feature count, or 0 for a null or empty handle.
///
/// # Safety
///
/// `model` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn ob_model_feature_count(model: *const ObModel) -> usize {
    unsafe { model.as_ref() }.map_or(0, |handle| handle.model.feature_count())
}

/// Message of the last failure on this thread, or an empty string.
///
/// The pointer stays valid until the next failing call or
/// [`ob_model_last_error_clear`] on the same thread.
#[no_mangle]
pub extern "C" fn ob_model_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ptr())
}

/// Reset the last-error message of this thread.
#[no_mangle]
pub extern "C" fn ob_model_last_error_clear() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = CString::default());
}
