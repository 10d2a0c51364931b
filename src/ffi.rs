//! Low-level FFI bindings to the LightGBM C API
//!
//! Only the symbols consumed by the resource manager are bound here.
//! All function signatures match the C API exactly.

use crate::error::{LgbmError, Result};
use libloading::Library;
use std::os::raw::{c_char, c_int};

/// Opaque pointer to an engine-owned booster (BoosterHandle in the C API)
#[repr(C)]
pub struct Booster {
    _private: [u8; 0],
}

/// Opaque pointer to engine-owned fast-predict settings (FastConfigHandle in the C API)
#[repr(C)]
pub struct FastConfig {
    _private: [u8; 0],
}

/// Status code every fallible C call returns on failure.
pub const API_FAILURE: c_int = -1;

/// C_API_PREDICT_NORMAL
pub const C_API_PREDICT_NORMAL: c_int = 0;
/// C_API_PREDICT_RAW_SCORE
pub const C_API_PREDICT_RAW_SCORE: c_int = 1;
/// C_API_PREDICT_LEAF_INDEX
pub const C_API_PREDICT_LEAF_INDEX: c_int = 2;
/// C_API_PREDICT_CONTRIB
pub const C_API_PREDICT_CONTRIB: c_int = 3;

/// C_API_DTYPE_FLOAT32
pub const C_API_DTYPE_FLOAT32: c_int = 0;
/// C_API_DTYPE_FLOAT64
pub const C_API_DTYPE_FLOAT64: c_int = 1;

/// Output classes of a binary booster; the score buffer is sized to this.
pub const BINARY_NUM_CLASSES: usize = 2;

/// FFI function signatures for the LightGBM C API.
/// These are loaded dynamically from lib_lightgbm.so / lib_lightgbm.dll.
pub struct LightGbmFunctions {
    pub lgbm_booster_create_from_modelfile: unsafe extern "C" fn(
        filename: *const c_char,
        out_num_iterations: *mut c_int,
        out: *mut *mut Booster,
    ) -> c_int,

    pub lgbm_get_last_error: unsafe extern "C" fn() -> *const c_char,

    pub lgbm_booster_get_num_feature: unsafe extern "C" fn(
        handle: *mut Booster,
        out_len: *mut c_int,
    ) -> c_int,

    pub lgbm_booster_predict_for_mat_single_row_fast_init: unsafe extern "C" fn(
        handle: *mut Booster,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        data_type: c_int,
        ncol: i32,
        parameter: *const c_char,
        out_fast_config: *mut *mut FastConfig,
    ) -> c_int,

    pub lgbm_fast_config_free: unsafe extern "C" fn(handle: *mut FastConfig) -> c_int,

    pub lgbm_booster_free: unsafe extern "C" fn(handle: *mut Booster) -> c_int,
}

impl LightGbmFunctions {
    /// Load all required function symbols from the library
    pub fn load(library: &Library) -> Result<Self> {
        // SAFETY: Symbol names are null-terminated byte strings and each
        // signature matches the LightGBM C API. Missing symbols are
        // propagated as errors instead of being dereferenced.
        unsafe {
            Ok(LightGbmFunctions {
                lgbm_booster_create_from_modelfile: *library
                    .get(b"LGBM_BoosterCreateFromModelfile\0")
                    .map_err(|e| {
                        LgbmError::Ffi(format!("Missing LGBM_BoosterCreateFromModelfile: {}", e))
                    })?,

                lgbm_get_last_error: *library
                    .get(b"LGBM_GetLastError\0")
                    .map_err(|e| LgbmError::Ffi(format!("Missing LGBM_GetLastError: {}", e)))?,

                lgbm_booster_get_num_feature: *library
                    .get(b"LGBM_BoosterGetNumFeature\0")
                    .map_err(|e| {
                        LgbmError::Ffi(format!("Missing LGBM_BoosterGetNumFeature: {}", e))
                    })?,

                lgbm_booster_predict_for_mat_single_row_fast_init: *library
                    .get(b"LGBM_BoosterPredictForMatSingleRowFastInit\0")
                    .map_err(|e| {
                        LgbmError::Ffi(format!(
                            "Missing LGBM_BoosterPredictForMatSingleRowFastInit: {}",
                            e
                        ))
                    })?,

                lgbm_fast_config_free: *library
                    .get(b"LGBM_FastConfigFree\0")
                    .map_err(|e| LgbmError::Ffi(format!("Missing LGBM_FastConfigFree: {}", e)))?,

                lgbm_booster_free: *library
                    .get(b"LGBM_BoosterFree\0")
                    .map_err(|e| LgbmError::Ffi(format!("Missing LGBM_BoosterFree: {}", e)))?,
            })
        }
    }
}
