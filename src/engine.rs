//! The scoring-engine contract and its dynamically loaded implementation
//!
//! `ScoringEngine` expresses the native engine's fixed operation set at a
//! trait seam so the resource manager can be exercised against a recording
//! engine in tests. `NativeEngine` is the production implementation over a
//! `libloading::Library`.

use crate::error::{LgbmError, Result};
use crate::ffi::{Booster, FastConfig, LightGbmFunctions};
use libloading::Library;
use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

/// Opaque handle to a booster loaded into native engine memory.
///
/// The handle is engine-owned memory; whoever holds it is responsible for
/// releasing it through [`ScoringEngine::free_model`] exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoosterHandle(pub(crate) *mut Booster);

impl BoosterHandle {
    pub(crate) const fn null() -> Self {
        Self(ptr::null_mut())
    }

    /// Raw pointer for use in scoring calls.
    pub fn as_ptr(&self) -> *mut Booster {
        self.0
    }
}

/// Opaque handle to precomputed fast-predict settings, derived from a booster.
///
/// Must never outlive the booster it was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastConfigHandle(pub(crate) *mut FastConfig);

impl FastConfigHandle {
    pub(crate) const fn null() -> Self {
        Self(ptr::null_mut())
    }

    /// Raw pointer for use in scoring calls.
    pub fn as_ptr(&self) -> *mut FastConfig {
        self.0
    }
}

/// Engine-vended slot that receives a single `int` output.
///
/// Last write wins: the value is meaningful only immediately after the call
/// that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntReceiver(pub(crate) *mut c_int);

impl IntReceiver {
    pub fn as_mut_ptr(&self) -> *mut c_int {
        self.0
    }
}

/// Engine-vended slot that receives a single `int64` output (the output
/// length of a prediction call).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int64Receiver(pub(crate) *mut i64);

impl Int64Receiver {
    pub fn as_mut_ptr(&self) -> *mut i64 {
        self.0
    }
}

/// Preallocated native `f64` array, reused across scoring calls.
#[derive(Debug, Clone, Copy)]
pub struct F64Buffer {
    pub(crate) ptr: *mut f64,
    pub(crate) len: usize,
}

impl F64Buffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_mut_ptr(&self) -> *mut f64 {
        self.ptr
    }
}

/// The native engine's fixed operation set.
///
/// Fallible operations return the raw engine status code; [`API_FAILURE`]
/// signals failure, anything else is success. Interpreting the sentinel (and
/// unwinding on it) is deliberately left to the caller: the resource manager
/// is the one place where partial failure is reasoned about.
///
/// [`API_FAILURE`]: crate::ffi::API_FAILURE
pub trait ScoringEngine {
    /// Creates a booster from the model file at `path`, writing the model's
    /// iteration count through `out_iterations` in the same call.
    fn create_model_from_file(
        &self,
        path: &Path,
        out_iterations: IntReceiver,
        out_handle: &mut BoosterHandle,
    ) -> c_int;

    /// The engine's last-error text. Never fails, but the text is overwritten
    /// by later engine calls; capture it immediately after a failure.
    fn last_error_message(&self) -> String;

    /// Queries the booster's feature count into `out_features`.
    fn num_features(&self, booster: BoosterHandle, out_features: IntReceiver) -> c_int;

    /// Builds engine-side fast-predict settings for repeated single-row
    /// scoring against `booster`.
    #[allow(clippy::too_many_arguments)]
    fn init_fast_predict_config(
        &self,
        booster: BoosterHandle,
        predict_mode: c_int,
        start_iteration: c_int,
        num_iterations: c_int,
        data_type: c_int,
        num_features: c_int,
        parameters: &str,
        out_handle: &mut FastConfigHandle,
    ) -> c_int;

    fn free_fast_predict_config(&self, handle: FastConfigHandle) -> c_int;

    fn free_model(&self, handle: BoosterHandle) -> c_int;

    fn new_int_receiver(&self) -> IntReceiver;

    fn free_int_receiver(&self, receiver: IntReceiver);

    /// Reads the value last written through `receiver`.
    fn int_value(&self, receiver: IntReceiver) -> c_int;

    fn new_int64_receiver(&self) -> Int64Receiver;

    fn free_int64_receiver(&self, receiver: Int64Receiver);

    fn new_f64_buffer(&self, len: usize) -> F64Buffer;

    fn free_f64_buffer(&self, buffer: F64Buffer);
}

/// The production engine: LightGBM loaded as a shared library.
///
/// Cloning is cheap and shares the loaded library, so independent resource
/// managers (one per worker thread) can score against one library load.
#[derive(Clone)]
pub struct NativeEngine {
    _library: Arc<Library>, // Keep library alive for the lifetime of the function table
    functions: Arc<LightGbmFunctions>,
}

impl NativeEngine {
    /// Load the LightGBM shared library and resolve its symbols
    ///
    /// # Arguments
    /// * `library_path` - Path to lib_lightgbm.so / lib_lightgbm.dll / lib_lightgbm.dylib
    pub fn load<P: AsRef<Path>>(library_path: P) -> Result<Self> {
        // SAFETY: Library::new loads a shared library from the filesystem.
        // The library is only accessed through the typed function table and
        // every symbol is verified to exist before use.
        let library = unsafe {
            Library::new(library_path.as_ref()).map_err(|e| {
                LgbmError::LibraryLoad(format!(
                    "Failed to load {}: {}",
                    library_path.as_ref().display(),
                    e
                ))
            })?
        };

        let functions = LightGbmFunctions::load(&library)?;
        tracing::info!(path = %library_path.as_ref().display(), "Loaded LightGBM native library");

        Ok(Self {
            _library: Arc::new(library),
            functions: Arc::new(functions),
        })
    }
}

impl ScoringEngine for NativeEngine {
    fn create_model_from_file(
        &self,
        path: &Path,
        out_iterations: IntReceiver,
        out_handle: &mut BoosterHandle,
    ) -> c_int {
        let path_cstr = match CString::new(path.to_string_lossy().as_bytes()) {
            Ok(s) => s,
            Err(_) => return crate::ffi::API_FAILURE,
        };

        // SAFETY: path_cstr is a valid C string, out_iterations points at an
        // engine-vended int slot owned by the caller, and the handle slot is
        // a valid out location.
        unsafe {
            (self.functions.lgbm_booster_create_from_modelfile)(
                path_cstr.as_ptr(),
                out_iterations.0,
                &mut out_handle.0,
            )
        }
    }

    fn last_error_message(&self) -> String {
        // SAFETY: LGBM_GetLastError returns a pointer into an engine-owned
        // static buffer; it is read immediately and copied out.
        unsafe {
            let message = (self.functions.lgbm_get_last_error)();
            if message.is_null() {
                String::new()
            } else {
                CStr::from_ptr(message).to_string_lossy().into_owned()
            }
        }
    }

    fn num_features(&self, booster: BoosterHandle, out_features: IntReceiver) -> c_int {
        // SAFETY: booster is a live handle owned by the caller and
        // out_features is a valid int slot.
        unsafe { (self.functions.lgbm_booster_get_num_feature)(booster.0, out_features.0) }
    }

    fn init_fast_predict_config(
        &self,
        booster: BoosterHandle,
        predict_mode: c_int,
        start_iteration: c_int,
        num_iterations: c_int,
        data_type: c_int,
        num_features: c_int,
        parameters: &str,
        out_handle: &mut FastConfigHandle,
    ) -> c_int {
        let parameters_cstr = match CString::new(parameters) {
            Ok(s) => s,
            Err(_) => return crate::ffi::API_FAILURE,
        };

        // SAFETY: booster is live, parameters_cstr is a valid C string and
        // the handle slot is a valid out location.
        unsafe {
            (self.functions.lgbm_booster_predict_for_mat_single_row_fast_init)(
                booster.0,
                predict_mode,
                start_iteration,
                num_iterations,
                data_type,
                num_features,
                parameters_cstr.as_ptr(),
                &mut out_handle.0,
            )
        }
    }

    fn free_fast_predict_config(&self, handle: FastConfigHandle) -> c_int {
        // SAFETY: handle was created by init_fast_predict_config and the
        // caller guarantees it is freed exactly once.
        unsafe { (self.functions.lgbm_fast_config_free)(handle.0) }
    }

    fn free_model(&self, handle: BoosterHandle) -> c_int {
        // SAFETY: handle was created by create_model_from_file and the
        // caller guarantees it is freed exactly once.
        unsafe { (self.functions.lgbm_booster_free)(handle.0) }
    }

    fn new_int_receiver(&self) -> IntReceiver {
        IntReceiver(Box::into_raw(Box::new(0)))
    }

    fn free_int_receiver(&self, receiver: IntReceiver) {
        // SAFETY: receiver came from new_int_receiver and is freed once.
        unsafe { drop(Box::from_raw(receiver.0)) }
    }

    fn int_value(&self, receiver: IntReceiver) -> c_int {
        // SAFETY: receiver came from new_int_receiver and is still allocated.
        unsafe { *receiver.0 }
    }

    fn new_int64_receiver(&self) -> Int64Receiver {
        Int64Receiver(Box::into_raw(Box::new(0i64)))
    }

    fn free_int64_receiver(&self, receiver: Int64Receiver) {
        // SAFETY: receiver came from new_int64_receiver and is freed once.
        unsafe { drop(Box::from_raw(receiver.0)) }
    }

    fn new_f64_buffer(&self, len: usize) -> F64Buffer {
        let buffer = vec![0.0f64; len].into_boxed_slice();
        F64Buffer {
            ptr: Box::into_raw(buffer) as *mut f64,
            len,
        }
    }

    fn free_f64_buffer(&self, buffer: F64Buffer) {
        // SAFETY: ptr/len came unchanged from new_f64_buffer and the buffer
        // is freed once.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                buffer.ptr, buffer.len,
            )))
        }
    }
}
