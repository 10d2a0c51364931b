//! LightGBM Loader - safe lifecycle management for native scoring resources
//!
//! This crate owns the native, non-garbage-collected resources handed out by
//! the LightGBM C API: the booster handle, the optional fast-predict settings
//! handle, and the scratch buffers reused across scoring calls. It acquires
//! them in a well-defined order, exposes the model's metadata, and guarantees
//! every acquired resource is released exactly once, even when acquisition
//! fails partway through or release is invoked more than once.
//!
//! The engine itself is a black box loaded with `libloading`; scoring is done
//! by callers that borrow (never own) the handles this crate manages.
//!
//! ```no_run
//! use lightgbm_loader::{BoosterResources, NativeEngine};
//!
//! let engine = NativeEngine::load("lib_lightgbm.so")?;
//! let mut resources = BoosterResources::initialize(engine, "models/fraud.txt")?;
//! assert!(resources.num_features() > 0);
//!
//! resources.init_fast_predict_config("")?;
//! // ... scoring calls borrow resources.booster_handle() and the buffers ...
//!
//! resources.close()?;
//! # Ok::<(), lightgbm_loader::LgbmError>(())
//! ```

pub mod booster;
pub mod engine;
pub mod error;
pub mod ffi;

pub use booster::{BoosterResources, ModelConfig};
pub use engine::{
    BoosterHandle, F64Buffer, FastConfigHandle, Int64Receiver, IntReceiver, NativeEngine,
    ScoringEngine,
};
pub use error::{LgbmError, Result};

/// Prediction mode constants, re-exported for convenience
pub mod predict_mode {
    /// Normal prediction
    pub const NORMAL: i32 = crate::ffi::C_API_PREDICT_NORMAL;
    /// Raw score prediction
    pub const RAW_SCORE: i32 = crate::ffi::C_API_PREDICT_RAW_SCORE;
    /// Leaf index prediction
    pub const LEAF_INDEX: i32 = crate::ffi::C_API_PREDICT_LEAF_INDEX;
    /// Feature contribution (SHAP values)
    pub const CONTRIB: i32 = crate::ffi::C_API_PREDICT_CONTRIB;
}

/// Row data-type constants, re-exported for convenience
pub mod data_type {
    pub const FLOAT32: i32 = crate::ffi::C_API_DTYPE_FLOAT32;
    pub const FLOAT64: i32 = crate::ffi::C_API_DTYPE_FLOAT64;
}
