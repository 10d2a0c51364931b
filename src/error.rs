use thiserror::Error;

pub type Result<T> = std::result::Result<T, LgbmError>;

#[derive(Error, Debug)]
pub enum LgbmError {
    #[error("Failed to load LightGBM library: {0}")]
    LibraryLoad(String),

    #[error("Missing symbol in LightGBM library: {0}")]
    Ffi(String),

    /// Any step of resource acquisition failed. Carries the engine's
    /// last-error text, captured before the failure unwind ran.
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// One or more release calls reported the failure sentinel during
    /// teardown. Carries no engine text: it is unreliable once several
    /// release calls have run.
    #[error("LightGBM call failed while releasing native resources")]
    NativeLibrary,
}
