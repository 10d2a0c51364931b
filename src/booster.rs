//! Native resource lifecycle for a loaded booster
//!
//! [`BoosterResources`] is the exclusive owner of every native resource
//! backing one loaded model: the booster handle, the optional fast-predict
//! settings handle, and the scratch buffers reused across scoring calls.
//! It acquires them in a strict order, exposes read-only metadata, and
//! guarantees each is released exactly once, including when acquisition
//! fails partway through or when `close` is called more than once.

use crate::engine::{
    BoosterHandle, F64Buffer, FastConfigHandle, Int64Receiver, IntReceiver, NativeEngine,
    ScoringEngine,
};
use crate::error::{LgbmError, Result};
use crate::ffi::{self, API_FAILURE, BINARY_NUM_CLASSES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use tracing::Span;

/// Everything needed to bring a model up in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the LightGBM shared library
    pub library_path: PathBuf,

    /// Path to the model file on disk
    pub model_path: PathBuf,

    /// Extra LightGBM parameters for the fast-predict setup; when set, the
    /// fast-predict settings are built as part of loading
    pub fast_predict_parameters: Option<String>,
}

impl ModelConfig {
    pub fn new<L: AsRef<Path>, M: AsRef<Path>>(library_path: L, model_path: M) -> Self {
        Self {
            library_path: library_path.as_ref().to_path_buf(),
            model_path: model_path.as_ref().to_path_buf(),
            fast_predict_parameters: None,
        }
    }

    pub fn with_fast_predict_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.fast_predict_parameters = Some(parameters.into());
        self
    }
}

/// Owns all native resources of one loaded booster.
///
/// Each resource field is either unallocated (`None`) or holds a live native
/// identifier; release goes through `Option::take`, which makes repeated
/// release a no-op. Dropping the manager releases everything as a backstop,
/// but [`close`](Self::close) is the primary release path and the only one that reports
/// release failures.
///
/// One instance is not safe for concurrent use (scoring mutates the shared
/// instance buffer in place); independent instances share no mutable state.
pub struct BoosterResources<E: ScoringEngine = NativeEngine> {
    engine: E,

    /// Reusable slot for any int-output engine call. Last write wins.
    out_int: Option<IntReceiver>,

    /// Receives the output length of a scoring call.
    out_length: Option<Int64Receiver>,

    /// Input row for single-row scoring, sized to the feature count.
    instance_buffer: Option<F64Buffer>,

    /// Scored output, sized to the binary class count.
    score_buffer: Option<F64Buffer>,

    fast_config: Option<FastConfigHandle>,

    booster: Option<BoosterHandle>,

    /// Iteration count of the trained model, set once during acquisition.
    num_iterations: c_int,

    /// Feature count of the trained model, set once during acquisition.
    num_features: c_int,

    /// Lifetime-scoped span; every lifecycle event is recorded inside it.
    span: Span,
}

impl BoosterResources<NativeEngine> {
    /// Loads the native library and acquires all model resources in one call
    ///
    /// # Example
    /// ```no_run
    /// use lightgbm_loader::{BoosterResources, ModelConfig};
    ///
    /// let config = ModelConfig::new("lib_lightgbm.so", "models/fraud.txt")
    ///     .with_fast_predict_parameters("");
    /// let resources = BoosterResources::load(&config)?;
    /// assert!(resources.num_features() > 0);
    /// # Ok::<(), lightgbm_loader::LgbmError>(())
    /// ```
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let engine = NativeEngine::load(&config.library_path)?;
        let mut resources = Self::initialize(engine, &config.model_path)?;
        if let Some(parameters) = &config.fast_predict_parameters {
            resources.init_fast_predict_config(parameters)?;
        }
        Ok(resources)
    }
}

impl<E: ScoringEngine> BoosterResources<E> {
    /// Acquires the booster handle and every auxiliary resource needed to
    /// score against it, in strict order: the reusable int slot, the booster
    /// itself (which also yields the iteration count), the feature count,
    /// then the scratch buffers sized from it.
    ///
    /// On any engine failure the last-error text is captured first,
    /// everything acquired so far is released, and `LgbmError::ModelLoad`
    /// carries the captured text. A partially acquired manager is never
    /// returned.
    pub fn initialize<P: AsRef<Path>>(engine: E, model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(LgbmError::ModelLoad(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let span = tracing::info_span!("booster_resources", model = %model_path.display());
        let mut this = Self {
            engine,
            out_int: None,
            out_length: None,
            instance_buffer: None,
            score_buffer: None,
            fast_config: None,
            booster: None,
            num_iterations: 0,
            num_features: 0,
            span,
        };
        let _guard = this.span.clone().entered();

        let out_int = this.engine.new_int_receiver();
        this.out_int = Some(out_int);

        let mut booster = BoosterHandle::null();
        if this
            .engine
            .create_model_from_file(model_path, out_int, &mut booster)
            == API_FAILURE
        {
            return Err(this.fail_load("Error loading LightGBM model from file: "));
        }
        this.booster = Some(booster);
        this.num_iterations = this.engine.int_value(out_int);
        tracing::debug!(num_iterations = this.num_iterations, "Loaded model from file");

        if this.engine.num_features(booster, out_int) == API_FAILURE {
            return Err(this.fail_load("Couldn't get number of features from model: "));
        }
        this.num_features = this.engine.int_value(out_int);
        tracing::debug!(num_features = this.num_features, "Read model feature count");

        this.out_length = Some(this.engine.new_int64_receiver());
        this.instance_buffer = Some(this.engine.new_f64_buffer(this.num_features as usize));
        this.score_buffer = Some(this.engine.new_f64_buffer(BINARY_NUM_CLASSES));

        Ok(this)
    }

    /// Builds the engine-side fast-predict settings for repeated single-row
    /// scoring. Callable any time after construction; a previously built
    /// handle is released before the new one is stored.
    ///
    /// Uses normal prediction over all iterations on float64 rows; extra
    /// LightGBM parameters come from `parameters`.
    ///
    /// A failed build invalidates the whole manager: every resource is
    /// released before `LgbmError::ModelLoad` propagates, since the caller
    /// cannot safely retry against inconsistent engine state.
    pub fn init_fast_predict_config(&mut self, parameters: &str) -> Result<()> {
        let _guard = self.span.clone().entered();

        let Some(booster) = self.booster else {
            return Err(LgbmError::ModelLoad(
                "booster handle already released".to_string(),
            ));
        };

        if let Some(previous) = self.fast_config.take() {
            if self.engine.free_fast_predict_config(previous) == API_FAILURE {
                // A failed release, not a failed load: the manager can no
                // longer vouch for its state, so tear everything down.
                tracing::warn!("Freeing the previous FastConfig handle failed");
                self.release_all().ok();
                return Err(LgbmError::NativeLibrary);
            }
        }

        let mut fast_config = FastConfigHandle::null();
        let status = self.engine.init_fast_predict_config(
            booster,
            ffi::C_API_PREDICT_NORMAL,
            0,  // start iteration
            -1, // all iterations
            ffi::C_API_DTYPE_FLOAT64,
            self.num_features,
            parameters,
            &mut fast_config,
        );
        if status == API_FAILURE {
            return Err(self.fail_load("Error initializing prediction FastConfig settings: "));
        }
        self.fast_config = Some(fast_config);
        tracing::debug!("Initialized FastConfig prediction settings");

        Ok(())
    }

    /// Releases every native resource still held. Safe to call any number of
    /// times, from any code path.
    ///
    /// Release order encodes the dependency between resources: scratch
    /// buffers and receivers first, then the fast-predict settings, then the
    /// booster they were derived from. Every step is attempted even when an
    /// earlier free reports the failure sentinel; the field is cleared either
    /// way (a handle whose free failed is not usable again). If any step
    /// failed, a single `LgbmError::NativeLibrary` is returned after all
    /// steps have run.
    pub fn close(&mut self) -> Result<()> {
        self.release_all()
    }

    /// Iteration count of the trained model.
    pub fn num_iterations(&self) -> i32 {
        self.num_iterations
    }

    /// Feature count of the trained model.
    pub fn num_features(&self) -> i32 {
        self.num_features
    }

    /// The booster handle, for use in scoring calls. `None` once closed.
    pub fn booster_handle(&self) -> Option<BoosterHandle> {
        self.booster
    }

    /// The fast-predict settings handle, if built. `None` once closed.
    pub fn fast_config_handle(&self) -> Option<FastConfigHandle> {
        self.fast_config
    }

    /// Scratch input row, sized to the feature count. `None` once closed.
    pub fn instance_buffer(&self) -> Option<F64Buffer> {
        self.instance_buffer
    }

    /// Scratch score output, sized to the class count. `None` once closed.
    pub fn score_buffer(&self) -> Option<F64Buffer> {
        self.score_buffer
    }

    /// Output-length slot for scoring calls. `None` once closed.
    pub fn out_length_receiver(&self) -> Option<Int64Receiver> {
        self.out_length
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Captures the engine's last-error text before any release call can
    /// overwrite it, releases everything acquired so far, and builds the
    /// acquisition error. Release failures during the unwind are logged;
    /// the acquisition error takes precedence.
    fn fail_load(&mut self, prefix: &str) -> LgbmError {
        let message = self.engine.last_error_message();
        if self.release_all().is_err() {
            tracing::warn!("Releasing partially acquired resources reported a native failure");
        }
        LgbmError::ModelLoad(format!("{}{}", prefix, message))
    }

    fn release_all(&mut self) -> Result<()> {
        let _guard = self.span.clone().entered();
        let mut failed = false;

        // Receivers and scratch buffers first: nothing depends on them.
        if let Some(receiver) = self.out_length.take() {
            self.engine.free_int64_receiver(receiver);
        }
        if let Some(buffer) = self.instance_buffer.take() {
            self.engine.free_f64_buffer(buffer);
        }
        if let Some(buffer) = self.score_buffer.take() {
            self.engine.free_f64_buffer(buffer);
        }
        if let Some(receiver) = self.out_int.take() {
            self.engine.free_int_receiver(receiver);
        }

        // FastConfig settings before the booster they were derived from.
        if let Some(handle) = self.fast_config.take() {
            if self.engine.free_fast_predict_config(handle) == API_FAILURE {
                tracing::warn!("Freeing the FastConfig handle failed");
                failed = true;
            }
        }

        // The booster goes last, and is attempted even if an earlier free failed.
        if let Some(handle) = self.booster.take() {
            if self.engine.free_model(handle) == API_FAILURE {
                tracing::warn!("Freeing the booster handle failed");
                failed = true;
            }
        }

        if failed {
            Err(LgbmError::NativeLibrary)
        } else {
            Ok(())
        }
    }
}

// Derivation is blocked by the raw-pointer handles and the generic engine;
// render the handle states and metadata instead.
impl<E: ScoringEngine> fmt::Debug for BoosterResources<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoosterResources")
            .field("booster", &self.booster)
            .field("fast_config", &self.fast_config)
            .field("num_iterations", &self.num_iterations)
            .field("num_features", &self.num_features)
            .finish_non_exhaustive()
    }
}

impl<E: ScoringEngine> Drop for BoosterResources<E> {
    fn drop(&mut self) {
        // Backstop only; close() is the primary release path and the one that
        // reports failures.
        if self.release_all().is_err() {
            tracing::warn!("Native resource release reported a failure during drop");
        }
    }
}

// SAFETY: The manager owns its handles exclusively and every engine call is
// blocking. Not Sync: scoring mutates the shared instance buffer in place.
unsafe impl<E: ScoringEngine + Send> Send for BoosterResources<E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{Booster, FastConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct MockState {
        calls: Vec<String>,
        fail_create_model: bool,
        fail_num_features: bool,
        fail_fast_init: bool,
        fail_fast_free: bool,
        fail_model_free: bool,
        num_iterations: c_int,
        num_features: c_int,
        int_slot: c_int,
        last_error: String,
        next_handle: usize,
    }

    impl MockState {
        fn next_handle(&mut self) -> usize {
            self.next_handle += 1;
            self.next_handle << 4
        }
    }

    /// Records every engine call; handles are fabricated and never
    /// dereferenced.
    #[derive(Clone)]
    struct MockEngine {
        state: Rc<RefCell<MockState>>,
    }

    impl MockEngine {
        fn new(num_iterations: c_int, num_features: c_int) -> Self {
            Self {
                state: Rc::new(RefCell::new(MockState {
                    num_iterations,
                    num_features,
                    last_error: "engine error text".to_string(),
                    ..Default::default()
                })),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.state.borrow().calls.clone()
        }

        fn count(&self, call: &str) -> usize {
            self.state
                .borrow()
                .calls
                .iter()
                .filter(|c| c.as_str() == call)
                .count()
        }

        fn position(&self, call: &str) -> Option<usize> {
            self.state
                .borrow()
                .calls
                .iter()
                .position(|c| c.as_str() == call)
        }
    }

    impl ScoringEngine for MockEngine {
        fn create_model_from_file(
            &self,
            _path: &Path,
            _out_iterations: IntReceiver,
            out_handle: &mut BoosterHandle,
        ) -> c_int {
            let mut state = self.state.borrow_mut();
            state.calls.push("create_model".to_string());
            if state.fail_create_model {
                return API_FAILURE;
            }
            state.int_slot = state.num_iterations;
            let fake = state.next_handle();
            *out_handle = BoosterHandle(fake as *mut Booster);
            0
        }

        fn last_error_message(&self) -> String {
            self.state.borrow().last_error.clone()
        }

        fn num_features(&self, _booster: BoosterHandle, _out_features: IntReceiver) -> c_int {
            let mut state = self.state.borrow_mut();
            state.calls.push("get_num_features".to_string());
            if state.fail_num_features {
                return API_FAILURE;
            }
            state.int_slot = state.num_features;
            0
        }

        fn init_fast_predict_config(
            &self,
            _booster: BoosterHandle,
            _predict_mode: c_int,
            _start_iteration: c_int,
            _num_iterations: c_int,
            _data_type: c_int,
            _num_features: c_int,
            _parameters: &str,
            out_handle: &mut FastConfigHandle,
        ) -> c_int {
            let mut state = self.state.borrow_mut();
            state.calls.push("fast_init".to_string());
            if state.fail_fast_init {
                return API_FAILURE;
            }
            let fake = state.next_handle();
            *out_handle = FastConfigHandle(fake as *mut FastConfig);
            0
        }

        fn free_fast_predict_config(&self, _handle: FastConfigHandle) -> c_int {
            let mut state = self.state.borrow_mut();
            state.calls.push("free_fast_config".to_string());
            state.last_error = "stale error text".to_string();
            if state.fail_fast_free {
                API_FAILURE
            } else {
                0
            }
        }

        fn free_model(&self, _handle: BoosterHandle) -> c_int {
            let mut state = self.state.borrow_mut();
            state.calls.push("free_model".to_string());
            state.last_error = "stale error text".to_string();
            if state.fail_model_free {
                API_FAILURE
            } else {
                0
            }
        }

        fn new_int_receiver(&self) -> IntReceiver {
            let mut state = self.state.borrow_mut();
            state.calls.push("new_int_receiver".to_string());
            let fake = state.next_handle();
            IntReceiver(fake as *mut c_int)
        }

        fn free_int_receiver(&self, _receiver: IntReceiver) {
            self.state.borrow_mut().calls.push("free_int_receiver".to_string());
        }

        fn int_value(&self, _receiver: IntReceiver) -> c_int {
            self.state.borrow().int_slot
        }

        fn new_int64_receiver(&self) -> Int64Receiver {
            let mut state = self.state.borrow_mut();
            state.calls.push("new_int64_receiver".to_string());
            let fake = state.next_handle();
            Int64Receiver(fake as *mut i64)
        }

        fn free_int64_receiver(&self, _receiver: Int64Receiver) {
            self.state.borrow_mut().calls.push("free_int64_receiver".to_string());
        }

        fn new_f64_buffer(&self, len: usize) -> F64Buffer {
            let mut state = self.state.borrow_mut();
            state.calls.push(format!("new_f64_buffer({})", len));
            let fake = state.next_handle();
            F64Buffer {
                ptr: fake as *mut f64,
                len,
            }
        }

        fn free_f64_buffer(&self, buffer: F64Buffer) {
            self.state
                .borrow_mut()
                .calls
                .push(format!("free_f64_buffer({})", buffer.len()));
        }
    }

    fn model_path() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().expect("temp model file")
    }

    #[test]
    fn initialize_populates_metadata_and_buffers() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        let resources = BoosterResources::initialize(engine.clone(), file.path())
            .expect("initialize should succeed");

        assert_eq!(resources.num_iterations(), 100);
        assert_eq!(resources.num_features(), 13);
        assert_eq!(resources.instance_buffer().unwrap().len(), 13);
        assert_eq!(resources.score_buffer().unwrap().len(), BINARY_NUM_CLASSES);
        assert!(resources.booster_handle().is_some());
        assert!(resources.fast_config_handle().is_none());

        // Acquisition order: int slot, model, feature query, aux buffers.
        let calls = engine.calls();
        assert_eq!(
            calls,
            vec![
                "new_int_receiver",
                "create_model",
                "get_num_features",
                "new_int64_receiver",
                "new_f64_buffer(13)",
                "new_f64_buffer(2)",
            ]
        );
    }

    #[test]
    fn missing_model_path_is_rejected_before_any_engine_call() {
        let engine = MockEngine::new(100, 13);
        let error = BoosterResources::initialize(engine.clone(), "/no/such/model.txt")
            .expect_err("missing model must not load");

        match error {
            LgbmError::ModelLoad(message) => {
                assert!(message.contains("not found"), "got: {}", message)
            }
            other => panic!("expected ModelLoad, got {:?}", other),
        }
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn create_model_failure_unwinds_and_carries_engine_text() {
        let engine = MockEngine::new(100, 13);
        engine.state.borrow_mut().fail_create_model = true;
        let file = model_path();

        let error = BoosterResources::initialize(engine.clone(), file.path())
            .expect_err("initialize should fail");
        match error {
            LgbmError::ModelLoad(message) => {
                assert!(message.contains("engine error text"), "got: {}", message)
            }
            other => panic!("expected ModelLoad, got {:?}", other),
        }

        // The int slot allocated in step one was released; no model free ran
        // because no model handle was ever stored.
        assert_eq!(engine.count("free_int_receiver"), 1);
        assert_eq!(engine.count("free_model"), 0);
    }

    #[test]
    fn feature_query_failure_releases_the_model_before_propagating() {
        let engine = MockEngine::new(100, 13);
        engine.state.borrow_mut().fail_num_features = true;
        let file = model_path();

        let error = BoosterResources::initialize(engine.clone(), file.path())
            .expect_err("initialize should fail");

        // The error text was captured before the frees overwrote it.
        match error {
            LgbmError::ModelLoad(message) => {
                assert!(message.contains("engine error text"), "got: {}", message);
                assert!(!message.contains("stale"), "got: {}", message);
            }
            other => panic!("expected ModelLoad, got {:?}", other),
        }

        assert_eq!(engine.count("free_model"), 1);
        assert_eq!(engine.count("free_int_receiver"), 1);
    }

    #[test]
    fn close_releases_everything_and_is_idempotent() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();

        resources.close().expect("close should succeed");
        assert!(resources.booster_handle().is_none());
        assert!(resources.instance_buffer().is_none());
        assert!(resources.out_length_receiver().is_none());

        resources.close().expect("second close must be a no-op");
        assert_eq!(engine.count("free_model"), 1);
        assert_eq!(engine.count("free_int_receiver"), 1);
        assert_eq!(engine.count("free_int64_receiver"), 1);
        assert_eq!(engine.count("free_f64_buffer(13)"), 1);
        assert_eq!(engine.count("free_f64_buffer(2)"), 1);
    }

    #[test]
    fn fast_config_is_freed_strictly_before_the_model() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();
        resources
            .init_fast_predict_config("")
            .expect("fast init should succeed");
        assert!(resources.fast_config_handle().is_some());

        resources.close().expect("close should succeed");

        let fast = engine.position("free_fast_config").expect("fast config freed");
        let model = engine.position("free_model").expect("model freed");
        assert!(fast < model, "fast config must be freed before the model");
    }

    #[test]
    fn fast_init_failure_releases_the_whole_manager() {
        let engine = MockEngine::new(100, 13);
        engine.state.borrow_mut().fail_fast_init = true;
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();

        let error = resources
            .init_fast_predict_config("")
            .expect_err("fast init should fail");
        assert!(matches!(error, LgbmError::ModelLoad(_)));

        // Not just the fast-config attempt: the model and buffers went too.
        assert!(resources.booster_handle().is_none());
        assert!(resources.instance_buffer().is_none());
        assert_eq!(engine.count("free_model"), 1);

        resources.close().expect("close after failure must be a no-op");
        assert_eq!(engine.count("free_model"), 1);
    }

    #[test]
    fn failed_stale_fast_config_free_tears_the_manager_down() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();
        resources.init_fast_predict_config("").unwrap();

        engine.state.borrow_mut().fail_fast_free = true;
        let error = resources
            .init_fast_predict_config("num_threads=1")
            .expect_err("re-invocation should report the failed release");

        // A release failure, so NativeLibrary, not ModelLoad with free-call text.
        assert!(matches!(error, LgbmError::NativeLibrary));
        assert!(resources.booster_handle().is_none());
        assert!(resources.instance_buffer().is_none());
        assert_eq!(engine.count("free_model"), 1);
        assert_eq!(engine.count("fast_init"), 1);

        resources.close().expect("close after teardown must be a no-op");
        assert_eq!(engine.count("free_fast_config"), 1);
    }

    #[test]
    fn reinitializing_fast_config_replaces_the_previous_handle() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();

        resources.init_fast_predict_config("").unwrap();
        let first = resources.fast_config_handle().unwrap();
        resources.init_fast_predict_config("num_threads=1").unwrap();
        let second = resources.fast_config_handle().unwrap();

        assert_ne!(first, second);
        assert_eq!(engine.count("free_fast_config"), 1);
        assert_eq!(engine.count("fast_init"), 2);
    }

    #[test]
    fn failed_fast_config_free_does_not_skip_the_model_free() {
        let engine = MockEngine::new(100, 13);
        engine.state.borrow_mut().fail_fast_free = true;
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();
        resources.init_fast_predict_config("").unwrap();

        let error = resources.close().expect_err("close should report the failure");
        assert!(matches!(error, LgbmError::NativeLibrary));

        // Both frees were attempted, in order, before the error surfaced.
        let fast = engine.position("free_fast_config").unwrap();
        let model = engine.position("free_model").unwrap();
        assert!(fast < model);

        // Fields cleared regardless: nothing left to free a second time.
        resources.close().expect("second close must be a no-op");
        assert_eq!(engine.count("free_fast_config"), 1);
        assert_eq!(engine.count("free_model"), 1);
    }

    #[test]
    fn failed_model_free_surfaces_after_all_steps_ran() {
        let engine = MockEngine::new(100, 13);
        engine.state.borrow_mut().fail_model_free = true;
        let file = model_path();
        let mut resources =
            BoosterResources::initialize(engine.clone(), file.path()).unwrap();

        let error = resources.close().expect_err("close should report the failure");
        assert!(matches!(error, LgbmError::NativeLibrary));
        assert_eq!(engine.count("free_int_receiver"), 1);
        assert_eq!(engine.count("free_int64_receiver"), 1);

        resources.close().expect("second close must be a no-op");
        assert_eq!(engine.count("free_model"), 1);
    }

    #[test]
    fn drop_releases_everything_as_a_backstop() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        {
            let resources =
                BoosterResources::initialize(engine.clone(), file.path()).unwrap();
            assert!(resources.booster_handle().is_some());
        }
        assert_eq!(engine.count("free_model"), 1);
        assert_eq!(engine.count("free_int_receiver"), 1);
    }

    #[test]
    fn debug_output_tracks_the_handle_states() {
        let engine = MockEngine::new(100, 13);
        let file = model_path();
        let mut resources = BoosterResources::initialize(engine, file.path()).unwrap();

        let rendered = format!("{:?}", resources);
        assert!(rendered.contains("num_features: 13"), "got: {}", rendered);
        assert!(rendered.contains("fast_config: None"), "got: {}", rendered);

        resources.close().unwrap();
        let rendered = format!("{:?}", resources);
        assert!(rendered.contains("booster: None"), "got: {}", rendered);
    }

    #[test]
    fn instance_buffer_tracks_the_feature_count_across_reloads() {
        let file = model_path();

        let small = MockEngine::new(50, 4);
        let resources = BoosterResources::initialize(small, file.path()).unwrap();
        assert_eq!(resources.instance_buffer().unwrap().len(), 4);
        drop(resources);

        let wide = MockEngine::new(50, 31);
        let resources = BoosterResources::initialize(wide, file.path()).unwrap();
        assert_eq!(resources.instance_buffer().unwrap().len(), 31);
        assert_eq!(resources.score_buffer().unwrap().len(), BINARY_NUM_CLASSES);
    }
}
