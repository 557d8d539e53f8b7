//! Request-level mode flags.

/// Mode flags supplied by the hosting application for one render pass.
pub trait RuntimeContext {
    /// The site runs in development mode.
    fn is_dev_mode(&self) -> bool;

    /// The current process is executing a test suite.
    fn is_test_run(&self) -> bool;

    /// The request explicitly asked for combined output.
    fn force_combine(&self) -> bool;

    /// Whether combining happens at all under these flags.
    ///
    /// Development mode serves files individually unless a test is running
    /// or the request forces combining.
    fn wants_combine(&self) -> bool {
        !(self.is_dev_mode() && !self.is_test_run() && !self.force_combine())
    }
}

/// A [`RuntimeContext`] backed by plain booleans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticRuntime {
    /// Development mode.
    pub dev_mode: bool,
    /// Test run.
    pub test_run: bool,
    /// Request-level force-combine override.
    pub force_combine: bool,
}

impl StaticRuntime {
    /// Live (non-development) mode with no overrides.
    pub fn live() -> Self {
        Self::default()
    }

    /// Development mode with no overrides.
    pub fn dev() -> Self {
        Self {
            dev_mode: true,
            ..Self::default()
        }
    }

    /// Sets the test-run flag.
    pub fn with_test_run(mut self, test_run: bool) -> Self {
        self.test_run = test_run;
        self
    }

    /// Sets the force-combine flag.
    pub fn with_force_combine(mut self, force: bool) -> Self {
        self.force_combine = force;
        self
    }
}

impl RuntimeContext for StaticRuntime {
    fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    fn is_test_run(&self) -> bool {
        self.test_run
    }

    fn force_combine(&self) -> bool {
        self.force_combine
    }
}
