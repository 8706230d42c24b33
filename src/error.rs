use thiserror::Error;

/// Umbrella error returned by [`crate::run`] (§7: "`herbarium-extract::Error`
/// is the umbrella `#[from]`-composing enum returned by the public
/// `run(...)` function").
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] dwc_config::ConfigLoadError),
    #[error(transparent)]
    RunController(#[from] dwc_run_controller::RunControllerError),
}

/// Process exit code this error should produce, for callers that need one
/// (the CLI surface itself is out of scope, per §1, but a caller wiring
/// this library into a process still needs a mapping). Only configuration
/// failures are fatal here: every other error class is resolved per-specimen
/// inside `run` and never escapes it (§7).
impl Error {
    #[must_use]
    pub fn to_exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::RunController(dwc_run_controller::RunControllerError::Configuration(_)) => 2,
            Error::RunController(_) => 1,
        }
    }
}
