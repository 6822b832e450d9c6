use thiserror::Error;

/// Exit code taxonomy for the validator binary, one variant per way a run
/// can end early. `main` maps a returned error to `std::process::exit`
/// with the matching code; a clean run exits `0`.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("could not create the communication pipes: {0}")]
    PipeCreationFailed(#[source] std::io::Error),

    #[error("lost the data pipe to the instrumented process")]
    DataPipeLost,

    #[error("lost the control pipe to the reference process")]
    CtrlPipeLost,

    #[error("reference process exited while a comparison was outstanding")]
    ReferenceExited,

    #[error("reference process crashed (signal {0}) while a comparison was outstanding")]
    ReferenceCrashed(i32),

    #[error("could not launch the reference process: {0}")]
    LaunchFailed(#[source] std::io::Error),

    #[error("unrecognized {name} value: {value}")]
    BadConfig { name: &'static str, value: String },
}

impl ValidatorError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidatorError::PipeCreationFailed(_) => 1,
            ValidatorError::DataPipeLost => 2,
            ValidatorError::CtrlPipeLost => 3,
            ValidatorError::ReferenceExited => 4,
            ValidatorError::ReferenceCrashed(_) => 5,
            ValidatorError::LaunchFailed(_) => 6,
            ValidatorError::BadConfig { .. } => 7,
        }
    }
}
