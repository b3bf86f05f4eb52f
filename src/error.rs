/// Error type shared by every component of the VAD pipeline.
///
/// `DenoiserFrameMismatch` deliberately has no variant here: a denoiser frame
/// size mismatch is a programming error inside the pipeline orchestrator, not
/// a recoverable condition a caller should branch on, so it is raised with
/// `debug_assert!` at the call site instead.
#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("value out of range: {0}")]
    RangeInvalid(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("recorder missing data: {0}")]
    RecorderMissingData(String),

    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
