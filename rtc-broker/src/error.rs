//! Error types for the broker planner and runtime.
//!
//! Two enums mirror the taxonomy's split between configure-time and
//! per-cycle faults: `PlanError` surfaces synchronously from planning,
//! `CycleError` surfaces from a running broker's `execute`.

use thiserror::Error;

use rtc_concurrency::ConcurrencyError;
use rtc_model::ModelError;

/// Result type for the planner.
pub type PlanResult<T> = std::result::Result<T, PlanError>;

/// Result type for the per-cycle broker runtime.
pub type CycleResult<T> = std::result::Result<T, CycleError>;

/// Configure-time planning failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// A type/dimension/range failure in the underlying typed model.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A signal names a data source that was not registered.
    #[error("signal '{signal}' names unknown data source '{data_source}'")]
    UnknownDataSource { signal: String, data_source: String },

    /// A signal names itself in a data source that does not recognise it.
    #[error("data source '{data_source}' does not recognise signal '{signal}'")]
    UnknownSignal { signal: String, data_source: String },

    /// More than one signal in a thread declared a non-zero frequency.
    #[error("thread '{thread}' has more than one synchronising signal (saw '{first}' and '{second}')")]
    MultipleSynchronisingSignals { thread: String, first: String, second: String },

    /// A signal's declared sample count exceeds its data source's buffer count.
    #[error(
        "signal '{signal}' requests {samples} samples but data source '{data_source}' only publishes {buffers} buffers"
    )]
    SamplesExceedBufferCount { signal: String, samples: u32, data_source: String, buffers: u32 },

    /// A triggered output's pre-trigger depth is not smaller than the
    /// data source's buffer count.
    #[error(
        "signal '{signal}' requests {pre} pre-trigger buffers, which must be less than data source '{data_source}''s {buffers} buffers"
    )]
    TriggeredOutputPreTooLarge { signal: String, pre: u32, data_source: String, buffers: u32 },

    /// More than one function writes triggered output to the same data source.
    #[error("data source '{0}' accepts triggered writes from more than one function")]
    MultipleFunctionsOnTriggeredDataSource(String),
}

/// Per-cycle runtime failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    /// A broker's copy list execution failed for the named signal.
    #[error("broker copy failed for signal '{0}'")]
    CopyFailed(String),

    /// A data source's `synchronise()` reported failure.
    #[error("data source '{0}' reported synchronise failure")]
    SynchroniseFailed(String),

    /// The trigger broker's producer found the target slot still marked
    /// triggered: the consumer has not kept up.
    #[error("trigger broker overrun on data source '{0}': consumer has not kept up")]
    Overrun(String),

    /// A function or data source call failed with a model-level error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A bounded wait was cancelled by shutdown.
    #[error("wait cancelled")]
    Cancelled,
}

impl From<ConcurrencyError> for CycleError {
    fn from(err: ConcurrencyError) -> Self {
        match err {
            ConcurrencyError::TimedOut => CycleError::SynchroniseFailed("timed out".to_string()),
            _ => CycleError::Cancelled,
        }
    }
}
