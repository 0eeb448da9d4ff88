//! Error types for the application root.
//!
//! Grounded on `knhk-autonomic`'s `AutonomicError`: one aggregate enum at
//! the outermost boundary, wrapping each lower layer's own error type via
//! `#[from]` rather than re-describing their variants.

use thiserror::Error;

use rtc_broker::{CycleError, PlanError};
use rtc_scheduler::TransitionError;

/// Result type for application-root operations.
pub type Result<T> = std::result::Result<T, ApplicationError>;

/// Raised while building an `Application` out of a configuration tree,
/// before anything is running.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration references unknown function {0:?}")]
    UnknownFunction(String),

    #[error("configuration references unknown data source {0:?}")]
    UnknownDataSource(String),

    #[error("configuration tree is missing required node {0:?}")]
    MissingNode(String),

    #[error("state {0:?} declares no threads")]
    EmptyState(String),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// The application root's aggregate error: every lower-layer failure that
/// can surface through `configure`/`prepare`/`start`/`send`/`stop`.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("application is not in a state that allows this operation (currently {current:?})")]
    WrongLifecycleStage { current: &'static str },
}
