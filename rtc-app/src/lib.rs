//! Application root: the `configure -> prepare -> start -> send -> stop`
//! lifecycle that owns a whole running instance, plus the administrative
//! CLI binary (`src/bin/rtcyclic.rs`) built on top of it.

pub mod error;
pub mod lifecycle;

pub use error::{ApplicationError, ConfigurationError, Result};
pub use lifecycle::{Application, ApplicationParts, Lifecycle};
