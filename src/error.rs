use thiserror::Error;

use crate::baseline::BaselineError;
use crate::config::ConfigError;

/// Fatal errors raised while bringing the engine up.
///
/// Everything after startup degrades instead of failing; see the logs for
/// storage and translation problems.
#[derive(Error, Debug)]
pub enum InitError {
    /// The baseline texts could not be loaded
    #[error("Baseline unavailable: {0}")]
    Baseline(#[from] BaselineError),
    /// The configuration could not be loaded or is invalid
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
