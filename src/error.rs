//! Setup-time configuration errors
//!
//! Raised once while wiring the application (building a loader, mounting a
//! file server) and never recovered from at request time.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a loader function nor a template directory was configured
    #[error("no template source provided: set a loader function or a template directory")]
    NoTemplateSource,

    /// File server prefix is empty or carries routing parameters
    #[error("url params not allowed in file server prefix {0:?}")]
    InvalidPrefix(String),
}
