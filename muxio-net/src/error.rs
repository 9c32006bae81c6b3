//! Network utility errors

use std::io;
use thiserror::Error;

/// Errors from address resolution and socket plumbing
#[derive(Error, Debug)]
pub enum NetError {
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("no usable address found for '{host}'")]
    NoAddressFound { host: String },

    #[error("'{0}' is not a numeric host address")]
    NotNumeric(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
