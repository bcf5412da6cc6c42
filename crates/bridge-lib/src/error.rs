//! Error taxonomy for a bridge run
//!
//! Every variant is fatal to the run. Nothing is retried.

use thiserror::Error;

/// Boxed cause carried by query failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Identity fields missing or malformed, or unusable local settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The Nomad API could not be queried
    #[error("querying {what}")]
    Query {
        what: String,
        #[source]
        source: BoxError,
    },

    /// The collector endpoint could not be reached
    #[error("connecting to metrics collector at {addr}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A metric line could not be written to an established connection
    #[error("delivering metric {metric}")]
    Delivery {
        metric: String,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    pub fn query(what: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Query {
            what: what.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
