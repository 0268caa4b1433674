//! Error types for touchtrack.
//!
//! Only configuration loading is fallible. The tracking and gesture layers
//! absorb their edge cases (capacity overflow, unbound buttons, ambiguous
//! direction tests) with at most a diagnostic, so they return nothing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}
