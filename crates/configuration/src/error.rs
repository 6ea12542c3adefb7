use thiserror::Error;

/// Why no usable `Settings` could be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read the tradefeed configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid tradefeed configuration: {0}")]
    ValidationError(String),
}
