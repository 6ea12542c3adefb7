use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The address has no scheme, or one no transport speaks.
    #[error("Unsupported stream address '{0}'; expected ws://, wss://, http:// or https://")]
    UnsupportedAddress(String),
}
