use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::error::ConfigError),

    #[error("Log mirror error: {0}")]
    Mirror(#[from] database::MirrorError),

    #[error("Invalid stream setup: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("The feed provider has shut down.")]
    ProviderClosed,
}
