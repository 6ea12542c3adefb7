use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    ApiSettings, DEFAULT_API_BASE_URL, DEFAULT_STREAM_ADDRESS, LoggingSettings, MirrorSettings,
    ReconnectMode, RetentionSettings, Settings, StreamSettings,
};

/// The file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tradefeed.toml";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file
/// (`tradefeed.toml` unless `path` is given; only an explicit path is required
/// to exist), then `TRADEFEED__SECTION__KEY` environment variables.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("TRADEFEED")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Settings` struct
    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    tracing::debug!(address = %settings.stream.address, "Configuration loaded.");
    Ok(settings)
}
