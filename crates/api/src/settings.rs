use crate::ApiConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use vertexops_core::CoreConfig;

/// Default config file stem, resolved as `vertexops.{toml,yaml,json}`.
pub const DEFAULT_CONFIG_FILE: &str = "vertexops";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ApiConfig,
    pub core: CoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: Option<String>,
    pub json: bool,
}

impl Settings {
    /// Defaults, then the config file (`VERTEXOPS_CONFIG` or `vertexops.*`),
    /// then `VERTEXOPS__SECTION__KEY` variables, then the plain `API_KEY`,
    /// `OPENAI_API_KEY` and `PORT` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("VERTEXOPS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let settings = Self::load_from(&file)?;
        settings.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("VERTEXOPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Applies the unprefixed variables the service has always honoured.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("API_KEY").filter(|key| !key.is_empty()) {
            self.server.api_key = api_key;
        }
        if let Some(openai_key) = lookup("OPENAI_API_KEY").filter(|key| !key.is_empty()) {
            self.core.completion.api_key = Some(openai_key);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Message(format!("PORT is not a valid port: {}", port)))?;
        }
        Ok(self)
    }
}
