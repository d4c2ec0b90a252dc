use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::CovarError;

pub const DEFAULT_CONFIG: &str = "covar.json";
pub const DEFAULT_DATABASE: &str = "db/covar.db";
pub const DEFAULT_RESOURCES: &str = "resources";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub resources: Option<String>,
    #[serde(default)]
    pub export_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub database: Utf8PathBuf,
    pub resources: Utf8PathBuf,
    pub export_dir: Utf8PathBuf,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<String>,
    pub resources: Option<String>,
    pub export_dir: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `covar.json` from the current directory (then from the
    /// user config directory) when no path is given. A missing default file
    /// resolves to built-in defaults; a missing explicit file is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CovarError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Self::resolve_config(Config::default()),
            },
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CovarError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CovarError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(DEFAULT_CONFIG);
        if local.exists() {
            return Some(local);
        }
        let user = BaseDirs::new()?
            .config_dir()
            .join("covar")
            .join(DEFAULT_CONFIG);
        user.exists().then_some(user)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CovarError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(CovarError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        Ok(ResolvedConfig {
            schema_version,
            database: Utf8PathBuf::from(
                config.database.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            ),
            resources: Utf8PathBuf::from(
                config
                    .resources
                    .unwrap_or_else(|| DEFAULT_RESOURCES.to_string()),
            ),
            export_dir: Utf8PathBuf::from(config.export_dir.unwrap_or_else(|| ".".to_string())),
        })
    }
}

impl ResolvedConfig {
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(database) = overrides.database {
            self.database = Utf8PathBuf::from(database);
        }
        if let Some(resources) = overrides.resources {
            self.resources = Utf8PathBuf::from(resources);
        }
        if let Some(export_dir) = overrides.export_dir {
            self.export_dir = Utf8PathBuf::from(export_dir);
        }
        self
    }
}
