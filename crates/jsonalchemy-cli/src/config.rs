use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jsonalchemy_generate::GenerateOptions;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "jsonalchemy.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `jsonalchemy.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Generation options passed to the engine.
    pub generate: GenerateOptions,
    /// How results are written to stdout.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Pretty-print the JSON written to stdout.
    pub pretty: bool,
    /// Number of instances; more than one is written as a JSON array.
    pub count: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            count: 1,
        }
    }
}

/// A loaded config and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CliConfig,
    pub source: Option<PathBuf>,
}

/// Load `explicit` if given, otherwise `DEFAULT_CONFIG_FILE` under `dir` when
/// it exists, otherwise defaults.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(LoadedConfig {
                    config: CliConfig::default(),
                    source: None,
                });
            }
            candidate
        }
    };

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(LoadedConfig {
        config,
        source: Some(path),
    })
}

pub fn parse_config(contents: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// JSON Schema of the config file.
pub fn config_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(CliConfig)
}
