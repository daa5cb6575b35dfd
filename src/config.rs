use crate::error::LinkGenError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Global static variable to hold the config provider.
pub static CONFIG_PROVIDER: OnceCell<Mutex<Arc<dyn GeneratorConfigProvider>>> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix every actor declaration with a comment describing its node tree.
    pub emit_tree_view: bool,
    /// Guard generated sources with `#pragma warning disable CS0108, CS0109`.
    pub emit_pragmas: bool,
    /// Namespace used when a target's actor has none.
    pub default_namespace: String,
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            emit_tree_view: true,
            emit_pragmas: true,
            default_namespace: "Discord".to_string(),
            indent: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "linkgen_core=info".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

pub trait GeneratorConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<GeneratorConfig, LinkGenError>;
    fn set_config(&self, config: &GeneratorConfig) -> Result<(), LinkGenError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GeneratorConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<GeneratorConfig, LinkGenError> {
        tracing::debug!("Attempting to read generator config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(GeneratorConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    fn set_config(&self, config: &GeneratorConfig) -> Result<(), LinkGenError> {
        tracing::debug!("Attempting to write generator config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

/// Installs `provider` as the process-wide provider. Fails if one is already installed.
pub fn set_provider(provider: Arc<dyn GeneratorConfigProvider>) -> Result<(), LinkGenError> {
    CONFIG_PROVIDER
        .set(Mutex::new(provider))
        .map_err(|_| LinkGenError::Config("config provider is already installed".to_string()))
}

/// Reads the config through the installed provider, or defaults when none is installed.
pub fn current_config() -> Result<GeneratorConfig, LinkGenError> {
    let Some(provider) = CONFIG_PROVIDER.get() else {
        return Ok(GeneratorConfig::default());
    };
    let provider = provider
        .lock()
        .map_err(|e| LinkGenError::Config(format!("config provider lock poisoned: {e}")))?
        .clone();
    provider.get_config()
}

pub fn get_content<P: AsRef<Path>>(path: P) -> Result<String, LinkGenError> {
    tracing::debug!("Reading {:?}", path.as_ref());
    Ok(read_to_string(path)?)
}

pub fn set_content<P: AsRef<Path>>(path: P, text: &str) -> Result<(), LinkGenError> {
    tracing::debug!("Writing {:?}", path.as_ref());
    Ok(write(path, text)?)
}
