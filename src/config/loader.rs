//! Configuration File Loading
//!
//! Finds the first configuration file on the search path, parses it as TOML
//! or JSON, and validates the result. Missing files fall back to defaults.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file loader
pub struct ConfigLoader {
    /// Search directories for configuration files
    search_paths: Vec<PathBuf>,
    /// Supported configuration file formats, in lookup order
    supported_formats: Vec<ConfigFormat>,
    /// Current configuration file path (if loaded)
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Whether to fall back to the default config if none exists
    pub create_default: bool,
    /// Whether to validate configuration after loading
    pub validate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_default: true,
            validate: true,
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            search_paths: Self::get_search_paths(),
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
        }
    }

    /// Load configuration with default options
    pub fn load() -> Result<Config> {
        Self::new().load_with_options(LoadOptions::default())
    }

    /// Load configuration with custom options
    pub fn load_with_options(&mut self, options: LoadOptions) -> Result<Config> {
        if let Some((path, config)) = self.find_and_load_config()? {
            info!("Loaded configuration from {}", path.display());
            self.current_path = Some(path);

            if options.validate {
                validate_config(&config)?;
            }
            return Ok(config);
        }

        if options.create_default {
            debug!("No configuration file found, using defaults");
            let config = Config::default();
            if options.validate {
                validate_config(&config)?;
            }
            Ok(config)
        } else {
            Err(Error::ConfigNotFound)
        }
    }

    /// Load and validate one specific file, e.g. from `--config`
    pub fn load_from_path(&mut self, path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(Error::ConfigLoadFailed {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        let format = ConfigFormat::from_path(path).unwrap_or(ConfigFormat::Toml);
        let config = self.load_config_file(path, format)?;
        validate_config(&config)?;
        self.current_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to the current path or default location
    pub fn save(&self, config: &Config) -> Result<PathBuf> {
        let path = self
            .current_path
            .clone()
            .unwrap_or_else(Self::get_default_config_path);
        self.save_to_path(config, &path)?;
        Ok(path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::ConfigSaveFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let format = ConfigFormat::from_path(path).unwrap_or(ConfigFormat::Toml);
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                }
            })?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        fs::write(path, content).map_err(|e| Error::ConfigSaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Find and load configuration from search paths
    fn find_and_load_config(&self) -> Result<Option<(PathBuf, Config)>> {
        for path in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = self.get_config_path_for_format(path, *format);

                if config_path.exists() {
                    match self.load_config_file(&config_path, *format) {
                        Ok(config) => return Ok(Some((config_path, config))),
                        Err(e) => {
                            // Keep searching, a broken file should not block startup
                            warn!(
                                "Failed to load config from {}: {}",
                                config_path.display(),
                                e
                            );
                            continue;
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    /// Load a specific configuration file
    fn load_config_file(&self, path: &Path, format: ConfigFormat) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        match format {
            ConfigFormat::Toml => Ok(toml::from_str(&content)?),
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Get configuration file path for a specific format
    fn get_config_path_for_format(&self, base_path: &Path, format: ConfigFormat) -> PathBuf {
        base_path.join("config").with_extension(format.extension())
    }

    /// Get default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("pycalc"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("pycalc"));
            paths.push(home.join(".pycalc"));
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(".pycalc"));
        }

        paths
    }

    /// Get the default configuration path
    fn get_default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pycalc")
            .join("config.toml")
    }

    /// Get the current configuration file path
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// List all search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.session.poll_interval_ms == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "session.poll_interval_ms".to_string(),
            reason: "Poll interval must be greater than 0".to_string(),
        });
    }

    if config.session.poll_interval_ms > 1000 {
        return Err(Error::ConfigValidationFailed {
            field: "session.poll_interval_ms".to_string(),
            reason: "Poll interval cannot exceed 1 second".to_string(),
        });
    }

    if config.session.heartbeat_interval_ms == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "session.heartbeat_interval_ms".to_string(),
            reason: "Heartbeat interval must be greater than 0".to_string(),
        });
    }

    if config.watchdog.threshold_secs == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "watchdog.threshold_secs".to_string(),
            reason: "Watchdog threshold must be greater than 0".to_string(),
        });
    }

    // An idle session would otherwise look stuck
    if config.session.heartbeat_interval_ms >= config.watchdog.threshold_secs * 1000 {
        return Err(Error::ConfigValidationFailed {
            field: "session.heartbeat_interval_ms".to_string(),
            reason: "Heartbeat interval must be shorter than the watchdog threshold".to_string(),
        });
    }

    if config.watchdog.prompt_message.trim().is_empty() {
        return Err(Error::ConfigValidationFailed {
            field: "watchdog.prompt_message".to_string(),
            reason: "Prompt message cannot be empty".to_string(),
        });
    }

    if config.editor.trigger_key.trim().is_empty() {
        return Err(Error::ConfigValidationFailed {
            field: "editor.trigger_key".to_string(),
            reason: "Trigger key cannot be empty".to_string(),
        });
    }

    if let Some(program) = &config.session.worker_program {
        if program.as_os_str().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "session.worker_program".to_string(),
                reason: "Worker program cannot be an empty path".to_string(),
            });
        }
    }

    Ok(())
}
