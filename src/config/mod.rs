use crate::models::AppConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name of the settings file inside the configuration directory.
pub const SETTINGS_FILE: &str = "Settings.yaml";

/// Configuration manager for loading and saving `Settings.yaml`.
///
/// Loading layers the file over [`AppConfig::default`] with the `config`
/// crate, so a missing file or missing keys fall back to defaults. Nothing is
/// written to disk unless [`save_config`](Self::save_config) is called.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `config_dir` (e.g., "Progress Bar Thread Data").
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        Self {
            config_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        }
    }

    /// Load settings, falling back to defaults for anything not in the file.
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            tracing::info!(
                "Settings file not found at {}, using defaults",
                self.config_path
            );
        }

        let defaults = ::config::Config::try_from(&AppConfig::default())
            .context("Failed to build default settings")?;

        let layered = ::config::Config::builder()
            .add_source(defaults)
            .add_source(
                ::config::File::new(self.config_path.as_str(), ::config::FileFormat::Yaml)
                    .required(false),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.config_path))?;

        let config: AppConfig = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.config_path))?;

        config
            .settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", self.config_path))?;

        tracing::debug!("Settings resolved: {:?}", config.settings);
        Ok(config)
    }

    /// Save settings, creating the configuration directory if needed.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).with_context(|| {
                format!("Failed to create config directory: {}", self.config_dir)
            })?;
        }

        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize settings to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.config_path))?;

        tracing::info!("Saved settings to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the settings file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
