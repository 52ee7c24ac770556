use super::types::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Service for configuration management
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(project_root: &Path) -> Self {
        let config_path = project_root.join(".vinsure").join("config.toml");
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Initialize configuration with defaults
    pub fn init(&self) -> Result<AppConfig> {
        let config = AppConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    /// Load configuration from file, with env var overrides (VINSURE_ prefix, __ separator)
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("VINSURE_").split("__"));

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Get a configuration value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let value = match key {
            "artifacts.root" => config.artifacts.root,
            "artifacts.model_file" => config.artifacts.model_file,
            "remote.bucket" => config.remote.bucket.unwrap_or_default(),
            "remote.prefix" => config.remote.prefix.unwrap_or_default(),
            "remote.region" => config.remote.region.unwrap_or_default(),
            "remote.endpoint" => config.remote.endpoint.unwrap_or_default(),
            "remote.allow_http" => config.remote.allow_http.to_string(),
            "source.uri" => config.source.uri.unwrap_or_default(),
            "source.database" => config.source.database,
            "source.collection" => config.source.collection,
            "training.test_ratio" => config.training.test_ratio.to_string(),
            "training.seed" => config.training.seed.to_string(),
            "training.min_f1" => config.training.min_f1.to_string(),
            "training.synthetic_data" => config.training.synthetic_data.to_string(),
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        };
        Ok(value)
    }

    /// Set a configuration value by dotted key
    pub fn set(&self, key: &str, value: String) -> Result<()> {
        let mut config = self.load()?;
        match key {
            "artifacts.root" => config.artifacts.root = value,
            "artifacts.model_file" => config.artifacts.model_file = value,
            "remote.bucket" => config.remote.bucket = non_empty(value),
            "remote.prefix" => config.remote.prefix = non_empty(value),
            "remote.region" => config.remote.region = non_empty(value),
            "remote.endpoint" => config.remote.endpoint = non_empty(value),
            "remote.allow_http" => {
                config.remote.allow_http = value.parse().context("Expected true or false")?
            }
            "source.uri" => config.source.uri = non_empty(value),
            "source.database" => config.source.database = value,
            "source.collection" => config.source.collection = value,
            "training.test_ratio" => {
                let ratio: f64 = value.parse().context("Expected a number")?;
                if !(ratio > 0.0 && ratio < 1.0) {
                    anyhow::bail!("training.test_ratio must be between 0 and 1");
                }
                config.training.test_ratio = ratio;
            }
            "training.seed" => config.training.seed = value.parse().context("Expected an integer")?,
            "training.min_f1" => {
                config.training.min_f1 = value.parse().context("Expected a number")?
            }
            "training.synthetic_data" => config.training.synthetic_data = value.parse()?,
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
        self.save(&config)?;
        Ok(())
    }

    /// Resolve the artifact directory against the project root
    pub fn resolve_artifact_root(&self, project_root: &Path) -> Result<PathBuf> {
        let config = self.load()?;
        Ok(resolve_artifact_root(&config, project_root))
    }

    /// Check if configuration exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

/// Artifact directory for `config`, relative paths anchored at `project_root`
pub fn resolve_artifact_root(config: &AppConfig, project_root: &Path) -> PathBuf {
    let root = Path::new(&config.artifacts.root);
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        project_root.join(root)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
