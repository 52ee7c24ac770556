use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use vinsure::services::{resolve_artifact_root, AppConfig, ConfigService};
use vinsure::source::DocumentSource;
use vinsure::storage::StoreSession;

/// Initialized project in the working directory
pub struct Project {
    pub config: AppConfig,
    pub artifact_root: PathBuf,
}

impl Project {
    pub fn load() -> Result<Self> {
        let project_root = PathBuf::from(".");
        let config_service = ConfigService::new(&project_root);

        if !config_service.exists() {
            return Err(anyhow::anyhow!(
                "vinsure not initialized. Run 'vinsure init' first."
            ));
        }

        let config = config_service.load()?;
        let artifact_root = resolve_artifact_root(&config, &project_root);
        Ok(Self {
            config,
            artifact_root,
        })
    }

    pub fn session(&self) -> Arc<StoreSession> {
        Arc::new(StoreSession::from_config(
            &self.config.remote,
            &self.artifact_root,
        ))
    }

    pub async fn source(&self) -> Arc<DocumentSource> {
        Arc::new(DocumentSource::from_config(&self.config.source, &self.config.training).await)
    }

    pub fn model_file(&self) -> &str {
        &self.config.artifacts.model_file
    }
}
