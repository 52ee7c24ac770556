use super::{ArtifactStore, LocalStore, RemoteStore};
use crate::services::RemoteConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Backend a session settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Remote,
    Local,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Remote => write!(f, "remote"),
            Backend::Local => write!(f, "local"),
        }
    }
}

/// Artifact store selection for the lifetime of one process or pipeline run.
///
/// The remote candidate is probed once, on first use. If the probe fails the
/// session uses the local store from then on and never re-probes.
pub struct StoreSession {
    remote: Option<Arc<dyn ArtifactStore>>,
    local: Arc<LocalStore>,
    selected: OnceCell<Backend>,
}

impl StoreSession {
    pub fn new(remote: Option<Arc<dyn ArtifactStore>>, local: LocalStore) -> Self {
        Self {
            remote,
            local: Arc::new(local),
            selected: OnceCell::new(),
        }
    }

    pub fn local_only(local: LocalStore) -> Self {
        Self::new(None, local)
    }

    /// S3 when a bucket is configured, otherwise local only.
    ///
    /// Never fails: a client that cannot be built is treated as unreachable.
    pub fn from_config(remote: &RemoteConfig, artifact_root: impl Into<PathBuf>) -> Self {
        let remote_store = match remote.bucket {
            Some(_) => match RemoteStore::s3(remote) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn ArtifactStore>),
                Err(e) => {
                    warn!(error = %e, "Could not build remote artifact store, using local storage");
                    None
                }
            },
            None => None,
        };
        Self::new(remote_store, LocalStore::new(artifact_root))
    }

    /// Resolve (once) which backend this session uses
    pub async fn backend(&self) -> Backend {
        *self
            .selected
            .get_or_init(|| async {
                match &self.remote {
                    None => {
                        info!("No remote artifact store configured, using local storage");
                        Backend::Local
                    }
                    Some(remote) => match remote.probe().await {
                        Ok(()) => {
                            info!(store = %remote.identifier(), "Using remote artifact store");
                            Backend::Remote
                        }
                        Err(e) => {
                            warn!(
                                store = %remote.identifier(),
                                error = %e,
                                "Remote artifact store unreachable, using local storage"
                            );
                            Backend::Local
                        }
                    },
                }
            })
            .await
    }

    /// The store writes go to
    pub async fn active(&self) -> Arc<dyn ArtifactStore> {
        match self.reachable_remote().await {
            Some(remote) => remote,
            None => self.local.clone(),
        }
    }

    /// The remote store, if configured and reachable
    pub async fn reachable_remote(&self) -> Option<Arc<dyn ArtifactStore>> {
        match (self.backend().await, &self.remote) {
            (Backend::Remote, Some(remote)) => Some(remote.clone()),
            _ => None,
        }
    }

    pub fn local(&self) -> Arc<LocalStore> {
        self.local.clone()
    }

    /// Stores in read-fallback order: reachable remote first, then local
    pub async fn tiers(&self) -> Vec<Arc<dyn ArtifactStore>> {
        let mut tiers = Vec::with_capacity(2);
        if let Some(remote) = self.reachable_remote().await {
            tiers.push(remote);
        }
        tiers.push(self.local.clone() as Arc<dyn ArtifactStore>);
        tiers
    }
}
