use super::{ArtifactStore, StoreError, StoreResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Filesystem artifact store rooted at the artifact directory.
///
/// Layout is `<root>/<slot>/<file>`, e.g. `artifact/production_model/model.pkl`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Write `bytes` to a temporary file beside the target of `key`.
    ///
    /// The target is untouched until [`StagedWrite::commit`].
    pub fn stage(&self, key: &str, bytes: &[u8]) -> StoreResult<StagedWrite> {
        let target = self.path_for(key);
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        std::fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;
        let mut file = NamedTempFile::new_in(&parent).map_err(|e| io_error(&parent, e))?;
        file.write_all(bytes).map_err(|e| io_error(file.path(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| io_error(file.path(), e))?;

        Ok(StagedWrite { file, target })
    }
}

/// A fully written temporary file waiting to be renamed over its target.
///
/// Dropping it without calling `commit` deletes the temporary file.
#[derive(Debug)]
pub struct StagedWrite {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically replace the target with the staged content
    pub fn commit(self) -> StoreResult<()> {
        let target = self.target;
        self.file
            .persist(&target)
            .map_err(|e| io_error(&target, e.error))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait::async_trait]
impl ArtifactStore for LocalStore {
    fn identifier(&self) -> String {
        "local".to_string()
    }

    fn location(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }

    async fn probe(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))
    }

    async fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let store = self.clone();
        let owned_key = key.to_string();
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || store.stage(&owned_key, &bytes)?.commit())
            .await
            .map_err(|e| io_error(&self.path_for(key), std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "production_model/model.pkl";

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_then_read_returns_identical_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let bytes: Vec<u8> = (0..=255).collect();

        store.write(KEY, &bytes).await.unwrap();

        assert_eq!(store.read(KEY).await.unwrap(), bytes);
        assert!(temp_dir.path().join(KEY).exists());
    }

    #[tokio::test]
    async fn read_missing_key_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        let err = store.read(KEY).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn exists_tracks_writes() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        assert!(!store.exists(KEY).await.unwrap());
        store.write(KEY, b"model").await.unwrap();
        assert!(store.exists(KEY).await.unwrap());
    }

    #[tokio::test]
    async fn write_replaces_existing_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        store.write(KEY, b"first").await.unwrap();
        store.write(KEY, b"second").await.unwrap();

        assert_eq!(store.read(KEY).await.unwrap(), b"second");
        assert_eq!(
            entries(&temp_dir.path().join("production_model")),
            vec!["model.pkl"]
        );
    }

    #[tokio::test]
    async fn dropped_stage_leaves_target_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        store.write(KEY, b"stable").await.unwrap();

        let staged = store.stage(KEY, b"half-finished").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        assert_eq!(store.read(KEY).await.unwrap(), b"stable");

        drop(staged);

        assert!(!temp_path.exists());
        assert_eq!(store.read(KEY).await.unwrap(), b"stable");
        assert_eq!(
            entries(&temp_dir.path().join("production_model")),
            vec!["model.pkl"]
        );
    }

    #[test]
    fn commit_moves_staged_content_into_place() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());

        let staged = store.stage(KEY, b"new").unwrap();
        assert_eq!(staged.target(), temp_dir.path().join(KEY));
        staged.commit().unwrap();

        assert_eq!(std::fs::read(temp_dir.path().join(KEY)).unwrap(), b"new");
    }

    #[tokio::test]
    async fn write_under_a_file_reports_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = LocalStore::new(&blocker);

        let err = store.write(KEY, b"model").await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn location_is_the_file_path() {
        let store = LocalStore::new("artifact");
        assert_eq!(
            store.location(KEY),
            Path::new("artifact").join(KEY).display().to_string()
        );
    }
}
