use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{ArchiveCipher, ColdStore, ColdStoreError, prepare_payload};
use crate::config::FilesystemArchiveConfig;

/// Filesystem cold storage backend.
///
/// Archives are stored as `{base_path}/{key}`, with one directory level per
/// key segment.
pub struct FilesystemColdStore {
    config: FilesystemArchiveConfig,
    cipher: Option<ArchiveCipher>,
}

impl FilesystemColdStore {
    pub fn new(
        config: FilesystemArchiveConfig,
        cipher: Option<ArchiveCipher>,
    ) -> Result<Self, ColdStoreError> {
        let store = Self { config, cipher };

        if store.config.create_dir {
            let path = Path::new(&store.config.path);
            if !path.exists() {
                info!(path = %store.config.path, "Creating cold storage directory");
                std::fs::create_dir_all(path)?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(
                        path,
                        std::fs::Permissions::from_mode(store.config.dir_mode),
                    )?;
                }
            }
        }

        Ok(store)
    }

    /// Resolve `key` under the base directory, rejecting keys that would
    /// escape it.
    fn archive_path(&self, key: &str) -> Result<PathBuf, ColdStoreError> {
        let relative = Path::new(key);
        let well_formed = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(ColdStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.config.archive_path(key))
    }

    async fn create_parent_dirs(&self, path: &Path) -> Result<(), ColdStoreError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if tokio::fs::try_exists(parent).await? {
            return Ok(());
        }

        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(self.config.dir_mode);
        builder.create(parent).await?;
        Ok(())
    }
}

#[async_trait]
impl ColdStore for FilesystemColdStore {
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    async fn put(&self, key: &str, payload: Vec<u8>, encrypt: bool) -> Result<(), ColdStoreError> {
        let path = self.archive_path(key)?;
        let content = prepare_payload(self.cipher.as_ref(), payload, encrypt)?;
        debug!(key, path = %path.display(), size = content.len(), "Archiving revision to filesystem");

        self.create_parent_dirs(&path).await?;

        // Write to a temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &temp_path,
                std::fs::Permissions::from_mode(self.config.file_mode),
            )
            .await?;
        }

        tokio::fs::rename(&temp_path, &path).await?;

        debug!(key, path = %path.display(), "Revision archived");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::ARCHIVE_KEY_LEN;

    fn store_in(dir: &TempDir, cipher: Option<ArchiveCipher>) -> FilesystemColdStore {
        FilesystemColdStore::new(
            FilesystemArchiveConfig {
                path: dir.path().to_string_lossy().to_string(),
                ..Default::default()
            },
            cipher,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_writes_nested_path() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir, None);

        store
            .put("3/7/default/web/1", b"{}".to_vec(), false)
            .await
            .unwrap();

        let written = std::fs::read(temp_dir.path().join("3/7/default/web/1")).unwrap();
        assert_eq!(written, b"{}");
        assert!(!temp_dir.path().join("3/7/default/web/1.tmp").exists());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir, None);

        store.put("1/1/ns/rel/2", b"first".to_vec(), false).await.unwrap();
        store.put("1/1/ns/rel/2", b"second".to_vec(), false).await.unwrap();

        let written = std::fs::read(temp_dir.path().join("1/1/ns/rel/2")).unwrap();
        assert_eq!(written, b"second");
    }

    #[tokio::test]
    async fn test_put_encrypted() {
        let temp_dir = TempDir::new().unwrap();
        let cipher = ArchiveCipher::new(&[9u8; ARCHIVE_KEY_LEN]);
        let store = store_in(&temp_dir, Some(cipher.clone()));

        store
            .put("1/1/ns/rel/2", b"manifest".to_vec(), true)
            .await
            .unwrap();

        let written = std::fs::read(temp_dir.path().join("1/1/ns/rel/2")).unwrap();
        assert_ne!(written, b"manifest");
        assert_eq!(cipher.open(&written).unwrap(), b"manifest");
    }

    #[tokio::test]
    async fn test_encrypt_without_key_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir, None);

        let err = store
            .put("1/1/ns/rel/2", b"manifest".to_vec(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ColdStoreError::MissingKey));
        assert!(!temp_dir.path().join("1/1/ns/rel/2").exists());
    }

    #[tokio::test]
    async fn test_escaping_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir, None);

        for key in ["../outside", "/etc/passwd", "1/1/../../x", ""] {
            let err = store.put(key, b"x".to_vec(), false).await.unwrap_err();
            assert!(matches!(err, ColdStoreError::InvalidKey(_)), "{key}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir, None);
        store.put("1/1/ns/rel/2", b"x".to_vec(), false).await.unwrap();

        let mode = std::fs::metadata(temp_dir.path().join("1/1/ns/rel/2"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
