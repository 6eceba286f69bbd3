use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::Error;

use super::LocalCache;

/// Keeps every key in its own JSON file under one directory.
#[derive(Clone, Debug)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> FileCache {
        FileCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();

        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: String) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).await?;

        // readers never observe a partially written snapshot
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).await?;
        fs::rename(&staging, &path).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CAMPAIGNS_KEY, ENGAGEMENTS_KEY};

    #[tokio::test]
    async fn values_survive_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();

        FileCache::new(dir.path())
            .set(CAMPAIGNS_KEY, "[1,2,3]".to_string())
            .await
            .unwrap();
        let value = FileCache::new(dir.path()).get(CAMPAIGNS_KEY).await.unwrap();

        assert_eq!(value.as_deref(), Some("[1,2,3]"));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());

        cache.set(CAMPAIGNS_KEY, "[]".to_string()).await.unwrap();

        assert_eq!(cache.get(ENGAGEMENTS_KEY).await.unwrap(), None);
        assert_ne!(cache.path_for(CAMPAIGNS_KEY), cache.path_for(ENGAGEMENTS_KEY));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.set(CAMPAIGNS_KEY, "[]".to_string()).await.unwrap();

        cache.remove(CAMPAIGNS_KEY).await.unwrap();
        cache.remove(CAMPAIGNS_KEY).await.unwrap();

        assert_eq!(cache.get(CAMPAIGNS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn directory_is_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested").join("cache"));

        cache.set(CAMPAIGNS_KEY, "[]".to_string()).await.unwrap();

        assert!(cache.dir().is_dir());
    }
}
