use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::config::ResolvedConfig;
use crate::domain::RegionCode;
use crate::error::CrashError;
use crate::fs_util::is_zip_file;

#[derive(Debug, Clone)]
pub struct Store {
    data_dir: Utf8PathBuf,
    cache_dir: Utf8PathBuf,
    cache_filename: String,
}

impl Store {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self::new_with_paths(
            config.data_dir.clone(),
            config.cache_dir.clone(),
            config.cache_filename.clone(),
        )
    }

    pub fn new_with_paths(
        data_dir: Utf8PathBuf,
        cache_dir: Utf8PathBuf,
        cache_filename: impl Into<String>,
    ) -> Self {
        Self {
            data_dir,
            cache_dir,
            cache_filename: cache_filename.into(),
        }
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Utf8Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, region: RegionCode) -> Utf8PathBuf {
        self.cache_dir
            .join(self.cache_filename.replace("{}", region.as_str()))
    }

    pub fn ensure_cache_dir(&self) -> Result<(), CrashError> {
        fs::create_dir_all(self.cache_dir.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))
    }

    pub fn data_dir_is_empty(&self) -> Result<bool, CrashError> {
        if !self.data_dir.as_std_path().is_dir() {
            return Ok(true);
        }
        let mut entries = fs::read_dir(self.data_dir.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))?;
        Ok(entries.next().is_none())
    }

    // Zip archives in the data directory, sorted by file name so that
    // first-occurrence deduplication is reproducible.
    pub fn list_archives(&self) -> Result<Vec<Utf8PathBuf>, CrashError> {
        let entries = fs::read_dir(self.data_dir.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))?;
        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| CrashError::Filesystem(err.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|path| CrashError::Filesystem(format!("non-utf8 path {}", path.display())))?;
            if path.as_std_path().is_file() && is_zip_file(path.as_std_path())? {
                archives.push(path);
            }
        }
        archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(archives)
    }

    pub fn write_atomic<F>(path: &Utf8Path, write: F) -> Result<(), CrashError>
    where
        F: FnOnce(&mut fs::File) -> Result<(), CrashError>,
    {
        let parent = path
            .parent()
            .ok_or_else(|| CrashError::Filesystem("invalid destination path".to_string()))?;
        let parent = if parent.as_str().is_empty() {
            Utf8Path::new(".")
        } else {
            parent
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("crashstat-write")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))?;
        write(temp.as_file_mut())?;
        temp.persist(path.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_path_substitutes_region() {
        let store = Store::new_with_paths(
            Utf8PathBuf::from("data"),
            Utf8PathBuf::from("cache"),
            "data_{}.json.gz",
        );
        let jhm: RegionCode = "JHM".parse().unwrap();
        assert_eq!(store.cache_path(jhm), Utf8PathBuf::from("cache/data_JHM.json.gz"));
    }

    #[test]
    fn missing_data_dir_counts_as_empty() {
        let temp = tempfile::tempdir().unwrap();
        let data_dir = Utf8PathBuf::from_path_buf(temp.path().join("nope")).unwrap();
        let store = Store::new_with_paths(data_dir.clone(), data_dir, "data_{}.json.gz");
        assert!(store.data_dir_is_empty().unwrap());
    }
}
