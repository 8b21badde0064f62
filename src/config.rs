use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::CrashError;

pub const DEFAULT_CONFIG_FILE: &str = "crashstat.json";
pub const DEFAULT_LISTING_URL: &str = "https://ehw.fit.vutbr.cz/izv/";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CACHE_FILENAME: &str = "data_{}.json.gz";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub cache_filename: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub listing_url: String,
    pub data_dir: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub cache_filename: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CrashError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CrashError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CrashError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CrashError> {
        let listing_url = config
            .listing_url
            .unwrap_or_else(|| DEFAULT_LISTING_URL.to_string());
        if !listing_url.starts_with("http://") && !listing_url.starts_with("https://") {
            return Err(CrashError::ConfigParse(format!(
                "listing_url must be an http(s) URL: {listing_url}"
            )));
        }

        let cache_filename = config
            .cache_filename
            .unwrap_or_else(|| DEFAULT_CACHE_FILENAME.to_string());
        if !cache_filename.contains("{}") {
            return Err(CrashError::ConfigParse(format!(
                "cache_filename must contain a {{}} placeholder: {cache_filename}"
            )));
        }

        let data_dir =
            Utf8PathBuf::from(config.data_dir.unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let cache_dir = config
            .cache_dir
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| data_dir.clone());

        Ok(ResolvedConfig {
            listing_url,
            data_dir,
            cache_dir,
            cache_filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(resolved.data_dir, Utf8PathBuf::from("data"));
        assert_eq!(resolved.cache_dir, resolved.data_dir);
        assert_eq!(resolved.cache_filename, DEFAULT_CACHE_FILENAME);
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let config = Config {
            cache_filename: Some("cache.json.gz".to_string()),
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(CrashError::ConfigParse(_))
        );
    }
}
