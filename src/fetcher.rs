use std::fs::File;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::CrashError;

static DOWNLOAD_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)download\('(.*?)'\)").expect("download handler pattern is valid")
});

pub trait ArchiveSource {
    fn fetch_text(&self, url: &str) -> Result<String, CrashError>;
    fn download(&self, url: &str, destination: &Path) -> Result<(), CrashError>;
}

#[derive(Clone)]
pub struct HttpArchiveSource {
    client: Client,
}

impl HttpArchiveSource {
    pub fn new() -> Result<Self, CrashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("crashstat/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CrashError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| CrashError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, CrashError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CrashError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CrashError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn fetch_text(&self, url: &str) -> Result<String, CrashError> {
        self.get(url)?
            .text()
            .map_err(|err| CrashError::Http(err.to_string()))
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), CrashError> {
        let mut response = self.get(url)?;
        let mut file =
            File::create(destination).map_err(|err| CrashError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| CrashError::Http(err.to_string()))?;
        Ok(())
    }
}

pub struct Fetcher<S> {
    source: S,
    listing_url: String,
}

impl<S: ArchiveSource> Fetcher<S> {
    pub fn new(source: S, listing_url: impl Into<String>) -> Self {
        Self {
            source,
            listing_url: listing_url.into(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn download_archives(&self, target: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CrashError> {
        let page = self.source.fetch_text(&self.listing_url)?;
        std::fs::create_dir_all(target.as_std_path())
            .map_err(|err| CrashError::Filesystem(err.to_string()))?;

        let mut written = Vec::new();
        for relative in extract_download_paths(&page)? {
            let Some(file_name) = archive_file_name(&relative) else {
                debug!(path = %relative, "skipping link without file name");
                continue;
            };
            let url = resolve_url(&self.listing_url, &relative)?;
            let destination = target.join(file_name);
            info!(file = file_name, "downloading");
            self.source.download(&url, destination.as_std_path())?;
            info!(file = file_name, "completed download");
            written.push(destination);
        }
        Ok(written)
    }
}

pub fn extract_download_paths(html: &str) -> Result<Vec<String>, CrashError> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse("button").map_err(|err| CrashError::Listing(err.to_string()))?;
    Ok(document
        .select(&selector)
        .filter_map(|button| button.value().attr("onclick"))
        .filter_map(|handler| DOWNLOAD_HANDLER.captures(handler))
        .filter_map(|captures| captures.get(1))
        .map(|path| path.as_str().trim().to_string())
        .filter(|path| !path.is_empty())
        .collect())
}

pub fn resolve_url(base: &str, relative: &str) -> Result<String, CrashError> {
    let base = Url::parse(base).map_err(|err| CrashError::Listing(err.to_string()))?;
    base.join(relative)
        .map(|url| url.to_string())
        .map_err(|err| CrashError::Listing(format!("{relative}: {err}")))
}

pub fn archive_file_name(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|name| !name.is_empty())
}
