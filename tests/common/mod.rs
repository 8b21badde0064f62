#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use encoding_rs::WINDOWS_1250;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crashstat::error::CrashError;
use crashstat::fetcher::{ArchiveSource, Fetcher};
use crashstat::parser::RegionParser;
use crashstat::store::Store;

pub const LISTING_URL: &str = "https://example.test/izv/";

/// Serves a listing page and archive bytes from memory, counting calls.
#[derive(Default)]
pub struct MockSource {
    pub listing: String,
    pub files: HashMap<String, Vec<u8>>,
    pub listing_calls: Mutex<usize>,
    pub download_calls: Mutex<usize>,
}

impl MockSource {
    pub fn with_archives(archives: &[(&str, Vec<u8>)]) -> Self {
        let buttons: Vec<String> = archives
            .iter()
            .map(|(name, _)| format!(r#"<button onclick="download('data/{name}')">{name}</button>"#))
            .collect();
        Self {
            listing: format!("<html><body>{}</body></html>", buttons.join("\n")),
            files: archives
                .iter()
                .map(|(name, bytes)| (format!("{LISTING_URL}data/{name}"), bytes.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        *self.listing_calls.lock().unwrap() + *self.download_calls.lock().unwrap()
    }
}

impl ArchiveSource for MockSource {
    fn fetch_text(&self, url: &str) -> Result<String, CrashError> {
        *self.listing_calls.lock().unwrap() += 1;
        if url == LISTING_URL {
            Ok(self.listing.clone())
        } else {
            Err(CrashError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), CrashError> {
        *self.download_calls.lock().unwrap() += 1;
        let bytes = self.files.get(url).ok_or_else(|| CrashError::HttpStatus {
            status: 404,
            url: url.to_string(),
        })?;
        fs::write(destination, bytes).map_err(|err| CrashError::Filesystem(err.to_string()))
    }
}

/// One raw row: 64 quoted fields, the key first.
pub fn row(key: &str, fields: &[(usize, &str)]) -> String {
    let mut values = vec![String::new(); 64];
    values[0] = key.to_string();
    for (index, value) in fields {
        values[*index] = value.to_string();
    }
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn csv(rows: &[String]) -> Vec<u8> {
    let text = rows.join("\r\n") + "\r\n";
    let (bytes, _, _) = WINDOWS_1250.encode(&text);
    bytes.into_owned()
}

pub fn zip_bytes(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn scratch() -> (TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

/// Two yearly archives. JHM (06) appears in both, with key `060001`
/// repeated; VYS (16) only in the first; 2017 has no VYS member.
pub fn fixture_archives() -> Vec<(&'static str, Vec<u8>)> {
    let jhm_2016 = csv(&[
        row("060001", &[(1, "1"), (3, "2016-03-01"), (43, "4"), (47, "-600000,5"), (48, "-1160000")]),
        row("060002", &[(1, "0"), (3, "2016-07-15"), (43, "1"), (47, ""), (48, "")]),
    ]);
    let vys_2016 = csv(&[row(
        "160001",
        &[(1, "2"), (3, "2016-05-05"), (43, "-1")],
    )]);
    let jhm_2017 = csv(&[
        row("060001", &[(1, "9"), (3, "2017-01-01")]),
        row("060003", &[(1, "1"), (3, "2017-02-02"), (43, "5")]),
    ]);
    vec![
        (
            "data-2016.zip",
            zip_bytes(&[("06.csv", jhm_2016), ("16.csv", vys_2016)]),
        ),
        ("data-2017.zip", zip_bytes(&[("06.csv", jhm_2017)])),
    ]
}

pub fn write_archives(dir: &Utf8Path, archives: &[(&str, Vec<u8>)]) {
    fs::create_dir_all(dir.as_std_path()).unwrap();
    for (name, bytes) in archives {
        fs::write(dir.join(name).as_std_path(), bytes).unwrap();
    }
}

pub fn parser(source: MockSource, data_dir: &Utf8Path, cache_dir: &Utf8Path) -> RegionParser<MockSource> {
    RegionParser::new(
        Fetcher::new(source, LISTING_URL),
        Store::new_with_paths(data_dir.to_path_buf(), cache_dir.to_path_buf(), "data_{}.json.gz"),
    )
}
