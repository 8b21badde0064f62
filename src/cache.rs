use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::time::Instant;

use camino::Utf8Path;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::info;

use crate::catalog::REGION_COLUMN;
use crate::domain::RegionCode;
use crate::error::CrashError;
use crate::fetcher::ArchiveSource;
use crate::parser::RegionParser;
use crate::store::Store;
use crate::table::{ColumnData, Table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub parsed: usize,
    pub loaded: usize,
    pub memo_hits: usize,
}

pub struct RegionCache<S> {
    parser: RegionParser<S>,
    fetched: HashMap<RegionCode, Table>,
    stats: CacheStats,
}

impl<S: ArchiveSource> RegionCache<S> {
    pub fn new(parser: RegionParser<S>) -> Self {
        Self {
            parser,
            fetched: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn parser(&self) -> &RegionParser<S> {
        &self.parser
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn is_fetched(&self, region: RegionCode) -> bool {
        self.fetched.contains_key(&region)
    }

    pub fn get_region(&mut self, region: RegionCode) -> Result<&Table, CrashError> {
        let start = Instant::now();
        let (table, origin) = match self.fetched.entry(region) {
            Entry::Occupied(entry) => {
                self.stats.memo_hits += 1;
                (entry.into_mut(), "memory")
            }
            Entry::Vacant(entry) => {
                let (table, origin) = resolve(&self.parser, &mut self.stats, region)?;
                (entry.insert(table), origin)
            }
        };
        info!(
            region = %region,
            origin,
            rows = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "region ready"
        );
        Ok(table)
    }

    pub fn get_regions(&mut self, codes: &[RegionCode]) -> Result<Table, CrashError> {
        let requested: BTreeSet<RegionCode> = if codes.is_empty() {
            RegionCode::all().collect()
        } else {
            codes.iter().copied().collect()
        };

        let mut parts = Vec::with_capacity(requested.len());
        for region in requested {
            let mut table = self.get_region(region)?.clone();
            let tags = vec![region.as_str().to_string(); table.len()];
            table.push_column(REGION_COLUMN, ColumnData::Text(tags))?;
            parts.push(table);
        }
        Table::concat(parts)
    }
}

fn resolve<S: ArchiveSource>(
    parser: &RegionParser<S>,
    stats: &mut CacheStats,
    region: RegionCode,
) -> Result<(Table, &'static str), CrashError> {
    let store: &Store = parser.store();
    let path = store.cache_path(region);
    if path.as_std_path().exists() {
        let table = load_table(&path)?;
        stats.loaded += 1;
        return Ok((table, "cache"));
    }

    let table = parser.parse_region(region)?;
    stats.parsed += 1;
    store.ensure_cache_dir()?;
    save_table(&path, &table)?;
    Ok((table, "parse"))
}

pub fn save_table(path: &Utf8Path, table: &Table) -> Result<(), CrashError> {
    let encode_error = |message: String| CrashError::CacheEncode {
        path: path.as_std_path().to_path_buf(),
        message,
    };
    Store::write_atomic(path, |file| {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, table).map_err(|err| encode_error(err.to_string()))?;
        let mut writer = encoder
            .finish()
            .map_err(|err| encode_error(err.to_string()))?;
        writer.flush().map_err(|err| encode_error(err.to_string()))
    })
}

pub fn load_table(path: &Utf8Path) -> Result<Table, CrashError> {
    let decode_error = |message: String| CrashError::CacheDecode {
        path: path.as_std_path().to_path_buf(),
        message,
    };
    let file = File::open(path.as_std_path()).map_err(|err| decode_error(err.to_string()))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    serde_json::from_reader(decoder).map_err(|err| decode_error(err.to_string()))
}
