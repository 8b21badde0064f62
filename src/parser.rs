use std::collections::HashSet;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::WINDOWS_1250;
use tracing::{debug, info};

use crate::catalog::RETAINED_COLUMNS;
use crate::coerce::{coerce_float, coerce_int, coerce_text, normalize_field};
use crate::domain::{ColumnKind, RegionCode};
use crate::error::CrashError;
use crate::fetcher::{ArchiveSource, Fetcher};
use crate::fs_util::read_zip_member;
use crate::store::Store;
use crate::table::{Column, ColumnData, Table};

pub struct RegionParser<S> {
    fetcher: Fetcher<S>,
    store: Store,
}

impl<S: ArchiveSource> RegionParser<S> {
    pub fn new(fetcher: Fetcher<S>, store: Store) -> Self {
        Self { fetcher, store }
    }

    pub fn fetcher(&self) -> &Fetcher<S> {
        &self.fetcher
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ensure_archives(&self) -> Result<(), CrashError> {
        if self.store.data_dir_is_empty()? {
            info!(dir = %self.store.data_dir(), "data directory empty, downloading archives");
            self.fetcher.download_archives(self.store.data_dir())?;
        }
        Ok(())
    }

    pub fn parse_region(&self, region: RegionCode) -> Result<Table, CrashError> {
        self.ensure_archives()?;
        let mut builder = RegionTableBuilder::new();
        for archive in self.store.list_archives()? {
            builder.add_archive(region, &archive)?;
        }
        builder.finish()
    }
}

// Accumulates rows from any number of archives, keeping the first row seen
// for each record key.
pub struct RegionTableBuilder {
    seen: HashSet<String>,
    buffers: Vec<Buffer>,
}

impl Default for RegionTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionTableBuilder {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            buffers: RETAINED_COLUMNS
                .iter()
                .map(|spec| Buffer::new(spec.kind))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn add_archive(&mut self, region: RegionCode, path: &Utf8Path) -> Result<usize, CrashError> {
        let member = region.csv_member();
        let Some(bytes) = read_zip_member(path.as_std_path(), &member)? else {
            debug!(archive = %path, member = %member, "member missing, archive skipped");
            return Ok(0);
        };
        let added = self.add_csv(&bytes)?;
        debug!(archive = %path, member = %member, rows = added, "archive parsed");
        Ok(added)
    }

    pub fn add_csv(&mut self, bytes: &[u8]) -> Result<usize, CrashError> {
        let (text, _) = WINDOWS_1250.decode_without_bom_handling(bytes);
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut added = 0;
        for record in reader.records() {
            let record = record.map_err(|err| CrashError::Csv(err.to_string()))?;
            if self.push_record(&record) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn push_record(&mut self, record: &StringRecord) -> bool {
        let Some(key) = record.get(0) else {
            return false;
        };
        if record.len() == 1 && key.is_empty() {
            return false;
        }
        if !self.seen.insert(key.to_string()) {
            return false;
        }
        for (spec, buffer) in RETAINED_COLUMNS.iter().zip(self.buffers.iter_mut()) {
            let raw = normalize_field(record.get(spec.source_index).unwrap_or(""));
            buffer.push(&raw);
        }
        true
    }

    pub fn finish(self) -> Result<Table, CrashError> {
        let columns = RETAINED_COLUMNS
            .iter()
            .zip(self.buffers)
            .map(|(spec, buffer)| Column::new(spec.name, buffer.into_data()))
            .collect();
        Table::from_columns(columns)
    }
}

enum Buffer {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Float64(Vec<f64>),
    Text { width: usize, values: Vec<String> },
}

impl Buffer {
    fn new(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Int8 => Buffer::Int8(Vec::new()),
            ColumnKind::Int16 => Buffer::Int16(Vec::new()),
            ColumnKind::Float64 => Buffer::Float64(Vec::new()),
            ColumnKind::Text { width } => Buffer::Text {
                width,
                values: Vec::new(),
            },
        }
    }

    fn push(&mut self, raw: &str) {
        match self {
            Buffer::Int8(values) => values.push(coerce_int::<i8>(raw).resolve()),
            Buffer::Int16(values) => values.push(coerce_int::<i16>(raw).resolve()),
            Buffer::Float64(values) => values.push(coerce_float(raw).resolve()),
            Buffer::Text { width, values } => values.push(coerce_text(raw, *width)),
        }
    }

    fn into_data(self) -> ColumnData {
        match self {
            Buffer::Int8(values) => ColumnData::Int8(values),
            Buffer::Int16(values) => ColumnData::Int16(values),
            Buffer::Float64(values) => ColumnData::Float64(values),
            Buffer::Text { values, .. } => ColumnData::Text(values),
        }
    }
}
