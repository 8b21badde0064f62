use std::fmt;

use camino::Utf8Path;
use tracing::{debug, warn};

use crate::cache::{load_table, save_table};
use crate::coerce::{Coerced, Sentinel, coerce_float, coerce_int};
use crate::error::CrashError;
use crate::table::{Column, ColumnData, DATE_FORMAT, Table};

pub const BYTES_PER_MEGABYTE: f64 = 1e6;

pub const DATE_COLUMN: &str = "date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Int8,
    Int16,
    Int32,
    Float64,
    Text,
    Date,
}

pub const COMPACTION_PLAN: &[(&str, Target)] = &[
    ("p2a", Target::Date),
    ("p12", Target::Int16),
    ("p2b", Target::Int16),
    ("p14", Target::Int32),
    ("p53", Target::Int32),
    ("p37", Target::Int32),
    ("s", Target::Int32),
    ("r", Target::Int32),
    ("o", Target::Float64),
    ("p36", Target::Int8),
    ("weekdayp2a", Target::Int8),
    ("p6", Target::Int8),
    ("p7", Target::Int8),
    ("p8", Target::Int8),
    ("p9", Target::Int8),
    ("p10", Target::Int8),
    ("p11", Target::Int8),
    ("p13a", Target::Int8),
    ("p13b", Target::Int8),
    ("p13c", Target::Int8),
    ("p15", Target::Int8),
    ("p16", Target::Int8),
    ("p17", Target::Int8),
    ("p18", Target::Int8),
    ("p19", Target::Int8),
    ("p20", Target::Int8),
    ("p21", Target::Int8),
    ("p22", Target::Int8),
    ("p23", Target::Int8),
    ("p24", Target::Int8),
    ("p27", Target::Int8),
    ("p28", Target::Int8),
    ("p34", Target::Int8),
    ("p35", Target::Int8),
    ("p39", Target::Int8),
    ("p44", Target::Int8),
    ("p45a", Target::Int8),
    ("p47", Target::Int8),
    ("p48a", Target::Int8),
    ("p49", Target::Int8),
    ("p50a", Target::Int8),
    ("p50b", Target::Int8),
    ("p51", Target::Int8),
    ("p52", Target::Int8),
    ("p55a", Target::Int8),
    ("p57", Target::Int8),
    ("p58", Target::Int8),
    ("p5a", Target::Int8),
    ("j", Target::Int8),
    ("a", Target::Float64),
    ("b", Target::Float64),
    ("d", Target::Float64),
    ("e", Target::Float64),
    ("f", Target::Float64),
    ("g", Target::Float64),
    ("p1", Target::Text),
    ("h", Target::Text),
    ("i", Target::Text),
    ("k", Target::Text),
    ("l", Target::Text),
    ("p", Target::Text),
    ("q", Target::Text),
    ("t", Target::Text),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub before_bytes: usize,
    pub after_bytes: usize,
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "orig_size={:.1} MB", megabytes(self.before_bytes))?;
        write!(f, "new_size={:.1} MB", megabytes(self.after_bytes))
    }
}

pub fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MEGABYTE
}

pub fn write_snapshot(table: &Table, path: &Utf8Path) -> Result<(), CrashError> {
    save_table(path, &widen(table)?)
}

pub fn widen(table: &Table) -> Result<Table, CrashError> {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let data = match &column.data {
                ColumnData::Int8(values) => {
                    ColumnData::Int64(values.iter().map(|v| i64::from(*v)).collect())
                }
                ColumnData::Int16(values) => {
                    ColumnData::Int64(values.iter().map(|v| i64::from(*v)).collect())
                }
                ColumnData::Int32(values) => {
                    ColumnData::Int64(values.iter().map(|v| i64::from(*v)).collect())
                }
                ColumnData::Date(values) => ColumnData::Text(
                    values
                        .iter()
                        .map(|value| {
                            value
                                .map(|date| date.format(DATE_FORMAT).to_string())
                                .unwrap_or_default()
                        })
                        .collect(),
                ),
                other => other.clone(),
            };
            Column::new(column.name.clone(), data)
        })
        .collect();
    Table::from_columns(columns)
}

pub fn load_and_compact(
    path: &Utf8Path,
    verbose: bool,
) -> Result<(Table, MemoryReport), CrashError> {
    let (table, report) = compact(load_table(path)?)?;
    if verbose {
        println!("{report}");
    }
    Ok((table, report))
}

pub fn compact(mut table: Table) -> Result<(Table, MemoryReport), CrashError> {
    let before_bytes = table.deep_size_bytes();

    let source = table.require("p2a")?;
    let dates = (0..table.len()).map(|row| source.date_at(row)).collect();
    if table.column(DATE_COLUMN).is_some() {
        table.replace_column(DATE_COLUMN, ColumnData::Date(dates))?;
    } else {
        table.push_column(DATE_COLUMN, ColumnData::Date(dates))?;
    }

    for &(name, target) in COMPACTION_PLAN {
        let Some(data) = table.column(name) else {
            debug!(column = name, "not present, skipped");
            continue;
        };
        match convert(data, target) {
            Some(converted) => {
                table.replace_column(name, converted)?;
            }
            None => warn!(
                column = name,
                from = data.type_name(),
                "narrowing would change values, column kept"
            ),
        }
    }

    let after_bytes = table.deep_size_bytes();
    Ok((
        table,
        MemoryReport {
            before_bytes,
            after_bytes,
        },
    ))
}

fn convert(data: &ColumnData, target: Target) -> Option<ColumnData> {
    match target {
        Target::Int8 => narrow_int::<i8>(data).map(ColumnData::Int8),
        Target::Int16 => narrow_int::<i16>(data).map(ColumnData::Int16),
        Target::Int32 => narrow_int::<i32>(data).map(ColumnData::Int32),
        Target::Float64 => to_float(data).map(ColumnData::Float64),
        Target::Text => match data {
            ColumnData::Text(values) => Some(ColumnData::Text(
                values
                    .iter()
                    .map(|value| {
                        let mut value = value.clone();
                        value.shrink_to_fit();
                        value
                    })
                    .collect(),
            )),
            _ => None,
        },
        Target::Date => match data {
            ColumnData::Date(_) => Some(data.clone()),
            ColumnData::Text(values) => {
                let dates = (0..values.len()).map(|row| data.date_at(row)).collect::<Vec<_>>();
                let lost = dates
                    .iter()
                    .zip(values)
                    .any(|(date, raw)| date.is_none() && !raw.trim().is_empty());
                (!lost).then_some(ColumnData::Date(dates))
            }
            _ => None,
        },
    }
}

fn narrow_int<T>(data: &ColumnData) -> Option<Vec<T>>
where
    T: Sentinel + TryFrom<i64>,
{
    match data {
        ColumnData::Text(values) => values
            .iter()
            .map(|raw| {
                if raw.trim().is_empty() {
                    Some(T::sentinel())
                } else {
                    match coerce_int::<T>(raw) {
                        Coerced::Value(value) => Some(value),
                        Coerced::Sentinel => None,
                    }
                }
            })
            .collect(),
        ColumnData::Float64(_) | ColumnData::Date(_) => None,
        _ => (0..data.len())
            .map(|row| data.int_at(row).and_then(|value| T::try_from(value).ok()))
            .collect(),
    }
}

fn to_float(data: &ColumnData) -> Option<Vec<f64>> {
    match data {
        ColumnData::Float64(values) => Some(values.clone()),
        ColumnData::Text(values) => values
            .iter()
            .map(|raw| {
                let value = coerce_float(raw);
                (raw.trim().is_empty() || !value.is_sentinel()).then(|| value.resolve())
            })
            .collect(),
        ColumnData::Date(_) => None,
        _ => (0..data.len())
            .map(|row| data.int_at(row).map(|value| value as f64))
            .collect(),
    }
}
