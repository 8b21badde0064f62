use std::mem::size_of;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CrashError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float64(#[serde(with = "nan_as_null")] Vec<f64>),
    Text(Vec<String>),
    Date(Vec<Option<NaiveDate>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(values) => values.len(),
            ColumnData::Int16(values) => values.len(),
            ColumnData::Int32(values) => values.len(),
            ColumnData::Int64(values) => values.len(),
            ColumnData::Float64(values) => values.len(),
            ColumnData::Text(values) => values.len(),
            ColumnData::Date(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::Int8(_) => "int8",
            ColumnData::Int16(_) => "int16",
            ColumnData::Int32(_) => "int32",
            ColumnData::Int64(_) => "int64",
            ColumnData::Float64(_) => "float64",
            ColumnData::Text(_) => "text",
            ColumnData::Date(_) => "date",
        }
    }

    pub fn int_at(&self, row: usize) -> Option<i64> {
        match self {
            ColumnData::Int8(values) => values.get(row).map(|v| i64::from(*v)),
            ColumnData::Int16(values) => values.get(row).map(|v| i64::from(*v)),
            ColumnData::Int32(values) => values.get(row).map(|v| i64::from(*v)),
            ColumnData::Int64(values) => values.get(row).copied(),
            _ => None,
        }
    }

    // Float value at `row`; NaN sentinels come back as `None`.
    pub fn float_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnData::Float64(values) => values.get(row).copied().filter(|v| !v.is_nan()),
            _ => None,
        }
    }

    pub fn text_at(&self, row: usize) -> Option<&str> {
        match self {
            ColumnData::Text(values) => values.get(row).map(String::as_str),
            _ => None,
        }
    }

    pub fn date_at(&self, row: usize) -> Option<NaiveDate> {
        match self {
            ColumnData::Date(values) => values.get(row).copied().flatten(),
            ColumnData::Text(values) => values
                .get(row)
                .and_then(|value| NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()),
            _ => None,
        }
    }

    pub fn filter(&self, mask: &[bool]) -> ColumnData {
        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, flag)| **flag)
                .map(|(value, _)| value.clone())
                .collect()
        }
        match self {
            ColumnData::Int8(values) => ColumnData::Int8(keep(values, mask)),
            ColumnData::Int16(values) => ColumnData::Int16(keep(values, mask)),
            ColumnData::Int32(values) => ColumnData::Int32(keep(values, mask)),
            ColumnData::Int64(values) => ColumnData::Int64(keep(values, mask)),
            ColumnData::Float64(values) => ColumnData::Float64(keep(values, mask)),
            ColumnData::Text(values) => ColumnData::Text(keep(values, mask)),
            ColumnData::Date(values) => ColumnData::Date(keep(values, mask)),
        }
    }

    pub fn extend(&mut self, other: ColumnData) -> Result<(), ColumnData> {
        match (self, other) {
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a.extend(b),
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend(b),
            (ColumnData::Date(a), ColumnData::Date(b)) => a.extend(b),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    pub fn deep_size_bytes(&self) -> usize {
        match self {
            ColumnData::Int8(values) => values.len() * size_of::<i8>(),
            ColumnData::Int16(values) => values.len() * size_of::<i16>(),
            ColumnData::Int32(values) => values.len() * size_of::<i32>(),
            ColumnData::Int64(values) => values.len() * size_of::<i64>(),
            ColumnData::Float64(values) => values.len() * size_of::<f64>(),
            ColumnData::Text(values) => values
                .iter()
                .map(|value| size_of::<String>() + value.capacity())
                .sum(),
            ColumnData::Date(values) => values.len() * size_of::<Option<NaiveDate>>(),
        }
    }

    pub fn values_eq(&self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a == b,
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a == b,
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a == b,
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a == b,
            (ColumnData::Float64(a), ColumnData::Float64(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
            }
            (ColumnData::Text(a), ColumnData::Text(b)) => a == b,
            (ColumnData::Date(a), ColumnData::Date(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, CrashError> {
        if let Some(first) = columns.first() {
            let rows = first.data.len();
            if let Some(column) = columns.iter().find(|column| column.data.len() != rows) {
                return Err(CrashError::SchemaMismatch(format!(
                    "column {} has {} rows, expected {rows}",
                    column.name,
                    column.data.len()
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn concat<I>(tables: I) -> Result<Self, CrashError>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut tables = tables.into_iter();
        let Some(mut result) = tables.next() else {
            return Ok(Table::default());
        };
        for table in tables {
            result.append(table)?;
        }
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.columns.first().map(|column| column.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.data)
    }

    pub fn require(&self, name: &str) -> Result<&ColumnData, CrashError> {
        self.column(name)
            .ok_or_else(|| CrashError::MissingColumn(name.to_string()))
    }

    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<(), CrashError> {
        let name = name.into();
        if !self.columns.is_empty() && data.len() != self.len() {
            return Err(CrashError::SchemaMismatch(format!(
                "column {name} has {} rows, expected {}",
                data.len(),
                self.len()
            )));
        }
        if self.column(&name).is_some() {
            return Err(CrashError::SchemaMismatch(format!("duplicate column {name}")));
        }
        self.columns.push(Column::new(name, data));
        Ok(())
    }

    pub fn replace_column(&mut self, name: &str, data: ColumnData) -> Result<ColumnData, CrashError> {
        let rows = self.len();
        let column = self
            .columns
            .iter_mut()
            .find(|column| column.name == name)
            .ok_or_else(|| CrashError::MissingColumn(name.to_string()))?;
        if data.len() != rows {
            return Err(CrashError::SchemaMismatch(format!(
                "column {name} has {} rows, expected {rows}",
                data.len()
            )));
        }
        Ok(std::mem::replace(&mut column.data, data))
    }

    pub fn append(&mut self, other: Table) -> Result<(), CrashError> {
        if self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns.is_empty() {
            return Ok(());
        }
        if self.column_names() != other.column_names() {
            return Err(CrashError::SchemaMismatch(
                "column names differ between tables".to_string(),
            ));
        }
        for (mine, theirs) in self.columns.iter_mut().zip(other.columns) {
            let name = theirs.name;
            mine.data.extend(theirs.data).map_err(|data| {
                CrashError::SchemaMismatch(format!(
                    "column {name}: cannot append {} to {}",
                    data.type_name(),
                    mine.data.type_name()
                ))
            })?;
        }
        Ok(())
    }

    pub fn filter_rows(&self, mask: &[bool]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|column| Column::new(column.name.clone(), column.data.filter(mask)))
                .collect(),
        }
    }

    pub fn deep_size_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.name.capacity() + column.data.deep_size_bytes())
            .sum()
    }

    pub fn values_eq(&self, other: &Table) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.data.values_eq(&b.data))
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            values
                .iter()
                .map(|value| if value.is_nan() { None } else { Some(*value) }),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("id", ColumnData::Text(vec!["a".into(), "b".into(), "c".into()])),
            Column::new("n", ColumnData::Int8(vec![1, -1, 3])),
            Column::new("x", ColumnData::Float64(vec![1.5, f64::NAN, -2.0])),
        ])
        .unwrap()
    }

    #[test]
    fn nan_survives_json() {
        let table = sample();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("null"));
        let back: Table = serde_json::from_str(&json).unwrap();
        assert!(back.values_eq(&table));
    }

    #[test]
    fn append_requires_same_schema() {
        let mut table = sample();
        table.append(sample()).unwrap();
        assert_eq!(table.len(), 6);

        let other = Table::from_columns(vec![Column::new(
            "id",
            ColumnData::Text(vec!["z".into()]),
        )])
        .unwrap();
        assert_matches!(table.append(other), Err(CrashError::SchemaMismatch(_)));
    }

    #[test]
    fn filter_keeps_masked_rows() {
        let filtered = sample().filter_rows(&[true, false, true]);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.require("n").unwrap().int_at(1), Some(3));
        assert_eq!(filtered.require("x").unwrap().float_at(0), Some(1.5));
    }

    #[test]
    fn nan_reads_as_missing() {
        assert_eq!(sample().require("x").unwrap().float_at(1), None);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let result = Table::from_columns(vec![
            Column::new("a", ColumnData::Int8(vec![1])),
            Column::new("b", ColumnData::Int8(vec![1, 2])),
        ]);
        assert_matches!(result, Err(CrashError::SchemaMismatch(_)));
    }

    #[test]
    fn text_dates_are_parsed() {
        let column = ColumnData::Text(vec!["2019-03-04".into(), "bad".into()]);
        assert_eq!(column.date_at(0), NaiveDate::from_ymd_opt(2019, 3, 4));
        assert_eq!(column.date_at(1), None);
    }
}
