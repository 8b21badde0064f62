use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::catalog::{REGION_COLUMN, REGIONS};
use crate::compact::DATE_COLUMN;
use crate::error::CrashError;
use crate::figure::{Figure, Panel, PanelKind, Series};
use crate::table::{ColumnData, Table};

pub const FOCUS_REGIONS: [&str; 4] = ["JHM", "ZLK", "PLK", "VYS"];

pub const ROAD_TYPES: [&str; 6] = [
    "two-lane",
    "three-lane",
    "four-lane",
    "multi-lane",
    "expressway",
    "other",
];

pub const FAULTS: [&str; 3] = ["animal", "driver", "other"];

pub const CONDITIONS: [&str; 7] = [
    "unimpeded",
    "fog",
    "rain",
    "start of rain",
    "snowfall",
    "icing",
    "gusty wind",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub region: String,
    pub category: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub region: String,
    pub category: &'static str,
    pub month: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub region: String,
    pub category: &'static str,
    pub period: NaiveDate,
    pub count: usize,
}

pub fn road_type_index(code: i64) -> Option<usize> {
    match code {
        1 => Some(0),
        2 => Some(1),
        3 | 4 => Some(2),
        5 => Some(3),
        6 => Some(4),
        0 => Some(5),
        _ => None,
    }
}

pub fn fault_index(code: i64) -> usize {
    match code {
        4 => 0,
        1 | 2 => 1,
        _ => 2,
    }
}

pub fn condition_index(code: i64) -> Option<usize> {
    usize::try_from(code)
        .ok()
        .filter(|code| (1..=CONDITIONS.len()).contains(code))
        .map(|code| code - 1)
}

pub fn int_column<'a>(table: &'a Table, name: &str) -> Result<&'a ColumnData, CrashError> {
    let data = table.require(name)?;
    match data {
        ColumnData::Int8(_) | ColumnData::Int16(_) | ColumnData::Int32(_) | ColumnData::Int64(_) => {
            Ok(data)
        }
        other => Err(CrashError::ColumnType {
            column: name.to_string(),
            expected: "integer",
            found: other.type_name(),
        }),
    }
}

pub fn date_column(table: &Table) -> Result<&ColumnData, CrashError> {
    match table.column(DATE_COLUMN) {
        Some(data) => Ok(data),
        None => table.require("p2a"),
    }
}

fn region_index(regions: &[&str], column: &ColumnData, row: usize) -> Option<usize> {
    let code = column.text_at(row)?;
    regions.iter().position(|region| *region == code)
}

pub fn region_overview(table: &Table) -> Result<Vec<RegionCount>, CrashError> {
    let codes: Vec<&str> = REGIONS.iter().map(|region| region.code).collect();
    let column = table.require(REGION_COLUMN)?;
    let mut counts = vec![0usize; codes.len()];
    for row in 0..table.len() {
        if let Some(index) = region_index(&codes, column, row) {
            counts[index] += 1;
        }
    }
    Ok(codes
        .into_iter()
        .zip(counts)
        .map(|(region, count)| RegionCount {
            region: region.to_string(),
            count,
        })
        .collect())
}

pub fn region_overview_figure(counts: &[RegionCount]) -> Figure {
    let points = counts
        .iter()
        .enumerate()
        .map(|(index, entry)| (index as f64, entry.count as f64))
        .collect();
    Figure::new("Accidents per region", 1).panel(
        Panel::new("All years", PanelKind::Bar)
            .labels("Region", "Accidents")
            .categories(counts.iter().map(|entry| entry.region.clone()))
            .series(Series::new("accidents", points)),
    )
}

pub fn road_type_counts(table: &Table, regions: &[&str]) -> Result<Vec<CategoryCount>, CrashError> {
    let region = table.require(REGION_COLUMN)?;
    let road = int_column(table, "p21")?;
    let mut counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for row in 0..table.len() {
        let Some(region_index) = region_index(regions, region, row) else {
            continue;
        };
        let Some(road_index) = road.int_at(row).and_then(road_type_index) else {
            continue;
        };
        *counts.entry((region_index, road_index)).or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .map(|((region_index, road_index), count)| CategoryCount {
            region: regions[region_index].to_string(),
            category: ROAD_TYPES[road_index],
            count,
        })
        .collect())
}

pub fn road_type_figure(counts: &[CategoryCount], regions: &[&str]) -> Figure {
    let mut figure = Figure::new("Accidents on different road types", 3);
    for road in ROAD_TYPES {
        let points = counts
            .iter()
            .filter(|entry| entry.category == road)
            .filter_map(|entry| {
                let index = regions.iter().position(|region| *region == entry.region)?;
                Some((index as f64, entry.count as f64))
            })
            .collect();
        figure = figure.panel(
            Panel::new(format!("{road} road"), PanelKind::Bar)
                .labels("Region", "Accidents")
                .categories(regions.iter().copied())
                .series(Series::new("accidents", points)),
        );
    }
    figure
}

pub fn animal_fault_counts(table: &Table, regions: &[&str]) -> Result<Vec<MonthlyCount>, CrashError> {
    let cutoff = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or(NaiveDate::MAX);
    let region = table.require(REGION_COLUMN)?;
    let cause = int_column(table, "p58")?;
    let fault = int_column(table, "p10")?;
    let dates = date_column(table)?;

    let mut counts: BTreeMap<(usize, usize, u32), usize> = BTreeMap::new();
    for row in 0..table.len() {
        if cause.int_at(row) != Some(5) {
            continue;
        }
        let Some(date) = dates.date_at(row).filter(|date| *date < cutoff) else {
            continue;
        };
        let Some(region_index) = region_index(regions, region, row) else {
            continue;
        };
        let fault_index = fault.int_at(row).map(fault_index).unwrap_or(2);
        *counts
            .entry((region_index, fault_index, date.month()))
            .or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .map(|((region_index, fault_index, month), count)| MonthlyCount {
            region: regions[region_index].to_string(),
            category: FAULTS[fault_index],
            month,
            count,
        })
        .collect())
}

pub fn animal_fault_figure(counts: &[MonthlyCount], regions: &[&str]) -> Figure {
    let mut sorted: Vec<&str> = regions.to_vec();
    sorted.sort_unstable();
    let mut figure = Figure::new("Accidents caused by forest animals", 2);
    for region in sorted {
        let mut panel = Panel::new(format!("Region: {region}"), PanelKind::Bar)
            .labels("Month", "Accidents")
            .categories((1..=12).map(|month| month.to_string()));
        for fault in FAULTS {
            let points = counts
                .iter()
                .filter(|entry| entry.region == region && entry.category == fault)
                .map(|entry| (f64::from(entry.month - 1), entry.count as f64))
                .collect();
            panel = panel.series(Series::new(fault, points));
        }
        figure = figure.panel(panel);
    }
    figure
}

pub fn condition_series(table: &Table, regions: &[&str]) -> Result<Vec<SeriesPoint>, CrashError> {
    let cutoff = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap_or(NaiveDate::MAX);
    let region = table.require(REGION_COLUMN)?;
    let condition = int_column(table, "p18")?;
    let dates = date_column(table)?;

    let mut counts: BTreeMap<(usize, usize, NaiveDate), usize> = BTreeMap::new();
    for row in 0..table.len() {
        let Some(condition_index) = condition.int_at(row).and_then(condition_index) else {
            continue;
        };
        let Some(date) = dates.date_at(row).filter(|date| *date < cutoff) else {
            continue;
        };
        let Some(region_index) = region_index(regions, region, row) else {
            continue;
        };
        let Some(period) = date.with_day(1) else {
            continue;
        };
        *counts
            .entry((region_index, condition_index, period))
            .or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .map(|((region_index, condition_index, period), count)| SeriesPoint {
            region: regions[region_index].to_string(),
            category: CONDITIONS[condition_index],
            period,
            count,
        })
        .collect())
}

pub fn month_ordinal(date: NaiveDate) -> f64 {
    f64::from(date.year() * 12 + date.month0() as i32)
}

pub fn condition_figure(points: &[SeriesPoint], regions: &[&str]) -> Figure {
    let years: Vec<i32> = {
        let mut years: Vec<i32> = points.iter().map(|point| point.period.year()).collect();
        years.sort_unstable();
        years.dedup();
        years
    };
    let ticks: Vec<(f64, String)> = years
        .iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(*year, 1, 1))
        .map(|date| (month_ordinal(date), date.format("%m/%y").to_string()))
        .collect();

    let mut figure = Figure::new("Accidents by weather condition", 2);
    for region in regions {
        let mut panel = Panel::new(format!("Region: {region}"), PanelKind::Line)
            .labels("Date", "Accidents")
            .ticks(ticks.clone());
        for condition in CONDITIONS {
            let series: Vec<(f64, f64)> = points
                .iter()
                .filter(|point| point.region == *region && point.category == condition)
                .map(|point| (month_ordinal(point.period), point.count as f64))
                .collect();
            if !series.is_empty() {
                panel = panel.series(Series::new(condition, series));
            }
        }
        figure = figure.panel(panel);
    }
    figure
}
