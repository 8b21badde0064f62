use std::io::{self, Write};

use serde::Serialize;

use crate::alcohol::{AlcoholShare, AlcoholSummary, StateCounts};
use crate::cache::CacheStats;
use crate::geo::{ClusterSummary, RoadPanel};
use crate::stats::{CategoryCount, MonthlyCount, RegionCount, SeriesPoint};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionsReport {
    pub regions: Vec<RegionCount>,
    pub total: usize,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct SnapshotReport {
    pub path: String,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub orig_size_mb: f64,
    pub new_size_mb: f64,
    pub road_types: Vec<CategoryCount>,
    pub animals: Vec<MonthlyCount>,
    pub conditions: Vec<SeriesPoint>,
}

#[derive(Debug, Serialize)]
pub struct GeoReport {
    pub region: String,
    pub points: usize,
    pub threshold: f64,
    pub panels: Vec<PanelSize>,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Serialize)]
pub struct PanelSize {
    pub year: i32,
    pub road_kind: i64,
    pub points: usize,
}

impl From<&RoadPanel> for PanelSize {
    fn from(panel: &RoadPanel) -> Self {
        Self {
            year: panel.year,
            road_kind: panel.road_kind,
            points: panel.points.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlcoholReport {
    pub shares: Vec<AlcoholShare>,
    pub states: Vec<StateCounts>,
    pub summary: AlcoholSummary,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(report: &FetchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_regions(report: &RegionsReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_snapshot(report: &SnapshotReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_analysis(report: &AnalysisReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_geo(report: &GeoReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_alcohol(report: &AlcoholReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
