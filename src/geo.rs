use std::ops::RangeInclusive;

use chrono::Datelike;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::Serialize;
use tracing::debug;

use crate::catalog::REGION_COLUMN;
use crate::error::CrashError;
use crate::figure::{Figure, PALETTE, Panel, PanelKind, Series};
use crate::stats::{date_column, int_column};
use crate::table::Table;

pub const DEFAULT_REGION: &str = "JHM";
pub const DEFAULT_YEARS: RangeInclusive<i32> = 2018..=2020;
pub const ROAD_KINDS: [(i64, &str); 2] = [(0, "motorway"), (1, "first-class road")];
// Clustering distance in metres.
pub const DEFAULT_THRESHOLD: f64 = 1500.0;

const PLOTTED_CLUSTERS: usize = PALETTE.len() - 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
    pub region: String,
    pub road_kind: i64,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadPanel {
    pub year: i32,
    pub road_kind: i64,
    pub label: &'static str,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub label: usize,
    pub count: usize,
    pub centroid: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clustering {
    pub labels: Vec<usize>,
    pub clusters: Vec<ClusterSummary>,
}

pub fn region_rows(table: &Table, region: &str) -> Result<Table, CrashError> {
    let column = table.require(REGION_COLUMN)?;
    let mask: Vec<bool> = (0..table.len())
        .map(|row| column.text_at(row) == Some(region))
        .collect();
    Ok(table.filter_rows(&mask))
}

pub fn make_geo(table: &Table) -> Result<Vec<GeoPoint>, CrashError> {
    let xs = table.require("d")?;
    let ys = table.require("e")?;
    let regions = table.require(REGION_COLUMN)?;
    let kinds = int_column(table, "p36")?;
    let dates = date_column(table)?;

    let mut points = Vec::new();
    let mut dropped = 0usize;
    for row in 0..table.len() {
        let (Some(x), Some(y)) = (xs.float_at(row), ys.float_at(row)) else {
            dropped += 1;
            continue;
        };
        points.push(GeoPoint {
            x,
            y,
            region: regions.text_at(row).unwrap_or_default().to_string(),
            road_kind: kinds.int_at(row).unwrap_or(-1),
            year: dates.date_at(row).map(|date| date.year()),
        });
    }
    debug!(points = points.len(), dropped, "geo points built");
    Ok(points)
}

pub fn road_panels(
    points: &[GeoPoint],
    region: &str,
    years: RangeInclusive<i32>,
    kinds: &[(i64, &'static str)],
) -> Vec<RoadPanel> {
    let mut panels = Vec::new();
    for year in years {
        for &(road_kind, label) in kinds {
            let selected = points
                .iter()
                .filter(|point| {
                    point.region == region
                        && point.road_kind == road_kind
                        && point.year == Some(year)
                })
                .map(|point| (point.x, point.y))
                .collect();
            panels.push(RoadPanel {
                year,
                road_kind,
                label,
                points: selected,
            });
        }
    }
    panels
}

pub fn road_figure(region: &str, panels: &[RoadPanel], kinds: usize) -> Figure {
    let mut figure = Figure::new(format!("Accidents in {region} by road kind"), kinds);
    for panel in panels {
        figure = figure.panel(
            Panel::new(format!("{region}: {} ({})", panel.label, panel.year), PanelKind::Scatter)
                .labels("x [m]", "y [m]")
                .series(Series::new(panel.label, panel.points.clone())),
        );
    }
    figure
}

// Single-linkage clustering cut at `threshold`: two points share a cluster
// exactly when a chain of hops no longer than `threshold` connects them.
// Labels are dense and numbered in order of each cluster's first point.
pub fn cluster_points(points: &[(f64, f64)], threshold: f64) -> Clustering {
    let radius = threshold.max(0.0);
    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(index, (x, y))| GeomWithData::new([*x, *y], index))
            .collect(),
    );

    let mut sets = DisjointSets::new(points.len());
    for (index, (x, y)) in points.iter().enumerate() {
        for neighbour in tree.locate_within_distance([*x, *y], radius * radius) {
            if neighbour.data > index {
                sets.union(index, neighbour.data);
            }
        }
    }

    let mut dense = vec![usize::MAX; points.len()];
    let mut next = 0;
    let mut labels = Vec::with_capacity(points.len());
    let mut sums: Vec<(usize, f64, f64)> = Vec::new();
    for (index, (x, y)) in points.iter().enumerate() {
        let root = sets.find(index);
        if dense[root] == usize::MAX {
            dense[root] = next;
            next += 1;
            sums.push((0, 0.0, 0.0));
        }
        let label = dense[root];
        labels.push(label);
        let sum = &mut sums[label];
        sum.0 += 1;
        sum.1 += x;
        sum.2 += y;
    }

    let mut clusters: Vec<ClusterSummary> = sums
        .into_iter()
        .enumerate()
        .map(|(label, (count, sx, sy))| ClusterSummary {
            label,
            count,
            centroid: (sx / count as f64, sy / count as f64),
        })
        .collect();
    clusters.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));
    debug!(points = points.len(), clusters = clusters.len(), threshold, "points clustered");
    Clustering { labels, clusters }
}

pub fn cluster_figure(region: &str, points: &[(f64, f64)], clustering: &Clustering) -> Figure {
    let mut panel = Panel::new(format!("{region}: accident clusters"), PanelKind::Scatter)
        .labels("x [m]", "y [m]");
    let mut rest = Vec::new();
    let plotted: Vec<usize> = clustering
        .clusters
        .iter()
        .take(PLOTTED_CLUSTERS)
        .map(|cluster| cluster.label)
        .collect();
    let mut series: Vec<Vec<(f64, f64)>> = vec![Vec::new(); plotted.len()];
    for (point, label) in points.iter().zip(&clustering.labels) {
        match plotted.iter().position(|plotted| plotted == label) {
            Some(slot) => series[slot].push(*point),
            None => rest.push(*point),
        }
    }
    for (cluster, points) in clustering.clusters.iter().zip(series) {
        panel = panel.series(Series::new(
            format!("cluster {} ({} accidents)", cluster.label, cluster.count),
            points,
        ));
    }
    if !rest.is_empty() {
        panel = panel.series(Series::new("other clusters", rest));
    }
    Figure::new(format!("Accident clusters in {region}"), 1).panel(panel)
}

struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }
}
