// A row has a known driver state when `p57 != -1`; alcohol was involved
// when `p57` is 4 (under 1‰) or 5 (1‰ and more). Percentages are taken
// over known-state rows only.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::catalog::{REGION_COLUMN, REGIONS};
use crate::error::CrashError;
use crate::figure::{Figure, Panel, PanelKind, Series};
use crate::stats::int_column;
use crate::table::Table;

pub const UNDER_LIMIT: i64 = 4;
pub const OVER_LIMIT: i64 = 5;
pub const UNKNOWN_STATE: i64 = -1;

pub const STATES: [&str; 3] = ["under 1‰", "1‰ and more", "other state"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlcoholShare {
    pub region: String,
    pub alcohol: usize,
    pub known: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub region: String,
    pub under_limit: usize,
    pub over_limit: usize,
    pub other: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlcoholSummary {
    pub total: usize,
    pub known: usize,
    pub unknown: usize,
    pub alcohol: usize,
    pub alcohol_percent: f64,
    pub known_without_alcohol: usize,
}

impl fmt::Display for AlcoholSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accidents in total:\t\t\t\t{}", self.total)?;
        writeln!(f, "Accidents with known driver state:\t\t{}", self.known)?;
        writeln!(f, "Accidents with unknown driver state:\t\t{}", self.unknown)?;
        writeln!(f, "Accidents with alcohol involved:\t\t{}", self.alcohol)?;
        writeln!(f, "Percent of accidents with alcohol involved:\t{:.2}", self.alcohol_percent)?;
        write!(f, "Accidents without alcohol involved:\t\t{}", self.known_without_alcohol)
    }
}

pub fn is_alcohol(state: i64) -> bool {
    state == UNDER_LIMIT || state == OVER_LIMIT
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn per_region(table: &Table) -> Result<Vec<(String, StateCounts)>, CrashError> {
    let region = table.require(REGION_COLUMN)?;
    let state = int_column(table, "p57")?;
    let mut counts: BTreeMap<(usize, String), StateCounts> = BTreeMap::new();
    for row in 0..table.len() {
        let Some(value) = state.int_at(row).filter(|value| *value != UNKNOWN_STATE) else {
            continue;
        };
        let Some(code) = region.text_at(row) else {
            continue;
        };
        let order = REGIONS
            .iter()
            .position(|entry| entry.code == code)
            .unwrap_or(REGIONS.len());
        let entry = counts.entry((order, code.to_string())).or_insert_with(|| StateCounts {
            region: code.to_string(),
            under_limit: 0,
            over_limit: 0,
            other: 0,
        });
        match value {
            UNDER_LIMIT => entry.under_limit += 1,
            OVER_LIMIT => entry.over_limit += 1,
            _ => entry.other += 1,
        }
    }
    Ok(counts
        .into_values()
        .map(|entry| (entry.region.clone(), entry))
        .collect())
}

pub fn alcohol_share(table: &Table) -> Result<Vec<AlcoholShare>, CrashError> {
    Ok(per_region(table)?
        .into_iter()
        .map(|(region, counts)| {
            let alcohol = counts.under_limit + counts.over_limit;
            let known = alcohol + counts.other;
            AlcoholShare {
                region,
                alcohol,
                known,
                percent: percent(alcohol, known),
            }
        })
        .collect())
}

pub fn alcohol_share_figure(shares: &[AlcoholShare]) -> Figure {
    let points = shares
        .iter()
        .enumerate()
        .map(|(index, share)| (index as f64, share.percent))
        .collect();
    Figure::new("Accidents with the driver under the influence of alcohol", 1).panel(
        Panel::new("Share of known driver states", PanelKind::Bar)
            .labels("Region", "Driver under the influence (%)")
            .categories(shares.iter().map(|share| share.region.clone()))
            .series(Series::new("alcohol", points)),
    )
}

pub fn alcohol_states(table: &Table) -> Result<Vec<StateCounts>, CrashError> {
    Ok(per_region(table)?
        .into_iter()
        .map(|(_, counts)| counts)
        .collect())
}

pub fn render_states(states: &[StateCounts]) -> String {
    let mut lines = vec![format!("Region;{}", STATES.join(";"))];
    lines.extend(states.iter().map(|entry| {
        format!(
            "{};{};{};{}",
            entry.region, entry.under_limit, entry.over_limit, entry.other
        )
    }));
    lines.join("\n")
}

pub fn alcohol_summary(table: &Table) -> Result<AlcoholSummary, CrashError> {
    let state = int_column(table, "p57")?;
    let total = table.len();
    let mut known = 0;
    let mut alcohol = 0;
    for row in 0..total {
        match state.int_at(row) {
            Some(UNKNOWN_STATE) | None => {}
            Some(value) => {
                known += 1;
                if is_alcohol(value) {
                    alcohol += 1;
                }
            }
        }
    }
    Ok(AlcoholSummary {
        total,
        known,
        unknown: total - known,
        alcohol,
        alcohol_percent: percent(alcohol, known),
        known_without_alcohol: known - alcohol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new(
                "region",
                ColumnData::Text(
                    ["VYS", "JHM", "JHM", "JHM", "JHM", "VYS", "VYS"]
                        .map(String::from)
                        .to_vec(),
                ),
            ),
            Column::new("p57", ColumnData::Int8(vec![-1, 4, 5, 1, -1, 2, 4])),
        ])
        .unwrap()
    }

    #[test]
    fn shares_ignore_unknown_states() {
        let shares = alcohol_share(&sample()).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].region, "JHM");
        assert_eq!((shares[0].alcohol, shares[0].known), (2, 3));
        assert!((shares[0].percent - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(shares[1].region, "VYS");
        assert_eq!(shares[1].percent, 50.0);
    }

    #[test]
    fn states_split_alcohol_levels() {
        let states = alcohol_states(&sample()).unwrap();
        assert_eq!(
            states[0],
            StateCounts {
                region: "JHM".into(),
                under_limit: 1,
                over_limit: 1,
                other: 1,
            }
        );
        let rendered = render_states(&states);
        assert_eq!(rendered.lines().nth(2), Some("VYS;1;0;1"));
    }

    #[test]
    fn summary_totals() {
        let summary = alcohol_summary(&sample()).unwrap();
        assert_eq!(summary.total, 7);
        assert_eq!(summary.known, 5);
        assert_eq!(summary.unknown, 2);
        assert_eq!(summary.alcohol, 3);
        assert_eq!(summary.known_without_alcohol, 2);
        assert_eq!(summary.alcohol_percent, 60.0);
    }

    #[test]
    fn nothing_known_gives_zero_percent() {
        let table = Table::from_columns(vec![
            Column::new("region", ColumnData::Text(vec!["JHM".into()])),
            Column::new("p57", ColumnData::Int8(vec![-1])),
        ])
        .unwrap();
        assert_eq!(alcohol_summary(&table).unwrap().alcohol_percent, 0.0);
        assert!(alcohol_share(&table).unwrap().is_empty());
    }
}
