mod common;

use chrono::NaiveDate;

use crashstat::alcohol::{alcohol_share, alcohol_summary};
use crashstat::cache::{RegionCache, load_table};
use crashstat::compact::{DATE_COLUMN, load_and_compact, write_snapshot};
use crashstat::geo::{cluster_points, make_geo};
use crashstat::stats::region_overview;
use crashstat::table::ColumnData;

use common::{MockSource, fixture_archives, parser, scratch, write_archives};

fn snapshot() -> (tempfile::TempDir, camino::Utf8PathBuf) {
    let (temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    let mut cache = RegionCache::new(parser(MockSource::default(), &data, &data));
    let table = cache.get_regions(&[]).unwrap();
    let path = root.join("accidents.json.gz");
    write_snapshot(&table, &path).unwrap();
    (temp, path)
}

#[test]
fn snapshot_is_written_wide() {
    let (_temp, path) = snapshot();
    let wide = load_table(&path).unwrap();
    assert_eq!(wide.len(), 4);
    assert!(matches!(wide.require("p36").unwrap(), ColumnData::Int64(_)));
    assert!(matches!(wide.require("region").unwrap(), ColumnData::Text(_)));
}

#[test]
fn compaction_preserves_values() {
    let (_temp, path) = snapshot();
    let wide = load_table(&path).unwrap();
    let (compact, report) = load_and_compact(&path, false).unwrap();

    assert_eq!(compact.len(), wide.len());
    for name in ["p36", "p57", "p12"] {
        let before = wide.require(name).unwrap();
        let after = compact.require(name).unwrap();
        assert!(matches!(after, ColumnData::Int8(_) | ColumnData::Int16(_)));
        for row in 0..wide.len() {
            assert_eq!(before.int_at(row), after.int_at(row), "{name} row {row}");
        }
    }
    assert!(compact.deep_size_bytes() < wide.deep_size_bytes());
    assert_eq!(report.before_bytes, wide.deep_size_bytes());
    assert_eq!(report.after_bytes, compact.deep_size_bytes());
    assert_eq!(
        compact.require(DATE_COLUMN).unwrap().date_at(0),
        NaiveDate::from_ymd_opt(2016, 3, 1)
    );
    assert_eq!(compact.require("d").unwrap().float_at(0), Some(-600000.5));
}

#[test]
fn analyses_run_on_compacted_snapshot() {
    let (_temp, path) = snapshot();
    let (table, _) = load_and_compact(&path, false).unwrap();

    let overview = region_overview(&table).unwrap();
    let jhm = overview.iter().find(|entry| entry.region == "JHM").unwrap();
    assert_eq!(jhm.count, 3);

    let summary = alcohol_summary(&table).unwrap();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.alcohol, 2);
    let shares = alcohol_share(&table).unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!((shares[0].alcohol, shares[0].known), (2, 3));

    let points = make_geo(&table).unwrap();
    assert_eq!(points.len(), 1);
    let clustering = cluster_points(&[(points[0].x, points[0].y)], 100.0);
    assert_eq!(clustering.labels, vec![0]);
}
