mod common;

use std::fs;

use assert_matches::assert_matches;

use crashstat::domain::RegionCode;
use crashstat::error::CrashError;
use crashstat::parser::RegionTableBuilder;

use common::{MockSource, fixture_archives, parser, scratch, write_archives, zip_bytes};

fn jhm() -> RegionCode {
    "JHM".parse().unwrap()
}

#[test]
fn first_archive_wins_for_repeated_keys() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    let parser = parser(MockSource::default(), &data, &data);

    let table = parser.parse_region(jhm()).unwrap();
    assert_eq!(table.len(), 3);
    let keys: Vec<&str> = (0..3)
        .map(|row| table.require("p1").unwrap().text_at(row).unwrap())
        .collect();
    assert_eq!(keys, vec!["060001", "060002", "060003"]);
    assert_eq!(table.require("p36").unwrap().int_at(0), Some(1));
    assert_eq!(table.require("p2a").unwrap().text_at(0), Some("2016-03-01"));
    assert_eq!(parser.fetcher().source().calls(), 0);
}

#[test]
fn archive_without_member_is_skipped() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    let parser = parser(MockSource::default(), &data, &data);

    let table = parser.parse_region("VYS".parse().unwrap()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.require("p57").unwrap().int_at(0), Some(-1));

    let empty = parser.parse_region("PHA".parse().unwrap()).unwrap();
    assert_eq!(empty.len(), 0);
    assert_eq!(empty.width(), 48);
}

#[test]
fn parsing_twice_gives_equal_tables() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    let parser = parser(MockSource::default(), &data, &data);

    let first = parser.parse_region(jhm()).unwrap();
    let second = parser.parse_region(jhm()).unwrap();
    assert!(first.values_eq(&second));
}

#[test]
fn same_archive_twice_adds_nothing() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    let archive = data.join("data-2016.zip");

    let mut builder = RegionTableBuilder::new();
    assert_eq!(builder.add_archive(jhm(), &archive).unwrap(), 2);
    assert_eq!(builder.add_archive(jhm(), &archive).unwrap(), 0);
    assert_eq!(builder.len(), 2);
}

#[test]
fn non_zip_files_are_ignored() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    fs::write(data.join("README.txt").as_std_path(), "not an archive").unwrap();
    let parser = parser(MockSource::default(), &data, &data);

    assert_eq!(parser.parse_region(jhm()).unwrap().len(), 3);
}

#[test]
fn corrupt_archive_is_an_error() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    write_archives(&data, &fixture_archives());
    fs::write(
        data.join("data-2015.zip").as_std_path(),
        b"PK\x03\x04 truncated archive",
    )
    .unwrap();
    let parser = parser(MockSource::default(), &data, &data);

    assert_matches!(parser.parse_region(jhm()), Err(CrashError::Archive { .. }));
}

#[test]
fn empty_data_dir_triggers_download() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    let source = MockSource::with_archives(&fixture_archives());
    let parser = parser(source, &data, &data);

    let table = parser.parse_region(jhm()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(*parser.fetcher().source().listing_calls.lock().unwrap(), 1);
    assert_eq!(*parser.fetcher().source().download_calls.lock().unwrap(), 2);
    assert!(data.join("data-2017.zip").as_std_path().exists());

    parser.parse_region(jhm()).unwrap();
    assert_eq!(*parser.fetcher().source().listing_calls.lock().unwrap(), 1);
}

#[test]
fn short_rows_fill_missing_fields() {
    let (_temp, root) = scratch();
    let data = root.join("data");
    let short = "\"060009\";\"x\"\r\n".to_string();
    write_archives(&data, &[("data-2020.zip", zip_bytes(&[("06.csv", short.into_bytes())]))]);
    let parser = parser(MockSource::default(), &data, &data);

    let table = parser.parse_region(jhm()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.require("p36").unwrap().int_at(0), Some(-1));
    assert_eq!(table.require("p5a").unwrap().int_at(0), Some(-1));
    assert_eq!(table.require("d").unwrap().float_at(0), None);
}
