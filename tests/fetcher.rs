mod common;

use assert_matches::assert_matches;

use crashstat::error::CrashError;
use crashstat::fetcher::Fetcher;

use common::{LISTING_URL, MockSource, fixture_archives, scratch};

#[test]
fn downloads_every_linked_archive() {
    let (_temp, root) = scratch();
    let target = root.join("nested/data");
    let fetcher = Fetcher::new(MockSource::with_archives(&fixture_archives()), LISTING_URL);

    let written = fetcher.download_archives(&target).unwrap();
    assert_eq!(
        written,
        vec![target.join("data-2016.zip"), target.join("data-2017.zip")]
    );
    assert!(written.iter().all(|path| path.as_std_path().is_file()));
    assert_eq!(*fetcher.source().listing_calls.lock().unwrap(), 1);
    assert_eq!(*fetcher.source().download_calls.lock().unwrap(), 2);
}

#[test]
fn existing_files_are_overwritten() {
    let (_temp, root) = scratch();
    let fetcher = Fetcher::new(MockSource::with_archives(&fixture_archives()), LISTING_URL);
    std::fs::create_dir_all(root.as_std_path()).unwrap();
    std::fs::write(root.join("data-2016.zip").as_std_path(), b"stale").unwrap();

    fetcher.download_archives(&root).unwrap();
    let bytes = std::fs::read(root.join("data-2016.zip").as_std_path()).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn failed_listing_propagates() {
    let (_temp, root) = scratch();
    let fetcher = Fetcher::new(MockSource::default(), "https://example.test/other/");
    assert_matches!(
        fetcher.download_archives(&root),
        Err(CrashError::HttpStatus { status: 404, .. })
    );
}

#[test]
fn missing_archive_propagates() {
    let (_temp, root) = scratch();
    let mut source = MockSource::with_archives(&fixture_archives());
    source.files.clear();
    let fetcher = Fetcher::new(source, LISTING_URL);
    assert_matches!(
        fetcher.download_archives(&root),
        Err(CrashError::HttpStatus { .. })
    );
}
