//! End-to-end transcoding over a mock fetcher

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use trackset::{
    transcode_csv, transcode_dataset, Dataset, FetchImage, ProgressIndicator, Result,
    TracksetError, UNRESOLVED_SENTINEL,
};

/// Fetcher that serves canned bytes and fails for URLs containing "broken"
struct MockFetcher;

#[async_trait]
impl FetchImage for MockFetcher {
    async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if url.contains("broken") {
            return Err(TracksetError::Network(format!("unreachable: {}", url)));
        }
        Ok(b"hello".to_vec())
    }
}

fn write_csv(path: &Path, content: &str) {
    std::fs::write(path, content).expect("write csv");
}

#[tokio::test]
async fn test_every_row_survives_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("urls.csv");
    let output = dir.path().join("encoded.csv");
    write_csv(
        &input,
        "id,animal,image_url\n\
         0,lynx,https://example.com/a.jpg\n\
         1,fox,https://example.com/broken.jpg\n\
         2,moose,https://example.com/c.jpg\n",
    );

    let report = transcode_csv(
        &input,
        &output,
        &MockFetcher,
        Duration::ZERO,
        &ProgressIndicator::NoOp,
    )
    .await
    .expect("transcode");

    assert_eq!(report.total, 3);
    assert_eq!(report.encoded, 2);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.skipped, 0);

    let encoded = Dataset::read_from_path(&output).expect("read output");
    assert_eq!(encoded.len(), 3);
    // base64("hello")
    assert_eq!(encoded.rows()[0].get(2), Some("aGVsbG8="));
    assert_eq!(encoded.rows()[1].get(2), Some(UNRESOLVED_SENTINEL));
    assert_eq!(encoded.rows()[2].get(2), Some("aGVsbG8="));
    // Other columns are untouched, in input order.
    assert_eq!(encoded.rows()[0].get(1), Some("lynx"));
    assert_eq!(encoded.rows()[1].get(1), Some("fox"));
    assert_eq!(encoded.rows()[2].get(1), Some("moose"));
}

#[tokio::test]
async fn test_input_file_is_not_modified() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("urls.csv");
    let output = dir.path().join("encoded.csv");
    let content = "id,animal,image_url\n0,lynx,https://example.com/a.jpg\n";
    write_csv(&input, content);

    transcode_csv(
        &input,
        &output,
        &MockFetcher,
        Duration::ZERO,
        &ProgressIndicator::NoOp,
    )
    .await
    .expect("transcode");

    let after = std::fs::read_to_string(&input).expect("read input");
    assert_eq!(after, content);
}

#[tokio::test]
async fn test_empty_url_passes_through() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("urls.csv");
    let output = dir.path().join("encoded.csv");
    write_csv(&input, "id,animal,image_url\n0,lynx,\n");

    let report = transcode_csv(
        &input,
        &output,
        &MockFetcher,
        Duration::ZERO,
        &ProgressIndicator::NoOp,
    )
    .await
    .expect("transcode");

    assert_eq!(report.skipped, 1);
    assert_eq!(report.encoded, 0);

    let encoded = Dataset::read_from_path(&output).expect("read output");
    assert_eq!(encoded.rows()[0].get(2), Some(""));
}

#[tokio::test]
async fn test_preloaded_dataset_matches_path_based_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("urls.csv");
    write_csv(
        &input,
        "id,animal,image_url\n\
         0,lynx,https://example.com/a.jpg\n\
         1,fox,https://example.com/broken.jpg\n",
    );

    let dataset = Dataset::read_from_path(&input).expect("read input");
    let output = dir.path().join("encoded.csv");
    let report = transcode_dataset(
        &dataset,
        &output,
        &MockFetcher,
        Duration::ZERO,
        &ProgressIndicator::NoOp,
    )
    .await
    .expect("transcode");

    assert_eq!(report.total, 2);
    assert_eq!(report.encoded, 1);
    assert_eq!(report.unresolved, 1);

    let encoded = Dataset::read_from_path(&output).expect("read output");
    assert_eq!(encoded.rows()[0].get(2), Some("aGVsbG8="));
    assert_eq!(encoded.rows()[1].get(2), Some(UNRESOLVED_SENTINEL));
}

#[tokio::test]
async fn test_missing_url_column_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("urls.csv");
    write_csv(&input, "id,animal\n0,lynx\n");

    let result = transcode_csv(
        &input,
        &dir.path().join("encoded.csv"),
        &MockFetcher,
        Duration::ZERO,
        &ProgressIndicator::NoOp,
    )
    .await;

    assert!(result.is_err());
}
