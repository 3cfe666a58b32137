//! Integration tests for the ledger against a real database file

use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use tempfile::TempDir;
use xfck_config::LedgerConfig;
use xfck_hash::Hash;
use xfck_ledger::{create_pool, Ledger, NewEntry, Side};

async fn setup_ledger(table: &str) -> (Ledger, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = LedgerConfig {
        database: Some(temp_dir.path().join("ledger.sqlite")),
        max_connections: 4,
        min_idle_connections: 1,
        ..LedgerConfig::default()
    };

    let pool = create_pool(&config).await.unwrap();
    let ledger = Ledger::new(pool, table);
    ledger.ensure_schema().await.unwrap();
    (ledger, temp_dir)
}

fn entry(name: &str, size: i64) -> NewEntry {
    NewEntry {
        filename: name.to_string(),
        size,
        changed: Utc.with_ymd_and_hms(2019, 6, 1, 12, 30, 0).unwrap(),
    }
}

async fn pending(ledger: &Ledger, side: Side, filter: Option<&str>) -> Vec<String> {
    let query = ledger.select_pending(side, filter);
    let mut names: Vec<String> = query.fetch().try_collect().await.unwrap();
    names.sort();
    names
}

#[tokio::test]
async fn ensure_schema_is_repeatable() {
    let (ledger, _dir) = setup_ledger("files").await;
    ledger.ensure_schema().await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 0);

    let columns: Vec<(String, String)> =
        sqlx::query_as("SELECT name, type FROM pragma_table_info('files') ORDER BY cid")
            .fetch_all(ledger.pool())
            .await
            .unwrap();
    // Declared types are reported in the case SQLite normalises them to
    let columns: Vec<(String, String)> = columns
        .into_iter()
        .map(|(n, t)| (n, t.to_ascii_lowercase()))
        .collect();
    let columns: Vec<(&str, &str)> = columns
        .iter()
        .map(|(n, t)| (n.as_str(), t.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("filename", "text"),
            ("changed", "timestamp"),
            ("size", "bigint"),
            ("hash_new", "text"),
            ("hash_old", "text"),
        ]
    );
}

#[tokio::test]
async fn missing_database_path_is_rejected() {
    let err = create_pool(&LedgerConfig::default()).await.unwrap_err();
    assert!(err.to_string().contains("ledger.database"));
}

#[tokio::test]
async fn bulk_insert_spans_batches() {
    let (ledger, _dir) = setup_ledger("files").await;
    let rows: Vec<NewEntry> = (0..7).map(|i| entry(&format!("f{i}"), i)).collect();

    let inserted = ledger.bulk_insert(rows, 3).await.unwrap();
    assert_eq!(inserted, 7);
    assert_eq!(ledger.count().await.unwrap(), 7);

    let row = ledger.entry("f5").await.unwrap().unwrap();
    assert_eq!(row.size, 5);
    assert_eq!(
        row.changed,
        Utc.with_ymd_and_hms(2019, 6, 1, 12, 30, 0).unwrap()
    );
    assert!(row.hash_new.is_none());
    assert!(row.hash_old.is_none());
}

#[tokio::test]
async fn dropped_bulk_insert_rolls_back() {
    let (ledger, _dir) = setup_ledger("files").await;

    let mut writer = ledger.begin_bulk_insert(2).await.unwrap();
    for i in 0..5 {
        writer.push(entry(&format!("f{i}"), 1)).await.unwrap();
    }
    drop(writer);

    assert_eq!(ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn set_hash_never_overwrites() {
    let (ledger, _dir) = setup_ledger("files").await;
    ledger
        .bulk_insert(vec![entry("a.txt", 4), entry("sub/b.txt", 0)], 100)
        .await
        .unwrap();

    let first = Hash::from_data(b"abcd");
    let second = Hash::from_data(b"other");
    assert!(ledger.set_hash("a.txt", Side::New, &first).await.unwrap());
    assert!(!ledger.set_hash("a.txt", Side::New, &second).await.unwrap());
    assert!(!ledger.set_hash("missing", Side::New, &first).await.unwrap());

    let row = ledger.entry("a.txt").await.unwrap().unwrap();
    assert_eq!(row.hash_new, Some(first.to_hex()));
    assert_eq!(row.hash_old, None);
    assert!(!row.is_matched());
}

#[tokio::test]
async fn pending_tracks_each_side_and_filter() {
    let (ledger, _dir) = setup_ledger("files").await;
    ledger
        .bulk_insert(
            vec![entry("a.txt", 4), entry("sub/b.txt", 0), entry("sub/c.txt", 1)],
            100,
        )
        .await
        .unwrap();

    ledger
        .set_hash("sub/b.txt", Side::New, &Hash::from_data(b""))
        .await
        .unwrap();

    assert_eq!(
        pending(&ledger, Side::New, None).await,
        vec!["a.txt", "sub/c.txt"]
    );
    assert_eq!(
        pending(&ledger, Side::Old, None).await,
        vec!["a.txt", "sub/b.txt", "sub/c.txt"]
    );
    assert_eq!(
        pending(&ledger, Side::New, Some("filename like 'sub/%'")).await,
        vec!["sub/c.txt"]
    );
}

#[tokio::test]
async fn pending_pages_cover_every_row() {
    let (ledger, _dir) = setup_ledger("files").await;
    let rows: Vec<NewEntry> = (0..7).map(|i| entry(&format!("f{i}"), i)).collect();
    ledger.bulk_insert(rows, 100).await.unwrap();

    let names: Vec<String> = ledger
        .select_pending(Side::Old, None)
        .page_size(3)
        .fetch()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(names, vec!["f0", "f1", "f2", "f3", "f4", "f5", "f6"]);
}

#[tokio::test]
async fn pending_skips_rows_hashed_mid_stream() {
    let (ledger, _dir) = setup_ledger("files").await;
    let rows: Vec<NewEntry> = (0..6).map(|i| entry(&format!("f{i}"), i)).collect();
    ledger.bulk_insert(rows, 100).await.unwrap();

    let query = ledger.select_pending(Side::New, None).page_size(2);
    let mut stream = query.fetch();
    assert_eq!(stream.try_next().await.unwrap().as_deref(), Some("f0"));

    // f4 sits on a page that has not been read yet
    ledger
        .set_hash("f4", Side::New, &Hash::from_data(b"f4"))
        .await
        .unwrap();

    let rest: Vec<String> = stream.try_collect().await.unwrap();
    assert_eq!(rest, vec!["f1", "f2", "f3", "f5"]);
}

#[tokio::test]
async fn status_counts_progress() {
    let (ledger, _dir) = setup_ledger("files").await;
    assert_eq!(ledger.status(None).await.unwrap().total, 0);

    ledger
        .bulk_insert(vec![entry("a", 1), entry("b", 1), entry("sub/c", 1)], 100)
        .await
        .unwrap();
    let digest = Hash::from_data(b"x");
    ledger.set_hash("a", Side::New, &digest).await.unwrap();
    ledger.set_hash("a", Side::Old, &digest).await.unwrap();
    ledger.set_hash("b", Side::Old, &digest).await.unwrap();

    let status = ledger.status(None).await.unwrap();
    assert_eq!(status.total, 3);
    assert_eq!(status.pending_new, 2);
    assert_eq!(status.pending_old, 1);
    assert_eq!(status.hashed_both, 1);
    assert!(!status.is_complete());

    let filtered = ledger.status(Some("filename like 'sub/%'")).await.unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.pending(Side::Old), 1);
}

#[tokio::test]
async fn table_names_are_quoted() {
    let (ledger, _dir) = setup_ledger("transfer \"2019\"").await;
    ledger.bulk_insert(vec![entry("a", 1)], 10).await.unwrap();
    assert_eq!(ledger.count().await.unwrap(), 1);
    assert_eq!(ledger.table_name(), "transfer \"2019\"");
}

#[tokio::test]
async fn check_filter_rejects_unknown_columns() {
    let (ledger, _dir) = setup_ledger("files").await;
    ledger.check_filter(None).await.unwrap();
    ledger
        .check_filter(Some("filename like 'sub/%'"))
        .await
        .unwrap();

    let err = ledger
        .check_filter(Some("no_such_column = 1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        xfck_errors::Error::State(xfck_errors::StateError::InvalidFilter { .. })
    ));
}

#[tokio::test]
async fn bad_filter_is_an_error() {
    let (ledger, _dir) = setup_ledger("files").await;
    let query = ledger.select_pending(Side::New, Some("no_such_column = 1"));
    let result: Result<Vec<String>, _> = query.fetch().try_collect().await;
    assert!(result.is_err());
}
