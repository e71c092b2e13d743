//! Tests for the local file backend

use std::time::Duration;

use ninja_backend::local::LocalBackend;
use ninja_backend::{Backend, CancellationToken, Error};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const FALLBACK: Duration = Duration::from_millis(100);
const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn fetch_returns_file_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("source.yaml");
    std::fs::write(&path, "key: value\n").unwrap();

    let backend = LocalBackend::new(&path, FALLBACK);
    let revision = backend.fetch().await.unwrap();

    assert_eq!(revision.content, b"key: value\n");
    assert!(revision.version.as_str().starts_with("sha256:"));
}

#[tokio::test]
async fn fetch_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(dir.path().join("absent.yaml"), FALLBACK);

    let err = backend.fetch().await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");
}

#[tokio::test]
async fn identical_content_has_identical_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("source.json");
    std::fs::write(&path, "{}").unwrap();
    let backend = LocalBackend::new(&path, FALLBACK);

    let first = backend.fetch().await.unwrap();
    std::fs::write(&path, "{}").unwrap();
    let second = backend.fetch().await.unwrap();

    assert_eq!(first.version, second.version);
}

#[tokio::test]
async fn poll_yields_current_then_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("source.txt");
    std::fs::write(&path, "one").unwrap();

    let backend = LocalBackend::new(&path, FALLBACK);
    let cancel = CancellationToken::new();
    let mut stream = backend.poll(None);

    let first = tokio::time::timeout(WAIT, stream.next(&cancel))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(first.content, b"one");

    std::fs::write(&path, "two").unwrap();
    let second = tokio::time::timeout(WAIT, stream.next(&cancel))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(second.content, b"two");
}

#[tokio::test]
async fn poll_from_current_version_waits_for_change() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("source.txt");
    std::fs::write(&path, "one").unwrap();

    let backend = LocalBackend::new(&path, FALLBACK);
    let current = backend.fetch().await.unwrap();
    let cancel = CancellationToken::new();
    let mut stream = backend.poll(Some(current.version));

    let idle = tokio::time::timeout(Duration::from_millis(400), stream.next(&cancel)).await;
    assert!(idle.is_err(), "unchanged file must not yield");
}

#[tokio::test]
async fn poll_tolerates_file_created_later() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("later.txt");

    let backend = LocalBackend::new(&path, FALLBACK);
    let cancel = CancellationToken::new();
    let mut stream = backend.poll(None);

    let writer = {
        let path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            std::fs::write(&path, "created").unwrap();
        })
    };

    let revision = tokio::time::timeout(WAIT, stream.next(&cancel))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(revision.content, b"created");
    writer.await.unwrap();
}

#[tokio::test]
async fn cancel_ends_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("source.txt");
    std::fs::write(&path, "one").unwrap();

    let backend = LocalBackend::new(&path, FALLBACK);
    let current = backend.fetch().await.unwrap();
    let mut stream = backend.poll(Some(current.version));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let next = tokio::time::timeout(WAIT, stream.next(&cancel)).await.unwrap();
    assert!(matches!(next, Ok(None)));
}
