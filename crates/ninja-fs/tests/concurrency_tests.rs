//! Concurrent access tests for write_atomic
//!
//! A reader sampling the destination while writers replace it must only
//! ever observe one complete payload.

use ninja_fs::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn payload(id: usize) -> String {
    // Large enough that a torn write would be visible
    format!("writer-{id}:{}\n", "x".repeat(64 * 1024))
}

#[test]
fn test_reader_never_observes_partial_content() {
    let dir = tempdir().unwrap();
    let path = Arc::new(dir.path().join("shared.txt"));
    io::write_atomic(&path, payload(0).as_bytes()).unwrap();

    let valid: Arc<Vec<String>> = Arc::new((0..4).map(payload).collect());
    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(4));

    let writers: Vec<_> = (1..4)
        .map(|id| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..25 {
                    io::write_atomic(&path, payload(id).as_bytes()).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let path = Arc::clone(&path);
        let valid = Arc::clone(&valid);
        let done = Arc::clone(&done);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let mut samples = 0;
            while !done.load(Ordering::SeqCst) {
                let content = std::fs::read_to_string(path.as_ref()).unwrap();
                assert!(
                    valid.contains(&content),
                    "observed a torn write ({} bytes)",
                    content.len()
                );
                samples += 1;
            }
            samples
        })
    };

    for handle in writers {
        handle.join().expect("writer should not panic");
    }
    done.store(true, Ordering::SeqCst);
    let samples = reader.join().expect("reader should not panic");
    assert!(samples > 0);
}

#[test]
fn test_concurrent_writes_to_different_files_all_succeed() {
    let dir = tempdir().unwrap();
    let handles: Vec<_> = (0..5)
        .map(|id| {
            let path = dir.path().join(format!("file_{id}.json"));
            thread::spawn(move || io::write_atomic(&path, payload(id).as_bytes()))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 5);
}
