//! Daemon wiring against a real watched directory.

use owl_service::daemon::{run_until, DaemonConfig};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_request_flushes_buffered_events() {
    let dir = tempdir().unwrap();
    let watched = dir.path().join("watched");
    fs::create_dir_all(&watched).unwrap();
    let config = DaemonConfig {
        watch_root: watched.clone(),
        event_log: dir.path().join("events.csv"),
        rules_file: dir.path().join("rules.json"),
        alert_log: dir.path().join("alert.csv"),
        // Long enough that only the shutdown flush can write the log.
        flush_interval: Duration::from_secs(3600),
        follow_new_directories: false,
    };
    let event_log = config.event_log.clone();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let daemon = tokio::spawn(run_until(config, async {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let created = watched.join("report.txt");
    fs::write(&created, b"quarterly").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!event_log.exists());

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon did not stop")
        .unwrap()
        .unwrap();

    let content = fs::read_to_string(&event_log).unwrap();
    let expected = format!(", CREATE, {}", created.display());
    assert!(
        content.lines().any(|line| line.ends_with(&expected)),
        "missing create event in {content:?}"
    );
}
