//! Process supervision against shell stand-ins for the scanner.
#![cfg(unix)]

mod common;

use common::{
    chatty_scanner, crashing_scanner, hung_scanner, settle, settings_in, well_behaved_scanner,
    CHATTY_LINES, MIXED_ROWS,
};
use hqs_daq::session::{ScanSession, SessionState};
use hqs_daq::DaqError;
use std::fs;
use std::time::{Duration, Instant};

fn session_for(dir: &std::path::Path, executable: std::path::PathBuf) -> ScanSession {
    ScanSession::from_settings(&settings_in(dir, executable))
}

#[tokio::test]
async fn test_scan_records_data_and_logs_output() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_for(dir.path(), well_behaved_scanner(dir.path(), MIXED_ROWS));
    let data_path = dir.path().join("scan.csv");

    assert!(session.start_scan(&data_path, Some("wing panel 3")).await);
    assert_eq!(session.state().await, SessionState::Scanning);

    let info = session.info().await;
    assert!(info.running);
    assert_eq!(info.data_path.as_deref(), Some(data_path.as_path()));
    assert_eq!(info.comment.as_deref(), Some("wing panel 3"));

    settle().await;
    let summary = session.stop().await.unwrap().expect("a run was active");
    assert_eq!(summary.mode, SessionState::Scanning);
    assert_eq!(summary.exit_code, Some(0));
    assert_eq!(summary.data_path.as_deref(), Some(data_path.as_path()));
    assert!(summary.stdout_bytes > 0);
    assert!(summary.stderr_bytes > 0);

    assert_eq!(session.state().await, SessionState::Idle);
    assert!(!session.is_running().await);
    assert_eq!(fs::read_to_string(&data_path).unwrap(), MIXED_ROWS);

    let (stdout, stderr) = session.read_logs();
    assert!(stdout.contains("scanner started"));
    assert!(stdout.contains("-mwing panel 3"));
    assert!(stderr.contains("Operation halted by user"));
}

#[tokio::test]
async fn test_start_while_active_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_for(dir.path(), well_behaved_scanner(dir.path(), MIXED_ROWS));

    assert!(session.start_scan(dir.path().join("first.csv"), None).await);
    assert!(!session.start_target().await);
    assert!(!session.start_scan(dir.path().join("second.csv"), None).await);

    let err = session.try_start_target().await.unwrap_err();
    assert!(matches!(err, DaqError::SessionActive(SessionState::Scanning)));

    // the first process is untouched
    assert!(session.is_running().await);
    let info = session.info().await;
    assert_eq!(info.data_path, Some(dir.path().join("first.csv")));

    session.stop().await.unwrap();
    assert!(!dir.path().join("second.csv").exists());
}

#[tokio::test]
async fn test_target_mode_passes_target_flag() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_for(dir.path(), well_behaved_scanner(dir.path(), MIXED_ROWS));

    assert!(session.start_target().await);
    assert_eq!(session.state().await, SessionState::Targeting);
    assert!(session.info().await.data_path.is_none());
    assert!(!session.request_profile(dir.path().join("plot.png")).await);

    settle().await;
    let summary = session.stop().await.unwrap().expect("a run was active");
    assert_eq!(summary.mode, SessionState::Targeting);
    assert!(summary.data_path.is_none());

    let (stdout, _) = session.read_logs();
    assert!(stdout.contains(" -t\n"));
}

#[tokio::test]
async fn test_stop_twice_appends_once() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_for(dir.path(), well_behaved_scanner(dir.path(), MIXED_ROWS));

    assert!(session.start_target().await);
    settle().await;
    assert!(session.stop().await.unwrap().is_some());
    let after_first = session.read_logs();

    assert!(session.stop().await.unwrap().is_none());
    assert_eq!(session.read_logs(), after_first);
}

#[tokio::test]
async fn test_logs_accumulate_across_runs_until_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_for(dir.path(), well_behaved_scanner(dir.path(), MIXED_ROWS));

    for _ in 0..2 {
        assert!(session.start_target().await);
        settle().await;
        session.stop().await.unwrap();
    }
    let (stdout, stderr) = session.read_logs();
    assert_eq!(stdout.matches("scanner started").count(), 2);
    assert_eq!(stderr.matches("Operation halted by user").count(), 2);

    session.clear_logs();
    assert_eq!(session.read_logs(), (String::new(), String::new()));
}

#[tokio::test]
async fn test_hung_scanner_is_killed_after_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path(), hung_scanner(dir.path()));
    settings.scanner.stop_timeout_ms = 300;
    let session = ScanSession::from_settings(&settings);

    assert!(session.start_target().await);
    settle().await;

    let started = Instant::now();
    let err = session.stop().await.unwrap_err();
    let DaqError::StopTimeout { timeout, run } = err else {
        panic!("expected a stop timeout, got {:?}", err);
    };
    assert_eq!(timeout, Duration::from_millis(300));
    assert!(run.killed);
    assert_eq!(run.mode, SessionState::Targeting);
    assert!(run.stdout_bytes > 0);
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(session.state().await, SessionState::Idle);
    let (stdout, _) = session.read_logs();
    assert!(stdout.contains("waiting"));

    // the session is usable again
    assert!(session.stop().await.unwrap().is_none());
}

#[tokio::test]
async fn test_crash_is_noticed_lazily_and_logged_on_stop() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_for(dir.path(), crashing_scanner(dir.path()));

    session.try_start_scan(dir.path().join("scan.csv"), None).await.unwrap();
    settle().await;

    assert!(!session.is_running().await);
    assert_eq!(session.state().await, SessionState::Scanning);
    assert!(!session.info().await.running);

    // still active until stopped
    assert!(!session.start_target().await);

    let summary = session.stop().await.unwrap().expect("a run was active");
    assert_eq!(summary.exit_code, Some(3));
    assert_eq!(session.state().await, SessionState::Idle);

    let (_, stderr) = session.read_logs();
    assert!(stderr.contains("boom"));
}

#[tokio::test]
async fn test_full_pipes_on_both_streams_do_not_block_stop() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path(), chatty_scanner(dir.path()));
    settings.scanner.stop_timeout_ms = 20_000;
    let session = ScanSession::from_settings(&settings);

    assert!(session.start_target().await);
    let summary = session.stop().await.unwrap().expect("a run was active");

    assert_eq!(summary.exit_code, Some(0));
    assert!(!summary.killed);
    assert!(summary.stdout_bytes > 64 * 1024, "stdout {}", summary.stdout_bytes);
    assert!(summary.stderr_bytes > 64 * 1024, "stderr {}", summary.stderr_bytes);

    let (stdout, stderr) = session.read_logs();
    assert_eq!(stdout.lines().count(), CHATTY_LINES);
    assert_eq!(stderr.lines().count(), CHATTY_LINES);
}
