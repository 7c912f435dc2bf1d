//! Unit tests for the sync-state crate.

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::{
    build_state_matrix, CompletionRecord, CompletionStore, FileStore, Lookback, MatrixRequest,
    MemoryStore, SyncWindow,
};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn names(jobs: &[&str]) -> Vec<String> {
    jobs.iter().map(|j| j.to_string()).collect()
}

// ============================================================================
// StateMatrix Tests
// ============================================================================

#[test]
fn test_matrix_reconciles_history_and_new_jobs() {
    let history = vec![CompletionRecord::new(d("2024-01-01"), "jobA")];
    let known = names(&["jobA", "jobB"]);
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &[],
        requested_dates: &[],
        window: SyncWindow::new(d("2024-01-01"), d("2024-01-03")).unwrap(),
        known_jobs: &known,
        history: &history,
    });

    let m = &plan.matrix;
    assert_eq!(m.dates(), &[d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]);
    assert!(m.is_complete(d("2024-01-01"), "jobA"));
    assert!(!m.is_complete(d("2024-01-02"), "jobA"));
    assert!(!m.is_complete(d("2024-01-03"), "jobA"));
    for date in m.dates() {
        assert!(!m.is_complete(*date, "jobB"));
    }
    assert_eq!(m.pending_dates("jobA"), vec![d("2024-01-02"), d("2024-01-03")]);
    assert_eq!(m.pending_dates("jobB").len(), 3);
    assert_eq!(plan.jobs, known);
}

#[test]
fn test_explicit_date_forces_pending() {
    let history = vec![
        CompletionRecord::new(d("2024-01-01"), "jobA"),
        CompletionRecord::new(d("2024-01-02"), "jobA"),
    ];
    let known = names(&["jobA", "jobB"]);
    let requested_jobs = names(&["jobA"]);
    let requested_dates = vec![d("2024-01-01")];
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &requested_jobs,
        requested_dates: &requested_dates,
        window: SyncWindow::new(d("2024-01-01"), d("2024-01-03")).unwrap(),
        known_jobs: &known,
        history: &history,
    });

    assert_eq!(plan.jobs, names(&["jobA"]));
    assert_eq!(plan.matrix.dates(), &[d("2024-01-01")]);
    assert!(!plan.matrix.is_complete(d("2024-01-01"), "jobA"));
    assert_eq!(plan.matrix.pending_dates("jobA"), vec![d("2024-01-01")]);
}

#[test]
fn test_explicit_dates_without_jobs_cover_all_known_jobs() {
    let history = vec![CompletionRecord::new(d("2024-05-02"), "jobB")];
    let known = names(&["jobA", "jobB"]);
    let requested_dates = vec![d("2024-05-02"), d("2024-05-01"), d("2024-05-02")];
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &[],
        requested_dates: &requested_dates,
        window: SyncWindow::new(d("2024-05-01"), d("2024-05-31")).unwrap(),
        known_jobs: &known,
        history: &history,
    });

    assert_eq!(plan.jobs, known);
    assert_eq!(plan.matrix.dates(), &[d("2024-05-01"), d("2024-05-02")]);
    assert_eq!(
        plan.matrix.pending_dates("jobB"),
        vec![d("2024-05-01"), d("2024-05-02")]
    );
}

#[test]
fn test_requested_jobs_keep_history() {
    let history = vec![
        CompletionRecord::new(d("2024-01-01"), "jobA"),
        CompletionRecord::new(d("2024-01-03"), "jobA"),
    ];
    let known = names(&["jobA", "jobB"]);
    let requested = names(&["jobA", "jobNew"]);
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &requested,
        requested_dates: &[],
        window: SyncWindow::new(d("2024-01-01"), d("2024-01-03")).unwrap(),
        known_jobs: &known,
        history: &history,
    });

    assert_eq!(plan.jobs, requested);
    assert_eq!(plan.matrix.pending_dates("jobA"), vec![d("2024-01-02")]);
    assert!(plan.matrix.has_job("jobNew"));
    assert_eq!(plan.matrix.pending_dates("jobNew").len(), 3);
}

#[test]
fn test_history_outside_window_or_for_retired_jobs_is_ignored() {
    let history = vec![
        CompletionRecord::new(d("2023-12-31"), "jobA"),
        CompletionRecord::new(d("2024-01-02"), "retired"),
    ];
    let known = names(&["jobA"]);
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &[],
        requested_dates: &[],
        window: SyncWindow::new(d("2024-01-01"), d("2024-01-02")).unwrap(),
        known_jobs: &known,
        history: &history,
    });

    assert!(!plan.matrix.has_job("retired"));
    assert_eq!(plan.matrix.pending_dates("jobA").len(), 2);
}

#[test]
fn test_duplicate_job_names_run_once() {
    let known = names(&["jobA", "jobB", "jobA"]);
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &[],
        requested_dates: &[],
        window: SyncWindow::new(d("2024-01-01"), d("2024-01-01")).unwrap(),
        known_jobs: &known,
        history: &[],
    });
    assert_eq!(plan.jobs, names(&["jobA", "jobB"]));
}

#[test]
fn test_unknown_column_is_fully_pending() {
    let plan = build_state_matrix(MatrixRequest {
        requested_jobs: &[],
        requested_dates: &[],
        window: SyncWindow::new(d("2024-01-01"), d("2024-01-02")).unwrap(),
        known_jobs: &[],
        history: &[],
    });
    assert_eq!(plan.matrix.pending_dates("ghost").len(), 2);
    assert!(!plan.matrix.is_complete(d("2030-01-01"), "ghost"));
}

// ============================================================================
// SyncWindow Tests
// ============================================================================

#[test]
fn test_window_ending_at_months() {
    let window = SyncWindow::ending_at(d("2024-05-30"), Lookback::Months(3), 1).unwrap();
    assert_eq!(window.end, d("2024-05-31"));
    assert_eq!(window.start, d("2024-02-29"));
    assert!(window.contains(d("2024-03-15")));
    assert!(!window.contains(d("2024-06-01")));
}

#[test]
fn test_window_ending_at_days() {
    let window = SyncWindow::ending_at(d("2024-01-10"), Lookback::Days(9), 0).unwrap();
    assert_eq!(window.start, d("2024-01-01"));
    assert_eq!(window.dates().len(), 10);
}

#[test]
fn test_window_rejects_inverted_range() {
    assert!(SyncWindow::new(d("2024-01-02"), d("2024-01-01")).is_err());
}

// ============================================================================
// Store Tests
// ============================================================================

#[tokio::test]
async fn test_memory_store_commit_replaces_records() {
    let store = MemoryStore::new();
    store
        .commit("jobA", &[d("2024-01-01"), d("2024-01-02")])
        .await
        .unwrap();
    store.commit("jobA", &[d("2024-01-02")]).await.unwrap();
    store.commit("jobB", &[d("2024-01-02")]).await.unwrap();
    store.commit("jobB", &[]).await.unwrap();

    let records = store.records().await;
    assert_eq!(records.len(), 3);
    assert_eq!(store.commits().await.len(), 3);

    let loaded = store
        .load_since(d("2024-01-02"), d("2024-01-31"))
        .await
        .unwrap();
    assert_eq!(
        loaded,
        vec![
            CompletionRecord::new(d("2024-01-02"), "jobA"),
            CompletionRecord::new(d("2024-01-02"), "jobB"),
        ]
    );
}

#[tokio::test]
async fn test_memory_store_catalog() {
    assert_eq!(MemoryStore::new().registered_jobs().await.unwrap(), None);
    let store = MemoryStore::with_catalog(["a", "b"]);
    assert_eq!(
        store.registered_jobs().await.unwrap(),
        Some(names(&["a", "b"]))
    );
}

#[tokio::test]
async fn test_file_store_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("state").join("updated_state.json");
    let store = FileStore::new(&path);

    store.ensure_schema().await.unwrap();
    assert!(path.exists());

    store
        .commit("jobA", &[d("2024-01-01"), d("2024-01-02")])
        .await
        .unwrap();
    store.commit("jobA", &[d("2024-01-02")]).await.unwrap();

    // A fresh handle sees what the first one wrote
    let reopened = FileStore::new(&path);
    let loaded = reopened
        .load_since(d("2024-01-01"), d("2024-01-31"))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.contains(&CompletionRecord::new(d("2024-01-02"), "jobA")));
}

#[tokio::test]
async fn test_file_store_missing_file_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = FileStore::new(tmp.path().join("absent.json"));
    let loaded = store
        .load_since(d("2024-01-01"), d("2024-12-31"))
        .await
        .unwrap();
    assert!(loaded.is_empty());
}
