use std::path::Path;

use drop_catcher_core::storage::{Database, MoveRecord, MoveRecordStore, MoveStatus};
use drop_catcher_core::ErrorCode;

fn make_pending(name: &str, size: u64) -> MoveRecord {
    MoveRecord::pending(&Path::new("/drop/in").join(name), size).unwrap()
}

#[test]
fn test_insert_and_get_pending_record() {
    let db = Database::open_in_memory().unwrap();
    let record = make_pending("scan.pdf", 2048);

    let id = db.insert(&record).unwrap();
    assert_eq!(id, record.id);

    let stored = db.get_move_record(&id).unwrap().unwrap();
    assert_eq!(stored, record);
    assert_eq!(stored.status, MoveStatus::Pending);
    assert!(stored.content_hash.is_none());
}

#[test]
fn test_get_unknown_record_is_none() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_move_record("does-not-exist").unwrap().is_none());
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let record = make_pending("scan.pdf", 1);
    db.insert(&record).unwrap();
    assert!(db.insert(&record).is_err());
}

#[test]
fn test_upsert_overwrites_pending_row() {
    let db = Database::open_in_memory().unwrap();
    let mut record = make_pending("notes.txt", 10);
    db.insert(&record).unwrap();

    record.content_hash = Some("ab".repeat(32));
    record
        .mark_succeeded(Path::new("/drop/out"), "Meeting_Notes.txt")
        .unwrap();
    db.upsert(&record).unwrap();

    let stored = db.get_move_record(&record.id).unwrap().unwrap();
    assert_eq!(stored, record);
    assert_eq!(stored.status, MoveStatus::Succeeded);
    assert_eq!(stored.target_file_name.as_deref(), Some("Meeting_Notes.txt"));
}

#[test]
fn test_upsert_twice_converges_to_one_row() {
    let db = Database::open_in_memory().unwrap();
    let mut record = make_pending("blank.txt", 0);
    db.insert(&record).unwrap();
    record
        .mark_failed(ErrorCode::AnalysisIncomplete, "no text")
        .unwrap();

    db.upsert(&record).unwrap();
    let first = db.get_move_record(&record.id).unwrap().unwrap();
    db.upsert(&record).unwrap();
    let second = db.get_move_record(&record.id).unwrap().unwrap();

    assert_eq!(first, second);
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM move_record", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_error_code_round_trips_through_storage() {
    let db = Database::open_in_memory().unwrap();
    let mut record = make_pending("scan.docx", 5);
    db.insert(&record).unwrap();
    record
        .mark_failed(ErrorCode::NoAnalyzerAvailable, "No analyzer for extension: docx")
        .unwrap();
    db.upsert(&record).unwrap();

    let raw: (String, String) = db
        .connection()
        .query_row(
            "SELECT status, error_code FROM move_record WHERE id = ?1",
            rusqlite::params![record.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(raw.0, "MOVE_FAILED");
    assert_eq!(raw.1, "NO_ANALYZER_AVAILABLE");

    let stored = db.get_move_record(&record.id).unwrap().unwrap();
    assert_eq!(stored.error_code, Some(ErrorCode::NoAnalyzerAvailable));
}

#[test]
fn test_list_newest_first_and_count_by_status() {
    let db = Database::open_in_memory().unwrap();

    let mut ok = make_pending("a.txt", 1);
    db.insert(&ok).unwrap();
    ok.mark_succeeded(Path::new("/out"), "A.txt").unwrap();
    db.upsert(&ok).unwrap();

    let mut failed = make_pending("b.txt", 1);
    db.insert(&failed).unwrap();
    failed
        .mark_failed(ErrorCode::StabilityChecksExceeded, "Total checks exceeded")
        .unwrap();
    db.upsert(&failed).unwrap();

    let pending = make_pending("c.txt", 1);
    db.insert(&pending).unwrap();

    let listed = db.list_move_records(10).unwrap();
    let names: Vec<&str> = listed.iter().map(|r| r.source_file_name.as_str()).collect();
    assert_eq!(names, vec!["c.txt", "b.txt", "a.txt"]);
    assert_eq!(db.list_move_records(1).unwrap().len(), 1);

    let counts = db.count_by_status().unwrap();
    assert_eq!(
        counts,
        vec![
            (MoveStatus::Pending, 1),
            (MoveStatus::Succeeded, 1),
            (MoveStatus::MoveFailed, 1),
        ]
    );
}

#[test]
fn test_open_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    let record = make_pending("kept.txt", 3);
    {
        let db = Database::open(&path).unwrap();
        db.insert(&record).unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_move_record(&record.id).unwrap().unwrap(), record);
}
