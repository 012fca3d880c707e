//! Integration tests for offline scans and repair.

mod common;

use std::path::Path;

use chrono::NaiveDate;
use common::{export_line, ingestor, log_line, seed_distributive, store, ServerTree, DAY};
use update_stat_parser::config::WatchRoot;
use update_stat_parser::ingest::{
    find_missing_archives, recover_unfinished, repair, scan_all, scan_common_file, scan_folder,
    scan_recent_days, FileTask,
};
use update_stat_parser::store::{FileKey, Storage, Table};
use update_stat_parser::watcher::{FileFamily, RootRole};

#[tokio::test]
async fn test_scan_all_walks_day_folders() {
    let tree = ServerTree::new();
    tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "a")),
    );
    std::fs::write(
        tree.day_dir("2024_01_02").join("SOJ_43#1.log"),
        format!("{}\n", log_line("2024-01-02 10:00:00", "S2", "b")),
    )
    .unwrap();
    std::fs::write(tree.day_dir("2024_01_02").join("notes.txt"), "ignored").unwrap();
    tree.write_log("SOJ_43#1_letter.log", "ignored\n");

    let store = store().await;
    let summary = scan_all(&ingestor(&store), &[tree.root("srv")]).await;

    assert_eq!(summary.files, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.inserted, 2);
    assert_eq!(store.count(Table::Messages).await.unwrap(), 2);
}

#[tokio::test]
async fn test_scan_recent_days_covers_days_before_today() {
    let tree = ServerTree::new();
    tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "a")),
    );
    tree.write_log(
        "SOJ_42#1.tmp",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "partial")),
    );
    std::fs::write(
        tree.day_dir("2024_01_02").join("SOJ_44#1.log"),
        format!("{}\n", log_line("2024-01-02 10:00:00", "S4", "today")),
    )
    .unwrap();
    std::fs::write(
        tree.day_dir("2023_12_25").join("SOJ_42#1.log"),
        format!("{}\n", log_line("2023-12-25 10:00:00", "S0", "old")),
    )
    .unwrap();

    let store = store().await;
    let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let summary = scan_recent_days(&ingestor(&store), &[tree.root("srv")], 3, today).await;

    // Window is 2023_12_30 ..= 2024_01_01: two folders missing, today and
    // 2023_12_25 outside, the .tmp file not a log.
    assert_eq!(summary.files, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.inserted, 1);
    assert_eq!(store.count(Table::Messages).await.unwrap(), 1);
}

#[tokio::test]
async fn test_scan_folder_processes_every_file() {
    let tree = ServerTree::new();
    tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "a")),
    );
    tree.write_log("SOJ_42#1_result.log", "h1\nh2\n0;upd.zip\n");

    let store = store().await;
    let summary = scan_folder(&ingestor(&store), &tree.day_dir(DAY), "srv").await;

    assert_eq!(summary.files, 2);
    assert_eq!(store.count(Table::Messages).await.unwrap(), 1);
    assert_eq!(store.count(Table::Acknowledgements).await.unwrap(), 1);
}

#[tokio::test]
async fn test_scan_folder_missing_dir_counts_failure() {
    let store = store().await;
    let summary = scan_folder(&ingestor(&store), Path::new("/nonexistent/2024_01_01"), "srv").await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.files, 0);
}

#[tokio::test]
async fn test_scan_common_file_leaves_position_untouched() {
    let tree = ServerTree::new();
    let export = tree.write_file(
        Path::new("Stat/clientstat.csv"),
        &format!(
            "{}\n{}\n",
            export_line("42", "01", "S1", ("2024-01-01", "10:00:00")),
            export_line("43", "01", "S2", ("2024-01-01", "11:00:00"))
        ),
    );
    let store = store().await;
    let report = scan_common_file(&ingestor(&store), &export, "srv").await.unwrap();

    assert_eq!(report.inserted, 2);
    let key = FileKey::new("clientstat.csv", "Stat", FileFamily::Common);
    assert!(store.find_position(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_missing_archives_fills_names() {
    let tree = ServerTree::new();
    let path = tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "Сессия удалена")),
    );
    let store = store().await;
    ingestor(&store)
        .process_file(&FileTask::new(path, RootRole::Session, "srv"))
        .await
        .unwrap();
    assert_eq!(store.finished_files_without_archive().await.unwrap().len(), 1);

    tree.write_archive(&format!("CONS#SOJ_42#{DAY}_1.zip"));
    let found = find_missing_archives(store.as_ref(), &[tree.root("srv")])
        .await
        .unwrap();

    assert_eq!(found, 1);
    assert!(store.finished_files_without_archive().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recover_unfinished_ingests_new_lines() {
    let tree = ServerTree::new();
    let path = tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "start")),
    );
    let finished = tree.write_log(
        "SOJ_43#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S2", "Сессия удалена")),
    );
    let store = store().await;
    let ingestor = ingestor(&store);
    for file in [&path, &finished] {
        ingestor
            .process_file(&FileTask::new(file.clone(), RootRole::Session, "srv"))
            .await
            .unwrap();
    }

    std::fs::write(
        &path,
        format!(
            "{}\n{}\n",
            log_line("2024-01-01 10:00:00", "S1", "start"),
            log_line("2024-01-01 10:10:00", "S1", "Сессия удалена")
        ),
    )
    .unwrap();

    let summary = recover_unfinished(&ingestor, &[tree.root("srv")])
        .await
        .unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.finished, 1);
    assert!(store.unfinished_log_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recover_reports_missing_files() {
    let tree = ServerTree::new();
    let path = tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 10:00:00", "S1", "start")),
    );
    let store = store().await;
    let ingestor = ingestor(&store);
    ingestor
        .process_file(&FileTask::new(path.clone(), RootRole::Session, "srv"))
        .await
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    let summary = recover_unfinished(&ingestor, &[WatchRoot::new("srv", tree.logs_root())])
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_repair_fills_start_and_entity() {
    let tree = ServerTree::new();
    let store = store().await;
    let ingestor = ingestor(&store);

    // Summary arrives before any message of its session.
    let export = tree.write_file(
        Path::new("Stat/clientstat.csv"),
        &format!("{}\n", export_line("0042", "01", "S1", ("0", "0"))),
    );
    scan_common_file(&ingestor, &export, "srv").await.unwrap();
    assert_eq!(store.summaries_without_start().await.unwrap().len(), 1);
    assert_eq!(store.summaries_without_entity().await.unwrap().len(), 1);

    let log = tree.write_log(
        "SOJ_42#1.log",
        &format!("{}\n", log_line("2024-01-01 08:30:00", "S1", "hello")),
    );
    ingestor
        .process_file(&FileTask::new(log, RootRole::Session, "srv"))
        .await
        .unwrap();
    seed_distributive(&store, 11, "42", "+", "2021-06-01").await;

    let report = repair(store.as_ref()).await.unwrap();
    assert_eq!(report.starts_filled, 1);
    assert_eq!(report.entities_filled, 1);
    assert_eq!(report.starts_missing, 0);
    assert!(store.summaries_without_start().await.unwrap().is_empty());
    assert!(store.summaries_without_entity().await.unwrap().is_empty());
}
