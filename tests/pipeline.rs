use playback_frame_synchronizer::{
    config::{Config, MatchMode},
    pipeline::{run, EventSource, RunPaths},
    Error,
};
use std::{fmt::Write as _, fs, path::Path, sync::Arc};
use tempfile::TempDir;

const BASE_MS: f64 = 1_709_251_200_000.0;

fn write_play_log(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("play.csv");
    fs::write(
        &path,
        "time,content_id,kind\n\
         2024-03-01T00:00:00Z,1,play\n\
         2024-03-01T00:00:00.500Z,1,seek\n\
         2024-03-01T00:00:01Z,1,end\n\
         2024-03-01T00:00:02Z,2,play\n\
         2024-03-01T00:00:03Z,2,pause\n",
    )
    .unwrap();
    path
}

fn write_primary(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("realsense.csv");
    let mut text = String::from("index,frame_timestamp,color_file_path\n");
    for idx in 0..15 {
        let ts = BASE_MS + idx as f64 * 250.0;
        writeln!(text, "{idx},{ts:.14},color_{idx}.png").unwrap();
    }
    text.push_str("15,,color_15.png\n");
    fs::write(&path, text).unwrap();
    path
}

fn write_secondary(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("tobii.csv");
    let mut text = String::from("index,frame_timestamp,left_pupil_diameter\n");
    for idx in 0..36 {
        let ts = BASE_MS + idx as f64 * 100.0;
        writeln!(text, "{idx},{ts:.14},3.{idx}").unwrap();
    }
    fs::write(&path, text).unwrap();
    path
}

fn paths(dir: &TempDir) -> RunPaths {
    let root = dir.path();
    RunPaths {
        events: EventSource::PlayLog(write_play_log(root)),
        primary: write_primary(root),
        secondary: write_secondary(root),
        matched_out: root.join("matched/frames_matched.csv"),
        played_out: Some(root.join("played.csv")),
        filtered_primary_out: Some(root.join("realsense/filtered.csv")),
        filtered_secondary_out: Some(root.join("tobii/filtered.csv")),
    }
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = vec![header];
    for record in reader.records() {
        rows.push(record.unwrap().iter().map(str::to_string).collect());
    }
    rows
}

#[tokio::test]
async fn session_is_filtered_and_matched() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);

    let summary = run(Arc::new(Config::default()), paths.clone())
        .await
        .unwrap();

    assert_eq!(summary.ranges.len(), 2);
    assert_eq!(summary.ranges[0].start, BASE_MS);
    assert_eq!(summary.ranges[0].end, BASE_MS + 1000.0);
    assert_eq!(summary.ranges[1].content_id, "2");
    assert_eq!(summary.ranges[1].end, BASE_MS + 3000.0);

    assert_eq!(summary.primary.total, 16);
    assert_eq!(summary.primary.malformed, 1);
    assert_eq!(summary.primary.retained, 10);
    assert_eq!(summary.secondary.retained, 22);
    assert_eq!(summary.matching.matched, 10);

    let matched = read_rows(&paths.matched_out);
    assert_eq!(
        matched[0],
        vec![
            "sequence_index",
            "secondary_timestamp",
            "left_pupil_diameter",
            "primary_timestamp",
            "color_file_path",
            "content_id",
            "match_delta_ms",
        ]
    );
    assert_eq!(matched.len(), 11);
    assert_eq!(
        matched[1],
        vec![
            "0".to_string(),
            format!("{BASE_MS:.14}"),
            "3.0".to_string(),
            format!("{BASE_MS:.14}"),
            "color_0.png".to_string(),
            "1".to_string(),
            "0.000".to_string(),
        ]
    );
    // 250ms sits between two gaze samples; the earlier one is scanned first
    assert_eq!(matched[2][2], "3.2");
    assert_eq!(matched[2][6], "50.000");
    assert_eq!(matched[6][5], "2");
    assert_eq!(matched[10][0], "9");

    let filtered = read_rows(paths.filtered_primary_out.as_ref().unwrap());
    assert_eq!(filtered[0], vec!["index", "frame_timestamp", "color_file_path"]);
    let indices: Vec<&str> = filtered[1..].iter().map(|row| row[0].as_str()).collect();
    assert_eq!(indices, vec!["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    assert_eq!(filtered[6][2], "color_8.png");

    let played = read_rows(paths.played_out.as_ref().unwrap());
    assert_eq!(
        played[0],
        vec!["index", "timestamp", "content_id", "kind", "valid"]
    );
    assert_eq!(played.len(), 5);
    assert_eq!(played[4][3], "end");
    assert_eq!(played[4][4], "true");
}

#[tokio::test]
async fn paired_events_table_is_accepted() {
    let dir = TempDir::new().unwrap();
    let mut paths = paths(&dir);

    let played = dir.path().join("paired.csv");
    fs::write(
        &played,
        format!(
            "timestamp,content_id,kind\n{:.14},5,play\n{:.14},5,end\n",
            BASE_MS + 2000.0,
            BASE_MS + 2500.0
        ),
    )
    .unwrap();
    paths.events = EventSource::Played(played);

    let mut config = Config::default();
    config.params.mode = MatchMode::Reconciled;
    let summary = run(Arc::new(config), paths.clone()).await.unwrap();

    assert_eq!(summary.ranges.len(), 1);
    assert_eq!(summary.ranges[0].content_id, "5");
    assert_eq!(summary.primary.retained, 3);
    assert_eq!(summary.matching.matched, 3);
}

#[tokio::test]
async fn missing_stream_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let mut paths = paths(&dir);
    paths.secondary = dir.path().join("absent.csv");

    let err = run(Arc::new(Config::default()), paths.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingInputStream { ref path } if path.ends_with("absent.csv")));
    assert!(!paths.matched_out.exists());
    assert!(!paths.played_out.unwrap().exists());
}

#[tokio::test]
async fn missing_timestamp_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    fs::write(&paths.primary, "index,color_file_path\n0,color_0.png\n").unwrap();

    let err = run(Arc::new(Config::default()), paths.clone())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingRequiredColumn { ref column, .. } if column == "frame_timestamp"
    ));
    assert!(!paths.matched_out.exists());
}

#[tokio::test]
async fn log_without_ranges_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut paths = paths(&dir);
    let log = dir.path().join("pauses.csv");
    fs::write(
        &log,
        "time,content_id,kind\n2024-03-01T00:00:00Z,1,pause\nnot-a-time,1,play\n",
    )
    .unwrap();
    paths.events = EventSource::PlayLog(log);

    let err = run(Arc::new(Config::default()), paths).await.unwrap_err();
    assert!(matches!(err, Error::NoValidRanges));
}

#[tokio::test]
async fn missing_log_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut paths = paths(&dir);
    let log = dir.path().join("legacy.csv");
    fs::write(&log, "time,video_id,type\n2024-03-01T00:00:00Z,1,play\n").unwrap();
    paths.events = EventSource::PlayLog(log);

    let err = run(Arc::new(Config::default()), paths.clone())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingRequiredColumn { ref column, .. } if column == "content_id"
    ));

    // the same log reads fine once its column names are configured
    let mut config = Config::default();
    config.columns.log_content_id = "video_id".to_string();
    config.columns.log_kind = "type".to_string();
    let summary = run(Arc::new(config), paths).await.unwrap();
    assert_eq!(summary.ranges.len(), 1);
    assert_eq!(summary.ranges[0].end, BASE_MS + 30_000.0);
}

#[tokio::test]
async fn no_frames_in_range_leaves_no_matched_table() {
    let dir = TempDir::new().unwrap();
    let mut paths = paths(&dir);

    let played = dir.path().join("late.csv");
    fs::write(
        &played,
        format!(
            "timestamp,content_id,kind\n{:.14},7,play\n{:.14},7,end\n",
            BASE_MS + 100_000.0,
            BASE_MS + 101_000.0
        ),
    )
    .unwrap();
    paths.events = EventSource::Played(played);

    let summary = run(Arc::new(Config::default()), paths.clone())
        .await
        .unwrap();

    assert_eq!(summary.ranges.len(), 1);
    assert_eq!(summary.primary.retained, 0);
    assert_eq!(summary.matching.primary_frames, 0);
    assert!(!paths.matched_out.exists());
    assert!(paths.played_out.unwrap().exists());
}
