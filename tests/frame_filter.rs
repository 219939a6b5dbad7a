mod common;

use common::range;
use indexmap::IndexMap;
use playback_frame_synchronizer::{
    filter::sort_by_timestamp, Error, Fields, FrameFilter, FrameTable,
};

fn table(timestamps: &[&str]) -> FrameTable {
    let columns = vec![
        "index".to_string(),
        "frame_timestamp".to_string(),
        "color_file_path".to_string(),
    ];
    let rows = timestamps
        .iter()
        .enumerate()
        .map(|(idx, ts)| {
            let mut fields = Fields::new();
            fields.insert("index".to_string(), idx.to_string());
            fields.insert("frame_timestamp".to_string(), ts.to_string());
            fields.insert("color_file_path".to_string(), format!("color_{idx}.png"));
            fields
        })
        .collect();

    FrameTable {
        name: "realsense".to_string(),
        columns,
        rows,
    }
}

#[test]
fn frames_inside_ranges_are_kept_and_reindexed() {
    let table = table(&["50", "150", "250", "", "abc", "350"]);
    let ranges = vec![range("1", 100.0, 200.0), range("2", 300.0, 400.0)];

    let filtered = FrameFilter::default().filter(&table, &ranges).unwrap();

    let kept: Vec<(usize, f64)> = filtered
        .frames
        .iter()
        .map(|frame| (frame.sequence_index, frame.timestamp))
        .collect();
    assert_eq!(kept, vec![(0, 150.0), (1, 350.0)]);

    let report = &filtered.report;
    assert_eq!(report.total, 6);
    assert_eq!(report.retained, 2);
    assert_eq!(report.malformed, 2);
    let expected: IndexMap<String, usize> =
        [("1".to_string(), 1), ("2".to_string(), 1)].into_iter().collect();
    assert_eq!(report.per_content, expected);
}

#[test]
fn range_bounds_are_inclusive() {
    let table = table(&["99.999", "100", "200", "200.001"]);
    let ranges = vec![range("1", 100.0, 200.0)];

    let filtered = FrameFilter::default().filter(&table, &ranges).unwrap();
    let kept: Vec<f64> = filtered.frames.iter().map(|frame| frame.timestamp).collect();
    assert_eq!(kept, vec![100.0, 200.0]);
}

#[test]
fn payload_is_carried_verbatim() {
    let table = table(&["10", "20"]);
    let ranges = vec![range("1", 15.0, 25.0)];

    let filtered = FrameFilter::default().filter(&table, &ranges).unwrap();
    let frame = &filtered.frames[0];
    assert_eq!(frame.fields["color_file_path"], "color_1.png");
    assert_eq!(frame.fields["frame_timestamp"], "20");
    assert_eq!(frame.fields["index"], "1");
}

#[test]
fn overlapping_ranges_count_under_the_first() {
    let table = table(&["150"]);
    let ranges = vec![range("7", 100.0, 200.0), range("8", 120.0, 300.0)];

    let filtered = FrameFilter::default().filter(&table, &ranges).unwrap();
    assert_eq!(filtered.report.per_content.get("7"), Some(&1));
    assert_eq!(filtered.report.per_content.get("8"), None);
}

#[test]
fn missing_timestamp_column_is_fatal() {
    let mut table = table(&["150"]);
    table.columns.retain(|name| name != "frame_timestamp");

    let err = FrameFilter::default()
        .filter(&table, &[range("1", 0.0, 1000.0)])
        .unwrap_err();
    match err {
        Error::MissingRequiredColumn { stream, column } => {
            assert_eq!(stream, "realsense");
            assert_eq!(column, "frame_timestamp");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn custom_timestamp_column() {
    let mut table = table(&["150"]);
    table.columns.push("system_time".to_string());
    table.rows[0].insert("system_time".to_string(), "5".to_string());

    let filtered = FrameFilter::new("system_time")
        .filter(&table, &[range("1", 0.0, 10.0)])
        .unwrap();
    assert_eq!(filtered.frames.len(), 1);
    assert_eq!(filtered.frames[0].timestamp, 5.0);
}

#[test]
fn no_ranges_keep_nothing() {
    let filtered = FrameFilter::default()
        .filter(&table(&["1", "2"]), &[])
        .unwrap();
    assert!(filtered.frames.is_empty());
    assert_eq!(filtered.report.total, 2);
}

#[test]
fn sorting_is_stable() {
    let table = table(&["30", "10", "30", "20"]);
    let mut frames = FrameFilter::default()
        .filter(&table, &[range("1", 0.0, 100.0)])
        .unwrap()
        .frames;

    sort_by_timestamp(&mut frames);
    let order: Vec<usize> = frames.iter().map(|frame| frame.sequence_index).collect();
    assert_eq!(order, vec![1, 3, 0, 2]);
}
