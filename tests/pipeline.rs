//! CSV text through reconciliation, normalization and feature building.

use chrono::{NaiveDate, NaiveDateTime};
use price_forecaster::data::{DataError, DuplicatePolicy, RawTable};
use price_forecaster::forecast::ForecastPipeline;

fn table(csv: &str) -> RawTable {
    RawTable::from_reader(csv.as_bytes()).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn pipeline(lags: usize) -> ForecastPipeline {
    ForecastPipeline::new("france", lags, DuplicatePolicy::Reject)
}

#[test]
fn date_and_hour_columns_with_ranges() {
    let csv = "\
date,hour,france,germany
2022-01-01,00:00 - 01:00,50,60
2022-01-01,01:00 - 02:00,,61
2022-01-01,02:00 - 03:00,70,62
";
    let series = pipeline(1).normalize(&table(csv)).unwrap();

    assert_eq!(
        series.timestamps(),
        &[at(2022, 1, 1, 0), at(2022, 1, 1, 1), at(2022, 1, 1, 2)]
    );
    assert_eq!(series.prices(), &[50.0, 60.0, 70.0]);
}

#[test]
fn combined_first_column() {
    let csv = "\
Delivery,france
2022/01/05 13:00 - 14:00,10
2022/01/05 14:00 - 15:00,12
2022/01/05 15:00 - 16:00,11
";
    let series = pipeline(1).normalize(&table(csv)).unwrap();

    assert_eq!(series.timestamps()[0], at(2022, 1, 5, 13));
    assert_eq!(series.timestamps()[2], at(2022, 1, 5, 15));
    assert_eq!(series.prices(), &[10.0, 12.0, 11.0]);
}

#[test]
fn gaps_are_interpolated_and_edges_filled() {
    let csv = "\
timestamp,france
2022-01-01 00:00,
2022-01-01 01:00,10
2022-01-01 02:00,n/a
2022-01-01 03:00,
2022-01-01 04:00,40
2022-01-01 05:00,
";
    let series = pipeline(1).normalize(&table(csv)).unwrap();
    assert_eq!(series.prices(), &[10.0, 10.0, 20.0, 30.0, 40.0, 40.0]);
}

#[test]
fn unknown_layout_lists_columns() {
    let err = pipeline(1).normalize(&table("foo,bar\n1,2\n")).unwrap_err();
    match &err {
        DataError::Schema { columns, .. } => assert_eq!(columns, &["foo", "bar"]),
        other => panic!("expected schema error, got {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("foo") && msg.contains("bar"));
}

#[test]
fn missing_target_column_is_schema_error() {
    let csv = "timestamp,germany\n2022-01-01 00:00,1\n";
    let err = pipeline(1).normalize(&table(csv)).unwrap_err();
    assert!(matches!(err, DataError::Schema { .. }));
}

#[test]
fn row_order_does_not_change_the_dataset() {
    let sorted = "\
timestamp,france
2022-01-01 00:00,1
2022-01-01 01:00,2
2022-01-01 02:00,
2022-01-01 03:00,8
2022-01-01 04:00,5
";
    let shuffled = "\
timestamp,france
2022-01-01 03:00,8
2022-01-01 00:00,1
2022-01-01 04:00,5
2022-01-01 02:00,
2022-01-01 01:00,2
";
    let p = pipeline(2);
    assert_eq!(
        p.build_dataset(&table(sorted)).unwrap(),
        p.build_dataset(&table(shuffled)).unwrap()
    );
}

#[test]
fn duplicate_timestamps_rejected_by_default() {
    let csv = "\
timestamp,france
2022-01-01 00:00,1
2022-01-01 00:00,2
";
    let err = pipeline(1).normalize(&table(csv)).unwrap_err();
    assert!(matches!(err, DataError::DuplicateTimestamp { .. }));

    let series = ForecastPipeline::new("france", 1, DuplicatePolicy::Average)
        .normalize(&table(csv))
        .unwrap();
    assert_eq!(series.prices(), &[1.5]);
}

#[test]
fn dataset_rows_and_latest_row() {
    let csv = "\
timestamp,france
2022-01-03 00:00,1
2022-01-03 01:00,2
2022-01-03 02:00,3
2022-01-03 03:00,4
2022-01-03 04:00,5
";
    let p = pipeline(2);
    let dataset = p.build_dataset(&table(csv)).unwrap();
    assert_eq!(dataset.len(), 3);

    let first = &dataset.rows()[0];
    assert_eq!(first.timestamp, at(2022, 1, 3, 2));
    assert_eq!(first.lag(1), Some(2.0));
    assert_eq!(first.lag(2), Some(1.0));
    assert_eq!(first.price, 3.0);

    let latest = p.latest_feature_row(&table(csv)).unwrap();
    assert_eq!(latest.timestamp, at(2022, 1, 3, 4));
    assert_eq!(latest.features(), vec![4.0, 3.0, 4.0, 0.0, 1.0]);
}

#[test]
fn short_history_has_no_latest_row() {
    let csv = "timestamp,france\n2022-01-01 00:00,1\n2022-01-01 01:00,2\n";
    let err = pipeline(24).latest_feature_row(&table(csv)).unwrap_err();
    match err {
        DataError::InsufficientHistory { required, available } => {
            assert_eq!(required, 25);
            assert_eq!(available, 2);
        }
        other => panic!("expected insufficient history, got {other:?}"),
    }
}
