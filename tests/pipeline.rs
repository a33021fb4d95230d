use std::io::Write;

use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use vessel_log::data::identity::extract_identity;
use vessel_log::data::loader::{decode, load_file};
use vessel_log::data::regression::fit;
use vessel_log::data::series::project;
use vessel_log::data::filter::slice;
use vessel_log::data::time_index::normalize;
use vessel_log::{
    CellValue, ColumnSelection, DateInterval, EngineError, IngestOptions, NormalizedTable,
    RegressionQuery, SeriesQuery, Session, TableQuery,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
}

/// A small log written out of time order, identity filled in on the last row.
fn log_csv() -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Time", "Speed", "RPM", "Fuel", "Vessel Name", "Vessel IMO No"])
        .unwrap();
    let rows = [
        ["2023-01-03 12:00:00", "12.0", "90", "30.1", "", ""],
        ["2023-01-01 00:00:00", "10.0", "80", "25.0", "", ""],
        ["2023-01-02 06:00:00", "11.0", "85", "", "", ""],
        ["2023-01-05 00:00:00", "13.0", "95", "33.4", "", ""],
        ["2023-01-05 23:59:00", "14.0", "100", "35.0", "Northern Atlas", "9123456"],
    ];
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.into_inner().unwrap()
}

fn loaded() -> NormalizedTable {
    normalize(decode(&log_csv(), "voyage.csv").unwrap()).unwrap()
}

#[test]
fn normalized_index_is_sorted_and_rows_preserved() {
    let table = loaded();
    assert_eq!(table.len(), 5);
    assert!(table.index().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        table.date_span(),
        Some((day(1), day(5)))
    );
}

#[test]
fn identity_comes_from_the_latest_row() {
    let id = extract_identity(&loaded());
    assert_eq!(id.name, "Northern Atlas");
    assert_eq!(id.imo, "9123456");
}

#[test]
fn slice_includes_both_bound_days() {
    let table = loaded();
    let sliced = slice(&table, &DateInterval::between(day(2), day(5)).unwrap()).unwrap();
    assert_eq!(sliced.len(), 4);
    assert_eq!(sliced.index().last().unwrap().date(), day(5));
}

#[test]
fn series_and_regression_over_a_range() {
    let table = loaded();
    let interval = DateInterval::between(day(1), day(3)).unwrap();

    let series = SeriesQuery::new(interval, &["Speed", "Fuel"]).unwrap().run(&table).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].points.len(), 3);
    assert_eq!(series[1].points[1].1, CellValue::Empty);

    let fit = RegressionQuery::new(interval, "RPM", "Speed").unwrap().run(&table).unwrap();
    assert_eq!(fit.points.len(), 3);
    assert!((fit.slope - 0.2).abs() < 1e-9);
    assert!((fit.r_squared - 1.0).abs() < 1e-9);
}

#[test]
fn regression_drops_rows_with_missing_fuel() {
    let table = loaded();
    let result = fit(&table, "Speed", "Fuel").unwrap();
    assert_eq!(result.points.len(), 4);
}

#[test]
fn report_range_and_unknown_columns() {
    let table = loaded();
    let rows = TableQuery::new(DateInterval::unbounded(), ColumnSelection::range("Speed", "Fuel"))
        .run(&table)
        .unwrap();
    assert_eq!(rows.columns, ["Speed", "RPM", "Fuel"]);
    assert_eq!(rows.len(), 5);

    assert!(matches!(
        project(&table, &["Heading"]),
        Err(EngineError::UnknownColumn(_))
    ));
    assert!(matches!(
        TableQuery::new(DateInterval::unbounded(), ColumnSelection::range("Fuel", "Speed"))
            .run(&table),
        Err(EngineError::InvalidColumnRange { .. })
    ));
}

#[test]
fn session_snapshot_survives_a_round_trip_through_disk() {
    let table = loaded();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(table.to_json().unwrap().as_bytes()).unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    let restored = NormalizedTable::from_json(&text).unwrap();
    assert_eq!(restored, table);
    assert_eq!(extract_identity(&restored), extract_identity(&table));
}

#[test]
fn load_file_dispatches_on_the_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voyage.csv");
    std::fs::write(&path, log_csv()).unwrap();
    let raw = load_file(&path, &IngestOptions::default()).unwrap();
    assert_eq!(raw.len(), 5);

    let txt = dir.path().join("voyage.txt");
    std::fs::write(&txt, log_csv()).unwrap();
    let err = load_file(&txt, &IngestOptions::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::UnsupportedFormat(_))
    ));
}

#[test]
fn session_upload_then_query() {
    let mut session = Session::default();
    session.upload(&log_csv(), "voyage.csv").unwrap();
    assert_eq!(session.identity().unwrap().name, "Northern Atlas");

    let none = DateInterval::between(day(20), day(21)).unwrap();
    let series = session
        .series(&SeriesQuery::new(none, &["RPM"]).unwrap())
        .unwrap();
    assert!(series[0].points.is_empty());
}

/// Same voyage as a workbook: timestamps are real date cells, the second
/// sheet must be ignored.
fn log_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let sheet = workbook.add_worksheet();
    for (col, name) in ["Time", "Speed", "RPM", "Vessel Name", "Vessel IMO No"]
        .iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    let rows = [
        ("2023-01-03 12:00:00", 12.0, 90.0),
        ("2023-01-01 00:00:00", 10.0, 80.0),
        ("2023-01-02 06:00:00", 11.0, 85.0),
    ];
    for (i, (time, speed, rpm)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        let when = ExcelDateTime::parse_from_str(time).unwrap();
        sheet.write_datetime_with_format(row, 0, &when, &stamp).unwrap();
        sheet.write_number(row, 1, *speed).unwrap();
        sheet.write_number(row, 2, *rpm).unwrap();
    }
    sheet.write_string(1, 3, "Northern Atlas").unwrap();
    sheet.write_number(1, 4, 9123456.0).unwrap();

    let other = workbook.add_worksheet();
    other.write_string(0, 0, "Notes").unwrap();
    workbook.save_to_buffer().unwrap()
}

#[test]
fn workbook_decodes_through_to_queries() {
    let raw = decode(&log_xlsx(), "voyage.xlsx").unwrap();
    let names: Vec<&str> = raw.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Time", "Speed", "RPM", "Vessel Name", "Vessel IMO No"]);
    assert_eq!(raw.len(), 3);
    assert_eq!(
        raw.column("Time").unwrap().cells[0],
        CellValue::Text("2023-01-03 12:00:00".into())
    );

    let table = normalize(raw).unwrap();
    assert_eq!(table.date_span(), Some((day(1), day(3))));
    assert_eq!(table.column("Time").unwrap().cells[0], CellValue::Text("00:00:00".into()));

    let id = extract_identity(&table);
    assert_eq!(id.name, "Northern Atlas");
    assert_eq!(id.imo, "9123456");

    let interval = DateInterval::between(day(1), day(2)).unwrap();
    let series = SeriesQuery::new(interval, &["Speed"]).unwrap().run(&table).unwrap();
    let speeds: Vec<f64> = series[0].numeric_points().map(|(_, v)| v).collect();
    assert_eq!(speeds, [10.0, 11.0]);

    let fit = fit(&table, "RPM", "Speed").unwrap();
    assert!((fit.slope - 0.2).abs() < 1e-9);
}
