//! Every catalog entry executes against a real stop table.

use super::{ScratchTable, StopRow};
use police_stops::catalog::ResultShape;
use police_stops::report::{ReportExecutor, ReportParams, ReportResult};

fn seed() -> Vec<StopRow> {
    vec![
        StopRow::default(),
        StopRow {
            vehicle_number: "MH12XY0001",
            stop_date: "2021-06-30",
            stop_time: "23:45",
            country_name: "USA",
            driver_gender: "F",
            driver_race: "White",
            driver_age: Some(17),
            violation: "DUI",
            stop_outcome: "Arrest Driver",
            search_conducted: true,
            search_type: Some("Frisk"),
            drugs_related_stop: true,
            stop_duration: "30+ Min",
        },
        StopRow {
            vehicle_number: "DL3CAB0042",
            stop_date: "2021-07-01",
            stop_time: "14:05",
            country_name: "Canada",
            driver_age: Some(45),
            violation: "Seatbelt",
            stop_outcome: "Warning",
            stop_duration: "16-30 Min",
            ..Default::default()
        },
    ]
}

#[tokio::test]
async fn test_every_report_executes() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table.insert(&seed()).await;
    let executor = ReportExecutor::new(&table.client, &table.catalog);

    for definition in table.catalog.entries() {
        let report = match executor.run(definition, &ReportParams::new()).await {
            Ok(report) => report,
            Err(e) => panic!("{} failed: {e}\nSQL: {}", definition.key, definition.sql),
        };

        match (&definition.shape, &report.result) {
            (ResultShape::Scalar { .. }, ReportResult::Scalar(_)) => {}
            (ResultShape::Table { columns }, ReportResult::Table(result)) => {
                assert_eq!(&result.column_names(), columns, "{}", definition.key);
            }
            // Filtered aggregates such as HAVING COUNT(*) > 10 may match nothing
            (ResultShape::Table { .. }, ReportResult::Empty(_)) => {}
            (shape, result) => panic!("{}: {shape:?} produced {result:?}", definition.key),
        }
    }

    table.remove().await;
}

#[tokio::test]
async fn test_scalar_kpis_on_empty_table() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let overview = executor.overview().await.unwrap();

    assert_eq!(overview.total_stops, 0);
    assert_eq!(overview.arrest_rate_percent(), None);

    table.remove().await;
}
