//! Report execution against a live PostgreSQL store.

use super::{ScratchTable, StopRow};
use police_stops::db::Value;
use police_stops::error::ReportError;
use police_stops::report::{ReportExecutor, ReportParams, ReportResult};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_overlapping_outcome_classification() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table
        .insert(&[
            StopRow {
                stop_outcome: "Arrest Warning issued",
                ..Default::default()
            },
            StopRow {
                stop_outcome: "warning",
                ..Default::default()
            },
            StopRow {
                stop_outcome: "Citation",
                ..Default::default()
            },
        ])
        .await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let overview = executor.overview().await.unwrap();

    assert_eq!(overview.total_stops, 3);
    assert_eq!(overview.total_arrests, 1);
    assert_eq!(overview.total_warnings, 2);
    assert_eq!(overview.drug_related_stops, 0);

    table.remove().await;
}

#[tokio::test]
async fn test_vehicle_filter_is_case_insensitive_substring() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table
        .insert(&[
            StopRow {
                vehicle_number: "ka01-1234",
                ..Default::default()
            },
            StopRow {
                vehicle_number: "MH02-9999",
                ..Default::default()
            },
        ])
        .await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);

    let params = ReportParams::new().contains("vehicle", "KA01");
    let report = executor.run_key("vehicle-logs", &params).await.unwrap();
    let rows = report.table().unwrap();
    assert_eq!(rows.row_count, 1);
    assert_eq!(
        rows.get(0, "vehicle_number"),
        Some(&Value::from("ka01-1234"))
    );
    assert_eq!(rows.get(0, "stop_date"), Some(&Value::from("2020-01-15")));

    let everything = executor
        .run_key("vehicle-logs", &ReportParams::new().contains("vehicle", "  "))
        .await
        .unwrap();
    assert_eq!(everything.table().unwrap().row_count, 2);

    table.remove().await;
}

#[tokio::test]
async fn test_vehicle_filter_escapes_wildcards() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table
        .insert(&[
            StopRow {
                vehicle_number: "AB_1",
                ..Default::default()
            },
            StopRow {
                vehicle_number: "ABX1",
                ..Default::default()
            },
        ])
        .await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let report = executor
        .run_key("vehicle-logs", &ReportParams::new().contains("vehicle", "b_"))
        .await
        .unwrap();

    let rows = report.table().unwrap();
    assert_eq!(rows.row_count, 1);
    assert_eq!(rows.get(0, "vehicle_number"), Some(&Value::from("AB_1")));

    table.remove().await;
}

#[tokio::test]
async fn test_no_match_is_empty_signal_not_error() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table.insert(&[StopRow::default()]).await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let report = executor
        .run_key("vehicle-logs", &ReportParams::new().contains("vehicle", "ZZZ"))
        .await
        .unwrap();

    match report.result {
        ReportResult::Empty(warning) => {
            assert_eq!(warning.key, "vehicle-logs");
            assert_eq!(warning.columns.len(), 13);
            assert_eq!(warning.columns[0], "vehicle_number");
        }
        other => panic!("Expected Empty result, got {other:?}"),
    }

    table.remove().await;
}

#[tokio::test]
async fn test_rank_ties_share_rank() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let stop = |country| StopRow {
        country_name: country,
        ..Default::default()
    };
    table.insert_many(stop("Canada"), 10).await;
    table.insert_many(stop("India"), 10).await;
    table.insert_many(stop("USA"), 7).await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let report = executor
        .run_key("yearly-country-breakdown", &ReportParams::new())
        .await
        .unwrap();

    let rows = report.table().unwrap();
    let ranked: Vec<(String, i64, i64)> = (0..rows.row_count)
        .map(|i| {
            (
                rows.get(i, "country_name").unwrap().to_display_string(),
                rows.get(i, "total_stops").unwrap().as_i64().unwrap(),
                rows.get(i, "country_rank").unwrap().as_i64().unwrap(),
            )
        })
        .collect();

    assert_eq!(
        ranked,
        vec![
            ("Canada".to_string(), 10, 1),
            ("India".to_string(), 10, 1),
            ("USA".to_string(), 7, 3),
        ]
    );
    assert_eq!(rows.get(0, "stop_year"), Some(&Value::Int(2020)));

    table.remove().await;
}

#[tokio::test]
async fn test_duration_average_skips_unknown_text() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let stop = |duration| StopRow {
        stop_duration: duration,
        ..Default::default()
    };
    table
        .insert(&[stop("0-15 Min"), stop("30+ Min"), stop("unknown")])
        .await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let report = executor
        .run_key("duration-by-violation", &ReportParams::new())
        .await
        .unwrap();

    assert_eq!(
        report.table().unwrap().get(0, "avg_duration_minutes"),
        Some(&Value::Float(26.25))
    );

    table.remove().await;
}

#[tokio::test]
async fn test_rates_stay_within_bounds() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table
        .insert(&[
            StopRow {
                driver_age: Some(19),
                stop_outcome: "Arrest Driver",
                ..Default::default()
            },
            StopRow {
                driver_age: Some(22),
                ..Default::default()
            },
            StopRow {
                driver_age: Some(65),
                ..Default::default()
            },
            StopRow {
                driver_age: None,
                stop_outcome: "Arrest Driver",
                ..Default::default()
            },
        ])
        .await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let report = executor
        .run_key("age-group-arrest-rate", &ReportParams::new())
        .await
        .unwrap();

    let rows = report.table().unwrap();
    assert_eq!(rows.row_count, 2);
    assert_eq!(rows.get(0, "age_group"), Some(&Value::from("18-25")));
    assert_eq!(rows.get(0, "arrest_rate"), Some(&Value::Float(0.5)));
    assert_eq!(rows.get(1, "age_group"), Some(&Value::from("60+")));
    assert_eq!(rows.get(1, "arrest_rate"), Some(&Value::Float(0.0)));

    table.remove().await;
}

#[tokio::test]
async fn test_missing_column_is_query_execution_error() {
    let Some(table) = ScratchTable::create_with_columns("vehicle_number TEXT").await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let err = executor
        .run_key("violations", &ReportParams::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::QueryExecution(_)));
    assert!(err.to_string().contains("violation"));

    table.remove().await;
}

#[tokio::test]
async fn test_sections_run_independently() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table.insert(&[StopRow::default()]).await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    let sections = executor
        .run_sections(&[
            ("total-stops", ReportParams::new()),
            ("not-a-report", ReportParams::new()),
            ("violations", ReportParams::new()),
        ])
        .await;

    assert_eq!(
        sections[0].outcome.as_ref().unwrap().scalar(),
        Some(&Value::Int(1))
    );
    assert!(matches!(
        sections[1].outcome,
        Err(ReportError::NotFound(_))
    ));
    assert_eq!(sections[2].outcome.as_ref().unwrap().table().unwrap().row_count, 1);

    table.remove().await;
}

#[tokio::test]
async fn test_sampled_charts_skip_null_groups() {
    let Some(table) = ScratchTable::create().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    table.insert_many(StopRow::default(), 2).await;
    table.insert_sparse("NULL0001").await;

    let executor = ReportExecutor::new(&table.client, &table.catalog);
    for (key, label) in [
        ("sample-driver-gender", "M"),
        ("sample-stops-by-violation", "Speeding"),
    ] {
        let report = executor.run_key(key, &ReportParams::new()).await.unwrap();
        let rows = report.table().unwrap();
        assert_eq!(rows.row_count, 1, "{key}");
        assert_eq!(rows.rows[0], vec![Value::from(label), Value::Int(2)], "{key}");
    }

    table.remove().await;
}
