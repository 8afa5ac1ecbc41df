//! Integration tests for police-stops.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

pub mod catalog_test;
pub mod report_test;

use police_stops::catalog::{Catalog, TableName};
use police_stops::config::{ConnectionConfig, ReportsConfig};
use police_stops::db::{DatabaseClient, PostgresClient, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_TABLE: AtomicUsize = AtomicUsize::new(0);

/// Helper to create a test client.
pub async fn get_test_client() -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&config, &ReportsConfig::default())
        .await
        .ok()
}

/// One row of the stop-record relation.
#[derive(Debug, Clone)]
pub struct StopRow {
    pub vehicle_number: &'static str,
    pub stop_date: &'static str,
    pub stop_time: &'static str,
    pub country_name: &'static str,
    pub driver_gender: &'static str,
    pub driver_race: &'static str,
    pub driver_age: Option<i64>,
    pub violation: &'static str,
    pub stop_outcome: &'static str,
    pub search_conducted: bool,
    pub search_type: Option<&'static str>,
    pub drugs_related_stop: bool,
    pub stop_duration: &'static str,
}

impl Default for StopRow {
    fn default() -> Self {
        Self {
            vehicle_number: "KA01AB1234",
            stop_date: "2020-01-15",
            stop_time: "08:30",
            country_name: "India",
            driver_gender: "M",
            driver_race: "Asian",
            driver_age: Some(30),
            violation: "Speeding",
            stop_outcome: "Citation",
            search_conducted: false,
            search_type: None,
            drugs_related_stop: false,
            stop_duration: "0-15 Min",
        }
    }
}

impl StopRow {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.vehicle_number),
            Value::from(self.stop_date),
            Value::from(self.stop_time),
            Value::from(self.country_name),
            Value::from(self.driver_gender),
            Value::from(self.driver_race),
            Value::from(self.driver_age),
            Value::from(self.violation),
            Value::from(self.stop_outcome),
            Value::Bool(self.search_conducted),
            Value::from(self.search_type),
            Value::Bool(self.drugs_related_stop),
            Value::from(self.stop_duration),
        ]
    }
}

/// A uniquely named stop table, dropped by [`ScratchTable::remove`].
pub struct ScratchTable {
    pub client: PostgresClient,
    pub catalog: Catalog,
    name: String,
}

impl ScratchTable {
    /// Creates an empty stop table. Returns `None` when DATABASE_URL is unset.
    pub async fn create() -> Option<Self> {
        Self::create_with_columns(
            "vehicle_number TEXT, stop_date DATE, stop_time TIME, country_name TEXT, \
             driver_gender TEXT, driver_race TEXT, driver_age INTEGER, violation TEXT, \
             stop_outcome TEXT, search_conducted BOOLEAN, search_type TEXT, \
             drugs_related_stop BOOLEAN, stop_duration TEXT",
        )
        .await
    }

    /// Creates a table with an arbitrary column list.
    pub async fn create_with_columns(columns: &str) -> Option<Self> {
        let client = get_test_client().await?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let name = format!(
            "police_stops_it_{}_{}_{}",
            std::process::id(),
            nanos,
            NEXT_TABLE.fetch_add(1, Ordering::Relaxed)
        );

        client
            .execute_query(&format!("CREATE TABLE {name} ({columns})"), &[])
            .await
            .unwrap();

        let catalog = Catalog::new(&TableName::parse(&name).unwrap()).unwrap();
        Some(Self {
            client,
            catalog,
            name,
        })
    }

    pub async fn insert(&self, rows: &[StopRow]) {
        let sql = format!(
            "INSERT INTO {} VALUES ($1::text, $2::date, $3::time, $4::text, $5::text, \
             $6::text, $7::int, $8::text, $9::text, $10::boolean, $11::text, \
             $12::boolean, $13::text)",
            self.name
        );
        for row in rows {
            self.client.execute_query(&sql, &row.values()).await.unwrap();
        }
    }

    /// Inserts `count` copies of `row`.
    pub async fn insert_many(&self, row: StopRow, count: usize) {
        self.insert(&vec![row; count]).await;
    }

    /// Inserts a row whose columns are all NULL except the vehicle number.
    pub async fn insert_sparse(&self, vehicle_number: &str) {
        self.client
            .execute_query(
                &format!("INSERT INTO {} (vehicle_number) VALUES ($1::text)", self.name),
                &[Value::from(vehicle_number)],
            )
            .await
            .unwrap();
    }

    pub async fn remove(self) {
        let _ = self
            .client
            .execute_query(&format!("DROP TABLE IF EXISTS {}", self.name), &[])
            .await;
        self.client.close().await.unwrap();
    }
}
