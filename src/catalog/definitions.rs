//! The report definitions.
//!
//! Every SQL string here is fixed at catalog construction. The only runtime
//! input is bound through `$n` placeholders; the relation name comes from a
//! validated [`TableName`].

use super::buckets::{AgeBucket, DayPeriod, DurationBucket, OutcomeMatch, TimeOfDay};
use super::{
    ChartHint, ParamKind, ParamSpec, QueryDefinition, ResultShape, Section, TableName, Tier,
    BROWSE_ROW_LIMIT,
};

/// Columns of the stop-record relation, in browse order.
const STOP_COLUMNS: [&str; 13] = [
    "vehicle_number",
    "stop_date",
    "stop_time",
    "country_name",
    "driver_gender",
    "driver_race",
    "driver_age",
    "violation",
    "stop_outcome",
    "search_conducted",
    "search_type",
    "drugs_related_stop",
    "stop_duration",
];

struct Entry(QueryDefinition);

impl Entry {
    fn new(key: &'static str, title: &'static str, section: Section, tier: Tier) -> Self {
        Self(QueryDefinition {
            key,
            title,
            section,
            tier,
            sql: String::new(),
            params: Vec::new(),
            shape: ResultShape::Table {
                columns: Vec::new(),
            },
            chart: None,
        })
    }

    fn sql(mut self, sql: String) -> Self {
        self.0.sql = sql;
        self
    }

    fn scalar(mut self, column: &'static str) -> Self {
        self.0.shape = ResultShape::Scalar { column };
        self
    }

    fn columns(mut self, columns: &[&'static str]) -> Self {
        self.0.shape = ResultShape::Table {
            columns: columns.to_vec(),
        };
        self
    }

    fn param(mut self, name: &'static str, kind: ParamKind, required: bool) -> Self {
        self.0.params.push(ParamSpec {
            name,
            kind,
            required,
        });
        self
    }

    fn chart(mut self, x: &'static str, y: &'static str) -> Self {
        self.0.chart = Some(ChartHint { x, y });
        self
    }

    fn build(self) -> QueryDefinition {
        self.0
    }
}

/// Fraction of rows in the group matching `predicate`; NULL for an empty group.
fn fraction(predicate: &str) -> String {
    format!("(COUNT(*) FILTER (WHERE {predicate}))::float8 / NULLIF(COUNT(*), 0)")
}

/// Percentage of rows in the group matching `predicate`, rounded to 2 places.
fn percent(predicate: &str) -> String {
    format!(
        "ROUND(100.0 * COUNT(*) FILTER (WHERE {predicate}) / NULLIF(COUNT(*), 0), 2)::float8"
    )
}

pub(super) fn build(table: &TableName) -> Vec<QueryDefinition> {
    let t = table.as_str();
    let arrest = OutcomeMatch::Arrest.sql_predicate("stop_outcome");
    let warning = OutcomeMatch::Warning.sql_predicate("stop_outcome");
    let searched = "search_conducted = TRUE";
    let drugs = "drugs_related_stop = TRUE";
    let searched_or_arrest = format!("{searched} OR {arrest}");
    let hour = "EXTRACT(HOUR FROM stop_time::time)";
    let year = "EXTRACT(YEAR FROM stop_date::date)";
    let age_group = AgeBucket::sql_case("driver_age");
    let time_of_day = TimeOfDay::sql_case(hour);
    let day_period = DayPeriod::sql_case(hour);
    let duration = DurationBucket::sql_case("stop_duration");
    let stop_columns = STOP_COLUMNS.join(", ");

    use Section::*;

    vec![
        // Vehicle logs
        Entry::new("vehicle-logs", "Vehicle Logs", VehicleLogs, Tier::Browse)
            .sql(format!(
                "SELECT {stop_columns} FROM {t} \
                 WHERE ($1::text IS NULL OR vehicle_number ILIKE $1) \
                 LIMIT {BROWSE_ROW_LIMIT}"
            ))
            .param("vehicle", ParamKind::Substring, false)
            .columns(&STOP_COLUMNS)
            .build(),
        // Violations
        Entry::new("violations", "Violations", Violations, Tier::GroupedAggregate)
            .sql(format!(
                "SELECT violation, COUNT(*) AS count FROM {t} \
                 GROUP BY violation ORDER BY count DESC LIMIT 100"
            ))
            .columns(&["violation", "count"])
            .chart("violation", "count")
            .build(),
        // Analytics & trends, charted over a 100-row sample
        Entry::new(
            "sample-stops-by-violation",
            "Stops by Violation",
            Trends,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT violation, COUNT(*) AS count \
             FROM (SELECT violation FROM {t} LIMIT 100) AS s \
             WHERE violation IS NOT NULL \
             GROUP BY violation ORDER BY count DESC"
        ))
        .columns(&["violation", "count"])
        .chart("violation", "count")
        .build(),
        Entry::new(
            "sample-driver-gender",
            "Driver Gender Distribution",
            Trends,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT driver_gender AS gender, COUNT(*) AS count \
             FROM (SELECT driver_gender FROM {t} LIMIT 100) AS s \
             WHERE driver_gender IS NOT NULL \
             GROUP BY driver_gender ORDER BY count DESC"
        ))
        .columns(&["gender", "count"])
        .chart("gender", "count")
        .build(),
        // Enforcement overview KPIs
        Entry::new("total-stops", "Total Police Stops", Overview, Tier::ScalarKpi)
            .sql(format!("SELECT COUNT(*) AS total_stops FROM {t}"))
            .scalar("total_stops")
            .build(),
        Entry::new("total-arrests", "Total Arrests", Overview, Tier::ScalarKpi)
            .sql(format!(
                "SELECT COUNT(*) AS total_arrests FROM {t} WHERE {arrest}"
            ))
            .scalar("total_arrests")
            .build(),
        Entry::new("total-warnings", "Total Warnings", Overview, Tier::ScalarKpi)
            .sql(format!(
                "SELECT COUNT(*) AS total_warnings FROM {t} WHERE {warning}"
            ))
            .scalar("total_warnings")
            .build(),
        Entry::new(
            "drug-related-stops",
            "Drug Related Stops",
            Overview,
            Tier::ScalarKpi,
        )
        .sql(format!(
            "SELECT COUNT(*) AS drug_related_stops FROM {t} WHERE {drugs}"
        ))
        .scalar("drug_related_stops")
        .build(),
        // Traffic intelligence
        Entry::new(
            "stop-count",
            "Total Number of Police Stops",
            Intelligence,
            Tier::ScalarKpi,
        )
        .sql(format!("SELECT COUNT(*) AS total_stops FROM {t}"))
        .scalar("total_stops")
        .build(),
        Entry::new(
            "stops-by-violation",
            "Count of Stops by Violation Type",
            Intelligence,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT violation, COUNT(*) AS count FROM {t} \
             GROUP BY violation ORDER BY count DESC"
        ))
        .columns(&["violation", "count"])
        .chart("violation", "count")
        .build(),
        Entry::new(
            "arrests-vs-warnings",
            "Number of Arrests vs Warnings",
            Intelligence,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT stop_outcome, COUNT(*) AS count FROM {t} \
             GROUP BY stop_outcome ORDER BY count DESC"
        ))
        .columns(&["stop_outcome", "count"])
        .chart("stop_outcome", "count")
        .build(),
        Entry::new(
            "average-driver-age",
            "Average Age of Drivers Stopped",
            Intelligence,
            Tier::ScalarKpi,
        )
        .sql(format!(
            "SELECT AVG(driver_age)::float8 AS average_age FROM {t}"
        ))
        .scalar("average_age")
        .build(),
        Entry::new(
            "top-search-types",
            "Top 5 Most Frequent Search Types",
            Intelligence,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT search_type, COUNT(*) AS count FROM {t} \
             WHERE search_type <> '' \
             GROUP BY search_type ORDER BY count DESC LIMIT 5"
        ))
        .columns(&["search_type", "count"])
        .build(),
        Entry::new(
            "stops-by-gender",
            "Count of Stops by Gender",
            Intelligence,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT driver_gender, COUNT(*) AS count FROM {t} \
             GROUP BY driver_gender ORDER BY count DESC"
        ))
        .columns(&["driver_gender", "count"])
        .chart("driver_gender", "count")
        .build(),
        Entry::new(
            "arrest-violations",
            "Most Common Violation for Arrests",
            Intelligence,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT violation, COUNT(*) AS count FROM {t} WHERE {arrest} \
             GROUP BY violation ORDER BY count DESC LIMIT 10"
        ))
        .columns(&["violation", "count"])
        .build(),
        // Police stop query
        Entry::new(
            "drug-stop-vehicles",
            "Top 10 Vehicles in Drug Stops",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT vehicle_number, COUNT(*) AS stop_count FROM {t} WHERE {drugs} \
             GROUP BY vehicle_number ORDER BY stop_count DESC LIMIT 10"
        ))
        .columns(&["vehicle_number", "stop_count"])
        .build(),
        Entry::new(
            "searched-vehicles",
            "Most Frequently Searched Vehicles",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT vehicle_number, COUNT(*) AS search_count FROM {t} WHERE {searched} \
             GROUP BY vehicle_number ORDER BY search_count DESC LIMIT 10"
        ))
        .columns(&["vehicle_number", "search_count"])
        .build(),
        Entry::new(
            "age-group-arrest-rate",
            "Driver Age Group with Highest Arrest Rate",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT {age_group} AS age_group, {arrest_rate} AS arrest_rate FROM {t} \
             WHERE driver_age IS NOT NULL \
             GROUP BY age_group ORDER BY arrest_rate DESC, age_group",
            arrest_rate = fraction(&arrest)
        ))
        .columns(&["age_group", "arrest_rate"])
        .chart("age_group", "arrest_rate")
        .build(),
        Entry::new(
            "gender-by-country",
            "Gender Distribution by Country",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT country_name, driver_gender, COUNT(*) AS total_stops FROM {t} \
             GROUP BY country_name, driver_gender ORDER BY country_name, total_stops DESC"
        ))
        .columns(&["country_name", "driver_gender", "total_stops"])
        .build(),
        Entry::new(
            "race-gender-search-rate",
            "Race + Gender with Highest Search Rate",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT driver_race, driver_gender, {search_rate} AS search_rate FROM {t} \
             GROUP BY driver_race, driver_gender ORDER BY search_rate DESC LIMIT 1",
            search_rate = fraction(searched)
        ))
        .columns(&["driver_race", "driver_gender", "search_rate"])
        .build(),
        Entry::new(
            "time-of-day-stops",
            "Time of Day with Most Stops",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT {time_of_day} AS time_of_day, COUNT(*) AS stop_count FROM {t} \
             WHERE stop_time IS NOT NULL \
             GROUP BY time_of_day ORDER BY stop_count DESC"
        ))
        .columns(&["time_of_day", "stop_count"])
        .chart("time_of_day", "stop_count")
        .build(),
        Entry::new(
            "duration-by-violation",
            "Average Stop Duration by Violation",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT violation, AVG({duration})::float8 AS avg_duration_minutes FROM {t} \
             GROUP BY violation ORDER BY avg_duration_minutes DESC NULLS LAST"
        ))
        .columns(&["violation", "avg_duration_minutes"])
        .build(),
        Entry::new(
            "night-arrest-rate",
            "Are Night Stops More Likely to be Arrests?",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT {day_period} AS day_period, {arrest_rate} AS arrest_rate FROM {t} \
             WHERE stop_time IS NOT NULL \
             GROUP BY day_period ORDER BY arrest_rate DESC",
            arrest_rate = fraction(&arrest)
        ))
        .columns(&["day_period", "arrest_rate"])
        .build(),
        Entry::new(
            "violations-search-or-arrest",
            "Violations Linked with Search or Arrest",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT violation, \
             COUNT(*) FILTER (WHERE {searched_or_arrest}) AS related_events, \
             COUNT(*) AS total_stops, {rate} AS rate_percent FROM {t} \
             GROUP BY violation ORDER BY rate_percent DESC",
            rate = percent(&searched_or_arrest)
        ))
        .columns(&["violation", "related_events", "total_stops", "rate_percent"])
        .build(),
        Entry::new(
            "violations-under-25",
            "Violations Common Among <25",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT violation, COUNT(*) AS total FROM {t} WHERE driver_age < 25 \
             GROUP BY violation ORDER BY total DESC"
        ))
        .columns(&["violation", "total"])
        .build(),
        Entry::new(
            "violations-rarely-searched",
            "Violations Rarely Leading to Search or Arrest",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT violation, \
             COUNT(*) FILTER (WHERE {searched_or_arrest}) AS related_events, \
             COUNT(*) AS total_stops, {rate} AS rate_percent FROM {t} \
             GROUP BY violation HAVING COUNT(*) >= 6 \
             ORDER BY rate_percent ASC LIMIT 5",
            rate = percent(&searched_or_arrest)
        ))
        .columns(&["violation", "related_events", "total_stops", "rate_percent"])
        .build(),
        Entry::new(
            "country-drug-rate",
            "Countries with Highest Drug Stop Rate",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT country_name, {drug_rate} AS drug_rate FROM {t} \
             GROUP BY country_name ORDER BY drug_rate DESC",
            drug_rate = fraction(drugs)
        ))
        .columns(&["country_name", "drug_rate"])
        .chart("country_name", "drug_rate")
        .build(),
        Entry::new(
            "country-violation-arrest-rate",
            "Arrest Rate by Country & Violation",
            StopQuery,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT country_name, violation, {arrest_rate} AS arrest_rate FROM {t} \
             GROUP BY country_name, violation ORDER BY arrest_rate DESC",
            arrest_rate = fraction(&arrest)
        ))
        .columns(&["country_name", "violation", "arrest_rate"])
        .build(),
        Entry::new(
            "country-most-searches",
            "Country with Most Searches Conducted",
            StopQuery,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT country_name, COUNT(*) AS search_count FROM {t} WHERE {searched} \
             GROUP BY country_name ORDER BY search_count DESC LIMIT 1"
        ))
        .columns(&["country_name", "search_count"])
        .build(),
        // Advanced analysis
        Entry::new(
            "yearly-country-breakdown",
            "Yearly Breakdown of Stops and Arrests by Country",
            Advanced,
            Tier::RankedAggregate,
        )
        .sql(format!(
            "SELECT country_name, {year}::int AS stop_year, COUNT(*) AS total_stops, \
             COUNT(*) FILTER (WHERE {arrest}) AS total_arrests, \
             {arrest_rate} AS arrest_rate_percent, \
             RANK() OVER (PARTITION BY {year} ORDER BY COUNT(*) DESC) AS country_rank \
             FROM {t} WHERE stop_date IS NOT NULL \
             GROUP BY country_name, {year} \
             ORDER BY stop_year, country_rank, country_name",
            arrest_rate = percent(&arrest)
        ))
        .columns(&[
            "country_name",
            "stop_year",
            "total_stops",
            "total_arrests",
            "arrest_rate_percent",
            "country_rank",
        ])
        .build(),
        Entry::new(
            "age-race-violation-trends",
            "Driver Violation Trends Based on Age and Race",
            Advanced,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT v.driver_age, v.driver_race, v.violation, COUNT(*) AS count \
             FROM (SELECT driver_age, driver_race, violation FROM {t} \
             WHERE driver_age IS NOT NULL AND driver_race IS NOT NULL) AS v \
             GROUP BY v.driver_age, v.driver_race, v.violation \
             ORDER BY count DESC LIMIT 100"
        ))
        .columns(&["driver_age", "driver_race", "violation", "count"])
        .build(),
        Entry::new(
            "time-period-analysis",
            "Time Period Analysis of Stops",
            Advanced,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT {year}::int AS stop_year, \
             EXTRACT(MONTH FROM stop_date::date)::int AS stop_month, \
             TRIM(TO_CHAR(stop_date::date, 'Month')) AS month_name, \
             {hour}::int AS stop_hour, COUNT(*) AS stop_count FROM {t} \
             WHERE stop_date IS NOT NULL AND stop_time IS NOT NULL \
             GROUP BY stop_year, stop_month, month_name, stop_hour \
             ORDER BY stop_year, stop_month, stop_hour"
        ))
        .columns(&[
            "stop_year",
            "stop_month",
            "month_name",
            "stop_hour",
            "stop_count",
        ])
        .build(),
        Entry::new(
            "violations-high-search-arrest",
            "Violations with High Search and Arrest Rates",
            Advanced,
            Tier::RankedAggregate,
        )
        .sql(format!(
            "SELECT violation, COUNT(*) AS total_stops, \
             COUNT(*) FILTER (WHERE {searched}) AS total_searches, \
             COUNT(*) FILTER (WHERE {arrest}) AS total_arrests, \
             {search_rate} AS search_rate, {arrest_rate} AS arrest_rate, \
             RANK() OVER (ORDER BY COUNT(*) FILTER (WHERE {arrest}) DESC) AS arrest_rank \
             FROM {t} GROUP BY violation ORDER BY arrest_rate DESC LIMIT 10",
            search_rate = percent(searched),
            arrest_rate = percent(&arrest)
        ))
        .columns(&[
            "violation",
            "total_stops",
            "total_searches",
            "total_arrests",
            "search_rate",
            "arrest_rate",
            "arrest_rank",
        ])
        .build(),
        Entry::new(
            "demographics-by-country",
            "Driver Demographics by Country",
            Advanced,
            Tier::GroupedAggregate,
        )
        .sql(format!(
            "SELECT country_name, driver_gender, driver_race, \
             ROUND(AVG(driver_age)::numeric, 1)::float8 AS avg_age, \
             COUNT(*) AS driver_count FROM {t} WHERE driver_age IS NOT NULL \
             GROUP BY country_name, driver_gender, driver_race \
             ORDER BY country_name, driver_count DESC"
        ))
        .columns(&[
            "country_name",
            "driver_gender",
            "driver_race",
            "avg_age",
            "driver_count",
        ])
        .build(),
        Entry::new(
            "top-arrest-rate-violations",
            "Top 5 Violations with Highest Arrest Rates",
            Advanced,
            Tier::RateAggregate,
        )
        .sql(format!(
            "SELECT violation, COUNT(*) AS total_stops, \
             COUNT(*) FILTER (WHERE {arrest}) AS arrest_count, \
             {arrest_rate} AS arrest_rate FROM {t} \
             GROUP BY violation HAVING COUNT(*) > 10 \
             ORDER BY arrest_rate DESC LIMIT 5",
            arrest_rate = percent(&arrest)
        ))
        .columns(&["violation", "total_stops", "arrest_count", "arrest_rate"])
        .build(),
    ]
}
