//! Stop-outcome prediction placeholder.
//!
//! There is no model behind this. [`PredictionStub`] always answers with the
//! same labels and echoes the submitted stop back as a readable summary,
//! enriched with the bucket values the reports group by.

use crate::catalog::buckets::{duration_minutes, AgeBucket, TimeOfDay};
use crate::error::{ReportError, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::debug;

/// Driver ages accepted by the form.
pub const AGE_RANGE: RangeInclusive<i32> = 16..=100;

/// Driver gender as entered on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Self::Male),
            "f" | "female" => Ok(Self::Female),
            "o" | "other" => Ok(Self::Other),
            other => Err(ReportError::invalid_input(format!(
                "Invalid gender: {other}. Expected: male, female, or other"
            ))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// A stop entered by an analyst.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopForm {
    pub stop_date: NaiveDate,
    /// Stop time as `HH:MM`.
    pub stop_time: String,
    pub country_name: String,
    pub driver_name: Option<String>,
    pub driver_gender: Gender,
    pub driver_age: i32,
    pub driver_race: String,
    pub search_conducted: bool,
    pub search_type: Option<String>,
    pub drugs_related_stop: bool,
    /// Free-text duration such as `0-15 Min`.
    pub stop_duration: String,
    pub vehicle_number: String,
}

/// The placeholder answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub violation: &'static str,
    pub outcome: &'static str,
    pub age_group: &'static str,
    pub time_of_day: &'static str,
    /// Midpoint of the duration bucket, if the text named one.
    pub duration_minutes: Option<f64>,
    pub summary: String,
}

/// Fixed-label stand-in for a stop-outcome model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionStub;

impl PredictionStub {
    pub const VIOLATION: &'static str = "Speeding";
    pub const OUTCOME: &'static str = "Citation";

    pub fn new() -> Self {
        Self
    }

    /// Validates the form and returns the fixed prediction.
    pub fn predict(&self, form: &StopForm) -> Result<Prediction> {
        if !AGE_RANGE.contains(&form.driver_age) {
            return Err(ReportError::invalid_input(format!(
                "Driver age must be between {} and {}, got {}",
                AGE_RANGE.start(),
                AGE_RANGE.end(),
                form.driver_age
            )));
        }

        let stop_time = NaiveTime::parse_from_str(form.stop_time.trim(), "%H:%M").map_err(|_| {
            ReportError::invalid_input(format!(
                "Stop time must be HH:MM, got '{}'",
                form.stop_time
            ))
        })?;

        let vehicle = form.vehicle_number.trim();
        if vehicle.is_empty() {
            return Err(ReportError::invalid_input("Vehicle number is required"));
        }

        let age_group = AgeBucket::from_age(form.driver_age);
        let time_of_day = TimeOfDay::from_hour(stop_time.hour())
            .ok_or_else(|| ReportError::internal("hour out of range"))?;
        let minutes = duration_minutes(&form.stop_duration);

        debug!(
            age_group = age_group.label(),
            time_of_day = time_of_day.label(),
            "Prediction requested"
        );

        Ok(Prediction {
            violation: Self::VIOLATION,
            outcome: Self::OUTCOME,
            age_group: age_group.label(),
            time_of_day: time_of_day.label(),
            duration_minutes: minutes,
            summary: summarize(form, stop_time, vehicle),
        })
    }
}

fn summarize(form: &StopForm, stop_time: NaiveTime, vehicle: &str) -> String {
    let search = if form.search_conducted {
        match form.search_type.as_deref().map(str::trim) {
            Some(kind) if !kind.is_empty() => format!("A search was conducted ({kind})"),
            _ => "A search was conducted".to_string(),
        }
    } else {
        "No search was conducted".to_string()
    };
    let drugs = if form.drugs_related_stop {
        "was drug-related"
    } else {
        "was not drug-related"
    };

    format!(
        "A {}-year-old {} driver in {} was stopped at {} on {}. {search}, and the stop {drugs}. \
         Stop duration: {}. Vehicle number: {vehicle}.",
        form.driver_age,
        form.driver_gender,
        form.country_name.trim(),
        stop_time.format("%H:%M"),
        form.stop_date.format("%Y-%m-%d"),
        form.stop_duration.trim(),
    )
}
