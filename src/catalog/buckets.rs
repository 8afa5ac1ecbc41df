//! Derived grouping keys used by the rate and ranked aggregates.
//!
//! Each bucketing scheme exists twice: as a pure Rust function and as the SQL
//! `CASE` expression the catalog sends to the store. Both are generated from
//! the same bucket tables, so the two cannot drift apart.

use serde::Serialize;
use std::fmt;

/// Driver age groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeBucket {
    Under18,
    From18To25,
    From26To40,
    From41To60,
    Over60,
}

impl AgeBucket {
    /// All buckets, youngest first.
    pub const ALL: [AgeBucket; 5] = [
        Self::Under18,
        Self::From18To25,
        Self::From26To40,
        Self::From41To60,
        Self::Over60,
    ];

    /// Label used as the grouping value.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Under18 => "<18",
            Self::From18To25 => "18-25",
            Self::From26To40 => "26-40",
            Self::From41To60 => "41-60",
            Self::Over60 => "60+",
        }
    }

    /// Inclusive age bounds; `None` means unbounded on that side.
    fn bounds(&self) -> (Option<i32>, Option<i32>) {
        match self {
            Self::Under18 => (None, Some(17)),
            Self::From18To25 => (Some(18), Some(25)),
            Self::From26To40 => (Some(26), Some(40)),
            Self::From41To60 => (Some(41), Some(60)),
            Self::Over60 => (Some(61), None),
        }
    }

    /// Maps an age to its bucket. Total over all integers.
    pub fn from_age(age: i32) -> Self {
        Self::ALL
            .into_iter()
            .find(|bucket| {
                let (lo, hi) = bucket.bounds();
                lo.map_or(true, |lo| age >= lo) && hi.map_or(true, |hi| age <= hi)
            })
            .unwrap_or(Self::Over60)
    }

    /// SQL expression bucketing `column`. NULL ages must be filtered by the caller.
    pub fn sql_case(column: &str) -> String {
        let arms = Self::ALL
            .iter()
            .map(|bucket| {
                let condition = match bucket.bounds() {
                    (None, Some(hi)) => format!("{column} <= {hi}"),
                    (Some(lo), Some(hi)) => format!("{column} BETWEEN {lo} AND {hi}"),
                    (Some(lo), None) => format!("{column} >= {lo}"),
                    (None, None) => "TRUE".to_string(),
                };
                format!("WHEN {condition} THEN '{}'", bucket.label())
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("CASE {arms} END")
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Four six-hour buckets over the hour of the stop time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [Self::Night, Self::Morning, Self::Afternoon, Self::Evening];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Night => "Night (12AM-6AM)",
            Self::Morning => "Morning (6AM-12PM)",
            Self::Afternoon => "Afternoon (12PM-6PM)",
            Self::Evening => "Evening (6PM-12AM)",
        }
    }

    fn hours(&self) -> (u32, u32) {
        match self {
            Self::Night => (0, 5),
            Self::Morning => (6, 11),
            Self::Afternoon => (12, 17),
            Self::Evening => (18, 23),
        }
    }

    /// Maps an hour to its bucket. Returns `None` outside 0..=23.
    pub fn from_hour(hour: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|bucket| {
            let (start, end) = bucket.hours();
            (start..=end).contains(&hour)
        })
    }

    /// SQL expression bucketing the hour expression `hour`.
    pub fn sql_case(hour: &str) -> String {
        let arms = Self::ALL
            .iter()
            .map(|bucket| {
                let (start, end) = bucket.hours();
                format!(
                    "WHEN {hour} BETWEEN {start} AND {end} THEN '{}'",
                    bucket.label()
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("CASE {arms} END")
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Night (00-05) versus everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DayPeriod {
    Night,
    Day,
}

impl DayPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Night => "Night",
            Self::Day => "Day",
        }
    }

    pub fn from_hour(hour: u32) -> Self {
        if TimeOfDay::from_hour(hour) == Some(TimeOfDay::Night) {
            Self::Night
        } else {
            Self::Day
        }
    }

    pub fn sql_case(hour: &str) -> String {
        let (start, end) = TimeOfDay::Night.hours();
        format!(
            "CASE WHEN {hour} BETWEEN {start} AND {end} THEN '{}' ELSE '{}' END",
            Self::Night.label(),
            Self::Day.label()
        )
    }
}

/// Recorded stop-duration categories and their minute midpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DurationBucket {
    UpTo15,
    From16To30,
    Over30,
}

impl DurationBucket {
    /// Buckets in matching order.
    pub const ALL: [DurationBucket; 3] = [Self::UpTo15, Self::From16To30, Self::Over30];

    /// Text fragment identifying the category inside the free-text value.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::UpTo15 => "0-15",
            Self::From16To30 => "16-30",
            Self::Over30 => "30+",
        }
    }

    pub fn midpoint_minutes(&self) -> f64 {
        match self {
            Self::UpTo15 => 7.5,
            Self::From16To30 => 23.0,
            Self::Over30 => 45.0,
        }
    }

    /// Classifies a free-text duration; unrecognised text has no bucket.
    pub fn classify(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|bucket| lowered.contains(bucket.pattern()))
    }

    /// SQL expression mapping `column` to minutes, NULL when unrecognised.
    pub fn sql_case(column: &str) -> String {
        let arms = Self::ALL
            .iter()
            .map(|bucket| {
                format!(
                    "WHEN {column} ILIKE '%{}%' THEN {:.1}",
                    bucket.pattern(),
                    bucket.midpoint_minutes()
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("CASE {arms} ELSE NULL END")
    }
}

/// Minute midpoint for a free-text duration, `None` when it should be
/// excluded from averages.
pub fn duration_minutes(text: &str) -> Option<f64> {
    DurationBucket::classify(text).map(|bucket| bucket.midpoint_minutes())
}

/// Free-text outcome categories matched by case-insensitive substring.
///
/// Categories overlap: "Arrest Warning issued" is both an arrest and a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutcomeMatch {
    Arrest,
    Warning,
}

impl OutcomeMatch {
    pub fn needle(&self) -> &'static str {
        match self {
            Self::Arrest => "arrest",
            Self::Warning => "warning",
        }
    }

    pub fn matches(&self, outcome: &str) -> bool {
        outcome.to_lowercase().contains(self.needle())
    }

    pub fn sql_predicate(&self, column: &str) -> String {
        format!("{column} ILIKE '%{}%'", self.needle())
    }
}
