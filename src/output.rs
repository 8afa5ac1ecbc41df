//! Output formatting for the command-line driver.
//!
//! Renders reports, section runs, the enforcement overview, predictions and
//! the catalog listing as plain text or JSON.

use crate::catalog::{Catalog, Section};
use crate::db::QueryResult;
use crate::predict::Prediction;
use crate::report::{EnforcementOverview, Report, ReportResult, SectionReport};
use serde::Serialize;
use serde_json::json;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text tables.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    key: &'a str,
    title: &'a str,
    section: Section,
    execution_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    result: &'a ReportResult,
}

impl<'a> From<&'a Report> for JsonReport<'a> {
    fn from(report: &'a Report) -> Self {
        let warning = match &report.result {
            ReportResult::Empty(empty) => Some(empty.to_string()),
            ReportResult::Table(table) => table.truncation_warning(),
            ReportResult::Scalar(_) => None,
        };
        Self {
            key: report.key,
            title: report.title,
            section: report.section,
            execution_ms: report.execution_time.as_millis() as u64,
            warning,
            result: &report.result,
        }
    }
}

/// Formats command results in the configured format.
pub struct ReportOutput {
    format: OutputFormat,
}

impl ReportOutput {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn report(&self, report: &Report) -> String {
        match self.format {
            OutputFormat::Text => format_report_text(report),
            OutputFormat::Json => to_json(&JsonReport::from(report)),
        }
    }

    /// Formats a multi-section run. Failed sections are shown in place.
    pub fn sections(&self, sections: &[SectionReport]) -> String {
        match self.format {
            OutputFormat::Text => sections
                .iter()
                .map(|section| match &section.outcome {
                    Ok(report) => format_report_text(report),
                    Err(e) => format!(
                        "== {} ==\nError [{}]: {e}\n",
                        section.key,
                        e.category()
                    ),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = sections
                    .iter()
                    .map(|section| match &section.outcome {
                        Ok(report) => json!({
                            "key": section.key,
                            "report": JsonReport::from(report),
                        }),
                        Err(e) => json!({
                            "key": section.key,
                            "error": {
                                "category": e.category(),
                                "message": e.to_string(),
                            },
                        }),
                    })
                    .collect();
                to_json(&values)
            }
        }
    }

    pub fn overview(&self, overview: &EnforcementOverview) -> String {
        match self.format {
            OutputFormat::Text => {
                let rate =
                    |r: Option<f64>| r.map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}%"));
                format!(
                    "Total police stops: {}\nTotal arrests:      {} ({})\nTotal warnings:     {} ({})\nDrug-related stops: {} ({})\n",
                    overview.total_stops,
                    overview.total_arrests,
                    rate(overview.arrest_rate_percent()),
                    overview.total_warnings,
                    rate(overview.warning_rate_percent()),
                    overview.drug_related_stops,
                    rate(overview.drug_rate_percent()),
                )
            }
            OutputFormat::Json => to_json(&json!({
                "total_stops": overview.total_stops,
                "total_arrests": overview.total_arrests,
                "total_warnings": overview.total_warnings,
                "drug_related_stops": overview.drug_related_stops,
                "arrest_rate_percent": overview.arrest_rate_percent(),
                "warning_rate_percent": overview.warning_rate_percent(),
                "drug_rate_percent": overview.drug_rate_percent(),
            })),
        }
    }

    pub fn prediction(&self, prediction: &Prediction) -> String {
        match self.format {
            OutputFormat::Text => {
                let duration = prediction
                    .duration_minutes
                    .map_or_else(|| "unknown".to_string(), |m| format!("~{m} min"));
                format!(
                    "Predicted violation: {}\nPredicted outcome:   {}\n\n{}\n\nAge group: {} | Time of day: {} | Duration: {}\n",
                    prediction.violation,
                    prediction.outcome,
                    prediction.summary,
                    prediction.age_group,
                    prediction.time_of_day,
                    duration
                )
            }
            OutputFormat::Json => to_json(prediction),
        }
    }

    /// Lists every catalog entry grouped by section.
    pub fn catalog(&self, catalog: &Catalog) -> String {
        match self.format {
            OutputFormat::Text => {
                let mut output = String::new();
                for section in Section::ALL {
                    let headers =
                        vec!["key".to_string(), "title".to_string(), "params".to_string()];
                    let rows: Vec<Vec<String>> = catalog
                        .section(section)
                        .map(|def| {
                            let params = def
                                .params
                                .iter()
                                .map(|p| p.name)
                                .collect::<Vec<_>>()
                                .join(", ");
                            vec![def.key.to_string(), def.title.to_string(), params]
                        })
                        .collect();
                    if rows.is_empty() {
                        continue;
                    }
                    output.push_str(&format!("{}\n", section.title()));
                    output.push_str(&format_table(&headers, &rows));
                    output.push_str("\n\n");
                }
                output
            }
            OutputFormat::Json => to_json(&catalog.entries()),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {e}\"}}"))
}

fn format_report_text(report: &Report) -> String {
    let body = match &report.result {
        ReportResult::Scalar(value) => value.to_display_string(),
        ReportResult::Table(table) => format_result_table(table),
        ReportResult::Empty(warning) => warning.to_string(),
    };
    format!(
        "== {} ({}) ==\n{}\n({} ms)\n",
        report.title,
        report.key,
        body,
        report.execution_time.as_millis()
    )
}

fn format_result_table(result: &QueryResult) -> String {
    let headers: Vec<String> = result.column_names().into_iter().map(String::from).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let mut output = format_table(&headers, &rows);
    output.push_str(&format!("\n{} row(s)", result.row_count));
    if let Some(warning) = result.truncation_warning() {
        output.push_str(&format!("\n{warning}"));
    }
    output
}

/// Formats a table as a string for display.
fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{cell:width$}")
            })
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    let mut output = render(headers);
    output.push('\n');
    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));

    for row in rows {
        output.push('\n');
        output.push_str(render(row).trim_end());
    }

    output
}
