/// File renderers for period reports
///
/// | Format  | Crate             | Layout                                        |
/// |---------|-------------------|-----------------------------------------------|
/// | `csv`   | `csv`             | one always-quoted row per entry               |
/// | `excel` | `rust_xlsxwriter` | summary block, then the detail table          |
/// | `pdf`   | `printpdf`        | A4, summary block, then paginated detail rows |
///
/// `json` is not a file format; the API serializes [`Report`] directly.

mod csv;
mod excel;
mod pdf;

use std::str::FromStr;

use super::{Report, ReportEntry, ReportError};

/// Downloadable file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Excel => "excel",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv; charset=utf-8",
            ReportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Excel => "xlsx",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(format!("Unsupported report format: {other}")),
        }
    }
}

/// A rendered report file
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Column headers shared by every tabular renderer
pub(crate) const DETAIL_HEADERS: [&str; 8] = [
    "Date",
    "User",
    "Project",
    "Task",
    "Hours",
    "Billable",
    "Status",
    "Description",
];

/// One detail row as display strings, in [`DETAIL_HEADERS`] order
pub(crate) fn detail_cells(entry: &ReportEntry) -> [String; 8] {
    let t = &entry.timesheet;
    [
        t.date.to_string(),
        entry.user.full_name(),
        entry.project.name.clone(),
        entry.task.title.clone(),
        format!("{:.2}", t.hours),
        if t.billable { "Yes" } else { "No" }.to_string(),
        t.status.as_str().to_string(),
        t.description.clone().unwrap_or_default(),
    ]
}

pub(crate) fn title(report: &Report) -> String {
    let kind = report.report_type.as_str();
    let mut chars = kind.chars();
    let kind = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };

    if report.period.is_single_day() {
        format!("{kind} Timesheet Report: {}", report.period.start_date)
    } else {
        format!(
            "{kind} Timesheet Report: {} to {}",
            report.period.start_date, report.period.end_date
        )
    }
}

pub fn render(report: &Report, format: ReportFormat) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Csv => csv::render(report),
        ReportFormat::Excel => excel::render(report),
        ReportFormat::Pdf => pdf::render(report),
    }
}
