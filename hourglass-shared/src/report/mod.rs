/// Aggregation and report engine
///
/// Reports are built from role-filtered time entries in three steps:
///
/// 1. **Load**: [`Timesheet::list_all`] with the actor's [`RowScope`] and the
///    period's date range (relations are `LEFT JOIN`ed)
/// 2. **Resolve**: every row must carry its user, project and task; a missing
///    relation fails the whole report with [`ReportError::MissingRelation`]
/// 3. **Aggregate/render**: totals and buckets ([`aggregate`]), then JSON or
///    one of the file renderers ([`render`])
///
/// # Example
///
/// ```no_run
/// use hourglass_shared::access::RowScope;
/// use hourglass_shared::report::{period::{Period, ReportKind}, render::ReportFormat, Report};
/// use chrono::NaiveDate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let period = Period::iso_week(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).ok_or("out of range")?;
/// let report = Report::generate(&pool, &RowScope::Unrestricted, ReportKind::Weekly, period, None, None).await?;
/// let file = report.render(ReportFormat::Csv)?;
/// assert_eq!(file.filename, "weekly-report-2024-01-01_to_2024-01-07.csv");
/// # Ok(())
/// # }
/// ```

pub mod aggregate;
pub mod period;
pub mod render;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use self::aggregate::{by_date, resolve, summarize, DateBucket, Summary};
use self::period::{report_filename, Period, ReportKind};
use self::render::{RenderedReport, ReportFormat};
use crate::access::RowScope;
use crate::models::timesheet::{Timesheet, TimesheetDetail, TimesheetFilter};
use crate::models::{ProjectSummary, TaskSummary, UserSummary};

/// Errors raised while building or rendering a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A time entry references a row that could not be loaded
    #[error("Timesheet {timesheet_id} references a missing {relation}")]
    MissingRelation {
        timesheet_id: Uuid,
        relation: &'static str,
    },

    /// A file renderer failed
    #[error("Failed to render {format} report: {message}")]
    Render {
        format: &'static str,
        message: String,
    },

    /// Loading the entries failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ReportError {
    pub(crate) fn render(format: &'static str, err: impl std::fmt::Display) -> Self {
        ReportError::Render {
            format,
            message: err.to_string(),
        }
    }
}

/// A time entry with all of its relations present
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    #[serde(flatten)]
    pub timesheet: Timesheet,
    pub user: UserSummary,
    pub project: ProjectSummary,
    pub task: TaskSummary,
}

impl TryFrom<TimesheetDetail> for ReportEntry {
    type Error = ReportError;

    fn try_from(detail: TimesheetDetail) -> Result<Self, Self::Error> {
        let timesheet_id = detail.timesheet.id;
        let missing = |relation| ReportError::MissingRelation {
            timesheet_id,
            relation,
        };

        Ok(ReportEntry {
            user: detail.user.ok_or_else(|| missing("user"))?,
            project: detail.project.ok_or_else(|| missing("project"))?,
            task: detail.task.ok_or_else(|| missing("task"))?,
            timesheet: detail.timesheet,
        })
    }
}

/// A period report, ready to serialize or render
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_type: ReportKind,
    pub period: Period,
    pub summary: Summary,

    /// Per-date buckets; weekly reports only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_data: Option<Vec<DateBucket>>,

    pub timesheets: Vec<ReportEntry>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Aggregates already-filtered rows into a report
    pub fn build(
        kind: ReportKind,
        period: Period,
        rows: Vec<TimesheetDetail>,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, ReportError> {
        let entries = resolve(rows)?;
        let daily_data = (kind == ReportKind::Weekly).then(|| by_date(&entries));

        Ok(Report {
            report_type: kind,
            period,
            summary: summarize(&entries),
            daily_data,
            timesheets: entries,
            generated_at,
        })
    }

    /// Loads the visible entries for `period` and builds the report
    pub async fn generate(
        pool: &PgPool,
        scope: &RowScope,
        kind: ReportKind,
        period: Period,
        user_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<Self, ReportError> {
        let filter = TimesheetFilter {
            start_date: Some(period.start_date),
            end_date: Some(period.end_date),
            user_id,
            project_id,
            ..Default::default()
        };
        let rows = Timesheet::list_all(pool, &filter, scope).await?;
        debug!(kind = kind.as_str(), rows = rows.len(), "Building report");

        Report::build(kind, period, rows, Utc::now()).inspect_err(|err| {
            warn!(error = %err, "Report aborted");
        })
    }

    pub fn filename(&self, format: ReportFormat) -> String {
        report_filename(self.report_type, &self.period, format.extension())
    }

    /// Renders to a downloadable file
    pub fn render(&self, format: ReportFormat) -> Result<RenderedReport, ReportError> {
        let bytes = render::render(self, format)?;
        Ok(RenderedReport {
            filename: self.filename(format),
            content_type: format.content_type(),
            bytes,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::timesheet::TimesheetStatus;
    use chrono::NaiveDate;

    pub(crate) fn people() -> (UserSummary, UserSummary) {
        (
            UserSummary {
                id: Uuid::new_v4(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            },
            UserSummary {
                id: Uuid::new_v4(),
                first_name: "Bob".to_string(),
                last_name: "Ross".to_string(),
                email: "bob@example.com".to_string(),
            },
        )
    }

    pub(crate) fn projects() -> (ProjectSummary, ProjectSummary) {
        (
            ProjectSummary {
                id: Uuid::new_v4(),
                name: "Website".to_string(),
            },
            ProjectSummary {
                id: Uuid::new_v4(),
                name: "Mobile App".to_string(),
            },
        )
    }

    pub(crate) fn detail(
        user: &UserSummary,
        project: &ProjectSummary,
        date: &str,
        hours: f64,
        billable: bool,
    ) -> TimesheetDetail {
        let task = TaskSummary {
            id: Uuid::new_v4(),
            title: format!("{} work", project.name),
        };
        TimesheetDetail {
            timesheet: Timesheet {
                id: Uuid::new_v4(),
                user_id: user.id,
                task_id: task.id,
                project_id: project.id,
                date: date.parse::<NaiveDate>().unwrap(),
                hours,
                description: Some("Work, \"quoted\"".to_string()),
                billable,
                status: TimesheetStatus::Submitted,
                approved_by: None,
                approved_at: None,
                rejection_reason: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            user: Some(user.clone()),
            project: Some(project.clone()),
            task: Some(task),
        }
    }

    pub(crate) fn entry(
        user: &UserSummary,
        project: &ProjectSummary,
        date: &str,
        hours: f64,
        billable: bool,
    ) -> ReportEntry {
        ReportEntry::try_from(detail(user, project, date, hours, billable)).unwrap()
    }

    pub(crate) fn weekly_report() -> Report {
        let (ada, _) = people();
        let (site, _) = projects();
        let period = Period::iso_week("2024-01-05".parse().unwrap()).unwrap();
        let rows = vec![
            detail(&ada, &site, "2024-01-02", 3.0, true),
            detail(&ada, &site, "2024-01-04", 5.0, false),
        ];
        Report::build(ReportKind::Weekly, period, rows, Utc::now()).unwrap()
    }

    #[test]
    fn test_weekly_report_scenario() {
        let report = weekly_report();

        assert_eq!(report.summary.totals.total_hours, 8.0);
        assert_eq!(report.summary.totals.billable_hours, 3.0);
        assert_eq!(report.summary.totals.non_billable_hours, 5.0);

        let daily = report.daily_data.as_ref().unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date.to_string(), "2024-01-02");
        assert_eq!(daily[1].date.to_string(), "2024-01-04");
    }

    #[test]
    fn test_daily_report_has_no_daily_data() {
        let (ada, _) = people();
        let (site, _) = projects();
        let report = Report::build(
            ReportKind::Daily,
            Period::day("2024-01-05".parse().unwrap()),
            vec![detail(&ada, &site, "2024-01-05", 2.0, true)],
            Utc::now(),
        )
        .unwrap();

        assert!(report.daily_data.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("dailyData").is_none());
        assert_eq!(json["reportType"], "daily");
        assert_eq!(json["period"]["startDate"], "2024-01-05");
        assert_eq!(json["summary"]["totalHours"], 2.0);
    }

    #[test]
    fn test_missing_relation_fails_whole_report() {
        let (ada, _) = people();
        let (site, _) = projects();
        let good = detail(&ada, &site, "2024-01-02", 3.0, true);
        let mut broken = detail(&ada, &site, "2024-01-03", 1.0, true);
        broken.task = None;
        let broken_id = broken.timesheet.id;

        let err = Report::build(
            ReportKind::Weekly,
            Period::iso_week("2024-01-05".parse().unwrap()).unwrap(),
            vec![good, broken],
            Utc::now(),
        )
        .unwrap_err();

        match err {
            ReportError::MissingRelation {
                timesheet_id,
                relation,
            } => {
                assert_eq!(timesheet_id, broken_id);
                assert_eq!(relation, "task");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_filename_uses_format_extension() {
        let report = weekly_report();
        assert_eq!(
            report.filename(ReportFormat::Excel),
            "weekly-report-2024-01-01_to_2024-01-07.xlsx"
        );
    }
}
