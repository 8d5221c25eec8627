/// Period reports
///
/// - `GET /api/reports/daily?date=YYYY-MM-DD`
/// - `GET /api/reports/weekly?startDate=YYYY-MM-DD` (the ISO week containing it)
/// - `GET /api/reports/monthly?month=YYYY-MM`
///
/// Each defaults to the period containing today and accepts `userId`,
/// `projectId` and `format=json|csv|excel|pdf`. Non-JSON formats download
/// as `{kind}-report-{range}.{ext}`. Employees only ever see their own
/// entries.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use hourglass_shared::{
    access::RowScope,
    auth::actor::Actor,
    report::{
        period::{Period, ReportKind},
        render::ReportFormat,
        Report,
    },
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiQuery,
    response::ApiResponse,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub month: Option<String>,
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub format: Option<String>,
}

impl ReportQuery {
    /// `None` for the JSON envelope, otherwise a file download
    fn format(&self) -> ApiResult<Option<ReportFormat>> {
        match self.format.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) if raw.eq_ignore_ascii_case("json") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|message: String| ApiError::field("format", message)),
        }
    }

    /// Resolves the requested period, defaulting to the one containing `today`
    fn period(&self, kind: ReportKind, today: NaiveDate) -> ApiResult<Period> {
        match kind {
            ReportKind::Daily => Ok(Period::day(self.date.unwrap_or(today))),
            ReportKind::Weekly => Period::iso_week(self.start_date.unwrap_or(today))
                .ok_or_else(|| ApiError::field("startDate", "Start date is out of range")),
            ReportKind::Monthly => match &self.month {
                None => Ok(Period::month_of(today)),
                Some(month) => Period::parse_month(month)
                    .ok_or_else(|| ApiError::field("month", "Month must be formatted as YYYY-MM")),
            },
        }
    }
}

async fn run(state: AppState, actor: Actor, kind: ReportKind, query: ReportQuery) -> ApiResult<Response> {
    let format = query.format()?;
    let period = query.period(kind, Utc::now().date_naive())?;

    let report = Report::generate(
        &state.db,
        &RowScope::for_actor(&actor),
        kind,
        period,
        query.user_id,
        query.project_id,
    )
    .await?;

    info!(
        kind = kind.as_str(),
        format = format.map_or("json", |f| f.as_str()),
        entries = report.timesheets.len(),
        user_id = %actor.id,
        "Report generated"
    );

    let Some(format) = format else {
        return Ok(ApiResponse::ok(report).into_response());
    };

    let file = report.render(format)?;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

pub async fn daily(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Response> {
    run(state, actor, ReportKind::Daily, query).await
}

pub async fn weekly(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Response> {
    run(state, actor, ReportKind::Weekly, query).await
}

pub async fn monthly(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Response> {
    run(state, actor, ReportKind::Monthly, query).await
}
