/// Sum and group-by over resolved time entries
///
/// Hours are summed with ordinary `f64` addition in row order; values are
/// rounded to two places only when serialized.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::{ReportEntry, ReportError};
use crate::models::timesheet::TimesheetDetail;
use crate::models::{ProjectSummary, UserSummary};

fn two_places<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

/// Hour totals for a set of entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[serde(serialize_with = "two_places")]
    pub total_hours: f64,

    #[serde(serialize_with = "two_places")]
    pub billable_hours: f64,

    #[serde(serialize_with = "two_places")]
    pub non_billable_hours: f64,

    pub entries: usize,
}

impl Totals {
    pub fn add(&mut self, hours: f64, billable: bool) {
        self.total_hours += hours;
        if billable {
            self.billable_hours += hours;
        }
        self.non_billable_hours = self.total_hours - self.billable_hours;
        self.entries += 1;
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ReportEntry>) -> Self {
        let mut totals = Totals::default();
        for entry in entries {
            totals.add(entry.timesheet.hours, entry.timesheet.billable);
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBucket {
    pub project: ProjectSummary,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBucket {
    pub user: UserSummary,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Totals plus per-project and per-user breakdowns
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(flatten)]
    pub totals: Totals,
    pub by_project: Vec<ProjectBucket>,
    pub by_user: Vec<UserBucket>,
}

/// Resolves every row's relations, failing on the first missing one
pub fn resolve(rows: Vec<TimesheetDetail>) -> Result<Vec<ReportEntry>, ReportError> {
    rows.into_iter().map(ReportEntry::try_from).collect()
}

/// Groups by project, sorted by project name
pub fn by_project(entries: &[ReportEntry]) -> Vec<ProjectBucket> {
    let mut buckets: HashMap<Uuid, ProjectBucket> = HashMap::new();
    for entry in entries {
        buckets
            .entry(entry.project.id)
            .or_insert_with(|| ProjectBucket {
                project: entry.project.clone(),
                totals: Totals::default(),
            })
            .totals
            .add(entry.timesheet.hours, entry.timesheet.billable);
    }

    let mut buckets: Vec<ProjectBucket> = buckets.into_values().collect();
    buckets.sort_by(|a, b| {
        a.project
            .name
            .cmp(&b.project.name)
            .then(a.project.id.cmp(&b.project.id))
    });
    buckets
}

/// Groups by user, sorted by last then first name
pub fn by_user(entries: &[ReportEntry]) -> Vec<UserBucket> {
    let mut buckets: HashMap<Uuid, UserBucket> = HashMap::new();
    for entry in entries {
        buckets
            .entry(entry.user.id)
            .or_insert_with(|| UserBucket {
                user: entry.user.clone(),
                totals: Totals::default(),
            })
            .totals
            .add(entry.timesheet.hours, entry.timesheet.billable);
    }

    let mut buckets: Vec<UserBucket> = buckets.into_values().collect();
    buckets.sort_by(|a, b| {
        (&a.user.last_name, &a.user.first_name, a.user.id)
            .cmp(&(&b.user.last_name, &b.user.first_name, b.user.id))
    });
    buckets
}

/// Groups by calendar date, ascending; only dates with entries appear
pub fn by_date(entries: &[ReportEntry]) -> Vec<DateBucket> {
    let mut buckets: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    for entry in entries {
        buckets
            .entry(entry.timesheet.date)
            .or_default()
            .add(entry.timesheet.hours, entry.timesheet.billable);
    }

    buckets
        .into_iter()
        .map(|(date, totals)| DateBucket { date, totals })
        .collect()
}

pub fn summarize(entries: &[ReportEntry]) -> Summary {
    Summary {
        totals: Totals::from_entries(entries),
        by_project: by_project(entries),
        by_user: by_user(entries),
    }
}
