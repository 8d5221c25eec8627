/// Report periods
///
/// Weeks are ISO weeks (Monday through Sunday) throughout.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Report granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
        }
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Period {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
        }
    }

    /// Monday through Sunday of the ISO week containing `date`
    ///
    /// `None` when the week runs past either end of the calendar.
    pub fn iso_week(date: NaiveDate) -> Option<Self> {
        let offset = u64::from(date.weekday().num_days_from_monday());
        let start_date = date.checked_sub_days(Days::new(offset))?;
        let end_date = start_date.checked_add_days(Days::new(6))?;
        Some(Self {
            start_date,
            end_date,
        })
    }

    /// The calendar month containing `date`
    pub fn month_of(date: NaiveDate) -> Self {
        let start_date = date.with_day(1).unwrap_or(date);
        let end_date = start_date
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(start_date);
        Self {
            start_date,
            end_date,
        }
    }

    /// Parses `YYYY-MM`
    pub fn parse_month(value: &str) -> Option<Self> {
        let (year, month) = value.trim().split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        let first = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
        Some(Self::month_of(first))
    }

    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }

    /// `2024-01-05` or `2024-01-01_to_2024-01-07`
    pub fn label(&self) -> String {
        if self.is_single_day() {
            self.start_date.to_string()
        } else {
            format!("{}_to_{}", self.start_date, self.end_date)
        }
    }
}

/// `{kind}-report-{label}.{extension}`
pub fn report_filename(kind: ReportKind, period: &Period, extension: &str) -> String {
    format!("{}-report-{}.{}", kind.as_str(), period.label(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_iso_week_from_any_day() {
        // 2024-01-05 is a Friday
        let week = Period::iso_week(date("2024-01-05")).unwrap();
        assert_eq!(week.start_date, date("2024-01-01"));
        assert_eq!(week.end_date, date("2024-01-07"));

        // Sunday belongs to the week that started the previous Monday
        assert_eq!(Period::iso_week(date("2024-01-07")).unwrap(), week);
        assert_eq!(Period::iso_week(date("2024-01-01")).unwrap(), week);
    }

    #[test]
    fn test_iso_week_across_year_boundary() {
        let week = Period::iso_week(date("2025-01-01")).unwrap();
        assert_eq!(week.start_date, date("2024-12-30"));
        assert_eq!(week.end_date, date("2025-01-05"));
    }

    #[test]
    fn test_month_bounds() {
        let feb = Period::parse_month("2024-02").unwrap();
        assert_eq!(feb.start_date, date("2024-02-01"));
        assert_eq!(feb.end_date, date("2024-02-29"));

        let dec = Period::month_of(date("2023-12-15"));
        assert_eq!(dec.end_date, date("2023-12-31"));
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        assert!(Period::parse_month("2024-13").is_none());
        assert!(Period::parse_month("2024-1").is_none());
        assert!(Period::parse_month("January").is_none());
        assert!(Period::parse_month("").is_none());
    }

    #[test]
    fn test_filenames() {
        let day = Period::day(date("2024-01-05"));
        assert_eq!(
            report_filename(ReportKind::Daily, &day, "csv"),
            "daily-report-2024-01-05.csv"
        );

        let week = Period::iso_week(date("2024-01-05")).unwrap();
        assert_eq!(
            report_filename(ReportKind::Weekly, &week, "pdf"),
            "weekly-report-2024-01-01_to_2024-01-07.pdf"
        );
    }

    #[test]
    fn test_iso_week_at_calendar_edges() {
        // The week around the first representable date starts before it
        assert_ne!(NaiveDate::MIN.weekday(), Weekday::Mon);
        assert!(Period::iso_week(NaiveDate::MIN).is_none());

        assert_ne!(NaiveDate::MAX.weekday(), Weekday::Sun);
        assert!(Period::iso_week(NaiveDate::MAX).is_none());

        let last_sunday = NaiveDate::MAX
            - Days::new(u64::from(NaiveDate::MAX.weekday().num_days_from_sunday()));
        let week = Period::iso_week(last_sunday).unwrap();
        assert_eq!(week.end_date, last_sunday);
    }
}
