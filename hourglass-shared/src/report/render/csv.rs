use ::csv::{QuoteStyle, WriterBuilder};

use super::{detail_cells, DETAIL_HEADERS};
use crate::report::{Report, ReportError};

/// Header row, then one always-quoted row per entry
pub(super) fn render(report: &Report) -> Result<Vec<u8>, ReportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(DETAIL_HEADERS)
        .map_err(|e| ReportError::render("csv", e))?;

    for entry in &report.timesheets {
        writer
            .write_record(detail_cells(entry))
            .map_err(|e| ReportError::render("csv", e))?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::render("csv", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::weekly_report;

    #[test]
    fn test_every_field_quoted() {
        let bytes = render(&weekly_report()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            r#""Date","User","Project","Task","Hours","Billable","Status","Description""#
        );
        assert_eq!(
            lines[1],
            r#""2024-01-02","Ada Lovelace","Website","Website work","3.00","Yes","submitted","Work, ""quoted""""#
        );
        assert!(lines[2].starts_with(r#""2024-01-04","Ada Lovelace""#));
        assert!(lines[2].contains(r#""5.00","No""#));
    }
}
