use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::{detail_cells, title, DETAIL_HEADERS};
use crate::report::aggregate::Totals;
use crate::report::{Report, ReportError};

const COLUMN_WIDTHS: [f64; 8] = [12.0, 22.0, 24.0, 28.0, 8.0, 9.0, 11.0, 40.0];

pub(super) fn render(report: &Report) -> Result<Vec<u8>, ReportError> {
    build(report).map_err(|e| ReportError::render("excel", e))
}

fn write_totals(
    sheet: &mut Worksheet,
    row: u32,
    label: &str,
    totals: &Totals,
    format: &Format,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(row, 0, label, format)?;
    sheet.write_number(row, 1, totals.total_hours)?;
    sheet.write_number(row, 2, totals.billable_hours)?;
    sheet.write_number(row, 3, totals.non_billable_hours)?;
    sheet.write_number(row, 4, totals.entries as f64)?;
    Ok(())
}

fn build(report: &Report) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let heading = Format::new().set_bold().set_font_size(14);
    let hours = Format::new().set_num_format("0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Report")?;
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    sheet.write_string_with_format(0, 0, title(report), &heading)?;

    // Summary block
    let mut row = 2;
    for (col, header) in ["", "Total Hours", "Billable", "Non-billable", "Entries"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(row, col as u16, *header, &bold)?;
    }
    row += 1;
    write_totals(sheet, row, "All", &report.summary.totals, &bold)?;
    row += 1;

    for bucket in &report.summary.by_project {
        write_totals(sheet, row, &bucket.project.name, &bucket.totals, &Format::new())?;
        row += 1;
    }
    for bucket in &report.summary.by_user {
        write_totals(sheet, row, &bucket.user.full_name(), &bucket.totals, &Format::new())?;
        row += 1;
    }

    // Detail table
    row += 1;
    for (col, header) in DETAIL_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *header, &bold)?;
    }
    row += 1;

    for entry in &report.timesheets {
        let cells = detail_cells(entry);
        for (col, cell) in cells.iter().enumerate() {
            if col == 4 {
                sheet.write_number_with_format(row, 4, entry.timesheet.hours, &hours)?;
            } else {
                sheet.write_string(row, col as u16, cell)?;
            }
        }
        row += 1;
    }

    workbook.save_to_buffer()
}
