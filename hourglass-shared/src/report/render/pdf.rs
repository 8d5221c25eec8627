use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::{detail_cells, title, DETAIL_HEADERS};
use crate::report::aggregate::Totals;
use crate::report::{Report, ReportError};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;

/// Left edge of each detail column, in mm
const COLUMNS: [f32; 8] = [15.0, 37.0, 70.0, 103.0, 136.0, 150.0, 164.0, 184.0];

/// Longest text drawn in each detail column before truncation
const COLUMN_CHARS: [usize; 8] = [10, 16, 16, 16, 6, 4, 9, 10];

/// Writes lines top to bottom, starting a new page when the current one is full
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference) -> Self {
        Self {
            doc,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        }
    }

    /// Moves to the next line; returns true when a new page was started
    fn advance(&mut self) -> bool {
        self.y -= LINE_HEIGHT;
        if self.y >= MARGIN {
            return false;
        }

        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Page {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        true
    }

    fn text(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn row(&self, cells: &[String], font: &IndirectFontRef) {
        for (i, cell) in cells.iter().enumerate() {
            self.text(&truncate(cell, COLUMN_CHARS[i]), 8.0, COLUMNS[i], font);
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn totals_line(label: &str, totals: &Totals) -> String {
    format!(
        "{label}: {:.2} h total, {:.2} h billable, {:.2} h non-billable, {} entries",
        totals.total_hours, totals.billable_hours, totals.non_billable_hours, totals.entries
    )
}

pub(super) fn render(report: &Report) -> Result<Vec<u8>, ReportError> {
    let heading = title(report);
    let (doc, page, layer) =
        PdfDocument::new(heading.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::render("pdf", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::render("pdf", e))?;

    let mut writer = PageWriter::new(&doc, doc.get_page(page).get_layer(layer));

    writer.text(&heading, 14.0, MARGIN, &bold);
    writer.advance();
    writer.advance();

    // Summary block
    writer.text(&totals_line("All entries", &report.summary.totals), 10.0, MARGIN, &bold);
    writer.advance();
    for bucket in &report.summary.by_project {
        writer.text(&totals_line(&bucket.project.name, &bucket.totals), 9.0, MARGIN, &regular);
        writer.advance();
    }
    for bucket in &report.summary.by_user {
        writer.text(&totals_line(&bucket.user.full_name(), &bucket.totals), 9.0, MARGIN, &regular);
        writer.advance();
    }
    writer.advance();

    // Detail table, header repeated on every page
    let headers: Vec<String> = DETAIL_HEADERS.iter().map(|h| h.to_string()).collect();
    writer.row(&headers, &bold);
    for entry in &report.timesheets {
        if writer.advance() {
            writer.row(&headers, &bold);
            writer.advance();
        }
        writer.row(&detail_cells(entry), &regular);
    }

    drop(writer);
    doc.save_to_bytes().map_err(|e| ReportError::render("pdf", e))
}
