//! PDF rendering with `printpdf`, using the builtin Helvetica fonts so no font files ship with
//! the binary.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rust_decimal::Decimal;

use super::{ExportDocument, kind_label};
use crate::errors::Error;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 14.0;

/// Column x offsets: date, description, category, type, amount
const COLUMNS: [f32; 5] = [MARGIN, 40.0, 110.0, 145.0, 172.0];
const DESCRIPTION_CHARS: usize = 38;

fn pdf_error(e: impl std::fmt::Debug) -> Error {
    Error::Internal {
        operation: format!("render PDF export: {e:?}"),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

fn amount(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Writes lines top to bottom, starting a new page when the current one is full.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn ensure_space(&mut self) {
        if self.y < MARGIN + LINE_HEIGHT {
            self.pages += 1;
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages));
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn row(&mut self, cells: [&str; 5], bold: bool) {
        self.ensure_space();
        let font = if bold { &self.bold } else { &self.regular };
        for (x, text) in COLUMNS.iter().zip(cells) {
            self.layer.use_text(text, FONT_SIZE, Mm(*x), Mm(self.y), font);
        }
        self.y -= LINE_HEIGHT;
    }

    fn title(&mut self, text: &str) {
        self.layer.use_text(text, TITLE_SIZE, Mm(MARGIN), Mm(self.y), &self.bold);
        self.y -= LINE_HEIGHT * 2.0;
    }
}

pub fn render(doc: &ExportDocument) -> Result<Vec<u8>, Error> {
    let title = format!("Transactions {} to {}", doc.from, doc.to);
    let (pdf, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let regular = pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = pdf.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    let mut writer = PageWriter {
        doc: &pdf,
        layer: pdf.get_page(page).get_layer(layer),
        regular,
        bold,
        y: PAGE_HEIGHT - MARGIN,
        pages: 1,
    };

    writer.title(&title);
    writer.row(["Date", "Description", "Category", "Type", "Amount"], true);

    for entry in &doc.rows {
        let date = entry.occurred_on.to_string();
        let description = truncate(&entry.description, DESCRIPTION_CHARS);
        let category = truncate(&entry.category, 18);
        let value = amount(entry.amount);
        writer.row([date.as_str(), description.as_str(), category.as_str(), kind_label(entry.kind), value.as_str()], false);
    }

    writer.y -= LINE_HEIGHT;
    for (label, total) in [
        ("Total income", doc.totals.income),
        ("Total expense", doc.totals.expense),
        ("Total investment", doc.totals.investment),
        ("Balance", doc.totals.balance),
    ] {
        let value = amount(total);
        writer.row(["", "", "", label, value.as_str()], true);
    }

    drop(writer);
    pdf.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{document, row};
    use crate::types::EntryKind;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer description", 10), "a much ...");
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(Decimal::new(1234567, 3)), "1234.57");
        assert_eq!(amount(Decimal::from(5)), "5.00");
    }

    #[test]
    fn test_renders_pdf_header() {
        let bytes = render(&document(vec![row(2, EntryKind::Expense, "42.00")])).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_exports_span_pages() {
        let rows = (0..120).map(|i| row(1 + i % 28, EntryKind::Expense, "1.00")).collect();
        let long = render(&document(rows)).unwrap();
        let short = render(&document(vec![])).unwrap();
        assert!(long.len() > short.len());
    }
}
