//! Spreadsheet rendering with `rust_xlsxwriter`.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{ExportDocument, kind_label};
use crate::errors::Error;

const HEADERS: [&str; 5] = ["Date", "Description", "Category", "Type", "Amount"];
const COLUMN_WIDTHS: [f64; 5] = [12.0, 40.0, 20.0, 12.0, 14.0];

fn money(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

fn build(doc: &ExportDocument) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let amount_format = Format::new().set_num_format("#,##0.00");
    let total_format = Format::new().set_bold().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Transactions")?;

    sheet.write_string_with_format(0, 0, format!("Transactions {} to {}", doc.from, doc.to), &bold)?;

    let header_row = 2;
    for (col, (title, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(header_row, col, *title, &bold)?;
        sheet.set_column_width(col, width)?;
    }

    let mut row = header_row + 1;
    for entry in &doc.rows {
        sheet.write_string(row, 0, entry.occurred_on.to_string())?;
        sheet.write_string(row, 1, &entry.description)?;
        sheet.write_string(row, 2, &entry.category)?;
        sheet.write_string(row, 3, kind_label(entry.kind))?;
        sheet.write_number_with_format(row, 4, money(entry.amount), &amount_format)?;
        row += 1;
    }

    // Totals footer, one blank row below the data
    row += 1;
    for (label, amount) in [
        ("Total income", doc.totals.income),
        ("Total expense", doc.totals.expense),
        ("Total investment", doc.totals.investment),
        ("Balance", doc.totals.balance),
    ] {
        sheet.write_string_with_format(row, 3, label, &bold)?;
        sheet.write_number_with_format(row, 4, money(amount), &total_format)?;
        row += 1;
    }

    workbook.save_to_buffer()
}

pub fn render(doc: &ExportDocument) -> Result<Vec<u8>, Error> {
    build(doc).map_err(|e| Error::Internal {
        operation: format!("render spreadsheet export: {e}"),
    })
}
