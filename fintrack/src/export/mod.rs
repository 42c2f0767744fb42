//! Transaction exports as spreadsheet or PDF attachments.
//!
//! Both renderers take the same [`ExportDocument`]: the rows in the requested date range plus a
//! totals footer computed here.

pub mod pdf;
pub mod xlsx;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{db::models::transactions::TransactionDBResponse, errors::Error, types::EntryKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub occurred_on: NaiveDate,
    pub description: String,
    pub category: String,
    pub kind: EntryKind,
    pub amount: Decimal,
}

impl From<&TransactionDBResponse> for ExportRow {
    fn from(tx: &TransactionDBResponse) -> Self {
        Self {
            occurred_on: tx.occurred_on,
            description: tx.description.clone(),
            category: tx.category_name.clone(),
            kind: tx.kind,
            amount: tx.amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTotals {
    pub income: Decimal,
    pub expense: Decimal,
    pub investment: Decimal,
    /// income - expense
    pub balance: Decimal,
}

impl ExportTotals {
    pub fn from_rows(rows: &[ExportRow]) -> Self {
        let mut totals = ExportTotals::default();
        for row in rows {
            match row.kind {
                EntryKind::Income => totals.income += row.amount,
                EntryKind::Expense => totals.expense += row.amount,
                EntryKind::Investment => totals.investment += row.amount,
            }
        }
        totals.balance = totals.income - totals.expense;
        totals
    }
}

#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<ExportRow>,
    pub totals: ExportTotals,
}

impl ExportDocument {
    /// Rows are listed oldest first.
    pub fn new(from: NaiveDate, to: NaiveDate, transactions: &[TransactionDBResponse]) -> Self {
        let mut rows: Vec<ExportRow> = transactions.iter().map(ExportRow::from).collect();
        rows.sort_by_key(|row| row.occurred_on);
        let totals = ExportTotals::from_rows(&rows);
        Self { from, to, rows, totals }
    }

    pub fn filename(&self, format: ExportFormat) -> String {
        format!("transactions-{}-{}.{}", self.from, self.to, format.extension())
    }

    pub fn render(&self, format: ExportFormat) -> Result<Vec<u8>, Error> {
        match format {
            ExportFormat::Xlsx => xlsx::render(self),
            ExportFormat::Pdf => pdf::render(self),
        }
    }
}

pub(crate) fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Income => "Income",
        EntryKind::Expense => "Expense",
        EntryKind::Investment => "Investment",
    }
}
