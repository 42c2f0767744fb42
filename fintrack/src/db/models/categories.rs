//! Database models for categories.

use crate::types::{CategoryId, EntryKind, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Name of the per-user, per-kind fallback category that absorbs transactions of deleted
/// categories.
pub const SENTINEL_CATEGORY_NAME: &str = "Unknown";

pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

/// Categories every new account starts with.
pub const DEFAULT_CATEGORIES: &[(&str, EntryKind, &str)] = &[
    ("Salary", EntryKind::Income, "#16A34A"),
    ("Freelance", EntryKind::Income, "#22C55E"),
    ("Housing", EntryKind::Expense, "#DC2626"),
    ("Food", EntryKind::Expense, "#F97316"),
    ("Transport", EntryKind::Expense, "#EAB308"),
    ("Health", EntryKind::Expense, "#EC4899"),
    ("Leisure", EntryKind::Expense, "#8B5CF6"),
    ("Savings", EntryKind::Investment, "#2563EB"),
];

#[derive(Debug, Clone)]
pub struct CategoryCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub kind: EntryKind,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdateDBRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CategoryDBResponse {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub kind: EntryKind,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl CategoryDBResponse {
    pub fn is_sentinel(&self) -> bool {
        self.name == SENTINEL_CATEGORY_NAME
    }
}

/// Outcome of deleting a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDeletion {
    /// Transactions moved to the sentinel category
    pub reassigned: i64,
    /// The sentinel that received them, if any were moved
    pub sentinel_id: Option<CategoryId>,
}
