//! API request/response models for categories.

use crate::{
    db::models::categories::{CategoryDBResponse, CategoryDeletion},
    types::{CategoryId, EntryKind, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryCreate {
    pub name: String,
    pub kind: EntryKind,
    /// Hex color such as `#16A34A`. A neutral grey is used when omitted.
    pub color: Option<String>,
}

/// The kind of a category is fixed once created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CategoryId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub kind: EntryKind,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryDBResponse> for CategoryResponse {
    fn from(db: CategoryDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            kind: db.kind,
            color: db.color,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCategoriesQuery {
    pub kind: Option<EntryKind>,
}

/// Outcome of a category deletion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDeleteResponse {
    /// Transactions moved to the `Unknown` category of the same kind
    pub reassigned_transactions: i64,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub sentinel_category_id: Option<CategoryId>,
}

impl From<CategoryDeletion> for CategoryDeleteResponse {
    fn from(deletion: CategoryDeletion) -> Self {
        Self {
            reassigned_transactions: deletion.reassigned,
            sentinel_category_id: deletion.sentinel_id,
        }
    }
}
