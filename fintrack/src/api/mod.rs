//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): login, logout, session refresh, password change
//! - **Profile** (`/api/v1/users/current`): the caller's profile and consent
//! - **Finance** (`/api/v1/categories`, `/api/v1/transactions`, `/api/v1/goals`,
//!   `/api/v1/investments`): per-user records
//! - **Analyses** (`/api/v1/analyses`): generated monthly summaries
//! - **Admin** (`/api/v1/admin/users`): account administration
//! - **Webhooks** (`/webhooks/purchases`): purchase-platform notifications
//!
//! # OpenAPI Documentation
//!
//! Endpoints are annotated with `utoipa`. The rendered documentation is served at `/docs`.

pub mod handlers;
pub mod models;
