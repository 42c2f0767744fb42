//! API request and response data models.
//!
//! These structures define the public HTTP contract. They are kept separate from the database
//! models in [`crate::db::models`] so storage and API representations can evolve independently,
//! and are annotated with `utoipa` for the generated OpenAPI document.
//!
//! - [`auth`]: login, logout, session refresh and password change payloads
//! - [`users`]: the authenticated caller, profiles and admin user management
//! - [`categories`], [`transactions`], [`goals`], [`investments`]: per-user finance records
//! - [`analyses`]: generated monthly analyses
//! - [`webhooks`]: purchase-platform webhook acknowledgements
//! - [`pagination`]: shared `skip`/`limit` parameters and the paginated wrapper

pub mod analyses;
pub mod auth;
pub mod categories;
pub mod goals;
pub mod investments;
pub mod pagination;
pub mod transactions;
pub mod users;
pub mod webhooks;
