//! Database record models matching table schemas.
//!
//! Each entity has a `*CreateDBRequest`, an optional `*UpdateDBRequest` and a `*DBResponse`.
//! Database models are distinct from the API models in [`crate::api::models`] so storage and
//! the HTTP surface can evolve independently; conversions live on the API side.
//!
//! - [`users`]: accounts, roles and subscription status
//! - [`categories`]: per-user categories, including the sentinel fallback
//! - [`transactions`]: income, expense and investment entries
//! - [`goals`]: savings goals
//! - [`investments`]: investments that feed goal progress
//! - [`analyses`]: stored monthly summaries with their narrative

pub mod analyses;
pub mod categories;
pub mod goals;
pub mod investments;
pub mod transactions;
pub mod users;
