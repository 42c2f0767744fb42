//! HTTP request handlers for all API endpoints.
//!
//! Handlers are organized by resource. Each one validates its input, checks the caller through
//! the extractors in [`crate::auth::current_user`], calls the repositories in
//! [`crate::db::handlers`] and maps the result to a response model.
//!
//! # Handler Modules
//!
//! - [`admin`]: account administration (list, create, update, delete, resend welcome)
//! - [`analyses`]: monthly analysis generation and history
//! - [`auth`]: login, logout, session refresh and password change
//! - [`categories`]: per-user categories
//! - [`goals`]: savings goals
//! - [`investments`]: investments and their goal progress
//! - [`transactions`]: income, expense and investment entries, and their export
//! - [`users`]: the caller's own profile and consent
//! - [`webhooks`]: purchase-platform notifications
//!
//! # Ownership
//!
//! Rows belonging to another user are reported as 404, the same as rows that do not exist.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to an HTTP status and a JSON body.

pub mod admin;
pub mod analyses;
pub mod auth;
pub mod categories;
pub mod goals;
pub mod investments;
pub mod transactions;
pub mod users;
pub mod webhooks;
