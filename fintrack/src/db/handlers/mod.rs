//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (a pooled connection or an open
//! transaction) and returns the models from [`crate::db::models`]. Operations that touch
//! several tables open a nested transaction on that connection, so callers can compose them
//! inside their own transaction.
//!
//! # Available Repositories
//!
//! - [`Users`]: accounts, lookup by email, consent
//! - [`Categories`]: per-user categories and sentinel reassignment on delete
//! - [`Transactions`]: income, expense and investment entries with date-range filters
//! - [`Goals`]: savings goals and progress adjustment
//! - [`Investments`]: investments, keeping goal progress in step
//! - [`Analyses`]: stored monthly analyses (not a [`Repository`])
//!
//! # Common Pattern
//!
//! ```ignore
//! use fintrack::db::handlers::{Goals, Repository};
//!
//! async fn example(db: &fintrack::db::Database) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = db.acquire().await?;
//!     let goals = Goals::new(&mut conn).list(&GoalFilter::new(user_id)).await?;
//!     Ok(())
//! }
//! ```

pub mod analyses;
pub mod categories;
pub mod goals;
pub mod investments;
pub mod repository;
pub mod transactions;
pub mod users;

pub use analyses::Analyses;
pub use categories::Categories;
pub use goals::Goals;
pub use investments::Investments;
pub use repository::Repository;
pub use transactions::Transactions;
pub use users::Users;
