//! Authentication and authorization.
//!
//! Users sign in with email and password at `/authentication/login` and receive a JWT session
//! token in an HTTP-only cookie. The same token is accepted as an `Authorization: Bearer` header.
//! There is no self-registration: accounts are created by an admin or by the purchase webhook,
//! with a temporary password that must be changed on first login.
//!
//! # Modules
//!
//! - [`current_user`]: extractors for the authenticated caller
//! - [`password`]: Argon2 hashing, length rules and temporary passwords
//! - [`permissions`]: role checks
//! - [`session`]: JWT claims, cookies and the explicit claims refresh
//!
//! # Usage in Handlers
//!
//! ```ignore
//! async fn protected_handler(current_user: CurrentUser) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", current_user.name))
//! }
//!
//! async fn admin_handler(AdminUser(admin): AdminUser) -> Result<String, Error> {
//!     Ok(format!("Admin {}", admin.email))
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
