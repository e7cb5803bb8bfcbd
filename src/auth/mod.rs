//! Authentication system
//!
//! Single-tenant USER/PASS validation.

pub mod credentials;
pub mod validator;

pub use credentials::Credentials;
pub use validator::{validate_password, validate_user};
