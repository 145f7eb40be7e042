//! Authentication for the VetBridge server.
//!
//! Registration and login orchestration, password hashing, bearer-token
//! issuance/verification and the request gate for protected routes.

pub mod gate;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;

pub use gate::RequireAuth;
pub use password::PasswordHasher;
pub use service::AuthService;
pub use token::{Claims, TokenService};
