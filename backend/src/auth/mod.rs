//! Authentication module
//!
//! Provides JWT-based session tokens, argon2 password hashing with legacy
//! bcrypt upgrade, per-identifier login throttling, and the admin gate.

mod jwt;
mod middleware;
mod password;
mod throttle;

pub use jwt::{Claims, TokenError, TokenService};
pub use middleware::{AdminUser, AuthUser};
pub use password::PasswordService;
pub use throttle::{LoginThrottle, ThrottleDecision};
