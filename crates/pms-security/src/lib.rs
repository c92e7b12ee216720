//! # PMS Security
//! 
//! Security utilities: JWT, password hashing, one-time tokens.

pub mod jwt;
pub mod password;
pub mod token;

pub use jwt::{Claims, JwtError, JwtService};
pub use password::PasswordService;
pub use token::OneTimeToken;
