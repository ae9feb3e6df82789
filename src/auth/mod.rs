//! Authentication and authorization for vidtube
//!
//! Provides:
//! - Access and refresh token issuance and validation (HS256)
//! - Password hashing with Argon2
//! - The ownership guard applied before every mutation
//! - Cookie transport for tokens

pub mod cookies;
pub mod guard;
pub mod jwt;
pub mod password;

pub use cookies::{expired_cookie, read_cookie, session_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
pub use guard::{authorize, ensure_owner, Access, Principal};
pub use jwt::{extract_token_from_header, AccessClaims, RefreshClaims, TokenIssuer, TokenPair};
pub use password::{hash_password, verify_password};
