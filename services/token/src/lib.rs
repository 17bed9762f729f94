//! GUID token service library.
//!
//! Issues HS512 access tokens paired with single-use refresh secrets,
//! rotates them, and flags rotations presented from a new client address.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod jwt;
pub mod metrics;
pub mod observability;
pub mod refresh;
pub mod session;
pub mod shutdown;
pub mod storage;

// Re-exports for convenience
pub use config::Config;
pub use error::TokenError;
pub use session::SessionRotator;
