//! Access token claims codec.

pub mod claims;
pub mod codec;
pub mod secret;

pub use claims::AccessClaims;
pub use codec::ClaimsCodec;
pub use secret::SigningSecret;
