pub mod generator;
pub mod hasher;
pub mod issuer;
pub mod record;

pub use generator::RefreshTokenGenerator;
pub use hasher::RefreshHasher;
pub use issuer::{IssuedPair, TokenPairIssuer};
pub use record::{RefreshRecord, RefreshState};
