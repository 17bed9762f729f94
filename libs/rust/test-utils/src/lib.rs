//! Shared test utilities for the GUID token service.
//!
//! This crate provides:
//! - Proptest generators for subjects, addresses and secrets
//! - Recording and failing notifiers, and a call-counting store
//! - Fixtures that assemble a rotator over the in-memory store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use fixtures::*;
pub use generators::*;
pub use mocks::*;
