//! Shared foundational types used across the sheaf asset bundler.
//!
//! This crate provides the [`Fingerprint`] content hash that every other
//! crate uses as its cache-validity token.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{Fingerprint, ParseFingerprintError};
