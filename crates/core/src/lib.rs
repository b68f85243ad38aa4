//! Domain model for the bundle engine.
//!
//! Pure types and functions only: entities, validation, pricing, and the
//! cart-transform snapshot projection. Everything that talks to a remote
//! store lives in `bundlekit-store`; this crate has no I/O.

pub mod bundle;
pub mod combination;
pub mod error;
pub mod pricing;
pub mod snapshot;
pub mod types;
pub mod validation;
