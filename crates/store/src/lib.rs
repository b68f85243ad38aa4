//! Remote persistence for the bundle engine.
//!
//! Everything that talks to the remote stores lives here: the
//! [`object_store::ObjectStore`] abstraction with its HTTP ([`graphql`]) and
//! in-memory ([`memory`]) implementations, the field [`codec`], the
//! [`bundle_store::BundleStore`] and [`combination_store::CombinationStore`]
//! repositories, the [`bulk`] executor, the [`media`] upload pipeline, and
//! the [`sync::Synchronizer`] that re-materializes the cart-transform
//! snapshot after every mutation.

pub mod bulk;
pub mod bundle_store;
pub mod codec;
pub mod combination_store;
pub mod error;
pub mod graphql;
pub mod media;
pub mod memory;
pub mod object_store;
pub mod sync;
