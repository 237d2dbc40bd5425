//! Docledger Storage Library
//!
//! This crate provides the content-addressed storage client used to publish
//! documents and fetch them back by identifier. It includes the `ContentStore`
//! trait and implementations for the Pinata IPFS pinning service and a local
//! directory.
//!
//! # Identifiers
//!
//! Identifiers are assigned by the backend on publish and are opaque to every
//! caller. Backends never retry on their own: a failed call is reported once
//! and the decision to try again belongs to the caller.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-pinata")]
pub mod pinata;
pub mod traits;

// Re-export commonly used types
pub use docledger_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-pinata")]
pub use pinata::PinataStorage;
pub use traits::{ContentStore, StorageError, StorageResult};
