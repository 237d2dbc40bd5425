//! Docledger Core Library
//!
//! This crate provides the domain models, content hashing, error metadata and
//! configuration shared by the storage, ledger and orchestration crates.

pub mod config;
pub mod error;
pub mod hashing;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{LogLevel, UserFacing};
pub use hashing::{ContentHasher, HashError};
pub use models::{
    is_valid_address, AccountList, ContentFingerprint, DocumentRecord, DocumentType,
    FetchedContent, RegistrationForm, RegistrationRecord, SelectedFile, StorageReference,
};
pub use storage_types::StorageBackend;
