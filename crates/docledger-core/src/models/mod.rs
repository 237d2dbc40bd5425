//! Domain models for document registration and retrieval.

pub mod account;
pub mod content;
pub mod document;
pub mod file;

pub use account::{is_valid_address, AccountList};
pub use content::{ContentFingerprint, FetchedContent, StorageReference};
pub use document::{DocumentRecord, DocumentType, RegistrationForm, RegistrationRecord};
pub use file::{extension_for_media_type, guess_media_type, SelectedFile};
