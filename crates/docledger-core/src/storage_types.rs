use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Content-addressed storage backend types
///
/// Defined in core because it is selected by configuration and reported by
/// every storage implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Pinata IPFS pinning service
    Pinata,
    /// Directory on the local filesystem
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinata" | "ipfs" => Ok(StorageBackend::Pinata),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Pinata => write!(f, "pinata"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}
