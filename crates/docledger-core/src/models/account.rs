use serde::{Deserialize, Serialize};

/// Ordered list of wallet-authorized account addresses.
///
/// The active account is the first entry; an empty list means disconnected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountList(Vec<String>);

impl AccountList {
    pub fn new(accounts: Vec<String>) -> Self {
        Self(accounts)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Account currently authorized for signing.
    pub fn active(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for AccountList {
    fn from(accounts: Vec<String>) -> Self {
        Self(accounts)
    }
}

impl<'a> From<Vec<&'a str>> for AccountList {
    fn from(accounts: Vec<&'a str>) -> Self {
        Self(accounts.into_iter().map(String::from).collect())
    }
}

/// Check that `address` is a 20-byte hex address with a `0x` prefix.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
