//! Solidity ABI encoding for the document registry contract.
//!
//! Only the shapes the registry uses are supported: `address`, `string`,
//! `uint8`/`uint256` and `bool` arguments, plus `uint256`, `string[]` and the
//! document tuple as return values.

use docledger_core::{is_valid_address, DocumentRecord, DocumentType, StorageReference};
use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;
/// Selector of `Error(string)`, the standard revert payload
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

pub const REGISTER_DOCUMENT: &str = "registerDocument(address,string,string,string,uint8)";
pub const DOCUMENT_COUNT: &str = "getContagemDeBadges(address)";
pub const DOCUMENT_TITLES: &str = "getTitulosDasBadgesDoUsuario(address)";
pub const DOCUMENT_BY_TITLE: &str = "getBadgePorTitulo(address,string)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Malformed return data: {0}")]
    Decode(String),
}

/// A single ABI argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Uint(u128),
    Bool(bool),
    String(String),
}

impl Token {
    pub fn address(address: &str) -> Result<Self, AbiError> {
        if !is_valid_address(address) {
            return Err(AbiError::InvalidAddress(address.to_string()));
        }
        let raw = hex::decode(&address[2..]).map_err(|_| AbiError::InvalidAddress(address.to_string()))?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&raw);
        Ok(Token::Address(bytes))
    }

    fn head_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Token::Address(bytes) => word[12..].copy_from_slice(bytes),
            Token::Uint(value) => word[16..].copy_from_slice(&value.to_be_bytes()),
            Token::Bool(value) => word[31] = u8::from(*value),
            Token::String(_) => {}
        }
        word
    }
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

fn uint_word(value: usize) -> [u8; WORD] {
    Token::Uint(value as u128).head_word()
}

/// Encode arguments as a head/tail ABI tuple.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::String(value) => {
                head.extend_from_slice(&uint_word(head_len + tail.len()));
                tail.extend_from_slice(&uint_word(value.len()));
                tail.extend_from_slice(value.as_bytes());
                let padding = (WORD - value.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
            _ => head.extend_from_slice(&token.head_word()),
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Calldata for `signature` called with `tokens`.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode(tokens));
    data
}

/// `base + delta`, rejecting offsets that do not fit in memory.
fn advance(base: usize, delta: usize) -> Result<usize, AbiError> {
    base.checked_add(delta)
        .ok_or_else(|| AbiError::Decode(format!("offset {} + {} is out of range", base, delta)))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = advance(offset, WORD)?;
    data.get(offset..end)
        .ok_or_else(|| AbiError::Decode(format!("expected a word at byte {}", offset)))
}

fn usize_at(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let word = word_at(data, offset)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Decode(format!("value at byte {} overflows", offset)));
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(be))
        .map_err(|_| AbiError::Decode(format!("value at byte {} overflows", offset)))
}

fn u64_at(data: &[u8], offset: usize) -> Result<u64, AbiError> {
    usize_at(data, offset).map(|v| v as u64)
}

/// Read a length-prefixed string whose length word starts at `offset`.
fn string_at(data: &[u8], offset: usize) -> Result<String, AbiError> {
    let len = usize_at(data, offset)?;
    let start = advance(offset, WORD)?;
    let end = advance(start, len)?;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| AbiError::Decode(format!("string at byte {} is truncated", offset)))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| AbiError::Decode(format!("string at byte {} is not UTF-8", offset)))
}

/// Decode a single `uint256` return value.
pub fn decode_uint(data: &[u8]) -> Result<u64, AbiError> {
    u64_at(data, 0)
}

/// Decode a single `string[]` return value.
pub fn decode_string_array(data: &[u8]) -> Result<Vec<String>, AbiError> {
    let array_offset = usize_at(data, 0)?;
    let count = usize_at(data, array_offset)?;
    let elements = advance(array_offset, WORD)?;

    (0..count)
        .map(|i| {
            let slot = i
                .checked_mul(WORD)
                .ok_or_else(|| AbiError::Decode(format!("element {} is out of range", i)))?;
            let relative = usize_at(data, advance(elements, slot)?)?;
            string_at(data, advance(elements, relative)?)
        })
        .collect()
}

/// Decode the `(string, string, uint256, uint8, bool)` document tuple.
pub fn decode_document(data: &[u8]) -> Result<DocumentRecord, AbiError> {
    let base = usize_at(data, 0)?;

    let name_offset = usize_at(data, base)?;
    let reference_offset = usize_at(data, advance(base, WORD)?)?;
    let creation_date = u64_at(data, advance(base, 2 * WORD)?)?;
    let document_type = usize_at(data, advance(base, 3 * WORD)?)?;
    let issued = usize_at(data, advance(base, 4 * WORD)?)?;

    let document_type = u8::try_from(document_type)
        .map_err(|_| AbiError::Decode(format!("document type {} is not a uint8", document_type)))?;

    Ok(DocumentRecord {
        document_name: string_at(data, advance(base, name_offset)?)?,
        storage_reference: StorageReference::new(string_at(data, advance(base, reference_offset)?)?),
        creation_date,
        document_type: DocumentType(document_type),
        issued: issued != 0,
    })
}

/// Extract the message from an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    let offset = usize_at(payload, 0).ok()?;
    string_at(payload, offset).ok()
}

/// Parse a `0x`-prefixed hex string into bytes.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, AbiError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(trimmed).map_err(|e| AbiError::Decode(format!("invalid hex: {}", e)))
}
