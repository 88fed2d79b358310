//! Contract ABI Encoding Helpers
//!
//! Hand-rolled ABI support for the validator-manager call surface: keccak
//! selectors and event topics, head/tail encoding of call arguments
//! (including the nested dynamic tuples used for threshold owners), and the
//! small amount of decoding the client needs (`address` words, `bytes32`
//! words, and a single dynamic `bytes` argument from event data).

use sha3::{Digest, Keccak256};

/// Computes the 4-byte function selector for a signature string.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Computes the event topic hash for a signature string, 0x-prefixed.
pub fn event_topic(signature: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

// ============================================================================
// ARGUMENT ENCODING
// ============================================================================

/// An ABI value. Only the shapes the validator-manager interface needs.
#[derive(Debug, Clone)]
pub enum Token {
    /// Unsigned integer up to 64 bits, left-padded to a word.
    Uint(u64),
    Address([u8; 20]),
    FixedBytes32([u8; 32]),
    /// Dynamic byte string.
    Bytes(Vec<u8>),
    /// Tuple (struct) of nested values.
    Tuple(Vec<Token>),
    /// Dynamic `address[]`.
    AddressArray(Vec<[u8; 20]>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::Uint(_) | Token::Address(_) | Token::FixedBytes32(_) => false,
            Token::Bytes(_) | Token::AddressArray(_) => true,
            Token::Tuple(members) => members.iter().any(Token::is_dynamic),
        }
    }

    /// Head size in bytes: a dynamic value occupies one offset word.
    fn head_size(&self) -> usize {
        match self {
            Token::Tuple(members) if !self.is_dynamic() => {
                members.iter().map(Token::head_size).sum()
            }
            _ => 32,
        }
    }
}

fn uint_word(val: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..32].copy_from_slice(&val.to_be_bytes());
    word
}

fn address_word(addr: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..32].copy_from_slice(addr);
    word
}

fn pad_to_word_boundary(out: &mut Vec<u8>) {
    while out.len() % 32 != 0 {
        out.push(0);
    }
}

/// Encodes a token sequence using the standard head/tail layout.
fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    let head_size: usize = tokens.iter().map(Token::head_size).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_size + tail.len()) as u64));
            tail.extend_from_slice(&encode_tail(token));
        } else {
            encode_static(token, &mut head);
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn encode_static(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::Uint(val) => out.extend_from_slice(&uint_word(*val)),
        Token::Address(addr) => out.extend_from_slice(&address_word(addr)),
        Token::FixedBytes32(bytes) => out.extend_from_slice(bytes),
        Token::Tuple(members) => {
            for member in members {
                encode_static(member, out);
            }
        }
        // Unreachable for static encoding; dynamic values go through the tail.
        Token::Bytes(_) | Token::AddressArray(_) => {}
    }
}

fn encode_tail(token: &Token) -> Vec<u8> {
    match token {
        Token::Bytes(data) => {
            let mut out = Vec::with_capacity(32 + data.len() + 31);
            out.extend_from_slice(&uint_word(data.len() as u64));
            out.extend_from_slice(data);
            pad_to_word_boundary(&mut out);
            out
        }
        Token::AddressArray(addresses) => {
            let mut out = Vec::with_capacity(32 + addresses.len() * 32);
            out.extend_from_slice(&uint_word(addresses.len() as u64));
            for addr in addresses {
                out.extend_from_slice(&address_word(addr));
            }
            out
        }
        Token::Tuple(members) => encode_tokens(members),
        // Static values never reach the tail.
        _ => Vec::new(),
    }
}

/// Builds full calldata: selector followed by encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&encode_tokens(tokens));
    out
}

// ============================================================================
// RESULT / LOG DECODING
// ============================================================================

/// Decodes a hex string (with or without 0x prefix) into bytes.
pub fn hex_to_bytes(value: &str) -> anyhow::Result<Vec<u8>> {
    let clean = value.strip_prefix("0x").unwrap_or(value);
    Ok(hex::decode(clean)?)
}

/// Extracts the address from the first 32-byte word of an `eth_call` result.
pub fn decode_address_word(result_hex: &str) -> anyhow::Result<[u8; 20]> {
    let bytes = hex_to_bytes(result_hex)?;
    if bytes.len() < 32 {
        anyhow::bail!("result too short for an address word: {} bytes", bytes.len());
    }
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes[12..32]);
    Ok(addr)
}

/// Extracts the first 32-byte word of an `eth_call` result.
pub fn decode_bytes32_word(result_hex: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex_to_bytes(result_hex)?;
    if bytes.len() < 32 {
        anyhow::bail!("result too short for a bytes32 word: {} bytes", bytes.len());
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes[..32]);
    Ok(word)
}

/// Decodes a single ABI-encoded dynamic `bytes` value (offset word, length
/// word, data). Returns `None` on any out-of-bounds slice so callers can
/// skip malformed entries.
pub fn decode_single_bytes(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 32 {
        return None;
    }
    let offset = word_to_usize(&data[..32])?;
    let len_end = offset.checked_add(32)?;
    if data.len() < len_end {
        return None;
    }
    let len = word_to_usize(&data[offset..len_end])?;
    let data_end = len_end.checked_add(len)?;
    if data.len() < data_end {
        return None;
    }
    Some(data[len_end..data_end].to_vec())
}

fn word_to_usize(word: &[u8]) -> Option<usize> {
    // Reject values that cannot fit a reasonable buffer offset.
    if word[..24].iter().any(|&b| b != 0) {
        return None;
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&word[24..32]);
    usize::try_from(u64::from_be_bytes(raw)).ok()
}
