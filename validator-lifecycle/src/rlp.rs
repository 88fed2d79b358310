//! Minimal RLP Encoding
//!
//! Just enough RLP to build locally signed EVM transactions: byte-string
//! items, lists, and nested lists (access lists are lists of
//! `[address, [storageKey, ...]]` pairs).

/// Encodes a `u64` as a minimal big-endian byte string (zero is empty).
pub fn encode_u64(val: u64) -> Vec<u8> {
    if val == 0 {
        return vec![];
    }
    let bytes = val.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(8);
    bytes[start..].to_vec()
}

/// RLP-encodes a single byte-string item.
pub fn encode_item(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        // Single byte below 0x80: encoded as itself
        vec![data[0]]
    } else if data.len() <= 55 {
        let mut out = vec![0x80 + data.len() as u8];
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = encode_u64(data.len() as u64);
        let mut out = vec![0xb7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

/// Wraps already-encoded parts (items or sublists) in a list header.
pub fn encode_list_from_encoded(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for part in parts {
        payload.extend_from_slice(part);
    }

    if payload.len() <= 55 {
        let mut out = vec![0xc0 + payload.len() as u8];
        out.extend(payload);
        out
    } else {
        let len_bytes = encode_u64(payload.len() as u64);
        let mut out = vec![0xf7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend(payload);
        out
    }
}

/// RLP-encodes a flat list of byte-string items.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = items.iter().map(|item| encode_item(item)).collect();
    encode_list_from_encoded(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_canonical_scalars() {
        assert_eq!(encode_u64(0), Vec::<u8>::new());
        assert_eq!(encode_u64(15), vec![0x0f]);
        assert_eq!(encode_u64(1024), vec![0x04, 0x00]);
    }

    #[test]
    fn encodes_known_items() {
        // "dog" -> 0x83 'd' 'o' 'g'
        assert_eq!(encode_item(b"dog"), vec![0x83, b'd', b'o', b'g']);
        // Empty string -> 0x80
        assert_eq!(encode_item(&[]), vec![0x80]);
        // Single low byte encodes as itself
        assert_eq!(encode_item(&[0x7f]), vec![0x7f]);
    }

    #[test]
    fn encodes_known_lists() {
        // ["cat", "dog"] -> 0xc8 0x83 cat 0x83 dog
        let encoded = encode_list(&[b"cat".to_vec(), b"dog".to_vec()]);
        assert_eq!(
            encoded,
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        // Empty list -> 0xc0
        assert_eq!(encode_list(&[]), vec![0xc0]);
    }

    #[test]
    fn nests_encoded_sublists() {
        // [ [], [[]] ] -> 0xc3 0xc0 0xc1 0xc0
        let empty = encode_list_from_encoded(&[]);
        let nested = encode_list_from_encoded(&[empty.clone()]);
        let outer = encode_list_from_encoded(&[empty, nested]);
        assert_eq!(outer, vec![0xc3, 0xc0, 0xc1, 0xc0]);
    }

    #[test]
    fn long_payloads_use_long_form_headers() {
        let data = vec![0xabu8; 60];
        let encoded = encode_item(&data);
        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 60);
        assert_eq!(&encoded[2..], &data[..]);
    }
}
