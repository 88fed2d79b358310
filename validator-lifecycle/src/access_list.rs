//! Access-List Injection
//!
//! Signed warp messages are not passed as call data: the completing
//! transaction carries them as synthetic access-list entries under the warp
//! precompile address, where the precompile reads them back. The signed
//! message bytes are framed with a 0xff delimiter, zero-padded to a 32-byte
//! boundary, and split into 32-byte storage keys.

/// Fixed address of the warp precompile on the EVM-style chain.
pub const WARP_PRECOMPILE_ADDRESS: &str = "0x0200000000000000000000000000000000000005";

/// One EIP-2930 access-list entry: an address plus its storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListEntry {
    pub address: [u8; 20],
    pub storage_keys: Vec<[u8; 32]>,
}

/// Packs a signed message into the single access-list entry the precompile
/// expects: message bytes, then a 0xff delimiter, zero-padded to a 32-byte
/// multiple and chunked into storage keys.
pub fn signed_message_access_list(signed_message: &[u8]) -> AccessListEntry {
    let mut framed = Vec::with_capacity(signed_message.len() + 33);
    framed.extend_from_slice(signed_message);
    framed.push(0xff);
    while framed.len() % 32 != 0 {
        framed.push(0x00);
    }

    let storage_keys = framed
        .chunks_exact(32)
        .map(|chunk| {
            let mut key = [0u8; 32];
            key.copy_from_slice(chunk);
            key
        })
        .collect();

    AccessListEntry {
        address: warp_precompile_address_bytes(),
        storage_keys,
    }
}

/// Reassembles the original signed message from storage keys (strips the
/// padding and delimiter). Returns `None` if the delimiter is missing.
pub fn unpack_access_list(entry: &AccessListEntry) -> Option<Vec<u8>> {
    let mut framed: Vec<u8> = Vec::with_capacity(entry.storage_keys.len() * 32);
    for key in &entry.storage_keys {
        framed.extend_from_slice(key);
    }
    while framed.last() == Some(&0x00) {
        framed.pop();
    }
    if framed.pop() != Some(0xff) {
        return None;
    }
    Some(framed)
}

/// The warp precompile address as raw bytes.
pub fn warp_precompile_address_bytes() -> [u8; 20] {
    let mut addr = [0u8; 20];
    addr[0] = 0x02;
    addr[19] = 0x05;
    addr
}
