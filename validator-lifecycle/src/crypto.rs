//! Cryptographic Operations Module
//!
//! ECDSA (secp256k1) key management for locally signed EVM transactions:
//! prehash signing with recovery-ID determination and Ethereum address
//! derivation.
//!
//! **CRITICAL**: private keys must never be exposed or logged.

use anyhow::Result;
use k256::ecdsa::{
    Signature as EcdsaSignature, SigningKey as EcdsaSigningKey, VerifyingKey as EcdsaVerifyingKey,
};
use sha3::{Digest, Keccak256};

use crate::config::Config;

// ============================================================================
// CRYPTOGRAPHIC SERVICE IMPLEMENTATION
// ============================================================================

/// Cryptographic service holding the operator's ECDSA key.
pub struct CryptoService {
    ecdsa_signing_key: EcdsaSigningKey,
}

impl CryptoService {
    /// Creates a new cryptographic service from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_private_key_hex(&config.wallet.private_key)
    }

    /// Creates a service from a hex-encoded 32-byte secp256k1 private key.
    pub fn from_private_key_hex(private_key_hex: &str) -> Result<Self> {
        let key_hex = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        let key_bytes = hex::decode(key_hex)?;

        if key_bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                key_bytes.len()
            ));
        }

        let secret: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert private key to array"))?;
        let ecdsa_signing_key = EcdsaSigningKey::from_bytes(&secret.into())
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;

        Ok(Self { ecdsa_signing_key })
    }

    /// Signs a raw EVM transaction hash with the ECDSA key.
    ///
    /// This does NOT apply the Ethereum signed message prefix — the caller is
    /// expected to pass a keccak256 hash of an RLP-encoded transaction.
    ///
    /// # Returns
    ///
    /// * `Ok((r, s, recovery_id))` — r and s are 32-byte big-endian,
    ///   recovery_id is 0 or 1
    pub fn sign_evm_transaction_hash(
        &self,
        tx_hash: &[u8; 32],
    ) -> Result<([u8; 32], [u8; 32], u8)> {
        use k256::ecdsa::signature::hazmat::PrehashSigner;
        let signature: EcdsaSignature = self
            .ecdsa_signing_key
            .sign_prehash(tx_hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign transaction hash: {}", e))?;

        let sig_bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        // Determine the recovery ID by recovering with 0 and comparing keys.
        let verifying_key = self.ecdsa_signing_key.verifying_key();
        let public_key_point = verifying_key.to_encoded_point(false);
        let public_key_bytes = public_key_point.as_bytes();

        let recovery_id_0 = k256::ecdsa::RecoveryId::try_from(0u8)
            .map_err(|e| anyhow::anyhow!("Invalid recovery id: {}", e))?;
        let recovery_id = if let Ok(recovered) =
            EcdsaVerifyingKey::recover_from_prehash(tx_hash, &signature, recovery_id_0)
        {
            if recovered.to_encoded_point(false).as_bytes() == public_key_bytes {
                0u8
            } else {
                1u8
            }
        } else {
            1u8
        };

        Ok((r, s, recovery_id))
    }

    /// Derives the Ethereum address from the ECDSA public key:
    /// keccak256(uncompressed_public_key)[12:32].
    pub fn ethereum_address(&self) -> Result<String> {
        let verifying_key = self.ecdsa_signing_key.verifying_key();
        let public_key_point = verifying_key.to_encoded_point(false);
        let public_key_bytes = public_key_point.as_bytes();

        // Uncompressed format: 0x04 || x (32 bytes) || y (32 bytes)
        if public_key_bytes.len() != 65 || public_key_bytes[0] != 0x04 {
            return Err(anyhow::anyhow!(
                "Invalid public key format: expected 65 bytes with 0x04 prefix"
            ));
        }

        let mut hasher = Keccak256::new();
        hasher.update(&public_key_bytes[1..]);
        let hash = hasher.finalize();

        Ok(format!("0x{}", hex::encode(&hash[12..32])))
    }
}
