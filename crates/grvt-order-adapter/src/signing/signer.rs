/*
[INPUT]:  Typed-data payload and a secp256k1 private key (hex)
[OUTPUT]: Deterministic (r, s, v) signature with the recovered signer address
[POS]:    Signing layer - EIP-712 hashing and ECDSA signing
[UPDATE]: When signature encoding or key handling changes
*/

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::http::{GrvtError, Result};
use crate::signing::typed_data::TypedDataPayload;
use crate::types::Signature;

/// Offset added to the recovery parity for `v`
const V_OFFSET: u8 = 27;

/// A parsed signing key; the secret is never printed
#[derive(Clone)]
pub struct SigningKey {
    signer: PrivateKeySigner,
}

impl SigningKey {
    /// Parse a 32-byte hex key, with or without the `0x` prefix
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let trimmed = private_key_hex.trim();
        let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if hex_key.len() != 64 {
            return Err(GrvtError::Signature(format!(
                "private key must be 32 bytes of hex, got {} characters",
                hex_key.len()
            )));
        }
        let signer = PrivateKeySigner::from_str(hex_key)
            .map_err(|e| GrvtError::Signature(format!("invalid private key: {e}")))?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl FromStr for SigningKey {
    type Err = GrvtError;

    fn from_str(value: &str) -> Result<Self> {
        Self::from_hex(value)
    }
}

/// Produces EIP-712 signatures over typed-data payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct Signer;

impl Signer {
    /// Sign `payload` with `key`.
    ///
    /// Nonces are derived per RFC 6979, so identical inputs give identical output.
    /// The `signer` field is the address recovered from the produced signature.
    pub fn sign(payload: &TypedDataPayload, key: &SigningKey) -> Result<Signature> {
        let digest = payload.signing_hash();
        let signature = key
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| GrvtError::Signature(format!("signing failed: {e}")))?;

        let recovered = signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| GrvtError::Signature(format!("recovery failed: {e}")))?;
        if recovered != key.address() {
            return Err(GrvtError::Signature(format!(
                "recovered {recovered} does not match key address {}",
                key.address()
            )));
        }

        Ok(Signature {
            r: encode_word(signature.r()),
            s: encode_word(signature.s()),
            v: V_OFFSET + u8::from(signature.v()),
            signer: recovered.to_checksum(None),
            expiration: payload.message.expiration,
            nonce: payload.message.nonce,
        })
    }

    /// Recover the signing address from a digest and encoded (r, s, v)
    pub fn recover(digest: &B256, r: &str, s: &str, v: u8) -> Result<Address> {
        let parity = match v {
            27 | 0 => false,
            28 | 1 => true,
            other => {
                return Err(GrvtError::Signature(format!("invalid recovery value {other}")));
            }
        };
        let signature =
            alloy::primitives::Signature::new(decode_word(r)?, decode_word(s)?, parity);
        signature
            .recover_address_from_prehash(digest)
            .map_err(|e| GrvtError::Signature(format!("recovery failed: {e}")))
    }
}

fn encode_word(value: U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

fn decode_word(raw: &str) -> Result<U256> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(digits)
        .map_err(|e| GrvtError::Signature(format!("invalid signature word '{raw}': {e}")))?;
    if bytes.len() != 32 {
        return Err(GrvtError::Signature(format!(
            "signature word must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes))
}
