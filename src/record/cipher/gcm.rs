// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AES-GCM record protection (RFC 5288, ring backend)
//!
//! The per-record nonce is deterministic: `fixed_iv (salt) || explicit`,
//! where the explicit part is the 64-bit wire sequence number (the implicit
//! counter in TLS, `epoch || seq` in DTLS). The explicit part travels in
//! front of the ciphertext; the salt never leaves the security parameters.
//!
//! # Record layout
//!
//! ```text
//! +-------------------+
//! | explicit_nonce    |  8 bytes
//! +-------------------+
//! | ciphertext        |  N bytes
//! +-------------------+
//! | auth tag          | 16 bytes
//! +-------------------+
//! ```

use ring::aead::{
    Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey, AES_128_GCM,
    AES_256_GCM,
};
use ring::error::Unspecified;
use zeroize::Zeroize;

use crate::error::{RecordError, RecordResult};
use crate::record::constants::{GCM_EXPLICIT_NONCE_LEN, GCM_FIXED_IV_LEN, GCM_TAG_LEN};
use crate::record::text::{pseudo_header, CipherText, CompressedText};

/// AES-GCM context for one direction of one epoch.
pub struct GcmSuite {
    key: Vec<u8>,
    fixed_iv: [u8; GCM_FIXED_IV_LEN],
    algorithm: &'static ring::aead::Algorithm,
}

impl GcmSuite {
    pub fn new(key: &[u8], fixed_iv: &[u8]) -> RecordResult<Self> {
        let algorithm = match key.len() {
            16 => &AES_128_GCM,
            32 => &AES_256_GCM,
            _ => {
                return Err(RecordError::CryptoAdapterFailure(
                    "unsupported AES-GCM key length",
                ))
            }
        };
        if fixed_iv.len() != GCM_FIXED_IV_LEN {
            return Err(RecordError::CryptoAdapterFailure(
                "AES-GCM salt must be 4 bytes",
            ));
        }
        // Reject broken key material at install time, not per record.
        UnboundKey::new(algorithm, key)
            .map_err(|_| RecordError::CryptoAdapterFailure("backend rejected AES-GCM key"))?;

        let mut iv = [0u8; GCM_FIXED_IV_LEN];
        iv.copy_from_slice(fixed_iv);
        Ok(Self {
            key: key.to_vec(),
            fixed_iv: iv,
            algorithm,
        })
    }

    fn nonce_for(&self, explicit: &[u8; GCM_EXPLICIT_NONCE_LEN]) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        nonce[..GCM_FIXED_IV_LEN].copy_from_slice(&self.fixed_iv);
        nonce[GCM_FIXED_IV_LEN..].copy_from_slice(explicit);
        nonce
    }

    pub fn encrypt(&self, mut comp: CompressedText) -> RecordResult<CipherText> {
        let explicit = comp.number.wire_sequence().to_be_bytes();
        let aad = comp.additional_data();
        let nonce = self.nonce_for(&explicit);

        let unbound = UnboundKey::new(self.algorithm, &self.key)
            .map_err(|_| RecordError::CryptoAdapterFailure("backend rejected AES-GCM key"))?;
        let mut sealing = SealingKey::new(unbound, RecordNonce::new(nonce));

        let mut in_out = std::mem::take(&mut comp.payload);
        sealing
            .seal_in_place_append_tag(Aad::from(&aad), &mut in_out)
            .map_err(|_| RecordError::CryptoAdapterFailure("AES-GCM seal failed"))?;

        let mut payload = Vec::with_capacity(GCM_EXPLICIT_NONCE_LEN + in_out.len());
        payload.extend_from_slice(&explicit);
        payload.extend_from_slice(&in_out);
        Ok(CipherText::sealed(&comp, payload))
    }

    pub fn decrypt(&self, mut cipher: CipherText) -> RecordResult<CompressedText> {
        let data = std::mem::take(&mut cipher.payload);
        if data.len() < GCM_EXPLICIT_NONCE_LEN + GCM_TAG_LEN {
            return Err(RecordError::BadRecordMac);
        }

        let mut explicit = [0u8; GCM_EXPLICIT_NONCE_LEN];
        explicit.copy_from_slice(&data[..GCM_EXPLICIT_NONCE_LEN]);
        let nonce = self.nonce_for(&explicit);

        // AAD length is the plaintext length, without nonce or tag.
        let plaintext_len = data.len() - GCM_EXPLICIT_NONCE_LEN - GCM_TAG_LEN;
        let aad = pseudo_header(
            cipher.number,
            cipher.content_type,
            cipher.version,
            plaintext_len,
        );

        let unbound = UnboundKey::new(self.algorithm, &self.key)
            .map_err(|_| RecordError::CryptoAdapterFailure("backend rejected AES-GCM key"))?;
        let mut opening = OpeningKey::new(unbound, RecordNonce::new(nonce));

        let mut in_out = data[GCM_EXPLICIT_NONCE_LEN..].to_vec();
        let plaintext = opening
            .open_in_place(Aad::from(&aad), &mut in_out)
            .map_err(|_| RecordError::BadRecordMac)?;

        Ok(CompressedText::new(
            cipher.content_type,
            cipher.version,
            cipher.number,
            plaintext.to_vec(),
        ))
    }

    /// Per-record ciphertext growth: explicit nonce + tag.
    pub fn expansion(&self) -> usize {
        GCM_EXPLICIT_NONCE_LEN + GCM_TAG_LEN
    }
}

impl Drop for GcmSuite {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// One-shot nonce sequence for ring's BoundKey API.
///
/// Record nonces are constructed per record from the sequence number, so the
/// sequence yields its nonce exactly once and fails afterwards.
struct RecordNonce {
    nonce: Option<[u8; 12]>,
}

impl RecordNonce {
    fn new(nonce: [u8; 12]) -> Self {
        Self { nonce: Some(nonce) }
    }
}

impl NonceSequence for RecordNonce {
    fn advance(&mut self) -> Result<Nonce, Unspecified> {
        let bytes = self.nonce.take().ok_or(Unspecified)?;
        Nonce::try_assume_unique_for_key(&bytes)
    }
}
