// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HMAC primitive for the MAC-carrying suites (ring backend).

use ring::hmac;

use crate::error::{RecordError, RecordResult};
use crate::record::security_params::MacAlgorithm;

/// A keyed HMAC context for one direction.
pub struct MacSuite {
    algorithm: MacAlgorithm,
    key: hmac::Key,
}

impl MacSuite {
    /// Build a context from the direction's MAC key.
    ///
    /// TLS MAC keys are exactly as long as the hash output; anything else is
    /// a key-derivation bug upstream.
    pub fn new(algorithm: MacAlgorithm, key_bytes: &[u8]) -> RecordResult<Self> {
        let ring_alg = match algorithm {
            MacAlgorithm::HmacSha256 => hmac::HMAC_SHA256,
            MacAlgorithm::HmacSha384 => hmac::HMAC_SHA384,
            MacAlgorithm::Null => {
                return Err(RecordError::CryptoAdapterFailure(
                    "null MAC algorithm has no context",
                ))
            }
        };
        if key_bytes.len() != algorithm.key_len() {
            return Err(RecordError::CryptoAdapterFailure("MAC key length mismatch"));
        }
        Ok(Self {
            algorithm,
            key: hmac::Key::new(ring_alg, key_bytes),
        })
    }

    pub fn tag_len(&self) -> usize {
        self.algorithm.tag_len()
    }

    /// Compute the tag over `input`.
    pub fn sign(&self, input: &[u8]) -> Vec<u8> {
        hmac::sign(&self.key, input).as_ref().to_vec()
    }

    /// Constant-time verification; failure is always `BadRecordMac`.
    pub fn verify(&self, input: &[u8], tag: &[u8]) -> RecordResult<()> {
        hmac::verify(&self.key, input, tag).map_err(|_| RecordError::BadRecordMac)
    }
}
