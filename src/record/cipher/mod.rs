// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bulk encryption suites
//!
//! One tagged variant per negotiable bulk protection: no encryption at all
//! (pre-handshake), HMAC only, AES-CBC with HMAC, AES-GCM. Dispatch is a
//! plain `match`; all cipher state lives inline in the variant.
//!
//! A `BulkCipher` is instantiated per direction from the installed
//! [`SecurityParameters`] and replaced wholesale on every ChangeCipherSpec.

mod cbc_hmac;
mod gcm;
mod mac;

pub use cbc_hmac::CbcHmacSuite;
pub use gcm::GcmSuite;
pub use mac::MacSuite;

use crate::error::{RecordError, RecordResult};
use crate::record::security_params::{
    CipherAlgorithm, DirectionKeys, MacAlgorithm, SecurityParameters,
};
use crate::record::text::{mac_input, CipherText, CompressedText};

/// Bulk protection for one direction of one epoch.
pub enum BulkCipher {
    /// Identity transform; zero expansion.
    NullNull,
    /// Authentication only: `payload || mac`.
    NullMac(MacSuite),
    /// AES-CBC with HMAC, MtE or EtM per the security parameters.
    AesCbcMac(CbcHmacSuite),
    /// AES-GCM AEAD.
    AesGcm(GcmSuite),
}

impl BulkCipher {
    /// The pre-handshake null cipher.
    pub fn null() -> Self {
        Self::NullNull
    }

    /// Build the encryptor for records this endpoint sends.
    pub fn for_write(sp: &SecurityParameters) -> RecordResult<Self> {
        Self::from_keys(sp, sp.write_keys())
    }

    /// Build the decryptor for records this endpoint receives.
    pub fn for_read(sp: &SecurityParameters) -> RecordResult<Self> {
        Self::from_keys(sp, sp.read_keys())
    }

    fn from_keys(sp: &SecurityParameters, keys: DirectionKeys<'_>) -> RecordResult<Self> {
        match (sp.cipher, sp.mac) {
            (CipherAlgorithm::Null, MacAlgorithm::Null) => Ok(Self::NullNull),
            (CipherAlgorithm::Null, mac) => Ok(Self::NullMac(MacSuite::new(mac, keys.mac_key)?)),
            (CipherAlgorithm::Aes128Cbc | CipherAlgorithm::Aes256Cbc, MacAlgorithm::Null) => Err(
                RecordError::CryptoAdapterFailure("CBC suite requires a MAC algorithm"),
            ),
            (CipherAlgorithm::Aes128Cbc | CipherAlgorithm::Aes256Cbc, mac) => {
                Ok(Self::AesCbcMac(CbcHmacSuite::new(
                    keys.key,
                    mac,
                    keys.mac_key,
                    sp.encrypt_then_mac,
                )?))
            }
            (CipherAlgorithm::Aes128Gcm | CipherAlgorithm::Aes256Gcm, _) => {
                Ok(Self::AesGcm(GcmSuite::new(keys.key, keys.iv)?))
            }
        }
    }

    /// Protect one outgoing record.
    pub fn encrypt(&self, comp: CompressedText) -> RecordResult<CipherText> {
        match self {
            Self::NullNull => {
                let mut comp = comp;
                let payload = std::mem::take(&mut comp.payload);
                Ok(CipherText::sealed(&comp, payload))
            }
            Self::NullMac(mac) => {
                let tag = mac.sign(&comp.mac_input());
                let mut comp = comp;
                let mut payload = std::mem::take(&mut comp.payload);
                payload.extend_from_slice(&tag);
                Ok(CipherText::sealed(&comp, payload))
            }
            Self::AesCbcMac(suite) => suite.encrypt(comp),
            Self::AesGcm(suite) => suite.encrypt(comp),
        }
    }

    /// Verify and unprotect one incoming record.
    pub fn decrypt(&self, cipher: CipherText) -> RecordResult<CompressedText> {
        match self {
            Self::NullNull => {
                let mut cipher = cipher;
                let payload = std::mem::take(&mut cipher.payload);
                Ok(CompressedText::new(
                    cipher.content_type,
                    cipher.version,
                    cipher.number,
                    payload,
                ))
            }
            Self::NullMac(mac) => {
                let mut cipher = cipher;
                let mut payload = std::mem::take(&mut cipher.payload);
                if payload.len() < mac.tag_len() {
                    return Err(RecordError::BadRecordMac);
                }
                let tag_at = payload.len() - mac.tag_len();
                let input = mac_input(
                    cipher.number,
                    cipher.content_type,
                    cipher.version,
                    &payload[..tag_at],
                );
                mac.verify(&input, &payload[tag_at..])?;
                payload.truncate(tag_at);
                Ok(CompressedText::new(
                    cipher.content_type,
                    cipher.version,
                    cipher.number,
                    payload,
                ))
            }
            Self::AesCbcMac(suite) => suite.decrypt(cipher),
            Self::AesGcm(suite) => suite.decrypt(cipher),
        }
    }

    /// Per-record ciphertext growth, excluding the record header.
    pub fn expansion(&self) -> usize {
        match self {
            Self::NullNull => 0,
            Self::NullMac(mac) => mac.tag_len(),
            Self::AesCbcMac(suite) => suite.expansion(),
            Self::AesGcm(suite) => suite.expansion(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::NullNull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::constants::{ConnectionEnd, ContentType, ProtocolVersion};
    use crate::record::text::RecordNumber;

    fn comp(payload: &[u8]) -> CompressedText {
        CompressedText::new(
            ContentType::Handshake,
            ProtocolVersion::TLS1_2,
            RecordNumber::Tls { seq: 11 },
            payload.to_vec(),
        )
    }

    fn gcm_params(entity: ConnectionEnd) -> SecurityParameters {
        let mut sp = SecurityParameters::null(entity);
        sp.cipher = CipherAlgorithm::Aes128Gcm;
        sp.client_write_key = vec![0xC1; 16];
        sp.server_write_key = vec![0x51; 16];
        sp.client_write_iv = vec![0xC2; 4];
        sp.server_write_iv = vec![0x52; 4];
        sp.fixed_iv_len = 4;
        sp.record_iv_len = 8;
        sp
    }

    #[test]
    fn test_null_null_identity() {
        let cipher = BulkCipher::null();
        let sealed = cipher.encrypt(comp(b"as-is")).unwrap();
        assert_eq!(sealed.payload, b"as-is");
        let opened = cipher.decrypt(sealed).unwrap();
        assert_eq!(opened.payload, b"as-is");
        assert_eq!(cipher.expansion(), 0);
    }

    #[test]
    fn test_null_mac_appends_and_strips_tag() {
        let mut sp = SecurityParameters::null(ConnectionEnd::Client);
        sp.mac = MacAlgorithm::HmacSha256;
        sp.client_mac_key = vec![0xAA; 32];
        sp.server_mac_key = vec![0xBB; 32];

        let writer = BulkCipher::for_write(&sp).unwrap();
        let sealed = writer.encrypt(comp(b"verify me")).unwrap();
        assert_eq!(sealed.payload.len(), 9 + 32);

        // The server reads with the client's MAC key.
        let mut peer = gcm_params(ConnectionEnd::Server);
        peer.cipher = CipherAlgorithm::Null;
        peer.mac = MacAlgorithm::HmacSha256;
        peer.client_mac_key = vec![0xAA; 32];
        peer.server_mac_key = vec![0xBB; 32];
        let reader = BulkCipher::for_read(&peer).unwrap();
        let opened = reader.decrypt(sealed).unwrap();
        assert_eq!(opened.payload, b"verify me");
    }

    #[test]
    fn test_write_and_read_sides_pair_up_for_gcm() {
        let client = BulkCipher::for_write(&gcm_params(ConnectionEnd::Client)).unwrap();
        let server = BulkCipher::for_read(&gcm_params(ConnectionEnd::Server)).unwrap();

        let sealed = client.encrypt(comp(b"cross check")).unwrap();
        let opened = server.decrypt(sealed).unwrap();
        assert_eq!(opened.payload, b"cross check");
    }

    #[test]
    fn test_cbc_without_mac_is_rejected() {
        let mut sp = gcm_params(ConnectionEnd::Client);
        sp.cipher = CipherAlgorithm::Aes128Cbc;
        sp.mac = MacAlgorithm::Null;
        assert!(BulkCipher::for_write(&sp).is_err());
    }

    #[test]
    fn test_null_mac_rejects_truncated_record() {
        let mut sp = SecurityParameters::null(ConnectionEnd::Client);
        sp.mac = MacAlgorithm::HmacSha256;
        sp.client_mac_key = vec![0xAA; 32];
        sp.server_mac_key = vec![0xBB; 32];
        let cipher = BulkCipher::for_read(&sp).unwrap();

        let short = CipherText::new(
            ContentType::Handshake,
            ProtocolVersion::TLS1_2,
            RecordNumber::Tls { seq: 0 },
            vec![0; 8],
        );
        assert_eq!(cipher.decrypt(short), Err(RecordError::BadRecordMac));
    }
}
