// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Security parameters for one epoch
//!
//! The handshake derives key material and installs it here, once per
//! direction per ChangeCipherSpec. The record core never derives keys itself;
//! it only selects the right half of the material for its role and direction.
//! All key vectors are scrubbed on drop.

use zeroize::Zeroize;

use crate::record::constants::{
    ConnectionEnd, CBC_EXPLICIT_IV_LEN, DEFAULT_RECORD_SIZE_LIMIT, GCM_EXPLICIT_NONCE_LEN,
    GCM_FIXED_IV_LEN,
};

/// Bulk encryption algorithm of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    Null,
    Aes128Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
}

impl CipherAlgorithm {
    /// Key length in bytes; 0 for the null cipher.
    pub fn key_len(self) -> usize {
        match self {
            Self::Null => 0,
            Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::Aes256Cbc | Self::Aes256Gcm => 32,
        }
    }

    pub fn is_aead(self) -> bool {
        matches!(self, Self::Aes128Gcm | Self::Aes256Gcm)
    }
}

/// MAC algorithm of a cipher suite. AEAD suites carry `Null` here; their
/// integrity comes from the cipher itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    Null,
    HmacSha256,
    HmacSha384,
}

impl MacAlgorithm {
    /// MAC tag length in bytes.
    pub fn tag_len(self) -> usize {
        match self {
            Self::Null => 0,
            Self::HmacSha256 => 32,
            Self::HmacSha384 => 48,
        }
    }

    /// MAC key length in bytes (equal to the tag length for HMAC).
    pub fn key_len(self) -> usize {
        self.tag_len()
    }
}

/// Read- or write-side cryptographic parameters for one epoch.
///
/// Carries material for *both* roles; [`SecurityParameters::write_keys`] and
/// [`SecurityParameters::read_keys`] select by the connection end (the client
/// writes with client material, the server reads with it).
#[derive(Debug, Clone)]
pub struct SecurityParameters {
    /// Role these parameters will be used by.
    pub entity: ConnectionEnd,
    /// Negotiated cipher suite identifier (IANA registry value).
    pub cipher_suite: u16,
    pub cipher: CipherAlgorithm,
    pub mac: MacAlgorithm,

    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
    pub client_write_iv: Vec<u8>,
    pub server_write_iv: Vec<u8>,
    pub client_mac_key: Vec<u8>,
    pub server_mac_key: Vec<u8>,

    /// Implicit IV bytes (AEAD salt) per direction.
    pub fixed_iv_len: usize,
    /// Explicit per-record IV/nonce bytes.
    pub record_iv_len: usize,

    /// Plaintext cap negotiated via the record-size-limit extension.
    pub record_size_limit: usize,
    /// RFC 7366: MAC over the ciphertext instead of the plaintext.
    pub encrypt_then_mac: bool,
}

/// Per-direction view: `(cipher key, implicit IV, MAC key)`.
pub struct DirectionKeys<'a> {
    pub key: &'a [u8],
    pub iv: &'a [u8],
    pub mac_key: &'a [u8],
}

impl SecurityParameters {
    /// The null-null parameter set installed before any handshake completes.
    pub fn null(entity: ConnectionEnd) -> Self {
        Self {
            entity,
            cipher_suite: 0x0000, // TLS_NULL_WITH_NULL_NULL
            cipher: CipherAlgorithm::Null,
            mac: MacAlgorithm::Null,
            client_write_key: Vec::new(),
            server_write_key: Vec::new(),
            client_write_iv: Vec::new(),
            server_write_iv: Vec::new(),
            client_mac_key: Vec::new(),
            server_mac_key: Vec::new(),
            fixed_iv_len: 0,
            record_iv_len: 0,
            record_size_limit: DEFAULT_RECORD_SIZE_LIMIT,
            encrypt_then_mac: false,
        }
    }

    /// Material this endpoint encrypts outgoing records with.
    pub fn write_keys(&self) -> DirectionKeys<'_> {
        match self.entity {
            ConnectionEnd::Client => DirectionKeys {
                key: &self.client_write_key,
                iv: &self.client_write_iv,
                mac_key: &self.client_mac_key,
            },
            ConnectionEnd::Server => DirectionKeys {
                key: &self.server_write_key,
                iv: &self.server_write_iv,
                mac_key: &self.server_mac_key,
            },
        }
    }

    /// Material this endpoint verifies and decrypts incoming records with.
    pub fn read_keys(&self) -> DirectionKeys<'_> {
        match self.entity {
            ConnectionEnd::Client => DirectionKeys {
                key: &self.server_write_key,
                iv: &self.server_write_iv,
                mac_key: &self.server_mac_key,
            },
            ConnectionEnd::Server => DirectionKeys {
                key: &self.client_write_key,
                iv: &self.client_write_iv,
                mac_key: &self.client_mac_key,
            },
        }
    }
}

impl Drop for SecurityParameters {
    fn drop(&mut self) {
        self.client_write_key.zeroize();
        self.server_write_key.zeroize();
        self.client_write_iv.zeroize();
        self.server_write_iv.zeroize();
        self.client_mac_key.zeroize();
        self.server_mac_key.zeroize();
    }
}

/// Static description of a supported cipher suite. Only the bulk arm matters
/// to the record core; key exchange and authentication live in the handshake.
#[derive(Debug, Clone, Copy)]
pub struct CipherSuiteInfo {
    pub id: u16,
    pub name: &'static str,
    pub cipher: CipherAlgorithm,
    pub mac: MacAlgorithm,
    pub fixed_iv_len: usize,
    pub record_iv_len: usize,
}

/// Cipher suites the record core can run.
pub const CIPHER_SUITES: &[CipherSuiteInfo] = &[
    CipherSuiteInfo {
        id: 0x0000,
        name: "TLS_NULL_WITH_NULL_NULL",
        cipher: CipherAlgorithm::Null,
        mac: MacAlgorithm::Null,
        fixed_iv_len: 0,
        record_iv_len: 0,
    },
    CipherSuiteInfo {
        id: 0x003B,
        name: "TLS_RSA_WITH_NULL_SHA256",
        cipher: CipherAlgorithm::Null,
        mac: MacAlgorithm::HmacSha256,
        fixed_iv_len: 0,
        record_iv_len: 0,
    },
    CipherSuiteInfo {
        id: 0x003C,
        name: "TLS_RSA_WITH_AES_128_CBC_SHA256",
        cipher: CipherAlgorithm::Aes128Cbc,
        mac: MacAlgorithm::HmacSha256,
        fixed_iv_len: 0,
        record_iv_len: CBC_EXPLICIT_IV_LEN,
    },
    CipherSuiteInfo {
        id: 0x003D,
        name: "TLS_RSA_WITH_AES_256_CBC_SHA256",
        cipher: CipherAlgorithm::Aes256Cbc,
        mac: MacAlgorithm::HmacSha256,
        fixed_iv_len: 0,
        record_iv_len: CBC_EXPLICIT_IV_LEN,
    },
    CipherSuiteInfo {
        id: 0x009C,
        name: "TLS_RSA_WITH_AES_128_GCM_SHA256",
        cipher: CipherAlgorithm::Aes128Gcm,
        mac: MacAlgorithm::Null,
        fixed_iv_len: GCM_FIXED_IV_LEN,
        record_iv_len: GCM_EXPLICIT_NONCE_LEN,
    },
    CipherSuiteInfo {
        id: 0x009D,
        name: "TLS_RSA_WITH_AES_256_GCM_SHA384",
        cipher: CipherAlgorithm::Aes256Gcm,
        mac: MacAlgorithm::Null,
        fixed_iv_len: GCM_FIXED_IV_LEN,
        record_iv_len: GCM_EXPLICIT_NONCE_LEN,
    },
    CipherSuiteInfo {
        id: 0xC023,
        name: "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256",
        cipher: CipherAlgorithm::Aes128Cbc,
        mac: MacAlgorithm::HmacSha256,
        fixed_iv_len: 0,
        record_iv_len: CBC_EXPLICIT_IV_LEN,
    },
    CipherSuiteInfo {
        id: 0xC024,
        name: "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384",
        cipher: CipherAlgorithm::Aes256Cbc,
        mac: MacAlgorithm::HmacSha384,
        fixed_iv_len: 0,
        record_iv_len: CBC_EXPLICIT_IV_LEN,
    },
    CipherSuiteInfo {
        id: 0xC02B,
        name: "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        cipher: CipherAlgorithm::Aes128Gcm,
        mac: MacAlgorithm::Null,
        fixed_iv_len: GCM_FIXED_IV_LEN,
        record_iv_len: GCM_EXPLICIT_NONCE_LEN,
    },
    CipherSuiteInfo {
        id: 0xC02C,
        name: "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        cipher: CipherAlgorithm::Aes256Gcm,
        mac: MacAlgorithm::Null,
        fixed_iv_len: GCM_FIXED_IV_LEN,
        record_iv_len: GCM_EXPLICIT_NONCE_LEN,
    },
];

/// Look up a suite by its IANA identifier.
pub fn lookup_cipher_suite(id: u16) -> Option<&'static CipherSuiteInfo> {
    CIPHER_SUITES.iter().find(|s| s.id == id)
}
