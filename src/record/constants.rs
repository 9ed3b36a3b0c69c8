// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record layer wire constants (RFC 5246 Section 6.2, RFC 6347 Section 4.1)
//!
//! All record-layer magic numbers live here so the framer, the envelopes and
//! the validators agree on one set of definitions.

/// TLS record header: `type(1) | version(2) | length(2)`.
pub const TLS_HEADER_LEN: usize = 5;

/// DTLS record header: `type(1) | version(2) | epoch(2) | seq(6) | length(2)`.
pub const DTLS_HEADER_LEN: usize = 13;

/// Maximum plaintext fragment length (2^14).
pub const MAX_PLAINTEXT_LEN: usize = 16384;

/// Maximum ciphertext fragment length (2^14 + 2048).
pub const MAX_CIPHERTEXT_LEN: usize = 18432;

/// Default record-size-limit extension value when none was negotiated.
pub const DEFAULT_RECORD_SIZE_LIMIT: usize = MAX_PLAINTEXT_LEN;

/// AEAD additional-data length: `seq(8) | type(1) | version(2) | length(2)`.
pub const AEAD_AAD_LEN: usize = 13;

/// AES-GCM implicit nonce part (salt) carried in the security parameters.
pub const GCM_FIXED_IV_LEN: usize = 4;

/// AES-GCM explicit nonce part carried in every record.
pub const GCM_EXPLICIT_NONCE_LEN: usize = 8;

/// AES-GCM authentication tag length.
pub const GCM_TAG_LEN: usize = 16;

/// AES block size (CBC explicit IV and padding unit).
pub const CBC_BLOCK_LEN: usize = 16;

/// Explicit per-record IV prepended to every CBC ciphertext.
pub const CBC_EXPLICIT_IV_LEN: usize = 16;

/// Largest DTLS explicit sequence number (48-bit wire field).
pub const DTLS_MAX_SEQUENCE: u64 = (1 << 48) - 1;

/// Handshake message type `client_hello`.
pub const HANDSHAKE_CLIENT_HELLO: u8 = 1;
/// Handshake message type `server_hello`.
pub const HANDSHAKE_SERVER_HELLO: u8 = 2;
/// Handshake message type `hello_verify_request` (DTLS only).
pub const HANDSHAKE_HELLO_VERIFY_REQUEST: u8 = 3;

/// The single legal ChangeCipherSpec payload.
pub const CHANGE_CIPHER_SPEC_BODY: u8 = 0x01;

/// Record content types (RFC 5246 Section 6.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    /// Decode a wire byte; `None` for content types the record layer rejects.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(Self::ChangeCipherSpec),
            21 => Some(Self::Alert),
            22 => Some(Self::Handshake),
            23 => Some(Self::ApplicationData),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Protocol version as carried on the wire (`major.minor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    /// TLS 1.2 = {3, 3}.
    pub const TLS1_2: Self = Self { major: 3, minor: 3 };

    /// DTLS 1.2 = {254, 253} (0xFEFD, one's-complement encoding).
    pub const DTLS1_2: Self = Self {
        major: 254,
        minor: 253,
    };

    pub fn to_bytes(self) -> [u8; 2] {
        [self.major, self.minor]
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            major: bytes[0],
            minor: bytes[1],
        }
    }
}

/// Stream (TLS) vs datagram (DTLS) record layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tls,
    Dtls,
}

impl Mode {
    /// Record header size for this mode.
    pub fn header_len(self) -> usize {
        match self {
            Self::Tls => TLS_HEADER_LEN,
            Self::Dtls => DTLS_HEADER_LEN,
        }
    }

    /// Negotiated wire version for this mode.
    pub fn version(self) -> ProtocolVersion {
        match self {
            Self::Tls => ProtocolVersion::TLS1_2,
            Self::Dtls => ProtocolVersion::DTLS1_2,
        }
    }
}

/// Which end of the connection this endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    Client,
    Server,
}
