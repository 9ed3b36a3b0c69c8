// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed record envelopes
//!
//! `PlainText` -> `CompressedText` -> `CipherText` carry one record's payload
//! through the send pipeline (and back on receive). Payload ownership moves
//! stage to stage; nothing is shared or copied. Each envelope binds the
//! metadata needed downstream: content type, wire version, and the record
//! number (TLS implicit sequence, or DTLS epoch + explicit sequence).
//!
//! # Wire Format (CipherText)
//!
//! ```text
//! TLS:   type(1) | version(2) | length(2) | fragment
//! DTLS:  type(1) | version(2) | epoch(2) | seq(6) | length(2) | fragment
//! ```

use crate::error::{RecordError, RecordResult};
use crate::record::constants::{
    ContentType, Mode, ProtocolVersion, AEAD_AAD_LEN, DTLS_HEADER_LEN, TLS_HEADER_LEN,
};

/// Sequence metadata bound to one record.
///
/// TLS counts records implicitly on both sides; DTLS carries the epoch and a
/// 48-bit explicit sequence number in every record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordNumber {
    Tls { seq: u64 },
    Dtls { epoch: u16, seq: u64 },
}

impl RecordNumber {
    /// The 64-bit sequence value folded into MAC input, AEAD nonce and
    /// additional data: the implicit counter for TLS, `epoch || seq` for DTLS.
    pub fn wire_sequence(self) -> u64 {
        match self {
            Self::Tls { seq } => seq,
            Self::Dtls { epoch, seq } => (u64::from(epoch) << 48) | (seq & ((1 << 48) - 1)),
        }
    }

    /// DTLS epoch; 0 in TLS mode.
    pub fn epoch(self) -> u16 {
        match self {
            Self::Tls { .. } => 0,
            Self::Dtls { epoch, .. } => epoch,
        }
    }

    /// Explicit (DTLS) or implicit (TLS) sequence number without the epoch.
    pub fn sequence(self) -> u64 {
        match self {
            Self::Tls { seq } => seq,
            Self::Dtls { seq, .. } => seq,
        }
    }
}

/// The 13-byte pseudo header `seq(8) | type(1) | version(2) | length(2)`.
///
/// Doubles as the AEAD additional data (RFC 5246 Section 6.2.3.3) and as the
/// prefix of every HMAC input, with `length` describing the authenticated
/// span (plaintext length for AEAD/MtE, composite length for EtM).
pub fn pseudo_header(
    number: RecordNumber,
    content_type: ContentType,
    version: ProtocolVersion,
    length: usize,
) -> [u8; AEAD_AAD_LEN] {
    let mut hdr = [0u8; AEAD_AAD_LEN];
    hdr[0..8].copy_from_slice(&number.wire_sequence().to_be_bytes());
    hdr[8] = content_type.as_u8();
    hdr[9..11].copy_from_slice(&version.to_bytes());
    hdr[11..13].copy_from_slice(&(length as u16).to_be_bytes());
    hdr
}

/// HMAC input: pseudo header followed by the authenticated bytes.
pub fn mac_input(
    number: RecordNumber,
    content_type: ContentType,
    version: ProtocolVersion,
    data: &[u8],
) -> Vec<u8> {
    let hdr = pseudo_header(number, content_type, version, data.len());
    let mut input = Vec::with_capacity(hdr.len() + data.len());
    input.extend_from_slice(&hdr);
    input.extend_from_slice(data);
    input
}

macro_rules! envelope {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub content_type: ContentType,
            pub version: ProtocolVersion,
            pub number: RecordNumber,
            pub payload: Vec<u8>,
        }

        impl $name {
            pub fn new(
                content_type: ContentType,
                version: ProtocolVersion,
                number: RecordNumber,
                payload: Vec<u8>,
            ) -> Self {
                Self { content_type, version, number, payload }
            }

            /// AEAD additional data for this record's payload length.
            pub fn additional_data(&self) -> [u8; AEAD_AAD_LEN] {
                pseudo_header(self.number, self.content_type, self.version, self.payload.len())
            }

            /// HMAC input over this record's own payload.
            pub fn mac_input(&self) -> Vec<u8> {
                mac_input(self.number, self.content_type, self.version, &self.payload)
            }
        }
    };
}

envelope! {
    /// Application-visible record content before compression.
    PlainText
}
envelope! {
    /// Record content after (null) compression, input to bulk encryption.
    CompressedText
}
envelope! {
    /// Encrypted record fragment as carried on the wire.
    CipherText
}

impl CompressedText {
    /// Take over a sibling's payload without copying.
    pub fn from_plain(pt: PlainText) -> Self {
        Self::new(pt.content_type, pt.version, pt.number, pt.payload)
    }
}

impl PlainText {
    pub fn from_compressed(ct: CompressedText) -> Self {
        Self::new(ct.content_type, ct.version, ct.number, ct.payload)
    }
}

impl CipherText {
    /// Wrap the output of a bulk cipher, inheriting the source metadata.
    pub fn sealed(src: &CompressedText, ciphertext: Vec<u8>) -> Self {
        Self::new(src.content_type, src.version, src.number, ciphertext)
    }

    /// Serialize to the wire: header followed by the fragment.
    pub fn serialize(&self) -> RecordResult<Vec<u8>> {
        if self.payload.len() > usize::from(u16::MAX) {
            return Err(RecordError::InternalError("fragment exceeds length field"));
        }
        let header_len = match self.number {
            RecordNumber::Tls { .. } => TLS_HEADER_LEN,
            RecordNumber::Dtls { .. } => DTLS_HEADER_LEN,
        };
        let mut out = Vec::with_capacity(header_len + self.payload.len());
        out.push(self.content_type.as_u8());
        out.extend_from_slice(&self.version.to_bytes());
        if let RecordNumber::Dtls { epoch, seq } = self.number {
            out.extend_from_slice(&epoch.to_be_bytes());
            out.extend_from_slice(&seq.to_be_bytes()[2..8]); // 48-bit
        }
        out.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Parse a complete raw record produced by the framer.
    ///
    /// `implicit_seq` supplies the TLS read counter; DTLS records carry their
    /// number in the header.
    pub fn deserialize(mode: Mode, raw: &[u8], implicit_seq: u64) -> RecordResult<Self> {
        let header_len = mode.header_len();
        if raw.len() < header_len {
            return Err(RecordError::Malformed("record shorter than header"));
        }
        let content_type = ContentType::from_u8(raw[0])
            .ok_or(RecordError::UnexpectedMessage("unknown content type"))?;
        let version = ProtocolVersion::from_bytes([raw[1], raw[2]]);

        let number = match mode {
            Mode::Tls => RecordNumber::Tls { seq: implicit_seq },
            Mode::Dtls => {
                let epoch = u16::from_be_bytes([raw[3], raw[4]]);
                let mut seq_bytes = [0u8; 8];
                seq_bytes[2..8].copy_from_slice(&raw[5..11]);
                RecordNumber::Dtls {
                    epoch,
                    seq: u64::from_be_bytes(seq_bytes),
                }
            }
        };

        let declared =
            usize::from(u16::from_be_bytes([raw[header_len - 2], raw[header_len - 1]]));
        if raw.len() != header_len + declared {
            return Err(RecordError::Malformed("length field disagrees with record"));
        }

        Ok(Self::new(
            content_type,
            version,
            number,
            raw[header_len..].to_vec(),
        ))
    }
}
