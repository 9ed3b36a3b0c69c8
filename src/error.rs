// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record protocol error types

use std::fmt;

/// Result type for record protocol operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors surfaced by the record protocol core.
///
/// Silent protocol events (DTLS replays, stale epochs, version mismatches on
/// non-hello records) are *not* errors: they are dropped internally and show
/// up only in the metrics counters. An `Err` from a public method means the
/// caller did something wrong (`InvalidArgument`, `InternalError`) or the
/// connection hit a terminal condition (`SequenceExhausted`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Call not permitted in the current state, or bad input.
    InvalidArgument(&'static str),

    /// Local misconfiguration (e.g. MTU smaller than the record expansion).
    InternalError(&'static str),

    /// The crypto backend rejected key or IV material.
    CryptoAdapterFailure(&'static str),

    /// MAC or AEAD tag verification failed on a received record.
    BadRecordMac,

    /// Record exceeds the maximum ciphertext or plaintext size.
    RecordOverflow,

    /// Content type not legal for the current connection state.
    UnexpectedMessage(&'static str),

    /// Wire bytes that can never form a valid record.
    Malformed(&'static str),

    /// Sequence number space exhausted; the connection is disconnected.
    SequenceExhausted,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Self::InternalError(msg) => write!(f, "internal error: {}", msg),
            Self::CryptoAdapterFailure(msg) => write!(f, "crypto adapter failure: {}", msg),
            Self::BadRecordMac => write!(f, "record MAC verification failed"),
            Self::RecordOverflow => write!(f, "record exceeds maximum size"),
            Self::UnexpectedMessage(msg) => write!(f, "unexpected message: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed record: {}", msg),
            Self::SequenceExhausted => write!(f, "sequence number space exhausted"),
        }
    }
}

impl std::error::Error for RecordError {}
