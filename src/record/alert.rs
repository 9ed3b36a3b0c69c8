// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TLS alert protocol values (RFC 5246 Section 7.2)
//!
//! The record core both emits alerts (fatal data-path failures) and routes
//! received alert records to the handshake layer. Only the registry entries
//! the core itself produces or inspects are enumerated.

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

impl AlertLevel {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Warning),
            2 => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Alert description codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    RecordOverflow = 22,
    DecompressionFailure = 30,
    HandshakeFailure = 40,
    IllegalParameter = 47,
    ProtocolVersion = 70,
    InternalError = 80,
}

impl AlertDescription {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::CloseNotify),
            10 => Some(Self::UnexpectedMessage),
            20 => Some(Self::BadRecordMac),
            22 => Some(Self::RecordOverflow),
            30 => Some(Self::DecompressionFailure),
            40 => Some(Self::HandshakeFailure),
            47 => Some(Self::IllegalParameter),
            70 => Some(Self::ProtocolVersion),
            80 => Some(Self::InternalError),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Build the 2-byte alert record body.
pub fn encode_alert(level: AlertLevel, description: AlertDescription) -> [u8; 2] {
    [level.as_u8(), description.as_u8()]
}

/// Split an alert body into `(level, description)` if well formed.
pub fn parse_alert(body: &[u8]) -> Option<(AlertLevel, AlertDescription)> {
    if body.len() != 2 {
        return None;
    }
    Some((
        AlertLevel::from_u8(body[0])?,
        AlertDescription::from_u8(body[1])?,
    ))
}
