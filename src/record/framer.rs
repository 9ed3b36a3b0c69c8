// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Incoming record framer
//!
//! Append-only byte accumulator that yields one complete record at a time by
//! inspecting the length field in the record header. Stream transports may
//! deliver half a record or three and a half records per read; the framer
//! retains partial data across calls.

use crate::error::{RecordError, RecordResult};
use crate::record::constants::{Mode, MAX_CIPHERTEXT_LEN};

/// Hard bound on a declared fragment length before we refuse to accumulate.
///
/// Oversized-but-parseable records (up to this bound) are still delivered so
/// the validator can answer them with a `record_overflow` alert; beyond it the
/// peer is feeding us garbage and no forward progress is possible.
const MAX_DECLARED_LEN: usize = 2 * MAX_CIPHERTEXT_LEN;

/// Accumulates transport bytes and produces complete raw records.
#[derive(Debug)]
pub struct RecordFramer {
    mode: Mode,
    buf: Vec<u8>,
}

impl RecordFramer {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            buf: Vec::new(),
        }
    }

    /// Append bytes received from the transport.
    pub fn add_data(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete record (header + fragment), if buffered.
    ///
    /// Consumes exactly `header_len + declared_length` bytes on success.
    /// Returns `Ok(None)` while the buffer holds only a partial record.
    pub fn next_record(&mut self) -> RecordResult<Option<Vec<u8>>> {
        let header_len = self.mode.header_len();
        if self.buf.len() < header_len {
            return Ok(None);
        }

        // Length field sits at the last two header bytes in both modes:
        // TLS bytes 3..5, DTLS bytes 11..13, big-endian.
        let declared =
            usize::from(u16::from_be_bytes([self.buf[header_len - 2], self.buf[header_len - 1]]));
        if declared > MAX_DECLARED_LEN {
            log::warn!(
                "[RECORD] framer: declared fragment length {} exceeds accumulation bound {}",
                declared,
                MAX_DECLARED_LEN
            );
            return Err(RecordError::Malformed("declared record length out of range"));
        }

        let total = header_len + declared;
        if self.buf.len() < total {
            return Ok(None);
        }

        let record = self.buf[..total].to_vec();
        self.buf.drain(..total);
        Ok(Some(record))
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Discard all buffered bytes (connection reset).
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls_record(len: usize) -> Vec<u8> {
        let mut rec = vec![22, 3, 3];
        rec.extend_from_slice(&(len as u16).to_be_bytes());
        rec.extend(std::iter::repeat(0xAB).take(len));
        rec
    }

    #[test]
    fn test_partial_then_complete() {
        let mut framer = RecordFramer::new(Mode::Tls);
        let rec = tls_record(10);

        framer.add_data(&rec[..7]);
        assert_eq!(framer.next_record().unwrap(), None);

        framer.add_data(&rec[7..]);
        assert_eq!(framer.next_record().unwrap().unwrap(), rec);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_multiple_records_in_one_read() {
        let mut framer = RecordFramer::new(Mode::Tls);
        let a = tls_record(3);
        let b = tls_record(5);
        let mut both = a.clone();
        both.extend_from_slice(&b);
        both.extend_from_slice(&b[..4]); // Trailing partial

        framer.add_data(&both);
        assert_eq!(framer.next_record().unwrap().unwrap(), a);
        assert_eq!(framer.next_record().unwrap().unwrap(), b);
        assert_eq!(framer.next_record().unwrap(), None);
        assert_eq!(framer.buffered(), 4);
    }

    #[test]
    fn test_dtls_header_size() {
        let mut framer = RecordFramer::new(Mode::Dtls);
        let mut rec = vec![22, 0xFE, 0xFD]; // type + version
        rec.extend_from_slice(&1u16.to_be_bytes()); // epoch
        rec.extend_from_slice(&[0, 0, 0, 0, 0, 7]); // 48-bit seq
        rec.extend_from_slice(&2u16.to_be_bytes()); // length
        rec.extend_from_slice(&[0xCA, 0xFE]);

        framer.add_data(&rec[..12]);
        assert_eq!(framer.next_record().unwrap(), None);
        framer.add_data(&rec[12..]);
        assert_eq!(framer.next_record().unwrap().unwrap(), rec);
    }

    #[test]
    fn test_oversized_record_still_delivered() {
        // 18433 bytes is above the ciphertext cap but must reach the
        // validator so it can emit record_overflow.
        let mut framer = RecordFramer::new(Mode::Tls);
        let rec = tls_record(MAX_CIPHERTEXT_LEN + 1);
        framer.add_data(&rec);
        assert_eq!(framer.next_record().unwrap().unwrap().len(), rec.len());
    }

    #[test]
    fn test_garbage_length_is_malformed() {
        let mut framer = RecordFramer::new(Mode::Tls);
        let mut rec = vec![22, 3, 3];
        rec.extend_from_slice(&u16::MAX.to_be_bytes());
        framer.add_data(&rec);
        assert_eq!(
            framer.next_record(),
            Err(RecordError::Malformed("declared record length out of range"))
        );
    }

    #[test]
    fn test_clear() {
        let mut framer = RecordFramer::new(Mode::Tls);
        framer.add_data(&[22, 3, 3]);
        framer.clear();
        assert_eq!(framer.buffered(), 0);
    }
}
