// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outgoing payload fragmentation
//!
//! Splits an application buffer into plaintext fragments that, once
//! encrypted and framed, still fit under the transport MTU and the
//! negotiated record size limit.

use crate::error::{RecordError, RecordResult};
use crate::record::constants::{ContentType, MAX_PLAINTEXT_LEN};

/// Compute the plaintext fragment size for the current write parameters.
///
/// `expansion` is the per-record ciphertext growth (explicit IV/nonce + tag +
/// worst-case padding), excluding the `header_len`-byte record header. The
/// result is capped by the peer's record-size-limit and the protocol maximum.
pub fn compute_fragment_size(
    mtu: usize,
    header_len: usize,
    expansion: usize,
    record_size_limit: usize,
) -> RecordResult<usize> {
    let usable = mtu
        .checked_sub(header_len + expansion)
        .filter(|&n| n > 0)
        .ok_or(RecordError::InternalError(
            "MTU leaves no room for record payload",
        ))?;
    Ok(usable.min(record_size_limit).min(MAX_PLAINTEXT_LEN))
}

/// Iterator over the plaintext fragments of one outgoing buffer.
///
/// A 0-byte ApplicationData send still yields exactly one empty fragment so
/// the peer observes the send; empty buffers of any other content type yield
/// nothing (the caller rejects them up front).
#[derive(Debug)]
pub struct SendFragmenter<'a> {
    src: &'a [u8],
    fragment_size: usize,
    content_type: ContentType,
    offset: usize,
    emitted_empty: bool,
}

impl<'a> SendFragmenter<'a> {
    pub fn new(src: &'a [u8], fragment_size: usize, content_type: ContentType) -> Self {
        debug_assert!(fragment_size > 0, "fragment size must be positive");
        Self {
            src,
            fragment_size,
            content_type,
            offset: 0,
            emitted_empty: false,
        }
    }
}

impl<'a> Iterator for SendFragmenter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.src.is_empty() {
            if self.content_type == ContentType::ApplicationData && !self.emitted_empty {
                self.emitted_empty = true;
                return Some(&[]);
            }
            return None;
        }
        if self.offset >= self.src.len() {
            return None;
        }
        let end = (self.offset + self.fragment_size).min(self.src.len());
        let chunk = &self.src[self.offset..end];
        self.offset = end;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_size_min_of_all_caps() {
        // MTU-bound
        assert_eq!(compute_fragment_size(100, 5, 24, 16384).unwrap(), 71);
        // Limit-bound
        assert_eq!(compute_fragment_size(65535, 5, 24, 1024).unwrap(), 1024);
        // Protocol-bound
        assert_eq!(
            compute_fragment_size(65535, 5, 24, 65535).unwrap(),
            MAX_PLAINTEXT_LEN
        );
    }

    #[test]
    fn test_mtu_smaller_than_expansion_is_internal_error() {
        assert_eq!(
            compute_fragment_size(20, 13, 24, 16384),
            Err(RecordError::InternalError(
                "MTU leaves no room for record payload"
            ))
        );
        assert!(compute_fragment_size(29, 5, 24, 16384).is_err());
        assert_eq!(compute_fragment_size(30, 5, 24, 16384).unwrap(), 1);
    }

    #[test]
    fn test_even_split() {
        let data = [0u8; 10];
        let frags: Vec<_> = SendFragmenter::new(&data, 5, ContentType::Handshake).collect();
        assert_eq!(frags.len(), 2);
        assert!(frags.iter().all(|f| f.len() == 5));
    }

    #[test]
    fn test_remainder_fragment() {
        let data = [7u8; 12];
        let frags: Vec<_> = SendFragmenter::new(&data, 5, ContentType::ApplicationData).collect();
        assert_eq!(
            frags.iter().map(|f| f.len()).collect::<Vec<_>>(),
            vec![5, 5, 2]
        );
    }

    #[test]
    fn test_empty_application_data_yields_one_empty_fragment() {
        let frags: Vec<_> = SendFragmenter::new(&[], 5, ContentType::ApplicationData).collect();
        assert_eq!(frags, vec![&[] as &[u8]]);
    }

    #[test]
    fn test_empty_handshake_yields_nothing() {
        let mut iter = SendFragmenter::new(&[], 5, ContentType::Handshake);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty() {
        let data = [1u8; 10];
        let frags: Vec<_> = SendFragmenter::new(&data, 5, ContentType::ApplicationData).collect();
        assert_eq!(frags.len(), 2);
    }
}
