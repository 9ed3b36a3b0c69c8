// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record compression seam
//!
//! TLS 1.2 deployments run the null method exclusively (CRIME killed the
//! rest), but the stage stays in the pipeline so the record-size arithmetic
//! is uniform and a future method slots in without touching the protocol.

use crate::error::RecordResult;
use crate::record::text::{CompressedText, PlainText};

/// Compression method applied between fragmentation and bulk encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionSuite {
    #[default]
    Null,
}

impl CompressionSuite {
    /// Identity move on the send path.
    pub fn compress(&self, pt: PlainText) -> RecordResult<CompressedText> {
        match self {
            Self::Null => Ok(CompressedText::from_plain(pt)),
        }
    }

    /// Identity move on the receive path.
    pub fn decompress(&self, comp: CompressedText) -> RecordResult<PlainText> {
        match self {
            Self::Null => Ok(PlainText::from_compressed(comp)),
        }
    }

    /// Worst-case growth a compressed fragment can exhibit.
    pub fn expansion(&self) -> usize {
        match self {
            Self::Null => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::constants::{ContentType, ProtocolVersion};
    use crate::record::text::RecordNumber;

    #[test]
    fn test_null_compression_is_involution() {
        let suite = CompressionSuite::Null;
        let pt = PlainText::new(
            ContentType::ApplicationData,
            ProtocolVersion::TLS1_2,
            RecordNumber::Tls { seq: 3 },
            vec![9, 8, 7],
        );
        let original = pt.clone();

        let comp = suite.compress(pt).unwrap();
        assert_eq!(comp.payload, original.payload);

        let back = suite.decompress(comp).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_null_expansion_is_zero() {
        assert_eq!(CompressionSuite::Null.expansion(), 0);
    }
}
