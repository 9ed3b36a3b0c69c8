// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record validation
//!
//! Two pure passes over a record: one on the ciphertext before any key
//! material is touched (size cap, epoch, anti-replay, epoch-0 handshake
//! bypass), one on the recovered plaintext (size cap, protocol version).
//! Both take a snapshot of the protocol state so the checks cannot observe
//! half-applied mutations.

use crate::record::constants::{
    ContentType, Mode, ProtocolVersion, HANDSHAKE_CLIENT_HELLO, HANDSHAKE_HELLO_VERIFY_REQUEST,
    HANDSHAKE_SERVER_HELLO, MAX_CIPHERTEXT_LEN, MAX_PLAINTEXT_LEN,
};
use crate::record::replay::{AntiReplayWindow, ReplayCheck};
use crate::record::text::{CipherText, PlainText, RecordNumber};

/// Snapshot of the protocol state a validator run is allowed to see.
///
/// Rebuilt for every record; the validators never touch live state.
#[derive(Debug, Clone, Copy)]
pub struct RecordProtocolContext {
    pub mode: Mode,
    pub read_epoch: u16,
    pub write_epoch: u16,
    pub tls_read_seq: u64,
    pub tls_write_seq: u64,
    pub dtls_write_seq: u64,
    pub replay: AntiReplayWindow,
}

/// Verdict of the pre-decryption pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreVerdict {
    /// Decrypt with the current read parameters.
    Passed,
    /// Epoch-0 handshake record: decrypt with the null cipher.
    UseNullCipher,
    /// Epoch-0 ClientHello: decrypt with the null cipher and remember the
    /// record's explicit sequence number for HelloVerifyRequest echoing.
    ContainsClientHello,
    /// Silently discard (replay, stale epoch, too old).
    Drop,
    /// Handshake record from a previous epoch: route to the handshake layer
    /// with the retransmit flag instead of decrypting.
    Retransmit,
    /// Ciphertext over the hard cap: fatal `record_overflow`.
    Overflow,
    /// Content not acceptable in any state: fatal `unexpected_message`.
    FatalUnexpectedMessage,
}

/// Verdict of the post-decryption pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostVerdict {
    Passed,
    /// Plaintext over 2^14: fatal `record_overflow`.
    Overflow,
    /// Version mismatch on a non-hello record: silently discard.
    Drop,
}

/// Checks that run before any decryption work.
pub fn pre_validate(cipher: &CipherText, ctx: &RecordProtocolContext) -> PreVerdict {
    // 1. Ciphertext size cap.
    if cipher.payload.len() > MAX_CIPHERTEXT_LEN {
        return PreVerdict::Overflow;
    }

    // 2. Content-type legality is enforced at deserialization (unknown types
    //    never construct a CipherText); an empty handshake record is still
    //    never acceptable.
    if cipher.content_type == ContentType::Handshake && cipher.payload.is_empty() {
        return PreVerdict::FatalUnexpectedMessage;
    }

    if ctx.mode == Mode::Tls {
        return PreVerdict::Passed;
    }

    let RecordNumber::Dtls { epoch, seq } = cipher.number else {
        return PreVerdict::FatalUnexpectedMessage;
    };

    // 3. Epoch-0 handshake bypass: plaintext flight records (ClientHello
    //    and friends) are legal at any time and decrypt under null-null.
    if epoch == 0 && cipher.content_type == ContentType::Handshake {
        if cipher.payload.first() == Some(&HANDSHAKE_CLIENT_HELLO) {
            return PreVerdict::ContainsClientHello;
        }
        return PreVerdict::UseNullCipher;
    }

    // 4. Epoch check. Old-epoch handshake records are flight retransmits;
    //    everything else off-epoch is silently dropped.
    if epoch != ctx.read_epoch {
        if epoch < ctx.read_epoch && cipher.content_type == ContentType::Handshake {
            return PreVerdict::Retransmit;
        }
        log::debug!(
            "[RECORD] dropping record with epoch {} (current read epoch {})",
            epoch,
            ctx.read_epoch
        );
        return PreVerdict::Drop;
    }

    // 5. Sliding-window anti-replay positioning (tentative; the window is
    //    only advanced after MAC verification).
    match ctx.replay.check(seq) {
        ReplayCheck::Fresh => PreVerdict::Passed,
        ReplayCheck::Duplicate | ReplayCheck::Stale => {
            log::debug!("[RECORD] anti-replay drop for sequence {}", seq);
            PreVerdict::Drop
        }
    }
}

/// Checks that run on the recovered plaintext.
pub fn post_validate(pt: &PlainText, negotiated: ProtocolVersion) -> PostVerdict {
    if pt.payload.len() > MAX_PLAINTEXT_LEN {
        return PostVerdict::Overflow;
    }

    if pt.version != negotiated {
        // Hello records negotiate the version and are accepted regardless.
        let is_hello = pt.content_type == ContentType::Handshake
            && matches!(
                pt.payload.first(),
                Some(&HANDSHAKE_CLIENT_HELLO)
                    | Some(&HANDSHAKE_SERVER_HELLO)
                    | Some(&HANDSHAKE_HELLO_VERIFY_REQUEST)
            );
        if !is_hello {
            log::debug!(
                "[RECORD] dropping record with version {}.{} (negotiated {}.{})",
                pt.version.major,
                pt.version.minor,
                negotiated.major,
                negotiated.minor
            );
            return PostVerdict::Drop;
        }
    }

    PostVerdict::Passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::constants::ContentType;

    fn dtls_ctx(read_epoch: u16) -> RecordProtocolContext {
        RecordProtocolContext {
            mode: Mode::Dtls,
            read_epoch,
            write_epoch: read_epoch,
            tls_read_seq: 0,
            tls_write_seq: 0,
            dtls_write_seq: 0,
            replay: AntiReplayWindow::new(),
        }
    }

    fn dtls_record(content_type: ContentType, epoch: u16, seq: u64, payload: &[u8]) -> CipherText {
        CipherText::new(
            content_type,
            ProtocolVersion::DTLS1_2,
            RecordNumber::Dtls { epoch, seq },
            payload.to_vec(),
        )
    }

    #[test]
    fn test_oversized_ciphertext() {
        let rec = dtls_record(
            ContentType::ApplicationData,
            1,
            0,
            &vec![0; MAX_CIPHERTEXT_LEN + 1],
        );
        assert_eq!(pre_validate(&rec, &dtls_ctx(1)), PreVerdict::Overflow);
    }

    #[test]
    fn test_empty_handshake_rejected() {
        let rec = dtls_record(ContentType::Handshake, 1, 0, &[]);
        assert_eq!(
            pre_validate(&rec, &dtls_ctx(1)),
            PreVerdict::FatalUnexpectedMessage
        );
    }

    #[test]
    fn test_matching_epoch_fresh_sequence_passes() {
        let rec = dtls_record(ContentType::ApplicationData, 2, 5, b"x");
        assert_eq!(pre_validate(&rec, &dtls_ctx(2)), PreVerdict::Passed);
    }

    #[test]
    fn test_replayed_sequence_dropped() {
        let mut ctx = dtls_ctx(1);
        ctx.replay.update(5);
        let rec = dtls_record(ContentType::ApplicationData, 1, 5, b"x");
        assert_eq!(pre_validate(&rec, &ctx), PreVerdict::Drop);
    }

    #[test]
    fn test_future_epoch_dropped() {
        let rec = dtls_record(ContentType::ApplicationData, 3, 0, b"x");
        assert_eq!(pre_validate(&rec, &dtls_ctx(1)), PreVerdict::Drop);
    }

    #[test]
    fn test_old_epoch_handshake_is_retransmit() {
        let rec = dtls_record(ContentType::Handshake, 1, 9, &[20, 0, 0]);
        assert_eq!(pre_validate(&rec, &dtls_ctx(2)), PreVerdict::Retransmit);
    }

    #[test]
    fn test_old_epoch_application_data_dropped() {
        let rec = dtls_record(ContentType::ApplicationData, 1, 9, b"x");
        assert_eq!(pre_validate(&rec, &dtls_ctx(2)), PreVerdict::Drop);
    }

    #[test]
    fn test_epoch_zero_handshake_uses_null_cipher() {
        let rec = dtls_record(ContentType::Handshake, 0, 0, &[2, 0, 0]); // ServerHello
        assert_eq!(pre_validate(&rec, &dtls_ctx(1)), PreVerdict::UseNullCipher);
    }

    #[test]
    fn test_epoch_zero_client_hello_detected() {
        let rec = dtls_record(ContentType::Handshake, 0, 42, &[1, 0, 0]);
        assert_eq!(
            pre_validate(&rec, &dtls_ctx(1)),
            PreVerdict::ContainsClientHello
        );
    }

    #[test]
    fn test_tls_mode_skips_epoch_machinery() {
        let rec = CipherText::new(
            ContentType::ApplicationData,
            ProtocolVersion::TLS1_2,
            RecordNumber::Tls { seq: 1 },
            b"x".to_vec(),
        );
        let ctx = RecordProtocolContext {
            mode: Mode::Tls,
            ..dtls_ctx(0)
        };
        assert_eq!(pre_validate(&rec, &ctx), PreVerdict::Passed);
    }

    #[test]
    fn test_post_oversized_plaintext() {
        let pt = PlainText::new(
            ContentType::ApplicationData,
            ProtocolVersion::TLS1_2,
            RecordNumber::Tls { seq: 0 },
            vec![0; MAX_PLAINTEXT_LEN + 1],
        );
        assert_eq!(
            post_validate(&pt, ProtocolVersion::TLS1_2),
            PostVerdict::Overflow
        );
    }

    #[test]
    fn test_post_version_mismatch_dropped() {
        let pt = PlainText::new(
            ContentType::ApplicationData,
            ProtocolVersion { major: 3, minor: 1 },
            RecordNumber::Tls { seq: 0 },
            b"x".to_vec(),
        );
        assert_eq!(
            post_validate(&pt, ProtocolVersion::TLS1_2),
            PostVerdict::Drop
        );
    }

    #[test]
    fn test_post_hello_records_exempt_from_version_check() {
        for hello in [1u8, 2, 3] {
            let pt = PlainText::new(
                ContentType::Handshake,
                ProtocolVersion { major: 3, minor: 1 },
                RecordNumber::Tls { seq: 0 },
                vec![hello, 0, 0],
            );
            assert_eq!(
                post_validate(&pt, ProtocolVersion::TLS1_2),
                PostVerdict::Passed,
                "hello type {}",
                hello
            );
        }
    }
}
