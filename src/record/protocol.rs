// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record protocol state machine
//!
//! Owns both directions of one TLS/DTLS connection: the framer, the current
//! read/write security parameters and their instantiated bulk ciphers, the
//! epoch and sequence counters, the anti-replay window, and the two callback
//! sinks. Everything runs on one reactor thread; none of the methods are
//! re-entrant.
//!
//! # Send path
//!
//! ```text
//! buffer -> SendFragmenter -> PlainText -> compress -> encrypt
//!        -> serialize -> UserSink::on_send_to_transport
//! ```
//!
//! # Receive path
//!
//! ```text
//! bytes -> RecordFramer -> deserialize -> pre-validate -> decrypt
//!       -> decompress -> post-validate -> dispatch by content type
//! ```
//!
//! Handshake mutations (new security parameters, epoch changes) are returned
//! from the [`HandshakeSink`] callbacks as [`HandshakeEvent`]s and applied
//! after the record that produced them, never mid-record.

use crate::config::EndpointConfig;
use crate::error::{RecordError, RecordResult};
use crate::record::alert::{encode_alert, AlertDescription, AlertLevel};
use crate::record::cipher::BulkCipher;
use crate::record::compression::CompressionSuite;
use crate::record::constants::{
    ConnectionEnd, ContentType, Mode, CHANGE_CIPHER_SPEC_BODY, DEFAULT_RECORD_SIZE_LIMIT,
    DTLS_MAX_SEQUENCE,
};
use crate::record::fragmenter::{compute_fragment_size, SendFragmenter};
use crate::record::framer::RecordFramer;
use crate::record::metrics::RecordMetrics;
use crate::record::replay::{AntiReplayWindow, ReplayCheck};
use crate::record::security_params::{lookup_cipher_suite, SecurityParameters};
use crate::record::text::{CipherText, PlainText, RecordNumber};
use crate::record::validator::{
    post_validate, pre_validate, PostVerdict, PreVerdict, RecordProtocolContext,
};

/// State mutation requested by the handshake layer.
///
/// Returned from [`HandshakeSink`] callbacks and applied by the record
/// protocol between two record-handling steps; each variant also exists as a
/// public method for direct invocation outside the receive path.
#[derive(Debug, Clone)]
pub enum HandshakeEvent {
    ResetSecurityParameters,
    SetReadSecurityParameters(SecurityParameters),
    SetWriteSecurityParameters(SecurityParameters),
    IncreaseReadEpoch,
    IncreaseWriteEpoch,
    DecreaseReadEpoch,
    DecreaseWriteEpoch,
    UseMostRecentClientHelloSequenceNumber,
    CipherSuiteSelected(u16),
}

/// Callback surface toward the handshake layer.
pub trait HandshakeSink {
    /// The record layer hit a terminal condition and disconnected.
    fn close_request(&mut self);

    /// A handshake-content record arrived. `is_retransmit` marks old-epoch
    /// flight retransmissions that were not (and cannot be) decrypted.
    fn on_handshake_data(&mut self, buf: &[u8], is_retransmit: bool) -> Vec<HandshakeEvent>;

    /// An alert record arrived.
    fn on_alert_data(&mut self, buf: &[u8]) -> Vec<HandshakeEvent>;

    /// A (well-formed) ChangeCipherSpec record arrived.
    fn on_change_cipher_data(&mut self, buf: &[u8]) -> Vec<HandshakeEvent>;
}

/// Callback surface toward the transport and the application user.
pub trait UserSink {
    /// A serialized record ready for the wire.
    fn on_send_to_transport(&mut self, buf: &[u8]);

    /// Decrypted application data for the communication party.
    fn on_send_to_comm_party(&mut self, buf: &[u8]);
}

/// The record protocol core for one connection.
pub struct RecordProtocol {
    mode: Mode,
    role: ConnectionEnd,
    mtu: usize,

    open: bool,
    connected: bool,

    framer: RecordFramer,
    compression: CompressionSuite,

    read_params: Option<SecurityParameters>,
    write_params: Option<SecurityParameters>,
    read_cipher: BulkCipher,
    write_cipher: BulkCipher,

    read_epoch: u16,
    write_epoch: u16,
    tls_read_seq: u64,
    tls_write_seq: u64,
    dtls_write_seq: u64,
    replay: AntiReplayWindow,

    record_expansion: usize,
    cipher_suite: u16,

    most_recent_client_hello_seq: u64,
    use_client_hello_seq: bool,

    handshake: Box<dyn HandshakeSink>,
    user: Box<dyn UserSink>,

    metrics: RecordMetrics,
}

impl RecordProtocol {
    /// Construct an idle instance. Call [`RecordProtocol::open_for_action`]
    /// before anything else.
    pub fn new(
        config: &EndpointConfig,
        handshake: Box<dyn HandshakeSink>,
        user: Box<dyn UserSink>,
    ) -> Self {
        Self {
            mode: config.mode,
            role: config.role,
            mtu: config.mtu,
            open: false,
            connected: false,
            framer: RecordFramer::new(config.mode),
            compression: CompressionSuite::Null,
            read_params: None,
            write_params: None,
            read_cipher: BulkCipher::null(),
            write_cipher: BulkCipher::null(),
            read_epoch: 0,
            write_epoch: 0,
            tls_read_seq: 0,
            tls_write_seq: 0,
            dtls_write_seq: 0,
            replay: AntiReplayWindow::new(),
            record_expansion: 0,
            cipher_suite: 0,
            most_recent_client_hello_seq: 0,
            use_client_hello_seq: false,
            handshake,
            user,
            metrics: RecordMetrics::default(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialize framers and counters for a (new) connection in `role`.
    pub fn open_for_action(&mut self, role: ConnectionEnd) {
        self.role = role;
        self.reset_connection_state();
        self.open = true;
        log::debug!("[RECORD] opened for action ({:?}, {:?})", self.mode, role);
    }

    /// Permit application data in both directions.
    pub fn connect(&mut self) -> RecordResult<()> {
        if !self.open {
            return Err(RecordError::InvalidArgument("endpoint not open"));
        }
        self.connected = true;
        Ok(())
    }

    /// Stop accepting application data; handshake traffic still flows.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Tear the endpoint down completely.
    pub fn close_down(&mut self) {
        self.reset_connection_state();
        self.open = false;
        log::debug!("[RECORD] closed down");
    }

    /// Return to the post-`open_for_action` state for connection reuse.
    pub fn cleanup(&mut self) {
        self.reset_connection_state();
        log::debug!("[RECORD] cleaned up for reuse");
    }

    fn reset_connection_state(&mut self) {
        self.connected = false;
        self.framer.clear();
        self.read_params = None;
        self.write_params = None;
        self.read_cipher = BulkCipher::null();
        self.write_cipher = BulkCipher::null();
        self.read_epoch = 0;
        self.write_epoch = 0;
        self.tls_read_seq = 0;
        self.tls_write_seq = 0;
        self.dtls_write_seq = 0;
        self.replay.reset();
        self.record_expansion = 0;
        self.cipher_suite = 0;
        self.most_recent_client_hello_seq = 0;
        self.use_client_hello_seq = false;
    }

    // ------------------------------------------------------------------
    // Send path
    // ------------------------------------------------------------------

    /// Fragment, protect and emit `buffer` as records of `content_type`.
    pub fn send_message(&mut self, buffer: &[u8], content_type: ContentType) -> RecordResult<()> {
        if !self.open {
            return Err(RecordError::InvalidArgument("endpoint not open"));
        }
        if content_type == ContentType::ApplicationData && !self.connected {
            return Err(RecordError::InvalidArgument(
                "application data before connect",
            ));
        }
        if buffer.is_empty() && content_type != ContentType::ApplicationData {
            return Err(RecordError::InvalidArgument("empty non-application send"));
        }

        let record_size_limit = self
            .write_params
            .as_ref()
            .map(|sp| sp.record_size_limit)
            .unwrap_or(DEFAULT_RECORD_SIZE_LIMIT);
        let fragment_size = compute_fragment_size(
            self.mtu,
            self.mode.header_len(),
            self.record_expansion,
            record_size_limit,
        )?;

        for fragment in SendFragmenter::new(buffer, fragment_size, content_type) {
            self.emit_record(fragment, content_type)?;
        }
        Ok(())
    }

    /// Send a pre-built alert body. Fatal alerts disconnect the endpoint.
    pub fn handle_outgoing_alert(&mut self, buffer: &[u8]) -> RecordResult<()> {
        let result = self.send_message(buffer, ContentType::Alert);
        if result.is_ok() {
            self.metrics.alerts_sent += 1;
        }
        if buffer.first() == Some(&AlertLevel::Fatal.as_u8()) {
            log::warn!("[RECORD] fatal alert sent, disconnecting");
            self.disconnect();
        }
        result
    }

    /// Build and send a 2-byte alert record.
    pub fn send_alert(
        &mut self,
        level: AlertLevel,
        description: AlertDescription,
    ) -> RecordResult<()> {
        self.handle_outgoing_alert(&encode_alert(level, description))
    }

    /// DTLS cookie exchange: emit one record under the null cipher at epoch
    /// 0, echoing the most recent ClientHello's explicit sequence number,
    /// regardless of the installed write parameters.
    pub fn send_hello_verify_request(&mut self, buffer: &[u8]) -> RecordResult<()> {
        if self.mode != Mode::Dtls {
            return Err(RecordError::InvalidArgument(
                "hello verify request is DTLS-only",
            ));
        }
        if !self.open {
            return Err(RecordError::InvalidArgument("endpoint not open"));
        }
        if buffer.is_empty() {
            return Err(RecordError::InvalidArgument("empty hello verify request"));
        }

        let number = RecordNumber::Dtls {
            epoch: 0,
            seq: self.most_recent_client_hello_seq,
        };
        let pt = PlainText::new(
            ContentType::Handshake,
            self.mode.version(),
            number,
            buffer.to_vec(),
        );
        let comp = self.compression.compress(pt)?;
        let sealed = BulkCipher::null().encrypt(comp)?;
        let wire = sealed.serialize()?;
        self.user.on_send_to_transport(&wire);
        self.metrics.records_sent += 1;
        Ok(())
    }

    fn emit_record(&mut self, payload: &[u8], content_type: ContentType) -> RecordResult<()> {
        let number = match self.mode {
            Mode::Tls => {
                if self.tls_write_seq == u64::MAX {
                    return self.sequence_exhausted();
                }
                RecordNumber::Tls {
                    seq: self.tls_write_seq,
                }
            }
            Mode::Dtls => {
                let seq = if self.use_client_hello_seq {
                    self.most_recent_client_hello_seq
                } else {
                    self.dtls_write_seq
                };
                if seq >= DTLS_MAX_SEQUENCE {
                    return self.sequence_exhausted();
                }
                RecordNumber::Dtls {
                    epoch: self.write_epoch,
                    seq,
                }
            }
        };

        let pt = PlainText::new(
            content_type,
            self.mode.version(),
            number,
            payload.to_vec(),
        );
        let comp = self.compression.compress(pt)?;
        let sealed = self.write_cipher.encrypt(comp)?;
        let wire = sealed.serialize()?;
        self.user.on_send_to_transport(&wire);

        match number {
            RecordNumber::Tls { seq } => self.tls_write_seq = seq + 1,
            RecordNumber::Dtls { seq, .. } => {
                self.use_client_hello_seq = false;
                self.dtls_write_seq = seq + 1;
            }
        }
        self.metrics.records_sent += 1;
        Ok(())
    }

    fn sequence_exhausted(&mut self) -> RecordResult<()> {
        log::error!("[RECORD] write sequence number space exhausted");
        self.disconnect();
        self.handshake.close_request();
        Err(RecordError::SequenceExhausted)
    }

    // ------------------------------------------------------------------
    // Receive path
    // ------------------------------------------------------------------

    /// Feed transport bytes; every completed record is validated, decrypted
    /// and dispatched before the next one is framed.
    pub fn handle_received_data_from_transport(&mut self, bytes: &[u8]) -> RecordResult<()> {
        if !self.open {
            return Err(RecordError::InvalidArgument("endpoint not open"));
        }
        self.framer.add_data(bytes);
        loop {
            match self.framer.next_record() {
                Ok(Some(raw)) => self.process_record(&raw),
                Ok(None) => return Ok(()),
                Err(err) => {
                    // The byte stream is beyond repair; drop it wholesale.
                    self.framer.clear();
                    return Err(err);
                }
            }
        }
    }

    fn context(&self) -> RecordProtocolContext {
        RecordProtocolContext {
            mode: self.mode,
            read_epoch: self.read_epoch,
            write_epoch: self.write_epoch,
            tls_read_seq: self.tls_read_seq,
            tls_write_seq: self.tls_write_seq,
            dtls_write_seq: self.dtls_write_seq,
            replay: self.replay,
        }
    }

    fn process_record(&mut self, raw: &[u8]) {
        let cipher = match CipherText::deserialize(self.mode, raw, self.tls_read_seq) {
            Ok(cipher) => cipher,
            Err(err) => {
                log::warn!("[RECORD] rejecting undecodable record: {}", err);
                self.fatal_shutdown(AlertDescription::UnexpectedMessage);
                return;
            }
        };

        let ctx = self.context();
        let verdict = pre_validate(&cipher, &ctx);
        match verdict {
            PreVerdict::Overflow => {
                log::warn!(
                    "[RECORD] ciphertext of {} bytes over the record cap",
                    cipher.payload.len()
                );
                self.fatal_shutdown(AlertDescription::RecordOverflow);
            }
            PreVerdict::FatalUnexpectedMessage => {
                self.fatal_shutdown(AlertDescription::UnexpectedMessage);
            }
            PreVerdict::Drop => {
                if let RecordNumber::Dtls { epoch, seq } = cipher.number {
                    if epoch == ctx.read_epoch
                        && ctx.replay.check(seq) != ReplayCheck::Fresh
                    {
                        self.metrics.replays_dropped += 1;
                    }
                }
                self.metrics.records_dropped += 1;
            }
            PreVerdict::Retransmit => {
                self.metrics.retransmits_detected += 1;
                let events = self.handshake.on_handshake_data(&cipher.payload, true);
                self.apply_events(events);
            }
            PreVerdict::Passed | PreVerdict::UseNullCipher | PreVerdict::ContainsClientHello => {
                self.decrypt_and_dispatch(cipher, verdict);
            }
        }
    }

    fn decrypt_and_dispatch(&mut self, cipher: CipherText, verdict: PreVerdict) {
        if verdict == PreVerdict::ContainsClientHello {
            // Remembered for HelloVerifyRequest echoing.
            self.most_recent_client_hello_seq = cipher.number.sequence();
        }

        let number = cipher.number;
        let decrypted = if verdict == PreVerdict::Passed {
            self.read_cipher.decrypt(cipher)
        } else {
            BulkCipher::null().decrypt(cipher)
        };
        let comp = match decrypted {
            Ok(comp) => comp,
            Err(err) => {
                log::warn!("[RECORD] record failed verification: {}", err);
                self.metrics.mac_failures += 1;
                self.fatal_shutdown(AlertDescription::BadRecordMac);
                return;
            }
        };

        // Verification succeeded: commit the read-side bookkeeping.
        if verdict == PreVerdict::Passed {
            match number {
                RecordNumber::Dtls { seq, .. } => self.replay.update(seq),
                RecordNumber::Tls { .. } => self.tls_read_seq += 1,
            }
        }

        let pt = match self.compression.decompress(comp) {
            Ok(pt) => pt,
            Err(err) => {
                log::error!("[RECORD] decompression failed: {}", err);
                self.fatal_shutdown(AlertDescription::InternalError);
                return;
            }
        };

        match post_validate(&pt, self.mode.version()) {
            PostVerdict::Overflow => {
                self.fatal_shutdown(AlertDescription::RecordOverflow);
            }
            PostVerdict::Drop => {
                self.metrics.records_dropped += 1;
            }
            PostVerdict::Passed => {
                self.trigger_callback(pt);
            }
        }
    }

    /// Route one accepted plaintext by content type.
    fn trigger_callback(&mut self, pt: PlainText) {
        match pt.content_type {
            ContentType::Handshake => {
                self.metrics.records_received += 1;
                let events = self.handshake.on_handshake_data(&pt.payload, false);
                self.apply_events(events);
            }
            ContentType::Alert => {
                self.metrics.records_received += 1;
                let events = self.handshake.on_alert_data(&pt.payload);
                self.apply_events(events);
            }
            ContentType::ChangeCipherSpec => {
                if pt.payload != [CHANGE_CIPHER_SPEC_BODY] {
                    log::warn!("[RECORD] malformed ChangeCipherSpec payload");
                    self.fatal_shutdown(AlertDescription::UnexpectedMessage);
                    return;
                }
                self.metrics.records_received += 1;
                let events = self.handshake.on_change_cipher_data(&pt.payload);
                self.apply_events(events);
            }
            ContentType::ApplicationData => {
                if self.connected {
                    self.metrics.records_received += 1;
                    self.user.on_send_to_comm_party(&pt.payload);
                } else {
                    // Early or late application data is invisible to the user.
                    self.metrics.records_dropped += 1;
                }
            }
        }
    }

    /// Emit a fatal alert, disconnect and tell the handshake to tear down.
    fn fatal_shutdown(&mut self, description: AlertDescription) {
        if let Err(err) = self.send_alert(AlertLevel::Fatal, description) {
            log::debug!("[RECORD] could not emit fatal alert: {}", err);
            self.disconnect();
        }
        self.handshake.close_request();
    }

    // ------------------------------------------------------------------
    // Handshake -> Record events
    // ------------------------------------------------------------------

    fn apply_events(&mut self, events: Vec<HandshakeEvent>) {
        for event in events {
            if let Err(err) = self.apply_event(event) {
                log::error!("[RECORD] handshake event rejected: {}", err);
            }
        }
    }

    fn apply_event(&mut self, event: HandshakeEvent) -> RecordResult<()> {
        match event {
            HandshakeEvent::ResetSecurityParameters => {
                self.reset_security_parameters();
                Ok(())
            }
            HandshakeEvent::SetReadSecurityParameters(sp) => {
                self.set_read_security_parameters(sp)
            }
            HandshakeEvent::SetWriteSecurityParameters(sp) => {
                self.set_write_security_parameters(sp)
            }
            HandshakeEvent::IncreaseReadEpoch => {
                self.increase_read_epoch();
                Ok(())
            }
            HandshakeEvent::IncreaseWriteEpoch => {
                self.increase_write_epoch();
                Ok(())
            }
            HandshakeEvent::DecreaseReadEpoch => {
                self.decrease_read_epoch();
                Ok(())
            }
            HandshakeEvent::DecreaseWriteEpoch => {
                self.decrease_write_epoch();
                Ok(())
            }
            HandshakeEvent::UseMostRecentClientHelloSequenceNumber => {
                self.use_most_recent_client_hello_sequence_number();
                Ok(())
            }
            HandshakeEvent::CipherSuiteSelected(id) => self.on_cipher_suite_selected(id),
        }
    }

    /// Drop both directions back to the null cipher.
    pub fn reset_security_parameters(&mut self) {
        self.read_params = None;
        self.write_params = None;
        self.read_cipher = BulkCipher::null();
        self.write_cipher = BulkCipher::null();
        self.record_expansion = 0;
    }

    /// Install parameters for subsequent received records.
    pub fn set_read_security_parameters(&mut self, sp: SecurityParameters) -> RecordResult<()> {
        self.read_cipher = BulkCipher::for_read(&sp)?;
        self.read_params = Some(sp);
        Ok(())
    }

    /// Install parameters for subsequent sent records and recompute the
    /// per-record expansion.
    pub fn set_write_security_parameters(&mut self, sp: SecurityParameters) -> RecordResult<()> {
        self.write_cipher = BulkCipher::for_write(&sp)?;
        self.record_expansion = self.write_cipher.expansion() + self.compression.expansion();
        self.write_params = Some(sp);
        Ok(())
    }

    /// New read epoch: explicit sequence tracking and the anti-replay window
    /// start over.
    pub fn increase_read_epoch(&mut self) {
        self.read_epoch = self.read_epoch.saturating_add(1);
        self.tls_read_seq = 0;
        self.replay.reset();
    }

    /// New write epoch: the explicit sequence number restarts at zero.
    pub fn increase_write_epoch(&mut self) {
        self.write_epoch = self.write_epoch.saturating_add(1);
        self.tls_write_seq = 0;
        self.dtls_write_seq = 0;
    }

    /// Handshake rollback (DTLS): undo a pending read epoch increment.
    pub fn decrease_read_epoch(&mut self) {
        self.read_epoch = self.read_epoch.saturating_sub(1);
        self.tls_read_seq = 0;
        self.replay.reset();
    }

    /// Handshake rollback (DTLS): undo a pending write epoch increment.
    pub fn decrease_write_epoch(&mut self) {
        self.write_epoch = self.write_epoch.saturating_sub(1);
        self.tls_write_seq = 0;
        self.dtls_write_seq = 0;
    }

    /// The next emitted record reuses the remembered ClientHello sequence
    /// number (DTLS cookie exchange).
    pub fn use_most_recent_client_hello_sequence_number(&mut self) {
        self.use_client_hello_seq = true;
    }

    /// Record the negotiated cipher suite. Only the bulk arm matters here;
    /// an id outside the supported table is refused.
    pub fn on_cipher_suite_selected(&mut self, id: u16) -> RecordResult<()> {
        let suite = lookup_cipher_suite(id)
            .ok_or(RecordError::InvalidArgument("unsupported cipher suite"))?;
        log::debug!("[RECORD] cipher suite selected: {}", suite.name);
        self.cipher_suite = id;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn role(&self) -> ConnectionEnd {
        self.role
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn read_epoch(&self) -> u16 {
        self.read_epoch
    }

    pub fn write_epoch(&self) -> u16 {
        self.write_epoch
    }

    pub fn record_expansion(&self) -> usize {
        self.record_expansion
    }

    pub fn selected_cipher_suite(&self) -> u16 {
        self.cipher_suite
    }

    pub fn metrics(&self) -> &RecordMetrics {
        &self.metrics
    }

    /// Window state exposed for diagnostics.
    pub fn replay_window(&self) -> AntiReplayWindow {
        self.replay
    }

    /// Bytes sitting in the framer waiting for the rest of a record.
    pub fn buffered_receive_bytes(&self) -> usize {
        self.framer.buffered()
    }
}
