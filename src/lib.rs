// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # seccom - secure communication core for automotive middleware
//!
//! TLS 1.2 / DTLS 1.2 record protocol core plus the SOME/IP-TP segmentation
//! manager used by transports with a maximum datagram size. The handshake
//! itself lives elsewhere; this crate turns application buffers into
//! protected wire records (and back) once keying material exists.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                     Handshake layer (external)                |
//! |    key agreement | certificates | flights | timeouts          |
//! +---------------------------------------------------------------+
//! |                       Record protocol core                    |
//! |  framer | fragmenter | compression | bulk ciphers | validator |
//! |  anti-replay window | epoch + sequence bookkeeping            |
//! +---------------------------------------------------------------+
//! |                 Transport callbacks (external)                |
//! |        on_send_to_transport | received datagram bytes         |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seccom::{
//!     ConnectionEnd, ContentType, EndpointConfig, HandshakeEvent, HandshakeSink, Mode,
//!     RecordProtocol, UserSink,
//! };
//!
//! struct Handshake;
//! impl HandshakeSink for Handshake {
//!     fn close_request(&mut self) {}
//!     fn on_handshake_data(&mut self, _buf: &[u8], _retransmit: bool) -> Vec<HandshakeEvent> {
//!         Vec::new()
//!     }
//!     fn on_alert_data(&mut self, _buf: &[u8]) -> Vec<HandshakeEvent> {
//!         Vec::new()
//!     }
//!     fn on_change_cipher_data(&mut self, _buf: &[u8]) -> Vec<HandshakeEvent> {
//!         Vec::new()
//!     }
//! }
//!
//! struct Transport;
//! impl UserSink for Transport {
//!     fn on_send_to_transport(&mut self, _buf: &[u8]) { /* write to socket */ }
//!     fn on_send_to_comm_party(&mut self, _buf: &[u8]) { /* deliver to app */ }
//! }
//!
//! let config = EndpointConfig {
//!     mode: Mode::Dtls,
//!     role: ConnectionEnd::Client,
//!     mtu: 1500,
//! };
//! let mut record = RecordProtocol::new(&config, Box::new(Handshake), Box::new(Transport));
//! record.open_for_action(ConnectionEnd::Client);
//! record.connect().unwrap();
//! record.send_message(b"payload", ContentType::ApplicationData).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`record`] - the record protocol core (start here)
//! - [`segmentation`] - SOME/IP-TP segmentation manager
//! - [`config`] - endpoint and pool configuration
//! - [`error`] - error kinds shared across the crate

/// Endpoint and segmentation configuration structs.
pub mod config;
/// Error kinds and the crate-wide `Result` alias.
pub mod error;
/// TLS/DTLS record protocol core.
pub mod record;
/// SOME/IP-TP segmentation manager.
pub mod segmentation;

pub use config::{EndpointConfig, SegmentationConfig};
pub use error::{RecordError, RecordResult};
pub use record::{
    AlertDescription, AlertLevel, AntiReplayWindow, ConnectionEnd, ContentType, HandshakeEvent,
    HandshakeSink, Mode, ProtocolVersion, RecordMetrics, RecordProtocol, SecurityParameters,
    UserSink,
};
pub use record::security_params::{CipherAlgorithm, MacAlgorithm};
pub use segmentation::{
    SegmentationManager, SegmentationOutcome, SegmentationParams, SegmentizerKey, TimerService,
};
