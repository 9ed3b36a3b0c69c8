// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DTLS-specific flows: epoch transitions driven by ChangeCipherSpec, the
//! HelloVerifyRequest cookie exchange, and replay behavior over the wire.

use std::cell::RefCell;
use std::rc::Rc;

use seccom::{
    CipherAlgorithm, ConnectionEnd, ContentType, EndpointConfig, HandshakeEvent, HandshakeSink,
    MacAlgorithm, Mode, RecordProtocol, SecurityParameters, UserSink,
};

#[derive(Default)]
struct Captured {
    wires: Vec<Vec<u8>>,
    app: Vec<Vec<u8>>,
    handshake: Vec<(Vec<u8>, bool)>,
    change_cipher_seen: usize,
    on_change_cipher: Vec<HandshakeEvent>,
}

#[derive(Clone, Default)]
struct Sink(Rc<RefCell<Captured>>);

impl HandshakeSink for Sink {
    fn close_request(&mut self) {}

    fn on_handshake_data(&mut self, buf: &[u8], is_retransmit: bool) -> Vec<HandshakeEvent> {
        self.0.borrow_mut().handshake.push((buf.to_vec(), is_retransmit));
        Vec::new()
    }

    fn on_alert_data(&mut self, _buf: &[u8]) -> Vec<HandshakeEvent> {
        Vec::new()
    }

    fn on_change_cipher_data(&mut self, _buf: &[u8]) -> Vec<HandshakeEvent> {
        let mut captured = self.0.borrow_mut();
        captured.change_cipher_seen += 1;
        std::mem::take(&mut captured.on_change_cipher)
    }
}

impl UserSink for Sink {
    fn on_send_to_transport(&mut self, buf: &[u8]) {
        self.0.borrow_mut().wires.push(buf.to_vec());
    }

    fn on_send_to_comm_party(&mut self, buf: &[u8]) {
        self.0.borrow_mut().app.push(buf.to_vec());
    }
}

fn endpoint(role: ConnectionEnd) -> (RecordProtocol, Sink) {
    let sink = Sink::default();
    let config = EndpointConfig {
        mode: Mode::Dtls,
        role,
        mtu: 1500,
    };
    let mut rp = RecordProtocol::new(&config, Box::new(sink.clone()), Box::new(sink.clone()));
    rp.open_for_action(role);
    (rp, sink)
}

fn gcm_params(entity: ConnectionEnd) -> SecurityParameters {
    let mut sp = SecurityParameters::null(entity);
    sp.cipher = CipherAlgorithm::Aes128Gcm;
    sp.mac = MacAlgorithm::Null;
    sp.client_write_key = vec![0x01; 16];
    sp.server_write_key = vec![0x02; 16];
    sp.client_write_iv = vec![0x03; 4];
    sp.server_write_iv = vec![0x04; 4];
    sp.fixed_iv_len = 4;
    sp.record_iv_len = 8;
    sp
}

fn pump(from: &Sink, to: &mut RecordProtocol) {
    let wires = std::mem::take(&mut from.0.borrow_mut().wires);
    for wire in wires {
        to.handle_received_data_from_transport(&wire).unwrap();
    }
}

#[test]
fn change_cipher_spec_drives_epoch_transition() {
    let (mut client, client_sink) = endpoint(ConnectionEnd::Client);
    let (mut server, server_sink) = endpoint(ConnectionEnd::Server);
    client.connect().unwrap();
    server.connect().unwrap();

    // The server's handshake reacts to the CCS by installing read
    // parameters and bumping the read epoch, exactly between two records.
    server_sink.0.borrow_mut().on_change_cipher = vec![
        HandshakeEvent::SetReadSecurityParameters(gcm_params(ConnectionEnd::Server)),
        HandshakeEvent::IncreaseReadEpoch,
    ];

    // Client: CCS in the clear, then switch its own write side.
    client
        .send_message(&[0x01], ContentType::ChangeCipherSpec)
        .unwrap();
    client
        .set_write_security_parameters(gcm_params(ConnectionEnd::Client))
        .unwrap();
    client.increase_write_epoch();
    client
        .send_message(b"epoch-1 secret", ContentType::ApplicationData)
        .unwrap();

    pump(&client_sink, &mut server);

    assert_eq!(server_sink.0.borrow().change_cipher_seen, 1);
    assert_eq!(server.read_epoch(), 1);
    assert_eq!(server_sink.0.borrow().app.concat(), b"epoch-1 secret");
}

#[test]
fn hello_verify_request_cookie_exchange() {
    let (mut client, client_sink) = endpoint(ConnectionEnd::Client);
    let (mut server, server_sink) = endpoint(ConnectionEnd::Server);

    // Flight 1: ClientHello (handshake type 1) at epoch 0.
    client
        .send_message(&[1, 0, 0, 5, 0xFE, 0xFD, 0, 0, 0], ContentType::Handshake)
        .unwrap();
    pump(&client_sink, &mut server);
    assert_eq!(server_sink.0.borrow().handshake.len(), 1);

    // Server answers with a HelloVerifyRequest echoing the hello's sequence.
    server.send_hello_verify_request(&[3, 0, 0, 3, 9, 9, 9]).unwrap();
    {
        let wires = &server_sink.0.borrow().wires;
        assert_eq!(&wires[0][5..11], &[0, 0, 0, 0, 0, 0]); // ClientHello seq 0
    }
    pump(&server_sink, &mut client);
    let client_seen = client_sink.0.borrow().handshake.clone();
    assert_eq!(client_seen, vec![(vec![3, 0, 0, 3, 9, 9, 9], false)]);

    // Second ClientHello (with cookie) gets sequence 1; the server's next
    // record reuses it.
    client
        .send_message(&[1, 0, 0, 5, 0xFE, 0xFD, 0, 1, 1], ContentType::Handshake)
        .unwrap();
    pump(&client_sink, &mut server);
    server.use_most_recent_client_hello_sequence_number();
    server.send_message(&[2, 0, 0, 1, 0], ContentType::Handshake).unwrap();
    let wires = &server_sink.0.borrow().wires;
    assert_eq!(&wires.last().unwrap()[5..11], &[0, 0, 0, 0, 0, 1]);
}

#[test]
fn replayed_datagrams_are_invisible_to_the_application() {
    let (mut client, client_sink) = endpoint(ConnectionEnd::Client);
    let (mut server, server_sink) = endpoint(ConnectionEnd::Server);
    client.connect().unwrap();
    server.connect().unwrap();
    client
        .set_write_security_parameters(gcm_params(ConnectionEnd::Client))
        .unwrap();
    server
        .set_read_security_parameters(gcm_params(ConnectionEnd::Server))
        .unwrap();

    client
        .send_message(b"one of a kind", ContentType::ApplicationData)
        .unwrap();
    let wire = client_sink.0.borrow_mut().wires.remove(0);

    // Deliver the same datagram three times (duplicated network path).
    for _ in 0..3 {
        server.handle_received_data_from_transport(&wire).unwrap();
    }

    assert_eq!(server_sink.0.borrow().app.len(), 1);
    assert_eq!(server.metrics().replays_dropped, 2);
    assert!(server.is_connected());
}

#[test]
fn out_of_order_delivery_within_window_is_accepted() {
    let (mut client, client_sink) = endpoint(ConnectionEnd::Client);
    let (mut server, server_sink) = endpoint(ConnectionEnd::Server);
    client.connect().unwrap();
    server.connect().unwrap();
    client
        .set_write_security_parameters(gcm_params(ConnectionEnd::Client))
        .unwrap();
    server
        .set_read_security_parameters(gcm_params(ConnectionEnd::Server))
        .unwrap();

    for msg in [b"a".as_ref(), b"b", b"c"] {
        client.send_message(msg, ContentType::ApplicationData).unwrap();
    }
    let mut wires = std::mem::take(&mut client_sink.0.borrow_mut().wires);
    wires.swap(1, 2); // Reorder in flight

    for wire in wires {
        server.handle_received_data_from_transport(&wire).unwrap();
    }
    let received = server_sink.0.borrow().app.clone();
    assert_eq!(received, vec![b"a".to_vec(), b"c".to_vec(), b"b".to_vec()]);
}

#[test]
fn stale_epoch_application_data_is_dropped() {
    let (mut client, client_sink) = endpoint(ConnectionEnd::Client);
    let (mut server, server_sink) = endpoint(ConnectionEnd::Server);
    client.connect().unwrap();
    server.connect().unwrap();

    client
        .send_message(b"left behind", ContentType::ApplicationData)
        .unwrap();
    server.increase_read_epoch();
    pump(&client_sink, &mut server);

    assert!(server_sink.0.borrow().app.is_empty());
    assert_eq!(server.metrics().records_dropped, 1);
}
