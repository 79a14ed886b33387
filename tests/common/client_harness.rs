// MIT License
//
// Copyright (c) 2025 Takatoshi Kondo
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! In-memory duplex transport plus a minimal single-client broker stand-in,
//! used to drive `src/client/*` end to end without a real socket.

use mqtt5_client_core::client::{Connector, Transport};
use mqtt5_client_core::mqtt;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

/// Builds a [`Connector`] that, every time the driver (re)connects, opens a
/// fresh in-memory duplex pair and hands the broker-side half out over
/// `rx`. Mirrors `Driver`'s own expectation that a connector must be able to
/// produce a new transport per attempt, including reconnects.
pub fn make_connector() -> (Connector, mpsc::UnboundedReceiver<DuplexStream>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connector: Connector = Arc::new(move || {
        let tx = tx.clone();
        Box::pin(async move {
            let (client_end, broker_end) = tokio::io::duplex(4096);
            let _ = tx.send(broker_end);
            Ok(Box::new(client_end) as Box<dyn Transport>)
        })
    });
    (connector, rx)
}

/// The broker side of one connection attempt: a sans-I/O `Server`-role
/// engine driven directly over its duplex half.
pub struct FakeBroker {
    stream: DuplexStream,
    engine: mqtt::connection::GenericConnection<mqtt::connection::role::Server, u16>,
    buf: Vec<u8>,
}

impl FakeBroker {
    pub fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            engine: mqtt::connection::GenericConnection::new(mqtt::connection::Version::V5_0),
            buf: vec![0u8; 4096],
        }
    }

    /// Reads off the wire until the engine surfaces at least one event.
    pub async fn read_events(&mut self) -> Vec<mqtt::connection::Event> {
        loop {
            let n = self.stream.read(&mut self.buf).await.expect("broker read");
            assert!(n > 0, "client closed the connection unexpectedly");
            let mut cursor = mqtt::common::Cursor::new(&self.buf[..n]);
            let events = self.engine.recv(&mut cursor);
            if !events.is_empty() {
                return events;
            }
        }
    }

    /// Reads until the next `NotifyPacketReceived`, discarding anything else.
    pub async fn recv_packet(&mut self) -> mqtt::packet::Packet {
        loop {
            for event in self.read_events().await {
                if let mqtt::connection::Event::NotifyPacketReceived(p) = event {
                    return p;
                }
            }
        }
    }

    /// Sends a packet, writing whatever bytes the engine produces for it.
    pub async fn send(&mut self, packet: mqtt::packet::Packet) {
        let events = self.engine.send(packet);
        for event in events {
            if let mqtt::connection::Event::RequestSendPacket { packet, .. } = event {
                self.stream.write_all(&packet.to_continuous_buffer()).await.expect("broker write");
            }
        }
    }

    /// Accepts the pending CONNECT and replies with a successful CONNACK.
    pub async fn accept_connect(&mut self) {
        let packet = self.recv_packet().await;
        assert!(matches!(packet, mqtt::packet::Packet::Connect(_)), "expected CONNECT");
        let connack = mqtt::packet::v5_0::Connack::builder()
            .session_present(false)
            .reason_code(mqtt::result_code::ConnectReasonCode::Success)
            .build()
            .expect("build CONNACK");
        self.send(mqtt::packet::Packet::Connack(connack)).await;
    }
}
