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

//! Subscribes to a topic and prints incoming messages, driving the sans-I/O
//! connection directly over a blocking `TcpStream`.

use mqtt5_client_core::mqtt;
use mqtt5_client_core::mqtt::prelude::*;
use std::env;
use std::io::{Read, Write};
use std::net::TcpStream;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        let program = &args[0];
        eprintln!("Usage: {program} <host> <port> <topic> <qos>");
        eprintln!("Example: {program} localhost 1883 test/topic 0");
        std::process::exit(1);
    }

    let host = &args[1];
    let port: u16 = args[2].parse().map_err(|e| format!("Invalid port: {e}"))?;
    let topic = &args[3];
    let qos: u8 = args[4].parse().map_err(|e| format!("Invalid QoS: {e}"))?;

    let qos_level =
        mqtt::packet::Qos::try_from(qos).map_err(|_| format!("Invalid QoS level '{qos}'"))?;

    let mut stream = TcpStream::connect(format!("{host}:{port}"))?;
    println!("Connected to {host}:{port}");

    let mut connection =
        mqtt::Connection::<mqtt::connection::role::Client>::new(mqtt::connection::Version::V5_0);
    connection.set_auto_pub_response(true);

    let connect_packet = mqtt::packet::v5_0::Connect::builder()
        .client_id("mqtt_subscribe_example")
        .unwrap()
        .build()
        .map_err(|e| format!("Failed to build CONNECT packet: {e:?}"))?;

    let events = connection.send(connect_packet.into());
    handle_events(&mut stream, events)?;

    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer)?;
    if n > 0 {
        let mut cursor = mqtt::common::Cursor::new(&buffer[..n]);
        let events = connection.recv(&mut cursor);
        handle_events(&mut stream, events)?;
    }

    let packet_id = connection
        .acquire_packet_id()
        .map_err(|e| format!("Failed to acquire packet ID: {e:?}"))?;

    let sub_opts = mqtt::packet::SubOpts::new().set_qos(qos_level);
    let sub_entry = mqtt::packet::SubEntry::new(topic, sub_opts).unwrap();
    let subscribe_packet = mqtt::packet::v5_0::Subscribe::builder()
        .entries(vec![sub_entry])
        .packet_id(packet_id)
        .build()
        .map_err(|e| format!("Failed to build SUBSCRIBE packet: {e:?}"))?;

    let events = connection.send(subscribe_packet.into());
    handle_events(&mut stream, events)?;

    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer)?;
    if n > 0 {
        let mut cursor = mqtt::common::Cursor::new(&buffer[..n]);
        let events = connection.recv(&mut cursor);
        handle_events(&mut stream, events)?;
    }

    println!("Waiting for messages... (Press Ctrl+C to exit)");

    loop {
        let mut buffer = [0u8; 1024];
        let n = stream.read(&mut buffer)?;
        if n == 0 {
            eprintln!("Connection closed by server");
            break;
        }

        let mut cursor = mqtt::common::Cursor::new(&buffer[..n]);
        let events = connection.recv(&mut cursor);
        handle_events(&mut stream, events)?;
    }

    Ok(())
}

fn handle_events(
    stream: &mut TcpStream,
    events: Vec<mqtt::connection::Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    use mqtt::connection::Event;
    use mqtt::packet::Packet;

    for event in events {
        match event {
            Event::RequestSendPacket { packet, .. } => {
                let buffer = packet.to_continuous_buffer();
                stream.write_all(&buffer)?;
                println!("Sent packet: {}", packet.packet_type());
            }
            Event::NotifyPacketReceived(packet) => match packet {
                Packet::Connack(connack) => {
                    println!("CONNACK received: {:?}", connack.reason_code());
                }
                Packet::Suback(suback) => {
                    println!("SUBACK received for packet ID: {}", suback.packet_id());
                    for reason_code in suback.reason_codes() {
                        println!("Subscription result: {reason_code:?}");
                    }
                }
                Packet::Publish(publish) => {
                    let topic = publish.topic_name();
                    let payload = String::from_utf8_lossy(publish.payload().as_slice());
                    println!(
                        "Received message on topic '{topic}' with QoS {:?}: {payload}",
                        publish.qos()
                    );
                }
                other => println!("Received packet: {}", other.packet_type()),
            },
            Event::NotifyPacketIdReleased(packet_id) => {
                println!("Packet ID {packet_id} released");
            }
            Event::NotifyError(error) => {
                eprintln!("MQTT Error: {error:?}");
            }
            Event::RequestClose => {
                println!("Connection close requested");
                return Ok(());
            }
            Event::RequestTimerReset { kind, duration_ms } => {
                println!("Timer reset requested: {kind:?} for {duration_ms} ms");
            }
            Event::RequestTimerCancel(kind) => {
                println!("Timer cancel requested: {kind:?}");
            }
        }
    }
    Ok(())
}
