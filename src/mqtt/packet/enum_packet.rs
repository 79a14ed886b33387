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
use crate::mqtt::packet::v5_0;
use crate::mqtt::packet::IsPacketId;
use crate::mqtt::packet::PacketType;
use crate::mqtt::Version;
use enum_dispatch::enum_dispatch;
use serde::Serialize;
use std::io::IoSlice;

#[enum_dispatch]
pub trait GenericPacketTrait {
    fn size(&self) -> usize;

    /// Create a continuous buffer containing the complete packet data
    ///
    /// Returns a vector containing all packet bytes in a single continuous buffer.
    fn to_continuous_buffer(&self) -> Vec<u8>;

    fn to_buffers(&self) -> Vec<IoSlice<'_>>;
}

#[enum_dispatch]
pub trait GenericPacketDisplay {
    fn fmt_debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result;
    fn fmt_display(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result;
}

/// Any MQTT v5.0 packet, keyed by the type used for packet identifiers.
#[enum_dispatch(GenericPacketTrait, GenericPacketDisplay)]
#[derive(Serialize, Clone, PartialEq, Eq)]
pub enum GenericPacket<PacketIdType>
where
    PacketIdType: IsPacketId + Serialize,
{
    Connect(v5_0::Connect),
    Connack(v5_0::Connack),
    Subscribe(v5_0::GenericSubscribe<PacketIdType>),
    Suback(v5_0::GenericSuback<PacketIdType>),
    Unsubscribe(v5_0::GenericUnsubscribe<PacketIdType>),
    Unsuback(v5_0::GenericUnsuback<PacketIdType>),
    Publish(v5_0::GenericPublish<PacketIdType>),
    Puback(v5_0::GenericPuback<PacketIdType>),
    Pubrec(v5_0::GenericPubrec<PacketIdType>),
    Pubrel(v5_0::GenericPubrel<PacketIdType>),
    Pubcomp(v5_0::GenericPubcomp<PacketIdType>),
    Disconnect(v5_0::Disconnect),
    Pingreq(v5_0::Pingreq),
    Pingresp(v5_0::Pingresp),
    Auth(v5_0::Auth),
}

// Type alias for commonly used u16 PacketIdType
pub type Packet = GenericPacket<u16>;

impl<PacketIdType> std::fmt::Debug for GenericPacket<PacketIdType>
where
    PacketIdType: IsPacketId + Serialize,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_debug(f)
    }
}

impl<PacketIdType> std::fmt::Display for GenericPacket<PacketIdType>
where
    PacketIdType: IsPacketId + Serialize,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_display(f)
    }
}

impl<PacketIdType> GenericPacket<PacketIdType>
where
    PacketIdType: IsPacketId + Serialize,
{
    /// Get the packet type
    pub fn packet_type(&self) -> PacketType {
        match self {
            GenericPacket::Connect(_) => PacketType::Connect,
            GenericPacket::Connack(_) => PacketType::Connack,
            GenericPacket::Subscribe(_) => PacketType::Subscribe,
            GenericPacket::Suback(_) => PacketType::Suback,
            GenericPacket::Unsubscribe(_) => PacketType::Unsubscribe,
            GenericPacket::Unsuback(_) => PacketType::Unsuback,
            GenericPacket::Publish(_) => PacketType::Publish,
            GenericPacket::Puback(_) => PacketType::Puback,
            GenericPacket::Pubrec(_) => PacketType::Pubrec,
            GenericPacket::Pubrel(_) => PacketType::Pubrel,
            GenericPacket::Pubcomp(_) => PacketType::Pubcomp,
            GenericPacket::Disconnect(_) => PacketType::Disconnect,
            GenericPacket::Pingreq(_) => PacketType::Pingreq,
            GenericPacket::Pingresp(_) => PacketType::Pingresp,
            GenericPacket::Auth(_) => PacketType::Auth,
        }
    }

    /// Get the MQTT protocol version of this packet
    pub fn protocol_version(&self) -> Version {
        match self {
            GenericPacket::Connect(_) => Version::V5_0,
            GenericPacket::Connack(_) => Version::V5_0,
            GenericPacket::Subscribe(_) => Version::V5_0,
            GenericPacket::Suback(_) => Version::V5_0,
            GenericPacket::Unsubscribe(_) => Version::V5_0,
            GenericPacket::Unsuback(_) => Version::V5_0,
            GenericPacket::Publish(_) => Version::V5_0,
            GenericPacket::Puback(_) => Version::V5_0,
            GenericPacket::Pubrec(_) => Version::V5_0,
            GenericPacket::Pubrel(_) => Version::V5_0,
            GenericPacket::Pubcomp(_) => Version::V5_0,
            GenericPacket::Disconnect(_) => Version::V5_0,
            GenericPacket::Pingreq(_) => Version::V5_0,
            GenericPacket::Pingresp(_) => Version::V5_0,
            GenericPacket::Auth(_) => Version::V5_0,
        }
    }
}
