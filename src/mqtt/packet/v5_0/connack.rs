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
use std::fmt;
use std::io::IoSlice;

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use derive_builder::Builder;
use getset::{CopyGetters, Getters};

use crate::mqtt::packet::packet_type::{FixedHeader, PacketType};
use crate::mqtt::packet::variable_byte_integer::VariableByteInteger;
use crate::mqtt::packet::GenericPacketDisplay;
use crate::mqtt::packet::GenericPacketTrait;
use crate::mqtt::packet::{
    Properties, PropertiesParse, PropertiesSize, PropertiesToBuffers, Property,
};
use crate::mqtt::result_code::ConnectReasonCode;
use crate::mqtt::result_code::MqttError;

/// A CONNACK packet for MQTT v5.0 protocol.
///
/// The CONNACK packet is sent by the server in response to a CONNECT packet
/// received from a client. It is the first packet sent by the server and
/// acknowledges whether the connection attempt succeeded.
///
/// # MQTT v5.0 Specification
///
/// According to the MQTT v5.0 specification, the CONNACK packet:
/// - Is always the first packet sent by the server after receiving CONNECT
/// - Contains a Session Present flag indicating whether a prior session was resumed
/// - Contains a Connect Reason Code describing the outcome of the connection attempt
/// - May include properties describing server capabilities and negotiated settings
///
/// # Examples
///
/// ```ignore
/// use mqtt5_client_core::mqtt;
/// use mqtt5_client_core::mqtt::prelude::*;
///
/// let connack = mqtt::packet::v5_0::Connack::builder()
///     .session_present(false)
///     .reason_code(mqtt::result_code::ConnectReasonCode::Success)
///     .build()
///     .unwrap();
///
/// assert!(!connack.session_present());
/// assert_eq!(connack.reason_code(), mqtt::result_code::ConnectReasonCode::Success);
/// ```
#[derive(PartialEq, Eq, Builder, Clone, Getters, CopyGetters)]
#[builder(derive(Debug), pattern = "owned", setter(into), build_fn(skip))]
pub struct Connack {
    #[builder(private)]
    fixed_header: [u8; 1],
    #[builder(private)]
    remaining_length: VariableByteInteger,
    #[builder(private)]
    ack_flags: [u8; 1],
    #[builder(private)]
    reason_code_buf: [u8; 1],
    #[builder(private)]
    property_length: VariableByteInteger,

    /// MQTT v5.0 properties associated with this CONNACK packet.
    ///
    /// Properties can include:
    /// - `SessionExpiryInterval`: Session expiry negotiated by the server
    /// - `ReceiveMaximum`: Maximum number of QoS 1/2 publications the server will process concurrently
    /// - `MaximumQos`: Highest QoS level the server supports
    /// - `RetainAvailable`: Whether the server supports retained messages
    /// - `MaximumPacketSize`: Maximum packet size the server will accept
    /// - `AssignedClientIdentifier`: Client identifier assigned by the server
    /// - `TopicAliasMaximum`: Maximum topic alias value the server accepts
    /// - `ReasonString`: Human readable string designed for diagnostics
    /// - `UserProperty`: Name-value pairs for application-specific metadata
    /// - `WildcardSubscriptionAvailable`: Whether wildcard subscriptions are supported
    /// - `SubscriptionIdentifierAvailable`: Whether subscription identifiers are supported
    /// - `SharedSubscriptionAvailable`: Whether shared subscriptions are supported
    /// - `ServerKeepAlive`: Keep alive value assigned by the server
    /// - `ResponseInformation`: Used to create a Response Topic for request/response flows
    /// - `ServerReference`: Another server the client should use
    /// - `AuthenticationMethod`: Authentication method continuing from CONNECT
    /// - `AuthenticationData`: Authentication data continuing from CONNECT
    #[builder(setter(into, strip_option))]
    #[getset(get = "pub")]
    pub props: Properties,
}

impl Connack {
    /// Creates a new builder for constructing a CONNACK packet.
    pub fn builder() -> ConnackBuilder {
        ConnackBuilder::default()
    }

    /// Returns the packet type for CONNACK packets.
    pub fn packet_type() -> PacketType {
        PacketType::Connack
    }

    /// Returns whether the server is resuming an existing session.
    pub fn session_present(&self) -> bool {
        (self.ack_flags[0] & 0b0000_0001) != 0
    }

    /// Returns the reason code describing the outcome of the connection attempt.
    pub fn reason_code(&self) -> ConnectReasonCode {
        ConnectReasonCode::try_from(self.reason_code_buf[0]).unwrap_or(ConnectReasonCode::UnspecifiedError)
    }

    /// Returns the total size of this CONNACK packet in bytes.
    pub fn size(&self) -> usize {
        1 + self.remaining_length.size() + self.remaining_length.to_u32() as usize
    }

    /// Converts this CONNACK packet into a vector of I/O slices for efficient writing.
    pub fn to_buffers(&self) -> Vec<IoSlice<'_>> {
        let mut bufs = Vec::new();
        bufs.push(IoSlice::new(&self.fixed_header));
        bufs.push(IoSlice::new(self.remaining_length.as_bytes()));
        bufs.push(IoSlice::new(&self.ack_flags));
        bufs.push(IoSlice::new(&self.reason_code_buf));
        bufs.push(IoSlice::new(self.property_length.as_bytes()));
        bufs.extend(self.props.to_buffers());

        bufs
    }

    /// Parses a CONNACK packet from raw byte data.
    ///
    /// The fixed header must already have been parsed and removed from `data`.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), MqttError> {
        let mut cursor = 0;

        if data.len() < 2 {
            return Err(MqttError::MalformedPacket);
        }

        let ack_flags = [data[cursor]];
        if (ack_flags[0] & 0b1111_1110) != 0 {
            return Err(MqttError::MalformedPacket);
        }
        cursor += 1;

        let reason_code_buf = [data[cursor]];
        ConnectReasonCode::try_from(reason_code_buf[0]).map_err(|_| MqttError::MalformedPacket)?;
        cursor += 1;

        let (props, consumed) = Properties::parse(&data[cursor..])?;
        cursor += consumed;
        validate_connack_properties(&props)?;
        let property_length = VariableByteInteger::from_u32(props.size() as u32).unwrap();

        let connack = Connack {
            fixed_header: [FixedHeader::Connack.as_u8()],
            remaining_length: VariableByteInteger::from_u32(cursor as u32).unwrap(),
            ack_flags,
            reason_code_buf,
            property_length,
            props,
        };

        Ok((connack, cursor))
    }
}

/// Builder for constructing CONNACK packets.
impl ConnackBuilder {
    /// Sets the session present flag.
    pub fn session_present(mut self, present: bool) -> Self {
        let flags = if present { 0b0000_0001 } else { 0 };
        self.ack_flags = Some([flags]);
        self
    }

    /// Sets the reason code describing the outcome of the connection attempt.
    pub fn reason_code(mut self, rc: ConnectReasonCode) -> Self {
        self.reason_code_buf = Some([rc as u8]);
        self
    }

    fn validate(&self) -> Result<(), MqttError> {
        if let Some(ref props) = self.props {
            validate_connack_properties(props)?;
        }
        Ok(())
    }

    /// Builds the CONNACK packet from the configured parameters.
    pub fn build(self) -> Result<Connack, MqttError> {
        self.validate()?;

        let ack_flags = self.ack_flags.unwrap_or([0]);
        let reason_code_buf = self
            .reason_code_buf
            .unwrap_or([ConnectReasonCode::Success as u8]);
        let props = self.props.unwrap_or_else(Properties::new);
        let property_length = VariableByteInteger::from_u32(props.size() as u32).unwrap();

        let remaining = 1 + 1 + property_length.size() + props.size();
        let remaining_length = VariableByteInteger::from_u32(remaining as u32).unwrap();

        Ok(Connack {
            fixed_header: [FixedHeader::Connack.as_u8()],
            remaining_length,
            ack_flags,
            reason_code_buf,
            property_length,
            props,
        })
    }
}

impl Serialize for Connack {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut field_count = 3; // type, session_present, reason_code

        if !self.props.is_empty() {
            field_count += 1;
        }

        let mut state = serializer.serialize_struct("connack", field_count)?;
        state.serialize_field("type", PacketType::Connack.as_str())?;
        state.serialize_field("session_present", &self.session_present())?;
        state.serialize_field("reason_code", &self.reason_code())?;
        if !self.props.is_empty() {
            state.serialize_field("props", &self.props)?;
        }

        state.end()
    }
}

impl fmt::Display for Connack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{json}"),
            Err(e) => write!(f, "{{\"error\": \"{e}\"}}"),
        }
    }
}

impl fmt::Debug for Connack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl GenericPacketTrait for Connack {
    fn size(&self) -> usize {
        self.size()
    }

    fn to_buffers(&self) -> Vec<IoSlice<'_>> {
        self.to_buffers()
    }
}

impl GenericPacketDisplay for Connack {
    fn fmt_debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }

    fn fmt_display(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Validates that the provided properties are valid for CONNACK packets.
///
/// See MQTT v5.0 section 3.2.2.3 for the authoritative list.
fn validate_connack_properties(props: &Properties) -> Result<(), MqttError> {
    let mut count_session_expiry_interval = 0;
    let mut count_receive_maximum = 0;
    let mut count_maximum_qos = 0;
    let mut count_retain_available = 0;
    let mut count_maximum_packet_size = 0;
    let mut count_assigned_client_identifier = 0;
    let mut count_topic_alias_maximum = 0;
    let mut count_wildcard_subscription_available = 0;
    let mut count_subscription_identifier_available = 0;
    let mut count_shared_subscription_available = 0;
    let mut count_server_keep_alive = 0;
    let mut count_response_information = 0;
    let mut count_server_reference = 0;
    let mut count_authentication_method = 0;
    let mut count_authentication_data = 0;
    let mut count_reason_string = 0;

    for prop in props {
        match prop {
            Property::SessionExpiryInterval(_) => count_session_expiry_interval += 1,
            Property::ReceiveMaximum(_) => count_receive_maximum += 1,
            Property::MaximumQos(_) => count_maximum_qos += 1,
            Property::RetainAvailable(_) => count_retain_available += 1,
            Property::MaximumPacketSize(_) => count_maximum_packet_size += 1,
            Property::AssignedClientIdentifier(_) => count_assigned_client_identifier += 1,
            Property::TopicAliasMaximum(_) => count_topic_alias_maximum += 1,
            Property::WildcardSubscriptionAvailable(_) => {
                count_wildcard_subscription_available += 1
            }
            Property::SubscriptionIdentifierAvailable(_) => {
                count_subscription_identifier_available += 1
            }
            Property::SharedSubscriptionAvailable(_) => count_shared_subscription_available += 1,
            Property::ServerKeepAlive(_) => count_server_keep_alive += 1,
            Property::ResponseInformation(_) => count_response_information += 1,
            Property::ServerReference(_) => count_server_reference += 1,
            Property::AuthenticationMethod(_) => count_authentication_method += 1,
            Property::AuthenticationData(_) => count_authentication_data += 1,
            Property::ReasonString(_) => count_reason_string += 1,
            Property::UserProperty(_) => {}
            _ => return Err(MqttError::ProtocolError),
        }
    }

    if count_session_expiry_interval > 1
        || count_receive_maximum > 1
        || count_maximum_qos > 1
        || count_retain_available > 1
        || count_maximum_packet_size > 1
        || count_assigned_client_identifier > 1
        || count_topic_alias_maximum > 1
        || count_wildcard_subscription_available > 1
        || count_subscription_identifier_available > 1
        || count_shared_subscription_available > 1
        || count_server_keep_alive > 1
        || count_response_information > 1
        || count_server_reference > 1
        || count_authentication_method > 1
        || count_authentication_data > 1
        || count_reason_string > 1
    {
        return Err(MqttError::ProtocolError);
    }

    Ok(())
}
