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

use std::marker::PhantomData;

use super::event::{GenericEvent, TimerKind};
use super::packet_builder::{PacketBuildResult, PacketBuilder, PacketData, RawPacket};
use super::packet_id_manager::PacketIdManager;
use super::role;
use super::role::RoleType;
use super::version::Version;
use super::GenericStore;

use crate::mqtt::common::tracing::{error, info, warn};
use crate::mqtt::common::{Cursor, HashSet};
use crate::mqtt::packet::v5_0;
use crate::mqtt::packet::{
    GenericPacket, GenericPacketTrait, GenericStorePacket, IsPacketId, Property, Qos,
    ResponsePacket, TopicAliasRecv, TopicAliasSend,
};
use crate::mqtt::result_code::{
    ConnectReasonCode, DisconnectReasonCode, MqttError, PubrecReasonCode,
};

/// 1 (fixed header) + 4 (remaining length) + 128^4 (maximum remaining length value)
const MQTT_PACKET_SIZE_NO_LIMIT: u32 = 1 + 4 + 128 * 128 * 128 * 128;

fn remaining_length_to_total_size(remaining_length: u32) -> u32 {
    let remaining_length_bytes = if remaining_length < 128 {
        1
    } else if remaining_length < 16384 {
        2
    } else if remaining_length < 2_097_152 {
        3
    } else {
        4
    };

    1 + remaining_length_bytes + remaining_length
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Sans-I/O MQTT v5.0 connection state machine.
///
/// `GenericConnection` drives the protocol: it consumes packets to send and bytes
/// received from the wire, and produces [`Event`](super::Event)s describing what the
/// embedding application should do next (send bytes, reset a timer, surface a
/// received packet, close the socket). It performs no I/O of its own.
///
/// `Role` selects which packets this side of the connection is allowed to send
/// (see [`role`]). `PacketIdType` is `u16` for standard MQTT, or `u32` for
/// deployments that need a wider packet identifier space.
pub struct GenericConnection<Role, PacketIdType>
where
    Role: RoleType,
    PacketIdType: IsPacketId,
{
    _marker: PhantomData<Role>,

    protocol_version: Version,

    pid_man: PacketIdManager<PacketIdType>,
    pid_suback: HashSet<PacketIdType>,
    pid_unsuback: HashSet<PacketIdType>,
    pid_puback: HashSet<PacketIdType>,
    pid_pubrec: HashSet<PacketIdType>,
    pid_pubcomp: HashSet<PacketIdType>,

    need_store: bool,
    store: GenericStore<PacketIdType>,

    offline_publish: bool,
    auto_pub_response: bool,
    auto_ping_response: bool,
    auto_map_topic_alias_send: bool,
    auto_replace_topic_alias_send: bool,

    topic_alias_recv: Option<TopicAliasRecv>,
    topic_alias_send: Option<TopicAliasSend>,

    publish_send_max: Option<u16>,
    publish_recv_max: Option<u16>,
    publish_send_count: u16,
    publish_recv: HashSet<PacketIdType>,

    maximum_packet_size_send: u32,
    maximum_packet_size_recv: u32,

    status: ConnectionStatus,

    pingreq_send_interval_ms: Option<u64>,
    pingreq_recv_timeout_ms: Option<u64>,
    pingresp_recv_timeout_ms: Option<u64>,

    qos2_publish_handled: HashSet<PacketIdType>,
    qos2_publish_processing: HashSet<PacketIdType>,

    pingreq_send_set: bool,
    pingreq_recv_set: bool,
    pingresp_recv_set: bool,

    packet_builder: PacketBuilder,
    is_client: bool,
}

impl<Role, PacketIdType> GenericConnection<Role, PacketIdType>
where
    Role: RoleType,
    PacketIdType: IsPacketId,
{
    /// Create a new connection. `version` should be `Version::V5_0`; `Undetermined`
    /// is for a server side waiting to learn the version from the peer's CONNECT.
    pub fn new(version: Version) -> Self {
        Self {
            _marker: PhantomData,
            protocol_version: version,
            pid_man: PacketIdManager::new(),
            pid_suback: HashSet::new(),
            pid_unsuback: HashSet::new(),
            pid_puback: HashSet::new(),
            pid_pubrec: HashSet::new(),
            pid_pubcomp: HashSet::new(),
            need_store: false,
            store: GenericStore::new(),
            offline_publish: false,
            auto_pub_response: false,
            auto_ping_response: false,
            auto_map_topic_alias_send: false,
            auto_replace_topic_alias_send: false,
            topic_alias_recv: None,
            topic_alias_send: None,
            publish_send_max: None,
            publish_recv_max: None,
            publish_send_count: 0,
            publish_recv: HashSet::new(),
            maximum_packet_size_send: MQTT_PACKET_SIZE_NO_LIMIT,
            maximum_packet_size_recv: MQTT_PACKET_SIZE_NO_LIMIT,
            status: ConnectionStatus::Disconnected,
            pingreq_send_interval_ms: None,
            pingreq_recv_timeout_ms: None,
            pingresp_recv_timeout_ms: None,
            qos2_publish_handled: HashSet::new(),
            qos2_publish_processing: HashSet::new(),
            pingreq_send_set: false,
            pingreq_recv_set: false,
            pingresp_recv_set: false,
            packet_builder: PacketBuilder::new(),
            is_client: false,
        }
    }

    // -- public API --------------------------------------------------------

    /// Send an MQTT packet, validated at runtime against the connection's role.
    ///
    /// Returns a `NotifyError(PacketNotAllowedToSend)` event instead of sending
    /// if `packet` is not a type this role is allowed to originate.
    pub fn send(&mut self, packet: GenericPacket<PacketIdType>) -> Vec<GenericEvent<PacketIdType>> {
        match packet {
            GenericPacket::Connect(p) => {
                if Role::IS_CLIENT || Role::IS_ANY {
                    self.process_send_connect(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Connack(p) => {
                if Role::IS_SERVER || Role::IS_ANY {
                    self.process_send_connack(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Publish(p) => self.process_send_publish(p),
            GenericPacket::Puback(p) => self.process_send_puback(p),
            GenericPacket::Pubrec(p) => self.process_send_pubrec(p),
            GenericPacket::Pubrel(p) => self.process_send_pubrel(p),
            GenericPacket::Pubcomp(p) => self.process_send_pubcomp(p),
            GenericPacket::Subscribe(p) => {
                if Role::IS_CLIENT || Role::IS_ANY {
                    self.process_send_subscribe(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Suback(p) => {
                if Role::IS_SERVER || Role::IS_ANY {
                    self.process_send_suback(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Unsubscribe(p) => {
                if Role::IS_CLIENT || Role::IS_ANY {
                    self.process_send_unsubscribe(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Unsuback(p) => {
                if Role::IS_SERVER || Role::IS_ANY {
                    self.process_send_unsuback(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Pingreq(p) => {
                if Role::IS_CLIENT || Role::IS_ANY {
                    self.process_send_pingreq(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Pingresp(p) => {
                if Role::IS_SERVER || Role::IS_ANY {
                    self.process_send_pingresp(p)
                } else {
                    vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)]
                }
            }
            GenericPacket::Disconnect(p) => self.process_send_disconnect(p),
            GenericPacket::Auth(p) => self.process_send_auth(p),
        }
    }

    /// Feed bytes received from the wire. Advances `data`'s cursor by whatever
    /// was consumed, buffering any partial packet for the next call.
    pub fn recv(&mut self, data: &mut Cursor<&[u8]>) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match self.packet_builder.feed(data) {
            PacketBuildResult::Complete(raw_packet) => {
                events.extend(self.process_recv_packet(raw_packet));
            }
            PacketBuildResult::Incomplete => {}
            PacketBuildResult::Error(e) => {
                self.cancel_timers(&mut events);
                events.push(GenericEvent::RequestClose);
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    /// Notify the engine that a timer it previously requested has fired.
    pub fn notify_timer_fired(&mut self, kind: TimerKind) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match kind {
            TimerKind::PingreqSend => {
                self.pingreq_send_set = false;
                if self.status == ConnectionStatus::Connected {
                    if let Ok(pingreq) = v5_0::Pingreq::builder().build() {
                        events.extend(self.process_send_pingreq(pingreq));
                    }
                }
            }
            TimerKind::PingreqRecv => {
                self.pingreq_recv_set = false;
                if self.status == ConnectionStatus::Connected {
                    if let Ok(disconnect) = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::KeepAliveTimeout)
                        .build()
                    {
                        events.extend(self.process_send_disconnect(disconnect));
                    }
                }
            }
            TimerKind::PingrespRecv => {
                self.pingresp_recv_set = false;
                if self.status == ConnectionStatus::Connected {
                    if let Ok(disconnect) = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::KeepAliveTimeout)
                        .build()
                    {
                        events.extend(self.process_send_disconnect(disconnect));
                    }
                }
            }
        }

        events
    }

    /// Notify the engine that the underlying transport was closed.
    pub fn notify_closed(&mut self) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        self.maximum_packet_size_send = MQTT_PACKET_SIZE_NO_LIMIT;
        self.maximum_packet_size_recv = MQTT_PACKET_SIZE_NO_LIMIT;
        self.status = ConnectionStatus::Disconnected;
        self.topic_alias_send = None;
        self.topic_alias_recv = None;

        for packet_id in self.pid_suback.drain().collect::<Vec<_>>() {
            if self.pid_man.is_used_id(packet_id) {
                self.pid_man.release_id(packet_id);
                events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
            }
        }
        for packet_id in self.pid_unsuback.drain().collect::<Vec<_>>() {
            if self.pid_man.is_used_id(packet_id) {
                self.pid_man.release_id(packet_id);
                events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
            }
        }

        if !self.need_store {
            self.qos2_publish_processing.clear();
            self.qos2_publish_handled.clear();

            for packet_id in self.pid_puback.drain().collect::<Vec<_>>() {
                if self.pid_man.is_used_id(packet_id) {
                    self.pid_man.release_id(packet_id);
                    events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
                }
            }
            for packet_id in self.pid_pubrec.drain().collect::<Vec<_>>() {
                if self.pid_man.is_used_id(packet_id) {
                    self.pid_man.release_id(packet_id);
                    events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
                }
            }
            for packet_id in self.pid_pubcomp.drain().collect::<Vec<_>>() {
                if self.pid_man.is_used_id(packet_id) {
                    self.pid_man.release_id(packet_id);
                    events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
                }
            }
            self.store.clear();
        }

        self.cancel_timers(&mut events);
        self.packet_builder.reset();

        events
    }

    pub fn set_pingreq_send_interval(&mut self, duration_ms: u64) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();
        if duration_ms == 0 {
            self.pingreq_send_interval_ms = None;
            self.pingreq_send_set = false;
            events.push(GenericEvent::RequestTimerCancel(TimerKind::PingreqSend));
        } else {
            self.pingreq_send_interval_ms = Some(duration_ms);
            self.pingreq_send_set = true;
            events.push(GenericEvent::RequestTimerReset {
                kind: TimerKind::PingreqSend,
                duration_ms,
            });
        }
        events
    }

    pub fn get_receive_maximum_vacancy_for_send(&self) -> Option<u16> {
        self.publish_send_max
            .map(|max| max.saturating_sub(self.publish_send_count))
    }

    pub fn set_offline_publish(&mut self, enable: bool) {
        self.offline_publish = enable;
        if enable {
            self.need_store = true;
        }
    }

    pub fn set_auto_pub_response(&mut self, enable: bool) {
        self.auto_pub_response = enable;
    }

    pub fn set_auto_ping_response(&mut self, enable: bool) {
        self.auto_ping_response = enable;
    }

    pub fn set_auto_map_topic_alias_send(&mut self, enable: bool) {
        self.auto_map_topic_alias_send = enable;
    }

    pub fn set_auto_replace_topic_alias_send(&mut self, enable: bool) {
        self.auto_replace_topic_alias_send = enable;
    }

    pub fn set_pingresp_recv_timeout(&mut self, duration_ms: Option<u64>) {
        self.pingresp_recv_timeout_ms = duration_ms;
    }

    pub fn acquire_packet_id(&mut self) -> Result<PacketIdType, MqttError> {
        self.pid_man.acquire_unique_id()
    }

    pub fn register_packet_id(&mut self, packet_id: PacketIdType) -> Result<(), MqttError> {
        self.pid_man.register_id(packet_id)
    }

    pub fn release_packet_id(&mut self, packet_id: PacketIdType) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();
        if self.pid_man.is_used_id(packet_id) {
            self.pid_man.release_id(packet_id);
            events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
        }
        events
    }

    pub fn get_qos2_publish_handled(&self) -> HashSet<PacketIdType> {
        self.qos2_publish_handled.clone()
    }

    pub fn restore_qos2_publish_handled(&mut self, pids: HashSet<PacketIdType>) {
        self.qos2_publish_handled = pids;
    }

    /// Re-inject previously stored in-flight packets, e.g. after restoring a
    /// persisted session. Re-registers each packet's identifier and reopens
    /// the matching ack-tracking set.
    pub fn restore_packets(&mut self, packets: Vec<GenericStorePacket<PacketIdType>>) {
        for packet in packets {
            match packet {
                GenericStorePacket::Publish(p) => {
                    let packet_id = match p.packet_id() {
                        Some(id) => id,
                        None => {
                            warn!("restore_packets: QoS 0 PUBLISH cannot be stored, skipping");
                            continue;
                        }
                    };
                    match p.qos() {
                        Qos::AtLeastOnce => {
                            self.pid_puback.insert(packet_id);
                        }
                        Qos::ExactlyOnce => {
                            self.pid_pubrec.insert(packet_id);
                        }
                        Qos::AtMostOnce => {
                            warn!("restore_packets: QoS 0 PUBLISH cannot be stored, skipping");
                            continue;
                        }
                    }
                    if let Err(e) = self.pid_man.register_id(packet_id) {
                        error!("restore_packets: failed to register packet_id: {e}");
                    }
                    if let Err(e) = self.store.add(GenericStorePacket::Publish(p)) {
                        error!("restore_packets: failed to add to store: {e}");
                    }
                }
                GenericStorePacket::Pubrel(p) => {
                    let packet_id = p.packet_id();
                    self.pid_pubcomp.insert(packet_id);
                    if let Err(e) = self.pid_man.register_id(packet_id) {
                        error!("restore_packets: failed to register packet_id: {e}");
                    }
                    if let Err(e) = self.store.add(GenericStorePacket::Pubrel(p)) {
                        error!("restore_packets: failed to add to store: {e}");
                    }
                }
            }
        }
    }

    pub fn get_stored_packets(&self) -> Vec<GenericStorePacket<PacketIdType>> {
        self.store.get_stored()
    }

    pub fn get_protocol_version(&self) -> Version {
        self.protocol_version
    }

    pub fn is_publish_processing(&self, packet_id: PacketIdType) -> bool {
        self.qos2_publish_processing.contains(&packet_id)
    }

    #[allow(dead_code)]
    fn is_packet_id_used(&self, packet_id: PacketIdType) -> bool {
        self.pid_man.is_used_id(packet_id)
    }

    /// Resolve a PUBLISH for storage: a stored packet must always carry its
    /// topic name, never a topic alias, since the alias table may be reset on
    /// reconnect.
    fn regulate_for_store(
        &self,
        packet: v5_0::GenericPublish<PacketIdType>,
    ) -> Result<v5_0::GenericPublish<PacketIdType>, MqttError> {
        if packet.topic_name().is_empty() {
            let topic_alias = get_topic_alias_from_props(&packet.props)
                .ok_or(MqttError::PacketNotRegulated)?;
            let topic = self
                .topic_alias_send
                .as_ref()
                .ok_or(MqttError::PacketNotRegulated)?
                .peek(topic_alias)
                .ok_or(MqttError::PacketNotRegulated)?;
            packet.remove_topic_alias_add_topic(topic.to_string())
        } else {
            Ok(packet.remove_topic_alias())
        }
    }

    fn initialize(&mut self, is_client: bool) {
        self.publish_send_max = None;
        self.publish_recv_max = None;
        self.publish_send_count = 0;
        self.topic_alias_send = None;
        self.topic_alias_recv = None;
        self.publish_recv.clear();
        self.qos2_publish_processing.clear();
        self.need_store = false;
        self.pid_suback.clear();
        self.pid_unsuback.clear();
        self.is_client = is_client;
    }

    fn clear_store_related(&mut self) {
        self.pid_man.clear();
        self.pid_puback.clear();
        self.pid_pubrec.clear();
        self.pid_pubcomp.clear();
        self.store.clear();
    }

    fn send_stored(&mut self) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();
        self.store.for_each(|packet| {
            if packet.size() > self.maximum_packet_size_send as usize {
                let packet_id = packet.packet_id();
                if self.pid_man.is_used_id(packet_id) {
                    self.pid_man.release_id(packet_id);
                    events.push(GenericEvent::NotifyPacketIdReleased(packet_id));
                }
                return false;
            }
            events.push(GenericEvent::RequestSendPacket {
                packet: packet.clone().into(),
                release_packet_id_if_send_error: None,
            });
            true
        });
        events
    }

    fn validate_topic_alias_range(&self, topic_alias: u16) -> bool {
        let Some(ref topic_alias_send) = self.topic_alias_send else {
            error!("topic_alias is set but topic_alias_maximum is 0");
            return false;
        };
        if topic_alias == 0 || topic_alias > topic_alias_send.max() {
            error!("topic_alias is set but out of range");
            return false;
        }
        true
    }

    fn validate_topic_alias(&mut self, topic_alias_opt: Option<u16>) -> Option<String> {
        let topic_alias = topic_alias_opt?;
        if !self.validate_topic_alias_range(topic_alias) {
            return None;
        }
        self.topic_alias_send
            .as_mut()?
            .get(topic_alias)
            .map(|topic| topic.to_string())
    }

    fn validate_maximum_packet_size_send(&self, size: usize) -> bool {
        if size > self.maximum_packet_size_send as usize {
            error!("packet size over maximum_packet_size for sending");
            return false;
        }
        true
    }

    fn send_post_process(&mut self, events: &mut Vec<GenericEvent<PacketIdType>>) {
        if self.is_client {
            if let Some(timeout_ms) = self.pingreq_send_interval_ms {
                self.pingreq_send_set = true;
                events.push(GenericEvent::RequestTimerReset {
                    kind: TimerKind::PingreqSend,
                    duration_ms: timeout_ms,
                });
            }
        }
    }

    fn refresh_pingreq_recv(&mut self) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();
        if let Some(timeout_ms) = self.pingreq_recv_timeout_ms {
            if self.status == ConnectionStatus::Connecting || self.status == ConnectionStatus::Connected {
                self.pingreq_recv_set = true;
                events.push(GenericEvent::RequestTimerReset {
                    kind: TimerKind::PingreqRecv,
                    duration_ms: timeout_ms,
                });
            } else {
                self.pingreq_recv_set = false;
                events.push(GenericEvent::RequestTimerCancel(TimerKind::PingreqRecv));
            }
        }
        events
    }

    fn cancel_timers(&mut self, events: &mut Vec<GenericEvent<PacketIdType>>) {
        if self.pingreq_send_set {
            self.pingreq_send_set = false;
            events.push(GenericEvent::RequestTimerCancel(TimerKind::PingreqSend));
        }
        if self.pingreq_recv_set {
            self.pingreq_recv_set = false;
            events.push(GenericEvent::RequestTimerCancel(TimerKind::PingreqRecv));
        }
        if self.pingresp_recv_set {
            self.pingresp_recv_set = false;
            events.push(GenericEvent::RequestTimerCancel(TimerKind::PingrespRecv));
        }
    }

    // -- send-path handlers -------------------------------------------------

    fn process_send_connect(&mut self, packet: v5_0::Connect) -> Vec<GenericEvent<PacketIdType>> {
        info!("sending CONNECT");
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Disconnected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        self.initialize(true);
        self.status = ConnectionStatus::Connecting;

        if packet.keep_alive() != 0 && self.pingreq_send_interval_ms.is_none() {
            self.pingreq_send_interval_ms = Some((packet.keep_alive() as u64) * 1000);
        }
        if packet.clean_start() {
            self.clear_store_related();
        }

        for prop in &packet.props {
            match prop {
                Property::TopicAliasMaximum(p) => {
                    if p.val() != 0 {
                        self.topic_alias_recv = Some(TopicAliasRecv::new(p.val()));
                    }
                }
                Property::ReceiveMaximum(p) => {
                    debug_assert!(p.val() != 0);
                    self.publish_recv_max = Some(p.val());
                }
                Property::MaximumPacketSize(p) => {
                    debug_assert!(p.val() != 0);
                    self.maximum_packet_size_recv = p.val();
                }
                Property::SessionExpiryInterval(p) => {
                    if p.val() != 0 {
                        self.need_store = true;
                    }
                }
                _ => {}
            }
        }

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_connack(&mut self, packet: v5_0::Connack) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connecting {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        if packet.reason_code() == ConnectReasonCode::Success {
            self.status = ConnectionStatus::Connected;
            for prop in &packet.props {
                match prop {
                    Property::TopicAliasMaximum(p) => {
                        if p.val() != 0 {
                            self.topic_alias_recv = Some(TopicAliasRecv::new(p.val()));
                        }
                    }
                    Property::ReceiveMaximum(p) => {
                        debug_assert!(p.val() != 0);
                        self.publish_recv_max = Some(p.val());
                    }
                    Property::MaximumPacketSize(p) => {
                        debug_assert!(p.val() != 0);
                        self.maximum_packet_size_recv = p.val();
                    }
                    _ => {}
                }
            }
        } else {
            self.status = ConnectionStatus::Disconnected;
            self.cancel_timers(&mut events);
        }

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        events.extend(self.send_stored());
        self.send_post_process(&mut events);

        events
    }

    fn process_send_publish(
        &mut self,
        mut packet: v5_0::GenericPublish<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }

        let mut events = Vec::new();
        let qos = packet.qos();
        let packet_id_opt = packet.packet_id();

        if qos != Qos::AtMostOnce {
            let packet_id = match packet_id_opt {
                Some(id) => id,
                None => {
                    events.push(GenericEvent::NotifyError(MqttError::PacketIdentifierInvalid));
                    return events;
                }
            };
            if !self.pid_man.is_used_id(packet_id) {
                events.push(GenericEvent::NotifyError(MqttError::PacketIdentifierInvalid));
                return events;
            }

            if self.status != ConnectionStatus::Connected && !self.need_store && !self.offline_publish {
                events.push(GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend));
                events.extend(self.release_packet_id(packet_id));
                return events;
            }

            if self.need_store && (self.status != ConnectionStatus::Disconnected || self.offline_publish) {
                if packet.topic_name().is_empty() {
                    let topic_alias = get_topic_alias_from_props(&packet.props);
                    match self.validate_topic_alias(topic_alias) {
                        Some(topic) => match packet.remove_topic_alias_add_topic(topic) {
                            Ok(p) => packet = p,
                            Err(e) => {
                                events.push(GenericEvent::NotifyError(e));
                                events.extend(self.release_packet_id(packet_id));
                                return events;
                            }
                        },
                        None => {
                            events.push(GenericEvent::NotifyError(MqttError::PacketNotRegulated));
                            events.extend(self.release_packet_id(packet_id));
                            return events;
                        }
                    }
                } else {
                    packet = packet.remove_topic_alias();
                }
                let store_packet = packet.clone().set_dup(true);
                if let Ok(sp) = store_packet.try_into() {
                    if let Err(e) = self.store.add(sp) {
                        error!("failed to store publish: {e}");
                    }
                }
            }

            match qos {
                Qos::ExactlyOnce => {
                    self.qos2_publish_processing.insert(packet_id);
                    self.pid_pubrec.insert(packet_id);
                }
                Qos::AtLeastOnce => {
                    self.pid_puback.insert(packet_id);
                }
                Qos::AtMostOnce => unreachable!(),
            }
        } else if self.status != ConnectionStatus::Connected {
            events.push(GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend));
            return events;
        }

        let release_packet_id_if_send_error = packet_id_opt.filter(|_| qos != Qos::AtMostOnce);

        if packet.topic_name().is_empty() {
            let topic_alias = get_topic_alias_from_props(&packet.props);
            match self.validate_topic_alias(topic_alias) {
                Some(_) => {}
                None => {
                    events.push(GenericEvent::NotifyError(MqttError::PacketNotRegulated));
                    if let Some(packet_id) = release_packet_id_if_send_error {
                        events.extend(self.release_packet_id(packet_id));
                    }
                    return events;
                }
            }
        } else if let Some(topic_alias) = get_topic_alias_from_props(&packet.props) {
            if !self.validate_topic_alias_range(topic_alias) {
                events.push(GenericEvent::NotifyError(MqttError::TopicAliasInvalid));
                if let Some(packet_id) = release_packet_id_if_send_error {
                    events.extend(self.release_packet_id(packet_id));
                }
                return events;
            }
            if let Some(ref mut topic_alias_send) = self.topic_alias_send {
                topic_alias_send.insert_or_update(packet.topic_name(), topic_alias);
            }
        } else if self.status == ConnectionStatus::Connected && self.auto_map_topic_alias_send {
            if let Some(ref mut topic_alias_send) = self.topic_alias_send {
                let topic = packet.topic_name().to_string();
                let alias = topic_alias_send
                    .find_by_topic(&topic)
                    .unwrap_or_else(|| topic_alias_send.get_lru_alias());
                topic_alias_send.insert_or_update(&topic, alias);
                packet = packet.remove_topic_add_topic_alias(alias);
            }
        } else if self.auto_replace_topic_alias_send {
            if let Some(ref topic_alias_send) = self.topic_alias_send {
                if let Some(alias) = topic_alias_send.find_by_topic(packet.topic_name()) {
                    packet = packet.remove_topic_add_topic_alias(alias);
                }
            }
        }

        if qos != Qos::AtMostOnce {
            if let Some(max) = self.publish_send_max {
                if self.publish_send_count == max {
                    events.push(GenericEvent::NotifyError(MqttError::ReceiveMaximumExceeded));
                    if let Some(packet_id) = release_packet_id_if_send_error {
                        events.extend(self.release_packet_id(packet_id));
                    }
                    return events;
                }
                self.publish_send_count += 1;
            }
        }

        if self.status == ConnectionStatus::Connected {
            events.push(GenericEvent::RequestSendPacket {
                packet: packet.into(),
                release_packet_id_if_send_error,
            });
        }
        self.send_post_process(&mut events);

        events
    }

    fn process_send_puback(
        &mut self,
        packet: v5_0::GenericPuback<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        self.publish_recv.remove(&packet.packet_id());

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_pubrec(
        &mut self,
        packet: v5_0::GenericPubrec<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        let packet_id = packet.packet_id();
        if let Some(rc) = packet.reason_code() {
            if rc.is_failure() {
                self.publish_recv.remove(&packet_id);
                self.qos2_publish_handled.remove(&packet_id);
            }
        }

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_pubrel(
        &mut self,
        packet: v5_0::GenericPubrel<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected && !self.need_store {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        let packet_id = packet.packet_id();
        if !self.pid_man.is_used_id(packet_id) {
            error!("packet_id {packet_id} must be acquired or registered");
            events.push(GenericEvent::NotifyError(MqttError::PacketIdentifierInvalid));
            return events;
        }
        if self.need_store {
            if let Ok(sp) = packet.clone().try_into() {
                if let Err(e) = self.store.add(sp) {
                    error!("failed to store pubrel: {e}");
                }
            }
        }

        if self.status == ConnectionStatus::Connected {
            self.pid_pubcomp.insert(packet_id);
            events.push(GenericEvent::RequestSendPacket {
                packet: packet.into(),
                release_packet_id_if_send_error: None,
            });
        }
        self.send_post_process(&mut events);

        events
    }

    fn process_send_pubcomp(
        &mut self,
        packet: v5_0::GenericPubcomp<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        self.publish_recv.remove(&packet.packet_id());

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_subscribe(
        &mut self,
        packet: v5_0::GenericSubscribe<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }

        let mut events = Vec::new();
        let packet_id = packet.packet_id();
        if self.status != ConnectionStatus::Connected {
            events.push(GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend));
            events.extend(self.release_packet_id(packet_id));
            return events;
        }
        if !self.pid_man.is_used_id(packet_id) {
            error!("packet_id {packet_id} must be acquired or registered");
            events.push(GenericEvent::NotifyError(MqttError::PacketIdentifierInvalid));
            return events;
        }
        self.pid_suback.insert(packet_id);

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: Some(packet_id),
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_suback(
        &mut self,
        packet: v5_0::GenericSuback<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_unsubscribe(
        &mut self,
        packet: v5_0::GenericUnsubscribe<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }

        let mut events = Vec::new();
        let packet_id = packet.packet_id();
        if self.status != ConnectionStatus::Connected {
            events.push(GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend));
            events.extend(self.release_packet_id(packet_id));
            return events;
        }
        if !self.pid_man.is_used_id(packet_id) {
            error!("packet_id {packet_id} must be acquired or registered");
            events.push(GenericEvent::NotifyError(MqttError::PacketIdentifierInvalid));
            return events;
        }
        self.pid_unsuback.insert(packet_id);

        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: Some(packet_id),
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_unsuback(
        &mut self,
        packet: v5_0::GenericUnsuback<PacketIdType>,
    ) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_pingreq(&mut self, packet: v5_0::Pingreq) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        if let Some(timeout_ms) = self.pingresp_recv_timeout_ms {
            self.pingresp_recv_set = true;
            events.push(GenericEvent::RequestTimerReset {
                kind: TimerKind::PingrespRecv,
                duration_ms: timeout_ms,
            });
        }
        self.send_post_process(&mut events);

        events
    }

    fn process_send_pingresp(&mut self, packet: v5_0::Pingresp) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    fn process_send_disconnect(&mut self, packet: v5_0::Disconnect) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status != ConnectionStatus::Connected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        self.status = ConnectionStatus::Disconnected;
        self.cancel_timers(&mut events);
        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        events.push(GenericEvent::RequestClose);

        events
    }

    fn process_send_auth(&mut self, packet: v5_0::Auth) -> Vec<GenericEvent<PacketIdType>> {
        if !self.validate_maximum_packet_size_send(packet.size()) {
            return vec![GenericEvent::NotifyError(MqttError::PacketTooLarge)];
        }
        if self.status == ConnectionStatus::Disconnected {
            return vec![GenericEvent::NotifyError(MqttError::PacketNotAllowedToSend)];
        }

        let mut events = Vec::new();
        events.push(GenericEvent::RequestSendPacket {
            packet: packet.into(),
            release_packet_id_if_send_error: None,
        });
        self.send_post_process(&mut events);

        events
    }

    // -- receive-path dispatch ----------------------------------------------

    fn process_recv_packet(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        let total_size = remaining_length_to_total_size(raw_packet.remaining_length());
        if total_size > self.maximum_packet_size_recv {
            let disconnect = v5_0::Disconnect::builder()
                .reason_code(DisconnectReasonCode::PacketTooLarge)
                .build()
                .unwrap();
            events.extend(self.process_send_disconnect(disconnect));
            events.push(GenericEvent::NotifyError(MqttError::PacketTooLarge));
            return events;
        }

        match raw_packet.packet_type() {
            1 => events.extend(self.process_recv_connect(raw_packet)),
            2 => events.extend(self.process_recv_connack(raw_packet)),
            3 => events.extend(self.process_recv_publish(raw_packet)),
            4 => events.extend(self.process_recv_puback(raw_packet)),
            5 => events.extend(self.process_recv_pubrec(raw_packet)),
            6 => events.extend(self.process_recv_pubrel(raw_packet)),
            7 => events.extend(self.process_recv_pubcomp(raw_packet)),
            8 => events.extend(self.process_recv_subscribe(raw_packet)),
            9 => events.extend(self.process_recv_suback(raw_packet)),
            10 => events.extend(self.process_recv_unsubscribe(raw_packet)),
            11 => events.extend(self.process_recv_unsuback(raw_packet)),
            12 => events.extend(self.process_recv_pingreq(raw_packet)),
            13 => events.extend(self.process_recv_pingresp(raw_packet)),
            14 => events.extend(self.process_recv_disconnect(raw_packet)),
            15 => events.extend(self.process_recv_auth(raw_packet)),
            _ => {
                events.push(GenericEvent::NotifyError(MqttError::MalformedPacket));
            }
        }

        events
    }

    fn process_recv_connect(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::Connect::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                if self.status != ConnectionStatus::Disconnected {
                    events.push(GenericEvent::NotifyError(MqttError::ProtocolError));
                    return events;
                }
                self.initialize(false);
                self.status = ConnectionStatus::Connecting;
                if packet.keep_alive() > 0 {
                    self.pingreq_recv_timeout_ms = Some((packet.keep_alive() as u64) * 1000 * 3 / 2);
                }
                if packet.clean_start() {
                    self.clear_store_related();
                }
                for prop in &packet.props {
                    match prop {
                        Property::TopicAliasMaximum(p) => {
                            self.topic_alias_send = Some(TopicAliasSend::new(p.val()));
                        }
                        Property::ReceiveMaximum(p) => {
                            self.publish_send_max = Some(p.val());
                        }
                        Property::MaximumPacketSize(p) => {
                            self.maximum_packet_size_send = p.val();
                        }
                        Property::SessionExpiryInterval(p) => {
                            if p.val() != 0 {
                                self.need_store = true;
                            }
                        }
                        _ => {}
                    }
                }
                events.extend(self.refresh_pingreq_recv());
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                if self.status == ConnectionStatus::Disconnected {
                    self.status = ConnectionStatus::Connecting;
                    let rc = match e {
                        MqttError::ClientIdentifierNotValid => ConnectReasonCode::ClientIdentifierNotValid,
                        MqttError::BadUserNameOrPassword => ConnectReasonCode::BadAuthenticationMethod,
                        MqttError::UnsupportedProtocolVersion => ConnectReasonCode::UnsupportedProtocolVersion,
                        _ => ConnectReasonCode::UnspecifiedError,
                    };
                    let connack = v5_0::Connack::builder().reason_code(rc).build().unwrap();
                    events.extend(self.process_send_connack(connack));
                } else {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::ProtocolError)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                }
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_connack(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::Connack::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                if packet.reason_code() == ConnectReasonCode::Success {
                    self.status = ConnectionStatus::Connected;
                    for prop in &packet.props {
                        match prop {
                            Property::TopicAliasMaximum(p) => {
                                if p.val() > 0 {
                                    self.topic_alias_send = Some(TopicAliasSend::new(p.val()));
                                }
                            }
                            Property::ReceiveMaximum(p) => {
                                self.publish_send_max = Some(p.val());
                            }
                            Property::MaximumPacketSize(p) => {
                                self.maximum_packet_size_send = p.val();
                            }
                            Property::ServerKeepAlive(p) => {
                                self.pingreq_send_interval_ms = Some((p.val() as u64) * 1000);
                            }
                            _ => {}
                        }
                    }
                    if packet.session_present() {
                        events.extend(self.send_stored());
                    } else {
                        self.clear_store_related();
                    }
                }
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                if self.status == ConnectionStatus::Connecting {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(e.into())
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                }
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_publish(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        let flags = raw_packet.flags();
        let arc = match &raw_packet.data {
            PacketData::Publish(arc) => arc.clone(),
            PacketData::Normal(_) => unreachable!("PUBLISH packet must use PacketData::Publish variant"),
        };

        match v5_0::GenericPublish::<PacketIdType>::parse(flags, arc) {
            Ok((mut packet, _)) => {
                let mut already_handled = false;
                let mut puback_send = false;
                let mut pubrec_send = false;

                match packet.qos() {
                    Qos::AtLeastOnce => {
                        let packet_id = packet.packet_id().unwrap();
                        if let Some(max) = self.publish_recv_max {
                            if self.publish_recv.len() >= max as usize {
                                let disconnect = v5_0::Disconnect::builder()
                                    .reason_code(DisconnectReasonCode::ReceiveMaximumExceeded)
                                    .build()
                                    .unwrap();
                                events.extend(self.process_send_disconnect(disconnect));
                                events.push(GenericEvent::NotifyError(MqttError::ReceiveMaximumExceeded));
                                return events;
                            }
                        }
                        self.publish_recv.insert(packet_id);
                        if self.auto_pub_response && self.status == ConnectionStatus::Connected {
                            puback_send = true;
                        }
                    }
                    Qos::ExactlyOnce => {
                        let packet_id = packet.packet_id().unwrap();
                        if let Some(max) = self.publish_recv_max {
                            if self.publish_recv.len() >= max as usize {
                                let disconnect = v5_0::Disconnect::builder()
                                    .reason_code(DisconnectReasonCode::ReceiveMaximumExceeded)
                                    .build()
                                    .unwrap();
                                events.extend(self.process_send_disconnect(disconnect));
                                events.push(GenericEvent::NotifyError(MqttError::ReceiveMaximumExceeded));
                                return events;
                            }
                        }
                        self.publish_recv.insert(packet_id);
                        if !self.qos2_publish_handled.insert(packet_id) {
                            already_handled = true;
                        }
                        if self.status == ConnectionStatus::Connected && (self.auto_pub_response || already_handled) {
                            pubrec_send = true;
                        }
                    }
                    Qos::AtMostOnce => {}
                }

                if packet.topic_name().is_empty() {
                    match get_topic_alias_from_props(&packet.props) {
                        Some(ta) => {
                            let valid = ta != 0
                                && self.topic_alias_recv.as_ref().is_some_and(|t| ta <= t.max());
                            if !valid {
                                let disconnect = v5_0::Disconnect::builder()
                                    .reason_code(DisconnectReasonCode::TopicAliasInvalid)
                                    .build()
                                    .unwrap();
                                events.extend(self.process_send_disconnect(disconnect));
                                events.push(GenericEvent::NotifyError(MqttError::TopicAliasInvalid));
                                return events;
                            }
                            let resolved = self
                                .topic_alias_recv
                                .as_ref()
                                .and_then(|t| t.get(ta))
                                .map(|t| t.to_string());
                            match resolved {
                                Some(topic) => match packet.add_extracted_topic_name(&topic) {
                                    Ok(p) => packet = p,
                                    Err(e) => {
                                        let disconnect = v5_0::Disconnect::builder()
                                            .reason_code(DisconnectReasonCode::ProtocolError)
                                            .build()
                                            .unwrap();
                                        events.extend(self.process_send_disconnect(disconnect));
                                        events.push(GenericEvent::NotifyError(e));
                                        return events;
                                    }
                                },
                                None => {
                                    let disconnect = v5_0::Disconnect::builder()
                                        .reason_code(DisconnectReasonCode::TopicAliasInvalid)
                                        .build()
                                        .unwrap();
                                    events.extend(self.process_send_disconnect(disconnect));
                                    events.push(GenericEvent::NotifyError(MqttError::TopicAliasInvalid));
                                    return events;
                                }
                            }
                        }
                        None => {
                            let disconnect = v5_0::Disconnect::builder()
                                .reason_code(DisconnectReasonCode::TopicAliasInvalid)
                                .build()
                                .unwrap();
                            events.extend(self.process_send_disconnect(disconnect));
                            events.push(GenericEvent::NotifyError(MqttError::TopicAliasInvalid));
                            return events;
                        }
                    }
                } else if let Some(ta) = get_topic_alias_from_props(&packet.props) {
                    let valid = ta != 0 && self.topic_alias_recv.as_ref().is_some_and(|t| ta <= t.max());
                    if !valid {
                        let disconnect = v5_0::Disconnect::builder()
                            .reason_code(DisconnectReasonCode::TopicAliasInvalid)
                            .build()
                            .unwrap();
                        events.extend(self.process_send_disconnect(disconnect));
                        events.push(GenericEvent::NotifyError(MqttError::TopicAliasInvalid));
                        return events;
                    }
                    if let Some(ref mut topic_alias_recv) = self.topic_alias_recv {
                        topic_alias_recv.insert_or_update(packet.topic_name(), ta);
                    }
                }

                if puback_send {
                    let puback = v5_0::GenericPuback::builder()
                        .packet_id(packet.packet_id().unwrap())
                        .build()
                        .unwrap();
                    events.extend(self.process_send_puback(puback));
                }
                if pubrec_send {
                    let pubrec = v5_0::GenericPubrec::builder()
                        .packet_id(packet.packet_id().unwrap())
                        .build()
                        .unwrap();
                    events.extend(self.process_send_pubrec(pubrec));
                }

                events.extend(self.refresh_pingreq_recv());
                if !already_handled {
                    events.push(GenericEvent::NotifyPacketReceived(packet.into()));
                }
            }
            Err(e) => {
                if self.status == ConnectionStatus::Connected {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(e.into())
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                }
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_puback(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericPuback::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                let packet_id = packet.packet_id();
                if self.pid_puback.remove(&packet_id) {
                    self.store.erase(ResponsePacket::Puback, packet_id);
                    events.extend(self.release_packet_id(packet_id));
                    if self.publish_send_max.is_some() {
                        self.publish_send_count -= 1;
                    }
                    events.extend(self.refresh_pingreq_recv());
                    events.push(GenericEvent::NotifyPacketReceived(packet.into()));
                } else {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::ProtocolError)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                    events.push(GenericEvent::NotifyError(MqttError::ProtocolError));
                }
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_pubrec(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericPubrec::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                let packet_id = packet.packet_id();
                if self.pid_pubrec.remove(&packet_id) {
                    self.store.erase(ResponsePacket::Pubrec, packet_id);
                    let reason_code = packet.reason_code();
                    let failed = reason_code.map(|rc| rc != PubrecReasonCode::Success).unwrap_or(false);
                    if failed {
                        events.extend(self.release_packet_id(packet_id));
                        self.qos2_publish_processing.remove(&packet_id);
                        if self.publish_send_max.is_some() {
                            self.publish_send_count -= 1;
                        }
                    } else if self.auto_pub_response && self.status == ConnectionStatus::Connected {
                        let pubrel = v5_0::GenericPubrel::builder()
                            .packet_id(packet_id)
                            .build()
                            .unwrap();
                        events.extend(self.process_send_pubrel(pubrel));
                    }
                    events.extend(self.refresh_pingreq_recv());
                    events.push(GenericEvent::NotifyPacketReceived(packet.into()));
                } else {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::ProtocolError)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                    events.push(GenericEvent::NotifyError(MqttError::from(DisconnectReasonCode::ProtocolError)));
                }
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_pubrel(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericPubrel::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                let packet_id = packet.packet_id();
                self.qos2_publish_handled.remove(&packet_id);
                if self.auto_pub_response && self.status == ConnectionStatus::Connected {
                    let pubcomp = v5_0::GenericPubcomp::builder()
                        .packet_id(packet_id)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_pubcomp(pubcomp));
                }
                events.extend(self.refresh_pingreq_recv());
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_pubcomp(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericPubcomp::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                let packet_id = packet.packet_id();
                if self.pid_pubcomp.remove(&packet_id) {
                    self.store.erase(ResponsePacket::Pubcomp, packet_id);
                    events.extend(self.release_packet_id(packet_id));
                    self.qos2_publish_processing.remove(&packet_id);
                    if self.publish_send_max.is_some() {
                        self.publish_send_count -= 1;
                    }
                    events.extend(self.refresh_pingreq_recv());
                    events.push(GenericEvent::NotifyPacketReceived(packet.into()));
                } else {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::ProtocolError)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                    events.push(GenericEvent::NotifyError(MqttError::ProtocolError));
                }
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_subscribe(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericSubscribe::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                events.extend(self.refresh_pingreq_recv());
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_suback(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericSuback::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                let packet_id = packet.packet_id();
                if self.pid_suback.remove(&packet_id) {
                    events.extend(self.release_packet_id(packet_id));
                    events.extend(self.refresh_pingreq_recv());
                    events.push(GenericEvent::NotifyPacketReceived(packet.into()));
                } else {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::ProtocolError)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                    events.push(GenericEvent::NotifyError(MqttError::ProtocolError));
                }
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_unsubscribe(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericUnsubscribe::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                events.extend(self.refresh_pingreq_recv());
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_unsuback(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::GenericUnsuback::<PacketIdType>::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                let packet_id = packet.packet_id();
                if self.pid_unsuback.remove(&packet_id) {
                    events.extend(self.release_packet_id(packet_id));
                    events.extend(self.refresh_pingreq_recv());
                    events.push(GenericEvent::NotifyPacketReceived(packet.into()));
                } else {
                    let disconnect = v5_0::Disconnect::builder()
                        .reason_code(DisconnectReasonCode::ProtocolError)
                        .build()
                        .unwrap();
                    events.extend(self.process_send_disconnect(disconnect));
                    events.push(GenericEvent::NotifyError(MqttError::ProtocolError));
                }
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_pingreq(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::Pingreq::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                if (Role::IS_SERVER || Role::IS_ANY)
                    && !self.is_client
                    && self.auto_ping_response
                    && self.status == ConnectionStatus::Connected
                {
                    let pingresp = v5_0::Pingresp::new();
                    events.extend(self.process_send_pingresp(pingresp));
                }
                events.extend(self.refresh_pingreq_recv());
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_pingresp(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::Pingresp::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                self.pingresp_recv_set = false;
                events.push(GenericEvent::RequestTimerCancel(TimerKind::PingrespRecv));
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_disconnect(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::Disconnect::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                self.cancel_timers(&mut events);
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }

    fn process_recv_auth(&mut self, raw_packet: RawPacket) -> Vec<GenericEvent<PacketIdType>> {
        let mut events = Vec::new();

        match v5_0::Auth::parse(raw_packet.data_as_slice()) {
            Ok((packet, _)) => {
                events.extend(self.refresh_pingreq_recv());
                events.push(GenericEvent::NotifyPacketReceived(packet.into()));
            }
            Err(e) => {
                let disconnect = v5_0::Disconnect::builder()
                    .reason_code(DisconnectReasonCode::ProtocolError)
                    .build()
                    .unwrap();
                events.extend(self.process_send_disconnect(disconnect));
                events.push(GenericEvent::NotifyError(e));
            }
        }

        events
    }
}

/// Find the `TopicAlias` property, if present, in a property list.
fn get_topic_alias_from_props(props: &[Property]) -> Option<u16> {
    props.iter().find_map(|prop| match prop {
        Property::TopicAlias(ta) => Some(ta.val()),
        _ => None,
    })
}
