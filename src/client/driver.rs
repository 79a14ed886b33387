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

//! Background task driving the sans-I/O [`GenericConnection`] over a
//! [`Transport`]: one task owns the engine, the socket, every pending
//! request awaiter and the keep-alive timers. Commands arrive over an mpsc
//! channel from [`Client`](super::Client) handles; everything else (timer
//! bookkeeping, reconnects, handler dispatch) happens on this single task so
//! the engine itself never has to be shared across threads.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::mqtt::common::tracing::{debug, error, info, warn};
use crate::mqtt::connection::role::Client as ClientRole;
use crate::mqtt::connection::{Event, GenericConnection, TimerKind, Version};
use crate::mqtt::packet::{v5_0, GenericPacketTrait, Packet, Properties, Property, Qos};
use crate::mqtt::result_code::{ConnectReasonCode, MqttError};

use crate::client::error::ClientError;
use crate::client::event_bus::{ClientEvent, EventBus, Message};
use crate::client::options::{
    ConnectOptions, ConnectResult, DisconnectOptions, PublishOptions, PublishResult,
    ReconnectOptions, SubscribeOptions, SubscribeResult, UnsubscribeOptions, UnsubscribeResult,
};
use crate::client::topic::topic_matches;
use crate::client::transport::Transport;

/// Produces a freshly connected transport on demand. Invoked once up front
/// and again before every reconnect attempt, since a transport instance that
/// has failed cannot itself be "reconnected".
pub type Connector =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = std::io::Result<Box<dyn Transport>>> + Send>> + Send + Sync>;

pub(crate) enum Command {
    Connect(oneshot::Sender<Result<ConnectResult, ClientError>>),
    Disconnect(DisconnectOptions, oneshot::Sender<Result<(), ClientError>>),
    Publish(PublishOptions, oneshot::Sender<Result<PublishResult, ClientError>>),
    Subscribe(SubscribeOptions, oneshot::Sender<Result<SubscribeResult, ClientError>>),
    Unsubscribe(UnsubscribeOptions, oneshot::Sender<Result<UnsubscribeResult, ClientError>>),
    IsConnected(oneshot::Sender<bool>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Disconnected,
    Connecting,
    Connected,
    ShuttingDown,
}

enum Awaiter {
    Publish(oneshot::Sender<Result<PublishResult, ClientError>>),
    Subscribe(oneshot::Sender<Result<SubscribeResult, ClientError>>, Vec<ActiveSubscription>),
    Unsubscribe(oneshot::Sender<Result<UnsubscribeResult, ClientError>>, Vec<String>),
}

struct ActiveSubscription {
    topic_filter: String,
    handler: Option<crate::client::event_bus::SubscriptionHandler>,
}

/// Runs on its own `tokio::task`, owned by [`Client`](super::Client) through
/// a join handle plus the command sender. Exits once the command channel is
/// closed and no reconnect is pending.
pub(crate) struct Driver {
    connector: Connector,
    connect_options: ConnectOptions,
    reconnect_options: ReconnectOptions,
    events: EventBus,
    commands: mpsc::UnboundedReceiver<Command>,

    engine: GenericConnection<ClientRole, u16>,
    transport: Option<Box<dyn Transport>>,
    state: DriverState,

    connect_awaiter: Option<oneshot::Sender<Result<ConnectResult, ClientError>>>,
    /// True from the moment CONNECT is sent for the current attempt until its
    /// CONNACK (or a connect-time failure) resolves it. Unlike
    /// `connect_awaiter` — only ever populated for the caller's original
    /// `connect()` — this is set on every attempt, including unattended
    /// reconnects, so `pump_until` can tell a fresh CONNECT apart from one
    /// whose reply already arrived.
    connect_pending: bool,
    /// Set once `disconnect()` completes a clean DISCONNECT; consumed by
    /// `prepare_reconnect_or_stop` to skip reconnecting after a deliberate
    /// shutdown, as opposed to a dropped or rejected connection.
    clean_disconnect: bool,
    /// True once a CONNECT carrying an authentication method has been sent
    /// and no terminal CONNACK/AUTH has concluded the exchange; gates whether
    /// an inbound AUTH is part of that exchange or unsolicited.
    auth_in_progress: bool,
    pending: HashMap<u16, Awaiter>,
    /// QoS>0 publishes held back because the broker's `ReceiveMaximum` was
    /// exhausted; drained as in-flight slots free up.
    publish_waitq: std::collections::VecDeque<(PublishOptions, oneshot::Sender<Result<PublishResult, ClientError>>)>,
    subscriptions: Vec<ActiveSubscription>,

    pingreq_send_deadline: Option<Instant>,
    pingresp_recv_deadline: Option<Instant>,

    /// Bytes queued by `process_events` for the next `flush_pending_writes`.
    to_write: Vec<Vec<u8>>,
    recv_buf: Vec<u8>,
    reconnect_attempt: u32,
}

impl Driver {
    pub(crate) fn new(
        connector: Connector,
        connect_options: ConnectOptions,
        reconnect_options: ReconnectOptions,
        events: EventBus,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let mut engine = GenericConnection::new(Version::V5_0);
        engine.set_auto_pub_response(true);
        engine.set_auto_ping_response(true);

        Self {
            connector,
            connect_options,
            reconnect_options,
            events,
            commands,
            engine,
            transport: None,
            state: DriverState::Disconnected,
            connect_awaiter: None,
            connect_pending: false,
            clean_disconnect: false,
            auth_in_progress: false,
            pending: HashMap::new(),
            publish_waitq: std::collections::VecDeque::new(),
            subscriptions: Vec::new(),
            pingreq_send_deadline: None,
            pingresp_recv_deadline: None,
            to_write: Vec::new(),
            recv_buf: vec![0u8; 4096],
            reconnect_attempt: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            match self.state {
                DriverState::Disconnected => {
                    let Some(cmd) = self.commands.recv().await else {
                        return;
                    };
                    self.handle_idle_command(cmd).await;
                }
                DriverState::Connecting | DriverState::Connected => {
                    if !self.drive_connection().await {
                        return;
                    }
                }
                DriverState::ShuttingDown => return,
            }
        }
    }

    async fn handle_idle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(tx) => {
                self.connect_awaiter = Some(tx);
                self.state = DriverState::Connecting;
                self.reconnect_attempt = 0;
            }
            Command::IsConnected(tx) => {
                let _ = tx.send(false);
            }
            Command::Disconnect(_, tx) => {
                let _ = tx.send(Ok(()));
            }
            Command::Publish(_, tx) => {
                let _ = tx.send(Err(ClientError::NotConnected));
            }
            Command::Subscribe(_, tx) => {
                let _ = tx.send(Err(ClientError::NotConnected));
            }
            Command::Unsubscribe(_, tx) => {
                let _ = tx.send(Err(ClientError::NotConnected));
            }
            Command::Shutdown => {
                self.state = DriverState::ShuttingDown;
            }
        }
    }

    /// Runs one full connect/serve/disconnect cycle, reconnecting per
    /// [`ReconnectOptions`] on an unclean drop. Returns `false` once the
    /// driver should stop entirely (explicit shutdown, or reconnect disabled
    /// and exhausted).
    async fn drive_connection(&mut self) -> bool {
        match self.connect_once().await {
            Ok(()) => {}
            Err(e) => {
                self.fail_connect_awaiter(e);
                return self.prepare_reconnect_or_stop().await;
            }
        }

        self.serve().await;

        if self.state == DriverState::ShuttingDown {
            return false;
        }
        self.prepare_reconnect_or_stop().await
    }

    async fn connect_once(&mut self) -> Result<(), ClientError> {
        self.connect_options.validate()?;

        let transport = (self.connector)().await?;
        self.transport = Some(transport);
        self.engine.notify_closed();

        let mut builder = v5_0::Connect::builder()
            .client_id(&self.connect_options.client_id)?
            .clean_start(self.connect_options.clean_start)
            .keep_alive(self.connect_options.keep_alive.as_secs() as u16);

        if let Some(will) = &self.connect_options.will {
            builder = builder.will_message(&will.topic, &will.payload, will.qos, will.retain)?;
        }
        if let Some(user_name) = &self.connect_options.user_name {
            builder = builder.user_name(user_name)?;
        }
        if let Some(password) = &self.connect_options.password {
            builder = builder.password(password)?;
        }

        let mut props = Properties::new();
        if let Some(v) = self.connect_options.session_expiry_interval {
            props.push(Property::SessionExpiryInterval(
                crate::mqtt::packet::SessionExpiryInterval::new(v)?,
            ));
        }
        if let Some(v) = self.connect_options.receive_maximum {
            props.push(Property::ReceiveMaximum(crate::mqtt::packet::ReceiveMaximum::new(v)?));
        }
        if let Some(v) = self.connect_options.topic_alias_maximum {
            props.push(Property::TopicAliasMaximum(
                crate::mqtt::packet::TopicAliasMaximum::new(v)?,
            ));
        }
        if let Some(v) = self.connect_options.maximum_packet_size {
            props.push(Property::MaximumPacketSize(
                crate::mqtt::packet::MaximumPacketSize::new(v)?,
            ));
        }
        if self.connect_options.request_response_information {
            props.push(Property::RequestResponseInformation(
                crate::mqtt::packet::RequestResponseInformation::new(1)?,
            ));
        }
        if self.connect_options.request_problem_information {
            props.push(Property::RequestProblemInformation(
                crate::mqtt::packet::RequestProblemInformation::new(1)?,
            ));
        }
        if let Some(method) = &self.connect_options.authentication_method {
            props.push(Property::AuthenticationMethod(
                crate::mqtt::packet::AuthenticationMethod::new(method)?,
            ));
        }
        if let Some(data) = &self.connect_options.authentication_data {
            props.push(Property::AuthenticationData(
                crate::mqtt::packet::AuthenticationData::new(data.clone())?,
            ));
        }
        if !props.is_empty() {
            builder = builder.props(props);
        }

        self.auth_in_progress = self.connect_options.authentication_method.is_some();

        let connect = builder.build().map_err(ClientError::from)?;
        self.send_packet(Packet::Connect(connect)).await?;
        self.connect_pending = true;

        self.pump_until(
            Duration::from_secs(self.connect_options.connect_timeout.as_secs().max(1)),
            |this| this.state == DriverState::Connected || !this.connect_pending,
        )
        .await
    }

    /// Pumps reads off the transport (and processes any already-queued
    /// engine events) until `done` is satisfied or `timeout` elapses.
    async fn pump_until(
        &mut self,
        timeout: Duration,
        done: impl Fn(&Self) -> bool,
    ) -> Result<(), ClientError> {
        let deadline = Instant::now() + timeout;
        while !done(self) {
            if Instant::now() >= deadline {
                return Err(ClientError::Timeout);
            }
            if !self.read_once(Instant::now() + Duration::from_millis(250)).await? {
                return Err(ClientError::Closed);
            }
        }
        Ok(())
    }

    /// Serves the connection until it closes, translating transport reads,
    /// keep-alive timer firings, and facade commands into engine calls.
    async fn serve(&mut self) {
        loop {
            if self.state != DriverState::Connected {
                return;
            }

            let sleep = self.earliest_timer_deadline();

            tokio::select! {
                biased;

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Shutdown) => {
                            self.state = DriverState::ShuttingDown;
                            let _ = self.disconnect_now(DisconnectOptions::default()).await;
                            return;
                        }
                        Some(other) => self.handle_connected_command(other).await,
                        None => {
                            self.state = DriverState::ShuttingDown;
                            let _ = self.disconnect_now(DisconnectOptions::default()).await;
                            return;
                        }
                    }
                }

                result = self.read_once_forever() => {
                    match result {
                        Ok(true) => {}
                        Ok(false) | Err(_) => {
                            self.on_transport_closed();
                            return;
                        }
                    }
                }

                _ = sleep_until_opt(sleep) => {
                    if self.fire_due_timers().await.is_err() {
                        self.on_transport_closed();
                        return;
                    }
                }
            }
        }
    }

    fn earliest_timer_deadline(&self) -> Option<Instant> {
        [self.pingreq_send_deadline, self.pingresp_recv_deadline]
            .into_iter()
            .flatten()
            .min()
    }

    async fn fire_due_timers(&mut self) -> Result<(), ClientError> {
        let now = Instant::now();
        let mut events = Vec::new();
        if let Some(d) = self.pingreq_send_deadline {
            if now >= d {
                self.pingreq_send_deadline = None;
                events.extend(self.engine.notify_timer_fired(TimerKind::PingreqSend));
            }
        }
        if let Some(d) = self.pingresp_recv_deadline {
            if now >= d {
                self.pingresp_recv_deadline = None;
                events.extend(self.engine.notify_timer_fired(TimerKind::PingrespRecv));
            }
        }
        self.process_events(events);
        self.flush_pending_writes().await
    }

    async fn read_once_forever(&mut self) -> Result<bool, ClientError> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(false);
        };
        let n = transport.read(&mut self.recv_buf).await?;
        if n == 0 {
            return Ok(false);
        }
        let mut cursor = crate::mqtt::common::Cursor::new(&self.recv_buf[..n]);
        let events = self.engine.recv(&mut cursor);
        self.process_events(events);
        self.flush_pending_writes().await?;
        Ok(true)
    }

    /// Same as [`Self::read_once_forever`] but bounded, used while a
    /// synchronous handshake await is in progress.
    async fn read_once(&mut self, deadline: Instant) -> Result<bool, ClientError> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(false);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, transport.read(&mut self.recv_buf)).await {
            Ok(Ok(0)) => Ok(false),
            Ok(Ok(n)) => {
                let mut cursor = crate::mqtt::common::Cursor::new(&self.recv_buf[..n]);
                let events = self.engine.recv(&mut cursor);
                self.process_events(events);
                self.flush_pending_writes().await?;
                Ok(true)
            }
            Ok(Err(e)) => Err(ClientError::from(e)),
            Err(_) => Ok(true),
        }
    }

    fn on_transport_closed(&mut self) {
        self.transport = None;
        let events = self.engine.notify_closed();
        self.process_events(events);
        self.to_write.clear();
        self.fail_all_pending(ClientError::Closed);
        for (_, tx) in self.publish_waitq.drain(..) {
            let _ = tx.send(Err(ClientError::Closed));
        }
        self.events.publish(ClientEvent::AfterDisconnect { reason_code: None });
    }

    async fn handle_connected_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(tx) => {
                let _ = tx.send(Err(ClientError::InvalidState));
            }
            Command::IsConnected(tx) => {
                let _ = tx.send(self.state == DriverState::Connected);
            }
            Command::Disconnect(opts, tx) => match self.disconnect_now(opts).await {
                Ok(()) => {
                    self.state = DriverState::Disconnected;
                    self.clean_disconnect = true;
                    let _ = tx.send(Ok(()));
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            },
            Command::Publish(opts, tx) => self.start_publish(opts, tx).await,
            Command::Subscribe(opts, tx) => self.start_subscribe(opts, tx).await,
            Command::Unsubscribe(opts, tx) => self.start_unsubscribe(opts, tx).await,
            Command::Shutdown => unreachable!("handled by caller"),
        }
    }

    async fn disconnect_now(&mut self, opts: DisconnectOptions) -> Result<(), ClientError> {
        self.events.publish(ClientEvent::BeforeDisconnect);
        let mut builder = v5_0::Disconnect::builder().reason_code(opts.reason_code);
        if let Some(v) = opts.session_expiry_interval {
            let mut props = Properties::new();
            props.push(Property::SessionExpiryInterval(
                crate::mqtt::packet::SessionExpiryInterval::new(v)?,
            ));
            builder = builder.props(props);
        }
        let disconnect = builder.build().map_err(ClientError::from)?;
        self.send_packet(Packet::Disconnect(disconnect)).await?;
        if let Some(transport) = self.transport.as_mut() {
            let _ = transport.shutdown().await;
        }
        self.transport = None;
        self.engine.notify_closed();
        self.events.publish(ClientEvent::AfterDisconnect { reason_code: Some(opts.reason_code) });
        Ok(())
    }

    async fn start_publish(
        &mut self,
        opts: PublishOptions,
        tx: oneshot::Sender<Result<PublishResult, ClientError>>,
    ) {
        if opts.qos != Qos::AtMostOnce
            && self.engine.get_receive_maximum_vacancy_for_send() == Some(0)
        {
            // Broker's ReceiveMaximum is exhausted: hold this publish at the
            // pipeline boundary until a PUBACK/PUBCOMP (or failed PUBREC)
            // frees a slot, rather than surfacing a spurious protocol error.
            self.publish_waitq.push_back((opts, tx));
            return;
        }
        match self.try_start_publish(opts).await {
            Ok(Ok(sent)) => {
                let _ = tx.send(Ok(sent));
            }
            Ok(Err(packet_id)) => {
                self.pending.insert(packet_id, Awaiter::Publish(tx));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    }

    /// Releases as many queued QoS>0 publishes as the broker's
    /// `ReceiveMaximum` currently allows. Invoked after every PUBACK,
    /// PUBCOMP, and failed PUBREC, since each frees one in-flight slot.
    fn drain_publish_waitq(&mut self) {
        while !self.publish_waitq.is_empty() {
            let vacancy = self.engine.get_receive_maximum_vacancy_for_send();
            if vacancy == Some(0) {
                break;
            }
            let Some((opts, tx)) = self.publish_waitq.pop_front() else { break };
            match self.try_start_publish_inner(opts) {
                Ok(Ok(sent)) => {
                    let _ = tx.send(Ok(sent));
                }
                Ok(Err(packet_id)) => {
                    self.pending.insert(packet_id, Awaiter::Publish(tx));
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            }
        }
    }

    /// `Ok(Ok(Sent))` for QoS 0 (already resolved); `Ok(Err(packet_id))` for
    /// QoS>0 (caller registers the awaiter); `Err` on any failure before the
    /// packet reached the wire.
    async fn try_start_publish(
        &mut self,
        opts: PublishOptions,
    ) -> Result<Result<PublishResult, u16>, ClientError> {
        let result = self.try_start_publish_inner(opts)?;
        self.flush_pending_writes().await?;
        Ok(result)
    }

    /// Builds and hands the PUBLISH to the engine, queuing its wire bytes on
    /// `self.to_write` without flushing. Kept synchronous so
    /// [`Self::drain_publish_waitq`] can call it from inside
    /// [`Self::process_events`]; every caller is responsible for flushing
    /// afterward.
    fn try_start_publish_inner(
        &mut self,
        opts: PublishOptions,
    ) -> Result<Result<PublishResult, u16>, ClientError> {
        opts.validate()?;

        let mut builder =
            v5_0::Publish::builder().topic_name(&opts.topic)?.qos(opts.qos).retain(opts.retain);

        let mut props = Properties::new();
        if let Some(t) = &opts.response_topic {
            props.push(Property::ResponseTopic(crate::mqtt::packet::ResponseTopic::new(t)?));
        }
        if let Some(d) = &opts.correlation_data {
            props.push(Property::CorrelationData(crate::mqtt::packet::CorrelationData::new(
                d.clone(),
            )?));
        }
        if let Some(c) = &opts.content_type {
            props.push(Property::ContentType(crate::mqtt::packet::ContentType::new(c)?));
        }
        if let Some(e) = opts.message_expiry_interval {
            props.push(Property::MessageExpiryInterval(
                crate::mqtt::packet::MessageExpiryInterval::new(e)?,
            ));
        }
        if !props.is_empty() {
            builder = builder.props(props);
        }
        builder = builder.payload(opts.payload);

        let packet_id = if opts.qos == Qos::AtMostOnce {
            None
        } else {
            let id = self.engine.acquire_packet_id().map_err(ClientError::from)?;
            builder = builder.packet_id(id);
            Some(id)
        };

        let publish = builder.build().map_err(ClientError::from)?;

        let events = self.engine.send(Packet::Publish(publish));
        self.process_events(events);

        match packet_id {
            None => Ok(Ok(PublishResult::Sent)),
            Some(id) => Ok(Err(id)),
        }
    }

    async fn start_subscribe(
        &mut self,
        opts: SubscribeOptions,
        tx: oneshot::Sender<Result<SubscribeResult, ClientError>>,
    ) {
        match self.try_start_subscribe(opts).await {
            Ok((id, staged)) => {
                self.pending.insert(id, Awaiter::Subscribe(tx, staged));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    }

    async fn try_start_subscribe(
        &mut self,
        opts: SubscribeOptions,
    ) -> Result<(u16, Vec<ActiveSubscription>), ClientError> {
        opts.validate()?;
        self.events.publish(ClientEvent::BeforeSubscribe);

        let id = self.engine.acquire_packet_id().map_err(ClientError::from)?;

        let mut entries = Vec::with_capacity(opts.entries.len());
        for e in &opts.entries {
            let sub_opts = crate::mqtt::packet::SubOpts::new()
                .set_qos(e.qos)
                .set_nl(e.no_local)
                .set_rap(e.retain_as_published)
                .set_rh(e.retain_handling);
            entries.push(crate::mqtt::packet::SubEntry::new(&e.topic_filter, sub_opts)?);
        }

        let mut props = Properties::new();
        if let Some(sub_id) = opts.subscription_identifier {
            props.push(Property::SubscriptionIdentifier(
                crate::mqtt::packet::SubscriptionIdentifier::new(sub_id)?,
            ));
        }

        let mut builder = v5_0::Subscribe::builder().packet_id(id).entries(entries);
        if !props.is_empty() {
            builder = builder.props(props);
        }
        let subscribe = builder.build().map_err(ClientError::from)?;

        let events = self.engine.send(Packet::Subscribe(subscribe));
        self.process_events(events);
        self.flush_pending_writes().await?;

        // Not yet added to `self.subscriptions`: only entries whose SUBACK
        // reason code comes back as a success value become active, so a
        // rejected filter (e.g. `NotAuthorized`) never receives messages.
        let staged = opts
            .entries
            .into_iter()
            .map(|entry| ActiveSubscription { topic_filter: entry.topic_filter, handler: entry.handler })
            .collect();
        Ok((id, staged))
    }

    async fn start_unsubscribe(
        &mut self,
        opts: UnsubscribeOptions,
        tx: oneshot::Sender<Result<UnsubscribeResult, ClientError>>,
    ) {
        match self.try_start_unsubscribe(opts).await {
            Ok((id, topic_filters)) => {
                self.pending.insert(id, Awaiter::Unsubscribe(tx, topic_filters));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    }

    async fn try_start_unsubscribe(
        &mut self,
        opts: UnsubscribeOptions,
    ) -> Result<(u16, Vec<String>), ClientError> {
        opts.validate()?;
        self.events.publish(ClientEvent::BeforeUnsubscribe);

        let id = self.engine.acquire_packet_id().map_err(ClientError::from)?;
        let builder = v5_0::Unsubscribe::builder()
            .packet_id(id)
            .entries(opts.topic_filters.iter().cloned())
            .map_err(ClientError::from)?;
        let unsubscribe = builder.build().map_err(ClientError::from)?;

        let events = self.engine.send(Packet::Unsubscribe(unsubscribe));
        self.process_events(events);
        self.flush_pending_writes().await?;
        // Entries are only dropped from `self.subscriptions` once UNSUBACK
        // confirms them; a rejected filter must keep dispatching messages.
        Ok((id, opts.topic_filters))
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), ClientError> {
        let events = self.engine.send(packet);
        self.process_events(events);
        self.flush_pending_writes().await
    }

    /// Writes are actually performed here, queued on `self.to_write` by
    /// `process_events`; kept separate so `process_events` stays sync and
    /// callable from both async and timer contexts.
    async fn flush_pending_writes(&mut self) -> Result<(), ClientError> {
        let buffers = std::mem::take(&mut self.to_write);
        if buffers.is_empty() {
            return Ok(());
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        for buf in buffers {
            transport.write_all(&buf).await?;
        }
        transport.flush().await?;
        Ok(())
    }

    fn process_events(&mut self, events: Vec<Event>) {
        for event in events {
            match event {
                Event::RequestSendPacket { packet, release_packet_id_if_send_error: _ } => {
                    self.to_write.push(packet.to_continuous_buffer());
                }
                Event::NotifyPacketReceived(packet) => self.on_packet_received(packet),
                Event::NotifyPacketIdReleased(_id) => {}
                Event::RequestTimerReset { kind, duration_ms } => {
                    let deadline = Instant::now() + Duration::from_millis(duration_ms);
                    match kind {
                        TimerKind::PingreqSend => self.pingreq_send_deadline = Some(deadline),
                        TimerKind::PingreqRecv => {}
                        TimerKind::PingrespRecv => self.pingresp_recv_deadline = Some(deadline),
                    }
                }
                Event::RequestTimerCancel(kind) => match kind {
                    TimerKind::PingreqSend => self.pingreq_send_deadline = None,
                    TimerKind::PingreqRecv => {}
                    TimerKind::PingrespRecv => self.pingresp_recv_deadline = None,
                },
                Event::NotifyError(e) => self.on_protocol_error(e),
                Event::RequestClose => {
                    self.transport = None;
                }
            }
        }
    }

    fn on_protocol_error(&mut self, e: MqttError) {
        error!("protocol error: {e:?}");
        self.fail_connect_awaiter(ClientError::from(e));
        self.fail_all_pending(ClientError::from(e));
    }

    fn on_packet_received(&mut self, packet: Packet) {
        match packet {
            Packet::Connack(p) => {
                let reason_code = p.reason_code();
                let session_present = p.session_present();
                let result = ConnectResult {
                    reason_code,
                    session_present,
                    assigned_client_id: find_string_prop(p.props(), |prop| match prop {
                        Property::AssignedClientIdentifier(v) => Some(v.val().to_string()),
                        _ => None,
                    }),
                    server_keep_alive: find_u16_prop(p.props(), |prop| match prop {
                        Property::ServerKeepAlive(v) => Some(v.val()),
                        _ => None,
                    }),
                    receive_maximum: find_u16_prop(p.props(), |prop| match prop {
                        Property::ReceiveMaximum(v) => Some(v.val()),
                        _ => None,
                    }),
                    topic_alias_maximum: find_u16_prop(p.props(), |prop| match prop {
                        Property::TopicAliasMaximum(v) => Some(v.val()),
                        _ => None,
                    }),
                    session_expiry_interval: find_u32_prop(p.props(), |prop| match prop {
                        Property::SessionExpiryInterval(v) => Some(v.val()),
                        _ => None,
                    }),
                };

                self.connect_pending = false;
                self.auth_in_progress = false;
                if reason_code == ConnectReasonCode::Success {
                    self.state = DriverState::Connected;
                    self.reconnect_attempt = 0;
                    info!("connected, session_present={session_present}");
                } else {
                    self.state = DriverState::Disconnected;
                }
                self.events.publish(ClientEvent::AfterConnect { reason_code, session_present });
                if let Some(tx) = self.connect_awaiter.take() {
                    let _ = tx.send(Ok(result));
                }
            }
            Packet::Puback(p) => {
                if let Some(Awaiter::Publish(tx)) = self.pending.remove(&p.packet_id()) {
                    let rc = p.reason_code().unwrap_or(crate::mqtt::result_code::PubackReasonCode::Success);
                    let _ = tx.send(Ok(PublishResult::Acknowledged(rc)));
                }
                self.drain_publish_waitq();
            }
            Packet::Pubcomp(p) => {
                if let Some(Awaiter::Publish(tx)) = self.pending.remove(&p.packet_id()) {
                    let rc =
                        p.reason_code().unwrap_or(crate::mqtt::result_code::PubcompReasonCode::Success);
                    let _ = tx.send(Ok(PublishResult::Completed(rc)));
                }
                self.drain_publish_waitq();
            }
            Packet::Suback(p) => {
                if let Some(Awaiter::Subscribe(tx, staged)) = self.pending.remove(&p.packet_id()) {
                    let reason_codes = p.reason_codes();
                    // Only entries whose reason code came back as a success
                    // value become active; a rejected filter's handler never
                    // fires.
                    self.subscriptions.extend(
                        staged
                            .into_iter()
                            .zip(reason_codes.iter())
                            .filter(|(_, rc)| rc.is_success())
                            .map(|(entry, _)| entry),
                    );
                    self.events
                        .publish(ClientEvent::AfterSubscribe { reason_codes: reason_codes.clone() });
                    let _ = tx.send(Ok(SubscribeResult { reason_codes }));
                }
            }
            Packet::Unsuback(p) => {
                if let Some(Awaiter::Unsubscribe(tx, topic_filters)) =
                    self.pending.remove(&p.packet_id())
                {
                    let reason_codes = p.reason_codes();
                    let confirmed: Vec<&String> = topic_filters
                        .iter()
                        .zip(reason_codes.iter())
                        .filter(|(_, rc)| rc.is_success())
                        .map(|(filter, _)| filter)
                        .collect();
                    self.subscriptions.retain(|s| !confirmed.contains(&&s.topic_filter));
                    self.events.publish(ClientEvent::AfterUnsubscribe {
                        reason_codes: reason_codes.clone(),
                    });
                    let _ = tx.send(Ok(UnsubscribeResult { reason_codes }));
                }
            }
            Packet::Pubrec(p) => {
                let failed = p
                    .reason_code()
                    .map(|rc| rc != crate::mqtt::result_code::PubrecReasonCode::Success)
                    .unwrap_or(false);
                if failed {
                    if let Some(Awaiter::Publish(tx)) = self.pending.remove(&p.packet_id()) {
                        let _ = tx.send(Err(ClientError::Operation(format!(
                            "PUBREC rejected: {:?}",
                            p.reason_code()
                        ))));
                    }
                    self.drain_publish_waitq();
                }
            }
            Packet::Publish(p) => self.on_publish_received(p),
            Packet::Disconnect(p) => {
                warn!("server sent DISCONNECT: {:?}", p.reason_code());
                self.state = DriverState::Disconnected;
            }
            Packet::Auth(p) => {
                if self.auth_in_progress {
                    // Extended-auth continuation; the exchange concludes via
                    // CONNACK, which already clears `auth_in_progress`.
                    debug!("AUTH received: {:?}", p.reason_code());
                } else {
                    warn!("unsolicited AUTH received");
                    self.on_protocol_error(MqttError::ProtocolError);
                }
            }
            _ => {}
        }
    }

    fn on_publish_received(&mut self, p: v5_0::Publish) {
        let message = Message {
            topic: p.topic_name().to_string(),
            payload: Arc::from(p.payload().as_slice()),
            qos: p.qos(),
            retain: p.retain(),
            dup: p.dup(),
        };

        for sub in &self.subscriptions {
            if !topic_matches(&sub.topic_filter, &message.topic) {
                continue;
            }
            if let Some(handler) = &sub.handler {
                let handler = handler.clone();
                let msg = message.clone();
                if std::panic::catch_unwind(AssertUnwindSafe(move || handler(&msg))).is_err() {
                    error!("subscription handler for {:?} panicked", sub.topic_filter);
                }
            }
        }

        self.events.publish(ClientEvent::MessageReceived(message));
    }

    fn fail_connect_awaiter(&mut self, e: ClientError) {
        if let Some(tx) = self.connect_awaiter.take() {
            let _ = tx.send(Err(e));
        }
    }

    fn fail_all_pending(&mut self, make_err: ClientError) {
        for (_, awaiter) in self.pending.drain() {
            match awaiter {
                Awaiter::Publish(tx) => {
                    let _ = tx.send(Err(clone_err(&make_err)));
                }
                Awaiter::Subscribe(tx, _) => {
                    let _ = tx.send(Err(clone_err(&make_err)));
                }
                Awaiter::Unsubscribe(tx, _) => {
                    let _ = tx.send(Err(clone_err(&make_err)));
                }
            }
        }
    }

    /// Applies [`ReconnectOptions`]'s backoff and either loops back into
    /// [`Self::drive_connection`] or stops the task for good.
    async fn prepare_reconnect_or_stop(&mut self) -> bool {
        if self.state == DriverState::ShuttingDown {
            self.state = DriverState::Disconnected;
            return false;
        }

        if self.clean_disconnect {
            // An explicit Client::disconnect() never re-engages backoff,
            // unlike a dropped transport or a rejected CONNACK.
            self.clean_disconnect = false;
            self.state = DriverState::Disconnected;
            return true;
        }

        if !self.reconnect_options.enabled {
            self.state = DriverState::Disconnected;
            return true;
        }

        if let Some(max) = self.reconnect_options.max_attempts {
            if self.reconnect_attempt >= max {
                warn!("reconnect attempts exhausted ({max}), giving up");
                self.state = DriverState::Disconnected;
                return true;
            }
        }

        let delay = backoff_delay(&self.reconnect_options, self.reconnect_attempt);
        self.reconnect_attempt += 1;
        debug!("reconnecting in {delay:?} (attempt {})", self.reconnect_attempt);
        tokio::time::sleep(delay).await;

        self.state = DriverState::Connecting;
        true
    }
}

fn backoff_delay(opts: &ReconnectOptions, attempt: u32) -> Duration {
    let scaled = opts.initial_delay.saturating_mul(1u32 << attempt.min(16));
    scaled.min(opts.max_delay)
}

fn clone_err(e: &ClientError) -> ClientError {
    match e {
        ClientError::NotConnected => ClientError::NotConnected,
        ClientError::InvalidState => ClientError::InvalidState,
        ClientError::Timeout => ClientError::Timeout,
        ClientError::Closed => ClientError::Closed,
        ClientError::Operation(s) => ClientError::Operation(s.clone()),
        ClientError::ArgumentInvalid { field, reason } => {
            ClientError::ArgumentInvalid { field: *field, reason: reason.clone() }
        }
        ClientError::Protocol(_) | ClientError::Transport(_) => ClientError::Closed,
    }
}

fn find_u16_prop(props: &Properties, f: impl Fn(&Property) -> Option<u16>) -> Option<u16> {
    props.iter().find_map(f)
}

fn find_u32_prop(props: &Properties, f: impl Fn(&Property) -> Option<u32>) -> Option<u32> {
    props.iter().find_map(f)
}

fn find_string_prop(props: &Properties, f: impl Fn(&Property) -> Option<String>) -> Option<String> {
    props.iter().find_map(f)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}
