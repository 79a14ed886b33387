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

//! The public async facade: a cheap, cloneable handle to a background
//! [`Driver`] task. Every operation is a command sent over an mpsc channel
//! and a oneshot awaited for the reply; the engine and transport never
//! leave the driver task.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::client::driver::{Command, Connector, Driver};
use crate::client::error::ClientError;
use crate::client::event_bus::{ClientEvent, EventBus};
use crate::client::options::{
    ConnectOptions, ConnectResult, DisconnectOptions, PublishOptions, PublishResult,
    ReconnectOptions, SubscribeOptions, SubscribeResult, TransportOptions, UnsubscribeOptions,
    UnsubscribeResult,
};
use crate::client::transport::connect_tcp;

/// An MQTT v5.0 client handle.
///
/// Cloning a [`Client`] shares the same background driver task: every clone
/// can issue operations concurrently, and all clones observe the same
/// connection state and [`EventBus`].
#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    events: EventBus,
}

impl Client {
    /// Builds a client whose driver reconnects over transports produced by
    /// `connector`, spawning its background task on the current
    /// [`tokio`] runtime.
    ///
    /// The returned [`JoinHandle`] resolves once the driver stops, which
    /// only happens after [`Client::shutdown`] or once every [`Client`]
    /// handle (and its clones) has been dropped.
    pub fn new(
        connector: Connector,
        connect_options: ConnectOptions,
        reconnect_options: ReconnectOptions,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventBus::new();
        let driver = Driver::new(connector, connect_options, reconnect_options, events.clone(), rx);
        let handle = tokio::spawn(driver.run());
        (Self { commands: tx, events }, handle)
    }

    /// Convenience constructor for a plain TCP transport. TLS or other
    /// stream wrapping should go through [`Client::new`] with a custom
    /// [`Connector`](crate::client::driver::Connector) instead.
    pub fn with_tcp(
        transport_options: TransportOptions,
        connect_options: ConnectOptions,
        reconnect_options: ReconnectOptions,
    ) -> (Self, JoinHandle<()>) {
        let connector: Connector = std::sync::Arc::new(move || {
            let opts = transport_options.clone();
            Box::pin(async move {
                let stream = connect_tcp(&opts).await?;
                Ok(Box::new(stream) as Box<dyn crate::client::transport::Transport>)
            }) as Pin<Box<dyn Future<Output = std::io::Result<Box<dyn crate::client::transport::Transport>>> + Send>>
        });
        Self::new(connector, connect_options, reconnect_options)
    }

    /// Opens the connection: runs the transport connector, sends CONNECT,
    /// and waits for CONNACK (or the connect timeout).
    pub async fn connect(&self) -> Result<ConnectResult, ClientError> {
        self.events.publish(ClientEvent::BeforeConnect);
        let (tx, rx) = oneshot::channel();
        self.send(Command::Connect(tx))?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Sends DISCONNECT and closes the transport. The driver remains alive
    /// and will accept a subsequent [`Client::connect`] unless reconnect was
    /// already in progress.
    pub async fn disconnect(&self, options: DisconnectOptions) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Disconnect(options, tx))?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Publishes an application message. Resolves immediately for QoS 0;
    /// waits for PUBACK (QoS 1) or PUBCOMP (QoS 2) otherwise, bounded by
    /// `options.timeout` when set.
    pub async fn publish(&self, options: PublishOptions) -> Result<PublishResult, ClientError> {
        let timeout = options.timeout;
        let (tx, rx) = oneshot::channel();
        self.send(Command::Publish(options, tx))?;
        await_reply(rx, timeout).await
    }

    /// Subscribes to one or more topic filters, waiting for SUBACK, bounded
    /// by `options.timeout` when set.
    pub async fn subscribe(&self, options: SubscribeOptions) -> Result<SubscribeResult, ClientError> {
        let timeout = options.timeout;
        let (tx, rx) = oneshot::channel();
        self.send(Command::Subscribe(options, tx))?;
        await_reply(rx, timeout).await
    }

    /// Unsubscribes from one or more topic filters, waiting for UNSUBACK,
    /// bounded by `options.timeout` when set.
    pub async fn unsubscribe(
        &self,
        options: UnsubscribeOptions,
    ) -> Result<UnsubscribeResult, ClientError> {
        let timeout = options.timeout;
        let (tx, rx) = oneshot::channel();
        self.send(Command::Unsubscribe(options, tx))?;
        await_reply(rx, timeout).await
    }

    /// Reports whether the driver currently considers itself connected.
    /// Best-effort: the state may change between this call returning and
    /// the caller's next operation.
    pub async fn is_connected(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.send(Command::IsConnected(tx)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Subscribes to the client's [`ClientEvent`] bus (connection lifecycle
    /// and received messages not claimed by a per-subscription handler).
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Stops the driver task permanently: sends DISCONNECT if connected,
    /// then exits rather than reconnecting. Any [`Client`] clone can still
    /// be called afterward but every operation will fail with
    /// [`ClientError::Closed`].
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).map_err(|_| ClientError::Closed)
    }
}

/// Awaits a command reply, racing it against `timeout` when set. `None`
/// means wait indefinitely, bounded in practice only by the driver's own
/// keep-alive/reconnect behavior.
async fn await_reply<T>(
    rx: oneshot::Receiver<Result<T, ClientError>>,
    timeout: Option<Duration>,
) -> Result<T, ClientError> {
    match timeout {
        Some(d) => match tokio::time::timeout(d, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout),
        },
        None => rx.await.map_err(|_| ClientError::Closed)?,
    }
}
