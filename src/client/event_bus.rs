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

//! Named multicast event bus. Subscribers get a `tokio::sync::broadcast`
//! receiver; a lagging subscriber drops the oldest unread events rather than
//! blocking protocol progress, which is the isolation the spec requires of
//! handler dispatch.

use crate::mqtt::result_code::{
    ConnectReasonCode, DisconnectReasonCode, SubackReasonCode, UnsubackReasonCode,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A received application message, already resolved past any topic alias.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Arc<[u8]>,
    pub qos: crate::mqtt::packet::Qos,
    pub retain: bool,
    pub dup: bool,
}

/// Events published on the [`EventBus`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    BeforeConnect,
    AfterConnect { reason_code: ConnectReasonCode, session_present: bool },
    BeforeDisconnect,
    AfterDisconnect { reason_code: Option<DisconnectReasonCode> },
    BeforeSubscribe,
    AfterSubscribe { reason_codes: Vec<SubackReasonCode> },
    BeforeUnsubscribe,
    AfterUnsubscribe { reason_codes: Vec<UnsubackReasonCode> },
    MessageReceived(Message),
}

/// A per-subscription callback, invoked synchronously on the driver task
/// before the matching packet's protocol acknowledgement is sent. Must not
/// block; a handler that panics is caught and logged, never propagated.
pub type SubscriptionHandler = Arc<dyn Fn(&Message) + Send + Sync>;

const CHANNEL_CAPACITY: usize = 256;

/// Multicast channel of [`ClientEvent`]s. Cloning an [`EventBus`] shares the
/// same underlying channel; every clone can publish and every subscriber
/// receives every event published by any clone.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribes to the bus. Events published before this call are not
    /// delivered to this receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Returns the number of active subscribers it was
    /// delivered to; `0` subscribers is not an error (events are dropped
    /// silently when nobody is listening, as a faulting/absent handler must
    /// never affect protocol progress).
    pub fn publish(&self, event: ClientEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
