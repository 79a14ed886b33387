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

//! The async client facade layered on top of the sans-I/O protocol engine
//! in [`crate::mqtt`]: transport handling, option builders, the background
//! driver task, and the [`Client`] handle applications actually hold.

mod client;
pub(crate) mod driver;
pub mod error;
pub mod event_bus;
pub mod options;
pub mod topic;
pub mod transport;

pub use client::Client;
pub use driver::Connector;
pub use error::ClientError;
pub use event_bus::{ClientEvent, EventBus, Message, SubscriptionHandler};
pub use options::{
    ConnectOptions, ConnectResult, DisconnectOptions, PublishOptions, PublishResult,
    ReconnectOptions, SubscribeEntry, SubscribeOptions, SubscribeResult, TransportOptions,
    UnsubscribeOptions, UnsubscribeResult, Will,
};
pub use transport::{connect_tcp, Transport};
