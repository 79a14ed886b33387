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

//! Error taxonomy for the async client facade, layered over the protocol
//! engine's [`MqttError`](crate::mqtt::result_code::MqttError).

use crate::mqtt::result_code::MqttError;
use thiserror::Error;

/// Errors surfaced by [`crate::client::Client`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation requires a connected session (`Publish`/`Subscribe`/`Unsubscribe`
    /// while not `Connected`).
    #[error("not connected")]
    NotConnected,

    /// The requested transition is not valid from the current connection state
    /// (e.g. `Connect` while not `Disconnected`).
    #[error("invalid connection state for this operation")]
    InvalidState,

    /// A client-side argument failed validation before anything was put on the wire.
    #[error("invalid argument: {field}: {reason}")]
    ArgumentInvalid { field: &'static str, reason: String },

    /// The operation did not complete within its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The protocol engine rejected the operation or the connection; fatal to
    /// the connection, carries the underlying reason.
    #[error("protocol error: {0:?}")]
    Protocol(MqttError),

    /// The transport (TCP/TLS/WebSocket byte stream) failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The broker responded with a non-success MQTT reason code; the result
    /// itself (e.g. `ConnectResult`) carries the code for inspection.
    #[error("operation rejected by broker: {0}")]
    Operation(String),

    /// The client (or background driver task) was dropped while the caller
    /// was awaiting a result.
    #[error("client shut down while awaiting response")]
    Closed,
}

impl From<MqttError> for ClientError {
    fn from(e: MqttError) -> Self {
        ClientError::Protocol(e)
    }
}
