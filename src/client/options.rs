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

//! Surface-level option records and validators for the client facade's
//! request/response operations. These are plain data; the protocol engine
//! never sees them directly, only the packets the facade builds from them.

use crate::client::error::ClientError;
use crate::client::event_bus::SubscriptionHandler;
use crate::client::topic::{validate_topic_filter, validate_topic_name};
use crate::mqtt::packet::{Qos, RetainHandling};
use std::time::Duration;

/// Options for [`crate::client::Client::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub client_id: String,
    pub clean_start: bool,
    pub keep_alive: Duration,
    pub session_expiry_interval: Option<u32>,
    pub receive_maximum: Option<u16>,
    pub maximum_packet_size: Option<u32>,
    pub topic_alias_maximum: Option<u16>,
    pub request_response_information: bool,
    pub request_problem_information: bool,
    pub user_name: Option<String>,
    pub password: Option<Vec<u8>>,
    pub will: Option<Will>,
    pub connect_timeout: Duration,
    /// Enables an extended (SASL-style) authentication exchange. Requires a
    /// matching authentication method understood by the broker; leaving this
    /// `None` means only username/password authentication is attempted.
    pub authentication_method: Option<String>,
    pub authentication_data: Option<Vec<u8>>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            clean_start: true,
            keep_alive: Duration::from_secs(60),
            session_expiry_interval: None,
            receive_maximum: None,
            maximum_packet_size: None,
            topic_alias_maximum: None,
            request_response_information: false,
            request_problem_information: false,
            user_name: None,
            password: None,
            will: None,
            connect_timeout: Duration::from_secs(60),
            authentication_method: None,
            authentication_data: None,
        }
    }
}

impl ConnectOptions {
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.keep_alive.as_secs() > u16::MAX as u64 {
            return Err(ClientError::ArgumentInvalid {
                field: "keep_alive",
                reason: "must fit in 16 bits of seconds".into(),
            });
        }
        if self.password.is_some() && self.user_name.is_none() {
            return Err(ClientError::ArgumentInvalid {
                field: "password",
                reason: "a password requires a user name".into(),
            });
        }
        if let Some(will) = &self.will {
            validate_topic_name(&will.topic)?;
        }
        if self.authentication_data.is_some() && self.authentication_method.is_none() {
            return Err(ClientError::ArgumentInvalid {
                field: "authentication_data",
                reason: "authentication data requires an authentication method".into(),
            });
        }
        Ok(())
    }
}

/// Last Will and Testament, published by the broker on this client's behalf
/// should the connection drop uncleanly.
#[derive(Debug, Clone)]
pub struct Will {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
}

/// Result of a successful or rejected [`crate::client::Client::connect`].
#[derive(Debug, Clone)]
pub struct ConnectResult {
    pub reason_code: crate::mqtt::result_code::ConnectReasonCode,
    pub session_present: bool,
    pub assigned_client_id: Option<String>,
    pub server_keep_alive: Option<u16>,
    pub receive_maximum: Option<u16>,
    pub topic_alias_maximum: Option<u16>,
    pub session_expiry_interval: Option<u32>,
}

/// Options for [`crate::client::Client::publish`].
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
    pub response_topic: Option<String>,
    pub correlation_data: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub payload_is_utf8: bool,
    pub message_expiry_interval: Option<u32>,
    pub timeout: Option<Duration>,
}

impl PublishOptions {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, qos: Qos) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain: false,
            response_topic: None,
            correlation_data: None,
            content_type: None,
            payload_is_utf8: false,
            message_expiry_interval: None,
            timeout: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        validate_topic_name(&self.topic)
    }
}

/// Result of a [`crate::client::Client::publish`] call.
#[derive(Debug, Clone)]
pub enum PublishResult {
    /// QoS 0: fire-and-forget, no acknowledgement exists.
    Sent,
    /// QoS 1: broker's PUBACK reason code.
    Acknowledged(crate::mqtt::result_code::PubackReasonCode),
    /// QoS 2: broker's terminal PUBCOMP reason code.
    Completed(crate::mqtt::result_code::PubcompReasonCode),
}

/// One requested subscription within a [`crate::client::Client::subscribe`] call.
#[derive(Clone)]
pub struct SubscribeEntry {
    pub topic_filter: String,
    pub qos: Qos,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
    /// Invoked for every message matching this filter, before the global
    /// `MessageReceived` event bus subscribers see it.
    pub handler: Option<SubscriptionHandler>,
}

impl std::fmt::Debug for SubscribeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscribeEntry")
            .field("topic_filter", &self.topic_filter)
            .field("qos", &self.qos)
            .field("no_local", &self.no_local)
            .field("retain_as_published", &self.retain_as_published)
            .field("retain_handling", &self.retain_handling)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl SubscribeEntry {
    pub fn new(topic_filter: impl Into<String>, qos: Qos) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::SendRetained,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: SubscriptionHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// Options for [`crate::client::Client::subscribe`].
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    pub entries: Vec<SubscribeEntry>,
    pub subscription_identifier: Option<u32>,
    pub timeout: Option<Duration>,
}

impl SubscribeOptions {
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.entries.is_empty() {
            return Err(ClientError::ArgumentInvalid {
                field: "entries",
                reason: "subscribe requires at least one topic filter".into(),
            });
        }
        for entry in &self.entries {
            validate_topic_filter(&entry.topic_filter)?;
        }
        Ok(())
    }
}

/// Result of a [`crate::client::Client::subscribe`] call: one reason code
/// per requested topic filter, in request order.
#[derive(Debug, Clone)]
pub struct SubscribeResult {
    pub reason_codes: Vec<crate::mqtt::result_code::SubackReasonCode>,
}

/// Options for [`crate::client::Client::unsubscribe`].
#[derive(Debug, Clone, Default)]
pub struct UnsubscribeOptions {
    pub topic_filters: Vec<String>,
    pub timeout: Option<Duration>,
}

impl UnsubscribeOptions {
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.topic_filters.is_empty() {
            return Err(ClientError::ArgumentInvalid {
                field: "topic_filters",
                reason: "unsubscribe requires at least one topic filter".into(),
            });
        }
        for filter in &self.topic_filters {
            validate_topic_filter(filter)?;
        }
        Ok(())
    }
}

/// Result of a [`crate::client::Client::unsubscribe`] call.
#[derive(Debug, Clone)]
pub struct UnsubscribeResult {
    pub reason_codes: Vec<crate::mqtt::result_code::UnsubackReasonCode>,
}

/// Options for [`crate::client::Client::disconnect`].
#[derive(Debug, Clone)]
pub struct DisconnectOptions {
    pub reason_code: crate::mqtt::result_code::DisconnectReasonCode,
    pub session_expiry_interval: Option<u32>,
}

impl Default for DisconnectOptions {
    fn default() -> Self {
        Self {
            reason_code: crate::mqtt::result_code::DisconnectReasonCode::NormalDisconnection,
            session_expiry_interval: None,
        }
    }
}

/// Transport-level connection options. The facade consumes these to open a
/// TCP stream; TLS/WebSocket layering is the caller's responsibility via a
/// custom [`crate::client::transport::Transport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub prefer_ipv6: bool,
    pub allow_invalid_broker_certificates: bool,
}

impl TransportOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls: false,
            prefer_ipv6: false,
            allow_invalid_broker_certificates: false,
        }
    }
}

/// Reconnect policy: exponential backoff on unclean disconnects.
#[derive(Debug, Clone)]
pub struct ReconnectOptions {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}
