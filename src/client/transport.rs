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

//! The byte-stream abstraction the protocol engine is driven over.
//!
//! TCP/TLS/DNS/WebSocket are explicitly out of the engine's scope; this
//! module supplies only a plain TCP connector (honoring [`TransportOptions`])
//! and the [`Transport`] marker trait any `AsyncRead + AsyncWrite` stream
//! already satisfies. TLS is the caller's responsibility: hand the client a
//! `tokio_rustls`/`native-tls` stream instead of a bare [`tokio::net::TcpStream`]
//! and it works unchanged.

use crate::client::options::TransportOptions;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpStream};

/// A bidirectional byte stream the connection engine can be driven over.
/// Any type implementing `AsyncRead + AsyncWrite + Unpin + Send` qualifies,
/// including [`tokio::net::TcpStream`] and TLS-wrapped streams.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Resolves `options.host` and opens a plain TCP connection, preferring the
/// AAAA record when `options.prefer_ipv6` is set and DNS returned both
/// families.
///
/// TLS is not performed here even when `options.use_tls` is set; the caller
/// is expected to wrap the returned stream before constructing a [`Client`]
/// when TLS is required. `use_tls`/`allow_invalid_broker_certificates` are
/// carried on [`TransportOptions`] for that caller to read.
///
/// [`Client`]: crate::client::Client
pub async fn connect_tcp(options: &TransportOptions) -> std::io::Result<TcpStream> {
    let candidates: Vec<SocketAddr> =
        lookup_host((options.host.as_str(), options.port)).await?.collect();

    if candidates.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no addresses found for {}", options.host),
        ));
    }

    let ordered: Vec<&SocketAddr> = if options.prefer_ipv6 {
        candidates
            .iter()
            .filter(|a| a.is_ipv6())
            .chain(candidates.iter().filter(|a| a.is_ipv4()))
            .collect()
    } else {
        candidates.iter().collect()
    };

    let mut last_err = None;
    for addr in ordered {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "connection attempts failed")
    }))
}
