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

/// MQTT protocol version enumeration
///
/// This library implements MQTT v5.0 exclusively. `Undetermined` exists so a
/// freshly created connection has a version before the CONNECT packet's protocol
/// level byte is checked against `V5_0`; a CONNECT carrying any other protocol
/// level is rejected with `MqttError::UnsupportedProtocolVersion`.
///
/// # Examples
///
/// ```ignore
/// use mqtt5_client_core::mqtt::connection::Version;
///
/// let client_version = Version::V5_0;
/// let server_version = Version::Undetermined;
/// ```
#[derive(PartialEq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Version {
    /// Version to be determined by incoming CONNECT packet
    ///
    /// Used by MQTT servers before the first CONNECT packet has been parsed.
    /// Not a valid protocol level value itself.
    Undetermined = 0,

    /// MQTT version 5.0 (protocol level 5)
    V5_0 = 5,
}
