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

/// Errors that can occur when reading from a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    /// Attempted to read beyond the end of the data
    UnexpectedEof,
}

/// A cursor which wraps an in-memory buffer and provides positioned reading.
///
/// This mirrors the read-only subset of `std::io::Cursor` used by the packet
/// builder and codec: sequential reads with a tracked byte position.
pub struct Cursor<T> {
    inner: T,
    pos: u64,
}

impl<T> Cursor<T> {
    /// Creates a new cursor with the provided data, starting at position 0.
    #[inline]
    pub fn new(inner: T) -> Self {
        Cursor { inner, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: u64) {
        self.pos = pos;
    }

    #[inline]
    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

impl Cursor<&[u8]> {
    /// Returns the unread slice from the current position to the end.
    #[inline]
    pub fn remaining_slice(&self) -> &[u8] {
        let pos = self.pos as usize;
        if pos <= self.inner.len() {
            &self.inner[pos..]
        } else {
            &[]
        }
    }

    /// Reads exactly `count` bytes, advancing the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Option<&[u8]> {
        let pos = self.pos as usize;
        if pos.saturating_add(count) <= self.inner.len() {
            let data = &self.inner[pos..pos + count];
            self.pos += count as u64;
            Some(data)
        } else {
            None
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let pos = self.pos as usize;
        if pos < self.inner.len() {
            let val = self.inner[pos];
            self.pos += 1;
            Some(val)
        } else {
            None
        }
    }
}

impl<T: AsRef<[u8]>> Cursor<T> {
    /// Compatible with `std::io::Read::read()`.
    #[inline]
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, CursorError> {
        let pos = self.pos as usize;
        let available = self.inner.as_ref().len().saturating_sub(pos);
        let to_read = std::cmp::min(buf.len(), available);

        if to_read > 0 {
            buf[..to_read].copy_from_slice(&self.inner.as_ref()[pos..pos + to_read]);
            self.pos += to_read as u64;
        }

        Ok(to_read)
    }

    /// Compatible with `std::io::Read::read_exact()`.
    #[inline]
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CursorError> {
        let pos = self.pos as usize;
        let available = self.inner.as_ref().len().saturating_sub(pos);

        if available < buf.len() {
            return Err(CursorError::UnexpectedEof);
        }

        buf.copy_from_slice(&self.inner.as_ref()[pos..pos + buf.len()]);
        self.pos += buf.len() as u64;
        Ok(())
    }
}
