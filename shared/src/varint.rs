//! Variable-length integer codec used by the status protocol.
//!
//! Values are written as unsigned 7-bit groups, least significant group
//! first, with `0x80` set on every byte except the last. Decoding pulls one
//! byte at a time from a [`ByteSource`], which is either a finite buffer
//! ([`BufferSource`]) or a live connection ([`StreamSource`]).

use crate::error::ProbeError;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A 32-bit value never needs more than five 7-bit groups.
pub const MAX_VARINT_LEN: usize = 5;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Anything a varint can be read from, one byte at a time.
#[async_trait]
pub trait ByteSource {
    /// Returns the next byte, or an error once the source is exhausted.
    async fn read_byte(&mut self) -> io::Result<u8>;
}

/// Byte source over an in-memory response body.
#[derive(Debug, Clone)]
pub struct BufferSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Takes the next `len` bytes, or `None` if fewer remain.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }
}

#[async_trait]
impl<'a> ByteSource for BufferSource<'a> {
    async fn read_byte(&mut self) -> io::Result<u8> {
        match self.data.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                Ok(byte)
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "buffer exhausted",
            )),
        }
    }
}

/// Byte source over a live connection. Borrows the stream so the caller
/// keeps ownership for the reads that follow the varint.
#[derive(Debug)]
pub struct StreamSource<'a, R> {
    inner: &'a mut R,
}

impl<'a, R> StreamSource<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<'a, R> ByteSource for StreamSource<'a, R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_byte(&mut self) -> io::Result<u8> {
        self.inner.read_u8().await
    }
}

/// Appends the varint encoding of `value` to `buf`.
///
/// The raw bit pattern is encoded, so negative values take five bytes.
pub fn encode_varint(value: i32, buf: &mut Vec<u8>) {
    let mut value = value as u32;
    loop {
        if value & !(SEGMENT_BITS as u32) == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
}

/// Number of bytes [`encode_varint`] would write for `value`.
pub fn varint_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Reads one varint from `source`.
///
/// Fails with [`ProbeError::MalformedVarint`] when the source ends before a
/// terminal byte, or when a fifth byte still carries the continuation bit.
pub async fn decode_varint<S>(source: &mut S) -> Result<i32, ProbeError>
where
    S: ByteSource + Send + ?Sized,
{
    let mut result: u32 = 0;

    for group in 0..MAX_VARINT_LEN {
        let byte = source
            .read_byte()
            .await
            .map_err(|_| ProbeError::MalformedVarint("source ended mid-varint"))?;

        result |= ((byte & SEGMENT_BITS) as u32) << (7 * group);

        if byte & CONTINUE_BIT == 0 {
            return Ok(result as i32);
        }
    }

    Err(ProbeError::MalformedVarint("varint longer than 5 bytes"))
}
