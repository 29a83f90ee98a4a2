//! Bounded views over caller-owned buffers.
//!
//! [`Scratch`] is a shrinking arena: every call that needs transient space
//! takes it by value and hands back what is left, so several operations can
//! chain allocations from one pool without double-counting.
//!
//! [`SliceWriter`] is the output cursor used by the serializers. It never
//! writes past the end of its buffer and fails with
//! [`JWEError::BufferTooSmall`] instead.

use std::ops::Range;

use ct_codecs::{Base64UrlSafeNoPadding, Decoder, Encoder};

use crate::error::*;

/// A shrinking arena carved out of a caller-supplied buffer.
#[derive(Debug)]
pub struct Scratch<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl<'a> Scratch<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Scratch { buf, used: 0 }
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Bytes handed out since this arena was created.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Split off the first `len` bytes.
    pub fn take(self, len: usize) -> Result<(&'a mut [u8], Scratch<'a>), Error> {
        ensure!(len <= self.buf.len(), JWEError::BufferTooSmall);
        let used = self.used + len;
        let (head, tail) = self.buf.split_at_mut(len);
        Ok((head, Scratch { buf: tail, used }))
    }

    /// Copy `data` into the arena and return a view of the copy.
    pub fn store(self, data: &[u8]) -> Result<(&'a [u8], Scratch<'a>), Error> {
        let (head, rest) = self.take(data.len())?;
        head.copy_from_slice(data);
        Ok((head, rest))
    }

    /// Decode base64url (no padding) in place at the start of the arena.
    pub fn store_b64_decoded(self, b64: &str) -> Result<(&'a [u8], Scratch<'a>), Error> {
        let Scratch { buf, used } = self;
        let len = match Base64UrlSafeNoPadding::decode(buf, b64, None) {
            Ok(decoded) => decoded.len(),
            Err(ct_codecs::Error::Overflow) => bail!(JWEError::BufferTooSmall),
            Err(_) => bail!(JWEError::InvalidJWEFormat),
        };
        let (head, tail) = buf.split_at_mut(len);
        Ok((head, Scratch { buf: tail, used: used + len }))
    }
}

/// Output cursor over a caller-supplied buffer.
pub(crate) struct SliceWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub(crate) fn new(out: &'a mut [u8]) -> Self {
        SliceWriter { out, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.out.len() - self.pos
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.out[..self.pos]
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<(), Error> {
        ensure!(bytes.len() <= self.remaining(), JWEError::BufferTooSmall);
        self.out[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub(crate) fn push_str(&mut self, s: &str) -> Result<(), Error> {
        self.push(s.as_bytes())
    }

    /// Append the base64url encoding of `bin`, returning where it landed.
    pub(crate) fn push_b64(&mut self, bin: &[u8]) -> Result<Range<usize>, Error> {
        let start = self.pos;
        let n = Base64UrlSafeNoPadding::encode(&mut self.out[start..], bin)
            .map_err(|_| JWEError::BufferTooSmall)?
            .len();
        self.pos += n;
        Ok(start..self.pos)
    }

    /// Write a NUL after the content without counting it.
    pub(crate) fn terminate(&mut self) -> Result<usize, Error> {
        ensure!(self.remaining() >= 1, JWEError::BufferTooSmall);
        self.out[self.pos] = 0;
        Ok(self.pos)
    }
}
