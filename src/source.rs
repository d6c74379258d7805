use std::io::Read;

use crate::errors::Result;

/// A sequential, single-pass supplier of bytes.
///
/// Implementations hand out their content through repeated
/// [`fill`](ByteSource::fill) calls, each of which must supply bytes
/// that were never supplied before; the consumer never asks for the
/// same bytes twice.
///
/// # Exhaustion contract
///
/// A fill that writes fewer bytes than the block holds, zero included,
/// is taken as proof that the source has ended, and no further fill
/// will ever be attempted on it. Sources that can legitimately come up
/// short before their real end (sockets, pipes under load) must not be
/// used directly; wrap them so that every fill is complete until the
/// true end of the data.
pub trait ByteSource {
    /// Write new bytes at the start of `block` and return how many
    /// were written. `Ok(0)` means the source is exhausted.
    fn fill(&mut self, block: &mut [u8]) -> Result<usize>;

    /// Best-effort lower bound on the bytes this source can still
    /// supply. Only used to improve availability estimates; sources
    /// with no cheap answer keep the default of zero.
    fn remaining_estimate(&self) -> usize {
        0
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn fill(&mut self, block: &mut [u8]) -> Result<usize> {
        (**self).fill(block)
    }

    fn remaining_estimate(&self) -> usize {
        (**self).remaining_estimate()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn fill(&mut self, block: &mut [u8]) -> Result<usize> {
        (**self).fill(block)
    }

    fn remaining_estimate(&self) -> usize {
        (**self).remaining_estimate()
    }
}

/// In-memory source. Fills are always complete and the estimate is
/// exact, so the exhaustion contract holds trivially.
impl ByteSource for &[u8] {
    fn fill(&mut self, block: &mut [u8]) -> Result<usize> {
        let count = self.len().min(block.len());
        let (head, rest) = self.split_at(count);
        block[..count].copy_from_slice(head);
        *self = rest;
        Ok(count)
    }

    fn remaining_estimate(&self) -> usize {
        self.len()
    }
}

/// Adapter exposing any [`Read`] implementor as a [`ByteSource`].
///
/// Every fill issues exactly one `read` call, so the exhaustion
/// contract is inherited from the reader: files and in-memory cursors
/// read fully until end of stream and are safe here, while readers
/// that return short counts mid-stream would end the stream early.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the adapter, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn fill(&mut self, block: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(block)?)
    }
}
