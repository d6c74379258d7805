use std::fmt;
use std::io;

use crate::errors::Result;
use crate::source::ByteSource;

/// A lazily populated, block-organized buffer over a [`ByteSource`].
///
/// Bytes are pulled from the source in fixed-capacity blocks, and only
/// when a read or skip actually demands them. Every block ever loaded
/// is retained for the lifetime of the buffer, which keeps the whole
/// consumed prefix of the stream re-readable: record a position with
/// [`mark`](LazyBuffer::mark) and rewind to it with
/// [`reset`](LazyBuffer::reset) at any later point, no matter how much
/// has been read in between.
///
/// # Single-use mark
///
/// [`reset`](LazyBuffer::reset) consumes the mark: it rewinds to the
/// marked position and re-arms the mark at position zero. A second
/// reset without an intervening [`mark`](LazyBuffer::mark) therefore
/// rewinds to the very start of the stream, not to the previous mark.
/// Callers that rewind to the same position repeatedly must re-mark
/// after every reset.
///
/// # Memory
///
/// Blocks are never released. Retained memory equals the bytes loaded
/// from the source so far, rounded up to a whole number of blocks; it
/// is not bounded by how far the reader has advanced.
///
/// # Threading
///
/// Every reading operation takes `&mut self` and the buffer performs
/// no internal synchronization. Share an instance across threads only
/// behind external locking.
pub struct LazyBuffer<S> {
    /// Queried only when a demand outruns the already-buffered bytes.
    source: S,
    /// Size of every allocated block, in bytes.
    block_capacity: usize,
    /// Append-only store of loaded blocks, each allocated at full
    /// capacity; the logical size of the last one is derived from
    /// `buffer_size`.
    blocks: Vec<Box<[u8]>>,
    /// Total bytes loaded from the source so far.
    buffer_size: usize,
    /// Position of the next byte to read, `<= buffer_size`.
    offset: usize,
    /// Rewind target; consumed by `reset`.
    mark: usize,
    /// Set once a fill came back short or empty. After that the
    /// source is never queried again.
    exhausted: bool,
}

impl<S: ByteSource> LazyBuffer<S> {
    /// Create a buffer over `source` that loads on demand in blocks
    /// of `block_capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `block_capacity` is zero.
    pub fn new(source: S, block_capacity: usize) -> Self {
        assert!(block_capacity > 0, "Block capacity can't be zero");

        log::debug!(
            "buffer: initialized with block capacity {}",
            block_capacity
        );

        Self {
            source,
            block_capacity,
            blocks: Vec::new(),
            buffer_size: 0,
            offset: 0,
            mark: 0,
            exhausted: false,
        }
    }

    /// Read the next byte, loading from the source when it is not
    /// buffered yet. Returns `Ok(None)` once the stream is over.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        self.ensure_available(1)?;
        if self.buffer_size <= self.offset {
            return Ok(None);
        }
        let block = self.offset / self.block_capacity;
        let byte = self.blocks[block][self.offset % self.block_capacity];
        self.offset += 1;
        Ok(Some(byte))
    }

    /// Advance the read position by up to `to_skip` bytes, loading
    /// from the source as needed, and return how far it actually
    /// moved. Skipping zero bytes never touches the source.
    pub fn skip(&mut self, to_skip: usize) -> Result<usize> {
        if to_skip == 0 {
            return Ok(0);
        }
        self.ensure_available(to_skip)?;
        let skipped = to_skip.min(self.buffer_size - self.offset);
        self.offset += skipped;
        Ok(skipped)
    }

    /// Save the current position as the target for
    /// [`reset`](LazyBuffer::reset).
    ///
    /// There is no read limit to outlive: the buffer never discards
    /// history, so the marked position stays valid for the whole
    /// lifetime of the buffer.
    pub fn mark(&mut self) {
        self.mark = self.offset;
    }

    /// Rewind the read position to the marked position and consume
    /// the mark.
    ///
    /// The mark is single-use: after this call it points at position
    /// zero, so resetting again without an intervening
    /// [`mark`](LazyBuffer::mark) rewinds to the start of the stream.
    pub fn reset(&mut self) {
        self.offset = self.mark;
        self.mark = 0;
    }

    /// Lower bound on the bytes still readable: what is buffered but
    /// not yet consumed, plus whatever the source estimates it can
    /// still supply.
    pub fn available(&self) -> usize {
        self.buffer_size - self.offset + self.source.remaining_estimate()
    }

    /// Number of blocks loaded so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total bytes loaded from the source so far.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Current rewind target.
    pub fn mark_position(&self) -> usize {
        self.mark
    }

    /// Get a reference to the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    ///
    /// Bytes taken straight from the source bypass the buffer and are
    /// lost to it; use with care.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwrap the buffer, returning the underlying source and
    /// dropping all buffered blocks.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Load blocks until `needed` bytes past the current position are
    /// buffered or the source runs out. Nothing is recorded about a
    /// fill that fails, so retrying is always safe.
    fn ensure_available(&mut self, needed: usize) -> Result<()> {
        let target = self.offset.saturating_add(needed);
        while !self.exhausted && self.buffer_size < target {
            let loaded = self.load_block()?;
            self.buffer_size += loaded;
            if loaded < self.block_capacity {
                self.exhausted = true;
                log::debug!(
                    "buffer: source exhausted after {} bytes in {} blocks",
                    self.buffer_size,
                    self.blocks.len()
                );
            }
        }
        Ok(())
    }

    /// Fill one fresh block from the source and return how many bytes
    /// it supplied. The block is appended only when the fill produced
    /// bytes; an empty fill leaves the store untouched.
    fn load_block(&mut self) -> Result<usize> {
        let mut block = vec![0u8; self.block_capacity].into_boxed_slice();
        let loaded = self.source.fill(&mut block)?;
        debug_assert!(
            loaded <= self.block_capacity,
            "Source supplied more bytes than the block holds"
        );
        if loaded == 0 {
            return Ok(0);
        }
        self.blocks.push(block);
        log::trace!(
            "buffer: loaded block {} with {} bytes",
            self.blocks.len() - 1,
            loaded
        );
        Ok(loaded)
    }

    /// Logical size of the block at `index`: full capacity for every
    /// block except the last, which only holds the tail of
    /// `buffer_size`.
    fn block_size(&self, index: usize) -> usize {
        if index + 1 < self.blocks.len() {
            return self.block_capacity;
        }
        let tail = self.buffer_size % self.block_capacity;
        if tail == 0 {
            self.block_capacity
        } else {
            tail
        }
    }

    /// Copy already-buffered bytes from the current position into
    /// `out`, spanning blocks as necessary, and advance the position.
    fn copy_buffered(&mut self, out: &mut [u8]) -> usize {
        let mut copied = 0;
        let mut current = self.offset / self.block_capacity;
        while copied < out.len() && current < self.blocks.len() {
            let offset_in_block = self.offset % self.block_capacity;
            let in_block = self.block_size(current) - offset_in_block;
            let to_copy = in_block.min(out.len() - copied);
            let block = &self.blocks[current];
            out[copied..copied + to_copy].copy_from_slice(
                &block[offset_in_block..offset_in_block + to_copy],
            );
            copied += to_copy;
            self.offset += to_copy;
            current += 1;
        }
        copied
    }
}

impl<S: ByteSource> io::Read for LazyBuffer<S> {
    /// Fill `buf` from the stream, loading blocks on demand. A short
    /// count only happens at the end of the stream, and `Ok(0)` means
    /// the stream is over.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_available(buf.len())?;
        Ok(self.copy_buffered(buf))
    }
}

impl<S> fmt::Debug for LazyBuffer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyBuffer")
            .field("block_capacity", &self.block_capacity)
            .field("block_count", &self.blocks.len())
            .field("buffer_size", &self.buffer_size)
            .field("offset", &self.offset)
            .field("mark", &self.mark)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
