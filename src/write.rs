//! Writers that cut the compressed stream into independent gzip members.
//!
//! Both writers produce ordinary gzip files (`zcat` and friends read
//! them start to finish), but because every member is self-contained,
//! a [`Reader`] can jump straight to any [`Offset`] the writer handed
//! out and resume decompression there.
//!
//! [`Reader`]: crate::read::Reader

use std::io;
use std::io::prelude::*;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::*;

use crate::count::CountWriter;
use crate::read::Offset;
use crate::result::*;

/// Decompressed bytes per member for [`BlockWriter`] unless the caller
/// picks something else. 64 KiB balances seek granularity against the
/// per-member header/trailer overhead.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Rolling-window length for [`RsyncableWriter`]. Changing this (or the
/// boundary predicate) changes where members land and breaks offsets
/// recorded by other producers, so it is fixed.
const WINDOW_SIZE: usize = 4096;

/// The shared surface of this crate's segmenting writers: plain
/// [`Write`] plus offset reporting and explicit finalization.
pub trait SegmentedWrite: Write {
    /// Returns the position a [`Reader`](crate::read::Reader) must be
    /// given to resume at the current write position.
    fn offset(&self) -> Offset;

    /// Flushes anything staged, finalizes the last member, and releases
    /// the encoder. Closing twice is an error.
    fn close(&mut self) -> MultiGzResult<()>;
}

fn closed() -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        MultiGzError::InvalidArgument("writer is closed"),
    )
}

/// A writer that closes the current member every `block_size`
/// decompressed bytes.
///
/// Input is staged in a buffer of `block_size` bytes; each time the
/// buffer fills, the whole chunk is compressed as one gzip member in a
/// single shot. Every member therefore carries exactly `block_size`
/// decompressed bytes, except the last one, which carries whatever
/// remained at [`close`](SegmentedWrite::close) time.
pub struct BlockWriter<W: Write> {
    /// `None` once closed.
    sink: Option<CountWriter<W>>,
    level: Compression,
    block_size: usize,
    buf: Vec<u8>,
    /// Compressed offset at which the currently open member starts.
    block_start: u64,
    members: u64,
}

impl<W: Write> BlockWriter<W> {
    /// Creates a writer compressing at `level` and segmenting every
    /// `block_size` decompressed bytes ([`DEFAULT_BLOCK_SIZE`] is a
    /// reasonable pick).
    pub fn new(sink: W, level: Compression, block_size: usize) -> MultiGzResult<Self> {
        if block_size == 0 {
            return Err(MultiGzError::InvalidArgument("block size must be positive"));
        }
        Ok(BlockWriter {
            sink: Some(CountWriter::new(sink)),
            level,
            block_size,
            buf: Vec::with_capacity(block_size),
            block_start: 0,
            members: 0,
        })
    }

    /// See [`SegmentedWrite::offset`].
    pub fn offset(&self) -> Offset {
        Offset {
            block: self.block_start,
            off: self.buf.len() as u64,
        }
    }

    /// See [`SegmentedWrite::close`].
    pub fn close(&mut self) -> MultiGzResult<()> {
        if self.sink.is_none() {
            return Err(MultiGzError::InvalidArgument("writer already closed"));
        }
        // A remainder becomes the final member. An untouched writer
        // still emits one empty member so the output is a valid gzip
        // file.
        if !self.buf.is_empty() || self.members == 0 {
            self.encode_member()?;
        }
        self.sink = None;
        Ok(())
    }

    /// Compresses the staged buffer as one complete member and records
    /// where the next member will start.
    fn encode_member(&mut self) -> io::Result<()> {
        let BlockWriter {
            sink,
            level,
            buf,
            block_start,
            members,
            ..
        } = self;
        let sink = sink.as_mut().ok_or_else(closed)?;
        let mut encoder = GzEncoder::new(&mut *sink, *level);
        encoder.write_all(buf)?;
        encoder.finish()?;
        *block_start = sink.count();
        *members += 1;
        trace!(
            "block member {} closed ({} bytes in); next starts at {}",
            members,
            buf.len(),
            block_start
        );
        buf.clear();
        Ok(())
    }
}

impl<W: Write> Write for BlockWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.sink.is_none() {
            return Err(closed());
        }
        let mut rest = data;
        while !rest.is_empty() {
            let room = self.block_size - self.buf.len();
            let take = room.min(rest.len());
            self.buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.buf.len() == self.block_size {
                self.encode_member()?;
            }
        }
        Ok(data.len())
    }

    /// Encodes any staged bytes as a member, then flushes the sink.
    /// Note that this cuts a member short; offsets stay valid, but
    /// gratuitous flushing costs compression.
    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.encode_member()?;
        }
        self.sink.as_mut().ok_or_else(closed)?.flush()
    }
}

impl<W: Write> SegmentedWrite for BlockWriter<W> {
    fn offset(&self) -> Offset {
        BlockWriter::offset(self)
    }

    fn close(&mut self) -> MultiGzResult<()> {
        BlockWriter::close(self)
    }
}

/// A writer that closes members where the content says to, making the
/// output friendly to rsync and binary diffing.
///
/// A rolling sum over the last [`WINDOW_SIZE`] input bytes decides the
/// cuts: once the window has filled, any byte that leaves the sum
/// divisible by the window length ends the member. Identical data
/// therefore produces identical members regardless of how it is framed
/// into `write` calls, and an insertion only disturbs the members it
/// touches.
pub struct RsyncableWriter<W: Write> {
    /// `None` once closed.
    encoder: Option<GzEncoder<CountWriter<W>>>,
    level: Compression,
    window: Vec<u8>,
    /// Decompressed bytes fed into the current member so far.
    idx: u64,
    /// Sum of the bytes currently resident in the window.
    sum: u32,
    /// Compressed offset at which the currently open member starts.
    block_start: u64,
}

impl<W: Write> RsyncableWriter<W> {
    pub fn new(sink: W, level: Compression) -> Self {
        RsyncableWriter {
            encoder: Some(GzEncoder::new(CountWriter::new(sink), level)),
            level,
            window: vec![0; WINDOW_SIZE],
            idx: 0,
            sum: 0,
            block_start: 0,
        }
    }

    /// See [`SegmentedWrite::offset`].
    pub fn offset(&self) -> Offset {
        Offset {
            block: self.block_start,
            off: self.idx,
        }
    }

    /// See [`SegmentedWrite::close`].
    pub fn close(&mut self) -> MultiGzResult<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or(MultiGzError::InvalidArgument("writer already closed"))?;
        encoder.try_finish()?;
        if let Some(encoder) = self.encoder.take() {
            encoder.finish()?;
        }
        Ok(())
    }

    /// Slides `b` through the window. True if `b` is a boundary byte.
    fn roll(&mut self, b: u8) -> bool {
        let slot = (self.idx % WINDOW_SIZE as u64) as usize;
        if self.idx >= WINDOW_SIZE as u64 {
            self.sum -= u32::from(self.window[slot]);
        }
        self.window[slot] = b;
        self.sum += u32::from(b);
        self.idx += 1;
        self.idx >= WINDOW_SIZE as u64 && self.sum % WINDOW_SIZE as u32 == 0
    }

    /// Ends the current member and opens the next one on the same
    /// counting sink. `try_finish` first, so a failed flush leaves the
    /// encoder in place and the writer still closable.
    fn finish_member(&mut self) -> io::Result<()> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.try_finish()?;
        }
        if let Some(encoder) = self.encoder.take() {
            let sink = encoder.finish()?;
            self.block_start = sink.count();
            trace!("content-defined cut; next member starts at {}", self.block_start);
            self.encoder = Some(GzEncoder::new(sink, self.level));
        }
        self.sum = 0;
        self.idx = 0;
        Ok(())
    }
}

impl<W: Write> Write for RsyncableWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.encoder.is_none() {
            return Err(closed());
        }
        let mut rest = data;
        while !rest.is_empty() {
            let mut cut = None;
            for (pos, &b) in rest.iter().enumerate() {
                if self.roll(b) {
                    cut = Some(pos + 1);
                    break;
                }
            }
            // Everything up to and including the boundary byte belongs
            // to the current member, byte for byte.
            let take = cut.unwrap_or(rest.len());
            match self.encoder.as_mut() {
                Some(encoder) => encoder.write_all(&rest[..take])?,
                None => return Err(closed()),
            }
            rest = &rest[take..];
            if cut.is_some() {
                self.finish_member()?;
            }
        }
        Ok(data.len())
    }

    /// Sync-flushes the open member; does not end it.
    fn flush(&mut self) -> io::Result<()> {
        self.encoder.as_mut().ok_or_else(closed)?.flush()
    }
}

impl<W: Write> SegmentedWrite for RsyncableWriter<W> {
    fn offset(&self) -> Offset {
        RsyncableWriter::offset(self)
    }

    fn close(&mut self) -> MultiGzResult<()> {
        RsyncableWriter::close(self)
    }
}
