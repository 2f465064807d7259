//! The seekable reader and the position tokens it understands.

use std::io;
use std::io::prelude::*;
use std::io::{BufReader, SeekFrom};
use std::mem;

use flate2::bufread::GzDecoder;
use log::*;

use crate::count::CountReader;
use crate::result::*;

/// A specific point in the decompressed stream that a [`Reader`] can
/// get back to cheaply.
///
/// The normal way to obtain one is to call `offset()` on a reader or
/// writer at the point of interest, keep it (an index of them can be
/// persisted however the caller likes), and hand it to
/// [`Reader::seek`] later. `block` is the compressed offset of the
/// gzip member holding the byte; `off` is how many decompressed bytes
/// into that member it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset {
    pub block: u64,
    pub off: u64,
}

/// While a member is open, the decoder owns the counting adapter, which
/// owns the buffering, which owns the source.
type Adapter<R> = CountReader<BufReader<R>>;

enum State<R: Read + Seek> {
    /// A member is open and being decoded.
    Member(GzDecoder<Adapter<R>>),
    /// No member open: the stream is drained, closed, or a seek failed.
    /// The source is kept so a later [`Reader::seek`] can revive it.
    Between(R),
    /// A panic unwound mid-transition. Terminal.
    Poisoned,
}

/// Reads gzip files like any gzip decoder, and multi-member files with
/// the ability to [`seek`](Reader::seek) to previously recorded
/// [`Offset`]s.
///
/// The intended shape is a two-pass one: stream through the file once,
/// calling [`offset`](Reader::offset) at each point worth returning to,
/// then seek back to any of them in any order. Offsets produced by this
/// crate's writers work the same way.
pub struct Reader<R: Read + Seek> {
    state: State<R>,
    /// Compressed offset at which the current member began.
    block: u64,
    /// Decompressed bytes yielded from the current member so far.
    off: u64,
    /// Sticky: some member boundary has been crossed.
    delim: bool,
}

impl<R: Read + Seek> Reader<R> {
    /// Wraps `source`, which must be positioned at the first member.
    ///
    /// Fails with [`MultiGzError::InvalidGzip`] if no gzip header can
    /// be parsed there.
    pub fn new(source: R) -> MultiGzResult<Self> {
        let adapter = CountReader::new(BufReader::new(source));
        let decoder = GzDecoder::new(adapter);
        if decoder.header().is_none() {
            return Err(MultiGzError::InvalidGzip(
                "no gzip member at the start of the stream",
            ));
        }
        Ok(Reader {
            state: State::Member(decoder),
            block: 0,
            off: 0,
            delim: false,
        })
    }

    /// The position of the next byte [`read`](Read::read) will return.
    pub fn offset(&self) -> Offset {
        Offset {
            block: self.block,
            off: self.off,
        }
    }

    /// True if at least one member boundary has been crossed while
    /// reading. Never cleared.
    ///
    /// A short file can be worth treating as multi-member even though
    /// this reader never saw it cross a boundary; unless enough bytes
    /// have been read to know better, prefer the standalone
    /// [`is_probably_multi_gzip`](crate::detect::is_probably_multi_gzip).
    pub fn is_probably_multi(&self) -> bool {
        self.delim
    }

    /// Repositions so that the next read returns the byte `to` named
    /// when it was recorded.
    ///
    /// Fails with [`MultiGzError::InvalidGzip`] if `to.block` is not a
    /// member boundary, or [`MultiGzError::ShortMember`] if `to.off`
    /// runs past the end of the stream. After a failure the reader
    /// yields no further data, but another `seek` is legal.
    pub fn seek(&mut self, to: Offset) -> MultiGzResult<()> {
        let cur = self.offset();
        let mid_member = matches!(self.state, State::Member(_));
        if mid_member && cur.block == to.block && cur.off <= to.off {
            debug!(
                "seek within the current member: skipping {} bytes",
                to.off - cur.off
            );
            return self.discard(to.off - cur.off);
        }

        debug!("seek to member at {} + {} bytes", to.block, to.off);
        let mut source = match mem::replace(&mut self.state, State::Poisoned) {
            State::Member(decoder) => decoder.into_inner().into_inner().into_inner(),
            State::Between(source) => source,
            State::Poisoned => {
                return Err(MultiGzError::InvalidArgument(
                    "reader lost its source to a previous panic",
                ))
            }
        };
        if let Err(err) = source.seek(SeekFrom::Start(to.block)) {
            self.state = State::Between(source);
            return Err(err.into());
        }

        // Fresh buffering: whatever the old adapter had read ahead
        // belongs to some other part of the file.
        let adapter = CountReader::with_count(BufReader::new(source), to.block);
        let decoder = GzDecoder::new(adapter);
        if decoder.header().is_none() {
            self.state = State::Between(decoder.into_inner().into_inner().into_inner());
            return Err(MultiGzError::InvalidGzip(
                "the offset does not appear to match the gzip layout",
            ));
        }
        self.state = State::Member(decoder);
        self.block = to.block;
        self.off = 0;
        self.discard(to.off)
    }

    /// Releases the decoder. The source is kept, so reading is over
    /// (`read` returns no bytes) but `seek` still works.
    pub fn close(&mut self) -> MultiGzResult<()> {
        match mem::replace(&mut self.state, State::Poisoned) {
            State::Member(decoder) => {
                self.state = State::Between(decoder.into_inner().into_inner().into_inner());
            }
            other => self.state = other,
        }
        Ok(())
    }

    /// Reads and drops `n` decompressed bytes, crossing member
    /// boundaries as needed.
    fn discard(&mut self, mut n: u64) -> MultiGzResult<()> {
        let mut scratch = [0u8; 8 * 1024];
        while n > 0 {
            let want = n.min(scratch.len() as u64) as usize;
            let got = self.read(&mut scratch[..want])?;
            if got == 0 {
                return Err(MultiGzError::ShortMember(n));
            }
            n -= got as u64;
        }
        Ok(())
    }

    /// Called once the open member's trailer has been consumed: record
    /// where the next member starts and open it, or park the source if
    /// the file ends here.
    fn advance_member(&mut self) -> io::Result<()> {
        let decoder = match mem::replace(&mut self.state, State::Poisoned) {
            State::Member(decoder) => decoder,
            other => {
                self.state = other;
                return Ok(());
            }
        };
        let mut adapter = decoder.into_inner();
        self.block = adapter.count();
        self.off = 0;

        let at_end = adapter.fill_buf().map(|remaining| remaining.is_empty());
        match at_end {
            Err(err) => {
                self.state = State::Between(adapter.into_inner().into_inner());
                Err(err)
            }
            Ok(true) => {
                trace!("stream ends at {}", self.block);
                self.state = State::Between(adapter.into_inner().into_inner());
                Ok(())
            }
            Ok(false) => {
                let decoder = GzDecoder::new(adapter);
                if decoder.header().is_none() {
                    self.state = State::Between(decoder.into_inner().into_inner().into_inner());
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        MultiGzError::InvalidGzip("garbage where the next gzip member should start"),
                    ));
                }
                trace!("crossed into the member at {}", self.block);
                self.delim = true;
                self.state = State::Member(decoder);
                Ok(())
            }
        }
    }
}

impl<R: Read + Seek> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut nread = 0;
        while nread < buf.len() {
            let decoder = match &mut self.state {
                State::Member(decoder) => decoder,
                _ => break,
            };
            let n = decoder.read(&mut buf[nread..])?;
            if n > 0 {
                self.off += n as u64;
                nread += n;
                continue;
            }
            // The member under the cursor is spent. Report progress
            // first; cross into the next member on a later call, so a
            // bad boundary can't eat bytes already delivered.
            if nread > 0 {
                break;
            }
            self.advance_member()?;
            if !matches!(self.state, State::Member(_)) {
                break;
            }
        }
        Ok(nread)
    }
}
