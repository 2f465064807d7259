//! Re-segmenting existing gzip files.

use std::io;
use std::io::prelude::*;
use std::io::{BufReader, Cursor};

use flate2::bufread::MultiGzDecoder;
use flate2::Compression;
use log::*;

use crate::result::*;
use crate::write::{BlockWriter, RsyncableWriter, SegmentedWrite, DEFAULT_BLOCK_SIZE};

/// Which segmentation [`convert`] should apply.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConvertMode {
    /// Fixed-size members of [`DEFAULT_BLOCK_SIZE`] decompressed bytes.
    Normal,
    /// Content-defined members, friendly to rsync and binary diffing.
    Rsyncable,
}

/// Decompresses the gzip stream `source` and rewrites it into `sink`
/// as a multi-gzip, compressing at the level the original appears to
/// have used.
///
/// Any gzip stream is accepted, already-segmented ones included. The
/// writer is closed before returning, even when the copy fails; the
/// first error wins.
pub fn convert<W: Write, R: Read>(sink: W, mut source: R, mode: ConvertMode) -> MultiGzResult<()> {
    // The container doesn't record the compression level, but XFL
    // remembers whether the encoder ran flat out or for speed. Peek at
    // it so the rewrite feels like the original. No further validation
    // here: if the header is broken, the decoder below will say so.
    let mut head = [0u8; 10];
    source.read_exact(&mut head)?;
    let level = infer_level(head[8]);
    debug!("converting at inferred compression level {}", level.level());

    let gathered = Cursor::new(head).chain(source);
    let mut decoder = MultiGzDecoder::new(BufReader::new(gathered));
    match mode {
        ConvertMode::Normal => {
            let mut writer = BlockWriter::new(sink, level, DEFAULT_BLOCK_SIZE)?;
            pump(&mut decoder, &mut writer)
        }
        ConvertMode::Rsyncable => {
            let mut writer = RsyncableWriter::new(sink, level);
            pump(&mut decoder, &mut writer)
        }
    }
}

/// XFL is 2 when a member was compressed as hard as possible and 4
/// when compressed as fast as possible (RFC 1952); anything else maps
/// to the default level.
fn infer_level(xfl: u8) -> Compression {
    match xfl {
        0x02 => Compression::best(),
        0x04 => Compression::fast(),
        _ => Compression::default(),
    }
}

/// Copies everything, then closes the writer either way.
fn pump<R: Read, W: SegmentedWrite>(decoder: &mut R, writer: &mut W) -> MultiGzResult<()> {
    let copied = io::copy(decoder, writer);
    let closed = writer.close();
    copied?;
    closed
}
