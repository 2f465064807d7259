//! multigz reads and writes *multi-gzip* files: ordinary gzip files
//! built from many small members, which makes them cheap to seek.
//!
//! ```
//! use std::io::{Cursor, Read, Write};
//!
//! use flate2::Compression;
//! use multigz::{BlockWriter, Reader};
//!
//! // Write a multi-gzip, one member per KiB of input, and remember
//! // a position worth returning to.
//! let mut file = Vec::new();
//! let mut writer = BlockWriter::new(&mut file, Compression::default(), 1024)?;
//! writer.write_all(&[b'a'; 4000])?;
//! let middle = writer.offset();
//! writer.write_all(&[b'b'; 4000])?;
//! writer.close()?;
//! drop(writer);
//!
//! // Any gzip tool decompresses the file start to finish; this reader
//! // can also jump straight back to the remembered position.
//! let mut reader = Reader::new(Cursor::new(file))?;
//! reader.seek(middle)?;
//! let mut byte = [0u8; 1];
//! reader.read_exact(&mut byte)?;
//! assert_eq!(byte[0], b'b');
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Deflate offers no way back into the middle of a stream: reaching
//! byte `N` means inflating every byte before it. The gzip container
//! has an escape hatch, though: concatenated gzip files are themselves
//! a valid gzip file, and decompressors are expected to keep going
//! until the actual end of input. So instead of seeking inside one
//! deflate stream, these files close the whole member every so often
//! and start a new one. Nothing downstream notices, but a reader that
//! knows where a member starts can begin decompressing right there.
//!
//! An [`Offset`] names a decompressed position as (member start, bytes
//! into the member). Two writers produce them while compressing:
//! [`BlockWriter`] cuts members at a fixed decompressed size, and
//! [`RsyncableWriter`] cuts them where the content dictates, so that
//! equal stretches of input compress to equal stretches of output.
//! [`Reader`] streams the whole file like any gzip decoder, hands out
//! offsets as it goes, and seeks to any offset recorded earlier.
//! Existing gzip files can be re-segmented with [`convert`], and
//! [`is_probably_multi_gzip`] guesses whether a file is worth treating
//! as seekable at all.

pub mod convert;
pub mod detect;
pub mod read;
pub mod result;
pub mod write;

pub use convert::{convert, ConvertMode};
pub use detect::{is_probably_multi_gzip, DEFAULT_PEEK_SIZE};
pub use read::{Offset, Reader};
pub use result::{MultiGzError, MultiGzResult};
pub use write::{BlockWriter, RsyncableWriter, SegmentedWrite, DEFAULT_BLOCK_SIZE};

mod count;
