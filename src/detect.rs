//! Telling multi-gzips apart from ordinary gzip files.

use std::io;
use std::io::prelude::*;
use std::io::BufReader;

use flate2::bufread::GzDecoder;
use log::*;

use crate::write::DEFAULT_BLOCK_SIZE;

/// How much decompressed data [`is_probably_multi_gzip`] examines by
/// default: two fixed-size members' worth.
pub const DEFAULT_PEEK_SIZE: u64 = 2 * DEFAULT_BLOCK_SIZE as u64;

/// True if `source` is (statistically) a multi-gzip.
///
/// Tries to decompress up to `peek_size` bytes of the first member.
/// If the member ends before that, the file segments finely enough to
/// seek well: report true, whether a second member follows or the file
/// simply ends there (a single short member is still fine-grained).
/// If the member is still going at `peek_size`, or doesn't decode at
/// all, report false. Strictly speaking a file with one split near
/// its end is multi-member too, but its seek performance is no better
/// than a plain gzip's, which is what callers are really asking about.
pub fn is_probably_multi_gzip<R: Read>(source: R, peek_size: u64) -> bool {
    // Buffered I/O is what lets the decoder stop exactly at the member
    // boundary rather than overshoot.
    let mut decoder = GzDecoder::new(BufReader::new(source));
    if decoder.header().is_none() {
        debug!("not multi-gzip: no gzip member at the start");
        return false;
    }

    let discarded = match io::copy(&mut (&mut decoder).take(peek_size), &mut io::sink()) {
        Ok(n) => n,
        Err(err) => {
            debug!("not multi-gzip: decode failed: {}", err);
            return false;
        }
    };
    if discarded == peek_size {
        debug!("not multi-gzip: first member outlasted the peek window");
        return false;
    }

    // The first member ended early. A multi-gzip has another member
    // header right here; a truncated source has nothing, which is
    // acceptable too.
    let mut inner = decoder.into_inner();
    let at_end = inner.fill_buf().map(|remaining| remaining.is_empty());
    match at_end {
        Ok(true) => {
            debug!("multi-gzip shaped: source exhausted after {} bytes", discarded);
            true
        }
        Ok(false) => GzDecoder::new(inner).header().is_some(),
        Err(_) => false,
    }
}
