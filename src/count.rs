//! Byte-counting pass-through streams.
//!
//! Member-start offsets (and therefore every [`Offset`] this crate
//! hands out) come from these counters and nothing else.
//!
//! [`Offset`]: crate::read::Offset

use std::io;
use std::io::prelude::*;

/// Counts the bytes a sink accepts. No buffering; partial writes
/// count only what the sink took.
pub struct CountWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountWriter<W> {
    pub fn new(inner: W) -> CountWriter<W> {
        CountWriter { inner, count: 0 }
    }

    /// Position of the next byte the sink will receive.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Counts the bytes consumed *out* of a buffered reader.
///
/// Sitting between the buffered source and a decoder, the count tracks
/// the compressed offset the decoder has actually used, not how far
/// ahead the buffer has read. All counting happens in `consume()` so
/// that going through `Read` can't double-count.
pub struct CountReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountReader<R> {
    pub fn new(inner: R) -> CountReader<R> {
        CountReader { inner, count: 0 }
    }

    /// Continue counting from `count`, e.g. after repositioning the
    /// underlying source.
    pub fn with_count(inner: R, count: u64) -> CountReader<R> {
        CountReader { inner, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> Read for CountReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.count += amt as u64;
        self.inner.consume(amt);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// A sink that accepts at most two bytes per write.
    struct Dribble(Vec<u8>);

    impl Write for Dribble {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(2);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_counts_accepted_bytes() {
        let mut w = CountWriter::new(Vec::new());
        assert_eq!(w.count(), 0);
        w.write_all(b"abcd").unwrap();
        assert_eq!(w.count(), 4);
        w.write_all(b"").unwrap();
        assert_eq!(w.count(), 4);
    }

    #[test]
    fn writer_counts_partial_writes() {
        let mut w = CountWriter::new(Dribble(Vec::new()));
        assert_eq!(w.write(b"abcde").unwrap(), 2);
        assert_eq!(w.count(), 2);
        w.write_all(b"cde").unwrap();
        assert_eq!(w.count(), 5);
    }

    #[test]
    fn reader_counts_consumed_bytes() {
        let data: &[u8] = b"0123456789";
        let mut r = CountReader::new(data);
        let mut buf = [0u8; 4];
        r.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"0123");
        assert_eq!(r.count(), 4);

        // BufRead use counts the same way.
        let peek = r.fill_buf().unwrap().to_vec();
        assert_eq!(r.count(), 4);
        r.consume(peek.len());
        assert_eq!(r.count(), 10);
        assert_eq!(r.read(&mut buf).unwrap(), 0);
        assert_eq!(r.count(), 10);
    }

    #[test]
    fn reader_resumes_from_a_given_count() {
        let data: &[u8] = b"xyz";
        let mut r = CountReader::with_count(data, 100);
        let mut buf = [0u8; 3];
        r.read_exact(&mut buf).unwrap();
        assert_eq!(r.count(), 103);
    }
}
