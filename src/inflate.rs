/*!
A forward-only view of a zlib/DEFLATE-compressed payload.

MAT version 5 wraps each compressed variable in one zlib stream, and the
slab readers need a throwaway cursor into it: they wander ahead to collect
the selected elements, while the enclosing file parser must resume from the
position it already held. zlib offers `inflateCopy` for that; `flate2` does
not, so [`InflateStream`](struct.InflateStream.html) shares one lazily
driven inflater between all of its forks and retains the decompressed
output in a growable buffer. A fork is then nothing more than a second
index into that buffer, and dropping it releases it, on error paths too.

Decompression is demand-driven: bytes are produced only when the
furthest-advanced handle pulls or skips past the end of what has been
inflated so far, so the buffer's footprint is the high-water mark of the
positions actually visited.
*/

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{Error, Result};
use crate::tag::DataType;

/// Size of one compressed chunk taken from the underlying reader.
const SRC_BLOCK_SIZE: usize = 8 * 1024;

/// Growth step for the decompressed output buffer.
const DST_BLOCK_SIZE: usize = 16 * 1024;

/// A forward-only cursor over the decompressed bytes of one zlib stream.
///
/// Create one per compressed variable with
/// [`new`](struct.InflateStream.html#method.new), positioned at the first
/// byte of the compressed payload. The three operations are
/// [`pull`](struct.InflateStream.html#method.pull) (decompress an exact
/// number of bytes into a caller buffer),
/// [`skip`](struct.InflateStream.html#method.skip) (discard a number of
/// logical elements) and [`fork`](struct.InflateStream.html#method.fork)
/// (an independent handle at the current position). There is no rewind and
/// no random access.
pub struct InflateStream<R> {
    inner: Rc<RefCell<Inflater<R>>>,
    /// Logical position of this handle in the decompressed output.
    pos: usize,
}

struct Inflater<R> {
    /// The underlying compressed byte source.
    r: R,
    /// The zlib inflater shared by every fork of this stream.
    dec: Decompress,
    /// The compressed bytes buffer, taken from the underlying reader.
    src: Vec<u8>,
    /// Index into src: starting point of bytes not yet fed to the inflater.
    srcs: usize,
    /// Index into src: ending point of valid compressed bytes.
    srce: usize,
    /// Every decompressed byte produced so far; handles index into this.
    out: Vec<u8>,
    /// Whether the deflate stream (or the source beneath it) has ended.
    done: bool,
}

impl<R: io::Read> InflateStream<R> {
    /// Creates a new stream inflating zlib-compressed bytes from `rdr`.
    ///
    /// The reader must be positioned at the first byte of the compressed
    /// payload, zlib header included.
    pub fn new(rdr: R) -> InflateStream<R> {
        InflateStream {
            inner: Rc::new(RefCell::new(Inflater {
                r: rdr,
                dec: Decompress::new(true),
                src: vec![0; SRC_BLOCK_SIZE],
                srcs: 0,
                srce: 0,
                out: Vec::new(),
                done: false,
            })),
            pos: 0,
        }
    }

    /// Returns this handle's logical position in the decompressed output.
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Decompresses exactly `dst.len()` bytes into `dst`.
    ///
    /// Fails with [`Error::Truncated`](enum.Error.html) if the stream ends
    /// first, [`Error::Corrupt`](enum.Error.html) on invalid deflate data,
    /// and [`Error::Io`](enum.Error.html) if the compressed source fails.
    pub fn pull(&mut self, dst: &mut [u8]) -> Result<()> {
        let end = self.pos + dst.len();
        let mut inner = self.inner.borrow_mut();
        inner.ensure(end)?;
        dst.copy_from_slice(&inner.out[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    /// Advances the stream by exactly `count` elements of type `ty`,
    /// discarding their bytes. Fails like
    /// [`pull`](struct.InflateStream.html#method.pull).
    pub fn skip(&mut self, ty: DataType, count: usize) -> Result<()> {
        let end = self.pos + count * ty.size();
        self.inner.borrow_mut().ensure(end)?;
        self.pos = end;
        Ok(())
    }

    /// Returns an independent stream at the current output position.
    ///
    /// Advancing either stream does not affect the other. The fork borrows
    /// nothing; it is released when dropped.
    pub fn fork(&self) -> InflateStream<R> {
        InflateStream { inner: Rc::clone(&self.inner), pos: self.pos }
    }
}

impl<R: io::Read> Inflater<R> {
    /// Drives the inflater until at least `upto` decompressed bytes exist.
    fn ensure(&mut self, upto: usize) -> Result<()> {
        while self.out.len() < upto {
            if self.done {
                return Err(Error::Truncated {
                    expected: upto as u64,
                    got: self.out.len() as u64,
                });
            }
            if self.srcs == self.srce {
                let n = self.r.read(&mut self.src).map_err(Error::Io)?;
                self.srcs = 0;
                self.srce = n;
                if n == 0 {
                    // Source exhausted before the deflate stream ended.
                    self.done = true;
                    continue;
                }
            }
            self.out.reserve(DST_BLOCK_SIZE);
            let consumed = self.dec.total_in();
            let produced = self.out.len();
            let status = self
                .dec
                .decompress_vec(
                    &self.src[self.srcs..self.srce],
                    &mut self.out,
                    FlushDecompress::None,
                )
                .map_err(|_| Error::Corrupt)?;
            self.srcs += (self.dec.total_in() - consumed) as usize;
            match status {
                Status::StreamEnd => self.done = true,
                Status::Ok => {}
                Status::BufError => {
                    // With input in hand and output space reserved, a
                    // buffer error means the inflater cannot make progress.
                    if self.dec.total_in() == consumed
                        && self.out.len() == produced
                    {
                        return Err(Error::Corrupt);
                    }
                }
            }
        }
        Ok(())
    }
}

impl<R> fmt::Debug for InflateStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("InflateStream")
            .field("pos", &self.pos)
            .field("inflated", &inner.out.len())
            .field("done", &inner.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::InflateStream;
    use crate::error::Error;
    use crate::tag::DataType;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn pull_exact() {
        let plain: Vec<u8> = (0..200).collect();
        let mut z = InflateStream::new(Cursor::new(zlib(&plain)));
        let mut buf = [0u8; 64];
        z.pull(&mut buf).unwrap();
        assert_eq!(&buf[..], &plain[..64]);
        z.pull(&mut buf).unwrap();
        assert_eq!(&buf[..], &plain[64..128]);
        assert_eq!(z.position(), 128);
    }

    #[test]
    fn skip_counts_elements() {
        let plain: Vec<u8> = (0..100).collect();
        let mut z = InflateStream::new(Cursor::new(zlib(&plain)));
        z.skip(DataType::I32, 3).unwrap();
        let mut one = [0u8; 1];
        z.pull(&mut one).unwrap();
        assert_eq!(one[0], 12);
    }

    #[test]
    fn fork_is_independent() {
        let plain: Vec<u8> = (0..100).collect();
        let mut z = InflateStream::new(Cursor::new(zlib(&plain)));
        let mut buf = [0u8; 10];
        z.pull(&mut buf).unwrap();

        let mut fork = z.fork();
        let mut far = [0u8; 50];
        fork.pull(&mut far).unwrap();
        assert_eq!(&far[..], &plain[10..60]);

        // The parent still sees byte 10 next.
        let mut one = [0u8; 1];
        z.pull(&mut one).unwrap();
        assert_eq!(one[0], 10);
        assert_eq!(z.position(), 11);
        assert_eq!(fork.position(), 60);
    }

    #[test]
    fn truncated_stream() {
        let plain: Vec<u8> = (0..100).collect();
        let mut compressed = zlib(&plain);
        compressed.truncate(compressed.len() / 2);
        let mut z = InflateStream::new(Cursor::new(compressed));
        let mut buf = vec![0u8; 100];
        match z.pull(&mut buf) {
            Err(Error::Truncated { .. }) => {}
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_stream() {
        let garbage = vec![0xFF; 32];
        let mut z = InflateStream::new(Cursor::new(garbage));
        let mut buf = [0u8; 4];
        match z.pull(&mut buf) {
            Err(Error::Corrupt) => {}
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn pull_past_end_reports_byte_counts() {
        let plain: Vec<u8> = (0..10).collect();
        let mut z = InflateStream::new(Cursor::new(zlib(&plain)));
        let mut buf = [0u8; 16];
        match z.pull(&mut buf) {
            Err(Error::Truncated { expected, got }) => {
                assert_eq!(expected, 16);
                assert_eq!(got, 10);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }
}
