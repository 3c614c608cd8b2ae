/*!
The decoder context and the typed element readers.

[`Decoder`](struct.Decoder.html) wraps the byte source the enclosing file
parser discovered a numeric payload in, together with the file's byte-order
flag. The element readers come in two families with identical semantics:

* `read_data` / `read_char_data` draw from the wrapped source directly and
  require it to be seekable (`io::Read + io::Seek`), which is what the slab
  readers lean on;
* `read_compressed_data` / `read_compressed_char_data` draw from an
  [`InflateStream`](struct.InflateStream.html) instead and need no
  capability from the wrapped source at all.

Every reader decodes `dst.len()` stored elements of the given
[`DataType`](enum.DataType.html), byte-swapping each multi-byte scalar
between read and conversion when the flag is set, and returns the number of
source bytes consumed. A `(destination, source)` pair outside the supported
matrix consumes nothing, warns once through `log`, and returns `Ok(0)`.
*/

use std::cmp;
use std::io::{self, Read, Seek};

use crate::error::{Error, Result};
use crate::inflate::InflateStream;
use crate::tag::{DataType, Element, Source};
use crate::BLOCK_SIZE;

/// A decoder for the numeric payloads of one MAT version 5 file.
///
/// Holds the underlying byte source and the byte-order flag for the
/// duration of one file open. The flag is fixed at construction: MAT
/// headers state the file's endianness once, and every multi-byte scalar
/// in the file honours it.
pub struct Decoder<R> {
    /// The underlying byte source.
    r: R,
    /// When true, every multi-byte scalar is byte-swapped after being read
    /// and before being converted.
    byteswap: bool,
}

impl<R> Decoder<R> {
    /// Creates a decoder over `rdr`, which must be positioned at the first
    /// byte of a numeric payload before each read.
    ///
    /// Set `byteswap` when the file's byte order differs from the host's.
    pub fn new(rdr: R, byteswap: bool) -> Decoder<R> {
        Decoder { r: rdr, byteswap }
    }

    /// Returns whether this decoder byte-swaps multi-byte scalars.
    pub fn byteswap(&self) -> bool {
        self.byteswap
    }

    /// Gets a reference to the underlying byte source.
    pub fn get_ref(&self) -> &R {
        &self.r
    }

    /// Gets a mutable reference to the underlying byte source.
    ///
    /// Note that mutation of the source may result in surprising results
    /// if this decoder is continued to be used.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.r
    }

    /// Returns the underlying byte source of this decoder.
    pub fn into_inner(self) -> R {
        self.r
    }
}

impl<R: Read + Seek> Decoder<R> {
    /// Reads `dst.len()` elements stored as `ty` from the source,
    /// converting each into `T`.
    ///
    /// Returns the number of source bytes consumed, which is
    /// `dst.len() * ty.size()`; the cursor advances by the same amount.
    /// The character tags are not valid sources for a numeric destination
    /// and report zero bytes consumed without moving the cursor.
    pub fn read_data<T: Element>(
        &mut self,
        dst: &mut [T],
        ty: DataType,
    ) -> Result<usize> {
        match ty {
            DataType::F64 => self.read_elems::<T, f64>(dst),
            DataType::F32 => self.read_elems::<T, f32>(dst),
            DataType::I64 => self.read_elems::<T, i64>(dst),
            DataType::U64 => self.read_elems::<T, u64>(dst),
            DataType::I32 => self.read_elems::<T, i32>(dst),
            DataType::U32 => self.read_elems::<T, u32>(dst),
            DataType::I16 => self.read_elems::<T, i16>(dst),
            DataType::U16 => self.read_elems::<T, u16>(dst),
            DataType::I8 => self.read_elems::<T, i8>(dst),
            DataType::U8 => self.read_elems::<T, u8>(dst),
            DataType::Utf8 | DataType::Utf16 => {
                log::warn!(
                    "{:?} is not a supported data type for a {:?} \
                     destination",
                    ty,
                    T::CLASS,
                );
                Ok(0)
            }
        }
    }

    /// Reads `dst.len()` character cells stored as `ty`.
    ///
    /// One-byte sources copy through unchanged; two-byte sources are
    /// byte-swapped per the decoder flag and then narrowed to the low byte
    /// of each code unit. Returns the number of source bytes consumed,
    /// `dst.len() * ty.size()`. Non-character tags report zero bytes
    /// consumed without moving the cursor.
    pub fn read_char_data(
        &mut self,
        dst: &mut [u8],
        ty: DataType,
    ) -> Result<usize> {
        match ty {
            DataType::Utf8 | DataType::I8 | DataType::U8 => {
                let total = dst.len() as u64;
                read_full(&mut self.r, dst, 0, total)?;
                Ok(dst.len())
            }
            DataType::Utf16 | DataType::I16 | DataType::U16 => {
                let total = (dst.len() * 2) as u64;
                let mut buf = [0u8; BLOCK_SIZE];
                let mut done = 0u64;
                let mut i = 0;
                while i < dst.len() {
                    let n = cmp::min(BLOCK_SIZE / 2, dst.len() - i);
                    read_full(&mut self.r, &mut buf[..n * 2], done, total)?;
                    convert_chars16(
                        &mut dst[i..i + n],
                        &buf[..n * 2],
                        self.byteswap,
                    );
                    done += (n * 2) as u64;
                    i += n;
                }
                Ok(dst.len() * 2)
            }
            _ => {
                log::warn!(
                    "{:?} is not a supported data type for character data",
                    ty,
                );
                Ok(0)
            }
        }
    }

    /// Seeks the source relative to its current position.
    pub(crate) fn seek_rel(&mut self, bytes: i64) -> Result<()> {
        if bytes != 0 {
            self.r.seek(io::SeekFrom::Current(bytes)).map_err(Error::Io)?;
        }
        Ok(())
    }

    /// Reports the source's current absolute position.
    pub(crate) fn tell(&mut self) -> Result<u64> {
        self.r.seek(io::SeekFrom::Current(0)).map_err(Error::Io)
    }

    /// The uncompressed read loop for one `(destination, source)` pair:
    /// batches of up to `BLOCK_SIZE` bytes land in a stack buffer and each
    /// scalar is swapped (if requested) and converted on its way out.
    fn read_elems<T: Element, S: Source>(
        &mut self,
        dst: &mut [T],
    ) -> Result<usize> {
        let total = (dst.len() * S::SIZE) as u64;
        let mut buf = [0u8; BLOCK_SIZE];
        let mut done = 0u64;
        let mut i = 0;
        while i < dst.len() {
            let n = cmp::min(BLOCK_SIZE / S::SIZE, dst.len() - i);
            let nbytes = n * S::SIZE;
            read_full(&mut self.r, &mut buf[..nbytes], done, total)?;
            convert_batch::<T, S>(
                &mut dst[i..i + n],
                &buf[..nbytes],
                self.byteswap,
            );
            done += nbytes as u64;
            i += n;
        }
        Ok(dst.len() * S::SIZE)
    }
}

impl<R> Decoder<R> {
    /// Reads `dst.len()` elements stored as `ty` from an inflate stream,
    /// converting each into `T`.
    ///
    /// Identical semantics to
    /// [`read_data`](struct.Decoder.html#method.read_data), with the
    /// stream advancing by `dst.len() * ty.size()` decompressed bytes.
    pub fn read_compressed_data<T: Element, Z: Read>(
        &self,
        z: &mut InflateStream<Z>,
        dst: &mut [T],
        ty: DataType,
    ) -> Result<usize> {
        match ty {
            DataType::F64 => self.inflate_elems::<T, f64, Z>(z, dst),
            DataType::F32 => self.inflate_elems::<T, f32, Z>(z, dst),
            DataType::I64 => self.inflate_elems::<T, i64, Z>(z, dst),
            DataType::U64 => self.inflate_elems::<T, u64, Z>(z, dst),
            DataType::I32 => self.inflate_elems::<T, i32, Z>(z, dst),
            DataType::U32 => self.inflate_elems::<T, u32, Z>(z, dst),
            DataType::I16 => self.inflate_elems::<T, i16, Z>(z, dst),
            DataType::U16 => self.inflate_elems::<T, u16, Z>(z, dst),
            DataType::I8 => self.inflate_elems::<T, i8, Z>(z, dst),
            DataType::U8 => self.inflate_elems::<T, u8, Z>(z, dst),
            DataType::Utf8 | DataType::Utf16 => {
                log::warn!(
                    "{:?} is not a supported data type for a {:?} \
                     destination",
                    ty,
                    T::CLASS,
                );
                Ok(0)
            }
        }
    }

    /// Reads `dst.len()` character cells stored as `ty` from an inflate
    /// stream. Identical semantics to
    /// [`read_char_data`](struct.Decoder.html#method.read_char_data).
    pub fn read_compressed_char_data<Z: Read>(
        &self,
        z: &mut InflateStream<Z>,
        dst: &mut [u8],
        ty: DataType,
    ) -> Result<usize> {
        match ty {
            DataType::Utf8 | DataType::I8 | DataType::U8 => {
                z.pull(dst)?;
                Ok(dst.len())
            }
            DataType::Utf16 | DataType::I16 | DataType::U16 => {
                let mut buf = [0u8; BLOCK_SIZE];
                let mut i = 0;
                while i < dst.len() {
                    let n = cmp::min(BLOCK_SIZE / 2, dst.len() - i);
                    z.pull(&mut buf[..n * 2])?;
                    convert_chars16(
                        &mut dst[i..i + n],
                        &buf[..n * 2],
                        self.byteswap,
                    );
                    i += n;
                }
                Ok(dst.len() * 2)
            }
            _ => {
                log::warn!(
                    "{:?} is not a supported data type for character data",
                    ty,
                );
                Ok(0)
            }
        }
    }

    /// The compressed read loop: pulls block-sized batches out of the
    /// inflate stream so conversion never goes byte-at-a-time.
    fn inflate_elems<T: Element, S: Source, Z: Read>(
        &self,
        z: &mut InflateStream<Z>,
        dst: &mut [T],
    ) -> Result<usize> {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut i = 0;
        while i < dst.len() {
            let n = cmp::min(BLOCK_SIZE / S::SIZE, dst.len() - i);
            let nbytes = n * S::SIZE;
            z.pull(&mut buf[..nbytes])?;
            convert_batch::<T, S>(
                &mut dst[i..i + n],
                &buf[..nbytes],
                self.byteswap,
            );
            i += n;
        }
        Ok(dst.len() * S::SIZE)
    }
}

/// Converts one batch of raw scalars into destination elements.
fn convert_batch<T: Element, S: Source>(
    dst: &mut [T],
    raw: &[u8],
    byteswap: bool,
) {
    let chunks = raw.chunks_exact(S::SIZE);
    if byteswap {
        for (slot, chunk) in dst.iter_mut().zip(chunks) {
            *slot = S::get(chunk).swapped().convert();
        }
    } else {
        for (slot, chunk) in dst.iter_mut().zip(chunks) {
            *slot = S::get(chunk).convert();
        }
    }
}

/// Narrows one batch of 16-bit code units into byte-wide character cells.
fn convert_chars16(dst: &mut [u8], raw: &[u8], byteswap: bool) {
    for (slot, chunk) in dst.iter_mut().zip(raw.chunks_exact(2)) {
        let mut v = <u16 as Source>::get(chunk);
        if byteswap {
            v = v.swapped();
        }
        *slot = v as u8;
    }
}

/// Like `Read::read_exact`, except an early end of stream is reported as
/// `Error::Truncated` with the byte counts of the surrounding read.
fn read_full<R: Read>(
    r: &mut R,
    buf: &mut [u8],
    done: u64,
    total: u64,
) -> Result<()> {
    r.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => {
            Error::Truncated { expected: total, got: done }
        }
        _ => Error::Io(err),
    })
}
