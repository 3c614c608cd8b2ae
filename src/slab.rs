/*!
Strided sub-array ("slab") readers.

MAT arrays are stored column-major: the first index varies fastest, so
element `(i0, i1, …)` of an array with extents `d0 × d1 × …` sits at linear
offset `i0 + i1·d0 + i2·d0·d1 + …`. A slab selects, along every axis `k`,
the indices `start[k], start[k]+stride[k], …` for `edge[k]` steps, and the
readers here deliver exactly those elements in column-major order of the
selection.

All of them come in two flavours. The uncompressed flavour walks the
seekable source with relative seeks. The compressed flavour cannot seek:
it forks the inflate stream, advances the fork with forward skips that are
arranged to land precisely on the next run of wanted elements, and drops
the fork at the end, leaving the parent stream where the enclosing file
parser left it. The N-D walk keeps a running absolute element index and a
per-axis counter; when an axis completes its edge the cursor wraps forward
to the next slice origin, which is what removes any need for random access
on the compressed path.
*/

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::inflate::InflateStream;
use crate::read::Decoder;
use crate::tag::{DataType, Element};
use crate::MAX_RANK;

/// Validates one axis of a slab descriptor: positive stride and edge, and
/// the last selected index inside the axis extent.
fn check_axis(
    axis: usize,
    dim: usize,
    start: usize,
    stride: usize,
    edge: usize,
) -> Result<()> {
    if stride < 1
        || edge < 1
        || dim < 1
        || start + (edge - 1) * stride >= dim
    {
        return Err(Error::Bounds { axis, dim, start, stride, edge });
    }
    Ok(())
}

/// Validates a whole descriptor and returns the number of selected
/// elements.
fn check_slab(
    dims: &[usize],
    start: &[usize],
    stride: &[usize],
    edge: &[usize],
) -> Result<usize> {
    let rank = dims.len();
    assert!(
        start.len() == rank && stride.len() == rank && edge.len() == rank,
        "slab descriptor slices must all have length {}",
        rank,
    );
    if rank < 1 || rank > MAX_RANK {
        return Err(Error::RankOverflow { rank });
    }
    let mut n = 1;
    for k in 0..rank {
        check_axis(k, dims[k], start[k], stride[k], edge[k])?;
        n *= edge[k];
    }
    Ok(n)
}

impl<R: Read + Seek> Decoder<R> {
    /// Reads a strided 1-D slab: `edge` elements starting `start` elements
    /// past the cursor, one every `stride`.
    ///
    /// Returns the source bytes that landed in destination elements,
    /// `edge * ty.size()`. The cursor is left just past the gap following
    /// the last selected element.
    pub fn read_slab1<T: Element>(
        &mut self,
        dst: &mut [T],
        ty: DataType,
        start: usize,
        stride: usize,
        edge: usize,
    ) -> Result<usize> {
        if stride < 1 || edge < 1 {
            return Err(Error::Bounds { axis: 0, dim: 0, start, stride, edge });
        }
        if dst.len() < edge {
            return Err(Error::BufferTooSmall {
                given: dst.len() as u64,
                min: edge as u64,
            });
        }
        let es = ty.size();
        self.seek_rel((start * es) as i64)?;
        if stride == 1 {
            return self.read_data(&mut dst[..edge], ty);
        }
        let gap = ((stride - 1) * es) as i64;
        let mut nbytes = 0;
        for i in 0..edge {
            nbytes += self.read_data(&mut dst[i..i + 1], ty)?;
            self.seek_rel(gap)?;
        }
        Ok(nbytes)
    }

    /// Reads a strided 2-D slab out of a column-major array with extents
    /// `dims`.
    ///
    /// Whole contiguous reads collapse to a single pass: when
    /// `stride == [1, 1]` and `edge[0] == dims[0]`, the selection is one
    /// unbroken run of `edge[0] * edge[1]` elements.
    ///
    /// Returns the source bytes that landed in destination elements.
    ///
    /// # Panics
    ///
    /// Panics if `dims`, `start`, `stride` and `edge` are not all of
    /// length 2.
    pub fn read_slab2<T: Element>(
        &mut self,
        dst: &mut [T],
        ty: DataType,
        dims: &[usize],
        start: &[usize],
        stride: &[usize],
        edge: &[usize],
    ) -> Result<usize> {
        assert_eq!(dims.len(), 2, "read_slab2 requires a rank-2 descriptor");
        let n = check_slab(dims, start, stride, edge)?;
        if dst.len() < n {
            return Err(Error::BufferTooSmall {
                given: dst.len() as u64,
                min: n as u64,
            });
        }
        let es = ty.size();
        // Whole columns before the slab origin.
        self.seek_rel((start[1] * dims[0] * es) as i64)?;
        if stride[0] == 1 && edge[0] == dims[0] && stride[1] == 1 {
            return self.read_data(&mut dst[..n], ty);
        }
        let row_gap = ((stride[0] - 1) * es) as i64;
        let col_stride = (stride[1] * dims[0] * es) as i64;
        let mut nbytes = 0;
        let mut i = 0;
        for _ in 0..edge[1] {
            let col_pos = self.tell()? as i64;
            self.seek_rel((start[0] * es) as i64)?;
            for _ in 0..edge[0] {
                nbytes += self.read_data(&mut dst[i..i + 1], ty)?;
                self.seek_rel(row_gap)?;
                i += 1;
            }
            let here = self.tell()? as i64;
            self.seek_rel(col_pos + col_stride - here)?;
        }
        Ok(nbytes)
    }

    /// Reads a strided N-D slab (rank at most
    /// [`MAX_RANK`](constant.MAX_RANK.html)) out of a column-major array
    /// with extents `dims`.
    ///
    /// The walk reads one contiguous axis-0 run at a time; a carry loop
    /// over the higher axes then seeks to the next run's origin. The
    /// axis-0 tail seek can be backwards when `stride[0] > 1`.
    ///
    /// Returns the source bytes that landed in destination elements.
    ///
    /// # Panics
    ///
    /// Panics if `start`, `stride` and `edge` do not have `dims`'s length.
    pub fn read_slab_n<T: Element>(
        &mut self,
        dst: &mut [T],
        ty: DataType,
        dims: &[usize],
        start: &[usize],
        stride: &[usize],
        edge: &[usize],
    ) -> Result<usize> {
        let n = check_slab(dims, start, stride, edge)?;
        if dst.len() < n {
            return Err(Error::BufferTooSmall {
                given: dst.len() as u64,
                min: n as u64,
            });
        }
        let rank = dims.len();
        let es = ty.size() as i64;

        // dimp[k] is the column-major prefix product over dims[0..=k];
        // inc[k] is the element gap between consecutive starts on axis k.
        let mut dimp = [0i64; MAX_RANK];
        let mut inc = [0i64; MAX_RANK];
        let mut cnt = [0usize; MAX_RANK];
        dimp[0] = dims[0] as i64;
        let mut pos: i64 = 0;
        for k in 1..rank {
            dimp[k] = dimp[k - 1] * dims[k] as i64;
            inc[k] = (stride[k] as i64 - 1) * dimp[k - 1];
            pos += dimp[k - 1] * start[k] as i64;
        }
        self.seek_rel(pos * es)?;

        let (d0, s0, e0, t0) = (
            dims[0] as i64,
            start[0] as i64,
            edge[0] as i64,
            stride[0] as i64,
        );
        let mut nbytes = 0;
        let mut i = 0;
        while i < n {
            if start[0] > 0 {
                self.seek_rel(s0 * es)?;
                pos += s0;
            }
            if stride[0] == 1 {
                nbytes += self.read_data(&mut dst[i..i + edge[0]], ty)?;
                pos += d0 - s0;
                self.seek_rel((d0 - e0 - s0) * es)?;
            } else {
                for j in 0..edge[0] {
                    nbytes += self.read_data(&mut dst[i + j..i + j + 1], ty)?;
                    self.seek_rel((t0 - 1) * es)?;
                }
                pos += d0 - s0;
                self.seek_rel((d0 - e0 * t0 - s0) * es)?;
            }
            i += edge[0];
            // Carry to the next axis-0 run's origin.
            for k in 1..rank {
                cnt[k] += 1;
                if cnt[k] % edge[k] == 0 {
                    cnt[k] = 0;
                    if pos % dimp[k] != 0 {
                        let adv =
                            dimp[k] - pos % dimp[k] + dimp[k - 1] * start[k] as i64;
                        self.seek_rel(adv * es)?;
                        pos += adv;
                    } else if start[k] != 0 {
                        let adv = dimp[k - 1] * start[k] as i64;
                        self.seek_rel(adv * es)?;
                        pos += adv;
                    }
                } else {
                    self.seek_rel(inc[k] * es)?;
                    pos += inc[k];
                    break;
                }
            }
        }
        Ok(nbytes)
    }
}

impl<R> Decoder<R> {
    /// Reads a strided 1-D slab out of a compressed payload.
    ///
    /// The inflate stream is forked first and only the fork is advanced:
    /// after the call, `z`'s position is exactly where it was before.
    /// Returns the source bytes that landed in destination elements.
    pub fn read_compressed_slab1<T: Element, Z: Read>(
        &self,
        z: &mut InflateStream<Z>,
        dst: &mut [T],
        ty: DataType,
        start: usize,
        stride: usize,
        edge: usize,
    ) -> Result<usize> {
        if stride < 1 || edge < 1 {
            return Err(Error::Bounds { axis: 0, dim: 0, start, stride, edge });
        }
        if dst.len() < edge {
            return Err(Error::BufferTooSmall {
                given: dst.len() as u64,
                min: edge as u64,
            });
        }
        let mut z = z.fork();
        z.skip(ty, start)?;
        if stride == 1 {
            return self.read_compressed_data(&mut z, &mut dst[..edge], ty);
        }
        let mut nbytes = 0;
        for i in 0..edge {
            nbytes +=
                self.read_compressed_data(&mut z, &mut dst[i..i + 1], ty)?;
            if i + 1 < edge {
                z.skip(ty, stride - 1)?;
            }
        }
        Ok(nbytes)
    }

    /// Reads a strided 2-D slab out of a compressed payload. The parent
    /// stream's position is unchanged; see
    /// [`read_slab2`](struct.Decoder.html#method.read_slab2) for the
    /// geometry.
    ///
    /// # Panics
    ///
    /// Panics if `dims`, `start`, `stride` and `edge` are not all of
    /// length 2.
    pub fn read_compressed_slab2<T: Element, Z: Read>(
        &self,
        z: &mut InflateStream<Z>,
        dst: &mut [T],
        ty: DataType,
        dims: &[usize],
        start: &[usize],
        stride: &[usize],
        edge: &[usize],
    ) -> Result<usize> {
        assert_eq!(dims.len(), 2, "read_compressed_slab2 requires a rank-2 \
                                   descriptor");
        let n = check_slab(dims, start, stride, edge)?;
        if dst.len() < n {
            return Err(Error::BufferTooSmall {
                given: dst.len() as u64,
                min: n as u64,
            });
        }
        let mut z = z.fork();
        z.skip(ty, start[1] * dims[0])?;
        if stride[0] == 1 && edge[0] == dims[0] && stride[1] == 1 {
            return self.read_compressed_data(&mut z, &mut dst[..n], ty);
        }
        // Forward distance from just past a column's last selected element
        // to the next column's first element.
        let col_tail = dims[0] - (edge[0] - 1) * stride[0] - 1 - start[0]
            + (stride[1] - 1) * dims[0];
        let mut nbytes = 0;
        let mut i = 0;
        for col in 0..edge[1] {
            z.skip(ty, start[0])?;
            if stride[0] == 1 {
                nbytes += self.read_compressed_data(
                    &mut z,
                    &mut dst[i..i + edge[0]],
                    ty,
                )?;
                i += edge[0];
            } else {
                for _ in 0..edge[0] - 1 {
                    nbytes += self.read_compressed_data(
                        &mut z,
                        &mut dst[i..i + 1],
                        ty,
                    )?;
                    z.skip(ty, stride[0] - 1)?;
                    i += 1;
                }
                nbytes += self.read_compressed_data(
                    &mut z,
                    &mut dst[i..i + 1],
                    ty,
                )?;
                i += 1;
            }
            if col + 1 < edge[1] {
                z.skip(ty, col_tail)?;
            }
        }
        Ok(nbytes)
    }

    /// Reads a strided N-D slab (rank at most
    /// [`MAX_RANK`](constant.MAX_RANK.html)) out of a compressed payload.
    ///
    /// Same walk as [`read_slab_n`](struct.Decoder.html#method.read_slab_n)
    /// with forward skips in place of seeks: on a strided axis 0 the last
    /// element of each run is read rather than skipped, so the tail skip is
    /// one element shorter than the seek the uncompressed path makes. The
    /// parent stream's position is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `start`, `stride` and `edge` do not have `dims`'s length.
    pub fn read_compressed_slab_n<T: Element, Z: Read>(
        &self,
        z: &mut InflateStream<Z>,
        dst: &mut [T],
        ty: DataType,
        dims: &[usize],
        start: &[usize],
        stride: &[usize],
        edge: &[usize],
    ) -> Result<usize> {
        let n = check_slab(dims, start, stride, edge)?;
        if dst.len() < n {
            return Err(Error::BufferTooSmall {
                given: dst.len() as u64,
                min: n as u64,
            });
        }
        let rank = dims.len();
        let mut z = z.fork();

        let mut dimp = [0usize; MAX_RANK];
        let mut inc = [0usize; MAX_RANK];
        let mut cnt = [0usize; MAX_RANK];
        dimp[0] = dims[0];
        let mut pos = 0;
        for k in 1..rank {
            dimp[k] = dimp[k - 1] * dims[k];
            inc[k] = (stride[k] - 1) * dimp[k - 1];
            pos += dimp[k - 1] * start[k];
        }
        // Skip all data up to the starting indices.
        z.skip(ty, pos)?;

        let mut nbytes = 0;
        let mut i = 0;
        loop {
            if start[0] > 0 {
                z.skip(ty, start[0])?;
                pos += start[0];
            }
            if stride[0] == 1 {
                nbytes += self.read_compressed_data(
                    &mut z,
                    &mut dst[i..i + edge[0]],
                    ty,
                )?;
                pos += dims[0] - start[0];
                i += edge[0];
                if i == n {
                    break;
                }
                z.skip(ty, dims[0] - start[0] - edge[0])?;
            } else {
                for j in 0..edge[0] - 1 {
                    nbytes += self.read_compressed_data(
                        &mut z,
                        &mut dst[i + j..i + j + 1],
                        ty,
                    )?;
                    z.skip(ty, stride[0] - 1)?;
                }
                nbytes += self.read_compressed_data(
                    &mut z,
                    &mut dst[i + edge[0] - 1..i + edge[0]],
                    ty,
                )?;
                pos += dims[0] - start[0];
                i += edge[0];
                if i == n {
                    break;
                }
                // The run's last element was read, not skipped, hence the
                // trailing -1 relative to the uncompressed tail.
                z.skip(ty, dims[0] - (edge[0] - 1) * stride[0] - start[0] - 1)?;
            }
            // Carry to the next axis-0 run's origin.
            for k in 1..rank {
                cnt[k] += 1;
                if cnt[k] % edge[k] == 0 {
                    cnt[k] = 0;
                    if pos % dimp[k] != 0 {
                        let adv =
                            dimp[k] - pos % dimp[k] + dimp[k - 1] * start[k];
                        z.skip(ty, adv)?;
                        pos += adv;
                    } else if start[k] != 0 {
                        let adv = dimp[k - 1] * start[k];
                        z.skip(ty, adv)?;
                        pos += adv;
                    }
                } else {
                    if inc[k] != 0 {
                        z.skip(ty, inc[k])?;
                    }
                    pos += inc[k];
                    break;
                }
            }
        }
        Ok(nbytes)
    }
}
