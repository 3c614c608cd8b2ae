use std::fmt;
use std::io;
use std::result;

use crate::MAX_RANK;

/// A convenient type alias for `Result<T, matslab::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// Error describes all the possible errors that may occur while decoding a
/// numeric payload.
///
/// Unsupported type-tag/destination combinations are deliberately *not* an
/// error: they report zero bytes consumed and leave the cursor alone, so a
/// file parser can note the oddity and carry on with the next variable.
/// Everything below is fatal to the current read.
#[derive(Debug)]
pub enum Error {
    /// This error occurs when the destination buffer is too small to hold
    /// the number of elements the read would produce.
    BufferTooSmall {
        /// The size of the given destination buffer, in elements.
        given: u64,
        /// The minimum size of the destination buffer, in elements.
        min: u64,
    },
    /// This error occurs when a slab descriptor's rank is outside the
    /// supported range `1..=MAX_RANK`.
    RankOverflow {
        /// The rank that was given.
        rank: usize,
    },
    /// This error occurs when a slab descriptor selects elements outside
    /// the array along some axis, or carries a zero stride or edge.
    ///
    /// For the dimensionless 1-D reader, `dim` is reported as zero.
    Bounds {
        /// The axis on which the descriptor is invalid.
        axis: usize,
        /// The extent of the array along that axis.
        dim: usize,
        /// The start index given for that axis.
        start: usize,
        /// The stride given for that axis.
        stride: usize,
        /// The edge (element count) given for that axis.
        edge: usize,
    },
    /// This error occurs when the byte stream ends in the middle of the
    /// requested elements.
    Truncated {
        /// The total number of bytes the read required.
        expected: u64,
        /// The number of bytes actually drawn before the end.
        got: u64,
    },
    /// This error occurs when the compressed stream contains invalid
    /// deflate data.
    Corrupt,
    /// This error occurs when the underlying byte source fails a read,
    /// seek or tell.
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        use self::Error::*;
        match (self, other) {
            (
                &BufferTooSmall { given: given1, min: min1 },
                &BufferTooSmall { given: given2, min: min2 },
            ) => (given1, min1) == (given2, min2),
            (&RankOverflow { rank: rank1 }, &RankOverflow { rank: rank2 }) => {
                rank1 == rank2
            }
            (
                &Bounds { axis: a1, dim: d1, start: s1, stride: t1, edge: e1 },
                &Bounds { axis: a2, dim: d2, start: s2, stride: t2, edge: e2 },
            ) => (a1, d1, s1, t1, e1) == (a2, d2, s2, t2, e2),
            (
                &Truncated { expected: exp1, got: got1 },
                &Truncated { expected: exp2, got: got2 },
            ) => (exp1, got1) == (exp2, got2),
            (&Corrupt, &Corrupt) => true,
            (&Io(ref err1), &Io(ref err2)) => err1.kind() == err2.kind(),
            _ => false,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::BufferTooSmall { given, min } => write!(
                f,
                "matslab: destination buffer (size = {}) is smaller than \
                 required (size = {})",
                given, min
            ),
            Error::RankOverflow { rank } => write!(
                f,
                "matslab: slab rank {} is outside the supported range 1..={}",
                rank, MAX_RANK
            ),
            Error::Bounds { axis, dim, start, stride, edge } => write!(
                f,
                "matslab: slab descriptor selects elements outside the \
                 array on axis {} (start = {}, stride = {}, edge = {}, \
                 extent = {})",
                axis, start, stride, edge, dim
            ),
            Error::Truncated { expected, got } => write!(
                f,
                "matslab: stream ended after {} of {} required bytes",
                got, expected
            ),
            Error::Corrupt => write!(f, "matslab: corrupt deflate stream"),
            Error::Io(ref err) => write!(f, "matslab: I/O error: {}", err),
        }
    }
}
