/*!
This crate provides the numeric-payload decoder of a MATLAB MAT version 5
file reader: it materialises typed numeric arrays, or strided rectangular
sub-arrays ("slabs") of them, out of a MAT v5 byte stream, whether that
stream is raw file bytes or the output of an embedded zlib/DEFLATE block.

The two central types are:

* [`Decoder`](struct.Decoder.html)
  wraps the byte source together with the file's byte-order flag, and
  exposes the typed element readers and the slab readers.
* [`InflateStream`](struct.InflateStream.html)
  is a forward-only view of a compressed payload with `pull`, `skip` and
  `fork` operations; the compressed reader and slab methods on `Decoder`
  take one of these as their cursor.

Values are decoded into any of the ten primitive numeric destination types
(everything implementing [`Element`](trait.Element.html)), or into 8-bit
character cells through the dedicated char readers. The on-disk element
type is named by a [`DataType`](enum.DataType.html) tag and need not match
the destination: conversions widen or narrow per the usual numeric casts.

# Example: decode five unsigned bytes into an `f64` buffer

```rust
use std::io::Cursor;

use matslab::{DataType, Decoder};

let payload: &[u8] = &[0, 1, 127, 128, 255];
let mut dec = Decoder::new(Cursor::new(payload), false);
let mut out = [0f64; 5];
dec.read_data(&mut out, DataType::U8)?;
assert_eq!(out, [0.0, 1.0, 127.0, 128.0, 255.0]);
# Ok::<(), matslab::Error>(())
```

Discovering variables in the file envelope and assembling MATLAB classes
(structs, cells, sparse matrices) out of decoded arrays are the business of
a surrounding reader, not of this crate.
*/

pub use crate::error::{Error, Result};
pub use crate::inflate::InflateStream;
pub use crate::read::Decoder;
pub use crate::tag::{Class, DataType, Element};

/// The highest slab rank the N-D readers accept.
pub const MAX_RANK: usize = 10;

/// Size in bytes of the stack-local batch buffer the typed element readers
/// convert through. Holds 1024 one-byte elements down to 128 eight-byte
/// elements per batch.
const BLOCK_SIZE: usize = 1024;

mod bytes;
mod error;
mod inflate;
mod read;
mod slab;
mod tag;
