//! # bitstrings — construct, analyse and modify binary data bit by bit
//!
//! Bitstrings of arbitrary length with a format mini-language for
//! building and interpreting them: fixed-width integers of either bit
//! or byte endianness, IEEE and 8/16-bit minifloats, hex/oct/bin
//! literals, padding and exponential-Golomb codes.
//!
//! ## The types
//!
//! - [`Bits`]: an immutable bitstring.
//! - [`BitArray`]: a mutable bitstring (insert, overwrite, replace,
//!   rotate, byteswap and friends).
//! - [`ConstBitStream`] / [`BitStream`]: a bitstring plus a read
//!   position, with `read`/`peek`/`readlist` driven by format strings.
//! - [`Array`]: consecutive elements of one fixed-length format.
//!
//! ## Format strings
//!
//! A format is a comma-separated list of tokens such as `"uint:12"`,
//! `"intle16"`, `"float:32"`, `"bfloat"`, `"hex:8"`, `"bool"`,
//! `"pad:4"`, `"ue"` or a literal like `"0x1f"`. Struct-style compact
//! formats (`">HH"`, `"<2e"`) and repetition (`"3*uint:8"`) expand to
//! the same tokens.
//!
//! ## Usage
//!
//! ```no_run
//! use bitstrings::{pack, Bits, ConstBitStream, Value};
//!
//! let b = Bits::new("uint:12=400, 0b110")?;
//! assert_eq!(b.len(), 15);
//!
//! let s = pack("uint:8, hex:16=dead", &[Value::Uint(7)])?;
//! let mut r = ConstBitStream::from_bits(s.to_bits());
//! assert_eq!(r.read("uint:8")?, Value::Uint(7));
//! # Ok::<(), bitstrings::Error>(())
//! ```
//!
//! Bit positions count from the most significant bit of the first byte
//! by default; [`set_lsb0`] switches the whole process to
//! least-significant-bit-first addressing and must be called before any
//! bitstrings are made.

pub mod array;
pub mod bitarray;
pub mod bits;
pub mod codec;
pub mod config;
pub mod dtype;
pub mod error;
pub mod fp8;
pub mod pack;
pub mod parser;
pub mod pp;
pub mod store;
pub mod stream;
pub mod value;

pub use array::{Array, Operand};
pub use bitarray::BitArray;
pub use bits::Bits;
pub use config::{bytealigned, lsb0, set_bytealigned, set_lsb0};
pub use dtype::{Dtype, DtypeName};
pub use error::{Error, Result};
pub use pack::{pack, pack_with};
pub use pp::pretty_print;
pub use stream::{BitStream, ConstBitStream};
pub use value::Value;
