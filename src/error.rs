//! Crate-wide error type.

/// Errors raised by bitstring construction, interpretation, reading and
/// mutation. Every variant carries a message naming the offending token,
/// value or length, since a format string assembled at runtime is often
/// the only diagnostic context a caller has.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed literal, invalid or unsupported length for a format,
    /// negative length/offset, or a view exceeding its backing buffer.
    #[error("creation: {0}")]
    Creation(String),
    /// An interpretation whose length constraint is not met (hex needs a
    /// multiple of 4 bits, bytes a multiple of 8, ...), or interpreting
    /// an empty bitstring as a number.
    #[error("interpretation: {0}")]
    Interpretation(String),
    /// Sequential read or peek past the end of available bits, or a
    /// delimiter not found by `readto`.
    #[error("read: {0}")]
    Read(String),
    /// A byte-position view was requested while the cursor is not on a
    /// byte boundary.
    #[error("byte alignment: {0}")]
    ByteAlign(String),
    /// Bad arguments: out-of-range start/end, empty search pattern,
    /// mismatched operand lengths for binary bitwise ops, and similar.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
