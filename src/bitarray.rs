//! The mutable bitstring type.
//!
//! `BitArray` derefs to [`Bits`] for everything read-only and adds the
//! in-place operations. Its store is always owned with a zero bit
//! offset, so mutation never touches a shared mapping or window.

use std::ops::{Deref, DerefMut};

use crate::bits::Bits;
use crate::config;
use crate::error::{Error, Result};
use crate::store::{Addressing, BitStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitArray {
    bits: Bits,
}

impl BitArray {
    pub fn empty() -> BitArray {
        BitArray { bits: Bits::empty() }
    }

    /// Build from a token format string with literal values; see
    /// [`Bits::new`].
    pub fn new(fmt: &str) -> Result<BitArray> {
        Ok(BitArray::from_bits(Bits::new(fmt)?))
    }

    /// Take ownership of a `Bits`, copying out of any shared view.
    pub fn from_bits(bits: Bits) -> BitArray {
        BitArray { bits: Bits::from_store(bits.into_store().into_owned()) }
    }

    pub fn zeros(n: usize) -> BitArray {
        BitArray { bits: Bits::zeros(n) }
    }

    pub fn ones(n: usize) -> BitArray {
        BitArray { bits: Bits::ones(n) }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> BitArray {
        BitArray { bits: Bits::from_bytes(bytes) }
    }

    /// An immutable copy of the current content.
    pub fn to_bits(&self) -> Bits {
        self.bits.clone()
    }

    pub fn into_bits(self) -> Bits {
        self.bits
    }

    pub(crate) fn store(&self) -> &BitStore {
        self.bits.store()
    }

    pub(crate) fn store_mut(&mut self) -> &mut BitStore {
        self.bits.store_mut()
    }

    // ==================== growing and shrinking ====================

    /// Add `bs` after the last logical bit.
    pub fn append(&mut self, bs: &Bits) {
        match config::addressing() {
            Addressing::Msb0 => self.store_mut().extend(bs.store()),
            Addressing::Lsb0 => self.store_mut().splice(0, 0, bs.store()),
        }
    }

    /// Add `bs` before the first logical bit.
    pub fn prepend(&mut self, bs: &Bits) {
        match config::addressing() {
            Addressing::Msb0 => self.store_mut().splice(0, 0, bs.store()),
            Addressing::Lsb0 => self.store_mut().extend(bs.store()),
        }
    }

    /// Insert `bs` so that its first bit lands at logical position
    /// `pos`.
    pub fn insert(&mut self, bs: &Bits, pos: usize) -> Result<()> {
        let len = self.len();
        if pos > len {
            return Err(Error::InvalidParameter(format!(
                "insert position {} is past the end of the bitstring (length {})",
                pos, len
            )));
        }
        let phys = match config::addressing() {
            Addressing::Msb0 => pos,
            Addressing::Lsb0 => len - pos,
        };
        self.store_mut().splice(phys, phys, bs.store());
        Ok(())
    }

    /// Replace the bits at `[pos, pos + bs.len())` with `bs`.
    pub fn overwrite(&mut self, bs: &Bits, pos: usize) -> Result<()> {
        let (start, end) = self.validate_range(Some(pos), Some(pos + bs.len())).map_err(|_| {
            Error::InvalidParameter(format!(
                "overwrite of {} bits at position {} runs past the end of the bitstring (length {})",
                bs.len(),
                pos,
                self.len()
            ))
        })?;
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        self.store_mut().splice(ps, pe, bs.store());
        Ok(())
    }

    /// Remove the bits in `[start, end)`.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<()> {
        let (start, end) = self.validate_range(Some(start), Some(end))?;
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        self.store_mut().splice(ps, pe, &BitStore::new());
        Ok(())
    }

    /// Replace the bits in `[start, end)` with `bs`, which may have a
    /// different length.
    pub fn set_slice(&mut self, start: usize, end: usize, bs: &Bits) -> Result<()> {
        let (start, end) = self.validate_range(Some(start), Some(end))?;
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        self.store_mut().splice(ps, pe, bs.store());
        Ok(())
    }

    /// Replace occurrences of `old` with `new`, leftmost first and
    /// non-overlapping. Returns how many replacements were made.
    pub fn replace(
        &mut self,
        old: &Bits,
        new: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        count: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<usize> {
        if old.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot replace an empty bitstring".to_string(),
            ));
        }
        let (start, end) = self.validate_range(start, end)?;
        let mut positions = Vec::new();
        let mut from = start;
        while positions.len() < count.unwrap_or(usize::MAX) {
            match self.bits.find(old, Some(from), Some(end), byte_aligned)? {
                Some(p) => {
                    positions.push(p);
                    from = p + old.len();
                }
                None => break,
            }
        }
        if positions.is_empty() {
            return Ok(0);
        }
        // Assemble the logical pieces, then lay them down in physical
        // order.
        let mut parts: Vec<BitStore> = Vec::new();
        let mut cursor = 0usize;
        for &p in &positions {
            let keep = self.bits.slice(cursor, p)?;
            parts.push(keep.store().copy_slice(0, keep.len()));
            parts.push(new.store().copy_slice(0, new.len()));
            cursor = p + old.len();
        }
        let tail = self.bits.slice(cursor, self.len())?;
        parts.push(tail.store().copy_slice(0, tail.len()));
        let mut rebuilt = BitStore::new();
        match config::addressing() {
            Addressing::Msb0 => {
                for part in &parts {
                    rebuilt.extend(part);
                }
            }
            Addressing::Lsb0 => {
                for part in parts.iter().rev() {
                    rebuilt.extend(part);
                }
            }
        }
        *self.store_mut() = rebuilt;
        Ok(positions.len())
    }

    pub fn clear(&mut self) {
        *self.store_mut() = BitStore::new();
    }

    // ==================== in-place bit twiddling ====================

    /// Set the bit at logical index `i`; negative indices count from
    /// the end.
    pub fn set_bit(&mut self, i: i64, value: bool) -> Result<()> {
        let idx = self.bits.resolve_index(i)?;
        let phys = config::addressing().index(self.len(), idx);
        self.store_mut().set(phys, value);
        Ok(())
    }

    /// Set every listed position to `value`.
    pub fn set(&mut self, value: bool, positions: &[i64]) -> Result<()> {
        for &p in positions {
            self.set_bit(p, value)?;
        }
        Ok(())
    }

    pub fn set_all(&mut self, value: bool) {
        let len = self.len();
        *self.store_mut() = if value { BitStore::ones(len) } else { BitStore::zeros(len) };
    }

    /// Flip every listed position.
    pub fn invert(&mut self, positions: &[i64]) -> Result<()> {
        for &p in positions {
            let idx = self.bits.resolve_index(p)?;
            let phys = config::addressing().index(self.len(), idx);
            let current = self.store().get(phys);
            self.store_mut().set(phys, !current);
        }
        Ok(())
    }

    pub fn invert_all(&mut self) {
        self.store_mut().invert_all();
    }

    /// Reverse the bit order of `[start, end)`, or of the whole
    /// bitstring.
    pub fn reverse(&mut self, start: Option<usize>, end: Option<usize>) -> Result<()> {
        let (start, end) = self.validate_range(start, end)?;
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        let mut segment = self.store().copy_slice(ps, pe);
        segment.reverse();
        self.store_mut().splice(ps, pe, &segment);
        Ok(())
    }

    /// Rotate `[start, end)` towards higher logical positions by `n`
    /// bits, wrapping around.
    pub fn ror(&mut self, n: usize, start: Option<usize>, end: Option<usize>) -> Result<()> {
        self.rotate(n, start, end, true)
    }

    /// Rotate `[start, end)` towards lower logical positions by `n`
    /// bits, wrapping around.
    pub fn rol(&mut self, n: usize, start: Option<usize>, end: Option<usize>) -> Result<()> {
        self.rotate(n, start, end, false)
    }

    fn rotate(
        &mut self,
        n: usize,
        start: Option<usize>,
        end: Option<usize>,
        right: bool,
    ) -> Result<()> {
        let (start, end) = self.validate_range(start, end)?;
        if start == end {
            return Err(Error::InvalidParameter(
                "cannot rotate an empty bitstring".to_string(),
            ));
        }
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        let seg_len = pe - ps;
        // A logical right rotation is a physical left rotation under
        // LSB0 addressing.
        let phys_right = match config::addressing() {
            Addressing::Msb0 => right,
            Addressing::Lsb0 => !right,
        };
        let rot = n % seg_len;
        if rot == 0 {
            return Ok(());
        }
        let split = if phys_right { seg_len - rot } else { rot };
        let mut rotated = self.store().copy_slice(ps + split, pe);
        rotated.extend(&self.store().copy_slice(ps, ps + split));
        self.store_mut().splice(ps, pe, &rotated);
        Ok(())
    }

    /// Reverse the byte order of groups of bytes across `[start, end)`.
    /// `pattern` gives the group sizes in bytes and is repeated across
    /// the range when `repeat` is set. Returns the number of complete
    /// pattern repetitions swapped.
    pub fn byteswap(
        &mut self,
        pattern: &[usize],
        start: Option<usize>,
        end: Option<usize>,
        repeat: bool,
    ) -> Result<usize> {
        let (start, end) = self.validate_range(start, end)?;
        if start % 8 != 0 || (end - start) % 8 != 0 {
            return Err(Error::ByteAlign(format!(
                "byteswap needs a whole-byte range, got bits [{}, {})",
                start, end
            )));
        }
        if pattern.is_empty() || pattern.contains(&0) {
            return Err(Error::InvalidParameter(
                "byteswap pattern must be non-empty with no zero-sized groups".to_string(),
            ));
        }
        let pattern_bytes: usize = pattern.iter().sum();
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        let mut bytes = self.store().copy_slice(ps, pe).to_bytes();
        let total = bytes.len();
        let mut offset = 0usize;
        let mut repetitions = 0usize;
        while offset + pattern_bytes <= total {
            for &group in pattern {
                bytes[offset..offset + group].reverse();
                offset += group;
            }
            repetitions += 1;
            if !repeat {
                break;
            }
        }
        self.store_mut().splice(ps, pe, &BitStore::from_bytes(bytes));
        Ok(repetitions)
    }
}

impl Deref for BitArray {
    type Target = Bits;

    fn deref(&self) -> &Bits {
        &self.bits
    }
}

impl DerefMut for BitArray {
    fn deref_mut(&mut self) -> &mut Bits {
        &mut self.bits
    }
}

impl From<Bits> for BitArray {
    fn from(bits: Bits) -> BitArray {
        BitArray::from_bits(bits)
    }
}

impl From<BitArray> for Bits {
    fn from(array: BitArray) -> Bits {
        array.into_bits()
    }
}

impl PartialEq<Bits> for BitArray {
    fn eq(&self, other: &Bits) -> bool {
        self.bits == *other
    }
}

impl PartialEq<BitArray> for Bits {
    fn eq(&self, other: &BitArray) -> bool {
        *self == other.bits
    }
}

impl std::fmt::Display for BitArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.bits.fmt(f)
    }
}
