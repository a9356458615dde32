//! Packed bit-vector storage with offset/length views.
//!
//! `BitStore` holds bits MSB-first: bit `i` of the visible window lives
//! at byte `(offset + i) / 8` under mask `0x80 >> ((offset + i) % 8)`.
//! The backing buffer is either an owned byte vector or a shared
//! read-only memory mapping. A store with a nonzero offset or a mapped
//! backing is a view and is never mutated in place; every mutating
//! operation requires an owned, offset-zero store, which the container
//! types guarantee by copying views out before mutation.
//!
//! Addressing (MSB0 vs LSB0) is an explicit strategy applied by the
//! callers when translating logical indices and ranges; all `BitStore`
//! operations below work in physical MSB0 coordinates.

use std::sync::Arc;

use memmap::Mmap;

use crate::error::{Error, Result};

/// Bit-indexing convention: which end of the bitstring is bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Bit 0 is the first (most significant) bit.
    Msb0,
    /// Bit 0 is the last (least significant) bit.
    Lsb0,
}

impl Addressing {
    /// Translate a logical bit index into a physical MSB0 index.
    pub fn index(self, len: usize, i: usize) -> usize {
        match self {
            Addressing::Msb0 => i,
            Addressing::Lsb0 => len - 1 - i,
        }
    }

    /// Translate a logical `[start, end)` range into a physical MSB0
    /// range. Under LSB0 the range is mirrored about the string centre:
    /// `new_start = len - end`, `new_end = len - start`.
    pub fn range(self, len: usize, start: usize, end: usize) -> (usize, usize) {
        match self {
            Addressing::Msb0 => (start, end),
            Addressing::Lsb0 => (len - end, len - start),
        }
    }
}

#[derive(Debug, Clone)]
enum Backing {
    Owned(Vec<u8>),
    Mapped(Arc<Mmap>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v,
            Backing::Mapped(m) => m,
        }
    }
}

/// A packed sequence of bits, possibly a windowed view onto a larger
/// immutable backing buffer.
#[derive(Debug, Clone)]
pub struct BitStore {
    backing: Backing,
    /// Bits to skip at the front of the backing buffer.
    offset: usize,
    /// Visible bit count.
    len: usize,
}

impl BitStore {
    pub fn new() -> Self {
        BitStore { backing: Backing::Owned(Vec::new()), offset: 0, len: 0 }
    }

    /// A store of `n` zero bits.
    pub fn zeros(n: usize) -> Self {
        BitStore { backing: Backing::Owned(vec![0u8; (n + 7) / 8]), offset: 0, len: n }
    }

    /// A store of `n` one bits.
    pub fn ones(n: usize) -> Self {
        let mut s = BitStore { backing: Backing::Owned(vec![0xffu8; (n + 7) / 8]), offset: 0, len: n };
        s.mask_tail();
        s
    }

    /// Take ownership of whole bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() * 8;
        BitStore { backing: Backing::Owned(bytes), offset: 0, len }
    }

    /// A windowed view over whole bytes, `offset` bits in, `len` bits
    /// long. Fails if the window exceeds the buffer.
    pub fn from_bytes_window(bytes: Vec<u8>, offset: usize, len: usize) -> Result<Self> {
        let total = bytes.len() * 8;
        if offset + len > total {
            return Err(Error::Creation(format!(
                "can't create a bitstring with a length of {} and an offset of {} from {} bits of data",
                len, offset, total
            )));
        }
        Ok(BitStore { backing: Backing::Owned(bytes), offset, len })
    }

    /// A view over a shared read-only memory mapping.
    pub fn from_mmap(map: Arc<Mmap>, offset: usize, len: Option<usize>) -> Result<Self> {
        let total = map.len() * 8;
        if offset > total {
            return Err(Error::Creation(format!(
                "offset of {} bits exceeds the {} bits in the mapped file",
                offset, total
            )));
        }
        let len = match len {
            Some(l) => {
                if offset + l > total {
                    return Err(Error::Creation(format!(
                        "can't create a bitstring with a length of {} and an offset of {} from {} bits of data",
                        l, offset, total
                    )));
                }
                l
            }
            None => total - offset,
        };
        Ok(BitStore { backing: Backing::Mapped(map), offset, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if this store shares or windows a buffer it does not fully
    /// own. Such stores must be copied before mutation.
    pub fn is_view(&self) -> bool {
        self.offset != 0 || matches!(self.backing, Backing::Mapped(_))
    }

    /// Physical bit read; `i` must be in bounds.
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        let p = self.offset + i;
        (self.backing.bytes()[p / 8] >> (7 - (p % 8))) & 1 == 1
    }

    /// Physical bit write. Requires an owned, offset-zero store.
    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < self.len);
        debug_assert!(!self.is_view());
        let bytes = match &mut self.backing {
            Backing::Owned(v) => v,
            Backing::Mapped(_) => unreachable!("set on mapped view"),
        };
        let mask = 0x80u8 >> (i % 8);
        if value {
            bytes[i / 8] |= mask;
        } else {
            bytes[i / 8] &= !mask;
        }
    }

    /// Copy `[start, end)` into a new store. Mapped backings keep the
    /// window shared instead of copying.
    pub fn get_slice(&self, start: usize, end: usize) -> BitStore {
        debug_assert!(start <= end && end <= self.len);
        if let Backing::Mapped(map) = &self.backing {
            return BitStore {
                backing: Backing::Mapped(Arc::clone(map)),
                offset: self.offset + start,
                len: end - start,
            };
        }
        self.copy_slice(start, end)
    }

    /// Copy `[start, end)` into a fresh owned store.
    pub fn copy_slice(&self, start: usize, end: usize) -> BitStore {
        debug_assert!(start <= end && end <= self.len);
        let n = end - start;
        let src_start = self.offset + start;
        let bytes = self.backing.bytes();
        let mut out = vec![0u8; (n + 7) / 8];
        if src_start % 8 == 0 {
            let first = src_start / 8;
            out.copy_from_slice(&bytes[first..first + (n + 7) / 8]);
        } else {
            // Unaligned: stitch each output byte from two input bytes.
            let shift = src_start % 8;
            let first = src_start / 8;
            for (k, slot) in out.iter_mut().enumerate() {
                let hi = bytes[first + k] << shift;
                let lo = if first + k + 1 < bytes.len() {
                    bytes[first + k + 1] >> (8 - shift)
                } else {
                    0
                };
                *slot = hi | lo;
            }
        }
        let mut store = BitStore { backing: Backing::Owned(out), offset: 0, len: n };
        store.mask_tail();
        store
    }

    /// Normalize into an owned, offset-zero store, copying if needed.
    pub fn into_owned(self) -> BitStore {
        if self.is_view() {
            self.copy_slice(0, self.len)
        } else {
            self
        }
    }

    /// The visible bits as zero-padded whole bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        if !self.is_view() {
            let mut v = self.backing.bytes().to_vec();
            v.truncate((self.len + 7) / 8);
            let mut s = BitStore { backing: Backing::Owned(v), offset: 0, len: self.len };
            s.mask_tail();
            match s.backing {
                Backing::Owned(v) => v,
                Backing::Mapped(_) => unreachable!(),
            }
        } else {
            match self.copy_slice(0, self.len).backing {
                Backing::Owned(v) => v,
                Backing::Mapped(_) => unreachable!(),
            }
        }
    }

    /// Append one bit. Requires an owned, offset-zero store.
    pub fn push(&mut self, value: bool) {
        debug_assert!(!self.is_view());
        let bytes = match &mut self.backing {
            Backing::Owned(v) => v,
            Backing::Mapped(_) => unreachable!("push on mapped view"),
        };
        if self.len % 8 == 0 {
            bytes.push(0);
        }
        self.len += 1;
        if value {
            let i = self.len - 1;
            bytes[i / 8] |= 0x80u8 >> (i % 8);
        }
    }

    /// Append all of `other`. Requires an owned, offset-zero store.
    pub fn extend(&mut self, other: &BitStore) {
        debug_assert!(!self.is_view());
        if self.len % 8 == 0 {
            let bytes = match &mut self.backing {
                Backing::Owned(v) => v,
                Backing::Mapped(_) => unreachable!(),
            };
            bytes.truncate(self.len / 8);
            bytes.extend_from_slice(&other.to_bytes());
            self.len += other.len;
            self.mask_tail();
        } else {
            for i in 0..other.len {
                self.push(other.get(i));
            }
        }
    }

    /// Replace `[start, end)` with `replacement`, growing or shrinking
    /// as needed. Requires an owned, offset-zero store.
    pub fn splice(&mut self, start: usize, end: usize, replacement: &BitStore) {
        debug_assert!(start <= end && end <= self.len);
        debug_assert!(!self.is_view());
        let mut out = self.copy_slice(0, start);
        out.extend(replacement);
        out.extend(&self.copy_slice(end, self.len));
        *self = out;
    }

    /// Flip every visible bit. Requires an owned, offset-zero store.
    pub fn invert_all(&mut self) {
        debug_assert!(!self.is_view());
        let bytes = match &mut self.backing {
            Backing::Owned(v) => v,
            Backing::Mapped(_) => unreachable!(),
        };
        for b in bytes.iter_mut() {
            *b = !*b;
        }
        self.mask_tail();
    }

    /// Reverse the bit order in place. Requires an owned, offset-zero
    /// store.
    pub fn reverse(&mut self) {
        debug_assert!(!self.is_view());
        let n = self.len;
        let mut out = BitStore::zeros(n);
        for i in 0..n {
            if self.get(i) {
                out.set(n - 1 - i, true);
            }
        }
        *self = out;
    }

    pub fn any_set(&self) -> bool {
        (0..self.len).any(|i| self.get(i))
    }

    pub fn all_set(&self) -> bool {
        (0..self.len).all(|i| self.get(i))
    }

    /// Number of one bits.
    pub fn count_ones(&self) -> usize {
        if self.offset % 8 == 0 && self.len % 8 == 0 {
            let first = self.offset / 8;
            let bytes = &self.backing.bytes()[first..first + self.len / 8];
            return bytes.iter().map(|b| b.count_ones() as usize).sum();
        }
        (0..self.len).filter(|&i| self.get(i)).count()
    }

    /// Read up to 128 bits starting at `start` as a big-endian unsigned
    /// integer.
    pub fn read_u128(&self, start: usize, width: usize) -> u128 {
        debug_assert!(width <= 128 && start + width <= self.len);
        let mut v: u128 = 0;
        for i in 0..width {
            v = (v << 1) | (self.get(start + i) as u128);
        }
        v
    }

    /// A store of `width` bits holding `value` big-endian.
    pub fn from_u128(value: u128, width: usize) -> BitStore {
        debug_assert!(width <= 128);
        let mut s = BitStore::zeros(width);
        for i in 0..width {
            if (value >> (width - 1 - i)) & 1 == 1 {
                s.set(i, true);
            }
        }
        s
    }

    /// Compare `[start, start + other.len)` against all of `other`.
    pub fn matches_at(&self, other: &BitStore, start: usize) -> bool {
        debug_assert!(start + other.len <= self.len);
        (0..other.len).all(|i| self.get(start + i) == other.get(i))
    }

    /// Leftmost match of `sub` in `[start, end)`, optionally restricted
    /// to byte-aligned positions.
    pub fn find(&self, sub: &BitStore, start: usize, end: usize, byte_aligned: bool) -> Option<usize> {
        if sub.len == 0 || sub.len > end.saturating_sub(start) {
            return None;
        }
        let last = end - sub.len;
        if byte_aligned {
            let mut p = (start + 7) / 8 * 8;
            while p <= last {
                if self.matches_at(sub, p) {
                    return Some(p);
                }
                p += 8;
            }
            None
        } else {
            (start..=last).find(|&p| self.matches_at(sub, p))
        }
    }

    /// Rightmost match of `sub` in `[start, end)`.
    pub fn rfind(&self, sub: &BitStore, start: usize, end: usize, byte_aligned: bool) -> Option<usize> {
        if sub.len == 0 || sub.len > end.saturating_sub(start) {
            return None;
        }
        let last = end - sub.len;
        if byte_aligned {
            let mut p = last / 8 * 8;
            loop {
                if p >= start && self.matches_at(sub, p) {
                    return Some(p);
                }
                if p < 8 || p < start + 8 {
                    return None;
                }
                p -= 8;
            }
        } else {
            (start..=last).rev().find(|&p| self.matches_at(sub, p))
        }
    }

    /// Zero any backing bits past the visible length in the final byte.
    fn mask_tail(&mut self) {
        if self.len % 8 == 0 {
            return;
        }
        if let Backing::Owned(v) = &mut self.backing {
            let last = self.len / 8;
            if last < v.len() {
                let keep = self.len % 8;
                v[last] &= 0xffu8 << (8 - keep);
                v.truncate(last + 1);
            }
        }
    }
}

impl Default for BitStore {
    fn default() -> Self {
        BitStore::new()
    }
}

impl PartialEq for BitStore {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && (0..self.len).all(|i| self.get(i) == other.get(i))
    }
}

impl Eq for BitStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_unaligned_copy() {
        let s = BitStore::from_bytes(vec![0b1010_1100, 0b0011_0101]);
        let sub = s.copy_slice(3, 11);
        assert_eq!(sub.len(), 8);
        assert_eq!(sub.to_bytes(), vec![0b0110_0001]);
    }

    #[test]
    fn lsb0_range_mirror() {
        let (s, e) = Addressing::Lsb0.range(8, 1, 3);
        assert_eq!((s, e), (5, 7));
        assert_eq!(Addressing::Lsb0.index(4, 0), 3);
    }

    #[test]
    fn splice_grows_and_shrinks() {
        let mut s = BitStore::from_u128(0b1111_0000, 8);
        s.splice(4, 8, &BitStore::from_u128(0b10, 2));
        assert_eq!(s.len(), 6);
        assert_eq!(s.read_u128(0, 6), 0b1111_10);
    }
}
