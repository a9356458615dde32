//! The immutable bitstring value type.
//!
//! `Bits` wraps one [`BitStore`] and never mutates it. Construction goes
//! through explicit named constructors (token literals, bytes, files,
//! numeric encodes, bool iterables); interpretation goes through the
//! `to_*` accessors or [`Bits::interpret`]. Logical indices and ranges
//! honour the process-wide MSB0/LSB0 addressing mode.

use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use memmap::Mmap;

use crate::codec;
use crate::config;
use crate::dtype::DtypeName;
use crate::error::{Error, Result};
use crate::parser::{self, Token, TokenKind, TokenLength};
use crate::store::{Addressing, BitStore};
use crate::value::Value;

/// How many hex digits `Display` shows before truncating.
const MAX_CHARS: usize = 250;

#[derive(Debug, Clone)]
pub struct Bits {
    store: BitStore,
}

impl Bits {
    // ==================== construction ====================

    /// An empty bitstring.
    pub fn empty() -> Bits {
        Bits { store: BitStore::new() }
    }

    /// Build from a token format string with literal values, e.g.
    /// `"uint:12=400, 0b110"`. Every token must carry a value (or be a
    /// `pad` with a length).
    pub fn new(fmt: &str) -> Result<Bits> {
        let parsed = parser::parse_format(fmt, &[])?;
        let mut store = BitStore::new();
        for token in &parsed.tokens {
            store.extend(&store_from_literal_token(token)?);
        }
        Ok(Bits { store })
    }

    pub(crate) fn from_store(store: BitStore) -> Bits {
        Bits { store }
    }

    pub(crate) fn store(&self) -> &BitStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut BitStore {
        &mut self.store
    }

    pub(crate) fn into_store(self) -> BitStore {
        self.store
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Bits {
        Bits { store: BitStore::from_bytes(bytes.into()) }
    }

    /// A view over whole bytes skipping `offset` bits and keeping `len`
    /// bits.
    pub fn from_bytes_window(bytes: impl Into<Vec<u8>>, offset: usize, len: usize) -> Result<Bits> {
        Ok(Bits { store: BitStore::from_bytes_window(bytes.into(), offset, len)? })
    }

    /// Memory-map a file read-only and view `length` bits starting
    /// `offset` bits in. The mapping is shared by all slices taken from
    /// the result and stays alive until the last one is dropped.
    pub fn from_file(
        path: impl AsRef<Path>,
        offset: Option<usize>,
        length: Option<usize>,
    ) -> Result<Bits> {
        let file = std::fs::File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        let store = BitStore::from_mmap(Arc::new(map), offset.unwrap_or(0), length)?;
        Ok(Bits { store })
    }

    pub fn zeros(n: usize) -> Bits {
        Bits { store: BitStore::zeros(n) }
    }

    pub fn ones(n: usize) -> Bits {
        Bits { store: BitStore::ones(n) }
    }

    pub fn from_bools(bools: impl IntoIterator<Item = bool>) -> Bits {
        let mut store = BitStore::new();
        for b in bools {
            store.push(b);
        }
        Bits { store }
    }

    pub fn from_bin(s: &str) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_bin(s)? })
    }

    pub fn from_hex(s: &str) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_hex(s)? })
    }

    pub fn from_oct(s: &str) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_oct(s)? })
    }

    pub fn from_uint(v: u128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_uint(v, length)? })
    }

    pub fn from_int(v: i128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_int(v, length)? })
    }

    pub fn from_uintbe(v: u128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_uintbe(v, length)? })
    }

    pub fn from_intbe(v: i128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_intbe(v, length)? })
    }

    pub fn from_uintle(v: u128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_uintle(v, length)? })
    }

    pub fn from_intle(v: i128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_intle(v, length)? })
    }

    pub fn from_uintne(v: u128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_uintne(v, length)? })
    }

    pub fn from_intne(v: i128, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_intne(v, length)? })
    }

    /// Big-endian IEEE float of 16, 32 or 64 bits.
    pub fn from_float(x: f64, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_float(x, length, false)? })
    }

    pub fn from_floatle(x: f64, length: usize) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_float(x, length, true)? })
    }

    pub fn from_bfloat(x: f64) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_bfloat(x, false)? })
    }

    pub fn from_bool(b: bool) -> Bits {
        let mut store = BitStore::new();
        store.push(b);
        Bits { store }
    }

    pub fn from_ue(v: u128) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_ue(v)? })
    }

    pub fn from_se(v: i128) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_se(v)? })
    }

    pub fn from_uie(v: u128) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_uie(v)? })
    }

    pub fn from_sie(v: i128) -> Result<Bits> {
        Ok(Bits { store: codec::store_from_sie(v)? })
    }

    // ==================== basics ====================

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The bit at logical index `i`; negative indices count from the
    /// end. Honours the addressing mode.
    pub fn get(&self, i: i64) -> Result<bool> {
        let idx = self.resolve_index(i)?;
        let phys = config::addressing().index(self.len(), idx);
        Ok(self.store.get(phys))
    }

    /// The logical sub-string `[start, end)`. Honours the addressing
    /// mode.
    pub fn slice(&self, start: usize, end: usize) -> Result<Bits> {
        let (start, end) = self.validate_range(Some(start), Some(end))?;
        let (ps, pe) = config::addressing().range(self.len(), start, end);
        Ok(Bits { store: self.store.get_slice(ps, pe) })
    }

    pub(crate) fn resolve_index(&self, i: i64) -> Result<usize> {
        let len = self.len() as i64;
        let idx = if i < 0 { len + i } else { i };
        if idx < 0 || idx >= len {
            return Err(Error::InvalidParameter(format!(
                "bit index {} out of range for length {}",
                i, len
            )));
        }
        Ok(idx as usize)
    }

    pub(crate) fn validate_range(
        &self,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<(usize, usize)> {
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(self.len());
        if end > self.len() {
            return Err(Error::InvalidParameter(format!(
                "end of {} is past the end of the bitstring (length {})",
                end,
                self.len()
            )));
        }
        if start > end {
            return Err(Error::InvalidParameter(format!(
                "start of {} is after end of {}",
                start, end
            )));
        }
        Ok((start, end))
    }

    /// Iterate the bits in logical order.
    pub fn iter(&self) -> BitIter<'_> {
        BitIter { bits: self, next: 0 }
    }

    // ==================== interpretation ====================

    pub fn to_uint(&self) -> Result<u128> {
        codec::read_uint(&self.store, 0, self.len())
    }

    pub fn to_int(&self) -> Result<i128> {
        codec::read_int(&self.store, 0, self.len())
    }

    pub fn to_uintbe(&self) -> Result<u128> {
        codec::read_uintbe(&self.store, 0, self.len())
    }

    pub fn to_intbe(&self) -> Result<i128> {
        codec::read_intbe(&self.store, 0, self.len())
    }

    pub fn to_uintle(&self) -> Result<u128> {
        codec::read_uintle(&self.store, 0, self.len())
    }

    pub fn to_intle(&self) -> Result<i128> {
        codec::read_intle(&self.store, 0, self.len())
    }

    pub fn to_uintne(&self) -> Result<u128> {
        codec::read_uintne(&self.store, 0, self.len())
    }

    pub fn to_intne(&self) -> Result<i128> {
        codec::read_intne(&self.store, 0, self.len())
    }

    /// Big-endian IEEE float; the length must be 16, 32 or 64 bits.
    pub fn to_float(&self) -> Result<f64> {
        codec::read_float(&self.store, 0, self.len(), false)
    }

    pub fn to_floatle(&self) -> Result<f64> {
        codec::read_float(&self.store, 0, self.len(), true)
    }

    pub fn to_floatne(&self) -> Result<f64> {
        codec::read_float(&self.store, 0, self.len(), codec::NATIVE_LITTLE)
    }

    pub fn to_bfloat(&self) -> Result<f64> {
        codec::read_bfloat(&self.store, 0, self.len(), false)
    }

    pub fn to_float8_143(&self) -> Result<f64> {
        codec::read_f8(&self.store, 0, self.len(), crate::fp8::FP143)
    }

    pub fn to_float8_152(&self) -> Result<f64> {
        codec::read_f8(&self.store, 0, self.len(), crate::fp8::FP152)
    }

    pub fn to_hex(&self) -> Result<String> {
        codec::read_hex(&self.store, 0, self.len())
    }

    pub fn to_oct(&self) -> Result<String> {
        codec::read_oct(&self.store, 0, self.len())
    }

    pub fn to_bin(&self) -> String {
        codec::read_bin(&self.store, 0, self.len())
    }

    /// The content as bytes; fails unless the length is a whole number
    /// of bytes. Use [`Bits::to_padded_bytes`] to zero-pad instead.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::read_bytes(&self.store, 0, self.len())
    }

    /// The content as bytes with the final partial byte zero-padded.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        self.store.to_bytes()
    }

    pub fn to_bool(&self) -> Result<bool> {
        if self.len() != 1 {
            return Err(Error::Interpretation(format!(
                "cannot interpret {} bits as a bool: exactly 1 bit is needed",
                self.len()
            )));
        }
        Ok(self.store.get(0))
    }

    pub fn to_ue(&self) -> Result<u128> {
        match codec::decode_whole(DtypeName::Ue, &self.store)? {
            Value::Uint(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn to_se(&self) -> Result<i128> {
        match codec::decode_whole(DtypeName::Se, &self.store)? {
            Value::Int(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn to_uie(&self) -> Result<u128> {
        match codec::decode_whole(DtypeName::Uie, &self.store)? {
            Value::Uint(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn to_sie(&self) -> Result<i128> {
        match codec::decode_whole(DtypeName::Sie, &self.store)? {
            Value::Int(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    /// Interpret the whole bitstring as a single `name[:]length` format.
    pub fn interpret(&self, fmt: &str) -> Result<Value> {
        let (name, length) = parser::parse_name_length(fmt)?;
        if length > 0 && length != self.len() {
            return Err(Error::Interpretation(format!(
                "{} needs {} bits to interpret, but the bitstring has {}",
                name.as_str(),
                length,
                self.len()
            )));
        }
        codec::decode_whole(name, &self.store)
    }

    /// Decode the whole bitstring against a multi-token format.
    pub fn unpack(&self, fmt: &str) -> Result<Vec<Value>> {
        let mut pos = 0usize;
        crate::stream::readlist_at(self, &mut pos, fmt, &[])
    }

    // ==================== search ====================

    /// Leftmost logical position of `sub`, or `None`. Under LSB0 the
    /// search runs physically backwards and the returned position is
    /// mirrored accordingly.
    pub fn find(
        &self,
        sub: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Option<usize>> {
        if sub.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot search for an empty bitstring".to_string(),
            ));
        }
        let (start, end) = self.validate_range(start, end)?;
        let ba = byte_aligned.unwrap_or_else(config::bytealigned);
        let len = self.len();
        match config::addressing() {
            Addressing::Msb0 => Ok(self.store.find(sub.store(), start, end, ba)),
            Addressing::Lsb0 => {
                let (ps, pe) = (len - end, len - start);
                Ok(self
                    .store
                    .rfind(sub.store(), ps, pe, ba)
                    .map(|p| len - p - sub.len()))
            }
        }
    }

    /// Rightmost logical position of `sub`, or `None`.
    pub fn rfind(
        &self,
        sub: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Option<usize>> {
        if sub.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot search for an empty bitstring".to_string(),
            ));
        }
        let (start, end) = self.validate_range(start, end)?;
        let ba = byte_aligned.unwrap_or_else(config::bytealigned);
        let len = self.len();
        match config::addressing() {
            Addressing::Msb0 => Ok(self.store.rfind(sub.store(), start, end, ba)),
            Addressing::Lsb0 => {
                let (ps, pe) = (len - end, len - start);
                Ok(self
                    .store
                    .find(sub.store(), ps, pe, ba)
                    .map(|p| len - p - sub.len()))
            }
        }
    }

    /// All logical match positions in ascending order, lazily. Matches
    /// may overlap. The iterator is recomputed per call.
    pub fn findall<'a>(
        &'a self,
        sub: &'a Bits,
        count: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<FindAll<'a>> {
        if sub.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot search for an empty bitstring".to_string(),
            ));
        }
        let ba = byte_aligned.unwrap_or_else(config::bytealigned);
        let len = self.len();
        let lsb0 = config::lsb0();
        Ok(FindAll {
            bits: self,
            sub,
            lo: 0,
            hi: len,
            byte_aligned: ba,
            remaining: count,
            lsb0,
        })
    }

    /// Equal-size chunks of `chunk_bits` bits. Only full-size chunks
    /// are yielded; a final partial chunk is dropped.
    pub fn cut(
        &self,
        chunk_bits: usize,
        start: Option<usize>,
        end: Option<usize>,
        count: Option<usize>,
    ) -> Result<Cut<'_>> {
        if chunk_bits == 0 {
            return Err(Error::InvalidParameter(
                "cannot cut into chunks of zero bits".to_string(),
            ));
        }
        let (start, end) = self.validate_range(start, end)?;
        Ok(Cut { bits: self, chunk: chunk_bits, pos: start, end, remaining: count })
    }

    /// Split on `delimiter`. The first item is the (possibly empty)
    /// prefix before the first match; each further item starts with the
    /// delimiter.
    pub fn split<'a>(
        &'a self,
        delimiter: &'a Bits,
        start: Option<usize>,
        end: Option<usize>,
        count: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Split<'a>> {
        if delimiter.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot split on an empty bitstring".to_string(),
            ));
        }
        let (start, end) = self.validate_range(start, end)?;
        let ba = byte_aligned.unwrap_or_else(config::bytealigned);
        Ok(Split {
            bits: self,
            delimiter,
            pos: start,
            end,
            byte_aligned: ba,
            remaining: count,
            started: false,
        })
    }

    /// Concatenate `items` with `self` as the separator.
    pub fn join<'a>(&self, items: impl IntoIterator<Item = &'a Bits>) -> Bits {
        let mut store = BitStore::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                store.extend(&self.store);
            }
            store.extend(item.store());
        }
        Bits { store }
    }

    pub fn startswith(&self, prefix: &Bits, start: Option<usize>, end: Option<usize>) -> bool {
        match self.validate_range(start, end) {
            Ok((s, e)) => {
                s + prefix.len() <= e && self.store.matches_at(prefix.store(), s)
            }
            Err(_) => false,
        }
    }

    pub fn endswith(&self, suffix: &Bits, start: Option<usize>, end: Option<usize>) -> bool {
        match self.validate_range(start, end) {
            Ok((s, e)) => {
                e >= s + suffix.len() && self.store.matches_at(suffix.store(), e - suffix.len())
            }
            Err(_) => false,
        }
    }

    /// How many bits equal `value`.
    pub fn count(&self, value: bool) -> usize {
        let ones = self.store.count_ones();
        if value {
            ones
        } else {
            self.len() - ones
        }
    }

    /// True if every listed position (or every bit, when `positions` is
    /// `None`) equals `value`.
    pub fn all(&self, value: bool, positions: Option<&[i64]>) -> Result<bool> {
        match positions {
            None => Ok(if value { self.store.all_set() } else { !self.store.any_set() }),
            Some(ps) => {
                for &p in ps {
                    if self.get(p)? != value {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// True if any listed position (or any bit) equals `value`.
    pub fn any(&self, value: bool, positions: Option<&[i64]>) -> Result<bool> {
        match positions {
            None => Ok(if value { self.store.any_set() } else { !self.store.all_set() }),
            Some(ps) => {
                for &p in ps {
                    if self.get(p)? == value {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Pretty-print to `writer` with one or two views, e.g.
    /// `"hex:8, bin:8"`.
    pub fn pp(&self, fmt: &str, width: Option<usize>, writer: &mut impl Write) -> Result<()> {
        crate::pp::pretty_print(writer, self, fmt, width)
    }

    /// Write the content to `writer`, zero-padding the final byte.
    pub fn tofile(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_padded_bytes())?;
        Ok(())
    }

    // ==================== whole-string operations ====================

    pub fn concat(&self, other: &Bits) -> Bits {
        let mut store = self.store.copy_slice(0, self.len());
        store.extend(other.store());
        Bits { store }
    }

    /// `self` repeated `n` times.
    pub fn repeat(&self, n: usize) -> Bits {
        if n == 0 || self.is_empty() {
            return Bits::empty();
        }
        // Repeated doubling.
        let mut out = self.store.copy_slice(0, self.len());
        let mut built = 1usize;
        while built * 2 <= n {
            let copy = out.copy_slice(0, out.len());
            out.extend(&copy);
            built *= 2;
        }
        for _ in built..n {
            out.extend(&self.store);
        }
        Bits { store: out }
    }

    fn zip_op(&self, other: &Bits, op: impl Fn(bool, bool) -> bool, sym: char) -> Result<Bits> {
        if self.len() != other.len() {
            return Err(Error::InvalidParameter(format!(
                "bitstrings must have the same length for the {} operator: {} != {}",
                sym,
                self.len(),
                other.len()
            )));
        }
        let mut store = BitStore::zeros(self.len());
        for i in 0..self.len() {
            if op(self.store.get(i), other.store().get(i)) {
                store.set(i, true);
            }
        }
        Ok(Bits { store })
    }

    pub fn and(&self, other: &Bits) -> Result<Bits> {
        self.zip_op(other, |a, b| a && b, '&')
    }

    pub fn or(&self, other: &Bits) -> Result<Bits> {
        self.zip_op(other, |a, b| a || b, '|')
    }

    pub fn xor(&self, other: &Bits) -> Result<Bits> {
        self.zip_op(other, |a, b| a != b, '^')
    }

    /// Every bit flipped; fails on an empty bitstring.
    pub fn inverted(&self) -> Result<Bits> {
        if self.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot invert an empty bitstring".to_string(),
            ));
        }
        let mut store = self.store.copy_slice(0, self.len());
        store.invert_all();
        Ok(Bits { store })
    }

    /// Shift towards the start, filling with zero bits. The shift
    /// amount is clamped to the length; fails on an empty bitstring.
    pub fn shifted_left(&self, n: usize) -> Result<Bits> {
        if self.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot shift an empty bitstring".to_string(),
            ));
        }
        let n = n.min(self.len());
        let mut store = self.store.copy_slice(n, self.len());
        store.extend(&BitStore::zeros(n));
        Ok(Bits { store })
    }

    /// Shift towards the end, filling with zero bits.
    pub fn shifted_right(&self, n: usize) -> Result<Bits> {
        if self.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot shift an empty bitstring".to_string(),
            ));
        }
        let n = n.min(self.len());
        let mut store = BitStore::zeros(n);
        store.extend(&self.store.copy_slice(0, self.len() - n));
        Ok(Bits { store })
    }

    /// A copy with the bit order reversed.
    pub fn reversed(&self) -> Bits {
        let mut store = self.store.copy_slice(0, self.len());
        store.reverse();
        Bits { store }
    }
}

/// Encode one parsed token that must carry a literal value.
pub(crate) fn store_from_literal_token(token: &Token) -> Result<BitStore> {
    match &token.kind {
        TokenKind::HexLiteral => codec::store_from_hex(token.value.as_deref().unwrap_or("")),
        TokenKind::OctLiteral => codec::store_from_oct(token.value.as_deref().unwrap_or("")),
        TokenKind::BinLiteral => codec::store_from_bin(token.value.as_deref().unwrap_or("")),
        TokenKind::Keyword(name) => Err(Error::Creation(format!(
            "keyword token '{}' has no value in this context",
            name
        ))),
        TokenKind::Dtype(name) => {
            let length = match &token.length {
                Some(TokenLength::Bits(n)) => *n,
                Some(TokenLength::Key(k)) => {
                    return Err(Error::Creation(format!(
                        "length '{}' of token '{}' is unresolved",
                        k,
                        name.as_str()
                    )));
                }
                None => 0,
            };
            match &token.value {
                Some(v) => codec::encode_token_str(*name, length, v),
                None if *name == DtypeName::Pad => Ok(BitStore::zeros(length)),
                None => Err(Error::Creation(format!(
                    "token '{}' requires a value in this context",
                    name.as_str()
                ))),
            }
        }
    }
}

// ==================== iterators ====================

pub struct BitIter<'a> {
    bits: &'a Bits,
    next: usize,
}

impl Iterator for BitIter<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.next >= self.bits.len() {
            return None;
        }
        let i = self.next as i64;
        self.next += 1;
        self.bits.get(i).ok()
    }
}

pub struct FindAll<'a> {
    bits: &'a Bits,
    sub: &'a Bits,
    lo: usize,
    hi: usize,
    byte_aligned: bool,
    remaining: Option<usize>,
    lsb0: bool,
}

impl Iterator for FindAll<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == Some(0) {
            return None;
        }
        let store = self.bits.store();
        let sub = self.sub.store();
        let found = if self.lsb0 {
            // Ascending logical order is descending physical order.
            match store.rfind(sub, self.lo, self.hi, self.byte_aligned) {
                Some(p) => {
                    self.hi = p + sub.len() - 1;
                    Some(self.bits.len() - p - sub.len())
                }
                None => None,
            }
        } else {
            match store.find(sub, self.lo, self.hi, self.byte_aligned) {
                Some(p) => {
                    self.lo = if self.byte_aligned { p + 8 } else { p + 1 };
                    Some(p)
                }
                None => None,
            }
        };
        if found.is_some() {
            if let Some(r) = &mut self.remaining {
                *r -= 1;
            }
        }
        found
    }
}

pub struct Cut<'a> {
    bits: &'a Bits,
    chunk: usize,
    pos: usize,
    end: usize,
    remaining: Option<usize>,
}

impl Iterator for Cut<'_> {
    type Item = Bits;

    fn next(&mut self) -> Option<Bits> {
        if self.remaining == Some(0) {
            return None;
        }
        if self.pos + self.chunk > self.end {
            return None;
        }
        let chunk = self.bits.slice(self.pos, self.pos + self.chunk).ok()?;
        self.pos += self.chunk;
        if let Some(r) = &mut self.remaining {
            *r -= 1;
        }
        Some(chunk)
    }
}

pub struct Split<'a> {
    bits: &'a Bits,
    delimiter: &'a Bits,
    pos: usize,
    end: usize,
    byte_aligned: bool,
    remaining: Option<usize>,
    started: bool,
}

impl Iterator for Split<'_> {
    type Item = Bits;

    fn next(&mut self) -> Option<Bits> {
        if self.remaining == Some(0) || self.pos > self.end {
            return None;
        }
        let store = self.bits.store();
        let search_from = if self.started {
            // Step past the delimiter at the start of the current part.
            self.pos + self.delimiter.len()
        } else {
            self.pos
        };
        let found = if search_from <= self.end {
            store.find(self.delimiter.store(), search_from, self.end, self.byte_aligned)
        } else {
            None
        };
        let part_end = found.unwrap_or(self.end);
        let part = self.bits.slice(self.pos, part_end).ok()?;
        self.started = true;
        match found {
            Some(f) => self.pos = f,
            None => self.pos = self.end + 1,
        }
        if let Some(r) = &mut self.remaining {
            *r -= 1;
        }
        Some(part)
    }
}

// ==================== traits ====================

impl PartialEq for Bits {
    fn eq(&self, other: &Self) -> bool {
        self.store == *other.store()
    }
}

impl Eq for Bits {}

impl Hash for Bits {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let len = self.len();
        if len <= 2000 {
            state.write(&self.to_padded_bytes());
        } else {
            // Long bitstrings hash only their ends, a deliberate
            // weakening that keeps equal values hashing equal.
            state.write(&self.store.copy_slice(0, 800).to_bytes());
            state.write(&self.store.copy_slice(len - 800, len).to_bytes());
        }
        state.write_usize(len);
    }
}

impl std::fmt::Display for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.len();
        if len == 0 {
            return Ok(());
        }
        if len > MAX_CHARS * 4 {
            let head = self.store.copy_slice(0, MAX_CHARS * 4);
            let hex = codec::read_hex(&head, 0, MAX_CHARS * 4).unwrap_or_default();
            return write!(f, "0x{}...", hex);
        }
        if len % 4 == 0 {
            write!(f, "0x{}", self.to_hex().unwrap_or_default())
        } else {
            write!(f, "0b{}", self.to_bin())
        }
    }
}

impl std::ops::Add for &Bits {
    type Output = Bits;

    fn add(self, rhs: &Bits) -> Bits {
        self.concat(rhs)
    }
}

impl std::ops::Mul<usize> for &Bits {
    type Output = Bits;

    fn mul(self, n: usize) -> Bits {
        self.repeat(n)
    }
}

impl std::ops::BitAnd for &Bits {
    type Output = Bits;

    /// Panics if the operand lengths differ; use [`Bits::and`] for the
    /// fallible form.
    fn bitand(self, rhs: &Bits) -> Bits {
        match self.and(rhs) {
            Ok(b) => b,
            Err(e) => panic!("{}", e),
        }
    }
}

impl std::ops::BitOr for &Bits {
    type Output = Bits;

    fn bitor(self, rhs: &Bits) -> Bits {
        match self.or(rhs) {
            Ok(b) => b,
            Err(e) => panic!("{}", e),
        }
    }
}

impl std::ops::BitXor for &Bits {
    type Output = Bits;

    fn bitxor(self, rhs: &Bits) -> Bits {
        match self.xor(rhs) {
            Ok(b) => b,
            Err(e) => panic!("{}", e),
        }
    }
}

impl std::ops::Not for &Bits {
    type Output = Bits;

    /// Panics on an empty bitstring; use [`Bits::inverted`] for the
    /// fallible form.
    fn not(self) -> Bits {
        match self.inverted() {
            Ok(b) => b,
            Err(e) => panic!("{}", e),
        }
    }
}

impl std::ops::Shl<usize> for &Bits {
    type Output = Bits;

    fn shl(self, n: usize) -> Bits {
        match self.shifted_left(n) {
            Ok(b) => b,
            Err(e) => panic!("{}", e),
        }
    }
}

impl std::ops::Shr<usize> for &Bits {
    type Output = Bits;

    fn shr(self, n: usize) -> Bits {
        match self.shifted_right(n) {
            Ok(b) => b,
            Err(e) => panic!("{}", e),
        }
    }
}
