//! Bitstreams: a bitstring plus a read position.
//!
//! `ConstBitStream` reads out of an immutable [`Bits`]; `BitStream`
//! adds the [`BitArray`] mutations and keeps its position consistent
//! across them. Reading is defined for MSB0 addressing only and fails
//! under LSB0.

use std::path::Path;

use crate::bitarray::BitArray;
use crate::bits::Bits;
use crate::codec;
use crate::config;
use crate::error::{Error, Result};
use crate::parser::{self, Token, TokenKind, TokenLength};
use crate::value::Value;

fn guard_lsb0() -> Result<()> {
    if config::lsb0() {
        return Err(Error::Read(
            "reading from a bitstream is not supported in lsb0 mode".to_string(),
        ));
    }
    Ok(())
}

/// Bit length a token will consume, once keyword lengths are resolved.
/// `None` means variable (exponential-Golomb) or stretchy.
fn token_bit_length(token: &Token, kwargs: &[(&str, usize)]) -> Result<Option<usize>> {
    match &token.kind {
        TokenKind::HexLiteral => Ok(Some(digit_count(token) * 4)),
        TokenKind::OctLiteral => Ok(Some(digit_count(token) * 3)),
        TokenKind::BinLiteral => Ok(Some(digit_count(token))),
        TokenKind::Keyword(name) => Err(Error::Read(format!(
            "keyword '{}' cannot be read from a bitstream",
            name
        ))),
        TokenKind::Dtype(_) => match &token.length {
            Some(TokenLength::Bits(n)) => Ok(Some(*n)),
            Some(TokenLength::Key(k)) => kwargs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| Some(*v))
                .ok_or_else(|| {
                    Error::Read(format!("length keyword '{}' was not supplied", k))
                }),
            None => Ok(None),
        },
    }
}

fn digit_count(token: &Token) -> usize {
    token
        .value
        .as_deref()
        .map(|v| v.chars().filter(|c| *c != '_').count())
        .unwrap_or(0)
}

/// Read a whole token format from `bits` starting at `*pos`, advancing
/// the position past everything consumed. `pad` tokens are skipped in
/// the output. At most one token may be stretchy; it swallows whatever
/// the fixed-length tokens after it leave over.
pub(crate) fn readlist_at(
    bits: &Bits,
    pos: &mut usize,
    fmt: &str,
    kwargs: &[(&str, usize)],
) -> Result<Vec<Value>> {
    guard_lsb0()?;
    let keys: Vec<&str> = kwargs.iter().map(|(k, _)| *k).collect();
    let parsed = parser::parse_format(fmt, &keys)?;

    // Bits claimed by fixed-length tokens after the stretchy one.
    let mut bits_after_stretchy = 0usize;
    if parsed.stretchy {
        let mut seen_stretchy = false;
        for token in &parsed.tokens {
            if token.is_stretchy() {
                seen_stretchy = true;
                continue;
            }
            if seen_stretchy {
                match token_bit_length(token, kwargs)? {
                    Some(n) => bits_after_stretchy += n,
                    None => {
                        return Err(Error::Read(
                            "a variable-length token cannot follow a stretchy token".to_string(),
                        ));
                    }
                }
            }
        }
    }

    let mut values = Vec::new();
    for token in &parsed.tokens {
        match &token.kind {
            TokenKind::HexLiteral | TokenKind::OctLiteral | TokenKind::BinLiteral => {
                // A literal in a read format just reads its own width
                // back out as the same base.
                let n = match token_bit_length(token, kwargs)? {
                    Some(n) => n,
                    None => 0,
                };
                let name = match token.kind {
                    TokenKind::HexLiteral => crate::dtype::DtypeName::Hex,
                    TokenKind::OctLiteral => crate::dtype::DtypeName::Oct,
                    _ => crate::dtype::DtypeName::Bin,
                };
                let (value, consumed) = codec::read_at(name, bits.store(), *pos, n)?;
                *pos += consumed;
                values.push(value);
            }
            TokenKind::Keyword(name) => {
                return Err(Error::Read(format!(
                    "keyword '{}' cannot be read from a bitstream",
                    name
                )));
            }
            TokenKind::Dtype(name) => {
                let length = if token.is_stretchy() {
                    let available = bits.len().saturating_sub(*pos);
                    available.saturating_sub(bits_after_stretchy)
                } else {
                    token_bit_length(token, kwargs)?.unwrap_or(0)
                };
                let (value, consumed) = codec::read_at(*name, bits.store(), *pos, length)?;
                *pos += consumed;
                if *name != crate::dtype::DtypeName::Pad {
                    values.push(value);
                }
            }
        }
    }
    Ok(values)
}

fn read_bits_at(bits: &Bits, pos: &mut usize, n: usize) -> Result<Bits> {
    guard_lsb0()?;
    if *pos + n > bits.len() {
        return Err(Error::Read(format!(
            "cannot read {} bits at position {}: only {} bits available",
            n,
            *pos,
            bits.len() - (*pos).min(bits.len())
        )));
    }
    let out = Bits::from_store(bits.store().get_slice(*pos, *pos + n));
    *pos += n;
    Ok(out)
}

fn read_one_at(bits: &Bits, pos: &mut usize, fmt: &str) -> Result<Value> {
    let saved = *pos;
    let values = readlist_at(bits, pos, fmt, &[])?;
    if values.len() != 1 {
        *pos = saved;
        return Err(Error::InvalidParameter(format!(
            "format '{}' does not describe a single readable token",
            fmt
        )));
    }
    Ok(values.into_iter().next().unwrap_or(Value::None))
}

fn readto_at(bits: &Bits, pos: &mut usize, delimiter: &Bits, byte_aligned: Option<bool>) -> Result<Bits> {
    guard_lsb0()?;
    if delimiter.is_empty() {
        return Err(Error::InvalidParameter(
            "cannot search for an empty bitstring".to_string(),
        ));
    }
    match bits.find(delimiter, Some(*pos), None, byte_aligned)? {
        Some(found) => {
            let start = *pos;
            let end = found + delimiter.len();
            *pos = end;
            Ok(Bits::from_store(bits.store().get_slice(start, end)))
        }
        None => Err(Error::Read(format!(
            "couldn't find delimiter {} from position {}",
            delimiter, *pos
        ))),
    }
}

/// An immutable bitstring with a read position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstBitStream {
    bits: Bits,
    pos: usize,
}

impl ConstBitStream {
    pub fn new(fmt: &str) -> Result<ConstBitStream> {
        Ok(ConstBitStream::from_bits(Bits::new(fmt)?))
    }

    pub fn from_bits(bits: Bits) -> ConstBitStream {
        ConstBitStream { bits, pos: 0 }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> ConstBitStream {
        ConstBitStream::from_bits(Bits::from_bytes(bytes))
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        offset: Option<usize>,
        length: Option<usize>,
    ) -> Result<ConstBitStream> {
        Ok(ConstBitStream::from_bits(Bits::from_file(path, offset, length)?))
    }

    pub fn into_bits(self) -> Bits {
        self.bits
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.bits.len() {
            return Err(Error::InvalidParameter(format!(
                "position {} is past the end of the bitstring (length {})",
                pos,
                self.bits.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    /// The position in bytes; fails when not on a byte boundary.
    pub fn bytepos(&self) -> Result<usize> {
        if self.pos % 8 != 0 {
            return Err(Error::ByteAlign(format!(
                "position {} is not byte aligned",
                self.pos
            )));
        }
        Ok(self.pos / 8)
    }

    pub fn set_bytepos(&mut self, bytepos: usize) -> Result<()> {
        self.set_pos(bytepos * 8)
    }

    pub fn bits_remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    /// Read a single token, advancing the position.
    pub fn read(&mut self, fmt: &str) -> Result<Value> {
        read_one_at(&self.bits, &mut self.pos, fmt)
    }

    pub fn read_bits(&mut self, n: usize) -> Result<Bits> {
        read_bits_at(&self.bits, &mut self.pos, n)
    }

    pub fn readlist(&mut self, fmt: &str, kwargs: &[(&str, usize)]) -> Result<Vec<Value>> {
        readlist_at(&self.bits, &mut self.pos, fmt, kwargs)
    }

    /// Read a single token without moving the position.
    pub fn peek(&mut self, fmt: &str) -> Result<Value> {
        let saved = self.pos;
        let result = read_one_at(&self.bits, &mut self.pos, fmt);
        self.pos = saved;
        result
    }

    pub fn peek_bits(&mut self, n: usize) -> Result<Bits> {
        let saved = self.pos;
        let result = read_bits_at(&self.bits, &mut self.pos, n);
        self.pos = saved;
        result
    }

    pub fn peeklist(&mut self, fmt: &str, kwargs: &[(&str, usize)]) -> Result<Vec<Value>> {
        let saved = self.pos;
        let result = readlist_at(&self.bits, &mut self.pos, fmt, kwargs);
        self.pos = saved;
        result
    }

    /// Read up to and including the next occurrence of `delimiter`.
    pub fn readto(&mut self, delimiter: &Bits, byte_aligned: Option<bool>) -> Result<Bits> {
        readto_at(&self.bits, &mut self.pos, delimiter, byte_aligned)
    }

    /// Find `sub` in `[start, end)` (defaulting to the whole
    /// bitstring); on success the position moves to the start of the
    /// match, a failed search leaves it alone.
    pub fn find(
        &mut self,
        sub: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Option<usize>> {
        match self.bits.find(sub, start, end, byte_aligned)? {
            Some(p) => {
                self.pos = p;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// Find the last occurrence of `sub` in `[start, end)` (defaulting
    /// to the whole bitstring); on success the position moves to the
    /// start of the match, a failed search leaves it alone.
    pub fn rfind(
        &mut self,
        sub: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Option<usize>> {
        match self.bits.rfind(sub, start, end, byte_aligned)? {
            Some(p) => {
                self.pos = p;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// Advance to the next byte boundary; returns the bits skipped.
    pub fn bytealign(&mut self) -> usize {
        let skip = (8 - self.pos % 8) % 8;
        self.pos += skip;
        skip
    }
}

impl std::ops::Deref for ConstBitStream {
    type Target = Bits;

    fn deref(&self) -> &Bits {
        &self.bits
    }
}

impl From<Bits> for ConstBitStream {
    fn from(bits: Bits) -> ConstBitStream {
        ConstBitStream::from_bits(bits)
    }
}

/// A mutable bitstring with a read position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    array: BitArray,
    pos: usize,
}

impl BitStream {
    pub fn new(fmt: &str) -> Result<BitStream> {
        Ok(BitStream::from_array(BitArray::new(fmt)?))
    }

    pub fn from_array(array: BitArray) -> BitStream {
        BitStream { array, pos: 0 }
    }

    pub fn from_bits(bits: Bits) -> BitStream {
        BitStream::from_array(BitArray::from_bits(bits))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> BitStream {
        BitStream::from_array(BitArray::from_bytes(bytes))
    }

    pub fn into_array(self) -> BitArray {
        self.array
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.array.len() {
            return Err(Error::InvalidParameter(format!(
                "position {} is past the end of the bitstring (length {})",
                pos,
                self.array.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn bytepos(&self) -> Result<usize> {
        if self.pos % 8 != 0 {
            return Err(Error::ByteAlign(format!(
                "position {} is not byte aligned",
                self.pos
            )));
        }
        Ok(self.pos / 8)
    }

    pub fn set_bytepos(&mut self, bytepos: usize) -> Result<()> {
        self.set_pos(bytepos * 8)
    }

    pub fn bits_remaining(&self) -> usize {
        self.array.len() - self.pos
    }

    pub fn read(&mut self, fmt: &str) -> Result<Value> {
        read_one_at(&self.array, &mut self.pos, fmt)
    }

    pub fn read_bits(&mut self, n: usize) -> Result<Bits> {
        read_bits_at(&self.array, &mut self.pos, n)
    }

    pub fn readlist(&mut self, fmt: &str, kwargs: &[(&str, usize)]) -> Result<Vec<Value>> {
        readlist_at(&self.array, &mut self.pos, fmt, kwargs)
    }

    pub fn peek(&mut self, fmt: &str) -> Result<Value> {
        let saved = self.pos;
        let result = read_one_at(&self.array, &mut self.pos, fmt);
        self.pos = saved;
        result
    }

    pub fn peek_bits(&mut self, n: usize) -> Result<Bits> {
        let saved = self.pos;
        let result = read_bits_at(&self.array, &mut self.pos, n);
        self.pos = saved;
        result
    }

    pub fn peeklist(&mut self, fmt: &str, kwargs: &[(&str, usize)]) -> Result<Vec<Value>> {
        let saved = self.pos;
        let result = readlist_at(&self.array, &mut self.pos, fmt, kwargs);
        self.pos = saved;
        result
    }

    pub fn readto(&mut self, delimiter: &Bits, byte_aligned: Option<bool>) -> Result<Bits> {
        readto_at(&self.array, &mut self.pos, delimiter, byte_aligned)
    }

    pub fn find(
        &mut self,
        sub: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Option<usize>> {
        match self.array.find(sub, start, end, byte_aligned)? {
            Some(p) => {
                self.pos = p;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    pub fn rfind(
        &mut self,
        sub: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<Option<usize>> {
        match self.array.rfind(sub, start, end, byte_aligned)? {
            Some(p) => {
                self.pos = p;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    pub fn bytealign(&mut self) -> usize {
        let skip = (8 - self.pos % 8) % 8;
        self.pos += skip;
        skip
    }

    // ==================== position-aware mutation ====================
    // Any mutation that changes the overall length resets the position
    // to 0 rather than tracking its validity through the change.

    pub fn append(&mut self, bs: &Bits) {
        self.array.append(bs);
        if !bs.is_empty() {
            self.pos = 0;
        }
    }

    pub fn prepend(&mut self, bs: &Bits) {
        self.array.prepend(bs);
        if !bs.is_empty() {
            self.pos = 0;
        }
    }

    /// Insert at `pos` (defaults to the current position).
    pub fn insert(&mut self, bs: &Bits, pos: Option<usize>) -> Result<()> {
        let at = pos.unwrap_or(self.pos);
        self.array.insert(bs, at)?;
        if !bs.is_empty() {
            self.pos = 0;
        }
        Ok(())
    }

    /// Overwrite at `pos` (defaults to the current position). The
    /// length does not change; afterwards the position sits just past
    /// the overwritten bits.
    pub fn overwrite(&mut self, bs: &Bits, pos: Option<usize>) -> Result<()> {
        let at = pos.unwrap_or(self.pos);
        self.array.overwrite(bs, at)?;
        self.pos = at + bs.len();
        Ok(())
    }

    /// Remove `[start, end)`.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<()> {
        self.array.delete(start, end)?;
        if start != end {
            self.pos = 0;
        }
        Ok(())
    }

    pub fn replace(
        &mut self,
        old: &Bits,
        new: &Bits,
        start: Option<usize>,
        end: Option<usize>,
        count: Option<usize>,
        byte_aligned: Option<bool>,
    ) -> Result<usize> {
        let before = self.array.len();
        let n = self.array.replace(old, new, start, end, count, byte_aligned)?;
        if self.array.len() != before {
            self.pos = 0;
        }
        Ok(n)
    }

    /// Replace `[start, end)` with `bs`, which may differ in length.
    pub fn set_slice(&mut self, start: usize, end: usize, bs: &Bits) -> Result<()> {
        let before = self.array.len();
        self.array.set_slice(start, end, bs)?;
        if self.array.len() != before {
            self.pos = 0;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.array.clear();
        self.pos = 0;
    }

    // Length-preserving mutation keeps the position where it was.

    pub fn set_bit(&mut self, i: i64, value: bool) -> Result<()> {
        self.array.set_bit(i, value)
    }

    pub fn set(&mut self, value: bool, positions: &[i64]) -> Result<()> {
        self.array.set(value, positions)
    }

    pub fn set_all(&mut self, value: bool) {
        self.array.set_all(value);
    }

    pub fn invert(&mut self, positions: &[i64]) -> Result<()> {
        self.array.invert(positions)
    }

    pub fn invert_all(&mut self) {
        self.array.invert_all();
    }

    pub fn reverse(&mut self, start: Option<usize>, end: Option<usize>) -> Result<()> {
        self.array.reverse(start, end)
    }

    pub fn ror(&mut self, n: usize, start: Option<usize>, end: Option<usize>) -> Result<()> {
        self.array.ror(n, start, end)
    }

    pub fn rol(&mut self, n: usize, start: Option<usize>, end: Option<usize>) -> Result<()> {
        self.array.rol(n, start, end)
    }

    pub fn byteswap(
        &mut self,
        pattern: &[usize],
        start: Option<usize>,
        end: Option<usize>,
        repeat: bool,
    ) -> Result<usize> {
        self.array.byteswap(pattern, start, end, repeat)
    }
}

impl std::ops::Deref for BitStream {
    type Target = BitArray;

    fn deref(&self) -> &BitArray {
        &self.array
    }
}

impl From<BitArray> for BitStream {
    fn from(array: BitArray) -> BitStream {
        BitStream::from_array(array)
    }
}
