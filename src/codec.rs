//! Encode/decode routines for every registry format name.
//!
//! All functions work on [`BitStore`] in physical MSB0 coordinates.
//! Whole-byte formats (the `be`/`le`/`ne` integers and the IEEE floats)
//! go through `byteorder`; sub-byte formats are built bit by bit.
//! Native-endian names resolve to the little- or big-endian routines at
//! build time from the target's byte order, so cross-host interchange
//! must use the explicit `be`/`le` names.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::bits::Bits;
use crate::config;
use crate::dtype::DtypeName;
use crate::error::{Error, Result};
use crate::fp8;
use crate::store::BitStore;
use crate::value::Value;

const MAX_INT_BITS: usize = 128;

/// True if this target stores multi-byte integers little-endian first.
pub const NATIVE_LITTLE: bool = cfg!(target_endian = "little");

/// Check that `length` is usable for `name`. `length` must be nonzero.
pub fn validate_length(name: DtypeName, length: usize) -> Result<()> {
    match name {
        DtypeName::Uint | DtypeName::Int => {
            if length > MAX_INT_BITS {
                return Err(Error::Creation(format!(
                    "{} lengths are limited to {} bits, {} given",
                    name.as_str(),
                    MAX_INT_BITS,
                    length
                )));
            }
        }
        DtypeName::UintBe
        | DtypeName::IntBe
        | DtypeName::UintLe
        | DtypeName::IntLe
        | DtypeName::UintNe
        | DtypeName::IntNe => {
            if length % 8 != 0 || length == 0 || length > MAX_INT_BITS {
                return Err(Error::Creation(format!(
                    "{} lengths must be a whole number of bytes up to {} bits, {} given",
                    name.as_str(),
                    MAX_INT_BITS,
                    length
                )));
            }
        }
        DtypeName::Float | DtypeName::FloatBe | DtypeName::FloatLe | DtypeName::FloatNe => {
            if !matches!(length, 16 | 32 | 64) {
                return Err(Error::Creation(format!(
                    "floats can only be 16, 32 or 64 bits long, not {} bits",
                    length
                )));
            }
        }
        DtypeName::Bfloat | DtypeName::BfloatBe | DtypeName::BfloatLe | DtypeName::BfloatNe => {
            if length != 16 {
                return Err(Error::Creation(format!(
                    "bfloats must be 16 bits long, not {} bits",
                    length
                )));
            }
        }
        DtypeName::Float8_143 | DtypeName::Float8_152 => {
            if length != 8 {
                return Err(Error::Creation(format!(
                    "8-bit floats must be 8 bits long, not {} bits",
                    length
                )));
            }
        }
        DtypeName::Hex => {
            if length % 4 != 0 {
                return Err(Error::Creation(format!(
                    "hex lengths must be a multiple of 4 bits, {} given",
                    length
                )));
            }
        }
        DtypeName::Oct => {
            if length % 3 != 0 {
                return Err(Error::Creation(format!(
                    "oct lengths must be a multiple of 3 bits, {} given",
                    length
                )));
            }
        }
        DtypeName::Bytes => {
            if length % 8 != 0 {
                return Err(Error::Creation(format!(
                    "bytes lengths must be a whole number of bytes, {} bits given",
                    length
                )));
            }
        }
        DtypeName::Bool => {
            if length != 1 {
                return Err(Error::Creation(format!(
                    "bools must be 1 bit long, not {} bits",
                    length
                )));
            }
        }
        DtypeName::Bin | DtypeName::Bits | DtypeName::Pad => {}
        DtypeName::Ue | DtypeName::Se | DtypeName::Uie | DtypeName::Sie => {
            return Err(Error::Creation(format!(
                "exponential-Golomb codes ({}) can't have fixed lengths",
                name.as_str()
            )));
        }
    }
    Ok(())
}

// ==================== integer encode ====================

pub fn store_from_uint(v: u128, length: usize) -> Result<BitStore> {
    if length == 0 {
        return Err(Error::Creation(
            "a non-zero length must be specified with a uint initialiser".to_string(),
        ));
    }
    if length > MAX_INT_BITS {
        return Err(Error::Creation(format!(
            "uint lengths are limited to {} bits, {} given",
            MAX_INT_BITS, length
        )));
    }
    if length < 128 && v >> length != 0 {
        return Err(Error::Creation(format!(
            "{} is too large an unsigned integer for a bitstring of length {}; \
             the allowed range is [0, {}]",
            v,
            length,
            (1u128 << length) - 1
        )));
    }
    Ok(BitStore::from_u128(v, length))
}

pub fn store_from_int(v: i128, length: usize) -> Result<BitStore> {
    if length == 0 {
        return Err(Error::Creation(
            "a non-zero length must be specified with an int initialiser".to_string(),
        ));
    }
    if length > MAX_INT_BITS {
        return Err(Error::Creation(format!(
            "int lengths are limited to {} bits, {} given",
            MAX_INT_BITS, length
        )));
    }
    if length < 128 {
        let min = -(1i128 << (length - 1));
        let max = (1i128 << (length - 1)) - 1;
        if v < min || v > max {
            return Err(Error::Creation(format!(
                "{} is too large a signed integer for a bitstring of length {}; \
                 the allowed range is [{}, {}]",
                v, length, min, max
            )));
        }
    }
    let mask = if length == 128 { u128::MAX } else { (1u128 << length) - 1 };
    Ok(BitStore::from_u128(v as u128 & mask, length))
}

pub fn store_from_uintbe(v: u128, length: usize) -> Result<BitStore> {
    if length % 8 != 0 {
        return Err(Error::Creation(format!(
            "uintbe lengths must be a whole number of bytes, {} bits given",
            length
        )));
    }
    store_from_uint(v, length)
}

pub fn store_from_intbe(v: i128, length: usize) -> Result<BitStore> {
    if length % 8 != 0 {
        return Err(Error::Creation(format!(
            "intbe lengths must be a whole number of bytes, {} bits given",
            length
        )));
    }
    store_from_int(v, length)
}

pub fn store_from_uintle(v: u128, length: usize) -> Result<BitStore> {
    if length % 8 != 0 {
        return Err(Error::Creation(format!(
            "uintle lengths must be a whole number of bytes, {} bits given",
            length
        )));
    }
    let mut bytes = store_from_uint(v, length)?.to_bytes();
    bytes.reverse();
    Ok(BitStore::from_bytes(bytes))
}

pub fn store_from_intle(v: i128, length: usize) -> Result<BitStore> {
    if length % 8 != 0 {
        return Err(Error::Creation(format!(
            "intle lengths must be a whole number of bytes, {} bits given",
            length
        )));
    }
    let mut bytes = store_from_int(v, length)?.to_bytes();
    bytes.reverse();
    Ok(BitStore::from_bytes(bytes))
}

pub fn store_from_uintne(v: u128, length: usize) -> Result<BitStore> {
    if NATIVE_LITTLE {
        store_from_uintle(v, length)
    } else {
        store_from_uintbe(v, length)
    }
}

pub fn store_from_intne(v: i128, length: usize) -> Result<BitStore> {
    if NATIVE_LITTLE {
        store_from_intle(v, length)
    } else {
        store_from_intbe(v, length)
    }
}

// ==================== integer decode ====================

pub fn read_uint(store: &BitStore, start: usize, length: usize) -> Result<u128> {
    if length == 0 {
        return Err(Error::Interpretation(
            "cannot interpret an empty bitstring as an integer".to_string(),
        ));
    }
    if length > MAX_INT_BITS {
        return Err(Error::Interpretation(format!(
            "uint interpretations are limited to {} bits, {} given",
            MAX_INT_BITS, length
        )));
    }
    Ok(store.read_u128(start, length))
}

pub fn read_int(store: &BitStore, start: usize, length: usize) -> Result<i128> {
    let v = read_uint(store, start, length)?;
    if length == 128 {
        return Ok(v as i128);
    }
    if (v >> (length - 1)) & 1 == 1 {
        Ok(v as i128 - (1i128 << length))
    } else {
        Ok(v as i128)
    }
}

fn require_whole_bytes(name: &str, length: usize) -> Result<()> {
    if length % 8 != 0 || length == 0 {
        return Err(Error::Interpretation(format!(
            "a {} interpretation needs a whole number of bytes, {} bits given",
            name, length
        )));
    }
    Ok(())
}

pub fn read_uintbe(store: &BitStore, start: usize, length: usize) -> Result<u128> {
    require_whole_bytes("uintbe", length)?;
    read_uint(store, start, length)
}

pub fn read_intbe(store: &BitStore, start: usize, length: usize) -> Result<i128> {
    require_whole_bytes("intbe", length)?;
    read_int(store, start, length)
}

pub fn read_uintle(store: &BitStore, start: usize, length: usize) -> Result<u128> {
    require_whole_bytes("uintle", length)?;
    if length > MAX_INT_BITS {
        return Err(Error::Interpretation(format!(
            "uintle interpretations are limited to {} bits, {} given",
            MAX_INT_BITS, length
        )));
    }
    let mut bytes = store.copy_slice(start, start + length).to_bytes();
    bytes.reverse();
    Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
}

pub fn read_intle(store: &BitStore, start: usize, length: usize) -> Result<i128> {
    let v = read_uintle(store, start, length)?;
    if length == 128 {
        return Ok(v as i128);
    }
    if (v >> (length - 1)) & 1 == 1 {
        Ok(v as i128 - (1i128 << length))
    } else {
        Ok(v as i128)
    }
}

pub fn read_uintne(store: &BitStore, start: usize, length: usize) -> Result<u128> {
    if NATIVE_LITTLE {
        read_uintle(store, start, length)
    } else {
        read_uintbe(store, start, length)
    }
}

pub fn read_intne(store: &BitStore, start: usize, length: usize) -> Result<i128> {
    if NATIVE_LITTLE {
        read_intle(store, start, length)
    } else {
        read_intbe(store, start, length)
    }
}

// ==================== float encode/decode ====================

/// IEEE half-precision from `f32` bits, round to nearest even,
/// overflow to infinity.
fn f32_to_f16_bits(f: f32) -> u16 {
    let x = f.to_bits();
    let sign = ((x >> 16) & 0x8000) as u16;
    let mut exp = ((x >> 23) & 0xff) as i32;
    let mant = x & 0x007f_ffff;
    if exp == 255 {
        let nan_bit = if mant != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | nan_bit | ((mant >> 13) as u16 & 0x3ff);
    }
    exp = exp - 127 + 15;
    if exp >= 31 {
        return sign | 0x7c00;
    }
    if exp <= 0 {
        if exp < -10 {
            return sign;
        }
        let m = mant | 0x0080_0000;
        let shift = (14 - exp) as u32;
        let half_mant = (m >> shift) as u16;
        let round_bit = 1u32 << (shift - 1);
        if (m & round_bit) != 0 && (m & (3 * round_bit - 1)) != 0 {
            return sign | (half_mant + 1);
        }
        return sign | half_mant;
    }
    let half = sign | ((exp as u16) << 10) | ((mant >> 13) as u16);
    let round_bit = 1u32 << 12;
    if (mant & round_bit) != 0 && (mant & (3 * round_bit - 1)) != 0 {
        half + 1
    } else {
        half
    }
}

fn f16_bits_to_f32(h: u16) -> f32 {
    let sign = ((h & 0x8000) as u32) << 16;
    let exp = ((h >> 10) & 0x1f) as u32;
    let mant = (h & 0x3ff) as u32;
    let bits = if exp == 0 {
        if mant == 0 {
            sign
        } else {
            let mut e: u32 = 113;
            let mut m = mant;
            while m & 0x400 == 0 {
                m <<= 1;
                e -= 1;
            }
            sign | (e << 23) | ((m & 0x3ff) << 13)
        }
    } else if exp == 31 {
        sign | 0x7f80_0000 | (mant << 13)
    } else {
        sign | ((exp + 112) << 23) | (mant << 13)
    };
    f32::from_bits(bits)
}

/// Encode an IEEE float of 16, 32 or 64 bits. 16 and 32-bit overflow
/// saturates to infinity.
pub fn store_from_float(x: f64, length: usize, little: bool) -> Result<BitStore> {
    let mut bytes = vec![0u8; length / 8];
    match length {
        16 => {
            let h = f32_to_f16_bits(x as f32);
            if little {
                LittleEndian::write_u16(&mut bytes, h);
            } else {
                BigEndian::write_u16(&mut bytes, h);
            }
        }
        32 => {
            if little {
                LittleEndian::write_f32(&mut bytes, x as f32);
            } else {
                BigEndian::write_f32(&mut bytes, x as f32);
            }
        }
        64 => {
            if little {
                LittleEndian::write_f64(&mut bytes, x);
            } else {
                BigEndian::write_f64(&mut bytes, x);
            }
        }
        other => {
            return Err(Error::Creation(format!(
                "floats can only be 16, 32 or 64 bits long, not {} bits",
                other
            )));
        }
    }
    Ok(BitStore::from_bytes(bytes))
}

pub fn read_float(store: &BitStore, start: usize, length: usize, little: bool) -> Result<f64> {
    let bytes = store.copy_slice(start, start + length).to_bytes();
    Ok(match length {
        16 => {
            let h = if little {
                LittleEndian::read_u16(&bytes)
            } else {
                BigEndian::read_u16(&bytes)
            };
            f16_bits_to_f32(h) as f64
        }
        32 => {
            if little {
                LittleEndian::read_f32(&bytes) as f64
            } else {
                BigEndian::read_f32(&bytes) as f64
            }
        }
        64 => {
            if little {
                LittleEndian::read_f64(&bytes)
            } else {
                BigEndian::read_f64(&bytes)
            }
        }
        other => {
            return Err(Error::Interpretation(format!(
                "floats can only be 16, 32 or 64 bits long, not {} bits",
                other
            )));
        }
    })
}

/// bfloat16: the top two bytes of the big-endian `f32` encoding
/// (truncated, not rounded). The `le` variant stores those bytes
/// swapped.
pub fn store_from_bfloat(x: f64, little: bool) -> Result<BitStore> {
    let bits = ((x as f32).to_bits() >> 16) as u16;
    let mut bytes = vec![0u8; 2];
    if little {
        LittleEndian::write_u16(&mut bytes, bits);
    } else {
        BigEndian::write_u16(&mut bytes, bits);
    }
    Ok(BitStore::from_bytes(bytes))
}

pub fn read_bfloat(store: &BitStore, start: usize, length: usize, little: bool) -> Result<f64> {
    if length != 16 {
        return Err(Error::Interpretation(format!(
            "bfloats must be 16 bits long, not {} bits",
            length
        )));
    }
    let bytes = store.copy_slice(start, start + 16).to_bytes();
    let bits = if little {
        LittleEndian::read_u16(&bytes)
    } else {
        BigEndian::read_u16(&bytes)
    };
    Ok(f32::from_bits((bits as u32) << 16) as f64)
}

pub fn store_from_f8(x: f64, format: fp8::Fp8Format) -> BitStore {
    BitStore::from_bytes(vec![format.encode(x)])
}

pub fn read_f8(store: &BitStore, start: usize, length: usize, format: fp8::Fp8Format) -> Result<f64> {
    if length != 8 {
        return Err(Error::Interpretation(format!(
            "8-bit floats must be 8 bits long, not {} bits",
            length
        )));
    }
    let byte = store.copy_slice(start, start + 8).to_bytes()[0];
    Ok(format.decode(byte))
}

// ==================== string formats ====================

pub fn store_from_hex(s: &str) -> Result<BitStore> {
    let s = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    let digits: String = s.chars().filter(|&c| c != '_').collect();
    let mut store = BitStore::zeros(0);
    for c in digits.chars() {
        let v = c.to_digit(16).ok_or_else(|| {
            Error::Creation(format!("invalid symbol '{}' in hex initialiser", c))
        })?;
        store.extend(&BitStore::from_u128(v as u128, 4));
    }
    Ok(store)
}

pub fn store_from_oct(s: &str) -> Result<BitStore> {
    let s = s.trim().trim_start_matches("0o").trim_start_matches("0O");
    let mut store = BitStore::zeros(0);
    for c in s.chars().filter(|&c| c != '_') {
        let v = c.to_digit(8).ok_or_else(|| {
            Error::Creation(format!("invalid symbol '{}' in oct initialiser", c))
        })?;
        store.extend(&BitStore::from_u128(v as u128, 3));
    }
    Ok(store)
}

pub fn store_from_bin(s: &str) -> Result<BitStore> {
    let s = s.trim().trim_start_matches("0b").trim_start_matches("0B");
    let mut store = BitStore::zeros(0);
    for c in s.chars().filter(|&c| c != '_') {
        match c {
            '0' => store.push(false),
            '1' => store.push(true),
            other => {
                return Err(Error::Creation(format!(
                    "invalid symbol '{}' in binary initialiser",
                    other
                )));
            }
        }
    }
    Ok(store)
}

pub fn read_hex(store: &BitStore, start: usize, length: usize) -> Result<String> {
    if length % 4 != 0 {
        return Err(Error::Interpretation(format!(
            "cannot convert to hex unambiguously: length {} is not a multiple of 4 bits",
            length
        )));
    }
    let mut out = String::with_capacity(length / 4);
    for i in 0..length / 4 {
        let v = store.read_u128(start + i * 4, 4) as u32;
        out.push(std::char::from_digit(v, 16).unwrap_or('0'));
    }
    Ok(out)
}

pub fn read_oct(store: &BitStore, start: usize, length: usize) -> Result<String> {
    if length % 3 != 0 {
        return Err(Error::Interpretation(format!(
            "cannot convert to oct unambiguously: length {} is not a multiple of 3 bits",
            length
        )));
    }
    let mut out = String::with_capacity(length / 3);
    for i in 0..length / 3 {
        let v = store.read_u128(start + i * 3, 3) as u32;
        out.push(std::char::from_digit(v, 8).unwrap_or('0'));
    }
    Ok(out)
}

pub fn read_bin(store: &BitStore, start: usize, length: usize) -> String {
    (0..length)
        .map(|i| if store.get(start + i) { '1' } else { '0' })
        .collect()
}

pub fn read_bytes(store: &BitStore, start: usize, length: usize) -> Result<Vec<u8>> {
    if length % 8 != 0 {
        return Err(Error::Interpretation(format!(
            "cannot interpret as bytes: length {} is not a multiple of 8 bits",
            length
        )));
    }
    Ok(store.copy_slice(start, start + length).to_bytes())
}

// ==================== exponential-Golomb ====================

fn golomb_guard_write() -> Result<()> {
    if config::lsb0() {
        return Err(Error::Creation(
            "exponential-Golomb codes cannot be used in lsb0 mode".to_string(),
        ));
    }
    Ok(())
}

fn golomb_guard_read() -> Result<()> {
    if config::lsb0() {
        return Err(Error::Interpretation(
            "exponential-Golomb codes cannot be read in lsb0 mode".to_string(),
        ));
    }
    Ok(())
}

pub fn store_from_ue(i: u128) -> Result<BitStore> {
    golomb_guard_write()?;
    if i == u128::MAX {
        return Err(Error::Creation(format!(
            "{} is too large to encode as an exponential-Golomb code",
            i
        )));
    }
    let mut store = BitStore::zeros(0);
    if i == 0 {
        store.push(true);
        return Ok(store);
    }
    let k = (i + 1).ilog2() as usize;
    for _ in 0..k {
        store.push(false);
    }
    store.push(true);
    let remainder = i + 1 - (1u128 << k);
    store.extend(&BitStore::from_u128(remainder, k));
    Ok(store)
}

pub fn store_from_se(i: i128) -> Result<BitStore> {
    if i == i128::MIN {
        return Err(Error::Creation(format!(
            "{} is too large to encode as an exponential-Golomb code",
            i
        )));
    }
    let u = if i > 0 { 2 * i as u128 - 1 } else { 2 * i.unsigned_abs() };
    store_from_ue(u)
}

pub fn store_from_uie(i: u128) -> Result<BitStore> {
    golomb_guard_write()?;
    if i == u128::MAX {
        return Err(Error::Creation(format!(
            "{} is too large to encode as an exponential-Golomb code",
            i
        )));
    }
    let mut store = BitStore::zeros(0);
    if i == 0 {
        store.push(true);
        return Ok(store);
    }
    let n = i + 1;
    let top = n.ilog2() as usize;
    store.push(false);
    for (idx, bit_pos) in (0..top).rev().enumerate() {
        if idx > 0 {
            store.push(false);
        }
        store.push((n >> bit_pos) & 1 == 1);
    }
    store.push(true);
    Ok(store)
}

pub fn store_from_sie(i: i128) -> Result<BitStore> {
    if i == 0 {
        return store_from_uie(0);
    }
    let mut store = store_from_uie(i.unsigned_abs())?;
    store.push(i < 0);
    Ok(store)
}

fn golomb_eof() -> Error {
    Error::Read("read off the end of the bitstring trying to read an exponential-Golomb code".to_string())
}

/// Decode a `ue` code starting at `pos`; returns the value and the
/// position just past the code.
pub fn read_ue(store: &BitStore, pos: usize) -> Result<(u128, usize)> {
    golomb_guard_read()?;
    let mut p = pos;
    let mut leading_zeros = 0usize;
    loop {
        if p >= store.len() {
            return Err(golomb_eof());
        }
        if store.get(p) {
            break;
        }
        leading_zeros += 1;
        p += 1;
    }
    p += 1;
    if leading_zeros >= MAX_INT_BITS {
        return Err(Error::Interpretation(format!(
            "exponential-Golomb code too large for {} bits",
            MAX_INT_BITS
        )));
    }
    if p + leading_zeros > store.len() {
        return Err(golomb_eof());
    }
    let mut value = (1u128 << leading_zeros) - 1;
    if leading_zeros > 0 {
        value += store.read_u128(p, leading_zeros);
        p += leading_zeros;
    }
    Ok((value, p))
}

pub fn read_se(store: &BitStore, pos: usize) -> Result<(i128, usize)> {
    let (u, p) = read_ue(store, pos)?;
    let value = if u % 2 == 1 {
        ((u + 1) / 2) as i128
    } else {
        -((u / 2) as i128)
    };
    Ok((value, p))
}

pub fn read_uie(store: &BitStore, pos: usize) -> Result<(u128, usize)> {
    golomb_guard_read()?;
    let mut p = pos;
    let mut codenum: u128 = 1;
    loop {
        if p >= store.len() {
            return Err(golomb_eof());
        }
        if store.get(p) {
            break;
        }
        p += 1;
        if p >= store.len() {
            return Err(golomb_eof());
        }
        if codenum > u128::MAX >> 1 {
            return Err(Error::Interpretation(format!(
                "exponential-Golomb code too large for {} bits",
                MAX_INT_BITS
            )));
        }
        codenum = (codenum << 1) | store.get(p) as u128;
        p += 1;
    }
    p += 1;
    Ok((codenum - 1, p))
}

pub fn read_sie(store: &BitStore, pos: usize) -> Result<(i128, usize)> {
    let (magnitude, mut p) = read_uie(store, pos)?;
    if magnitude == 0 {
        return Ok((0, p));
    }
    if p >= store.len() {
        return Err(golomb_eof());
    }
    let negative = store.get(p);
    p += 1;
    let value = if negative { -(magnitude as i128) } else { magnitude as i128 };
    Ok((value, p))
}

// ==================== dispatchers ====================

/// Decode all of `store` as `name`. Exponential-Golomb decodes must
/// consume the whole store.
pub fn decode_whole(name: DtypeName, store: &BitStore) -> Result<Value> {
    let len = store.len();
    match name {
        DtypeName::Ue | DtypeName::Se | DtypeName::Uie | DtypeName::Sie => {
            let (value, end) = match name {
                DtypeName::Ue => {
                    let (v, p) = read_ue(store, 0)?;
                    (Value::Uint(v), p)
                }
                DtypeName::Se => {
                    let (v, p) = read_se(store, 0)?;
                    (Value::Int(v), p)
                }
                DtypeName::Uie => {
                    let (v, p) = read_uie(store, 0)?;
                    (Value::Uint(v), p)
                }
                _ => {
                    let (v, p) = read_sie(store, 0)?;
                    (Value::Int(v), p)
                }
            };
            if end != len {
                return Err(Error::Interpretation(format!(
                    "bitstring is not a single {} exponential-Golomb code",
                    name.as_str()
                )));
            }
            Ok(value)
        }
        _ => {
            let (value, _) = read_at(name, store, 0, len)?;
            Ok(value)
        }
    }
}

/// Read one `name` token of `length` bits at `pos`; returns the value
/// and the number of bits consumed. For exponential-Golomb names the
/// length argument is ignored.
pub fn read_at(
    name: DtypeName,
    store: &BitStore,
    pos: usize,
    length: usize,
) -> Result<(Value, usize)> {
    match name {
        DtypeName::Ue => {
            let (v, p) = read_ue(store, pos)?;
            return Ok((Value::Uint(v), p - pos));
        }
        DtypeName::Se => {
            let (v, p) = read_se(store, pos)?;
            return Ok((Value::Int(v), p - pos));
        }
        DtypeName::Uie => {
            let (v, p) = read_uie(store, pos)?;
            return Ok((Value::Uint(v), p - pos));
        }
        DtypeName::Sie => {
            let (v, p) = read_sie(store, pos)?;
            return Ok((Value::Int(v), p - pos));
        }
        _ => {}
    }
    if pos + length > store.len() {
        return Err(Error::Read(format!(
            "cannot read {} bits at position {}: only {} bits available",
            length,
            pos,
            store.len() - pos.min(store.len())
        )));
    }
    let value = match name {
        DtypeName::Uint => Value::Uint(read_uint(store, pos, length)?),
        DtypeName::Int => Value::Int(read_int(store, pos, length)?),
        DtypeName::UintBe => Value::Uint(read_uintbe(store, pos, length)?),
        DtypeName::IntBe => Value::Int(read_intbe(store, pos, length)?),
        DtypeName::UintLe => Value::Uint(read_uintle(store, pos, length)?),
        DtypeName::IntLe => Value::Int(read_intle(store, pos, length)?),
        DtypeName::UintNe => Value::Uint(read_uintne(store, pos, length)?),
        DtypeName::IntNe => Value::Int(read_intne(store, pos, length)?),
        DtypeName::Float | DtypeName::FloatBe => {
            Value::Float(read_float(store, pos, length, false)?)
        }
        DtypeName::FloatLe => Value::Float(read_float(store, pos, length, true)?),
        DtypeName::FloatNe => Value::Float(read_float(store, pos, length, NATIVE_LITTLE)?),
        DtypeName::Bfloat | DtypeName::BfloatBe => {
            Value::Float(read_bfloat(store, pos, length, false)?)
        }
        DtypeName::BfloatLe => Value::Float(read_bfloat(store, pos, length, true)?),
        DtypeName::BfloatNe => Value::Float(read_bfloat(store, pos, length, NATIVE_LITTLE)?),
        DtypeName::Float8_143 => Value::Float(read_f8(store, pos, length, fp8::FP143)?),
        DtypeName::Float8_152 => Value::Float(read_f8(store, pos, length, fp8::FP152)?),
        DtypeName::Hex => Value::Hex(read_hex(store, pos, length)?),
        DtypeName::Oct => Value::Oct(read_oct(store, pos, length)?),
        DtypeName::Bin => Value::Bin(read_bin(store, pos, length)),
        DtypeName::Bytes => Value::Bytes(read_bytes(store, pos, length)?),
        DtypeName::Bool => {
            if length != 1 {
                return Err(Error::Interpretation(format!(
                    "bools must be interpreted from 1 bit, {} given",
                    length
                )));
            }
            Value::Bool(store.get(pos))
        }
        DtypeName::Pad => Value::None,
        DtypeName::Bits => Value::Bits(Bits::from_store(store.get_slice(pos, pos + length))),
        DtypeName::Ue | DtypeName::Se | DtypeName::Uie | DtypeName::Sie => unreachable!(),
    };
    Ok((value, length))
}

/// Encode a typed value as `name` with the given length (0 = derive
/// from the value where the format allows it).
pub fn encode_value(name: DtypeName, length: usize, value: &Value) -> Result<BitStore> {
    let bad = |wanted: &str| {
        Error::Creation(format!(
            "cannot create a {} from the value {}",
            wanted, value
        ))
    };
    let store = match name {
        DtypeName::Uint => store_from_uint(value.as_u128().ok_or_else(|| bad("uint"))?, length)?,
        DtypeName::Int => store_from_int(value.as_i128().ok_or_else(|| bad("int"))?, length)?,
        DtypeName::UintBe => {
            store_from_uintbe(value.as_u128().ok_or_else(|| bad("uintbe"))?, length)?
        }
        DtypeName::IntBe => store_from_intbe(value.as_i128().ok_or_else(|| bad("intbe"))?, length)?,
        DtypeName::UintLe => {
            store_from_uintle(value.as_u128().ok_or_else(|| bad("uintle"))?, length)?
        }
        DtypeName::IntLe => store_from_intle(value.as_i128().ok_or_else(|| bad("intle"))?, length)?,
        DtypeName::UintNe => {
            store_from_uintne(value.as_u128().ok_or_else(|| bad("uintne"))?, length)?
        }
        DtypeName::IntNe => store_from_intne(value.as_i128().ok_or_else(|| bad("intne"))?, length)?,
        DtypeName::Float | DtypeName::FloatBe => {
            store_from_float(value.as_f64().ok_or_else(|| bad("float"))?, length, false)?
        }
        DtypeName::FloatLe => {
            store_from_float(value.as_f64().ok_or_else(|| bad("floatle"))?, length, true)?
        }
        DtypeName::FloatNe => store_from_float(
            value.as_f64().ok_or_else(|| bad("floatne"))?,
            length,
            NATIVE_LITTLE,
        )?,
        DtypeName::Bfloat | DtypeName::BfloatBe => {
            store_from_bfloat(value.as_f64().ok_or_else(|| bad("bfloat"))?, false)?
        }
        DtypeName::BfloatLe => {
            store_from_bfloat(value.as_f64().ok_or_else(|| bad("bfloatle"))?, true)?
        }
        DtypeName::BfloatNe => store_from_bfloat(
            value.as_f64().ok_or_else(|| bad("bfloatne"))?,
            NATIVE_LITTLE,
        )?,
        DtypeName::Float8_143 => {
            store_from_f8(value.as_f64().ok_or_else(|| bad("float8_143"))?, fp8::FP143)
        }
        DtypeName::Float8_152 => {
            store_from_f8(value.as_f64().ok_or_else(|| bad("float8_152"))?, fp8::FP152)
        }
        DtypeName::Hex => store_from_hex(value.as_str().ok_or_else(|| bad("hex"))?)?,
        DtypeName::Oct => store_from_oct(value.as_str().ok_or_else(|| bad("oct"))?)?,
        DtypeName::Bin => store_from_bin(value.as_str().ok_or_else(|| bad("bin"))?)?,
        DtypeName::Bytes => {
            BitStore::from_bytes(value.as_bytes().ok_or_else(|| bad("bytes"))?.to_vec())
        }
        DtypeName::Bool => {
            let mut s = BitStore::zeros(0);
            s.push(value.as_bool().ok_or_else(|| bad("bool"))?);
            s
        }
        DtypeName::Pad => BitStore::zeros(length),
        DtypeName::Bits => value.as_bits().ok_or_else(|| bad("bits"))?.store().clone(),
        DtypeName::Ue => store_from_ue(value.as_u128().ok_or_else(|| bad("ue"))?)?,
        DtypeName::Se => store_from_se(value.as_i128().ok_or_else(|| bad("se"))?)?,
        DtypeName::Uie => store_from_uie(value.as_u128().ok_or_else(|| bad("uie"))?)?,
        DtypeName::Sie => store_from_sie(value.as_i128().ok_or_else(|| bad("sie"))?)?,
    };
    if length > 0 && store.len() != length {
        return Err(Error::Creation(format!(
            "token with length {} packed with a value of length {}",
            length,
            store.len()
        )));
    }
    Ok(store)
}

/// Parse an integer literal string, accepting `0x`/`0o`/`0b` prefixes
/// and a leading sign.
pub fn parse_int_str(s: &str) -> Result<i128> {
    let t = s.trim();
    let (negative, rest) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16)
    } else if let Some(oct) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i128::from_str_radix(oct, 8)
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i128::from_str_radix(bin, 2)
    } else {
        rest.parse::<i128>()
    }
    .map_err(|_| Error::Creation(format!("cannot parse '{}' as an integer", s)))?;
    Ok(if negative { -value } else { value })
}

fn parse_float_str(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| Error::Creation(format!("cannot parse '{}' as a float", s)))
}

fn parse_bool_str(s: &str) -> Result<bool> {
    match s.trim() {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        other => Err(Error::Creation(format!(
            "cannot parse '{}' as a bool",
            other
        ))),
    }
}

/// Encode the string value of a parsed token (a format-string literal
/// such as `uint:12=400` or `bool=True`).
pub fn encode_token_str(name: DtypeName, length: usize, value_str: &str) -> Result<BitStore> {
    let value = match name {
        DtypeName::Uint
        | DtypeName::UintBe
        | DtypeName::UintLe
        | DtypeName::UintNe
        | DtypeName::Ue
        | DtypeName::Uie => {
            let v = parse_int_str(value_str)?;
            if v < 0 {
                return Err(Error::Creation(format!(
                    "unsigned format {} given the negative value {}",
                    name.as_str(),
                    v
                )));
            }
            Value::Uint(v as u128)
        }
        DtypeName::Int
        | DtypeName::IntBe
        | DtypeName::IntLe
        | DtypeName::IntNe
        | DtypeName::Se
        | DtypeName::Sie => Value::Int(parse_int_str(value_str)?),
        DtypeName::Float
        | DtypeName::FloatBe
        | DtypeName::FloatLe
        | DtypeName::FloatNe
        | DtypeName::Bfloat
        | DtypeName::BfloatBe
        | DtypeName::BfloatLe
        | DtypeName::BfloatNe
        | DtypeName::Float8_143
        | DtypeName::Float8_152 => Value::Float(parse_float_str(value_str)?),
        DtypeName::Bool => Value::Bool(parse_bool_str(value_str)?),
        DtypeName::Hex => Value::Hex(value_str.to_string()),
        DtypeName::Oct => Value::Oct(value_str.to_string()),
        DtypeName::Bin => Value::Bin(value_str.to_string()),
        DtypeName::Bytes => {
            return Err(Error::Creation(
                "bytes tokens cannot take a value from a format string".to_string(),
            ));
        }
        DtypeName::Bits => {
            let store = literal_str_to_store(value_str)?;
            return finish_sized(store, length);
        }
        DtypeName::Pad => {
            return Err(Error::Creation(
                "pad tokens cannot take a value".to_string(),
            ));
        }
    };
    encode_value(name, length, &value)
}

/// Interpret a `0x`/`0o`/`0b` literal string as bits.
pub fn literal_str_to_store(s: &str) -> Result<BitStore> {
    let t = s.trim();
    if t.starts_with("0x") || t.starts_with("0X") {
        store_from_hex(t)
    } else if t.starts_with("0o") || t.starts_with("0O") {
        store_from_oct(t)
    } else if t.starts_with("0b") || t.starts_with("0B") {
        store_from_bin(t)
    } else {
        Err(Error::Creation(format!(
            "cannot interpret '{}' as a bitstring literal",
            s
        )))
    }
}

fn finish_sized(store: BitStore, length: usize) -> Result<BitStore> {
    if length > 0 && store.len() != length {
        return Err(Error::Creation(format!(
            "token with length {} packed with a value of length {}",
            length,
            store.len()
        )));
    }
    Ok(store)
}
