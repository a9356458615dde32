//! Dtype descriptors: a format name plus a bit length, bound to the
//! codec registry.

use crate::codec;
use crate::error::{Error, Result};
use crate::parser;
use crate::value::Value;

/// Every format name the codec registry knows.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtypeName {
    Uint,
    Int,
    UintBe,
    IntBe,
    UintLe,
    IntLe,
    UintNe,
    IntNe,
    Float,
    FloatBe,
    FloatLe,
    FloatNe,
    Bfloat,
    BfloatBe,
    BfloatLe,
    BfloatNe,
    Float8_143,
    Float8_152,
    Hex,
    Oct,
    Bin,
    Bytes,
    Bool,
    Pad,
    Bits,
    Ue,
    Se,
    Uie,
    Sie,
}

impl DtypeName {
    pub fn from_str(name: &str) -> Option<DtypeName> {
        Some(match name.to_ascii_lowercase().as_str() {
            "uint" => DtypeName::Uint,
            "int" => DtypeName::Int,
            "uintbe" => DtypeName::UintBe,
            "intbe" => DtypeName::IntBe,
            "uintle" => DtypeName::UintLe,
            "intle" => DtypeName::IntLe,
            "uintne" => DtypeName::UintNe,
            "intne" => DtypeName::IntNe,
            "float" => DtypeName::Float,
            "floatbe" => DtypeName::FloatBe,
            "floatle" => DtypeName::FloatLe,
            "floatne" => DtypeName::FloatNe,
            "bfloat" => DtypeName::Bfloat,
            "bfloatbe" => DtypeName::BfloatBe,
            "bfloatle" => DtypeName::BfloatLe,
            "bfloatne" => DtypeName::BfloatNe,
            "float8_143" => DtypeName::Float8_143,
            "float8_152" => DtypeName::Float8_152,
            "hex" => DtypeName::Hex,
            "oct" => DtypeName::Oct,
            "bin" => DtypeName::Bin,
            "bytes" => DtypeName::Bytes,
            "bool" => DtypeName::Bool,
            "pad" => DtypeName::Pad,
            "bits" => DtypeName::Bits,
            "ue" => DtypeName::Ue,
            "se" => DtypeName::Se,
            "uie" => DtypeName::Uie,
            "sie" => DtypeName::Sie,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DtypeName::Uint => "uint",
            DtypeName::Int => "int",
            DtypeName::UintBe => "uintbe",
            DtypeName::IntBe => "intbe",
            DtypeName::UintLe => "uintle",
            DtypeName::IntLe => "intle",
            DtypeName::UintNe => "uintne",
            DtypeName::IntNe => "intne",
            DtypeName::Float => "float",
            DtypeName::FloatBe => "floatbe",
            DtypeName::FloatLe => "floatle",
            DtypeName::FloatNe => "floatne",
            DtypeName::Bfloat => "bfloat",
            DtypeName::BfloatBe => "bfloatbe",
            DtypeName::BfloatLe => "bfloatle",
            DtypeName::BfloatNe => "bfloatne",
            DtypeName::Float8_143 => "float8_143",
            DtypeName::Float8_152 => "float8_152",
            DtypeName::Hex => "hex",
            DtypeName::Oct => "oct",
            DtypeName::Bin => "bin",
            DtypeName::Bytes => "bytes",
            DtypeName::Bool => "bool",
            DtypeName::Pad => "pad",
            DtypeName::Bits => "bits",
            DtypeName::Ue => "ue",
            DtypeName::Se => "se",
            DtypeName::Uie => "uie",
            DtypeName::Sie => "sie",
        }
    }

    /// Names whose bit length is always the same and may be omitted.
    pub fn fixed_length(&self) -> Option<usize> {
        match self {
            DtypeName::Bool => Some(1),
            DtypeName::Bfloat => Some(16),
            DtypeName::Float8_143 | DtypeName::Float8_152 => Some(8),
            _ => None,
        }
    }

    /// Exponential-Golomb names: length is determined by the data.
    pub fn is_variable_length(&self) -> bool {
        matches!(self, DtypeName::Ue | DtypeName::Se | DtypeName::Uie | DtypeName::Sie)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DtypeName::Uint
                | DtypeName::Int
                | DtypeName::UintBe
                | DtypeName::IntBe
                | DtypeName::UintLe
                | DtypeName::IntLe
                | DtypeName::UintNe
                | DtypeName::IntNe
                | DtypeName::Bool
                | DtypeName::Ue
                | DtypeName::Se
                | DtypeName::Uie
                | DtypeName::Sie
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DtypeName::Int
                | DtypeName::IntBe
                | DtypeName::IntLe
                | DtypeName::IntNe
                | DtypeName::Se
                | DtypeName::Sie
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            DtypeName::Float
                | DtypeName::FloatBe
                | DtypeName::FloatLe
                | DtypeName::FloatNe
                | DtypeName::Bfloat
                | DtypeName::BfloatBe
                | DtypeName::BfloatLe
                | DtypeName::BfloatNe
                | DtypeName::Float8_143
                | DtypeName::Float8_152
        )
    }
}

/// A fixed bit-field format: name plus bit length. `length == 0` means
/// "any length" (stretchy), which some contexts reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dtype {
    name: DtypeName,
    length: usize,
}

impl Dtype {
    /// Build from a single `name[:]length` format string such as
    /// `"uint:12"`, `"int5"`, `"bfloat"` or `">H"`.
    pub fn new(fmt: &str) -> Result<Dtype> {
        let (name, length) = parser::parse_name_length(fmt)?;
        Dtype::from_parts(name, length)
    }

    pub fn from_parts(name: DtypeName, length: usize) -> Result<Dtype> {
        if let Some(fixed) = name.fixed_length() {
            if length != 0 && length != fixed {
                return Err(Error::Creation(format!(
                    "{} tokens can only be {} bits long, not {} bits",
                    name.as_str(),
                    fixed,
                    length
                )));
            }
            return Ok(Dtype { name, length: fixed });
        }
        if name.is_variable_length() {
            if length != 0 {
                return Err(Error::Creation(format!(
                    "exponential-Golomb codes can't have fixed lengths, but {} was given a length of {}",
                    name.as_str(),
                    length
                )));
            }
            return Ok(Dtype { name, length: 0 });
        }
        if length > 0 {
            codec::validate_length(name, length)?;
        }
        Ok(Dtype { name, length })
    }

    pub fn name(&self) -> DtypeName {
        self.name
    }

    /// Bit length; 0 means stretchy/variable.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_fixed_length(&self) -> bool {
        self.length > 0
    }

    pub fn is_integer(&self) -> bool {
        self.name.is_integer()
    }

    pub fn is_signed(&self) -> bool {
        self.name.is_signed()
    }

    pub fn is_float(&self) -> bool {
        self.name.is_float()
    }

    /// Smallest representable value for fixed-width integer formats.
    pub fn min_value(&self) -> Option<i128> {
        if !self.is_integer() || self.length == 0 || self.length > 128 {
            return None;
        }
        if self.is_signed() {
            Some(-(1i128 << (self.length - 1)))
        } else {
            Some(0)
        }
    }

    /// Largest representable value for fixed-width integer formats.
    pub fn max_value(&self) -> Option<i128> {
        if !self.is_integer() || self.length == 0 || self.length > 128 {
            return None;
        }
        if self.is_signed() {
            Some((1i128 << (self.length - 1)) - 1)
        } else if self.length == 128 {
            Some(i128::MAX)
        } else {
            Some((1i128 << self.length) - 1)
        }
    }

    /// Decode the whole of `bits` as this format.
    pub fn decode(&self, bits: &crate::bits::Bits) -> Result<Value> {
        if self.length > 0 && bits.len() != self.length {
            return Err(Error::Interpretation(format!(
                "{} needs {} bits to interpret, but {} were given",
                self.name.as_str(),
                self.length,
                bits.len()
            )));
        }
        codec::decode_whole(self.name, bits.store())
    }

    /// Encode `value` into a bitstring of exactly this format.
    pub fn encode(&self, value: &Value) -> Result<crate::bits::Bits> {
        let store = codec::encode_value(self.name, self.length, value)?;
        Ok(crate::bits::Bits::from_store(store))
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.length > 0 && self.name.fixed_length().is_none() {
            write!(f, "{}{}", self.name.as_str(), self.length)
        } else {
            write!(f, "{}", self.name.as_str())
        }
    }
}
