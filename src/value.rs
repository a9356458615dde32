//! Decoded token values (read/unpack representation).

use crate::bits::Bits;

/// A single decoded value produced by reading or unpacking one token.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint(u128),
    Int(i128),
    Float(f64),
    Hex(String),
    Oct(String),
    Bin(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Bits(Bits),
    /// Produced by `pad` tokens, which consume bits but carry no value.
    None,
}

impl Value {
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::Uint(x) => Some(*x),
            Value::Int(x) if *x >= 0 => Some(*x as u128),
            Value::Bool(b) => Some(*b as u128),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(x) => Some(*x),
            Value::Uint(x) if *x <= i128::MAX as u128 => Some(*x as i128),
            Value::Bool(b) => Some(*b as i128),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(x) => Some(*x as f64),
            Value::Uint(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bits(&self) -> Option<&Bits> {
        match self {
            Value::Bits(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Hex(s) | Value::Oct(s) | Value::Bin(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Uint(x) => write!(f, "{}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Hex(s) => write!(f, "0x{}", s),
            Value::Oct(s) => write!(f, "0o{}", s),
            Value::Bin(s) => write!(f, "0b{}", s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Bits(b) => write!(f, "{}", b),
            Value::None => write!(f, "None"),
        }
    }
}
