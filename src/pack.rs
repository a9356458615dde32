//! Building bitstrings from a format plus values.

use crate::bitarray::BitArray;
use crate::bits;
use crate::codec;
use crate::dtype::DtypeName;
use crate::error::{Error, Result};
use crate::parser::{self, Token, TokenKind, TokenLength};
use crate::store::BitStore;
use crate::stream::BitStream;
use crate::value::Value;

/// Pack positional `values` against `fmt`, returning a stream
/// positioned at the start. Literal tokens and tokens with embedded
/// values consume no positional value; `pad` consumes nothing and
/// packs zero bits.
pub fn pack(fmt: &str, values: &[Value]) -> Result<BitStream> {
    pack_with(fmt, values, &[])
}

/// Like [`pack`], with keyword arguments. A keyword can appear in the
/// format as a token length (`"uint:n"`) or as a whole token (`"n"`),
/// in which case its value is packed in place.
pub fn pack_with(fmt: &str, values: &[Value], kwargs: &[(&str, Value)]) -> Result<BitStream> {
    let keys: Vec<&str> = kwargs.iter().map(|(k, _)| *k).collect();
    let parsed = parser::parse_format(fmt, &keys)?;

    let mut store = BitStore::new();
    let mut positional = values.iter();
    for token in &parsed.tokens {
        store.extend(&pack_token(token, &mut positional, kwargs)?);
    }
    if positional.next().is_some() {
        return Err(Error::Creation(
            "too many parameters present to pack according to the format".to_string(),
        ));
    }
    let mut array = BitArray::empty();
    *array.store_mut() = store;
    Ok(BitStream::from_array(array))
}

fn kwarg<'a>(kwargs: &'a [(&str, Value)], key: &str) -> Result<&'a Value> {
    kwargs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .ok_or_else(|| Error::Creation(format!("keyword '{}' was not supplied", key)))
}

fn token_length(token: &Token, kwargs: &[(&str, Value)]) -> Result<usize> {
    match &token.length {
        None => Ok(0),
        Some(TokenLength::Bits(n)) => Ok(*n),
        Some(TokenLength::Key(k)) => {
            let value = kwarg(kwargs, k)?;
            value.as_u128().map(|v| v as usize).ok_or_else(|| {
                Error::Creation(format!(
                    "length keyword '{}' is not an integer: {}",
                    k, value
                ))
            })
        }
    }
}

fn pack_token<'a>(
    token: &Token,
    positional: &mut impl Iterator<Item = &'a Value>,
    kwargs: &[(&str, Value)],
) -> Result<BitStore> {
    match &token.kind {
        TokenKind::HexLiteral | TokenKind::OctLiteral | TokenKind::BinLiteral => {
            bits::store_from_literal_token(token)
        }
        TokenKind::Keyword(name) => {
            let value = kwarg(kwargs, name)?;
            store_from_keyword_value(name, value)
        }
        TokenKind::Dtype(name) => {
            let length = token_length(token, kwargs)?;
            match &token.value {
                Some(v) => codec::encode_token_str(*name, length, v),
                None if *name == DtypeName::Pad => Ok(BitStore::zeros(length)),
                None => {
                    let value = positional.next().ok_or_else(|| {
                        Error::Creation(
                            "not enough parameters present to pack according to the format"
                                .to_string(),
                        )
                    })?;
                    codec::encode_value(*name, length, value)
                }
            }
        }
    }
}

/// A keyword standing alone in the format packs its value directly:
/// bitstrings as-is, strings as literals.
fn store_from_keyword_value(name: &str, value: &Value) -> Result<BitStore> {
    match value {
        Value::Bits(b) => Ok(b.store().copy_slice(0, b.len())),
        Value::Hex(s) => codec::store_from_hex(s),
        Value::Oct(s) => codec::store_from_oct(s),
        Value::Bin(s) => codec::store_from_bin(s),
        Value::Bytes(b) => Ok(BitStore::from_bytes(b.clone())),
        other => Err(Error::Creation(format!(
            "cannot pack keyword '{}' from the value {}: a bitstring or literal is needed",
            name, other
        ))),
    }
}
