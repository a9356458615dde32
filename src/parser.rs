//! Parse token format strings into ordered token lists using PEST.
//!
//! The grammar (`grammar.pest`) covers comma-separated entries with `N*`
//! repetition factors, parenthesised groups, struct-style compact codes
//! (`>4h`, `<2Q`), hex/oct/bin literals (`0xff`, `0b101`) and
//! `name[:]length[=value]` tokens with the short aliases `u i f b o h`.
//! Parse results are cached in a fixed-capacity FIFO cache since literal
//! construction hits this on every call.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, OnceLock};

use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::dtype::DtypeName;
use crate::error::{Error, Result};

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct FormatParser;

/// What a parsed token is.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A registry format name, e.g. `uint` or `floatle`.
    Dtype(DtypeName),
    /// `0x…` literal; the digits are in `Token::value`.
    HexLiteral,
    /// `0o…` literal.
    OctLiteral,
    /// `0b…` literal.
    BinLiteral,
    /// A caller-supplied keyword name, passed through unparsed.
    Keyword(String),
}

/// A token's bit length: resolved, or deferred to a keyword argument.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenLength {
    Bits(usize),
    Key(String),
}

/// One parsed token: `(name, length, value)`. A missing length on a
/// non-exempt dtype token marks the token as stretchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub length: Option<TokenLength>,
    pub value: Option<String>,
}

impl Token {
    /// True if this token's length must be inferred from remaining bits.
    pub fn is_stretchy(&self) -> bool {
        match &self.kind {
            TokenKind::Dtype(name) => self.length.is_none() && !name.is_variable_length(),
            _ => false,
        }
    }
}

/// The result of parsing one whole format string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormat {
    pub stretchy: bool,
    pub tokens: Vec<Token>,
}

const CACHE_SIZE: usize = 256;

#[derive(Default)]
struct FormatCache {
    map: HashMap<(String, String), ParsedFormat>,
    order: VecDeque<(String, String)>,
}

fn cache() -> &'static Mutex<FormatCache> {
    static CACHE: OnceLock<Mutex<FormatCache>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(FormatCache::default()))
}

/// Parse `fmt` into tokens. Names listed in `keys` are keyword
/// placeholders and pass through unparsed. At most one stretchy token is
/// permitted per format string.
pub fn parse_format(fmt: &str, keys: &[&str]) -> Result<ParsedFormat> {
    let cache_key = (fmt.to_string(), keys.join("\u{1}"));
    if let Ok(guard) = cache().lock() {
        if let Some(hit) = guard.map.get(&cache_key) {
            return Ok(hit.clone());
        }
    }
    let parsed = parse_format_uncached(fmt, keys)?;
    if let Ok(mut guard) = cache().lock() {
        if !guard.map.contains_key(&cache_key) {
            if guard.order.len() >= CACHE_SIZE {
                if let Some(oldest) = guard.order.pop_front() {
                    guard.map.remove(&oldest);
                }
            }
            guard.order.push_back(cache_key.clone());
            guard.map.insert(cache_key, parsed.clone());
        }
    }
    Ok(parsed)
}

fn parse_format_uncached(fmt: &str, keys: &[&str]) -> Result<ParsedFormat> {
    let pairs = FormatParser::parse(Rule::format, fmt).map_err(|e| {
        Error::InvalidParameter(format!("don't understand format string '{}': {}", fmt, e))
    })?;
    let format_pair = match pairs.into_iter().next() {
        Some(p) => p,
        None => return Ok(ParsedFormat { stretchy: false, tokens: Vec::new() }),
    };
    let mut tokens = Vec::new();
    for entry in format_pair.into_inner() {
        if entry.as_rule() == Rule::entry {
            build_entry(entry, keys, &mut tokens)?;
        }
    }
    let stretchy_count = tokens.iter().filter(|t| t.is_stretchy()).count();
    if stretchy_count > 1 {
        return Err(Error::InvalidParameter(format!(
            "only one token with no length is allowed per format, but '{}' has {}",
            fmt, stretchy_count
        )));
    }
    Ok(ParsedFormat { stretchy: stretchy_count == 1, tokens })
}

fn build_entry(
    pair: pest::iterators::Pair<Rule>,
    keys: &[&str],
    out: &mut Vec<Token>,
) -> Result<()> {
    let mut factor: usize = 1;
    let mut built: Vec<Token> = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::factor => {
                factor = inner.as_str().parse().map_err(|_| {
                    Error::InvalidParameter(format!(
                        "can't use '{}' as a repetition factor",
                        inner.as_str()
                    ))
                })?;
            }
            Rule::group => {
                for sub in inner.into_inner() {
                    if sub.as_rule() == Rule::entry {
                        build_entry(sub, keys, &mut built)?;
                    }
                }
            }
            Rule::struct_fmt => build_struct(inner, &mut built)?,
            Rule::token => built.push(build_token(inner, keys)?),
            _ => {}
        }
    }
    for _ in 0..factor {
        out.extend(built.iter().cloned());
    }
    Ok(())
}

/// Expand struct-pack compact codes into named tokens. `>` selects the
/// big-endian table, `<` little-endian, `@` and `=` the native one.
fn build_struct(pair: pest::iterators::Pair<Rule>, out: &mut Vec<Token>) -> Result<()> {
    let mut endian = '>';
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::endian => {
                endian = inner.as_str().chars().next().unwrap_or('>');
            }
            Rule::struct_code => {
                let text = inner.as_str();
                let code = text.chars().last().unwrap_or('b');
                let count: usize = if text.len() > 1 {
                    text[..text.len() - 1].parse().map_err(|_| {
                        Error::InvalidParameter(format!("bad struct code repeat in '{}'", text))
                    })?
                } else {
                    1
                };
                let (name, bits) = struct_replacement(endian, code)?;
                for _ in 0..count {
                    out.push(Token {
                        kind: TokenKind::Dtype(name),
                        length: Some(TokenLength::Bits(bits)),
                        value: None,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn struct_replacement(endian: char, code: char) -> Result<(DtypeName, usize)> {
    // Single-byte codes are endianness-independent.
    if code == 'b' {
        return Ok((DtypeName::Int, 8));
    }
    if code == 'B' {
        return Ok((DtypeName::Uint, 8));
    }
    let signed = code.is_ascii_lowercase();
    let bits = match code.to_ascii_lowercase() {
        'h' | 'e' => 16,
        'l' | 'f' => 32,
        'q' | 'd' => 64,
        other => {
            return Err(Error::InvalidParameter(format!(
                "unknown struct code '{}'",
                other
            )))
        }
    };
    let is_float = matches!(code, 'e' | 'f' | 'd');
    let name = match (endian, is_float, signed) {
        ('>', true, _) => DtypeName::FloatBe,
        ('<', true, _) => DtypeName::FloatLe,
        (_, true, _) => DtypeName::FloatNe,
        ('>', false, true) => DtypeName::IntBe,
        ('>', false, false) => DtypeName::UintBe,
        ('<', false, true) => DtypeName::IntLe,
        ('<', false, false) => DtypeName::UintLe,
        (_, false, true) => DtypeName::IntNe,
        (_, false, false) => DtypeName::UintNe,
    };
    Ok((name, bits))
}

fn build_token(pair: pest::iterators::Pair<Rule>, keys: &[&str]) -> Result<Token> {
    let text = pair.as_str().trim();
    if keys.contains(&text) {
        return Ok(Token {
            kind: TokenKind::Keyword(text.to_string()),
            length: None,
            value: None,
        });
    }
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| Error::InvalidParameter("empty token".to_string()))?;
    match inner.as_rule() {
        Rule::literal => build_literal(inner),
        Rule::plain => {
            let mut name = None;
            let mut length = None;
            let mut value = None;
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::known_name => name = DtypeName::from_str(p.as_str()),
                    Rule::length => length = Some(p.as_str().to_string()),
                    Rule::value => value = Some(strip_ws(p.as_str())),
                    _ => {}
                }
            }
            let name = name.ok_or_else(|| {
                Error::InvalidParameter(format!("don't understand token '{}'", text))
            })?;
            finish_token(name, length, value, keys, text)
        }
        Rule::short => {
            let mut name = None;
            let mut length = None;
            let mut value = None;
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::short_name => {
                        name = Some(match p.as_str() {
                            "u" => DtypeName::Uint,
                            "i" => DtypeName::Int,
                            "f" => DtypeName::Float,
                            "b" => DtypeName::Bin,
                            "o" => DtypeName::Oct,
                            _ => DtypeName::Hex,
                        })
                    }
                    Rule::digits => length = Some(p.as_str().to_string()),
                    Rule::value => value = Some(strip_ws(p.as_str())),
                    _ => {}
                }
            }
            let name = name.ok_or_else(|| {
                Error::InvalidParameter(format!("don't understand token '{}'", text))
            })?;
            finish_token(name, length, value, keys, text)
        }
        Rule::other => {
            // No recognized name: default to 'bits' with whatever length
            // was written, as in `Bits("12")` for twelve raw bits.
            let mut length = None;
            let mut value = None;
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::length => length = Some(p.as_str().to_string()),
                    Rule::value => value = Some(strip_ws(p.as_str())),
                    _ => {}
                }
            }
            finish_token(DtypeName::Bits, length, value, keys, text)
        }
        unexpected => Err(Error::InvalidParameter(format!(
            "unexpected token rule {:?} in '{}'",
            unexpected, text
        ))),
    }
}

fn build_literal(pair: pest::iterators::Pair<Rule>) -> Result<Token> {
    let mut kind = TokenKind::HexLiteral;
    let mut value = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::lit_prefix => {
                kind = match p.as_str().chars().nth(1).unwrap_or('x').to_ascii_lowercase() {
                    'o' => TokenKind::OctLiteral,
                    'b' => TokenKind::BinLiteral,
                    _ => TokenKind::HexLiteral,
                };
            }
            Rule::lit_digits => value = Some(strip_ws(p.as_str())),
            _ => {}
        }
    }
    Ok(Token { kind, length: None, value })
}

fn finish_token(
    name: DtypeName,
    length_str: Option<String>,
    value: Option<String>,
    keys: &[&str],
    text: &str,
) -> Result<Token> {
    if name.is_variable_length() {
        if let Some(l) = length_str {
            return Err(Error::InvalidParameter(format!(
                "exponential-Golomb codes (se/ue/sie/uie) can't have fixed lengths; a length of {} was given",
                strip_ws(&l)
            )));
        }
        return Ok(Token { kind: TokenKind::Dtype(name), length: None, value });
    }
    let mut length = match length_str {
        None => None,
        Some(raw) => {
            let s = strip_ws(&raw);
            if let Ok(n) = s.parse::<i64>() {
                if n < 0 {
                    return Err(Error::InvalidParameter(
                        "can't read a token with a negative length".to_string(),
                    ));
                }
                Some(TokenLength::Bits(n as usize))
            } else if keys.contains(&s.as_str()) {
                Some(TokenLength::Key(s))
            } else {
                return Err(Error::InvalidParameter(format!(
                    "don't understand length '{}' of token '{}'",
                    s, text
                )));
            }
        }
    };
    if let Some(fixed) = name.fixed_length() {
        match length {
            None => length = Some(TokenLength::Bits(fixed)),
            Some(TokenLength::Bits(n)) if n == fixed => {}
            Some(TokenLength::Bits(n)) => {
                return Err(Error::InvalidParameter(format!(
                    "{} tokens can only be {} bits long, not {} bits",
                    name.as_str(),
                    fixed,
                    n
                )));
            }
            Some(TokenLength::Key(k)) => {
                return Err(Error::InvalidParameter(format!(
                    "{} tokens have a fixed length; '{}' can't override it",
                    name.as_str(),
                    k
                )));
            }
        }
    }
    // 'bytes' lengths are written in bytes but stored in bits.
    if name == DtypeName::Bytes {
        if let Some(TokenLength::Bits(n)) = length {
            length = Some(TokenLength::Bits(n * 8));
        }
    }
    Ok(Token { kind: TokenKind::Dtype(name), length, value })
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parse a single `name[:]length` string (no value part) as used for
/// dtype construction. Returns the name and a length of 0 when none was
/// given.
pub fn parse_name_length(fmt: &str) -> Result<(DtypeName, usize)> {
    let parsed = parse_format(fmt, &[])?;
    if parsed.tokens.len() != 1 {
        return Err(Error::InvalidParameter(format!(
            "can't parse 'name[:]length' token '{}'",
            fmt
        )));
    }
    let token = &parsed.tokens[0];
    if token.value.is_some() {
        return Err(Error::InvalidParameter(format!(
            "'{}' is not a plain 'name[:]length' token",
            fmt
        )));
    }
    let name = match &token.kind {
        TokenKind::Dtype(n) => *n,
        _ => {
            return Err(Error::InvalidParameter(format!(
                "can't parse 'name[:]length' token '{}'",
                fmt
            )))
        }
    };
    let length = match &token.length {
        Some(TokenLength::Bits(n)) => *n,
        _ => 0,
    };
    Ok((name, length))
}
