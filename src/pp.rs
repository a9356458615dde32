//! Pretty-printed hex/bin/numeric views of bitstring data.
//!
//! One or two views render side by side, e.g. `"hex:8, bin:8"`. Views
//! must cover the same number of bits per group so the columns line up.

use std::io::Write;

use crate::bits::Bits;
use crate::codec;
use crate::dtype::DtypeName;
use crate::error::{Error, Result};
use crate::parser;
use crate::value::Value;

const DEFAULT_WIDTH: usize = 120;
const DEFAULT_GROUP_BITS: usize = 8;

/// One rendering of each group: a format name plus bits per group.
#[derive(Debug, Clone, Copy)]
struct View {
    name: DtypeName,
    bits: usize,
}

impl View {
    /// Character width of one rendered group.
    fn chars(&self) -> usize {
        match self.name {
            DtypeName::Bin => self.bits,
            DtypeName::Oct => self.bits / 3,
            DtypeName::Hex => self.bits / 4,
            DtypeName::Bytes => self.bits / 8,
            DtypeName::Uint | DtypeName::UintBe | DtypeName::UintLe | DtypeName::UintNe => {
                decimal_digits(self.bits)
            }
            DtypeName::Int | DtypeName::IntBe | DtypeName::IntLe | DtypeName::IntNe => {
                decimal_digits(self.bits) + 1
            }
            DtypeName::Bool => 1,
            _ => 16,
        }
    }

    fn render(&self, bits: &Bits, pos: usize) -> Result<String> {
        let (value, _) = codec::read_at(self.name, bits.store(), pos, self.bits)?;
        let out = match value {
            Value::Hex(s) | Value::Oct(s) | Value::Bin(s) => s,
            Value::Bytes(b) => b
                .iter()
                .map(|&c| if (0x20..0x7f).contains(&c) { c as char } else { '.' })
                .collect(),
            Value::Bool(b) => if b { "1".to_string() } else { "0".to_string() },
            other => format!("{}", other),
        };
        Ok(format!("{:>width$}", out, width = self.chars()))
    }
}

/// Decimal digits needed for an unsigned value of `bits` bits.
fn decimal_digits(bits: usize) -> usize {
    // ceil(bits * log10(2)), via the 30103/100000 approximation.
    bits * 30103 / 100000 + 1
}

fn parse_views(fmt: &str) -> Result<Vec<View>> {
    let mut views = Vec::new();
    for part in fmt.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, mut bits) = parser::parse_name_length(part)?;
        if bits == 0 {
            bits = name.fixed_length().unwrap_or(DEFAULT_GROUP_BITS);
        }
        let divisor = match name {
            DtypeName::Oct => 3,
            DtypeName::Hex => 4,
            DtypeName::Bytes => 8,
            DtypeName::Float | DtypeName::FloatBe | DtypeName::FloatLe | DtypeName::FloatNe => {
                codec::validate_length(name, bits)?;
                1
            }
            _ => 1,
        };
        if bits % divisor != 0 {
            return Err(Error::InvalidParameter(format!(
                "'{}' groups need a multiple of {} bits, got {}",
                name.as_str(),
                divisor,
                bits
            )));
        }
        views.push(View { name, bits });
    }
    if views.is_empty() || views.len() > 2 {
        return Err(Error::InvalidParameter(format!(
            "pretty-printing needs one or two formats, got '{}'",
            fmt
        )));
    }
    if views.len() == 2 && views[0].bits != views[1].bits {
        return Err(Error::InvalidParameter(format!(
            "both pretty-print formats must cover the same bits per group: {} != {}",
            views[0].bits, views[1].bits
        )));
    }
    Ok(views)
}

/// Write the data lines without a header. Offsets are in bits, one
/// group per element, views separated by " : ".
fn write_body(w: &mut impl Write, bits: &Bits, views: &[View], width: usize) -> Result<()> {
    let group_bits = views[0].bits;
    let total_groups = bits.len() / group_bits;
    let offset_chars = format!("{}", bits.len()).len().max(1);
    let group_chars: usize = views.iter().map(|v| v.chars() + 1).sum::<usize>()
        + (views.len() - 1) * 2;
    let per_line = ((width.saturating_sub(offset_chars + 2)) / group_chars).max(1);

    let mut group = 0usize;
    while group < total_groups {
        let line_groups = per_line.min(total_groups - group);
        write!(w, "{:>ow$}: ", group * group_bits, ow = offset_chars)?;
        for (vi, view) in views.iter().enumerate() {
            if vi > 0 {
                write!(w, " : ")?;
            }
            for g in group..group + line_groups {
                let rendered = view.render(bits, g * group_bits)?;
                write!(w, "{} ", rendered)?;
            }
        }
        writeln!(w)?;
        group += line_groups;
    }
    let leftover = bits.len() % group_bits;
    if leftover > 0 {
        let tail = codec::read_bin(bits.store(), bits.len() - leftover, leftover);
        writeln!(
            w,
            "{:>ow$}: 0b{} ({} trailing bits)",
            total_groups * group_bits,
            tail,
            leftover,
            ow = offset_chars
        )?;
    }
    Ok(())
}

/// Pretty-print `bits` with a header line, e.g.
/// `pretty_print(&mut out, &b, "hex:8, bin:8", None)`.
pub fn pretty_print(
    w: &mut impl Write,
    bits: &Bits,
    fmt: &str,
    width: Option<usize>,
) -> Result<()> {
    let views = parse_views(fmt)?;
    writeln!(w, "<Bits, fmt='{}', length={} bits>", fmt.trim(), bits.len())?;
    write_body(w, bits, &views, width.unwrap_or(DEFAULT_WIDTH))
}

/// Pretty-print with an element-array header.
pub(crate) fn pretty_print_array(
    w: &mut impl Write,
    data: &Bits,
    dtype_fmt: &str,
    length: usize,
    item_size: usize,
) -> Result<()> {
    writeln!(
        w,
        "<Array dtype='{}', length={}, itemsize={} bits, total data size={} bytes>",
        dtype_fmt,
        length,
        item_size,
        (data.len() + 7) / 8
    )?;
    let views = parse_views(dtype_fmt)?;
    write_body(w, data, &views, DEFAULT_WIDTH)
}
