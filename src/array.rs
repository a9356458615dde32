//! Homogeneous arrays of a single fixed-length format.
//!
//! An `Array` pairs a [`BitArray`] with a [`Dtype`] and treats the data
//! as consecutive elements of that format. The data length need not be
//! a multiple of the element size; the leftover bits are reported as
//! `trailing_bits` and block the operations that need whole elements.
//!
//! Array element access is positional in the raw data and does not
//! change with the LSB0 addressing mode.

use std::io::{Read, Write};

use crate::bitarray::BitArray;
use crate::bits::Bits;
use crate::dtype::Dtype;
use crate::error::{Error, Result};
use crate::store::BitStore;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Array {
    data: BitArray,
    dtype: Dtype,
}

/// The right-hand side of an elementwise operation: one scalar applied
/// to every element, or a second array applied pairwise.
pub enum Operand<'a> {
    Scalar(Value),
    Items(&'a Array),
}

impl<'a> From<&'a Array> for Operand<'a> {
    fn from(a: &'a Array) -> Operand<'a> {
        Operand::Items(a)
    }
}

impl From<Value> for Operand<'_> {
    fn from(v: Value) -> Self {
        Operand::Scalar(v)
    }
}

impl From<i128> for Operand<'_> {
    fn from(v: i128) -> Self {
        Operand::Scalar(Value::Int(v))
    }
}

impl From<u128> for Operand<'_> {
    fn from(v: u128) -> Self {
        Operand::Scalar(Value::Uint(v))
    }
}

impl From<f64> for Operand<'_> {
    fn from(v: f64) -> Self {
        Operand::Scalar(Value::Float(v))
    }
}

/// Numeric tower for elementwise arithmetic.
#[derive(Debug, Clone, Copy)]
enum Num {
    U(u128),
    I(i128),
    F(f64),
}

impl Num {
    fn from_value(v: &Value) -> Result<Num> {
        match v {
            Value::Uint(x) => Ok(Num::U(*x)),
            Value::Int(x) => Ok(Num::I(*x)),
            Value::Float(x) => Ok(Num::F(*x)),
            Value::Bool(b) => Ok(Num::U(*b as u128)),
            other => Err(Error::InvalidParameter(format!(
                "value {} is not numeric",
                other
            ))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::U(x) => x as f64,
            Num::I(x) => x as f64,
            Num::F(x) => x,
        }
    }

    fn as_i128(self) -> Result<i128> {
        match self {
            Num::U(x) if x <= i128::MAX as u128 => Ok(x as i128),
            Num::U(x) => Err(Error::Creation(format!("{} is too large for an int", x))),
            Num::I(x) => Ok(x),
            Num::F(x) => Ok(x as i128),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

impl ArithOp {
    /// Shifts and bitwise combination have no float meaning.
    fn integer_only(self) -> bool {
        matches!(
            self,
            ArithOp::Shl | ArithOp::Shr | ArithOp::BitAnd | ArithOp::BitOr | ArithOp::BitXor
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum UnaryOp {
    Neg,
    Abs,
}

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Array {
    /// An empty array of the given fixed-length element format, e.g.
    /// `"uint8"` or `"float:32"`.
    pub fn new(dtype_fmt: &str) -> Result<Array> {
        let dtype = Self::element_dtype(dtype_fmt)?;
        Ok(Array { data: BitArray::empty(), dtype })
    }

    pub fn with_values(dtype_fmt: &str, values: &[Value]) -> Result<Array> {
        let mut array = Array::new(dtype_fmt)?;
        array.extend(values)?;
        Ok(array)
    }

    pub fn from_bytes(dtype_fmt: &str, bytes: impl Into<Vec<u8>>) -> Result<Array> {
        let dtype = Self::element_dtype(dtype_fmt)?;
        Ok(Array { data: BitArray::from_bytes(bytes), dtype })
    }

    pub fn from_bits(dtype_fmt: &str, bits: Bits) -> Result<Array> {
        let dtype = Self::element_dtype(dtype_fmt)?;
        Ok(Array { data: BitArray::from_bits(bits), dtype })
    }

    fn element_dtype(fmt: &str) -> Result<Dtype> {
        let dtype = Dtype::new(fmt)?;
        if !dtype.is_fixed_length() {
            return Err(Error::Creation(format!(
                "array elements need a fixed length, '{}' has none",
                fmt
            )));
        }
        Ok(dtype)
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Element size in bits.
    pub fn item_size(&self) -> usize {
        self.dtype.length()
    }

    /// Number of whole elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.item_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits left over after the last whole element.
    pub fn trailing_bits(&self) -> usize {
        self.data.len() % self.item_size()
    }

    /// The raw data, trailing bits included.
    pub fn data(&self) -> &BitArray {
        &self.data
    }

    fn require_aligned(&self, what: &str) -> Result<()> {
        let trailing = self.trailing_bits();
        if trailing != 0 {
            return Err(Error::InvalidParameter(format!(
                "cannot {} an array with {} bits of trailing data",
                what, trailing
            )));
        }
        Ok(())
    }

    fn resolve_index(&self, i: i64) -> Result<usize> {
        let len = self.len() as i64;
        let idx = if i < 0 { len + i } else { i };
        if idx < 0 || idx >= len {
            return Err(Error::InvalidParameter(format!(
                "array index {} out of range for length {}",
                i, len
            )));
        }
        Ok(idx as usize)
    }

    fn element_bits(&self, idx: usize) -> Bits {
        let sz = self.item_size();
        Bits::from_store(self.data.store().get_slice(idx * sz, (idx + 1) * sz))
    }

    /// The element at `i`; negative indices count from the end.
    pub fn get(&self, i: i64) -> Result<Value> {
        let idx = self.resolve_index(i)?;
        self.dtype.decode(&self.element_bits(idx))
    }

    /// Overwrite the element at `i`.
    pub fn set(&mut self, i: i64, value: &Value) -> Result<()> {
        let idx = self.resolve_index(i)?;
        let encoded = self.dtype.encode(value)?;
        let sz = self.item_size();
        self.data.store_mut().splice(idx * sz, (idx + 1) * sz, encoded.store());
        Ok(())
    }

    /// The elements in `[start, end)` as a new array of the same dtype.
    pub fn slice(&self, start: usize, end: usize) -> Result<Array> {
        if start > end || end > self.len() {
            return Err(Error::InvalidParameter(format!(
                "array slice [{}, {}) out of range for length {}",
                start,
                end,
                self.len()
            )));
        }
        let sz = self.item_size();
        let store = self.data.store().copy_slice(start * sz, end * sz);
        Ok(Array {
            data: BitArray::from_bits(Bits::from_store(store)),
            dtype: self.dtype,
        })
    }

    /// Every `step`th element of `[start, end)` as a new array.
    pub fn slice_step(&self, start: usize, end: usize, step: usize) -> Result<Array> {
        if step == 0 {
            return Err(Error::InvalidParameter(
                "array slice step cannot be zero".to_string(),
            ));
        }
        if step == 1 {
            return self.slice(start, end);
        }
        if start > end || end > self.len() {
            return Err(Error::InvalidParameter(format!(
                "array slice [{}, {}) out of range for length {}",
                start,
                end,
                self.len()
            )));
        }
        let sz = self.item_size();
        let mut store = BitStore::zeros(0);
        let mut idx = start;
        while idx < end {
            store.extend(&self.data.store().copy_slice(idx * sz, (idx + 1) * sz));
            idx += step;
        }
        Ok(Array {
            data: BitArray::from_bits(Bits::from_store(store)),
            dtype: self.dtype,
        })
    }

    /// Replace the elements selected by `[start, end)` with `step`.
    /// A step of 1 accepts any number of replacements and grows or
    /// shrinks the array; any other step requires an exact count.
    pub fn set_slice(
        &mut self,
        start: usize,
        end: usize,
        step: usize,
        values: &[Value],
    ) -> Result<()> {
        if step == 0 {
            return Err(Error::InvalidParameter(
                "array slice step cannot be zero".to_string(),
            ));
        }
        if start > end || end > self.len() {
            return Err(Error::InvalidParameter(format!(
                "array slice [{}, {}) out of range for length {}",
                start,
                end,
                self.len()
            )));
        }
        let sz = self.item_size();
        if step == 1 {
            if values.len() != end - start {
                self.require_aligned("resize")?;
            }
            let mut replacement = BitStore::zeros(0);
            for value in values {
                replacement.extend(self.dtype.encode(value)?.store());
            }
            self.data
                .store_mut()
                .splice(start * sz, end * sz, &replacement);
            return Ok(());
        }
        let selected = (end - start + step - 1) / step;
        if values.len() != selected {
            return Err(Error::InvalidParameter(format!(
                "attempt to assign {} values to an extended slice of {} elements",
                values.len(),
                selected
            )));
        }
        let mut idx = start;
        for value in values {
            self.set(idx as i64, value)?;
            idx += step;
        }
        Ok(())
    }

    pub fn append(&mut self, value: &Value) -> Result<()> {
        self.require_aligned("append to")?;
        let encoded = self.dtype.encode(value)?;
        self.data.store_mut().extend(encoded.store());
        Ok(())
    }

    pub fn extend(&mut self, values: &[Value]) -> Result<()> {
        self.require_aligned("extend")?;
        for value in values {
            let encoded = self.dtype.encode(value)?;
            self.data.store_mut().extend(encoded.store());
        }
        Ok(())
    }

    /// Append every element of `other`, which must have the same dtype.
    pub fn extend_from(&mut self, other: &Array) -> Result<()> {
        if self.dtype != other.dtype {
            return Err(Error::InvalidParameter(format!(
                "cannot extend a '{}' array from a '{}' array",
                self.dtype, other.dtype
            )));
        }
        self.require_aligned("extend")?;
        other.require_aligned("extend from")?;
        self.data.store_mut().extend(other.data.store());
        Ok(())
    }

    pub fn insert(&mut self, i: i64, value: &Value) -> Result<()> {
        self.require_aligned("insert into")?;
        // Inserting at len() is allowed, like append.
        let len = self.len() as i64;
        let idx = if i < 0 { (len + i).max(0) } else { i.min(len) } as usize;
        let encoded = self.dtype.encode(value)?;
        let sz = self.item_size();
        self.data.store_mut().splice(idx * sz, idx * sz, encoded.store());
        Ok(())
    }

    /// Remove and return the element at `i` (default: the last one).
    pub fn pop(&mut self, i: Option<i64>) -> Result<Value> {
        self.require_aligned("pop from")?;
        if self.is_empty() {
            return Err(Error::InvalidParameter("pop from an empty array".to_string()));
        }
        let idx = self.resolve_index(i.unwrap_or(-1))?;
        let value = self.dtype.decode(&self.element_bits(idx))?;
        let sz = self.item_size();
        self.data.store_mut().splice(idx * sz, (idx + 1) * sz, &BitStore::new());
        Ok(value)
    }

    pub fn tolist(&self) -> Result<Vec<Value>> {
        (0..self.len())
            .map(|i| self.dtype.decode(&self.element_bits(i)))
            .collect()
    }

    /// How many elements decode equal to `value`.
    pub fn count(&self, value: &Value) -> Result<usize> {
        let mut n = 0usize;
        for i in 0..self.len() {
            if self.dtype.decode(&self.element_bits(i))? == *value {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Reverse the element order, leaving each element's bits intact.
    pub fn reverse(&mut self) -> Result<()> {
        self.require_aligned("reverse")?;
        let sz = self.item_size();
        let mut out = BitStore::new();
        for i in (0..self.len()).rev() {
            out.extend(&self.data.store().copy_slice(i * sz, (i + 1) * sz));
        }
        *self.data.store_mut() = out;
        Ok(())
    }

    /// Reverse the byte order inside every element.
    pub fn byteswap(&mut self) -> Result<()> {
        let sz = self.item_size();
        if sz % 8 != 0 {
            return Err(Error::ByteAlign(format!(
                "byteswap needs whole-byte elements, got {} bits",
                sz
            )));
        }
        let group = sz / 8;
        let mut out = BitStore::new();
        for i in 0..self.len() {
            for b in (0..group).rev() {
                let at = i * sz + b * 8;
                out.extend(&self.data.store().copy_slice(at, at + 8));
            }
        }
        let end = self.len() * sz;
        let total = self.data.len();
        if end < total {
            out.extend(&self.data.store().copy_slice(end, total));
        }
        *self.data.store_mut() = out;
        Ok(())
    }

    pub fn tobytes(&self) -> Vec<u8> {
        self.data.to_padded_bytes()
    }

    pub fn tofile(&self, writer: &mut impl Write) -> Result<()> {
        self.data.tofile(writer)
    }

    /// Append elements read from `reader`, at most `n` when given.
    /// Returns the number appended; asking for more elements than the
    /// reader holds appends what is there and then fails.
    pub fn fromfile(&mut self, reader: &mut impl Read, n: Option<usize>) -> Result<usize> {
        self.require_aligned("extend")?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let sz = self.item_size();
        let available = bytes.len() * 8 / sz;
        let take = n.unwrap_or(available).min(available);
        let incoming = Bits::from_bytes(bytes);
        self.data
            .store_mut()
            .extend(&incoming.store().copy_slice(0, take * sz));
        if let Some(wanted) = n {
            if take < wanted {
                return Err(Error::Read(format!(
                    "only {} of {} elements could be read from the file",
                    take, wanted
                )));
            }
        }
        Ok(take)
    }

    /// A copy with every element converted to `dtype_fmt`.
    pub fn astype(&self, dtype_fmt: &str) -> Result<Array> {
        let target = Self::element_dtype(dtype_fmt)?;
        let mut out = Array { data: BitArray::empty(), dtype: target };
        let mut errors = ErrorTally::new();
        for i in 0..self.len() {
            let value = self.dtype.decode(&self.element_bits(i))?;
            let converted = convert_for(&target, &value);
            match target.encode(&converted) {
                Ok(encoded) => out.data.store_mut().extend(encoded.store()),
                Err(e) => errors.record(i, e),
            }
        }
        errors.finish(self.len())?;
        Ok(out)
    }

    /// Pretty-print the elements with an array header line.
    pub fn pp(&self, writer: &mut impl Write) -> Result<()> {
        crate::pp::pretty_print_array(
            writer,
            &self.data,
            &self.dtype.to_string(),
            self.len(),
            self.item_size(),
        )
    }

    /// Same dtype and same data, trailing bits included.
    pub fn equals(&self, other: &Array) -> bool {
        self.dtype == other.dtype && self.data == other.data
    }

    // ==================== elementwise operations ====================

    pub fn add<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Add)
    }

    pub fn sub<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Sub)
    }

    pub fn mul<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Mul)
    }

    /// True division: integer operands promote the result to float64.
    pub fn div<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Div)
    }

    /// Floor division, rounding toward negative infinity.
    pub fn floordiv<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::FloorDiv)
    }

    /// Modulo with the sign of the divisor, matching floor division.
    pub fn rem<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Rem)
    }

    pub fn shl<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Shl)
    }

    pub fn shr<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::Shr)
    }

    pub fn bitand<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::BitAnd)
    }

    pub fn bitor<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::BitOr)
    }

    pub fn bitxor<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.arith(rhs.into(), ArithOp::BitXor)
    }

    /// Elementwise negation, keeping the dtype; elements whose negation
    /// does not fit are reported as failures.
    pub fn neg(&self) -> Result<Array> {
        self.unary(UnaryOp::Neg)
    }

    /// Elementwise absolute value, keeping the dtype.
    pub fn abs(&self) -> Result<Array> {
        self.unary(UnaryOp::Abs)
    }

    pub fn lt<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.compare(rhs.into(), CmpOp::Lt)
    }

    pub fn le<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.compare(rhs.into(), CmpOp::Le)
    }

    pub fn gt<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.compare(rhs.into(), CmpOp::Gt)
    }

    pub fn ge<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.compare(rhs.into(), CmpOp::Ge)
    }

    pub fn eq_elements<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.compare(rhs.into(), CmpOp::Eq)
    }

    pub fn ne_elements<'a>(&self, rhs: impl Into<Operand<'a>>) -> Result<Array> {
        self.compare(rhs.into(), CmpOp::Ne)
    }

    /// The dtype an elementwise result uses: floats beat integers,
    /// signed beats unsigned, wider beats narrower, and the left-hand
    /// side wins ties.
    fn promote(&self, other: &Dtype) -> Dtype {
        let a = &self.dtype;
        let b = other;
        if a.is_float() != b.is_float() {
            return if a.is_float() { *a } else { *b };
        }
        if a.is_signed() != b.is_signed() {
            return if a.is_signed() { *a } else { *b };
        }
        if b.length() > a.length() {
            return *b;
        }
        *a
    }

    fn operand_parts<'a>(&self, rhs: &'a Operand<'a>) -> Result<(Option<&'a Array>, Option<Num>)> {
        match rhs {
            Operand::Scalar(v) => Ok((None, Some(Num::from_value(v)?))),
            Operand::Items(other) => {
                if other.len() != self.len() {
                    return Err(Error::InvalidParameter(format!(
                        "cannot operate on arrays of lengths {} and {}",
                        self.len(),
                        other.len()
                    )));
                }
                Ok((Some(other), None))
            }
        }
    }

    fn arith(&self, rhs: Operand<'_>, op: ArithOp) -> Result<Array> {
        let (other, scalar) = self.operand_parts(&rhs)?;
        let mut result_dtype = match other {
            Some(o) => self.promote(&o.dtype),
            None => match scalar {
                // A float scalar drags an integer array to float width.
                Some(Num::F(_)) if !self.dtype.is_float() => Dtype::new("float64")?,
                _ => self.dtype,
            },
        };
        // True division always produces floats.
        if op == ArithOp::Div && !result_dtype.is_float() {
            result_dtype = Dtype::new("float64")?;
        }
        if op.integer_only() && result_dtype.is_float() {
            return Err(Error::InvalidParameter(format!(
                "shifts and bitwise operations are not valid on '{}' elements",
                result_dtype
            )));
        }
        let mut out = Array { data: BitArray::empty(), dtype: result_dtype };
        let mut errors = ErrorTally::new();
        for i in 0..self.len() {
            let a = Num::from_value(&self.dtype.decode(&self.element_bits(i))?)?;
            let b = match other {
                Some(o) => Num::from_value(&o.dtype.decode(&o.element_bits(i))?)?,
                None => match scalar {
                    Some(n) => n,
                    None => Num::U(0),
                },
            };
            match apply_arith(a, b, op, result_dtype.is_float()) {
                Ok(value) => match result_dtype.encode(&value) {
                    Ok(encoded) => out.data.store_mut().extend(encoded.store()),
                    Err(e) => {
                        errors.record(i, e);
                        out.data.store_mut().extend(Bits::zeros(result_dtype.length()).store());
                    }
                },
                Err(e) => {
                    errors.record(i, e);
                    out.data.store_mut().extend(Bits::zeros(result_dtype.length()).store());
                }
            }
        }
        errors.finish(self.len())?;
        Ok(out)
    }

    fn unary(&self, op: UnaryOp) -> Result<Array> {
        let mut out = Array { data: BitArray::empty(), dtype: self.dtype };
        let mut errors = ErrorTally::new();
        for i in 0..self.len() {
            let value = match Num::from_value(&self.dtype.decode(&self.element_bits(i))?)? {
                Num::F(x) => Ok(Value::Float(match op {
                    UnaryOp::Neg => -x,
                    UnaryOp::Abs => x.abs(),
                })),
                a => a.as_i128().and_then(|x| {
                    let r = match op {
                        UnaryOp::Neg => x.checked_neg(),
                        UnaryOp::Abs => x.checked_abs(),
                    };
                    r.map(Value::Int).ok_or_else(|| {
                        Error::Creation(format!("arithmetic overflow negating {}", x))
                    })
                }),
            };
            match value.and_then(|v| self.dtype.encode(&v)) {
                Ok(encoded) => out.data.store_mut().extend(encoded.store()),
                Err(e) => {
                    errors.record(i, e);
                    out.data.store_mut().extend(Bits::zeros(self.dtype.length()).store());
                }
            }
        }
        errors.finish(self.len())?;
        Ok(out)
    }

    fn compare(&self, rhs: Operand<'_>, op: CmpOp) -> Result<Array> {
        let (other, scalar) = self.operand_parts(&rhs)?;
        let mut out = Array { data: BitArray::empty(), dtype: Dtype::new("bool")? };
        for i in 0..self.len() {
            let a = Num::from_value(&self.dtype.decode(&self.element_bits(i))?)?.as_f64();
            let b = match other {
                Some(o) => Num::from_value(&o.dtype.decode(&o.element_bits(i))?)?.as_f64(),
                None => match scalar {
                    Some(n) => n.as_f64(),
                    None => 0.0,
                },
            };
            let truth = match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
            };
            out.data.store_mut().extend(Bits::from_bool(truth).store());
        }
        Ok(out)
    }
}

fn apply_arith(a: Num, b: Num, op: ArithOp, float_result: bool) -> Result<Value> {
    if float_result {
        let (x, y) = (a.as_f64(), b.as_f64());
        if y == 0.0 && matches!(op, ArithOp::Div | ArithOp::FloorDiv | ArithOp::Rem) {
            return Err(Error::InvalidParameter("division by zero".to_string()));
        }
        let r = match op {
            ArithOp::Add => x + y,
            ArithOp::Sub => x - y,
            ArithOp::Mul => x * y,
            ArithOp::Div => x / y,
            ArithOp::FloorDiv => (x / y).floor(),
            // Remainder with the divisor's sign, matching floor division.
            ArithOp::Rem => {
                let r = x % y;
                if r != 0.0 && (r < 0.0) != (y < 0.0) {
                    r + y
                } else {
                    r
                }
            }
            _ => {
                return Err(Error::InvalidParameter(
                    "shifts and bitwise operations are not valid on float elements".to_string(),
                ))
            }
        };
        return Ok(Value::Float(r));
    }
    let (x, y) = (a.as_i128()?, b.as_i128()?);
    if y == 0 && matches!(op, ArithOp::Div | ArithOp::FloorDiv | ArithOp::Rem) {
        return Err(Error::InvalidParameter("division by zero".to_string()));
    }
    let r = match op {
        ArithOp::Add => x.checked_add(y),
        ArithOp::Sub => x.checked_sub(y),
        ArithOp::Mul => x.checked_mul(y),
        // Integer Div promotes to float before reaching here.
        ArithOp::Div => x.checked_div(y),
        ArithOp::FloorDiv => x.checked_div(y).map(|q| {
            if x % y != 0 && (x < 0) != (y < 0) {
                q - 1
            } else {
                q
            }
        }),
        ArithOp::Rem => x.checked_rem(y).map(|r| {
            if r != 0 && (r < 0) != (y < 0) {
                r + y
            } else {
                r
            }
        }),
        ArithOp::Shl => shift_count(y)?.and_then(|s| {
            if s >= 127 {
                None
            } else {
                x.checked_mul(1i128 << s)
            }
        }),
        ArithOp::Shr => shift_count(y)?.map(|s| x >> s.min(127)),
        ArithOp::BitAnd => Some(x & y),
        ArithOp::BitOr => Some(x | y),
        ArithOp::BitXor => Some(x ^ y),
    };
    match r {
        Some(v) => Ok(Value::Int(v)),
        None => Err(Error::Creation(format!(
            "arithmetic overflow combining {} and {}",
            x, y
        ))),
    }
}

fn shift_count(y: i128) -> Result<Option<u32>> {
    if y < 0 {
        return Err(Error::InvalidParameter(format!(
            "negative shift count {}",
            y
        )));
    }
    Ok(u32::try_from(y).ok())
}

/// Cast a decoded value into the domain `target` encodes.
fn convert_for(target: &Dtype, value: &Value) -> Value {
    if target.is_float() {
        match value.as_f64() {
            Some(f) => Value::Float(f),
            None => value.clone(),
        }
    } else if target.is_integer() {
        match value {
            Value::Float(f) => Value::Int(*f as i128),
            other => other.clone(),
        }
    } else {
        value.clone()
    }
}

/// Collects per-element failures so one bad element doesn't hide how
/// many others failed.
struct ErrorTally {
    count: usize,
    first: Option<(usize, Error)>,
}

impl ErrorTally {
    fn new() -> ErrorTally {
        ErrorTally { count: 0, first: None }
    }

    fn record(&mut self, index: usize, error: Error) {
        if self.first.is_none() {
            self.first = Some((index, error));
        }
        self.count += 1;
    }

    fn finish(self, total: usize) -> Result<()> {
        match self.first {
            None => Ok(()),
            Some((index, error)) => Err(Error::Creation(format!(
                "{} of {} elements failed, first at index {}: {}",
                self.count, total, index, error
            ))),
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl std::fmt::Display for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Array('{}', [", self.dtype)?;
        for i in 0..self.len() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.dtype.decode(&self.element_bits(i)) {
                Ok(v) => write!(f, "{}", v)?,
                Err(_) => write!(f, "?")?,
            }
        }
        write!(f, "])")?;
        if self.trailing_bits() != 0 {
            write!(f, " + {} trailing bits", self.trailing_bits())?;
        }
        Ok(())
    }
}
