//! 8-bit minifloat formats.
//!
//! Two layouts, neither with infinities or NaN:
//! - `float8_143`: 1 sign, 4 exponent, 3 mantissa bits, bias 8.
//! - `float8_152`: 1 sign, 5 exponent, 2 mantissa bits, bias 16.
//!
//! Decoding goes through a 256-entry lookup table. Encoding picks the
//! nearest representable value, saturating to the largest finite
//! magnitude on overflow; NaN encodes as zero.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct Fp8Format {
    exp_bits: u32,
    bias: i32,
}

pub const FP143: Fp8Format = Fp8Format { exp_bits: 4, bias: 8 };
pub const FP152: Fp8Format = Fp8Format { exp_bits: 5, bias: 16 };

impl Fp8Format {
    fn mantissa_bits(&self) -> u32 {
        7 - self.exp_bits
    }

    fn value_of(&self, byte: u8) -> f64 {
        let m_bits = self.mantissa_bits();
        let sign = if byte & 0x80 != 0 { -1.0 } else { 1.0 };
        let exponent = ((byte >> m_bits) & ((1 << self.exp_bits) - 1)) as i32;
        let mantissa = (byte & ((1 << m_bits) - 1)) as f64;
        let frac = mantissa / (1u32 << m_bits) as f64;
        if exponent == 0 {
            sign * frac * 2f64.powi(1 - self.bias)
        } else {
            sign * (1.0 + frac) * 2f64.powi(exponent - self.bias)
        }
    }

    fn table(&self) -> [f64; 256] {
        let mut t = [0.0f64; 256];
        for (i, slot) in t.iter_mut().enumerate() {
            *slot = self.value_of(i as u8);
        }
        t
    }

    /// The value a stored byte represents.
    pub fn decode(&self, byte: u8) -> f64 {
        let table = if self.exp_bits == 4 {
            static T143: OnceLock<[f64; 256]> = OnceLock::new();
            T143.get_or_init(|| FP143.table())
        } else {
            static T152: OnceLock<[f64; 256]> = OnceLock::new();
            T152.get_or_init(|| FP152.table())
        };
        table[byte as usize]
    }

    /// The byte whose value is nearest to `x`. Out-of-range magnitudes
    /// saturate to the largest finite value; NaN maps to zero.
    pub fn encode(&self, x: f64) -> u8 {
        if x.is_nan() {
            return 0;
        }
        let max = self.decode(0x7f);
        let x = x.clamp(-max, max);
        let mut best = 0u8;
        let mut best_err = f64::INFINITY;
        for candidate in 0..=255u8 {
            let err = (self.decode(candidate) - x).abs();
            if err < best_err {
                best_err = err;
                best = candidate;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_finite_values() {
        // (1 + 7/8) * 2^7 and (1 + 3/4) * 2^15.
        assert_eq!(FP143.decode(0x7f), 240.0);
        assert_eq!(FP152.decode(0x7f), 57344.0);
    }

    #[test]
    fn zero_and_negative_zero() {
        assert_eq!(FP143.decode(0x00), 0.0);
        assert_eq!(FP143.decode(0x80), -0.0);
    }

    #[test]
    fn encode_round_trips_exact_values() {
        for byte in [0u8, 1, 0x37, 0x7f, 0x81, 0xff] {
            let v = FP152.decode(byte);
            assert_eq!(FP152.decode(FP152.encode(v)), v);
        }
    }

    #[test]
    fn encode_saturates() {
        assert_eq!(FP143.decode(FP143.encode(1e9)), 240.0);
        assert_eq!(FP143.decode(FP143.encode(-1e9)), -240.0);
        assert_eq!(FP143.encode(f64::NAN), 0);
    }
}
