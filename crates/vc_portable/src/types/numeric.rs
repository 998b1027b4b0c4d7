use core::fmt;
use std::borrow::Cow;

use crate::codec::{FieldShape, PrimitiveKind};
use crate::types::FieldType;
use crate::value::{Value, ValueError};

// -----------------------------------------------------------------------------
// BigInt

/// Arbitrary-precision integer in minimal two's-complement big-endian form.
///
/// ```
/// use vc_portable::BigInt;
///
/// let n = BigInt::from(-129_i64);
/// assert_eq!(n.to_be_bytes(), &[0xFF, 0x7F]);
/// assert_eq!(n.to_string(), "-129");
/// assert_eq!(BigInt::from_be_bytes(&[0xFF, 0xFF, 0x7F]), n);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    bytes: Box<[u8]>,
}

impl BigInt {
    #[inline]
    pub fn zero() -> Self {
        Self {
            bytes: Box::new([0]),
        }
    }

    /// Builds from two's-complement big-endian bytes, dropping redundant
    /// sign-extension bytes. An empty slice is zero.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::zero();
        }
        let mut start = 0;
        while start + 1 < bytes.len() {
            let (head, next) = (bytes[start], bytes[start + 1]);
            let redundant =
                (head == 0x00 && next & 0x80 == 0) || (head == 0xFF && next & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        Self {
            bytes: bytes[start..].into(),
        }
    }

    #[inline]
    pub fn to_be_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.bytes[0] & 0x80 != 0
    }

    /// Returns the value if it fits in an `i128`.
    pub fn to_i128(&self) -> Option<i128> {
        if self.bytes.len() > 16 {
            return None;
        }
        let fill = if self.is_negative() { 0xFF } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - self.bytes.len()..].copy_from_slice(&self.bytes);
        Some(i128::from_be_bytes(buf))
    }

    /// Big-endian magnitude, without sign.
    fn magnitude(&self) -> Vec<u8> {
        let mut mag = self.bytes.to_vec();
        if self.is_negative() {
            // Two's complement negation: invert, then add one.
            for b in mag.iter_mut() {
                *b = !*b;
            }
            for b in mag.iter_mut().rev() {
                let (sum, carry) = b.overflowing_add(1);
                *b = sum;
                if !carry {
                    break;
                }
            }
        }
        mag
    }
}

impl From<i128> for BigInt {
    #[inline]
    fn from(v: i128) -> Self {
        Self::from_be_bytes(&v.to_be_bytes())
    }
}

impl From<i64> for BigInt {
    #[inline]
    fn from(v: i64) -> Self {
        Self::from(v as i128)
    }
}

impl From<u128> for BigInt {
    fn from(v: u128) -> Self {
        let mut bytes = Vec::with_capacity(17);
        bytes.push(0);
        bytes.extend_from_slice(&v.to_be_bytes());
        Self::from_be_bytes(&bytes)
    }
}

impl Default for BigInt {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut mag = self.magnitude();
        let mut digits = Vec::new();
        while mag.iter().any(|b| *b != 0) {
            let mut rem = 0_u32;
            for b in mag.iter_mut() {
                let cur = (rem << 8) | *b as u32;
                *b = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(b'0' + rem as u8);
        }
        if digits.is_empty() {
            digits.push(b'0');
        }
        if self.is_negative() {
            digits.push(b'-');
        }
        digits.reverse();
        f.write_str(&String::from_utf8_lossy(&digits))
    }
}

impl fmt::Debug for BigInt {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigInt({self})")
    }
}

impl FieldType for BigInt {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::BigInt)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::BigInt(self.clone())
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::BigInt(v) => Ok(v),
            Value::Int(v) => Ok(Self::from(v)),
            Value::UInt(v) => Ok(Self::from(v)),
            other => Err(ValueError::mismatch("big integer", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Decimal

/// Arbitrary-precision decimal: `unscaled * 10^-scale`.
///
/// Equality is structural, so `1.0` (`10`, scale 1) and `1.00`
/// (`100`, scale 2) differ.
///
/// ```
/// use vc_portable::{BigInt, Decimal};
///
/// let price = Decimal::new(BigInt::from(-1250_i64), 2);
/// assert_eq!(price.to_string(), "-12.50");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i32,
}

impl Decimal {
    #[inline]
    pub fn new(unscaled: BigInt, scale: i32) -> Self {
        Self { unscaled, scale }
    }

    #[inline]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    #[inline]
    pub fn scale(&self) -> i32 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.unscaled.to_string();
        let (sign, digits) = match text.strip_prefix('-') {
            Some(digits) => ("-", digits),
            None => ("", text.as_str()),
        };
        if self.scale <= 0 {
            let zeros = "0".repeat(self.scale.unsigned_abs() as usize);
            let zeros = if digits == "0" { "" } else { zeros.as_str() };
            return write!(f, "{sign}{digits}{zeros}");
        }
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits.to_owned()
        };
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int}.{frac}")
    }
}

impl fmt::Debug for Decimal {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

impl FieldType for Decimal {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::Decimal)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::Decimal(self.clone())
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::Decimal(v) => Ok(v),
            Value::BigInt(v) => Ok(Self::new(v, 0)),
            other => Err(ValueError::mismatch("decimal", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Binary

/// Opaque, variable-length binary blob.
///
/// Use `[u8; N]` for a fixed-size blob.
#[derive(Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Binary {
    #[inline]
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl FieldType for Binary {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::Bytes)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::Bytes(Cow::Borrowed(&self.0))
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(v) => Ok(Self(v.into_owned())),
            Value::List(items) => items
                .into_iter()
                .map(u8::from_value)
                .collect::<Result<_, _>>()
                .map(Self),
            other => Err(ValueError::mismatch("bytes", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{BigInt, Decimal};

    #[test]
    fn bigint_normalizes() {
        assert_eq!(BigInt::from(0_i64).to_be_bytes(), &[0]);
        assert_eq!(BigInt::from(127_i64).to_be_bytes(), &[0x7F]);
        assert_eq!(BigInt::from(128_i64).to_be_bytes(), &[0x00, 0x80]);
        assert_eq!(BigInt::from(-1_i64).to_be_bytes(), &[0xFF]);
        assert_eq!(BigInt::from(u128::MAX).to_be_bytes().len(), 17);
        assert_eq!(BigInt::from_be_bytes(&[]), BigInt::zero());
    }

    #[test]
    fn bigint_display() {
        assert_eq!(BigInt::from(i128::MIN).to_string(), i128::MIN.to_string());
        assert_eq!(BigInt::from(u128::MAX).to_string(), u128::MAX.to_string());
        assert_eq!(BigInt::zero().to_string(), "0");
        assert_eq!(BigInt::from(-42_i64).to_i128(), Some(-42));
        assert_eq!(BigInt::from(u128::MAX).to_i128(), None);
    }

    #[test]
    fn decimal_display() {
        assert_eq!(Decimal::new(BigInt::from(5_i64), 3).to_string(), "0.005");
        assert_eq!(Decimal::new(BigInt::from(-5_i64), 3).to_string(), "-0.005");
        assert_eq!(Decimal::new(BigInt::from(12_i64), -2).to_string(), "1200");
        assert_eq!(Decimal::new(BigInt::from(31415_i64), 4).to_string(), "3.1415");
    }
}
