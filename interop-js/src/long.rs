//! 64-bit two's-complement integers emulated as a pair of 32-bit words.
//!
//! The host's only numeric type is an IEEE-754 double, which cannot hold every `long`. Values are
//! therefore kept as `(low, high)` words and every operation is carried out on the words, with the
//! wraparound behaviour the managed language specifies. Nothing in this module signals overflow.
//!
//! Hosts that do have a native wide integer (`BigInt`) exchange values through
//! [`Long64::to_bigint`] / [`Long64::from_bigint`].

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Shl, Shr, Sub};
use num_bigint::{BigInt, Sign};

const TWO_PWR_32: f64 = 4_294_967_296.0;
const TWO_PWR_63: f64 = 9_223_372_036_854_775_808.0;

/// An emulated signed 64-bit integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Long64 {
  low: i32,
  high: i32,
}

impl Long64 {
  pub const ZERO: Long64 = Long64::from_two_int(0, 0);
  pub const ONE: Long64 = Long64::from_two_int(1, 0);
  pub const NEG_ONE: Long64 = Long64::from_two_int(-1, -1);
  pub const MIN_VALUE: Long64 = Long64::from_two_int(0, i32::MIN);
  pub const MAX_VALUE: Long64 = Long64::from_two_int(-1, i32::MAX);

  const TEN: Long64 = Long64::from_two_int(10, 0);

  /// Builds a value from its two words. Lossless; inverse of [`low_bits`](Self::low_bits) and
  /// [`high_bits`](Self::high_bits).
  #[inline]
  pub const fn from_two_int(low: i32, high: i32) -> Self {
    Self { low, high }
  }

  /// Sign-extends an `int`.
  #[inline]
  pub const fn from_int(value: i32) -> Self {
    Self {
      low: value,
      high: if value < 0 { -1 } else { 0 },
    }
  }

  #[inline]
  pub const fn from_i64(value: i64) -> Self {
    Self {
      low: value as i32,
      high: (value >> 32) as i32,
    }
  }

  #[inline]
  pub const fn to_i64(self) -> i64 {
    ((self.high as i64) << 32) | (self.low as u32 as i64)
  }

  /// Narrows a double the way `d2l` does: NaN becomes zero, out-of-range values clamp to
  /// [`MIN_VALUE`](Self::MIN_VALUE)/[`MAX_VALUE`](Self::MAX_VALUE), everything else truncates
  /// toward zero.
  pub fn from_double(value: f64) -> Self {
    if value.is_nan() {
      Self::ZERO
    } else if value <= -TWO_PWR_63 {
      Self::MIN_VALUE
    } else if value >= TWO_PWR_63 {
      Self::MAX_VALUE
    } else if value < 0.0 {
      Self::from_double(-value).negate()
    } else {
      let value = value.trunc();
      let high = (value / TWO_PWR_32).floor();
      let low = value - high * TWO_PWR_32;
      Self::from_two_int(low as u32 as i32, high as u32 as i32)
    }
  }

  /// `f2l`.
  #[inline]
  pub fn from_f32(value: f32) -> Self {
    Self::from_double(value as f64)
  }

  /// Reads a host `BigInt`, wrapping modulo 2^64 like `BigInt.asIntN(64, value)`.
  pub fn from_bigint(value: &BigInt) -> Self {
    let bytes = value.to_signed_bytes_le();
    let fill = if value.sign() == Sign::Minus { 0xff } else { 0 };
    let mut buf = [fill; 8];
    for (dst, src) in buf.iter_mut().zip(bytes.iter()) {
      *dst = *src;
    }
    Self::from_two_int(
      i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
      i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
    )
  }

  /// The host's native wide-integer representation. Exact.
  pub fn to_bigint(self) -> BigInt {
    (BigInt::from(self.high) << 32u32) + BigInt::from(self.low as u32)
  }

  #[inline]
  pub const fn low_bits(self) -> i32 {
    self.low
  }

  #[inline]
  pub const fn high_bits(self) -> i32 {
    self.high
  }

  /// The nearest double. Loses precision outside +-2^53; use the word accessors when bit-exact
  /// results matter.
  #[inline]
  pub fn to_number(self) -> f64 {
    self.high as f64 * TWO_PWR_32 + self.low as u32 as f64
  }

  /// `l2f`: rounds through the double approximation first.
  #[inline]
  pub fn to_f32(self) -> f32 {
    self.to_number() as f32
  }

  /// `l2i`: keeps the low word.
  #[inline]
  pub const fn to_int(self) -> i32 {
    self.low
  }

  #[inline]
  pub const fn is_zero(self) -> bool {
    self.low == 0 && self.high == 0
  }

  #[inline]
  pub const fn is_negative(self) -> bool {
    self.high < 0
  }

  #[inline]
  pub const fn is_odd(self) -> bool {
    self.low & 1 == 1
  }

  pub fn add(self, other: Self) -> Self {
    let a_low = self.low as u32;
    let low = a_low.wrapping_add(other.low as u32);
    let carry = (low < a_low) as u32;
    let high = (self.high as u32)
      .wrapping_add(other.high as u32)
      .wrapping_add(carry);
    Self::from_two_int(low as i32, high as i32)
  }

  pub fn sub(self, other: Self) -> Self {
    self.add(other.negate())
  }

  pub fn negate(self) -> Self {
    self.not().add(Self::ONE)
  }

  /// Wrapping multiplication over 16-bit limbs. Carries that would leave bit 63 are dropped, which
  /// is exactly the modulo-2^64 result.
  pub fn mul(self, other: Self) -> Self {
    if self.is_zero() || other.is_zero() {
      return Self::ZERO;
    }

    let a48 = (self.high as u32) >> 16;
    let a32 = (self.high as u32) & 0xffff;
    let a16 = (self.low as u32) >> 16;
    let a00 = (self.low as u32) & 0xffff;

    let b48 = (other.high as u32) >> 16;
    let b32 = (other.high as u32) & 0xffff;
    let b16 = (other.low as u32) >> 16;
    let b00 = (other.low as u32) & 0xffff;

    let mut c00 = a00 * b00;
    let mut c16 = c00 >> 16;
    c00 &= 0xffff;
    c16 = c16.wrapping_add(a16 * b00);
    let mut c32 = c16 >> 16;
    c16 &= 0xffff;
    c16 = c16.wrapping_add(a00 * b16);
    c32 = c32.wrapping_add(c16 >> 16);
    c16 &= 0xffff;
    c32 = c32.wrapping_add(a32 * b00);
    let mut c48 = c32 >> 16;
    c32 &= 0xffff;
    c32 = c32.wrapping_add(a16 * b16);
    c48 = c48.wrapping_add(c32 >> 16);
    c32 &= 0xffff;
    c32 = c32.wrapping_add(a00 * b32);
    c48 = c48.wrapping_add(c32 >> 16);
    c32 &= 0xffff;
    c48 = c48
      .wrapping_add(a48.wrapping_mul(b00))
      .wrapping_add(a32.wrapping_mul(b16))
      .wrapping_add(a16.wrapping_mul(b32))
      .wrapping_add(a00.wrapping_mul(b48));
    c48 &= 0xffff;

    Self::from_two_int(((c16 << 16) | c00) as i32, ((c48 << 16) | c32) as i32)
  }

  /// Truncating division. `MIN_VALUE / -1` wraps to `MIN_VALUE`.
  ///
  /// # Panics
  ///
  /// Panics when `other` is zero. Callers guard division themselves (the managed language raises
  /// `ArithmeticException` before reaching this point).
  pub fn div(self, other: Self) -> Self {
    self.div_rem(other).0
  }

  /// Remainder with the sign of the dividend.
  ///
  /// # Panics
  ///
  /// Panics when `other` is zero.
  pub fn rem(self, other: Self) -> Self {
    self.div_rem(other).1
  }

  fn div_rem(self, other: Self) -> (Self, Self) {
    assert!(!other.is_zero(), "division by zero");
    let negative_dividend = self.is_negative();
    let negative_divisor = other.is_negative();
    // `MIN_VALUE.negate()` is `MIN_VALUE`, whose unsigned reading is the correct magnitude 2^63.
    let n = if negative_dividend { self.negate() } else { self };
    let d = if negative_divisor { other.negate() } else { other };
    let (q, r) = n.div_rem_unsigned_magnitude(d);
    let q = if negative_dividend != negative_divisor {
      q.negate()
    } else {
      q
    };
    let r = if negative_dividend { r.negate() } else { r };
    (q, r)
  }

  /// Shift-subtract long division of unsigned magnitudes. `d` must be at most 2^63.
  fn div_rem_unsigned_magnitude(self, d: Self) -> (Self, Self) {
    let mut q = Self::ZERO;
    let mut r = Self::ZERO;
    for bit in (0..64).rev() {
      r = r.shl(1).or(self.ushr(bit).and(Self::ONE));
      if r.compare_unsigned(d) != Ordering::Less {
        r = r.sub(d);
        q = q.or(Self::ONE.shl(bit));
      }
    }
    (q, r)
  }

  pub fn and(self, other: Self) -> Self {
    Self::from_two_int(self.low & other.low, self.high & other.high)
  }

  pub fn or(self, other: Self) -> Self {
    Self::from_two_int(self.low | other.low, self.high | other.high)
  }

  pub fn xor(self, other: Self) -> Self {
    Self::from_two_int(self.low ^ other.low, self.high ^ other.high)
  }

  pub fn not(self) -> Self {
    Self::from_two_int(!self.low, !self.high)
  }

  /// Left shift; the amount is masked to 6 bits.
  pub fn shl(self, amount: i32) -> Self {
    let n = (amount & 63) as u32;
    let (low, high) = (self.low as u32, self.high as u32);
    if n == 0 {
      self
    } else if n < 32 {
      Self::from_two_int((low << n) as i32, ((high << n) | (low >> (32 - n))) as i32)
    } else {
      Self::from_two_int(0, (low << (n - 32)) as i32)
    }
  }

  /// Arithmetic (sign-propagating) right shift; the amount is masked to 6 bits.
  pub fn shr(self, amount: i32) -> Self {
    let n = (amount & 63) as u32;
    if n == 0 {
      self
    } else if n < 32 {
      let low = ((self.low as u32) >> n) | ((self.high as u32) << (32 - n));
      Self::from_two_int(low as i32, self.high >> n)
    } else {
      Self::from_two_int(self.high >> (n - 32), if self.high < 0 { -1 } else { 0 })
    }
  }

  /// Logical (zero-filling) right shift; the amount is masked to 6 bits.
  pub fn ushr(self, amount: i32) -> Self {
    let n = (amount & 63) as u32;
    let (low, high) = (self.low as u32, self.high as u32);
    if n == 0 {
      self
    } else if n < 32 {
      Self::from_two_int(((low >> n) | (high << (32 - n))) as i32, (high >> n) as i32)
    } else {
      Self::from_two_int((high >> (n - 32)) as i32, 0)
    }
  }

  /// Signed comparison.
  pub fn compare(self, other: Self) -> Ordering {
    self
      .high
      .cmp(&other.high)
      .then_with(|| (self.low as u32).cmp(&(other.low as u32)))
  }

  /// Comparison of the two's-complement bit patterns as unsigned numbers.
  pub fn compare_unsigned(self, other: Self) -> Ordering {
    (self.high as u32)
      .cmp(&(other.high as u32))
      .then_with(|| (self.low as u32).cmp(&(other.low as u32)))
  }

  /// Parses an optionally signed decimal string, rejecting values outside the 64-bit range.
  pub fn parse(text: &str) -> Option<Self> {
    let (negative, digits) = match text.as_bytes().first()? {
      b'-' => (true, &text[1..]),
      b'+' => (false, &text[1..]),
      _ => (false, text),
    };
    if digits.is_empty() {
      return None;
    }
    // Accumulate negatively so that MIN_VALUE is representable throughout.
    let limit = if negative {
      Self::MIN_VALUE
    } else {
      Self::MAX_VALUE.negate()
    };
    let mul_min = limit.div(Self::TEN);
    let mut result = Self::ZERO;
    for c in digits.chars() {
      let digit = Self::from_int(c.to_digit(10)? as i32);
      if result.compare(mul_min) == Ordering::Less {
        return None;
      }
      result = result.mul(Self::TEN);
      if result.compare(limit.add(digit)) == Ordering::Less {
        return None;
      }
      result = result.sub(digit);
    }
    Some(if negative { result } else { result.negate() })
  }
}

impl Ord for Long64 {
  fn cmp(&self, other: &Self) -> Ordering {
    self.compare(*other)
  }
}

impl PartialOrd for Long64 {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for Long64 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_zero() {
      return f.write_str("0");
    }
    let mut digits = Vec::with_capacity(20);
    let mut rest = *self;
    while !rest.is_zero() {
      let (q, r) = rest.div_rem(Self::TEN);
      digits.push(b'0' + r.low.unsigned_abs() as u8);
      rest = q;
    }
    if self.is_negative() {
      digits.push(b'-');
    }
    digits.reverse();
    f.write_str(core::str::from_utf8(&digits).map_err(|_| fmt::Error)?)
  }
}

impl fmt::Debug for Long64 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Long64({self}; low={:#010x}, high={:#010x})", self.low, self.high)
  }
}

impl From<i32> for Long64 {
  fn from(value: i32) -> Self {
    Self::from_int(value)
  }
}

impl From<i64> for Long64 {
  fn from(value: i64) -> Self {
    Self::from_i64(value)
  }
}

macro_rules! binary_ops {
  ($($trait:ident :: $method:ident => $inherent:ident),* $(,)?) => {
    $(
      impl $trait for Long64 {
        type Output = Long64;

        #[inline]
        fn $method(self, rhs: Long64) -> Long64 {
          Long64::$inherent(self, rhs)
        }
      }
    )*
  };
}

binary_ops! {
  Add::add => add,
  Sub::sub => sub,
  Mul::mul => mul,
  Div::div => div,
  Rem::rem => rem,
  BitAnd::bitand => and,
  BitOr::bitor => or,
  BitXor::bitxor => xor,
}

impl Neg for Long64 {
  type Output = Long64;

  fn neg(self) -> Long64 {
    self.negate()
  }
}

impl Not for Long64 {
  type Output = Long64;

  fn not(self) -> Long64 {
    Long64::not(self)
  }
}

impl Shl<i32> for Long64 {
  type Output = Long64;

  fn shl(self, rhs: i32) -> Long64 {
    Long64::shl(self, rhs)
  }
}

impl Shr<i32> for Long64 {
  type Output = Long64;

  fn shr(self, rhs: i32) -> Long64 {
    Long64::shr(self, rhs)
  }
}

/// `Double.longBitsToDouble`.
pub fn long_bits_to_double(bits: Long64) -> f64 {
  f64::from_bits(((bits.high as u32 as u64) << 32) | bits.low as u32 as u64)
}

/// `Double.doubleToRawLongBits`.
pub fn double_bits_to_long(value: f64) -> Long64 {
  let bits = value.to_bits();
  Long64::from_two_int(bits as u32 as i32, (bits >> 32) as u32 as i32)
}

/// `Float.floatToRawIntBits`.
#[inline]
pub fn float_bits_to_int(value: f32) -> i32 {
  value.to_bits() as i32
}

/// `Float.intBitsToFloat`.
#[inline]
pub fn int_bits_to_float(bits: i32) -> f32 {
  f32::from_bits(bits as u32)
}
