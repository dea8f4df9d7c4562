use crate::long::{double_bits_to_long, float_bits_to_int, Long64};
use crate::ObjRef;
use serde::{Deserialize, Serialize};

/// The kind of a managed value or storage slot.
///
/// The discriminants are the kind ordinals shared with the compiler (`0 = boolean` ...
/// `7 = double`, `8 = object`). They are a stable contract and must not be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JavaKind {
  Boolean = 0,
  Byte = 1,
  Short = 2,
  Char = 3,
  Int = 4,
  Float = 5,
  Long = 6,
  Double = 7,
  Object = 8,
}

impl JavaKind {
  pub const PRIMITIVES: [JavaKind; 8] = [
    JavaKind::Boolean,
    JavaKind::Byte,
    JavaKind::Short,
    JavaKind::Char,
    JavaKind::Int,
    JavaKind::Float,
    JavaKind::Long,
    JavaKind::Double,
  ];

  #[inline]
  pub fn ordinal(self) -> u32 {
    self as u32
  }

  pub fn from_ordinal(ordinal: u32) -> Option<JavaKind> {
    Some(match ordinal {
      0 => JavaKind::Boolean,
      1 => JavaKind::Byte,
      2 => JavaKind::Short,
      3 => JavaKind::Char,
      4 => JavaKind::Int,
      5 => JavaKind::Float,
      6 => JavaKind::Long,
      7 => JavaKind::Double,
      8 => JavaKind::Object,
      _ => return None,
    })
  }

  #[inline]
  pub fn is_primitive(self) -> bool {
    self != JavaKind::Object
  }

  pub fn is_integral(self) -> bool {
    matches!(
      self,
      JavaKind::Byte | JavaKind::Short | JavaKind::Char | JavaKind::Int | JavaKind::Long
    )
  }

  /// Storage width in bytes. References are stored as 32-bit slots.
  pub fn byte_width(self) -> u32 {
    match self {
      JavaKind::Boolean | JavaKind::Byte => 1,
      JavaKind::Short | JavaKind::Char => 2,
      JavaKind::Int | JavaKind::Float | JavaKind::Object => 4,
      JavaKind::Long | JavaKind::Double => 8,
    }
  }

  /// The Java source name (`int`, `double`, ...).
  pub fn java_name(self) -> &'static str {
    match self {
      JavaKind::Boolean => "boolean",
      JavaKind::Byte => "byte",
      JavaKind::Short => "short",
      JavaKind::Char => "char",
      JavaKind::Int => "int",
      JavaKind::Float => "float",
      JavaKind::Long => "long",
      JavaKind::Double => "double",
      JavaKind::Object => "java.lang.Object",
    }
  }

  /// The name of the box type for a primitive kind.
  pub fn box_name(self) -> Option<&'static str> {
    Some(match self {
      JavaKind::Boolean => "java.lang.Boolean",
      JavaKind::Byte => "java.lang.Byte",
      JavaKind::Short => "java.lang.Short",
      JavaKind::Char => "java.lang.Character",
      JavaKind::Int => "java.lang.Integer",
      JavaKind::Float => "java.lang.Float",
      JavaKind::Long => "java.lang.Long",
      JavaKind::Double => "java.lang.Double",
      JavaKind::Object => return None,
    })
  }
}

/// A managed value: either an unboxed primitive or a (possibly null) reference.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  Byte(i8),
  Short(i16),
  Char(u16),
  Int(i32),
  Float(f32),
  Long(Long64),
  Double(f64),
  Ref(ObjRef),
}

impl Value {
  pub fn kind(self) -> JavaKind {
    match self {
      Value::Bool(_) => JavaKind::Boolean,
      Value::Byte(_) => JavaKind::Byte,
      Value::Short(_) => JavaKind::Short,
      Value::Char(_) => JavaKind::Char,
      Value::Int(_) => JavaKind::Int,
      Value::Float(_) => JavaKind::Float,
      Value::Long(_) => JavaKind::Long,
      Value::Double(_) => JavaKind::Double,
      Value::Null | Value::Ref(_) => JavaKind::Object,
    }
  }

  /// The zero value a fresh slot of `kind` holds.
  pub fn default_for(kind: JavaKind) -> Value {
    match kind {
      JavaKind::Boolean => Value::Bool(false),
      JavaKind::Byte => Value::Byte(0),
      JavaKind::Short => Value::Short(0),
      JavaKind::Char => Value::Char(0),
      JavaKind::Int => Value::Int(0),
      JavaKind::Float => Value::Float(0.0),
      JavaKind::Long => Value::Long(Long64::ZERO),
      JavaKind::Double => Value::Double(0.0),
      JavaKind::Object => Value::Null,
    }
  }

  #[inline]
  pub fn is_null(self) -> bool {
    matches!(self, Value::Null)
  }

  #[inline]
  pub fn as_obj(self) -> Option<ObjRef> {
    match self {
      Value::Ref(obj) => Some(obj),
      _ => None,
    }
  }

  /// Numeric reading of a primitive, as the host would see it. `None` for booleans and references.
  pub fn as_f64(self) -> Option<f64> {
    Some(match self {
      Value::Byte(v) => v as f64,
      Value::Short(v) => v as f64,
      Value::Char(v) => v as f64,
      Value::Int(v) => v as f64,
      Value::Float(v) => v as f64,
      Value::Long(v) => v.to_number(),
      Value::Double(v) => v,
      Value::Null | Value::Bool(_) | Value::Ref(_) => return None,
    })
  }

  /// Java primitive conversion (widening or narrowing) to `kind`.
  ///
  /// Floating-point to integral conversions saturate and map NaN to zero, which is exactly what
  /// Rust's `as` does. `None` for references, `Object`, and conversions to or from `boolean`
  /// other than the identity.
  pub fn cast(self, kind: JavaKind) -> Option<Value> {
    if self.kind() == kind {
      return Some(self);
    }
    if matches!(self, Value::Null | Value::Ref(_) | Value::Bool(_)) {
      return None;
    }
    let as_long = match self {
      Value::Byte(v) => Long64::from_int(v as i32),
      Value::Short(v) => Long64::from_int(v as i32),
      Value::Char(v) => Long64::from_int(v as i32),
      Value::Int(v) => Long64::from_int(v),
      Value::Long(v) => v,
      Value::Float(v) => Long64::from_f32(v),
      Value::Double(v) => Long64::from_double(v),
      Value::Null | Value::Ref(_) | Value::Bool(_) => return None,
    };
    let as_int = match self {
      Value::Float(v) => v as i32,
      Value::Double(v) => v as i32,
      _ => as_long.to_int(),
    };
    Some(match kind {
      JavaKind::Byte => Value::Byte(as_int as i8),
      JavaKind::Short => Value::Short(as_int as i16),
      JavaKind::Char => Value::Char(as_int as u16),
      JavaKind::Int => Value::Int(as_int),
      JavaKind::Long => Value::Long(as_long),
      JavaKind::Float => Value::Float(match self {
        Value::Long(v) => v.to_f32(),
        Value::Double(v) => v as f32,
        other => other.as_f64()? as f32,
      }),
      JavaKind::Double => Value::Double(self.as_f64()?),
      JavaKind::Boolean | JavaKind::Object => return None,
    })
  }

  /// Bit pattern used for compare-and-swap. Floating-point values compare by their raw bits, so
  /// `NaN` matches itself and `+0.0` does not match `-0.0`.
  pub(crate) fn identity_bits(self) -> (JavaKind, u64) {
    let bits = match self {
      Value::Null => 0,
      Value::Ref(obj) => obj.index() as u64 + 1,
      Value::Bool(v) => v as u64,
      Value::Byte(v) => v as u8 as u64,
      Value::Short(v) => v as u16 as u64,
      Value::Char(v) => v as u64,
      Value::Int(v) => v as u32 as u64,
      Value::Float(v) => float_bits_to_int(v) as u32 as u64,
      Value::Long(v) => v.to_i64() as u64,
      Value::Double(v) => double_bits_to_long(v).to_i64() as u64,
    };
    (self.kind(), bits)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Int(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Double(value)
  }
}

impl From<Long64> for Value {
  fn from(value: Long64) -> Self {
    Value::Long(value)
  }
}

impl From<ObjRef> for Value {
  fn from(value: ObjRef) -> Self {
    Value::Ref(value)
  }
}
