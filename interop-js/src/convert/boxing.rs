use super::Backend;
use crate::heap::InstanceData;
use crate::host::HostValue;
use crate::long::Long64;
use crate::value::{JavaKind, Value};
use crate::{InteropError, ObjRef, Runtime};

/// The primitive kind for a compiler kind ordinal; `None` for `Object` and unknown ordinals.
fn primitive_kind(ordinal: u32) -> Option<JavaKind> {
  JavaKind::from_ordinal(ordinal).filter(|kind| kind.is_primitive())
}

/// The single UTF-16 unit of a one-unit string.
pub(crate) fn single_unit(s: &str) -> Option<u16> {
  let mut units = s.encode_utf16();
  match (units.next(), units.next()) {
    (Some(unit), None) => Some(unit),
    _ => None,
  }
}

const TWO_PWR_63: f64 = 9_223_372_036_854_775_808.0;

fn is_exact_integer(n: f64, min: f64, max: f64) -> bool {
  n.is_finite() && n.trunc() == n && n >= min && n <= max
}

impl<B: Backend> Runtime<B> {
  /// Boxes `value` as the primitive kind with the given ordinal. References, and ordinals that do
  /// not name a primitive, pass through unchanged.
  pub fn box_if_needed(&mut self, value: Value, ordinal: u32) -> Result<Value, InteropError> {
    let Some(kind) = primitive_kind(ordinal) else {
      return Ok(value);
    };
    if matches!(value, Value::Null | Value::Ref(_)) {
      return Ok(value);
    }
    let primitive = value.cast(kind).ok_or_else(|| {
      InteropError::class_cast(format!("cannot box {value:?} as {}", kind.java_name()))
    })?;
    Ok(Value::Ref(self.realm.alloc_boxed(primitive)?))
  }

  /// Unboxes `value` to the primitive kind with the given ordinal, converting numerically the way
  /// a Java cast would. Accepts boxes, `JS*` wrappers of booleans, numbers, bigints and
  /// one-character strings, and primitives. Other ordinals pass through unchanged.
  pub fn unbox_if_needed(&mut self, value: Value, ordinal: u32) -> Result<Value, InteropError> {
    let Some(kind) = primitive_kind(ordinal) else {
      return Ok(value);
    };
    if value.is_null() {
      return Err(InteropError::class_cast(format!(
        "cannot unbox null as {}",
        kind.java_name()
      )));
    }
    self
      .primitive_of(value)?
      .and_then(|primitive| primitive.cast(kind))
      .ok_or_else(|| InteropError::class_cast(format!("cannot unbox {value:?} as {}", kind.java_name())))
  }

  /// The primitive carried by `value`: itself, the contents of a box, or the host primitive of a
  /// `JS*` wrapper (numbers as `double`, bigints as `long`, one-unit strings as `char`).
  pub(crate) fn primitive_of(&mut self, value: Value) -> Result<Option<Value>, InteropError> {
    let obj = match value {
      Value::Null => return Ok(None),
      Value::Ref(obj) => obj,
      primitive => return Ok(Some(primitive)),
    };
    if let InstanceData::Boxed(inner) = self.realm.instance(obj)?.data {
      return Ok(Some(inner));
    }
    Ok(match self.js_host_value(obj)? {
      Some(HostValue::Bool(v)) => Some(Value::Bool(v)),
      Some(HostValue::Number(n)) => Some(Value::Double(n)),
      Some(HostValue::BigInt(b)) => Some(Value::Long(Long64::from_bigint(&b))),
      Some(HostValue::String(s)) => single_unit(&s).map(Value::Char),
      _ => None,
    })
  }

  /// The host value of a `JS*` wrapper; `None` for every other instance.
  pub(crate) fn js_host_value(&mut self, obj: ObjRef) -> Result<Option<HostValue>, InteropError> {
    if matches!(self.realm.instance(obj)?.data, InstanceData::Js(_)) {
      self.unwrap_js_value(obj)
    } else {
      Ok(None)
    }
  }

  /// Strict conversion of an argument to a primitive parameter, used by overload resolution.
  ///
  /// Unlike [`Runtime::unbox_if_needed`], nothing is narrowed: a host number only conforms to an
  /// integral kind when it is an integer in range, to `float` only when single precision holds it
  /// exactly, a bigint only to `long` (and only when it fits), and a string only to `char` when it
  /// is a single code unit.
  pub(crate) fn conform_primitive(&mut self, value: Value, kind: JavaKind) -> Result<Option<Value>, InteropError> {
    let obj = match value {
      Value::Null => return Ok(None),
      Value::Ref(obj) => obj,
      primitive => return Ok((primitive.kind() == kind).then_some(primitive)),
    };
    if let InstanceData::Boxed(inner) = self.realm.instance(obj)?.data {
      return Ok((inner.kind() == kind).then_some(inner));
    }
    Ok(match (self.js_host_value(obj)?, kind) {
      (Some(HostValue::Bool(v)), JavaKind::Boolean) => Some(Value::Bool(v)),
      (Some(HostValue::Number(n)), JavaKind::Double) => Some(Value::Double(n)),
      (Some(HostValue::Number(n)), JavaKind::Float) if n.is_nan() || (n as f32) as f64 == n => {
        Some(Value::Float(n as f32))
      }
      (Some(HostValue::Number(n)), JavaKind::Byte) if is_exact_integer(n, i8::MIN as f64, i8::MAX as f64) => {
        Some(Value::Byte(n as i8))
      }
      (Some(HostValue::Number(n)), JavaKind::Short) if is_exact_integer(n, i16::MIN as f64, i16::MAX as f64) => {
        Some(Value::Short(n as i16))
      }
      (Some(HostValue::Number(n)), JavaKind::Int) if is_exact_integer(n, i32::MIN as f64, i32::MAX as f64) => {
        Some(Value::Int(n as i32))
      }
      (Some(HostValue::Number(n)), JavaKind::Long) if is_exact_integer(n, -TWO_PWR_63, TWO_PWR_63) && n < TWO_PWR_63 => {
        Some(Value::Long(Long64::from_double(n)))
      }
      (Some(HostValue::BigInt(b)), JavaKind::Long) => {
        let long = Long64::from_bigint(&b);
        (long.to_bigint() == b).then_some(Value::Long(long))
      }
      (Some(HostValue::String(s)), JavaKind::Char) => single_unit(&s).map(Value::Char),
      _ => None,
    })
  }
}
