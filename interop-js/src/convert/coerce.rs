use super::Backend;
use crate::heap::InstanceData;
use crate::host::{HostObjectKind, HostValue, TypedArrayKind};
use crate::hub::HubId;
use crate::value::{JavaKind, Value};
use crate::{InteropError, Runtime};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use tracing::trace;

/// The target of [`Runtime::coerce_javascript_to_java_type`].
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor<'a> {
  /// A fully qualified type name, looked up in the type table.
  Name(&'a str),
  /// A host value that should be the proxy of a `java.lang.Class` instance.
  Value(HostValue),
}

impl<'a> From<&'a str> for TypeDescriptor<'a> {
  fn from(name: &'a str) -> Self {
    TypeDescriptor::Name(name)
  }
}

/// The managed array element kind backing each typed array type.
fn typed_array_element(kind: TypedArrayKind) -> JavaKind {
  match kind {
    TypedArrayKind::Int8 => JavaKind::Byte,
    TypedArrayKind::Uint8 => JavaKind::Boolean,
    TypedArrayKind::Int16 => JavaKind::Short,
    TypedArrayKind::Uint16 => JavaKind::Char,
    TypedArrayKind::Int32 => JavaKind::Int,
    TypedArrayKind::Float32 => JavaKind::Float,
    TypedArrayKind::Float64 => JavaKind::Double,
    TypedArrayKind::BigInt64 => JavaKind::Long,
  }
}

/// `Number.prototype.toString` in radix 10.
///
/// Shortest round-trip digits come from `ryu`; they are then laid out in fixed or exponent
/// notation at the same thresholds as the host (21 integral digits, 6 leading fraction zeros).
pub(crate) fn number_to_string(n: f64) -> String {
  if n.is_nan() {
    return "NaN".to_string();
  }
  if n.is_infinite() {
    return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
  }
  // Also covers -0.
  if n == 0.0 {
    return "0".to_string();
  }
  let mut buf = ryu::Buffer::new();
  let formatted = buf.format_finite(n.abs());
  let (mantissa, exponent) = match formatted.split_once('e') {
    Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
    None => (formatted, 0),
  };
  let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
  let all_digits = format!("{int_part}{frac_part}");
  let significant = all_digits.trim_start_matches('0');
  // Position of the decimal point relative to the first significant digit.
  let point = int_part.len() as i32 + exponent - (all_digits.len() - significant.len()) as i32;
  let digits = significant.trim_end_matches('0');
  let k = digits.len() as i32;

  let mut out = String::with_capacity(digits.len() + 8);
  if n < 0.0 {
    out.push('-');
  }
  if k <= point && point <= 21 {
    out.push_str(digits);
    out.extend(std::iter::repeat('0').take((point - k) as usize));
  } else if 0 < point && point <= 21 {
    out.push_str(&digits[..point as usize]);
    out.push('.');
    out.push_str(&digits[point as usize..]);
  } else if -6 < point && point <= 0 {
    out.push_str("0.");
    out.extend(std::iter::repeat('0').take(-point as usize));
    out.push_str(digits);
  } else {
    out.push_str(&digits[..1]);
    if k > 1 {
      out.push('.');
      out.push_str(&digits[1..]);
    }
    let e = point - 1;
    out.push('e');
    out.push(if e < 0 { '-' } else { '+' });
    out.push_str(&e.unsigned_abs().to_string());
  }
  out
}

fn cast_failure(value: &HostValue, target: &str) -> InteropError {
  InteropError::class_cast(format!("cannot coerce {value:?} to {target}"))
}

impl<B: Backend> Runtime<B> {
  /// Explicit cast of a value handed to the host into the requested JavaScript shape: `boolean`,
  /// `number`, `bigint`, `string`, `object`, `function`, or a typed array type name such as
  /// `Int32Array`. Boxes and strings behind proxies are unwrapped first; typed arrays are copied
  /// out of a managed primitive array of the matching element kind.
  pub fn coerce_java_proxy_to_javascript_type(
    &mut self,
    value: &HostValue,
    target: &str,
  ) -> Result<HostValue, InteropError> {
    trace!(?value, target, "coerce to host type");
    let primitive = self.host_primitive(value)?;
    match target {
      "boolean" => match primitive {
        HostValue::Bool(_) => Ok(primitive),
        _ => Err(cast_failure(value, target)),
      },
      "number" => match primitive {
        HostValue::Number(_) => Ok(primitive),
        HostValue::BigInt(b) => Ok(HostValue::Number(b.to_f64().unwrap_or(f64::NAN))),
        _ => Err(cast_failure(value, target)),
      },
      "bigint" => match primitive {
        HostValue::BigInt(_) => Ok(primitive),
        HostValue::Number(n) if n.is_finite() && n.trunc() == n => BigInt::from_f64(n)
          .map(HostValue::BigInt)
          .ok_or_else(|| cast_failure(value, target)),
        _ => Err(cast_failure(value, target)),
      },
      "string" => match primitive {
        HostValue::String(_) => Ok(primitive),
        HostValue::Number(n) => Ok(HostValue::String(number_to_string(n).into())),
        HostValue::Bool(b) => Ok(HostValue::String(b.to_string().into())),
        HostValue::BigInt(b) => Ok(HostValue::String(b.to_string().into())),
        HostValue::Object(obj) if self.managed_behind(&primitive)?.is_some() => {
          match self.invoke_member(obj, "toString", &[])? {
            HostValue::String(s) => Ok(HostValue::String(s)),
            _ => Err(cast_failure(value, target)),
          }
        }
        _ => Err(cast_failure(value, target)),
      },
      "object" => match primitive {
        HostValue::Object(_) | HostValue::Null => Ok(primitive),
        _ => Err(cast_failure(value, target)),
      },
      "function" => {
        let HostValue::Object(obj) = primitive else {
          return Err(cast_failure(value, target));
        };
        if matches!(
          self.realm.host().object(obj)?.kind,
          HostObjectKind::Function(_) | HostObjectKind::Member { .. }
        ) {
          return Ok(primitive);
        }
        let target_obj = self
          .managed_behind(&primitive)?
          .ok_or_else(|| cast_failure(value, target))?;
        let hub = self.realm.hub_of(target_obj)?;
        let name = self
          .functional_member(hub)?
          .ok_or_else(|| cast_failure(value, target))?;
        Ok(HostValue::Object(self.member_object(obj, &name)?))
      }
      _ => {
        let kind = TypedArrayKind::from_name(target)
          .ok_or_else(|| InteropError::class_cast(format!("unsupported coercion target {target}")))?;
        let array = self
          .managed_behind(&primitive)?
          .ok_or_else(|| cast_failure(value, target))?;
        let element = match self.realm.instance(array)?.data {
          InstanceData::PrimitiveArray { kind, .. } => kind,
          _ => return Err(cast_failure(value, target)),
        };
        if element != typed_array_element(kind) {
          return Err(cast_failure(value, target));
        }
        let length = self.realm.array_length(array)?;
        let mut bytes = Vec::with_capacity(length as usize * kind.element_size());
        for index in 0..length {
          match self.realm.array_get(array, index)? {
            Value::Bool(v) => bytes.push(v as u8),
            Value::Byte(v) => bytes.extend_from_slice(&v.to_le_bytes()),
            Value::Short(v) => bytes.extend_from_slice(&v.to_le_bytes()),
            Value::Char(v) => bytes.extend_from_slice(&v.to_le_bytes()),
            Value::Int(v) => bytes.extend_from_slice(&v.to_le_bytes()),
            Value::Float(v) => bytes.extend_from_slice(&v.to_le_bytes()),
            Value::Long(v) => bytes.extend_from_slice(&v.to_i64().to_le_bytes()),
            Value::Double(v) => bytes.extend_from_slice(&v.to_le_bytes()),
            Value::Null | Value::Ref(_) => return Err(cast_failure(value, target)),
          }
        }
        Ok(HostValue::Object(self.realm.host_mut().alloc_typed_array(kind, bytes)))
      }
    }
  }

  /// A host value with boxes and strings behind proxies replaced by their host primitive.
  fn host_primitive(&mut self, value: &HostValue) -> Result<HostValue, InteropError> {
    let Some(obj) = self.managed_behind(value)? else {
      return Ok(value.clone());
    };
    if matches!(
      self.realm.instance(obj)?.data,
      InstanceData::Boxed(_) | InstanceData::String(_)
    ) {
      self.java_to_javascript(Value::Ref(obj))
    } else {
      Ok(value.clone())
    }
  }

  /// Resolves a [`TypeDescriptor`] to a hub. Unknown names and values that are not type proxies are
  /// cast failures.
  pub fn resolve_type_descriptor(&mut self, descriptor: &TypeDescriptor<'_>) -> Result<HubId, InteropError> {
    match descriptor {
      TypeDescriptor::Name(name) => self
        .realm
        .types()
        .lookup(name)
        .ok_or_else(|| InteropError::class_cast(format!("unknown type {name}"))),
      TypeDescriptor::Value(value) => {
        let obj = self
          .managed_behind(value)?
          .ok_or_else(|| InteropError::class_cast("type descriptor is not a managed value"))?;
        self
          .realm
          .type_of_class_object(obj)?
          .ok_or_else(|| InteropError::class_cast("type descriptor is not a class"))
      }
    }
  }

  /// Converts a host value and casts it to the described type.
  ///
  /// Primitive targets unbox with Java narrowing. Reference targets accept `null`, any instance of
  /// the type, and the adaptations of [`Runtime::adapt_to_hub`] (host numbers to boxes, host
  /// strings to `java.lang.String`); everything else is a cast failure.
  pub fn coerce_javascript_to_java_type(
    &mut self,
    value: &HostValue,
    descriptor: TypeDescriptor<'_>,
  ) -> Result<Value, InteropError> {
    let hub = self.resolve_type_descriptor(&descriptor)?;
    let managed = self.javascript_to_java(value)?;
    if let Some(kind) = self.realm.hub(hub)?.primitive_kind() {
      return self.unbox_if_needed(managed, kind.ordinal());
    }
    match self.adapt_to_hub(managed, hub)? {
      Some(adapted) => Ok(adapted),
      None => Err(InteropError::class_cast(format!(
        "{} cannot be cast to {}",
        self.describe(managed)?,
        self.realm.hub(hub)?.name
      ))),
    }
  }

  /// The `as(value, type)` entry point exposed to host code.
  pub fn as_type(&mut self, value: &HostValue, descriptor: TypeDescriptor<'_>) -> Result<Value, InteropError> {
    self.coerce_javascript_to_java_type(value, descriptor)
  }

  /// Adapts a converted argument to `hub` without narrowing, returning `None` when it does not
  /// conform.
  ///
  /// Values that already are instances pass unchanged. Otherwise primitive targets take
  /// [`Runtime::conform_primitive`], box types take the same and box the result, and
  /// `java.lang.String` accepts wrapped host strings.
  pub fn adapt_to_hub(&mut self, value: Value, hub: HubId) -> Result<Option<Value>, InteropError> {
    if let Some(kind) = self.realm.hub(hub)?.primitive_kind() {
      return self.conform_primitive(value, kind);
    }
    if self.realm.is_instance(value, hub, true)? {
      return Ok(Some(value));
    }
    if let Some(kind) = self.realm.intrinsics().unboxed_kind(hub) {
      return match self.conform_primitive(value, kind)? {
        Some(primitive) => Ok(Some(Value::Ref(self.realm.alloc_boxed(primitive)?))),
        None => Ok(None),
      };
    }
    if hub == self.realm.intrinsics().string {
      if let Value::Ref(obj) = value {
        if let Some(HostValue::String(s)) = self.js_host_value(obj)? {
          return Ok(Some(Value::Ref(self.realm.alloc_string(&s)?)));
        }
      }
    }
    Ok(None)
  }

  /// Whether [`Runtime::adapt_to_hub`] would accept `value`, without allocating the adapted value.
  pub(crate) fn conforms_to_hub(&mut self, value: Value, hub: HubId) -> Result<bool, InteropError> {
    if let Some(kind) = self.realm.hub(hub)?.primitive_kind() {
      return Ok(self.conform_primitive(value, kind)?.is_some());
    }
    if self.realm.is_instance(value, hub, true)? {
      return Ok(true);
    }
    if let Some(kind) = self.realm.intrinsics().unboxed_kind(hub) {
      return Ok(self.conform_primitive(value, kind)?.is_some());
    }
    if hub == self.realm.intrinsics().string {
      if let Value::Ref(obj) = value {
        return Ok(matches!(self.js_host_value(obj)?, Some(HostValue::String(_))));
      }
    }
    Ok(false)
  }

  fn describe(&self, value: Value) -> Result<String, InteropError> {
    Ok(match value {
      Value::Null => "null".to_string(),
      Value::Ref(obj) => self.realm.hub(self.realm.hub_of(obj)?)?.name.to_string(),
      primitive => primitive.kind().java_name().to_string(),
    })
  }
}
