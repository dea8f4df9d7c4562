//! Raw (unsafe) memory access over managed instances.
//!
//! The compiler lowers `Unsafe`-style accesses to `(object, byte offset, kind)` triples. An offset
//! below the hub's base offset (or any offset into a non-array) names a field; anything else is an
//! array element. Generated code is trusted to have proven every access in bounds, so a violation
//! is an invariant violation rather than a recoverable error.

use crate::heap::InstanceData;
use crate::long::{double_bits_to_long, float_bits_to_int, int_bits_to_float, long_bits_to_double, Long64};
use crate::options::Endianness;
use crate::realm::check_kind;
use crate::value::{JavaKind, Value};
use crate::{InteropError, ObjRef, Realm};

enum Slot {
  Field(usize),
  Element(usize),
  /// A byte position inside a primitive array's storage.
  Bytes(usize),
}

fn read_word(bytes: &[u8], at: usize, endianness: Endianness) -> i32 {
  let raw = [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
  match endianness {
    Endianness::Little => i32::from_le_bytes(raw),
    Endianness::Big => i32::from_be_bytes(raw),
  }
}

fn write_word(bytes: &mut [u8], at: usize, value: i32, endianness: Endianness) {
  let raw = match endianness {
    Endianness::Little => value.to_le_bytes(),
    Endianness::Big => value.to_be_bytes(),
  };
  bytes[at..at + 4].copy_from_slice(&raw);
}

/// Reads a scalar of `kind` at byte position `at`. The caller checks bounds.
pub(crate) fn read_scalar(bytes: &[u8], at: usize, kind: JavaKind, endianness: Endianness) -> Value {
  let half = |at: usize| {
    let raw = [bytes[at], bytes[at + 1]];
    match endianness {
      Endianness::Little => u16::from_le_bytes(raw),
      Endianness::Big => u16::from_be_bytes(raw),
    }
  };
  // 64-bit values are two 32-bit words; the endianness decides which word comes first.
  let long = || {
    let first = read_word(bytes, at, endianness);
    let second = read_word(bytes, at + 4, endianness);
    match endianness {
      Endianness::Little => Long64::from_two_int(first, second),
      Endianness::Big => Long64::from_two_int(second, first),
    }
  };
  match kind {
    JavaKind::Boolean => Value::Bool(bytes[at] != 0),
    JavaKind::Byte => Value::Byte(bytes[at] as i8),
    JavaKind::Short => Value::Short(half(at) as i16),
    JavaKind::Char => Value::Char(half(at)),
    JavaKind::Int => Value::Int(read_word(bytes, at, endianness)),
    JavaKind::Float => Value::Float(int_bits_to_float(read_word(bytes, at, endianness))),
    JavaKind::Long => Value::Long(long()),
    JavaKind::Double => Value::Double(long_bits_to_double(long())),
    JavaKind::Object => Value::Null,
  }
}

/// Writes a primitive at byte position `at`, using the value's own width. The caller checks
/// bounds and kinds.
pub(crate) fn write_scalar(bytes: &mut [u8], at: usize, value: Value, endianness: Endianness) {
  let half = |bytes: &mut [u8], v: u16| {
    let raw = match endianness {
      Endianness::Little => v.to_le_bytes(),
      Endianness::Big => v.to_be_bytes(),
    };
    bytes[at..at + 2].copy_from_slice(&raw);
  };
  let long = |bytes: &mut [u8], v: Long64| {
    let (first, second) = match endianness {
      Endianness::Little => (v.low_bits(), v.high_bits()),
      Endianness::Big => (v.high_bits(), v.low_bits()),
    };
    write_word(bytes, at, first, endianness);
    write_word(bytes, at + 4, second, endianness);
  };
  match value {
    Value::Bool(v) => bytes[at] = v as u8,
    Value::Byte(v) => bytes[at] = v as u8,
    Value::Short(v) => half(bytes, v as u16),
    Value::Char(v) => half(bytes, v),
    Value::Int(v) => write_word(bytes, at, v, endianness),
    Value::Float(v) => write_word(bytes, at, float_bits_to_int(v), endianness),
    Value::Long(v) => long(bytes, v),
    Value::Double(v) => long(bytes, double_bits_to_long(v)),
    Value::Null | Value::Ref(_) => {}
  }
}

fn out_of_bounds(obj: ObjRef, offset: u32) -> InteropError {
  InteropError::should_not_reach_here(format!("unsafe access to {obj:?} at offset {offset} is out of bounds"))
}

impl Realm {
  /// Resolves `(obj, offset, kind)` to a storage slot and the kind stored there.
  fn resolve_slot(
    &self,
    obj: ObjRef,
    offset: u32,
    kind: Option<JavaKind>,
  ) -> Result<(Slot, JavaKind), InteropError> {
    let instance = self.instance(obj)?;
    let hub = self.hub(instance.hub)?;
    let layout = hub.layout;
    let is_array = matches!(
      instance.data,
      InstanceData::PrimitiveArray { .. } | InstanceData::ObjectArray(_)
    );

    if !is_array || offset < layout.base_offset {
      let (index, field) = hub.field_by_offset(offset).ok_or_else(|| {
        InteropError::should_not_reach_here(format!("{} has no field at offset {offset}", hub.name))
      })?;
      if let Some(kind) = kind {
        if kind != field.kind {
          return Err(InteropError::should_not_reach_here(format!(
            "field {} of {} accessed as {}",
            field.name,
            hub.name,
            kind.java_name()
          )));
        }
      }
      return Ok((Slot::Field(index), field.kind));
    }

    let rel = offset - layout.base_offset;
    let scale = layout.element_scale.max(1);
    let index = rel / scale;
    match &instance.data {
      InstanceData::ObjectArray(elements) => {
        if kind.is_some_and(|kind| kind != JavaKind::Object) {
          return Err(InteropError::should_not_reach_here(
            "object arrays only support object accesses",
          ));
        }
        if rel % scale != 0 || index as usize >= elements.len() {
          return Err(out_of_bounds(obj, offset));
        }
        Ok((Slot::Element(index as usize), JavaKind::Object))
      }
      InstanceData::PrimitiveArray {
        kind: element,
        length,
        bytes,
      } => {
        let access = kind.unwrap_or(*element);
        if access == JavaKind::Object {
          return Err(InteropError::should_not_reach_here(
            "object access into a primitive array",
          ));
        }
        if kind.is_none() && rel % scale != 0 {
          return Err(out_of_bounds(obj, offset));
        }
        let end = rel as usize + access.byte_width() as usize;
        if index >= *length || end > bytes.len() {
          return Err(out_of_bounds(obj, offset));
        }
        Ok((Slot::Bytes(rel as usize), access))
      }
      _ => Err(InteropError::should_not_reach_here("not an array")),
    }
  }

  /// Loads the value at `offset`. With `kind` set, exactly that many bytes are read.
  pub fn unsafe_load(&self, obj: ObjRef, offset: u32, kind: Option<JavaKind>) -> Result<Value, InteropError> {
    let (slot, kind) = self.resolve_slot(obj, offset, kind)?;
    let endianness = self.options().endianness;
    match (slot, &self.instance(obj)?.data) {
      (Slot::Field(index), InstanceData::Fields(fields)) => Ok(fields[index]),
      (Slot::Element(index), InstanceData::ObjectArray(elements)) => Ok(elements[index]),
      (Slot::Bytes(at), InstanceData::PrimitiveArray { bytes, .. }) => {
        Ok(read_scalar(bytes, at, kind, endianness))
      }
      _ => Err(InteropError::should_not_reach_here("storage does not match layout")),
    }
  }

  /// Stores `value` at `offset`. `value` must be of the slot's (or the explicit) kind.
  pub fn unsafe_store(
    &mut self,
    obj: ObjRef,
    offset: u32,
    kind: Option<JavaKind>,
    value: Value,
  ) -> Result<(), InteropError> {
    let (slot, kind) = self.resolve_slot(obj, offset, kind)?;
    check_kind(value, kind)?;
    let endianness = self.options().endianness;
    match (slot, &mut self.instance_mut(obj)?.data) {
      (Slot::Field(index), InstanceData::Fields(fields)) => fields[index] = value,
      (Slot::Element(index), InstanceData::ObjectArray(elements)) => elements[index] = value,
      (Slot::Bytes(at), InstanceData::PrimitiveArray { bytes, .. }) => {
        write_scalar(bytes, at, value, endianness)
      }
      _ => return Err(InteropError::should_not_reach_here("storage does not match layout")),
    }
    Ok(())
  }

  /// Stores `new` if the current value is bitwise identical to `expected`. Returns whether the
  /// store happened.
  pub fn compare_and_swap(
    &mut self,
    obj: ObjRef,
    offset: u32,
    kind: Option<JavaKind>,
    expected: Value,
    new: Value,
  ) -> Result<bool, InteropError> {
    let witness = self.compare_and_exchange(obj, offset, kind, expected, new)?;
    Ok(witness.identity_bits() == expected.identity_bits())
  }

  /// Like [`Realm::compare_and_swap`], but returns the value observed before the operation.
  pub fn compare_and_exchange(
    &mut self,
    obj: ObjRef,
    offset: u32,
    kind: Option<JavaKind>,
    expected: Value,
    new: Value,
  ) -> Result<Value, InteropError> {
    let current = self.unsafe_load(obj, offset, kind)?;
    if current.identity_bits() == expected.identity_bits() {
      self.unsafe_store(obj, offset, kind, new)?;
    }
    Ok(current)
  }

  /// Stores `new` and returns the previous value.
  pub fn get_and_set(
    &mut self,
    obj: ObjRef,
    offset: u32,
    kind: Option<JavaKind>,
    new: Value,
  ) -> Result<Value, InteropError> {
    let current = self.unsafe_load(obj, offset, kind)?;
    self.unsafe_store(obj, offset, kind, new)?;
    Ok(current)
  }

  /// Adds `delta` (wrapping) and returns the previous value. `delta` must match the slot's kind.
  pub fn get_and_add(
    &mut self,
    obj: ObjRef,
    offset: u32,
    kind: Option<JavaKind>,
    delta: Value,
  ) -> Result<Value, InteropError> {
    let current = self.unsafe_load(obj, offset, kind)?;
    let sum = match (current, delta) {
      (Value::Byte(a), Value::Byte(b)) => Value::Byte(a.wrapping_add(b)),
      (Value::Short(a), Value::Short(b)) => Value::Short(a.wrapping_add(b)),
      (Value::Char(a), Value::Char(b)) => Value::Char(a.wrapping_add(b)),
      (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
      (Value::Long(a), Value::Long(b)) => Value::Long(a.add(b)),
      (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
      (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
      _ => {
        return Err(InteropError::should_not_reach_here(format!(
          "cannot add {delta:?} to {current:?}"
        )))
      }
    };
    self.unsafe_store(obj, offset, kind, sum)?;
    Ok(current)
  }
}
