//! The JavaScript host, modelled as a value type plus a heap of objects.

use crate::handle::{HostObject, HostSymbol};
use crate::{InteropError, ObjRef};
use core::fmt;
use num_bigint::BigInt;
use std::rc::Rc;

/// A host (JavaScript) value.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  BigInt(BigInt),
  String(Rc<str>),
  Symbol(HostSymbol),
  Object(HostObject),
}

impl HostValue {
  pub fn string(value: &str) -> Self {
    HostValue::String(Rc::from(value))
  }

  /// The `typeof` operator.
  pub fn type_of(&self, heap: &HostHeap) -> &'static str {
    match self {
      HostValue::Undefined => "undefined",
      HostValue::Null => "object",
      HostValue::Bool(_) => "boolean",
      HostValue::Number(_) => "number",
      HostValue::BigInt(_) => "bigint",
      HostValue::String(_) => "string",
      HostValue::Symbol(_) => "symbol",
      HostValue::Object(obj) => match heap.object(*obj).map(|data| &data.kind) {
        Ok(HostObjectKind::Function(_) | HostObjectKind::Member { .. }) => "function",
        _ => "object",
      },
    }
  }

  #[inline]
  pub fn as_object(&self) -> Option<HostObject> {
    match self {
      HostValue::Object(obj) => Some(*obj),
      _ => None,
    }
  }
}

impl From<bool> for HostValue {
  fn from(value: bool) -> Self {
    HostValue::Bool(value)
  }
}

impl From<f64> for HostValue {
  fn from(value: f64) -> Self {
    HostValue::Number(value)
  }
}

impl From<&str> for HostValue {
  fn from(value: &str) -> Self {
    HostValue::string(value)
  }
}

impl From<HostObject> for HostValue {
  fn from(value: HostObject) -> Self {
    HostValue::Object(value)
  }
}

/// A native host function: `(heap, this, args) -> Ok(return) | Err(thrown)`.
pub type HostFn = Rc<dyn Fn(&mut HostHeap, HostValue, &[HostValue]) -> Result<HostValue, HostValue>>;

/// Element type of a typed array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
  Int8,
  Uint8,
  Int16,
  Uint16,
  Int32,
  Float32,
  Float64,
  BigInt64,
}

impl TypedArrayKind {
  pub fn from_name(name: &str) -> Option<Self> {
    Some(match name {
      "Int8Array" => TypedArrayKind::Int8,
      "Uint8Array" => TypedArrayKind::Uint8,
      "Int16Array" => TypedArrayKind::Int16,
      "Uint16Array" => TypedArrayKind::Uint16,
      "Int32Array" => TypedArrayKind::Int32,
      "Float32Array" => TypedArrayKind::Float32,
      "Float64Array" => TypedArrayKind::Float64,
      "BigInt64Array" => TypedArrayKind::BigInt64,
      _ => return None,
    })
  }

  pub fn name(self) -> &'static str {
    match self {
      TypedArrayKind::Int8 => "Int8Array",
      TypedArrayKind::Uint8 => "Uint8Array",
      TypedArrayKind::Int16 => "Int16Array",
      TypedArrayKind::Uint16 => "Uint16Array",
      TypedArrayKind::Int32 => "Int32Array",
      TypedArrayKind::Float32 => "Float32Array",
      TypedArrayKind::Float64 => "Float64Array",
      TypedArrayKind::BigInt64 => "BigInt64Array",
    }
  }

  pub fn element_size(self) -> usize {
    match self {
      TypedArrayKind::Int8 | TypedArrayKind::Uint8 => 1,
      TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
      TypedArrayKind::Int32 | TypedArrayKind::Float32 => 4,
      TypedArrayKind::Float64 | TypedArrayKind::BigInt64 => 8,
    }
  }
}

pub enum HostObjectKind {
  Ordinary,
  Function(HostFn),
  Error { name: Rc<str>, message: Rc<str> },
  Array(Vec<HostValue>),
  /// Elements are stored little-endian, as on every host this targets.
  TypedArray { kind: TypedArrayKind, bytes: Vec<u8> },
  /// A proxy standing in for a managed instance.
  Proxy,
  /// A bound member of a proxy, as returned by a member read. Calling it invokes the member.
  Member { target: HostObject, name: Rc<str> },
}

impl fmt::Debug for HostObjectKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HostObjectKind::Ordinary => f.write_str("Ordinary"),
      HostObjectKind::Function(_) => f.write_str("Function"),
      HostObjectKind::Error { name, message } => f
        .debug_struct("Error")
        .field("name", name)
        .field("message", message)
        .finish(),
      HostObjectKind::Array(elements) => f.debug_tuple("Array").field(elements).finish(),
      HostObjectKind::TypedArray { kind, bytes } => f
        .debug_struct("TypedArray")
        .field("kind", kind)
        .field("len", &bytes.len())
        .finish(),
      HostObjectKind::Proxy => f.write_str("Proxy"),
      HostObjectKind::Member { target, name } => f
        .debug_struct("Member")
        .field("target", target)
        .field("name", name)
        .finish(),
    }
  }
}

/// Internal slots invisible to host code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hidden {
  /// The managed instance this object stands for (proxies and error objects of throwables).
  pub counterpart: Option<ObjRef>,
  /// The managed `JS*` wrapper created for this object, if any.
  pub java_wrapper: Option<ObjRef>,
}

#[derive(Debug)]
pub struct HostObjectData {
  pub kind: HostObjectKind,
  properties: Vec<(Rc<str>, HostValue)>,
  pub hidden: Hidden,
}

/// Storage for every host object and symbol. Like the managed heap it never frees; reclamation is
/// the host engine's business.
#[derive(Debug, Default)]
pub struct HostHeap {
  objects: Vec<HostObjectData>,
  symbols: Vec<Option<Rc<str>>>,
}

impl HostHeap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc(&mut self, kind: HostObjectKind) -> HostObject {
    let handle = HostObject(self.objects.len() as u32);
    self.objects.push(HostObjectData {
      kind,
      properties: Vec::new(),
      hidden: Hidden::default(),
    });
    handle
  }

  pub fn alloc_object(&mut self) -> HostObject {
    self.alloc(HostObjectKind::Ordinary)
  }

  pub fn alloc_function(
    &mut self,
    f: impl Fn(&mut HostHeap, HostValue, &[HostValue]) -> Result<HostValue, HostValue> + 'static,
  ) -> HostObject {
    self.alloc(HostObjectKind::Function(Rc::new(f)))
  }

  /// Allocates an error object; `name` and `message` are also readable as properties.
  pub fn alloc_error(&mut self, name: &str, message: &str) -> HostObject {
    self.alloc(HostObjectKind::Error {
      name: Rc::from(name),
      message: Rc::from(message),
    })
  }

  pub fn alloc_array(&mut self, elements: Vec<HostValue>) -> HostObject {
    self.alloc(HostObjectKind::Array(elements))
  }

  pub fn alloc_typed_array(&mut self, kind: TypedArrayKind, bytes: Vec<u8>) -> HostObject {
    self.alloc(HostObjectKind::TypedArray { kind, bytes })
  }

  /// The `Symbol(description)` constructor. Every call yields a distinct symbol.
  pub fn alloc_symbol(&mut self, description: Option<&str>) -> HostSymbol {
    let handle = HostSymbol(self.symbols.len() as u32);
    self.symbols.push(description.map(Rc::from));
    handle
  }

  pub fn symbol_description(&self, symbol: HostSymbol) -> Option<Rc<str>> {
    self.symbols.get(symbol.index() as usize).cloned().flatten()
  }

  pub fn object(&self, obj: HostObject) -> Result<&HostObjectData, InteropError> {
    self
      .objects
      .get(obj.index() as usize)
      .ok_or_else(|| InteropError::should_not_reach_here(format!("invalid host object {obj:?}")))
  }

  pub fn object_mut(&mut self, obj: HostObject) -> Result<&mut HostObjectData, InteropError> {
    self
      .objects
      .get_mut(obj.index() as usize)
      .ok_or_else(|| InteropError::should_not_reach_here(format!("invalid host object {obj:?}")))
  }

  pub fn hidden(&self, obj: HostObject) -> Result<Hidden, InteropError> {
    Ok(self.object(obj)?.hidden)
  }

  pub fn hidden_mut(&mut self, obj: HostObject) -> Result<&mut Hidden, InteropError> {
    Ok(&mut self.object_mut(obj)?.hidden)
  }

  /// Reads an own property, `undefined` when absent.
  pub fn get(&self, obj: HostObject, key: &str) -> Result<HostValue, InteropError> {
    let data = self.object(obj)?;
    if let Some((_, value)) = data.properties.iter().find(|(k, _)| &**k == key) {
      return Ok(value.clone());
    }
    Ok(match (&data.kind, key) {
      (HostObjectKind::Error { name, .. }, "name") => HostValue::String(name.clone()),
      (HostObjectKind::Error { message, .. }, "message") => HostValue::String(message.clone()),
      (HostObjectKind::Array(elements), "length") => HostValue::Number(elements.len() as f64),
      (HostObjectKind::TypedArray { kind, bytes }, "length") => {
        HostValue::Number((bytes.len() / kind.element_size()) as f64)
      }
      _ => HostValue::Undefined,
    })
  }

  pub fn set(&mut self, obj: HostObject, key: &str, value: HostValue) -> Result<(), InteropError> {
    let data = self.object_mut(obj)?;
    match data.properties.iter_mut().find(|(k, _)| &**k == key) {
      Some((_, slot)) => *slot = value,
      None => data.properties.push((Rc::from(key), value)),
    }
    Ok(())
  }

  /// Own property keys in insertion order.
  pub fn own_keys(&self, obj: HostObject) -> Result<Vec<Rc<str>>, InteropError> {
    Ok(
      self
        .object(obj)?
        .properties
        .iter()
        .map(|(key, _)| key.clone())
        .collect(),
    )
  }

  /// Calls a native function object.
  ///
  /// Proxies and bound members need the runtime to be invoked; see
  /// [`Runtime::call_host_value`](crate::Runtime::call_host_value).
  pub fn call_native(
    &mut self,
    func: HostObject,
    this: HostValue,
    args: &[HostValue],
  ) -> Result<Option<Result<HostValue, HostValue>>, InteropError> {
    let f = match &self.object(func)?.kind {
      HostObjectKind::Function(f) => f.clone(),
      _ => return Ok(None),
    };
    Ok(Some(f(self, this, args)))
  }

  /// The `error.message` of an error object.
  pub fn error_message(&self, obj: HostObject) -> Result<Option<Rc<str>>, InteropError> {
    Ok(match &self.object(obj)?.kind {
      HostObjectKind::Error { message, .. } => Some(message.clone()),
      _ => None,
    })
  }
}
