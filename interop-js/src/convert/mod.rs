//! Value conversion across the boundary.
//!
//! The algorithm lives here, generic over a [`Backend`] that decides how wrappers are represented:
//!
//! - [`ClassInstanceBackend`]: wrappers point at each other directly (a hidden slot on the host
//!   object, a counterpart on the managed instance);
//! - [`ExternRefBackend`]: managed code only ever sees opaque extern handles, resolved through a
//!   table owned by the backend.
//!
//! Both directions preserve identity: converting the same object twice yields the same wrapper.
//! Primitives and strings are converted by value.

mod boxing;
mod class_instance;
mod coerce;
mod exception;
mod extern_ref;

pub use class_instance::ClassInstanceBackend;
pub use coerce::TypeDescriptor;
pub(crate) use coerce::number_to_string;
pub use extern_ref::ExternRefBackend;

use crate::handle::HostObject;
use crate::heap::{InstanceData, JsPayload};
use crate::host::HostValue;
use crate::hub::HubId;
use crate::value::Value;
use crate::{InteropError, ObjRef, Realm, Runtime};
use num_bigint::BigInt;
use tracing::trace;

/// How one runtime flavour represents values of one side on the other.
///
/// Every method is required. A backend handed a payload form it does not own (for example an
/// [`JsPayload::Extern`] reaching the class-instance backend) returns
/// [`InteropError::Unimplemented`], which indicates a wiring defect.
pub trait Backend {
  fn name(&self) -> &'static str;

  /// Wraps `value` into a managed `JS*` wrapper of type `hub`. For objects and symbols the wrapper
  /// is stable: wrapping the same host value again returns the same instance.
  fn wrap_host_value(&mut self, realm: &mut Realm, hub: HubId, value: HostValue) -> Result<ObjRef, InteropError>;

  /// The host value behind a managed `JS*` wrapper, or `None` if `obj` is not one.
  fn unwrap_host_value(&mut self, realm: &mut Realm, obj: ObjRef) -> Result<Option<HostValue>, InteropError>;

  /// The host-side proxy of a managed instance. Stable per instance.
  fn proxy_for(&mut self, realm: &mut Realm, obj: ObjRef) -> Result<HostObject, InteropError>;

  /// The managed instance a host value stands for, if it is a proxy or an error object created by
  /// [`Backend::wrap_error`].
  fn managed_behind(&self, realm: &Realm, value: &HostValue) -> Result<Option<ObjRef>, InteropError>;

  /// The host error object thrown for a managed throwable. Stable per throwable.
  fn wrap_error(&mut self, realm: &mut Realm, throwable: ObjRef) -> Result<HostValue, InteropError>;

  /// The managed throwable representing a thrown host value.
  fn unwrap_error(&mut self, realm: &mut Realm, thrown: HostValue) -> Result<ObjRef, InteropError>;
}

/// Classification of a host value on its way into managed code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostClass {
  Null,
  Undefined,
  /// A proxy (or thrown error) of an existing managed instance.
  Wrapped(ObjRef),
  Boolean,
  Number,
  BigInt,
  String,
  Symbol,
  Object,
}

pub fn classify_host_value<B: Backend + ?Sized>(
  backend: &B,
  realm: &Realm,
  value: &HostValue,
) -> Result<HostClass, InteropError> {
  Ok(match value {
    HostValue::Null => HostClass::Null,
    HostValue::Undefined => HostClass::Undefined,
    HostValue::Bool(_) => HostClass::Boolean,
    HostValue::Number(_) => HostClass::Number,
    HostValue::BigInt(_) => HostClass::BigInt,
    HostValue::String(_) => HostClass::String,
    HostValue::Symbol(_) => HostClass::Symbol,
    HostValue::Object(_) => match backend.managed_behind(realm, value)? {
      Some(obj) => HostClass::Wrapped(obj),
      None => HostClass::Object,
    },
  })
}

/// Host to managed.
pub(crate) fn to_managed<B: Backend + ?Sized>(
  backend: &mut B,
  realm: &mut Realm,
  value: &HostValue,
) -> Result<Value, InteropError> {
  let class = classify_host_value(backend, realm, value)?;
  trace!(?class, backend = backend.name(), "host to managed");
  let intrinsics = realm.intrinsics();
  let hub = match class {
    HostClass::Null => return Ok(Value::Null),
    HostClass::Undefined => return Ok(Value::Ref(realm.js_undefined())),
    HostClass::Wrapped(obj) => return Ok(Value::Ref(obj)),
    HostClass::Boolean => intrinsics.js_boolean,
    HostClass::Number => intrinsics.js_number,
    HostClass::BigInt => intrinsics.js_bigint,
    HostClass::String => intrinsics.js_string,
    HostClass::Symbol => intrinsics.js_symbol,
    HostClass::Object => intrinsics.js_object,
  };
  Ok(Value::Ref(backend.wrap_host_value(realm, hub, value.clone())?))
}

fn char_to_host(unit: u16) -> HostValue {
  HostValue::String(String::from_utf16_lossy(&[unit]).into())
}

/// Managed to host.
pub(crate) fn to_host<B: Backend + ?Sized>(
  backend: &mut B,
  realm: &mut Realm,
  value: Value,
) -> Result<HostValue, InteropError> {
  trace!(?value, backend = backend.name(), "managed to host");
  Ok(match value {
    Value::Null => HostValue::Null,
    Value::Bool(v) => HostValue::Bool(v),
    Value::Char(v) => char_to_host(v),
    Value::Long(v) => HostValue::BigInt(v.to_bigint()),
    Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Float(_) | Value::Double(_) => {
      HostValue::Number(value.as_f64().unwrap_or_default())
    }
    Value::Ref(obj) => {
      let (boxed, is_js) = match &realm.instance(obj)?.data {
        InstanceData::String(s) => return Ok(HostValue::String(s.clone())),
        InstanceData::Js(JsPayload::Undefined) => return Ok(HostValue::Undefined),
        InstanceData::Boxed(inner) => (Some(*inner), false),
        InstanceData::Js(_) => (None, true),
        InstanceData::Fields(_)
        | InstanceData::PrimitiveArray { .. }
        | InstanceData::ObjectArray(_)
        | InstanceData::Type(_) => (None, false),
      };
      if let Some(inner) = boxed {
        return to_host(backend, realm, inner);
      }
      if is_js {
        return backend
          .unwrap_host_value(realm, obj)?
          .ok_or_else(|| InteropError::should_not_reach_here("JS wrapper without a host value"));
      }
      HostValue::Object(backend.proxy_for(realm, obj)?)
    }
  })
}

impl<B: Backend> Runtime<B> {
  /// Converts a managed value for the host: primitives and strings by value (`long` becomes a
  /// `BigInt`, `char` a one-character string), `JS*` wrappers to the value they wrap, anything else
  /// to its proxy.
  pub fn java_to_javascript(&mut self, value: Value) -> Result<HostValue, InteropError> {
    to_host(&mut self.backend, &mut self.realm, value)
  }

  /// Converts a host value for managed code: `null` stays null, `undefined` becomes the
  /// `JSUndefined` singleton, proxies resolve to their instance, everything else is wrapped in the
  /// matching `JS*` type.
  pub fn javascript_to_java(&mut self, value: &HostValue) -> Result<Value, InteropError> {
    to_managed(&mut self.backend, &mut self.realm, value)
  }

  pub fn classify_host_value(&self, value: &HostValue) -> Result<HostClass, InteropError> {
    classify_host_value(&self.backend, &self.realm, value)
  }

  /// The `JSUndefined` singleton.
  pub fn js_undefined(&self) -> ObjRef {
    self.realm.js_undefined()
  }

  pub fn create_js_boolean(&mut self, value: bool) -> Result<ObjRef, InteropError> {
    let hub = self.realm.intrinsics().js_boolean;
    self.backend.wrap_host_value(&mut self.realm, hub, HostValue::Bool(value))
  }

  pub fn create_js_number(&mut self, value: f64) -> Result<ObjRef, InteropError> {
    let hub = self.realm.intrinsics().js_number;
    self.backend.wrap_host_value(&mut self.realm, hub, HostValue::Number(value))
  }

  pub fn create_js_bigint(&mut self, value: BigInt) -> Result<ObjRef, InteropError> {
    let hub = self.realm.intrinsics().js_bigint;
    self.backend.wrap_host_value(&mut self.realm, hub, HostValue::BigInt(value))
  }

  pub fn create_js_string(&mut self, value: &str) -> Result<ObjRef, InteropError> {
    let hub = self.realm.intrinsics().js_string;
    self.backend.wrap_host_value(&mut self.realm, hub, HostValue::string(value))
  }

  /// Wraps a host symbol. `value` must be a [`HostValue::Symbol`].
  pub fn create_js_symbol(&mut self, value: HostValue) -> Result<ObjRef, InteropError> {
    if !matches!(value, HostValue::Symbol(_)) {
      return Err(InteropError::class_cast("JSSymbol requires a symbol"));
    }
    let hub = self.realm.intrinsics().js_symbol;
    self.backend.wrap_host_value(&mut self.realm, hub, value)
  }

  /// Wraps a host object. `value` must be a [`HostValue::Object`].
  pub fn create_js_object(&mut self, value: HostValue) -> Result<ObjRef, InteropError> {
    if !matches!(value, HostValue::Object(_)) {
      return Err(InteropError::class_cast("JSObject requires an object"));
    }
    let hub = self.realm.intrinsics().js_object;
    self.backend.wrap_host_value(&mut self.realm, hub, value)
  }

  /// The host value behind a managed `JS*` wrapper.
  pub fn unwrap_js_value(&mut self, obj: ObjRef) -> Result<Option<HostValue>, InteropError> {
    if obj == self.realm.js_undefined() {
      return Ok(Some(HostValue::Undefined));
    }
    self.backend.unwrap_host_value(&mut self.realm, obj)
  }

  /// The proxy of a managed instance.
  pub fn proxy_for(&mut self, obj: ObjRef) -> Result<HostObject, InteropError> {
    self.backend.proxy_for(&mut self.realm, obj)
  }

  /// The managed instance behind a proxy.
  pub fn managed_behind(&self, value: &HostValue) -> Result<Option<ObjRef>, InteropError> {
    self.backend.managed_behind(&self.realm, value)
  }
}
