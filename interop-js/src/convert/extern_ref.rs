use super::exception::wrap_thrown_value;
use super::Backend;
use crate::handle::{ExternRef, HostObject, HostSymbol};
use crate::heap::{InstanceData, JsPayload};
use crate::host::{HostObjectKind, HostValue};
use crate::hub::HubId;
use crate::{InteropError, ObjRef, Realm};
use ahash::AHashMap;

/// The backend where managed code never holds host values directly.
///
/// A `JS*` wrapper stores an [`ExternRef`], an index into the extern table that only this backend
/// can resolve ([`ExternRefBackend::extern_unwrap`]). Managed instances are opaque to the host: a
/// proxy knows nothing about its instance, and the association lives in side tables here. The same
/// holds for the error objects thrown for managed throwables; catching one of those on the way
/// back into managed code yields the original throwable instead of a new `JSError`.
#[derive(Debug, Default)]
pub struct ExternRefBackend {
  externs: Vec<HostValue>,
  object_externs: AHashMap<HostObject, ExternRef>,
  symbol_externs: AHashMap<HostSymbol, ExternRef>,
  wrappers: AHashMap<ExternRef, ObjRef>,
  proxies: AHashMap<ObjRef, HostObject>,
  proxy_targets: AHashMap<HostObject, ObjRef>,
  errors: AHashMap<ObjRef, HostObject>,
  error_throwables: AHashMap<HostObject, ObjRef>,
}

impl ExternRefBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// `extern.wrap`: the handle for `value`. Objects and symbols always map to the same handle.
  pub fn extern_wrap(&mut self, value: HostValue) -> ExternRef {
    let existing = match &value {
      HostValue::Object(obj) => self.object_externs.get(obj).copied(),
      HostValue::Symbol(symbol) => self.symbol_externs.get(symbol).copied(),
      _ => None,
    };
    if let Some(handle) = existing {
      return handle;
    }
    let handle = ExternRef(self.externs.len() as u32);
    match &value {
      HostValue::Object(obj) => {
        self.object_externs.insert(*obj, handle);
      }
      HostValue::Symbol(symbol) => {
        self.symbol_externs.insert(*symbol, handle);
      }
      _ => {}
    }
    self.externs.push(value);
    handle
  }

  /// `extern.unwrap`: resolves a handle produced by [`ExternRefBackend::extern_wrap`].
  pub fn extern_unwrap(&self, handle: ExternRef) -> Result<HostValue, InteropError> {
    self
      .externs
      .get(handle.index() as usize)
      .cloned()
      .ok_or_else(|| InteropError::should_not_reach_here(format!("dangling extern handle {handle:?}")))
  }

  /// Number of entries in the extern table.
  pub fn extern_count(&self) -> usize {
    self.externs.len()
  }
}

impl Backend for ExternRefBackend {
  fn name(&self) -> &'static str {
    "extern-ref"
  }

  fn wrap_host_value(&mut self, realm: &mut Realm, hub: HubId, value: HostValue) -> Result<ObjRef, InteropError> {
    let stable = matches!(value, HostValue::Object(_) | HostValue::Symbol(_));
    let handle = self.extern_wrap(value);
    if stable {
      if let Some(&wrapper) = self.wrappers.get(&handle) {
        return Ok(wrapper);
      }
    }
    let wrapper = realm.alloc_js(hub, JsPayload::Extern(handle));
    if stable {
      self.wrappers.insert(handle, wrapper);
    }
    Ok(wrapper)
  }

  fn unwrap_host_value(&mut self, realm: &mut Realm, obj: ObjRef) -> Result<Option<HostValue>, InteropError> {
    match &realm.instance(obj)?.data {
      InstanceData::Js(JsPayload::Extern(handle)) => self.extern_unwrap(*handle).map(Some),
      InstanceData::Js(JsPayload::Undefined) => Ok(Some(HostValue::Undefined)),
      InstanceData::Js(JsPayload::Direct(_)) => Err(InteropError::Unimplemented(
        "direct payload reached the extern-ref backend",
      )),
      _ => Ok(None),
    }
  }

  fn proxy_for(&mut self, realm: &mut Realm, obj: ObjRef) -> Result<HostObject, InteropError> {
    if let Some(&proxy) = self.proxies.get(&obj) {
      return Ok(proxy);
    }
    realm.instance(obj)?;
    let proxy = realm.host_mut().alloc(HostObjectKind::Proxy);
    self.proxies.insert(obj, proxy);
    self.proxy_targets.insert(proxy, obj);
    Ok(proxy)
  }

  fn managed_behind(&self, _realm: &Realm, value: &HostValue) -> Result<Option<ObjRef>, InteropError> {
    let HostValue::Object(obj) = value else {
      return Ok(None);
    };
    Ok(
      self
        .proxy_targets
        .get(obj)
        .or_else(|| self.error_throwables.get(obj))
        .copied(),
    )
  }

  fn wrap_error(&mut self, realm: &mut Realm, throwable: ObjRef) -> Result<HostValue, InteropError> {
    if let Some(&error) = self.errors.get(&throwable) {
      return Ok(HostValue::Object(error));
    }
    let name = realm.hub(realm.hub_of(throwable)?)?.simple_name().to_string();
    let message = realm.throwable_message(throwable)?.unwrap_or_default();
    let error = realm.host_mut().alloc_error(&name, &message);
    self.errors.insert(throwable, error);
    self.error_throwables.insert(error, throwable);
    Ok(HostValue::Object(error))
  }

  fn unwrap_error(&mut self, realm: &mut Realm, thrown: HostValue) -> Result<ObjRef, InteropError> {
    if let HostValue::Object(obj) = &thrown {
      // An error object created for a managed throwable is rethrown as that throwable.
      if let Some(&throwable) = self.error_throwables.get(obj) {
        return Ok(throwable);
      }
      if let Some(&target) = self.proxy_targets.get(obj) {
        if realm.is_throwable(target)? {
          return Ok(target);
        }
      }
    }
    wrap_thrown_value(self, realm, thrown)
  }
}
