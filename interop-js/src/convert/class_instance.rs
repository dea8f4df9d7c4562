use super::exception::wrap_thrown_value;
use super::Backend;
use crate::handle::{HostObject, HostSymbol};
use crate::heap::{InstanceData, JsPayload};
use crate::host::{HostObjectKind, HostValue};
use crate::hub::HubId;
use crate::{InteropError, ObjRef, Realm};
use ahash::AHashMap;

/// The backend where managed instances and host objects point at each other directly.
///
/// - A host object wrapped for managed code remembers its wrapper in a hidden slot, so the wrapper
///   is created once.
/// - A managed instance remembers its proxy in [`Instance::counterpart`](crate::Instance), and the
///   proxy carries the instance in a hidden slot.
/// - The proxy of a throwable is itself a host error object, so throwing it needs no extra wrapper.
#[derive(Debug, Default)]
pub struct ClassInstanceBackend {
  symbols: AHashMap<HostSymbol, ObjRef>,
}

impl ClassInstanceBackend {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Backend for ClassInstanceBackend {
  fn name(&self) -> &'static str {
    "class-instance"
  }

  fn wrap_host_value(&mut self, realm: &mut Realm, hub: HubId, value: HostValue) -> Result<ObjRef, InteropError> {
    match value {
      HostValue::Object(obj) => {
        if let Some(wrapper) = realm.host().hidden(obj)?.java_wrapper {
          return Ok(wrapper);
        }
        let wrapper = realm.alloc_js(hub, JsPayload::Direct(HostValue::Object(obj)));
        realm.host_mut().hidden_mut(obj)?.java_wrapper = Some(wrapper);
        Ok(wrapper)
      }
      HostValue::Symbol(symbol) => {
        if let Some(&wrapper) = self.symbols.get(&symbol) {
          return Ok(wrapper);
        }
        let wrapper = realm.alloc_js(hub, JsPayload::Direct(HostValue::Symbol(symbol)));
        self.symbols.insert(symbol, wrapper);
        Ok(wrapper)
      }
      value => Ok(realm.alloc_js(hub, JsPayload::Direct(value))),
    }
  }

  fn unwrap_host_value(&mut self, realm: &mut Realm, obj: ObjRef) -> Result<Option<HostValue>, InteropError> {
    match &realm.instance(obj)?.data {
      InstanceData::Js(JsPayload::Direct(value)) => Ok(Some(value.clone())),
      InstanceData::Js(JsPayload::Undefined) => Ok(Some(HostValue::Undefined)),
      InstanceData::Js(JsPayload::Extern(_)) => Err(InteropError::Unimplemented(
        "extern payload reached the class-instance backend",
      )),
      _ => Ok(None),
    }
  }

  fn proxy_for(&mut self, realm: &mut Realm, obj: ObjRef) -> Result<HostObject, InteropError> {
    if let Some(proxy) = realm.instance(obj)?.counterpart {
      return Ok(proxy);
    }
    let proxy = if realm.is_throwable(obj)? {
      let name = realm.hub(realm.hub_of(obj)?)?.simple_name().to_string();
      let message = realm.throwable_message(obj)?.unwrap_or_default();
      realm.host_mut().alloc_error(&name, &message)
    } else {
      realm.host_mut().alloc(HostObjectKind::Proxy)
    };
    realm.host_mut().hidden_mut(proxy)?.counterpart = Some(obj);
    realm.instance_mut(obj)?.counterpart = Some(proxy);
    Ok(proxy)
  }

  fn managed_behind(&self, realm: &Realm, value: &HostValue) -> Result<Option<ObjRef>, InteropError> {
    match value {
      HostValue::Object(obj) => Ok(realm.host().hidden(*obj)?.counterpart),
      _ => Ok(None),
    }
  }

  fn wrap_error(&mut self, realm: &mut Realm, throwable: ObjRef) -> Result<HostValue, InteropError> {
    Ok(HostValue::Object(self.proxy_for(realm, throwable)?))
  }

  fn unwrap_error(&mut self, realm: &mut Realm, thrown: HostValue) -> Result<ObjRef, InteropError> {
    if let Some(obj) = self.managed_behind(realm, &thrown)? {
      if realm.is_throwable(obj)? {
        return Ok(obj);
      }
    }
    wrap_thrown_value(self, realm, thrown)
  }
}
