//! Host-side proxies of managed instances and reflective member dispatch.
//!
//! A proxy exposes the exported members of its instance's type, plus declared fields by name. A
//! proxy of a `java.lang.Class` instance exposes the static members of the described type and can
//! be constructed. Member lookup follows the super chain; see [`DispatchTables::lookup`].

pub mod metadata;
mod resolve;
mod table;

pub use table::{DispatchTables, MemberCall, MethodTable, OverloadSet};

use crate::convert::{number_to_string, Backend, TypeDescriptor};
use crate::error::Thrown;
use crate::handle::HostObject;
use crate::heap::InstanceData;
use crate::host::{HostObjectKind, HostValue};
use crate::hub::{HubId, TypeKind};
use crate::value::{JavaKind, Value};
use crate::{InteropError, ObjRef, Runtime};
use metadata::{ReturnType, CONSTRUCTOR_NAME};
use std::rc::Rc;
use tracing::trace;

const TO_STRING: &str = "toString";
const VALUE_OF: &str = "valueOf";
const AS: &str = "$as";

fn is_default_member(name: &str) -> bool {
  matches!(name, TO_STRING | VALUE_OF | AS)
}

/// The operations a host engine forwards to a proxy.
///
/// Proxies are not extensible: writes only reach declared fields, and reads of unknown names yield
/// `undefined`.
pub trait ProxyOps {
  fn read_member(&mut self, proxy: HostObject, name: &str) -> Result<HostValue, InteropError>;

  fn write_member(&mut self, proxy: HostObject, name: &str, value: HostValue) -> Result<(), InteropError>;

  fn has_member(&mut self, proxy: HostObject, name: &str) -> Result<bool, InteropError>;

  /// Calls the proxy itself. Only proxies of functional types are callable.
  fn call(&mut self, proxy: HostObject, this: HostValue, args: &[HostValue]) -> Result<HostValue, InteropError>;

  /// `new proxy(...args)` on the proxy of a class.
  fn construct(&mut self, proxy: HostObject, args: &[HostValue]) -> Result<HostValue, InteropError>;

  fn own_keys(&mut self, proxy: HostObject) -> Result<Vec<Rc<str>>, InteropError>;
}

/// Which side of a type a proxy exposes.
#[derive(Clone, Copy, Debug)]
struct Receiver {
  target: ObjRef,
  hub: HubId,
  /// Set for proxies of `java.lang.Class` instances.
  is_static: bool,
}

enum Callee {
  Native,
  Member(HostObject, Rc<str>),
  Other,
}

impl<B: Backend> Runtime<B> {
  fn receiver(&self, proxy: HostObject) -> Result<Receiver, InteropError> {
    let target = self
      .managed_behind(&HostValue::Object(proxy))?
      .ok_or_else(|| InteropError::class_cast(format!("{proxy:?} is not a proxy of a managed instance")))?;
    Ok(match self.realm.type_of_class_object(target)? {
      Some(hub) => Receiver {
        target,
        hub,
        is_static: true,
      },
      None => Receiver {
        target,
        hub: self.realm.hub_of(target)?,
        is_static: false,
      },
    })
  }

  fn has_declared_member(&self, receiver: Receiver, name: &str) -> Result<bool, InteropError> {
    Ok(
      self
        .dispatch
        .lookup(self.realm.types(), receiver.hub, name, receiver.is_static)?
        .is_some(),
    )
  }

  /// The name of the single abstract method of `hub`, if it is a functional type.
  pub fn functional_member(&self, hub: HubId) -> Result<Option<Rc<str>>, InteropError> {
    self.dispatch.functional_member(self.realm.types(), hub)
  }

  /// The bound member object for `proxy.name`. Reading the same member twice yields the same
  /// object.
  pub fn member_object(&mut self, proxy: HostObject, name: &str) -> Result<HostObject, InteropError> {
    let key = (proxy, Rc::<str>::from(name));
    if let Some(&member) = self.members.get(&key) {
      return Ok(member);
    }
    let member = self.realm.host_mut().alloc(HostObjectKind::Member {
      target: proxy,
      name: key.1.clone(),
    });
    self.members.insert(key, member);
    Ok(member)
  }

  /// Invokes `proxy.name(...args)`.
  ///
  /// Declared members are resolved first; `toString`, `valueOf` and `$as` have defaults used when
  /// the type does not declare them. A managed exception escapes as [`Thrown::Host`].
  pub fn invoke_member(&mut self, proxy: HostObject, name: &str, args: &[HostValue]) -> Result<HostValue, InteropError> {
    let receiver = self.receiver(proxy)?;
    trace!(?receiver, name, argc = args.len(), "invoke member");
    let overloads = self
      .dispatch
      .lookup(self.realm.types(), receiver.hub, name, receiver.is_static)?;
    match overloads {
      Some(overloads) => {
        let this = (!receiver.is_static).then_some(receiver.target);
        let (overload, adapted) = self.select_overload(name, &overloads, args)?;
        self.call_overload(&overload, this, &adapted)
      }
      None => self.invoke_default_member(proxy, receiver, name, args),
    }
  }

  fn call_overload(
    &mut self,
    overload: &MemberCall,
    this: Option<ObjRef>,
    args: &[Value],
  ) -> Result<HostValue, InteropError> {
    let callable = overload.callable.clone();
    let result = match callable(self, this, args) {
      Ok(result) => result,
      Err(err @ InteropError::Throw(Thrown::Managed(_))) => return Err(self.into_host_error(err)),
      Err(err) => return Err(err),
    };
    match overload.ret {
      ReturnType::Void => Ok(HostValue::Undefined),
      ReturnType::Any => self.java_to_javascript(result),
      ReturnType::Hub(ret) => match self.realm.hub(ret)?.primitive_kind() {
        Some(kind) => {
          let boxed = self.box_if_needed(result, kind.ordinal())?;
          self.java_to_javascript(boxed)
        }
        None => self.java_to_javascript(result),
      },
    }
  }

  fn invoke_default_member(
    &mut self,
    proxy: HostObject,
    receiver: Receiver,
    name: &str,
    args: &[HostValue],
  ) -> Result<HostValue, InteropError> {
    match name {
      TO_STRING => Ok(HostValue::String(self.default_to_string(receiver)?.into())),
      VALUE_OF => {
        let primitive = matches!(
          self.realm.instance(receiver.target)?.data,
          InstanceData::Boxed(_) | InstanceData::String(_)
        );
        if primitive && !receiver.is_static {
          self.java_to_javascript(Value::Ref(receiver.target))
        } else {
          Ok(HostValue::Object(proxy))
        }
      }
      AS => {
        let [target] = args else {
          return Err(InteropError::NoConformingOverload {
            member: AS.to_string(),
            argc: args.len(),
          });
        };
        let value = HostValue::Object(proxy);
        match target {
          HostValue::String(type_name) => self.coerce_java_proxy_to_javascript_type(&value, type_name),
          descriptor => {
            let coerced = self.coerce_javascript_to_java_type(&value, TypeDescriptor::Value(descriptor.clone()))?;
            self.java_to_javascript(coerced)
          }
        }
      }
      _ => Err(InteropError::NoConformingOverload {
        member: name.to_string(),
        argc: args.len(),
      }),
    }
  }

  fn default_to_string(&mut self, receiver: Receiver) -> Result<String, InteropError> {
    let type_name = self.realm.hub(receiver.hub)?.name.clone();
    if receiver.is_static {
      return Ok(format!("class {type_name}"));
    }
    let primitive = matches!(
      self.realm.instance(receiver.target)?.data,
      InstanceData::Boxed(_) | InstanceData::String(_)
    );
    if primitive {
      return Ok(match self.java_to_javascript(Value::Ref(receiver.target))? {
        HostValue::String(s) => s.to_string(),
        HostValue::Number(n) => number_to_string(n),
        HostValue::Bool(b) => b.to_string(),
        HostValue::BigInt(b) => b.to_string(),
        other => format!("{other:?}"),
      });
    }
    if !self.realm.options().hub_name_to_string {
      return Ok("[object JavaObject]".to_string());
    }
    Ok(format!("{type_name}@{:x}", receiver.target.index()))
  }

  /// Calls any host value as a function: native functions, bound members and callable proxies.
  /// A native function that throws surfaces as [`Thrown::Host`].
  pub fn call_host_value(
    &mut self,
    func: &HostValue,
    this: HostValue,
    args: &[HostValue],
  ) -> Result<HostValue, InteropError> {
    let not_callable = || InteropError::class_cast(format!("{func:?} is not a function"));
    let HostValue::Object(obj) = *func else {
      return Err(not_callable());
    };
    let callee = match &self.realm.host().object(obj)?.kind {
      HostObjectKind::Function(_) => Callee::Native,
      HostObjectKind::Member { target, name } => Callee::Member(*target, name.clone()),
      _ => Callee::Other,
    };
    match callee {
      Callee::Native => {}
      Callee::Member(target, name) => return self.invoke_member(target, &name, args),
      Callee::Other if self.managed_behind(func)?.is_some() => return self.call(obj, this, args),
      Callee::Other => return Err(not_callable()),
    }
    match self.realm.host_mut().call_native(obj, this, args)? {
      Some(Ok(result)) => Ok(result),
      Some(Err(thrown)) => Err(InteropError::Throw(Thrown::Host(thrown))),
      None => Err(not_callable()),
    }
  }

  fn field_kind(&self, receiver: Receiver, name: &str) -> Result<Option<JavaKind>, InteropError> {
    if receiver.is_static {
      return Ok(None);
    }
    Ok(self.realm.hub(receiver.hub)?.field_by_name(name).map(|(_, field)| field.kind))
  }
}

impl<B: Backend> ProxyOps for Runtime<B> {
  fn read_member(&mut self, proxy: HostObject, name: &str) -> Result<HostValue, InteropError> {
    let receiver = self.receiver(proxy)?;
    if self.field_kind(receiver, name)?.is_some() {
      let value = self.realm.get_field(receiver.target, name)?;
      return self.java_to_javascript(value);
    }
    if self.has_declared_member(receiver, name)? || is_default_member(name) {
      return Ok(HostValue::Object(self.member_object(proxy, name)?));
    }
    Ok(HostValue::Undefined)
  }

  fn write_member(&mut self, proxy: HostObject, name: &str, value: HostValue) -> Result<(), InteropError> {
    let receiver = self.receiver(proxy)?;
    let Some(kind) = self.field_kind(receiver, name)? else {
      let type_name = self.realm.hub(receiver.hub)?.name.clone();
      return Err(InteropError::class_cast(format!(
        "cannot add property {name}, {type_name} is not extensible"
      )));
    };
    let managed = self.javascript_to_java(&value)?;
    let stored = if kind.is_primitive() {
      self.conform_primitive(managed, kind)?.ok_or_else(|| {
        InteropError::class_cast(format!("{value:?} cannot be stored in {} field {name}", kind.java_name()))
      })?
    } else {
      managed
    };
    self.realm.set_field(receiver.target, name, stored)
  }

  fn has_member(&mut self, proxy: HostObject, name: &str) -> Result<bool, InteropError> {
    let receiver = self.receiver(proxy)?;
    Ok(self.field_kind(receiver, name)?.is_some() || self.has_declared_member(receiver, name)? || is_default_member(name))
  }

  fn call(&mut self, proxy: HostObject, _this: HostValue, args: &[HostValue]) -> Result<HostValue, InteropError> {
    let receiver = self.receiver(proxy)?;
    let functional = if receiver.is_static {
      None
    } else {
      self.functional_member(receiver.hub)?
    };
    let Some(name) = functional else {
      let type_name = self.realm.hub(receiver.hub)?.name.clone();
      return Err(InteropError::class_cast(format!("{type_name} is not a functional type")));
    };
    self.invoke_member(proxy, &name, args)
  }

  fn construct(&mut self, proxy: HostObject, args: &[HostValue]) -> Result<HostValue, InteropError> {
    let receiver = self.receiver(proxy)?;
    let desc = self.realm.hub(receiver.hub)?;
    if !receiver.is_static || desc.kind != TypeKind::Class {
      return Err(InteropError::class_cast(format!("{} is not a constructor", desc.name)));
    }
    let instance = self.realm.alloc_instance(receiver.hub)?;
    // Constructors are not inherited.
    let overloads = self
      .dispatch
      .table(self.realm.types(), receiver.hub)?
      .get(CONSTRUCTOR_NAME)
      .map(|set| set.instances.clone())
      .unwrap_or_default();
    if overloads.is_empty() {
      if !args.is_empty() {
        return Err(InteropError::NoConformingOverload {
          member: CONSTRUCTOR_NAME.to_string(),
          argc: args.len(),
        });
      }
    } else {
      let (overload, adapted) = self.select_overload(CONSTRUCTOR_NAME, &overloads, args)?;
      self.call_overload(&overload, Some(instance), &adapted)?;
    }
    Ok(HostValue::Object(self.proxy_for(instance)?))
  }

  fn own_keys(&mut self, proxy: HostObject) -> Result<Vec<Rc<str>>, InteropError> {
    let receiver = self.receiver(proxy)?;
    let mut keys: Vec<Rc<str>> = Vec::new();
    if !receiver.is_static {
      for field in &self.realm.hub(receiver.hub)?.fields {
        if !keys.contains(&field.name) {
          keys.push(field.name.clone());
        }
      }
    }
    let names = self
      .dispatch
      .visible_names(self.realm.types(), receiver.hub, receiver.is_static)?;
    for name in names {
      if &*name != CONSTRUCTOR_NAME && !keys.contains(&name) {
        keys.push(name);
      }
    }
    Ok(keys)
  }
}
