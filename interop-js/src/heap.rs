use crate::handle::{ExternRef, HostObject};
use crate::host::HostValue;
use crate::hub::HubId;
use crate::value::{JavaKind, Value};
use crate::{InteropError, ObjRef};
use std::rc::Rc;

/// How a managed `JS*` wrapper refers to its host value.
#[derive(Clone, Debug, PartialEq)]
pub enum JsPayload {
  /// The host value itself (class-instance backend).
  Direct(HostValue),
  /// An indirection handle into the extern table (extern-ref backend).
  Extern(ExternRef),
  /// The `JSUndefined` singleton.
  Undefined,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InstanceData {
  /// Field storage, indexed like [`Hub::fields`](crate::Hub::fields).
  Fields(Vec<Value>),
  /// A primitive array. Elements are packed at the kind's width in the configured endianness.
  PrimitiveArray {
    kind: JavaKind,
    length: u32,
    bytes: Vec<u8>,
  },
  ObjectArray(Vec<Value>),
  String(Rc<str>),
  Boxed(Value),
  Js(JsPayload),
  /// A `java.lang.Class` instance describing the given hub.
  Type(HubId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
  pub hub: HubId,
  pub data: InstanceData,
  /// The host object representing this instance, once one exists. Only the class-instance backend
  /// records it here.
  pub counterpart: Option<HostObject>,
}

/// Storage for managed instances.
#[derive(Debug, Default)]
pub struct ManagedHeap {
  instances: Vec<Instance>,
}

impl ManagedHeap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc(&mut self, hub: HubId, data: InstanceData) -> ObjRef {
    let obj = ObjRef(self.instances.len() as u32);
    self.instances.push(Instance {
      hub,
      data,
      counterpart: None,
    });
    obj
  }

  pub fn get(&self, obj: ObjRef) -> Result<&Instance, InteropError> {
    self
      .instances
      .get(obj.index() as usize)
      .ok_or_else(|| InteropError::should_not_reach_here(format!("invalid object {obj:?}")))
  }

  pub fn get_mut(&mut self, obj: ObjRef) -> Result<&mut Instance, InteropError> {
    self
      .instances
      .get_mut(obj.index() as usize)
      .ok_or_else(|| InteropError::should_not_reach_here(format!("invalid object {obj:?}")))
  }

  pub fn len(&self) -> usize {
    self.instances.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instances.is_empty()
  }
}
