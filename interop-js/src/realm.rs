use crate::heap::{Instance, InstanceData, JsPayload, ManagedHeap};
use crate::host::HostHeap;
use crate::hub::{Hub, HubId, TypeKind, TypeTable};
use crate::intrinsics::{self, Intrinsics};
use crate::options::RuntimeOptions;
use crate::value::{JavaKind, Value};
use crate::{InteropError, ObjRef};
use ahash::AHashMap;
use std::rc::Rc;

/// Both heaps plus everything needed to allocate and inspect managed instances.
///
/// A realm knows nothing about how values cross the boundary; that is the job of a
/// [`Backend`](crate::Backend) driven by a [`Runtime`](crate::Runtime).
#[derive(Debug)]
pub struct Realm {
  types: Rc<TypeTable>,
  intrinsics: Intrinsics,
  options: RuntimeOptions,
  heap: ManagedHeap,
  host: HostHeap,
  class_objects: AHashMap<HubId, ObjRef>,
  undefined: ObjRef,
}

pub(crate) fn check_kind(value: Value, kind: JavaKind) -> Result<(), InteropError> {
  let ok = match value {
    Value::Null | Value::Ref(_) => kind == JavaKind::Object,
    primitive => primitive.kind() == kind,
  };
  if ok {
    Ok(())
  } else {
    Err(InteropError::should_not_reach_here(format!(
      "{value:?} stored into a slot of kind {}",
      kind.java_name()
    )))
  }
}

impl Realm {
  /// Resolves the intrinsics of `types` and allocates the `JSUndefined` singleton.
  pub fn new(types: Rc<TypeTable>, options: RuntimeOptions) -> Result<Self, InteropError> {
    let intrinsics = Intrinsics::resolve(&types)?;
    let mut heap = ManagedHeap::new();
    let undefined = heap.alloc(intrinsics.js_undefined, InstanceData::Js(JsPayload::Undefined));
    Ok(Self {
      types,
      intrinsics,
      options,
      heap,
      host: HostHeap::new(),
      class_objects: AHashMap::new(),
      undefined,
    })
  }

  #[inline]
  pub fn types(&self) -> &Rc<TypeTable> {
    &self.types
  }

  #[inline]
  pub fn intrinsics(&self) -> &Intrinsics {
    &self.intrinsics
  }

  #[inline]
  pub fn options(&self) -> &RuntimeOptions {
    &self.options
  }

  #[inline]
  pub fn heap(&self) -> &ManagedHeap {
    &self.heap
  }

  #[inline]
  pub fn host(&self) -> &HostHeap {
    &self.host
  }

  #[inline]
  pub fn host_mut(&mut self) -> &mut HostHeap {
    &mut self.host
  }

  pub fn hub(&self, id: HubId) -> Result<&Hub, InteropError> {
    self.types.hub(id)
  }

  pub fn instance(&self, obj: ObjRef) -> Result<&Instance, InteropError> {
    self.heap.get(obj)
  }

  pub fn instance_mut(&mut self, obj: ObjRef) -> Result<&mut Instance, InteropError> {
    self.heap.get_mut(obj)
  }

  pub fn hub_of(&self, obj: ObjRef) -> Result<HubId, InteropError> {
    Ok(self.heap.get(obj)?.hub)
  }

  /// The `JSUndefined` singleton.
  #[inline]
  pub fn js_undefined(&self) -> ObjRef {
    self.undefined
  }

  /// Allocates an instance of a class with every field zeroed.
  pub fn alloc_instance(&mut self, hub: HubId) -> Result<ObjRef, InteropError> {
    let desc = self.types.hub(hub)?;
    if desc.kind != TypeKind::Class {
      return Err(InteropError::should_not_reach_here(format!(
        "cannot instantiate {}",
        desc.name
      )));
    }
    let fields = desc.fields.iter().map(|f| Value::default_for(f.kind)).collect();
    Ok(self.heap.alloc(hub, InstanceData::Fields(fields)))
  }

  /// Allocates a zeroed array of the given array type.
  pub fn alloc_array(&mut self, hub: HubId, length: u32) -> Result<ObjRef, InteropError> {
    let desc = self.types.hub(hub)?;
    let data = match desc.kind {
      TypeKind::Array(JavaKind::Object) => InstanceData::ObjectArray(vec![Value::Null; length as usize]),
      TypeKind::Array(kind) => InstanceData::PrimitiveArray {
        kind,
        length,
        bytes: vec![0; length as usize * kind.byte_width() as usize],
      },
      _ => {
        return Err(InteropError::should_not_reach_here(format!(
          "{} is not an array type",
          desc.name
        )))
      }
    };
    Ok(self.heap.alloc(hub, data))
  }

  /// Allocates a `java.lang.String`, enforcing [`RuntimeOptions::max_string_length`].
  pub fn alloc_string(&mut self, value: &str) -> Result<ObjRef, InteropError> {
    let length = value.encode_utf16().count();
    let max = self.options.max_string_length;
    if length > max {
      return Err(InteropError::LimitExceeded { got: length, max });
    }
    Ok(
      self
        .heap
        .alloc(self.intrinsics.string, InstanceData::String(Rc::from(value))),
    )
  }

  /// The contents of a managed string, or `None` if `obj` is not a string.
  pub fn string_value(&self, obj: ObjRef) -> Result<Option<Rc<str>>, InteropError> {
    Ok(match &self.heap.get(obj)?.data {
      InstanceData::String(s) => Some(s.clone()),
      _ => None,
    })
  }

  /// Boxes a primitive into its `java.lang` box type.
  pub fn alloc_boxed(&mut self, value: Value) -> Result<ObjRef, InteropError> {
    let hub = self.intrinsics.box_of(value.kind()).ok_or_else(|| {
      InteropError::should_not_reach_here(format!("cannot box non-primitive {value:?}"))
    })?;
    Ok(self.heap.alloc(hub, InstanceData::Boxed(value)))
  }

  /// The primitive held by a box instance.
  pub fn boxed_value(&self, obj: ObjRef) -> Result<Option<Value>, InteropError> {
    Ok(match self.heap.get(obj)?.data {
      InstanceData::Boxed(value) => Some(value),
      _ => None,
    })
  }

  pub(crate) fn alloc_js(&mut self, hub: HubId, payload: JsPayload) -> ObjRef {
    self.heap.alloc(hub, InstanceData::Js(payload))
  }

  /// Allocates a throwable of type `hub` with the given detail message.
  pub fn alloc_throwable(&mut self, hub: HubId, message: Option<&str>) -> Result<ObjRef, InteropError> {
    if !self.types.is_subtype(hub, self.intrinsics.throwable)? {
      return Err(InteropError::should_not_reach_here(format!(
        "{} is not a throwable type",
        self.types.hub(hub)?.name
      )));
    }
    let obj = self.alloc_instance(hub)?;
    if let Some(message) = message {
      let message = self.alloc_string(message)?;
      self.set_field(obj, intrinsics::DETAIL_MESSAGE_FIELD, Value::Ref(message))?;
    }
    Ok(obj)
  }

  pub fn is_throwable(&self, obj: ObjRef) -> Result<bool, InteropError> {
    self.types.is_subtype(self.hub_of(obj)?, self.intrinsics.throwable)
  }

  pub fn throwable_message(&self, obj: ObjRef) -> Result<Option<Rc<str>>, InteropError> {
    match self.get_field(obj, intrinsics::DETAIL_MESSAGE_FIELD)? {
      Value::Ref(message) => self.string_value(message),
      _ => Ok(None),
    }
  }

  /// The `java.lang.Class` instance for `hub`. Repeated calls return the same instance.
  pub fn class_object(&mut self, hub: HubId) -> Result<ObjRef, InteropError> {
    if let Some(&obj) = self.class_objects.get(&hub) {
      return Ok(obj);
    }
    self.types.hub(hub)?;
    let obj = self.heap.alloc(self.intrinsics.class, InstanceData::Type(hub));
    self.class_objects.insert(hub, obj);
    Ok(obj)
  }

  /// The hub a `java.lang.Class` instance describes.
  pub fn type_of_class_object(&self, obj: ObjRef) -> Result<Option<HubId>, InteropError> {
    Ok(match self.heap.get(obj)?.data {
      InstanceData::Type(hub) => Some(hub),
      _ => None,
    })
  }

  fn field_slot(&self, obj: ObjRef, name: &str) -> Result<(usize, JavaKind), InteropError> {
    let hub = self.types.hub(self.hub_of(obj)?)?;
    hub
      .field_by_name(name)
      .map(|(index, field)| (index, field.kind))
      .ok_or_else(|| InteropError::should_not_reach_here(format!("{} has no field {name}", hub.name)))
  }

  /// Whether instances of `obj`'s type declare a field named `name`.
  pub fn has_field(&self, obj: ObjRef, name: &str) -> Result<bool, InteropError> {
    let hub = self.types.hub(self.hub_of(obj)?)?;
    Ok(hub.field_by_name(name).is_some())
  }

  pub fn get_field(&self, obj: ObjRef, name: &str) -> Result<Value, InteropError> {
    let (index, _) = self.field_slot(obj, name)?;
    match &self.heap.get(obj)?.data {
      InstanceData::Fields(fields) => fields
        .get(index)
        .copied()
        .ok_or_else(|| InteropError::should_not_reach_here("field storage shorter than layout")),
      _ => Err(InteropError::should_not_reach_here("instance has no field storage")),
    }
  }

  pub fn set_field(&mut self, obj: ObjRef, name: &str, value: Value) -> Result<(), InteropError> {
    let (index, kind) = self.field_slot(obj, name)?;
    check_kind(value, kind)?;
    match &mut self.heap.get_mut(obj)?.data {
      InstanceData::Fields(fields) => match fields.get_mut(index) {
        Some(slot) => {
          *slot = value;
          Ok(())
        }
        None => Err(InteropError::should_not_reach_here("field storage shorter than layout")),
      },
      _ => Err(InteropError::should_not_reach_here("instance has no field storage")),
    }
  }

  /// The element count of an array instance.
  pub fn array_length(&self, obj: ObjRef) -> Result<u32, InteropError> {
    match &self.heap.get(obj)?.data {
      InstanceData::PrimitiveArray { length, .. } => Ok(*length),
      InstanceData::ObjectArray(elements) => Ok(elements.len() as u32),
      _ => Err(InteropError::should_not_reach_here("not an array")),
    }
  }

  /// Reads element `index` of an array.
  pub fn array_get(&self, obj: ObjRef, index: u32) -> Result<Value, InteropError> {
    let offset = self.element_offset(obj, index)?;
    self.unsafe_load(obj, offset, None)
  }

  /// Writes element `index` of an array.
  pub fn array_set(&mut self, obj: ObjRef, index: u32, value: Value) -> Result<(), InteropError> {
    let offset = self.element_offset(obj, index)?;
    self.unsafe_store(obj, offset, None, value)
  }

  fn element_offset(&self, obj: ObjRef, index: u32) -> Result<u32, InteropError> {
    let layout = self.types.hub(self.hub_of(obj)?)?.layout;
    index
      .checked_mul(layout.element_scale)
      .and_then(|rel| rel.checked_add(layout.base_offset))
      .ok_or_else(|| InteropError::should_not_reach_here("array offset overflows"))
  }
}
