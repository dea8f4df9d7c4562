use crate::value::{JavaKind, Value};
use crate::{Interop, InteropError, ObjRef};
use ahash::AHashMap;
use core::fmt;
use std::rc::Rc;

/// Identifies a hub (per-type descriptor) in a [`TypeTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct HubId(pub u32);

impl HubId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// What a hub describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
  /// A primitive type; the payload is never [`JavaKind::Object`].
  Primitive(JavaKind),
  Class,
  Interface,
  /// An array type with the given element kind.
  Array(JavaKind),
}

/// The `(start, range)` pair of the range-encoded subtype check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TypeCheckRange {
  pub start: u32,
  pub range: u32,
}

/// Mapping from byte offsets to storage, consistent with how the compiler emitted accesses.
///
/// Offsets below `base_offset` address fields; offsets at or above it address array elements of
/// `element_scale` bytes each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Layout {
  pub base_offset: u32,
  pub element_scale: u32,
}

/// A declared instance field. Inherited fields appear before the fields of the subclass, and an
/// instance's field storage is indexed by the position in [`Hub::fields`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDesc {
  pub name: Rc<str>,
  pub offset: u32,
  pub kind: JavaKind,
}

/// A compiler-generated function body, as seen by this layer.
///
/// The receiver is `None` for static members and constructors receive the freshly allocated
/// instance. Managed exceptions are reported as `Err(InteropError::Throw(Thrown::Managed(_)))`.
pub type ManagedFn =
  Rc<dyn Fn(&mut dyn Interop, Option<ObjRef>, &[Value]) -> Result<Value, InteropError>>;

/// One entry of a type's exported surface: a mangled symbol describing the member (see
/// [`crate::proxy::metadata`]) and the callable implementing it.
#[derive(Clone)]
pub struct ExportedMember {
  pub symbol: Rc<str>,
  pub callable: ManagedFn,
}

impl fmt::Debug for ExportedMember {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExportedMember")
      .field("symbol", &self.symbol)
      .finish_non_exhaustive()
  }
}

/// Per-type runtime metadata. Immutable once the [`TypeTable`] is built.
#[derive(Clone, Debug)]
pub struct Hub {
  pub id: HubId,
  pub name: Rc<str>,
  pub kind: TypeKind,
  pub super_hub: Option<HubId>,
  pub interfaces: Vec<HubId>,
  pub type_check: TypeCheckRange,
  /// The slot other hubs are queried at when checking against this type.
  pub type_check_slot: u16,
  /// Candidate ids, indexed by the slot of the type being checked against.
  pub type_check_slots: Vec<u32>,
  pub layout: Layout,
  pub fields: Vec<FieldDesc>,
  pub exports: Vec<ExportedMember>,
}

impl Hub {
  #[inline]
  pub fn is_primitive(&self) -> bool {
    matches!(self.kind, TypeKind::Primitive(_))
  }

  #[inline]
  pub fn is_array(&self) -> bool {
    matches!(self.kind, TypeKind::Array(_))
  }

  #[inline]
  pub fn is_interface(&self) -> bool {
    matches!(self.kind, TypeKind::Interface)
  }

  /// The primitive kind of a primitive hub.
  pub fn primitive_kind(&self) -> Option<JavaKind> {
    match self.kind {
      TypeKind::Primitive(kind) => Some(kind),
      _ => None,
    }
  }

  pub fn field_by_offset(&self, offset: u32) -> Option<(usize, &FieldDesc)> {
    self.fields.iter().enumerate().find(|(_, f)| f.offset == offset)
  }

  pub fn field_by_name(&self, name: &str) -> Option<(usize, &FieldDesc)> {
    // Later (subclass) declarations shadow inherited fields of the same name.
    self
      .fields
      .iter()
      .enumerate()
      .rev()
      .find(|(_, f)| &*f.name == name)
  }

  /// The last segment of the dotted name.
  pub fn simple_name(&self) -> &str {
    self.name.rsplit('.').next().unwrap_or(&self.name)
  }
}

/// The runtime's type table: every hub, addressable by id and by name.
///
/// Built once by [`TypeTableBuilder`](crate::TypeTableBuilder); read-only afterwards.
#[derive(Debug, Default)]
pub struct TypeTable {
  hubs: Vec<Hub>,
  by_name: AHashMap<Rc<str>, HubId>,
}

impl TypeTable {
  pub(crate) fn from_hubs(hubs: Vec<Hub>) -> Self {
    let by_name = hubs.iter().map(|hub| (hub.name.clone(), hub.id)).collect();
    Self { hubs, by_name }
  }

  /// Returns the hub for `id`.
  ///
  /// An id not produced by this table is an invariant violation.
  pub fn hub(&self, id: HubId) -> Result<&Hub, InteropError> {
    self
      .hubs
      .get(id.index())
      .ok_or_else(|| InteropError::should_not_reach_here(format!("unknown hub id {}", id.0)))
  }

  pub fn lookup(&self, name: &str) -> Option<HubId> {
    self.by_name.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.hubs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hubs.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Hub> {
    self.hubs.iter()
  }
}
