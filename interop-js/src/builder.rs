use crate::hub::{ExportedMember, FieldDesc, Hub, HubId, Layout, ManagedFn, TypeCheckRange, TypeKind, TypeTable};
use crate::intrinsics;
use crate::options::{DeclKind, TypeDecl, TypeManifest};
use crate::proxy::metadata::{encode_member_symbol, MemberFlag, MemberSignature, ReturnType, CONSTRUCTOR_NAME};
use crate::value::JavaKind;
use crate::InteropError;
use ahash::AHashMap;
use std::rc::Rc;
use tracing::debug_span;

/// Size of the object header preceding the first field.
pub const OBJECT_HEADER_SIZE: u32 = 8;
/// Offset of element 0 in every array (header plus the 32-bit length, padded to 8 bytes).
pub const ARRAY_BASE_OFFSET: u32 = 16;

struct PendingType {
  name: Rc<str>,
  kind: TypeKind,
  super_hub: Option<HubId>,
  interfaces: Vec<HubId>,
  fields: Vec<(Rc<str>, JavaKind)>,
  exports: Vec<ExportedMember>,
}

/// Link-time construction of a [`TypeTable`].
///
/// Types must be declared after their supertypes, so the declaration order is always a valid
/// topological order of the hierarchy. [`TypeTableBuilder::build`] then computes, in one pass:
/// - subtype-check ranges: classes, arrays and primitives form a forest numbered in DFS pre-order
///   on slot 0 (`start` is the pre-order id, `range` the subtree size), and every interface owns a
///   further slot that all of its implementers mark;
/// - field layouts: inherited fields first, each field aligned to its width.
#[derive(Default)]
pub struct TypeTableBuilder {
  pending: Vec<PendingType>,
  by_name: AHashMap<Rc<str>, HubId>,
}

impl TypeTableBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// A builder with the runtime's well-known types (`java.lang.Object`, the boxes, strings,
  /// throwables, the `JS*` wrapper types, primitives and primitive arrays) already declared.
  pub fn with_intrinsics() -> Result<Self, InteropError> {
    let mut builder = Self::new();
    intrinsics::declare(&mut builder)?;
    Ok(builder)
  }

  /// [`TypeTableBuilder::with_intrinsics`] extended with every type of `manifest`.
  pub fn from_manifest(manifest: &TypeManifest) -> Result<Self, InteropError> {
    let mut builder = Self::with_intrinsics()?;
    builder.extend_from_manifest(manifest)?;
    Ok(builder)
  }

  /// Declares every type of `manifest`. Entries may reference types declared later in the
  /// manifest.
  pub fn extend_from_manifest(&mut self, manifest: &TypeManifest) -> Result<(), InteropError> {
    let mut remaining: Vec<&TypeDecl> = manifest.types.iter().collect();
    while !remaining.is_empty() {
      let before = remaining.len();
      let mut deferred = Vec::new();
      for decl in remaining {
        let ready = decl
          .super_type
          .iter()
          .chain(decl.interfaces.iter())
          .all(|name| self.lookup(name).is_some());
        if ready {
          self.declare_from_manifest(decl)?;
        } else {
          deferred.push(decl);
        }
      }
      if deferred.len() == before {
        let names: Vec<&str> = deferred.iter().map(|decl| decl.name.as_str()).collect();
        return Err(InteropError::Config(format!(
          "unresolved or cyclic supertypes for {}",
          names.join(", ")
        )));
      }
      remaining = deferred;
    }
    Ok(())
  }

  fn declare_from_manifest(&mut self, decl: &TypeDecl) -> Result<(), InteropError> {
    let resolve = |this: &Self, name: &str| {
      this
        .lookup(name)
        .ok_or_else(|| InteropError::Config(format!("unknown type {name}")))
    };
    let interfaces = decl
      .interfaces
      .iter()
      .map(|name| resolve(self, name))
      .collect::<Result<Vec<_>, _>>()?;
    match decl.kind {
      DeclKind::Class => {
        let super_hub = match &decl.super_type {
          Some(name) => Some(resolve(self, name)?),
          None => self.lookup(intrinsics::OBJECT),
        };
        let hub = self.class(&decl.name, super_hub, &interfaces)?;
        for field in &decl.fields {
          self.field(hub, &field.name, field.kind)?;
        }
      }
      DeclKind::Interface => {
        if !decl.fields.is_empty() {
          return Err(InteropError::Config(format!("interface {} declares fields", decl.name)));
        }
        self.interface(&decl.name, &interfaces)?;
      }
      DeclKind::Array => {
        let component = decl
          .component
          .ok_or_else(|| InteropError::Config(format!("array type {} has no component", decl.name)))?;
        self.array(&decl.name, component)?;
      }
    }
    Ok(())
  }

  pub fn lookup(&self, name: &str) -> Option<HubId> {
    self.by_name.get(name).copied()
  }

  fn declare(
    &mut self,
    name: &str,
    kind: TypeKind,
    super_hub: Option<HubId>,
    interfaces: &[HubId],
  ) -> Result<HubId, InteropError> {
    if self.by_name.contains_key(name) {
      return Err(InteropError::Config(format!("type {name} declared twice")));
    }
    if let Some(super_hub) = super_hub {
      if self.pending_type(super_hub)?.kind != TypeKind::Class {
        return Err(InteropError::Config(format!("supertype of {name} is not a class")));
      }
    }
    for &iface in interfaces {
      if self.pending_type(iface)?.kind != TypeKind::Interface {
        return Err(InteropError::Config(format!(
          "{name} lists a non-interface type as an interface"
        )));
      }
    }
    let id = HubId(self.pending.len() as u32);
    let name: Rc<str> = Rc::from(name);
    self.by_name.insert(name.clone(), id);
    self.pending.push(PendingType {
      name,
      kind,
      super_hub,
      interfaces: interfaces.to_vec(),
      fields: Vec::new(),
      exports: Vec::new(),
    });
    Ok(id)
  }

  fn pending_type(&self, id: HubId) -> Result<&PendingType, InteropError> {
    self
      .pending
      .get(id.index())
      .ok_or_else(|| InteropError::Config(format!("unknown type id {}", id.0)))
  }

  fn pending_type_mut(&mut self, id: HubId) -> Result<&mut PendingType, InteropError> {
    self
      .pending
      .get_mut(id.index())
      .ok_or_else(|| InteropError::Config(format!("unknown type id {}", id.0)))
  }

  /// Declares the primitive type `kind`, named by its Java keyword.
  pub fn primitive(&mut self, kind: JavaKind) -> Result<HubId, InteropError> {
    if !kind.is_primitive() {
      return Err(InteropError::Config("object is not a primitive type".to_string()));
    }
    self.declare(kind.java_name(), TypeKind::Primitive(kind), None, &[])
  }

  pub fn class(
    &mut self,
    name: &str,
    super_hub: Option<HubId>,
    interfaces: &[HubId],
  ) -> Result<HubId, InteropError> {
    self.declare(name, TypeKind::Class, super_hub, interfaces)
  }

  pub fn interface(&mut self, name: &str, supers: &[HubId]) -> Result<HubId, InteropError> {
    self.declare(name, TypeKind::Interface, None, supers)
  }

  /// Declares an array type. Arrays extend `java.lang.Object` when it has been declared.
  pub fn array(&mut self, name: &str, element: JavaKind) -> Result<HubId, InteropError> {
    let object = self.lookup(intrinsics::OBJECT);
    self.declare(name, TypeKind::Array(element), object, &[])
  }

  /// Appends an instance field to a class.
  pub fn field(&mut self, hub: HubId, name: &str, kind: JavaKind) -> Result<(), InteropError> {
    let pending = self.pending_type_mut(hub)?;
    if pending.kind != TypeKind::Class {
      return Err(InteropError::Config(format!(
        "fields can only be declared on classes, not {}",
        pending.name
      )));
    }
    if pending.fields.iter().any(|(existing, _)| &**existing == name) {
      return Err(InteropError::Config(format!(
        "field {name} declared twice on {}",
        pending.name
      )));
    }
    pending.fields.push((Rc::from(name), kind));
    Ok(())
  }

  /// Attaches a raw exported member. `symbol` uses the encoding of
  /// [`crate::proxy::metadata`]; it is decoded (and validated) when the dispatch table of `hub` is
  /// first needed.
  pub fn export(&mut self, hub: HubId, symbol: &str, callable: ManagedFn) -> Result<(), InteropError> {
    self.pending_type_mut(hub)?.exports.push(ExportedMember {
      symbol: Rc::from(symbol),
      callable,
    });
    Ok(())
  }

  /// Exports a method of `owner`. `None` parameters accept any argument.
  pub fn method(
    &mut self,
    owner: HubId,
    flag: MemberFlag,
    name: &str,
    ret: ReturnType,
    params: &[Option<HubId>],
    callable: ManagedFn,
  ) -> Result<(), InteropError> {
    let symbol = encode_member_symbol(&MemberSignature {
      flag,
      owner,
      name: Rc::from(name),
      ret,
      params: params.to_vec(),
    });
    self.export(owner, &symbol, callable)
  }

  /// Exports a constructor overload of `owner`.
  pub fn constructor(
    &mut self,
    owner: HubId,
    params: &[Option<HubId>],
    callable: ManagedFn,
  ) -> Result<(), InteropError> {
    self.method(
      owner,
      MemberFlag::Instance,
      CONSTRUCTOR_NAME,
      ReturnType::Void,
      params,
      callable,
    )
  }

  pub fn build(self) -> Result<TypeTable, InteropError> {
    let _span = debug_span!("build_type_table", types = self.pending.len()).entered();
    let count = self.pending.len();

    // Interface slots. Slot 0 belongs to the class forest.
    let mut slot_of = vec![0u16; count];
    let mut next_slot: u32 = 1;
    for (i, ty) in self.pending.iter().enumerate() {
      if ty.kind == TypeKind::Interface {
        slot_of[i] = u16::try_from(next_slot)
          .map_err(|_| InteropError::Config("too many interface types".to_string()))?;
        next_slot += 1;
      }
    }

    // Transitively implemented interface slots. Supertypes precede subtypes, so one forward pass
    // sees every dependency already computed.
    let mut implemented: Vec<Vec<u16>> = Vec::with_capacity(count);
    for (i, ty) in self.pending.iter().enumerate() {
      let mut slots = Vec::new();
      if ty.kind == TypeKind::Interface {
        slots.push(slot_of[i]);
      }
      if let Some(super_hub) = ty.super_hub {
        slots.extend_from_slice(&implemented[super_hub.index()]);
      }
      for iface in &ty.interfaces {
        slots.extend_from_slice(&implemented[iface.index()]);
      }
      slots.sort_unstable();
      slots.dedup();
      implemented.push(slots);
    }

    // DFS pre-order over the class forest.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();
    for (i, ty) in self.pending.iter().enumerate() {
      if ty.kind == TypeKind::Interface {
        continue;
      }
      match ty.super_hub {
        Some(super_hub) => children[super_hub.index()].push(i),
        None => roots.push(i),
      }
    }
    let mut pre_order = vec![0u32; count];
    let mut subtree = vec![0u32; count];
    let mut next_id: u32 = 1;
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&root| (root, false)).collect();
    while let Some((node, finished)) = stack.pop() {
      if finished {
        subtree[node] = next_id - pre_order[node];
        continue;
      }
      pre_order[node] = next_id;
      next_id += 1;
      stack.push((node, true));
      stack.extend(children[node].iter().rev().map(|&child| (child, false)));
    }
    let object_id = self
      .by_name
      .get(intrinsics::OBJECT)
      .map(|id| pre_order[id.index()])
      .unwrap_or(0);

    let mut hubs: Vec<Hub> = Vec::with_capacity(count);
    let mut instance_end = vec![OBJECT_HEADER_SIZE; count];
    for (i, ty) in self.pending.into_iter().enumerate() {
      let (type_check, slot_zero) = match ty.kind {
        TypeKind::Interface => (TypeCheckRange { start: 1, range: 1 }, object_id),
        _ => (
          TypeCheckRange {
            start: pre_order[i],
            range: subtree[i],
          },
          pre_order[i],
        ),
      };
      let slot_len = implemented[i].last().map_or(1, |&max| max as usize + 1);
      let mut type_check_slots = vec![0u32; slot_len];
      type_check_slots[0] = slot_zero;
      for &slot in &implemented[i] {
        type_check_slots[slot as usize] = 1;
      }

      let mut fields = match ty.super_hub {
        Some(super_hub) => hubs[super_hub.index()].fields.clone(),
        None => Vec::new(),
      };
      let mut end = ty
        .super_hub
        .map_or(OBJECT_HEADER_SIZE, |super_hub| instance_end[super_hub.index()]);
      for (name, kind) in ty.fields {
        let width = kind.byte_width();
        let offset = end.div_ceil(width) * width;
        fields.push(FieldDesc { name, offset, kind });
        end = offset + width;
      }
      instance_end[i] = end;
      let layout = match ty.kind {
        TypeKind::Class => Layout {
          base_offset: end,
          element_scale: 0,
        },
        TypeKind::Array(element) => Layout {
          base_offset: ARRAY_BASE_OFFSET,
          element_scale: element.byte_width(),
        },
        TypeKind::Interface | TypeKind::Primitive(_) => Layout::default(),
      };

      hubs.push(Hub {
        id: HubId(i as u32),
        name: ty.name,
        kind: ty.kind,
        super_hub: ty.super_hub,
        interfaces: ty.interfaces,
        type_check,
        type_check_slot: slot_of[i],
        type_check_slots,
        layout,
        fields,
        exports: ty.exports,
      });
    }
    Ok(TypeTable::from_hubs(hubs))
  }
}
