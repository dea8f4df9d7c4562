use super::metadata::{decode_member_symbol, MemberFlag, ReturnType};
use crate::hub::{HubId, ManagedFn, TypeTable};
use crate::InteropError;
use ahash::AHashMap;
use core::fmt;
use once_cell::unsync::OnceCell;
use std::rc::Rc;
use tracing::debug_span;

/// One overload of a member.
pub struct MemberCall {
  pub name: Rc<str>,
  pub callable: ManagedFn,
  pub is_static: bool,
  pub ret: ReturnType,
  /// `None` accepts any argument.
  pub params: Vec<Option<HubId>>,
}

impl fmt::Debug for MemberCall {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MemberCall")
      .field("name", &self.name)
      .field("is_static", &self.is_static)
      .field("ret", &self.ret)
      .field("params", &self.params)
      .finish_non_exhaustive()
  }
}

/// Every overload of one member name declared by one type, in declaration order.
#[derive(Debug, Default)]
pub struct OverloadSet {
  pub statics: Vec<Rc<MemberCall>>,
  pub instances: Vec<Rc<MemberCall>>,
}

impl OverloadSet {
  pub fn group(&self, is_static: bool) -> &[Rc<MemberCall>] {
    if is_static {
      &self.statics
    } else {
      &self.instances
    }
  }
}

/// The members one type declares itself. Inherited members are found by following `parent`.
#[derive(Debug)]
pub struct MethodTable {
  pub hub: HubId,
  pub parent: Option<HubId>,
  members: AHashMap<Rc<str>, OverloadSet>,
  names: Vec<Rc<str>>,
  /// Name of the single abstract method, for functional types.
  pub functional: Option<Rc<str>>,
}

impl MethodTable {
  fn build(types: &TypeTable, hub: HubId) -> Result<Self, InteropError> {
    let desc = types.hub(hub)?;
    let _span = debug_span!("build_method_table", hub = %desc.name, exports = desc.exports.len()).entered();
    let mut table = MethodTable {
      hub,
      parent: desc.super_hub,
      members: AHashMap::new(),
      names: Vec::new(),
      functional: None,
    };
    for export in &desc.exports {
      let sig = decode_member_symbol(&export.symbol)?;
      if sig.owner != hub {
        return Err(InteropError::should_not_reach_here(format!(
          "member {} of {} is attributed to type id {}",
          sig.name, desc.name, sig.owner.0
        )));
      }
      for &param in sig.params.iter().flatten() {
        types.hub(param)?;
      }
      if let ReturnType::Hub(ret) = sig.ret {
        types.hub(ret)?;
      }
      if sig.flag == MemberFlag::Functional {
        table.functional = Some(sig.name.clone());
      }
      let call = Rc::new(MemberCall {
        name: sig.name.clone(),
        callable: export.callable.clone(),
        is_static: sig.flag.is_static(),
        ret: sig.ret,
        params: sig.params,
      });
      let set = match table.members.get_mut(&sig.name) {
        Some(set) => set,
        None => {
          table.names.push(sig.name.clone());
          table.members.entry(sig.name).or_default()
        }
      };
      if call.is_static {
        set.statics.push(call);
      } else {
        set.instances.push(call);
      }
    }
    Ok(table)
  }

  pub fn get(&self, name: &str) -> Option<&OverloadSet> {
    self.members.get(name)
  }

  /// Member names in declaration order.
  pub fn names(&self) -> &[Rc<str>] {
    &self.names
  }
}

/// Lazily built method tables, one slot per hub.
///
/// A table is decoded from its hub's exports the first time it is needed and cached for the life
/// of the runtime. Tables only reference their parent by id, so building one never forces its
/// supertypes.
#[derive(Debug)]
pub struct DispatchTables {
  tables: Vec<OnceCell<Rc<MethodTable>>>,
}

impl DispatchTables {
  pub fn new(types: &TypeTable) -> Self {
    Self {
      tables: (0..types.len()).map(|_| OnceCell::new()).collect(),
    }
  }

  pub fn table(&self, types: &TypeTable, hub: HubId) -> Result<Rc<MethodTable>, InteropError> {
    let cell = self
      .tables
      .get(hub.index())
      .ok_or_else(|| InteropError::should_not_reach_here(format!("unknown hub id {}", hub.0)))?;
    cell
      .get_or_try_init(|| MethodTable::build(types, hub).map(Rc::new))
      .cloned()
  }

  /// Whether the table for `hub` has been built.
  pub fn is_built(&self, hub: HubId) -> bool {
    self.tables.get(hub.index()).is_some_and(|cell| cell.get().is_some())
  }

  /// The overloads of `name` on the given side, from the nearest type in the super chain of `hub`
  /// that declares any. A declaration shadows every overload of the same name further up.
  pub fn lookup(
    &self,
    types: &TypeTable,
    hub: HubId,
    name: &str,
    is_static: bool,
  ) -> Result<Option<Vec<Rc<MemberCall>>>, InteropError> {
    let mut current = Some(hub);
    while let Some(id) = current {
      let table = self.table(types, id)?;
      if let Some(set) = table.get(name) {
        let group = set.group(is_static);
        if !group.is_empty() {
          return Ok(Some(group.to_vec()));
        }
      }
      current = table.parent;
    }
    Ok(None)
  }

  /// Member names visible on `hub` for the given side, nearest declarations first.
  pub fn visible_names(&self, types: &TypeTable, hub: HubId, is_static: bool) -> Result<Vec<Rc<str>>, InteropError> {
    let mut names: Vec<Rc<str>> = Vec::new();
    let mut current = Some(hub);
    while let Some(id) = current {
      let table = self.table(types, id)?;
      for name in table.names() {
        let declared = table.get(name).is_some_and(|set| !set.group(is_static).is_empty());
        if declared && !names.contains(name) {
          names.push(name.clone());
        }
      }
      current = table.parent;
    }
    Ok(names)
  }

  /// The single abstract method name of `hub`, searching its supertypes and interfaces.
  pub fn functional_member(&self, types: &TypeTable, hub: HubId) -> Result<Option<Rc<str>>, InteropError> {
    let mut pending = vec![hub];
    let mut seen = Vec::new();
    while let Some(id) = pending.pop() {
      if seen.contains(&id) {
        continue;
      }
      seen.push(id);
      if let Some(name) = self.table(types, id)?.functional.clone() {
        return Ok(Some(name));
      }
      let desc = types.hub(id)?;
      pending.extend(desc.interfaces.iter().rev().copied());
      pending.extend(desc.super_hub);
    }
    Ok(None)
  }
}
