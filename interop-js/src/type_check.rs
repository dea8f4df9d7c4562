//! Range-encoded subtype checks.
//!
//! Every hub records a `(start, range)` pair and the slot it is queried at. A type `S` is a subtype
//! of `T` iff the candidate id `S` stores at `T`'s slot falls into `T`'s range. The check costs two
//! loads and an unsigned comparison, independent of hierarchy depth; the hierarchy is folded into
//! the ranges by [`TypeTableBuilder`](crate::TypeTableBuilder).

use crate::hub::{Hub, HubId, TypeKind, TypeTable};
use crate::value::Value;
use crate::{InteropError, Realm};

/// Returns whether `sub` is `sup` or one of its subtypes.
#[inline]
pub fn is_subtype(sub: &Hub, sup: &Hub) -> bool {
  let candidate = sub
    .type_check_slots
    .get(sup.type_check_slot as usize)
    .copied()
    .unwrap_or(0);
  candidate.wrapping_sub(sup.type_check.start) < sup.type_check.range
}

impl TypeTable {
  /// [`is_subtype`] over hub ids.
  pub fn is_subtype(&self, sub: HubId, sup: HubId) -> Result<bool, InteropError> {
    Ok(is_subtype(self.hub(sub)?, self.hub(sup)?))
  }

  /// `Class.isAssignableFrom`: whether a value of type `from` can be stored in a slot of type
  /// `target`.
  ///
  /// Primitive types are only assignable from themselves.
  pub fn is_assignable_from(&self, target: HubId, from: HubId) -> Result<bool, InteropError> {
    let target_hub = self.hub(target)?;
    let from_hub = self.hub(from)?;
    if target_hub.is_primitive() || from_hub.is_primitive() {
      return Ok(target == from);
    }
    Ok(is_subtype(from_hub, target_hub))
  }
}

impl Realm {
  /// The `instanceof` check. `null` passes iff `allow_null`.
  ///
  /// Unboxed primitives are instances of their primitive hub only.
  pub fn is_instance(&self, value: Value, hub: HubId, allow_null: bool) -> Result<bool, InteropError> {
    let target = self.hub(hub)?;
    match value {
      Value::Null => Ok(allow_null),
      Value::Ref(obj) => {
        let actual = self.hub(self.hub_of(obj)?)?;
        Ok(is_subtype(actual, target))
      }
      primitive => Ok(target.kind == TypeKind::Primitive(primitive.kind())),
    }
  }

  /// Like [`Realm::is_instance`] but requires the exact hub rather than a subtype.
  pub fn is_exact(&self, value: Value, hub: HubId, allow_null: bool) -> Result<bool, InteropError> {
    let target = self.hub(hub)?;
    match value {
      Value::Null => Ok(allow_null),
      Value::Ref(obj) => Ok(self.hub_of(obj)? == hub),
      primitive => Ok(target.kind == TypeKind::Primitive(primitive.kind())),
    }
  }
}
