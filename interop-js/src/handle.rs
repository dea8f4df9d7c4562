use core::fmt;

/// A managed instance in the [`ManagedHeap`](crate::ManagedHeap).
///
/// Handles are plain slot indices. The managed heap never frees instances (reclamation belongs to
/// the host), so a handle stays valid for the lifetime of the heap that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjRef(pub(crate) u32);

impl ObjRef {
  /// The slot index within the managed heap.
  #[inline]
  pub fn index(self) -> u32 {
    self.0
  }
}

impl fmt::Debug for ObjRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ObjRef({})", self.0)
  }
}

/// A host object in the [`HostHeap`](crate::HostHeap).
///
/// Two host values refer to the same object iff their handles are equal; this is the identity used
/// by the referential-stability guarantees of the conversion engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HostObject(pub(crate) u32);

impl HostObject {
  /// The slot index within the host heap.
  #[inline]
  pub fn index(self) -> u32 {
    self.0
  }
}

impl fmt::Debug for HostObject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "HostObject({})", self.0)
  }
}

/// A host symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct HostSymbol(pub(crate) u32);

impl HostSymbol {
  #[inline]
  pub fn index(self) -> u32 {
    self.0
  }
}

/// An indirection handle into the extern table of the
/// [`ExternRefBackend`](crate::convert::ExternRefBackend).
///
/// Unlike [`HostObject`], an extern handle says nothing about the value it stands for; it must be
/// resolved through the backend before use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct ExternRef(pub(crate) u32);

impl ExternRef {
  #[inline]
  pub fn index(self) -> u32 {
    self.0
  }
}
