use crate::capability::{CapabilityProbe, HostHooks};
use crate::convert::{Backend, ClassInstanceBackend, ExternRefBackend};
use crate::handle::HostObject;
use crate::host::HostValue;
use crate::hub::{HubId, TypeTable};
use crate::options::RuntimeOptions;
use crate::proxy::{DispatchTables, MethodTable};
use crate::value::Value;
use crate::{InteropError, Realm};
use ahash::AHashMap;
use std::rc::Rc;
use tracing::debug_span;

/// The view of the runtime handed to managed code.
///
/// Compiled member bodies ([`ManagedFn`](crate::ManagedFn)) receive a `&mut dyn Interop` so they
/// can allocate, convert values and call back into the host without knowing which backend is in
/// use.
pub trait Interop {
  fn realm(&self) -> &Realm;

  fn realm_mut(&mut self) -> &mut Realm;

  fn java_to_javascript(&mut self, value: Value) -> Result<HostValue, InteropError>;

  fn javascript_to_java(&mut self, value: &HostValue) -> Result<Value, InteropError>;

  /// Calls a host function; a host exception comes back as a managed throwable.
  fn call_host_function(&mut self, func: &HostValue, this: &HostValue, args: &[Value]) -> Result<Value, InteropError>;

  fn hooks(&self) -> &HostHooks;
}

/// The runtime context: type table, heaps, dispatch caches and the conversion backend.
///
/// Construction is the one-time initialization phase. Every conversion and dispatch entry point
/// is a method on this type, and nothing is shared between runtimes.
#[derive(Debug)]
pub struct Runtime<B: Backend> {
  pub(crate) realm: Realm,
  pub(crate) backend: B,
  pub(crate) dispatch: DispatchTables,
  pub(crate) hooks: HostHooks,
  /// Bound member objects handed out by member reads, keyed by proxy and member name.
  pub(crate) members: AHashMap<(HostObject, Rc<str>), HostObject>,
}

pub type ClassInstanceRuntime = Runtime<ClassInstanceBackend>;
pub type ExternRefRuntime = Runtime<ExternRefBackend>;

impl<B: Backend> Runtime<B> {
  /// Fails with [`InteropError::ShouldNotReachHere`] if `types` lacks one of the well-known types;
  /// build it from [`TypeTableBuilder::with_intrinsics`](crate::TypeTableBuilder::with_intrinsics).
  pub fn new(types: TypeTable, options: RuntimeOptions, backend: B) -> Result<Self, InteropError> {
    let _span = debug_span!("init_runtime", backend = backend.name(), types = types.len()).entered();
    let types = Rc::new(types);
    let dispatch = DispatchTables::new(&types);
    let realm = Realm::new(types, options)?;
    Ok(Self {
      realm,
      backend,
      dispatch,
      hooks: HostHooks::unbound(),
      members: AHashMap::new(),
    })
  }

  pub fn with_hooks(mut self, hooks: HostHooks) -> Self {
    self.hooks = hooks;
    self
  }

  /// Probes host capabilities and binds the hooks they enable.
  pub fn bind_hooks(&mut self, probe: &CapabilityProbe) -> Result<(), InteropError> {
    self.hooks = HostHooks::bind(probe)?;
    Ok(())
  }

  #[inline]
  pub fn realm(&self) -> &Realm {
    &self.realm
  }

  #[inline]
  pub fn realm_mut(&mut self) -> &mut Realm {
    &mut self.realm
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }

  pub fn hooks(&self) -> &HostHooks {
    &self.hooks
  }

  /// The method table of `hub`, built on first use.
  pub fn method_table(&self, hub: HubId) -> Result<Rc<MethodTable>, InteropError> {
    self.dispatch.table(self.realm.types(), hub)
  }

  /// Whether the method table of `hub` has been built yet.
  pub fn has_method_table(&self, hub: HubId) -> bool {
    self.dispatch.is_built(hub)
  }
}

impl<B: Backend> Interop for Runtime<B> {
  fn realm(&self) -> &Realm {
    &self.realm
  }

  fn realm_mut(&mut self) -> &mut Realm {
    &mut self.realm
  }

  fn java_to_javascript(&mut self, value: Value) -> Result<HostValue, InteropError> {
    Runtime::java_to_javascript(self, value)
  }

  fn javascript_to_java(&mut self, value: &HostValue) -> Result<Value, InteropError> {
    Runtime::javascript_to_java(self, value)
  }

  fn call_host_function(&mut self, func: &HostValue, this: &HostValue, args: &[Value]) -> Result<Value, InteropError> {
    Runtime::call_host_function(self, func, this, args)
  }

  fn hooks(&self) -> &HostHooks {
    &self.hooks
  }
}
