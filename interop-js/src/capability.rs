//! Optional host facilities and the hooks bound to them.
//!
//! A [`CapabilityProbe`] owns one detection callback per [`Capability`] and runs each at most once.
//! [`HostHooks::bind`] asks the probe for every capability and keeps what was found; a hook whose
//! capability is missing fails with [`InteropError::Unsupported`].

use crate::InteropError;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
  /// Network requests.
  Fetch,
  /// Reading files by path.
  FileSystem,
  /// Reporting the process exit code.
  Process,
  /// The path of the running program.
  CurrentFile,
}

impl Capability {
  pub const ALL: [Capability; 4] = [
    Capability::Fetch,
    Capability::FileSystem,
    Capability::Process,
    Capability::CurrentFile,
  ];

  fn slot(self) -> usize {
    match self {
      Capability::Fetch => 0,
      Capability::FileSystem => 1,
      Capability::Process => 2,
      Capability::CurrentFile => 3,
    }
  }
}

pub trait FetchService {
  fn fetch(&self, url: &str) -> Deferred<Result<Vec<u8>, String>>;
}

pub trait FileSystemService {
  fn read(&self, path: &str) -> Result<Vec<u8>, String>;
}

pub trait ProcessService {
  fn set_exit_code(&self, code: i32);
}

/// What a successful detection captured.
#[derive(Clone)]
pub enum CapabilityHandle {
  Fetch(Rc<dyn FetchService>),
  FileSystem(Rc<dyn FileSystemService>),
  Process(Rc<dyn ProcessService>),
  CurrentFile(Rc<str>),
}

impl CapabilityHandle {
  pub fn capability(&self) -> Capability {
    match self {
      CapabilityHandle::Fetch(_) => Capability::Fetch,
      CapabilityHandle::FileSystem(_) => Capability::FileSystem,
      CapabilityHandle::Process(_) => Capability::Process,
      CapabilityHandle::CurrentFile(_) => Capability::CurrentFile,
    }
  }
}

impl fmt::Debug for CapabilityHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CapabilityHandle::CurrentFile(path) => f.debug_tuple("CurrentFile").field(path).finish(),
      other => write!(f, "{:?}", other.capability()),
    }
  }
}

type Detector = Box<dyn Fn() -> Option<CapabilityHandle>>;

/// One-shot detection of host capabilities.
#[derive(Default)]
pub struct CapabilityProbe {
  detectors: [Option<Detector>; 4],
  results: [OnceCell<Option<CapabilityHandle>>; 4],
}

impl CapabilityProbe {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers the detection callback for `capability`, replacing any earlier one. Has no effect
  /// once the capability was probed.
  pub fn detector(
    mut self,
    capability: Capability,
    detect: impl Fn() -> Option<CapabilityHandle> + 'static,
  ) -> Self {
    self.detectors[capability.slot()] = Some(Box::new(detect));
    self
  }

  /// Detects `capability`, running its callback on the first call only.
  ///
  /// A callback that reports a handle for a different capability is a wiring defect.
  pub fn probe(&self, capability: Capability) -> Result<Option<CapabilityHandle>, InteropError> {
    let slot = capability.slot();
    self.results[slot]
      .get_or_try_init(|| {
        let found = self.detectors[slot].as_ref().and_then(|detect| detect());
        if let Some(handle) = &found {
          if handle.capability() != capability {
            return Err(InteropError::should_not_reach_here(format!(
              "detector for {capability:?} produced {handle:?}"
            )));
          }
        }
        debug!(?capability, detected = found.is_some(), "probed host capability");
        Ok(found)
      })
      .cloned()
  }

  /// Whether `capability` has been probed, whatever the outcome.
  pub fn is_probed(&self, capability: Capability) -> bool {
    self.results[capability.slot()].get().is_some()
  }
}

impl fmt::Debug for CapabilityProbe {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CapabilityProbe")
      .field("results", &self.results)
      .finish_non_exhaustive()
  }
}

struct DeferredState<T> {
  value: Option<T>,
  resolved: bool,
  callbacks: Vec<Box<dyn FnOnce(T)>>,
}

/// A one-shot result delivered later, shared between its producer and consumers.
pub struct Deferred<T> {
  state: Rc<RefCell<DeferredState<T>>>,
}

impl<T> Clone for Deferred<T> {
  fn clone(&self) -> Self {
    Self {
      state: self.state.clone(),
    }
  }
}

impl<T> Default for Deferred<T> {
  fn default() -> Self {
    Self {
      state: Rc::new(RefCell::new(DeferredState {
        value: None,
        resolved: false,
        callbacks: Vec::new(),
      })),
    }
  }
}

impl<T: Clone + 'static> Deferred<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn resolved(value: T) -> Self {
    let deferred = Self::new();
    deferred.resolve(value);
    deferred
  }

  /// Delivers the value. Returns `false`, dropping `value`, if already resolved.
  pub fn resolve(&self, value: T) -> bool {
    let callbacks = {
      let mut state = self.state.borrow_mut();
      if state.resolved {
        return false;
      }
      state.resolved = true;
      state.value = Some(value.clone());
      std::mem::take(&mut state.callbacks)
    };
    for callback in callbacks {
      callback(value.clone());
    }
    true
  }

  /// Runs `f` with the value once resolved, immediately if it already is.
  pub fn on_resolved(&self, f: impl FnOnce(T) + 'static) {
    let ready = {
      let mut state = self.state.borrow_mut();
      if state.resolved {
        state.value.clone()
      } else {
        state.callbacks.push(Box::new(f));
        return;
      }
    };
    if let Some(value) = ready {
      f(value);
    }
  }

  pub fn map<U: Clone + 'static>(&self, f: impl FnOnce(T) -> U + 'static) -> Deferred<U> {
    let mapped = Deferred::new();
    let target = mapped.clone();
    self.on_resolved(move |value| {
      target.resolve(f(value));
    });
    mapped
  }

  pub fn is_resolved(&self) -> bool {
    self.state.borrow().resolved
  }

  /// A copy of the value, if resolved. The value stays in place for later subscribers.
  pub fn value(&self) -> Option<T> {
    self.state.borrow().value.clone()
  }
}

impl<T> fmt::Debug for Deferred<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deferred")
      .field("resolved", &self.state.borrow().resolved)
      .finish_non_exhaustive()
  }
}

const NETWORK_SCHEMES: [&str; 4] = ["http:", "https:", "data:", "blob:"];

fn looks_like_network(target: &str) -> bool {
  NETWORK_SCHEMES
    .iter()
    .any(|scheme| target.get(..scheme.len()).is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme)))
}

/// Runtime hooks bound to detected capabilities.
#[derive(Clone, Default)]
pub struct HostHooks {
  fetch: Option<Rc<dyn FetchService>>,
  file_system: Option<Rc<dyn FileSystemService>>,
  process: Option<Rc<dyn ProcessService>>,
  current_file: Option<Rc<str>>,
}

impl HostHooks {
  /// Hooks with nothing bound; every hook fails with [`InteropError::Unsupported`].
  pub fn unbound() -> Self {
    Self::default()
  }

  /// Probes every capability once and binds the hooks it enables.
  pub fn bind(probe: &CapabilityProbe) -> Result<Self, InteropError> {
    let mut hooks = Self::unbound();
    for capability in Capability::ALL {
      match probe.probe(capability)? {
        Some(CapabilityHandle::Fetch(service)) => hooks.fetch = Some(service),
        Some(CapabilityHandle::FileSystem(service)) => hooks.file_system = Some(service),
        Some(CapabilityHandle::Process(service)) => hooks.process = Some(service),
        Some(CapabilityHandle::CurrentFile(path)) => hooks.current_file = Some(path),
        None => {}
      }
    }
    Ok(hooks)
  }

  pub fn is_bound(&self, capability: Capability) -> bool {
    match capability {
      Capability::Fetch => self.fetch.is_some(),
      Capability::FileSystem => self.file_system.is_some(),
      Capability::Process => self.process.is_some(),
      Capability::CurrentFile => self.current_file.is_some(),
    }
  }

  /// Loads `target` as bytes. Network locators go to the fetch capability when it is bound;
  /// anything else is read from the file system first and fetched otherwise.
  pub fn fetch_data(&self, target: &str) -> Result<Deferred<Result<Vec<u8>, String>>, InteropError> {
    let via_fetch = match (&self.fetch, &self.file_system) {
      (Some(_), Some(_)) => looks_like_network(target),
      (Some(_), None) => true,
      (None, Some(_)) => false,
      (None, None) => return Err(InteropError::Unsupported("fetch")),
    };
    debug!(target, via_fetch, "fetching");
    match (via_fetch, &self.fetch, &self.file_system) {
      (true, Some(fetch), _) => Ok(fetch.fetch(target)),
      (false, _, Some(fs)) => Ok(Deferred::resolved(fs.read(target))),
      _ => Err(InteropError::Unsupported("fetch")),
    }
  }

  /// [`HostHooks::fetch_data`] decoded as UTF-8.
  pub fn fetch_text(&self, target: &str) -> Result<Deferred<Result<String, String>>, InteropError> {
    Ok(self.fetch_data(target)?.map(|result| {
      result.and_then(|bytes| String::from_utf8(bytes).map_err(|err| err.to_string()))
    }))
  }

  pub fn set_exit_code(&self, code: i32) -> Result<(), InteropError> {
    let process = self.process.as_ref().ok_or(InteropError::Unsupported("setExitCode"))?;
    process.set_exit_code(code);
    Ok(())
  }

  pub fn get_current_file(&self) -> Result<Rc<str>, InteropError> {
    self
      .current_file
      .clone()
      .ok_or(InteropError::Unsupported("getCurrentFile"))
  }
}

impl fmt::Debug for HostHooks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HostHooks")
      .field("fetch", &self.fetch.is_some())
      .field("file_system", &self.file_system.is_some())
      .field("process", &self.process.is_some())
      .field("current_file", &self.current_file)
      .finish()
  }
}
