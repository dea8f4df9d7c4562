mod common;

use common::{managed, runtime, string_result};
use interop_js::names;
use interop_js::{
  Capability, CapabilityHandle, CapabilityProbe, ClassInstanceBackend, Deferred, FetchService, FileSystemService,
  HostHooks, HostValue, InteropError, MemberFlag, ProcessService, ReturnType, Value,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Fetched = Deferred<Result<Vec<u8>, String>>;

#[derive(Default)]
struct Files {
  reads: RefCell<Vec<String>>,
}

impl FileSystemService for Files {
  fn read(&self, path: &str) -> Result<Vec<u8>, String> {
    self.reads.borrow_mut().push(path.to_string());
    match path {
      "missing.txt" => Err(format!("{path}: not found")),
      "binary.bin" => Ok(vec![0xff, 0xfe]),
      _ => Ok(format!("file {path}").into_bytes()),
    }
  }
}

#[derive(Default)]
struct Network {
  requests: RefCell<Vec<(String, Fetched)>>,
}

impl FetchService for Network {
  fn fetch(&self, url: &str) -> Fetched {
    let deferred = Deferred::new();
    self.requests.borrow_mut().push((url.to_string(), deferred.clone()));
    deferred
  }
}

#[derive(Default)]
struct Process {
  exit_code: Cell<Option<i32>>,
}

impl ProcessService for Process {
  fn set_exit_code(&self, code: i32) {
    self.exit_code.set(Some(code));
  }
}

struct Host {
  files: Rc<Files>,
  network: Rc<Network>,
  process: Rc<Process>,
}

impl Host {
  fn new() -> Self {
    Self {
      files: Rc::new(Files::default()),
      network: Rc::new(Network::default()),
      process: Rc::new(Process::default()),
    }
  }

  fn probe(&self, fetch: bool, file_system: bool) -> CapabilityProbe {
    let files = self.files.clone();
    let network = self.network.clone();
    let process = self.process.clone();
    CapabilityProbe::new()
      .detector(Capability::Fetch, move || {
        fetch.then(|| CapabilityHandle::Fetch(network.clone()))
      })
      .detector(Capability::FileSystem, move || {
        file_system.then(|| CapabilityHandle::FileSystem(files.clone()))
      })
      .detector(Capability::Process, move || {
        Some(CapabilityHandle::Process(process.clone()))
      })
      .detector(Capability::CurrentFile, || {
        Some(CapabilityHandle::CurrentFile(Rc::from("/srv/app/main.js")))
      })
  }

  fn requested(&self) -> Vec<String> {
    self.network.requests.borrow().iter().map(|(url, _)| url.clone()).collect()
  }
}

#[test]
fn detectors_run_at_most_once() -> Result<(), InteropError> {
  let runs = Rc::new(Cell::new(0));
  let counter = runs.clone();
  let probe = CapabilityProbe::new().detector(Capability::CurrentFile, move || {
    counter.set(counter.get() + 1);
    Some(CapabilityHandle::CurrentFile(Rc::from("a.js")))
  });
  assert!(!probe.is_probed(Capability::CurrentFile));
  for _ in 0..3 {
    assert!(matches!(
      probe.probe(Capability::CurrentFile)?,
      Some(CapabilityHandle::CurrentFile(path)) if &*path == "a.js"
    ));
  }
  HostHooks::bind(&probe)?;
  assert_eq!(runs.get(), 1);
  assert!(probe.is_probed(Capability::CurrentFile));

  // Missing detectors are probed too, and report nothing.
  assert!(probe.probe(Capability::Fetch)?.is_none());
  assert!(probe.is_probed(Capability::Fetch));
  Ok(())
}

#[test]
fn misreported_capabilities_are_fatal() {
  let probe = CapabilityProbe::new().detector(Capability::Fetch, || {
    Some(CapabilityHandle::CurrentFile(Rc::from("a.js")))
  });
  assert!(probe.probe(Capability::Fetch).unwrap_err().is_fatal());
  assert!(HostHooks::bind(&probe).unwrap_err().is_fatal());
}

#[test]
fn unbound_hooks_are_unsupported() {
  let hooks = HostHooks::unbound();
  for capability in Capability::ALL {
    assert!(!hooks.is_bound(capability));
  }
  assert!(matches!(hooks.fetch_data("a.txt"), Err(InteropError::Unsupported(_))));
  assert!(matches!(hooks.fetch_text("http://a"), Err(InteropError::Unsupported(_))));
  assert!(matches!(hooks.set_exit_code(1), Err(InteropError::Unsupported(_))));
  let err = hooks.get_current_file().unwrap_err();
  assert!(matches!(err, InteropError::Unsupported("getCurrentFile")));
  assert!(!err.is_fatal());
}

#[test]
fn network_locators_prefer_fetch() -> Result<(), InteropError> {
  let host = Host::new();
  let hooks = HostHooks::bind(&host.probe(true, true))?;
  assert!(hooks.is_bound(Capability::Fetch));
  assert!(hooks.is_bound(Capability::FileSystem));

  for url in ["http://a/x", "HTTPS://a/y", "data:text/plain,hi", "blob:abc"] {
    hooks.fetch_data(url)?;
  }
  assert_eq!(
    host.requested(),
    ["http://a/x", "HTTPS://a/y", "data:text/plain,hi", "blob:abc"]
  );

  let local = hooks.fetch_data("lib/data.txt")?;
  assert!(local.is_resolved());
  assert_eq!(local.value(), Some(Ok(b"file lib/data.txt".to_vec())));
  // Prefixes are matched at the start only.
  hooks.fetch_data("./http:/x")?;
  assert_eq!(*host.files.reads.borrow(), ["lib/data.txt", "./http:/x"]);
  assert_eq!(host.requested().len(), 4);
  Ok(())
}

#[test]
fn a_single_loader_handles_everything() -> Result<(), InteropError> {
  let host = Host::new();
  let fetch_only = HostHooks::bind(&host.probe(true, false))?;
  fetch_only.fetch_data("local.txt")?;
  assert_eq!(host.requested(), ["local.txt"]);

  let files_only = HostHooks::bind(&host.probe(false, true))?;
  let remote = files_only.fetch_data("https://a/b")?;
  assert_eq!(remote.value(), Some(Ok(b"file https://a/b".to_vec())));
  Ok(())
}

#[test]
fn fetched_text_is_decoded_on_delivery() -> Result<(), InteropError> {
  let host = Host::new();
  let hooks = HostHooks::bind(&host.probe(true, true))?;

  let text = hooks.fetch_text("http://a/readme")?;
  assert!(!text.is_resolved());
  let delivered = Rc::new(RefCell::new(None));
  let sink = delivered.clone();
  text.on_resolved(move |value| *sink.borrow_mut() = Some(value));

  let (_, pending) = host.network.requests.borrow()[0].clone();
  assert!(pending.resolve(Ok(b"hello".to_vec())));
  assert!(text.is_resolved());
  assert_eq!(*delivered.borrow(), Some(Ok("hello".to_string())));

  let missing = hooks.fetch_text("missing.txt")?;
  assert_eq!(missing.value(), Some(Err("missing.txt: not found".to_string())));
  let binary = hooks.fetch_text("binary.bin")?;
  assert!(matches!(binary.value(), Some(Err(_))));
  Ok(())
}

#[test]
fn deferred_values_resolve_once() {
  let deferred: Deferred<u32> = Deferred::new();
  let seen = Rc::new(RefCell::new(Vec::new()));
  let early = seen.clone();
  deferred.on_resolved(move |v| early.borrow_mut().push(("early", v)));
  let doubled = deferred.map(|v| v * 2);

  assert!(deferred.resolve(1));
  assert!(!deferred.resolve(2));
  let late = seen.clone();
  deferred.on_resolved(move |v| late.borrow_mut().push(("late", v)));
  assert_eq!(*seen.borrow(), [("early", 1), ("late", 1)]);

  assert_eq!(doubled.value(), Some(2));
  assert!(doubled.is_resolved());
  assert_eq!(Deferred::resolved("x").value(), Some("x"));

  // Reading the value leaves it for subscribers that arrive afterwards.
  assert_eq!(deferred.value(), Some(1));
  let tripled = deferred.map(|v| v * 3);
  assert_eq!(tripled.value(), Some(3));
  let after_read = seen.clone();
  doubled.on_resolved(move |v| after_read.borrow_mut().push(("after read", v)));
  assert_eq!(*seen.borrow(), [("early", 1), ("late", 1), ("after read", 2)]);
}

#[test]
fn process_and_current_file_hooks() -> Result<(), InteropError> {
  let host = Host::new();
  let hooks = HostHooks::bind(&host.probe(false, false))?;
  hooks.set_exit_code(3)?;
  assert_eq!(host.process.exit_code.get(), Some(3));
  assert_eq!(&*hooks.get_current_file()?, "/srv/app/main.js");
  assert!(matches!(hooks.fetch_data("a"), Err(InteropError::Unsupported(_))));
  Ok(())
}

#[test]
fn managed_code_reaches_hooks_through_the_runtime() -> Result<(), InteropError> {
  let host = Host::new();
  let mut rt = runtime(ClassInstanceBackend::new(), |types| {
    let object = types.lookup(names::OBJECT);
    let string = common::string(types);
    let env = types.class("demo.Env", object, &[])?;
    types.method(
      env,
      MemberFlag::Static,
      "currentFile",
      ReturnType::Hub(string),
      &[],
      managed(|rt, _, _| {
        let path = rt.hooks().get_current_file()?;
        string_result(rt, &path)
      }),
    )?;
    Ok(())
  })?;
  let env = rt.realm().types().lookup("demo.Env").expect("declared");
  let class = rt.realm_mut().class_object(env)?;
  let class = rt
    .java_to_javascript(Value::Ref(class))?
    .as_object()
    .expect("classes reach the host as proxies");

  assert!(matches!(
    rt.invoke_member(class, "currentFile", &[]),
    Err(InteropError::Unsupported("getCurrentFile"))
  ));
  rt.bind_hooks(&host.probe(false, false))?;
  assert_eq!(
    rt.invoke_member(class, "currentFile", &[])?,
    HostValue::string("/srv/app/main.js")
  );
  Ok(())
}

#[test]
fn runtimes_accept_prebound_hooks() -> Result<(), InteropError> {
  let host = Host::new();
  let hooks = HostHooks::bind(&host.probe(true, false))?;
  let rt = runtime(ClassInstanceBackend::new(), |_| Ok(()))?.with_hooks(hooks);
  assert!(rt.hooks().is_bound(Capability::Fetch));
  assert!(!rt.hooks().is_bound(Capability::FileSystem));
  rt.hooks().fetch_data("http://a/z")?;
  assert_eq!(host.requested(), ["http://a/z"]);
  Ok(())
}
