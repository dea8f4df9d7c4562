mod common;

use common::{managed, runtime, string_result};
use interop_js::names;
use interop_js::{
  Capability, CapabilityHandle, CapabilityProbe, ClassInstanceBackend, HostHooks, HostValue, MemberFlag,
  ReturnType, Value,
};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> String {
    String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl<'a> io::Write for SharedWriterGuard<'a> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

#[test]
fn dispatch_emits_spans() {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let guard = tracing::subscriber::set_default(subscriber);

  let mut rt = runtime(ClassInstanceBackend::new(), |types| {
    let object = types.lookup(names::OBJECT);
    let string = common::string(types);
    let greeter = types.class("demo.Greeter", object, &[])?;
    types.method(
      greeter,
      MemberFlag::Static,
      "greet",
      ReturnType::Hub(string),
      &[Some(string)],
      managed(|rt, _, args| {
        let name = common::string_arg(rt, args[0]);
        string_result(rt, &format!("hello {name}"))
      }),
    )
  })
  .unwrap();
  let hub = rt.realm().types().lookup("demo.Greeter").unwrap();
  let class = rt.realm_mut().class_object(hub).unwrap();
  let class = rt.java_to_javascript(Value::Ref(class)).unwrap().as_object().unwrap();
  assert_eq!(
    rt.invoke_member(class, "greet", &[HostValue::string("world")]).unwrap(),
    HostValue::string("hello world")
  );
  drop(guard);

  let output = writer.contents();
  for span in ["build_type_table", "init_runtime", "build_method_table", "resolve_overload"] {
    assert!(output.contains(span), "expected {span} span output, got: {output}");
  }
  assert!(output.contains("demo.Greeter"), "expected the hub name, got: {output}");
  assert!(output.contains("time.busy"), "expected span timings, got: {output}");
}

#[test]
fn capability_probes_are_logged() {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();

  tracing::subscriber::with_default(subscriber, || {
    let probe = CapabilityProbe::new().detector(Capability::CurrentFile, || {
      Some(CapabilityHandle::CurrentFile(Rc::from("main.js")))
    });
    HostHooks::bind(&probe).unwrap();
  });

  let output = writer.contents();
  assert!(output.contains("probed host capability"), "got: {output}");
  assert!(output.contains("CurrentFile"), "got: {output}");
  assert!(output.contains("detected=false"), "got: {output}");
}
