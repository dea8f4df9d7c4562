mod common;

use common::{managed, runtime};
use interop_js::names;
use interop_js::{
  Backend, ClassInstanceBackend, ExternRefBackend, HostObject, HostValue, InteropError, MemberFlag, ReturnType,
  Runtime, Thrown, Value,
};

const THROWER: &str = "demo.Thrower";

fn thrower<B: Backend>(backend: B) -> Result<Runtime<B>, InteropError> {
  runtime(backend, |types| {
    let object = types.lookup(names::OBJECT);
    let thrower = types.class(THROWER, object, &[])?;
    types.method(
      thrower,
      MemberFlag::Static,
      "fail",
      ReturnType::Void,
      &[],
      managed(|rt, _, _| {
        let hub = rt.realm().intrinsics().runtime_exception;
        let throwable = rt.realm_mut().alloc_throwable(hub, Some("boom"))?;
        Err(InteropError::Throw(Thrown::Managed(throwable)))
      }),
    )?;
    Ok(())
  })
}

fn class_proxy<B: Backend>(rt: &mut Runtime<B>, name: &str) -> Result<HostObject, InteropError> {
  let hub = rt.realm().types().lookup(name).expect("declared");
  let class = rt.realm_mut().class_object(hub)?;
  let proxy = rt.java_to_javascript(Value::Ref(class))?;
  Ok(proxy.as_object().expect("classes reach the host as proxies"))
}

fn host_error(err: InteropError) -> HostObject {
  match err {
    InteropError::Throw(Thrown::Host(HostValue::Object(obj))) => obj,
    other => panic!("expected a host error object, got {other:?}"),
  }
}

fn managed_throwable(err: InteropError) -> interop_js::ObjRef {
  match err {
    InteropError::Throw(Thrown::Managed(obj)) => obj,
    other => panic!("expected a managed throwable, got {other:?}"),
  }
}

fn managed_throw_reaches_the_host<B: Backend>(backend: B) -> Result<(), InteropError> {
  let mut rt = thrower(backend)?;
  let proxy = class_proxy(&mut rt, THROWER)?;
  let err = rt.invoke_member(proxy, "fail", &[]).unwrap_err();
  assert_eq!(err.class(), interop_js::ErrorClass::Exception);
  let error = host_error(err);

  let host = rt.realm().host();
  assert_eq!(host.get(error, "name")?, HostValue::string("RuntimeException"));
  assert_eq!(host.get(error, "message")?, HostValue::string("boom"));
  assert_eq!(host.error_message(error)?.as_deref(), Some("boom"));

  // Catching it on the way back yields the original throwable.
  let throwable = rt.managed_behind(&HostValue::Object(error))?.expect("error of a throwable");
  let back = rt.into_managed_error(InteropError::Throw(Thrown::Host(HostValue::Object(error))));
  assert_eq!(managed_throwable(back), throwable);
  assert_eq!(rt.realm().throwable_message(throwable)?.as_deref(), Some("boom"));

  // And throwing it again reuses the same error object.
  assert_eq!(rt.throwable_to_host(throwable)?, HostValue::Object(error));
  Ok(())
}

#[test]
fn managed_throw_reaches_the_host_class_instance() -> Result<(), InteropError> {
  managed_throw_reaches_the_host(ClassInstanceBackend::new())
}

#[test]
fn managed_throw_reaches_the_host_extern_ref() -> Result<(), InteropError> {
  managed_throw_reaches_the_host(ExternRefBackend::new())
}

fn host_throw_reaches_managed_code<B: Backend>(backend: B) -> Result<(), InteropError> {
  let mut rt = thrower(backend)?;
  let js_error = rt.realm().intrinsics().js_error;

  let throws_string = rt
    .realm_mut()
    .host_mut()
    .alloc_function(|_, _, _| Err(HostValue::string("bad")));
  let err = rt
    .call_host_function(&HostValue::Object(throws_string), &HostValue::Undefined, &[])
    .unwrap_err();
  let throwable = managed_throwable(err);
  assert_eq!(rt.realm().hub_of(throwable)?, js_error);
  assert_eq!(rt.realm().throwable_message(throwable)?.as_deref(), Some("bad"));
  assert_eq!(rt.js_error_thrown_value(throwable)?, HostValue::string("bad"));

  let type_error = rt.realm_mut().host_mut().alloc_error("TypeError", "nope");
  let throws_error = rt
    .realm_mut()
    .host_mut()
    .alloc_function(move |_, _, _| Err(HostValue::Object(type_error)));
  let err = rt
    .call_host_function(&HostValue::Object(throws_error), &HostValue::Undefined, &[])
    .unwrap_err();
  let throwable = managed_throwable(err);
  assert_eq!(rt.realm().throwable_message(throwable)?.as_deref(), Some("nope"));
  assert_eq!(rt.js_error_thrown_value(throwable)?, HostValue::Object(type_error));
  Ok(())
}

#[test]
fn host_throw_reaches_managed_code_class_instance() -> Result<(), InteropError> {
  host_throw_reaches_managed_code(ClassInstanceBackend::new())
}

#[test]
fn host_throw_reaches_managed_code_extern_ref() -> Result<(), InteropError> {
  host_throw_reaches_managed_code(ExternRefBackend::new())
}

#[test]
fn host_calls_convert_arguments_and_results() -> Result<(), InteropError> {
  let mut rt = thrower(ClassInstanceBackend::new())?;
  let increment = rt
    .realm_mut()
    .host_mut()
    .alloc_function(|_, _, args| match args {
      [HostValue::Number(n)] => Ok(HostValue::Number(n + 1.0)),
      _ => Err(HostValue::string("expected one number")),
    });
  let result = rt.call_host_function(&HostValue::Object(increment), &HostValue::Undefined, &[Value::Int(41)])?;
  assert_eq!(rt.unbox_if_needed(result, interop_js::JavaKind::Double.ordinal())?, Value::Double(42.0));

  let err = rt
    .call_host_function(&HostValue::Number(1.0), &HostValue::Undefined, &[])
    .unwrap_err();
  let throwable = managed_throwable(err);
  let class_cast = rt.realm().intrinsics().class_cast_exception;
  assert_eq!(rt.realm().hub_of(throwable)?, class_cast);
  Ok(())
}

#[test]
fn cast_failures_become_class_cast_exceptions() -> Result<(), InteropError> {
  let mut rt = thrower(ClassInstanceBackend::new())?;
  let proxy = class_proxy(&mut rt, THROWER)?;
  let err = rt.invoke_member(proxy, "fail", &[HostValue::Number(1.0)]).unwrap_err();
  assert!(matches!(err, InteropError::NoConformingOverload { argc: 1, .. }), "{err}");

  let error = host_error(rt.into_host_error(err));
  let host = rt.realm().host();
  assert_eq!(host.get(error, "name")?, HostValue::string("ClassCastException"));
  let HostValue::String(message) = host.get(error, "message")? else {
    panic!("error messages are strings");
  };
  assert!(message.contains("fail"), "{message}");

  let throwable = managed_throwable(rt.into_managed_error(InteropError::ClassCast("x".to_string())));
  let class_cast = rt.realm().intrinsics().class_cast_exception;
  assert_eq!(rt.realm().hub_of(throwable)?, class_cast);
  Ok(())
}

#[test]
fn other_errors_pass_through() -> Result<(), InteropError> {
  let mut rt = thrower(ExternRefBackend::new())?;
  let fatal = InteropError::ShouldNotReachHere("corrupt".to_string());
  assert!(matches!(rt.into_host_error(fatal.clone()), InteropError::ShouldNotReachHere(_)));
  assert!(matches!(rt.into_managed_error(fatal), InteropError::ShouldNotReachHere(_)));
  assert!(matches!(
    rt.into_host_error(InteropError::Unsupported("fetch")),
    InteropError::Unsupported("fetch")
  ));
  assert!(matches!(
    rt.into_managed_error(InteropError::LimitExceeded { got: 2, max: 1 }),
    InteropError::LimitExceeded { got: 2, max: 1 }
  ));
  // Already on the right side.
  let host = InteropError::Throw(Thrown::Host(HostValue::Null));
  assert!(matches!(
    rt.into_host_error(host),
    InteropError::Throw(Thrown::Host(HostValue::Null))
  ));

  let s = rt.realm_mut().alloc_string("not throwable")?;
  assert!(rt.throwable_to_host(s).unwrap_err().is_fatal());
  Ok(())
}
