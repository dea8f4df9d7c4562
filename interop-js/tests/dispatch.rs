mod common;

use common::{managed, runtime, runtime_with_options, string_arg, string_result};
use interop_js::{
  Backend, ClassInstanceBackend, ExternRefBackend, HostObject, HostValue, InteropError, JavaKind, Long64, MemberFlag,
  ProxyOps, ReturnType, Runtime, RuntimeOptions, TypeTableBuilder, Value,
};
use num_bigint::BigInt;
use std::rc::Rc;

const COUNTER: &str = "demo.Counter";
const SPECIAL: &str = "demo.Special";
const FUNCTION: &str = "demo.Function";
const DOUBLER: &str = "demo.Doubler";

fn int_arg(value: Value) -> i32 {
  match value {
    Value::Int(n) => n,
    other => panic!("expected an int, got {other:?}"),
  }
}

fn declare(types: &mut TypeTableBuilder) -> Result<(), InteropError> {
  let object = common::object(types);
  let string = common::string(types);
  let int = common::primitive(types, JavaKind::Int);
  let long = common::primitive(types, JavaKind::Long);

  let counter = types.class(COUNTER, Some(object), &[])?;
  types.field(counter, "count", JavaKind::Int)?;
  types.field(counter, "label", JavaKind::Object)?;
  types.constructor(
    counter,
    &[Some(int)],
    managed(|rt, this, args| {
      let this = this.expect("constructors receive the new instance");
      rt.realm_mut().set_field(this, "count", args[0])?;
      Ok(Value::Null)
    }),
  )?;
  types.constructor(
    counter,
    &[Some(string)],
    managed(|rt, this, args| {
      let this = this.expect("constructors receive the new instance");
      rt.realm_mut().set_field(this, "label", args[0])?;
      Ok(Value::Null)
    }),
  )?;
  types.method(
    counter,
    MemberFlag::Instance,
    "add",
    ReturnType::Hub(int),
    &[Some(int)],
    managed(|rt, this, args| {
      let this = this.expect("instance member");
      let next = Value::Int(int_arg(rt.realm().get_field(this, "count")?) + int_arg(args[0]));
      rt.realm_mut().set_field(this, "count", next)?;
      Ok(next)
    }),
  )?;
  types.method(
    counter,
    MemberFlag::Instance,
    "add",
    ReturnType::Hub(string),
    &[Some(string)],
    managed(|rt, _, args| {
      let suffix = string_arg(rt, args[0]);
      string_result(rt, &format!("added {suffix}"))
    }),
  )?;
  types.method(
    counter,
    MemberFlag::Instance,
    "pick",
    ReturnType::Hub(string),
    &[Some(object)],
    managed(|rt, _, _| string_result(rt, "object")),
  )?;
  types.method(
    counter,
    MemberFlag::Instance,
    "pick",
    ReturnType::Hub(string),
    &[Some(string)],
    managed(|rt, _, _| string_result(rt, "string")),
  )?;
  types.method(
    counter,
    MemberFlag::Instance,
    "echo",
    ReturnType::Any,
    &[None],
    managed(|_, _, args| Ok(args[0])),
  )?;
  types.method(
    counter,
    MemberFlag::Static,
    "create",
    ReturnType::Hub(counter),
    &[],
    managed(move |rt, _, _| {
      let obj = rt.realm_mut().alloc_instance(counter)?;
      rt.realm_mut().set_field(obj, "count", Value::Int(100))?;
      Ok(Value::Ref(obj))
    }),
  )?;
  types.method(
    counter,
    MemberFlag::Static,
    "twice",
    ReturnType::Hub(int),
    &[Some(int)],
    managed(|_, _, args| Ok(Value::Int(int_arg(args[0]) * 2))),
  )?;

  let special = types.class(SPECIAL, Some(counter), &[])?;
  types.method(
    special,
    MemberFlag::Instance,
    "add",
    ReturnType::Hub(long),
    &[Some(long)],
    managed(|_, _, args| match args[0] {
      Value::Long(n) => Ok(Value::Long(n.mul(Long64::from_int(10)))),
      other => panic!("expected a long, got {other:?}"),
    }),
  )?;
  types.method(
    special,
    MemberFlag::Instance,
    "toString",
    ReturnType::Hub(string),
    &[],
    managed(|rt, _, _| string_result(rt, "special")),
  )?;

  let function = types.interface(FUNCTION, &[])?;
  types.method(
    function,
    MemberFlag::Functional,
    "apply",
    ReturnType::Any,
    &[None],
    managed(|_, _, _| Ok(Value::Null)),
  )?;
  let doubler = types.class(DOUBLER, Some(object), &[function])?;
  types.method(
    doubler,
    MemberFlag::Instance,
    "apply",
    ReturnType::Hub(int),
    &[Some(int)],
    managed(|_, _, args| Ok(Value::Int(int_arg(args[0]) * 2))),
  )?;
  Ok(())
}

fn hub<B: Backend>(rt: &Runtime<B>, name: &str) -> interop_js::HubId {
  rt.realm().types().lookup(name).expect("declared")
}

fn class_proxy<B: Backend>(rt: &mut Runtime<B>, name: &str) -> Result<HostObject, InteropError> {
  let hub = hub(rt, name);
  let class = rt.realm_mut().class_object(hub)?;
  let proxy = rt.java_to_javascript(Value::Ref(class))?;
  Ok(proxy.as_object().expect("classes reach the host as proxies"))
}

fn construct<B: Backend>(rt: &mut Runtime<B>, name: &str, args: &[HostValue]) -> Result<HostObject, InteropError> {
  let class = class_proxy(rt, name)?;
  let instance = rt.construct(class, args)?;
  Ok(instance.as_object().expect("instances reach the host as proxies"))
}

fn no_overload(result: Result<HostValue, InteropError>, member: &str, argc: usize) {
  match result {
    Err(InteropError::NoConformingOverload { member: m, argc: n }) => {
      assert_eq!((m.as_str(), n), (member, argc));
    }
    other => panic!("expected no conforming overload of {member}, got {other:?}"),
  }
}

fn overloads_select_by_argument_type<B: Backend>(backend: B) -> Result<(), InteropError> {
  let mut rt = runtime(backend, declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(1.0)])?;

  assert_eq!(
    rt.invoke_member(counter, "add", &[HostValue::Number(2.0)])?,
    HostValue::Number(3.0)
  );
  assert_eq!(
    rt.invoke_member(counter, "add", &[HostValue::string("x")])?,
    HostValue::string("added x")
  );
  no_overload(rt.invoke_member(counter, "add", &[HostValue::Number(2.5)]), "add", 1);
  no_overload(rt.invoke_member(counter, "add", &[HostValue::Bool(true)]), "add", 1);
  no_overload(rt.invoke_member(counter, "add", &[]), "add", 0);
  assert_eq!(rt.read_member(counter, "count")?, HostValue::Number(3.0));
  Ok(())
}

#[test]
fn overloads_select_by_argument_type_class_instance() -> Result<(), InteropError> {
  overloads_select_by_argument_type(ClassInstanceBackend::new())
}

#[test]
fn overloads_select_by_argument_type_extern_ref() -> Result<(), InteropError> {
  overloads_select_by_argument_type(ExternRefBackend::new())
}

#[test]
fn first_declared_overload_wins() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;
  assert_eq!(
    rt.invoke_member(counter, "pick", &[HostValue::string("s")])?,
    HostValue::string("object")
  );
  assert_eq!(
    rt.invoke_member(counter, "pick", &[HostValue::Number(1.0)])?,
    HostValue::string("object")
  );
  Ok(())
}

const GAUGE: &str = "demo.Gauge";

fn declare_gauge(types: &mut TypeTableBuilder) -> Result<(), InteropError> {
  let object = common::object(types);
  let string = common::string(types);
  let int = common::primitive(types, JavaKind::Int);
  let float = common::primitive(types, JavaKind::Float);
  let double = common::primitive(types, JavaKind::Double);
  let gauge = types.class(GAUGE, Some(object), &[])?;
  types.method(
    gauge,
    MemberFlag::Static,
    "measure",
    ReturnType::Hub(string),
    &[Some(float)],
    managed(|rt, _, _| string_result(rt, "float")),
  )?;
  types.method(
    gauge,
    MemberFlag::Static,
    "measure",
    ReturnType::Hub(string),
    &[Some(double)],
    managed(|rt, _, _| string_result(rt, "double")),
  )?;
  // The first overload only rejects on its second parameter.
  types.method(
    gauge,
    MemberFlag::Static,
    "tag",
    ReturnType::Void,
    &[Some(string), Some(int)],
    managed(|_, _, _| Ok(Value::Null)),
  )?;
  types.method(
    gauge,
    MemberFlag::Static,
    "tag",
    ReturnType::Void,
    &[Some(object), Some(object)],
    managed(|_, _, _| Ok(Value::Null)),
  )?;
  types.method(
    gauge,
    MemberFlag::Static,
    "untagged",
    ReturnType::Void,
    &[Some(object), Some(object)],
    managed(|_, _, _| Ok(Value::Null)),
  )?;
  Ok(())
}

#[test]
fn float_parameters_only_take_exact_singles() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare_gauge)?;
  let gauge = class_proxy(&mut rt, GAUGE)?;
  for (n, expected) in [
    (0.5, "float"),
    (-3.0, "float"),
    (f64::INFINITY, "float"),
    (f64::NAN, "float"),
    (0.1, "double"),
    (1e300, "double"),
    (16_777_217.0, "double"),
  ] {
    assert_eq!(
      rt.invoke_member(gauge, "measure", &[HostValue::Number(n)])?,
      HostValue::string(expected),
      "{n}"
    );
  }
  Ok(())
}

#[test]
fn rejected_overloads_allocate_nothing() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare_gauge)?;
  let gauge = class_proxy(&mut rt, GAUGE)?;
  let args = || [HostValue::string("a"), HostValue::string("b")];

  let before = rt.realm().heap().len();
  assert_eq!(rt.invoke_member(gauge, "untagged", &args())?, HostValue::Undefined);
  let single_candidate = rt.realm().heap().len() - before;

  let before = rt.realm().heap().len();
  assert_eq!(rt.invoke_member(gauge, "tag", &args())?, HostValue::Undefined);
  assert_eq!(rt.realm().heap().len() - before, single_candidate);
  Ok(())
}

#[test]
fn wildcard_parameters_accept_anything() -> Result<(), InteropError> {
  let mut rt = runtime(ExternRefBackend::new(), declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;
  for value in [
    HostValue::Number(7.0),
    HostValue::Null,
    HostValue::Undefined,
    HostValue::string("s"),
    HostValue::Object(counter),
  ] {
    assert_eq!(rt.invoke_member(counter, "echo", &[value.clone()])?, value);
  }
  Ok(())
}

#[test]
fn member_reads_yield_callable_members() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(10.0)])?;

  let add = rt.read_member(counter, "add")?;
  assert_eq!(rt.read_member(counter, "add")?, add);
  assert_eq!(add.type_of(rt.realm().host()), "function");
  assert_eq!(
    rt.call_host_value(&add, HostValue::Object(counter), &[HostValue::Number(5.0)])?,
    HostValue::Number(15.0)
  );

  assert_eq!(rt.read_member(counter, "count")?, HostValue::Number(15.0));
  assert_eq!(rt.read_member(counter, "label")?, HostValue::Null);
  assert_eq!(rt.read_member(counter, "missing")?, HostValue::Undefined);
  assert!(rt.has_member(counter, "add")?);
  assert!(rt.has_member(counter, "count")?);
  assert!(rt.has_member(counter, "toString")?);
  assert!(!rt.has_member(counter, "missing")?);
  assert!(!rt.has_member(counter, "twice")?);
  Ok(())
}

#[test]
fn class_proxies_expose_statics() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let class = class_proxy(&mut rt, COUNTER)?;
  assert_eq!(
    rt.invoke_member(class, "twice", &[HostValue::Number(4.0)])?,
    HostValue::Number(8.0)
  );

  let created = rt.invoke_member(class, "create", &[])?;
  let created = created.as_object().expect("a proxy");
  assert_eq!(rt.read_member(created, "count")?, HostValue::Number(100.0));

  // Each side only sees its own members.
  no_overload(rt.invoke_member(class, "add", &[HostValue::Number(1.0)]), "add", 1);
  no_overload(rt.invoke_member(created, "twice", &[HostValue::Number(1.0)]), "twice", 1);
  assert_eq!(rt.read_member(class, "count")?, HostValue::Undefined);
  assert!(rt.has_member(class, "create")?);
  Ok(())
}

#[test]
fn construction() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let labelled = construct(&mut rt, COUNTER, &[HostValue::string("lbl")])?;
  assert_eq!(rt.read_member(labelled, "label")?, HostValue::string("lbl"));
  assert_eq!(rt.read_member(labelled, "count")?, HostValue::Number(0.0));

  let class = class_proxy(&mut rt, COUNTER)?;
  no_overload(rt.construct(class, &[]), "<init>", 0);
  assert!(matches!(
    rt.construct(labelled, &[]),
    Err(InteropError::ClassCast(_))
  ));
  let function = class_proxy(&mut rt, FUNCTION)?;
  assert!(matches!(rt.construct(function, &[]), Err(InteropError::ClassCast(_))));

  // A type without constructors can only be built without arguments.
  let doubler = class_proxy(&mut rt, DOUBLER)?;
  assert!(rt.construct(doubler, &[])?.as_object().is_some());
  no_overload(rt.construct(doubler, &[HostValue::Number(1.0)]), "<init>", 1);
  Ok(())
}

#[test]
fn field_writes() -> Result<(), InteropError> {
  let mut rt = runtime(ExternRefBackend::new(), declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;

  rt.write_member(counter, "count", HostValue::Number(5.0))?;
  assert_eq!(rt.read_member(counter, "count")?, HostValue::Number(5.0));
  rt.write_member(counter, "label", HostValue::string("l"))?;
  assert_eq!(rt.read_member(counter, "label")?, HostValue::string("l"));
  rt.write_member(counter, "label", HostValue::Null)?;
  assert_eq!(rt.read_member(counter, "label")?, HostValue::Null);

  for bad in [HostValue::Number(5.5), HostValue::string("5"), HostValue::Null] {
    let err = rt.write_member(counter, "count", bad).unwrap_err();
    assert!(matches!(err, InteropError::ClassCast(_)), "{err}");
  }
  assert_eq!(rt.read_member(counter, "count")?, HostValue::Number(5.0));

  let err = rt
    .write_member(counter, "extra", HostValue::Number(1.0))
    .unwrap_err();
  assert!(err.to_string().contains("not extensible"), "{err}");
  assert_eq!(rt.read_member(counter, "extra")?, HostValue::Undefined);
  Ok(())
}

#[test]
fn subclasses_shadow_and_inherit() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let counter_hub = hub(&rt, COUNTER);
  let special_hub = hub(&rt, SPECIAL);
  assert!(!rt.has_method_table(counter_hub));
  assert!(!rt.has_method_table(special_hub));

  let special = construct(&mut rt, SPECIAL, &[])?;
  // Constructors are not inherited.
  let special_class = class_proxy(&mut rt, SPECIAL)?;
  no_overload(rt.construct(special_class, &[HostValue::Number(1.0)]), "<init>", 1);

  assert_eq!(
    rt.invoke_member(special, "add", &[HostValue::Number(2.0)])?,
    HostValue::BigInt(BigInt::from(20))
  );
  assert!(rt.has_method_table(special_hub));
  assert!(!rt.has_method_table(counter_hub));

  // The subclass declaration hides every inherited overload of the same name.
  no_overload(rt.invoke_member(special, "add", &[HostValue::string("x")]), "add", 1);

  assert_eq!(
    rt.invoke_member(special, "pick", &[HostValue::string("x")])?,
    HostValue::string("object")
  );
  assert!(rt.has_method_table(counter_hub));

  assert_eq!(rt.invoke_member(special, "toString", &[])?, HostValue::string("special"));
  assert_eq!(
    rt.coerce_java_proxy_to_javascript_type(&HostValue::Object(special), "string")?,
    HostValue::string("special")
  );
  Ok(())
}

#[test]
fn own_keys_list_fields_then_members() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let keys = |names: &[&str]| names.iter().map(|&name| Rc::from(name)).collect::<Vec<Rc<str>>>();

  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;
  assert_eq!(rt.own_keys(counter)?, keys(&["count", "label", "add", "pick", "echo"]));

  let special = construct(&mut rt, SPECIAL, &[])?;
  assert_eq!(
    rt.own_keys(special)?,
    keys(&["count", "label", "add", "toString", "pick", "echo"])
  );

  let class = class_proxy(&mut rt, COUNTER)?;
  assert_eq!(rt.own_keys(class)?, keys(&["create", "twice"]));
  Ok(())
}

#[test]
fn functional_types_are_callable() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let doubler = construct(&mut rt, DOUBLER, &[])?;
  let doubler_hub = hub(&rt, DOUBLER);
  assert_eq!(rt.functional_member(doubler_hub)?.as_deref(), Some("apply"));

  assert_eq!(
    rt.call(doubler, HostValue::Undefined, &[HostValue::Number(21.0)])?,
    HostValue::Number(42.0)
  );
  assert_eq!(
    rt.call_host_value(&HostValue::Object(doubler), HostValue::Undefined, &[HostValue::Number(2.0)])?,
    HostValue::Number(4.0)
  );

  let function = rt.coerce_java_proxy_to_javascript_type(&HostValue::Object(doubler), "function")?;
  assert_eq!(function.type_of(rt.realm().host()), "function");
  assert_eq!(
    rt.call_host_value(&function, HostValue::Undefined, &[HostValue::Number(5.0)])?,
    HostValue::Number(10.0)
  );

  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;
  assert!(matches!(
    rt.call(counter, HostValue::Undefined, &[]),
    Err(InteropError::ClassCast(_))
  ));
  let counter_hub = hub(&rt, COUNTER);
  assert_eq!(rt.functional_member(counter_hub)?, None);
  Ok(())
}

#[test]
fn default_members() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;
  let index = rt
    .managed_behind(&HostValue::Object(counter))?
    .expect("proxy of an instance")
    .index();
  assert_eq!(
    rt.invoke_member(counter, "toString", &[])?,
    HostValue::string(&format!("{COUNTER}@{index:x}"))
  );
  assert_eq!(rt.invoke_member(counter, "valueOf", &[])?, HostValue::Object(counter));

  let class = class_proxy(&mut rt, COUNTER)?;
  assert_eq!(
    rt.invoke_member(class, "toString", &[])?,
    HostValue::string(&format!("class {COUNTER}"))
  );
  no_overload(rt.invoke_member(counter, "missing", &[]), "missing", 0);

  let options = RuntimeOptions {
    hub_name_to_string: false,
    ..RuntimeOptions::default()
  };
  let mut rt = runtime_with_options(ClassInstanceBackend::new(), options, declare)?;
  let counter = construct(&mut rt, COUNTER, &[HostValue::Number(0.0)])?;
  assert_eq!(
    rt.invoke_member(counter, "toString", &[])?,
    HostValue::string("[object JavaObject]")
  );
  Ok(())
}

#[test]
fn non_proxies_are_rejected() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), declare)?;
  let plain = rt.realm_mut().host_mut().alloc_object();
  assert!(matches!(rt.read_member(plain, "x"), Err(InteropError::ClassCast(_))));
  assert!(matches!(
    rt.invoke_member(plain, "toString", &[]),
    Err(InteropError::ClassCast(_))
  ));
  assert!(matches!(
    rt.call_host_value(&HostValue::Object(plain), HostValue::Undefined, &[]),
    Err(InteropError::ClassCast(_))
  ));
  Ok(())
}

#[test]
fn malformed_exports_are_fatal() -> Result<(), InteropError> {
  let mut rt = runtime(ClassInstanceBackend::new(), |types| {
    let object = common::object(types);
    let broken = types.class("demo.Broken", Some(object), &[])?;
    types.export(broken, "not a member symbol", managed(|_, _, _| Ok(Value::Null)))?;
    let misattributed = types.class("demo.Misattributed", Some(object), &[])?;
    let symbol = format!("__interop$i${}$stray$v$", object.0);
    types.export(misattributed, &symbol, managed(|_, _, _| Ok(Value::Null)))?;
    Ok(())
  })?;
  for name in ["demo.Broken", "demo.Misattributed"] {
    let proxy = construct(&mut rt, name, &[])?;
    let err = rt.invoke_member(proxy, "anything", &[]).unwrap_err();
    assert!(err.is_fatal(), "{name}: {err}");
  }
  Ok(())
}
