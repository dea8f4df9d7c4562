#![allow(dead_code)]

use interop_js::names;
use interop_js::{
  Backend, HubId, Interop, InteropError, JavaKind, ManagedFn, ObjRef, Runtime, RuntimeOptions, TypeTableBuilder,
  Value,
};
use std::rc::Rc;

pub fn managed(
  f: impl Fn(&mut dyn Interop, Option<ObjRef>, &[Value]) -> Result<Value, InteropError> + 'static,
) -> ManagedFn {
  Rc::new(f)
}

/// A runtime over the intrinsic types plus whatever `declare` adds.
pub fn runtime<B: Backend>(
  backend: B,
  declare: impl FnOnce(&mut TypeTableBuilder) -> Result<(), InteropError>,
) -> Result<Runtime<B>, InteropError> {
  runtime_with_options(backend, RuntimeOptions::default(), declare)
}

pub fn runtime_with_options<B: Backend>(
  backend: B,
  options: RuntimeOptions,
  declare: impl FnOnce(&mut TypeTableBuilder) -> Result<(), InteropError>,
) -> Result<Runtime<B>, InteropError> {
  let mut builder = TypeTableBuilder::with_intrinsics()?;
  declare(&mut builder)?;
  Runtime::new(builder.build()?, options, backend)
}

pub fn lookup(builder: &TypeTableBuilder, name: &str) -> HubId {
  builder
    .lookup(name)
    .unwrap_or_else(|| panic!("{name} should be declared"))
}

pub fn object(builder: &TypeTableBuilder) -> HubId {
  lookup(builder, names::OBJECT)
}

pub fn string(builder: &TypeTableBuilder) -> HubId {
  lookup(builder, names::STRING)
}

pub fn primitive(builder: &TypeTableBuilder, kind: JavaKind) -> HubId {
  lookup(builder, kind.java_name())
}

/// A managed string result, for member bodies.
pub fn string_result(rt: &mut dyn Interop, value: &str) -> Result<Value, InteropError> {
  Ok(Value::Ref(rt.realm_mut().alloc_string(value)?))
}

/// The contents of a managed string argument.
pub fn string_arg(rt: &dyn Interop, value: Value) -> String {
  let obj = value.as_obj().expect("string argument should be a reference");
  rt.realm()
    .string_value(obj)
    .expect("argument should be live")
    .expect("argument should be a java.lang.String")
    .to_string()
}
