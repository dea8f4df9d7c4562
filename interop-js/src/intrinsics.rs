use crate::builder::TypeTableBuilder;
use crate::hub::{HubId, TypeTable};
use crate::value::JavaKind;
use crate::InteropError;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const NUMBER: &str = "java.lang.Number";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const EXCEPTION: &str = "java.lang.Exception";
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
pub const CLASS_CAST_EXCEPTION: &str = "java.lang.ClassCastException";

pub const JS_VALUE: &str = "org.graalvm.webimage.api.JSValue";
pub const JS_BOOLEAN: &str = "org.graalvm.webimage.api.JSBoolean";
pub const JS_NUMBER: &str = "org.graalvm.webimage.api.JSNumber";
pub const JS_BIGINT: &str = "org.graalvm.webimage.api.JSBigInt";
pub const JS_STRING: &str = "org.graalvm.webimage.api.JSString";
pub const JS_SYMBOL: &str = "org.graalvm.webimage.api.JSSymbol";
pub const JS_OBJECT: &str = "org.graalvm.webimage.api.JSObject";
pub const JS_UNDEFINED: &str = "org.graalvm.webimage.api.JSUndefined";
pub const JS_ERROR: &str = "org.graalvm.webimage.api.JSError";

/// Message field of every throwable.
pub const DETAIL_MESSAGE_FIELD: &str = "detailMessage";
/// Field of a `JSError` holding the converted host value that was thrown.
pub const THROWN_OBJECT_FIELD: &str = "thrownObject";

/// The array type name for an element kind (`int[]`, `java.lang.Object[]`, ...).
pub fn array_name(kind: JavaKind) -> String {
  format!("{}[]", kind.java_name())
}

/// Declares every well-known type into `builder`.
pub(crate) fn declare(builder: &mut TypeTableBuilder) -> Result<(), InteropError> {
  for kind in JavaKind::PRIMITIVES {
    builder.primitive(kind)?;
  }
  let object = builder.class(OBJECT, None, &[])?;
  builder.class(STRING, Some(object), &[])?;
  builder.class(CLASS, Some(object), &[])?;
  let number = builder.class(NUMBER, Some(object), &[])?;
  for kind in JavaKind::PRIMITIVES {
    let Some(box_name) = kind.box_name() else {
      continue;
    };
    let parent = match kind {
      JavaKind::Boolean | JavaKind::Char => object,
      _ => number,
    };
    builder.class(box_name, Some(parent), &[])?;
  }

  let throwable = builder.class(THROWABLE, Some(object), &[])?;
  builder.field(throwable, DETAIL_MESSAGE_FIELD, JavaKind::Object)?;
  let exception = builder.class(EXCEPTION, Some(throwable), &[])?;
  let runtime_exception = builder.class(RUNTIME_EXCEPTION, Some(exception), &[])?;
  builder.class(CLASS_CAST_EXCEPTION, Some(runtime_exception), &[])?;
  let js_error = builder.class(JS_ERROR, Some(runtime_exception), &[])?;
  builder.field(js_error, THROWN_OBJECT_FIELD, JavaKind::Object)?;

  let js_value = builder.class(JS_VALUE, Some(object), &[])?;
  for name in [
    JS_BOOLEAN,
    JS_NUMBER,
    JS_BIGINT,
    JS_STRING,
    JS_SYMBOL,
    JS_OBJECT,
    JS_UNDEFINED,
  ] {
    builder.class(name, Some(js_value), &[])?;
  }

  for kind in JavaKind::PRIMITIVES.into_iter().chain([JavaKind::Object]) {
    builder.array(&array_name(kind), kind)?;
  }
  Ok(())
}

/// Hub ids of the well-known types, resolved once when a realm is created.
#[derive(Clone, Debug)]
pub struct Intrinsics {
  pub object: HubId,
  pub string: HubId,
  pub class: HubId,
  pub number: HubId,
  pub throwable: HubId,
  pub runtime_exception: HubId,
  pub class_cast_exception: HubId,
  pub js_value: HubId,
  pub js_boolean: HubId,
  pub js_number: HubId,
  pub js_bigint: HubId,
  pub js_string: HubId,
  pub js_symbol: HubId,
  pub js_object: HubId,
  pub js_undefined: HubId,
  pub js_error: HubId,
  /// Indexed by [`JavaKind::ordinal`].
  primitives: [HubId; 8],
  boxes: [HubId; 8],
  /// Indexed by [`JavaKind::ordinal`], including `Object`.
  arrays: [HubId; 9],
}

impl Intrinsics {
  /// Looks up every well-known type in `types`.
  ///
  /// A missing type means the table was not linked with the runtime's intrinsics, which is an
  /// invariant violation.
  pub fn resolve(types: &TypeTable) -> Result<Self, InteropError> {
    let get = |name: &str| {
      types
        .lookup(name)
        .ok_or_else(|| InteropError::should_not_reach_here(format!("missing intrinsic type {name}")))
    };
    let mut primitives = [HubId(0); 8];
    let mut boxes = [HubId(0); 8];
    let mut arrays = [HubId(0); 9];
    for kind in JavaKind::PRIMITIVES {
      let i = kind.ordinal() as usize;
      primitives[i] = get(kind.java_name())?;
      if let Some(box_name) = kind.box_name() {
        boxes[i] = get(box_name)?;
      }
      arrays[i] = get(&array_name(kind))?;
    }
    arrays[JavaKind::Object.ordinal() as usize] = get(&array_name(JavaKind::Object))?;

    Ok(Self {
      object: get(OBJECT)?,
      string: get(STRING)?,
      class: get(CLASS)?,
      number: get(NUMBER)?,
      throwable: get(THROWABLE)?,
      runtime_exception: get(RUNTIME_EXCEPTION)?,
      class_cast_exception: get(CLASS_CAST_EXCEPTION)?,
      js_value: get(JS_VALUE)?,
      js_boolean: get(JS_BOOLEAN)?,
      js_number: get(JS_NUMBER)?,
      js_bigint: get(JS_BIGINT)?,
      js_string: get(JS_STRING)?,
      js_symbol: get(JS_SYMBOL)?,
      js_object: get(JS_OBJECT)?,
      js_undefined: get(JS_UNDEFINED)?,
      js_error: get(JS_ERROR)?,
      primitives,
      boxes,
      arrays,
    })
  }

  /// The hub of a primitive kind. `None` for [`JavaKind::Object`].
  pub fn primitive(&self, kind: JavaKind) -> Option<HubId> {
    kind.is_primitive().then(|| self.primitives[kind.ordinal() as usize])
  }

  /// The box type of a primitive kind. `None` for [`JavaKind::Object`].
  pub fn box_of(&self, kind: JavaKind) -> Option<HubId> {
    kind.is_primitive().then(|| self.boxes[kind.ordinal() as usize])
  }

  /// The primitive kind a box type wraps.
  pub fn unboxed_kind(&self, hub: HubId) -> Option<JavaKind> {
    JavaKind::PRIMITIVES
      .into_iter()
      .find(|kind| self.boxes[kind.ordinal() as usize] == hub)
  }

  pub fn array_of(&self, kind: JavaKind) -> HubId {
    self.arrays[kind.ordinal() as usize]
  }
}
