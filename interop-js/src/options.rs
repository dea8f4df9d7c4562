use crate::value::JavaKind;
use crate::InteropError;
use serde::{Deserialize, Serialize};

/// Byte order used for primitive array storage and sub-width unsafe accesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
  #[default]
  Little,
  Big,
}

/// Runtime configuration.
///
/// Every field has a default, so a JSON document only needs to name the settings it changes:
///
/// ```
/// # use interop_js::{Endianness, RuntimeOptions};
/// let options = RuntimeOptions::from_json(r#"{ "endianness": "big" }"#).unwrap();
/// assert_eq!(options.endianness, Endianness::Big);
/// assert!(options.hub_name_to_string);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RuntimeOptions {
  pub endianness: Endianness,
  /// Longest string (in UTF-16 code units) converted from the host into a managed string.
  pub max_string_length: usize,
  /// Whether the default `toString` of a proxy reports `<type name>@<hex index>`. When disabled it
  /// reports `[object JavaObject]`.
  pub hub_name_to_string: bool,
}

impl Default for RuntimeOptions {
  fn default() -> Self {
    Self {
      endianness: Endianness::Little,
      // Matches the largest string V8 will allocate on 64-bit targets.
      max_string_length: (1 << 29) - 24,
      hub_name_to_string: true,
    }
  }
}

impl RuntimeOptions {
  pub fn from_json(json: &str) -> Result<Self, InteropError> {
    Ok(serde_json::from_str(json)?)
  }
}

/// A serialized description of the types to link, consumed by
/// [`TypeTableBuilder::from_manifest`](crate::TypeTableBuilder::from_manifest).
///
/// Exported members carry callables and are attached in code after loading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeManifest {
  #[serde(default)]
  pub types: Vec<TypeDecl>,
}

impl TypeManifest {
  pub fn from_json(json: &str) -> Result<Self, InteropError> {
    Ok(serde_json::from_str(json)?)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
  Class,
  Interface,
  Array,
}

/// One type of a [`TypeManifest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeDecl {
  pub name: String,
  pub kind: DeclKind,
  /// Superclass of a class; defaults to `java.lang.Object` when that type exists.
  #[serde(default)]
  pub super_type: Option<String>,
  /// Implemented interfaces of a class, or super-interfaces of an interface.
  #[serde(default)]
  pub interfaces: Vec<String>,
  #[serde(default)]
  pub fields: Vec<FieldDecl>,
  /// Element kind of an array type.
  #[serde(default)]
  pub component: Option<JavaKind>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
  pub name: String,
  pub kind: JavaKind,
}
