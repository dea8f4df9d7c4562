//! Runtime support for ahead-of-time compiled Java code running inside a JavaScript host.
//!
//! Compiled code and the host meet at a boundary that this crate manages. It provides:
//! - 64-bit integer emulation ([`Long64`]) for hosts whose native number is a double
//! - Raw memory access over managed instances by byte offset ([`Realm::unsafe_load`] and friends)
//! - O(1) range-encoded subtype checks ([`is_subtype`], [`Realm::is_instance`])
//! - Value conversion in both directions, generic over a [`Backend`] ([`ClassInstanceBackend`],
//!   [`ExternRefBackend`])
//! - Reflective dispatch from host code into exported managed members ([`ProxyOps`])
//! - Startup probing of optional host facilities ([`CapabilityProbe`], [`HostHooks`])
//!
//! # Initialization
//!
//! Everything hangs off one explicitly constructed [`Runtime`]:
//!
//! ```
//! use interop_js::{ClassInstanceBackend, HostValue, Runtime, RuntimeOptions, TypeTableBuilder};
//!
//! let types = TypeTableBuilder::with_intrinsics()?.build()?;
//! let mut rt = Runtime::new(types, RuntimeOptions::default(), ClassInstanceBackend::new())?;
//! let value = rt.javascript_to_java(&HostValue::Number(42.0))?;
//! assert_eq!(rt.java_to_javascript(value)?, HostValue::Number(42.0));
//! # Ok::<(), interop_js::InteropError>(())
//! ```
//!
//! # Errors
//!
//! [`InteropError`] separates contract violations by generated code (never handled, see
//! [`InteropError::is_fatal`]) from cast failures and exceptions, which both sides may catch.
//!
//! # Threading
//!
//! The runtime is single-threaded: caches are built lazily behind `Rc` and `OnceCell`, and
//! [`Runtime`] is neither `Send` nor `Sync`.

mod builder;
mod capability;
pub mod convert;
mod error;
mod handle;
mod heap;
mod host;
mod hub;
mod intrinsics;
mod long;
mod memory;
mod options;
pub mod proxy;
mod realm;
mod runtime;
mod type_check;
mod value;

pub use crate::builder::TypeTableBuilder;
pub use crate::builder::ARRAY_BASE_OFFSET;
pub use crate::builder::OBJECT_HEADER_SIZE;
pub use crate::capability::Capability;
pub use crate::capability::CapabilityHandle;
pub use crate::capability::CapabilityProbe;
pub use crate::capability::Deferred;
pub use crate::capability::FetchService;
pub use crate::capability::FileSystemService;
pub use crate::capability::HostHooks;
pub use crate::capability::ProcessService;
pub use crate::convert::Backend;
pub use crate::convert::ClassInstanceBackend;
pub use crate::convert::ExternRefBackend;
pub use crate::convert::HostClass;
pub use crate::convert::TypeDescriptor;
pub use crate::error::ErrorClass;
pub use crate::error::InteropError;
pub use crate::error::Thrown;
pub use crate::handle::ExternRef;
pub use crate::handle::HostObject;
pub use crate::handle::HostSymbol;
pub use crate::handle::ObjRef;
pub use crate::heap::Instance;
pub use crate::heap::InstanceData;
pub use crate::heap::JsPayload;
pub use crate::heap::ManagedHeap;
pub use crate::host::Hidden;
pub use crate::host::HostFn;
pub use crate::host::HostHeap;
pub use crate::host::HostObjectKind;
pub use crate::host::HostValue;
pub use crate::host::TypedArrayKind;
pub use crate::hub::ExportedMember;
pub use crate::hub::FieldDesc;
pub use crate::hub::Hub;
pub use crate::hub::HubId;
pub use crate::hub::Layout;
pub use crate::hub::ManagedFn;
pub use crate::hub::TypeCheckRange;
pub use crate::hub::TypeKind;
pub use crate::hub::TypeTable;
pub use crate::intrinsics::array_name;
pub use crate::intrinsics::Intrinsics;
pub use crate::long::double_bits_to_long;
pub use crate::long::float_bits_to_int;
pub use crate::long::int_bits_to_float;
pub use crate::long::long_bits_to_double;
pub use crate::long::Long64;
pub use crate::options::DeclKind;
pub use crate::options::Endianness;
pub use crate::options::FieldDecl;
pub use crate::options::RuntimeOptions;
pub use crate::options::TypeDecl;
pub use crate::options::TypeManifest;
pub use crate::proxy::metadata::MemberFlag;
pub use crate::proxy::metadata::ReturnType;
pub use crate::proxy::ProxyOps;
pub use crate::realm::Realm;
pub use crate::runtime::ClassInstanceRuntime;
pub use crate::runtime::ExternRefRuntime;
pub use crate::runtime::Interop;
pub use crate::runtime::Runtime;
pub use crate::type_check::is_subtype;
pub use crate::value::JavaKind;
pub use crate::value::Value;

/// Fully qualified names of the types every runtime relies on.
pub mod names {
  pub use crate::intrinsics::{
    CLASS, CLASS_CAST_EXCEPTION, DETAIL_MESSAGE_FIELD, EXCEPTION, JS_BIGINT, JS_BOOLEAN,
    JS_ERROR, JS_NUMBER, JS_OBJECT, JS_STRING, JS_SYMBOL, JS_UNDEFINED, JS_VALUE, NUMBER, OBJECT,
    RUNTIME_EXCEPTION, STRING, THROWABLE, THROWN_OBJECT_FIELD,
  };
}
