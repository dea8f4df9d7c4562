use crate::host::HostValue;
use crate::ObjRef;
use std::fmt::Display;
use tracing::error;

/// Errors produced at the language boundary.
///
/// The variants fall into three classes (see [`ErrorClass`]): invariant violations that indicate a
/// code-generation bug upstream, cast/coercion failures that callers are expected to handle, and
/// exceptions crossing the boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InteropError {
  /// Generated code violated a contract this layer relies on (out-of-bounds unsafe access,
  /// malformed metadata, a missing intrinsic type, ...). Not recoverable.
  #[error("should not reach here: {0}")]
  ShouldNotReachHere(String),

  /// A backend was asked to handle a representation it does not own.
  #[error("unimplemented: {0}")]
  Unimplemented(&'static str),

  /// A value could not be converted to the requested type or shape.
  #[error("class cast: {0}")]
  ClassCast(String),

  /// No overload of a member accepted the supplied arguments.
  #[error("no overload of `{member}` accepts {argc} argument(s) of the given types")]
  NoConformingOverload { member: String, argc: usize },

  /// A host hook was called but the capability backing it was not detected.
  #[error("unsupported: {0}")]
  Unsupported(&'static str),

  /// A conversion would exceed a configured limit.
  #[error("limit exceeded: got {got}, max {max}")]
  LimitExceeded { got: usize, max: usize },

  /// Runtime options or a type manifest failed to load.
  #[error("invalid configuration: {0}")]
  Config(String),

  /// An exception value. Catchable on both sides of the boundary.
  #[error("uncaught exception")]
  Throw(Thrown),
}

/// An exception value in flight, tagged with the side of the boundary it currently lives on.
#[derive(Debug, Clone, PartialEq)]
pub enum Thrown {
  /// A managed throwable instance.
  Managed(ObjRef),
  /// A host value passed to `throw`.
  Host(HostValue),
}

/// Coarse classification of an [`InteropError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
  /// A defect in the compiler or its input. Report upstream; do not handle.
  InvariantViolation,
  /// An ordinary, recoverable conversion failure.
  CastFailure,
  /// An exception value crossing the boundary.
  Exception,
}

impl InteropError {
  /// Builds a [`InteropError::ShouldNotReachHere`] and logs it.
  pub fn should_not_reach_here(message: impl Into<String>) -> Self {
    let message = message.into();
    error!(target: "interop_js", %message, "invariant violation");
    Self::ShouldNotReachHere(message)
  }

  pub(crate) fn class_cast(message: impl Display) -> Self {
    Self::ClassCast(message.to_string())
  }

  pub fn class(&self) -> ErrorClass {
    match self {
      InteropError::ShouldNotReachHere(_)
      | InteropError::Unimplemented(_)
      | InteropError::Config(_) => ErrorClass::InvariantViolation,
      InteropError::ClassCast(_)
      | InteropError::NoConformingOverload { .. }
      | InteropError::Unsupported(_)
      | InteropError::LimitExceeded { .. } => ErrorClass::CastFailure,
      InteropError::Throw(_) => ErrorClass::Exception,
    }
  }

  /// Whether this error terminates the current managed call instead of being catchable.
  pub fn is_fatal(&self) -> bool {
    self.class() == ErrorClass::InvariantViolation
  }

  /// The thrown value, if this error is an exception.
  pub fn thrown(&self) -> Option<&Thrown> {
    match self {
      InteropError::Throw(thrown) => Some(thrown),
      _ => None,
    }
  }
}

impl From<serde_json::Error> for InteropError {
  fn from(err: serde_json::Error) -> Self {
    Self::Config(err.to_string())
  }
}
