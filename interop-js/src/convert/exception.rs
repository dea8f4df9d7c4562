use super::{to_managed, Backend};
use crate::error::{ErrorClass, Thrown};
use crate::host::HostValue;
use crate::intrinsics;
use crate::value::Value;
use crate::{InteropError, ObjRef, Realm, Runtime};
use tracing::debug;

/// Wraps an arbitrary thrown host value into a fresh `JSError`, keeping the converted value in its
/// `thrownObject` field and the error message (if any) as the detail message.
pub(super) fn wrap_thrown_value<B: Backend + ?Sized>(
  backend: &mut B,
  realm: &mut Realm,
  thrown: HostValue,
) -> Result<ObjRef, InteropError> {
  let message = match &thrown {
    HostValue::Object(obj) => realm.host().error_message(*obj)?,
    HostValue::String(s) => Some(s.clone()),
    _ => None,
  };
  let payload = to_managed(backend, realm, &thrown)?;
  let js_error = realm.intrinsics().js_error;
  let error = realm.alloc_throwable(js_error, message.as_deref())?;
  realm.set_field(error, intrinsics::THROWN_OBJECT_FIELD, payload)?;
  Ok(error)
}

fn is_class_cast(err: &InteropError) -> bool {
  matches!(
    err,
    InteropError::ClassCast(_) | InteropError::NoConformingOverload { .. }
  )
}

impl<B: Backend> Runtime<B> {
  /// The host error object for a managed throwable. Stable per throwable.
  pub fn throwable_to_host(&mut self, throwable: ObjRef) -> Result<HostValue, InteropError> {
    if !self.realm.is_throwable(throwable)? {
      return Err(InteropError::should_not_reach_here("throwing a non-throwable instance"));
    }
    self.backend.wrap_error(&mut self.realm, throwable)
  }

  /// The managed throwable for a thrown host value. Errors that originated as managed throwables
  /// come back as the original throwable; anything else is wrapped in a `JSError`.
  pub fn host_error_to_managed(&mut self, thrown: HostValue) -> Result<ObjRef, InteropError> {
    self.backend.unwrap_error(&mut self.realm, thrown)
  }

  /// The value held by a `JSError`, converted back for the host.
  pub fn js_error_thrown_value(&mut self, error: ObjRef) -> Result<HostValue, InteropError> {
    let payload = self.realm.get_field(error, intrinsics::THROWN_OBJECT_FIELD)?;
    self.java_to_javascript(payload)
  }

  /// Prepares an error raised on the managed side for the host.
  ///
  /// Managed exceptions become [`Thrown::Host`] error objects, and failed casts or overload
  /// lookups become host `ClassCastException` errors. Everything else passes through untouched.
  pub fn into_host_error(&mut self, err: InteropError) -> InteropError {
    let converted = match err.class() {
      ErrorClass::InvariantViolation => return err,
      ErrorClass::Exception => match err {
        InteropError::Throw(Thrown::Managed(throwable)) => self.throwable_to_host(throwable),
        other => return other,
      },
      ErrorClass::CastFailure if is_class_cast(&err) => self.class_cast_exception(&err.to_string()),
      ErrorClass::CastFailure => return err,
    };
    match converted {
      Ok(value) => InteropError::Throw(Thrown::Host(value)),
      Err(err) => err,
    }
  }

  /// Prepares an error raised on the host side for managed code, the mirror of
  /// [`Runtime::into_host_error`].
  pub fn into_managed_error(&mut self, err: InteropError) -> InteropError {
    let converted = match err.class() {
      ErrorClass::InvariantViolation => return err,
      ErrorClass::Exception => match err {
        InteropError::Throw(Thrown::Host(value)) => self.host_error_to_managed(value),
        other => return other,
      },
      ErrorClass::CastFailure if is_class_cast(&err) => {
        let hub = self.realm.intrinsics().class_cast_exception;
        self.realm.alloc_throwable(hub, Some(&err.to_string()))
      }
      ErrorClass::CastFailure => return err,
    };
    match converted {
      Ok(throwable) => InteropError::Throw(Thrown::Managed(throwable)),
      Err(err) => err,
    }
  }

  fn class_cast_exception(&mut self, message: &str) -> Result<HostValue, InteropError> {
    let hub = self.realm.intrinsics().class_cast_exception;
    let throwable = self.realm.alloc_throwable(hub, Some(message))?;
    self.throwable_to_host(throwable)
  }

  /// Calls a host function from managed code.
  ///
  /// Arguments and the result are converted; a host exception surfaces as
  /// [`Thrown::Managed`] so that managed code can catch it.
  pub fn call_host_function(
    &mut self,
    func: &HostValue,
    this: &HostValue,
    args: &[Value],
  ) -> Result<Value, InteropError> {
    let host_args = args
      .iter()
      .map(|&arg| self.java_to_javascript(arg))
      .collect::<Result<Vec<_>, _>>()?;
    match self.call_host_value(func, this.clone(), &host_args) {
      Ok(result) => self.javascript_to_java(&result),
      Err(err) => {
        debug!(error = %err, "host call failed");
        Err(self.into_managed_error(err))
      }
    }
  }
}
