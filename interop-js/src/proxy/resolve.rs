use super::table::MemberCall;
use crate::convert::Backend;
use crate::host::HostValue;
use crate::value::Value;
use crate::{InteropError, Runtime};
use std::rc::Rc;
use tracing::{debug_span, trace};

impl<B: Backend> Runtime<B> {
  /// Whether `overload` accepts `args`. Nothing is allocated, so rejected candidates leave no
  /// garbage behind.
  ///
  /// Arity must match exactly. Wildcard parameters accept anything.
  pub(crate) fn conforms(&mut self, overload: &MemberCall, args: &[Value]) -> Result<bool, InteropError> {
    if overload.params.len() != args.len() {
      return Ok(false);
    }
    for (&param, &arg) in overload.params.iter().zip(args) {
      if let Some(param) = param {
        if !self.conforms_to_hub(arg, param)? {
          return Ok(false);
        }
      }
    }
    Ok(true)
  }

  /// The arguments adapted to the parameters of an overload that [`Runtime::conforms`] accepted.
  fn adapt_arguments(&mut self, overload: &MemberCall, args: &[Value]) -> Result<Vec<Value>, InteropError> {
    let mut adapted = Vec::with_capacity(args.len());
    for (&param, &arg) in overload.params.iter().zip(args) {
      let value = match param {
        Some(param) => self
          .adapt_to_hub(arg, param)?
          .ok_or_else(|| InteropError::should_not_reach_here("conforming argument failed to adapt"))?,
        None => arg,
      };
      adapted.push(value);
    }
    Ok(adapted)
  }

  /// Picks the first overload, in declaration order, that accepts `args`.
  ///
  /// Overloads are not ranked by specificity: with `f(Object)` declared before `f(String)`, a string
  /// argument always selects `f(Object)`.
  pub(crate) fn select_overload(
    &mut self,
    member: &str,
    overloads: &[Rc<MemberCall>],
    args: &[HostValue],
  ) -> Result<(Rc<MemberCall>, Vec<Value>), InteropError> {
    let _span = debug_span!("resolve_overload", member, candidates = overloads.len(), argc = args.len()).entered();
    let converted = args
      .iter()
      .map(|arg| self.javascript_to_java(arg))
      .collect::<Result<Vec<_>, _>>()?;
    for (index, overload) in overloads.iter().enumerate() {
      if self.conforms(overload, &converted)? {
        trace!(index, "overload selected");
        let adapted = self.adapt_arguments(overload, &converted)?;
        return Ok((overload.clone(), adapted));
      }
    }
    Err(InteropError::NoConformingOverload {
      member: member.to_string(),
      argc: args.len(),
    })
  }
}
