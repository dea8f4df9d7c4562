//! Exported member metadata.
//!
//! The compiler exports every callable member under a mangled symbol:
//!
//! ```text
//! __interop$<flag>$<owner>$<member>$<return>$<param>_<param>_...
//! ```
//!
//! - `flag` is `i` (instance member), `s` (static member) or `f` (the single abstract method of a
//!   functional type; also callable as an instance member);
//! - `owner` is the decimal hub id of the declaring type;
//! - `member` is the member name, `<init>` for constructors; it may itself contain `$`;
//! - `return` is `v` (void), `*` (any) or a decimal hub id;
//! - parameters are decimal hub ids or `*` (accepts anything), separated by `_`, and empty for a
//!   nullary member.
//!
//! Decoding failures mean the exported surface is corrupt and are reported as
//! [`InteropError::ShouldNotReachHere`].

use crate::hub::HubId;
use crate::InteropError;
use std::fmt::Write;
use std::rc::Rc;

pub const SYMBOL_PREFIX: &str = "__interop$";
/// Member name of constructor overloads.
pub const CONSTRUCTOR_NAME: &str = "<init>";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberFlag {
  Instance,
  Static,
  Functional,
}

impl MemberFlag {
  fn code(self) -> char {
    match self {
      MemberFlag::Instance => 'i',
      MemberFlag::Static => 's',
      MemberFlag::Functional => 'f',
    }
  }

  #[inline]
  pub fn is_static(self) -> bool {
    self == MemberFlag::Static
  }
}

/// Declared return type of a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnType {
  Void,
  /// Untyped; the returned value is converted as-is.
  Any,
  Hub(HubId),
}

/// A decoded member symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberSignature {
  pub flag: MemberFlag,
  pub owner: HubId,
  pub name: Rc<str>,
  pub ret: ReturnType,
  /// `None` marks a wildcard parameter.
  pub params: Vec<Option<HubId>>,
}

fn malformed(symbol: &str, what: &str) -> InteropError {
  InteropError::should_not_reach_here(format!("malformed member symbol `{symbol}`: {what}"))
}

fn parse_hub_id(symbol: &str, raw: &str) -> Result<HubId, InteropError> {
  raw
    .parse::<u32>()
    .map(HubId)
    .map_err(|_| malformed(symbol, "bad type id"))
}

fn parse_type_ref(symbol: &str, raw: &str) -> Result<Option<HubId>, InteropError> {
  if raw == "*" {
    Ok(None)
  } else {
    parse_hub_id(symbol, raw).map(Some)
  }
}

pub fn decode_member_symbol(symbol: &str) -> Result<MemberSignature, InteropError> {
  let rest = symbol
    .strip_prefix(SYMBOL_PREFIX)
    .ok_or_else(|| malformed(symbol, "missing prefix"))?;
  let (flag, rest) = rest
    .split_once('$')
    .ok_or_else(|| malformed(symbol, "missing flag"))?;
  let flag = match flag {
    "i" => MemberFlag::Instance,
    "s" => MemberFlag::Static,
    "f" => MemberFlag::Functional,
    _ => return Err(malformed(symbol, "unknown flag")),
  };
  let (owner, rest) = rest
    .split_once('$')
    .ok_or_else(|| malformed(symbol, "missing owner"))?;
  let owner = parse_hub_id(symbol, owner)?;

  // The member name may contain `$`, so the return type and parameters are taken from the end.
  let mut tail = rest.rsplitn(3, '$');
  let params = tail.next().ok_or_else(|| malformed(symbol, "missing parameters"))?;
  let ret = tail.next().ok_or_else(|| malformed(symbol, "missing return type"))?;
  let name = tail.next().ok_or_else(|| malformed(symbol, "missing member name"))?;
  if name.is_empty() {
    return Err(malformed(symbol, "empty member name"));
  }
  let ret = match ret {
    "v" => ReturnType::Void,
    "*" => ReturnType::Any,
    raw => ReturnType::Hub(parse_hub_id(symbol, raw)?),
  };
  let params = if params.is_empty() {
    Vec::new()
  } else {
    params
      .split('_')
      .map(|raw| parse_type_ref(symbol, raw))
      .collect::<Result<Vec<_>, _>>()?
  };

  Ok(MemberSignature {
    flag,
    owner,
    name: Rc::from(name),
    ret,
    params,
  })
}

pub fn encode_member_symbol(sig: &MemberSignature) -> String {
  let mut out = String::from(SYMBOL_PREFIX);
  let _ = write!(out, "{}${}${}$", sig.flag.code(), sig.owner.0, sig.name);
  match sig.ret {
    ReturnType::Void => out.push('v'),
    ReturnType::Any => out.push('*'),
    ReturnType::Hub(hub) => {
      let _ = write!(out, "{}", hub.0);
    }
  }
  out.push('$');
  for (i, param) in sig.params.iter().enumerate() {
    if i > 0 {
      out.push('_');
    }
    match param {
      Some(hub) => {
        let _ = write!(out, "{}", hub.0);
      }
      None => out.push('*'),
    }
  }
  out
}
