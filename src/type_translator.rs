//! The type-to-target-type translator (4.B): a total function from a
//! structural [`Type`] to a target-language type string, plus
//! `canonical_mangle`, the deterministic identifier-legalising function
//! named by §6/§9.
//!
//! Grounded on the teacher crate's `codegen::util::convert_our_type_to_llvm_basic_metadata_type`:
//! a single exhaustive match from the crate's own `Type` to a target
//! representation, with an explicit "can't happen here" branch for the
//! cases the target has no representation for. That function panics on
//! the unrepresentable cases; this one returns `CoreError::UnhandledType`
//! instead, since unlike LLVM codegen this translator is expected to run
//! on attacker-controlled contract source and must fail, not crash.

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Location, Type};
use crate::error::CoreError;

/// Integer widths above this many bits no longer fit in a single felt and
/// are represented as `Uint256` instead (4.B).
const MAX_FELT_BITS: u16 = 251;

/// Translate an input-language type into its target-language
/// representation. Total over every `Type` variant this core constructs;
/// `UnhandledType` is the wildcard for anything a future variant might add.
pub fn cairo_type(ty: &Type) -> Result<String, CoreError> {
    match ty {
        Type::Int { bits, .. } if *bits <= MAX_FELT_BITS => Ok("felt".to_string()),
        Type::Int { .. } => Ok("Uint256".to_string()),
        Type::Bool | Type::Address | Type::String => Ok("felt".to_string()),
        Type::Bytes => Ok("felt*".to_string()),
        Type::Array { element, .. } => Ok(format!("{}*", cairo_type(element)?)),
        Type::Mapping { key, value } => {
            Ok(format!("{} => {}", cairo_type(key)?, cairo_type(value)?))
        }
        Type::Function { .. } => Ok("felt*".to_string()),
        Type::Pointer { pointee, .. } => cairo_type(pointee),
        Type::Tuple(elements) => {
            let rendered = elements
                .iter()
                .map(cairo_type)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({})", rendered.join(", ")))
        }
        Type::Builtin(name) | Type::BuiltinStruct(name) => Ok(canonical_mangle(name)),
        Type::UserDefined { name, .. } => Ok(canonical_mangle(name)),
    }
}

/// Regex of characters that are not legal in a target-language identifier.
/// Anything matched is rewritten to `_`, deterministically and without
/// collapsing runs, so `canonical_mangle` stays a pure function of its
/// input (4.B).
fn illegal_identifier_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern is valid"))
}

/// Rewrite punctuation that is illegal in target identifiers into
/// underscores. Must be a pure, deterministic function of `name` — the
/// utility-function registry relies on identical inputs mangling to
/// identical outputs (4.E's memoisation invariant).
pub fn canonical_mangle(name: &str) -> String {
    illegal_identifier_chars().replace_all(name, "_").into_owned()
}

/// Renders a [`Location`] the way diagnostic messages quote it; pointers
/// themselves are erased by the translator (4.B) but the location is still
/// useful in error text.
pub fn location_name(location: Location) -> &'static str {
    match location {
        Location::Storage => "storage",
        Location::Memory => "memory",
        Location::Calldata => "calldata",
        Location::Default => "default",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Location;

    #[test]
    fn small_ints_are_felt() {
        assert_eq!(cairo_type(&Type::int(8, false)).unwrap(), "felt");
        assert_eq!(cairo_type(&Type::int(251, true)).unwrap(), "felt");
    }

    #[test]
    fn wide_ints_are_uint256() {
        assert_eq!(cairo_type(&Type::int(256, false)).unwrap(), "Uint256");
    }

    #[test]
    fn bool_address_string_are_felt() {
        assert_eq!(cairo_type(&Type::Bool).unwrap(), "felt");
        assert_eq!(cairo_type(&Type::Address).unwrap(), "felt");
        assert_eq!(cairo_type(&Type::String).unwrap(), "felt");
    }

    #[test]
    fn array_of_bytes_like_is_pointer() {
        let ty = Type::array(Type::int(8, false), None);
        assert_eq!(cairo_type(&ty).unwrap(), "felt*");
    }

    #[test]
    fn pointer_to_array_of_bool_is_pointer_to_felt() {
        let ty = Type::pointer(Type::array(Type::Bool, None), Location::Memory);
        assert_eq!(cairo_type(&ty).unwrap(), "felt*");
    }

    #[test]
    fn mapping_renders_for_diagnostics() {
        let ty = Type::mapping(Type::int(256, false), Type::Bool);
        assert_eq!(cairo_type(&ty).unwrap(), "Uint256 => felt");
    }

    #[test]
    fn canonical_mangle_rewrites_punctuation() {
        assert_eq!(canonical_mangle("Foo.Bar[]"), "Foo_Bar__");
        assert_eq!(canonical_mangle("plain_name"), "plain_name");
    }

    #[test]
    fn canonical_mangle_is_deterministic() {
        let name = "Weird$Name::Here";
        assert_eq!(canonical_mangle(name), canonical_mangle(name));
    }
}
