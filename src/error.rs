//! Error taxonomy for the lowering core.
//!
//! Every fallible entry point in this crate returns [`CoreError`]. Each
//! variant wraps a small payload struct that implements `Display` and
//! `Error`, mirroring the teacher crate's `TypeCheckError` shape: a tagged
//! enum of error kinds, each carrying just the data needed to explain
//! itself.

use std::fmt::{self, Display};

use crate::ast::NodeId;

/// Top-level error returned by every fallible operation in this crate.
///
/// None of these are recoverable mid-pipeline: any one of them aborts the
/// running pass and is surfaced to the caller with its kind intact (see
/// `Pipeline::run`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A type node the translator does not know how to render.
    UnhandledType(UnhandledType),
    /// A construct recognised but not yet lowered.
    NotSupportedYet(NotSupportedYet),
    /// A construct deliberately excluded from this core.
    WillNotSupport(WillNotSupport),
    /// Internal lowering could not proceed on otherwise-valid input.
    TranspileFailed(TranspileFailed),
    /// An invariant expected from an earlier pass does not hold.
    AssertionFailure(AssertionFailure),
    /// Arithmetic in the rational literal engine divided by zero.
    DivisionByZero(DivisionByZero),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnhandledType(e) => e.fmt(f),
            CoreError::NotSupportedYet(e) => e.fmt(f),
            CoreError::WillNotSupport(e) => e.fmt(f),
            CoreError::TranspileFailed(e) => e.fmt(f),
            CoreError::AssertionFailure(e) => e.fmt(f),
            CoreError::DivisionByZero(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CoreError {}

/// A type node the translator does not know. Fatal to compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledType {
    pub description: String,
}

impl Display for UnhandledType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unhandled type: {}", self.description)
    }
}

/// A construct recognised but not yet lowered (e.g. a write through a
/// non-mapping pointer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSupportedYet {
    pub node: Option<NodeId>,
    pub description: String,
}

impl Display for NotSupportedYet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(id) => write!(f, "not supported yet at node {id}: {}", self.description),
            None => write!(f, "not supported yet: {}", self.description),
        }
    }
}

/// A construct deliberately excluded (e.g. an undefined index access).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillNotSupport {
    pub node: Option<NodeId>,
    pub description: String,
}

impl Display for WillNotSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(id) => write!(f, "will not support (node {id}): {}", self.description),
            None => write!(f, "will not support: {}", self.description),
        }
    }
}

/// Internal lowering cannot proceed on a valid input (a compiler gap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileFailed {
    pub node: Option<NodeId>,
    pub description: String,
}

impl Display for TranspileFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(id) => write!(f, "transpile failed at node {id}: {}", self.description),
            None => write!(f, "transpile failed: {}", self.description),
        }
    }
}

/// An invariant expected from an earlier pass is broken. Always a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub node: Option<NodeId>,
    pub description: String,
}

impl Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(id) => write!(f, "assertion failure at node {id}: {}", self.description),
            None => write!(f, "assertion failure: {}", self.description),
        }
    }
}

/// The rational literal engine was asked to construct or divide by a
/// zero-numerator rational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionByZero;

impl Display for DivisionByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "division by zero")
    }
}

impl CoreError {
    pub fn unhandled_type(description: impl ToString) -> Self {
        CoreError::UnhandledType(UnhandledType {
            description: description.to_string(),
        })
    }

    pub fn not_supported_yet(node: Option<NodeId>, description: impl ToString) -> Self {
        CoreError::NotSupportedYet(NotSupportedYet {
            node,
            description: description.to_string(),
        })
    }

    pub fn will_not_support(node: Option<NodeId>, description: impl ToString) -> Self {
        CoreError::WillNotSupport(WillNotSupport {
            node,
            description: description.to_string(),
        })
    }

    pub fn transpile_failed(node: Option<NodeId>, description: impl ToString) -> Self {
        CoreError::TranspileFailed(TranspileFailed {
            node,
            description: description.to_string(),
        })
    }

    pub fn assertion_failure(node: Option<NodeId>, description: impl ToString) -> Self {
        CoreError::AssertionFailure(AssertionFailure {
            node,
            description: description.to_string(),
        })
    }

    pub fn division_by_zero() -> Self {
        CoreError::DivisionByZero(DivisionByZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_node_id() {
        let err = CoreError::not_supported_yet(Some(NodeId::from_raw(3)), "write to pointer");
        assert_eq!(
            err.to_string(),
            "not supported yet at node 3: write to pointer"
        );
    }

    #[test]
    fn formats_without_node_id() {
        let err = CoreError::division_by_zero();
        assert_eq!(err.to_string(), "division by zero");
    }
}
