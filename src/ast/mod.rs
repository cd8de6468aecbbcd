//! The typed AST model (4.A): node variants, the owning [`AstContext`]
//! arena, and the structural [`Type`] system the translator and passes
//! operate over.

mod context;
mod node;
mod ty;

pub use context::AstContext;
pub use node::{Mutability, Node, NodeId, NodeKind};
pub use ty::{Location, Type};
