//! The mapper/visitor framework every pass implements (4.D): a uniform
//! `visit_node` dispatch to the most specific `visit_*` handler, with a
//! default `common_visit` that recurses into every child.
//!
//! Grounded on the teacher crate's `OptimizerPass` trait
//! (`optimizer::mod::OptimizerPass`) — a small trait with one entry point
//! sequenced by a driver — generalised here into the template-method shape
//! §9's design notes call for: "a function from (node, visitor-table) that
//! default-recurses and lets concrete passes override per kind."

use log::debug;

use crate::ast::{AstContext, NodeId, NodeKind};
use crate::error::CoreError;

/// Implemented once per pass. Every method has a default body so a pass
/// only needs to override the handlers for the node kinds it actually
/// rewrites; everything else falls through to `common_visit`'s recursion.
pub trait Mapper {
    /// Dispatch to the most specific handler for `id`'s kind.
    fn visit_node(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        let kind_is = |predicate: fn(&NodeKind) -> bool| -> Result<bool, CoreError> {
            Ok(predicate(&ctx.get(id)?.kind))
        };

        if kind_is(|k| matches!(k, NodeKind::Assignment { .. }))? {
            return self.visit_assignment(ctx, id);
        }
        if kind_is(|k| matches!(k, NodeKind::Identifier { .. }))? {
            return self.visit_identifier(ctx, id);
        }
        if kind_is(|k| matches!(k, NodeKind::IndexAccess { .. }))? {
            return self.visit_index_access(ctx, id);
        }
        if kind_is(|k| matches!(k, NodeKind::VariableDeclarationStatement { .. }))? {
            return self.visit_variable_declaration_statement(ctx, id);
        }
        if kind_is(|k| matches!(k, NodeKind::Block { .. }))? {
            return self.visit_block(ctx, id);
        }
        if kind_is(|k| matches!(k, NodeKind::UncheckedBlock { .. }))? {
            return self.visit_unchecked_block(ctx, id);
        }

        self.common_visit(ctx, id)
    }

    fn visit_assignment(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.common_visit(ctx, id)
    }

    fn visit_identifier(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.common_visit(ctx, id)
    }

    fn visit_index_access(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.common_visit(ctx, id)
    }

    fn visit_variable_declaration_statement(
        &mut self,
        ctx: &mut AstContext,
        id: NodeId,
    ) -> Result<(), CoreError> {
        self.common_visit(ctx, id)
    }

    fn visit_block(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.common_visit(ctx, id)
    }

    fn visit_unchecked_block(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.common_visit(ctx, id)
    }

    /// Default recursion: visit every direct child of `id` in source
    /// order. Passes that replace `id` itself must not call this after the
    /// replacement — they should recurse explicitly into whichever
    /// children survive (4.D: "a pass may short-circuit recursion").
    fn common_visit(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        debug!("common_visit descending into node {id}");
        for child in ctx.children(id)? {
            self.visit_node(ctx, child)?;
        }
        Ok(())
    }
}

/// Deterministic name generation shared by every pass that synthesises
/// fresh identifiers: `__warp_<prefix>_<counter>` (4.D). Counters are
/// instance-local — never shared across passes or compilations (§5).
#[derive(Debug, Default, Clone)]
pub struct NameGenerator {
    counters: std::collections::HashMap<String, u64>,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator::default()
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("__warp_{prefix}_{counter}");
        *counter += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    #[test]
    fn fresh_names_are_sequential_per_prefix() {
        let mut gen = NameGenerator::new();
        assert_eq!(gen.fresh("td"), "__warp_td_0");
        assert_eq!(gen.fresh("td"), "__warp_td_1");
        assert_eq!(gen.fresh("tmp"), "__warp_tmp_0");
    }

    struct CountingMapper {
        visited: usize,
    }

    impl Mapper for CountingMapper {
        fn visit_identifier(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
            self.visited += 1;
            self.common_visit(ctx, id)
        }
    }

    #[test]
    fn default_dispatch_recurses_into_children() {
        let mut ctx = AstContext::new();
        let lhs_id = ctx.reserve_id();
        let lhs = ctx.register(
            Node::new(
                lhs_id,
                "x",
                NodeKind::Identifier {
                    name: "x".into(),
                    referenced_declaration: None,
                },
            ),
            None,
        );
        let rhs_id = ctx.reserve_id();
        let rhs = ctx.register(
            Node::new(
                rhs_id,
                "y",
                NodeKind::Identifier {
                    name: "y".into(),
                    referenced_declaration: None,
                },
            ),
            None,
        );
        let assign_id = ctx.reserve_id();
        let assign = ctx.register(
            Node::new(assign_id, "x = y", NodeKind::Assignment { lhs, rhs }),
            None,
        );

        let mut mapper = CountingMapper { visited: 0 };
        mapper.visit_node(&mut ctx, assign).unwrap();
        assert_eq!(mapper.visited, 2);
    }
}
