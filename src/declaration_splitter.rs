//! The declaration-splitter pass (4.G): canonicalises every multi-name
//! `VariableDeclarationStatement` inside a `Block`/`UncheckedBlock` into a
//! sequence of single-name statements, synthesising temporaries when a
//! tuple-returning call's element types disagree with the declared types.
//!
//! Grounded on the teacher crate's `optimizer::constant_folding` pass for
//! the "rewrite this block's statement list in place" shape, and on
//! `typechecker::typed_ast::statement` for the
//! declaration/documentation/raw fields a statement carries.

use crate::ast::{AstContext, Mutability, Node, NodeId, NodeKind, Type};
use crate::error::CoreError;
use crate::mapper::{Mapper, NameGenerator};

/// Canonicalises multi-name declaration statements (4.G). Instance-local
/// `NameGenerator` produces the `__warp_td_<n>` temporaries (§5: per-pass
/// counters are never shared across compilations).
#[derive(Default)]
pub struct DeclarationSplitterPass {
    names: NameGenerator,
}

impl DeclarationSplitterPass {
    pub fn new() -> Self {
        DeclarationSplitterPass::default()
    }

    fn new_declaration(
        &mut self,
        ctx: &mut AstContext,
        name: &str,
        declared_type: Type,
        parent: NodeId,
    ) -> NodeId {
        let id = ctx.reserve_id();
        ctx.register(
            Node::new(
                id,
                name,
                NodeKind::VariableDeclaration {
                    name: name.to_string(),
                    declared_type,
                    state_variable: false,
                    mutability: Mutability::Constant,
                    documentation: None,
                    initial_value: None,
                },
            ),
            Some(parent),
        )
    }

    fn new_identifier(&mut self, ctx: &mut AstContext, name: &str, decl: NodeId) -> NodeId {
        let id = ctx.reserve_id();
        ctx.register(
            Node::new(
                id,
                name,
                NodeKind::Identifier {
                    name: name.to_string(),
                    referenced_declaration: Some(decl),
                },
            ),
            None,
        )
    }

    fn new_declaration_statement(
        &mut self,
        ctx: &mut AstContext,
        declarations: Vec<Option<NodeId>>,
        initial_value: Option<NodeId>,
        documentation: Option<String>,
        raw: Option<String>,
        parent: NodeId,
    ) -> Result<NodeId, CoreError> {
        let id = ctx.reserve_id();
        let node_id = ctx.register(
            Node::new(
                id,
                "",
                NodeKind::VariableDeclarationStatement {
                    declarations,
                    initial_value,
                    documentation,
                    raw,
                },
            ),
            Some(parent),
        );
        ctx.set_context_recursive(node_id)?;
        Ok(node_id)
    }

    fn new_expression_statement(
        &mut self,
        ctx: &mut AstContext,
        expression: NodeId,
        parent: NodeId,
    ) -> Result<NodeId, CoreError> {
        let id = ctx.reserve_id();
        let node_id = ctx.register(
            Node::new(id, "", NodeKind::ExpressionStatement { expression }),
            Some(parent),
        );
        ctx.set_context_recursive(node_id)?;
        Ok(node_id)
    }

    /// Post-order over nested blocks, then a linear rewrite of `block`'s
    /// direct statement list (4.G: "Visit order: post-order over nested
    /// blocks, then linear rewrite of the block's direct children").
    fn rewrite_block(&mut self, ctx: &mut AstContext, block: NodeId) -> Result<(), CoreError> {
        let statements = match &ctx.get(block)?.kind {
            NodeKind::Block { statements } | NodeKind::UncheckedBlock { statements } => {
                statements.clone()
            }
            other => {
                return Err(CoreError::assertion_failure(
                    Some(block),
                    format!("expected Block or UncheckedBlock, found {}", other.describe()),
                ))
            }
        };

        for statement in &statements {
            self.visit_node(ctx, *statement)?;
        }

        let mut rewritten = Vec::with_capacity(statements.len());
        for statement in statements {
            let expanded = self.split_statement(ctx, statement, block)?;
            rewritten.extend(expanded);
        }

        match &mut ctx.get_mut(block)?.kind {
            NodeKind::Block { statements } | NodeKind::UncheckedBlock { statements } => {
                *statements = rewritten;
            }
            _ => unreachable!("kind re-checked above"),
        }
        Ok(())
    }

    /// Expand a single direct child of a block into the statements that
    /// replace it. Anything other than a multi-name
    /// `VariableDeclarationStatement` passes through unchanged.
    fn split_statement(
        &mut self,
        ctx: &mut AstContext,
        statement: NodeId,
        parent: NodeId,
    ) -> Result<Vec<NodeId>, CoreError> {
        let (declarations, initial_value, documentation, raw) = match &ctx.get(statement)?.kind {
            NodeKind::VariableDeclarationStatement {
                declarations,
                initial_value,
                documentation,
                raw,
            } => (
                declarations.clone(),
                *initial_value,
                documentation.clone(),
                raw.clone(),
            ),
            _ => return Ok(vec![statement]),
        };

        if declarations.len() <= 1 {
            return Ok(vec![statement]);
        }

        let Some(init) = initial_value else {
            return Err(CoreError::transpile_failed(
                Some(statement),
                "multi-declaration statement has no initialiser",
            ));
        };

        match ctx.get(init)?.kind.clone() {
            NodeKind::FunctionCall { .. } => {
                self.split_function_call_tuple(ctx, statement, parent, declarations, init)
            }
            NodeKind::TupleExpression { components } => self.split_tuple_expression(
                ctx,
                parent,
                declarations,
                components,
                documentation,
                raw,
            ),
            _ => Err(CoreError::transpile_failed(
                Some(statement),
                "unsupported multi-declaration initialiser shape",
            )),
        }
    }

    /// `(T0 a, T1 b) = f();` (4.G): the call executes once; slots whose
    /// declared type disagrees with the call's element type get a fresh
    /// `__warp_td_<n>` temporary inside the tuple, followed by a statement
    /// binding the original declaration from that temporary.
    fn split_function_call_tuple(
        &mut self,
        ctx: &mut AstContext,
        statement: NodeId,
        parent: NodeId,
        declarations: Vec<Option<NodeId>>,
        call: NodeId,
    ) -> Result<Vec<NodeId>, CoreError> {
        let element_types = match &ctx.get(call)?.kind {
            NodeKind::FunctionCall {
                return_type: Some(Type::Tuple(elements)),
                ..
            } => elements.clone(),
            NodeKind::FunctionCall { .. } => {
                return Err(CoreError::transpile_failed(
                    Some(statement),
                    "function call initialiser has no known tuple return type",
                ))
            }
            other => {
                return Err(CoreError::assertion_failure(
                    Some(call),
                    format!("expected FunctionCall, found {}", other.describe()),
                ))
            }
        };

        if element_types.len() != declarations.len() {
            return Err(CoreError::transpile_failed(
                Some(statement),
                "declaration count does not match the call's tuple arity",
            ));
        }

        let mut tuple_declarations = Vec::with_capacity(declarations.len());
        let mut follow_ups = Vec::new();

        for (element_type, declaration) in element_types.into_iter().zip(declarations.into_iter())
        {
            match declaration {
                None => tuple_declarations.push(None),
                Some(decl_id) => {
                    let declared_type = match &ctx.get(decl_id)?.kind {
                        NodeKind::VariableDeclaration { declared_type, .. } => {
                            declared_type.clone()
                        }
                        other => {
                            return Err(CoreError::assertion_failure(
                                Some(decl_id),
                                format!("expected VariableDeclaration, found {}", other.describe()),
                            ))
                        }
                    };

                    if declared_type == element_type {
                        tuple_declarations.push(Some(decl_id));
                    } else {
                        let temp_name = self.names.fresh("td");
                        let temp_decl =
                            self.new_declaration(ctx, &temp_name, element_type, statement);
                        tuple_declarations.push(Some(temp_decl));

                        let reference = self.new_identifier(ctx, &temp_name, temp_decl);
                        let follow_up = self.new_declaration_statement(
                            ctx,
                            vec![Some(decl_id)],
                            Some(reference),
                            None,
                            None,
                            parent,
                        )?;
                        follow_ups.push(follow_up);
                    }
                }
            }
        }

        match &mut ctx.get_mut(statement)?.kind {
            NodeKind::VariableDeclarationStatement { declarations, .. } => {
                *declarations = tuple_declarations;
            }
            _ => unreachable!("kind re-checked above"),
        }
        ctx.set_context_recursive(statement)?;

        let mut result = vec![statement];
        result.extend(follow_ups);
        Ok(result)
    }

    /// `(a, , c) = (1, 2, 3);` (4.G): arity is guaranteed equal; each slot
    /// either drops (no binding, no side effect), evaluates for its side
    /// effect (no binding, a value), or binds a declaration.
    fn split_tuple_expression(
        &mut self,
        ctx: &mut AstContext,
        parent: NodeId,
        declarations: Vec<Option<NodeId>>,
        components: Vec<Option<NodeId>>,
        documentation: Option<String>,
        raw: Option<String>,
    ) -> Result<Vec<NodeId>, CoreError> {
        if declarations.len() != components.len() {
            return Err(CoreError::transpile_failed(
                Some(parent),
                "tuple assignment arity does not match declaration count",
            ));
        }

        let mut result = Vec::new();
        let mut first_emitted = true;

        for (declaration, component) in declarations.into_iter().zip(components.into_iter()) {
            match (declaration, component) {
                (None, None) => {}
                (None, Some(rhs)) => {
                    let stmt = self.new_expression_statement(ctx, rhs, parent)?;
                    result.push(stmt);
                    first_emitted = false;
                }
                (Some(decl_id), rhs) => {
                    let (doc, raw_) = if first_emitted {
                        (documentation.clone(), raw.clone())
                    } else {
                        (None, None)
                    };
                    let stmt = self.new_declaration_statement(
                        ctx,
                        vec![Some(decl_id)],
                        rhs,
                        doc,
                        raw_,
                        parent,
                    )?;
                    result.push(stmt);
                    first_emitted = false;
                }
            }
        }

        Ok(result)
    }
}

impl Mapper for DeclarationSplitterPass {
    fn visit_block(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.rewrite_block(ctx, id)
    }

    fn visit_unchecked_block(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        self.rewrite_block(ctx, id)
    }
}
