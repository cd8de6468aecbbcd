//! The storage-access pass (4.F): rewrites contract-state reads and writes
//! — including mapping indexing — into calls against the generated storage
//! accessor helpers (4.E), consuming a read-only [`StorageAllocationTable`]
//! assigned by an earlier pass.
//!
//! Grounded on the teacher crate's `optimizer::constant_inlining` pass: a
//! `Mapper`-shaped rewrite that looks at one node kind (there, `Identifier`;
//! here, `Assignment`/`Identifier`/`IndexAccess`) and either leaves it alone
//! or splices in a replacement built from information carried on the
//! referenced declaration.

use log::debug;

use crate::allocation::StorageAllocationTable;
use crate::ast::{AstContext, Node, NodeId, NodeKind, Type};
use crate::error::CoreError;
use crate::mapper::Mapper;
use crate::type_translator::{cairo_type, location_name};
use crate::utility::{declared_type_name, UtilityRegistry};

/// Rewrites state-variable reads/writes and mapping indexing into utility
/// calls (4.F). Holds the allocation table read-only and the utility
/// registry mutably, both context-scoped per §5.
pub struct StorageAccessPass<'a> {
    allocation: &'a StorageAllocationTable,
    utility: &'a mut UtilityRegistry,
}

impl<'a> StorageAccessPass<'a> {
    pub fn new(allocation: &'a StorageAllocationTable, utility: &'a mut UtilityRegistry) -> Self {
        StorageAccessPass {
            allocation,
            utility,
        }
    }

    fn is_state_var(&self, ctx: &AstContext, decl_id: NodeId) -> Result<bool, CoreError> {
        match &ctx.get(decl_id)?.kind {
            NodeKind::VariableDeclaration { state_variable, .. } => Ok(*state_variable),
            _ => Ok(false),
        }
    }

    fn declared_type(&self, ctx: &AstContext, decl_id: NodeId) -> Result<Type, CoreError> {
        match &ctx.get(decl_id)?.kind {
            NodeKind::VariableDeclaration { declared_type, .. } => Ok(declared_type.clone()),
            other => Err(CoreError::assertion_failure(
                Some(decl_id),
                format!("expected VariableDeclaration, found {}", other.describe()),
            )),
        }
    }

    fn slot_of(&self, node_for_error: NodeId, decl_id: NodeId) -> Result<u64, CoreError> {
        self.allocation.slot_of(decl_id).ok_or_else(|| {
            CoreError::assertion_failure(
                Some(node_for_error),
                "missing storage allocation for state variable",
            )
        })
    }
}

/// Slot literals are synthesised as Number literals whose textual form is
/// `int_const <slot>` and hex form is the hex of `<slot>` (4.F). The hex
/// rendering is carried in the node's source-span field since `Literal`'s
/// `value` holds the canonical textual form consumed by codegen.
fn synth_slot_literal(ctx: &mut AstContext, slot: u64) -> NodeId {
    let id = ctx.reserve_id();
    ctx.register(
        Node::new(
            id,
            format!("{slot:#x}"),
            NodeKind::Literal {
                value: format!("int_const {slot}"),
            },
        ),
        None,
    )
}

/// The declared type of `expr`, resolved by following an `Identifier` back
/// to its referenced declaration. `None` for any expression whose static
/// type this core does not track (e.g. a nested `IndexAccess`). Exposed so
/// the pipeline driver's between-pass invariant checks (4.H) can re-run the
/// same resolution this pass uses when deciding whether a rewrite applies.
pub(crate) fn resolve_expression_type(
    ctx: &AstContext,
    expr: NodeId,
) -> Result<Option<Type>, CoreError> {
    match &ctx.get(expr)?.kind {
        NodeKind::Identifier {
            referenced_declaration: Some(decl_id),
            ..
        } => match &ctx.get(*decl_id)?.kind {
            NodeKind::VariableDeclaration { declared_type, .. } => Ok(Some(declared_type.clone())),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Strip one layer of pointer indirection (if any) and require a `Mapping`,
/// returning its key/value types. Anything else is `UnhandledType` — the
/// caller already checked `is_pointer_to_mapping`/a direct `Mapping`, so
/// reaching this branch means the type model and the check disagreed.
fn mapping_kv(ty: &Type) -> Result<(&Type, &Type), CoreError> {
    match ty.deref_once() {
        Type::Mapping { key, value } => Ok((key.as_ref(), value.as_ref())),
        other => Err(CoreError::unhandled_type(format!(
            "expected a mapping type, found {other:?}"
        ))),
    }
}

/// Describe a rejected non-mapping index-access base for an error message,
/// naming its storage/memory/calldata location when the base's static type
/// is known to be a pointer (4.B's `location_name`).
fn describe_non_mapping_base(ty: Option<&Type>) -> String {
    match ty {
        Some(Type::Pointer { location, .. }) => {
            format!("index access over a non-mapping {} pointer", location_name(*location))
        }
        Some(other) => format!("index access over a non-mapping base of type {other:?}"),
        None => "index access over a base of unknown type".to_string(),
    }
}

impl<'a> Mapper for StorageAccessPass<'a> {
    fn visit_assignment(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        let (lhs, rhs) = match &ctx.get(id)?.kind {
            NodeKind::Assignment { lhs, rhs } => (*lhs, *rhs),
            other => {
                return Err(CoreError::assertion_failure(
                    Some(id),
                    format!("expected Assignment, found {}", other.describe()),
                ))
            }
        };

        let lhs_kind = ctx.get(lhs)?.kind.clone();

        match lhs_kind {
            NodeKind::Identifier {
                referenced_declaration: Some(decl_id),
                ..
            } if self.is_state_var(ctx, decl_id)? => {
                debug!("rewriting assignment to state variable at node {lhs}");
                let declared = self.declared_type(ctx, decl_id)?;
                let slot = self.slot_of(lhs, decl_id)?;
                let type_name = declared_type_name(&declared)?;
                let slot_literal = synth_slot_literal(ctx, slot);
                let call = self
                    .utility
                    .storage_write(ctx, slot_literal, rhs, &type_name)?;
                ctx.replace_node(id, call, None)?;
                self.visit_node(ctx, rhs)
            }
            NodeKind::IndexAccess { base, index } => {
                let index = index.ok_or_else(|| {
                    CoreError::assertion_failure(
                        Some(lhs),
                        "writeMapping requires a defined index",
                    )
                })?;
                let base_type = resolve_expression_type(ctx, base)?;
                match base_type {
                    Some(ty) if ty.is_pointer_to_mapping() => {
                        let (key_ty, value_ty) = mapping_kv(&ty)?;
                        let key_name = cairo_type(key_ty)?;
                        let value_name = cairo_type(value_ty)?;
                        let call = self
                            .utility
                            .write_mapping(ctx, base, index, rhs, &key_name, &value_name)?;
                        ctx.replace_node(id, call, None)?;
                        self.visit_node(ctx, call)
                    }
                    other => Err(CoreError::not_supported_yet(
                        Some(lhs),
                        format!(
                            "assignment through a non-mapping index access ({})",
                            describe_non_mapping_base(other.as_ref())
                        ),
                    )),
                }
            }
            _ => self.common_visit(ctx, id),
        }
    }

    fn visit_identifier(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        let decl_id = match &ctx.get(id)?.kind {
            NodeKind::Identifier {
                referenced_declaration,
                ..
            } => *referenced_declaration,
            other => {
                return Err(CoreError::assertion_failure(
                    Some(id),
                    format!("expected Identifier, found {}", other.describe()),
                ))
            }
        };
        let Some(decl_id) = decl_id else {
            return Ok(());
        };
        if !self.is_state_var(ctx, decl_id)? {
            return Ok(());
        }

        let declared = self.declared_type(ctx, decl_id)?;
        if matches!(declared.deref_once(), Type::Mapping { .. }) {
            let initial_value = match &ctx.get(decl_id)?.kind {
                NodeKind::VariableDeclaration { initial_value, .. } => *initial_value,
                _ => unreachable!("is_state_var already checked this is a VariableDeclaration"),
            };
            let initial_value = initial_value.ok_or_else(|| {
                CoreError::assertion_failure(
                    Some(id),
                    "mapping state variable has no canonical base expression",
                )
            })?;
            let parent = ctx.parent_of(id);
            let clone = ctx.clone_subtree(initial_value, parent)?;
            ctx.replace_node(id, clone, parent)
        } else {
            let type_name = declared_type_name(&declared)?;
            let slot = self.slot_of(id, decl_id)?;
            let slot_literal = synth_slot_literal(ctx, slot);
            let parent = ctx.parent_of(id);
            let call = self.utility.storage_read(ctx, slot_literal, &type_name)?;
            ctx.replace_node(id, call, parent)
        }
    }

    fn visit_index_access(&mut self, ctx: &mut AstContext, id: NodeId) -> Result<(), CoreError> {
        let (base, index) = match &ctx.get(id)?.kind {
            NodeKind::IndexAccess { base, index } => (*base, *index),
            other => {
                return Err(CoreError::assertion_failure(
                    Some(id),
                    format!("expected IndexAccess, found {}", other.describe()),
                ))
            }
        };
        let Some(index) = index else {
            return Err(CoreError::will_not_support(
                Some(id),
                "index access with an undefined index",
            ));
        };

        let base_type = resolve_expression_type(ctx, base)?;
        match base_type {
            Some(ty) if ty.is_pointer_to_mapping() => {
                let (key_ty, value_ty) = mapping_kv(&ty)?;
                let key_name = cairo_type(key_ty)?;
                let value_name = cairo_type(value_ty)?;
                let call = self
                    .utility
                    .read_mapping(ctx, base, index, &key_name, &value_name)?;
                ctx.replace_node(id, call, None)?;
                self.visit_node(ctx, call)
            }
            other => Err(CoreError::not_supported_yet(
                Some(id),
                describe_non_mapping_base(other.as_ref()),
            )),
        }
    }
}
