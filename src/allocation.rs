//! The storage allocation table (§3) and, supplementing the distilled
//! spec's "assigned by an earlier pass" assumption, a minimal deterministic
//! allocator (4.I) so this core can be exercised without an externally
//! supplied table.

use std::collections::HashMap;

use crate::ast::{AstContext, NodeId, NodeKind};
use crate::error::CoreError;

/// `state_variable_id -> slot`, read-only once handed to the
/// storage-access pass. Invariant: every state variable the storage-access
/// pass touches has an entry (§3).
#[derive(Debug, Default, Clone)]
pub struct StorageAllocationTable {
    slots: HashMap<NodeId, u64>,
}

impl StorageAllocationTable {
    pub fn new() -> Self {
        StorageAllocationTable::default()
    }

    pub fn slot_of(&self, state_variable: NodeId) -> Option<u64> {
        self.slots.get(&state_variable).copied()
    }

    pub fn insert(&mut self, state_variable: NodeId, slot: u64) {
        self.slots.insert(state_variable, slot);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fold another contract's allocations into this table. Used by the
    /// pipeline driver (4.H) when a compilation spans several contracts,
    /// each allocated independently by `allocate_storage`.
    pub fn merge(&mut self, other: StorageAllocationTable) {
        self.slots.extend(other.slots);
    }
}

/// Assign slots to every state variable of `contract`, in declaration
/// order, starting at 0 — one slot per variable regardless of width (4.I).
/// A caller with a real allocator (e.g. one that packs sub-felt-width
/// variables together) supplies its own `StorageAllocationTable` and skips
/// this pass entirely.
pub fn allocate_storage(
    ctx: &AstContext,
    contract: NodeId,
) -> Result<StorageAllocationTable, CoreError> {
    let node = ctx.get(contract)?;
    let state_variables = match &node.kind {
        NodeKind::Contract {
            state_variables, ..
        } => state_variables.clone(),
        other => {
            return Err(CoreError::assertion_failure(
                Some(contract),
                format!("allocate_storage expected a Contract node, found {}", other.describe()),
            ))
        }
    };

    let mut table = StorageAllocationTable::new();
    let mut next_slot = 0u64;
    for state_variable in state_variables {
        let decl = ctx.get(state_variable)?;
        match &decl.kind {
            NodeKind::VariableDeclaration { state_variable: true, .. } => {
                table.insert(state_variable, next_slot);
                next_slot += 1;
            }
            NodeKind::VariableDeclaration { state_variable: false, .. } => {
                return Err(CoreError::assertion_failure(
                    Some(state_variable),
                    "contract's state_variables list contained a non-state declaration",
                ))
            }
            other => {
                return Err(CoreError::assertion_failure(
                    Some(state_variable),
                    format!("expected VariableDeclaration, found {}", other.describe()),
                ))
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Mutability, Node, Type};

    fn declare_state_var(ctx: &mut AstContext, name: &str) -> NodeId {
        let id = ctx.reserve_id();
        ctx.register(
            Node::new(
                id,
                name,
                NodeKind::VariableDeclaration {
                    name: name.to_string(),
                    declared_type: Type::int(256, false),
                    state_variable: true,
                    mutability: Mutability::Mutable,
                    documentation: None,
                    initial_value: None,
                },
            ),
            None,
        )
    }

    #[test]
    fn slots_assigned_in_declaration_order() {
        let mut ctx = AstContext::new();
        let a = declare_state_var(&mut ctx, "a");
        let b = declare_state_var(&mut ctx, "b");
        let contract_id = ctx.reserve_id();
        let contract = ctx.register(
            Node::new(
                contract_id,
                "contract C",
                NodeKind::Contract {
                    name: "C".into(),
                    state_variables: vec![a, b],
                },
            ),
            None,
        );

        let table = allocate_storage(&ctx, contract).unwrap();
        assert_eq!(table.slot_of(a), Some(0));
        assert_eq!(table.slot_of(b), Some(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_contract_yields_empty_table() {
        let mut ctx = AstContext::new();
        let contract_id = ctx.reserve_id();
        let contract = ctx.register(
            Node::new(
                contract_id,
                "contract Empty",
                NodeKind::Contract {
                    name: "Empty".into(),
                    state_variables: vec![],
                },
            ),
            None,
        );

        let table = allocate_storage(&ctx, contract).unwrap();
        assert!(table.is_empty());
    }
}
