//! The utility-function generator (4.E): emits and memoises the
//! target-language helper functions rewritten nodes call into
//! (`storageRead_<Type>`, `writeMapping_<Key,Value>`, ...).
//!
//! Grounded on the teacher crate's `CodegenContext::get_llvm_type`
//! (`codegen::mod`): a cache-or-convert method keyed by the source type,
//! guaranteeing "the same ... type always maps to the same ... type" and
//! that the (expensive) conversion only happens once. The registry here
//! applies that same cache-or-generate shape to whole helper *functions*
//! instead of single types.

use std::collections::BTreeMap;

use crate::ast::{AstContext, Node, NodeId, NodeKind};
use crate::error::CoreError;
use crate::type_translator::{cairo_type, canonical_mangle};

/// Maps a canonical `(operation, type-signature)` key to the helper name
/// already generated for it, plus that helper's emitted source body.
/// Context-scoped and deduplicating (§5): two calls with the same
/// canonical key return the same helper name and never regenerate a body.
#[derive(Debug, Default)]
pub struct UtilityRegistry {
    /// canonical key -> generated helper name
    helper_names: BTreeMap<String, String>,
    /// helper name -> emitted target-language source body, in first-seen
    /// order (`BTreeMap` keeps emission deterministic across runs).
    bodies: BTreeMap<String, String>,
}

impl UtilityRegistry {
    pub fn new() -> Self {
        UtilityRegistry::default()
    }

    /// Look up or create the helper for `canonical_key`, generating its
    /// body from `make_body` only the first time this key is seen.
    fn get_or_generate(
        &mut self,
        canonical_key: String,
        helper_name: String,
        make_body: impl FnOnce(&str) -> String,
    ) -> String {
        if let Some(existing) = self.helper_names.get(&canonical_key) {
            return existing.clone();
        }
        let body = make_body(&helper_name);
        self.bodies.insert(helper_name.clone(), body);
        self.helper_names
            .insert(canonical_key, helper_name.clone());
        helper_name
    }

    /// `storageRead_<Type>(slot) -> <Type>` — reads a non-mapping state
    /// variable out of storage.
    pub fn storage_read(
        &mut self,
        ctx: &mut AstContext,
        slot: NodeId,
        type_name: &str,
    ) -> Result<NodeId, CoreError> {
        let mangled = canonical_mangle(type_name);
        let helper_name = format!("storageRead_{mangled}");
        let key = format!("storageRead::{mangled}");
        self.get_or_generate(key, helper_name.clone(), |name| {
            format!(
                "func {name}(slot : felt) -> ({type_name}):\n    let (value) = storage_read(slot)\n    return (value)\nend\n"
            )
        });
        call(ctx, &helper_name, vec![slot])
    }

    /// `storageWrite_<Type>(slot, value)` — writes a non-mapping state
    /// variable into storage.
    pub fn storage_write(
        &mut self,
        ctx: &mut AstContext,
        slot: NodeId,
        value: NodeId,
        type_name: &str,
    ) -> Result<NodeId, CoreError> {
        let mangled = canonical_mangle(type_name);
        let helper_name = format!("storageWrite_{mangled}");
        let key = format!("storageWrite::{mangled}");
        self.get_or_generate(key, helper_name.clone(), |name| {
            format!(
                "func {name}(slot : felt, value : {type_name}):\n    storage_write(slot, value)\n    return ()\nend\n"
            )
        });
        call(ctx, &helper_name, vec![slot, value])
    }

    /// `readMapping_<Key>_<Value>(base, index) -> <Value>`.
    pub fn read_mapping(
        &mut self,
        ctx: &mut AstContext,
        base: NodeId,
        index: NodeId,
        key_type: &str,
        value_type: &str,
    ) -> Result<NodeId, CoreError> {
        let key_mangled = canonical_mangle(key_type);
        let value_mangled = canonical_mangle(value_type);
        let helper_name = format!("readMapping_{key_mangled}_{value_mangled}");
        let key = format!("readMapping::{key_mangled}::{value_mangled}");
        self.get_or_generate(key, helper_name.clone(), |name| {
            format!(
                "func {name}(base : felt, index : {key_type}) -> ({value_type}):\n    let (slot) = find_element(base, index)\n    let (value) = storage_read(slot)\n    return (value)\nend\n"
            )
        });
        call(ctx, &helper_name, vec![base, index])
    }

    /// `writeMapping_<Key>_<Value>(base, index, value)`.
    pub fn write_mapping(
        &mut self,
        ctx: &mut AstContext,
        base: NodeId,
        index: NodeId,
        value: NodeId,
        key_type: &str,
        value_type: &str,
    ) -> Result<NodeId, CoreError> {
        let key_mangled = canonical_mangle(key_type);
        let value_mangled = canonical_mangle(value_type);
        let helper_name = format!("writeMapping_{key_mangled}_{value_mangled}");
        let key = format!("writeMapping::{key_mangled}::{value_mangled}");
        self.get_or_generate(key, helper_name.clone(), |name| {
            format!(
                "func {name}(base : felt, index : {key_type}, value : {value_type}):\n    let (slot) = find_element(base, index)\n    storage_write(slot, value)\n    return ()\nend\n"
            )
        });
        call(ctx, &helper_name, vec![base, index, value])
    }

    /// The number of distinct helpers generated so far.
    pub fn helper_count(&self) -> usize {
        self.bodies.len()
    }

    /// Render every generated helper body, in first-registration order, as
    /// the compilation's output preamble (§6).
    pub fn render_preamble(&self) -> String {
        self.bodies.values().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// Convenience for translating a declared type through the type
/// translator before handing it to a utility call.
pub fn declared_type_name(ty: &crate::ast::Type) -> Result<String, CoreError> {
    cairo_type(ty)
}

fn call(ctx: &mut AstContext, callee_name: &str, arguments: Vec<NodeId>) -> Result<NodeId, CoreError> {
    let callee_id = ctx.reserve_id();
    let callee = ctx.register(
        Node::new(
            callee_id,
            callee_name,
            NodeKind::Identifier {
                name: callee_name.to_string(),
                referenced_declaration: None,
            },
        ),
        None,
    );
    let call_id = ctx.reserve_id();
    let call_node = ctx.register(
        Node::new(
            call_id,
            callee_name,
            NodeKind::FunctionCall {
                callee,
                arguments: arguments.clone(),
                return_type: None,
            },
        ),
        None,
    );
    ctx.set_context_recursive(call_node)?;
    Ok(call_node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    fn literal(ctx: &mut AstContext, value: &str) -> NodeId {
        let id = ctx.reserve_id();
        ctx.register(
            Node::new(
                id,
                value,
                NodeKind::Literal {
                    value: value.to_string(),
                },
            ),
            None,
        )
    }

    #[test]
    fn repeated_storage_read_calls_reuse_the_same_helper() {
        let mut ctx = AstContext::new();
        let mut registry = UtilityRegistry::new();
        let slot_a = literal(&mut ctx, "int_const 0");
        let slot_b = literal(&mut ctx, "int_const 1");

        registry.storage_read(&mut ctx, slot_a, "felt").unwrap();
        registry.storage_read(&mut ctx, slot_b, "felt").unwrap();

        assert_eq!(registry.helper_count(), 1);
    }

    #[test]
    fn different_types_generate_distinct_helpers() {
        let mut ctx = AstContext::new();
        let mut registry = UtilityRegistry::new();
        let slot = literal(&mut ctx, "int_const 0");
        let slot2 = literal(&mut ctx, "int_const 1");

        registry.storage_read(&mut ctx, slot, "felt").unwrap();
        registry.storage_read(&mut ctx, slot2, "Uint256").unwrap();

        assert_eq!(registry.helper_count(), 2);
    }

    #[test]
    fn storage_read_and_write_are_distinct_operations() {
        let mut ctx = AstContext::new();
        let mut registry = UtilityRegistry::new();
        let slot = literal(&mut ctx, "int_const 0");
        let value = literal(&mut ctx, "5");

        registry.storage_read(&mut ctx, slot, "felt").unwrap();
        registry.storage_write(&mut ctx, slot, value, "felt").unwrap();

        assert_eq!(registry.helper_count(), 2);
    }

    #[test]
    fn preamble_contains_every_generated_body() {
        let mut ctx = AstContext::new();
        let mut registry = UtilityRegistry::new();
        let slot = literal(&mut ctx, "int_const 0");
        registry.storage_read(&mut ctx, slot, "felt").unwrap();
        let preamble = registry.render_preamble();
        assert!(preamble.contains("storageRead_felt"));
    }
}
