//! The node model: a closed set of kind tags (§3.1), each carrying only the
//! child references and payload fields the passes in this core read or
//! write. Cross-references between nodes are always by [`NodeId`] —
//! ownership lives exclusively in the [`super::context::AstContext`] arena
//! (§4.A), never in the node itself.

use std::fmt;

use super::ty::Type;

/// A unique, monotonically-increasing node identity, opaque across
/// [`super::context::AstContext`] instances (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variable mutability, as tracked on `VariableDeclaration` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Mutable,
    Immutable,
    Constant,
}

/// The closed set of node kinds implemented by this core (§3.1). Fields
/// hold child references by [`NodeId`]; anything a pass never reads is not
/// modeled, per the Non-goal of full input-language coverage.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Assignment {
        lhs: NodeId,
        rhs: NodeId,
    },
    Identifier {
        name: String,
        referenced_declaration: Option<NodeId>,
    },
    /// A literal value. Used both for source literals and for the
    /// slot-literal nodes synthesised by the storage-access pass, whose
    /// textual form is `int_const <slot>` (4.F).
    Literal {
        value: String,
    },
    IndexAccess {
        base: NodeId,
        index: Option<NodeId>,
    },
    FunctionCall {
        callee: NodeId,
        arguments: Vec<NodeId>,
        /// The call's static return type, when known. `Some(Type::Tuple(_))`
        /// is what the declaration-splitter pass (4.G) looks for to decide
        /// whether a multi-name declaration's initialiser may stay an
        /// atomic call; synthesised helper calls from the utility-function
        /// generator (4.E) leave this `None`.
        return_type: Option<Type>,
    },
    /// `components[i]` is `None` for an elided tuple slot (e.g. `(, y) = ...`).
    TupleExpression {
        components: Vec<Option<NodeId>>,
    },
    VariableDeclaration {
        name: String,
        declared_type: Type,
        state_variable: bool,
        mutability: Mutability,
        documentation: Option<String>,
        /// For a mapping-typed state variable, the canonical base
        /// expression the storage-access pass splices in place of a read
        /// (4.F, `visitIdentifier`). `None` for everything else.
        initial_value: Option<NodeId>,
    },
    /// `declarations[i]` is `None` for an elided binding slot (4.G).
    VariableDeclarationStatement {
        declarations: Vec<Option<NodeId>>,
        initial_value: Option<NodeId>,
        documentation: Option<String>,
        raw: Option<String>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    Block {
        statements: Vec<NodeId>,
    },
    UncheckedBlock {
        statements: Vec<NodeId>,
    },
    /// A `mapping(K => V)` type-name node, kept only so the storage-access
    /// pass can clone a mapping variable's canonical base expression
    /// (4.F, `visitIdentifier`).
    Mapping {
        key_type: Type,
        value_type: Type,
    },
    ElementaryTypeName {
        name: String,
    },
    /// A contract body, used as the `closestAncestor` target when locating
    /// the containing contract's storage allocation table.
    Contract {
        name: String,
        state_variables: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Ids of every direct child, in source order. Used by the default
    /// mapper recursion (`commonVisit`) and by context bookkeeping.
    pub fn child_ids(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Assignment { lhs, rhs } => vec![*lhs, *rhs],
            NodeKind::Identifier { .. } => vec![],
            NodeKind::Literal { .. } => vec![],
            NodeKind::IndexAccess { base, index } => {
                let mut ids = vec![*base];
                if let Some(index) = index {
                    ids.push(*index);
                }
                ids
            }
            NodeKind::FunctionCall {
                callee, arguments, ..
            } => {
                let mut ids = vec![*callee];
                ids.extend(arguments.iter().copied());
                ids
            }
            NodeKind::TupleExpression { components } => {
                components.iter().filter_map(|c| *c).collect()
            }
            NodeKind::VariableDeclaration { initial_value, .. } => {
                initial_value.iter().copied().collect()
            }
            NodeKind::VariableDeclarationStatement {
                declarations,
                initial_value,
                ..
            } => {
                let mut ids: Vec<NodeId> = declarations.iter().filter_map(|d| *d).collect();
                ids.extend(initial_value.iter().copied());
                ids
            }
            NodeKind::ExpressionStatement { expression } => vec![*expression],
            NodeKind::Block { statements } | NodeKind::UncheckedBlock { statements } => {
                statements.clone()
            }
            NodeKind::Mapping { .. } => vec![],
            NodeKind::ElementaryTypeName { .. } => vec![],
            NodeKind::Contract { state_variables, .. } => state_variables.clone(),
        }
    }

    /// Replace every occurrence of `old` among this node's direct child
    /// references with `new`. Used by `AstContext::replace_node` to patch
    /// the surviving parent after a subtree substitution.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) {
        let swap = |id: &mut NodeId| {
            if *id == old {
                *id = new;
            }
        };
        let swap_opt = |id: &mut Option<NodeId>| {
            if *id == Some(old) {
                *id = Some(new);
            }
        };
        match self {
            NodeKind::Assignment { lhs, rhs } => {
                swap(lhs);
                swap(rhs);
            }
            NodeKind::Identifier { .. } => {}
            NodeKind::Literal { .. } => {}
            NodeKind::IndexAccess { base, index } => {
                swap(base);
                swap_opt(index);
            }
            NodeKind::FunctionCall {
                callee, arguments, ..
            } => {
                swap(callee);
                for arg in arguments.iter_mut() {
                    swap(arg);
                }
            }
            NodeKind::TupleExpression { components } => {
                for c in components.iter_mut() {
                    swap_opt(c);
                }
            }
            NodeKind::VariableDeclaration { .. } => {}
            NodeKind::VariableDeclarationStatement {
                declarations,
                initial_value,
                ..
            } => {
                for d in declarations.iter_mut() {
                    swap_opt(d);
                }
                swap_opt(initial_value);
            }
            NodeKind::ExpressionStatement { expression } => swap(expression),
            NodeKind::Block { statements } | NodeKind::UncheckedBlock { statements } => {
                for s in statements.iter_mut() {
                    swap(s);
                }
            }
            NodeKind::Mapping { .. } => {}
            NodeKind::ElementaryTypeName { .. } => {}
            NodeKind::Contract { state_variables, .. } => {
                for s in state_variables.iter_mut() {
                    swap(s);
                }
            }
        }
    }

    /// Short, human-readable description used in error messages (mirrors
    /// the teacher's practice of including "the offending node's printed
    /// description" in assertion-failure messages, §7).
    pub fn describe(&self) -> String {
        match self {
            NodeKind::Assignment { .. } => "Assignment".into(),
            NodeKind::Identifier { name, .. } => format!("Identifier({name})"),
            NodeKind::Literal { value } => format!("Literal({value})"),
            NodeKind::IndexAccess { .. } => "IndexAccess".into(),
            NodeKind::FunctionCall { .. } => "FunctionCall".into(),
            NodeKind::TupleExpression { .. } => "TupleExpression".into(),
            NodeKind::VariableDeclaration { name, .. } => format!("VariableDeclaration({name})"),
            NodeKind::VariableDeclarationStatement { .. } => "VariableDeclarationStatement".into(),
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement".into(),
            NodeKind::Block { .. } => "Block".into(),
            NodeKind::UncheckedBlock { .. } => "UncheckedBlock".into(),
            NodeKind::Mapping { .. } => "Mapping".into(),
            NodeKind::ElementaryTypeName { name } => format!("ElementaryTypeName({name})"),
            NodeKind::Contract { name, .. } => format!("Contract({name})"),
        }
    }
}

/// A node in the AST arena: an identity, a source span, a kind, an
/// optional type string and pass-attached metadata (§3).
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub src: String,
    pub kind: NodeKind,
    pub type_string: Option<String>,
}

impl Node {
    pub fn new(id: NodeId, src: impl ToString, kind: NodeKind) -> Node {
        Node {
            id,
            src: src.to_string(),
            kind,
            type_string: None,
        }
    }
}
