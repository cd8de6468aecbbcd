//! The structural type system consumed by the type translator and the
//! storage-access pass. These are not AST nodes — they are the type model
//! attached to AST nodes (declarations, expressions) and carried around by
//! value, the way the teacher crate's `typechecker::types::Type` is carried
//! around independently of the parser AST it describes.

/// Where a pointer-typed value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Storage,
    Memory,
    Calldata,
    Default,
}

/// A type node in the input language's type system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A fixed-width integer. `signed` distinguishes `int`/`uint`.
    Int { bits: u16, signed: bool },
    Bool,
    Address,
    String,
    Bytes,
    /// `length` is `None` for a dynamically-sized array.
    Array {
        element: Box<Type>,
        length: Option<u64>,
    },
    Mapping {
        key: Box<Type>,
        value: Box<Type>,
    },
    Function {
        inputs: Vec<Type>,
        outputs: Vec<Type>,
    },
    Tuple(Vec<Type>),
    Pointer {
        pointee: Box<Type>,
        location: Location,
    },
    /// A user-defined struct/enum/contract type, named and resolvable.
    UserDefined {
        name: String,
        referenced_declaration: u32,
    },
    Builtin(String),
    BuiltinStruct(String),
}

impl Type {
    pub fn int(bits: u16, signed: bool) -> Type {
        Type::Int { bits, signed }
    }

    pub fn array(element: Type, length: Option<u64>) -> Type {
        Type::Array {
            element: Box::new(element),
            length,
        }
    }

    pub fn mapping(key: Type, value: Type) -> Type {
        Type::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn pointer(pointee: Type, location: Location) -> Type {
        Type::Pointer {
            pointee: Box::new(pointee),
            location,
        }
    }

    /// True for any pointer type whose pointee is a mapping, the shape the
    /// storage-access pass looks for when deciding how to lower an
    /// `IndexAccess`.
    pub fn is_pointer_to_mapping(&self) -> bool {
        matches!(self, Type::Pointer { pointee, .. } if matches!(pointee.as_ref(), Type::Mapping { .. }))
    }

    /// Strip a single layer of `Pointer` indirection, the way the type
    /// translator erases pointers (4.B: `Pointer(p, _) -> T(p)`).
    pub fn deref_once(&self) -> &Type {
        match self {
            Type::Pointer { pointee, .. } => pointee.as_ref(),
            other => other,
        }
    }
}
