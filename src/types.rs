//! Interned type descriptors and the query surface the specializer consumes.
//!
//! Types are immutable and interned: constructing the same shape twice
//! returns the same `TypeId`, so id equality is type equality. The store is
//! owned by a `Session` and shared by every subsystem of the compiler.

use std::collections::HashMap;

use crate::error::{ErrorKind, Result};

/// An opaque, index-based reference to an interned type.
///
/// Invariant: a `TypeId` is only valid within the `TypeStore` that produced
/// it. Id equality is type equality within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

/// Restriction bit: stores through the pointer are rejected.
pub const PTR_NONWRITABLE: u64 = 1 << 0;
/// Restriction bit: loads through the pointer are rejected.
pub const PTR_NONREADABLE: u64 = 1 << 1;

/// A named or positional member of a tuple or union type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleField {
    pub name: Option<String>,
    pub ty: TypeId,
}

impl TupleField {
    pub fn unnamed(ty: TypeId) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: impl Into<String>, ty: TypeId) -> Self {
        Self { name: Some(name.into()), ty }
    }
}

/// The structural shape of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The unit type of absent values.
    Nothing,
    /// The type of expressions that do not return.
    NoReturn,
    Bool,
    Integer {
        width: u32,
        signed: bool,
    },
    Real {
        width: u32,
    },
    Pointer {
        element: TypeId,
        /// Bitwise or of the `PTR_*` restriction bits.
        flags: u64,
        /// `None` is the unnamed (heap) storage class.
        storage_class: Option<String>,
    },
    Array {
        element: TypeId,
        count: u64,
    },
    Vector {
        element: TypeId,
        count: u64,
    },
    Tuple {
        fields: Vec<TupleField>,
    },
    Union {
        fields: Vec<TupleField>,
    },
    Function {
        return_type: TypeId,
        params: Vec<TypeId>,
        /// Set for raising functions; the type a call may raise.
        except_type: Option<TypeId>,
    },
    /// Marker for multi-valued expression results, flattened at use sites.
    Arguments {
        types: Vec<TypeId>,
    },
    /// An opaque named type, optionally backed by a storage type.
    Unique {
        name: String,
        storage: Option<TypeId>,
    },
}

/// Category used by bitcast checking. The real and integer categories are
/// merged because their storage is interchangeable bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Scalar,
    Bool,
    Pointer,
    Array,
    Vector,
    Tuple,
    Union,
    Function,
    Abstract,
}

/// The interning store for type descriptors.
///
/// Commonly used types are pre-interned and exposed as public fields
/// (`i32_ty`, `bool_ty`, the marker types of the runtime, ...).
pub struct TypeStore {
    entries: Vec<TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
    /// Maps an arguments type to its pre-computed tuple storage type.
    arguments_storage: HashMap<TypeId, TypeId>,

    pub nothing_ty: TypeId,
    pub noreturn_ty: TypeId,
    pub bool_ty: TypeId,
    pub i8_ty: TypeId,
    pub i16_ty: TypeId,
    pub i32_ty: TypeId,
    pub i64_ty: TypeId,
    pub u8_ty: TypeId,
    pub u16_ty: TypeId,
    pub u32_ty: TypeId,
    pub u64_ty: TypeId,
    pub f32_ty: TypeId,
    pub f64_ty: TypeId,
    /// Type of type constants.
    pub type_ty: TypeId,
    /// Type of closure constants (template plus enclosing frame).
    pub closure_ty: TypeId,
    /// Type of AST macro entry points.
    pub astmacro_ty: TypeId,
    /// Type of builtin operator constants.
    pub builtin_ty: TypeId,
    /// Type of interned symbol constants.
    pub symbol_ty: TypeId,
    pub string_ty: TypeId,
    /// Type of opaque expansion payloads handed to the stager.
    pub list_ty: TypeId,
    /// Type of the environment handles threaded through syntax-extend.
    pub scope_ty: TypeId,
    /// Type raised by staged functions with a raising signature.
    pub error_ty: TypeId,
    empty_args_ty: TypeId,
}

impl TypeStore {
    pub fn new() -> Self {
        let placeholder = TypeId(0);
        let mut store = TypeStore {
            entries: Vec::new(),
            interned: HashMap::new(),
            arguments_storage: HashMap::new(),
            nothing_ty: placeholder,
            noreturn_ty: placeholder,
            bool_ty: placeholder,
            i8_ty: placeholder,
            i16_ty: placeholder,
            i32_ty: placeholder,
            i64_ty: placeholder,
            u8_ty: placeholder,
            u16_ty: placeholder,
            u32_ty: placeholder,
            u64_ty: placeholder,
            f32_ty: placeholder,
            f64_ty: placeholder,
            type_ty: placeholder,
            closure_ty: placeholder,
            astmacro_ty: placeholder,
            builtin_ty: placeholder,
            symbol_ty: placeholder,
            string_ty: placeholder,
            list_ty: placeholder,
            scope_ty: placeholder,
            error_ty: placeholder,
            empty_args_ty: placeholder,
        };
        store.nothing_ty = store.intern(TypeKind::Nothing);
        store.noreturn_ty = store.intern(TypeKind::NoReturn);
        store.bool_ty = store.intern(TypeKind::Bool);
        store.i8_ty = store.integer_type(8, true);
        store.i16_ty = store.integer_type(16, true);
        store.i32_ty = store.integer_type(32, true);
        store.i64_ty = store.integer_type(64, true);
        store.u8_ty = store.integer_type(8, false);
        store.u16_ty = store.integer_type(16, false);
        store.u32_ty = store.integer_type(32, false);
        store.u64_ty = store.integer_type(64, false);
        store.f32_ty = store.real_type(32);
        store.f64_ty = store.real_type(64);
        store.type_ty = store.opaque_type("type");
        store.closure_ty = store.opaque_type("Closure");
        store.astmacro_ty = store.opaque_type("ASTMacro");
        store.builtin_ty = store.opaque_type("Builtin");
        store.symbol_ty = store.opaque_type("Symbol");
        store.string_ty = store.opaque_type("string");
        store.list_ty = store.opaque_type("list");
        store.scope_ty = store.opaque_type("Scope");
        store.error_ty = store.opaque_type("Error");
        store.empty_args_ty = store.intern(TypeKind::Arguments { types: Vec::new() });
        let empty_tuple = store.tuple_type(Vec::new());
        store
            .arguments_storage
            .insert(store.empty_args_ty, empty_tuple);
        store
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    pub fn kind(&self, t: TypeId) -> &TypeKind {
        &self.entries[t.0 as usize]
    }

    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    pub fn integer_type(&mut self, width: u32, signed: bool) -> TypeId {
        self.intern(TypeKind::Integer { width, signed })
    }

    pub fn real_type(&mut self, width: u32) -> TypeId {
        self.intern(TypeKind::Real { width })
    }

    /// An opaque marker type without storage.
    pub fn opaque_type(&mut self, name: impl Into<String>) -> TypeId {
        self.intern(TypeKind::Unique { name: name.into(), storage: None })
    }

    /// A named type backed by a storage type.
    pub fn unique_type(&mut self, name: impl Into<String>, storage: TypeId) -> TypeId {
        self.intern(TypeKind::Unique { name: name.into(), storage: Some(storage) })
    }

    pub fn pointer_type(
        &mut self,
        element: TypeId,
        flags: u64,
        storage_class: Option<&str>,
    ) -> TypeId {
        self.intern(TypeKind::Pointer {
            element,
            flags,
            storage_class: storage_class.map(str::to_owned),
        })
    }

    /// A mutable heap pointer.
    pub fn native_pointer_type(&mut self, element: TypeId) -> TypeId {
        self.pointer_type(element, 0, None)
    }

    /// A read-only heap pointer.
    pub fn native_ro_pointer_type(&mut self, element: TypeId) -> TypeId {
        self.pointer_type(element, PTR_NONWRITABLE, None)
    }

    /// A mutable pointer into the enclosing function's stack frame.
    pub fn local_pointer_type(&mut self, element: TypeId) -> TypeId {
        self.pointer_type(element, 0, Some("function"))
    }

    pub fn vector_type(&mut self, element: TypeId, count: u64) -> TypeId {
        self.intern(TypeKind::Vector { element, count })
    }

    pub fn array_type(&mut self, element: TypeId, count: u64) -> TypeId {
        self.intern(TypeKind::Array { element, count })
    }

    pub fn tuple_type(&mut self, fields: Vec<TupleField>) -> TypeId {
        self.intern(TypeKind::Tuple { fields })
    }

    pub fn union_type(&mut self, fields: Vec<TupleField>) -> TypeId {
        self.intern(TypeKind::Union { fields })
    }

    pub fn function_type(&mut self, return_type: TypeId, params: &[TypeId]) -> TypeId {
        self.intern(TypeKind::Function {
            return_type,
            params: params.to_vec(),
            except_type: None,
        })
    }

    pub fn raising_function_type(
        &mut self,
        except_type: TypeId,
        return_type: TypeId,
        params: &[TypeId],
    ) -> TypeId {
        self.intern(TypeKind::Function {
            return_type,
            params: params.to_vec(),
            except_type: Some(except_type),
        })
    }

    /// The multi-value marker type over `types`.
    ///
    /// An empty list yields the canonical empty arguments type; a single
    /// element collapses to the element itself.
    pub fn arguments_type(&mut self, types: &[TypeId]) -> TypeId {
        match types {
            [] => self.empty_args_ty,
            [single] => *single,
            _ => {
                let id = self.intern(TypeKind::Arguments { types: types.to_vec() });
                if !self.arguments_storage.contains_key(&id) {
                    let fields = types.iter().map(|&t| TupleField::unnamed(t)).collect();
                    let storage = self.tuple_type(fields);
                    self.arguments_storage.insert(id, storage);
                }
                id
            }
        }
    }

    pub fn empty_arguments_type(&self) -> TypeId {
        self.empty_args_ty
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_returning(&self, t: TypeId) -> bool {
        t != self.noreturn_ty
    }

    pub fn is_arguments_type(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Arguments { .. })
    }

    /// The member types of an arguments type.
    pub fn arguments_of(&self, t: TypeId) -> Option<&[TypeId]> {
        match self.kind(t) {
            TypeKind::Arguments { types } => Some(types),
            _ => None,
        }
    }

    /// Reduces a type to its low-level representation: unique types resolve
    /// through their storage, arguments types become unnamed tuples, all
    /// other types stand for themselves.
    pub fn storage_type(&self, t: TypeId) -> Result<TypeId> {
        match self.kind(t) {
            TypeKind::Unique { storage: Some(s), .. } => self.storage_type(*s),
            TypeKind::Unique { storage: None, name } => {
                Err(ErrorKind::OpaqueStorage(name.clone()).into())
            }
            TypeKind::Arguments { .. } => Ok(self.arguments_storage[&t]),
            _ => Ok(t),
        }
    }

    pub fn is_function_pointer(&self, t: TypeId) -> bool {
        self.extract_function_type(t).is_some()
    }

    /// The function type behind a function pointer.
    pub fn extract_function_type(&self, t: TypeId) -> Option<TypeId> {
        match self.kind(t) {
            TypeKind::Pointer { element, .. }
                if matches!(self.kind(*element), TypeKind::Function { .. }) =>
            {
                Some(*element)
            }
            _ => None,
        }
    }

    /// Return type, parameter types and exception type of a function type.
    pub fn function_parts(&self, t: TypeId) -> Option<(TypeId, &[TypeId], Option<TypeId>)> {
        match self.kind(t) {
            TypeKind::Function { return_type, params, except_type } => {
                Some((*return_type, params, *except_type))
            }
            _ => None,
        }
    }

    /// Element type, flags and storage class of a pointer type.
    pub fn pointer_parts(&self, t: TypeId) -> Option<(TypeId, u64, Option<&str>)> {
        match self.kind(t) {
            TypeKind::Pointer { element, flags, storage_class } => {
                Some((*element, *flags, storage_class.as_deref()))
            }
            _ => None,
        }
    }

    pub fn is_readable(&self, t: TypeId) -> bool {
        match self.kind(t) {
            TypeKind::Pointer { flags, .. } => flags & PTR_NONREADABLE == 0,
            _ => false,
        }
    }

    pub fn is_writable(&self, t: TypeId) -> bool {
        match self.kind(t) {
            TypeKind::Pointer { flags, .. } => flags & PTR_NONWRITABLE == 0,
            _ => false,
        }
    }

    /// Whether an actual pointer may be passed where the expected flags are
    /// declared. Holds when the actual pointer carries no restriction the
    /// expected one lacks: a writable pointer is accepted where a read-only
    /// one is expected, never the reverse.
    pub fn pointer_flags_compatible(expected: u64, actual: u64) -> bool {
        (expected | actual) == expected
    }

    /// An unset expected storage class accepts any actual class; a named one
    /// must match exactly.
    pub fn pointer_storage_classes_compatible(
        expected: Option<&str>,
        actual: Option<&str>,
    ) -> bool {
        expected.is_none() || expected == actual
    }

    /// The member type at `index` of an aggregate or arguments type.
    pub fn type_at_index(&self, t: TypeId, index: usize) -> Result<TypeId> {
        let out_of_range = || ErrorKind::IndexOutOfRange { ty: self.format(t), index };
        match self.kind(t) {
            TypeKind::Array { element, count } => {
                if (index as u64) < *count {
                    Ok(*element)
                } else {
                    Err(out_of_range().into())
                }
            }
            TypeKind::Tuple { fields } | TypeKind::Union { fields } => {
                fields.get(index).map(|f| f.ty).ok_or_else(|| out_of_range().into())
            }
            TypeKind::Arguments { types } => {
                types.get(index).copied().ok_or_else(|| out_of_range().into())
            }
            _ => Err(out_of_range().into()),
        }
    }

    /// Position of a named field within a tuple type.
    pub fn field_index(&self, t: TypeId, name: &str) -> Option<usize> {
        match self.kind(t) {
            TypeKind::Tuple { fields } => fields
                .iter()
                .position(|f| f.name.as_deref() == Some(name)),
            _ => None,
        }
    }

    /// The bitcast category of a storage type. Real and integer kinds are
    /// merged; everything else stands for itself.
    pub fn canonical_category(&self, t: TypeId) -> TypeCategory {
        match self.kind(t) {
            TypeKind::Integer { .. } | TypeKind::Real { .. } => TypeCategory::Scalar,
            TypeKind::Bool => TypeCategory::Bool,
            TypeKind::Pointer { .. } => TypeCategory::Pointer,
            TypeKind::Array { .. } => TypeCategory::Array,
            TypeKind::Vector { .. } => TypeCategory::Vector,
            TypeKind::Tuple { .. } => TypeCategory::Tuple,
            TypeKind::Union { .. } => TypeCategory::Union,
            TypeKind::Function { .. } => TypeCategory::Function,
            TypeKind::Nothing
            | TypeKind::NoReturn
            | TypeKind::Arguments { .. }
            | TypeKind::Unique { .. } => TypeCategory::Abstract,
        }
    }

    pub fn is_aggregate_storage(&self, t: TypeId) -> bool {
        matches!(
            self.kind(t),
            TypeKind::Array { .. } | TypeKind::Tuple { .. } | TypeKind::Union { .. }
        )
    }

    // -----------------------------------------------------------------------
    // Verifiers
    // -----------------------------------------------------------------------

    /// Exact type equality check.
    pub fn verify(&self, actual: TypeId, expected: TypeId) -> Result<()> {
        if actual == expected {
            Ok(())
        } else {
            Err(ErrorKind::TypeMismatch {
                expected: self.format(expected),
                got: self.format(actual),
            }
            .into())
        }
    }

    fn expected_kind(&self, expected: &'static str, t: TypeId) -> crate::error::Error {
        ErrorKind::ExpectedKind { expected, got: self.format(t) }.into()
    }

    pub fn verify_integer(&self, t: TypeId) -> Result<()> {
        match self.kind(t) {
            TypeKind::Integer { .. } => Ok(()),
            _ => Err(self.expected_kind("integer", t)),
        }
    }

    pub fn verify_real(&self, t: TypeId) -> Result<()> {
        match self.kind(t) {
            TypeKind::Real { .. } => Ok(()),
            _ => Err(self.expected_kind("real", t)),
        }
    }

    pub fn verify_pointer(&self, t: TypeId) -> Result<()> {
        match self.kind(t) {
            TypeKind::Pointer { .. } => Ok(()),
            _ => Err(self.expected_kind("pointer", t)),
        }
    }

    fn vector_element(&self, t: TypeId) -> TypeId {
        match self.kind(t) {
            TypeKind::Vector { element, .. } => *element,
            _ => t,
        }
    }

    /// Integer type or vector of integers.
    pub fn verify_integer_vector(&self, t: TypeId) -> Result<()> {
        match self.kind(self.vector_element(t)) {
            TypeKind::Integer { .. } => Ok(()),
            _ => Err(self.expected_kind("integer or integer vector", t)),
        }
    }

    /// Real type or vector of reals.
    pub fn verify_real_vector(&self, t: TypeId) -> Result<()> {
        match self.kind(self.vector_element(t)) {
            TypeKind::Real { .. } => Ok(()),
            _ => Err(self.expected_kind("real or real vector", t)),
        }
    }

    /// Bool type or vector of bools.
    pub fn verify_bool_vector(&self, t: TypeId) -> Result<()> {
        match self.kind(self.vector_element(t)) {
            TypeKind::Bool => Ok(()),
            _ => Err(self.expected_kind("bool or bool vector", t)),
        }
    }

    /// Both storage types must be vectors of the same length.
    pub fn verify_vector_sizes(&self, a: TypeId, b: TypeId) -> Result<()> {
        let sa = self.storage_type(a)?;
        let sb = self.storage_type(b)?;
        match (self.kind(sa), self.kind(sb)) {
            (TypeKind::Vector { count: ca, .. }, TypeKind::Vector { count: cb, .. })
                if ca == cb =>
            {
                Ok(())
            }
            _ => Err(ErrorKind::VectorSizeMismatch {
                lhs: self.format(a),
                rhs: self.format(b),
            }
            .into()),
        }
    }

    // -----------------------------------------------------------------------
    // Formatting
    // -----------------------------------------------------------------------

    /// Deterministic text rendering, used by the printer and in error
    /// messages.
    pub fn format(&self, t: TypeId) -> String {
        match self.kind(t) {
            TypeKind::Nothing => "Nothing".to_owned(),
            TypeKind::NoReturn => "noreturn".to_owned(),
            TypeKind::Bool => "bool".to_owned(),
            TypeKind::Integer { width, signed } => {
                format!("{}{}", if *signed { "i" } else { "u" }, width)
            }
            TypeKind::Real { width } => format!("f{}", width),
            TypeKind::Pointer { element, flags, storage_class } => {
                let mut out = format!("ptr({}", self.format(*element));
                if flags & PTR_NONWRITABLE != 0 {
                    out.push_str(" readonly");
                }
                if flags & PTR_NONREADABLE != 0 {
                    out.push_str(" writeonly");
                }
                if let Some(class) = storage_class {
                    out.push_str(" @");
                    out.push_str(class);
                }
                out.push(')');
                out
            }
            TypeKind::Array { element, count } => {
                format!("array({} x {})", self.format(*element), count)
            }
            TypeKind::Vector { element, count } => {
                format!("vec({} x {})", self.format(*element), count)
            }
            TypeKind::Tuple { fields } => self.format_fields("tuple", fields),
            TypeKind::Union { fields } => self.format_fields("union", fields),
            TypeKind::Function { return_type, params, except_type } => {
                let mut out = "fn (".to_owned();
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&self.format(*p));
                }
                out.push_str(") -> ");
                out.push_str(&self.format(*return_type));
                if let Some(e) = except_type {
                    out.push_str(" raises ");
                    out.push_str(&self.format(*e));
                }
                out
            }
            TypeKind::Arguments { types } => {
                let mut out = "arguments(".to_owned();
                for (i, m) in types.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&self.format(*m));
                }
                out.push(')');
                out
            }
            TypeKind::Unique { name, .. } => name.clone(),
        }
    }

    fn format_fields(&self, head: &str, fields: &[TupleField]) -> String {
        let mut out = format!("{}(", head);
        for (i, f) in fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if let Some(name) = &f.name {
                out.push_str(name);
                out.push('=');
            }
            out.push_str(&self.format(f.ty));
        }
        out.push(')');
        out
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}
