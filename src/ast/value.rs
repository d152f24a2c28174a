//! The AST node model shared by the expander and the specializer.
//!
//! Nodes live in a flat arena on the `Session` and reference each other by
//! `ValueId`. Every node carries an immutable anchor and a mutable type
//! slot that stays `None` until specialization types it.

use std::collections::HashMap;

use crate::ast::anchor::Anchor;
use crate::ast::builtin::Builtin;
use crate::error::Result;
use crate::session::Session;
use crate::staging::ScopeRef;
use crate::types::TypeId;

/// An opaque, index-based reference to an AST node within a `Session`.
///
/// Invariant: a `ValueId` is only valid within the session that produced
/// it. Node identity (id equality) is the identity notion used by frame
/// bindings and the instance cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Entry point of an AST macro: receives the spliced call arguments and
/// returns a replacement node to specialize in the caller's context.
pub type AstMacroFn = fn(&mut Session, &[ValueId]) -> Result<ValueId>;

/// Payload of a `ConstPointer` node.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerValue {
    /// A type constant.
    Type(TypeId),
    /// A closure: template plus the specialized frame it closes over.
    Closure {
        template: ValueId,
        frame: Option<ValueId>,
    },
    Str(String),
    /// An interned symbol constant.
    Symbol(String),
    AstMacro(AstMacroFn),
    /// A builtin operator constant.
    Builtin(Builtin),
    /// Opaque expansion payload, only meaningful to the stager.
    List(u64),
    Raw(u64),
}

/// An untyped function literal produced by the expander.
///
/// Templates are immutable once the expander finishes with them; the
/// `value` slot is `None` only for forward declarations still being built.
#[derive(Debug, Clone)]
pub struct TemplateData {
    pub name: String,
    /// `SymbolValue` nodes; a variadic symbol may only come last.
    pub params: Vec<ValueId>,
    pub value: Option<ValueId>,
    /// The enclosing template, if any. Used to locate the specialized
    /// frame a closure literal captures.
    pub scope: Option<ValueId>,
    /// Inline templates expand at each call site instead of becoming
    /// separate functions; explicit returns are rejected inside them.
    pub is_inline: bool,
}

/// A typed, specialized instance of a template.
#[derive(Debug, Clone)]
pub struct FunctionData {
    pub name: String,
    pub original: Option<ValueId>,
    /// The enclosing specialized function acting as lexical environment.
    pub frame: Option<ValueId>,
    /// The argument types this instance was specialized against.
    pub instance_args: Vec<TypeId>,
    /// Typed `SymbolValue` nodes.
    pub params: Vec<ValueId>,
    pub value: ValueId,
    /// Merged from every return site; `None` while still unknown.
    pub return_type: Option<TypeId>,
    /// Merged from every raise site and raising callee.
    pub except_type: Option<TypeId>,
    /// Set once the body is fully typed; the instance is frozen afterwards.
    pub complete: bool,
    /// Binding map from template-side nodes to specialized nodes.
    pub(crate) bindings: HashMap<ValueId, ValueId>,
}

#[derive(Debug, Clone)]
pub struct SymbolValueData {
    pub name: String,
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub struct BlockData {
    pub body: Vec<ValueId>,
    pub value: ValueId,
}

/// Parallel binding of `params := args`. Always types as empty arguments.
#[derive(Debug, Clone)]
pub struct LetData {
    pub params: Vec<ValueId>,
    pub args: Vec<ValueId>,
}

#[derive(Debug, Clone)]
pub struct LoopData {
    pub params: Vec<ValueId>,
    pub args: Vec<ValueId>,
    pub value: ValueId,
    /// Merged from every reachable break.
    pub return_type: Option<TypeId>,
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub anchor: Anchor,
    pub cond: ValueId,
    pub value: ValueId,
}

#[derive(Debug, Clone)]
pub struct IfData {
    pub clauses: Vec<Clause>,
    pub else_anchor: Anchor,
    pub else_value: ValueId,
}

#[derive(Debug, Clone)]
pub struct CallData {
    pub callee: ValueId,
    pub args: Vec<ValueId>,
    /// Require exact argument types, skipping pointer leniency.
    pub raw_call: bool,
    /// Route the callee's exception type into the enclosing try.
    pub try_call: bool,
}

#[derive(Debug, Clone)]
pub struct TryData {
    pub try_value: ValueId,
    /// Bound to the collected exception type while the handler specializes.
    pub except_param: ValueId,
    pub except_value: ValueId,
    /// Merged from raises inside the try body.
    pub except_type: Option<TypeId>,
}

/// A staged macro: compile `func`, run it on the current environment, then
/// re-expand the payload in the environment it returns.
#[derive(Debug, Clone)]
pub struct SyntaxExtendData {
    pub func: ValueId,
    pub payload: u64,
    pub env: ScopeRef,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Template(TemplateData),
    Function(FunctionData),
    SymbolValue(SymbolValueData),
    Block(BlockData),
    Let(LetData),
    Loop(LoopData),
    If(IfData),
    Call(CallData),
    /// Multi-value tuple at expression position.
    ArgumentList { values: Vec<ValueId> },
    /// Projection of one element of a multi-value.
    ExtractArgument { value: ValueId, index: usize },
    /// Named wrapper for keyword arguments.
    Keyed { key: String, value: ValueId },
    Try(TryData),
    Break { value: ValueId },
    Repeat { args: Vec<ValueId> },
    Return { value: ValueId },
    Raise { value: ValueId },
    SyntaxExtend(SyntaxExtendData),
    ConstInt { value: u64 },
    ConstReal { value: f64 },
    ConstPointer(PointerValue),
    ConstTuple { values: Vec<ValueId> },
    ConstArray { values: Vec<ValueId> },
    ConstVector { values: Vec<ValueId> },
    Extern { name: String },
}

impl ValueKind {
    /// Short tag used by the printer and in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Template(_) => "Template",
            ValueKind::Function(_) => "Function",
            ValueKind::SymbolValue(_) => "SymbolValue",
            ValueKind::Block(_) => "Block",
            ValueKind::Let(_) => "Let",
            ValueKind::Loop(_) => "Loop",
            ValueKind::If(_) => "If",
            ValueKind::Call(_) => "Call",
            ValueKind::ArgumentList { .. } => "ArgumentList",
            ValueKind::ExtractArgument { .. } => "ExtractArgument",
            ValueKind::Keyed { .. } => "Keyed",
            ValueKind::Try(_) => "Try",
            ValueKind::Break { .. } => "Break",
            ValueKind::Repeat { .. } => "Repeat",
            ValueKind::Return { .. } => "Return",
            ValueKind::Raise { .. } => "Raise",
            ValueKind::SyntaxExtend(_) => "SyntaxExtend",
            ValueKind::ConstInt { .. } => "ConstInt",
            ValueKind::ConstReal { .. } => "ConstReal",
            ValueKind::ConstPointer(_) => "ConstPointer",
            ValueKind::ConstTuple { .. } => "ConstTuple",
            ValueKind::ConstArray { .. } => "ConstArray",
            ValueKind::ConstVector { .. } => "ConstVector",
            ValueKind::Extern { .. } => "Extern",
        }
    }
}

/// An AST node: kind, source anchor and the mutable type slot.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub anchor: Anchor,
    pub(crate) ty: Option<TypeId>,
}

impl Value {
    pub fn is_typed(&self) -> bool {
        self.ty.is_some()
    }

    pub fn get_type(&self) -> Option<TypeId> {
        self.ty
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ConstInt { .. }
                | ValueKind::ConstReal { .. }
                | ValueKind::ConstPointer(_)
                | ValueKind::ConstTuple { .. }
                | ValueKind::ConstArray { .. }
                | ValueKind::ConstVector { .. }
        )
    }

    /// Whether the value can stand in for a binding without a runtime slot:
    /// constants, externs and pure identifiers.
    pub fn is_symbolic(&self) -> bool {
        self.is_const()
            || matches!(
                self.kind,
                ValueKind::Extern { .. }
                    | ValueKind::SymbolValue(_)
                    | ValueKind::Function(_)
                    | ValueKind::Template(_)
            )
    }

    /// Whether the value can be dropped from a block body without changing
    /// program behavior.
    pub fn is_useless(&self) -> bool {
        if self.is_const() {
            return true;
        }
        match &self.kind {
            ValueKind::Template(_) | ValueKind::Function(_) | ValueKind::SymbolValue(_) => true,
            ValueKind::Let(data) => data.params.is_empty(),
            _ => false,
        }
    }
}
