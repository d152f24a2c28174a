use thiserror::Error;

use crate::ast::anchor::Anchor;

/// Result alias used throughout the specializer.
pub type Result<T> = std::result::Result<T, Error>;

/// The reason a specialization failed.
///
/// Type names in messages are pre-rendered by the type formatter at the
/// point where the error is raised, so errors stay self-contained once they
/// leave the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ErrorKind {
    // -----------------------------------------------------------------------
    // Structural errors
    // -----------------------------------------------------------------------
    #[error("no-return expression is not last expression in block")]
    NoReturnNotLast,

    #[error("variadic symbol is not in last place")]
    VariadicSymbolNotLast,

    #[error("illegal break outside loop")]
    BreakOutsideLoop,

    #[error("illegal repeat outside loop")]
    RepeatOutsideLoop,

    #[error("return statement is illegal inside inline function")]
    ReturnInInline,

    #[error("unbound symbol '{0}'")]
    UnboundSymbol(String),

    #[error("cannot find specialized frame for scope of '{0}'")]
    CannotFindFrame(String),

    // -----------------------------------------------------------------------
    // Type errors
    // -----------------------------------------------------------------------
    #[error("cannot merge expression types {lhs} and {rhs}")]
    MergeMismatch { lhs: String, rhs: String },

    #[error("invalid condition type {0}, must be bool")]
    InvalidConditionType(String),

    #[error("argument count mismatch (need {expected}, got {got})")]
    ArgumentCountMismatch { expected: usize, got: usize },

    #[error("argument type mismatch (expected {expected}, got {got})")]
    ArgumentTypeMismatch { expected: String, got: String },

    #[error("cannot call value of type {0}")]
    InvalidCallType(String),

    #[error("untyped recursive call")]
    UntypedRecursiveCall,

    #[error("type mismatch (expected {expected}, got {got})")]
    TypeMismatch { expected: String, got: String },

    #[error("expected a {expected} type, got {got}")]
    ExpectedKind { expected: &'static str, got: String },

    #[error("vector size mismatch between {lhs} and {rhs}")]
    VectorSizeMismatch { lhs: String, rhs: String },

    #[error(
        "cannot bitcast value of type {from} to type {to} \
         because storage types are not of compatible category"
    )]
    CannotBitcast { from: String, to: String },

    #[error("cannot bitcast value of type {from} to type {to} with aggregate storage type {storage}")]
    BitcastToAggregate { from: String, to: String, storage: String },

    #[error("invalid operand types {lhs} and {rhs}")]
    InvalidOperands { lhs: String, rhs: String },

    #[error("cannot load value from address of type {0} because the target is non-readable")]
    PointerNotReadable(String),

    #[error("cannot store value at address of type {0} because the target is non-writable")]
    PointerNotWritable(String),

    #[error("pointer of type {0} is not a heap pointer")]
    PointerNotHeap(String),

    #[error("cannot type builtin {0}")]
    CannotTypeBuiltin(&'static str),

    #[error("no such field {field} in storage type {ty}")]
    NoSuchField { field: String, ty: String },

    #[error("constant expected, got {0}")]
    ConstantExpected(String),

    #[error("cannot extract value from type {0}")]
    CannotExtractValue(String),

    #[error("cannot insert value into type {0}")]
    CannotInsertValue(String),

    #[error("cannot get element pointer from type {0}")]
    CannotGetElementPointer(String),

    #[error("type {0} is opaque and has no storage")]
    OpaqueStorage(String),

    #[error("index {index} is out of range for type {ty}")]
    IndexOutOfRange { ty: String, index: usize },

    // -----------------------------------------------------------------------
    // Staging errors
    // -----------------------------------------------------------------------
    #[error(
        "syntax-extend function has wrong signature \
         (expected function of type {expected} or {expected_raising}, got {got})"
    )]
    SyntaxExtendSignature {
        expected: String,
        expected_raising: String,
        got: String,
    },

    #[error("no staging backend installed in this session")]
    NoStagingBackend,
}

/// One entry of an error's call trace. Appended by call specialization and
/// by the function drivers while the error propagates outward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub anchor: Anchor,
    pub context: String,
}

/// A specialization error: the reason, the source anchor closest to the
/// failure, and the call trace accumulated during propagation.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    pub anchor: Option<Anchor>,
    pub trace: Vec<TraceFrame>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, anchor: None, trace: Vec::new() }
    }

    /// Attaches an anchor unless an inner, more precise one is already set.
    pub fn at(mut self, anchor: Anchor) -> Self {
        if self.anchor.is_none() {
            self.anchor = Some(anchor);
        }
        self
    }

    /// Appends a trace frame. Outer frames come later in the list.
    pub fn traced(mut self, anchor: Anchor, context: impl Into<String>) -> Self {
        self.trace.push(TraceFrame { anchor, context: context.into() });
        self
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}
