pub mod anchor;
pub mod builtin;
pub mod printer;
pub mod value;

pub use anchor::{Anchor, SourceId};
pub use builtin::Builtin;
pub use value::{
    AstMacroFn, BlockData, CallData, Clause, FunctionData, IfData, LetData, LoopData,
    PointerValue, SymbolValueData, SyntaxExtendData, TemplateData, TryData, Value, ValueId,
    ValueKind,
};
