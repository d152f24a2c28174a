//! KEEL: whole-program compiler for a statically-typed language with
//! first-class functions. This crate is the specialization engine, the
//! pass that turns untyped templates into typed, monomorphized functions:
//!
//! ```text
//! source → Expander → [Template] → specialize(frame, template, types)
//!   → [Function] → code generation
//! ```
//!
//! Specialization performs, in one recursive pass over the template body:
//! constant folding and branch pruning, builtin operator type checking,
//! closure resolution, inline expansion, cooperative scheduling of
//! mutually recursive instances, and memoization of specialized functions.
//!
//! The front end (lexer, expander) and the back end are separate
//! components; they communicate with this crate through the `Session`
//! construction API, the opaque staging hooks in [`staging`], and the
//! typed functions this crate produces.

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod session;
pub mod specialize;
pub mod staging;
pub mod types;

pub use ast::{Anchor, Builtin, SourceId, Value, ValueId, ValueKind};
pub use error::{Error, ErrorKind, Result};
pub use session::Session;
pub use specialize::{EvalTarget, SpecContext};
pub use staging::{ScopeMacro, ScopeRef, Stager};
pub use types::{TypeId, TypeKind, TypeStore};
