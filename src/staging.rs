//! Staging hooks for syntax-extend.
//!
//! The engine compiles a staged function, runs it on the current expansion
//! environment and hands the environment it returns back to the expander.
//! Both sides of that exchange live outside this crate: the backend that
//! turns a specialized function into callable code, and the expander that
//! re-expands the remainder of the source block. The `Stager` trait bundles
//! the two so a session can be wired up with one object.

use crate::ast::value::ValueId;
use crate::error::Result;
use crate::session::Session;

/// Opaque handle to an expansion environment. Only the stager interprets
/// it; the engine just threads it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeRef(pub u64);

/// A compiled staged macro. Staged functions come in two accepted shapes:
/// a plain environment transformer and a raising one.
pub enum ScopeMacro {
    Plain(Box<dyn FnMut(ScopeRef) -> ScopeRef>),
    Raising(Box<dyn FnMut(ScopeRef) -> Result<ScopeRef>>),
}

/// Backend and expander hooks consumed by syntax-extend specialization.
pub trait Stager {
    /// Compiles a completed, specialized function to a callable entry
    /// point. Invoked once per syntax-extend stage.
    fn compile(&mut self, session: &mut Session, function: ValueId) -> Result<ScopeMacro>;

    /// Re-expands the staged payload in `scope` and returns the expansion
    /// to specialize in place of the syntax-extend node. `enclosing` is the
    /// template whose body the stage appeared in.
    fn expand_inline(
        &mut self,
        session: &mut Session,
        enclosing: Option<ValueId>,
        payload: u64,
        scope: ScopeRef,
    ) -> Result<ValueId>;
}
