//! Tests for syntax-extend staging: signature checking, the two macro
//! shapes, and re-expansion through the stager hooks.

use std::cell::Cell;
use std::rc::Rc;

use keel::ast::value::FunctionData;
use keel::ast::ValueKind;
use keel::{
    Anchor, Error, ErrorKind, ScopeMacro, ScopeRef, Session, Stager, ValueId,
};

fn a() -> Anchor {
    Anchor::unknown()
}

fn fn_data(s: &Session, f: ValueId) -> &FunctionData {
    match s.value_kind(f) {
        ValueKind::Function(data) => data,
        other => panic!("expected a Function, got {}", other.name()),
    }
}

/// Stager stub: the compiled macro bumps the environment handle, and
/// re-expansion produces a constant in the returned environment.
struct StubStager {
    raising: bool,
    seen_scope: Rc<Cell<u64>>,
    seen_payload: Rc<Cell<u64>>,
}

impl Stager for StubStager {
    fn compile(&mut self, _session: &mut Session, _function: ValueId) -> Result<ScopeMacro, Error> {
        if self.raising {
            Ok(ScopeMacro::Raising(Box::new(|env| Ok(ScopeRef(env.0 + 1)))))
        } else {
            Ok(ScopeMacro::Plain(Box::new(|env| ScopeRef(env.0 + 1))))
        }
    }

    fn expand_inline(
        &mut self,
        session: &mut Session,
        _enclosing: Option<ValueId>,
        payload: u64,
        scope: ScopeRef,
    ) -> Result<ValueId, Error> {
        self.seen_scope.set(scope.0);
        self.seen_payload.set(payload);
        let i32_ty = session.types.i32_ty;
        Ok(session.const_int(Anchor::unknown(), i32_ty, 7))
    }
}

/// Builds `enclosing`, a zero-parameter template whose body is one
/// syntax-extend node over `stage_body`.
fn build_extend(s: &mut Session, stage_body: impl FnOnce(&mut Session, ValueId) -> ValueId) -> ValueId {
    let enclosing = s.template_decl(a(), "top");
    let env = s.symbol_value(a(), "env");
    let body = stage_body(s, env);
    let stage = s.template(a(), "stage", vec![env], body);
    s.set_template_scope(stage, enclosing);
    let sx = s.syntax_extend(a(), stage, 99, ScopeRef(5));
    s.set_template_body(enclosing, sx);
    enclosing
}

#[test]
fn test_plain_stage_runs_and_reexpands() {
    let mut s = Session::new();
    let seen_scope = Rc::new(Cell::new(0));
    let seen_payload = Rc::new(Cell::new(0));
    s.set_stager(Box::new(StubStager {
        raising: false,
        seen_scope: seen_scope.clone(),
        seen_payload: seen_payload.clone(),
    }));

    // the staged function is the identity over environments
    let enclosing = build_extend(&mut s, |_s, env| env);
    let f = s.specialize(None, enclosing, &[]).unwrap();

    let i32_ty = s.types.i32_ty;
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    // the macro ran on the recorded environment and its result fed the
    // re-expansion
    assert_eq!(seen_scope.get(), 6);
    assert_eq!(seen_payload.get(), 99);
}

#[test]
fn test_raising_stage_signature_is_accepted() {
    let mut s = Session::new();
    let seen_scope = Rc::new(Cell::new(0));
    let seen_payload = Rc::new(Cell::new(0));
    s.set_stager(Box::new(StubStager {
        raising: true,
        seen_scope: seen_scope.clone(),
        seen_payload: seen_payload.clone(),
    }));

    // a staged function that calls a raising extern acquires the raising
    // signature
    let enclosing = build_extend(&mut s, |s, env| {
        let scope_ty = s.types.scope_ty;
        let error_ty = s.types.error_ty;
        let raising = s.types.raising_function_type(error_ty, scope_ty, &[scope_ty]);
        let sig = s.types.native_ro_pointer_type(raising);
        let ext = s.extern_(a(), "reload-scope", sig);
        s.call(a(), ext, vec![env])
    });
    let f = s.specialize(None, enclosing, &[]).unwrap();

    let i32_ty = s.types.i32_ty;
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    assert_eq!(seen_scope.get(), 6);
}

#[test]
fn test_wrong_stage_signature_is_rejected() {
    let mut s = Session::new();
    s.set_stager(Box::new(StubStager {
        raising: false,
        seen_scope: Rc::new(Cell::new(0)),
        seen_payload: Rc::new(Cell::new(0)),
    }));

    // returns an integer instead of an environment
    let enclosing = build_extend(&mut s, |s, _env| {
        let i32_ty = s.types.i32_ty;
        s.const_int(a(), i32_ty, 1)
    });
    let err = s.specialize(None, enclosing, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SyntaxExtendSignature { .. }));
}

#[test]
fn test_missing_stager_is_reported() {
    let mut s = Session::new();
    let enclosing = build_extend(&mut s, |_s, env| env);
    let err = s.specialize(None, enclosing, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoStagingBackend));
}
