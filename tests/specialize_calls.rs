//! Tests for call specialization: inline expansion, closure calls,
//! recursive type inference, AST macros and function-pointer signatures.

use keel::ast::value::FunctionData;
use keel::ast::{Clause, ValueKind};
use keel::{Anchor, Builtin, ErrorKind, Session, ValueId};

fn a() -> Anchor {
    Anchor::unknown()
}

fn builtin_call(s: &mut Session, b: Builtin, args: Vec<ValueId>) -> ValueId {
    let callee = s.const_builtin(a(), b);
    s.call(a(), callee, args)
}

fn fn_data(s: &Session, f: ValueId) -> &FunctionData {
    match s.value_kind(f) {
        ValueKind::Function(data) => data,
        other => panic!("expected a Function, got {}", other.name()),
    }
}

fn returned_value(s: &Session, f: ValueId) -> ValueId {
    match s.value_kind(fn_data(s, f).value) {
        ValueKind::Return { value } => *value,
        other => panic!("expected Return, got {}", other.name()),
    }
}

#[test]
fn test_inline_identity_folds_to_constant() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let x = s.symbol_value(a(), "x");
    let id = s.template(a(), "id", vec![x], x);
    s.set_template_inline(id);

    let caller = s.template_decl(a(), "caller");
    s.set_template_scope(id, caller);
    let c42 = s.const_int(a(), i32_ty, 42);
    let call = s.call(a(), id, vec![c42]);
    s.set_template_body(caller, call);

    let f = s.specialize(None, caller, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    // the constant flows straight through; no parameter slot remains
    assert_eq!(returned_value(&s, f), c42);
}

#[test]
fn test_inline_runtime_argument_keeps_let() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let x = s.symbol_value(a(), "x");
    let square = {
        let body = builtin_call(&mut s, Builtin::Mul, vec![x, x]);
        s.template(a(), "square", vec![x], body)
    };
    s.set_template_inline(square);

    // a non-symbolic argument needs a runtime slot
    let caller = s.template_decl(a(), "caller");
    s.set_template_scope(square, caller);
    let n = s.symbol_value(a(), "n");
    let c1 = s.const_int(a(), i32_ty, 1);
    let bumped = builtin_call(&mut s, Builtin::Add, vec![n, c1]);
    let call = s.call(a(), square, vec![bumped]);
    s.set_template_params(caller, vec![n]);
    s.set_template_body(caller, call);

    let f = s.specialize(None, caller, &[i32_ty]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    // the expansion keeps a let for the runtime slot; the body's return
    // was absorbed into the caller
    let expanded = fn_data(&s, f).value;
    match s.value_kind(expanded) {
        ValueKind::Block(data) => {
            assert_eq!(data.body.len(), 1);
            assert!(matches!(s.value_kind(data.body[0]), ValueKind::Let(_)));
            match s.value_kind(data.value) {
                ValueKind::Return { value } => {
                    assert!(matches!(s.value_kind(*value), ValueKind::Call(_)));
                    assert_eq!(s.value_type(*value), Some(i32_ty));
                }
                other => panic!("expected Return, got {}", other.name()),
            }
        }
        other => panic!("expected Block, got {}", other.name()),
    }
}

#[test]
fn test_return_inside_inline_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let x = s.symbol_value(a(), "x");
    let early = s.return_(a(), x);
    let id = s.template(a(), "id", vec![x], early);
    s.set_template_inline(id);

    let c42 = s.const_int(a(), i32_ty, 42);
    let call = s.call(a(), id, vec![c42]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReturnInInline));
}

#[test]
fn test_closure_call_specializes_callee() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let x = s.symbol_value(a(), "x");
    let id = s.template(a(), "id", vec![x], x);

    let c5 = s.const_int(a(), i32_ty, 5);
    let call = s.call(a(), id, vec![c5]);
    let t = s.template(a(), "caller", vec![], call);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    let call_node = returned_value(&s, f);
    match s.value_kind(call_node) {
        ValueKind::Call(data) => {
            assert!(matches!(s.value_kind(data.callee), ValueKind::Function(_)));
            assert!(fn_data(&s, data.callee).complete);
        }
        other => panic!("expected Call, got {}", other.name()),
    }
    assert_eq!(s.value_type(call_node), Some(i32_ty));
}

#[test]
fn test_mutual_recursion_reaches_fixpoint() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let bool_ty = s.types.bool_ty;

    // f n = if n == 0 { g n } else { true }
    // g n = f n
    let f_decl = s.template_decl(a(), "f");
    let g_decl = s.template_decl(a(), "g");

    let n = s.symbol_value(a(), "n");
    let c0 = s.const_int(a(), i32_ty, 0);
    let cond = builtin_call(&mut s, Builtin::ICmpEq, vec![n, c0]);
    let rec = s.call(a(), g_decl, vec![n]);
    let base = s.const_bool(a(), true);
    let clause = Clause { anchor: a(), cond, value: rec };
    let f_body = s.if_(a(), vec![clause], base);
    s.set_template_params(f_decl, vec![n]);
    s.set_template_body(f_decl, f_body);

    let m = s.symbol_value(a(), "m");
    let g_body = s.call(a(), f_decl, vec![m]);
    s.set_template_params(g_decl, vec![m]);
    s.set_template_body(g_decl, g_body);

    let f = s.specialize(None, f_decl, &[i32_ty]).unwrap();
    let data = fn_data(&s, f);
    assert!(data.complete);
    assert_eq!(data.return_type, Some(bool_ty));

    let g = s.specialize(None, g_decl, &[i32_ty]).unwrap();
    assert!(fn_data(&s, g).complete);
    assert_eq!(fn_data(&s, g).return_type, Some(bool_ty));
}

#[test]
fn test_unbounded_recursion_has_no_return_type() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    // f n = g n ; g n = f n, with no base case anywhere
    let f_decl = s.template_decl(a(), "f");
    let g_decl = s.template_decl(a(), "g");

    let n = s.symbol_value(a(), "n");
    let f_body = s.call(a(), g_decl, vec![n]);
    s.set_template_params(f_decl, vec![n]);
    s.set_template_body(f_decl, f_body);

    let m = s.symbol_value(a(), "m");
    let g_body = s.call(a(), f_decl, vec![m]);
    s.set_template_params(g_decl, vec![m]);
    s.set_template_body(g_decl, g_body);

    let err = s.specialize(None, f_decl, &[i32_ty]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UntypedRecursiveCall));
}

#[test]
fn test_calling_a_plain_value_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c5 = s.const_int(a(), i32_ty, 5);
    let call = s.call(a(), c5, vec![]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidCallType(_)));
}

#[test]
fn test_function_pointer_call_merges_exception() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let string_ty = s.types.string_ty;

    let raising = s.types.raising_function_type(string_ty, i32_ty, &[i32_ty]);
    let sig = s.types.native_ro_pointer_type(raising);
    let parse = s.extern_(a(), "parse", sig);

    let c5 = s.const_int(a(), i32_ty, 5);
    let call = s.call(a(), parse, vec![c5]);
    let t = s.template(a(), "caller", vec![], call);

    let f = s.specialize(None, t, &[]).unwrap();
    let data = fn_data(&s, f);
    assert_eq!(data.return_type, Some(i32_ty));
    assert_eq!(data.except_type, Some(string_ty));
}

#[test]
fn test_function_pointer_arity_is_checked() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let plain = s.types.function_type(i32_ty, &[i32_ty, i32_ty]);
    let sig = s.types.native_ro_pointer_type(plain);
    let ext = s.extern_(a(), "pair", sig);

    let c5 = s.const_int(a(), i32_ty, 5);
    let call = s.call(a(), ext, vec![c5]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::ArgumentCountMismatch { expected: 2, got: 1 }
    ));
}

#[test]
fn test_function_pointer_argument_types_are_checked() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let f32_ty = s.types.f32_ty;

    let plain = s.types.function_type(f32_ty, &[f32_ty]);
    let sig = s.types.native_ro_pointer_type(plain);
    let ext = s.extern_(a(), "half", sig);

    let c5 = s.const_int(a(), i32_ty, 5);
    let call = s.call(a(), ext, vec![c5]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ArgumentTypeMismatch { .. }));
}

#[test]
fn test_writable_pointer_accepted_for_readonly_parameter() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let ro_ptr = s.types.native_ro_pointer_type(i32_ty);
    let rw_ptr = s.types.native_pointer_type(i32_ty);
    let plain = s.types.function_type(i32_ty, &[ro_ptr]);
    let sig = s.types.native_ro_pointer_type(plain);
    let ext = s.extern_(a(), "peek", sig);

    // produce a writable pointer value and pass it where a read-only
    // pointer is declared
    let rw_const = s.const_type(a(), rw_ptr);
    let rw_value = builtin_call(&mut s, Builtin::Undef, vec![rw_const]);
    let call = s.call(a(), ext, vec![rw_value]);
    let t = s.template(a(), "caller", vec![], call);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
}

#[test]
fn test_readonly_pointer_rejected_for_writable_parameter() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let ro_ptr = s.types.native_ro_pointer_type(i32_ty);
    let rw_ptr = s.types.native_pointer_type(i32_ty);
    let plain = s.types.function_type(i32_ty, &[rw_ptr]);
    let sig = s.types.native_ro_pointer_type(plain);
    let ext = s.extern_(a(), "poke", sig);

    let ro_const = s.const_type(a(), ro_ptr);
    let ro_value = builtin_call(&mut s, Builtin::Undef, vec![ro_const]);
    let call = s.call(a(), ext, vec![ro_value]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ArgumentTypeMismatch { .. }));
}

#[test]
fn test_raw_call_requires_exact_types() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let ro_ptr = s.types.native_ro_pointer_type(i32_ty);
    let rw_ptr = s.types.native_pointer_type(i32_ty);
    let plain = s.types.function_type(i32_ty, &[ro_ptr]);
    let sig = s.types.native_ro_pointer_type(plain);
    let ext = s.extern_(a(), "peek", sig);

    let rw_const = s.const_type(a(), rw_ptr);
    let rw_value = builtin_call(&mut s, Builtin::Undef, vec![rw_const]);
    let call = s.call(a(), ext, vec![rw_value]);
    s.mark_raw_call(call);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ArgumentTypeMismatch { .. }));
}

fn first_argument_macro(
    _s: &mut Session,
    args: &[ValueId],
) -> Result<ValueId, keel::Error> {
    Ok(args[0])
}

fn failing_macro(_s: &mut Session, _args: &[ValueId]) -> Result<ValueId, keel::Error> {
    Err(keel::Error::new(ErrorKind::UnboundSymbol("oops".into())))
}

#[test]
fn test_ast_macro_rewrites_call() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let entry = s.const_ast_macro(a(), first_argument_macro);
    let c5 = s.const_int(a(), i32_ty, 5);
    let c6 = s.const_int(a(), i32_ty, 6);
    let call = s.call(a(), entry, vec![c5, c6]);
    let t = s.template(a(), "caller", vec![], call);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(returned_value(&s, f), c5);
}

#[test]
fn test_ast_macro_error_surfaces() {
    let mut s = Session::new();

    let entry = s.const_ast_macro(a(), failing_macro);
    let call = s.call(a(), entry, vec![]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnboundSymbol(_)));
}

#[test]
fn test_call_errors_carry_a_trace() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c1 = s.const_int(a(), i32_ty, 1);
    let name = s.const_string(a(), "one");
    let call = builtin_call(&mut s, Builtin::Add, vec![c1, name]);
    let t = s.template(a(), "caller", vec![], call);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    // one frame from the call site, one from the function driver
    assert_eq!(err.trace.len(), 2);
    let rendered = keel::diagnostics::render_error(&s, &err);
    assert!(rendered.contains("while checking call"));
    assert!(rendered.contains("in function 'caller'"));
}
