//! Tests for control flow: branch folding, loops with break/repeat,
//! explicit returns, raises and the try handler.

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

fn specialize_if_body(
    s: &mut Session,
    cond: ValueId,
    then_value: ValueId,
    else_value: ValueId,
) -> Result<ValueId, keel::Error> {
    // bind the branch result through a let so folding is observable
    // without the return wrapper interfering
    let x = s.symbol_value(a(), "x");
    let clause = Clause { anchor: a(), cond, value: then_value };
    let iff = s.if_(a(), vec![clause], else_value);
    let binding = s.let_bind(a(), vec![x], vec![iff]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "select", vec![], body);
    s.specialize(None, t, &[])
}

#[test]
fn test_if_constant_true_selects_then_branch() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let cond = s.const_bool(a(), true);
    let c7 = s.const_int(a(), i32_ty, 7);
    let c9 = s.const_int(a(), i32_ty, 9);
    let f = specialize_if_body(&mut s, cond, c7, c9).unwrap();
    match s.value_kind(returned_value(&s, f)) {
        ValueKind::ConstInt { value } => assert_eq!(*value, 7),
        other => panic!("expected ConstInt, got {}", other.name()),
    }
}

#[test]
fn test_if_constant_false_selects_else_branch() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let cond = s.const_bool(a(), false);
    let c7 = s.const_int(a(), i32_ty, 7);
    let c9 = s.const_int(a(), i32_ty, 9);
    let f = specialize_if_body(&mut s, cond, c7, c9).unwrap();
    match s.value_kind(returned_value(&s, f)) {
        ValueKind::ConstInt { value } => assert_eq!(*value, 9),
        other => panic!("expected ConstInt, got {}", other.name()),
    }
}

#[test]
fn test_if_rejects_non_bool_condition() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let cond = s.const_int(a(), i32_ty, 1);
    let c7 = s.const_int(a(), i32_ty, 7);
    let c9 = s.const_int(a(), i32_ty, 9);
    let err = specialize_if_body(&mut s, cond, c7, c9).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidConditionType(_)));
}

#[test]
fn test_if_branch_type_mismatch_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let bool_ty = s.types.bool_ty;

    let b = s.symbol_value(a(), "b");
    let c1 = s.const_int(a(), i32_ty, 1);
    let name = s.const_string(a(), "x");
    let x = s.symbol_value(a(), "x");
    let clause = Clause { anchor: a(), cond: b, value: c1 };
    let iff = s.if_(a(), vec![clause], name);
    let binding = s.let_bind(a(), vec![x], vec![iff]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "mixed", vec![b], body);

    let err = s.specialize(None, t, &[bool_ty]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MergeMismatch { .. }));
}

#[test]
fn test_counting_loop() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    // loop i := 0 { if i < 10 { repeat (i + 1) } else { break i } }
    let i = s.symbol_value(a(), "i");
    let c0 = s.const_int(a(), i32_ty, 0);
    let c1 = s.const_int(a(), i32_ty, 1);
    let c10 = s.const_int(a(), i32_ty, 10);
    let cond = builtin_call(&mut s, Builtin::ICmpSLt, vec![i, c10]);
    let next = builtin_call(&mut s, Builtin::Add, vec![i, c1]);
    let again = s.repeat(a(), vec![next]);
    let out = s.break_(a(), i);
    let clause = Clause { anchor: a(), cond, value: again };
    let iff = s.if_(a(), vec![clause], out);
    let lp = s.loop_(a(), vec![i], vec![c0], iff);
    let t = s.template(a(), "count", vec![], lp);

    let f = s.specialize(None, t, &[]).unwrap();
    let data = fn_data(&s, f);
    assert_eq!(data.return_type, Some(i32_ty));
    let lp = returned_value(&s, f);
    match s.value_kind(lp) {
        ValueKind::Loop(data) => {
            assert_eq!(data.params.len(), 1);
            assert_eq!(data.return_type, Some(i32_ty));
        }
        other => panic!("expected Loop, got {}", other.name()),
    }
    assert_eq!(s.value_type(lp), Some(i32_ty));
}

#[test]
fn test_breaks_with_incompatible_types_are_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let bool_ty = s.types.bool_ty;

    let b = s.symbol_value(a(), "b");
    let c5 = s.const_int(a(), i32_ty, 5);
    let name = s.const_string(a(), "x");
    let break_int = s.break_(a(), c5);
    let break_str = s.break_(a(), name);
    let clause = Clause { anchor: a(), cond: b, value: break_int };
    let iff = s.if_(a(), vec![clause], break_str);
    let lp = s.loop_(a(), vec![], vec![], iff);
    let t = s.template(a(), "conflict", vec![b], lp);

    let err = s.specialize(None, t, &[bool_ty]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MergeMismatch { .. }));
}

#[test]
fn test_break_outside_loop_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c1 = s.const_int(a(), i32_ty, 1);
    let node = s.break_(a(), c1);
    let t = s.template(a(), "stray", vec![], node);
    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::BreakOutsideLoop));
}

#[test]
fn test_repeat_outside_loop_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c1 = s.const_int(a(), i32_ty, 1);
    let node = s.repeat(a(), vec![c1]);
    let t = s.template(a(), "stray", vec![], node);
    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RepeatOutsideLoop));
}

#[test]
fn test_no_return_statement_before_block_tail_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let boom = s.const_string(a(), "boom");
    let raised = s.raise(a(), boom);
    let c1 = s.const_int(a(), i32_ty, 1);
    let body = s.block(a(), vec![raised], c1);
    let t = s.template(a(), "dead-tail", vec![], body);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoReturnNotLast));
}

#[test]
fn test_raise_merges_into_function_exception_type() {
    let mut s = Session::new();
    let string_ty = s.types.string_ty;
    let bool_ty = s.types.bool_ty;
    let i32_ty = s.types.i32_ty;

    let b = s.symbol_value(a(), "b");
    let boom = s.const_string(a(), "boom");
    let raised = s.raise(a(), boom);
    let c1 = s.const_int(a(), i32_ty, 1);
    let clause = Clause { anchor: a(), cond: b, value: raised };
    let iff = s.if_(a(), vec![clause], c1);
    let t = s.template(a(), "may-fail", vec![b], iff);

    let f = s.specialize(None, t, &[bool_ty]).unwrap();
    let data = fn_data(&s, f);
    assert_eq!(data.return_type, Some(i32_ty));
    assert_eq!(data.except_type, Some(string_ty));

    // the exception surfaces in the raising signature
    let sig = s.value_type(f).unwrap();
    let fn_ty = s.types.extract_function_type(sig).unwrap();
    let (_, _, except) = s.types.function_parts(fn_ty).unwrap();
    assert_eq!(except, Some(string_ty));
}

#[test]
fn test_explicit_return_in_non_tail_position() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let bool_ty = s.types.bool_ty;

    let b = s.symbol_value(a(), "b");
    let c1 = s.const_int(a(), i32_ty, 1);
    let early = s.return_(a(), c1);
    let none = s.const_none(a());
    let clause = Clause { anchor: a(), cond: b, value: early };
    let iff = s.if_(a(), vec![clause], none);
    let c2 = s.const_int(a(), i32_ty, 2);
    let body = s.block(a(), vec![iff], c2);
    let t = s.template(a(), "early", vec![b], body);

    let f = s.specialize(None, t, &[bool_ty]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
}

#[test]
fn test_try_without_raise_collapses_to_body() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c1 = s.const_int(a(), i32_ty, 1);
    let e = s.symbol_value(a(), "e");
    let c2 = s.const_int(a(), i32_ty, 2);
    let guarded = s.try_(a(), c1, e, c2);
    let t = s.template(a(), "safe", vec![], guarded);

    let f = s.specialize(None, t, &[]).unwrap();
    let data = fn_data(&s, f);
    assert_eq!(data.return_type, Some(i32_ty));
    match s.value_kind(returned_value(&s, f)) {
        ValueKind::ConstInt { value } => assert_eq!(*value, 1),
        other => panic!("expected ConstInt, got {}", other.name()),
    }
}

#[test]
fn test_try_binds_handler_to_raised_type() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let string_ty = s.types.string_ty;

    // x := try { raise "boom" } except e { 0 }
    let boom = s.const_string(a(), "boom");
    let raised = s.raise(a(), boom);
    let e = s.symbol_value(a(), "e");
    let c0 = s.const_int(a(), i32_ty, 0);
    let guarded = s.try_(a(), raised, e, c0);
    let x = s.symbol_value(a(), "x");
    let binding = s.let_bind(a(), vec![x], vec![guarded]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "handled", vec![], body);

    let f = s.specialize(None, t, &[]).unwrap();
    let data = fn_data(&s, f);
    assert_eq!(data.return_type, Some(i32_ty));
    // the raise was caught, so the function itself does not raise
    assert_eq!(data.except_type, None);

    // the try survives as the let-bound value, typed by the merge of its
    // two bodies
    let block = data.value;
    let let_node = match s.value_kind(block) {
        ValueKind::Block(bdata) => bdata.body[0],
        other => panic!("expected Block, got {}", other.name()),
    };
    let try_node = match s.value_kind(let_node) {
        ValueKind::Let(ldata) => ldata.args[0],
        other => panic!("expected Let, got {}", other.name()),
    };
    match s.value_kind(try_node) {
        ValueKind::Try(tdata) => {
            assert_eq!(s.value_type(tdata.except_param), Some(string_ty));
            assert_eq!(tdata.except_type, Some(string_ty));
        }
        other => panic!("expected Try, got {}", other.name()),
    }
    assert_eq!(s.value_type(try_node), Some(i32_ty));
}

#[test]
fn test_handler_can_use_exception_binding() {
    let mut s = Session::new();
    let string_ty = s.types.string_ty;

    let boom = s.const_string(a(), "boom");
    let raised = s.raise(a(), boom);
    let e = s.symbol_value(a(), "e");
    let guarded = s.try_(a(), raised, e, e);
    let x = s.symbol_value(a(), "x");
    let binding = s.let_bind(a(), vec![x], vec![guarded]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "rethrowable", vec![], body);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(string_ty));
}
