//! Tests for argument splicing and binding: multi-value flattening,
//! variadic packing, constant inlining through lets.

use keel::ast::value::FunctionData;
use keel::ast::ValueKind;
use keel::{Anchor, ErrorKind, Session, ValueId};

fn a() -> Anchor {
    Anchor::unknown()
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
fn test_trailing_argument_list_splices_in_full() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    // x, y, z := 1, (2, 3)
    let x = s.symbol_value(a(), "x");
    let y = s.symbol_value(a(), "y");
    let z = s.symbol_value(a(), "z");
    let c1 = s.const_int(a(), i32_ty, 1);
    let c2 = s.const_int(a(), i32_ty, 2);
    let c3 = s.const_int(a(), i32_ty, 3);
    let pair = s.argument_list(a(), vec![c2, c3]);
    let binding = s.let_bind(a(), vec![x, y, z], vec![c1, pair]);

    for (observe, expected) in [(x, 1u64), (y, 2), (z, 3)] {
        let body = s.block(a(), vec![binding], observe);
        let t = s.template(a(), "observe", vec![], body);
        let f = s.specialize(None, t, &[]).unwrap();
        let value = returned_value(&s, f);
        match s.value_kind(value) {
            ValueKind::ConstInt { value } => assert_eq!(*value, expected),
            other => panic!("expected ConstInt, got {}", other.name()),
        }
    }
}

#[test]
fn test_interior_argument_list_contributes_first_element() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    // x, y := (1, 2), 9  so x takes only the first element
    let x = s.symbol_value(a(), "x");
    let y = s.symbol_value(a(), "y");
    let c1 = s.const_int(a(), i32_ty, 1);
    let c2 = s.const_int(a(), i32_ty, 2);
    let c9 = s.const_int(a(), i32_ty, 9);
    let pair = s.argument_list(a(), vec![c1, c2]);
    let binding = s.let_bind(a(), vec![x, y], vec![pair, c9]);

    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "first", vec![], body);
    let f = s.specialize(None, t, &[]).unwrap();
    match s.value_kind(returned_value(&s, f)) {
        ValueKind::ConstInt { value } => assert_eq!(*value, 1),
        other => panic!("expected ConstInt, got {}", other.name()),
    }

    let body = s.block(a(), vec![binding], y);
    let t = s.template(a(), "second", vec![], body);
    let f = s.specialize(None, t, &[]).unwrap();
    match s.value_kind(returned_value(&s, f)) {
        ValueKind::ConstInt { value } => assert_eq!(*value, 9),
        other => panic!("expected ConstInt, got {}", other.name()),
    }
}

#[test]
fn test_extract_argument_folds_literal_lists() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c10 = s.const_int(a(), i32_ty, 10);
    let c20 = s.const_int(a(), i32_ty, 20);
    let list = s.argument_list(a(), vec![c10, c20]);
    let project = s.extract_argument_node(a(), list, 1);
    let x = s.symbol_value(a(), "x");
    let binding = s.let_bind(a(), vec![x], vec![project]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "project", vec![], body);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    match s.value_kind(returned_value(&s, f)) {
        ValueKind::ConstInt { value } => assert_eq!(*value, 20),
        other => panic!("expected ConstInt, got {}", other.name()),
    }
}

#[test]
fn test_out_of_range_projection_is_nothing() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let nothing_ty = s.types.nothing_ty;

    let c10 = s.const_int(a(), i32_ty, 10);
    let c20 = s.const_int(a(), i32_ty, 20);
    let list = s.argument_list(a(), vec![c10, c20]);
    let project = s.extract_argument_node(a(), list, 5);
    let x = s.symbol_value(a(), "x");
    let binding = s.let_bind(a(), vec![x], vec![project]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "overshoot", vec![], body);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(nothing_ty));
}

#[test]
fn test_missing_argument_binds_nothing() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;
    let nothing_ty = s.types.nothing_ty;

    let x = s.symbol_value(a(), "x");
    let y = s.symbol_value(a(), "y");
    let t = s.template(a(), "partial", vec![x, y], y);

    let f = s.specialize(None, t, &[i32_ty]).unwrap();
    let data = fn_data(&s, f);
    assert_eq!(s.value_type(data.params[0]), Some(i32_ty));
    assert_eq!(s.value_type(data.params[1]), Some(nothing_ty));
    assert_eq!(data.return_type, Some(nothing_ty));
}

#[test]
fn test_variadic_symbol_not_last_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let rest = s.variadic_symbol_value(a(), "rest");
    let x = s.symbol_value(a(), "x");
    let t = s.template(a(), "bad", vec![rest, x], x);

    let err = s.specialize(None, t, &[i32_ty, i32_ty]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::VariadicSymbolNotLast));
}

#[test]
fn test_variadic_let_packs_tail() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    // first, rest... := 1, 2, 3 then observe rest
    let first = s.symbol_value(a(), "first");
    let rest = s.variadic_symbol_value(a(), "rest");
    let c1 = s.const_int(a(), i32_ty, 1);
    let c2 = s.const_int(a(), i32_ty, 2);
    let c3 = s.const_int(a(), i32_ty, 3);
    let binding = s.let_bind(a(), vec![first, rest], vec![c1, c2, c3]);
    let body = s.block(a(), vec![binding], rest);
    let t = s.template(a(), "tail", vec![], body);

    let f = s.specialize(None, t, &[]).unwrap();
    let expected = s.types.arguments_type(&[i32_ty, i32_ty]);
    assert_eq!(fn_data(&s, f).return_type, Some(expected));
}

#[test]
fn test_no_return_argument_is_rejected() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    // a raise in argument position never produces a value
    let boom = s.const_string(a(), "boom");
    let raised = s.raise(a(), boom);
    let x = s.symbol_value(a(), "x");
    let binding = s.let_bind(a(), vec![x], vec![raised]);
    let c0 = s.const_int(a(), i32_ty, 0);
    let body = s.block(a(), vec![binding], c0);
    let t = s.template(a(), "bad", vec![], body);

    let err = s.specialize(None, t, &[]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoReturnNotLast));
}

#[test]
fn test_keyed_value_types_as_inner() {
    let mut s = Session::new();
    let i32_ty = s.types.i32_ty;

    let c5 = s.const_int(a(), i32_ty, 5);
    let keyed = s.keyed(a(), "count", c5);
    let x = s.symbol_value(a(), "x");
    let binding = s.let_bind(a(), vec![x], vec![keyed]);
    let body = s.block(a(), vec![binding], x);
    let t = s.template(a(), "named", vec![], body);

    let f = s.specialize(None, t, &[]).unwrap();
    assert_eq!(fn_data(&s, f).return_type, Some(i32_ty));
    let block = fn_data(&s, f).value;
    let let_node = match s.value_kind(block) {
        ValueKind::Block(data) => data.body[0],
        other => panic!("expected Block, got {}", other.name()),
    };
    let bound = match s.value_kind(let_node) {
        ValueKind::Let(data) => data.args[0],
        other => panic!("expected Let, got {}", other.name()),
    };
    match s.value_kind(bound) {
        ValueKind::Keyed { key, value } => {
            assert_eq!(key, "count");
            assert!(matches!(s.value_kind(*value), ValueKind::ConstInt { value: 5 }));
            assert_eq!(s.value_type(bound), Some(i32_ty));
        }
        other => panic!("expected Keyed, got {}", other.name()),
    }
}
