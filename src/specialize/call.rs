//! Call specialization.
//!
//! The callee decides the shape of the call: closures specialize or inline
//! their template, AST macros rewrite the call, builtins dispatch to the
//! type checker, and function pointers get their signature verified.
//! Failures inside a call pick up a call-site trace frame.

use crate::ast::value::{ValueId, ValueKind};
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;
use crate::specialize::context::SpecContext;
use crate::types::TypeStore;

impl Session {
    pub(crate) fn specialize_call(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let anchor = self.anchor(node);
        self.specialize_call_interior(ctx, node)
            .map_err(|e| e.traced(anchor, "while checking call"))
    }

    fn specialize_call_interior(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let data = match self.value_kind(node) {
            ValueKind::Call(data) => data.clone(),
            other => panic!("expected Call node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let subctx = ctx.with_symbol_target();
        let mut callee = self.specialize_node(subctx, data.callee)?;
        let values = self.specialize_arguments(ctx, &data.args)?;

        let mut callee_ty = self.typed(callee);
        if callee_ty == self.types.closure_ty {
            let (template, frame) = self.extract_closure_constant(callee)?;
            if self.template_data(template).is_inline {
                return self.specialize_inline(ctx, frame, template, &values);
            }
            let arg_types: Vec<_> = values.iter().map(|&v| self.typed(v)).collect();
            let function = self.specialize(frame, template, &arg_types)?;
            callee = function;
            let (complete, has_return_type) = {
                let fdata = self.function_data(function);
                (fdata.complete, fdata.return_type.is_some())
            };
            if complete {
                callee_ty = self.typed(function);
            } else if has_return_type || self.wait_for_return_type(function) {
                // the instance is still being specialized; use its
                // currently-known signature
                callee_ty = self.function_signature_type(function);
            } else {
                return Err(Error::from(ErrorKind::UntypedRecursiveCall).at(anchor));
            }
        } else if callee_ty == self.types.astmacro_ty {
            let entry = self.extract_astmacro_constant(callee)?;
            let replacement = entry(self, &values)?;
            return self.specialize_node(ctx, replacement);
        } else if callee_ty == self.types.builtin_ty {
            let builtin = self.extract_builtin_constant(callee)?;
            return self.specialize_builtin(ctx, anchor, builtin, callee, values);
        }

        let function_ty = match self.types.extract_function_type(callee_ty) {
            Some(ty) => ty,
            None => {
                return Err(
                    Error::from(ErrorKind::InvalidCallType(self.types.format(callee_ty)))
                        .at(anchor),
                );
            }
        };
        let (return_type, param_types, except_type) = {
            let (r, p, e) = self
                .types
                .function_parts(function_ty)
                .expect("function pointer without function element");
            (r, p.to_vec(), e)
        };
        if values.len() != param_types.len() {
            return Err(Error::from(ErrorKind::ArgumentCountMismatch {
                expected: param_types.len(),
                got: values.len(),
            })
            .at(anchor));
        }
        for (&value, &expected) in values.iter().zip(&param_types) {
            let actual = self.typed(value);
            if actual == expected {
                continue;
            }
            if !data.raw_call && self.pointer_argument_compatible(expected, actual) {
                continue;
            }
            return Err(Error::from(ErrorKind::ArgumentTypeMismatch {
                expected: self.types.format(expected),
                got: self.types.format(actual),
            })
            .at(self.anchor(value)));
        }

        let new_call = self.call(anchor, callee, values);
        if data.raw_call {
            self.mark_raw_call(new_call);
        }
        if data.try_call {
            self.mark_try_call(new_call);
        }
        self.set_value_type(new_call, return_type);
        if let Some(except) = except_type {
            self.merge_except_type(ctx, except, anchor, data.try_call)?;
        }
        Ok(new_call)
    }

    /// Pointer arguments are accepted when the element types match and the
    /// actual pointer's flags and storage class are compatible with the
    /// declared ones.
    fn pointer_argument_compatible(
        &self,
        expected: crate::types::TypeId,
        actual: crate::types::TypeId,
    ) -> bool {
        let (expected, actual) = match (
            self.types.storage_type(expected),
            self.types.storage_type(actual),
        ) {
            (Ok(expected), Ok(actual)) => (expected, actual),
            _ => return false,
        };
        let (exp_elem, exp_flags, exp_class) = match self.types.pointer_parts(expected) {
            Some(parts) => parts,
            None => return false,
        };
        let (act_elem, act_flags, act_class) = match self.types.pointer_parts(actual) {
            Some(parts) => parts,
            None => return false,
        };
        exp_elem == act_elem
            && TypeStore::pointer_flags_compatible(exp_flags, act_flags)
            && TypeStore::pointer_storage_classes_compatible(exp_class, act_class)
    }
}
