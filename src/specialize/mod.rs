//! The specialization engine.
//!
//! Specialization takes an untyped template plus concrete argument types
//! and produces a fully typed, monomorphized function: constants fold,
//! builtins type-check, closures resolve, inline templates expand at their
//! call sites, and mutually recursive instances are driven to a return-type
//! fixpoint by the cooperative job queue.
//!
//! Entry points:
//! - [`Session::specialize`] specializes a template against argument types
//!   and memoizes the instance.
//! - [`Session::specialize_inline`] expands an inline template at one call
//!   site; never cached.

pub mod args;
pub mod builtins;
pub mod cache;
pub mod call;
pub mod context;
pub mod jobs;
pub mod nodes;

pub use context::{EvalTarget, SpecContext};

use crate::ast::anchor::Anchor;
use crate::ast::value::{ValueId, ValueKind};
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;
use crate::specialize::cache::InstanceKey;
use crate::types::TypeId;

/// Whether a merge is joining expression values (subject to the void
/// rewrite of the context) or return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeMode {
    Value,
    Return,
}

impl Session {
    /// Rewrites a returning type to the empty arguments type when the
    /// context discards its result.
    pub(crate) fn transform_return_type(&self, ctx: &SpecContext, ty: TypeId) -> TypeId {
        if self.types.is_returning(ty) && ctx.is_target_void() {
            self.types.empty_arguments_type()
        } else {
            ty
        }
    }

    /// Joins the types of two alternative control paths. A missing left
    /// side adopts the right; non-returning sides defer to returning ones;
    /// anything else must match exactly.
    pub(crate) fn merge_type(
        &self,
        ctx: &SpecContext,
        lhs: Option<TypeId>,
        rhs: TypeId,
        mode: MergeMode,
    ) -> Result<TypeId> {
        let rhs = match mode {
            MergeMode::Value => self.transform_return_type(ctx, rhs),
            MergeMode::Return => rhs,
        };
        let lhs = match lhs {
            None => return Ok(rhs),
            Some(lhs) => lhs,
        };
        if lhs == rhs {
            return Ok(lhs);
        }
        if !self.types.is_returning(lhs) {
            return Ok(rhs);
        }
        if !self.types.is_returning(rhs) {
            return Ok(lhs);
        }
        Err(ErrorKind::MergeMismatch {
            lhs: self.types.format(lhs),
            rhs: self.types.format(rhs),
        }
        .into())
    }

    /// The nearest enclosing frame that is not an inline expansion shell.
    /// Returns and raises resolve against it.
    pub(crate) fn nearest_non_inline_frame(&self, frame: ValueId) -> ValueId {
        let mut current = frame;
        loop {
            let data = self.function_data(current);
            let is_inline = data
                .original
                .map(|t| self.template_data(t).is_inline)
                .unwrap_or(false);
            if !is_inline {
                return current;
            }
            current = data
                .frame
                .expect("inline expansion shell without an enclosing frame");
        }
    }

    /// Merges `value`'s type into the enclosing frame's return type and
    /// wraps it in a typed `Return` node.
    pub(crate) fn make_return(
        &mut self,
        ctx: SpecContext,
        anchor: Anchor,
        value: ValueId,
    ) -> Result<ValueId> {
        let frame = self.nearest_non_inline_frame(ctx.frame);
        let value_ty = self.typed(value);
        let previous = self.function_data(frame).return_type;
        let merged = self
            .merge_type(&ctx, previous, value_ty, MergeMode::Return)
            .map_err(|e| e.at(anchor))?;
        self.function_data_mut(frame).return_type = Some(merged);
        let node = self.return_(anchor, value);
        let noreturn = self.types.noreturn_ty;
        self.set_value_type(node, noreturn);
        Ok(node)
    }

    /// Merges a raised or propagated exception type into the innermost
    /// handler: the enclosing try when one applies, otherwise the nearest
    /// non-inline frame.
    pub(crate) fn merge_except_type(
        &mut self,
        ctx: SpecContext,
        except_ty: TypeId,
        anchor: Anchor,
        allow_try: bool,
    ) -> Result<()> {
        if allow_try {
            if let Some(try_) = ctx.try_ {
                let previous = {
                    let data = self.try_data_mut(try_);
                    data.except_type
                };
                let merged = self
                    .merge_type(&ctx, previous, except_ty, MergeMode::Return)
                    .map_err(|e| e.at(anchor))?;
                self.try_data_mut(try_).except_type = Some(merged);
                return Ok(());
            }
        }
        let frame = self.nearest_non_inline_frame(ctx.frame);
        let previous = self.function_data(frame).except_type;
        let merged = self
            .merge_type(&ctx, previous, except_ty, MergeMode::Return)
            .map_err(|e| e.at(anchor))?;
        self.function_data_mut(frame).except_type = Some(merged);
        Ok(())
    }

    /// Collapses trivial blocks: a block whose value is itself a block
    /// splices the inner one; a block with an empty body stands for its
    /// value.
    pub(crate) fn canonicalize_block(&mut self, block: ValueId) -> ValueId {
        let (mut body, mut value) = match self.value_kind(block) {
            ValueKind::Block(data) => (data.body.clone(), data.value),
            other => panic!("expected Block node, got {}", other.name()),
        };
        if let ValueKind::Block(inner) = self.value_kind(value) {
            let inner_body = inner.body.clone();
            let inner_value = inner.value;
            body.extend(inner_body);
            value = inner_value;
            if let ValueKind::Block(data) = &mut self.value_mut(block).kind {
                data.body = body.clone();
                data.value = value;
            }
        }
        if body.is_empty() {
            value
        } else {
            block
        }
    }

    /// The pointer-to-function type of a specialized instance. A function
    /// whose body never returns keeps a `noreturn` return type.
    pub(crate) fn function_signature_type(&mut self, function: ValueId) -> TypeId {
        let (params, return_type, except_type) = {
            let data = self.function_data(function);
            (data.params.clone(), data.return_type, data.except_type)
        };
        let param_types: Vec<_> = params.iter().map(|&p| self.typed(p)).collect();
        let return_type = return_type.unwrap_or(self.types.noreturn_ty);
        let inner = match except_type {
            Some(e) => self
                .types
                .raising_function_type(e, return_type, &param_types),
            None => self.types.function_type(return_type, &param_types),
        };
        self.types.native_ro_pointer_type(inner)
    }

    /// Specializes one node under a context.
    ///
    /// A frame binding wins over re-specialization; an unbound node that is
    /// already typed stands for itself. Under a Return target a result that
    /// still returns is wrapped toward the enclosing frame.
    pub(crate) fn specialize_node(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let mut result = match self.resolve(Some(ctx.frame), node) {
            Some(bound) => bound,
            None if self.value(node).is_typed() => node,
            None => self.specialize_untyped(ctx, node)?,
        };
        if ctx.target == EvalTarget::Return {
            let ty = self.typed(result);
            if self.types.is_returning(ty) {
                let anchor = self.anchor(result);
                result = self.make_return(ctx, anchor, result)?;
            }
        }
        Ok(result)
    }

    fn specialize_untyped(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        match self.value_kind(node) {
            ValueKind::Block(_) => self.specialize_block(ctx, node),
            ValueKind::Let(_) => self.specialize_let(ctx, node),
            ValueKind::Loop(_) => self.specialize_loop(ctx, node),
            ValueKind::If(_) => self.specialize_if(ctx, node),
            ValueKind::Call(_) => self.specialize_call(ctx, node),
            ValueKind::ArgumentList { .. } => self.specialize_argument_list(ctx, node),
            ValueKind::ExtractArgument { .. } => self.specialize_extract_argument(ctx, node),
            ValueKind::Keyed { .. } => self.specialize_keyed(ctx, node),
            ValueKind::Try(_) => self.specialize_try(ctx, node),
            ValueKind::Break { .. } => self.specialize_break(ctx, node),
            ValueKind::Repeat { .. } => self.specialize_repeat(ctx, node),
            ValueKind::Return { .. } => self.specialize_return(ctx, node),
            ValueKind::Raise { .. } => self.specialize_raise(ctx, node),
            ValueKind::SymbolValue(_) => self.specialize_symbol(ctx, node),
            ValueKind::Template(_) => self.specialize_template(ctx, node),
            ValueKind::SyntaxExtend(_) => self.specialize_syntax_extend(ctx, node),
            ValueKind::Function(_) => Ok(node),
            // constants and externs are built typed and never reach this
            // path
            other => panic!("cannot specialize untyped {} node", other.name()),
        }
    }

    // -----------------------------------------------------------------------
    // Drivers
    // -----------------------------------------------------------------------

    /// Specializes `template` against `arg_types` in `frame` and returns
    /// the typed function instance. Memoized: repeated requests return the
    /// same instance without re-specializing the body.
    pub fn specialize(
        &mut self,
        frame: Option<ValueId>,
        template: ValueId,
        arg_types: &[TypeId],
    ) -> Result<ValueId> {
        let key = InstanceKey {
            frame,
            original: template,
            instance_args: arg_types.to_vec(),
        };
        if let Some(function) = self.instances.get(&key) {
            return Ok(function);
        }

        let (name, params, body, anchor) = {
            let data = self.template_data(template);
            let body = data
                .value
                .expect("cannot specialize a forward declaration without a body");
            (data.name.clone(), data.params.clone(), body, self.anchor(template))
        };

        let function = self.function_shell(anchor, name.clone(), Some(template), frame, body);
        self.function_data_mut(function).instance_args = arg_types.to_vec();

        let count = params.len();
        for (i, &old_param) in params.iter().enumerate() {
            let param_anchor = self.anchor(old_param);
            let (param_name, variadic) = {
                let data = self.symbol_data(old_param);
                (data.name.clone(), data.variadic)
            };
            if variadic {
                if i + 1 < count {
                    return Err(Error::from(ErrorKind::VariadicSymbolNotLast).at(param_anchor));
                }
                if i + 1 == arg_types.len() {
                    let new_param =
                        self.typed_symbol_value(param_anchor, param_name, arg_types[i]);
                    self.function_data_mut(function).params.push(new_param);
                    self.bind(function, old_param, new_param);
                } else {
                    // one runtime parameter per trailing type, rebound as a
                    // packed argument list
                    let tail = &arg_types[i.min(arg_types.len())..];
                    let mut members = Vec::with_capacity(tail.len());
                    for &ty in tail {
                        let new_param =
                            self.typed_symbol_value(param_anchor, param_name.clone(), ty);
                        self.function_data_mut(function).params.push(new_param);
                        members.push(new_param);
                    }
                    let packed_ty = self.types.arguments_type(tail);
                    let packed = self.argument_list(param_anchor, members);
                    self.set_value_type(packed, packed_ty);
                    self.bind(function, old_param, packed);
                }
            } else {
                let ty = if i < arg_types.len() {
                    arg_types[i]
                } else {
                    self.types.nothing_ty
                };
                if let Some(declared) = self.value_type(old_param) {
                    self.types.verify(ty, declared).map_err(|e| e.at(param_anchor))?;
                }
                let new_param = self.typed_symbol_value(param_anchor, param_name, ty);
                self.function_data_mut(function).params.push(new_param);
                self.bind(function, old_param, new_param);
            }
        }

        // visible to recursive lookups before the body is typed
        self.instances.insert(key, function);

        let subctx = SpecContext::new(function, EvalTarget::Return);
        match self.specialize_node(subctx, body) {
            Ok(value) => {
                self.function_data_mut(function).value = value;
            }
            Err(e) => {
                return Err(e.traced(anchor, format!("in function '{}'", name)));
            }
        }
        debug_assert!(!self.types.is_returning(self.typed(self.function_data(function).value)));
        self.function_data_mut(function).complete = true;
        let signature = self.function_signature_type(function);
        self.set_value_type(function, signature);
        Ok(function)
    }

    /// Expands an inline template at a call site: binds the specialized
    /// argument values, specializes the body under the caller's target, and
    /// returns the resulting expression. Never cached.
    ///
    /// Parameters that survive constant inlining are rebound through a
    /// leading let; otherwise the body stands alone.
    pub fn specialize_inline(
        &mut self,
        ctx: SpecContext,
        frame: Option<ValueId>,
        template: ValueId,
        args: &[ValueId],
    ) -> Result<ValueId> {
        let (name, params, body, anchor) = {
            let data = self.template_data(template);
            let body = data
                .value
                .expect("cannot expand a forward declaration without a body");
            (data.name.clone(), data.params.clone(), body, self.anchor(template))
        };
        let function = self.function_shell(anchor, name.clone(), Some(template), frame, body);

        let subctx = SpecContext::new(function, ctx.target);
        let (out_params, out_args) =
            self.bind_specialized_arguments(subctx, &params, args, true)?;

        let result = match self.specialize_node(subctx, body) {
            Ok(value) => value,
            Err(e) => {
                return Err(e.traced(anchor, format!("in inline function '{}'", name)));
            }
        };

        let value = if out_params.is_empty() {
            result
        } else {
            let result_ty = self.typed(result);
            let block_ty = self.transform_return_type(&subctx, result_ty);
            let let_node = self.let_bind(anchor, out_params, out_args);
            let empty = self.types.empty_arguments_type();
            self.set_value_type(let_node, empty);
            let block = self.block(anchor, vec![let_node], result);
            self.set_value_type(block, block_ty);
            self.canonicalize_block(block)
        };
        self.function_data_mut(function).value = value;
        Ok(value)
    }
}
