//! Per-kind specialization rules.
//!
//! Call specialization lives in `call`, builtin type checking in
//! `builtins`; everything else is here. Each rule consumes the untyped
//! node, produces a typed replacement and leaves the original untouched.

use crate::ast::value::{Clause, PointerValue, ValueId, ValueKind};
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;
use crate::specialize::context::{EvalTarget, SpecContext};
use crate::specialize::MergeMode;
use crate::staging::ScopeMacro;

impl Session {
    /// Specializes body expressions under a void target, dropping useless
    /// ones and rejecting non-returning expressions before the tail.
    pub(crate) fn specialize_block(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let (body, value) = match self.value_kind(node) {
            ValueKind::Block(data) => (data.body.clone(), data.value),
            other => panic!("expected Block node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let subctx = ctx.with_void_target();
        let mut new_body = Vec::new();
        for source in body {
            let specialized = self.specialize_node(subctx, source)?;
            if !self.types.is_returning(self.typed(specialized)) {
                return Err(
                    Error::from(ErrorKind::NoReturnNotLast).at(self.anchor(specialized))
                );
            }
            if !self.value(specialized).is_useless() {
                new_body.push(specialized);
            }
        }
        let new_value = self.specialize_node(ctx, value)?;
        let result_ty = self.transform_return_type(&ctx, self.typed(new_value));
        let new_block = self.block(anchor, new_body, new_value);
        self.set_value_type(new_block, result_ty);
        Ok(self.canonicalize_block(new_block))
    }

    pub(crate) fn specialize_let(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let data = match self.value_kind(node) {
            ValueKind::Let(data) => data.clone(),
            other => panic!("expected Let node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let (params, args) = self
            .bind_arguments(ctx, &data.params, &data.args, true)
            .map_err(|e| e.at(anchor))?;
        let new_let = self.let_bind(anchor, params, args);
        let empty = self.types.empty_arguments_type();
        self.set_value_type(new_let, empty);
        Ok(new_let)
    }

    pub(crate) fn specialize_loop(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let data = match self.value_kind(node) {
            ValueKind::Loop(data) => data.clone(),
            other => panic!("expected Loop node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        // loop parameters always get runtime slots
        let (params, args) = self
            .bind_arguments(ctx, &data.params, &data.args, false)
            .map_err(|e| e.at(anchor))?;
        let new_loop = self.loop_(anchor, params, args, data.value);
        let body = self
            .specialize_node(ctx.for_loop(new_loop), data.value)?;
        let body_ty = self.typed(body);
        let previous = self.loop_data_mut(new_loop).return_type;
        let merged = self
            .merge_type(&ctx, previous, body_ty, MergeMode::Value)
            .map_err(|e| e.at(anchor))?;
        {
            let data = self.loop_data_mut(new_loop);
            data.value = body;
            data.return_type = Some(merged);
        }
        self.set_value_type(new_loop, merged);
        Ok(new_loop)
    }

    /// Folds constant conditions, then runs the surviving branch bodies as
    /// cooperative jobs and merges their types.
    pub(crate) fn specialize_if(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let data = match self.value_kind(node) {
            ValueKind::If(data) => data.clone(),
            other => panic!("expected If node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let subctx = ctx.with_symbol_target();
        let mut clauses: Vec<Clause> = Vec::new();
        let mut else_value = data.else_value;
        for clause in data.clauses {
            let cond = self.specialize_node(subctx, clause.cond)?;
            if self.typed(cond) != self.types.bool_ty {
                let got = self.types.format(self.typed(cond));
                return Err(Error::from(ErrorKind::InvalidConditionType(got)).at(clause.anchor));
            }
            if let ValueKind::ConstInt { value } = self.value_kind(cond) {
                if *value != 0 {
                    // always true: the remaining clauses are unreachable
                    else_value = clause.value;
                    break;
                }
                // always false: the clause is unreachable
                continue;
            }
            clauses.push(Clause { anchor: clause.anchor, cond, value: clause.value });
        }

        let mut branch_nodes: Vec<ValueId> = clauses.iter().map(|c| c.value).collect();
        branch_nodes.push(else_value);
        let results = self.specialize_jobs(ctx, &branch_nodes)?;

        let mut result_ty = None;
        for &branch in &results {
            let branch_ty = self.typed(branch);
            result_ty = Some(
                self.merge_type(&ctx, result_ty, branch_ty, MergeMode::Value)
                    .map_err(|e| e.at(self.anchor(branch)))?,
            );
        }
        for (clause, &branch) in clauses.iter_mut().zip(&results) {
            clause.value = branch;
        }
        let else_result = *results.last().expect("if without an else branch");
        if clauses.is_empty() {
            // the else branch is always selected
            return Ok(else_result);
        }
        let result_ty = result_ty.unwrap_or(self.types.noreturn_ty);
        let new_if = self.if_(anchor, clauses, else_result);
        self.set_value_type(new_if, result_ty);
        Ok(new_if)
    }

    pub(crate) fn specialize_break(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let value = match self.value_kind(node) {
            ValueKind::Break { value } => *value,
            other => panic!("expected Break node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let loop_ = match ctx.loop_ {
            Some(loop_) => loop_,
            None => return Err(Error::from(ErrorKind::BreakOutsideLoop).at(anchor)),
        };
        let subctx = ctx.with_symbol_target();
        let value = self.specialize_node(subctx, value)?;
        let value_ty = self.typed(value);
        let previous = self.loop_data_mut(loop_).return_type;
        let merged = self
            .merge_type(&subctx, previous, value_ty, MergeMode::Value)
            .map_err(|e| e.at(anchor))?;
        self.loop_data_mut(loop_).return_type = Some(merged);
        let new_break = self.break_(anchor, value);
        let noreturn = self.types.noreturn_ty;
        self.set_value_type(new_break, noreturn);
        Ok(new_break)
    }

    pub(crate) fn specialize_repeat(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let args = match self.value_kind(node) {
            ValueKind::Repeat { args } => args.clone(),
            other => panic!("expected Repeat node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        if ctx.loop_.is_none() {
            return Err(Error::from(ErrorKind::RepeatOutsideLoop).at(anchor));
        }
        let args = self.specialize_arguments(ctx, &args)?;
        let new_repeat = self.repeat(anchor, args);
        let noreturn = self.types.noreturn_ty;
        self.set_value_type(new_repeat, noreturn);
        Ok(new_repeat)
    }

    pub(crate) fn specialize_return(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let value = match self.value_kind(node) {
            ValueKind::Return { value } => *value,
            other => panic!("expected Return node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let frame_original = self.function_data(ctx.frame).original;
        if let Some(template) = frame_original {
            if self.template_data(template).is_inline {
                return Err(Error::from(ErrorKind::ReturnInInline).at(anchor));
            }
        }
        let value = self.specialize_node(ctx.with_symbol_target(), value)?;
        if ctx.target == EvalTarget::Return {
            // tail position: the value is returned by the caller's wrapper
            return Ok(value);
        }
        self.make_return(ctx, anchor, value)
    }

    pub(crate) fn specialize_raise(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let value = match self.value_kind(node) {
            ValueKind::Raise { value } => *value,
            other => panic!("expected Raise node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let value = self.specialize_node(ctx.with_symbol_target(), value)?;
        let value_ty = self.typed(value);
        self.merge_except_type(ctx, value_ty, anchor, true)?;
        let new_raise = self.raise(anchor, value);
        let noreturn = self.types.noreturn_ty;
        self.set_value_type(new_raise, noreturn);
        Ok(new_raise)
    }

    pub(crate) fn specialize_symbol(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        // a bound symbol would have resolved in specialize_node already
        let _ = ctx;
        let name = self.symbol_data(node).name.clone();
        Err(Error::from(ErrorKind::UnboundSymbol(name)).at(self.anchor(node)))
    }

    /// A template literal closes over the specialized instance of its
    /// recorded scope.
    pub(crate) fn specialize_template(
        &mut self,
        ctx: SpecContext,
        node: ValueId,
    ) -> Result<ValueId> {
        let scope = self.template_data(node).scope;
        let frame = match scope {
            Some(scope) => match self.find_frame(Some(ctx.frame), scope) {
                Some(frame) => Some(frame),
                None => {
                    let name = self.template_data(node).name.clone();
                    return Err(
                        Error::from(ErrorKind::CannotFindFrame(name)).at(self.anchor(node))
                    );
                }
            },
            // a scopeless template closes over nothing
            None => None,
        };
        let anchor = self.anchor(node);
        Ok(self.const_closure(anchor, node, frame))
    }

    pub(crate) fn specialize_keyed(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let (key, value) = match self.value_kind(node) {
            ValueKind::Keyed { key, value } => (key.clone(), *value),
            other => panic!("expected Keyed node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let value = self.specialize_node(ctx, value)?;
        let ty = self.typed(value);
        let new_keyed = self.keyed(anchor, key, value);
        self.set_value_type(new_keyed, ty);
        Ok(new_keyed)
    }

    pub(crate) fn specialize_argument_list(
        &mut self,
        ctx: SpecContext,
        node: ValueId,
    ) -> Result<ValueId> {
        let values = match self.value_kind(node) {
            ValueKind::ArgumentList { values } => values.clone(),
            other => panic!("expected ArgumentList node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let values = self.specialize_arguments(ctx, &values)?;
        Ok(self.build_argument_list(anchor, values))
    }

    pub(crate) fn specialize_extract_argument(
        &mut self,
        ctx: SpecContext,
        node: ValueId,
    ) -> Result<ValueId> {
        let (value, index) = match self.value_kind(node) {
            ValueKind::ExtractArgument { value, index } => (*value, *index),
            other => panic!("expected ExtractArgument node, got {}", other.name()),
        };
        let value = self.specialize_node(ctx, value)?;
        Ok(self.extract_argument(value, index))
    }

    /// Specializes the protected body with a fresh exception collector; if
    /// nothing inside can raise, the try collapses to its body. Otherwise
    /// the handler specializes with the exception symbol bound at the
    /// collected type, and the try types as the merge of both bodies.
    pub(crate) fn specialize_try(&mut self, ctx: SpecContext, node: ValueId) -> Result<ValueId> {
        let data = match self.value_kind(node) {
            ValueKind::Try(data) => data.clone(),
            other => panic!("expected Try node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let new_try = self.try_(anchor, data.try_value, data.except_param, data.except_value);
        let try_body = self.specialize_node(ctx.for_try(new_try), data.try_value)?;
        let collected = {
            let tdata = self.try_data_mut(new_try);
            tdata.except_type
        };
        let except_ty = match collected {
            // the handler is unreachable
            None => return Ok(try_body),
            Some(ty) => ty,
        };
        let param_anchor = self.anchor(data.except_param);
        let param_name = self.symbol_data(data.except_param).name.clone();
        let bound = self.typed_symbol_value(param_anchor, param_name, except_ty);
        self.bind(ctx.frame, data.except_param, bound);
        let except_body = self.specialize_node(ctx, data.except_value)?;

        let try_ty = self.typed(try_body);
        let except_body_ty = self.typed(except_body);
        let merged = self.merge_type(&ctx, None, try_ty, MergeMode::Value)?;
        let merged = self
            .merge_type(&ctx, Some(merged), except_body_ty, MergeMode::Value)
            .map_err(|e| e.at(anchor))?;
        {
            let tdata = self.try_data_mut(new_try);
            tdata.try_value = try_body;
            tdata.except_param = bound;
            tdata.except_value = except_body;
        }
        self.set_value_type(new_try, merged);
        Ok(new_try)
    }

    /// Compiles the staged function, runs it on the current environment and
    /// specializes the re-expansion of the payload in the environment it
    /// returned.
    pub(crate) fn specialize_syntax_extend(
        &mut self,
        ctx: SpecContext,
        node: ValueId,
    ) -> Result<ValueId> {
        let data = match self.value_kind(node) {
            ValueKind::SyntaxExtend(data) => data.clone(),
            other => panic!("expected SyntaxExtend node, got {}", other.name()),
        };
        let anchor = self.anchor(node);
        let func_anchor = self.anchor(data.func);
        let (func_name, func_scope) = {
            let tdata = self.template_data(data.func);
            (tdata.name.clone(), tdata.scope)
        };
        let frame = match func_scope {
            Some(scope) => match self.find_frame(Some(ctx.frame), scope) {
                Some(frame) => frame,
                None => {
                    return Err(
                        Error::from(ErrorKind::CannotFindFrame(func_name)).at(func_anchor)
                    );
                }
            },
            None => {
                return Err(Error::from(ErrorKind::CannotFindFrame(func_name)).at(func_anchor));
            }
        };

        let scope_ty = self.types.scope_ty;
        let function = self.specialize(Some(frame), data.func, &[scope_ty])?;

        // both the plain and the raising environment transformer are
        // accepted
        let plain_fn = self.types.function_type(scope_ty, &[scope_ty]);
        let plain_sig = self.types.native_ro_pointer_type(plain_fn);
        let error_ty = self.types.error_ty;
        let raising_fn = self.types.raising_function_type(error_ty, scope_ty, &[scope_ty]);
        let raising_sig = self.types.native_ro_pointer_type(raising_fn);
        let got = self.typed(function);
        if got != plain_sig && got != raising_sig {
            return Err(Error::from(ErrorKind::SyntaxExtendSignature {
                expected: self.types.format(plain_sig),
                expected_raising: self.types.format(raising_sig),
                got: self.types.format(got),
            })
            .at(anchor));
        }

        let mut stager = match self.stager.take() {
            Some(stager) => stager,
            None => return Err(Error::from(ErrorKind::NoStagingBackend).at(anchor)),
        };
        let enclosing = self.function_data(ctx.frame).original;
        let expansion = match stager.compile(self, function) {
            Ok(ScopeMacro::Plain(mut entry)) => {
                let env = entry(data.env);
                stager.expand_inline(self, enclosing, data.payload, env)
            }
            Ok(ScopeMacro::Raising(mut entry)) => match entry(data.env) {
                Ok(env) => stager.expand_inline(self, enclosing, data.payload, env),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        self.stager = Some(stager);
        let expansion = expansion.map_err(|e| e.at(anchor))?;
        self.specialize_node(ctx, expansion)
    }

    // -----------------------------------------------------------------------
    // Constant extraction
    // -----------------------------------------------------------------------

    fn constant_expected(&self, value: ValueId) -> Error {
        Error::from(ErrorKind::ConstantExpected(
            self.value_kind(value).name().to_owned(),
        ))
        .at(self.anchor(value))
    }

    /// A type constant.
    pub(crate) fn extract_type_constant(&self, value: ValueId) -> Result<crate::types::TypeId> {
        match self.value_kind(value) {
            ValueKind::ConstPointer(PointerValue::Type(ty)) => Ok(*ty),
            _ => Err(self.constant_expected(value)),
        }
    }

    /// An integer constant, widened to u64.
    pub(crate) fn extract_integer_constant(&self, value: ValueId) -> Result<u64> {
        match self.value_kind(value) {
            ValueKind::ConstInt { value } => Ok(*value),
            _ => Err(self.constant_expected(value)),
        }
    }

    /// A closure constant: the template and the frame it closes over.
    pub(crate) fn extract_closure_constant(
        &self,
        value: ValueId,
    ) -> Result<(ValueId, Option<ValueId>)> {
        match self.value_kind(value) {
            ValueKind::ConstPointer(PointerValue::Closure { template, frame }) => {
                Ok((*template, *frame))
            }
            _ => Err(self.constant_expected(value)),
        }
    }

    /// An AST macro entry point.
    pub(crate) fn extract_astmacro_constant(
        &self,
        value: ValueId,
    ) -> Result<crate::ast::value::AstMacroFn> {
        match self.value_kind(value) {
            ValueKind::ConstPointer(PointerValue::AstMacro(entry)) => Ok(*entry),
            _ => Err(self.constant_expected(value)),
        }
    }

    /// A builtin operator constant.
    pub(crate) fn extract_builtin_constant(
        &self,
        value: ValueId,
    ) -> Result<crate::ast::builtin::Builtin> {
        match self.value_kind(value) {
            ValueKind::ConstPointer(PointerValue::Builtin(builtin)) => Ok(*builtin),
            _ => Err(self.constant_expected(value)),
        }
    }

    /// A symbol constant.
    pub(crate) fn extract_symbol_constant(&self, value: ValueId) -> Result<String> {
        match self.value_kind(value) {
            ValueKind::ConstPointer(PointerValue::Symbol(name)) => Ok(name.clone()),
            _ => Err(self.constant_expected(value)),
        }
    }
}
