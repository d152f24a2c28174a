//! Argument splicing and parameter binding.
//!
//! Multi-valued results (`arguments(...)` types) flatten at use sites: an
//! interior result contributes only its first element, a trailing result is
//! spliced in full. The flat vector produced here is what lets, loops,
//! calls and repeats consume.

use crate::ast::anchor::Anchor;
use crate::ast::value::{ValueId, ValueKind};
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;
use crate::specialize::context::SpecContext;
use crate::types::TypeId;

impl Session {
    /// Projects element `index` out of a specialized value.
    ///
    /// Literal argument lists are consumed directly; runtime multi-values
    /// get an `ExtractArgument` projection. Out-of-range projections yield
    /// the absent value. A scalar projects to itself at index 0.
    pub(crate) fn extract_argument(&mut self, value: ValueId, index: usize) -> ValueId {
        let anchor = self.anchor(value);
        let ty = self.typed(value);
        if !self.types.is_returning(ty) {
            return value;
        }
        if let Some(members) = self.types.arguments_of(ty) {
            let members = members.to_vec();
            match members.get(index) {
                None => self.const_none(anchor),
                Some(&member_ty) => {
                    if let ValueKind::ArgumentList { values } = self.value_kind(value) {
                        return values[index];
                    }
                    let node = self.extract_argument_node(anchor, value, index);
                    self.set_value_type(node, member_ty);
                    node
                }
            }
        } else if index == 0 {
            value
        } else {
            self.const_none(anchor)
        }
    }

    /// Specializes `values` as expressions and flattens multi-valued
    /// results into the canonical flat argument vector.
    pub(crate) fn specialize_arguments(
        &mut self,
        ctx: SpecContext,
        values: &[ValueId],
    ) -> Result<Vec<ValueId>> {
        let subctx = ctx.with_symbol_target();
        let count = values.len();
        let mut out = Vec::with_capacity(count);
        for (i, &source) in values.iter().enumerate() {
            let mut value = self.specialize_node(subctx, source)?;
            let ty = self.typed(value);
            if !self.types.is_returning(ty) {
                return Err(Error::from(ErrorKind::NoReturnNotLast).at(self.anchor(value)));
            }
            if let Some(members) = self.types.arguments_of(ty) {
                let member_count = members.len();
                if i + 1 == count {
                    // the last argument is spliced in full
                    for j in 0..member_count {
                        let element = self.extract_argument(value, j);
                        out.push(element);
                    }
                    break;
                }
                value = self.extract_argument(value, 0);
            }
            out.push(value);
        }
        Ok(out)
    }

    /// The arguments type over the types of `values`.
    pub(crate) fn arguments_type_from_values(&mut self, values: &[ValueId]) -> TypeId {
        let types: Vec<_> = values.iter().map(|&v| self.typed(v)).collect();
        self.types.arguments_type(&types)
    }

    /// Wraps a flat value vector back into expression position. A single
    /// value stands for itself.
    pub(crate) fn build_argument_list(
        &mut self,
        anchor: Anchor,
        values: Vec<ValueId>,
    ) -> ValueId {
        if values.len() == 1 {
            return values[0];
        }
        let ty = self.arguments_type_from_values(&values);
        let list = self.argument_list(anchor, values);
        self.set_value_type(list, ty);
        list
    }

    /// Binds already-specialized arguments to template parameters in the
    /// current frame.
    ///
    /// A variadic parameter must come last; it either takes the single
    /// remaining argument directly or packs the tail into an argument list.
    /// Missing scalar arguments bind to the absent value. With
    /// `inline_constants`, symbolic arguments rebind the template parameter
    /// to the value itself and produce no runtime slot; everything else
    /// gets a fresh typed symbol, returned alongside its argument.
    pub(crate) fn bind_specialized_arguments(
        &mut self,
        ctx: SpecContext,
        params: &[ValueId],
        args: &[ValueId],
        inline_constants: bool,
    ) -> Result<(Vec<ValueId>, Vec<ValueId>)> {
        let count = params.len();
        let mut out_params = Vec::new();
        let mut out_args = Vec::new();
        for (i, &old_sym) in params.iter().enumerate() {
            let anchor = self.anchor(old_sym);
            let (name, variadic) = {
                let data = self.symbol_data(old_sym);
                (data.name.clone(), data.variadic)
            };
            let new_value = if variadic {
                if i + 1 < count {
                    return Err(Error::from(ErrorKind::VariadicSymbolNotLast).at(anchor));
                }
                if i + 1 == args.len() {
                    args[i]
                } else {
                    let tail = args[i.min(args.len())..].to_vec();
                    self.build_argument_list(anchor, tail)
                }
            } else if i < args.len() {
                args[i]
            } else {
                self.const_none(anchor)
            };
            if inline_constants && self.value(new_value).is_symbolic() {
                self.bind(ctx.frame, old_sym, new_value);
            } else {
                let ty = self.typed(new_value);
                let new_sym = self.typed_symbol_value(anchor, name, ty);
                self.bind(ctx.frame, old_sym, new_sym);
                out_params.push(new_sym);
                out_args.push(new_value);
            }
        }
        Ok((out_params, out_args))
    }

    /// Splices `values` and binds the result to `params`.
    pub(crate) fn bind_arguments(
        &mut self,
        ctx: SpecContext,
        params: &[ValueId],
        values: &[ValueId],
        inline_constants: bool,
    ) -> Result<(Vec<ValueId>, Vec<ValueId>)> {
        let args = self.specialize_arguments(ctx, values)?;
        self.bind_specialized_arguments(ctx, params, &args, inline_constants)
    }
}
