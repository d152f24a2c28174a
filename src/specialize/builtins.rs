//! Type checking for builtin operator calls.
//!
//! One dispatch per operator tag. Each arm verifies its operand types,
//! folds where the result is a compile-time constant, and otherwise
//! produces a call node typed with the arguments type of its results.

use crate::ast::anchor::Anchor;
use crate::ast::builtin::Builtin;
use crate::ast::printer;
use crate::ast::value::ValueId;
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;
use crate::specialize::context::SpecContext;
use crate::types::{TypeId, TypeKind};

impl Session {
    pub(crate) fn specialize_builtin(
        &mut self,
        _ctx: SpecContext,
        anchor: Anchor,
        builtin: Builtin,
        callee: ValueId,
        mut values: Vec<ValueId>,
    ) -> Result<ValueId> {
        use Builtin::*;

        let argc = values.len();
        match builtin {
            Dump => {
                let mut line = format!("{} dump:", anchor);
                for &arg in &values {
                    line.push(' ');
                    line.push_str(&printer::format_value(self, arg));
                }
                eprintln!("{}", line);
                Ok(self.build_argument_list(anchor, values))
            }

            Undef => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let ty = self.extract_type_constant(values[0])?;
                Ok(self.finish_builtin(anchor, callee, values, &[ty]))
            }

            TypeOf => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let ty = self.typed(values[0]);
                Ok(self.const_type(anchor, ty))
            }

            Tertiary => {
                self.check_builtin_args(anchor, argc, 3, Some(3))?;
                let cond_st = self.storage_of(values[0], anchor)?;
                let then_ty = self.typed(values[1]);
                let else_ty = self.typed(values[2]);
                self.types.verify_bool_vector(cond_st).map_err(|e| e.at(anchor))?;
                if matches!(self.types.kind(cond_st), TypeKind::Vector { .. }) {
                    self.types
                        .verify_vector_sizes(cond_st, then_ty)
                        .map_err(|e| e.at(anchor))?;
                }
                self.types.verify(else_ty, then_ty).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[then_ty]))
            }

            Bitcast => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_ty = self.typed(values[0]);
                let dest_ty = self.extract_type_constant(values[1])?;
                if src_ty == dest_ty {
                    return Ok(values[0]);
                }
                let src_st = self.types.storage_type(src_ty).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                if self.types.canonical_category(src_st) != self.types.canonical_category(dest_st)
                {
                    return Err(Error::from(ErrorKind::CannotBitcast {
                        from: self.types.format(src_ty),
                        to: self.types.format(dest_ty),
                    })
                    .at(anchor));
                }
                if src_st != dest_st && self.types.is_aggregate_storage(dest_st) {
                    return Err(Error::from(ErrorKind::BitcastToAggregate {
                        from: self.types.format(src_ty),
                        to: self.types.format(dest_ty),
                        storage: self.types.format(dest_st),
                    })
                    .at(anchor));
                }
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            IntToPtr => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_st = self.storage_of(values[0], anchor)?;
                let dest_ty = self.extract_type_constant(values[1])?;
                self.types.verify_integer(src_st).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                self.types.verify_pointer(dest_st).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            PtrToInt => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_st = self.storage_of(values[0], anchor)?;
                let dest_ty = self.extract_type_constant(values[1])?;
                self.types.verify_pointer(src_st).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                self.types.verify_integer(dest_st).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            ITrunc | ZExt | SExt => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_st = self.storage_of(values[0], anchor)?;
                let dest_ty = self.extract_type_constant(values[1])?;
                self.types.verify_integer(src_st).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                self.types.verify_integer(dest_st).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            FPTrunc | FPExt => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_st = self.storage_of(values[0], anchor)?;
                let dest_ty = self.extract_type_constant(values[1])?;
                self.types.verify_real(src_st).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                self.types.verify_real(dest_st).map_err(|e| e.at(anchor))?;
                let src_width = self.real_width(src_st);
                let dest_width = self.real_width(dest_st);
                let narrowing = builtin == FPTrunc;
                let bad = if narrowing {
                    src_width < dest_width
                } else {
                    src_width > dest_width
                };
                if bad {
                    return Err(Error::from(ErrorKind::InvalidOperands {
                        lhs: self.types.format(src_st),
                        rhs: self.types.format(dest_ty),
                    })
                    .at(anchor));
                }
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            FPToUI | FPToSI => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_st = self.storage_of(values[0], anchor)?;
                let dest_ty = self.extract_type_constant(values[1])?;
                self.types.verify_real(src_st).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                self.types.verify_integer(dest_st).map_err(|e| e.at(anchor))?;
                if src_st != self.types.f32_ty && src_st != self.types.f64_ty {
                    return Err(Error::from(ErrorKind::InvalidOperands {
                        lhs: self.types.format(src_st),
                        rhs: self.types.format(dest_ty),
                    })
                    .at(anchor));
                }
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            UIToFP | SIToFP => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let src_st = self.storage_of(values[0], anchor)?;
                let dest_ty = self.extract_type_constant(values[1])?;
                self.types.verify_integer(src_st).map_err(|e| e.at(anchor))?;
                let dest_st = self.types.storage_type(dest_ty).map_err(|e| e.at(anchor))?;
                self.types.verify_real(dest_st).map_err(|e| e.at(anchor))?;
                if dest_ty != self.types.f32_ty && dest_ty != self.types.f64_ty {
                    return Err(Error::from(ErrorKind::InvalidOperands {
                        lhs: self.types.format(src_st),
                        rhs: self.types.format(dest_ty),
                    })
                    .at(anchor));
                }
                Ok(self.finish_builtin(anchor, callee, values, &[dest_ty]))
            }

            ExtractValue => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let agg_st = self.storage_of(values[0], anchor)?;
                let index = self.extract_integer_constant(values[1])? as usize;
                if !self.types.is_aggregate_storage(agg_st) {
                    return Err(Error::from(ErrorKind::CannotExtractValue(
                        self.types.format(agg_st),
                    ))
                    .at(anchor));
                }
                let member = self
                    .types
                    .type_at_index(agg_st, index)
                    .map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[member]))
            }

            InsertValue => {
                self.check_builtin_args(anchor, argc, 3, Some(3))?;
                let agg_ty = self.typed(values[0]);
                let elem_st = self.storage_of(values[1], anchor)?;
                let index = self.extract_integer_constant(values[2])? as usize;
                let agg_st = self.types.storage_type(agg_ty).map_err(|e| e.at(anchor))?;
                if !self.types.is_aggregate_storage(agg_st) {
                    return Err(Error::from(ErrorKind::CannotInsertValue(
                        self.types.format(agg_st),
                    ))
                    .at(anchor));
                }
                let member = self
                    .types
                    .type_at_index(agg_st, index)
                    .map_err(|e| e.at(anchor))?;
                let member_st = self.types.storage_type(member).map_err(|e| e.at(anchor))?;
                self.types.verify(elem_st, member_st).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[agg_ty]))
            }

            GetElementPtr => {
                self.check_builtin_args(anchor, argc, 2, None)?;
                let ptr_st = self.storage_of(values[0], anchor)?;
                self.types.verify_pointer(ptr_st).map_err(|e| e.at(anchor))?;
                let (mut current, flags, storage_class) = {
                    let (e, f, c) = self
                        .types
                        .pointer_parts(ptr_st)
                        .expect("verified pointer without pointer parts");
                    (e, f, c.map(str::to_owned))
                };
                let first_st = self.storage_of(values[1], anchor)?;
                self.types.verify_integer(first_st).map_err(|e| e.at(anchor))?;
                let mut argn = 2;
                while argn < argc {
                    let step_st = self.types.storage_type(current).map_err(|e| e.at(anchor))?;
                    match self.types.kind(step_st) {
                        TypeKind::Array { element, .. } => {
                            current = *element;
                            let index_st = self.storage_of(values[argn], anchor)?;
                            self.types.verify_integer(index_st).map_err(|e| e.at(anchor))?;
                        }
                        TypeKind::Tuple { .. } => {
                            let index = self.tuple_field_position(step_st, &mut values, argn)?;
                            current = self
                                .types
                                .type_at_index(step_st, index)
                                .map_err(|e| e.at(anchor))?;
                        }
                        _ => {
                            return Err(Error::from(ErrorKind::CannotGetElementPointer(
                                self.types.format(current),
                            ))
                            .at(anchor));
                        }
                    }
                    argn += 1;
                }
                let result =
                    self.types
                        .pointer_type(current, flags, storage_class.as_deref());
                Ok(self.finish_builtin(anchor, callee, values, &[result]))
            }

            Load | VolatileLoad => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let ptr_st = self.storage_of(values[0], anchor)?;
                self.types.verify_pointer(ptr_st).map_err(|e| e.at(anchor))?;
                if !self.types.is_readable(ptr_st) {
                    return Err(Error::from(ErrorKind::PointerNotReadable(
                        self.types.format(ptr_st),
                    ))
                    .at(anchor));
                }
                let (element, _, _) = self
                    .types
                    .pointer_parts(ptr_st)
                    .expect("verified pointer without pointer parts");
                Ok(self.finish_builtin(anchor, callee, values, &[element]))
            }

            Store | VolatileStore => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let elem_st = self.storage_of(values[0], anchor)?;
                let dest_st = self.storage_of(values[1], anchor)?;
                self.types.verify_pointer(dest_st).map_err(|e| e.at(anchor))?;
                if !self.types.is_writable(dest_st) {
                    return Err(Error::from(ErrorKind::PointerNotWritable(
                        self.types.format(dest_st),
                    ))
                    .at(anchor));
                }
                let (element, _, _) = self
                    .types
                    .pointer_parts(dest_st)
                    .expect("verified pointer without pointer parts");
                let element_st = self.types.storage_type(element).map_err(|e| e.at(anchor))?;
                self.types.verify(elem_st, element_st).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[]))
            }

            Alloca => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let ty = self.extract_type_constant(values[0])?;
                let ptr = self.types.local_pointer_type(ty);
                Ok(self.finish_builtin(anchor, callee, values, &[ptr]))
            }

            AllocaArray => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let ty = self.extract_type_constant(values[0])?;
                let size_st = self.storage_of(values[1], anchor)?;
                self.types.verify_integer(size_st).map_err(|e| e.at(anchor))?;
                let ptr = self.types.local_pointer_type(ty);
                Ok(self.finish_builtin(anchor, callee, values, &[ptr]))
            }

            Malloc => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let ty = self.extract_type_constant(values[0])?;
                let ptr = self.types.native_pointer_type(ty);
                Ok(self.finish_builtin(anchor, callee, values, &[ptr]))
            }

            MallocArray => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let ty = self.extract_type_constant(values[0])?;
                let size_st = self.storage_of(values[1], anchor)?;
                self.types.verify_integer(size_st).map_err(|e| e.at(anchor))?;
                let ptr = self.types.native_pointer_type(ty);
                Ok(self.finish_builtin(anchor, callee, values, &[ptr]))
            }

            Free => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let ptr_st = self.storage_of(values[0], anchor)?;
                self.types.verify_pointer(ptr_st).map_err(|e| e.at(anchor))?;
                if !self.types.is_writable(ptr_st) {
                    return Err(Error::from(ErrorKind::PointerNotWritable(
                        self.types.format(ptr_st),
                    ))
                    .at(anchor));
                }
                let (_, _, storage_class) = self
                    .types
                    .pointer_parts(ptr_st)
                    .expect("verified pointer without pointer parts");
                if storage_class.is_some() {
                    return Err(Error::from(ErrorKind::PointerNotHeap(
                        self.types.format(ptr_st),
                    ))
                    .at(anchor));
                }
                Ok(self.finish_builtin(anchor, callee, values, &[]))
            }

            b if b.is_icmp() => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let lhs = self.typed(values[0]);
                let rhs = self.typed(values[1]);
                self.verify_integer_operands(lhs, rhs, anchor)?;
                let result = self.bool_op_return_type(lhs, anchor)?;
                Ok(self.finish_builtin(anchor, callee, values, &[result]))
            }

            b if b.is_fcmp() => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let lhs = self.typed(values[0]);
                let rhs = self.typed(values[1]);
                self.verify_real_operands(lhs, rhs, anchor)?;
                let result = self.bool_op_return_type(lhs, anchor)?;
                Ok(self.finish_builtin(anchor, callee, values, &[result]))
            }

            b if b.is_integer_binary() => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let lhs = self.typed(values[0]);
                let rhs = self.typed(values[1]);
                self.verify_integer_operands(lhs, rhs, anchor)?;
                Ok(self.finish_builtin(anchor, callee, values, &[lhs]))
            }

            b if b.is_real_binary() => {
                self.check_builtin_args(anchor, argc, 2, Some(2))?;
                let lhs = self.typed(values[0]);
                let rhs = self.typed(values[1]);
                self.verify_real_operands(lhs, rhs, anchor)?;
                Ok(self.finish_builtin(anchor, callee, values, &[lhs]))
            }

            b if b.is_integer_unary() => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let operand = self.typed(values[0]);
                let operand_st = self.types.storage_type(operand).map_err(|e| e.at(anchor))?;
                self.types
                    .verify_integer_vector(operand_st)
                    .map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[operand]))
            }

            b if b.is_real_unary() => {
                self.check_builtin_args(anchor, argc, 1, Some(1))?;
                let operand = self.typed(values[0]);
                let operand_st = self.types.storage_type(operand).map_err(|e| e.at(anchor))?;
                self.types
                    .verify_real_vector(operand_st)
                    .map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[operand]))
            }

            b if b.is_real_ternary() => {
                self.check_builtin_args(anchor, argc, 3, Some(3))?;
                let lhs = self.typed(values[0]);
                let mid = self.typed(values[1]);
                let rhs = self.typed(values[2]);
                self.verify_real_operands(lhs, mid, anchor)?;
                self.types.verify(rhs, lhs).map_err(|e| e.at(anchor))?;
                Ok(self.finish_builtin(anchor, callee, values, &[lhs]))
            }

            other => Err(Error::from(ErrorKind::CannotTypeBuiltin(other.name())).at(anchor)),
        }
    }

    fn check_builtin_args(
        &self,
        anchor: Anchor,
        got: usize,
        min: usize,
        max: Option<usize>,
    ) -> Result<()> {
        let ok = got >= min && max.map_or(true, |max| got <= max);
        if ok {
            Ok(())
        } else {
            Err(Error::from(ErrorKind::ArgumentCountMismatch { expected: min, got }).at(anchor))
        }
    }

    /// Builds the typed call node for a checked builtin.
    fn finish_builtin(
        &mut self,
        anchor: Anchor,
        callee: ValueId,
        values: Vec<ValueId>,
        result_types: &[TypeId],
    ) -> ValueId {
        let ty = self.types.arguments_type(result_types);
        let call = self.call(anchor, callee, values);
        self.set_value_type(call, ty);
        call
    }

    fn storage_of(&self, value: ValueId, anchor: Anchor) -> Result<TypeId> {
        self.types
            .storage_type(self.typed(value))
            .map_err(|e| e.at(anchor))
    }

    fn real_width(&self, t: TypeId) -> u32 {
        match self.types.kind(t) {
            TypeKind::Real { width } => *width,
            _ => 0,
        }
    }

    /// First operand must be integer-or-integer-vector; the second must
    /// match it exactly.
    fn verify_integer_operands(&self, lhs: TypeId, rhs: TypeId, anchor: Anchor) -> Result<()> {
        let lhs_st = self.types.storage_type(lhs).map_err(|e| e.at(anchor))?;
        self.types
            .verify_integer_vector(lhs_st)
            .map_err(|e| e.at(anchor))?;
        self.types.verify(rhs, lhs).map_err(|e| e.at(anchor))
    }

    /// First operand must be real-or-real-vector; the second must match it
    /// exactly.
    fn verify_real_operands(&self, lhs: TypeId, rhs: TypeId, anchor: Anchor) -> Result<()> {
        let lhs_st = self.types.storage_type(lhs).map_err(|e| e.at(anchor))?;
        self.types
            .verify_real_vector(lhs_st)
            .map_err(|e| e.at(anchor))?;
        self.types.verify(rhs, lhs).map_err(|e| e.at(anchor))
    }

    /// `Bool` for scalar comparisons, a bool vector of matching length for
    /// vector comparisons.
    fn bool_op_return_type(&mut self, operand: TypeId, anchor: Anchor) -> Result<TypeId> {
        let st = self.types.storage_type(operand).map_err(|e| e.at(anchor))?;
        match self.types.kind(st) {
            TypeKind::Vector { count, .. } => {
                let count = *count;
                let bool_ty = self.types.bool_ty;
                Ok(self.types.vector_type(bool_ty, count))
            }
            _ => Ok(self.types.bool_ty),
        }
    }

    /// Resolves a tuple step of `getelementptr`: integer constants index
    /// directly, symbol constants name a field and are rewritten in place
    /// to its integer index.
    fn tuple_field_position(
        &mut self,
        tuple_st: TypeId,
        values: &mut [ValueId],
        argn: usize,
    ) -> Result<usize> {
        let arg = values[argn];
        let anchor = self.anchor(arg);
        if self.value_type(arg) == Some(self.types.symbol_ty) {
            let name = self.extract_symbol_constant(arg)?;
            let index = match self.types.field_index(tuple_st, &name) {
                Some(index) => index,
                None => {
                    return Err(Error::from(ErrorKind::NoSuchField {
                        field: name,
                        ty: self.types.format(tuple_st),
                    })
                    .at(anchor));
                }
            };
            let i32_ty = self.types.i32_ty;
            values[argn] = self.const_int(anchor, i32_ty, index as u64);
            return Ok(index);
        }
        let index = self.extract_integer_constant(arg)?;
        Ok(index as usize)
    }
}
