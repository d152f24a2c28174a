//! The compilation session: node arena, type store, instance cache, job
//! queue and staging hook, threaded explicitly through the public API.
//!
//! Sessions are independent of each other; two sessions never share ids.
//! The construction methods below are the expander's API for building
//! untyped templates. Constants are the only nodes built pre-typed.

use std::collections::HashMap;

use crate::ast::anchor::{Anchor, SourceId};
use crate::ast::builtin::Builtin;
use crate::ast::value::{
    AstMacroFn, BlockData, CallData, Clause, FunctionData, IfData, LetData, LoopData,
    PointerValue, SymbolValueData, SyntaxExtendData, TemplateData, TryData, Value, ValueId,
    ValueKind,
};
use crate::specialize::cache::InstanceCache;
use crate::specialize::jobs::JobQueue;
use crate::staging::{ScopeRef, Stager};
use crate::types::{TypeId, TypeStore};

pub struct Session {
    pub types: TypeStore,
    pub(crate) values: Vec<Value>,
    sources: Vec<String>,
    pub(crate) instances: InstanceCache,
    pub(crate) jobs: JobQueue,
    pub(crate) stager: Option<Box<dyn Stager>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            types: TypeStore::new(),
            values: Vec::new(),
            sources: Vec::new(),
            instances: InstanceCache::new(),
            jobs: JobQueue::new(),
            stager: None,
        }
    }

    /// Registers a source name for anchor rendering.
    pub fn add_source(&mut self, name: impl Into<String>) -> SourceId {
        let id = SourceId(self.sources.len() as u32);
        self.sources.push(name.into());
        id
    }

    pub fn source_name(&self, id: SourceId) -> &str {
        self.sources
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    /// Installs the staging backend used by syntax-extend.
    pub fn set_stager(&mut self, stager: Box<dyn Stager>) {
        self.stager = Some(stager);
    }

    /// Number of specialized instances created so far.
    pub fn specialized_instance_count(&self) -> usize {
        self.instances.len()
    }

    // -----------------------------------------------------------------------
    // Node access
    // -----------------------------------------------------------------------

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.0 as usize]
    }

    pub fn value_kind(&self, id: ValueId) -> &ValueKind {
        &self.value(id).kind
    }

    pub fn value_type(&self, id: ValueId) -> Option<TypeId> {
        self.value(id).ty
    }

    pub fn anchor(&self, id: ValueId) -> Anchor {
        self.value(id).anchor
    }

    pub(crate) fn set_value_type(&mut self, id: ValueId, ty: TypeId) {
        self.value_mut(id).ty = Some(ty);
    }

    /// Type of a node that specialization has already typed.
    pub(crate) fn typed(&self, id: ValueId) -> TypeId {
        self.value(id)
            .ty
            .expect("node reached a typed context while untyped")
    }

    fn add_value(&mut self, anchor: Anchor, kind: ValueKind, ty: Option<TypeId>) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value { kind, anchor, ty });
        id
    }

    // -----------------------------------------------------------------------
    // Frame operations
    // -----------------------------------------------------------------------

    pub(crate) fn function_data(&self, id: ValueId) -> &FunctionData {
        match &self.value(id).kind {
            ValueKind::Function(data) => data,
            other => panic!("expected Function node, got {}", other.name()),
        }
    }

    pub(crate) fn function_data_mut(&mut self, id: ValueId) -> &mut FunctionData {
        match &mut self.value_mut(id).kind {
            ValueKind::Function(data) => data,
            other => panic!("expected Function node, got {}", other.name()),
        }
    }

    pub(crate) fn template_data(&self, id: ValueId) -> &TemplateData {
        match &self.value(id).kind {
            ValueKind::Template(data) => data,
            other => panic!("expected Template node, got {}", other.name()),
        }
    }

    pub(crate) fn symbol_data(&self, id: ValueId) -> &SymbolValueData {
        match &self.value(id).kind {
            ValueKind::SymbolValue(data) => data,
            other => panic!("expected SymbolValue node, got {}", other.name()),
        }
    }

    pub(crate) fn loop_data_mut(&mut self, id: ValueId) -> &mut LoopData {
        match &mut self.value_mut(id).kind {
            ValueKind::Loop(data) => data,
            other => panic!("expected Loop node, got {}", other.name()),
        }
    }

    pub(crate) fn try_data_mut(&mut self, id: ValueId) -> &mut TryData {
        match &mut self.value_mut(id).kind {
            ValueKind::Try(data) => data,
            other => panic!("expected Try node, got {}", other.name()),
        }
    }

    /// Binds a template-side node to its specialized counterpart in `frame`.
    pub(crate) fn bind(&mut self, frame: ValueId, key: ValueId, value: ValueId) {
        self.function_data_mut(frame).bindings.insert(key, value);
    }

    /// Looks a node up through the frame chain.
    pub(crate) fn resolve(&self, frame: Option<ValueId>, key: ValueId) -> Option<ValueId> {
        let mut current = frame;
        while let Some(f) = current {
            let data = self.function_data(f);
            if let Some(&found) = data.bindings.get(&key) {
                return Some(found);
            }
            current = data.frame;
        }
        None
    }

    /// Finds the specialized frame whose original is `scope`, walking
    /// outward from `frame`.
    pub(crate) fn find_frame(&self, frame: Option<ValueId>, scope: ValueId) -> Option<ValueId> {
        let mut current = frame;
        while let Some(f) = current {
            let data = self.function_data(f);
            if data.original == Some(scope) {
                return Some(f);
            }
            current = data.frame;
        }
        None
    }

    // -----------------------------------------------------------------------
    // Construction: symbols and templates
    // -----------------------------------------------------------------------

    pub fn symbol_value(&mut self, anchor: Anchor, name: impl Into<String>) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::SymbolValue(SymbolValueData { name: name.into(), variadic: false }),
            None,
        )
    }

    /// A symbol that consumes all trailing positional arguments.
    pub fn variadic_symbol_value(&mut self, anchor: Anchor, name: impl Into<String>) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::SymbolValue(SymbolValueData { name: name.into(), variadic: true }),
            None,
        )
    }

    /// A symbol with a known type: specialized parameters and binding sites.
    pub fn typed_symbol_value(
        &mut self,
        anchor: Anchor,
        name: impl Into<String>,
        ty: TypeId,
    ) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::SymbolValue(SymbolValueData { name: name.into(), variadic: false }),
            Some(ty),
        )
    }

    pub fn template(
        &mut self,
        anchor: Anchor,
        name: impl Into<String>,
        params: Vec<ValueId>,
        value: ValueId,
    ) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::Template(TemplateData {
                name: name.into(),
                params,
                value: Some(value),
                scope: None,
                is_inline: false,
            }),
            None,
        )
    }

    /// A forward declaration. Parameters and body are filled in later,
    /// which is how the expander builds mutually recursive templates.
    pub fn template_decl(&mut self, anchor: Anchor, name: impl Into<String>) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::Template(TemplateData {
                name: name.into(),
                params: Vec::new(),
                value: None,
                scope: None,
                is_inline: false,
            }),
            None,
        )
    }

    pub fn set_template_params(&mut self, template: ValueId, params: Vec<ValueId>) {
        self.template_data_mut(template).params = params;
    }

    pub fn set_template_body(&mut self, template: ValueId, value: ValueId) {
        self.template_data_mut(template).value = Some(value);
    }

    pub fn set_template_scope(&mut self, template: ValueId, scope: ValueId) {
        self.template_data_mut(template).scope = Some(scope);
    }

    pub fn set_template_inline(&mut self, template: ValueId) {
        self.template_data_mut(template).is_inline = true;
    }

    fn template_data_mut(&mut self, id: ValueId) -> &mut TemplateData {
        match &mut self.value_mut(id).kind {
            ValueKind::Template(data) => data,
            other => panic!("expected Template node, got {}", other.name()),
        }
    }

    /// A fresh function shell. Used by the specializer drivers only.
    pub(crate) fn function_shell(
        &mut self,
        anchor: Anchor,
        name: impl Into<String>,
        original: Option<ValueId>,
        frame: Option<ValueId>,
        value: ValueId,
    ) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::Function(FunctionData {
                name: name.into(),
                original,
                frame,
                instance_args: Vec::new(),
                params: Vec::new(),
                value,
                return_type: None,
                except_type: None,
                complete: false,
                bindings: HashMap::new(),
            }),
            None,
        )
    }

    // -----------------------------------------------------------------------
    // Construction: expressions
    // -----------------------------------------------------------------------

    pub fn block(&mut self, anchor: Anchor, body: Vec<ValueId>, value: ValueId) -> ValueId {
        self.add_value(anchor, ValueKind::Block(BlockData { body, value }), None)
    }

    pub fn let_bind(&mut self, anchor: Anchor, params: Vec<ValueId>, args: Vec<ValueId>) -> ValueId {
        self.add_value(anchor, ValueKind::Let(LetData { params, args }), None)
    }

    pub fn loop_(
        &mut self,
        anchor: Anchor,
        params: Vec<ValueId>,
        args: Vec<ValueId>,
        value: ValueId,
    ) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::Loop(LoopData { params, args, value, return_type: None }),
            None,
        )
    }

    pub fn if_(&mut self, anchor: Anchor, clauses: Vec<Clause>, else_value: ValueId) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::If(IfData { clauses, else_anchor: anchor, else_value }),
            None,
        )
    }

    pub fn call(&mut self, anchor: Anchor, callee: ValueId, args: Vec<ValueId>) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::Call(CallData { callee, args, raw_call: false, try_call: false }),
            None,
        )
    }

    pub fn mark_raw_call(&mut self, call: ValueId) {
        match &mut self.value_mut(call).kind {
            ValueKind::Call(data) => data.raw_call = true,
            other => panic!("expected Call node, got {}", other.name()),
        }
    }

    pub fn mark_try_call(&mut self, call: ValueId) {
        match &mut self.value_mut(call).kind {
            ValueKind::Call(data) => data.try_call = true,
            other => panic!("expected Call node, got {}", other.name()),
        }
    }

    pub fn argument_list(&mut self, anchor: Anchor, values: Vec<ValueId>) -> ValueId {
        self.add_value(anchor, ValueKind::ArgumentList { values }, None)
    }

    pub fn extract_argument_node(
        &mut self,
        anchor: Anchor,
        value: ValueId,
        index: usize,
    ) -> ValueId {
        self.add_value(anchor, ValueKind::ExtractArgument { value, index }, None)
    }

    pub fn keyed(&mut self, anchor: Anchor, key: impl Into<String>, value: ValueId) -> ValueId {
        self.add_value(anchor, ValueKind::Keyed { key: key.into(), value }, None)
    }

    pub fn try_(
        &mut self,
        anchor: Anchor,
        try_value: ValueId,
        except_param: ValueId,
        except_value: ValueId,
    ) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::Try(TryData { try_value, except_param, except_value, except_type: None }),
            None,
        )
    }

    pub fn break_(&mut self, anchor: Anchor, value: ValueId) -> ValueId {
        self.add_value(anchor, ValueKind::Break { value }, None)
    }

    pub fn repeat(&mut self, anchor: Anchor, args: Vec<ValueId>) -> ValueId {
        self.add_value(anchor, ValueKind::Repeat { args }, None)
    }

    pub fn return_(&mut self, anchor: Anchor, value: ValueId) -> ValueId {
        self.add_value(anchor, ValueKind::Return { value }, None)
    }

    pub fn raise(&mut self, anchor: Anchor, value: ValueId) -> ValueId {
        self.add_value(anchor, ValueKind::Raise { value }, None)
    }

    pub fn syntax_extend(
        &mut self,
        anchor: Anchor,
        func: ValueId,
        payload: u64,
        env: ScopeRef,
    ) -> ValueId {
        self.add_value(
            anchor,
            ValueKind::SyntaxExtend(SyntaxExtendData { func, payload, env }),
            None,
        )
    }

    // -----------------------------------------------------------------------
    // Construction: constants
    // -----------------------------------------------------------------------

    pub fn const_int(&mut self, anchor: Anchor, ty: TypeId, value: u64) -> ValueId {
        self.add_value(anchor, ValueKind::ConstInt { value }, Some(ty))
    }

    pub fn const_bool(&mut self, anchor: Anchor, value: bool) -> ValueId {
        let ty = self.types.bool_ty;
        self.const_int(anchor, ty, value as u64)
    }

    pub fn const_real(&mut self, anchor: Anchor, ty: TypeId, value: f64) -> ValueId {
        self.add_value(anchor, ValueKind::ConstReal { value }, Some(ty))
    }

    pub fn const_type(&mut self, anchor: Anchor, ty: TypeId) -> ValueId {
        let marker = self.types.type_ty;
        self.add_value(anchor, ValueKind::ConstPointer(PointerValue::Type(ty)), Some(marker))
    }

    pub fn const_string(&mut self, anchor: Anchor, value: impl Into<String>) -> ValueId {
        let ty = self.types.string_ty;
        self.add_value(
            anchor,
            ValueKind::ConstPointer(PointerValue::Str(value.into())),
            Some(ty),
        )
    }

    pub fn const_symbol(&mut self, anchor: Anchor, name: impl Into<String>) -> ValueId {
        let ty = self.types.symbol_ty;
        self.add_value(
            anchor,
            ValueKind::ConstPointer(PointerValue::Symbol(name.into())),
            Some(ty),
        )
    }

    pub fn const_closure(
        &mut self,
        anchor: Anchor,
        template: ValueId,
        frame: Option<ValueId>,
    ) -> ValueId {
        let ty = self.types.closure_ty;
        self.add_value(
            anchor,
            ValueKind::ConstPointer(PointerValue::Closure { template, frame }),
            Some(ty),
        )
    }

    pub fn const_ast_macro(&mut self, anchor: Anchor, entry: AstMacroFn) -> ValueId {
        let ty = self.types.astmacro_ty;
        self.add_value(
            anchor,
            ValueKind::ConstPointer(PointerValue::AstMacro(entry)),
            Some(ty),
        )
    }

    pub fn const_builtin(&mut self, anchor: Anchor, builtin: Builtin) -> ValueId {
        let ty = self.types.builtin_ty;
        self.add_value(
            anchor,
            ValueKind::ConstPointer(PointerValue::Builtin(builtin)),
            Some(ty),
        )
    }

    pub fn const_list(&mut self, anchor: Anchor, payload: u64) -> ValueId {
        let ty = self.types.list_ty;
        self.add_value(
            anchor,
            ValueKind::ConstPointer(PointerValue::List(payload)),
            Some(ty),
        )
    }

    pub fn const_tuple(&mut self, anchor: Anchor, ty: TypeId, values: Vec<ValueId>) -> ValueId {
        self.add_value(anchor, ValueKind::ConstTuple { values }, Some(ty))
    }

    pub fn const_array(&mut self, anchor: Anchor, ty: TypeId, values: Vec<ValueId>) -> ValueId {
        self.add_value(anchor, ValueKind::ConstArray { values }, Some(ty))
    }

    pub fn const_vector(&mut self, anchor: Anchor, ty: TypeId, values: Vec<ValueId>) -> ValueId {
        self.add_value(anchor, ValueKind::ConstVector { values }, Some(ty))
    }

    /// The absent value, of type `Nothing`. Stands in for missing
    /// arguments and out-of-range projections.
    pub fn const_none(&mut self, anchor: Anchor) -> ValueId {
        let ty = self.types.nothing_ty;
        self.add_value(anchor, ValueKind::ConstTuple { values: Vec::new() }, Some(ty))
    }

    pub fn extern_(&mut self, anchor: Anchor, name: impl Into<String>, ty: TypeId) -> ValueId {
        self.add_value(anchor, ValueKind::Extern { name: name.into() }, Some(ty))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
