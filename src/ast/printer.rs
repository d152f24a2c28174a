//! AST pretty-printer.
//!
//! Emits a human-readable, indented tree rendering of a node. Output is
//! deterministic: children print in structural order, types through the
//! type formatter. Functions and templates already seen print as a
//! reference line instead of recursing, which keeps cyclic graphs
//! printable.

use std::collections::HashSet;
use std::fmt::Write;

use crate::ast::value::{PointerValue, ValueId, ValueKind};
use crate::session::Session;

/// Rendering options.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintFormat {
    /// Prefix every line with the node's anchor.
    pub anchors: bool,
}

/// Renders `node` with default options.
pub fn format_value(session: &Session, node: ValueId) -> String {
    let mut out = String::new();
    write_value(&mut out, session, node, PrintFormat::default());
    out
}

/// Renders `node` into `out`.
pub fn write_value(out: &mut String, session: &Session, node: ValueId, fmt: PrintFormat) {
    let mut writer = AstWriter { session, out, fmt, visited: HashSet::new() };
    writer.walk(node, 0);
}

struct AstWriter<'a> {
    session: &'a Session,
    out: &'a mut String,
    fmt: PrintFormat,
    visited: HashSet<ValueId>,
}

impl AstWriter<'_> {
    fn line_start(&mut self, depth: usize) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn head(&mut self, node: ValueId, depth: usize, label: &str) {
        self.line_start(depth);
        if self.fmt.anchors {
            let _ = write!(self.out, "{} ", self.session.anchor(node));
        }
        let _ = write!(self.out, "{}{}", label, node);
        if let Some(ty) = self.session.value_type(node) {
            let _ = write!(self.out, " : {}", self.session.types.format(ty));
        }
    }

    fn walk(&mut self, node: ValueId, depth: usize) {
        let first_visit = self.visited.insert(node);
        match self.session.value_kind(node) {
            ValueKind::Template(data) => {
                let mut label = String::from("Template ");
                if data.is_inline {
                    label.push_str("inline ");
                }
                label.push_str(&data.name);
                label.push(' ');
                self.head(node, depth, &label);
                if data.value.is_none() {
                    self.out.push_str(" forward-decl");
                }
                if first_visit {
                    for &param in &data.params {
                        self.walk(param, depth + 1);
                    }
                    if let Some(value) = data.value {
                        self.walk(value, depth + 1);
                    }
                }
            }
            ValueKind::Function(data) => {
                let mut label = String::from("Function ");
                label.push_str(&data.name);
                label.push(' ');
                self.head(node, depth, &label);
                if first_visit {
                    for &param in &data.params {
                        self.walk(param, depth + 1);
                    }
                    self.walk(data.value, depth + 1);
                }
            }
            ValueKind::SymbolValue(data) => {
                let mut label = String::from(data.name.as_str());
                if data.variadic {
                    label.push_str("...");
                }
                label.push(' ');
                self.head(node, depth, &label);
            }
            ValueKind::Block(data) => {
                self.head(node, depth, "Block ");
                for &expr in &data.body {
                    self.walk(expr, depth + 1);
                }
                self.walk(data.value, depth + 1);
            }
            ValueKind::Let(data) => {
                self.head(node, depth, "Let ");
                for (&param, &arg) in data.params.iter().zip(&data.args) {
                    self.walk(param, depth + 1);
                    self.walk(arg, depth + 2);
                }
            }
            ValueKind::Loop(data) => {
                self.head(node, depth, "Loop ");
                for (&param, &arg) in data.params.iter().zip(&data.args) {
                    self.walk(param, depth + 1);
                    self.walk(arg, depth + 2);
                }
                self.walk(data.value, depth + 1);
            }
            ValueKind::If(data) => {
                self.head(node, depth, "If ");
                for clause in &data.clauses {
                    self.walk(clause.cond, depth + 1);
                    self.walk(clause.value, depth + 2);
                }
                self.walk(data.else_value, depth + 1);
            }
            ValueKind::Call(data) => {
                let mut label = String::from("Call ");
                if data.raw_call {
                    label.push_str("rawcall ");
                }
                if data.try_call {
                    label.push_str("trycall ");
                }
                self.head(node, depth, &label);
                self.walk(data.callee, depth + 1);
                for &arg in &data.args {
                    self.walk(arg, depth + 1);
                }
            }
            ValueKind::ArgumentList { values } => {
                self.head(node, depth, "ArgumentList ");
                for &value in values {
                    self.walk(value, depth + 1);
                }
            }
            ValueKind::ExtractArgument { value, index } => {
                self.head(node, depth, &format!("ExtractArgument {} ", index));
                self.walk(*value, depth + 1);
            }
            ValueKind::Keyed { key, value } => {
                self.head(node, depth, &format!("Keyed {} ", key));
                self.walk(*value, depth + 1);
            }
            ValueKind::Try(data) => {
                self.head(node, depth, "Try ");
                self.walk(data.try_value, depth + 1);
                self.walk(data.except_param, depth + 1);
                self.walk(data.except_value, depth + 1);
            }
            ValueKind::Break { value } => {
                self.head(node, depth, "Break ");
                self.walk(*value, depth + 1);
            }
            ValueKind::Repeat { args } => {
                self.head(node, depth, "Repeat ");
                for &arg in args {
                    self.walk(arg, depth + 1);
                }
            }
            ValueKind::Return { value } => {
                self.head(node, depth, "Return ");
                self.walk(*value, depth + 1);
            }
            ValueKind::Raise { value } => {
                self.head(node, depth, "Raise ");
                self.walk(*value, depth + 1);
            }
            ValueKind::SyntaxExtend(data) => {
                self.head(node, depth, "SyntaxExtend ");
                self.walk(data.func, depth + 1);
            }
            ValueKind::ConstInt { value } => {
                self.head(node, depth, &format!("ConstInt {} ", value));
            }
            ValueKind::ConstReal { value } => {
                self.head(node, depth, &format!("ConstReal {} ", value));
            }
            ValueKind::ConstPointer(pointer) => {
                let label = match pointer {
                    PointerValue::Type(ty) => {
                        format!("ConstType {} ", self.session.types.format(*ty))
                    }
                    PointerValue::Closure { template, .. } => {
                        format!("Closure {} ", template)
                    }
                    PointerValue::Str(s) => format!("ConstString {:?} ", s),
                    PointerValue::Symbol(s) => format!("ConstSymbol {} ", s),
                    PointerValue::AstMacro(_) => String::from("ASTMacro "),
                    PointerValue::Builtin(b) => format!("Builtin {} ", b),
                    PointerValue::List(payload) => format!("ConstList {} ", payload),
                    PointerValue::Raw(raw) => format!("ConstPointer {:#x} ", raw),
                };
                self.head(node, depth, &label);
            }
            ValueKind::ConstTuple { values } => {
                self.head(node, depth, "ConstTuple ");
                for &value in values {
                    self.walk(value, depth + 1);
                }
            }
            ValueKind::ConstArray { values } => {
                self.head(node, depth, "ConstArray ");
                for &value in values {
                    self.walk(value, depth + 1);
                }
            }
            ValueKind::ConstVector { values } => {
                self.head(node, depth, "ConstVector ");
                for &value in values {
                    self.walk(value, depth + 1);
                }
            }
            ValueKind::Extern { name } => {
                self.head(node, depth, &format!("Extern {} ", name));
            }
        }
    }
}
