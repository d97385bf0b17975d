//! The emitter (§4.6, C6): a precedence-aware pretty-printer turning a
//! filtered [`Node`] tree back into target source text. Supports a
//! compact (single-line expressions, minimal blank lines) and an
//! expanded layout; chosen via [`Emitter::compact`].

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::error::CompileError;

/// Binding power used to decide whether a child expression needs
/// wrapping parens inside its parent. Higher binds tighter. Mirrors the
/// JS operator-precedence table closely enough for every operator this
/// translator ever emits; anything not listed (calls, literals, member
/// access) is treated as maximal (`PREC_MAX`) and never needs parens.
const PREC_MAX: u8 = 20;

fn bin_op_prec(op: &str) -> u8 {
    match op {
        "??" => 3,
        "||" => 4,
        "&&" => 5,
        "|" => 6,
        "^" => 7,
        "&" => 8,
        "==" | "!=" | "===" | "!==" => 9,
        "<" | ">" | "<=" | ">=" | "in" | "instanceof" => 10,
        "<<" | ">>" | ">>>" => 11,
        "+" | "-" => 12,
        "*" | "/" | "%" => 13,
        "**" => 14,
        _ => 9,
    }
}

fn node_prec(node: &Node) -> u8 {
    match node.kind {
        Tag::BinOp => node.name_at(0).map(bin_op_prec).unwrap_or(9),
        Tag::AndOp => 5,
        Tag::OrOp => 4,
        Tag::NullishOr => 3,
        Tag::Ternary => 2,
        Tag::Assign | Tag::OpAssign | Tag::NullishAsgn => 2,
        Tag::NotOp | Tag::UnaryOp => 15,
        Tag::InstanceOf | Tag::InCheck => 10,
        _ => PREC_MAX,
    }
}

pub struct Emitter {
    pub compact: bool,
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter { compact: false }
    }
}

impl Emitter {
    pub fn new(compact: bool) -> Self {
        Emitter { compact }
    }

    /// Emits the full program: the polyfill/import prelude, then the
    /// root statement sequence.
    pub fn emit_program(&self, prepend: &[Node], root: &Node) -> Result<String, CompileError> {
        let mut out = String::new();
        for node in prepend {
            out.push_str(&self.emit_stmt(node, 0)?);
            out.push('\n');
        }
        if !prepend.is_empty() && !self.compact {
            out.push('\n');
        }
        out.push_str(&self.emit_stmt(root, 0)?);
        out.push('\n');
        Ok(out)
    }

    fn indent(&self, depth: usize) -> String {
        if self.compact {
            String::new()
        } else {
            "  ".repeat(depth)
        }
    }

    fn nl(&self) -> &'static str {
        if self.compact {
            " "
        } else {
            "\n"
        }
    }

    /// Statement-position printing: sequences (`Begin`) print one
    /// statement per line rather than comma-joined.
    fn emit_stmt(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        match node.kind {
            Tag::Begin | Tag::KwBegin => {
                let stmts: Result<Vec<String>, CompileError> = node
                    .children
                    .iter()
                    .filter_map(|v| match v {
                        Value::Node(n) => Some(n),
                        _ => None,
                    })
                    .map(|n| self.emit_stmt(n, depth))
                    .collect();
                Ok(stmts?.join(self.nl()))
            }
            Tag::Nil => Ok(String::new()),
            Tag::Import => self.emit_import(node),
            Tag::Export => self.emit_export(node),
            Tag::Class => self.emit_class(node, depth),
            Tag::Prop => self.emit_prop(node, depth),
            Tag::Def | Tag::Defs | Tag::Defm => self.emit_def(node, depth),
            Tag::Module => self.emit_module(node, depth),
            Tag::If => self.emit_if(node, depth),
            Tag::While | Tag::Until => self.emit_while(node, depth),
            Tag::For => self.emit_c_style_for(node, depth),
            Tag::Rescue => self.emit_try(node, depth),
            Tag::Ensure => self.emit_ensure(node, depth),
            Tag::Return => {
                let value = node.node_at(0);
                match value {
                    Some(v) if v.kind != Tag::Nil => Ok(format!("{}return {};", self.indent(depth), self.emit_expr(v, 0)?)),
                    _ => Ok(format!("{}return;", self.indent(depth))),
                }
            }
            Tag::VarDecl => {
                let name = node.name_at(0).unwrap_or("");
                let value = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("var decl missing value"))?, 2)?;
                Ok(format!("{}let {name} = {value};", self.indent(depth)))
            }
            Tag::Next => Ok(format!("{}continue;", self.indent(depth))),
            Tag::Break => Ok(format!("{}break;", self.indent(depth))),
            Tag::Throw => Ok(format!("{}throw {};", self.indent(depth), self.emit_expr(node.node_at(0).unwrap_or(&Node::nil()), 0)?)),
            Tag::JsRaw => Ok(format!("{}{}", self.indent(depth), node.children.first().and_then(value_str).unwrap_or_default())),
            _ => Ok(format!("{}{};", self.indent(depth), self.emit_expr(node, 0)?)),
        }
    }

    /// Expression-position printing. `parent_prec` lets binary/ternary
    /// operators decide whether they need to parenthesize themselves.
    fn emit_expr(&self, node: &Node, parent_prec: u8) -> Result<String, CompileError> {
        let text = match node.kind {
            Tag::Int => match node.children.first() {
                Some(Value::Int(n)) => n.to_string(),
                _ => return Err(CompileError::malformed("Int node missing Int child")),
            },
            Tag::Float => match node.children.first() {
                Some(Value::Float(f)) => format!("{}", f.0),
                _ => return Err(CompileError::malformed("Float node missing Float child")),
            },
            Tag::Str => format!("{:?}", node.name_at(0).unwrap_or("")),
            Tag::Dstr => self.emit_template_literal(node)?,
            Tag::Sym => format!("{:?}", node.name_at(0).unwrap_or("")),
            Tag::True => "true".to_string(),
            Tag::False => "false".to_string(),
            Tag::Nil => "null".to_string(),
            Tag::Regexp => format!("/{}/", node.name_at(0).unwrap_or("")),
            Tag::Octal => match node.children.first() {
                Some(Value::Int(n)) => format!("0o{n:o}"),
                _ => return Err(CompileError::malformed("Octal node missing Int child")),
            },
            Tag::Lvar | Tag::Gvar | Tag::Cvar => node.name_at(0).unwrap_or("").to_string(),
            Tag::Const => node.name_at(0).unwrap_or("").to_string(),
            Tag::SelfExpr => "this".to_string(),
            Tag::Lvasgn | Tag::Gvasgn | Tag::Cvasgn | Tag::Casgn => {
                let name = node.name_at(0).unwrap_or("");
                let value = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("assignment missing value"))?, 2)?;
                format!("{name} = {value}")
            }
            Tag::Ivar => format!("this.{}", node.name_at(0).unwrap_or("")),
            Tag::Ivasgn => {
                let name = node.name_at(0).unwrap_or("");
                let value = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("ivasgn missing value"))?, 2)?;
                format!("this.{name} = {value}")
            }
            Tag::Array => {
                let items: Result<Vec<String>, _> = node
                    .children
                    .iter()
                    .filter_map(|v| match v {
                        Value::Node(n) => Some(n),
                        _ => None,
                    })
                    .map(|n| self.emit_expr(n, 2))
                    .collect();
                format!("[{}]", items?.join(", "))
            }
            Tag::Hash => {
                let pairs: Result<Vec<String>, _> = node
                    .children
                    .iter()
                    .filter_map(|v| match v {
                        Value::Node(n) => Some(n),
                        _ => None,
                    })
                    .map(|n| self.emit_expr(n, 2))
                    .collect();
                format!("{{ {} }}", pairs?.join(", "))
            }
            Tag::Pair => {
                let key_node = node.node_at(0).ok_or_else(|| CompileError::malformed("pair missing key"))?;
                // `{a: 1}`'s key is a bare symbol literal naming an
                // identifier, not a string — print it unquoted the way a
                // JS object literal key normally reads, rather than
                // routing it through the generic (quoting) Sym printer.
                let key = match key_node.kind {
                    Tag::Sym => key_node.name_at(0).unwrap_or("").to_string(),
                    _ => self.emit_expr(key_node, 2)?,
                };
                let value = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("pair missing value"))?, 2)?;
                format!("{key}: {value}")
            }
            Tag::Splat | Tag::KwSplat => format!("...{}", self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("splat missing operand"))?, 2)?),
            Tag::Send | Tag::Csend => return self.emit_send(node, parent_prec),
            Tag::SendBang => return self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("send! missing inner"))?, parent_prec),
            Tag::Attr => {
                let recv = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("attr missing receiver"))?, PREC_MAX)?;
                format!("{recv}.{}", node.name_at(1).unwrap_or(""))
            }
            Tag::Call => {
                let callee = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("call missing callee"))?, PREC_MAX)?;
                let args = self.emit_arg_list(node, 1)?;
                format!("{callee}({args})")
            }
            Tag::Index => {
                let recv = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("index missing receiver"))?, PREC_MAX)?;
                let idx = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("index missing key"))?, 0)?;
                format!("{recv}[{idx}]")
            }
            Tag::IndexAsgn => {
                let recv = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("index asgn missing receiver"))?, PREC_MAX)?;
                let idx = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("index asgn missing key"))?, 0)?;
                let value = self.emit_expr(node.node_at(2).ok_or_else(|| CompileError::malformed("index asgn missing value"))?, 2)?;
                format!("{recv}[{idx}] = {value}")
            }
            Tag::Assign => {
                let target = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("assign missing target"))?, PREC_MAX)?;
                let value = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("assign missing value"))?, 2)?;
                format!("{target} = {value}")
            }
            Tag::OpAssign => {
                let op = node.name_at(0).unwrap_or("+");
                let target = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("op-assign missing target"))?, PREC_MAX)?;
                let value = self.emit_expr(node.node_at(2).ok_or_else(|| CompileError::malformed("op-assign missing value"))?, 2)?;
                format!("{target} {op}= {value}")
            }
            Tag::NullishAsgn => {
                let target = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("nullish-assign missing target"))?, PREC_MAX)?;
                let value = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("nullish-assign missing value"))?, 2)?;
                format!("{target} ??= {value}")
            }
            Tag::BinOp => {
                let op = node.name_at(0).unwrap_or("+");
                let prec = bin_op_prec(op);
                let lhs = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("binop missing lhs"))?, prec)?;
                let rhs = self.emit_expr(node.node_at(2).ok_or_else(|| CompileError::malformed("binop missing rhs"))?, prec + 1)?;
                let inner = format!("{lhs} {op} {rhs}");
                return Ok(if prec < parent_prec { format!("({inner})") } else { inner });
            }
            Tag::UnaryOp => {
                let op = node.name_at(0).unwrap_or("-");
                let operand = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("unary missing operand"))?, 15)?;
                format!("{op}{operand}")
            }
            Tag::NotOp => format!("!{}", self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("not missing operand"))?, 15)?),
            Tag::AndOp => {
                let lhs = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("and missing lhs"))?, 5)?;
                let rhs = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("and missing rhs"))?, 6)?;
                let inner = format!("{lhs} && {rhs}");
                return Ok(if 5 < parent_prec { format!("({inner})") } else { inner });
            }
            Tag::OrOp => {
                let lhs = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("or missing lhs"))?, 4)?;
                let rhs = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("or missing rhs"))?, 5)?;
                let inner = format!("{lhs} || {rhs}");
                return Ok(if 4 < parent_prec { format!("({inner})") } else { inner });
            }
            Tag::NullishOr => {
                let lhs = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("nullish missing lhs"))?, 3)?;
                let rhs = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("nullish missing rhs"))?, 4)?;
                let inner = format!("{lhs} ?? {rhs}");
                return Ok(if 3 < parent_prec { format!("({inner})") } else { inner });
            }
            Tag::Ternary => {
                let cond = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("ternary missing cond"))?, 3)?;
                let then = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("ternary missing then"))?, 2)?;
                let els = self.emit_expr(node.node_at(2).ok_or_else(|| CompileError::malformed("ternary missing else"))?, 2)?;
                let inner = format!("{cond} ? {then} : {els}");
                return Ok(if 2 < parent_prec { format!("({inner})") } else { inner });
            }
            Tag::InstanceOf => {
                let lhs = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("instanceof missing lhs"))?, 10)?;
                let rhs = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("instanceof missing rhs"))?, 11)?;
                format!("{lhs} instanceof {rhs}")
            }
            Tag::InCheck => {
                let lhs = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("in-check missing lhs"))?, 10)?;
                let rhs = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("in-check missing rhs"))?, 11)?;
                format!("{lhs} in {rhs}")
            }
            Tag::SuperCall => {
                let args = self.emit_arg_list(node, 0)?;
                format!("super({args})")
            }
            Tag::ZSuperCall => "super(...arguments)".to_string(),
            Tag::Yield => {
                let arg = node.node_at(0);
                match arg {
                    Some(a) if a.kind != Tag::Nil => format!("yield {}", self.emit_expr(a, 0)?),
                    _ => "yield".to_string(),
                }
            }
            Tag::Defined => {
                let target = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("defined? missing target"))?, PREC_MAX)?;
                format!("(typeof {target} !== \"undefined\")")
            }
            Tag::Block => return self.emit_arrow(node),
            Tag::JsRaw => node.children.first().and_then(value_str).unwrap_or_default(),
            Tag::HostValue => node.children.first().and_then(value_str).unwrap_or_default(),
            other => {
                return Err(CompileError::unsupported(format!("{other:?}"), node.location.clone()));
            }
        };
        Ok(text)
    }

    fn emit_send(&self, node: &Node, parent_prec: u8) -> Result<String, CompileError> {
        let method = node.method_name().unwrap_or("");
        let recv = node.receiver();
        let args = self.emit_arg_list(node, 2)?;
        let call_op = if node.kind == Tag::Csend { "?." } else { "." };
        let text = match recv {
            Some(r) if r.kind != Tag::Nil => {
                let r = self.emit_expr(r, PREC_MAX)?;
                format!("{r}{call_op}{method}({args})")
            }
            _ => format!("{method}({args})"),
        };
        let _ = parent_prec;
        Ok(text)
    }

    fn emit_arg_list(&self, node: &Node, idx: usize) -> Result<String, CompileError> {
        let items = node.list_at(idx);
        let parts: Result<Vec<String>, _> = items.iter().map(|n| self.emit_expr(n, 2)).collect();
        Ok(parts?.join(", "))
    }

    fn emit_template_literal(&self, node: &Node) -> Result<String, CompileError> {
        let mut out = String::from("`");
        for child in node.children.iter() {
            match child {
                Value::Str(s) => out.push_str(s),
                Value::Node(n) => {
                    out.push_str("${");
                    out.push_str(&self.emit_expr(n, 0)?);
                    out.push('}');
                }
                _ => {}
            }
        }
        out.push('`');
        Ok(out)
    }

    /// A synthesized-arrow [`Tag::Block`] (shape `[Nil, params(List<Str>),
    /// body]`, see `filters::collections::synth_arrow`) prints as
    /// `(p1, p2) => body`; a concise body expression is left bare, a
    /// `Begin` sequence gets braces and an explicit `return` on its
    /// final statement.
    fn emit_arrow(&self, node: &Node) -> Result<String, CompileError> {
        let params = match node.children.get(1) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Str(s) | Value::Sym(s) => Some(s.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let head = match params.as_slice() {
            // A lone plain identifier skips the parens JS allows for a
            // single arrow param; a destructuring pattern (already
            // pre-rendered as `[k, v]`/`{a, b}` by the filter that built
            // it) still needs them even though it's the only param.
            [one] if !one.starts_with('[') && !one.starts_with('{') => one.clone(),
            many => format!("({})", many.join(", ")),
        };
        let body = node.node_at(2).ok_or_else(|| CompileError::malformed("arrow missing body"))?;
        if body.kind == Tag::Begin || body.kind == Tag::KwBegin {
            let stmts = self.emit_stmt(body, 1)?;
            Ok(format!("{head} => {{\n{stmts}\n}}"))
        } else {
            Ok(format!("{head} => {}", self.emit_expr(body, 2)?))
        }
    }

    fn emit_import(&self, node: &Node) -> Result<String, CompileError> {
        let path = node.name_at(0).unwrap_or("");
        match node.children.get(2) {
            Some(Value::Str(name)) => Ok(format!("import {{ {name} }} from \"{path}\";")),
            Some(Value::List(items)) => {
                let names: Vec<&str> = items.iter().filter_map(value_str).collect();
                if names.is_empty() {
                    Ok(format!("import \"{path}\";"))
                } else {
                    Ok(format!("import {{ {} }} from \"{path}\";", names.join(", ")))
                }
            }
            _ => Ok(format!("import \"{path}\";")),
        }
    }

    fn emit_export(&self, node: &Node) -> Result<String, CompileError> {
        let is_default = matches!(node.children.get(1), Some(Value::Bool(true)));
        let names = match node.children.first() {
            Some(Value::List(items)) => items.iter().filter_map(value_str).collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        if is_default {
            Ok(format!("export default {};", names.first().cloned().unwrap_or_default()))
        } else {
            Ok(format!("export {{ {} }};", names.join(", ")))
        }
    }

    fn emit_if(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let cond = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("if missing cond"))?, 0)?;
        let then = node.node_at(1).ok_or_else(|| CompileError::malformed("if missing then"))?;
        let els = node.node_at(2);
        let ind = self.indent(depth);
        let mut out = format!("{ind}if ({cond}) {{\n{}\n{ind}}}", self.emit_stmt(then, depth + 1)?);
        if let Some(e) = els {
            if e.kind != Tag::Nil {
                if e.kind == Tag::If {
                    out.push_str(&format!(" else {}", self.emit_if(e, depth)?.trim_start()));
                } else {
                    out.push_str(&format!(" else {{\n{}\n{ind}}}", self.emit_stmt(e, depth + 1)?));
                }
            }
        }
        Ok(out)
    }

    fn emit_while(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let cond = self.emit_expr(node.node_at(0).ok_or_else(|| CompileError::malformed("while missing cond"))?, 0)?;
        let cond = if node.kind == Tag::Until { format!("!({cond})") } else { cond };
        let body = node.node_at(1).ok_or_else(|| CompileError::malformed("while missing body"))?;
        let ind = self.indent(depth);
        Ok(format!("{ind}while ({cond}) {{\n{}\n{ind}}}", self.emit_stmt(body, depth + 1)?))
    }

    fn emit_c_style_for(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let var = node.name_at(0).unwrap_or("i");
        let init = self.emit_expr(node.node_at(1).ok_or_else(|| CompileError::malformed("for missing init"))?, 0)?;
        let op = node.name_at(2).unwrap_or("<");
        let bound = self.emit_expr(node.node_at(3).ok_or_else(|| CompileError::malformed("for missing bound"))?, 0)?;
        let step = node.node_at(4).ok_or_else(|| CompileError::malformed("for missing step"))?;
        let body = node.node_at(5).ok_or_else(|| CompileError::malformed("for missing body"))?;
        let ind = self.indent(depth);
        let step_text = match step.children.first() {
            Some(Value::Int(1)) => format!("{var}++"),
            Some(Value::Int(-1)) => format!("{var}--"),
            _ => format!("{var} += {}", self.emit_expr(step, 0)?),
        };
        Ok(format!(
            "{ind}for (let {var} = {init}; {var} {op} {bound}; {step_text}) {{\n{}\n{ind}}}",
            self.emit_stmt(body, depth + 1)?
        ))
    }

    fn emit_try(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let body = node.node_at(0).ok_or_else(|| CompileError::malformed("rescue missing body"))?;
        let catch = node.node_at(1).ok_or_else(|| CompileError::malformed("rescue missing catch body"))?;
        let err_var = catch.name_at(1).unwrap_or("e");
        let catch_body = catch.node_at(2).ok_or_else(|| CompileError::malformed("rescue body missing handler"))?;
        let ind = self.indent(depth);
        Ok(format!(
            "{ind}try {{\n{}\n{ind}}} catch ({err_var}) {{\n{}\n{ind}}}",
            self.emit_stmt(body, depth + 1)?,
            self.emit_stmt(catch_body, depth + 1)?
        ))
    }

    fn emit_ensure(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let body = node.node_at(0).ok_or_else(|| CompileError::malformed("ensure missing body"))?;
        let finalizer = node.node_at(1).ok_or_else(|| CompileError::malformed("ensure missing finalizer"))?;
        let ind = self.indent(depth);
        Ok(format!(
            "{ind}try {{\n{}\n{ind}}} finally {{\n{}\n{ind}}}",
            self.emit_stmt(body, depth + 1)?,
            self.emit_stmt(finalizer, depth + 1)?
        ))
    }

    fn emit_def(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let name = node.name_at(0).unwrap_or("");
        let params = match node.children.get(1) {
            Some(Value::List(items)) => items.iter().filter_map(value_str).collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let body = node.node_at(2).ok_or_else(|| CompileError::malformed("def missing body"))?;
        let ind = self.indent(depth);
        let static_kw = if node.kind == Tag::Defs { "static " } else { "" };
        let display_name = if node.kind == Tag::Defm { "constructor" } else { name };
        Ok(format!(
            "{ind}{static_kw}{display_name}({}) {{\n{}\n{ind}}}",
            params.join(", "),
            self.emit_stmt(body, depth + 1)?
        ))
    }

    /// `Tag::Prop` is synthesized by `ClassFilter` for each `attr_*`
    /// declaration (shape `[field_name(Str), readable(Bool),
    /// writable(Bool), use_private_fields(Bool)]`) and expands here into
    /// a private field declaration plus the accessor method(s) it calls
    /// for.
    fn emit_prop(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let field_name = node.name_at(0).ok_or_else(|| CompileError::malformed("prop missing field name"))?;
        let readable = matches!(node.children.get(1), Some(Value::Bool(true)));
        let writable = matches!(node.children.get(2), Some(Value::Bool(true)));
        let private = matches!(node.children.get(3), Some(Value::Bool(true)));
        let backing = if private { format!("#{field_name}") } else { format!("_{field_name}") };
        let ind = self.indent(depth);
        let mut lines = Vec::new();
        if private {
            lines.push(format!("{ind}{backing};"));
        }
        if readable {
            lines.push(format!("{ind}get {field_name}() {{\n{ind}  return this.{backing};\n{ind}}}"));
        }
        if writable {
            lines.push(format!("{ind}set {field_name}({field_name}) {{\n{ind}  this.{backing} = {field_name};\n{ind}}}"));
        }
        Ok(lines.join(self.nl()))
    }

    fn emit_class(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let name = node.name_at(0).unwrap_or("");
        let superclass = node.node_at(1).filter(|s| s.kind != Tag::Nil);
        let body = node.node_at(2).ok_or_else(|| CompileError::malformed("class missing body"))?;
        let has_method_missing = matches!(node.children.get(3), Some(Value::Bool(true)));
        let ind = self.indent(depth);
        let extends = match superclass {
            Some(s) => format!(" extends {}", self.emit_expr(s, PREC_MAX)?),
            None => String::new(),
        };
        let class_body = self.emit_stmt(body, depth + 1)?;
        let mut out = if has_method_missing {
            self.emit_method_missing_proxy(name, &extends, &class_body, depth)
        } else {
            format!("{ind}class {name}{extends} {{\n{class_body}\n{ind}}}")
        };
        let mixins: Vec<&str> = node.children.iter().skip(4).filter_map(value_str).collect();
        for mixin in mixins {
            out.push_str(&format!("\n{ind}Object.assign({name}.prototype, {mixin});"));
        }
        Ok(out)
    }

    /// A class declaring `method_missing` compiles to an anonymous class
    /// wrapped in a `Proxy` whose `construct` trap wraps each new
    /// instance in a second `Proxy` dispatching unknown property reads
    /// through `method_missing`, per the `def name` naming that method
    /// keeps verbatim elsewhere in this emitter.
    fn emit_method_missing_proxy(&self, name: &str, extends: &str, class_body: &str, depth: usize) -> String {
        let ind = self.indent(depth);
        let inner = self.indent(depth + 1);
        let trap = self.indent(depth + 2);
        let inner_trap = self.indent(depth + 3);
        format!(
            "{ind}const {name} = new Proxy(class{extends} {{\n{class_body}\n{ind}}}, {{\n\
{inner}construct(target, args) {{\n\
{trap}return new Proxy(new target(...args), {{\n\
{inner_trap}get(obj, prop) {{\n\
{inner_trap}    return prop in obj ? obj[prop] : (...a) => obj.method_missing(prop, ...a);\n\
{inner_trap}}}\n\
{trap}}});\n\
{inner}}}\n\
{ind}}});"
        )
    }

    fn emit_module(&self, node: &Node, depth: usize) -> Result<String, CompileError> {
        let name = node.name_at(0).unwrap_or("");
        let body = node.node_at(1).ok_or_else(|| CompileError::malformed("module missing body"))?;
        let ind = self.indent(depth);
        Ok(format!("{ind}const {name} = {{\n{}\n{ind}}};", self.emit_stmt(body, depth + 1)?))
    }
}

fn value_str(v: &Value) -> Option<&str> {
    match v {
        Value::Str(s) | Value::Sym(s) => Some(s.as_str()),
        _ => None,
    }
}
