//! Class/module lowering (§4.4.9, the largest single rewrite-rule
//! group): `initialize` → constructor, instance-variable access →
//! `this.#field`/`this._field`, `attr_accessor`/`attr_reader`/
//! `attr_writer` → property descriptors, `self.foo` static methods
//! (already distinguished at parse time as [`Tag::Defs`], so no
//! reshaping needed there beyond the same ivar rewrite), `include
//! Module` → a post-class `Object.assign` marker, and `method_missing`
//! → a flag the emitter consults to wrap construction in a `Proxy`.
//! Also registers class/module names into the *enclosing* namespace
//! frame (not just the bindings that bubble up through a class body's
//! own `leave`), so `Namespace::top_level_names()` can see them.

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::namespace::BindingKind;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

const ATTR_METHODS: &[&str] = &["attr_accessor", "attr_reader", "attr_writer"];

#[derive(Default)]
pub struct ClassFilter;

impl Filter for ClassFilter {
    fn name(&self) -> &'static str {
        "classes"
    }

    /// Must run after `truthy`/`operators`/etc have already rewritten
    /// expressions, but it needs first refusal on `Ivar`/`Ivasgn` nodes
    /// before any generic send-rewriting filter mistakes a bare
    /// receiverless call for one; in the default order this is already
    /// last, so no permutation is required.
    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        match node.kind {
            Tag::Class => self.handle_class(node, kernel),
            Tag::Module => {
                let name = node.name_at(0)?.to_string();
                kernel.namespace.define(name, BindingKind::Module(kernel.namespace.depth()));
                None
            }
            Tag::Ivar => {
                let name = node.name_at(0)?;
                Some(DispatchOutcome::Replace(field_access(kernel, name)))
            }
            Tag::Ivasgn => {
                let name = node.name_at(0)?;
                let value = node.node_at(1)?.clone();
                Some(DispatchOutcome::Recurse(Node::assign(field_access(kernel, name), value)))
            }
            Tag::Send | Tag::Csend if node.receiver().is_none() && matches!(node.method_name(), Some(m) if ATTR_METHODS.contains(&m)) => {
                self.handle_attr_decl(node, kernel)
            }
            _ => None,
        }
    }
}

impl ClassFilter {
    fn handle_class(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        let name = node.name_at(0)?.to_string();
        let superclass = node.node_at(1).cloned();
        let body = node.node_at(2)?.clone();

        // Registered in the *enclosing* frame before `enter` so the name
        // is visible to `Namespace::top_level_names()`/`find` from outside
        // the class body, not just bindings merged up via `leave`.
        kernel.namespace.define(name.clone(), BindingKind::Const(node.clone()));
        kernel.namespace.enter(&name);
        kernel.namespace.define("self", BindingKind::SelfBinding);

        let statements = flatten_begin(&body);
        let mut includes = Vec::new();
        let mut has_method_missing = false;
        let mut rewritten_statements = Vec::new();

        for stmt in statements {
            if let Some(module) = include_target(&stmt) {
                includes.push(module);
                continue;
            }
            if is_method_missing_def(&stmt) {
                has_method_missing = true;
            }
            rewritten_statements.push(kernel.process(rename_initialize(stmt)));
        }

        kernel.namespace.leave();

        let new_body = Node::of(Tag::Begin, rewritten_statements);
        let mut children = vec![
            Value::Sym(name),
            superclass.map(Value::Node).unwrap_or(Value::Nil),
            Value::Node(new_body),
            Value::Bool(has_method_missing),
        ];
        children.extend(includes.into_iter().map(|m| Value::Str(m)));
        Some(DispatchOutcome::Replace(node.updated(None, Some(children))))
    }

    fn handle_attr_decl(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        let name = node.method_name()?;
        let (readable, writable) = match name {
            "attr_accessor" => (true, true),
            "attr_reader" => (true, false),
            "attr_writer" => (false, true),
            _ => return None,
        };
        let props: Vec<Node> = node
            .args()
            .into_iter()
            .filter_map(|arg| arg.name_at(0).map(str::to_string))
            .map(|field_name| {
                kernel.namespace.define(field_name.clone(), BindingKind::Autobind);
                Node::make(
                    Tag::Prop,
                    vec![
                        Value::Str(field_name),
                        Value::Bool(readable),
                        Value::Bool(writable),
                        Value::Bool(kernel.options.use_private_fields()),
                    ],
                )
            })
            .collect();
        if props.is_empty() {
            return None;
        }
        if props.len() == 1 {
            return Some(DispatchOutcome::Replace(props.into_iter().next().unwrap()));
        }
        Some(DispatchOutcome::Replace(Node::of(Tag::Begin, props)))
    }
}

/// `this.#name` (ES2020+ private fields) or `this._name` (the
/// underscore-convention fallback), per [`crate::compiler::filters::Options::use_private_fields`].
fn field_access(kernel: &Kernel, name: &str) -> Node {
    let field = if kernel.options.use_private_fields() {
        format!("#{name}")
    } else {
        format!("_{name}")
    };
    Node::attr(Node::self_expr(), field)
}

/// `Def` nodes named `initialize` are retagged `Defm` ("def-method,
/// marked") purely as a signal the emitter's class-body printer reads
/// to choose the literal name `constructor` instead of the SRC method
/// name — the def's own param/body shape is untouched.
fn rename_initialize(node: Node) -> Node {
    if node.kind == Tag::Def && node.name_at(0) == Some("initialize") {
        let mut children = node.children.as_ref().clone();
        children[0] = Value::Sym("constructor".to_string());
        return node.updated(Some(Tag::Defm), Some(children));
    }
    node
}

fn is_method_missing_def(node: &Node) -> bool {
    matches!(node.kind, Tag::Def | Tag::Defs) && node.name_at(0) == Some("method_missing")
}

/// An `include Mod` statement inside a class body (a bare, receiverless
/// `Send` to `include` naming a constant) returns the module's name;
/// the caller strips the statement from the body and records it as a
/// post-class mixin the emitter splices in as `Object.assign(Name.prototype, Mod)`.
fn include_target(node: &Node) -> Option<String> {
    if node.kind != Tag::Send || node.receiver().is_some() {
        return None;
    }
    if node.method_name()? != "include" {
        return None;
    }
    let arg = node.args().into_iter().next()?;
    arg.name_at(0).map(str::to_string)
}

fn flatten_begin(node: &Node) -> Vec<Node> {
    if node.kind == Tag::Begin || node.kind == Tag::KwBegin {
        node.children
            .iter()
            .filter_map(|v| match v {
                Value::Node(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    } else {
        vec![node.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filters::structural::StructuralFilter;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    /// `ClassFilter` alone never claims a plain `Def`/`Begin`, so a
    /// nested rewrite (e.g. an `Ivar` inside a method body) needs
    /// `StructuralFilter` in the stack to actually recurse that far —
    /// the same way `build_default_filters` always appends it.
    fn run(node: Node) -> Node {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(ClassFilter::default()), Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    fn def(name: &str, body: Node) -> Node {
        Node::make(Tag::Def, vec![Value::Sym(name.to_string()), Value::List(vec![]), Value::Node(body)])
    }

    #[test]
    fn initialize_is_retagged_constructor() {
        let body = Node::of(Tag::Begin, [def("initialize", Node::send(None, "noop", vec![]))]);
        let class = Node::make(Tag::Class, vec![Value::Sym("Widget".into()), Value::Nil, Value::Node(body)]);
        let out = run(class);
        let new_body = out.node_at(2).unwrap();
        let ctor = new_body.node_at(0).unwrap();
        assert_eq!(ctor.kind, Tag::Defm);
        assert_eq!(ctor.name_at(0), Some("constructor"));
    }

    #[test]
    fn ivar_access_uses_private_field_on_es2022() {
        let body = Node::of(
            Tag::Begin,
            [def("name", Node::make(Tag::Ivar, vec![Value::Sym("name".into())]))],
        );
        let class = Node::make(Tag::Class, vec![Value::Sym("Widget".into()), Value::Nil, Value::Node(body)]);
        let opts = Options { eslevel: crate::compiler::filters::EsLevel::Es2022, ..Options::default() };
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(ClassFilter::default()), Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, opts);
        let out = kernel.process(class);
        let method_body = out.node_at(2).unwrap().node_at(0).unwrap().node_at(2).unwrap();
        assert_eq!(method_body.kind, Tag::Attr);
        assert_eq!(method_body.name_at(1), Some("#name"));
    }

    #[test]
    fn attr_accessor_expands_to_prop_nodes() {
        let decl = Node::send(None, "attr_accessor", vec![Node::sym_lit("a"), Node::sym_lit("b")]);
        let body = Node::of(Tag::Begin, [decl]);
        let class = Node::make(Tag::Class, vec![Value::Sym("Widget".into()), Value::Nil, Value::Node(body)]);
        let out = run(class);
        let new_body = out.node_at(2).unwrap();
        assert_eq!(new_body.node_at(0).unwrap().kind, Tag::Begin);
    }

    #[test]
    fn include_is_lifted_out_of_the_body() {
        let decl = Node::send(None, "include", vec![Node::make(Tag::Const, vec![Value::Sym("Comparable".into())])]);
        let noop = Node::send(None, "noop", vec![]);
        let body = Node::of(Tag::Begin, [decl, noop]);
        let class = Node::make(Tag::Class, vec![Value::Sym("Widget".into()), Value::Nil, Value::Node(body)]);
        let out = run(class);
        let new_body = out.node_at(2).unwrap();
        assert_eq!(new_body.children.len(), 1);
        assert_eq!(out.children.len(), 5);
    }

    #[test]
    fn class_name_is_visible_to_the_enclosing_scope() {
        let body = Node::of(Tag::Begin, [def("initialize", Node::send(None, "noop", vec![]))]);
        let class = Node::make(Tag::Class, vec![Value::Sym("Widget".into()), Value::Nil, Value::Node(body)]);
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(ClassFilter::default()), Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(class);
        assert_eq!(kernel.namespace.top_level_names(), vec!["Widget".to_string()]);
    }

    #[test]
    fn module_name_is_visible_to_the_enclosing_scope() {
        let body = Node::of(Tag::Begin, [def("helper", Node::send(None, "noop", vec![]))]);
        let module = Node::make(Tag::Module, vec![Value::Sym("Helpers".into()), Value::Node(body)]);
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(ClassFilter::default()), Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(module);
        assert_eq!(kernel.namespace.top_level_names(), vec!["Helpers".to_string()]);
    }
}
