//! Local-variable declaration tracking: a bare SRC assignment (`x = 1`)
//! carries no declaration keyword of its own, but the first assignment
//! to a name in a scope needs `let` in the emitted target, while every
//! later assignment to the same name is a plain `name = value`. Tracked
//! via `Namespace` the same way `classes.rs` tracks `attr_accessor`
//! bindings, just at the top-level/function scope instead of a class
//! frame.

use crate::compiler::ast::{Node, Tag};
use crate::compiler::namespace::BindingKind;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct DeclarationFilter;

impl Filter for DeclarationFilter {
    fn name(&self) -> &'static str {
        "declarations"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind != Tag::Lvasgn {
            return None;
        }
        let name = node.name_at(0)?.to_string();
        if kernel.namespace.lookup(&name).is_some() {
            // Already bound: a plain reassignment, left as `Lvasgn` for
            // the emitter's existing `name = value` printing.
            return None;
        }
        kernel.namespace.define(name.clone(), BindingKind::Local);
        let value = node.node_at(1)?.clone();
        Some(DispatchOutcome::Recurse(Node::var_decl(name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::Value;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    fn run(nodes: Vec<Node>) -> Vec<Node> {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(DeclarationFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process_all(nodes)
    }

    #[test]
    fn first_assignment_becomes_a_var_decl() {
        let out = run(vec![Node::make(Tag::Lvasgn, vec![Value::Sym("h".into()), Value::Node(Node::int_lit(1))])]);
        assert_eq!(out[0].kind, Tag::VarDecl);
    }

    #[test]
    fn second_assignment_to_the_same_name_stays_plain() {
        let out = run(vec![
            Node::make(Tag::Lvasgn, vec![Value::Sym("h".into()), Value::Node(Node::int_lit(1))]),
            Node::make(Tag::Lvasgn, vec![Value::Sym("h".into()), Value::Node(Node::int_lit(2))]),
        ]);
        assert_eq!(out[0].kind, Tag::VarDecl);
        assert_eq!(out[1].kind, Tag::Lvasgn);
    }
}
