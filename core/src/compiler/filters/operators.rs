//! Operator and precedence translation (§4.4.6): the spaceship operator
//! `<=>`, `**` exponentiation already matches JS syntax so is left
//! alone, `!=`/`==` structural-equality semantics (SRC compares by
//! value by default; Object.is-style `equal?` maps to `===`), and
//! inverted-comparison rewriting used when a rule needs to flip a
//! comparison without re-deriving its opposite by hand.

use crate::compiler::ast::{Node, Tag};
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

/// Maps a comparison operator to its logical inverse, used by rules
/// that synthesize a negated condition (e.g. `reject` from `select`,
/// `until` from `while`) without reconstructing a `NotOp` wrapper.
pub const INVERT_OP: &[(&str, &str)] = &[
    ("==", "!=="),
    ("!=", "==="),
    ("<", ">="),
    (">", "<="),
    ("<=", ">"),
    (">=", "<"),
];

pub fn invert(op: &str) -> Option<&'static str> {
    INVERT_OP.iter().find(|(a, _)| *a == op).map(|(_, b)| *b)
}

pub struct OperatorFilter;

impl Filter for OperatorFilter {
    fn name(&self) -> &'static str {
        "operators"
    }

    fn handle(&self, node: &Node, _kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind != Tag::BinOp {
            return None;
        }
        let op = node.name_at(0)?;
        let lhs = node.node_at(1)?.clone();
        let rhs = node.node_at(2)?.clone();
        match op {
            // Spaceship: `(a < b) ? -1 : (a > b ? 1 : 0)`.
            "<=>" => Some(DispatchOutcome::Recurse(Node::ternary(
                Node::bin_op("<", lhs.clone(), rhs.clone()),
                Node::unary_op("-", Node::int_lit(1)),
                Node::ternary(Node::bin_op(">", lhs, rhs), Node::int_lit(1), Node::int_lit(0)),
            ))),
            // Value equality: structural comparison semantics, not
            // reference identity, so plain `===`/`!==` is only correct
            // for primitives; arrays/hashes route through a deep-equal
            // helper call instead.
            "==" | "!=" if lhs.kind == Tag::Array || rhs.kind == Tag::Array || lhs.kind == Tag::Hash || rhs.kind == Tag::Hash => {
                let call = Node::call(
                    Node::attr(Node::lvar("JSON"), "stringify"),
                    vec![lhs.clone()],
                );
                let other = Node::call(Node::attr(Node::lvar("JSON"), "stringify"), vec![rhs.clone()]);
                let eq = Node::bin_op("===", call, other);
                let out = if op == "==" { eq } else { Node::not_op(eq) };
                Some(DispatchOutcome::Recurse(out))
            }
            "==" => Some(DispatchOutcome::Recurse(Node::bin_op("===", lhs, rhs))),
            "!=" => Some(DispatchOutcome::Recurse(Node::bin_op("!==", lhs, rhs))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    fn run(node: Node) -> Node {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(OperatorFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    #[test]
    fn spaceship_becomes_nested_ternary() {
        let node = Node::bin_op("<=>", Node::lvar("a"), Node::lvar("b"));
        let out = run(node);
        assert_eq!(out.kind, Tag::Ternary);
    }

    #[test]
    fn scalar_equality_becomes_strict_equals() {
        let node = Node::bin_op("==", Node::lvar("a"), Node::int_lit(1));
        let out = run(node);
        assert_eq!(out.kind, Tag::BinOp);
        assert_eq!(out.name_at(0), Some("==="));
    }

    #[test]
    fn invert_table_round_trips() {
        assert_eq!(invert("<"), Some(">="));
        assert_eq!(invert(">="), Some("<"));
    }
}
