//! Indexing and slicing lowering (§4.4.1 "slicing/indexing"): negative
//! indices (`a[-1]`), range indexing (`a[1..3]`, `a[1...3]`), and
//! `[start, length]` two-argument slicing all need an explicit
//! translation since JS bracket indexing has none of these built in.

use crate::compiler::ast::{Node, Tag};
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct SlicingFilter;

impl Filter for SlicingFilter {
    fn name(&self) -> &'static str {
        "slicing"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind != Tag::Index {
            return None;
        }
        let recv = node.node_at(0)?.clone();
        let idx = node.node_at(1)?.clone();

        let out = match idx.kind {
            Tag::Irange => {
                let lo = idx.node_at(0).cloned().unwrap_or_else(|| Node::int_lit(0));
                let hi = idx.node_at(1).cloned();
                match hi {
                    Some(hi) => Node::call(Node::attr(recv, "slice"), vec![lo, Node::bin_op("+", hi, Node::int_lit(1))]),
                    None => Node::call(Node::attr(recv, "slice"), vec![lo]),
                }
            }
            Tag::Erange => {
                let lo = idx.node_at(0).cloned().unwrap_or_else(|| Node::int_lit(0));
                match idx.node_at(1) {
                    Some(hi) => Node::call(Node::attr(recv, "slice"), vec![lo, hi.clone()]),
                    None => Node::call(Node::attr(recv, "slice"), vec![lo]),
                }
            }
            Tag::Int if is_negative_literal(&idx) => {
                if kernel.options.es2022() {
                    Node::call(Node::attr(recv, "at"), vec![idx])
                } else {
                    Node::index(recv.clone(), Node::bin_op("+", Node::attr(recv, "length"), idx))
                }
            }
            _ => return None,
        };
        Some(DispatchOutcome::Recurse(out))
    }
}

fn is_negative_literal(node: &Node) -> bool {
    matches!(node.children.first(), Some(crate::compiler::ast::Value::Int(n)) if *n < 0)
}

/// Two-argument `a[start, length]` slicing arrives as a `Send`-shaped
/// `[]` call rather than an `Index` node (the parser adapter only
/// folds single-argument bracket access into `Index`); handled here too
/// since it shares this filter's subject matter.
pub fn rewrite_two_arg_slice(recv: Node, start: Node, length: Node) -> Node {
    Node::call(Node::attr(recv, "slice"), vec![start.clone(), Node::bin_op("+", start, length)])
}
