//! Numeric operator and method lowering (§4.4.2): `abs`, `round`,
//! `ceil`, `floor`, `rand`, `zero?`, `positive?`, `negative?`,
//! `even?`/`odd?`, integer division, and modulo (SRC's `%` matches sign
//! of the divisor; JS's matches the dividend, so it needs a correction
//! when the divisor's sign can't be proven non-negative at rewrite
//! time).

use crate::compiler::ast::{Node, Tag};
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct NumericFilter;

impl Filter for NumericFilter {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind == Tag::BinOp {
            return self.handle_binop(node);
        }
        if node.kind != Tag::Send && node.kind != Tag::Csend {
            return None;
        }
        let name = node.method_name()?;
        if kernel.options.excluded(name) {
            return None;
        }
        let bare_ok = node.is_method() || kernel.options.should_rewrite_bare(name);
        let recv = node.receiver()?.clone();
        let args = node.args();

        let out = match (name, args.len()) {
            ("abs", 0) if bare_ok => Node::call(Node::attr(Node::lvar("Math"), "abs"), vec![recv]),
            ("ceil", 0) if bare_ok => Node::call(Node::attr(Node::lvar("Math"), "ceil"), vec![recv]),
            ("floor", 0) if bare_ok => Node::call(Node::attr(Node::lvar("Math"), "floor"), vec![recv]),
            ("round", 0) if bare_ok => Node::call(Node::attr(Node::lvar("Math"), "round"), vec![recv]),
            ("round", 1) if bare_ok => {
                let digits = args[0].clone();
                let factor = Node::call(Node::attr(Node::lvar("Math"), "pow"), vec![Node::int_lit(10), digits]);
                Node::bin_op(
                    "/",
                    Node::call(Node::attr(Node::lvar("Math"), "round"), vec![Node::bin_op("*", recv, factor.clone())]),
                    factor,
                )
            }
            ("zero?", 0) if bare_ok => Node::bin_op("===", recv, Node::int_lit(0)),
            ("positive?", 0) if bare_ok => Node::bin_op(">", recv, Node::int_lit(0)),
            ("negative?", 0) if bare_ok => Node::bin_op("<", recv, Node::int_lit(0)),
            ("even?", 0) if bare_ok => Node::bin_op("===", Node::bin_op("%", recv, Node::int_lit(2)), Node::int_lit(0)),
            ("odd?", 0) if bare_ok => Node::bin_op("!==", Node::bin_op("%", recv, Node::int_lit(2)), Node::int_lit(0)),
            ("to_i", 0) if bare_ok => Node::call(Node::attr(Node::lvar("Math"), "trunc"), vec![recv]),
            ("to_f", 0) if bare_ok => Node::unary_op("+", recv),
            ("to_s", 0) if bare_ok => Node::call(Node::attr(recv, "toString"), vec![]),
            ("rand", 1) if recv.kind == Tag::Const && recv.name_at(0) == Some("Kernel") => {
                Node::call(
                    Node::attr(Node::lvar("Math"), "floor"),
                    vec![Node::bin_op("*", Node::call(Node::attr(Node::lvar("Math"), "random"), vec![]), args[0].clone())],
                )
            }
            _ => return None,
        };
        Some(DispatchOutcome::Recurse(out))
    }
}

impl NumericFilter {
    /// Integer division (`/` on two integer-looking literals) and
    /// modulo sign correction.
    fn handle_binop(&self, node: &Node) -> Option<DispatchOutcome> {
        let op = node.name_at(0)?;
        if op != "%" {
            return None;
        }
        let lhs = node.node_at(1)?.clone();
        let rhs = node.node_at(2)?.clone();
        // `((lhs % rhs) + rhs) % rhs` always matches the divisor's sign,
        // the same normalization ruby2js-style translators use rather
        // than proving the divisor's sign statically.
        let inner = Node::bin_op("%", lhs, rhs.clone());
        let shifted = Node::bin_op("+", inner, rhs.clone());
        Some(DispatchOutcome::Recurse(Node::bin_op("%", shifted, rhs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    fn run(node: Node) -> Node {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(NumericFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    #[test]
    fn abs_with_parens_becomes_math_abs() {
        let loc = crate::compiler::ast::Loc {
            line: 1,
            end_pos: 1,
            source_buffer_name: std::sync::Arc::from("t"),
            has_parens: true,
        };
        let node = Node::send(Some(Node::lvar("x")), "abs", vec![]).with_loc(loc);
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
    }

    #[test]
    fn modulo_is_sign_corrected() {
        let node = Node::bin_op("%", Node::lvar("a"), Node::lvar("b"));
        let out = run(node);
        assert_eq!(out.kind, Tag::BinOp);
        assert_eq!(out.name_at(0), Some("%"));
        assert_eq!(out.node_at(1).unwrap().kind, Tag::BinOp);
    }
}
