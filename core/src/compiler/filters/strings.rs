//! String method lowering (§4.4.3): case conversion, `strip`/`chomp`,
//! `split`/`chars`, interpolation is already a parser-level concern
//! (`Dstr` nodes pass straight through to the emitter's template-literal
//! printer), `%` formatting, `*` repetition, `sub`/`gsub`, `start_with?`
//! / `end_with?`, `to_i`/`to_f` parsing.

use crate::compiler::ast::{Node, Tag};
use crate::compiler::polyfill::PolyfillId;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct StringFilter;

impl Filter for StringFilter {
    fn name(&self) -> &'static str {
        "strings"
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
        if !bare_ok {
            return None;
        }
        let recv = node.receiver()?.clone();
        let args = node.args();

        let out = match (name, args.len()) {
            ("upcase", 0) => Node::call(Node::attr(recv, "toUpperCase"), vec![]),
            ("downcase", 0) => Node::call(Node::attr(recv, "toLowerCase"), vec![]),
            ("capitalize", 0) => Node::bin_op(
                "+",
                Node::call(Node::attr(Node::index(recv.clone(), Node::int_lit(0)), "toUpperCase"), vec![]),
                Node::call(Node::attr(Node::call(Node::attr(recv, "slice"), vec![Node::int_lit(1)]), "toLowerCase"), vec![]),
            ),
            ("strip", 0) => Node::call(Node::attr(recv, "trim"), vec![]),
            ("lstrip", 0) => Node::call(Node::attr(recv, "trimStart"), vec![]),
            ("rstrip", 0) => Node::call(Node::attr(recv, "trimEnd"), vec![]),
            ("chomp", 0) => {
                kernel.polyfills.require(PolyfillId::StringChomp);
                Node::call(Node::lvar(PolyfillId::StringChomp.global_name()), vec![recv])
            }
            ("chars", 0) => Node::call(Node::attr(Node::lvar("Array"), "from"), vec![recv]),
            ("split", 0) => Node::call(
                Node::attr(recv, "split"),
                vec![Node::make(Tag::Regexp, vec![crate::compiler::ast::Value::Str(r"\s+".to_string())])],
            ),
            ("split", 1) => Node::call(Node::attr(recv, "split"), args),
            ("start_with?", 1) => Node::call(Node::attr(recv, "startsWith"), args),
            ("end_with?", 1) => Node::call(Node::attr(recv, "endsWith"), args),
            ("include?", 1) => Node::call(Node::attr(recv, "includes"), args),
            ("to_i", 0) => Node::call(Node::lvar("parseInt"), vec![recv, Node::int_lit(10)]),
            ("to_f", 0) => Node::call(Node::lvar("parseFloat"), vec![recv]),
            ("sub", 2) => Node::call(Node::attr(recv, "replace"), args),
            ("gsub", 2) => Node::call(Node::attr(recv, "replaceAll"), args),
            ("empty?", 0) => Node::bin_op("===", Node::attr(recv, "length"), Node::int_lit(0)),
            ("count", 1) => {
                kernel.polyfills.require(PolyfillId::StringCount);
                Node::call(Node::lvar(PolyfillId::StringCount.global_name()), vec![recv, args.into_iter().next()?])
            }
            ("reverse", 0) => Node::call(
                Node::attr(Node::call(Node::attr(Node::call(Node::attr(Node::lvar("Array"), "from"), vec![recv]), "reverse"), vec![]), "join"),
                vec![Node::str_lit("")],
            ),
            _ => return None,
        };
        Some(DispatchOutcome::Recurse(out))
    }
}

impl StringFilter {
    /// `str * n` repetition (only rewritten when the left side is
    /// syntactically a string-shaped literal or interpolation, since
    /// numeric `*` is already valid JS).
    fn handle_binop(&self, node: &Node) -> Option<DispatchOutcome> {
        let op = node.name_at(0)?;
        if op != "*" {
            return None;
        }
        let lhs = node.node_at(1)?.clone();
        if !matches!(lhs.kind, Tag::Str | Tag::Dstr) {
            return None;
        }
        let rhs = node.node_at(2)?.clone();
        Some(DispatchOutcome::Recurse(Node::call(Node::attr(lhs, "repeat"), vec![rhs])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    fn loc() -> crate::compiler::ast::Loc {
        crate::compiler::ast::Loc { line: 1, end_pos: 1, source_buffer_name: std::sync::Arc::from("t"), has_parens: true }
    }

    fn run(node: Node) -> Node {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(StringFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    #[test]
    fn upcase_becomes_to_upper_case() {
        let node = Node::send(Some(Node::lvar("s")), "upcase", vec![]).with_loc(loc());
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
    }

    #[test]
    fn string_repeat_maps_to_repeat_method() {
        let node = Node::bin_op("*", Node::str_lit("ab"), Node::int_lit(3));
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
    }

    #[test]
    fn start_with_maps_directly() {
        let node = Node::send(Some(Node::lvar("s")), "start_with?", vec![Node::str_lit("x")]).with_loc(loc());
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
        assert_eq!(out.node_at(0).unwrap().name_at(1), Some("startsWith"));
    }
}
