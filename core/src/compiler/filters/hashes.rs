//! Hash/object method lowering (§4.4.1 "hash ops"): `keys`, `values`,
//! `key?`/`has_key?`, `merge`, `delete`, `each_key`/`each_value`,
//! `to_a`, `dig`. Hash *literals* are handled at the AST level (a
//! `Hash` node of `Pair`s prints straight through as an object
//! literal); this filter only lowers the method-call surface.

use crate::compiler::ast::{Node, Tag};
use crate::compiler::polyfill::PolyfillId;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct HashFilter;

impl Filter for HashFilter {
    fn name(&self) -> &'static str {
        "hashes"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind != Tag::Send && node.kind != Tag::Csend {
            return None;
        }
        let name = node.method_name()?;
        if kernel.options.excluded(name) {
            return None;
        }
        let forced_hash = node
            .location
            .as_ref()
            .and_then(|l| kernel.pragmas.forced_type_at(l))
            .map(|t| t == "hash")
            .unwrap_or(false);
        let bare_ok = forced_hash || node.is_method() || kernel.options.should_rewrite_bare(name);
        if !bare_ok {
            return None;
        }
        let recv = node.receiver()?.clone();
        let args = node.args();

        let out = match (name, args.len()) {
            ("keys", 0) => Node::call(Node::attr(Node::lvar("Object"), "keys"), vec![recv]),
            ("values", 0) => Node::call(Node::attr(Node::lvar("Object"), "values"), vec![recv]),
            ("to_a", 0) => Node::call(Node::attr(Node::lvar("Object"), "entries"), vec![recv]),
            ("key?", 1) | ("has_key?", 1) | ("include?", 1) => {
                Node::call(Node::attr(Node::lvar("Object"), "hasOwn"), vec![recv, args.into_iter().next()?])
            }
            ("merge", _) => {
                let mut assign_args = vec![Node::array(vec![]), recv];
                assign_args.extend(args);
                Node::call(Node::attr(Node::lvar("Object"), "assign"), assign_args)
            }
            ("delete", 1) => {
                kernel.polyfills.require(PolyfillId::HashDelete);
                let key = args.into_iter().next()?;
                Node::call(Node::lvar(PolyfillId::HashDelete.global_name()), vec![recv, key])
            }
            ("each_key", 0) => Node::call(Node::attr(Node::call(Node::attr(Node::lvar("Object"), "keys"), vec![recv]), "forEach"), vec![]),
            ("each_value", 0) => Node::call(Node::attr(Node::call(Node::attr(Node::lvar("Object"), "values"), vec![recv]), "forEach"), vec![]),
            ("dig", n) if n >= 1 => {
                let mut chain = recv;
                for key in args {
                    chain = Node::index(chain, key);
                }
                chain
            }
            ("empty?", 0) => Node::bin_op(
                "===",
                Node::attr(Node::call(Node::attr(Node::lvar("Object"), "keys"), vec![recv]), "length"),
                Node::int_lit(0),
            ),
            _ => return None,
        };
        Some(DispatchOutcome::Recurse(out))
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
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(HashFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    #[test]
    fn keys_becomes_object_keys() {
        let node = Node::send(Some(Node::lvar("h")), "keys", vec![]).with_loc(loc());
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
        assert_eq!(out.node_at(0).unwrap().name_at(1), Some("keys"));
    }

    #[test]
    fn dig_chains_into_nested_index() {
        let node = Node::send(Some(Node::lvar("h")), "dig", vec![Node::sym_lit("a"), Node::sym_lit("b")]).with_loc(loc());
        let out = run(node);
        assert_eq!(out.kind, Tag::Index);
    }
}
