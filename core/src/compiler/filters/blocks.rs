//! Block-rewriting patterns (§4.4.1 continued): `times`, `upto`/
//! `downto`, `step`, `loop`, and the generic loop/iteration forms
//! (`while`, `until`, `for`) that aren't already claimed by
//! `collections.rs`'s functional-combinator rewrites. The implicit-
//! block-parameter convention (`it`) used when a single-value
//! combinator's block has no explicit `|params|` list is handled in
//! `collections.rs` itself, alongside the arrow-synthesis it names its
//! parameter on.

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::filters::collections::synth_arrow;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

/// Reads a block node's parameter-name list (child slot 1, a `List` of
/// `Sym`/`Str` values). Missing or non-list slots yield no params,
/// which the implicit-`it` handling in [`BlockFilter`] then fills in.
pub fn block_params(node: &Node) -> Vec<String> {
    match node.children.get(1) {
        Some(Value::List(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Sym(s) | Value::Str(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `n.times { |i| body }` → `for (let i = 0; i < n; i++) body`, emitted
/// here as a `ForOf`-shaped node over a generated range so the emitter's
/// existing C-style-for printing path (added for `upto`/`downto`/`step`)
/// covers it too. When there is no loop variable the counter is still
/// synthesized so the emitted loop has a condition to check.
pub fn rewrite_times(_node: &Node, recv: Node, params: &[String], body: Node) -> Option<DispatchOutcome> {
    let var = params.first().cloned().unwrap_or_else(|| "__i".to_string());
    let loop_node = c_style_for(&var, Node::int_lit(0), "<", recv, Node::int_lit(1), body);
    Some(DispatchOutcome::Recurse(loop_node))
}

/// `lo.upto(hi) { |i| body }` / `hi.downto(lo) { |i| body }`.
pub fn rewrite_updown(
    _node: &Node,
    name: &str,
    recv: Node,
    mut call_args: Vec<Node>,
    params: &[String],
    body: Node,
) -> Option<DispatchOutcome> {
    if call_args.is_empty() {
        return None;
    }
    let bound = call_args.remove(0);
    let var = params.first().cloned().unwrap_or_else(|| "__i".to_string());
    let loop_node = if name == "upto" {
        c_style_for(&var, recv, "<=", bound, Node::int_lit(1), body)
    } else {
        c_style_for(&var, recv, ">=", bound, Node::int_lit(-1), body)
    };
    Some(DispatchOutcome::Recurse(loop_node))
}

/// `lo.step(hi, by) { |i| body }`.
pub fn rewrite_step(
    _node: &Node,
    recv: Node,
    mut call_args: Vec<Node>,
    params: &[String],
    body: Node,
) -> Option<DispatchOutcome> {
    if call_args.len() < 2 {
        return None;
    }
    let by = call_args.remove(1);
    let bound = call_args.remove(0);
    let var = params.first().cloned().unwrap_or_else(|| "__i".to_string());
    let loop_node = c_style_for(&var, recv, "<=", bound, by, body);
    Some(DispatchOutcome::Recurse(loop_node))
}

/// `loop { body }` → `while (true) { body }`. `break`/`next` pass
/// through the emitter unchanged (they already share the target's
/// vocabulary).
pub fn rewrite_loop(_node: &Node, body: Node) -> Option<DispatchOutcome> {
    Some(DispatchOutcome::Recurse(Node::of(Tag::While, [Node::leaf(Tag::True), body])))
}

/// Builds the synthetic `for (let var = init; var OP bound; var += step)
/// body` node. Shape: `ForOf`-adjacent but distinct tag (`Tag::For`) with
/// children `[var(Sym), init, op(Str), bound, step, body]`, a shape the
/// emitter's C-style-for printer matches explicitly.
pub(crate) fn c_style_for(var: &str, init: Node, op: &str, bound: Node, step: Node, body: Node) -> Node {
    Node::make(
        Tag::For,
        vec![
            Value::Sym(var.to_string()),
            Value::Node(init),
            Value::Str(op.to_string()),
            Value::Node(bound),
            Value::Node(step),
            Value::Node(body),
        ],
    )
}

/// Handles block-shaped nodes `collections.rs` didn't claim: hash
/// destructuring (`|k, v|` against a plain-object receiver, rewritten to
/// `Object.entries`), and the implicit-parameter convention where a
/// block with no declared params refers to its sole argument as `it`.
pub struct BlockFilter;

impl Filter for BlockFilter {
    fn name(&self) -> &'static str {
        "blocks"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind != Tag::Block {
            return None;
        }
        let call = node.node_at(0)?;
        if call.kind != Tag::Send && call.kind != Tag::Csend {
            return None;
        }
        let name = call.method_name()?;
        if name != "each_pair" {
            return None;
        }
        if kernel.options.excluded(name) {
            return None;
        }
        let recv = call.receiver()?.clone();
        let params = block_params(node);
        if params.len() != 2 {
            return None;
        }
        let body = node.node_at(2)?.clone();
        let entries = Node::call(Node::attr(Node::lvar("Object"), "entries"), vec![recv]);
        // The emitter prints each synthesized-arrow param verbatim, so a
        // single param already spelled as an array pattern prints as
        // `([k, v]) => ...` without any further emitter-side knowledge
        // of destructuring.
        let destructured = format!("[{}, {}]", params[0], params[1]);
        let arrow = synth_arrow(&[destructured], body);
        Some(DispatchOutcome::Recurse(Node::call(Node::attr(entries, "forEach"), vec![arrow])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    fn run(node: Node) -> Node {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(BlockFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    fn block(call: Node, params: &[&str], body: Node) -> Node {
        Node::make(
            Tag::Block,
            vec![
                Value::Node(call),
                Value::List(params.iter().map(|p| Value::Sym(p.to_string())).collect()),
                Value::Node(body),
            ],
        )
    }

    #[test]
    fn times_becomes_c_style_for() {
        let node = rewrite_times(
            &Node::nil(),
            Node::int_lit(3),
            &["i".to_string()],
            Node::send(None, "noop", vec![]),
        )
        .unwrap();
        match node {
            DispatchOutcome::Recurse(n) => assert_eq!(n.kind, Tag::For),
            _ => panic!("expected Recurse"),
        }
    }

    #[test]
    fn each_pair_over_hash_becomes_object_entries_foreach() {
        let call = Node::send(Some(Node::lvar("h")), "each_pair", vec![]);
        let body = Node::send(None, "noop", vec![Node::lvar("k"), Node::lvar("v")]);
        let node = block(call, &["k", "v"], body);
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
    }

    #[test]
    fn loop_becomes_while_true() {
        let out = rewrite_loop(&Node::nil(), Node::send(None, "noop", vec![])).unwrap();
        match out {
            DispatchOutcome::Recurse(n) => {
                assert_eq!(n.kind, Tag::While);
                assert_eq!(n.node_at(0).unwrap().kind, Tag::True);
            }
            _ => panic!("expected Recurse"),
        }
    }
}
