//! Collection predicates and collection ops (§4.4.1): `empty?`,
//! `any?`/`all?`/`none?`, `include?`, `each`, `map`/`select`/`reject`/
//! `find`, `reduce`/`inject`, `flat_map`, `group_by`, `sort_by`,
//! `max_by`/`min_by`, `compact`, `flatten`, `first`, `last`, `chars`,
//! `sum`.

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::filters::blocks::{self, block_params};
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

/// A bare `.method` access (no parens, no block) is only rewritten when
/// explicit parens were used, the method is in `include`/`include_all`,
/// or the node carries its own block (a block always disambiguates a
/// call from a getter). Mirrors §4.4.1 "Disambiguation edge cases".
fn may_rewrite(node: &Node, kernel: &Kernel, name: &str, has_block: bool) -> bool {
    if kernel.options.excluded(name) {
        return false;
    }
    has_block || node.is_method() || kernel.options.should_rewrite_bare(name)
}

pub struct CollectionFilter;

impl Filter for CollectionFilter {
    fn name(&self) -> &'static str {
        "collections"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind == Tag::Block {
            // Block-shaped rewrites (each/map/etc with a literal block)
            // are handled by `blocks.rs` for the loop-rewriting patterns
            // and here for the functional-combinator ones; try the
            // combinator rewrite first, otherwise fall through.
            return self.handle_block_combinator(node, kernel);
        }
        if node.kind != Tag::Send && node.kind != Tag::Csend {
            return None;
        }
        let name = node.method_name()?;
        if node.receiver().is_none() {
            // Bare Kernel-style output calls (no receiver to dispatch
            // on, so the generic receiver-bound table below doesn't
            // apply): `puts`/`print`/`p` all reduce to one console sink.
            if kernel.options.excluded(name) {
                return None;
            }
            return match name {
                "puts" | "print" | "p" => Some(DispatchOutcome::Recurse(Node::call(Node::attr(Node::lvar("console"), "log"), node.args()))),
                _ => None,
            };
        }
        if !may_rewrite(node, kernel, name, false) {
            return None;
        }
        let recv = node.receiver()?.clone();
        let args = node.args();

        let rewritten = match (name, args.len()) {
            ("empty?", 0) => Some(Node::bin_op("===", Node::attr(recv, "length"), Node::int_lit(0))),
            ("any?", 0) => Some(Node::call(Node::attr(recv, "some"), vec![Node::lvar("Boolean")])),
            ("all?", 0) => Some(Node::call(Node::attr(recv, "every"), vec![Node::lvar("Boolean")])),
            ("none?", 0) => Some(Node::not_op(Node::call(Node::attr(recv, "some"), vec![Node::lvar("Boolean")]))),
            ("compact", 0) => Some(Node::call(Node::attr(recv, "filter"), vec![compact_predicate()])),
            ("flatten", 0) => Some(Node::call(Node::attr(recv, "flat"), vec![Node::lvar("Infinity")])),
            ("flatten", 1) => Some(Node::call(Node::attr(recv, "flat"), args)),
            ("first", 0) => Some(Node::index(recv, Node::int_lit(0))),
            ("first", 1) => Some(Node::call(Node::attr(recv, "slice"), vec![Node::int_lit(0), args[0].clone()])),
            ("last", 0) => {
                if kernel.options.es2022() {
                    Some(Node::call(Node::attr(recv, "at"), vec![Node::int_lit(-1)]))
                } else {
                    Some(Node::index(recv.clone(), Node::bin_op("-", Node::attr(recv, "length"), Node::int_lit(1))))
                }
            }
            ("chars", 0) => Some(Node::call(Node::attr(Node::lvar("Array"), "from"), vec![recv])),
            ("sum", 0) => Some(Node::call(
                Node::attr(recv, "reduce"),
                vec![
                    synth_arrow(&["acc".to_string(), "x".to_string()], Node::bin_op("+", Node::lvar("acc"), Node::lvar("x"))),
                    Node::int_lit(0),
                ],
            )),
            ("each", 0) => Some(Node::call(Node::attr(recv, "forEach"), vec![])),
            ("map", 0) => Some(Node::call(Node::attr(recv, "map"), vec![])),
            ("select", 0) | ("filter", 0) => Some(Node::call(Node::attr(recv, "filter"), vec![])),
            ("reject", 0) => Some(Node::call(Node::attr(recv, "filter"), vec![])), // negation applied by block rewrite
            ("find", 0) | ("detect", 0) => Some(Node::call(Node::attr(recv, "find"), vec![])),
            ("flat_map", 0) => Some(Node::call(Node::attr(recv, "flatMap"), vec![])),
            ("include?", 1) => Some(rewrite_include(kernel, node, recv, args[0].clone())),
            ("max_by", 0) => Some(Node::call(Node::attr(recv, "reduce"), vec![])),
            ("min_by", 0) => Some(Node::call(Node::attr(recv, "reduce"), vec![])),
            ("group_by", 0) => {
                if kernel.options.es2024() {
                    Some(Node::call(Node::attr(Node::lvar("Object"), "groupBy"), vec![recv]))
                } else {
                    Some(Node::call(Node::attr(recv, "reduce"), vec![]))
                }
            }
            ("sort_by", 0) => {
                if kernel.options.es2023() {
                    Some(Node::call(Node::attr(recv, "toSorted"), vec![]))
                } else {
                    Some(Node::call(Node::attr(Node::call(Node::attr(recv, "slice"), vec![]), "sort"), vec![]))
                }
            }
            _ => None,
        };
        rewritten.map(|n| DispatchOutcome::Recurse(n))
    }
}

impl CollectionFilter {
    /// `recv.method { |args| body }` → combinator call taking a
    /// synthesized arrow. The block's call child carries the method
    /// name; body/params come from the block itself.
    fn handle_block_combinator(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        let call = node.node_at(0)?;
        if call.kind != Tag::Send && call.kind != Tag::Csend {
            return None;
        }
        let name = call.method_name()?;
        if !may_rewrite(call, kernel, name, true) {
            return None;
        }
        let recv = call.receiver()?.clone();
        let params = block_params(node);
        let body = node.node_at(2)?.clone();
        // A block with no explicit `|params|` list yielding exactly one
        // value refers to it via the newest source dialect's implicit
        // `it` convention; name the synthesized arrow's sole parameter
        // to match rather than emitting a zero-arg arrow `it` inside the
        // body would otherwise resolve to nothing.
        let implicit_params = if params.is_empty() { vec!["it".to_string()] } else { params.clone() };
        let arrow = |body: Node| synth_arrow(&implicit_params, body);

        let out = match name {
            "each" if params.len() == 2 => {
                let entries = Node::call(Node::attr(Node::lvar("Object"), "entries"), vec![recv]);
                let destructured = format!("[{}, {}]", params[0], params[1]);
                Node::call(Node::attr(entries, "forEach"), vec![synth_arrow(&[destructured], body)])
            }
            // A range literal has no runtime `.forEach` to call into —
            // it needs a counted loop, not a combinator call, and
            // `Erange`'s upper bound is exclusive where `Irange`'s is
            // inclusive.
            "each" if params.len() == 1 && matches!(recv.kind, Tag::Irange | Tag::Erange) => {
                let op = if recv.kind == Tag::Irange { "<=" } else { "<" };
                let lo = recv.node_at(0).cloned().unwrap_or_else(Node::nil);
                let hi = recv.node_at(1).cloned().unwrap_or_else(Node::nil);
                blocks::c_style_for(&params[0], lo, op, hi, Node::int_lit(1), body)
            }
            "each" => Node::call(Node::attr(recv, "forEach"), vec![arrow(body)]),
            "map" | "collect" => Node::call(Node::attr(recv, "map"), vec![arrow(body)]),
            "select" | "filter" => Node::call(Node::attr(recv, "filter"), vec![arrow(body)]),
            "reject" => Node::call(Node::attr(recv, "filter"), vec![arrow(Node::not_op(body))]),
            "find" | "detect" => Node::call(Node::attr(recv, "find"), vec![arrow(body)]),
            "flat_map" | "collect_concat" => Node::call(Node::attr(recv, "flatMap"), vec![arrow(body)]),
            "any?" => Node::call(Node::attr(recv, "some"), vec![arrow(body)]),
            "all?" => Node::call(Node::attr(recv, "every"), vec![arrow(body)]),
            "none?" => Node::not_op(Node::call(Node::attr(recv, "some"), vec![arrow(body)])),
            "each_with_index" => {
                let mut full_params = params.clone();
                full_params.push("__i".to_string());
                Node::call(Node::attr(recv, "forEach"), vec![synth_arrow(&full_params, body)])
            }
            "sort_by" => {
                let key = params.first().cloned().unwrap_or_else(|| "x".to_string());
                let a = format!("{key}_a");
                let b = format!("{key}_b");
                let cmp = sort_comparator(&a, &b, &body, &key);
                if kernel.options.es2023() {
                    Node::call(Node::attr(recv, "toSorted"), vec![cmp])
                } else {
                    Node::call(Node::attr(Node::call(Node::attr(recv, "slice"), vec![]), "sort"), vec![cmp])
                }
            }
            "max_by" | "min_by" => {
                let op = if name == "max_by" { ">" } else { "<" };
                Node::call(
                    Node::attr(recv, "reduce"),
                    vec![reduce_by_comparator(&params, &body, op)],
                )
            }
            "reduce" | "inject" => {
                let acc_name = params.first().cloned().unwrap_or_else(|| "acc".to_string());
                Node::call(Node::attr(recv, "reduce"), vec![synth_arrow(&params, body), Node::lvar(acc_name)])
            }
            "group_by" => {
                if kernel.options.es2024() {
                    Node::call(Node::attr(Node::lvar("Object"), "groupBy"), vec![recv, arrow(body)])
                } else {
                    Node::call(Node::attr(recv, "reduce"), vec![group_by_reducer(&params, &body)])
                }
            }
            "times" => return super::blocks::rewrite_times(node, recv, &params, body),
            "upto" | "downto" => return super::blocks::rewrite_updown(node, name, recv, call.args(), &params, body),
            "step" => return super::blocks::rewrite_step(node, recv, call.args(), &params, body),
            "loop" => return super::blocks::rewrite_loop(node, body),
            "each_with_object" => {
                let obj = call.args().into_iter().next().unwrap_or_else(Node::nil);
                let mut full_params = params.clone();
                if full_params.len() < 2 {
                    full_params.push("memo".to_string());
                }
                Node::call(Node::attr(recv, "forEach"), vec![synth_arrow(&full_params, body), obj])
            }
            _ => return None,
        };
        Some(DispatchOutcome::Recurse(out))
    }
}

/// `x.include?(y)`: bounded comparison on a range literal, `.has` on a
/// set (pragma-forced), `.includes` on array/string (default), `in` on
/// a hash (pragma-forced).
fn rewrite_include(kernel: &Kernel, node: &Node, recv: Node, needle: Node) -> Node {
    let forced = node.location.as_ref().and_then(|l| kernel.pragmas.forced_type_at(l));
    match (recv.kind, forced) {
        (Tag::Irange, _) => {
            let lo = recv.node_at(0).cloned().unwrap_or_else(Node::nil);
            let hi = recv.node_at(1).cloned().unwrap_or_else(Node::nil);
            Node::and_op(
                Node::bin_op(">=", needle.clone(), lo),
                Node::bin_op("<=", needle, hi),
            )
        }
        (Tag::Erange, _) => {
            let lo = recv.node_at(0).cloned().unwrap_or_else(Node::nil);
            let hi = recv.node_at(1).cloned().unwrap_or_else(Node::nil);
            Node::and_op(
                Node::bin_op(">=", needle.clone(), lo),
                Node::bin_op("<", needle, hi),
            )
        }
        (_, Some("set")) => Node::call(Node::attr(recv, "has"), vec![needle]),
        (_, Some("hash")) => Node::bin_op("in", needle, recv),
        _ => Node::call(Node::attr(recv, "includes"), vec![needle]),
    }
}

fn compact_predicate() -> Node {
    synth_arrow(
        &["x".to_string()],
        Node::and_op(
            Node::bin_op("!==", Node::lvar("x"), Node::nil()),
            Node::bin_op("!==", Node::lvar("x"), Node::lvar("undefined")),
        ),
    )
}

fn sort_comparator(a: &str, b: &str, body: &Node, key_param: &str) -> Node {
    let key_a = substitute_param(body, key_param, a);
    let key_b = substitute_param(body, key_param, b);
    synth_arrow(
        &[a.to_string(), b.to_string()],
        Node::ternary(
            Node::bin_op("<", key_a.clone(), key_b.clone()),
            Node::unary_op("-", Node::int_lit(1)),
            Node::ternary(Node::bin_op(">", key_a, key_b), Node::int_lit(1), Node::int_lit(0)),
        ),
    )
}

fn reduce_by_comparator(params: &[String], body: &Node, op: &str) -> Node {
    let item_param = params.first().cloned().unwrap_or_else(|| "x".to_string());
    let acc = "acc".to_string();
    let acc_key = substitute_param(body, &item_param, &acc);
    synth_arrow(
        &[acc.clone(), item_param.clone()],
        Node::ternary(
            Node::bin_op(op, body.clone(), acc_key),
            Node::lvar(item_param),
            Node::lvar(acc),
        ),
    )
}

fn group_by_reducer(params: &[String], body: &Node) -> Node {
    let item_param = params.first().cloned().unwrap_or_else(|| "x".to_string());
    let acc = "acc".to_string();
    synth_arrow(
        &[acc.clone(), item_param.clone()],
        Node::call(
            Node::attr(Node::lvar(acc.clone()), "__group_push"),
            vec![body.clone(), Node::lvar(item_param)],
        ),
    )
}

/// Crude source-level substitution used by the `sort_by`/`max_by`
/// synthesized comparators: a fresh arrow needs the key expression
/// evaluated against each of the two compared bindings, so the body is
/// cloned once per binding with the loop parameter's `Lvar` occurrences
/// renamed. Structural, not textual — walks the tree directly.
fn substitute_param(node: &Node, from: &str, to: &str) -> Node {
    if node.kind == Tag::Lvar && node.name_at(0) == Some(from) {
        return Node::lvar(to);
    }
    let new_children = node
        .children
        .iter()
        .map(|v| match v {
            Value::Node(n) => Value::Node(substitute_param(n, from, to)),
            other => other.clone(),
        })
        .collect();
    node.updated(None, Some(new_children))
}

/// Build a synthetic arrow-function node for a rewritten block: shape
/// reuses `Tag::Block` with a `Nil` call slot (no receiver call — the
/// emitter recognizes a `Block` whose call child is `Nil` as a bare
/// arrow expression rather than a method-call-with-block).
pub fn synth_arrow(params: &[String], body: Node) -> Node {
    Node::make(
        Tag::Block,
        vec![
            Value::Nil,
            Value::List(params.iter().map(|p| Value::Str(p.clone())).collect()),
            Value::Node(body),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::filters::Options;

    fn run(node: Node) -> Node {
        let filters: Vec<std::sync::Arc<dyn Filter>> = vec![std::sync::Arc::new(CollectionFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        kernel.process(node)
    }

    #[test]
    fn empty_predicate_with_parens() {
        let loc = crate::compiler::ast::Loc {
            line: 1,
            end_pos: 1,
            source_buffer_name: std::sync::Arc::from("t"),
            has_parens: true,
        };
        let node = Node::send(Some(Node::lvar("x")), "empty?", vec![]).with_loc(loc);
        let out = run(node);
        assert_eq!(out.kind, Tag::BinOp);
        assert_eq!(out.name_at(0), Some("==="));
    }

    #[test]
    fn bare_getter_is_not_rewritten_without_parens_or_include() {
        let node = Node::send(Some(Node::lvar("x")), "keys", vec![]);
        let out = run(node.clone());
        assert!(out.equal(&node));
    }

    #[test]
    fn include_on_inclusive_range_is_bounded_comparison() {
        let range = Node::of(Tag::Irange, [Node::int_lit(1), Node::int_lit(10)]);
        let loc = crate::compiler::ast::Loc {
            line: 1,
            end_pos: 1,
            source_buffer_name: std::sync::Arc::from("t"),
            has_parens: true,
        };
        let node = Node::send(Some(range), "include?", vec![Node::lvar("n")]).with_loc(loc);
        let out = run(node);
        assert_eq!(out.kind, Tag::AndOp);
    }

    #[test]
    fn paramless_map_block_gets_implicit_it_param() {
        let call = Node::send(Some(Node::lvar("arr")), "map", vec![]);
        let body = Node::bin_op("*", Node::lvar("it"), Node::int_lit(2));
        let node = Node::make(Tag::Block, vec![Value::Node(call), Value::List(vec![]), Value::Node(body)]);
        let out = run(node);
        assert_eq!(out.kind, Tag::Call);
        let arrow = out.list_at(1).into_iter().next().unwrap();
        assert_eq!(arrow.kind, Tag::Block);
        assert_eq!(block_params(&arrow), vec!["it".to_string()]);
    }
}
