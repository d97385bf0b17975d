//! Exception-handling lowering (§4.4.8): `begin`/`rescue`/`ensure`
//! already share the target's `try`/`catch`/`finally` shape closely
//! enough that the emitter prints `Rescue`/`Ensure` nodes directly as
//! such — this filter's job is reshaping what doesn't map 1:1:
//! multiple `rescue ExceptionClass => e` clauses collapse into JS's
//! single `catch` parameter via a class-dispatch `if`/`else if` chain,
//! and `retry` (no JS equivalent) becomes a `continue` inside a
//! synthesized retry loop.

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::filters::type_tests::is_known_builtin;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

const DEFAULT_ERROR_VAR: &str = "e";

pub struct ExceptionFilter;

impl Filter for ExceptionFilter {
    fn name(&self) -> &'static str {
        "exceptions"
    }

    fn handle(&self, node: &Node, _kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind != Tag::Rescue {
            return None;
        }
        let body = node.node_at(0)?.clone();
        let bodies: Vec<Node> = node
            .children
            .iter()
            .skip(1)
            .filter_map(|v| match v {
                Value::Node(n) if n.kind == Tag::RescueBody => Some(n.clone()),
                _ => None,
            })
            .collect();
        if bodies.is_empty() {
            return None;
        }
        let else_body = node.children.last().and_then(|v| match v {
            Value::Node(n) if n.kind != Tag::RescueBody => Some(n.clone()),
            _ => None,
        });

        let err_var = bodies
            .iter()
            .find_map(|b| b.name_at(1).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ERROR_VAR.to_string());

        let dispatch = build_dispatch(&bodies, &err_var);
        let collapsed = Node::make(
            Tag::RescueBody,
            vec![Value::Nil, Value::Sym(err_var), Value::Node(dispatch)],
        );

        let mut children = vec![Value::Node(body), Value::Node(collapsed)];
        if let Some(e) = else_body {
            children.push(Value::Node(e));
        }
        let rewritten = node.updated(None, Some(children));

        if contains_retry(&rewritten) {
            let try_catch = replace_retry_with_continue(&rewritten);
            // Either path out of the try/catch that isn't a `retry` (now
            // `continue`) is a successful completion of the `begin` block,
            // so it must break the synthesized loop rather than spin
            // forever.
            let loop_body = Node::of(Tag::Begin, [try_catch, Node::leaf(Tag::Break)]);
            return Some(DispatchOutcome::Recurse(Node::of(Tag::While, [Node::leaf(Tag::True), loop_body])));
        }
        Some(DispatchOutcome::Recurse(rewritten))
    }
}

/// Builds the `if (e instanceof A) { ... } else if (e instanceof B) {
/// ... } else { throw e }` chain a single JS `catch` clause needs to
/// emulate SRC's multi-clause `rescue`.
fn build_dispatch(bodies: &[Node], err_var: &str) -> Node {
    let mut result = Node::throw(Node::lvar(err_var));
    for rescue_body in bodies.iter().rev() {
        let classes = rescue_body.list_at(0);
        let inner_body = rescue_body.node_at(2).cloned().unwrap_or_else(Node::nil);
        if classes.is_empty() {
            // Bare `rescue` / `rescue => e`: matches anything, so it
            // short-circuits the chain outright.
            result = inner_body;
            continue;
        }
        let cond = classes
            .into_iter()
            .map(|c| class_check(&c, err_var))
            .reduce(Node::or_op)
            .unwrap_or_else(|| Node::leaf(Tag::True));
        result = Node::of(Tag::If, [cond, inner_body, result]);
    }
    result
}

fn class_check(class_node: &Node, err_var: &str) -> Node {
    let name = class_node.name_at(0).unwrap_or("Error");
    if is_known_builtin(name) {
        Node::instance_of(Node::lvar(err_var), Node::lvar(name))
    } else {
        Node::instance_of(Node::lvar(err_var), Node::lvar(name.to_string()))
    }
}

fn contains_retry(node: &Node) -> bool {
    if node.kind == Tag::Retry {
        return true;
    }
    node.children.iter().any(|v| match v {
        Value::Node(n) => contains_retry(n),
        Value::List(items) => items.iter().any(|v| matches!(v, Value::Node(n) if contains_retry(n))),
        _ => false,
    })
}

fn replace_retry_with_continue(node: &Node) -> Node {
    if node.kind == Tag::Retry {
        return Node::leaf(Tag::Next);
    }
    let new_children = node
        .children
        .iter()
        .map(|v| match v {
            Value::Node(n) => Value::Node(replace_retry_with_continue(n)),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|v| match v {
                        Value::Node(n) => Value::Node(replace_retry_with_continue(n)),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect();
    node.updated(None, Some(new_children))
}
