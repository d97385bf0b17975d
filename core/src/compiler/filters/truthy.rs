//! Logical/nullish/truthiness lowering (§4.4.5): `or`/`and`/`not`
//! lowering to `||`/`&&`/`!` (or their Ruby-truthy-emulating
//! equivalents when `truthy: ruby` is set), `if`/`while`/ternary
//! condition wrapping, and `??` vs `||` selection for the `or`
//! disjunction style.

use crate::compiler::ast::{Node, Tag};
use crate::compiler::filters::{OrStyle, Options};
use crate::compiler::polyfill::PolyfillId;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct TruthyFilter;

impl TruthyFilter {
    /// The `or` node's chosen operator, honoring a line-level pragma
    /// override ahead of the global `Options::or` default.
    fn or_style(node: &Node, kernel: &Kernel) -> OrStyle {
        node.location
            .as_ref()
            .and_then(|l| kernel.pragmas.or_style_at(l))
            .unwrap_or(kernel.options.or)
    }

    /// Conditions (`if`, `while`, `until`, ternary) get wrapped in `$T`
    /// only when truthy emulation is on and the condition isn't already
    /// a comparison/boolean-producing form the JS truthiness model
    /// already agrees with Ruby's on (keeps `if (x > 0)` unwrapped).
    fn needs_wrap(cond: &Node) -> bool {
        !matches!(
            cond.kind,
            Tag::BinOp
                | Tag::AndOp
                | Tag::OrOp
                | Tag::NotOp
                | Tag::True
                | Tag::False
                | Tag::InstanceOf
                | Tag::InCheck
        )
    }

    fn wrap(kernel: &mut Kernel, cond: Node) -> Node {
        if !kernel.options.truthy_ruby || !Self::needs_wrap(&cond) {
            return cond;
        }
        kernel.polyfills.require(PolyfillId::Truthy);
        Node::call(Node::lvar(PolyfillId::Truthy.global_name()), vec![cond])
    }
}

impl Filter for TruthyFilter {
    fn name(&self) -> &'static str {
        "truthy"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        match node.kind {
            Tag::OrOp => {
                let lhs = node.node_at(0)?.clone();
                let rhs = node.node_at(1)?.clone();
                if kernel.options.truthy_ruby {
                    kernel.polyfills.require(PolyfillId::RubyOr);
                    return Some(DispatchOutcome::Recurse(Node::call(
                        Node::lvar(PolyfillId::RubyOr.global_name()),
                        vec![lhs, rhs],
                    )));
                }
                let out = match Self::or_style(node, kernel) {
                    OrStyle::Logical => Node::bin_op("||", lhs, rhs),
                    OrStyle::Nullish => Node::nullish_or(lhs, rhs),
                };
                Some(DispatchOutcome::Recurse(out))
            }
            Tag::AndOp if kernel.options.truthy_ruby => {
                let lhs = node.node_at(0)?.clone();
                let rhs = node.node_at(1)?.clone();
                kernel.polyfills.require(PolyfillId::RubyAnd);
                Some(DispatchOutcome::Recurse(Node::call(
                    Node::lvar(PolyfillId::RubyAnd.global_name()),
                    vec![lhs, rhs],
                )))
            }
            Tag::NotOp if kernel.options.truthy_ruby => {
                let operand = node.node_at(0)?.clone();
                kernel.polyfills.require(PolyfillId::Truthy);
                let wrapped = Node::call(Node::lvar(PolyfillId::Truthy.global_name()), vec![operand]);
                Some(DispatchOutcome::Recurse(Node::not_op(wrapped)))
            }
            Tag::If | Tag::While | Tag::Until if kernel.options.truthy_ruby => {
                let cond = node.node_at(0)?.clone();
                if !Self::needs_wrap(&cond) {
                    return None;
                }
                let wrapped = Self::wrap(kernel, cond);
                let mut children = node.children.as_ref().clone();
                children[0] = crate::compiler::ast::Value::Node(wrapped);
                Some(DispatchOutcome::Recurse(node.updated(None, Some(children))))
            }
            // `name ||= default` keeps its `OpAssign("||", ...)` shape
            // (already prints as `name ||= default` unchanged) unless the
            // `or` style resolves to nullish and the target level can
            // express `??=` (ES2021), in which case it becomes the
            // dedicated `NullishAsgn` shape instead.
            Tag::OpAssign if node.name_at(0) == Some("||") => {
                if Self::or_style(node, kernel) != OrStyle::Nullish || !kernel.options.es2021() {
                    return None;
                }
                let target = node.node_at(1)?.clone();
                let value = node.node_at(2)?.clone();
                Some(DispatchOutcome::Recurse(Node::nullish_asgn(target, value)))
            }
            Tag::Ternary if kernel.options.truthy_ruby => {
                let cond = node.node_at(0)?.clone();
                if !Self::needs_wrap(&cond) {
                    return None;
                }
                let wrapped = Self::wrap(kernel, cond);
                let then = node.node_at(1)?.clone();
                let els = node.node_at(2)?.clone();
                Some(DispatchOutcome::Recurse(Node::ternary(wrapped, then, els)))
            }
            _ => None,
        }
    }
}
