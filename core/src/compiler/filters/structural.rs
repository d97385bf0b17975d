//! Structural fallback filter. Every other filter in the default
//! pipeline only claims the node kinds its own rewrite rules care about
//! (a `BinOp`, a `Send` named `each`, a bare `Class`...); none of them
//! are responsible for walking into the children of a plain sequence,
//! an `if`/`while`/`for`, a method body, or any other node shape that
//! has no rewrite of its own. Without something claiming those kinds
//! too, `Kernel::process_from` falls all the way through the stack and
//! hands the node back completely unvisited — not just unrewritten,
//! but with its children never even reaching the other filters.
//!
//! This filter always matches, so it must stay last: every other filter
//! gets first refusal, and only once none of them claim a node does
//! this one recurse into its children via the ordinary fallthrough
//! dispatch. `build_default_filters` appends it after the configured
//! list rather than leaving it subject to a custom `filters:` override,
//! so traversal completeness can't be disabled by filter selection.

use crate::compiler::ast::Node;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

pub struct StructuralFilter;

impl Filter for StructuralFilter {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn handle(&self, node: &Node, _kernel: &mut Kernel) -> Option<DispatchOutcome> {
        Some(DispatchOutcome::Recurse(node.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::Tag;
    use crate::compiler::traversal::Filter as _;
    use crate::compiler::filters::Options;
    use std::sync::Arc;

    struct RenameFoo;
    impl Filter for RenameFoo {
        fn name(&self) -> &'static str {
            "rename_foo"
        }
        fn handle(&self, node: &Node, _kernel: &mut Kernel) -> Option<DispatchOutcome> {
            if node.kind == Tag::Lvar && node.name_at(0) == Some("foo") {
                Some(DispatchOutcome::Replace(Node::lvar("bar")))
            } else {
                None
            }
        }
    }

    #[test]
    fn recurses_into_an_unclaimed_begin_sequence() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(RenameFoo), Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        let begin = Node::of(Tag::Begin, [Node::lvar("foo"), Node::lvar("other")]);
        let out = kernel.process(begin);
        assert_eq!(out.node_at(0).unwrap().name_at(0), Some("bar"));
        assert_eq!(out.node_at(1).unwrap().name_at(0), Some("other"));
    }

    #[test]
    fn recurses_into_an_if_condition_and_branches() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(RenameFoo), Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        let if_node = Node::of(Tag::If, [Node::lvar("foo"), Node::lvar("foo"), Node::nil()]);
        let out = kernel.process(if_node);
        assert_eq!(out.node_at(0).unwrap().name_at(0), Some("bar"));
        assert_eq!(out.node_at(1).unwrap().name_at(0), Some("bar"));
    }

    #[test]
    fn leaf_nodes_pass_through_unchanged() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(StructuralFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        let out = kernel.process(Node::int_lit(42));
        assert_eq!(out, Node::int_lit(42));
    }
}
