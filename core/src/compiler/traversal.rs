//! The traversal kernel (§4.2): a recursive visitor that dispatches each
//! node to the topmost filter with a matching handler, falls through to
//! the next filter when none claims it, and lets any filter hoist nodes
//! into a per-translation-unit prepend list.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::compiler::ast::{CommentMap, Node, Tag};
use crate::compiler::error::CompileError;
use crate::compiler::filters::pragma::PragmaTable;
use crate::compiler::filters::Options;
use crate::compiler::namespace::Namespace;
use crate::compiler::polyfill::PolyfillSet;

/// What a filter's handler decided to do with a node.
pub enum DispatchOutcome {
    /// Return a fully rewritten node; no further filter sees this subtree.
    Replace(Node),
    /// Recurse into the node's own children with the same filter stack.
    Recurse(Node),
    /// Re-enter the pipeline at the top for a freshly built replacement.
    Reenter(Node),
}

/// A named pass with a partial dispatch table over node kinds, modeled
/// as a closed sum type (`Tag`) matched inside `handle` rather than an
/// open per-kind method table — this catches exhaustiveness bugs in any
/// single filter's `match` while still letting the *set* of filters
/// cover the large synthetic-tag vocabulary between them.
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Initializer invoked once before the first node is processed.
    fn set_options(&mut self, _opts: &Options) {}

    /// Ordering constraint hook. Given the currently active order (by
    /// name), return `Some(permuted)` to impose a constraint, or `None`
    /// to leave the order alone.
    fn reorder(&self, _order: &[String]) -> Option<Vec<String>> {
        None
    }

    /// Attempt to handle `node`. Returning `None` means "no handler for
    /// this kind in this filter", and the kernel falls through to the
    /// next filter down the stack.
    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome>;
}

/// Per-translation-unit mutable state threaded through every filter
/// call: the prepend list, comments, namespace, options, and the
/// polyfill set. Nothing here is process-wide (§5).
pub struct Kernel<'a> {
    filters: &'a [Arc<dyn Filter>],
    pub comments: CommentMap,
    pub namespace: Namespace,
    pub options: Options,
    pub polyfills: PolyfillSet,
    pub pragmas: PragmaTable,
    /// Nodes hoisted to the top of the emitted program (imports,
    /// polyfill preludes, ARGV setup), in insertion order.
    pub prepend: Vec<Node>,
    /// Guards against `process()`-driven self-recursion: (stack depth,
    /// node) pairs currently being reprocessed. A filter that would
    /// `process` a node structurally equal to one already in flight at
    /// the same depth gets the node back unchanged instead of looping.
    in_flight: Vec<(usize, Node)>,
    /// Set by a filter that refuses to translate a construct outright
    /// (e.g. a `require_relative` path that escapes its own directory via
    /// `..`) rather than merely declining to claim the node. `handle`'s
    /// `Option<DispatchOutcome>` signature has no error channel of its
    /// own, so the filter replaces the node with something emittable and
    /// records the refusal here; the driver checks it once processing
    /// finishes and fails the whole conversion if it's set.
    pub security_error: Option<CompileError>,
}

impl<'a> Kernel<'a> {
    pub fn new(filters: &'a [Arc<dyn Filter>], options: Options) -> Self {
        Kernel {
            filters,
            comments: CommentMap::new(),
            namespace: Namespace::new(),
            options,
            polyfills: PolyfillSet::new(),
            pragmas: PragmaTable::new(),
            prepend: Vec::new(),
            in_flight: Vec::new(),
            security_error: None,
        }
    }

    /// `process` — re-enters the pipeline at the top of the filter
    /// stack for `node`. This is the only entry point; `process_from`
    /// is the internal continuation used for fallthrough.
    pub fn process(&mut self, node: Node) -> Node {
        if self.filters.is_empty() {
            return node;
        }
        let depth = self.in_flight.len();
        if self.in_flight.iter().any(|(d, n)| *d == depth && n.equal(&node)) {
            return node;
        }
        self.in_flight.push((depth, node.clone()));
        let result = self.process_from(node, 0);
        self.in_flight.pop();
        result
    }

    /// Dispatch starting at filter index `start`, falling through
    /// downward until one filter's handler claims the node or the stack
    /// is exhausted (in which case the node passes through unchanged).
    fn process_from(&mut self, node: Node, start: usize) -> Node {
        for idx in start..self.filters.len() {
            // Clone the `Arc` (a refcount bump, not the filter) so the
            // borrow of `self.filters` ends before `handle` needs `&mut
            // self` for its own `process` calls.
            let filter = Arc::clone(&self.filters[idx]);
            trace!(filter = filter.name(), kind = %node.kind, "dispatch");
            match filter.handle(&node, self) {
                None => continue,
                Some(DispatchOutcome::Replace(n)) => return n,
                Some(DispatchOutcome::Recurse(n)) => return self.process_children(n),
                Some(DispatchOutcome::Reenter(n)) => return self.process(n),
            }
        }
        node
    }

    /// `process_children` — recurse into `node`'s own children with the
    /// same filter stack, replacing each node-shaped child with the
    /// result of `process`.
    pub fn process_children(&mut self, node: Node) -> Node {
        let new_children: Vec<_> = node
            .children
            .iter()
            .map(|v| self.process_value(v.clone()))
            .collect();
        let processed = node.updated(None, Some(new_children));
        self.comments.transfer(&node, &processed);
        processed
    }

    fn process_value(&mut self, value: crate::compiler::ast::Value) -> crate::compiler::ast::Value {
        use crate::compiler::ast::Value;
        match value {
            Value::Node(n) => Value::Node(self.process(n)),
            Value::List(items) => Value::List(items.into_iter().map(|v| self.process_value(v)).collect()),
            other => other,
        }
    }

    /// `process_all` — maps `process` over a list of nodes.
    pub fn process_all(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        nodes.into_iter().map(|n| self.process(n)).collect()
    }

    pub fn push_prepend(&mut self, node: Node) {
        self.prepend.push(node);
    }
}

/// Order an unordered filter set honoring each filter's `reorder` hook.
/// Applies hooks repeatedly (bounded by filter count) until a fixed
/// point, matching §4.3's "some filters must run relative to others".
pub fn order_filters(mut order: Vec<String>, by_name: &HashMap<String, &dyn Filter>) -> Vec<String> {
    for _ in 0..order.len().max(1) {
        let mut changed = false;
        for name in order.clone() {
            if let Some(filter) = by_name.get(&name) {
                if let Some(new_order) = filter.reorder(&order) {
                    if new_order != order {
                        order = new_order;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::Value;

    struct DoubleIntFilter;
    impl Filter for DoubleIntFilter {
        fn name(&self) -> &'static str {
            "double_int"
        }
        fn handle(&self, node: &Node, _kernel: &mut Kernel) -> Option<DispatchOutcome> {
            match node.kind {
                Tag::Int => {
                    let Value::Int(n) = node.children[0] else { return None };
                    Some(DispatchOutcome::Replace(Node::int_lit(n * 2)))
                }
                Tag::Array => Some(DispatchOutcome::Recurse(node.clone())),
                _ => None,
            }
        }
    }

    #[test]
    fn recurse_rewrites_children_via_fallthrough() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(DoubleIntFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        let arr = Node::of(Tag::Array, vec![Node::int_lit(1), Node::int_lit(2)]);
        let out = kernel.process(arr);
        assert_eq!(out.node_at(0).unwrap().children[0], Value::Int(2));
        assert_eq!(out.node_at(1).unwrap().children[0], Value::Int(4));
    }

    struct LoopyFilter;
    impl Filter for LoopyFilter {
        fn name(&self) -> &'static str {
            "loopy"
        }
        fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
            if node.kind == Tag::Nil {
                // Would recurse forever without the in-flight guard.
                Some(DispatchOutcome::Replace(kernel.process(node.clone())))
            } else {
                None
            }
        }
    }

    #[test]
    fn self_reentry_on_equal_node_terminates() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(LoopyFilter)];
        let mut kernel = Kernel::new(&filters, Options::default());
        let out = kernel.process(Node::leaf(Tag::Nil));
        assert_eq!(out.kind, Tag::Nil);
    }
}
