//! Scope stack mapping bare names to binding kinds, consulted while
//! lowering class/module bodies and while resolving bare identifiers
//! (§3 "Namespace entry", §4.5).

use std::collections::HashMap;

use crate::compiler::ast::Node;

/// What a bare name means in the enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// The bare name refers to `this` / the current receiver.
    SelfBinding,
    /// A method that must be bound to `this` when referenced without a
    /// call (`this.foo.bind(this)` as a value, `this.foo(x)` when called).
    Autobind,
    /// The bare identifier, when assigned, desugars to a property
    /// assignment (`this.foo = x`).
    Setter,
    /// Resolves to a dotted module path rooted at the given frame index.
    Module(usize),
    /// Resolves to a constant path; carries the declaring node for
    /// `find()` to hand back.
    Const(Node),
    /// No transformation; an ordinary local variable.
    Local,
}

#[derive(Debug, Default)]
struct Frame {
    name: Option<String>,
    bindings: HashMap<String, BindingKind>,
}

/// Stack of scope frames. `enter`/`leave` bracket class and module
/// bodies; `defineProps` registers bindings learned mid-body (e.g.
/// after parsing `attr_accessor`); `find` walks outward for resolution.
#[derive(Debug, Default)]
pub struct Namespace {
    frames: Vec<Frame>,
}

impl Namespace {
    pub fn new() -> Self {
        Namespace { frames: vec![Frame::default()] }
    }

    /// Push a frame for `name`. Returns `true` if a frame with that name
    /// already exists anywhere on the stack, signalling `extend`-style
    /// reopening semantics to the caller rather than a fresh definition.
    pub fn enter(&mut self, name: &str) -> bool {
        let reopened = self.frames.iter().any(|f| f.name.as_deref() == Some(name));
        self.frames.push(Frame { name: Some(name.to_string()), bindings: HashMap::new() });
        reopened
    }

    /// Pop the current frame, merging its bindings into the enclosing
    /// frame so that names declared inside (e.g. nested constants)
    /// remain resolvable from the parent scope.
    pub fn leave(&mut self) {
        if let Some(frame) = self.frames.pop() {
            if let Some(parent) = self.frames.last_mut() {
                for (k, v) in frame.bindings {
                    parent.bindings.entry(k).or_insert(v);
                }
            }
        }
    }

    pub fn define(&mut self, name: impl Into<String>, kind: BindingKind) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.into(), kind);
        }
    }

    /// Register several bindings at once, e.g. after expanding
    /// `attr_accessor :a, :b`.
    pub fn define_props(&mut self, props: impl IntoIterator<Item = (String, BindingKind)>) {
        for (name, kind) in props {
            self.define(name, kind);
        }
    }

    /// Look up a bare name, walking the stack from innermost outward.
    pub fn lookup(&self, name: &str) -> Option<&BindingKind> {
        self.frames.iter().rev().find_map(|f| f.bindings.get(name))
    }

    /// Resolve a constant path node to its declaring frame's binding, if
    /// registered. `node` is expected to be the `const` node itself,
    /// keyed by its name child.
    pub fn find(&self, const_name: &str) -> Option<&BindingKind> {
        self.lookup(const_name)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame_name(&self) -> Option<&str> {
        self.frames.last().and_then(|f| f.name.as_deref())
    }

    /// Binding names registered at the outermost (file) scope, sorted
    /// for deterministic output (§8 invariant 3) — the set a driver
    /// splices into an autoexports declaration once the whole unit has
    /// been processed and every top-level `Local`/class/module name has
    /// bubbled up into the root frame via `leave`.
    pub fn top_level_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.frames.first().map(|f| f.bindings.keys().cloned().collect()).unwrap_or_default();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_reports_reopen() {
        let mut ns = Namespace::new();
        assert!(!ns.enter("Box"));
        ns.leave();
        assert!(ns.enter("Box"));
    }

    #[test]
    fn lookup_walks_outward_after_leave_merges() {
        let mut ns = Namespace::new();
        ns.enter("Box");
        ns.define("v", BindingKind::Setter);
        ns.leave();
        assert_eq!(ns.lookup("v"), Some(&BindingKind::Setter));
    }

    #[test]
    fn inner_frame_shadows_outer() {
        let mut ns = Namespace::new();
        ns.define("x", BindingKind::Local);
        ns.enter("Inner");
        ns.define("x", BindingKind::SelfBinding);
        assert_eq!(ns.lookup("x"), Some(&BindingKind::SelfBinding));
        ns.leave();
        assert_eq!(ns.lookup("x"), Some(&BindingKind::SelfBinding));
    }
}
