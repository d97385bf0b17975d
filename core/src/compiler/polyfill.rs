//! The polyfill/version gate (§4.7, C7): tracks which SRC-idiomatic but
//! not universally-available APIs the current translation unit touched,
//! and materializes their source into the prepend list exactly once
//! each at emission time.

use std::collections::BTreeSet;

use crate::compiler::ast::{Node, Tag, Value};

/// One polyfillable API. Each variant corresponds to a method the
//  `#4.4.1` catalogue may rewrite into a call that doesn't exist below a
/// given ES level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PolyfillId {
    ArrayFirst,
    ArrayLast,
    ArrayCompact,
    ArrayRindex,
    ArrayInsert,
    ArrayDeleteAt,
    StringChomp,
    StringCount,
    ObjectToA,
    RegExpEscape,
    Range,
    /// Ruby-truthiness test: only `nil`/`false` are falsy, so `0` and
    /// `""` must read as truthy when `truthy: ruby` is set.
    Truthy,
    /// Ruby `||`/`or` under truthy emulation: right side wins unless the
    /// left side is itself Ruby-falsy (not just JS-falsy).
    RubyOr,
    /// Ruby `&&`/`and` under truthy emulation.
    RubyAnd,
    /// `Hash#delete`: removes a key and returns its prior value, which
    /// the JS `delete` operator alone doesn't hand back.
    HashDelete,
}

impl PolyfillId {
    /// The global name the polyfill installs, used by rules that need
    /// to reference it (e.g. `$Range` for fallback range iteration).
    pub fn global_name(self) -> &'static str {
        match self {
            PolyfillId::ArrayFirst => "$arrayFirst",
            PolyfillId::ArrayLast => "$arrayLast",
            PolyfillId::ArrayCompact => "$arrayCompact",
            PolyfillId::ArrayRindex => "$arrayRindex",
            PolyfillId::ArrayInsert => "$arrayInsert",
            PolyfillId::ArrayDeleteAt => "$arrayDeleteAt",
            PolyfillId::StringChomp => "$stringChomp",
            PolyfillId::StringCount => "$stringCount",
            PolyfillId::ObjectToA => "$objectToA",
            PolyfillId::RegExpEscape => "RegExp.escape",
            PolyfillId::Range => "$Range",
            PolyfillId::Truthy => "$T",
            PolyfillId::RubyOr => "$ror",
            PolyfillId::RubyAnd => "$rand",
            PolyfillId::HashDelete => "$hashDelete",
        }
    }

    /// Build the polyfill's own implementation as an AST, so that other
    /// filters still see and can rewrite it like any other code (§4.7:
    /// "expressed as an AST so that other filters still see it").
    pub fn definition(self) -> Node {
        // Represented as a single opaque `jsraw` node carrying the
        // literal function text; later filters are free to `process`
        // into it since it is still an ordinary node in the tree, but
        // none of the catalogue rules match a bare `jsraw` body, so in
        // practice it passes through unchanged — matching real-world
        // ruby2js-style polyfills, which are themselves plain functions
        // the rest of the pipeline just happens not to touch.
        Node::make(Tag::JsRaw, vec![Value::Str(self.source_text().to_string())])
    }

    fn source_text(self) -> &'static str {
        match self {
            PolyfillId::ArrayFirst => {
                "function $arrayFirst(a, n) { return n === undefined ? a[0] : a.slice(0, n) }"
            }
            PolyfillId::ArrayLast => {
                "function $arrayLast(a, n) { return n === undefined ? a[a.length - 1] : a.slice(-n) }"
            }
            PolyfillId::ArrayCompact => {
                "function $arrayCompact(a) { return a.filter(x => x !== null && x !== undefined) }"
            }
            PolyfillId::ArrayRindex => {
                "function $arrayRindex(a, x) { return a.lastIndexOf(x) === -1 ? null : a.lastIndexOf(x) }"
            }
            PolyfillId::ArrayInsert => {
                "function $arrayInsert(a, i, ...items) { a.splice(i < 0 ? a.length + i + 1 : i, 0, ...items); return a }"
            }
            PolyfillId::ArrayDeleteAt => {
                "function $arrayDeleteAt(a, i) { return a.splice(i, 1)[0] }"
            }
            PolyfillId::StringChomp => {
                r#"function $stringChomp(s) { return s.replace(/\r?\n$/, "") }"#
            }
            PolyfillId::StringCount => {
                "function $stringCount(s, c) { return s.split(c).length - 1 }"
            }
            PolyfillId::ObjectToA => {
                "function $objectToA(o) { return Object.entries(o) }"
            }
            PolyfillId::RegExpEscape => {
                r#"RegExp.escape = RegExp.escape || function (s) { return s.replace(/[.*+?^${}()|[\]\\]/g, "\\$&") }"#
            }
            PolyfillId::Range => {
                "class $Range { constructor(a, b, excl) { this.a = a; this.b = b; this.excl = excl } \
                 *[Symbol.iterator]() { for (let i = this.a; this.excl ? i < this.b : i <= this.b; i++) yield i } \
                 includes(x) { return this.excl ? x >= this.a && x < this.b : x >= this.a && x <= this.b } }"
            }
            PolyfillId::Truthy => "function $T(x) { return x !== null && x !== undefined && x !== false }",
            PolyfillId::RubyOr => "function $ror(a, b) { return $T(a) ? a : b }",
            PolyfillId::RubyAnd => "function $rand(a, b) { return $T(a) ? b : a }",
            PolyfillId::HashDelete => "function $hashDelete(o, k) { const v = o[k]; delete o[k]; return v }",
        }
    }
}

/// The set of polyfills required so far by the current translation
/// unit. Insertion is idempotent; `drain_prelude` materializes each
/// requested id's definition exactly once, in a deterministic order
/// (insertion order would also be deterministic, but a `BTreeSet` keeps
/// output byte-identical across runs regardless of rule dispatch order,
/// satisfying §8 invariant 3).
#[derive(Debug, Default)]
pub struct PolyfillSet {
    required: BTreeSet<PolyfillId>,
}

impl PolyfillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, id: PolyfillId) {
        self.required.insert(id);
    }

    pub fn is_required(&self, id: PolyfillId) -> bool {
        self.required.contains(&id)
    }

    /// Nodes to splice into the prepend list, one per requested polyfill.
    pub fn prelude_nodes(&self) -> Vec<Node> {
        self.required.iter().map(|id| id.definition()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requiring_twice_emits_once() {
        let mut set = PolyfillSet::new();
        set.require(PolyfillId::ArrayCompact);
        set.require(PolyfillId::ArrayCompact);
        assert_eq!(set.prelude_nodes().len(), 1);
    }

    #[test]
    fn prelude_order_is_deterministic() {
        let mut a = PolyfillSet::new();
        a.require(PolyfillId::StringChomp);
        a.require(PolyfillId::ArrayFirst);
        let mut b = PolyfillSet::new();
        b.require(PolyfillId::ArrayFirst);
        b.require(PolyfillId::StringChomp);
        assert_eq!(a.prelude_nodes(), b.prelude_nodes());
    }
}
