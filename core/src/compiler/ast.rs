//! The uniform AST node representation shared by every pass in the
//! translator: parser output, filters, and the emitter all speak this
//! one vocabulary.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Closed-but-large vocabulary of node kinds. New synthetic tags are
/// added here as rewrite rules need them; the dispatch tables in
/// `crate::compiler::traversal` and `crate::compiler::emitter` are
/// expected to grow a matching arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    // --- literals ---
    Int,
    Float,
    Str,
    Dstr, // interpolated string, children alternate Str/expr segments
    Sym,
    True,
    False,
    Nil,
    Regexp,
    Irange, // inclusive range literal
    Erange, // exclusive range literal
    Octal,

    // --- variables ---
    Lvar,
    Lvasgn,
    Ivar,
    Ivasgn,
    Cvar,
    Cvasgn,
    Gvar,
    Gvasgn,
    Const,
    Casgn,

    // --- composite ---
    Array,
    Hash,
    Pair,
    Splat,
    KwSplat,

    // --- calls ---
    Send,
    Attr,
    Csend, // conditional-send / safe navigation
    Index,
    IndexAsgn,

    // --- control flow ---
    If,
    Case,
    When,
    While,
    Until,
    For,
    ForOf,
    Block, // loop-variable block closure, shape block(call, args, body)
    Next,
    Break,
    Redo,
    Retry,
    Return,
    Begin, // plain sequence
    KwBegin,
    Rescue,
    RescueBody,
    Ensure,

    // --- definitions ---
    Def,
    Defs,
    Class,
    SClass, // `class << self`
    Module,
    Arg,
    OptArg,
    RestArg,
    BlockArg,
    KwArg,
    KwOptArg,
    KwRestArg,
    Args,

    // --- synthetic, added during rewriting ---
    Autoreturn,
    Autobind,
    Import,
    Export,
    Prop,
    Call,
    SendBang, // `send!`, bypasses further rewriting of this node
    Hide,
    Prototype,
    ClassModule,
    HostValue,
    TagLit,
    PNode,
    PNodeText,
    XNode,
    Nullish,
    NullishOr,
    NullishAsgn,
    Defm,
    Deff,
    JsRaw,
    InstanceOf,
    InCheck, // `in?`
    SuperCall,
    ZSuperCall, // bare `super`, no parens, no args
    SelfExpr,
    AndOp,
    OrOp,
    NotOp,
    BinOp,
    UnaryOp,
    Ternary,
    Assign,
    OpAssign,
    MAsgn, // multiple assignment / destructuring
    MLhs,
    Yield,
    Defined,
    Alias,
    Undef,
    Throw,
    /// `let name = value;` — a local variable's first binding, as
    /// distinguished from a plain reassignment (still printed as
    /// `Lvasgn`'s bare `name = value`) by `filters::declarations`.
    VarDecl,
}

/// A value carried by a [`Node`]'s child slot. Either a nested node, a
/// primitive scalar the parser or a rule attached directly, or a small
/// option map used by property descriptors (e.g. `attr_accessor`
/// visibility, `define_method` flags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Node(Node),
    Str(String),
    Int(i64),
    Float(OrderedF64),
    Bool(bool),
    Sym(String),
    Nil,
    /// Small option map, e.g. `{ "visibility": "private" }`.
    Opts(HashMap<String, String>),
    /// Ordered list of children, used for splice-like slots (e.g. the
    /// `when` clause list of a `case`, or a block's argument list).
    List(Vec<Value>),
}

/// Thin wrapper making `f64` usable as a `Value` without implementing
/// `Eq`/`Hash` incorrectly; compares by bit pattern, which is exactly
/// what `equal()` needs (source float literals are never NaN).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedF64(pub f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

/// Source location metadata. Carried through `updated` on a best-effort
/// basis; never consulted for compilation semantics (§3 invariant 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loc {
    pub line: u32,
    pub end_pos: u32,
    pub source_buffer_name: Arc<str>,
    /// Whether the originating call used explicit parentheses at the
    /// source site. Populated by the parser adapter for `send`-shaped
    /// nodes; consulted by [`is_method`].
    pub has_parens: bool,
}

/// The uniform tree node. Immutable once constructed; every rewrite
/// produces a new `Node` via [`Node::updated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: Tag,
    pub children: Arc<Vec<Value>>,
    pub location: Option<Loc>,
}

impl Node {
    /// Construct a node. This is `make()` from §4.1.
    pub fn make(kind: Tag, children: Vec<Value>) -> Node {
        Node {
            kind,
            children: Arc::new(children),
            location: None,
        }
    }

    pub fn with_loc(mut self, loc: Loc) -> Node {
        self.location = Some(loc);
        self
    }

    pub fn leaf(kind: Tag) -> Node {
        Node::make(kind, Vec::new())
    }

    /// Build a child list of nodes, wrapping each in `Value::Node`.
    pub fn of(kind: Tag, children: impl IntoIterator<Item = Node>) -> Node {
        Node::make(kind, children.into_iter().map(Value::Node).collect())
    }

    pub fn str_lit(s: impl Into<String>) -> Node {
        Node::make(Tag::Str, vec![Value::Str(s.into())])
    }

    pub fn sym_lit(s: impl Into<String>) -> Node {
        Node::make(Tag::Sym, vec![Value::Sym(s.into())])
    }

    pub fn int_lit(n: i64) -> Node {
        Node::make(Tag::Int, vec![Value::Int(n)])
    }

    pub fn lvar(name: impl Into<String>) -> Node {
        Node::make(Tag::Lvar, vec![Value::Sym(name.into())])
    }

    pub fn nil() -> Node {
        Node::leaf(Tag::Nil)
    }

    pub fn self_expr() -> Node {
        Node::leaf(Tag::SelfExpr)
    }

    /// Canonical `send` shape: `[receiver(Node|Nil), method(Sym), args(List<Node>)]`.
    pub fn send(receiver: Option<Node>, method: impl Into<String>, args: Vec<Node>) -> Node {
        Node::make(
            Tag::Send,
            vec![
                receiver.map(Value::Node).unwrap_or(Value::Nil),
                Value::Sym(method.into()),
                Value::List(args.into_iter().map(Value::Node).collect()),
            ],
        )
    }

    pub fn csend(receiver: Node, method: impl Into<String>, args: Vec<Node>) -> Node {
        Node::make(
            Tag::Csend,
            vec![Value::Node(receiver), Value::Sym(method.into()), Value::List(args.into_iter().map(Value::Node).collect())],
        )
    }

    /// A `send` marked to bypass any further rewriting of this node
    /// (§9 "send! variant that bypasses further rewriting").
    pub fn send_bang(inner: Node) -> Node {
        Node::make(Tag::SendBang, vec![Value::Node(inner)])
    }

    /// Target-language property access without call parens, e.g. `x.keys`.
    pub fn attr(receiver: Node, name: impl Into<String>) -> Node {
        Node::make(Tag::Attr, vec![Value::Node(receiver), Value::Sym(name.into())])
    }

    /// Target-language function/method call: `callee(args...)`.
    pub fn call(callee: Node, args: Vec<Node>) -> Node {
        Node::make(Tag::Call, vec![Value::Node(callee), Value::List(args.into_iter().map(Value::Node).collect())])
    }

    pub fn bin_op(op: impl Into<String>, lhs: Node, rhs: Node) -> Node {
        Node::make(Tag::BinOp, vec![Value::Str(op.into()), Value::Node(lhs), Value::Node(rhs)])
    }

    pub fn unary_op(op: impl Into<String>, operand: Node) -> Node {
        Node::make(Tag::UnaryOp, vec![Value::Str(op.into()), Value::Node(operand)])
    }

    pub fn and_op(lhs: Node, rhs: Node) -> Node {
        Node::of(Tag::AndOp, [lhs, rhs])
    }

    pub fn or_op(lhs: Node, rhs: Node) -> Node {
        Node::of(Tag::OrOp, [lhs, rhs])
    }

    pub fn nullish_or(lhs: Node, rhs: Node) -> Node {
        Node::of(Tag::NullishOr, [lhs, rhs])
    }

    pub fn not_op(operand: Node) -> Node {
        Node::of(Tag::NotOp, [operand])
    }

    pub fn ternary(cond: Node, then: Node, else_: Node) -> Node {
        Node::of(Tag::Ternary, [cond, then, else_])
    }

    pub fn index(obj: Node, idx: Node) -> Node {
        Node::of(Tag::Index, [obj, idx])
    }

    pub fn assign(target: Node, value: Node) -> Node {
        Node::of(Tag::Assign, [target, value])
    }

    /// `target op= value`, shape `[op(Str), target, value]`.
    pub fn op_assign(op: impl Into<String>, target: Node, value: Node) -> Node {
        Node::make(Tag::OpAssign, vec![Value::Str(op.into()), Value::Node(target), Value::Node(value)])
    }

    /// `target ??= value`, shape `[target, value]`.
    pub fn nullish_asgn(target: Node, value: Node) -> Node {
        Node::of(Tag::NullishAsgn, [target, value])
    }

    pub fn array(items: Vec<Node>) -> Node {
        Node::make(Tag::Array, items.into_iter().map(Value::Node).collect())
    }

    pub fn instance_of(lhs: Node, rhs: Node) -> Node {
        Node::of(Tag::InstanceOf, [lhs, rhs])
    }

    pub fn throw(value: Node) -> Node {
        Node::of(Tag::Throw, [value])
    }

    /// `let name = value;`, shape `[name(Sym), value]`.
    pub fn var_decl(name: impl Into<String>, value: Node) -> Node {
        Node::make(Tag::VarDecl, vec![Value::Sym(name.into()), Value::Node(value)])
    }

    /// Reads this node's argument list when it was built by
    /// [`Node::send`]/[`Node::call`] (the `List` child at `idx`).
    pub fn list_at(&self, idx: usize) -> Vec<Node> {
        match self.children.get(idx) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Node(n) => Some(n.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the node's sole string/symbol child, if the child slot
    /// at `idx` holds one. Used pervasively by rules that read a
    /// `send`'s method-name child.
    pub fn name_at(&self, idx: usize) -> Option<&str> {
        match self.children.get(idx)? {
            Value::Sym(s) | Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// For a `send`/`csend`/`attr` shaped node, the receiver at child 0
    /// (`None` when the slot holds `Value::Nil`, i.e. no explicit
    /// receiver was written in source).
    pub fn receiver(&self) -> Option<&Node> {
        self.node_at(0)
    }

    /// For a `send`/`csend` shaped node, the method name at child 1.
    pub fn method_name(&self) -> Option<&str> {
        self.name_at(1)
    }

    /// For a `send`/`csend` shaped node, the argument list at child 2.
    pub fn args(&self) -> Vec<Node> {
        self.list_at(2)
    }

    pub fn node_at(&self, idx: usize) -> Option<&Node> {
        match self.children.get(idx)? {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// `updated(node, kind?, children?)` — returns a new `Node` with the
    /// given replacements, carrying over the location unchanged (§3
    /// invariant 4: locations are metadata, preserved when available).
    pub fn updated(&self, kind: Option<Tag>, children: Option<Vec<Value>>) -> Node {
        Node {
            kind: kind.unwrap_or(self.kind),
            children: children.map(Arc::new).unwrap_or_else(|| self.children.clone()),
            location: self.location.clone(),
        }
    }

    /// Structural deep equality over kind + children, recursing into
    /// nested nodes and comparing primitives by value. Never relies on
    /// object identity (§3 invariant 3): two `Node`s built independently
    /// from the same shape compare equal.
    pub fn equal(&self, other: &Node) -> bool {
        self.kind == other.kind && self.children.len() == other.children.len() &&
            self.children.iter().zip(other.children.iter()).all(|(a, b)| values_equal(a, b))
    }

    /// True when this node is a `send`/`attr`-shaped call that used
    /// explicit parentheses at the source site. Rules consult this to
    /// disambiguate getter-style access (`x.keys`) from an explicit call
    /// (`x.keys()`) when no `include`/`include_all` override applies.
    pub fn is_method(&self) -> bool {
        matches!(self.kind, Tag::Send | Tag::Csend) &&
            self.location.as_ref().is_some_and(|l| l.has_parens)
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Node(x), Value::Node(y)) => x.equal(y),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Sym(x), Value::Sym(y)) => x == y,
        (Value::Nil, Value::Nil) => true,
        (Value::Opts(x), Value::Opts(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| values_equal(p, q))
        }
        _ => false,
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Per-translation-unit association from `Node` to its ordered comment
/// strings. Kept out of the AST itself (§9 "comments as out-of-band
/// metadata") because rewriters freely clone and substitute nodes;
/// attaching comments to nodes directly would make every `updated` call
/// responsible for carrying them forward by hand.
///
/// Node identity for this map is structural (`Node::equal`), matching
/// the rest of the system's refusal to rely on referential identity —
/// a node is looked up by a clone taken at attachment time.
#[derive(Debug, Clone, Default)]
pub struct CommentMap {
    entries: Vec<(Node, Vec<String>)>,
}

impl CommentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, node: &Node, comments: Vec<String>) {
        if comments.is_empty() {
            return;
        }
        if let Some(existing) = self.entries.iter_mut().find(|(n, _)| n.equal(node)) {
            existing.1.extend(comments);
        } else {
            self.entries.push((node.clone(), comments));
        }
    }

    pub fn get(&self, node: &Node) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(n, _)| n.equal(node))
            .map(|(_, c)| c.as_slice())
    }

    /// Transfer any comments attached to `from` onto `to`. Rules call
    /// this when replacing a node wholesale so comment preservation
    /// (§8 invariant 4) holds across the rewrite; `hide` explicitly
    /// skips this to drop a comment on purpose.
    pub fn transfer(&mut self, from: &Node, to: &Node) {
        if let Some(comments) = self.get(from).map(<[String]>::to_vec) {
            self.attach(to, comments);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updated_is_idempotent_and_preserves_comments() {
        let n = Node::of(Tag::Array, vec![Node::int_lit(1), Node::int_lit(2)]);
        let u = n.updated(Some(n.kind), Some(n.children.as_ref().clone()));
        assert!(u.equal(&n));

        let mut comments = CommentMap::new();
        comments.attach(&n, vec!["# two".to_string()]);
        let u2 = n.updated(None, None);
        comments.transfer(&n, &u2);
        assert_eq!(comments.get(&u2), Some(&["# two".to_string()][..]));
    }

    #[test]
    fn equality_ignores_object_identity() {
        let a = Node::of(Tag::Array, vec![Node::int_lit(1), Node::str_lit("x")]);
        let b = Node::of(Tag::Array, vec![Node::int_lit(1), Node::str_lit("x")]);
        assert!(a.equal(&b));
        assert_ne!(
            std::ptr::from_ref(a.children.as_ref()),
            std::ptr::from_ref(b.children.as_ref())
        );
    }

    #[test]
    fn equality_is_reflexive_symmetric_transitive() {
        let a = Node::of(Tag::Hash, vec![Node::sym_lit("k")]);
        let b = a.clone();
        let c = a.clone();
        assert!(a.equal(&a));
        assert_eq!(a.equal(&b), b.equal(&a));
        assert!(a.equal(&b) && b.equal(&c) && a.equal(&c));
    }

    #[test]
    fn is_method_requires_parens_and_send_shape() {
        let loc = Loc {
            line: 1,
            end_pos: 10,
            source_buffer_name: Arc::from("test.rb"),
            has_parens: true,
        };
        let call = Node::make(Tag::Send, vec![Value::Nil, Value::Sym("keys".into())])
            .with_loc(loc);
        assert!(call.is_method());

        let attr = Node::make(Tag::Attr, vec![Value::Nil, Value::Sym("keys".into())]);
        assert!(!attr.is_method());
    }
}
