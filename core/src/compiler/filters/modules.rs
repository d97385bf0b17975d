//! `require`/`require_relative` handling and autoimport/autoexport
//! injection (§4.4.4 "Module system lowering").

use std::collections::HashSet;
use std::sync::Mutex;

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::error::CompileError;
use crate::compiler::filters::AutoExports;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

/// `require 'foo'` / `require_relative './foo'` become `Import` nodes
/// hoisted to the prepend list; the call expression itself collapses to
/// `Nil` in place (statement position, so emitting nothing is correct).
/// Each path is only imported once per translation unit even if
/// `require`d from multiple places, tracked via `seen`.
///
/// `require_recursive` additionally walks into an externally-resolved
/// source for the required path and runs the same pipeline over it
/// before splicing its top-level exports in — left to the driver (C8),
/// since only it has filesystem/parser access; this filter just emits
/// the marker `Import` node the driver inspects.
pub struct RequireFilter {
    seen: Mutex<HashSet<String>>,
}

impl Default for RequireFilter {
    fn default() -> Self {
        RequireFilter { seen: Mutex::new(HashSet::new()) }
    }
}

impl Filter for RequireFilter {
    fn name(&self) -> &'static str {
        "require"
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        if node.kind == Tag::Send {
            let name = node.method_name()?;
            if name != "require" && name != "require_relative" {
                return None;
            }
            let arg = node.args().into_iter().next()?;
            let Value::Str(path) = arg.children.first()?.clone() else { return None };
            let resolved = if name == "require_relative" {
                match normalize_relative(&path) {
                    Ok(p) => p,
                    Err(e) => {
                        kernel.security_error.get_or_insert(e);
                        return Some(DispatchOutcome::Replace(Node::nil()));
                    }
                }
            } else {
                path.clone()
            };
            {
                let mut seen = self.seen.lock().expect("require dedup lock poisoned");
                if !seen.insert(resolved.clone()) {
                    return Some(DispatchOutcome::Replace(Node::nil()));
                }
            }
            let import = Node::make(Tag::Import, vec![Value::Str(resolved), Value::Bool(kernel.options.require_recursive)]);
            kernel.push_prepend(import);
            return Some(DispatchOutcome::Replace(Node::nil()));
        }

        // Bare identifier referencing a configured autoimport and not
        // locally bound: inject its import at the top once, same
        // dedup rule as `require`.
        if node.kind == Tag::Lvar {
            let name = node.name_at(0)?;
            if kernel.namespace.find(name).is_some() {
                return None;
            }
            let module_path = kernel.options.autoimports.get(name)?.clone();
            let mut seen = self.seen.lock().expect("require dedup lock poisoned");
            if seen.insert(format!("autoimport:{name}")) {
                drop(seen);
                let import = Node::make(
                    Tag::Import,
                    vec![Value::Str(module_path), Value::Bool(false), Value::Str(name.to_string())],
                );
                kernel.push_prepend(import);
            }
            return None;
        }

        None
    }
}

/// Prefixes a bare relative `require_relative` path with `./` if it
/// doesn't already have one. Refuses (via `CompileError::security`) a
/// path containing a `..` component — `require_relative` is meant to
/// stay within the requiring file's own directory tree, and a `..` is
/// the one way a path string could walk back out of it.
fn normalize_relative(path: &str) -> Result<String, CompileError> {
    let trimmed = path.strip_prefix("./").unwrap_or(path);
    if std::path::Path::new(trimmed).components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(CompileError::security(format!("require_relative path `{path}` escapes its own directory via `..`")));
    }
    Ok(format!("./{trimmed}"))
}

/// Builds the `export` prelude node(s) for the translation unit's
/// top-level bindings, per `Options::autoexports`. Called by the driver
/// after the filter pipeline runs, since exports are a function of the
/// *final* set of top-level names, not something any single node
/// rewrite can determine in isolation.
pub fn build_autoexports(top_level_names: &[String], mode: AutoExports) -> Option<Node> {
    match mode {
        AutoExports::Off => None,
        AutoExports::On => Some(Node::make(
            Tag::Export,
            vec![Value::List(top_level_names.iter().map(|n| Value::Str(n.clone())).collect()), Value::Bool(false)],
        )),
        AutoExports::Default => top_level_names.first().map(|n| {
            Node::make(Tag::Export, vec![Value::List(vec![Value::Str(n.clone())]), Value::Bool(true)])
        }),
    }
}
