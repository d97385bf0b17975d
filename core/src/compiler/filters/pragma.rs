//! Comment-pragma scanning (§4.3 "Comment pragmas"). Pragmas are
//! `# Pragma: <name>` comments attached to a specific source line,
//! keyed by `(source-buffer-name, line)`. They locally override
//! translator behavior: force `??` vs `||`, skip a declaration, force a
//! type to disambiguate a polymorphic method rewrite, force function
//! (non-arrow) emission, or force entries-based hash iteration.

use std::collections::HashMap;

use crate::compiler::ast::{Loc, Node};
use crate::compiler::filters::OrStyle;
use crate::compiler::traversal::{DispatchOutcome, Filter, Kernel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pragma {
    Or(PragmaOr),
    Skip,
    ForceType(String),
    ForceFunction,
    ForceEntries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PragmaOr {
    Logical,
    Nullish,
}

impl From<PragmaOr> for OrStyle {
    fn from(p: PragmaOr) -> Self {
        match p {
            PragmaOr::Logical => OrStyle::Logical,
            PragmaOr::Nullish => OrStyle::Nullish,
        }
    }
}

fn key(loc: &Loc) -> (String, u32) {
    (loc.source_buffer_name.to_string(), loc.line)
}

/// Parsed `# Pragma: <name>` directives, keyed by source line. Built
/// once from the comment stream and consulted by every other filter
/// through [`Kernel`]'s pragma table (`PragmaFilter` only installs it;
/// it does not itself rewrite anything, consistent with it needing to
/// run before the filters it informs — see `reorder`).
#[derive(Debug, Default, Clone)]
pub struct PragmaTable {
    by_line: HashMap<(String, u32), Vec<Pragma>>,
}

impl PragmaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a raw comment string (as handed back by the parser adapter
    /// alongside a node's location) and register any pragmas it names.
    pub fn scan_comment(&mut self, loc: &Loc, comment: &str) {
        let Some(rest) = comment.trim_start_matches('#').trim().strip_prefix("Pragma:") else {
            return;
        };
        let name = rest.trim();
        let pragma = match name {
            "??" => Pragma::Or(PragmaOr::Nullish),
            "||" => Pragma::Or(PragmaOr::Logical),
            "skip" => Pragma::Skip,
            "function" => Pragma::ForceFunction,
            "entries" => Pragma::ForceEntries,
            other if ["array", "hash", "string", "set"].contains(&other) => {
                Pragma::ForceType(other.to_string())
            }
            _ => return,
        };
        self.by_line.entry(key(loc)).or_default().push(pragma);
    }

    pub fn at(&self, loc: &Loc) -> &[Pragma] {
        self.by_line.get(&key(loc)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn or_style_at(&self, loc: &Loc) -> Option<OrStyle> {
        self.at(loc).iter().find_map(|p| match p {
            Pragma::Or(o) => Some((*o).into()),
            _ => None,
        })
    }

    pub fn forced_type_at(&self, loc: &Loc) -> Option<&str> {
        self.at(loc).iter().find_map(|p| match p {
            Pragma::ForceType(t) => Some(t.as_str()),
            _ => None,
        })
    }

    pub fn skip_at(&self, loc: &Loc) -> bool {
        self.at(loc).iter().any(|p| matches!(p, Pragma::Skip))
    }

    pub fn force_entries_at(&self, loc: &Loc) -> bool {
        self.at(loc).iter().any(|p| matches!(p, Pragma::ForceEntries))
    }
}

/// Installs the pragma table into the kernel and drops `skip`-marked
/// nodes. Every other filter reads `kernel.pragmas` directly rather than
/// receiving a handler call here, since a pragma is a cross-cutting
/// annotation, not a node rewrite in its own right.
pub struct PragmaFilter;

impl PragmaFilter {
    pub fn new() -> Self {
        PragmaFilter
    }
}

impl Default for PragmaFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for PragmaFilter {
    fn name(&self) -> &'static str {
        "pragma"
    }

    /// Must run before (above, in dispatch order) any filter that
    /// consults a pragma, and straddle require-inlining: it needs to see
    /// pragmas before `require` resolves referenced files so that
    /// pragmas inside those files are already registered. Concretely:
    /// first in the active order.
    fn reorder(&self, order: &[String]) -> Option<Vec<String>> {
        if order.first().map(String::as_str) == Some("pragma") {
            return None;
        }
        let mut new_order: Vec<String> = order.iter().filter(|n| n.as_str() != "pragma").cloned().collect();
        new_order.insert(0, "pragma".to_string());
        Some(new_order)
    }

    fn handle(&self, node: &Node, kernel: &mut Kernel) -> Option<DispatchOutcome> {
        let loc = node.location.as_ref()?;
        if kernel.pragmas.skip_at(loc) {
            return Some(DispatchOutcome::Replace(Node::nil()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn loc(line: u32) -> Loc {
        Loc { line, end_pos: 0, source_buffer_name: Arc::from("t.rb"), has_parens: false }
    }

    #[test]
    fn scans_or_pragma() {
        let mut table = PragmaTable::new();
        table.scan_comment(&loc(3), "# Pragma: ??");
        assert_eq!(table.or_style_at(&loc(3)), Some(OrStyle::Nullish));
        assert_eq!(table.or_style_at(&loc(4)), None);
    }

    #[test]
    fn scans_forced_type() {
        let mut table = PragmaTable::new();
        table.scan_comment(&loc(1), "# Pragma: hash");
        assert_eq!(table.forced_type_at(&loc(1)), Some("hash"));
    }
}
