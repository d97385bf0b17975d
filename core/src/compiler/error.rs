//! The compile error taxonomy (§4.8 / SPEC_FULL.md §7). Every fallible
//! path in the translator resolves to one of these four kinds, mirroring
//! the layered `thiserror` enums used throughout the toolkit's own
//! `services::*` modules (parse errors, template errors, and so on each
//! get their own small enum rather than a single catch-all).

use crate::compiler::ast::Loc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// A construct the filter pipeline has no rewrite rule for, and no
    /// filter claimed via fallthrough either — the node reached the
    /// emitter in a shape it doesn't know how to print.
    #[error("unsupported construct `{construct}` at {}:{}", loc.as_ref().map(|l| l.source_buffer_name.to_string()).unwrap_or_default(), loc.as_ref().map(|l| l.line).unwrap_or(0))]
    Unsupported { construct: String, loc: Option<Loc> },

    /// The AST violates a shape invariant a filter or the emitter
    /// assumed (e.g. a `send`-shaped node missing its method-name
    /// child). Indicates a parser-adapter bug or a hand-built test
    /// fixture with the wrong shape, never a SRC source-language error.
    #[error("malformed AST: {detail}")]
    MalformedAst { detail: String },

    /// A translation would require executing or embedding
    /// attacker-controlled content unsafely (e.g. a `require` path that
    /// escapes the project root without `require_recursive` explicitly
    /// permitting it).
    #[error("refused unsafe construct: {detail}")]
    Security { detail: String },

    /// The supplied [`crate::compiler::filters::Options`] are
    /// self-contradictory or name an unknown filter.
    #[error("invalid configuration: {detail}")]
    Configuration { detail: String },
}

impl CompileError {
    pub fn unsupported(construct: impl Into<String>, loc: Option<Loc>) -> Self {
        CompileError::Unsupported { construct: construct.into(), loc }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        CompileError::MalformedAst { detail: detail.into() }
    }

    pub fn security(detail: impl Into<String>) -> Self {
        CompileError::Security { detail: detail.into() }
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        CompileError::Configuration { detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_includes_location() {
        let loc = Loc { line: 12, end_pos: 0, source_buffer_name: std::sync::Arc::from("a.rb"), has_parens: false };
        let err = CompileError::unsupported("ObjectSpace.each_object", Some(loc));
        assert!(err.to_string().contains("a.rb:12"));
    }

    #[test]
    fn configuration_error_formats_detail() {
        let err = CompileError::configuration("unknown filter `foo`");
        assert_eq!(err.to_string(), "invalid configuration: unknown filter `foo`");
    }
}
