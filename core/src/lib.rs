//! esforge-core: the source-to-source translator library. See
//! [`compiler`] for the AST model, traversal kernel, filter pipeline,
//! and drivers; `esforge` (the `src/bin` sibling crate) is the thin CLI
//! shell over [`compiler::convert`].

pub mod compiler;

pub use compiler::{convert, CompileError, ConvertOutput, Options};
