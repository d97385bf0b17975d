//! The source-to-source translator: parser adapter seam, AST model,
//! traversal kernel, filter pipeline, namespace tracker, polyfill gate,
//! emitter, and the single-unit/batch drivers that tie them together.

pub mod ast;
pub mod cache;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod filters;
pub mod namespace;
pub mod parser;
pub mod polyfill;
pub mod traversal;

pub use driver::{convert, ConvertOutput};
pub use error::CompileError;
pub use filters::Options;
