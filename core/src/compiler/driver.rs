//! The single-unit and batch drivers (§4.9 / SPEC_FULL.md's "added" C8
//! and C9): wiring parse → filter pipeline → emit into one call per
//! file, and a `rayon`-parallel fan-out across many files the same way
//! the toolkit's own `services::*` batch commands fan file-level work
//! out across a thread pool rather than looping serially.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::compiler::ast::{Node, Tag, Value};
use crate::compiler::cache::ParseCache;
use crate::compiler::emitter::Emitter;
use crate::compiler::error::CompileError;
use crate::compiler::filters::{build_default_filters, modules, Options};
use crate::compiler::parser::{ParseUnit, Parser};
use crate::compiler::traversal::Kernel;

/// What a single-unit conversion produces: the emitted text plus the
/// buffer name it was emitted for (batch callers report results keyed
/// by this rather than by array position, since a batch run may
/// complete out of submission order).
#[derive(Debug, Clone)]
pub struct ConvertOutput {
    pub code: String,
    pub source_buffer_name: Arc<str>,
}

/// Parse `source` and run it through the filter pipeline and emitter.
/// This is the translator's single entry point for one file; batch runs
/// (`convert_batch`) are built on top of it, not the other way around.
#[instrument(skip(parser, source, options), fields(buffer = buffer_name))]
pub fn convert(parser: &dyn Parser, source: &str, buffer_name: &str, options: Options) -> Result<ConvertOutput, CompileError> {
    let unit = parser.parse(source, buffer_name)?;
    convert_unit(parser, unit, options)
}

/// As [`convert`], but consults a shared [`ParseCache`] first — the path
/// a batch driver takes when the same file may be seen more than once
/// across a run (a `require`d file pulled in by several entry points).
pub fn convert_with_cache(cache: &ParseCache, parser: &dyn Parser, source: &str, buffer_name: &str, options: Options) -> Result<ConvertOutput, CompileError> {
    let unit = cache.get_or_parse(parser, source, buffer_name)?;
    convert_unit(parser, (*unit).clone(), options)
}

fn convert_unit(parser: &dyn Parser, unit: ParseUnit, options: Options) -> Result<ConvertOutput, CompileError> {
    let filters = build_default_filters(&options)?;
    let mut kernel = Kernel::new(&filters, options);
    for comment in &unit.comments {
        kernel.pragmas.scan_comment(&comment.loc, &comment.text);
    }
    let root = kernel.process(unit.root);
    if let Some(err) = kernel.security_error.take() {
        return Err(err);
    }
    let root = match modules::build_autoexports(&kernel.namespace.top_level_names(), kernel.options.autoexports) {
        Some(export) => append_top_level_statement(root, export),
        None => root,
    };

    let mut prepend = kernel.polyfills.prelude_nodes();
    let mut requires = kernel.prepend.clone();
    resolve_recursive_imports(parser, &mut requires, &kernel.options);
    prepend.extend(requires);

    debug!(polyfills = prepend.len(), "emitting translation unit");

    let emitter = Emitter::default();
    let code = emitter.emit_program(&prepend, &root)?;
    Ok(ConvertOutput { code, source_buffer_name: unit.source_buffer_name })
}

/// `require_recursive` (§4.4.5, SPEC_FULL.md C10): for each hoisted
/// `Import` the `require`/`require_relative` filter flagged recursive,
/// read the referenced file off disk relative to the importing unit's
/// own path, run it through a fresh filter pipeline, and record its
/// top-level binding names on the `Import` node so the emitter prints a
/// named `import { a, b } from "./path"` instead of a bare side-effect
/// import. A path that doesn't resolve to a readable file (an external
/// package name, or a file not present on this machine) is left as a
/// plain import — the recursive walk is best-effort, not a hard error,
/// matching `require`'s own source-language semantics of tolerating
/// load-path-resolved names this filter never sees as local paths.
fn resolve_recursive_imports(parser: &dyn Parser, imports: &mut [Node], options: &Options) {
    for node in imports.iter_mut() {
        if node.kind != Tag::Import {
            continue;
        }
        if !matches!(node.children.get(1), Some(Value::Bool(true))) {
            continue;
        }
        if node.children.get(2).is_some() {
            continue;
        }
        let Some(path) = node.name_at(0) else { continue };
        if !path.starts_with("./") {
            continue;
        }
        let Some(names) = resolve_export_names(parser, path, options) else { continue };
        if names.is_empty() {
            continue;
        }
        let mut children: Vec<Value> = node.children.as_ref().clone();
        children.push(Value::List(names.into_iter().map(Value::Str).collect()));
        *node = node.updated(None, Some(children));
    }
}

/// Reads and processes the file `import_path` (resolved relative to the
/// importing unit's own `options.file`) and returns its top-level
/// binding names, or `None` if the file can't be found/read. Tries the
/// path as given, then with the importing file's own extension appended,
/// since `require_relative './helpers'` omits it the way Ruby's loader
/// does.
fn resolve_export_names(parser: &dyn Parser, import_path: &str, options: &Options) -> Option<Vec<String>> {
    let base_dir = options.file.as_deref().and_then(|f| std::path::Path::new(f).parent());
    let relative = import_path.strip_prefix("./").unwrap_or(import_path);
    let candidate = base_dir.map(|dir| dir.join(relative)).unwrap_or_else(|| std::path::PathBuf::from(relative));
    let extension = options.file.as_deref().and_then(|f| std::path::Path::new(f).extension()).unwrap_or_else(|| std::ffi::OsStr::new("rb"));
    let with_ext = candidate.with_extension(extension);
    let (resolved_path, source) = match std::fs::read_to_string(&candidate) {
        Ok(s) => (candidate, s),
        Err(_) => (with_ext.clone(), std::fs::read_to_string(&with_ext).ok()?),
    };
    let buffer_name = resolved_path.to_string_lossy().into_owned();
    let unit = parser.parse(&source, &buffer_name).ok()?;
    let nested_options = Options { file: Some(buffer_name), ..Options::default() };
    let filters = build_default_filters(&nested_options).ok()?;
    let mut kernel = Kernel::new(&filters, nested_options);
    kernel.process(unit.root);
    Some(kernel.namespace.top_level_names())
}

/// Appends `stmt` (the synthesized autoexports declaration) to a unit's
/// top-level statement sequence: if `root` is already a `Begin`, `stmt`
/// joins its children; otherwise `root` was a single bare expression and
/// both are wrapped in a fresh `Begin`.
fn append_top_level_statement(root: Node, stmt: Node) -> Node {
    if root.kind == Tag::Begin {
        let mut children: Vec<Value> = root.children.as_ref().clone();
        children.push(Value::Node(stmt));
        root.updated(None, Some(children))
    } else {
        Node::of(Tag::Begin, [root, stmt])
    }
}

/// One file submitted to [`convert_batch`]: its buffer name and source
/// text.
pub struct BatchUnit {
    pub buffer_name: String,
    pub source: String,
}

/// Converts every unit in `units` in parallel, returning results in the
/// same order they were submitted (`par_iter().map()` preserves input
/// order even though the work itself runs out of order across the pool).
/// A cache is shared across the whole batch so a file reachable from
/// more than one entry point via `require` only parses once.
pub fn convert_batch(parser: &(dyn Parser + Sync), units: &[BatchUnit], options: &Options) -> Vec<Result<ConvertOutput, CompileError>> {
    let cache = ParseCache::default();
    units
        .par_iter()
        .map(|unit| convert_with_cache(&cache, parser, &unit.source, &unit.buffer_name, options.clone()))
        .collect()
}
