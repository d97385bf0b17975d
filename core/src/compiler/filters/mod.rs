//! The filter framework (§4.3, C3): options, ES-level gating, comment
//! pragmas, and the rewrite-rule filters themselves.

pub mod blocks;
pub mod classes;
pub mod collections;
pub mod declarations;
pub mod exceptions;
pub mod hashes;
pub mod modules;
pub mod numeric;
pub mod operators;
pub mod pragma;
pub mod slicing;
pub mod strings;
pub mod structural;
pub mod truthy;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compiler::error::CompileError;
use crate::compiler::traversal::Filter;

/// Target-version dial (§4.3). Gates which emission forms and rewrites
/// are permitted; `es2015()`..`es2025()` predicates on [`Options`]
/// derive from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EsLevel {
    Es2015,
    Es2017,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    Es2023,
    Es2024,
    Es2025,
}

impl Default for EsLevel {
    fn default() -> Self {
        EsLevel::Es2022
    }
}

/// Selects `||` vs nullish `??` for disjunction by default (the `or`
/// option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrStyle {
    Logical,
    Nullish,
}

impl Default for OrStyle {
    fn default() -> Self {
        OrStyle::Logical
    }
}

/// The options map from §4.3, as a plain struct rather than an untyped
/// map so construction is checked at compile time; `Options::default()`
/// matches the reference toolkit's common pattern of a `Default`-derived
/// config struct layered under CLI/file overrides (see
/// `crate::cli::EarlyCliArgs`-style layering, described in
/// `SPEC_FULL.md` §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub eslevel: EsLevel,
    /// Ordered list of filter names to run; empty means "use the
    /// default list" (`filters::default_pipeline()`).
    pub filters: Vec<String>,
    /// Methods to rewrite even when no parentheses disambiguate them.
    pub include: HashSet<String>,
    pub include_all: bool,
    /// Methods to pass through unchanged.
    pub exclude: HashSet<String>,
    pub autoexports: AutoExports,
    /// Bare name -> module path, for lazy import injection.
    pub autoimports: HashMap<String, String>,
    pub require_recursive: bool,
    pub or: OrStyle,
    pub nullish_to_s: bool,
    /// Source path; controls relative import resolution.
    pub file: Option<String>,
    /// `truthy: ruby` — replicate source truthiness at runtime via
    /// `$T`/`$ror`/`$rand` wrappers.
    pub truthy_ruby: bool,
    /// Private-field naming: `#name` when true (requires ES2020+),
    /// else `_name`. Defaults to ES-level-driven when unset.
    pub private_fields: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoExports {
    Off,
    On,
    Default,
}

impl Default for AutoExports {
    fn default() -> Self {
        AutoExports::Off
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            eslevel: EsLevel::default(),
            filters: Vec::new(),
            include: HashSet::new(),
            include_all: false,
            exclude: HashSet::new(),
            autoexports: AutoExports::default(),
            autoimports: HashMap::new(),
            require_recursive: false,
            or: OrStyle::default(),
            nullish_to_s: false,
            file: None,
            truthy_ruby: false,
            private_fields: None,
        }
    }
}

macro_rules! es_level_predicate {
    ($name:ident, $level:ident) => {
        pub fn $name(&self) -> bool {
            self.eslevel >= EsLevel::$level
        }
    };
}

impl Options {
    es_level_predicate!(es2015, Es2015);
    es_level_predicate!(es2017, Es2017);
    es_level_predicate!(es2019, Es2019);
    es_level_predicate!(es2020, Es2020);
    es_level_predicate!(es2021, Es2021);
    es_level_predicate!(es2022, Es2022);
    es_level_predicate!(es2023, Es2023);
    es_level_predicate!(es2024, Es2024);
    es_level_predicate!(es2025, Es2025);

    /// Whether `name` should be rewritten despite lacking disambiguating
    /// parens: either explicitly included, or blanket `include_all` is
    /// set and the name isn't explicitly excluded.
    pub fn should_rewrite_bare(&self, name: &str) -> bool {
        if self.exclude.contains(name) {
            return false;
        }
        self.include.contains(name) || self.include_all
    }

    pub fn excluded(&self, name: &str) -> bool {
        self.exclude.contains(name)
    }

    /// `#name` when ES2020+ private fields are available and the caller
    /// hasn't forced `_name`, else the underscore-prefixed fallback.
    pub fn use_private_fields(&self) -> bool {
        self.private_fields.unwrap_or_else(|| self.es2020())
    }
}

/// The default filter pipeline, in the order a fresh `Options` without
/// an explicit `filters` list runs them. `reorder` hooks may still
/// permute this at runtime (§4.3 "filter reordering").
pub fn default_pipeline_names() -> Vec<String> {
    [
        "pragma",
        "require",
        "truthy",
        "operators",
        "declarations",
        "type_tests",
        "numeric",
        "strings",
        "hashes",
        "slicing",
        "collections",
        "blocks",
        "exceptions",
        "classes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Construct the standard set of filter instances, keyed by name, ready
/// for `crate::compiler::traversal::order_filters` and then execution.
///
/// `structural::StructuralFilter` is always appended after whatever
/// `names` resolves to, never subject to a custom `filters:` override —
/// it's the traversal-completeness fallback (see its module docs), not
/// a rewrite rule someone would reasonably want to omit.
///
/// Fails with [`CompileError::configuration`] if `options.filters` names
/// a filter this build doesn't recognize, rather than silently dropping
/// it from the pipeline.
pub fn build_default_filters(options: &Options) -> Result<Vec<Arc<dyn Filter>>, CompileError> {
    let names = if options.filters.is_empty() {
        default_pipeline_names()
    } else {
        options.filters.clone()
    };

    let mut by_name: HashMap<String, Arc<dyn Filter>> = HashMap::new();
    by_name.insert("pragma".into(), Arc::new(pragma::PragmaFilter::new()));
    by_name.insert("require".into(), Arc::new(modules::RequireFilter::default()));
    by_name.insert("truthy".into(), Arc::new(truthy::TruthyFilter));
    by_name.insert("operators".into(), Arc::new(operators::OperatorFilter));
    by_name.insert("declarations".into(), Arc::new(declarations::DeclarationFilter));
    by_name.insert("type_tests".into(), Arc::new(type_tests::TypeTestFilter));
    by_name.insert("numeric".into(), Arc::new(numeric::NumericFilter));
    by_name.insert("strings".into(), Arc::new(strings::StringFilter));
    by_name.insert("hashes".into(), Arc::new(hashes::HashFilter));
    by_name.insert("slicing".into(), Arc::new(slicing::SlicingFilter));
    by_name.insert("collections".into(), Arc::new(collections::CollectionFilter));
    by_name.insert("blocks".into(), Arc::new(blocks::BlockFilter));
    by_name.insert("exceptions".into(), Arc::new(exceptions::ExceptionFilter));
    by_name.insert("classes".into(), Arc::new(classes::ClassFilter::default()));

    let by_ref: HashMap<String, &dyn Filter> = by_name.iter().map(|(k, v)| (k.clone(), v.as_ref())).collect();
    let ordered = crate::compiler::traversal::order_filters(names, &by_ref);

    let mut filters: Vec<Arc<dyn Filter>> = Vec::with_capacity(ordered.len() + 1);
    for name in ordered {
        match by_name.get(&name) {
            Some(filter) => filters.push(filter.clone()),
            None => return Err(CompileError::configuration(format!("unknown filter `{name}`"))),
        }
    }
    filters.push(Arc::new(structural::StructuralFilter));
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn es_level_predicates_are_monotonic() {
        let mut opts = Options { eslevel: EsLevel::Es2015, ..Options::default() };
        assert!(opts.es2015());
        assert!(!opts.es2020());
        opts.eslevel = EsLevel::Es2022;
        assert!(opts.es2015() && opts.es2020() && opts.es2022());
        assert!(!opts.es2024());
    }

    #[test]
    fn include_all_respects_explicit_exclude() {
        let opts = Options {
            include_all: true,
            exclude: ["keys".to_string()].into_iter().collect(),
            ..Options::default()
        };
        assert!(!opts.should_rewrite_bare("keys"));
        assert!(opts.should_rewrite_bare("values"));
    }

    #[test]
    fn build_default_filters_honors_reorder_hooks() {
        // A custom `filters:` list that doesn't already put `pragma`
        // first must still end up with it first: `PragmaFilter::reorder`
        // forces the constraint, and `build_default_filters` must
        // actually run `order_filters` for that hook to take effect.
        let opts = Options {
            filters: vec!["classes".to_string(), "truthy".to_string(), "pragma".to_string()],
            ..Options::default()
        };
        let filters = build_default_filters(&opts).unwrap();
        assert_eq!(filters.first().unwrap().name(), "pragma");
    }

    #[test]
    fn build_default_filters_rejects_an_unknown_filter_name() {
        let opts = Options { filters: vec!["not_a_real_filter".to_string()], ..Options::default() };
        let err = build_default_filters(&opts).unwrap_err();
        assert!(matches!(err, CompileError::Configuration { .. }));
        assert!(err.to_string().contains("not_a_real_filter"));
    }
}
