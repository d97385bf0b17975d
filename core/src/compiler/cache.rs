//! The parsed-unit cache (SPEC_FULL.md §5, "added" — C10). Re-parsing an
//! unchanged file on every batch run is pure waste for the common case
//! of a project where most files don't change between invocations; this
//! mirrors the toolkit's own `MetadataCache`/`ContentCache` `LruCache`
//! wrapping in `crate::lib` (keyed there by template URI, here by
//! buffer name + content hash).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::compiler::error::CompileError;
use crate::compiler::parser::{ParseUnit, Parser};

const DEFAULT_CAPACITY: usize = 256;

fn cache_key(buffer_name: &str, source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    buffer_name.hash(&mut hasher);
    source.hash(&mut hasher);
    hasher.finish()
}

/// A bounded cache from `(buffer name, source text)` to the parser's
/// output. Safe to share across a batch run's worker threads; a miss
/// parses under the lock held only long enough to insert, not for the
/// parse itself held elsewhere (the lock here is intentionally held
/// across `parser.parse` too, since the cache's whole point is that two
/// threads racing on the same file should parse it once, not twice).
pub struct ParseCache {
    inner: Mutex<LruCache<u64, Arc<ParseUnit>>>,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap());
        ParseCache { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get_or_parse(&self, parser: &dyn Parser, source: &str, buffer_name: &str) -> Result<Arc<ParseUnit>, CompileError> {
        let key = cache_key(buffer_name, source);
        let mut guard = self.inner.lock().expect("parse cache mutex poisoned");
        if let Some(hit) = guard.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let unit = parser.parse(source, buffer_name)?;
        let arc = Arc::new(unit);
        guard.put(key, Arc::clone(&arc));
        Ok(arc)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("parse cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        ParseCache::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::Tag;
    use crate::compiler::parser::SexpTestParser;

    struct CountingParser {
        calls: Mutex<u32>,
    }

    impl Parser for CountingParser {
        fn parse(&self, source: &str, buffer_name: &str) -> Result<ParseUnit, CompileError> {
            *self.calls.lock().unwrap() += 1;
            SexpTestParser.parse(source, buffer_name)
        }
    }

    #[test]
    fn repeated_lookup_parses_once() {
        let cache = ParseCache::default();
        let parser = CountingParser { calls: Mutex::new(0) };
        let first = cache.get_or_parse(&parser, "", "a.rb").unwrap();
        let second = cache.get_or_parse(&parser, "", "a.rb").unwrap();
        assert_eq!(first.root.kind, Tag::Nil);
        assert_eq!(second.root.kind, Tag::Nil);
        assert_eq!(*parser.calls.lock().unwrap(), 1);
    }

    #[test]
    fn different_source_is_a_distinct_key() {
        let cache = ParseCache::default();
        let parser = CountingParser { calls: Mutex::new(0) };
        cache.get_or_parse(&parser, "", "a.rb").unwrap();
        cache.get_or_parse(&parser, "", "b.rb").unwrap();
        assert_eq!(cache.len(), 2);
    }
}
