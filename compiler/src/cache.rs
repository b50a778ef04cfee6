//! A small LRU cache from pattern text and options to compiled programs.
//!
//! Repeated one-shot calls against the same pattern otherwise pay the full
//! parse-and-emit cost every time. Entries are shared out as
//! [`Arc<Instructions>`] so a cached program stays alive in callers even
//! after eviction.

use std::sync::Arc;

use relin_runtime::Instructions;

use crate::compiler::{compile, Options};
use crate::error::Error;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, PartialEq, Eq)]
struct CacheKey {
    pattern: String,
    options: Options,
}

/// A bounded most-recently-used cache of compiled programs, keyed on the
/// pattern text together with the options it was compiled under.
#[derive(Debug)]
pub struct ProgramCache {
    capacity: usize,
    /// Most recently used first. Linear scans are fine at the capacities
    /// this cache runs at.
    entries: Vec<(CacheKey, Arc<Instructions>)>,
}

impl ProgramCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached program for `pattern` under `options`, compiling
    /// and inserting it on a miss. A compile failure is returned as-is and
    /// caches nothing.
    pub fn get_or_compile(
        &mut self,
        pattern: &str,
        options: Options,
    ) -> Result<Arc<Instructions>, Error> {
        let hit = self
            .entries
            .iter()
            .position(|(key, _)| key.options == options && key.pattern == pattern);
        if let Some(idx) = hit {
            let entry = self.entries.remove(idx);
            let program = Arc::clone(&entry.1);
            self.entries.insert(0, entry);
            return Ok(program);
        }

        let program = Arc::new(compile(pattern, options)?);
        let key = CacheKey {
            pattern: pattern.to_string(),
            options,
        };
        self.entries.insert(0, (key, Arc::clone(&program)));
        self.entries.truncate(self.capacity);

        Ok(program)
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
