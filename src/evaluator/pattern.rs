use crate::core::{Result, SqlError};
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex};

const PATTERN_CACHE_SIZE: usize = 256;

static PATTERN_CACHE: LazyLock<Mutex<LruCache<(String, bool), Arc<Regex>>>> = LazyLock::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(PATTERN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
    ))
});

/// Translate a LIKE pattern (`%`, `_`, backslash escapes) into an anchored regex.
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str(&regex::escape("\\")),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    regex
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Arc<Regex>> {
    let key = (pattern.to_string(), case_insensitive);

    if let Some(regex) = PATTERN_CACHE.lock()?.get(&key) {
        return Ok(Arc::clone(regex));
    }

    let compiled = RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(case_insensitive)
        // `.` must also match newlines inside values
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| SqlError::ExecutionError(format!("Invalid LIKE pattern: {}", e)))?;
    let compiled = Arc::new(compiled);

    PATTERN_CACHE.lock()?.put(key, Arc::clone(&compiled));
    Ok(compiled)
}

pub fn eval_like(text: &str, pattern: &str, case_insensitive: bool) -> Result<bool> {
    // No wildcards or escapes: plain comparison
    if !pattern.contains(['%', '_', '\\']) {
        return Ok(if case_insensitive {
            text.to_lowercase() == pattern.to_lowercase()
        } else {
            text == pattern
        });
    }

    Ok(compile(pattern, case_insensitive)?.is_match(text))
}
