//! Cache key definitions.
//!
//! A key is the route identity followed by the canonical values of every parameter that
//! reaches upstream, joined with `:`. Values are escaped so that a `:` inside a value can
//! never make two different parameter sets collide.

use std::fmt;

/// Deterministic index into the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a route prefix (e.g. `"neo:feed"`) and canonical parameter values.
    pub fn compose(route: &str, parts: &[&str]) -> Self {
        let mut key = String::from(route);
        for part in parts {
            key.push(':');
            escape_into(part, &mut key);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_into(part: &str, out: &mut String) {
    for ch in part.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            other => out.push(other),
        }
    }
}
