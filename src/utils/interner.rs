//! Global String Interner
//!
//! Converts strings into compact integer [`Symbol`]s for comparison and
//! hashing. Macro and property names flow through every hot path of the
//! variant pipeline, so they are interned once and compared as integers
//! thereafter.

use lasso::{Spur, ThreadedRodeo};
use std::sync::OnceLock;

static INTERNER: OnceLock<ThreadedRodeo> = OnceLock::new();

/// Symbol type alias.
///
/// A Symbol is a compact integer identifier that supports cheap comparison
/// and hashing.
pub type Symbol = Spur;

fn interner() -> &'static ThreadedRodeo {
    INTERNER.get_or_init(ThreadedRodeo::new)
}

/// Intern a string, returning its Symbol.
///
/// Returns the existing Symbol if the string is already in the pool,
/// otherwise adds it and returns a fresh one.
#[inline]
pub fn intern(s: &str) -> Symbol {
    interner().get_or_intern(s)
}

/// Look up the Symbol of an already-interned string.
///
/// Returns `None` if the string was never interned. Does not allocate.
#[inline]
#[must_use]
pub fn get(s: &str) -> Option<Symbol> {
    interner().get(s)
}

/// Resolve a Symbol back to its string.
///
/// # Panics
/// Panics if the Symbol is invalid (cannot happen for symbols produced by
/// [`intern`]).
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    interner().resolve(&sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_resolve() {
        let s1 = intern("hello");
        let s2 = intern("hello");
        let s3 = intern("world");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);

        assert_eq!(resolve(s1), "hello");
        assert_eq!(resolve(s3), "world");
    }

    #[test]
    fn get_does_not_allocate() {
        let _ = intern("existing");

        assert!(get("existing").is_some());
        assert!(get("never_interned_name").is_none());
    }
}
