//! Shader Macro Registry
//!
//! Every named shader feature flag gets a stable (word, bit) slot on first
//! use, so a scope's enabled-flag state can be held as a plain bitmask and
//! compared in O(words). Macros are interned and cached by `name` (or
//! `name + value` for value-carrying macros); they are never destroyed during
//! the process lifetime — a run rarely sees more than a few hundred flags.
//!
//! The registry is an explicit object (shared through
//! [`ShaderContext`](crate::shader::ShaderContext)), not a language-level
//! global, so multiple independent engine instances can coexist in one
//! process and tests stay hermetic.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};
use crate::shader::macro_set::MacroSet;
use crate::utils::interner::{self, Symbol};

/// Default cap on distinct values per variable macro name.
///
/// Value-carrying macros (e.g. a light count baked into an array size) each
/// occupy their own bit slot, so an unbounded value domain would grow the
/// variant cache without limit. See `RendererSettings::variable_value_cap`.
pub const DEFAULT_VARIABLE_VALUE_CAP: u32 = 64;

/// A named shader feature flag with a fixed bit slot.
///
/// Copy handle; the registry owns the backing data. Two macros are equal iff
/// they refer to the same slot, which in turn means the same name (+ value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderMacro {
    name: Symbol,
    value: Option<Symbol>,
    word: u16,
    bit: u8,
}

impl ShaderMacro {
    /// The macro name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.name)
    }

    /// The carried value, for value macros.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&'static str> {
        self.value.map(interner::resolve)
    }

    #[inline]
    #[must_use]
    pub(crate) fn name_symbol(&self) -> Symbol {
        self.name
    }

    #[inline]
    #[must_use]
    pub(crate) fn value_symbol(&self) -> Option<Symbol> {
        self.value
    }

    /// Index of the 32-bit word holding this macro's bit.
    #[inline]
    #[must_use]
    pub fn word(&self) -> usize {
        self.word as usize
    }

    /// Bit mask of this macro within its word.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> u32 {
        1 << self.bit
    }

    /// Global slot index (word * 32 + bit).
    #[inline]
    #[must_use]
    pub fn slot(&self) -> usize {
        self.word as usize * 32 + self.bit as usize
    }
}

/// A resolved macro definition, as reverse-mapped from a [`MacroSet`].
///
/// Used to build the variant's define block and for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroDefine {
    pub name: &'static str,
    pub value: Option<&'static str>,
}

#[derive(Default)]
struct RegistryInner {
    /// (name, value) → macro. The cache that makes `get_or_create` O(1).
    by_key: FxHashMap<(Symbol, Option<Symbol>), ShaderMacro>,
    /// Reverse lookup: slot index → (name, value).
    slots: Vec<(Symbol, Option<Symbol>)>,
    /// Distinct-value count per variable macro name.
    value_counts: FxHashMap<Symbol, u32>,
}

/// Process-scoped registry assigning every macro a stable (word, bit) slot.
///
/// Append-only: writes serialize through an `RwLock`, reads are concurrent.
/// There is no removal — slots stay valid for the registry's lifetime.
pub struct MacroRegistry {
    inner: RwLock<RegistryInner>,
    variable_value_cap: u32,
}

impl Default for MacroRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_VARIABLE_VALUE_CAP)
    }
}

impl MacroRegistry {
    #[must_use]
    pub fn new(variable_value_cap: u32) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            variable_value_cap,
        }
    }

    /// Returns the macro for `name`, allocating the next free slot on miss.
    pub fn get_or_create(&self, name: &str) -> ShaderMacro {
        let name_sym = interner::intern(name);
        self.get_or_create_interned(name_sym, None)
            .expect("boolean macros are not capped")
    }

    /// Returns the macro for `name value`, allocating a slot on miss.
    ///
    /// Every distinct (name, value) pair is its own macro with its own bit,
    /// which is what makes the variant-cache key a plain bitmask. The number
    /// of distinct values per name is capped to bound cache growth.
    pub fn get_or_create_value(&self, name: &str, value: &str) -> Result<ShaderMacro> {
        let name_sym = interner::intern(name);
        let value_sym = interner::intern(value);
        self.get_or_create_interned(name_sym, Some(value_sym))
    }

    fn get_or_create_interned(
        &self,
        name: Symbol,
        value: Option<Symbol>,
    ) -> Result<ShaderMacro> {
        if let Some(&m) = self.inner.read().by_key.get(&(name, value)) {
            return Ok(m);
        }

        let mut inner = self.inner.write();
        // Re-check under the write lock: another thread may have won the race.
        if let Some(&m) = inner.by_key.get(&(name, value)) {
            return Ok(m);
        }

        if value.is_some() {
            let count = inner.value_counts.entry(name).or_insert(0);
            if *count >= self.variable_value_cap {
                return Err(PrismError::VariableMacroOverflow {
                    name: interner::resolve(name).to_string(),
                    cap: self.variable_value_cap,
                });
            }
            *count += 1;
        }

        let slot = inner.slots.len();
        inner.slots.push((name, value));
        let m = ShaderMacro {
            name,
            value,
            word: (slot / 32) as u16,
            bit: (slot % 32) as u8,
        };
        inner.by_key.insert((name, value), m);
        Ok(m)
    }

    /// Looks up an existing boolean macro without allocating a slot.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ShaderMacro> {
        let name_sym = interner::get(name)?;
        self.inner.read().by_key.get(&(name_sym, None)).copied()
    }

    /// Number of 32-bit words needed to hold every allocated slot.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.inner.read().slots.len().div_ceil(32)
    }

    /// Number of allocated macro slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().slots.is_empty()
    }

    /// Reverse-maps every set bit of `set` back to its macro definition.
    ///
    /// Iterates only up to the set's logical word length. The result is in
    /// slot order, which is stable across runs of the same registration
    /// sequence.
    #[must_use]
    pub fn defines_for_set(&self, set: &MacroSet) -> Vec<MacroDefine> {
        let inner = self.inner.read();
        let mut defines = Vec::new();
        for (word_index, &word) in set.words().iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                let bit = bits.trailing_zeros();
                bits &= bits - 1;
                let slot = word_index * 32 + bit as usize;
                if let Some(&(name, value)) = inner.slots.get(slot) {
                    defines.push(MacroDefine {
                        name: interner::resolve(name),
                        value: value.map(interner::resolve),
                    });
                }
            }
        }
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_stable_and_cached() {
        let registry = MacroRegistry::default();
        let a = registry.get_or_create("HAS_UV");
        let b = registry.get_or_create("HAS_NORMAL");
        let a2 = registry.get_or_create("HAS_UV");

        assert_eq!(a, a2);
        assert_ne!(a.slot(), b.slot());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn value_macros_get_distinct_slots_per_value() {
        let registry = MacroRegistry::default();
        let two = registry.get_or_create_value("LIGHT_COUNT", "2").unwrap();
        let four = registry.get_or_create_value("LIGHT_COUNT", "4").unwrap();
        let two_again = registry.get_or_create_value("LIGHT_COUNT", "2").unwrap();

        assert_ne!(two.slot(), four.slot());
        assert_eq!(two, two_again);
        assert_eq!(two.value(), Some("2"));
    }

    #[test]
    fn slot_allocation_crosses_word_boundary() {
        let registry = MacroRegistry::default();
        let mut last = registry.get_or_create("M0");
        for i in 1..40 {
            last = registry.get_or_create(&format!("M{i}"));
        }
        assert_eq!(last.word(), 1);
        assert_eq!(registry.word_count(), 2);
    }

    #[test]
    fn variable_value_cap_is_enforced() {
        let registry = MacroRegistry::new(2);
        registry.get_or_create_value("COUNT", "1").unwrap();
        registry.get_or_create_value("COUNT", "2").unwrap();

        let overflow = registry.get_or_create_value("COUNT", "3");
        assert!(matches!(
            overflow,
            Err(PrismError::VariableMacroOverflow { cap: 2, .. })
        ));

        // Existing values are still served from cache.
        registry.get_or_create_value("COUNT", "1").unwrap();
    }

    #[test]
    fn defines_round_trip_through_set() {
        let registry = MacroRegistry::default();
        let uv = registry.get_or_create("HAS_UV");
        let count = registry.get_or_create_value("LIGHT_COUNT", "8").unwrap();

        let mut set = MacroSet::new();
        set.enable(uv);
        set.enable(count);

        let defines = registry.defines_for_set(&set);
        assert_eq!(defines.len(), 2);
        assert!(defines.contains(&MacroDefine { name: "HAS_UV", value: None }));
        assert!(defines.contains(&MacroDefine { name: "LIGHT_COUNT", value: Some("8") }));
    }
}
