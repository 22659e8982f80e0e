//! Macro Bitmask Set
//!
//! A growable array of 32-bit words representing the enabled feature flags of
//! one data scope (scene / camera / renderer / material). Draw-time variant
//! selection unions the four scopes' sets into a single compile key, so the
//! word array is kept as short as possible: the logical length never
//! advertises trailing all-zero words, which keeps union and comparison cheap
//! for sparse sets.
//!
//! Equality and hashing cover the word array only. Two sets with identical
//! words are identical cache keys regardless of the order their flags were
//! enabled in, and the variable table is fully implied by the word bits
//! (every (name, value) pair owns its own bit slot).

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::errors::Result;
use crate::shader::macros::{MacroRegistry, ShaderMacro};
use crate::utils::interner::{self, Symbol};

/// Bitmask collection of currently-enabled macros for one scope.
///
/// A value type: owned exclusively by its scope, mutated only through that
/// scope's enable/disable calls, cleared freely.
#[derive(Debug, Clone, Default)]
pub struct MacroSet {
    /// Bit `b` of word `w` is set iff the macro at slot `(w, b)` is enabled.
    /// Trailing all-zero words are always trimmed.
    words: SmallVec<[u32; 4]>,
    /// Variable macro name → currently enabled value macro, sorted by name
    /// symbol. At most one active value per variable name.
    variables: Vec<(Symbol, ShaderMacro)>,
}

impl MacroSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a macro.
    ///
    /// For value macros this first disables any previously enabled value
    /// under the same name, so at most one value per variable name is active.
    pub fn enable(&mut self, m: ShaderMacro) {
        if m.value_symbol().is_some() {
            match self
                .variables
                .binary_search_by_key(&m.name_symbol(), |&(k, _)| k)
            {
                Ok(idx) => {
                    let previous = self.variables[idx].1;
                    if previous != m {
                        self.clear_bit(previous);
                        self.variables[idx].1 = m;
                    }
                }
                Err(idx) => self.variables.insert(idx, (m.name_symbol(), m)),
            }
        }
        self.set_bit(m);
        // Replacing a variable's value may have cleared the highest word.
        self.trim();
    }

    /// Enable a value-carrying macro, allocating its slot if needed.
    pub fn enable_variable(
        &mut self,
        registry: &MacroRegistry,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let m = registry.get_or_create_value(name, value)?;
        self.enable(m);
        Ok(())
    }

    /// Disable a macro. Disabling a macro that is not enabled is a no-op.
    pub fn disable(&mut self, m: ShaderMacro) {
        self.clear_bit(m);
        self.trim();
        if m.value_symbol().is_some()
            && let Ok(idx) = self
                .variables
                .binary_search_by_key(&m.name_symbol(), |&(k, _)| k)
            && self.variables[idx].1 == m
        {
            self.variables.remove(idx);
        }
    }

    /// Disable by name, covering both boolean and value-carrying macros.
    ///
    /// Unknown names are a no-op, not an error.
    pub fn disable_by_name(&mut self, registry: &MacroRegistry, name: &str) {
        let Some(name_sym) = interner::get(name) else {
            return;
        };
        if let Ok(idx) = self.variables.binary_search_by_key(&name_sym, |&(k, _)| k) {
            let m = self.variables.remove(idx).1;
            self.clear_bit(m);
            self.trim();
            return;
        }
        if let Some(m) = registry.get(name) {
            self.clear_bit(m);
            self.trim();
        }
    }

    /// Whether the given macro is enabled.
    #[must_use]
    pub fn is_enabled(&self, m: ShaderMacro) -> bool {
        self.words
            .get(m.word())
            .is_some_and(|&word| word & m.mask() != 0)
    }

    /// Whether any macro with the given name is enabled (boolean form or any
    /// value form).
    #[must_use]
    pub fn is_enabled_name(&self, registry: &MacroRegistry, name: &str) -> bool {
        let Some(name_sym) = interner::get(name) else {
            return false;
        };
        if self
            .variables
            .binary_search_by_key(&name_sym, |&(k, _)| k)
            .is_ok()
        {
            return true;
        }
        registry.get(name).is_some_and(|m| self.is_enabled(m))
    }

    /// The current value of a variable macro.
    ///
    /// Returns the sentinel `"0"` when the variable is absent or disabled,
    /// which composed source uses directly as a numeric fallback.
    #[must_use]
    pub fn variable_value(&self, name: &str) -> Cow<'static, str> {
        let Some(name_sym) = interner::get(name) else {
            return Cow::Borrowed("0");
        };
        match self.variables.binary_search_by_key(&name_sym, |&(k, _)| k) {
            Ok(idx) => self.variables[idx]
                .1
                .value()
                .map_or(Cow::Borrowed("0"), Cow::Borrowed),
            Err(_) => Cow::Borrowed("0"),
        }
    }

    // ── Set algebra ──────────────────────────────────────────────────────────

    /// Word-wise OR with `other`. Missing words are treated as zero.
    ///
    /// Variable tables merge first-writer-wins: a name already present in
    /// `self` keeps its value.
    pub fn union_with(&mut self, other: &MacroSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (i, &word) in other.words.iter().enumerate() {
            self.words[i] |= word;
        }
        for &(name, m) in &other.variables {
            if let Err(idx) = self.variables.binary_search_by_key(&name, |&(k, _)| k) {
                self.variables.insert(idx, (name, m));
            }
        }
    }

    /// Returns the union of two sets without mutating either.
    #[must_use]
    pub fn union(&self, other: &MacroSet) -> MacroSet {
        let mut merged = self.clone();
        merged.union_with(other);
        merged
    }

    /// Word-wise AND with `other`; the result's length re-trims.
    pub fn intersect_with(&mut self, other: &MacroSet) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(i).copied().unwrap_or(0);
        }
        self.trim();
        self.retain_live_variables();
    }

    /// Clears every bit of `self` that is set in `other`.
    pub fn subtract_with(&mut self, other: &MacroSet) {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= !other.words.get(i).copied().unwrap_or(0);
        }
        self.trim();
        self.retain_live_variables();
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// Logical word length. The highest index with a nonzero word is
    /// `len() - 1`; an empty set has length zero.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The raw word array, trailing zeros trimmed.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Clears every flag and variable.
    pub fn clear(&mut self) {
        self.words.clear();
        self.variables.clear();
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn set_bit(&mut self, m: ShaderMacro) {
        if m.word() >= self.words.len() {
            self.words.resize(m.word() + 1, 0);
        }
        self.words[m.word()] |= m.mask();
    }

    fn clear_bit(&mut self, m: ShaderMacro) {
        if let Some(word) = self.words.get_mut(m.word()) {
            *word &= !m.mask();
        }
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    fn retain_live_variables(&mut self) {
        let words = &self.words;
        self.variables.retain(|&(_, m)| {
            words
                .get(m.word())
                .is_some_and(|&word| word & m.mask() != 0)
        });
    }
}

impl PartialEq for MacroSet {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
    }
}

impl Eq for MacroSet {}

impl Hash for MacroSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MacroRegistry {
        MacroRegistry::default()
    }

    #[test]
    fn enable_disable_round_trip_restores_empty() {
        let reg = registry();
        // Push the slot past the first word so length trimming is exercised.
        for i in 0..33 {
            reg.get_or_create(&format!("PAD_{i}"));
        }
        let high = reg.get_or_create("HIGH_BIT");
        assert_eq!(high.word(), 1);

        let mut set = MacroSet::new();
        set.enable(high);
        assert!(set.is_enabled(high));
        assert_eq!(set.len(), 2);

        set.disable(high);
        assert!(!set.is_enabled(high));
        assert_eq!(set.len(), 0);
        assert_eq!(set, MacroSet::new());
    }

    #[test]
    fn union_is_commutative_and_bit_exact() {
        let reg = registry();
        let a_macro = reg.get_or_create("A");
        let b_macro = reg.get_or_create("B");
        let c_macro = reg.get_or_create("C");

        let mut a = MacroSet::new();
        a.enable(a_macro);
        a.enable(c_macro);

        let mut b = MacroSet::new();
        b.enable(b_macro);

        let ab = a.union(&b);
        let ba = b.union(&a);

        for m in [a_macro, b_macro, c_macro] {
            assert!(ab.is_enabled(m));
            assert!(ba.is_enabled(m));
        }
        assert_eq!(ab, ba);
        assert_eq!(ab.words(), ba.words());
    }

    #[test]
    fn union_handles_unequal_lengths() {
        let reg = registry();
        for i in 0..64 {
            reg.get_or_create(&format!("U{i}"));
        }
        let low = reg.get_or_create("U0");
        let high = reg.get_or_create("U63");

        let mut short = MacroSet::new();
        short.enable(low);

        let mut long = MacroSet::new();
        long.enable(high);

        let merged = short.union(&long);
        assert_eq!(merged.len(), 2);
        assert!(merged.is_enabled(low));
        assert!(merged.is_enabled(high));
    }

    #[test]
    fn subtract_trims_length() {
        let reg = registry();
        for i in 0..33 {
            reg.get_or_create(&format!("S{i}"));
        }
        let low = reg.get_or_create("S0");
        let high = reg.get_or_create("S32");

        let mut set = MacroSet::new();
        set.enable(low);
        set.enable(high);
        assert_eq!(set.len(), 2);

        let mut high_only = MacroSet::new();
        high_only.enable(high);

        set.subtract_with(&high_only);
        assert_eq!(set.len(), 1);
        assert!(set.is_enabled(low));
        assert!(!set.is_enabled(high));
    }

    #[test]
    fn intersect_keeps_common_bits_only() {
        let reg = registry();
        let a = reg.get_or_create("IA");
        let b = reg.get_or_create("IB");
        let c = reg.get_or_create("IC");

        let mut left = MacroSet::new();
        left.enable(a);
        left.enable(b);

        let mut right = MacroSet::new();
        right.enable(b);
        right.enable(c);

        left.intersect_with(&right);
        assert!(!left.is_enabled(a));
        assert!(left.is_enabled(b));
        assert!(!left.is_enabled(c));
    }

    #[test]
    fn variable_keeps_single_active_value() {
        let reg = registry();
        let mut set = MacroSet::new();

        set.enable_variable(&reg, "LIGHT_COUNT", "2").unwrap();
        assert_eq!(set.variable_value("LIGHT_COUNT"), "2");

        set.enable_variable(&reg, "LIGHT_COUNT", "4").unwrap();
        assert_eq!(set.variable_value("LIGHT_COUNT"), "4");

        let two = reg.get_or_create_value("LIGHT_COUNT", "2").unwrap();
        let four = reg.get_or_create_value("LIGHT_COUNT", "4").unwrap();
        assert!(!set.is_enabled(two));
        assert!(set.is_enabled(four));
    }

    #[test]
    fn variable_replacement_trims_length() {
        let reg = registry();
        let low = reg.get_or_create_value("SHADOW_CASCADES", "1").unwrap();
        for i in 0..33 {
            reg.get_or_create(&format!("TPAD_{i}"));
        }
        let high = reg.get_or_create_value("SHADOW_CASCADES", "4").unwrap();
        assert_eq!(high.word(), 1);

        let mut set = MacroSet::new();
        set.enable(high);
        assert_eq!(set.len(), 2);

        // Replacing the high-slot value with the low-slot one must shrink
        // the logical length along with clearing the old bit.
        set.enable(low);
        assert_eq!(set.variable_value("SHADOW_CASCADES"), "1");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn variable_value_sentinel_is_zero() {
        let reg = registry();
        let mut set = MacroSet::new();
        assert_eq!(set.variable_value("NEVER_SET"), "0");

        set.enable_variable(&reg, "BONE_COUNT", "32").unwrap();
        set.disable_by_name(&reg, "BONE_COUNT");
        assert_eq!(set.variable_value("BONE_COUNT"), "0");
    }

    #[test]
    fn disable_unknown_name_is_noop() {
        let reg = registry();
        let mut set = MacroSet::new();
        set.enable(reg.get_or_create("KNOWN"));
        set.disable_by_name(&reg, "COMPLETELY_UNKNOWN_MACRO");
        assert!(set.is_enabled_name(&reg, "KNOWN"));
    }

    #[test]
    fn equality_ignores_construction_order() {
        let reg = registry();
        let a = reg.get_or_create("EQ_A");
        let b = reg.get_or_create("EQ_B");

        let mut forward = MacroSet::new();
        forward.enable(a);
        forward.enable(b);

        let mut backward = MacroSet::new();
        backward.enable(b);
        backward.enable(a);

        assert_eq!(forward, backward);

        use std::hash::{BuildHasher, Hash, Hasher};
        let bh = rustc_hash::FxBuildHasher;
        let hash = |set: &MacroSet| {
            let mut h = bh.build_hasher();
            set.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&forward), hash(&backward));
    }
}
