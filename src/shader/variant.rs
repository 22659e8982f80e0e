//! Shader Variant Cache
//!
//! Memoizes the compiled program of every (pass, macro combination) seen so
//! far, so draws and frames never recompile. The key is the **exact** macro
//! word pattern — order-independent but word-position-exact — which makes
//! sets built through different call orders hit the same entry.
//!
//! Two cache levels:
//! - variant level: (pass id, macro words) → [`CompiledVariant`]
//! - module level: xxh3-128 of composed WGSL → `wgpu::ShaderModule`, so two
//!   macro combinations that compose to identical text share one module.
//!
//! The cache is unbounded for the engine's lifetime; shader permutations are
//! assumed small relative to memory, and the variable-macro cardinality cap
//! bounds the worst case. `clear` exists for shutdown and device loss.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::Result;
use crate::shader::bind_point::BindPoint;
use crate::shader::macro_set::MacroSet;
use crate::shader::pass::{ShaderPass, ShaderPassId};

/// Identity of a compiled variant: the pass plus the exact macro words.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pass: ShaderPassId,
    words: SmallVec<[u32; 4]>,
}

impl VariantKey {
    #[must_use]
    pub fn new(pass: ShaderPassId, macros: &MacroSet) -> Self {
        Self {
            pass,
            words: SmallVec::from_slice(macros.words()),
        }
    }
}

/// A compiled shader program for one (pass, macro set) combination.
///
/// Immutable once inserted into the cache; shared as `Arc`.
pub struct CompiledVariant {
    pub pass: ShaderPassId,
    pub vertex_module: wgpu::ShaderModule,
    pub fragment_module: wgpu::ShaderModule,
    /// Bind points referenced by the vertex stage.
    pub vertex_bind_points: Vec<BindPoint>,
    /// Bind points referenced by the fragment stage.
    pub fragment_bind_points: Vec<BindPoint>,
    /// xxh3-128 of the composed vertex source (pipeline cache key input).
    pub vertex_source_hash: u128,
    /// xxh3-128 of the composed fragment source.
    pub fragment_source_hash: u128,
}

impl CompiledVariant {
    /// The highest bind group index referenced by either stage, if any.
    #[must_use]
    pub fn max_group(&self) -> Option<u32> {
        self.vertex_bind_points
            .iter()
            .chain(&self.fragment_bind_points)
            .map(|p| p.group)
            .max()
    }
}

/// Process-wide variant cache.
pub struct VariantCache {
    variants: FxHashMap<VariantKey, Arc<CompiledVariant>>,
    /// xxh3-128 of final WGSL → compiled module.
    modules: FxHashMap<u128, wgpu::ShaderModule>,
    print_generated: bool,
}

impl Default for VariantCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            variants: FxHashMap::default(),
            modules: FxHashMap::default(),
            print_generated: false,
        }
    }

    /// Enables logging of every composed source (debug aid).
    #[must_use]
    pub fn with_shader_logging(mut self, enabled: bool) -> Self {
        self.print_generated = enabled;
        self
    }

    /// Cache lookup without compilation.
    #[must_use]
    pub fn get(&self, pass: ShaderPassId, macros: &MacroSet) -> Option<Arc<CompiledVariant>> {
        self.variants.get(&VariantKey::new(pass, macros)).cloned()
    }

    /// Returns the cached variant for (pass, macros), compiling it on miss.
    pub fn get_or_compile(
        &mut self,
        device: &wgpu::Device,
        pass: &ShaderPass,
        macros: &MacroSet,
    ) -> Result<Arc<CompiledVariant>> {
        let key = VariantKey::new(pass.id(), macros);
        if let Some(variant) = self.variants.get(&key) {
            return Ok(variant.clone());
        }

        let program = pass.compose(macros)?;

        if self.print_generated {
            log::debug!(
                "composed '{}' vertex stage:\n{}",
                pass.name(),
                program.vertex.source
            );
            log::debug!(
                "composed '{}' fragment stage:\n{}",
                pass.name(),
                program.fragment.source
            );
        }

        let vertex_source_hash = xxh3_128(program.vertex.source.as_bytes());
        let vertex_module = self.module_for(
            device,
            &format!("{} vertex", pass.name()),
            vertex_source_hash,
            &program.vertex.source,
        );
        let fragment_source_hash = xxh3_128(program.fragment.source.as_bytes());
        let fragment_module = self.module_for(
            device,
            &format!("{} fragment", pass.name()),
            fragment_source_hash,
            &program.fragment.source,
        );

        let variant = Arc::new(CompiledVariant {
            pass: pass.id(),
            vertex_module,
            fragment_module,
            vertex_bind_points: program.vertex.bind_points,
            fragment_bind_points: program.fragment.bind_points,
            vertex_source_hash,
            fragment_source_hash,
        });
        self.variants.insert(key, variant.clone());
        Ok(variant)
    }

    /// Precompiles a variant from a macro name list and discards the result.
    ///
    /// Used to warm the cache outside the hot path (load time). The macro set
    /// is built through the same registry path as the hot lookup, so the key
    /// derivation is identical — a warmed entry never silently misses.
    ///
    /// Entries of the form `"NAME VALUE"` enable the value-carrying form.
    pub fn compile_eager(
        &mut self,
        device: &wgpu::Device,
        pass: &ShaderPass,
        macro_names: &[&str],
    ) -> Result<()> {
        let ctx = pass.context();
        let mut macros = MacroSet::new();
        for entry in macro_names {
            match entry.split_once(' ') {
                Some((name, value)) => macros.enable_variable(&ctx.macros, name, value)?,
                None => macros.enable(ctx.macros.get_or_create(entry)),
            }
        }
        self.get_or_compile(device, pass, &macros)?;
        Ok(())
    }

    fn module_for(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        hash: u128,
        source: &str,
    ) -> wgpu::ShaderModule {
        self.modules
            .entry(hash)
            .or_insert_with(|| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            })
            .clone()
    }

    /// Number of cached variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Number of distinct compiled shader modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Drops every cached variant and module.
    pub fn clear(&mut self) {
        self.variants.clear();
        self.modules.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderContext;

    #[test]
    fn keys_ignore_construction_order() {
        let ctx = ShaderContext::new();
        let a = ctx.macros.get_or_create("KEY_A");
        let b = ctx.macros.get_or_create("KEY_B");
        let pass = ctx.allocate_pass_id();

        let mut forward = MacroSet::new();
        forward.enable(a);
        forward.enable(b);

        let mut backward = MacroSet::new();
        backward.enable(b);
        backward.enable(a);

        assert_eq!(
            VariantKey::new(pass, &forward),
            VariantKey::new(pass, &backward)
        );
    }

    #[test]
    fn keys_distinguish_pass_and_macros() {
        let ctx = ShaderContext::new();
        let flag = ctx.macros.get_or_create("KEY_FLAG");
        let pass_a = ctx.allocate_pass_id();
        let pass_b = ctx.allocate_pass_id();

        let empty = MacroSet::new();
        let mut with_flag = MacroSet::new();
        with_flag.enable(flag);

        assert_ne!(
            VariantKey::new(pass_a, &empty),
            VariantKey::new(pass_a, &with_flag)
        );
        assert_ne!(
            VariantKey::new(pass_a, &empty),
            VariantKey::new(pass_b, &empty)
        );
    }
}
