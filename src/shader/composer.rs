//! Shader Source Composer
//!
//! Builds one WGSL shader stage from an ordered list of composable
//! [`ShaderChunk`]s. Each chunk's `emit` call appends to four independent
//! text blocks — struct/type declarations, resource declarations, free
//! functions, and the stage entry point — and registers the bind points it
//! requires. Final assembly concatenates the blocks in that fixed order
//! (types → resources → functions → entry), so forward references always
//! resolve regardless of chunk order.
//!
//! Chunks condition their emission on the active [`MacroSet`]: a chunk only
//! emits a tangent varying when the normal-map and tangent-attribute macros
//! are both enabled, and so on. This is how feature flags select shader code
//! paths without per-feature shader files.
//!
//! Binding declarations are **idempotent** per (group, binding): chunks
//! shared across many composed shaders (camera/scene uniforms) re-declare
//! the same slots, and a re-add with an identical shape only widens the
//! stage-visibility mask. An incompatible shape is a composition conflict,
//! caught here before any GPU call.

use std::fmt::Write;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};
use crate::shader::bind_point::{BindPoint, BindPointKind};
use crate::shader::context::ShaderContext;
use crate::shader::macro_set::MacroSet;
use crate::shader::property::{ShaderDataGroup, ShaderProperty};

/// The shader stage a composer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// The wgpu visibility mask for this stage.
    #[inline]
    #[must_use]
    pub fn visibility(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }

    #[must_use]
    fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// A composable piece of shader source.
///
/// Chunks are the unit of reuse: a pass is an ordered chunk list per stage,
/// and the same chunk instance (camera uniforms, fog helpers, …) appears in
/// many passes. `emit` receives the draw's merged macro set and appends
/// whatever the active feature combination requires.
pub trait ShaderChunk: Send + Sync {
    fn emit(&self, composer: &mut SourceComposer, macros: &MacroSet) -> Result<()>;
}

/// Blanket impl so simple chunks can be plain functions.
impl<F> ShaderChunk for F
where
    F: Fn(&mut SourceComposer, &MacroSet) -> Result<()> + Send + Sync,
{
    fn emit(&self, composer: &mut SourceComposer, macros: &MacroSet) -> Result<()> {
        self(composer, macros)
    }
}

/// One fully assembled shader stage: source text plus its reflected bind
/// point manifest, sorted by (group, binding).
#[derive(Debug, Clone)]
pub struct ComposedStage {
    pub stage: ShaderStage,
    pub source: String,
    pub bind_points: Vec<BindPoint>,
}

/// Per-stage source encoder.
///
/// Created fresh for every composition; all state is rebuilt each time, so
/// the manifest always matches the emitted source exactly.
pub struct SourceComposer {
    ctx: Arc<ShaderContext>,
    stage: ShaderStage,
    types: String,
    resources: String,
    functions: String,
    entry: String,
    bind_points: FxHashMap<(u32, u32), BindPoint>,
}

impl SourceComposer {
    #[must_use]
    pub fn new(ctx: Arc<ShaderContext>, stage: ShaderStage) -> Self {
        Self {
            ctx,
            stage,
            types: String::new(),
            resources: String::new(),
            functions: String::new(),
            entry: String::new(),
            bind_points: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<ShaderContext> {
        &self.ctx
    }

    // ── Text blocks ──────────────────────────────────────────────────────────

    /// Appends struct/type declarations.
    pub fn add_type(&mut self, code: &str) {
        push_block(&mut self.types, code);
    }

    /// Appends free functions.
    pub fn add_function(&mut self, code: &str) {
        push_block(&mut self.functions, code);
    }

    /// Appends entry-point code.
    pub fn add_entry(&mut self, code: &str) {
        push_block(&mut self.entry, code);
    }

    // ── Property resolution ──────────────────────────────────────────────────

    /// Resolves a property a chunk references without declaring, failing if
    /// it was never registered.
    pub fn lookup_property(&self, name: &str) -> Result<ShaderProperty> {
        self.ctx
            .properties
            .get(name)
            .ok_or_else(|| PrismError::PropertyUnregistered(name.to_string()))
    }

    // ── Binding declarations ─────────────────────────────────────────────────

    /// Declares a uniform buffer binding for `name` of WGSL type `wgsl_type`.
    pub fn add_uniform_binding(
        &mut self,
        group: ShaderDataGroup,
        name: &str,
        wgsl_type: &str,
    ) -> Result<()> {
        let kind = BindPointKind::UniformBuffer {
            dynamic: false,
            min_size: None,
        };
        self.add_binding(group, name, kind, |g, b| {
            format!("@group({g}) @binding({b}) var<uniform> {name}: {wgsl_type};")
        })
    }

    /// Declares a storage buffer binding.
    pub fn add_storage_buffer_binding(
        &mut self,
        group: ShaderDataGroup,
        name: &str,
        wgsl_type: &str,
        read_only: bool,
    ) -> Result<()> {
        let access = if read_only { "read" } else { "read_write" };
        let kind = BindPointKind::StorageBuffer { read_only };
        self.add_binding(group, name, kind, |g, b| {
            format!("@group({g}) @binding({b}) var<storage, {access}> {name}: {wgsl_type};")
        })
    }

    /// Declares a sampled texture together with its sampler.
    ///
    /// Texture and sampler are separate properties with separate bindings;
    /// the WGSL variable names are `t_{texture}` and `s_{sampler}`.
    pub fn add_sampled_texture_binding(
        &mut self,
        group: ShaderDataGroup,
        texture_name: &str,
        sample_type: wgpu::TextureSampleType,
        view_dimension: wgpu::TextureViewDimension,
        sampler_name: &str,
        sampler_type: wgpu::SamplerBindingType,
    ) -> Result<()> {
        let texture_ty = texture_wgsl_type(view_dimension, sample_type);
        self.add_binding(
            group,
            texture_name,
            BindPointKind::SampledTexture {
                sample_type,
                view_dimension,
                multisampled: false,
            },
            |g, b| format!("@group({g}) @binding({b}) var t_{texture_name}: {texture_ty};"),
        )?;

        let sampler_ty = sampler_wgsl_type(sampler_type);
        self.add_binding(
            group,
            sampler_name,
            BindPointKind::Sampler { ty: sampler_type },
            |g, b| format!("@group({g}) @binding({b}) var s_{sampler_name}: {sampler_ty};"),
        )
    }

    /// Declares a storage texture binding.
    pub fn add_storage_texture_binding(
        &mut self,
        group: ShaderDataGroup,
        name: &str,
        access: wgpu::StorageTextureAccess,
        format: wgpu::TextureFormat,
        view_dimension: wgpu::TextureViewDimension,
    ) -> Result<()> {
        let ty = storage_texture_wgsl_type(access, format, view_dimension);
        self.add_binding(
            group,
            name,
            BindPointKind::StorageTexture {
                access,
                format,
                view_dimension,
            },
            |g, b| format!("@group({g}) @binding({b}) var {name}: {ty};"),
        )
    }

    fn add_binding(
        &mut self,
        group: ShaderDataGroup,
        name: &str,
        kind: BindPointKind,
        decl: impl FnOnce(u32, u32) -> String,
    ) -> Result<()> {
        let property = self.ctx.properties.get_or_create(name);
        let binding = self.ctx.properties.claim(property, group)?;
        let group_index = group.bind_group_index();

        if let Some(existing) = self.bind_points.get_mut(&(group_index, binding)) {
            if !existing.kind.is_compatible(&kind) {
                return Err(PrismError::BindingConflict {
                    group: group_index,
                    binding,
                });
            }
            // Shared chunk re-declared the slot: widen visibility, emit nothing.
            existing.visibility |= self.stage.visibility();
            return Ok(());
        }

        push_block(&mut self.resources, &decl(group_index, binding));
        self.bind_points.insert(
            (group_index, binding),
            BindPoint {
                property,
                group: group_index,
                binding,
                visibility: self.stage.visibility(),
                kind,
            },
        );
        Ok(())
    }

    // ── Assembly ─────────────────────────────────────────────────────────────

    /// Assembles the final stage source and manifest.
    ///
    /// The header lists the active defines; WGSL has no preprocessor, so the
    /// define list exists for diagnostics and participates in the source hash
    /// that deduplicates shader modules.
    #[must_use]
    pub fn assemble(&self, pass_name: &str, macros: &MacroSet) -> ComposedStage {
        let mut source = String::with_capacity(
            64 + self.types.len()
                + self.resources.len()
                + self.functions.len()
                + self.entry.len(),
        );

        let _ = writeln!(source, "// {} — {} stage", pass_name, self.stage.label());
        for define in self.ctx.macros.defines_for_set(macros) {
            match define.value {
                Some(value) => {
                    let _ = writeln!(source, "// define {} = {}", define.name, value);
                }
                None => {
                    let _ = writeln!(source, "// define {}", define.name);
                }
            }
        }
        source.push('\n');

        for block in [&self.types, &self.resources, &self.functions, &self.entry] {
            if !block.is_empty() {
                source.push_str(block);
                source.push('\n');
            }
        }

        let mut bind_points: Vec<BindPoint> = self.bind_points.values().copied().collect();
        bind_points.sort_by_key(|p| (p.group, p.binding));

        ComposedStage {
            stage: self.stage,
            source,
            bind_points,
        }
    }
}

fn push_block(block: &mut String, code: &str) {
    block.push_str(code.trim_end());
    block.push('\n');
}

fn texture_wgsl_type(
    view_dimension: wgpu::TextureViewDimension,
    sample_type: wgpu::TextureSampleType,
) -> &'static str {
    match (view_dimension, sample_type) {
        (wgpu::TextureViewDimension::D2, wgpu::TextureSampleType::Depth) => "texture_depth_2d",
        (wgpu::TextureViewDimension::D2Array, wgpu::TextureSampleType::Depth) => {
            "texture_depth_2d_array"
        }
        (wgpu::TextureViewDimension::Cube, _) => "texture_cube<f32>",
        (wgpu::TextureViewDimension::D2Array, _) => "texture_2d_array<f32>",
        (wgpu::TextureViewDimension::D3, _) => "texture_3d<f32>",
        _ => "texture_2d<f32>",
    }
}

fn sampler_wgsl_type(ty: wgpu::SamplerBindingType) -> &'static str {
    match ty {
        wgpu::SamplerBindingType::Comparison => "sampler_comparison",
        _ => "sampler",
    }
}

fn storage_texture_wgsl_type(
    access: wgpu::StorageTextureAccess,
    format: wgpu::TextureFormat,
    view_dimension: wgpu::TextureViewDimension,
) -> String {
    let access = match access {
        wgpu::StorageTextureAccess::ReadOnly => "read",
        wgpu::StorageTextureAccess::WriteOnly => "write",
        _ => "read_write",
    };
    let format = match format {
        wgpu::TextureFormat::Rgba8Unorm => "rgba8unorm",
        wgpu::TextureFormat::Rgba16Float => "rgba16float",
        wgpu::TextureFormat::Rgba32Float => "rgba32float",
        wgpu::TextureFormat::R32Float => "r32float",
        wgpu::TextureFormat::Rg32Float => "rg32float",
        wgpu::TextureFormat::R32Uint => "r32uint",
        _ => "rgba8unorm",
    };
    let dim = match view_dimension {
        wgpu::TextureViewDimension::D1 => "1d",
        wgpu::TextureViewDimension::D3 => "3d",
        _ => "2d",
    };
    format!("texture_storage_{dim}<{format}, {access}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderContext;

    #[test]
    fn blocks_assemble_in_fixed_order() {
        let ctx = ShaderContext::new();
        let mut composer = SourceComposer::new(ctx, ShaderStage::Vertex);

        // Emitted out of assembly order on purpose.
        composer.add_entry("@vertex fn vs_main() {}");
        composer.add_function("fn helper() -> f32 { return 1.0; }");
        composer.add_type("struct Thing { a: f32, };");

        let composed = composer.assemble("test", &MacroSet::new());
        let struct_at = composed.source.find("struct Thing").unwrap();
        let fn_at = composed.source.find("fn helper").unwrap();
        let entry_at = composed.source.find("@vertex").unwrap();
        assert!(struct_at < fn_at && fn_at < entry_at);
    }

    #[test]
    fn redeclaring_identical_binding_widens_visibility_only() {
        let ctx = ShaderContext::new();
        let mut composer = SourceComposer::new(ctx, ShaderStage::Fragment);

        composer
            .add_uniform_binding(ShaderDataGroup::Camera, "camera", "CameraUniforms")
            .unwrap();
        composer
            .add_uniform_binding(ShaderDataGroup::Camera, "camera", "CameraUniforms")
            .unwrap();

        let composed = composer.assemble("test", &MacroSet::new());
        assert_eq!(composed.bind_points.len(), 1);
        assert_eq!(composed.source.matches("var<uniform> camera").count(), 1);
    }

    #[test]
    fn incompatible_redeclaration_is_a_conflict() {
        let ctx = ShaderContext::new();
        let mut composer = SourceComposer::new(ctx, ShaderStage::Fragment);

        composer
            .add_uniform_binding(ShaderDataGroup::Material, "particle_state", "vec4<f32>")
            .unwrap();
        let conflict = composer.add_storage_buffer_binding(
            ShaderDataGroup::Material,
            "particle_state",
            "array<f32>",
            true,
        );
        assert!(matches!(conflict, Err(PrismError::BindingConflict { .. })));
    }

    #[test]
    fn sampled_texture_declares_pair_with_claimed_bindings() {
        let ctx = ShaderContext::new();
        let mut composer = SourceComposer::new(ctx.clone(), ShaderStage::Fragment);

        composer
            .add_sampled_texture_binding(
                ShaderDataGroup::Material,
                "base_texture",
                wgpu::TextureSampleType::Float { filterable: true },
                wgpu::TextureViewDimension::D2,
                "base_sampler",
                wgpu::SamplerBindingType::Filtering,
            )
            .unwrap();

        let composed = composer.assemble("test", &MacroSet::new());
        assert_eq!(composed.bind_points.len(), 2);
        assert!(composed.source.contains("var t_base_texture: texture_2d<f32>;"));
        assert!(composed.source.contains("var s_base_sampler: sampler;"));

        let tex = ctx.properties.get("base_texture").unwrap();
        assert_eq!(
            ctx.properties.group_of(tex),
            Some(ShaderDataGroup::Material)
        );
    }

    #[test]
    fn unregistered_property_lookup_fails() {
        let ctx = ShaderContext::new();
        let composer = SourceComposer::new(ctx, ShaderStage::Vertex);
        assert!(matches!(
            composer.lookup_property("no_such_property"),
            Err(PrismError::PropertyUnregistered(_))
        ));
    }
}
