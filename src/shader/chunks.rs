//! Built-in Shader Chunks
//!
//! The shared chunks every forward pass starts from: camera and model
//! uniform blocks, plus the unlit color pass used by tests and simple
//! content. Concrete lighting models live with their materials and compose
//! their own chunks on top of these.

use std::sync::Arc;

use crate::errors::Result;
use crate::shader::composer::{ShaderChunk, SourceComposer};
use crate::shader::context::ShaderContext;
use crate::shader::macro_set::MacroSet;
use crate::shader::pass::ShaderPass;
use crate::shader::property::ShaderDataGroup;

/// Macro enabled by geometry that carries a UV attribute.
pub const HAS_UV: &str = "HAS_UV";
/// Macro enabled by materials that sample a base color texture.
pub const HAS_BASE_TEXTURE: &str = "HAS_BASE_TEXTURE";

/// Camera uniform block (`camera` property, camera scope).
///
/// Reused by every pass; binding declarations are idempotent, so including
/// it in both stages merely widens the slot's visibility.
pub struct CameraChunk;

impl ShaderChunk for CameraChunk {
    fn emit(&self, composer: &mut SourceComposer, _macros: &MacroSet) -> Result<()> {
        composer.add_type(
            "struct CameraUniforms {\n    view_matrix: mat4x4<f32>,\n    projection_matrix: mat4x4<f32>,\n    view_projection_matrix: mat4x4<f32>,\n    camera_position: vec4<f32>,\n};",
        );
        composer.add_uniform_binding(ShaderDataGroup::Camera, "camera", "CameraUniforms")
    }
}

/// Per-object model uniform block (`model` property, renderer scope).
pub struct ModelChunk;

impl ShaderChunk for ModelChunk {
    fn emit(&self, composer: &mut SourceComposer, _macros: &MacroSet) -> Result<()> {
        composer.add_type(
            "struct ModelUniforms {\n    model_matrix: mat4x4<f32>,\n    normal_matrix: mat4x4<f32>,\n};",
        );
        composer.add_uniform_binding(ShaderDataGroup::Renderer, "model", "ModelUniforms")
    }
}

/// Vertex stage of the unlit pass.
///
/// Expects `CameraChunk` and `ModelChunk` to have declared their uniforms
/// earlier in the chunk list. The `uv` varying only exists when [`HAS_UV`]
/// is enabled, which is what gives the two variants distinct sources and
/// distinct cache keys.
pub struct UnlitVertexChunk;

impl ShaderChunk for UnlitVertexChunk {
    fn emit(&self, composer: &mut SourceComposer, macros: &MacroSet) -> Result<()> {
        composer.lookup_property("camera")?;
        composer.lookup_property("model")?;
        let has_uv = macros.is_enabled_name(&composer.context().macros, HAS_UV);

        let mut input = String::from(
            "struct VertexInput {\n    @location(0) position: vec3<f32>,\n",
        );
        if has_uv {
            input.push_str("    @location(1) uv: vec2<f32>,\n");
        }
        input.push_str("};");
        composer.add_type(&input);

        let mut output = String::from(
            "struct VertexOutput {\n    @builtin(position) clip_position: vec4<f32>,\n",
        );
        if has_uv {
            output.push_str("    @location(0) uv: vec2<f32>,\n");
        }
        output.push_str("};");
        composer.add_type(&output);

        let mut entry = String::from(
            "@vertex\nfn vs_main(in: VertexInput) -> VertexOutput {\n    var out: VertexOutput;\n    let world_position = model.model_matrix * vec4<f32>(in.position, 1.0);\n    out.clip_position = camera.view_projection_matrix * world_position;\n",
        );
        if has_uv {
            entry.push_str("    out.uv = in.uv;\n");
        }
        entry.push_str("    return out;\n}");
        composer.add_entry(&entry);
        Ok(())
    }
}

/// Fragment stage of the unlit pass.
///
/// Base color uniform, optionally modulated by a sampled texture when both
/// [`HAS_BASE_TEXTURE`] and [`HAS_UV`] are enabled.
pub struct UnlitColorChunk;

impl ShaderChunk for UnlitColorChunk {
    fn emit(&self, composer: &mut SourceComposer, macros: &MacroSet) -> Result<()> {
        let has_uv = macros.is_enabled_name(&composer.context().macros, HAS_UV);
        let textured =
            has_uv && macros.is_enabled_name(&composer.context().macros, HAS_BASE_TEXTURE);

        composer.add_uniform_binding(ShaderDataGroup::Material, "base_color", "vec4<f32>")?;

        let mut input = String::from(
            "struct FragmentInput {\n    @builtin(position) clip_position: vec4<f32>,\n",
        );
        if has_uv {
            input.push_str("    @location(0) uv: vec2<f32>,\n");
        }
        input.push_str("};");
        composer.add_type(&input);

        if textured {
            composer.add_sampled_texture_binding(
                ShaderDataGroup::Material,
                "base_texture",
                wgpu::TextureSampleType::Float { filterable: true },
                wgpu::TextureViewDimension::D2,
                "base_sampler",
                wgpu::SamplerBindingType::Filtering,
            )?;
            composer.add_entry(
                "@fragment\nfn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {\n    return base_color * textureSample(t_base_texture, s_base_sampler, in.uv);\n}",
            );
        } else {
            composer.add_entry(
                "@fragment\nfn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {\n    return base_color;\n}",
            );
        }
        Ok(())
    }
}

/// Assembles the unlit forward pass from the built-in chunks.
#[must_use]
pub fn unlit_pass(ctx: Arc<ShaderContext>) -> ShaderPass {
    ShaderPass::new(ctx, "unlit")
        .with_vertex_chunk(CameraChunk)
        .with_vertex_chunk(ModelChunk)
        .with_vertex_chunk(UnlitVertexChunk)
        .with_fragment_chunk(UnlitColorChunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::variant::VariantKey;

    #[test]
    fn uv_varying_follows_macro_state() {
        let ctx = ShaderContext::new();
        let pass = unlit_pass(ctx.clone());

        let plain = pass.compose(&MacroSet::new()).unwrap();
        assert!(!plain.vertex.source.contains("uv: vec2<f32>"));

        let mut with_uv = MacroSet::new();
        with_uv.enable(ctx.macros.get_or_create(HAS_UV));
        let textured = pass.compose(&with_uv).unwrap();
        // Present exactly once per struct: input and output.
        assert_eq!(
            textured.vertex.source.matches("uv: vec2<f32>").count(),
            2
        );
        assert_eq!(textured.vertex.source.matches("out.uv = in.uv").count(), 1);

        // The two variants are distinct, stable cache keys.
        let plain_key = VariantKey::new(pass.id(), &MacroSet::new());
        let uv_key = VariantKey::new(pass.id(), &with_uv);
        assert_ne!(plain_key, uv_key);
        assert_eq!(uv_key, VariantKey::new(pass.id(), &with_uv));
    }

    #[test]
    fn texture_binding_requires_both_macros() {
        let ctx = ShaderContext::new();
        let pass = unlit_pass(ctx.clone());

        let mut texture_only = MacroSet::new();
        texture_only.enable(ctx.macros.get_or_create(HAS_BASE_TEXTURE));
        let composed = pass.compose(&texture_only).unwrap();
        assert!(!composed.fragment.source.contains("textureSample"));

        texture_only.enable(ctx.macros.get_or_create(HAS_UV));
        let composed = pass.compose(&texture_only).unwrap();
        assert!(composed.fragment.source.contains("textureSample"));
        assert_eq!(composed.fragment.bind_points.len(), 3);
    }

    #[test]
    fn composition_is_repeatable() {
        let ctx = ShaderContext::new();
        let pass = unlit_pass(ctx.clone());

        let mut macros = MacroSet::new();
        macros.enable(ctx.macros.get_or_create(HAS_UV));

        let first = pass.compose(&macros).unwrap();
        let second = pass.compose(&macros).unwrap();
        assert_eq!(first.vertex.source, second.vertex.source);
        assert_eq!(first.fragment.source, second.fragment.source);
        assert_eq!(
            first.fragment.bind_points.len(),
            second.fragment.bind_points.len()
        );
    }
}
