//! Material
//!
//! A material pairs a shader pass with the material-scope [`ShaderData`] and
//! the fixed-function state of its draws. Materials are shared between
//! renderers through `Arc<RwLock<_>>`: the `Arc` is the explicit reference
//! count that keeps a material (and its GPU resources) alive until the last
//! renderer using it is dropped.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::render::queue::RenderQueueType;
use crate::render::shader_data::ShaderData;
use crate::shader::context::ShaderContext;
use crate::shader::pass::ShaderPass;
use crate::shader::property::ShaderDataGroup;

/// Fixed-function pipeline state a material selects.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStates {
    pub blend: Option<wgpu::BlendState>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            blend: None,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            cull_mode: Some(wgpu::Face::Back),
            front_face: wgpu::FrontFace::Ccw,
        }
    }
}

/// A shader pass plus per-material data and draw state.
pub struct Material {
    pub name: Cow<'static, str>,
    /// Material-scope shader data (colors, maps, feature macros).
    pub shader_data: ShaderData,
    /// The pass this material draws with. Shared across materials.
    pub pass: Arc<ShaderPass>,
    /// Queue ordinal used for bucketing and intra-bucket ordering.
    pub render_queue_type: RenderQueueType,
    pub states: RenderStates,
}

/// A material shared between renderers.
pub type SharedMaterial = Arc<RwLock<Material>>;

impl Material {
    #[must_use]
    pub fn new(
        ctx: Arc<ShaderContext>,
        pass: Arc<ShaderPass>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            shader_data: ShaderData::new(ShaderDataGroup::Material, ctx),
            pass,
            render_queue_type: RenderQueueType::default(),
            states: RenderStates::default(),
        }
    }

    /// Switches between opaque and alpha-blended rendering.
    ///
    /// Transparent materials move to the transparent queue, enable standard
    /// alpha blending, and stop writing depth.
    pub fn set_transparent(&mut self, transparent: bool) {
        if transparent {
            self.render_queue_type = RenderQueueType::TRANSPARENT;
            self.states.blend = Some(wgpu::BlendState::ALPHA_BLENDING);
            self.states.depth_write = false;
        } else {
            self.render_queue_type = RenderQueueType::OPAQUE;
            self.states.blend = None;
            self.states.depth_write = true;
        }
    }

    /// Wraps the material for sharing between renderers.
    #[must_use]
    pub fn into_shared(self) -> SharedMaterial {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::chunks::unlit_pass;

    #[test]
    fn transparency_toggles_queue_and_states() {
        let ctx = ShaderContext::new();
        let pass = Arc::new(unlit_pass(ctx.clone()));
        let mut material = Material::new(ctx, pass, "test");

        assert_eq!(material.render_queue_type, RenderQueueType::OPAQUE);

        material.set_transparent(true);
        assert_eq!(material.render_queue_type, RenderQueueType::TRANSPARENT);
        assert!(material.states.blend.is_some());
        assert!(!material.states.depth_write);

        material.set_transparent(false);
        assert_eq!(material.render_queue_type, RenderQueueType::OPAQUE);
        assert!(material.states.blend.is_none());
        assert!(material.states.depth_write);
    }
}
