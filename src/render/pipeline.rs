//! Render Pipeline Cache
//!
//! Central owner of every `wgpu::RenderPipeline` the draw loop creates.
//! Pipelines are stored in a contiguous `Vec` and addressed through
//! lightweight [`RenderPipelineId`] handles; the lookup is a full-state hash
//! of [`PipelineKey`] — shader variant hashes plus every fixed-function
//! input that affects pipeline compatibility.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::render::material::RenderStates;
use crate::render::renderable::Geometry;
use crate::shader::variant::CompiledVariant;

/// Hashes a key with the Fx hasher.
#[must_use]
pub fn fx_hash_key<T: Hash>(key: &T) -> u64 {
    use std::hash::BuildHasher;
    rustc_hash::FxBuildHasher.hash_one(key)
}

/// Handle into the pipeline cache's contiguous storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineId(u32);

impl RenderPipelineId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Full pipeline state key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub vertex_shader_hash: u128,
    pub fragment_shader_hash: u128,
    pub vertex_layout_hash: u64,
    pub topology: wgpu::PrimitiveTopology,
    pub blend: Option<wgpu::BlendState>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl PipelineKey {
    /// Builds the key for one draw's (variant, geometry, material state,
    /// target) combination.
    #[must_use]
    pub fn for_draw(
        variant: &CompiledVariant,
        geometry: &Geometry,
        states: &RenderStates,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        Self {
            vertex_shader_hash: variant.vertex_source_hash,
            fragment_shader_hash: variant.fragment_source_hash,
            vertex_layout_hash: geometry.layout_hash(),
            topology: geometry.topology,
            blend: states.blend,
            depth_write: states.depth_write,
            depth_compare: states.depth_compare,
            cull_mode: states.cull_mode,
            front_face: states.front_face,
            color_format,
            depth_format,
            sample_count,
        }
    }
}

/// Central pipeline storage and deduplication cache.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: Vec<wgpu::RenderPipeline>,
    lookup: FxHashMap<u64, RenderPipelineId>,
}

impl PipelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: Vec::with_capacity(64),
            lookup: FxHashMap::default(),
        }
    }

    /// Retrieve a pipeline by handle. **Panics** if the id is invalid.
    #[inline]
    #[must_use]
    pub fn get(&self, id: RenderPipelineId) -> &wgpu::RenderPipeline {
        &self.pipelines[id.index()]
    }

    /// Looks up or creates the pipeline for `key`.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        key: &PipelineKey,
        variant: &CompiledVariant,
        geometry: &Geometry,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> RenderPipelineId {
        let hash = fx_hash_key(key);
        if let Some(&id) = self.lookup.get(&hash) {
            return id;
        }

        let bind_group_layouts_opt: Vec<Option<&wgpu::BindGroupLayout>> =
            bind_group_layouts.iter().map(|l| Some(*l)).collect();
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("draw pipeline layout"),
            bind_group_layouts: &bind_group_layouts_opt,
            immediate_size: 0,
        });

        let vertex_buffers = geometry.vertex_layouts();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("draw pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &variant.vertex_module,
                entry_point: Some("vs_main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &variant.fragment_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.color_format,
                    blend: key.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology,
                front_face: key.front_face,
                cull_mode: key.cull_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: key.depth_format,
                depth_write_enabled: Some(key.depth_write),
                depth_compare: Some(key.depth_compare),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: key.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        let id = RenderPipelineId(self.pipelines.len() as u32);
        self.pipelines.push(pipeline);
        self.lookup.insert(hash, id);
        id
    }

    /// Number of cached pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Clears every cached pipeline (target format or MSAA changes).
    pub fn clear(&mut self) {
        self.pipelines.clear();
        self.lookup.clear();
    }
}
