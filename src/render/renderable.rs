//! Renderables and GPU Geometry
//!
//! [`Geometry`] is the GPU-side mesh collaborator: vertex streams with owned
//! layouts, an optional index stream, and sub-mesh draw ranges. Mesh
//! building and upload belong to the asset layer; the draw loop only needs
//! the handles and layout metadata collected here.
//!
//! [`MeshRenderer`] is the per-object entity: its own renderer-scope
//! [`ShaderData`], a shared geometry, a shared material, world bounds, and a
//! layer mask.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use crate::render::culling::{BoundingSphere, Layer};
use crate::render::material::SharedMaterial;
use crate::render::pipeline::fx_hash_key;
use crate::render::shader_data::ShaderData;
use crate::shader::context::ShaderContext;
use crate::shader::property::ShaderDataGroup;

/// One vertex buffer and its layout.
#[derive(Debug, Clone)]
pub struct VertexStream {
    pub buffer: wgpu::Buffer,
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexStream {
    /// Borrowed wgpu layout for pipeline creation.
    #[must_use]
    pub fn layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// Index buffer stream.
#[derive(Debug, Clone)]
pub struct IndexStream {
    pub buffer: wgpu::Buffer,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

/// GPU-side mesh: vertex streams, optional indices, sub-mesh ranges.
pub struct Geometry {
    pub name: Cow<'static, str>,
    pub streams: Vec<VertexStream>,
    pub index: Option<IndexStream>,
    /// Draw ranges, one per sub-mesh. Ranges index into the index stream
    /// when present, into vertices otherwise. Never empty for a drawable
    /// geometry.
    pub sub_meshes: Vec<Range<u32>>,
    pub instance_count: u32,
    pub topology: wgpu::PrimitiveTopology,
}

impl Geometry {
    /// Single-sub-mesh geometry covering `range`.
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        streams: Vec<VertexStream>,
        index: Option<IndexStream>,
        range: Range<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            streams,
            index,
            sub_meshes: vec![range],
            instance_count: 1,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    /// Borrowed layouts of every stream, in slot order.
    #[must_use]
    pub fn vertex_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.streams.iter().map(VertexStream::layout).collect()
    }

    /// Hash of the vertex layout and topology, used in pipeline keys.
    ///
    /// Covers strides, step modes, and attributes — everything pipeline
    /// compatibility depends on — but not buffer contents.
    #[must_use]
    pub fn layout_hash(&self) -> u64 {
        let signature: Vec<_> = self
            .streams
            .iter()
            .map(|s| (s.array_stride, s.step_mode, s.attributes.clone()))
            .collect();
        fx_hash_key(&(signature, self.topology))
    }
}

/// Per-object renderable entity.
pub struct MeshRenderer {
    /// Renderer-scope shader data (model matrix, skinning palette, …).
    pub shader_data: ShaderData,
    pub geometry: Arc<Geometry>,
    pub material: SharedMaterial,
    /// World-space bounds, maintained by the transform system.
    pub bounds: BoundingSphere,
    pub layer: Layer,
    pub visible: bool,
}

impl MeshRenderer {
    #[must_use]
    pub fn new(ctx: Arc<ShaderContext>, geometry: Arc<Geometry>, material: SharedMaterial) -> Self {
        Self {
            shader_data: ShaderData::new(ShaderDataGroup::Renderer, ctx),
            geometry,
            material,
            bounds: BoundingSphere::unbounded(),
            layer: Layer::default(),
            visible: true,
        }
    }
}
