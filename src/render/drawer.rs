//! Forward Draw Loop
//!
//! Executes the full per-frame pipeline for one camera:
//!
//! 1. **Collect/Cull** — walk the renderables, drop layer-masked and
//!    frustum-culled entries.
//! 2. **Classify** — bucket each (renderable, sub-mesh) into
//!    opaque/alpha-test/transparent by queue ordinal.
//! 3. **Sort** — front-to-back for opaque and alpha-test, back-to-front for
//!    transparent.
//! 4. **CompileVariant** — union the scene, camera, renderer, and material
//!    macro sets (in that order) into the compile key and hit the variant
//!    cache.
//! 5. **BindResources** — `bind_data` over the four scopes in priority order
//!    per stage, then materialize bind groups.
//! 6. **IssueDraw** — pipeline lookup and command submission through a
//!    prepared command list.
//!
//! A draw that cannot be prepared (missing resource, registration conflict,
//! geometry without vertex data) is skipped with a diagnostic; the rest of
//! the frame proceeds. Shader/device validation failures are fatal and
//! surface through wgpu's error hooks — there is no fallback shader path.
//!
//! Everything here is single-threaded and frame-synchronous; command lists
//! and queues are pooled and reused across frames.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::{PrismError, Result};
use crate::render::binding::{BindGroupLayoutCache, BindingCollector, ScopeSet};
use crate::render::camera::RenderCamera;
use crate::render::context::WgpuContext;
use crate::render::pipeline::{PipelineCache, PipelineKey, RenderPipelineId};
use crate::render::queue::{RenderElement, RenderQueue};
use crate::render::renderable::{Geometry, MeshRenderer};
use crate::render::settings::RendererSettings;
use crate::render::shader_data::ShaderData;
use crate::shader::variant::VariantCache;

/// Per-frame counters returned by [`ForwardRenderer::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls issued.
    pub drawn: u32,
    /// Renderables dropped by layer or frustum culling.
    pub culled: u32,
    /// Draws skipped because preparation failed.
    pub skipped: u32,
}

struct RenderCommand {
    pipeline: RenderPipelineId,
    bind_groups: SmallVec<[wgpu::BindGroup; 4]>,
    geometry: Arc<Geometry>,
    sub_mesh: usize,
}

/// The forward renderer: owns the pooled frame state and the pipeline-level
/// caches.
pub struct ForwardRenderer {
    settings: RendererSettings,
    queue: RenderQueue,
    collector: BindingCollector,
    pipeline_cache: PipelineCache,
    layout_cache: BindGroupLayoutCache,
    commands: Vec<RenderCommand>,
}

impl ForwardRenderer {
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            queue: RenderQueue::new(),
            collector: BindingCollector::new(),
            pipeline_cache: PipelineCache::new(),
            layout_cache: BindGroupLayoutCache::new(),
            commands: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Number of pipelines created so far.
    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipeline_cache.len()
    }

    /// Draws one frame for one camera into the given attachments.
    pub fn render(
        &mut self,
        gpu: &WgpuContext,
        variants: &mut VariantCache,
        scene_data: &ShaderData,
        camera: &RenderCamera,
        renderables: &[MeshRenderer],
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) -> Result<FrameStats> {
        let mut stats = FrameStats::default();

        self.collect(camera, renderables, &mut stats);
        self.queue.sort();
        self.prepare(gpu, variants, scene_data, camera, renderables, &mut stats);
        self.execute(encoder, color_view, depth_view);

        stats.drawn = self.commands.len() as u32;
        Ok(stats)
    }

    // ── Collect / Cull / Classify ────────────────────────────────────────────

    fn collect(
        &mut self,
        camera: &RenderCamera,
        renderables: &[MeshRenderer],
        stats: &mut FrameStats,
    ) {
        self.queue.clear();

        for (index, renderer) in renderables.iter().enumerate() {
            if !renderer.visible {
                continue;
            }
            if !camera.culling_mask.intersects(renderer.layer) {
                stats.culled += 1;
                continue;
            }
            if camera.frustum_culling && !camera.frustum.intersects_sphere(&renderer.bounds) {
                stats.culled += 1;
                continue;
            }

            let distance = camera.sort_distance(renderer.bounds.center);
            let queue_type = renderer.material.read().render_queue_type;

            for sub_mesh in 0..renderer.geometry.sub_meshes.len() {
                self.queue.push(RenderElement {
                    renderable: index,
                    sub_mesh,
                    queue_type,
                    distance,
                });
            }
        }
    }

    // ── CompileVariant / BindResources / pipeline lookup ─────────────────────

    fn prepare(
        &mut self,
        gpu: &WgpuContext,
        variants: &mut VariantCache,
        scene_data: &ShaderData,
        camera: &RenderCamera,
        renderables: &[MeshRenderer],
        stats: &mut FrameStats,
    ) {
        self.commands.clear();

        // Take the queue so element iteration does not alias `self`.
        let queue = std::mem::take(&mut self.queue);
        let buckets = [&queue.opaque, &queue.alpha_test, &queue.transparent];

        for bucket in buckets {
            for element in bucket {
                let renderer = &renderables[element.renderable];
                if let Err(err) =
                    self.prepare_element(gpu, variants, scene_data, camera, renderer, element)
                {
                    log::warn!(
                        "skipping draw of '{}': {err}",
                        renderer.geometry.name
                    );
                    stats.skipped += 1;
                }
            }
        }

        self.queue = queue;
    }

    fn prepare_element(
        &mut self,
        gpu: &WgpuContext,
        variants: &mut VariantCache,
        scene_data: &ShaderData,
        camera: &RenderCamera,
        renderer: &MeshRenderer,
        element: &RenderElement,
    ) -> Result<()> {
        let geometry = &renderer.geometry;
        if geometry.streams.is_empty() {
            return Err(PrismError::EmptyGeometry(geometry.name.to_string()));
        }

        let material = renderer.material.read();

        // Later unions never remove earlier bits: scene and camera globals
        // stay part of every key.
        let mut macro_key = scene_data.macros().clone();
        macro_key.union_with(camera.shader_data.macros());
        macro_key.union_with(renderer.shader_data.macros());
        macro_key.union_with(material.shader_data.macros());

        let variant = variants.get_or_compile(&gpu.device, &material.pass, &macro_key)?;

        // Fixed scope order defines binding priority: first writer wins.
        let scopes = ScopeSet {
            scene: scene_data,
            camera: &camera.shader_data,
            renderer: &renderer.shader_data,
            material: &material.shader_data,
        };
        self.collector.clear();
        for scope in [scopes.scene, scopes.camera, scopes.renderer, scopes.material] {
            scope.bind_data(
                wgpu::ShaderStages::VERTEX,
                &variant.vertex_bind_points,
                &mut self.collector,
            );
        }
        for scope in [scopes.scene, scopes.camera, scopes.renderer, scopes.material] {
            scope.bind_data(
                wgpu::ShaderStages::FRAGMENT,
                &variant.fragment_bind_points,
                &mut self.collector,
            );
        }

        if let Some(gap) = self
            .collector
            .first_gap(&variant.vertex_bind_points)
            .or_else(|| self.collector.first_gap(&variant.fragment_bind_points))
        {
            return Err(PrismError::MissingResource {
                name: gap.property.name().to_string(),
                group: gap.group,
                binding: gap.binding,
            });
        }

        let groups = self
            .collector
            .build_bind_groups(&gpu.device, scopes, &mut self.layout_cache)?;
        let layout_refs: Vec<&wgpu::BindGroupLayout> = groups.iter().map(|(l, _)| l).collect();

        let key = PipelineKey::for_draw(
            &variant,
            geometry,
            &material.states,
            self.settings.color_format,
            self.settings.depth_format,
            self.settings.sample_count,
        );
        let pipeline =
            self.pipeline_cache
                .get_or_create(&gpu.device, &key, &variant, geometry, &layout_refs);

        self.commands.push(RenderCommand {
            pipeline,
            bind_groups: groups.into_iter().map(|(_, group)| group).collect(),
            geometry: geometry.clone(),
            sub_mesh: element.sub_mesh,
        });
        Ok(())
    }

    // ── IssueDraw ────────────────────────────────────────────────────────────

    fn execute(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("forward pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.settings.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let mut last_pipeline: Option<RenderPipelineId> = None;
        for command in &self.commands {
            if last_pipeline != Some(command.pipeline) {
                pass.set_pipeline(self.pipeline_cache.get(command.pipeline));
                last_pipeline = Some(command.pipeline);
            }

            for (index, group) in command.bind_groups.iter().enumerate() {
                pass.set_bind_group(index as u32, group, &[]);
            }

            for (slot, stream) in command.geometry.streams.iter().enumerate() {
                pass.set_vertex_buffer(slot as u32, stream.buffer.slice(..));
            }

            let range = command.geometry.sub_meshes[command.sub_mesh].clone();
            let instances = 0..command.geometry.instance_count;
            if let Some(index) = &command.geometry.index {
                pass.set_index_buffer(index.buffer.slice(..), index.format);
                pass.draw_indexed(range, 0, instances);
            } else {
                pass.draw(range, instances);
            }
        }
    }
}
