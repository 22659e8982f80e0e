//! Per-Scope Shader Data
//!
//! One [`ShaderData`] instance exists per scene, camera, renderer, and
//! material. It stores the concrete GPU resources behind named shader
//! properties plus the scope's [`MacroSet`], and at draw time matches its
//! resources against a compiled program's bind point manifest.
//!
//! Typed setters lazily allocate the backing uniform buffer sized to the
//! payload on first use, then only upload. A property's buffer size is fixed
//! for the container's lifetime — changing the payload size is a programmer
//! error and fails eagerly rather than corrupting in-flight bindings.
//!
//! Double-buffered (ping-pong) resources are an explicit two-buffer slot
//! with a current-side flag flipped once per frame by the owning system;
//! the current side is resolved at bind time, not at set time, so frames
//! never re-register the slot.

use std::sync::Arc;

use bytemuck::Pod;
use glam::{Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};
use crate::render::binding::{BindingCollector, ResourceRef};
use crate::render::context::WgpuContext;
use crate::shader::bind_point::{BindPoint, BindPointKind};
use crate::shader::context::ShaderContext;
use crate::shader::macro_set::MacroSet;
use crate::shader::property::{ShaderDataGroup, ShaderProperty};

/// Which side of a ping-pong pair is currently bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PingPongSide {
    #[default]
    A,
    B,
}

impl PingPongSide {
    #[inline]
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            PingPongSide::A => PingPongSide::B,
            PingPongSide::B => PingPongSide::A,
        }
    }

    #[inline]
    #[must_use]
    fn index(self) -> usize {
        match self {
            PingPongSide::A => 0,
            PingPongSide::B => 1,
        }
    }
}

enum BufferSlot {
    /// Uniform buffer owned by this scope, lazily allocated on first set.
    Owned { buffer: wgpu::Buffer, size: u64 },
    /// Collaborator-provided buffer (storage data, instance pools, …).
    External { buffer: wgpu::Buffer, size: u64 },
    /// Double-buffered pair; `current` selects the side at bind time.
    PingPong {
        buffers: [wgpu::Buffer; 2],
        size: u64,
        current: PingPongSide,
    },
}

impl BufferSlot {
    fn size(&self) -> u64 {
        match self {
            BufferSlot::Owned { size, .. }
            | BufferSlot::External { size, .. }
            | BufferSlot::PingPong { size, .. } => *size,
        }
    }

    fn current_buffer(&self) -> &wgpu::Buffer {
        match self {
            BufferSlot::Owned { buffer, .. } | BufferSlot::External { buffer, .. } => buffer,
            BufferSlot::PingPong {
                buffers, current, ..
            } => &buffers[current.index()],
        }
    }
}

/// Container binding named shader properties to concrete GPU resources,
/// plus the scope's macro set.
///
/// Owned by the entity it describes; a material's instance is shared between
/// renderers through the material's `Arc`.
pub struct ShaderData {
    group: ShaderDataGroup,
    ctx: Arc<ShaderContext>,
    macros: MacroSet,
    buffers: FxHashMap<u32, BufferSlot>,
    textures: FxHashMap<u32, wgpu::TextureView>,
    samplers: FxHashMap<u32, wgpu::Sampler>,
}

impl ShaderData {
    #[must_use]
    pub fn new(group: ShaderDataGroup, ctx: Arc<ShaderContext>) -> Self {
        Self {
            group,
            ctx,
            macros: MacroSet::new(),
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            samplers: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> ShaderDataGroup {
        self.group
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<ShaderContext> {
        &self.ctx
    }

    // ── Macro state ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn macros(&self) -> &MacroSet {
        &self.macros
    }

    /// Enables a boolean feature flag.
    pub fn enable_macro(&mut self, name: &str) {
        let m = self.ctx.macros.get_or_create(name);
        self.macros.enable(m);
    }

    /// Enables a value-carrying feature flag, replacing any previous value
    /// under the same name.
    pub fn enable_value_macro(&mut self, name: &str, value: &str) -> Result<()> {
        self.macros.enable_variable(&self.ctx.macros, name, value)
    }

    /// Disables a flag by name. Unknown names are a no-op, not an error.
    pub fn disable_macro(&mut self, name: &str) {
        self.macros.disable_by_name(&self.ctx.macros, name);
    }

    // ── Typed uniform setters ────────────────────────────────────────────────

    pub fn set_scalar(&mut self, gpu: &WgpuContext, name: &str, value: f32) -> Result<()> {
        self.set_bytes(gpu, name, bytemuck::bytes_of(&value))
    }

    pub fn set_vector2(&mut self, gpu: &WgpuContext, name: &str, value: Vec2) -> Result<()> {
        self.set_bytes(gpu, name, bytemuck::bytes_of(&value))
    }

    pub fn set_vector3(&mut self, gpu: &WgpuContext, name: &str, value: Vec3) -> Result<()> {
        self.set_bytes(gpu, name, bytemuck::bytes_of(&value))
    }

    pub fn set_vector4(&mut self, gpu: &WgpuContext, name: &str, value: Vec4) -> Result<()> {
        self.set_bytes(gpu, name, bytemuck::bytes_of(&value))
    }

    pub fn set_matrix(&mut self, gpu: &WgpuContext, name: &str, value: Mat4) -> Result<()> {
        self.set_bytes(gpu, name, bytemuck::bytes_of(&value))
    }

    /// Uploads a packed array (uniform block structs, light arrays, …).
    pub fn set_array<T: Pod>(&mut self, gpu: &WgpuContext, name: &str, values: &[T]) -> Result<()> {
        self.set_bytes(gpu, name, bytemuck::cast_slice(values))
    }

    fn set_bytes(&mut self, gpu: &WgpuContext, name: &str, bytes: &[u8]) -> Result<()> {
        let property = self.claim(name)?;
        let submitted = bytes.len() as u64;

        if let Some(slot) = self.buffers.get(&property.id()) {
            if slot.size() != submitted {
                return Err(PrismError::BufferSizeChanged {
                    name: property.name().to_string(),
                    allocated: slot.size(),
                    submitted,
                });
            }
            gpu.queue.write_buffer(slot.current_buffer(), 0, bytes);
            return Ok(());
        }

        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(property.name()),
            size: submitted,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue.write_buffer(&buffer, 0, bytes);
        self.buffers.insert(
            property.id(),
            BufferSlot::Owned {
                buffer,
                size: submitted,
            },
        );
        Ok(())
    }

    // ── Resource setters ─────────────────────────────────────────────────────

    /// Stores a collaborator-owned buffer (storage buffers, instance data).
    pub fn set_storage_buffer(
        &mut self,
        name: &str,
        buffer: wgpu::Buffer,
        size: u64,
    ) -> Result<()> {
        let property = self.claim(name)?;
        self.buffers
            .insert(property.id(), BufferSlot::External { buffer, size });
        Ok(())
    }

    /// Registers a double-buffered pair resolved at bind time.
    ///
    /// The current side starts at [`PingPongSide::A`]; [`Self::flip`] must be
    /// called exactly once per frame, before any draw reads the pair, and
    /// externally serialized against in-flight GPU submission of the
    /// previous frame.
    pub fn set_ping_pong_buffers(
        &mut self,
        name: &str,
        buffers: [wgpu::Buffer; 2],
        size: u64,
    ) -> Result<()> {
        let property = self.claim(name)?;
        self.buffers.insert(
            property.id(),
            BufferSlot::PingPong {
                buffers,
                size,
                current: PingPongSide::A,
            },
        );
        Ok(())
    }

    /// Flips a ping-pong pair to its other side. No-op for unknown names or
    /// non-ping-pong slots.
    pub fn flip(&mut self, name: &str) {
        if let Some(property) = self.ctx.properties.get(name)
            && let Some(BufferSlot::PingPong { current, .. }) =
                self.buffers.get_mut(&property.id())
        {
            *current = current.flipped();
        }
    }

    /// The currently bound side of a ping-pong pair, if the slot is one.
    #[must_use]
    pub fn ping_pong_side(&self, name: &str) -> Option<PingPongSide> {
        let property = self.ctx.properties.get(name)?;
        match self.buffers.get(&property.id()) {
            Some(BufferSlot::PingPong { current, .. }) => Some(*current),
            _ => None,
        }
    }

    /// Stores a texture view and its sampler under separate properties.
    ///
    /// A previously set slot updates in place without reallocation.
    pub fn set_sampled_texture(
        &mut self,
        texture_name: &str,
        sampler_name: &str,
        view: wgpu::TextureView,
        sampler: wgpu::Sampler,
    ) -> Result<()> {
        let texture_prop = self.claim(texture_name)?;
        let sampler_prop = self.claim(sampler_name)?;
        self.textures.insert(texture_prop.id(), view);
        self.samplers.insert(sampler_prop.id(), sampler);
        Ok(())
    }

    /// Stores a storage image view.
    pub fn set_storage_texture(&mut self, name: &str, view: wgpu::TextureView) -> Result<()> {
        let property = self.claim(name)?;
        self.textures.insert(property.id(), view);
        Ok(())
    }

    /// Stores a standalone sampler.
    pub fn set_sampler(&mut self, name: &str, sampler: wgpu::Sampler) -> Result<()> {
        let property = self.claim(name)?;
        self.samplers.insert(property.id(), sampler);
        Ok(())
    }

    fn claim(&self, name: &str) -> Result<ShaderProperty> {
        let property = self.ctx.properties.get_or_create(name);
        self.ctx.properties.claim(property, self.group)?;
        Ok(property)
    }

    // ── Draw-time binding ────────────────────────────────────────────────────

    /// Matches this scope's resources against a stage manifest, inserting or
    /// merging entries into `collector`.
    ///
    /// Called once per stage and scope, in scope priority order (scene,
    /// camera, renderer, material): a collision on (group, binding) keeps the
    /// first writer's resource and ORs in this stage's visibility.
    pub fn bind_data(
        &self,
        visibility: wgpu::ShaderStages,
        manifest: &[BindPoint],
        collector: &mut BindingCollector,
    ) {
        for point in manifest {
            if !self.holds(point) {
                continue;
            }
            collector.insert(
                point.group,
                point.binding,
                point.kind.as_binding_type(),
                visibility,
                ResourceRef {
                    scope: self.group,
                    property: point.property.id(),
                },
            );
        }
    }

    fn holds(&self, point: &BindPoint) -> bool {
        match point.kind {
            BindPointKind::UniformBuffer { .. } | BindPointKind::StorageBuffer { .. } => {
                self.buffers.contains_key(&point.property.id())
            }
            BindPointKind::SampledTexture { .. } | BindPointKind::StorageTexture { .. } => {
                self.textures.contains_key(&point.property.id())
            }
            BindPointKind::Sampler { .. } => self.samplers.contains_key(&point.property.id()),
        }
    }

    /// Resolves a property to its wgpu binding resource. Ping-pong slots
    /// resolve their current side here, at bind-group creation time.
    #[must_use]
    pub(crate) fn binding_resource(
        &self,
        property: u32,
        ty: &wgpu::BindingType,
    ) -> Option<wgpu::BindingResource<'_>> {
        match ty {
            wgpu::BindingType::Buffer { .. } => self
                .buffers
                .get(&property)
                .map(|slot| slot.current_buffer().as_entire_binding()),
            wgpu::BindingType::Texture { .. } | wgpu::BindingType::StorageTexture { .. } => self
                .textures
                .get(&property)
                .map(wgpu::BindingResource::TextureView),
            wgpu::BindingType::Sampler(_) => self
                .samplers
                .get(&property)
                .map(wgpu::BindingResource::Sampler),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderContext;

    #[test]
    fn macro_delegation_round_trips() {
        let ctx = ShaderContext::new();
        let mut data = ShaderData::new(ShaderDataGroup::Material, ctx.clone());

        data.enable_macro("HAS_EMISSIVE");
        assert!(data.macros().is_enabled_name(&ctx.macros, "HAS_EMISSIVE"));

        data.enable_value_macro("LIGHT_COUNT", "4").unwrap();
        assert_eq!(data.macros().variable_value("LIGHT_COUNT"), "4");

        data.disable_macro("HAS_EMISSIVE");
        assert!(!data.macros().is_enabled_name(&ctx.macros, "HAS_EMISSIVE"));

        // Unknown names are silently ignored.
        data.disable_macro("NEVER_REGISTERED");
    }

    #[test]
    fn scope_claim_conflict_is_reported() {
        let ctx = ShaderContext::new();
        let scene = ShaderData::new(ShaderDataGroup::Scene, ctx.clone());
        let material = ShaderData::new(ShaderDataGroup::Material, ctx);

        scene.claim("fog_params").unwrap();
        let conflict = material.claim("fog_params");
        assert!(matches!(
            conflict,
            Err(PrismError::PropertyScopeConflict { .. })
        ));
    }

    #[test]
    fn ping_pong_side_flips_between_two_states() {
        assert_eq!(PingPongSide::A.flipped(), PingPongSide::B);
        assert_eq!(PingPongSide::B.flipped(), PingPongSide::A);
        assert_eq!(PingPongSide::A.flipped().flipped(), PingPongSide::A);
    }
}
