//! Bind Group Resolution
//!
//! Collects the (group, binding) entries contributed by the four data scopes
//! into one set of bind groups per draw. The merge rule realizes the scope
//! priority: when two scopes contribute the same slot, the first writer's
//! resource wins and the visibilities OR together — `bind_data` is called in
//! scene, camera, renderer, material order, so scene-level bindings cannot be
//! silently overridden by a material declaring the same slot.
//!
//! Resources are collected as scope+property **references**, not GPU handles;
//! [`BindingCollector::build_bind_groups`] resolves them at bind-group
//! creation time. That indirection is what lets ping-pong slots pick their
//! current side per frame without re-registering.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};
use crate::render::shader_data::ShaderData;
use crate::shader::bind_point::BindPoint;
use crate::shader::property::ShaderDataGroup;

/// Reference to a resource held by one scope: resolved against the scope's
/// tables when the bind group is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
    pub scope: ShaderDataGroup,
    pub property: u32,
}

#[derive(Debug, Clone)]
struct CollectedBinding {
    ty: wgpu::BindingType,
    visibility: wgpu::ShaderStages,
    resource: ResourceRef,
}

/// The four scopes of one draw, in priority order.
#[derive(Clone, Copy)]
pub struct ScopeSet<'a> {
    pub scene: &'a ShaderData,
    pub camera: &'a ShaderData,
    pub renderer: &'a ShaderData,
    pub material: &'a ShaderData,
}

impl<'a> ScopeSet<'a> {
    #[must_use]
    fn scope(&self, group: ShaderDataGroup) -> &'a ShaderData {
        match group {
            ShaderDataGroup::Scene => self.scene,
            ShaderDataGroup::Camera => self.camera,
            ShaderDataGroup::Renderer => self.renderer,
            ShaderDataGroup::Material => self.material,
        }
    }
}

/// Layout and resource entries of one draw, merged across scopes and stages.
///
/// Pooled: cleared per draw, allocations retained.
#[derive(Default)]
pub struct BindingCollector {
    /// group index → binding index → merged entry. BTreeMap keeps entries in
    /// binding order, which layout hashing and creation rely on.
    groups: [BTreeMap<u32, CollectedBinding>; ShaderDataGroup::COUNT],
}

impl BindingCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets for the next draw, keeping allocations.
    pub fn clear(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
    }

    /// Inserts or merges one entry.
    ///
    /// An existing (group, binding) entry keeps its resource — first writer
    /// wins — and only widens its visibility mask. Composition has already
    /// rejected incompatible kinds for a shared slot, so `ty` always matches
    /// the first writer's.
    pub fn insert(
        &mut self,
        group: u32,
        binding: u32,
        ty: wgpu::BindingType,
        visibility: wgpu::ShaderStages,
        resource: ResourceRef,
    ) {
        let entries = &mut self.groups[group as usize];
        match entries.get_mut(&binding) {
            Some(existing) => {
                debug_assert_eq!(existing.ty, ty);
                existing.visibility |= visibility;
            }
            None => {
                entries.insert(
                    binding,
                    CollectedBinding {
                        ty,
                        visibility,
                        resource,
                    },
                );
            }
        }
    }

    /// The merged visibility of one slot, if collected.
    #[must_use]
    pub fn visibility_of(&self, group: u32, binding: u32) -> Option<wgpu::ShaderStages> {
        self.groups[group as usize]
            .get(&binding)
            .map(|e| e.visibility)
    }

    /// The winning resource reference of one slot, if collected.
    #[must_use]
    pub fn resource_of(&self, group: u32, binding: u32) -> Option<ResourceRef> {
        self.groups[group as usize]
            .get(&binding)
            .map(|e| e.resource)
    }

    /// The first manifest point no scope provided a resource for, if any.
    ///
    /// A gap means the compiled program expects a resource nobody set; the
    /// draw is skipped and diagnosed by the caller.
    #[must_use]
    pub fn first_gap<'m>(&self, manifest: &'m [BindPoint]) -> Option<&'m BindPoint> {
        manifest
            .iter()
            .find(|point| !self.groups[point.group as usize].contains_key(&point.binding))
    }

    /// Number of bind groups the collected entries span (highest used group
    /// index + 1). Unused intermediate groups still get empty layouts so
    /// group indices line up with the shader.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups
            .iter()
            .rposition(|entries| !entries.is_empty())
            .map_or(0, |highest| highest + 1)
    }

    /// Materializes layouts and bind groups for every used group.
    ///
    /// Ping-pong slots resolve their current side here — at bind time.
    pub fn build_bind_groups(
        &self,
        device: &wgpu::Device,
        scopes: ScopeSet<'_>,
        layouts: &mut BindGroupLayoutCache,
    ) -> Result<Vec<(wgpu::BindGroupLayout, wgpu::BindGroup)>> {
        let count = self.group_count();
        let mut result = Vec::with_capacity(count);

        for group_index in 0..count {
            let entries = &self.groups[group_index];

            let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = entries
                .iter()
                .map(|(&binding, collected)| wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: collected.visibility,
                    ty: collected.ty,
                    count: None,
                })
                .collect();
            let layout = layouts.get_or_create(device, &layout_entries);

            let mut group_entries = Vec::with_capacity(entries.len());
            for (&binding, collected) in entries {
                let scope = scopes.scope(collected.resource.scope);
                let resource = scope
                    .binding_resource(collected.resource.property, &collected.ty)
                    .ok_or_else(|| PrismError::MissingResource {
                        name: scope
                            .context()
                            .properties
                            .name_of(collected.resource.property)
                            .unwrap_or_default()
                            .to_string(),
                        group: group_index as u32,
                        binding,
                    })?;
                group_entries.push(wgpu::BindGroupEntry { binding, resource });
            }

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("draw bind group"),
                layout: &layout,
                entries: &group_entries,
            });
            result.push((layout, bind_group));
        }

        Ok(result)
    }
}

/// Deduplicates `wgpu::BindGroupLayout`s by their entry list.
///
/// Layouts feed pipeline-layout creation, and wgpu compares them by identity
/// when validating bind calls, so reuse matters for both memory and pipeline
/// cache hit rates.
#[derive(Default)]
pub struct BindGroupLayoutCache {
    layouts: FxHashMap<u64, wgpu::BindGroupLayout>,
}

impl BindGroupLayoutCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> wgpu::BindGroupLayout {
        let hash = crate::render::pipeline::fx_hash_key(&entries);
        self.layouts
            .entry(hash)
            .or_insert_with(|| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("cached bind group layout"),
                    entries,
                })
            })
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFORM: wgpu::BindingType = wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    };

    #[test]
    fn first_writer_wins_and_visibility_ors() {
        let mut collector = BindingCollector::new();

        // Scene writes the slot from the vertex manifest first…
        collector.insert(
            0,
            5,
            UNIFORM,
            wgpu::ShaderStages::VERTEX,
            ResourceRef {
                scope: ShaderDataGroup::Scene,
                property: 7,
            },
        );
        // …then the material contributes the same slot from the fragment side.
        collector.insert(
            0,
            5,
            UNIFORM,
            wgpu::ShaderStages::FRAGMENT,
            ResourceRef {
                scope: ShaderDataGroup::Material,
                property: 7,
            },
        );

        assert_eq!(
            collector.visibility_of(0, 5),
            Some(wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)
        );
        assert_eq!(
            collector.resource_of(0, 5).map(|r| r.scope),
            Some(ShaderDataGroup::Scene)
        );
    }

    #[test]
    fn group_count_spans_up_to_highest_used_group() {
        let mut collector = BindingCollector::new();
        assert_eq!(collector.group_count(), 0);

        collector.insert(
            2,
            0,
            UNIFORM,
            wgpu::ShaderStages::VERTEX,
            ResourceRef {
                scope: ShaderDataGroup::Renderer,
                property: 1,
            },
        );
        // Groups 0 and 1 are empty but still counted so indices line up.
        assert_eq!(collector.group_count(), 3);
    }

    #[test]
    fn clear_resets_entries() {
        let mut collector = BindingCollector::new();
        collector.insert(
            0,
            0,
            UNIFORM,
            wgpu::ShaderStages::VERTEX,
            ResourceRef {
                scope: ShaderDataGroup::Scene,
                property: 0,
            },
        );
        collector.clear();
        assert_eq!(collector.group_count(), 0);
        assert!(collector.visibility_of(0, 0).is_none());
    }
}
