//! Bind Point Manifest Types
//!
//! A [`BindPoint`] is one (group, binding) slot a composed shader requires,
//! together with the resource shape the slot expects and the stage visibility
//! it was declared under. The composer emits the manifest while it emits
//! source; draw-time binding resolution matches each point against the data
//! scopes. Bind points are ephemeral — rebuilt every time source is composed
//! and stored only inside the immutable compiled variant.
//!
//! Resource kinds are a small closed set, so they are modeled as a tagged
//! enum rather than trait objects.

use std::num::NonZeroU64;

use crate::shader::property::ShaderProperty;

/// The resource shape of one bind point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindPointKind {
    /// Uniform buffer binding.
    UniformBuffer {
        /// Dynamic offset support (`has_dynamic_offset`).
        dynamic: bool,
        /// Minimum binding size (`min_binding_size`).
        min_size: Option<u64>,
    },

    /// Storage buffer binding (read-only or read-write).
    StorageBuffer { read_only: bool },

    /// Sampled texture binding.
    SampledTexture {
        sample_type: wgpu::TextureSampleType,
        view_dimension: wgpu::TextureViewDimension,
        multisampled: bool,
    },

    /// Storage texture binding.
    StorageTexture {
        access: wgpu::StorageTextureAccess,
        format: wgpu::TextureFormat,
        view_dimension: wgpu::TextureViewDimension,
    },

    /// Sampler binding.
    Sampler { ty: wgpu::SamplerBindingType },
}

impl BindPointKind {
    /// Whether a re-declaration with `other` is acceptable for the same
    /// (group, binding) slot. Shapes must match exactly; only the stage
    /// visibility may differ between declarations.
    #[inline]
    #[must_use]
    pub fn is_compatible(&self, other: &BindPointKind) -> bool {
        self == other
    }

    /// The wgpu binding type for layout creation.
    #[must_use]
    pub fn as_binding_type(&self) -> wgpu::BindingType {
        match *self {
            BindPointKind::UniformBuffer { dynamic, min_size } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: min_size.and_then(NonZeroU64::new),
            },
            BindPointKind::StorageBuffer { read_only } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindPointKind::SampledTexture {
                sample_type,
                view_dimension,
                multisampled,
            } => wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled,
            },
            BindPointKind::StorageTexture {
                access,
                format,
                view_dimension,
            } => wgpu::BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            },
            BindPointKind::Sampler { ty } => wgpu::BindingType::Sampler(ty),
        }
    }
}

/// One (group, binding) slot a compiled program requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindPoint {
    /// The property that owns this slot.
    pub property: ShaderProperty,
    /// Bind group index (the owning scope's group).
    pub group: u32,
    /// Binding index within the group.
    pub binding: u32,
    /// Shader stages that reference this slot.
    pub visibility: wgpu::ShaderStages,
    /// Expected resource shape.
    pub kind: BindPointKind,
}

impl BindPoint {
    /// The bind-group-layout entry this point maps to, one-to-one.
    #[must_use]
    pub fn layout_entry(&self) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding: self.binding,
            visibility: self.visibility,
            ty: self.kind.as_binding_type(),
            count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_entry_mirrors_kind() {
        let registry = crate::shader::PropertyRegistry::new();
        let prop = registry.get_or_create("blur_source");

        let point = BindPoint {
            property: prop,
            group: 0,
            binding: 3,
            visibility: wgpu::ShaderStages::FRAGMENT,
            kind: BindPointKind::SampledTexture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
        };

        let entry = point.layout_entry();
        assert_eq!(entry.binding, 3);
        assert_eq!(entry.visibility, wgpu::ShaderStages::FRAGMENT);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::Texture {
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
                ..
            }
        ));
    }

    #[test]
    fn compatibility_requires_exact_shape() {
        let uniform = BindPointKind::UniformBuffer {
            dynamic: false,
            min_size: None,
        };
        let storage = BindPointKind::StorageBuffer { read_only: true };
        assert!(uniform.is_compatible(&uniform));
        assert!(!uniform.is_compatible(&storage));
    }
}
