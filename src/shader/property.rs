//! Shader Property Registry
//!
//! Every named shader resource (uniform block, storage buffer, texture,
//! sampler) gets a stable integer id on first use. The scope a property is
//! first used in claims it permanently: the scope doubles as the WGSL
//! `@group` index, and the per-scope claim order assigns the `@binding`
//! index, so composition and draw-time resolution agree on slots without any
//! negotiation. Using one name from two scopes would corrupt bind-group
//! merging, so it fails fast as a registration conflict.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};
use crate::utils::interner::{self, Symbol};

/// The four data scopes, in binding priority order.
///
/// The discriminant doubles as the WGSL `@group` index, and the `bind_data`
/// call order (scene first, material last) realizes first-writer-wins
/// priority: scene-level bindings cannot be silently overridden by a material
/// that declares the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ShaderDataGroup {
    Scene = 0,
    Camera = 1,
    Renderer = 2,
    Material = 3,
}

impl ShaderDataGroup {
    /// Number of data scopes (and the upper bound on bind group count).
    pub const COUNT: usize = 4;

    /// The wgpu bind group index for this scope.
    #[inline]
    #[must_use]
    pub fn bind_group_index(self) -> u32 {
        self as u32
    }
}

/// A named shader property with a stable integer id.
///
/// Copy handle; the registry owns the backing record (owning scope, binding
/// slot), which lives for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderProperty {
    id: u32,
    name: Symbol,
}

impl ShaderProperty {
    /// Globally unique property id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The property name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        interner::resolve(self.name)
    }
}

struct PropertyRecord {
    name: Symbol,
    group: Option<ShaderDataGroup>,
    binding: u32,
}

#[derive(Default)]
struct RegistryInner {
    by_name: FxHashMap<Symbol, u32>,
    records: Vec<PropertyRecord>,
    next_binding: [u32; ShaderDataGroup::COUNT],
}

/// Process-scoped registry of shader properties.
///
/// Append-only like [`MacroRegistry`](crate::shader::MacroRegistry); shared
/// through [`ShaderContext`](crate::shader::ShaderContext).
#[derive(Default)]
pub struct PropertyRegistry {
    inner: RwLock<RegistryInner>,
}

impl PropertyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the property for `name`, allocating an id on miss.
    ///
    /// The property is not yet bound to a scope; the first claim (from a
    /// setter or a composer binding declaration) decides that.
    pub fn get_or_create(&self, name: &str) -> ShaderProperty {
        let name_sym = interner::intern(name);
        if let Some(&id) = self.inner.read().by_name.get(&name_sym) {
            return ShaderProperty { id, name: name_sym };
        }

        let mut inner = self.inner.write();
        if let Some(&id) = inner.by_name.get(&name_sym) {
            return ShaderProperty { id, name: name_sym };
        }
        let id = inner.records.len() as u32;
        inner.records.push(PropertyRecord {
            name: name_sym,
            group: None,
            binding: 0,
        });
        inner.by_name.insert(name_sym, id);
        ShaderProperty { id, name: name_sym }
    }

    /// Looks up an existing property without registering it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ShaderProperty> {
        let name_sym = interner::get(name)?;
        let id = *self.inner.read().by_name.get(&name_sym)?;
        Some(ShaderProperty { id, name: name_sym })
    }

    /// Claims `property` for `group`, returning its binding index.
    ///
    /// The first claim assigns the scope and the next free binding slot
    /// within it; later claims from the same scope return the recorded slot.
    /// A claim from a different scope is a registration conflict.
    pub fn claim(&self, property: ShaderProperty, group: ShaderDataGroup) -> Result<u32> {
        let mut inner = self.inner.write();
        let record = &inner.records[property.id as usize];
        match record.group {
            Some(owner) if owner == group => Ok(record.binding),
            Some(owner) => Err(PrismError::PropertyScopeConflict {
                name: property.name().to_string(),
                owner,
                requested: group,
            }),
            None => {
                let binding = inner.next_binding[group as usize];
                inner.next_binding[group as usize] += 1;
                let record = &mut inner.records[property.id as usize];
                record.group = Some(group);
                record.binding = binding;
                Ok(binding)
            }
        }
    }

    /// The scope that claimed `property`, if any.
    #[must_use]
    pub fn group_of(&self, property: ShaderProperty) -> Option<ShaderDataGroup> {
        self.inner.read().records[property.id as usize].group
    }

    /// The binding index assigned to `property`, if it was claimed.
    #[must_use]
    pub fn binding_of(&self, property: ShaderProperty) -> Option<u32> {
        let inner = self.inner.read();
        let record = &inner.records[property.id as usize];
        record.group.map(|_| record.binding)
    }

    /// The name behind a property id, for diagnostics.
    #[must_use]
    pub fn name_of(&self, id: u32) -> Option<&'static str> {
        self.inner
            .read()
            .records
            .get(id as usize)
            .map(|record| interner::resolve(record.name))
    }

    /// Number of registered properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable() {
        let registry = PropertyRegistry::new();
        let a = registry.get_or_create("camera");
        let b = registry.get_or_create("model");
        let a2 = registry.get_or_create("camera");

        assert_eq!(a, a2);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn claim_assigns_sequential_bindings_per_group() {
        let registry = PropertyRegistry::new();
        let a = registry.get_or_create("base_color");
        let b = registry.get_or_create("base_texture");
        let c = registry.get_or_create("camera");

        assert_eq!(registry.claim(a, ShaderDataGroup::Material).unwrap(), 0);
        assert_eq!(registry.claim(b, ShaderDataGroup::Material).unwrap(), 1);
        // Separate group, separate binding counter.
        assert_eq!(registry.claim(c, ShaderDataGroup::Camera).unwrap(), 0);
        // Re-claim from the owning scope is idempotent.
        assert_eq!(registry.claim(a, ShaderDataGroup::Material).unwrap(), 0);
    }

    #[test]
    fn cross_scope_claim_is_rejected() {
        let registry = PropertyRegistry::new();
        let prop = registry.get_or_create("shadow_map");
        registry.claim(prop, ShaderDataGroup::Scene).unwrap();

        let conflict = registry.claim(prop, ShaderDataGroup::Material);
        assert!(matches!(
            conflict,
            Err(PrismError::PropertyScopeConflict {
                owner: ShaderDataGroup::Scene,
                requested: ShaderDataGroup::Material,
                ..
            })
        ));
        // The original claim is untouched.
        assert_eq!(registry.group_of(prop), Some(ShaderDataGroup::Scene));
    }
}
