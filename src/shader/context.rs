//! Shader Context
//!
//! The explicit home of the process-scoped registries. Passed by
//! `Arc<ShaderContext>` into composers, passes, and data scopes instead of
//! living in statics, so multiple independent engine instances can coexist in
//! one process and tests stay hermetic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::shader::macros::{DEFAULT_VARIABLE_VALUE_CAP, MacroRegistry};
use crate::shader::pass::ShaderPassId;
use crate::shader::property::PropertyRegistry;

/// Shared registries for one engine instance.
pub struct ShaderContext {
    /// Feature-flag slot registry.
    pub macros: MacroRegistry,
    /// Shader-property id registry.
    pub properties: PropertyRegistry,
    next_pass_id: AtomicU32,
}

impl Default for ShaderContext {
    fn default() -> Self {
        Self::with_variable_value_cap(DEFAULT_VARIABLE_VALUE_CAP)
    }
}

impl ShaderContext {
    /// Creates a context with the default variable-macro cardinality cap.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a context with an explicit variable-macro cardinality cap.
    #[must_use]
    pub fn with_variable_value_cap(cap: u32) -> Self {
        Self {
            macros: MacroRegistry::new(cap),
            properties: PropertyRegistry::new(),
            next_pass_id: AtomicU32::new(0),
        }
    }

    /// Allocates a fresh shader pass id.
    pub fn allocate_pass_id(&self) -> ShaderPassId {
        ShaderPassId(self.next_pass_id.fetch_add(1, Ordering::Relaxed))
    }
}
