//! Shader Variant System
//!
//! Everything between "a material enabled a feature flag" and "a compiled
//! `wgpu::ShaderModule` with a known set of bind points":
//!
//! - [`MacroRegistry`] / [`ShaderMacro`]: stable (word, bit) slots for named
//!   feature flags.
//! - [`MacroSet`]: the per-scope bitmask of enabled flags; union of the four
//!   scopes forms a draw's compile key.
//! - [`PropertyRegistry`] / [`ShaderProperty`]: stable ids and bind slots for
//!   named shader resources.
//! - [`SourceComposer`] + [`ShaderChunk`]: composable WGSL generation that
//!   also reflects the [`BindPoint`] manifest.
//! - [`ShaderPass`] + [`VariantCache`]: compile-once memoization keyed by
//!   (pass, exact macro words).

pub mod bind_point;
pub mod chunks;
pub mod composer;
pub mod context;
pub mod macro_set;
pub mod macros;
pub mod pass;
pub mod property;
pub mod variant;

pub use bind_point::{BindPoint, BindPointKind};
pub use composer::{ComposedStage, ShaderChunk, ShaderStage, SourceComposer};
pub use context::ShaderContext;
pub use macro_set::MacroSet;
pub use macros::{MacroDefine, MacroRegistry, ShaderMacro};
pub use pass::{ComposedProgram, ShaderPass, ShaderPassId};
pub use property::{PropertyRegistry, ShaderDataGroup, ShaderProperty};
pub use variant::{CompiledVariant, VariantCache, VariantKey};
