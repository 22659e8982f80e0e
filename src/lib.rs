//! # Prism
//!
//! Shader variant compilation and resource binding core for a wgpu renderer.
//!
//! The crate covers the path from "a material enabled a feature flag" to "a
//! sorted stream of draw calls with resolved bind groups":
//!
//! - [`shader`]: macro bitmasks, composable WGSL source generation with a
//!   reflected bind point manifest, and the variant cache.
//! - [`render`]: per-scope [`ShaderData`](render::ShaderData) containers,
//!   bind group resolution across the scene/camera/renderer/material scopes,
//!   render-queue classification and sorting, and the forward draw loop.
//!
//! Scene graphs, asset loading, animation, and windowing are collaborator
//! concerns and live outside this crate.

pub mod errors;
pub mod render;
pub mod shader;
pub mod utils;

pub use errors::{PrismError, Result};
pub use render::{
    ForwardRenderer, Geometry, Material, MeshRenderer, RenderCamera, RenderQueueType,
    RendererSettings, ShaderData, WgpuContext,
};
pub use shader::{MacroSet, ShaderContext, ShaderDataGroup, ShaderPass, VariantCache};
pub use utils::interner;
