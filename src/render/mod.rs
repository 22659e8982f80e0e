//! Draw-Time Pipeline
//!
//! Everything between "a set of visible renderables" and "GPU draw calls":
//! per-scope [`ShaderData`] containers, bind-group resolution, render-queue
//! classification and sorting, the pipeline cache, and the forward draw loop.

pub mod binding;
pub mod camera;
pub mod context;
pub mod culling;
pub mod drawer;
pub mod material;
pub mod pipeline;
pub mod queue;
pub mod renderable;
pub mod settings;
pub mod shader_data;

pub use binding::{BindGroupLayoutCache, BindingCollector, ResourceRef, ScopeSet};
pub use camera::{Projection, RenderCamera};
pub use context::WgpuContext;
pub use culling::{BoundingSphere, Frustum, Layer};
pub use drawer::{ForwardRenderer, FrameStats};
pub use material::{Material, RenderStates, SharedMaterial};
pub use pipeline::{PipelineCache, PipelineKey, RenderPipelineId};
pub use queue::{RenderElement, RenderQueue, RenderQueueBucket, RenderQueueType};
pub use renderable::{Geometry, IndexStream, MeshRenderer, VertexStream};
pub use settings::RendererSettings;
pub use shader_data::{PingPongSide, ShaderData};
