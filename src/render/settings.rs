//! Renderer Settings
//!
//! Global configuration for the draw pipeline, consumed once at construction
//! time. Kept deliberately small: target formats and clear color for the
//! forward pass, plus the two knobs of the variant system (debug source
//! logging and the variable-macro cardinality cap).

use crate::shader::macros::DEFAULT_VARIABLE_VALUE_CAP;

/// Configuration for [`ForwardRenderer`](crate::render::ForwardRenderer) and
/// the shader variant system.
///
/// | Field                     | Description                                | Default              |
/// |---------------------------|--------------------------------------------|----------------------|
/// | `clear_color`             | Forward pass clear color                   | Black (0,0,0,1)      |
/// | `color_format`            | Color attachment format                    | `Bgra8UnormSrgb`     |
/// | `depth_format`            | Depth attachment format                    | `Depth32Float`       |
/// | `sample_count`            | MSAA sample count                          | `1`                  |
/// | `print_generated_shaders` | Log every composed WGSL source             | `false`              |
/// | `variable_value_cap`      | Distinct values per variable macro name    | `64`                 |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Background clear color for the forward pass.
    pub clear_color: wgpu::Color,

    /// Color attachment format pipelines are built against.
    pub color_format: wgpu::TextureFormat,

    /// Depth attachment format pipelines are built against.
    pub depth_format: wgpu::TextureFormat,

    /// MSAA sample count. Common values: 1 (off), 2, 4, 8.
    pub sample_count: u32,

    /// Log every composed shader source at debug level.
    ///
    /// Feed into [`VariantCache::with_shader_logging`](crate::shader::VariantCache::with_shader_logging).
    pub print_generated_shaders: bool,

    /// Cap on distinct values per variable macro name.
    ///
    /// Value-carrying macros (light counts, bone counts) each occupy a
    /// variant-cache key bit per distinct value; the cap bounds cache growth.
    /// Feed into [`ShaderContext::with_variable_value_cap`](crate::shader::ShaderContext::with_variable_value_cap).
    pub variable_value_cap: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: wgpu::TextureFormat::Depth32Float,
            sample_count: 1,
            print_generated_shaders: false,
            variable_value_cap: DEFAULT_VARIABLE_VALUE_CAP,
        }
    }
}
