//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`PrismError`] covers the failure modes of the shader
//! variant and binding pipeline:
//! - Property registration conflicts (a name claimed by two data scopes)
//! - Shader composition conflicts (incompatible bind point redeclaration)
//! - Binding resolution gaps (a compiled program expects a resource no scope set)
//! - Uniform payload size changes after the backing buffer was allocated
//!
//! Device-level failures (shader validation, device loss) are not modeled here:
//! wgpu surfaces them through its uncaptured-error hook and they are fatal by
//! design — there is no fallback shader path.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, PrismError>`.

use thiserror::Error;

use crate::shader::ShaderDataGroup;

/// The main error type for the Prism engine.
///
/// Each variant provides specific context about what went wrong. Variants map
/// onto the pipeline's failure taxonomy: registration conflicts and payload
/// size changes are detected eagerly at set time, composition conflicts before
/// any GPU call, and resolution gaps at draw time (where the affected draw is
/// skipped rather than aborting the frame).
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// A shader property name was used in two different data scopes.
    #[error("shader property '{name}' belongs to {owner:?} scope, rejected use from {requested:?}")]
    PropertyScopeConflict {
        /// The property name
        name: String,
        /// The scope that first claimed the property
        owner: ShaderDataGroup,
        /// The scope that attempted the conflicting use
        requested: ShaderDataGroup,
    },

    /// A value-carrying macro exceeded the configured distinct-value cap.
    #[error("variable macro '{name}' exceeded {cap} distinct values")]
    VariableMacroOverflow {
        /// The variable macro name
        name: String,
        /// The configured cardinality cap
        cap: u32,
    },

    // ========================================================================
    // Composition Errors
    // ========================================================================
    /// A shader fragment referenced a property that was never registered.
    #[error("shader property '{0}' referenced during composition but never registered")]
    PropertyUnregistered(String),

    /// Two fragments declared the same bind point with incompatible shapes.
    #[error("bind point (group {group}, binding {binding}) redeclared with an incompatible kind")]
    BindingConflict {
        /// The bind group index
        group: u32,
        /// The binding index within the group
        binding: u32,
    },

    // ========================================================================
    // Data Upload Errors
    // ========================================================================
    /// A property's uniform payload changed byte length after its backing
    /// buffer was allocated. Buffer sizes are fixed for the lifetime of a
    /// `ShaderData`; recreate the container to change payload shapes.
    #[error("property '{name}' payload changed from {allocated} to {submitted} bytes")]
    BufferSizeChanged {
        /// The property name
        name: String,
        /// The byte size the backing buffer was allocated with
        allocated: u64,
        /// The byte size of the rejected upload
        submitted: u64,
    },

    // ========================================================================
    // Draw-Time Errors
    // ========================================================================
    /// The compiled program expects a resource that no data scope provided.
    /// The affected draw is skipped and diagnosed; other draws proceed.
    #[error("no data scope provided '{name}' for bind point (group {group}, binding {binding})")]
    MissingResource {
        /// The unresolved property name
        name: String,
        /// The bind group index
        group: u32,
        /// The binding index within the group
        binding: u32,
    },

    /// A renderable referenced a geometry with no vertex data.
    #[error("geometry '{0}' has no vertex streams")]
    EmptyGeometry(String),
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;
