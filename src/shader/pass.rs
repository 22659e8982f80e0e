//! Shader Pass
//!
//! A pass is an ordered list of [`ShaderChunk`]s per stage plus a stable id.
//! Composing a pass against a [`MacroSet`] yields both stage sources and
//! their bind point manifests; the (pass id, macro words) pair is the variant
//! cache key.

use std::borrow::Cow;
use std::sync::Arc;

use crate::errors::Result;
use crate::shader::composer::{ComposedStage, ShaderChunk, ShaderStage, SourceComposer};
use crate::shader::context::ShaderContext;
use crate::shader::macro_set::MacroSet;

/// Stable identifier of a shader pass, allocated by
/// [`ShaderContext::allocate_pass_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderPassId(pub(crate) u32);

impl ShaderPassId {
    #[inline]
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Both composed stages of one pass for one macro combination.
#[derive(Debug, Clone)]
pub struct ComposedProgram {
    pub vertex: ComposedStage,
    pub fragment: ComposedStage,
}

/// An ordered chunk list per shader stage.
///
/// Immutable once built; shared between materials as `Arc<ShaderPass>`.
pub struct ShaderPass {
    id: ShaderPassId,
    name: Cow<'static, str>,
    ctx: Arc<ShaderContext>,
    vertex_chunks: Vec<Box<dyn ShaderChunk>>,
    fragment_chunks: Vec<Box<dyn ShaderChunk>>,
}

impl ShaderPass {
    #[must_use]
    pub fn new(ctx: Arc<ShaderContext>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: ctx.allocate_pass_id(),
            name: name.into(),
            ctx,
            vertex_chunks: Vec::new(),
            fragment_chunks: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ShaderPassId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<ShaderContext> {
        &self.ctx
    }

    /// Appends a chunk to the vertex stage. Order is meaningful: chunks that
    /// declare resources must precede chunks that reference them.
    #[must_use]
    pub fn with_vertex_chunk(mut self, chunk: impl ShaderChunk + 'static) -> Self {
        self.vertex_chunks.push(Box::new(chunk));
        self
    }

    /// Appends a chunk to the fragment stage.
    #[must_use]
    pub fn with_fragment_chunk(mut self, chunk: impl ShaderChunk + 'static) -> Self {
        self.fragment_chunks.push(Box::new(chunk));
        self
    }

    /// Composes both stages against `macros`.
    ///
    /// Each composition rebuilds the bind point manifests from scratch, so
    /// the result always matches the emitted source exactly.
    pub fn compose(&self, macros: &MacroSet) -> Result<ComposedProgram> {
        let vertex = self.compose_stage(ShaderStage::Vertex, &self.vertex_chunks, macros)?;
        let fragment = self.compose_stage(ShaderStage::Fragment, &self.fragment_chunks, macros)?;
        Ok(ComposedProgram { vertex, fragment })
    }

    fn compose_stage(
        &self,
        stage: ShaderStage,
        chunks: &[Box<dyn ShaderChunk>],
        macros: &MacroSet,
    ) -> Result<ComposedStage> {
        let mut composer = SourceComposer::new(self.ctx.clone(), stage);
        for chunk in chunks {
            chunk.emit(&mut composer, macros)?;
        }
        Ok(composer.assemble(&self.name, macros))
    }
}
