use std::collections::BTreeMap;

use anyhow::Result;
use shadertoy::ShaderConfig;

/// Result of a compile or relink request.
///
/// `Failure` is an ordinary compile error in user code; infrastructure
/// problems are reported through the surrounding `anyhow::Result` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Success { warnings: Vec<String> },
    Failure { error: String },
}

impl CompileOutcome {
    pub fn success() -> Self {
        Self::Success {
            warnings: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Name and declared source path of a pass in the current pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassInfo {
    pub name: String,
    pub path: Option<String>,
}

/// Contract between the update coordinator and whatever owns the GPU.
///
/// Implementations own the pass graph exclusively; callers only observe pass
/// names, paths, and the configuration the graph was built from.
pub trait RenderingEngine {
    /// Rebuilds every pass from `code` (the `Image` pass), `config`, and the
    /// buffer sources keyed by pass name.
    fn compile_shader_pipeline(
        &mut self,
        code: &str,
        config: Option<&ShaderConfig>,
        path: &str,
        buffers: &BTreeMap<String, String>,
    ) -> Result<CompileOutcome>;

    /// Relinks one pass, keeping render targets and every other program.
    fn update_buffer_and_recompile(&mut self, pass_name: &str, code: &str)
        -> Result<CompileOutcome>;

    fn stop_render_loop(&mut self);

    fn start_render_loop(&mut self);

    /// Releases every pass and cached resource.
    fn cleanup(&mut self);

    fn passes(&self) -> Vec<PassInfo>;

    fn current_config(&self) -> Option<ShaderConfig>;
}
