//! GPU-less engine used by `shadewatch` and by tests. Every pass is compiled
//! through naga, the pass graph keeps real ping-pong target bookkeeping, and
//! `render_frame` walks the graph exactly as a GPU frame would, minus the
//! draw calls.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use shadertoy::{ChannelInput, Pass, PathResolver, ShaderConfig, COMMON_PASS, IMAGE_PASS};
use tracing::{debug, info, warn};

use crate::channels::{PassRenderer, TextureCache};
use crate::compile::compile_fragment;
use crate::engine::{CompileOutcome, PassInfo, RenderingEngine};
use crate::graph::{CompiledPass, PassGraph};
use crate::keyboard::KeyboardState;
use crate::types::ChannelSet;
use crate::uniforms::ChannelResolutionBlock;

const DEFAULT_TARGET_SIZE: (u32, u32) = (1280, 720);

/// What one pass was handed for one frame.
#[derive(Debug, Clone)]
pub struct PassFrame {
    pub name: String,
    pub channels: ChannelSet,
    /// `iChannelResolution` as uploaded for this pass.
    pub uniforms: ChannelResolutionBlock,
}

/// Channel bindings every pass saw during one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: u64,
    pub passes: Vec<PassFrame>,
}

#[derive(Debug)]
pub struct HeadlessEngine {
    renderer: PassRenderer,
    graph: PassGraph,
    textures: TextureCache,
    keyboard: KeyboardState,
    config: Option<ShaderConfig>,
    shader_path: Option<PathBuf>,
    common_source: Option<String>,
    running: bool,
    frame: u64,
}

impl HeadlessEngine {
    pub fn new(resolver: PathResolver) -> Self {
        Self::with_target_size(resolver, DEFAULT_TARGET_SIZE)
    }

    pub fn with_target_size(resolver: PathResolver, size: (u32, u32)) -> Self {
        Self {
            renderer: PassRenderer::new(resolver),
            graph: PassGraph::new(size),
            textures: TextureCache::new(),
            keyboard: KeyboardState::new(),
            config: None,
            shader_path: None,
            common_source: None,
            running: false,
            frame: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn graph(&self) -> &PassGraph {
        &self.graph
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn key_event(&mut self, key_code: u32, down: bool) {
        self.keyboard.key_event(key_code, down);
    }

    /// Resolves every pass's channels and flips the ping-pong targets.
    /// Returns `None` while the render loop is stopped.
    pub fn render_frame(&mut self) -> Option<FrameReport> {
        if !self.running {
            return None;
        }
        let shader_path = self.shader_path.clone().unwrap_or_default();
        let mut passes = Vec::with_capacity(self.graph.passes().len());
        for pass in self.graph.passes() {
            let channels = self.renderer.bind_channels(
                &shader_path,
                &pass.name,
                &pass.config,
                &self.textures,
                &self.graph,
                &mut self.keyboard,
            );
            passes.push(PassFrame {
                name: pass.name.clone(),
                uniforms: ChannelResolutionBlock::from_channels(&channels),
                channels,
            });
        }
        self.graph.swap_targets();
        self.keyboard.end_frame();
        let report = FrameReport {
            frame: self.frame,
            passes,
        };
        self.frame += 1;
        Some(report)
    }

    fn compile_pass(
        &mut self,
        name: &str,
        config: Pass,
        source: &str,
    ) -> Result<CompiledPass, String> {
        let program = compile_fragment(self.common_source.as_deref(), source)
            .map_err(|err| format!("{name}: {err}"))?;
        let targets = (name != IMAGE_PASS).then(|| self.graph.allocate_targets());
        Ok(CompiledPass {
            name: name.to_string(),
            config,
            source: source.to_string(),
            program,
            targets,
        })
    }

    /// Compiles a buffer pass the config declares but the graph lacks, which
    /// happens when its source was missing at the last full compile.
    fn add_declared_pass(&mut self, pass_name: &str, code: &str) -> CompileOutcome {
        let Some(config) = self.config.as_ref() else {
            return CompileOutcome::failure(format!(
                "Pass '{pass_name}' is not part of the current pipeline"
            ));
        };
        let order: Vec<String> = config
            .buffer_passes()
            .map(|(name, _)| name.to_string())
            .collect();
        let declared = config
            .buffer_passes()
            .find(|(name, _)| *name == pass_name)
            .map(|(_, pass)| pass.clone());
        let Some(pass) = declared else {
            return CompileOutcome::failure(format!(
                "Pass '{pass_name}' is not part of the current pipeline"
            ));
        };
        match self.compile_pass(pass_name, pass, code) {
            Ok(compiled) => {
                self.graph.insert(compiled, &order);
                info!(pass = %pass_name, "added buffer pass to running pipeline");
                CompileOutcome::success()
            }
            Err(error) => CompileOutcome::failure(error),
        }
    }

    fn preload_textures(&mut self, shader_path: &Path, config: &ShaderConfig) -> Vec<String> {
        let mut warnings = Vec::new();
        for (pass_name, pass) in config.passes.iter() {
            for (channel, input) in &pass.inputs {
                let Some(media) = input.media() else {
                    continue;
                };
                if media.path.trim().is_empty() || matches!(input, ChannelInput::Video(_)) {
                    continue;
                }
                let resolved = self.renderer.resolver().resolve(shader_path, &media.path);
                if let Err(error) =
                    self.textures
                        .load(&resolved, &media.path, media.flips_vertically())
                {
                    warn!(
                        pass = %pass_name,
                        channel = %channel,
                        path = %resolved.display(),
                        error = %error,
                        "failed to load texture channel; using placeholder"
                    );
                    warnings.push(format!(
                        "{pass_name}.{channel}: failed to load texture '{}'",
                        media.path
                    ));
                }
            }
        }
        warnings
    }

    fn relink_all(&mut self) -> Result<(), String> {
        let sources: Vec<(String, Pass, String)> = self
            .graph
            .passes()
            .iter()
            .map(|pass| (pass.name.clone(), pass.config.clone(), pass.source.clone()))
            .collect();
        let mut rebuilt = Vec::with_capacity(sources.len());
        for (name, config, source) in sources {
            rebuilt.push(self.compile_pass(&name, config, &source)?);
        }
        self.graph.rebuild(rebuilt);
        Ok(())
    }
}

impl RenderingEngine for HeadlessEngine {
    fn compile_shader_pipeline(
        &mut self,
        code: &str,
        config: Option<&ShaderConfig>,
        path: &str,
        buffers: &BTreeMap<String, String>,
    ) -> Result<CompileOutcome> {
        let config = config.cloned().unwrap_or_default();
        let shader_path = PathBuf::from(path);
        let mut warnings: Vec<String> = config
            .validate()
            .into_iter()
            .map(|issue| format!("config: {issue}"))
            .collect();

        let previous_common = self.common_source.take();
        self.common_source = buffers.get(COMMON_PASS).cloned();
        if config.passes.contains(COMMON_PASS) && self.common_source.is_none() {
            warnings.push(format!("Pass '{COMMON_PASS}' has no source; compiled without it"));
        }

        let mut passes = Vec::new();
        for (name, pass) in config.buffer_passes() {
            let Some(source) = buffers.get(name) else {
                warn!(pass = %name, "buffer pass has no source; skipping");
                warnings.push(format!("Buffer '{name}' has no source; pass skipped"));
                continue;
            };
            match self.compile_pass(name, pass.clone(), source) {
                Ok(compiled) => passes.push(compiled),
                Err(error) => {
                    self.common_source = previous_common;
                    return Ok(CompileOutcome::failure(error));
                }
            }
        }

        let image = config.passes.get(IMAGE_PASS).cloned().unwrap_or_default();
        match self.compile_pass(IMAGE_PASS, image, code) {
            Ok(compiled) => passes.push(compiled),
            Err(error) => {
                self.common_source = previous_common;
                return Ok(CompileOutcome::failure(error));
            }
        }

        warnings.extend(self.preload_textures(&shader_path, &config));
        self.graph.rebuild(passes);
        info!(
            path = %shader_path.display(),
            passes = self.graph.passes().len(),
            "compiled shader pipeline"
        );
        self.config = Some(config);
        self.shader_path = Some(shader_path);
        Ok(CompileOutcome::Success { warnings })
    }

    fn update_buffer_and_recompile(
        &mut self,
        pass_name: &str,
        code: &str,
    ) -> Result<CompileOutcome> {
        if pass_name == COMMON_PASS {
            let previous = self.common_source.replace(code.to_string());
            return Ok(match self.relink_all() {
                Ok(()) => CompileOutcome::success(),
                Err(error) => {
                    self.common_source = previous;
                    CompileOutcome::failure(error)
                }
            });
        }

        let Some(existing) = self.graph.pass(pass_name) else {
            return Ok(self.add_declared_pass(pass_name, code));
        };
        let config = existing.config.clone();
        let targets = existing.targets;
        match self.compile_pass(pass_name, config, code) {
            Ok(mut compiled) => {
                compiled.targets = targets;
                if let Some(slot) = self.graph.pass_mut(pass_name) {
                    *slot = compiled;
                }
                debug!(pass = %pass_name, "relinked pass");
                Ok(CompileOutcome::success())
            }
            Err(error) => Ok(CompileOutcome::failure(error)),
        }
    }

    fn stop_render_loop(&mut self) {
        self.running = false;
    }

    fn start_render_loop(&mut self) {
        self.running = true;
    }

    fn cleanup(&mut self) {
        self.running = false;
        self.graph.clear();
        self.textures.clear();
        self.config = None;
        self.shader_path = None;
        self.common_source = None;
        self.frame = 0;
        debug!("released headless pipeline resources");
    }

    fn passes(&self) -> Vec<PassInfo> {
        self.graph.infos()
    }

    fn current_config(&self) -> Option<ShaderConfig> {
        self.config.clone()
    }
}
