//! Fakes for exercising the coordinator without a GPU.
use std::collections::{BTreeMap, VecDeque};

use anyhow::{anyhow, Result};
use renderer::{CompileOutcome, PassInfo, RenderingEngine};
use shadertoy::ShaderConfig;

use crate::message::OutboundMessage;
use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Compile { code: String, path: String },
    UpdateBuffer { pass: String, code: String },
    Stop,
    Start,
    Cleanup,
}

impl EngineCall {
    pub fn compile(code: &str, path: &str) -> Self {
        Self::Compile {
            code: code.to_string(),
            path: path.to_string(),
        }
    }
}

/// Records every contract call. Scripted outcomes are consumed in order;
/// once the script runs out every call succeeds.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<EngineCall>,
    compile_script: VecDeque<Result<CompileOutcome, String>>,
    update_script: VecDeque<Result<CompileOutcome, String>>,
    config: Option<ShaderConfig>,
}

impl RecordingEngine {
    pub fn script_compile(&mut self, outcome: CompileOutcome) {
        self.compile_script.push_back(Ok(outcome));
    }

    pub fn script_compile_error(&mut self, error: &str) {
        self.compile_script.push_back(Err(error.to_string()));
    }

    pub fn script_update(&mut self, outcome: CompileOutcome) {
        self.update_script.push_back(Ok(outcome));
    }

    pub fn compiled_sources(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Compile { code, .. } => Some(code.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn compile_count(&self) -> usize {
        self.compiled_sources().len()
    }

    pub fn touched(&self) -> bool {
        self.calls
            .iter()
            .any(|call| matches!(call, EngineCall::Compile { .. } | EngineCall::UpdateBuffer { .. }))
    }
}

fn next(script: &mut VecDeque<Result<CompileOutcome, String>>) -> Result<CompileOutcome> {
    match script.pop_front() {
        Some(Ok(outcome)) => Ok(outcome),
        Some(Err(error)) => Err(anyhow!(error)),
        None => Ok(CompileOutcome::success()),
    }
}

impl RenderingEngine for RecordingEngine {
    fn compile_shader_pipeline(
        &mut self,
        code: &str,
        config: Option<&ShaderConfig>,
        path: &str,
        _buffers: &BTreeMap<String, String>,
    ) -> Result<CompileOutcome> {
        self.calls.push(EngineCall::compile(code, path));
        let outcome = next(&mut self.compile_script)?;
        if outcome.is_success() {
            self.config = Some(config.cloned().unwrap_or_default());
        }
        Ok(outcome)
    }

    fn update_buffer_and_recompile(&mut self, pass_name: &str, code: &str) -> Result<CompileOutcome> {
        self.calls.push(EngineCall::UpdateBuffer {
            pass: pass_name.to_string(),
            code: code.to_string(),
        });
        next(&mut self.update_script)
    }

    fn stop_render_loop(&mut self) {
        self.calls.push(EngineCall::Stop);
    }

    fn start_render_loop(&mut self) {
        self.calls.push(EngineCall::Start);
    }

    fn cleanup(&mut self) {
        self.calls.push(EngineCall::Cleanup);
        self.config = None;
    }

    fn passes(&self) -> Vec<PassInfo> {
        self.config
            .iter()
            .flat_map(|config| config.passes.iter())
            .map(|(name, pass)| PassInfo {
                name: name.to_string(),
                path: pass.path.clone(),
            })
            .collect()
    }

    fn current_config(&self) -> Option<ShaderConfig> {
        self.config.clone()
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<OutboundMessage>,
    pub fail: bool,
}

impl Transport for RecordingTransport {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Other("socket closed".into()));
        }
        self.sent.push(message);
        Ok(())
    }
}
