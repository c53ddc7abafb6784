use anyhow::Result;
use renderer::{CompileOutcome, RenderingEngine};
use shadertoy::COMMON_PASS;
use tracing::{debug, info, warn};

use crate::debug::ShaderDebugManager;
use crate::message::ShaderSourceMessage;

/// Runs one compile cycle at a time against the engine.
///
/// Every cycle stops the render loop first and restarts it only when a
/// compile succeeded, so a failed edit leaves the last good frame on screen.
#[derive(Debug)]
pub struct ShaderProcessor<E> {
    engine: E,
    original_code: Option<String>,
    processing: bool,
}

impl<E: RenderingEngine> ShaderProcessor<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            original_code: None,
            processing: false,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn is_currently_processing(&self) -> bool {
        self.processing
    }

    /// Last source received from the editor, never a debug rewrite of it.
    pub fn original_code(&self) -> Option<&str> {
        self.original_code.as_deref()
    }

    pub fn process_main_shader_compilation(
        &mut self,
        message: &ShaderSourceMessage,
        force_cleanup: bool,
        debug: &ShaderDebugManager,
    ) -> CompileOutcome {
        self.processing = true;
        self.original_code = Some(message.code.clone());
        let result = self.compile_main(message, force_cleanup, debug);
        self.processing = false;
        settle(result)
    }

    /// Relinks only the `common` pass.
    pub fn process_common_buffer_update(&mut self, code: &str) -> CompileOutcome {
        self.process_buffer_update(COMMON_PASS, code)
    }

    /// Relinks a single pass, keeping the rest of the pipeline and its
    /// render targets.
    pub fn process_buffer_update(&mut self, pass_name: &str, code: &str) -> CompileOutcome {
        self.processing = true;
        let result = self.relink(pass_name, code);
        self.processing = false;
        settle(result)
    }

    /// Recompiles the cached original with the current debug line applied.
    /// Succeeds without touching the engine when nothing was compiled yet.
    pub fn debug_compile(
        &mut self,
        message: &ShaderSourceMessage,
        debug: &ShaderDebugManager,
    ) -> CompileOutcome {
        let Some(original) = self.original_code.clone() else {
            debug!("no shader compiled yet; skipping debug compile");
            return CompileOutcome::success();
        };
        self.processing = true;
        let result = self.compile_debug(message, &original, debug);
        self.processing = false;
        settle(result)
    }

    fn compile_main(
        &mut self,
        message: &ShaderSourceMessage,
        force_cleanup: bool,
        debug: &ShaderDebugManager,
    ) -> Result<CompileOutcome> {
        self.engine.stop_render_loop();
        if force_cleanup {
            debug!(path = %message.path, "releasing pipeline before rebuild");
            self.engine.cleanup();
        }

        let rewritten = debug
            .debug_source(&message.code, &message.path)
            .filter(|source| *source != message.code);
        let source = rewritten.as_deref().unwrap_or(&message.code);
        let mut outcome = self.compile(message, source)?;
        if !outcome.is_success() && rewritten.is_some() {
            debug!(path = %message.path, "debug rewrite failed to compile; retrying original");
            outcome = self.compile(message, &message.code)?;
        }

        if outcome.is_success() {
            info!(path = %message.path, "shader compiled");
            self.engine.start_render_loop();
        }
        Ok(outcome)
    }

    fn compile_debug(
        &mut self,
        message: &ShaderSourceMessage,
        original: &str,
        debug: &ShaderDebugManager,
    ) -> Result<CompileOutcome> {
        self.engine.stop_render_loop();
        let mut outcome = None;
        if let Some(rewritten) = debug.debug_source(original, &message.path) {
            let attempt = self.compile(message, &rewritten)?;
            if attempt.is_success() {
                outcome = Some(attempt);
            } else {
                debug!(path = %message.path, "debug rewrite failed to compile; using original");
            }
        }
        let outcome = match outcome {
            Some(outcome) => outcome,
            None => self.compile(message, original)?,
        };
        if outcome.is_success() {
            self.engine.start_render_loop();
        }
        Ok(outcome)
    }

    fn relink(&mut self, pass_name: &str, code: &str) -> Result<CompileOutcome> {
        self.engine.stop_render_loop();
        let outcome = self.engine.update_buffer_and_recompile(pass_name, code)?;
        if outcome.is_success() {
            info!(pass = %pass_name, "pass relinked");
            self.engine.start_render_loop();
        }
        Ok(outcome)
    }

    fn compile(&mut self, message: &ShaderSourceMessage, source: &str) -> Result<CompileOutcome> {
        self.engine.compile_shader_pipeline(
            source,
            message.config.as_ref(),
            &message.path,
            &message.buffers,
        )
    }
}

fn settle(result: Result<CompileOutcome>) -> CompileOutcome {
    result.unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "engine raised an error during compilation");
        CompileOutcome::failure(format!("Shader compilation error: {err:#}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EngineCall, RecordingEngine};

    const SHADER: &str = "\
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    float v = fragCoord.x;
    fragColor = vec4(v);
}
";

    fn message() -> ShaderSourceMessage {
        ShaderSourceMessage::new(SHADER, "/proj/main.glsl")
    }

    fn debugging_line_one() -> ShaderDebugManager {
        let mut debug = ShaderDebugManager::new();
        debug.toggle_enabled();
        debug.update_debug_line(1, "float v = fragCoord.x;", "/proj/main.glsl");
        debug
    }

    #[test]
    fn success_stops_compiles_and_restarts() {
        let mut processor = ShaderProcessor::new(RecordingEngine::default());
        let outcome =
            processor.process_main_shader_compilation(&message(), false, &ShaderDebugManager::new());
        assert!(outcome.is_success());
        assert!(!processor.is_currently_processing());
        assert_eq!(
            processor.engine().calls,
            vec![
                EngineCall::Stop,
                EngineCall::compile(SHADER, "/proj/main.glsl"),
                EngineCall::Start,
            ]
        );
    }

    #[test]
    fn failure_leaves_render_loop_stopped() {
        let mut engine = RecordingEngine::default();
        engine.script_compile(CompileOutcome::failure("0:2: syntax error"));
        let mut processor = ShaderProcessor::new(engine);
        let outcome =
            processor.process_main_shader_compilation(&message(), true, &ShaderDebugManager::new());
        assert_eq!(outcome, CompileOutcome::failure("0:2: syntax error"));
        assert_eq!(
            processor.engine().calls,
            vec![
                EngineCall::Stop,
                EngineCall::Cleanup,
                EngineCall::compile(SHADER, "/proj/main.glsl"),
            ]
        );
    }

    #[test]
    fn engine_errors_become_failures() {
        let mut engine = RecordingEngine::default();
        engine.script_compile_error("device lost");
        let mut processor = ShaderProcessor::new(engine);
        let outcome =
            processor.process_main_shader_compilation(&message(), false, &ShaderDebugManager::new());
        assert_eq!(
            outcome,
            CompileOutcome::failure("Shader compilation error: device lost")
        );
        assert!(!processor.is_currently_processing());
        assert!(!processor.engine().calls.contains(&EngineCall::Start));
    }

    #[test]
    fn failed_debug_rewrite_retries_with_original() {
        let mut engine = RecordingEngine::default();
        engine.script_compile(CompileOutcome::failure("rewrite broke it"));
        let mut processor = ShaderProcessor::new(engine);
        let outcome =
            processor.process_main_shader_compilation(&message(), false, &debugging_line_one());
        assert!(outcome.is_success());

        let compiles = processor.engine().compiled_sources();
        assert_eq!(compiles.len(), 2);
        assert!(compiles[0].contains("vec4(vec3(v),1.0)"));
        assert_eq!(compiles[1], SHADER);
        assert_eq!(processor.original_code(), Some(SHADER));
    }

    #[test]
    fn debug_compile_without_cached_source_is_a_no_op() {
        let mut processor = ShaderProcessor::new(RecordingEngine::default());
        let outcome = processor.debug_compile(&message(), &debugging_line_one());
        assert!(outcome.is_success());
        assert!(processor.engine().calls.is_empty());
    }

    #[test]
    fn debug_compile_uses_cached_original_and_falls_back() {
        let mut processor = ShaderProcessor::new(RecordingEngine::default());
        processor.process_main_shader_compilation(&message(), false, &ShaderDebugManager::new());
        processor.engine_mut().calls.clear();

        let mut later = message();
        later.code = "ignored".to_string();
        let outcome = processor.debug_compile(&later, &debugging_line_one());
        assert!(outcome.is_success());
        let compiles = processor.engine().compiled_sources();
        assert_eq!(compiles.len(), 1);
        assert!(compiles[0].contains("vec4(vec3(v),1.0)"));

        processor.engine_mut().calls.clear();
        processor
            .engine_mut()
            .script_compile(CompileOutcome::failure("rewrite broke it"));
        let outcome = processor.debug_compile(&later, &debugging_line_one());
        assert!(outcome.is_success());
        assert_eq!(processor.engine().compiled_sources()[1], SHADER);
        assert_eq!(processor.engine().calls.last(), Some(&EngineCall::Start));
    }

    #[test]
    fn common_update_relinks_only_common() {
        let mut processor = ShaderProcessor::new(RecordingEngine::default());
        let outcome = processor.process_common_buffer_update("float shared() { return 1.0; }");
        assert!(outcome.is_success());
        assert_eq!(
            processor.engine().calls,
            vec![
                EngineCall::Stop,
                EngineCall::UpdateBuffer {
                    pass: "common".into(),
                    code: "float shared() { return 1.0; }".into()
                },
                EngineCall::Start,
            ]
        );
    }
}
