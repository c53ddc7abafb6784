use anyhow::Result;
use renderer::{CompileOutcome, RenderingEngine};
use shadertoy::{PathResolver, COMMON_PASS};
use tracing::{debug, error, info, warn};

use crate::buffer_update::find_buffer_pass;
use crate::debug::ShaderDebugManager;
use crate::locker::ShaderLocker;
use crate::message::{
    CursorPosition, HandleResult, InboundMessage, OutboundMessage, ShaderSourceMessage,
};
use crate::processor::ShaderProcessor;
use crate::transport::Transport;

pub const COMPILED_LOG: &str = "Shader compiled and linked";

/// Entry point for every inbound update.
///
/// Nothing escapes this type: compile problems become `error` messages and
/// anything worse is reported as a fatal error with `running: false`.
#[derive(Debug)]
pub struct MessageHandler<E, T> {
    processor: ShaderProcessor<E>,
    transport: T,
    locker: ShaderLocker,
    debug: ShaderDebugManager,
    resolver: PathResolver,
    last_event: Option<ShaderSourceMessage>,
    is_handling: bool,
}

impl<E: RenderingEngine, T: Transport> MessageHandler<E, T> {
    pub fn new(engine: E, transport: T) -> Self {
        Self::with_resolver(engine, transport, PathResolver::new())
    }

    pub fn with_resolver(engine: E, transport: T, resolver: PathResolver) -> Self {
        Self {
            processor: ShaderProcessor::new(engine),
            transport,
            locker: ShaderLocker::new(),
            debug: ShaderDebugManager::new(),
            resolver,
            last_event: None,
            is_handling: false,
        }
    }

    pub fn engine(&self) -> &E {
        self.processor.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.processor.engine_mut()
    }

    pub fn processor(&self) -> &ShaderProcessor<E> {
        &self.processor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn locker(&self) -> &ShaderLocker {
        &self.locker
    }

    pub fn debug_manager(&self) -> &ShaderDebugManager {
        &self.debug
    }

    pub fn debug_manager_mut(&mut self) -> &mut ShaderDebugManager {
        &mut self.debug
    }

    pub fn last_event(&self) -> Option<&ShaderSourceMessage> {
        self.last_event.as_ref()
    }

    pub fn is_handling(&self) -> bool {
        self.is_handling
    }

    pub fn handle_message(&mut self, message: InboundMessage) -> HandleResult {
        match message {
            InboundMessage::ShaderSource(message) => self.handle_shader_message(message),
            InboundMessage::CursorPosition { payload } => {
                self.handle_cursor_position_message(payload)
            }
        }
    }

    pub fn handle_shader_message(&mut self, message: ShaderSourceMessage) -> HandleResult {
        match self.route_shader_message(message) {
            Ok(result) => result,
            Err(err) => self.fail(err),
        }
    }

    /// Moves the debug cursor and, while debugging, recompiles the last
    /// shader so the new line shows up immediately.
    pub fn handle_cursor_position_message(&mut self, cursor: CursorPosition) -> HandleResult {
        if !self.accepts_cursor(&cursor) {
            debug!(file = %cursor.file_path, "ignoring cursor outside the locked shader");
            return HandleResult::RUNNING;
        }
        self.debug
            .update_debug_line(cursor.line, cursor.line_content, cursor.file_path);
        if !self.debug.is_active() {
            return HandleResult::RUNNING;
        }
        match self.recompile_for_debug() {
            Ok(()) => HandleResult::RUNNING,
            Err(err) => self.fail(err),
        }
    }

    /// Releases every engine resource. `on_reset` receives the last shader so
    /// the caller can send it again.
    pub fn reset(&mut self, on_reset: impl FnOnce(&ShaderSourceMessage)) -> HandleResult {
        self.processor.engine_mut().cleanup();
        let Some(last) = self.last_event.as_ref() else {
            return self.send_or_fail(OutboundMessage::error("No shader to reset"));
        };
        info!(path = %last.path, "pipeline reset");
        on_reset(last);
        HandleResult::RUNNING
    }

    /// Asks the host to send a shader again: `path`, or the current one.
    pub fn refresh(&mut self, path: Option<&str>) -> HandleResult {
        self.send_or_fail(OutboundMessage::Refresh {
            path: path.map(str::to_string),
        })
    }

    /// Locks to the last shader, or unlocks.
    pub fn toggle_lock(&mut self) -> HandleResult {
        let current = self.last_event.as_ref().map(|event| event.path.clone());
        self.locker.toggle_lock(current.as_deref());
        let line = match self.locker.locked_shader_path() {
            Some(path) if self.locker.is_locked() => format!("Locked to {path}"),
            None if self.locker.is_locked() => "Locked".to_string(),
            _ => "Unlocked".to_string(),
        };
        info!(locked = self.locker.is_locked(), "{line}");
        self.send_or_fail(OutboundMessage::log(line))
    }

    /// Flips debug mode and recompiles the last shader with or without the
    /// rewrite.
    pub fn toggle_debug_mode(&mut self) -> HandleResult {
        let enabled = self.debug.toggle_enabled();
        let line = if enabled {
            "Debug mode enabled"
        } else {
            "Debug mode disabled"
        };
        info!(enabled, "debug mode toggled");
        let result = self
            .transport
            .send(OutboundMessage::log(line))
            .map_err(anyhow::Error::from)
            .and_then(|()| self.recompile_for_debug());
        match result {
            Ok(()) => HandleResult::RUNNING,
            Err(err) => self.fail(err),
        }
    }

    fn route_shader_message(&mut self, message: ShaderSourceMessage) -> Result<HandleResult> {
        if self.locker.rejects(&message.path) {
            if self.try_buffer_update(&message)? {
                return Ok(HandleResult::RUNNING);
            }
            debug!(
                path = %message.path,
                locked = ?self.locker.locked_shader_path(),
                "ignoring update outside the locked shader"
            );
            return Ok(HandleResult::RUNNING);
        }
        if self.is_handling {
            debug!(path = %message.path, "compile in flight; dropping update");
            return Ok(HandleResult::RUNNING);
        }

        if let Some(cursor) = &message.cursor_position {
            if self.accepts_cursor(cursor) {
                self.debug.update_debug_line(
                    cursor.line,
                    cursor.line_content.clone(),
                    cursor.file_path.clone(),
                );
            }
        }

        self.is_handling = true;
        let force_cleanup = message.force_cleanup.unwrap_or(false);
        let outcome =
            self.processor
                .process_main_shader_compilation(&message, force_cleanup, &self.debug);
        let reported = self.report(outcome, COMPILED_LOG);
        self.is_handling = false;
        self.last_event = Some(message);
        reported?;
        Ok(HandleResult::RUNNING)
    }

    /// Relinks one pass of the locked shader when `message` is for one of its
    /// buffer files. Returns whether the message was consumed.
    fn try_buffer_update(&mut self, message: &ShaderSourceMessage) -> Result<bool> {
        let Some(locked) = self.locker.locked_shader_path() else {
            return Ok(false);
        };
        let engine = self.processor.engine();
        let config = engine.current_config();
        let Some(found) = find_buffer_pass(
            config.as_ref(),
            &engine.passes(),
            &self.resolver,
            locked,
            &message.path,
        ) else {
            return Ok(false);
        };
        if self.is_handling {
            debug!(pass = %found.pass, "compile in flight; dropping buffer update");
            return Ok(true);
        }

        let code = message.buffers.get(&found.pass).unwrap_or(&message.code);
        self.is_handling = true;
        let outcome = if found.pass == COMMON_PASS {
            self.processor.process_common_buffer_update(code)
        } else {
            self.processor.process_buffer_update(&found.pass, code)
        };
        let reported = self.report(
            outcome,
            &format!("Buffer '{}' updated and pipeline recompiled", found.label),
        );
        self.is_handling = false;
        reported?;
        Ok(true)
    }

    fn recompile_for_debug(&mut self) -> Result<()> {
        if self.is_handling {
            return Ok(());
        }
        let Some(last) = self.last_event.clone() else {
            return Ok(());
        };
        self.is_handling = true;
        let outcome = self.processor.debug_compile(&last, &self.debug);
        let reported = self.report(outcome, COMPILED_LOG);
        self.is_handling = false;
        reported
    }

    fn accepts_cursor(&self, cursor: &CursorPosition) -> bool {
        !self.locker.is_locked()
            || self.locker.locked_shader_path() == Some(cursor.file_path.as_str())
    }

    fn report(&mut self, outcome: CompileOutcome, success_line: &str) -> Result<()> {
        match outcome {
            CompileOutcome::Failure { error } => {
                warn!(error = %error, "compile failed");
                self.transport.send(OutboundMessage::error(error))?;
            }
            CompileOutcome::Success { warnings } => {
                self.transport.send(OutboundMessage::clear_errors())?;
                for warning in warnings {
                    warn!(warning = %warning, "compile warning");
                    self.transport.send(OutboundMessage::warning(warning))?;
                }
                self.transport.send(OutboundMessage::log(success_line))?;
            }
        }
        Ok(())
    }

    fn send_or_fail(&mut self, message: OutboundMessage) -> HandleResult {
        match self.transport.send(message) {
            Ok(()) => HandleResult::RUNNING,
            Err(err) => self.fail(err.into()),
        }
    }

    fn fail(&mut self, err: anyhow::Error) -> HandleResult {
        error!(error = ?err, "fatal error while handling message");
        self.is_handling = false;
        if let Err(send_err) = self
            .transport
            .send(OutboundMessage::error(format!("Fatal error: {err:#}")))
        {
            error!(error = %send_err, "could not report fatal error");
        }
        HandleResult::STOPPED
    }
}
