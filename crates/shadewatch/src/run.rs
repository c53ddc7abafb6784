use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{never, select, tick, unbounded};
use livereload::{
    ChannelTransport, CompileGate, CursorPosition, Debounced, HandleResult, MessageHandler,
    OutboundMessage, ShaderSourceMessage,
};
use renderer::HeadlessEngine;
use shadertoy::PathResolver;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, Cli, Command, TargetArgs, WatchArgs};
use crate::commands::{spawn_stdin_reader, HostCommand, HELP};
use crate::host::{spawn_watcher, ShaderHost};
use crate::paths::AppPaths;
use crate::state::AppState;

type WatchHandler = MessageHandler<HeadlessEngine, Debounced<ChannelTransport>>;

const FRAME_LOG_INTERVAL: u64 = 600;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();
    match cli.command {
        Command::Watch(args) => watch(args),
        Command::Check(args) => check(args),
        Command::Where => print_state(),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries `--json` output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Absolute shader path plus the workspace root `@/` paths resolve against.
fn resolve_target(shader: &Path, target: &TargetArgs) -> Result<(PathBuf, PathBuf)> {
    let shader = fs::canonicalize(shader)
        .with_context(|| format!("shader not found at {}", shader.display()))?;
    let workspace = match &target.workspace {
        Some(dir) => fs::canonicalize(dir)
            .with_context(|| format!("workspace not found at {}", dir.display()))?,
        None => shader
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("shader path has no parent: {}", shader.display()))?,
    };
    Ok((shader, workspace))
}

fn check(args: CheckArgs) -> Result<()> {
    let (shader, workspace) = resolve_target(&args.shader, &args.target)?;
    let resolver = PathResolver::with_workspace_roots([workspace]);
    let mut host = ShaderHost::new(resolver.clone(), shader.clone());
    let message = host.build_message(&shader)?;

    let (sender, receiver) = unbounded();
    let engine = HeadlessEngine::new(resolver.clone());
    let mut handler =
        MessageHandler::with_resolver(engine, ChannelTransport::new(sender), resolver);
    let result = handler.handle_shader_message(message);

    let mut failed = !result.running;
    for message in receiver.try_iter() {
        if matches!(&message, OutboundMessage::Error(lines) if !lines.is_empty()) {
            failed = true;
        }
        emit(&message, args.target.json)?;
    }
    if failed {
        bail!("{} failed to compile", shader.display());
    }
    Ok(())
}

fn print_state() -> Result<()> {
    let paths = AppPaths::discover()?;
    let state_file = paths.state_file();
    println!("{}", state_file.display());
    let state = AppState::load_or_default(&state_file)?;
    let rendered = toml::to_string_pretty(&state).context("failed to render state")?;
    print!("{rendered}");
    Ok(())
}

fn watch(args: WatchArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved shadewatch paths");
    let state_file = paths.state_file();
    let mut state = AppState::load_or_default(&state_file).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring unreadable state file");
        AppState::default()
    });

    let requested = args
        .shader
        .clone()
        .or_else(|| state.last_shader.clone())
        .ok_or_else(|| anyhow!("no shader given and none watched before"))?;
    let (shader, workspace) = resolve_target(&requested, &args.target)?;
    let resolver = PathResolver::with_workspace_roots([workspace.clone()]);

    let (sender, outbound) = unbounded();
    let transport = Debounced::with_window(
        ChannelTransport::new(sender),
        Duration::from_millis(args.debounce_ms),
    );
    let engine = HeadlessEngine::with_target_size(resolver.clone(), args.size);
    let mut session = Session {
        host: ShaderHost::new(resolver.clone(), shader.clone()),
        handler: MessageHandler::with_resolver(engine, transport, resolver),
        json: args.target.json,
        pending_release: None,
    };
    session
        .handler
        .debug_manager_mut()
        .set_iteration_index(args.debug_iteration);

    let gate = CompileGate::new();
    let _watcher = spawn_watcher(&workspace, gate.sender())?;
    tracing::info!(
        shader = %shader.display(),
        workspace = %workspace.display(),
        "watching shader"
    );

    let first = session.host.build_message(&shader)?;
    tracing::debug!(
        buffers = session.host.buffer_files().len(),
        "tracking buffer files of the active shader"
    );
    ensure_running(session.handler.handle_shader_message(first))?;
    if args.lock {
        ensure_running(session.handler.toggle_lock())?;
    }
    if args.debug_line.is_some() || state.debug_enabled {
        ensure_running(session.handler.toggle_debug_mode())?;
    }
    if let Some(line) = args.debug_line {
        session.move_cursor(line)?;
    }

    state.last_shader = Some(shader);
    state.debug_enabled = session.handler.debug_manager().is_enabled();
    if let Err(err) = state.persist(&state_file) {
        tracing::warn!(error = %err, "failed to persist state");
    }

    tracing::info!("{HELP}");
    let ticker = if args.fps > 0.0 {
        tick(Duration::from_secs_f32(1.0 / args.fps))
    } else {
        never()
    };
    let command_input = spawn_stdin_reader();
    let mut commands_open = true;
    loop {
        let commands = if commands_open {
            command_input.clone()
        } else {
            never()
        };
        select! {
            recv(gate.receiver()) -> changed => {
                let changed = changed.map_err(|_| anyhow!("file watcher stopped"))?;
                session.on_change(&changed)?;
            }
            recv(outbound) -> message => {
                let message = message.map_err(|_| anyhow!("outbound channel closed"))?;
                session.on_outbound(message)?;
            }
            recv(commands) -> command => match command {
                Ok(HostCommand::Quit) => break,
                Ok(command) => session.on_command(command)?,
                Err(_) => commands_open = false,
            },
            recv(ticker) -> _ => session.on_tick(),
        }
    }

    state.debug_enabled = session.handler.debug_manager().is_enabled();
    state.persist(&state_file)
}

struct Session {
    host: ShaderHost,
    handler: WatchHandler,
    json: bool,
    pending_release: Option<u32>,
}

impl Session {
    fn on_change(&mut self, changed: &Path) -> Result<()> {
        let locked = self.handler.locker().is_locked();
        match self.host.route_change(changed, locked) {
            Ok(Some(message)) => ensure_running(self.handler.handle_shader_message(message)),
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!(path = %changed.display(), "{err:#}");
                Ok(())
            }
        }
    }

    fn on_outbound(&mut self, message: OutboundMessage) -> Result<()> {
        emit(&message, self.json)?;
        let OutboundMessage::Refresh { path } = message else {
            return Ok(());
        };
        let shader = path
            .map(PathBuf::from)
            .unwrap_or_else(|| self.host.active().to_path_buf());
        match self.host.build_message(&shader) {
            Ok(message) => ensure_running(self.handler.handle_shader_message(message)),
            Err(err) => {
                tracing::warn!("{err:#}");
                Ok(())
            }
        }
    }

    fn on_command(&mut self, command: HostCommand) -> Result<()> {
        match command {
            HostCommand::Lock => ensure_running(self.handler.toggle_lock()),
            HostCommand::Debug => ensure_running(self.handler.toggle_debug_mode()),
            HostCommand::Line(line) => self.move_cursor(line),
            HostCommand::Iteration(index) => {
                self.handler.debug_manager_mut().set_iteration_index(index);
                match self.handler.debug_manager().current_line() {
                    Some(line) => self.move_cursor(line),
                    None => Ok(()),
                }
            }
            HostCommand::Reset => {
                let mut resend: Option<ShaderSourceMessage> = None;
                ensure_running(self.handler.reset(|last| resend = Some(last.clone())))?;
                match resend {
                    Some(mut message) => {
                        message.force_cleanup = Some(true);
                        ensure_running(self.handler.handle_shader_message(message))
                    }
                    None => Ok(()),
                }
            }
            HostCommand::Refresh(path) => {
                let path = path.map(|path| path.to_string_lossy().into_owned());
                ensure_running(self.handler.refresh(path.as_deref()))
            }
            HostCommand::Key(code) => {
                self.handler.engine_mut().key_event(code, true);
                self.pending_release = Some(code);
                Ok(())
            }
            HostCommand::Quit => Ok(()),
        }
    }

    fn on_tick(&mut self) {
        let Some(report) = self.handler.engine_mut().render_frame() else {
            return;
        };
        if let Some(code) = self.pending_release.take() {
            self.handler.engine_mut().key_event(code, false);
        }
        if report.frame % FRAME_LOG_INTERVAL == 0 {
            tracing::debug!(
                frame = report.frame,
                passes = report.passes.len(),
                "rendered frame"
            );
        }
    }

    /// Places the debug cursor on `line` of the active shader.
    fn move_cursor(&mut self, line: usize) -> Result<()> {
        let shader = self.host.active().to_path_buf();
        let code = fs::read_to_string(&shader)
            .with_context(|| format!("failed to read shader at {}", shader.display()))?;
        let line_content = code.lines().nth(line).unwrap_or_default().to_string();
        let cursor = CursorPosition {
            line,
            character: 0,
            line_content,
            file_path: shader.to_string_lossy().into_owned(),
        };
        ensure_running(self.handler.handle_cursor_position_message(cursor))
    }
}

fn ensure_running(result: HandleResult) -> Result<()> {
    if result.running {
        Ok(())
    } else {
        bail!("shader session stopped after a fatal error")
    }
}

fn emit(message: &OutboundMessage, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(message).context("failed to encode message")?;
        println!("{line}");
        return Ok(());
    }
    match message {
        OutboundMessage::Error(lines) if lines.is_empty() => tracing::debug!("errors cleared"),
        OutboundMessage::Error(lines) => lines.iter().for_each(|line| tracing::error!("{line}")),
        OutboundMessage::Warning(lines) => lines.iter().for_each(|line| tracing::warn!("{line}")),
        OutboundMessage::Log(lines) => lines.iter().for_each(|line| tracing::info!("{line}")),
        OutboundMessage::Refresh { path } => tracing::debug!(?path, "refresh requested"),
    }
    Ok(())
}
