//! Line commands typed into a running `watch` session.
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Lock,
    Debug,
    /// Moves the debug cursor to a 0-based line of the active shader.
    Line(usize),
    Iteration(usize),
    Reset,
    Refresh(Option<PathBuf>),
    /// Presses and releases a key for the keyboard texture.
    Key(u32),
    Quit,
}

pub const HELP: &str =
    "commands: lock | debug | line <n> | iter <n> | reset | refresh [path] | key <code> | quit";

impl HostCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();
        let command = match verb {
            "lock" => Self::Lock,
            "debug" => Self::Debug,
            "line" => Self::Line(number(argument, "line")?),
            "iter" | "iteration" => Self::Iteration(number(argument, "iteration")?),
            "reset" => Self::Reset,
            "refresh" => Self::Refresh(argument.map(PathBuf::from)),
            "key" => Self::Key(number(argument, "key code")?),
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{other}'; {HELP}"),
        };
        Ok(Some(command))
    }
}

fn number<T: std::str::FromStr>(argument: Option<&str>, what: &str) -> Result<T> {
    let argument = argument.ok_or_else(|| anyhow!("missing {what}"))?;
    argument
        .parse()
        .map_err(|_| anyhow!("invalid {what} '{argument}'"))
}

/// Reads commands from stdin on a background thread. The channel closes at
/// end of input.
pub fn spawn_stdin_reader() -> Receiver<HostCommand> {
    let (sender, receiver) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "failed to read command input");
                    break;
                }
            };
            match HostCommand::parse(&line) {
                Ok(Some(command)) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("{err}"),
            }
        }
        debug!("command input closed");
    });
    receiver
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(HostCommand::parse("lock").unwrap(), Some(HostCommand::Lock));
        assert_eq!(
            HostCommand::parse("  line 42 ").unwrap(),
            Some(HostCommand::Line(42))
        );
        assert_eq!(
            HostCommand::parse("refresh shaders/a.glsl").unwrap(),
            Some(HostCommand::Refresh(Some(PathBuf::from("shaders/a.glsl"))))
        );
        assert_eq!(
            HostCommand::parse("refresh").unwrap(),
            Some(HostCommand::Refresh(None))
        );
        assert_eq!(HostCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(HostCommand::parse("line").is_err());
        assert!(HostCommand::parse("iter many").is_err());
        assert!(HostCommand::parse("explode").is_err());
    }
}
