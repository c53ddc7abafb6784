use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shadertoy::ShaderConfig;

/// Editor cursor, as reported alongside a source update or on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPosition {
    /// 0-based line index.
    pub line: usize,
    #[serde(default)]
    pub character: usize,
    #[serde(default)]
    pub line_content: String,
    #[serde(default)]
    pub file_path: String,
}

/// One full snapshot of the shader being edited. Built by the host for every
/// change and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderSourceMessage {
    pub code: String,
    #[serde(default)]
    pub config: Option<ShaderConfig>,
    pub path: String,
    /// Buffer pass name to source code. `common` is keyed like any other pass.
    #[serde(default)]
    pub buffers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_cleanup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<CursorPosition>,
}

impl ShaderSourceMessage {
    pub fn new(code: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            config: None,
            path: path.into(),
            buffers: BTreeMap::new(),
            force_cleanup: None,
            cursor_position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    ShaderSource(ShaderSourceMessage),
    CursorPosition { payload: CursorPosition },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum OutboundMessage {
    Error(Vec<String>),
    Warning(Vec<String>),
    Log(Vec<String>),
    Refresh {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

impl OutboundMessage {
    pub fn error(line: impl Into<String>) -> Self {
        Self::Error(vec![line.into()])
    }

    /// The empty error list the host treats as "clear previous errors".
    pub fn clear_errors() -> Self {
        Self::Error(Vec::new())
    }

    pub fn warning(line: impl Into<String>) -> Self {
        Self::Warning(vec![line.into()])
    }

    pub fn log(line: impl Into<String>) -> Self {
        Self::Log(vec![line.into()])
    }
}

/// `running: false` only after a fatal error; routing no-ops and ordinary
/// compile failures keep the client running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleResult {
    pub running: bool,
}

impl HandleResult {
    pub const RUNNING: Self = Self { running: true };
    pub const STOPPED: Self = Self { running: false };
}
