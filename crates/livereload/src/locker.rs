/// Pins the render client to one shader path. Purely a filter key: the path
/// is never checked against the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderLocker {
    locked: bool,
    locked_path: Option<String>,
}

impl ShaderLocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the lock. Locking captures `current_path`; unlocking clears it.
    pub fn toggle_lock(&mut self, current_path: Option<&str>) {
        self.locked = !self.locked;
        self.locked_path = if self.locked {
            current_path.map(str::to_string)
        } else {
            None
        };
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn locked_shader_path(&self) -> Option<&str> {
        self.locked_path.as_deref()
    }

    /// Whether a message for `path` is outside the lock.
    pub fn rejects(&self, path: &str) -> bool {
        self.locked && self.locked_path.as_deref() != Some(path)
    }
}
