use std::fmt;

use tracing::debug;

use crate::buffer_config::BufferConfig;
use crate::config::{is_reserved_pass, ChannelInput, Pass, ShaderConfig, COMMON_PASS, IMAGE_PASS};

/// Owns the editable copy of a shader's pass configuration. Every change is
/// reported through `on_change` with the full new configuration so a
/// persistence layer can write it back to disk.
pub struct ConfigManager<'a> {
    config: ShaderConfig,
    on_change: Box<dyn FnMut(&ShaderConfig) + 'a>,
}

impl fmt::Debug for ConfigManager<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> ConfigManager<'a> {
    pub fn new(config: ShaderConfig, on_change: impl FnMut(&ShaderConfig) + 'a) -> Self {
        Self {
            config,
            on_change: Box::new(on_change),
        }
    }

    pub fn config(&self) -> &ShaderConfig {
        &self.config
    }

    /// Replaces the whole configuration, as happens when the host sends a
    /// freshly parsed file.
    pub fn replace(&mut self, config: ShaderConfig) {
        self.config = config;
        self.notify();
    }

    pub fn add_common_buffer(&mut self) -> bool {
        if self.config.passes.contains(COMMON_PASS) {
            return false;
        }
        self.config
            .passes
            .insert(COMMON_PASS, Pass::with_path(format!("{COMMON_PASS}.glsl")));
        debug!("added common pass");
        self.notify();
        true
    }

    pub fn add_specific_buffer(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || is_reserved_pass(name) || self.config.passes.contains(name) {
            return false;
        }
        self.config
            .passes
            .insert(name, Pass::with_path(format!("{name}.glsl")));
        debug!(pass = %name, "added buffer pass");
        self.notify();
        true
    }

    /// Removes a buffer and every `buffer` input elsewhere that read from it.
    pub fn remove_buffer(&mut self, name: &str) -> bool {
        if name == IMAGE_PASS || self.config.passes.remove(name).is_none() {
            return false;
        }
        for (_, pass) in self.config.passes.iter_mut() {
            pass.inputs.retain(|_, input| {
                !matches!(input, ChannelInput::Buffer { source } if source == name)
            });
        }
        debug!(pass = %name, "removed buffer pass");
        self.notify();
        true
    }

    /// Pass names other than `Image`, in insertion order.
    pub fn get_buffer_list(&self) -> Vec<String> {
        self.config
            .passes
            .names()
            .filter(|name| *name != IMAGE_PASS)
            .map(str::to_string)
            .collect()
    }

    /// Runs `edit` against a `BufferConfig` for `name` and folds the edited pass
    /// back into the configuration. Returns `None` when the pass is unknown.
    pub fn edit_pass<R>(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut BufferConfig<'_>) -> R,
    ) -> Option<R> {
        let pass = self.config.passes.get(name)?.clone();
        let mut latest: Option<Pass> = None;
        let result = {
            let mut buffer = BufferConfig::new(name, pass, |_: &str, updated: &Pass| {
                latest = Some(updated.clone());
            });
            edit(&mut buffer)
        };
        if let Some(pass) = latest {
            self.config.passes.insert(name, pass);
            self.notify();
        }
        Some(result)
    }

    fn notify(&mut self) {
        (self.on_change)(&self.config);
    }
}
