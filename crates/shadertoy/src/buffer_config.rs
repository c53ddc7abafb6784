use std::fmt;

use serde::Serialize;

use crate::config::{validate_input, ChannelInput, Pass};
use crate::ConfigError;

/// Result of `BufferConfig::validate`, shaped for form display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Partial channel input. Only the fields that are `Some` overwrite the
/// existing input; everything else is carried over.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelInputPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vflip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ChannelInputPatch {
    pub fn filter(value: impl Into<String>) -> Self {
        Self {
            filter: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn wrap(value: impl Into<String>) -> Self {
        Self {
            wrap: Some(value.into()),
            ..Self::default()
        }
    }
}

/// Editable view of one pass. Every mutation produces a new `Pass` value and
/// hands it to `on_update`; persisting it is the callback's business.
pub struct BufferConfig<'a> {
    name: String,
    pass: Pass,
    on_update: Box<dyn FnMut(&str, &Pass) + 'a>,
}

impl fmt::Debug for BufferConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferConfig")
            .field("name", &self.name)
            .field("pass", &self.pass)
            .finish_non_exhaustive()
    }
}

impl<'a> BufferConfig<'a> {
    pub fn new(
        name: impl Into<String>,
        pass: Pass,
        on_update: impl FnMut(&str, &Pass) + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            pass,
            on_update: Box::new(on_update),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pass(&self) -> &Pass {
        &self.pass
    }

    pub fn into_pass(self) -> Pass {
        self.pass
    }

    pub fn get_input_channel(&self, channel: &str) -> Option<&ChannelInput> {
        self.pass.inputs.get(channel)
    }

    pub fn add_input_channel(&mut self, channel: &str, input: ChannelInput) {
        self.commit(|pass| {
            pass.inputs.insert(channel.to_string(), input);
        });
    }

    pub fn update_input_channel(&mut self, channel: &str, input: ChannelInput) {
        self.add_input_channel(channel, input);
    }

    /// Shallow-merges `patch` onto the current input of `channel`. Without an
    /// existing input the patch alone must describe a complete one.
    pub fn update_input_channel_partial(
        &mut self,
        channel: &str,
        patch: &ChannelInputPatch,
    ) -> Result<(), ConfigError> {
        let mut merged = match self.pass.inputs.get(channel) {
            Some(existing) => serde_json::to_value(existing)?,
            None => serde_json::Value::Object(serde_json::Map::new()),
        };
        let serde_json::Value::Object(fields) = serde_json::to_value(patch)? else {
            return Err(ConfigError::InvalidPatch {
                channel: channel.to_string(),
                reason: "patch is not an object".to_string(),
            });
        };
        if let serde_json::Value::Object(target) = &mut merged {
            target.extend(fields);
        }
        let input: ChannelInput =
            serde_json::from_value(merged).map_err(|err| ConfigError::InvalidPatch {
                channel: channel.to_string(),
                reason: err.to_string(),
            })?;
        self.add_input_channel(channel, input);
        Ok(())
    }

    pub fn remove_input_channel(&mut self, channel: &str) -> Option<ChannelInput> {
        let mut removed = None;
        if self.pass.inputs.contains_key(channel) {
            self.commit(|pass| removed = pass.inputs.remove(channel));
        }
        removed
    }

    pub fn set_path(&mut self, path: Option<String>) {
        self.commit(|pass| pass.path = path);
    }

    pub fn validate(&self) -> ValidationReport {
        let errors = self
            .pass
            .inputs
            .iter()
            .flat_map(|(channel, input)| validate_input(channel, input))
            .collect();
        ValidationReport::from_errors(errors)
    }

    fn commit(&mut self, edit: impl FnOnce(&mut Pass)) {
        let mut next = self.pass.clone();
        edit(&mut next);
        self.pass = next;
        (self.on_update)(&self.name, &self.pass);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::MediaInput;

    fn textured_pass() -> Pass {
        let mut pass = Pass::with_path("buffer.glsl");
        pass.inputs.insert(
            "iChannel0".into(),
            ChannelInput::Texture(MediaInput {
                path: "noise.png".into(),
                filter: Some("linear".into()),
                wrap: Some("repeat".into()),
                vflip: Some(false),
            }),
        );
        pass
    }

    #[test]
    fn partial_update_preserves_unspecified_fields() {
        let updates = RefCell::new(Vec::new());
        let mut buffer = BufferConfig::new("BufferA", textured_pass(), |name, pass| {
            updates.borrow_mut().push((name.to_string(), pass.clone()));
        });

        buffer
            .update_input_channel_partial("iChannel0", &ChannelInputPatch::filter("nearest"))
            .unwrap();

        let expected = ChannelInput::Texture(MediaInput {
            path: "noise.png".into(),
            filter: Some("nearest".into()),
            wrap: Some("repeat".into()),
            vflip: Some(false),
        });
        assert_eq!(buffer.get_input_channel("iChannel0"), Some(&expected));
        drop(buffer);
        let updates = updates.into_inner();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "BufferA");
        assert_eq!(updates[0].1.inputs.get("iChannel0"), Some(&expected));
    }

    #[test]
    fn partial_update_without_existing_input_needs_a_type() {
        let mut buffer = BufferConfig::new("BufferA", Pass::default(), |_, _| {});
        let err = buffer
            .update_input_channel_partial("iChannel1", &ChannelInputPatch::filter("nearest"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPatch { .. }));

        let patch = ChannelInputPatch {
            kind: Some("buffer".into()),
            source: Some("BufferA".into()),
            ..ChannelInputPatch::default()
        };
        buffer.update_input_channel_partial("iChannel1", &patch).unwrap();
        assert_eq!(
            buffer.get_input_channel("iChannel1"),
            Some(&ChannelInput::Buffer {
                source: "BufferA".into()
            })
        );
    }

    #[test]
    fn validate_aggregates_all_errors() {
        let mut pass = Pass::default();
        pass.inputs.insert(
            "iChannel0".into(),
            ChannelInput::Texture(MediaInput {
                wrap: Some("invalid".into()),
                ..MediaInput::default()
            }),
        );
        pass.inputs.insert(
            "iChannel1".into(),
            ChannelInput::Video(MediaInput {
                path: "clip.mp4".into(),
                filter: Some("bicubic".into()),
                ..MediaInput::default()
            }),
        );
        let buffer = BufferConfig::new("Image", pass, |_, _| {});
        let report = buffer.validate();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].contains("requires a path"));
        assert!(report.errors[1].contains("invalid wrap"));
        assert!(report.errors[2].contains("invalid filter"));
    }

    #[test]
    fn remove_only_notifies_when_something_changed() {
        let count = RefCell::new(0);
        let mut buffer = BufferConfig::new("BufferA", textured_pass(), |_, _| {
            *count.borrow_mut() += 1;
        });
        assert!(buffer.remove_input_channel("iChannel3").is_none());
        assert!(buffer.remove_input_channel("iChannel0").is_some());
        assert!(buffer.pass().inputs.is_empty());
        assert!(buffer.validate().is_valid);
        drop(buffer);
        assert_eq!(count.into_inner(), 1);
    }
}
