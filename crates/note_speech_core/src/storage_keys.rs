use crate::contract::{
    AudioFormat, ValidationError, DEFAULT_AUDIO_PREFIX, DEFAULT_NOTES_EXTENSION,
    DEFAULT_NOTES_PREFIX,
};

/// Maps note keys onto the audio keys derived from them.
///
/// Derivation substitutes the leading notes prefix with the audio prefix and
/// a trailing notes extension with the audio extension. A note key without
/// the notes extension gets the audio extension appended, so every in-scope
/// key has exactly one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    notes_prefix: String,
    audio_prefix: String,
    notes_extension: String,
    audio_extension: String,
}

impl KeyMapping {
    pub fn new(
        notes_prefix: impl Into<String>,
        audio_prefix: impl Into<String>,
        notes_extension: impl Into<String>,
        audio_format: AudioFormat,
    ) -> Result<Self, ValidationError> {
        let mapping = Self {
            notes_prefix: notes_prefix.into(),
            audio_prefix: audio_prefix.into(),
            notes_extension: notes_extension.into(),
            audio_extension: audio_format.extension().to_string(),
        };
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn notes_prefix(&self) -> &str {
        &self.notes_prefix
    }

    pub fn audio_prefix(&self) -> &str {
        &self.audio_prefix
    }

    pub fn notes_extension(&self) -> &str {
        &self.notes_extension
    }

    pub fn audio_extension(&self) -> &str {
        &self.audio_extension
    }

    pub fn accepts(&self, source_key: &str) -> bool {
        source_key.starts_with(&self.notes_prefix)
    }

    /// Destination key for `source_key`, or `None` when the key is outside
    /// the notes prefix.
    pub fn audio_key(&self, source_key: &str) -> Option<String> {
        let relative = source_key.strip_prefix(&self.notes_prefix)?;
        let stem = relative
            .strip_suffix(&self.notes_extension)
            .unwrap_or(relative);
        Some(format!("{}{stem}{}", self.audio_prefix, self.audio_extension))
    }

    /// Canonical note key that derives `audio_key`, or `None` when the key is
    /// not an audio key produced by this mapping.
    pub fn source_key(&self, audio_key: &str) -> Option<String> {
        let stem = audio_key
            .strip_prefix(&self.audio_prefix)?
            .strip_suffix(&self.audio_extension)?;
        Some(format!(
            "{}{stem}{}",
            self.notes_prefix, self.notes_extension
        ))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (name, prefix) in [
            ("notes prefix", &self.notes_prefix),
            ("audio prefix", &self.audio_prefix),
        ] {
            if prefix.is_empty() || !prefix.ends_with('/') {
                return Err(ValidationError::new(format!(
                    "{name} '{prefix}' must be non-empty and end with '/'"
                )));
            }
        }

        // Audio written under the notes prefix would re-trigger conversion.
        if self.audio_prefix.starts_with(&self.notes_prefix) {
            return Err(ValidationError::new(format!(
                "audio prefix '{}' must not lie under notes prefix '{}'",
                self.audio_prefix, self.notes_prefix
            )));
        }

        if self.notes_extension.len() < 2 || !self.notes_extension.starts_with('.') {
            return Err(ValidationError::new(format!(
                "notes extension '{}' must start with '.'",
                self.notes_extension
            )));
        }

        Ok(())
    }
}

impl Default for KeyMapping {
    fn default() -> Self {
        Self {
            notes_prefix: DEFAULT_NOTES_PREFIX.to_string(),
            audio_prefix: DEFAULT_AUDIO_PREFIX.to_string(),
            notes_extension: DEFAULT_NOTES_EXTENSION.to_string(),
            audio_extension: AudioFormat::default().extension().to_string(),
        }
    }
}

/// Object key for a note uploaded through a presigned URL.
pub fn upload_object_key(upload_prefix: &str, filename: &str) -> String {
    format!("{upload_prefix}{filename}")
}
