//! Environment configuration, resolved once per cold start.
//!
//! Values are read through a lookup function so tests can supply a map
//! instead of mutating the process environment. Blank values count as unset.

use std::time::Duration;

use note_speech_core::contract::{
    AudioFormat, ValidationError, DEFAULT_AUDIO_PREFIX, DEFAULT_NOTES_EXTENSION,
    DEFAULT_NOTES_PREFIX, DEFAULT_UPLOAD_KEY_PREFIX, DEFAULT_UPLOAD_URL_TTL_SECONDS,
    DEFAULT_VOICE_ID,
};
use note_speech_core::storage_keys::KeyMapping;
use thiserror::Error;

pub const NOTES_PREFIX_ENV: &str = "NOTES_PREFIX";
pub const AUDIO_PREFIX_ENV: &str = "AUDIO_PREFIX";
pub const NOTES_EXTENSION_ENV: &str = "NOTES_EXTENSION";
pub const AUDIO_BUCKET_ENV: &str = "AUDIO_BUCKET";
pub const VOICE_ID_ENV: &str = "POLLY_VOICE_ID";
pub const OUTPUT_FORMAT_ENV: &str = "POLLY_OUTPUT_FORMAT";
pub const ENGINE_ENV: &str = "POLLY_ENGINE";
pub const UPLOAD_BUCKET_ENV: &str = "UPLOAD_BUCKET";
pub const UPLOAD_KEY_PREFIX_ENV: &str = "UPLOAD_KEY_PREFIX";
pub const UPLOAD_URL_TTL_ENV: &str = "UPLOAD_URL_TTL_SECONDS";
/// Set by the Lambda runtime.
pub const REGION_ENV: &str = "AWS_REGION";

const KEY_MAPPING_ENV: &str = "NOTES_PREFIX/AUDIO_PREFIX/NOTES_EXTENSION";

/// Presigned URLs signed with SigV4 cannot outlive seven days.
const MAX_UPLOAD_URL_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

impl ConfigError {
    fn invalid(name: &'static str, error: ValidationError) -> Self {
        Self::Invalid {
            name,
            message: error.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSettings {
    pub output_format: AudioFormat,
    pub voice: String,
    pub engine: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            output_format: AudioFormat::default(),
            voice: DEFAULT_VOICE_ID.to_string(),
            engine: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterConfig {
    pub key_mapping: KeyMapping,
    /// Destination bucket; `None` writes audio back into the source bucket.
    pub audio_bucket: Option<String>,
    pub voice: VoiceSettings,
}

impl ConverterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let output_format = match non_blank(&lookup, OUTPUT_FORMAT_ENV) {
            Some(value) => AudioFormat::parse(&value)
                .map_err(|error| ConfigError::invalid(OUTPUT_FORMAT_ENV, error))?,
            None => AudioFormat::default(),
        };

        let key_mapping = KeyMapping::new(
            non_blank(&lookup, NOTES_PREFIX_ENV).unwrap_or_else(|| DEFAULT_NOTES_PREFIX.into()),
            non_blank(&lookup, AUDIO_PREFIX_ENV).unwrap_or_else(|| DEFAULT_AUDIO_PREFIX.into()),
            non_blank(&lookup, NOTES_EXTENSION_ENV)
                .unwrap_or_else(|| DEFAULT_NOTES_EXTENSION.into()),
            output_format,
        )
        .map_err(|error| ConfigError::invalid(KEY_MAPPING_ENV, error))?;

        Ok(Self {
            key_mapping,
            audio_bucket: non_blank(&lookup, AUDIO_BUCKET_ENV),
            voice: VoiceSettings {
                output_format,
                voice: non_blank(&lookup, VOICE_ID_ENV)
                    .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
                engine: non_blank(&lookup, ENGINE_ENV),
            },
        })
    }

    pub fn destination_bucket<'a>(&'a self, source_bucket: &'a str) -> &'a str {
        self.audio_bucket.as_deref().unwrap_or(source_bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUrlConfig {
    pub bucket: String,
    /// Region of `bucket`, echoed to clients that build object URLs.
    pub region: Option<String>,
    pub key_prefix: String,
    pub expires_in: Duration,
    /// Used to report where the converted audio will appear.
    pub key_mapping: KeyMapping,
}

impl UploadUrlConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let converter = ConverterConfig::from_lookup(&lookup)?;
        let bucket =
            non_blank(&lookup, UPLOAD_BUCKET_ENV).ok_or(ConfigError::Missing(UPLOAD_BUCKET_ENV))?;

        let key_prefix = non_blank(&lookup, UPLOAD_KEY_PREFIX_ENV)
            .unwrap_or_else(|| DEFAULT_UPLOAD_KEY_PREFIX.to_string());
        if !converter.key_mapping.accepts(&key_prefix) || !key_prefix.ends_with('/') {
            return Err(ConfigError::Invalid {
                name: UPLOAD_KEY_PREFIX_ENV,
                message: format!(
                    "'{key_prefix}' must end with '/' and lie under notes prefix '{}'",
                    converter.key_mapping.notes_prefix()
                ),
            });
        }

        let ttl_seconds = match non_blank(&lookup, UPLOAD_URL_TTL_ENV) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|seconds| (1..=MAX_UPLOAD_URL_TTL_SECONDS).contains(seconds))
                .ok_or_else(|| ConfigError::Invalid {
                    name: UPLOAD_URL_TTL_ENV,
                    message: format!(
                        "'{value}' must be a whole number of seconds between 1 and {MAX_UPLOAD_URL_TTL_SECONDS}"
                    ),
                })?,
            None => DEFAULT_UPLOAD_URL_TTL_SECONDS,
        };

        Ok(Self {
            bucket,
            region: non_blank(&lookup, REGION_ENV),
            key_prefix,
            expires_in: Duration::from_secs(ttl_seconds),
            key_mapping: converter.key_mapping,
        })
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn converter_defaults_apply_when_environment_is_empty() {
        let config = ConverterConfig::from_lookup(lookup_from(&[])).expect("defaults are valid");

        assert_eq!(config, ConverterConfig::default());
        assert_eq!(config.destination_bucket("source"), "source");
        assert_eq!(config.voice.voice, "Joanna");
        assert_eq!(config.voice.output_format.content_type(), "audio/mpeg");
    }

    #[test]
    fn converter_reads_overrides_and_ignores_blank_values() {
        let config = ConverterConfig::from_lookup(lookup_from(&[
            (AUDIO_BUCKET_ENV, "audio-bucket"),
            (VOICE_ID_ENV, "Matthew"),
            (ENGINE_ENV, "neural"),
            (OUTPUT_FORMAT_ENV, "ogg_vorbis"),
            (NOTES_PREFIX_ENV, "   "),
        ]))
        .expect("overrides are valid");

        assert_eq!(config.destination_bucket("source"), "audio-bucket");
        assert_eq!(config.voice.voice, "Matthew");
        assert_eq!(config.voice.engine.as_deref(), Some("neural"));
        assert_eq!(config.key_mapping.notes_prefix(), "notes/");
        assert_eq!(
            config.key_mapping.audio_key("notes/a.txt").as_deref(),
            Some("audio/a.ogg")
        );
    }

    #[test]
    fn converter_rejects_unknown_output_format() {
        let error = ConverterConfig::from_lookup(lookup_from(&[(OUTPUT_FORMAT_ENV, "wav")]))
            .expect_err("wav is unsupported");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: OUTPUT_FORMAT_ENV,
                ..
            }
        ));
    }

    #[test]
    fn upload_requires_bucket() {
        let error = UploadUrlConfig::from_lookup(lookup_from(&[])).expect_err("bucket required");
        assert_eq!(error, ConfigError::Missing(UPLOAD_BUCKET_ENV));
        assert_eq!(error.to_string(), "UPLOAD_BUCKET must be configured");
    }

    #[test]
    fn upload_defaults_match_notes_scope() {
        let config = UploadUrlConfig::from_lookup(lookup_from(&[(UPLOAD_BUCKET_ENV, "notes")]))
            .expect("valid upload config");
        assert_eq!(config.key_prefix, "notes/files/");
        assert_eq!(config.expires_in, Duration::from_secs(600));
        assert_eq!(config.region, None);
    }

    #[test]
    fn upload_reads_region_from_runtime_environment() {
        let config = UploadUrlConfig::from_lookup(lookup_from(&[
            (UPLOAD_BUCKET_ENV, "notes"),
            (REGION_ENV, "eu-west-1"),
        ]))
        .expect("valid upload config");
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn upload_rejects_prefix_outside_notes_scope() {
        let error = UploadUrlConfig::from_lookup(lookup_from(&[
            (UPLOAD_BUCKET_ENV, "notes"),
            (UPLOAD_KEY_PREFIX_ENV, "uploads/"),
        ]))
        .expect_err("prefix outside scope");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: UPLOAD_KEY_PREFIX_ENV,
                ..
            }
        ));
    }

    #[test]
    fn upload_rejects_invalid_ttl() {
        for ttl in ["0", "ten", "604801"] {
            let error = UploadUrlConfig::from_lookup(lookup_from(&[
                (UPLOAD_BUCKET_ENV, "notes"),
                (UPLOAD_URL_TTL_ENV, ttl),
            ]))
            .expect_err("ttl should be rejected");
            assert!(
                matches!(
                    error,
                    ConfigError::Invalid {
                        name: UPLOAD_URL_TTL_ENV,
                        ..
                    }
                ),
                "ttl {ttl}"
            );
        }
    }
}
