use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTES_PREFIX: &str = "notes/";
pub const DEFAULT_AUDIO_PREFIX: &str = "audio/";
pub const DEFAULT_NOTES_EXTENSION: &str = ".txt";
pub const DEFAULT_VOICE_ID: &str = "Joanna";
pub const DEFAULT_UPLOAD_KEY_PREFIX: &str = "notes/files/";
pub const DEFAULT_UPLOAD_URL_TTL_SECONDS: u64 = 600;
pub const NOTE_CONTENT_TYPE: &str = "text/plain";

/// Source location of one uploaded note, decoded from a trigger payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionEvent {
    pub source_bucket: String,
    pub source_key: String,
}

/// Audio encodings the synthesis service can return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    #[default]
    Mp3,
    OggVorbis,
    Pcm,
}

impl AudioFormat {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp3" | "audio/mpeg" => Ok(Self::Mp3),
            "ogg_vorbis" | "audio/ogg" => Ok(Self::OggVorbis),
            "pcm" | "audio/pcm" => Ok(Self::Pcm),
            other => Err(ValidationError::new(format!(
                "Unsupported audio output format '{other}'"
            ))),
        }
    }

    /// Name used by the synthesis service for this format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::Pcm => "pcm",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggVorbis => "audio/ogg",
            Self::Pcm => "audio/pcm",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => ".mp3",
            Self::OggVorbis => ".ogg",
            Self::Pcm => ".pcm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ScopeMismatch,
    AlreadyExists,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScopeMismatch => "scope mismatch",
            Self::AlreadyExists => "already exists",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Skipped,
    Error,
}

/// Per-invocation result, emitted for logging and diagnostics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub status: ConversionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConversionReport {
    pub fn success(audio_key: impl Into<String>) -> Self {
        Self {
            status: ConversionStatus::Success,
            audio_key: Some(audio_key.into()),
            reason: None,
        }
    }

    pub fn skipped(reason: SkipReason, audio_key: Option<String>) -> Self {
        Self {
            status: ConversionStatus::Skipped,
            audio_key,
            reason: Some(reason.as_str().to_string()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ConversionStatus::Error,
            audio_key: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadUrlRequest {
    pub filename: String,
}

/// `uploadURL`, `bucket` and `region` are the names the upload web page reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub key: String,
    pub audio_key: String,
    pub expires_in_seconds: u64,
    pub expires_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Checks a client-supplied note filename before it becomes part of an
/// object key.
pub fn validate_note_filename<'a>(
    filename: &'a str,
    notes_extension: &str,
) -> Result<&'a str, ValidationError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(ValidationError::new("filename is required"));
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(ValidationError::new(
            "filename must not contain path separators",
        ));
    }
    if !filename.ends_with(notes_extension) {
        return Err(ValidationError::new(format!(
            "Only {notes_extension} files are supported"
        )));
    }
    if filename.len() == notes_extension.len() {
        return Err(ValidationError::new(
            "filename must have a name before the extension",
        ));
    }
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_report_serializes_camel_case_without_reason() {
        let report = ConversionReport::success("audio/file.mp3");
        let value = serde_json::to_value(&report).expect("report should serialize");
        assert_eq!(
            value,
            serde_json::json!({"status": "success", "audioKey": "audio/file.mp3"})
        );
    }

    #[test]
    fn scope_mismatch_report_omits_audio_key() {
        let report = ConversionReport::skipped(SkipReason::ScopeMismatch, None);
        let value = serde_json::to_value(&report).expect("report should serialize");
        assert_eq!(
            value,
            serde_json::json!({"status": "skipped", "reason": "scope mismatch"})
        );
    }

    #[test]
    fn parses_audio_format_by_service_name_or_content_type() {
        assert_eq!(AudioFormat::parse("mp3"), Ok(AudioFormat::Mp3));
        assert_eq!(AudioFormat::parse("audio/mpeg"), Ok(AudioFormat::Mp3));
        assert_eq!(AudioFormat::parse(" OGG_VORBIS "), Ok(AudioFormat::OggVorbis));
        assert_eq!(AudioFormat::Pcm.extension(), ".pcm");

        let error = AudioFormat::parse("flac").expect_err("flac is not supported");
        assert!(error.message().contains("flac"));
    }

    #[test]
    fn filename_validation_rejects_unsupported_names() {
        assert_eq!(validate_note_filename("todo.txt", ".txt"), Ok("todo.txt"));
        assert!(validate_note_filename("", ".txt").is_err());
        assert!(validate_note_filename("photo.png", ".txt").is_err());
        assert!(validate_note_filename("../secrets.txt", ".txt").is_err());
        assert!(validate_note_filename(".txt", ".txt").is_err());
    }
}
