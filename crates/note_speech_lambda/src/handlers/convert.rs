use std::fmt;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

use crate::adapters::object_store::{ObjectLookup, ObjectStore};
use crate::adapters::speech::{SpeechRequest, SpeechSynthesizer};
use crate::config::ConverterConfig;
use crate::runtime::contract::{ConversionEvent, ConversionReport, SkipReason};
use crate::runtime::trigger::{decode_trigger, TriggerError};

const UTF8_BOM: char = '\u{feff}';

/// Non-error terminal states of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted {
        audio_bucket: String,
        audio_key: String,
    },
    Skipped {
        reason: SkipReason,
        audio_key: Option<String>,
    },
}

impl ConversionOutcome {
    pub fn report(&self) -> ConversionReport {
        match self {
            Self::Converted { audio_key, .. } => ConversionReport::success(audio_key.clone()),
            Self::Skipped { reason, audio_key } => {
                ConversionReport::skipped(*reason, audio_key.clone())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStage {
    Fetch,
    Synthesis,
    Write,
}

impl fmt::Display for ServiceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetching note text",
            Self::Synthesis => "synthesizing speech",
            Self::Write => "writing audio",
        })
    }
}

/// Fatal conditions. Each aborts the invocation before any partial write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("malformed trigger: {0}")]
    MalformedTrigger(#[from] TriggerError),
    #[error("existence check for s3://{bucket}/{key} failed: {detail}")]
    UnexpectedStorageError {
        bucket: String,
        key: String,
        detail: String,
    },
    #[error("source note s3://{bucket}/{key} does not exist")]
    SourceMissing { bucket: String, key: String },
    #[error("source note s3://{bucket}/{key} is not valid UTF-8 text")]
    UndecodableText { bucket: String, key: String },
    #[error("source note s3://{bucket}/{key} contains no text")]
    EmptyText { bucket: String, key: String },
    #[error("{stage} failed: {detail}")]
    TransientServiceFailure { stage: ServiceStage, detail: String },
}

impl ConversionError {
    pub fn report(&self) -> ConversionReport {
        ConversionReport::error(self.to_string())
    }
}

/// Runs one conversion for a raw trigger payload.
pub fn handle_conversion_event(
    payload: &Value,
    config: &ConverterConfig,
    store: &impl ObjectStore,
    synthesizer: &impl SpeechSynthesizer,
) -> Result<ConversionOutcome, ConversionError> {
    let decoded = decode_trigger(payload).map_err(|trigger_error| {
        error!(
            event = "conversion_failed",
            error = %trigger_error,
            "trigger could not be decoded"
        );
        ConversionError::from(trigger_error)
    })?;

    if decoded.ignored_records > 0 {
        warn!(
            event = "extra_records_ignored",
            ignored_records = decoded.ignored_records,
            "only the first notification record is converted"
        );
    }

    handle_conversion(&decoded.event, config, store, synthesizer)
}

/// Runs one conversion for an already decoded event.
pub fn handle_conversion(
    event: &ConversionEvent,
    config: &ConverterConfig,
    store: &impl ObjectStore,
    synthesizer: &impl SpeechSynthesizer,
) -> Result<ConversionOutcome, ConversionError> {
    let span = info_span!(
        "conversion",
        component = "conversion",
        source_bucket = %event.source_bucket,
        source_key = %event.source_key,
    );
    let _entered = span.enter();
    let started_at = Instant::now();
    info!(event = "conversion_started");

    match convert(event, config, store, synthesizer) {
        Ok(outcome) => {
            match &outcome {
                ConversionOutcome::Converted {
                    audio_bucket,
                    audio_key,
                } => info!(
                    event = "conversion_completed",
                    audio_bucket = %audio_bucket,
                    audio_key = %audio_key,
                    duration_ms = started_at.elapsed().as_millis() as u64,
                ),
                ConversionOutcome::Skipped { reason, audio_key } => info!(
                    event = "conversion_skipped",
                    reason = reason.as_str(),
                    audio_key = audio_key.as_deref().unwrap_or_default(),
                ),
            }
            Ok(outcome)
        }
        Err(conversion_error) => {
            error!(
                event = "conversion_failed",
                error = %conversion_error,
                duration_ms = started_at.elapsed().as_millis() as u64,
            );
            Err(conversion_error)
        }
    }
}

fn convert(
    event: &ConversionEvent,
    config: &ConverterConfig,
    store: &impl ObjectStore,
    synthesizer: &impl SpeechSynthesizer,
) -> Result<ConversionOutcome, ConversionError> {
    let mapping = &config.key_mapping;
    let Some(audio_key) = mapping.audio_key(&event.source_key) else {
        info!(
            event = "scope_rejected",
            notes_prefix = mapping.notes_prefix(),
        );
        return Ok(ConversionOutcome::Skipped {
            reason: SkipReason::ScopeMismatch,
            audio_key: None,
        });
    };
    let audio_bucket = config.destination_bucket(&event.source_bucket);

    match store.head_object(audio_bucket, &audio_key) {
        ObjectLookup::Found(metadata) => {
            info!(
                event = "already_converted",
                audio_key = %audio_key,
                audio_bytes = metadata.content_length,
            );
            return Ok(ConversionOutcome::Skipped {
                reason: SkipReason::AlreadyExists,
                audio_key: Some(audio_key),
            });
        }
        ObjectLookup::NotFound => {}
        ObjectLookup::Failure(detail) => {
            return Err(ConversionError::UnexpectedStorageError {
                bucket: audio_bucket.to_string(),
                key: audio_key,
                detail,
            });
        }
    }

    let text = fetch_text(store, &event.source_bucket, &event.source_key)?;
    info!(event = "source_fetched", text_bytes = text.len());

    let request = SpeechRequest {
        text,
        output_format: config.voice.output_format,
        voice: config.voice.voice.clone(),
        engine: config.voice.engine.clone(),
    };
    let audio = synthesizer
        .synthesize(&request)
        .map_err(|detail| ConversionError::TransientServiceFailure {
            stage: ServiceStage::Synthesis,
            detail,
        })?;
    info!(
        event = "audio_synthesized",
        audio_bytes = audio.len(),
        voice = %request.voice,
        output_format = request.output_format.as_str(),
    );

    store
        .put_object(
            audio_bucket,
            &audio_key,
            &audio,
            request.output_format.content_type(),
        )
        .map_err(|detail| ConversionError::TransientServiceFailure {
            stage: ServiceStage::Write,
            detail,
        })?;

    Ok(ConversionOutcome::Converted {
        audio_bucket: audio_bucket.to_string(),
        audio_key,
    })
}

fn fetch_text(store: &impl ObjectStore, bucket: &str, key: &str) -> Result<String, ConversionError> {
    let body = match store.get_object(bucket, key) {
        ObjectLookup::Found(body) => body,
        ObjectLookup::NotFound => {
            return Err(ConversionError::SourceMissing {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        ObjectLookup::Failure(detail) => {
            return Err(ConversionError::TransientServiceFailure {
                stage: ServiceStage::Fetch,
                detail,
            });
        }
    };

    let text = String::from_utf8(body).map_err(|_| ConversionError::UndecodableText {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })?;
    let text = if text.starts_with(UTF8_BOM) {
        text[UTF8_BOM.len_utf8()..].to_string()
    } else {
        text
    };

    if text.trim().is_empty() {
        return Err(ConversionError::EmptyText {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
    }
    Ok(text)
}
