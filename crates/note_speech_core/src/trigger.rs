use percent_encoding::percent_decode_str;
use serde_json::Value;
use thiserror::Error;

use crate::contract::ConversionEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("trigger payload must be a JSON object")]
    NotAnObject,
    #[error("storage notification contains no records")]
    NoRecords,
    #[error("trigger payload is missing string field `{0}`")]
    MissingField(&'static str),
    #[error("object key `{key}` is not valid percent-encoded UTF-8")]
    UndecodableKey { key: String },
}

/// A decoded trigger plus the number of notification records that were
/// present but not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTrigger {
    pub event: ConversionEvent,
    pub ignored_records: usize,
}

/// Decodes either an S3 notification (`Records[0].s3.bucket.name` /
/// `Records[0].s3.object.key`) or a flat `{ "bucket", "key" }` payload.
pub fn decode_trigger(payload: &Value) -> Result<DecodedTrigger, TriggerError> {
    let object = payload.as_object().ok_or(TriggerError::NotAnObject)?;

    if let Some(records) = object.get("Records") {
        let records = records
            .as_array()
            .ok_or(TriggerError::MissingField("Records"))?;
        let record = records.first().ok_or(TriggerError::NoRecords)?;
        let bucket = string_at(record, &["s3", "bucket", "name"])
            .ok_or(TriggerError::MissingField("s3.bucket.name"))?;
        let raw_key = string_at(record, &["s3", "object", "key"])
            .ok_or(TriggerError::MissingField("s3.object.key"))?;
        return Ok(DecodedTrigger {
            event: ConversionEvent {
                source_bucket: bucket.to_string(),
                source_key: decode_notification_key(raw_key)?,
            },
            ignored_records: records.len() - 1,
        });
    }

    let bucket = string_at(payload, &["bucket"]).ok_or(TriggerError::MissingField("bucket"))?;
    let raw_key = string_at(payload, &["key"]).ok_or(TriggerError::MissingField("key"))?;
    Ok(DecodedTrigger {
        event: ConversionEvent {
            source_bucket: bucket.to_string(),
            source_key: decode_object_key(raw_key)?,
        },
        ignored_records: 0,
    })
}

/// Decodes a key as S3 writes it into event notifications: form encoding,
/// where a space arrives as `+` and a literal `+` as `%2B`.
pub fn decode_notification_key(raw_key: &str) -> Result<String, TriggerError> {
    let spaced = raw_key.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|_| TriggerError::UndecodableKey {
            key: raw_key.to_string(),
        })
}

/// Percent-decodes a key from a flat payload. `+` is kept literally.
pub fn decode_object_key(raw_key: &str) -> Result<String, TriggerError> {
    percent_decode_str(raw_key)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|_| TriggerError::UndecodableKey {
            key: raw_key.to_string(),
        })
}

fn string_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, segment| current.get(segment))
        .and_then(Value::as_str)
}
