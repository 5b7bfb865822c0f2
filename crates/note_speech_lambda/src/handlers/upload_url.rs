use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::adapters::object_store::UrlPresigner;
use crate::config::UploadUrlConfig;
use crate::runtime::contract::{
    validate_note_filename, UploadUrlRequest, UploadUrlResponse, NOTE_CONTENT_TYPE,
};
use crate::runtime::storage_keys::upload_object_key;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

/// Issues a presigned PUT URL for one note upload.
///
/// `config` is `None` when the upload bucket is not configured; the request
/// is then answered with a 500 instead of failing the whole runtime.
pub fn handle_upload_url_event(
    event: Value,
    config: Option<&UploadUrlConfig>,
    presigner: &dyn UrlPresigner,
    issued_at: DateTime<Utc>,
) -> ApiGatewayResponse {
    let request = match extract_upload_request(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let Some(config) = config else {
        return error_response(
            500,
            json!({
                "error": "misconfiguration",
                "message": "UPLOAD_BUCKET must be configured",
            }),
        );
    };

    let mapping = &config.key_mapping;
    let filename = match validate_note_filename(&request.filename, mapping.notes_extension()) {
        Ok(value) => value,
        Err(error) => return validation_error_response(error.message()),
    };

    let key = upload_object_key(&config.key_prefix, filename);
    let Some(audio_key) = mapping.audio_key(&key) else {
        return error_response(
            500,
            json!({
                "error": "misconfiguration",
                "message": "upload prefix lies outside the notes prefix",
            }),
        );
    };

    let upload_url = match presigner.presign_put(
        &config.bucket,
        &key,
        NOTE_CONTENT_TYPE,
        config.expires_in,
    ) {
        Ok(value) => value,
        Err(error) => {
            warn!(event = "presign_failed", key = %key, error = %error);
            return error_response(
                502,
                json!({
                    "error": "presign_failed",
                    "message": error,
                }),
            );
        }
    };

    let expires_in_seconds = config.expires_in.as_secs();
    let expires_at = issued_at + chrono::Duration::seconds(expires_in_seconds as i64);
    info!(
        event = "upload_url_issued",
        bucket = %config.bucket,
        key = %key,
        expires_in_seconds,
    );

    success_response(
        200,
        UploadUrlResponse {
            upload_url,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            key,
            audio_key,
            expires_in_seconds,
            expires_at: expires_at.to_rfc3339(),
        },
    )
}

/// Reads the filename from the query string (`?filename=`) or from a JSON
/// body, which API Gateway delivers either as a string or already parsed.
fn extract_upload_request(event: Value) -> Result<UploadUrlRequest, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    if let Some(filename) = object
        .get("queryStringParameters")
        .and_then(|params| params.get("filename"))
        .and_then(Value::as_str)
    {
        return Ok(UploadUrlRequest {
            filename: filename.to_string(),
        });
    }

    let body = match object.get("body") {
        None | Some(Value::Null) => return Err("filename is required".to_string()),
        Some(body @ Value::Object(_)) => body.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => {
            return Err("filename is required".to_string())
        }
        Some(Value::String(text)) => serde_json::from_str(text)
            .map_err(|error| format!("Malformed JSON body: {error}"))?,
        Some(_) => return Err("Request body must be a JSON object".to_string()),
    };

    serde_json::from_value(body).map_err(|error| format!("Malformed request: {error}"))
}

fn validation_error_response(message: &str) -> ApiGatewayResponse {
    error_response(
        400,
        json!({
            "error": "validation_error",
            "message": message,
        }),
    )
}

fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    match serde_json::to_string(&payload) {
        Ok(body) => ApiGatewayResponse {
            status_code,
            headers: response_headers(),
            body,
        },
        Err(error) => error_response(
            500,
            json!({
                "error": "serialization_error",
                "message": error.to_string(),
            }),
        ),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: response_headers(),
        body: payload.to_string(),
    }
}

fn response_headers() -> Value {
    json!({
        "Content-Type": "application/json",
        "Access-Control-Allow-Origin": "*",
    })
}
