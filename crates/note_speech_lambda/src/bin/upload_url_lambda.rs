use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use note_speech_lambda::adapters::aws::S3ObjectStore;
use note_speech_lambda::config::{ConfigError, UploadUrlConfig};
use note_speech_lambda::handlers::upload_url::{handle_upload_url_event, ApiGatewayResponse};
use note_speech_lambda::telemetry::init_tracing;
use serde_json::Value;
use tracing::error;

struct RuntimeDependencies {
    config: Option<UploadUrlConfig>,
    presigner: S3ObjectStore,
}

async fn handle_request(
    deps: &RuntimeDependencies,
    event: LambdaEvent<Value>,
) -> Result<ApiGatewayResponse, Error> {
    Ok(handle_upload_url_event(
        event.payload,
        deps.config.as_ref(),
        &deps.presigner,
        Utc::now(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    // A missing bucket is reported per request; any other invalid value stops
    // the runtime at cold start.
    let config = match UploadUrlConfig::from_env() {
        Ok(config) => Some(config),
        Err(missing @ ConfigError::Missing(_)) => {
            error!(event = "misconfiguration", error = %missing);
            None
        }
        Err(invalid) => return Err(invalid.into()),
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        config,
        presigner: S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config)),
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(deps, event).await
    }))
    .await
}
