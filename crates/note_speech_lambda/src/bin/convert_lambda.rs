use lambda_runtime::{service_fn, Error, LambdaEvent};
use note_speech_lambda::adapters::aws::{PollySynthesizer, S3ObjectStore};
use note_speech_lambda::config::ConverterConfig;
use note_speech_lambda::handlers::convert::handle_conversion_event;
use note_speech_lambda::runtime::contract::ConversionReport;
use note_speech_lambda::telemetry::init_tracing;
use serde_json::Value;
use tracing::info_span;

/// Built once per cold start and shared read-only by every invocation.
struct RuntimeDependencies {
    config: ConverterConfig,
    store: S3ObjectStore,
    synthesizer: PollySynthesizer,
}

async fn handle_request(
    deps: &RuntimeDependencies,
    event: LambdaEvent<Value>,
) -> Result<ConversionReport, Error> {
    let span = info_span!("invocation", request_id = %event.context.request_id);
    // The handler logs `conversion_failed`; `Err` makes the platform redeliver.
    span.in_scope(|| {
        handle_conversion_event(&event.payload, &deps.config, &deps.store, &deps.synthesizer)
            .map(|outcome| outcome.report())
            .map_err(Error::from)
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = ConverterConfig::from_env()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        config,
        store: S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config)),
        synthesizer: PollySynthesizer::new(aws_sdk_polly::Client::new(&aws_config)),
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(deps, event).await
    }))
    .await
}
