//! S3 and Polly implementations of the storage and synthesis seams.
//!
//! The handlers are synchronous; these adapters bridge into the async SDKs
//! with `block_in_place`, so they must run on a multi-threaded Tokio runtime.

use std::future::Future;
use std::time::Duration;

use aws_sdk_polly::types::{Engine, OutputFormat, VoiceId};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::adapters::object_store::{ObjectLookup, ObjectMetadata, ObjectStore, UrlPresigner};
use crate::adapters::speech::{SpeechRequest, SpeechSynthesizer};

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3ObjectStore {
    fn head_object(&self, bucket: &str, key: &str) -> ObjectLookup<ObjectMetadata> {
        let result = block_on(self.client.head_object().bucket(bucket).key(key).send());
        match result {
            Ok(output) => ObjectLookup::Found(ObjectMetadata {
                content_length: output.content_length(),
            }),
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|service_error| service_error.is_not_found()) =>
            {
                ObjectLookup::NotFound
            }
            Err(error) => ObjectLookup::Failure(format!(
                "failed to head object s3://{bucket}/{key}: {}",
                DisplayErrorContext(&error)
            )),
        }
    }

    fn get_object(&self, bucket: &str, key: &str) -> ObjectLookup<Vec<u8>> {
        block_on(async {
            let output = match self.client.get_object().bucket(bucket).key(key).send().await {
                Ok(output) => output,
                Err(error)
                    if error
                        .as_service_error()
                        .is_some_and(|service_error| service_error.is_no_such_key()) =>
                {
                    return ObjectLookup::NotFound;
                }
                Err(error) => {
                    return ObjectLookup::Failure(format!(
                        "failed to get object s3://{bucket}/{key}: {}",
                        DisplayErrorContext(&error)
                    ));
                }
            };

            match output.body.collect().await {
                Ok(data) => ObjectLookup::Found(data.into_bytes().to_vec()),
                Err(error) => ObjectLookup::Failure(format!(
                    "failed to read body of s3://{bucket}/{key}: {error}"
                )),
            }
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String> {
        block_on(
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(body.to_vec()))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to write object to s3://{bucket}/{key}: {}",
                DisplayErrorContext(&error)
            )
        })
    }
}

impl UrlPresigner for S3ObjectStore {
    fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|error| format!("invalid presigned url lifetime: {error}"))?;

        block_on(
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .presigned(presigning_config),
        )
        .map(|request| request.uri().to_string())
        .map_err(|error| {
            format!(
                "failed to presign upload for s3://{bucket}/{key}: {}",
                DisplayErrorContext(&error)
            )
        })
    }
}

pub struct PollySynthesizer {
    client: aws_sdk_polly::Client,
}

impl PollySynthesizer {
    pub fn new(client: aws_sdk_polly::Client) -> Self {
        Self { client }
    }
}

impl SpeechSynthesizer for PollySynthesizer {
    fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, String> {
        block_on(async {
            let response = self
                .client
                .synthesize_speech()
                .text(&request.text)
                .voice_id(VoiceId::from(request.voice.as_str()))
                .output_format(OutputFormat::from(request.output_format.as_str()))
                .set_engine(request.engine.as_deref().map(Engine::from))
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "polly synthesis failed: {}",
                        aws_sdk_polly::error::DisplayErrorContext(&error)
                    )
                })?;

            response
                .audio_stream
                .collect()
                .await
                .map(|data| data.into_bytes().to_vec())
                .map_err(|error| format!("failed to read polly audio stream: {error}"))
        })
    }
}
