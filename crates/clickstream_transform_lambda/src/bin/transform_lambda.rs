use aws_sdk_s3::primitives::ByteStream;
use clickstream_transform_lambda::adapters::object_store::ObjectStore;
use clickstream_transform_lambda::config::HandlerConfig;
use clickstream_transform_lambda::handlers::transform::handle_event_value;
use clickstream_transform_lambda::runtime::clock::SystemClock;
use clickstream_transform_lambda::runtime::contract::HandlerStatus;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read object from s3: {error}"))?;
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|error| format!("failed to stream object body from s3: {error}"))?;
                Ok(body.into_bytes().to_vec())
            })
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let content_type = content_type.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(object_key)
                    .content_type(content_type)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write object to s3: {error}"))
            })
        })
    }
}

struct RuntimeDependencies {
    config: HandlerConfig,
    store: S3ObjectStore,
}

fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<HandlerStatus, Error> {
    info!(request_id = %event.context.request_id, "invocation_started");
    handle_event_value(event.payload, &deps.config, &deps.store, &SystemClock).map_err(Error::from)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_target(false)
        .with_current_span(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let config = HandlerConfig::from_env().map_err(Error::from)?;
    info!(
        raw_prefix = %config.key_mapping.raw_prefix,
        processed_prefix = %config.key_mapping.processed_prefix,
        failure_policy = config.failure_policy.as_str(),
        "runtime_configured"
    );

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        config,
        store: S3ObjectStore {
            s3_client: aws_sdk_s3::Client::new(&aws_config),
        },
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps)
    }))
    .await
}
