//! AWS S3 backend.
//!
//! A fresh client is built for every request from the matched binding:
//! the binding's region, its static credentials when both halves are set,
//! and otherwise the standard AWS credential chain (env vars,
//! `~/.aws/credentials`, IAM role, etc.). Clients are never shared between
//! bindings, so one binding's credentials cannot leak into another's request.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::backend::{BucketConnector, BucketSession, ObjectReader, StorageError};
use crate::config::Binding;

/// Connector for AWS S3 and S3-compatible stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector;

impl S3Connector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BucketConnector for S3Connector {
    async fn connect(&self, binding: &Binding) -> Result<Box<dyn BucketSession>, StorageError> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(binding.region.clone()));

        if let Some((key, secret)) = binding.static_credentials() {
            let creds = aws_sdk_s3::config::Credentials::new(key, secret, None, None, "buckit-binding");
            loader = loader.credentials_provider(creds);
        }
        if let Some(endpoint) = &binding.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(binding.force_path_style)
            .build();

        debug!(bucket = %binding.bucket_name, region = %binding.region, "S3 session established");

        Ok(Box::new(S3Session {
            client: Client::from_conf(s3_config),
            bucket: binding.bucket_name.clone(),
        }))
    }
}

/// Per-request S3 client bound to one bucket.
struct S3Session {
    client: Client,
    bucket: String,
}

#[async_trait]
impl BucketSession for S3Session {
    async fn open(&self, key: &str) -> Result<Box<dyn ObjectReader>, StorageError> {
        debug!(bucket = %self.bucket, key = %key, "S3 get_object");

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_get_error(&self.bucket, key, e))?;

        Ok(Box::new(S3Reader {
            content_length: resp.content_length().and_then(|len| u64::try_from(len).ok()),
            content_type: resp.content_type().map(ToOwned::to_owned),
            body: resp.body,
        }))
    }
}

fn map_get_error(bucket: &str, key: &str, err: SdkError<GetObjectError, HttpResponse>) -> StorageError {
    match &err {
        SdkError::ServiceError(service)
            if service.err().is_no_such_key() || service.raw().status().as_u16() == 404 =>
        {
            StorageError::NotFound(format!("{bucket}/{key}"))
        }
        _ => StorageError::Unavailable(DisplayErrorContext(&err).to_string()),
    }
}

/// Streaming body of one S3 object.
struct S3Reader {
    content_length: Option<u64>,
    content_type: Option<String>,
    body: ByteStream,
}

#[async_trait]
impl ObjectReader for S3Reader {
    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, StorageError> {
        match self.body.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(StorageError::Read(DisplayErrorContext(&e).to_string())),
            None => Ok(None),
        }
    }
}
