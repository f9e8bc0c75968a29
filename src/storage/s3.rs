//! S3-compatible gateway blob store.
//!
//! Proxies blob operations to any S3-compatible store (MinIO, AWS S3,
//! LocalStack) through the AWS SDK.  Credentials are resolved via the
//! standard AWS credential chain unless explicit keys are configured.
//!
//! Provisioning creates the bucket if missing and attaches a public-read
//! policy so stored image URLs resolve without signing.

use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use crate::config::S3StorageConfig;

use super::client::{blob_url, BlobStore};

/// Gateway store that forwards operations to an S3-compatible endpoint.
pub struct S3GatewayStore {
    /// AWS S3 SDK client.
    client: Client,
    /// Bucket all blobs are written into.
    bucket: String,
    /// Base URL under which blobs resolve publicly.
    public_url: String,
}

impl S3GatewayStore {
    /// Create a new S3 gateway store.
    ///
    /// When `endpoint_url` is set the client talks to that endpoint
    /// (MinIO, LocalStack) instead of AWS proper; `use_path_style`
    /// should stay on for those.
    pub async fn new(
        bucket: String,
        public_url: String,
        cfg: &S3StorageConfig,
    ) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.region.clone()));

        if !cfg.endpoint_url.is_empty() {
            config_loader = config_loader.endpoint_url(&cfg.endpoint_url);
        }

        // If explicit credentials are provided, inject them as static credentials.
        if !cfg.access_key_id.is_empty() && !cfg.secret_access_key.is_empty() {
            let creds = aws_sdk_s3::config::Credentials::new(
                &cfg.access_key_id,
                &cfg.secret_access_key,
                None, // session_token
                None, // expiry
                "curio-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(cfg.use_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "S3 gateway store initialized: bucket={} endpoint='{}'",
            bucket, cfg.endpoint_url
        );

        Ok(Self {
            client,
            bucket,
            public_url,
        })
    }

    /// Render the bucket policy JSON granting anonymous `s3:GetObject`.
    fn public_read_policy(bucket: &str) -> String {
        serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": { "AWS": ["*"] },
                    "Action": ["s3:GetObject"],
                    "Resource": [format!("arn:aws:s3:::{bucket}/*")],
                }
            ]
        })
        .to_string()
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("S3 {context}: {err}")
    }
}

impl BlobStore for S3GatewayStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url_for(&self, key: &str) -> String {
        blob_url(&self.public_url, &self.bucket, key)
    }

    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let exists = self
                .client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .is_ok();

            if exists {
                debug!("bucket {} already exists", self.bucket);
            } else {
                match self
                    .client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                {
                    Ok(_) => info!("bucket {} created", self.bucket),
                    Err(err) => {
                        let service_err = err.into_service_error();
                        if service_err.is_bucket_already_owned_by_you()
                            || service_err.is_bucket_already_exists()
                        {
                            debug!("bucket {} already exists", self.bucket);
                        } else {
                            return Err(Self::map_sdk_error("create_bucket", service_err));
                        }
                    }
                }
            }

            self.client
                .put_bucket_policy()
                .bucket(&self.bucket)
                .policy(Self::public_read_policy(&self.bucket))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_bucket_policy", e))?;
            info!("bucket {} is publicly readable", self.bucket);

            Ok(())
        })
    }

    fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        let content_type = content_type.to_string();
        Box::pin(async move {
            debug!("S3 put_object: bucket={} key={}", self.bucket, key);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type(content_type)
                .body(aws_sdk_s3::primitives::ByteStream::from(data))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;

            Ok(self.url_for(&key))
        })
    }

    fn get(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<Bytes>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 get_object: bucket={} key={}", self.bucket, key);

            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        anyhow::anyhow!("blob not found at key: {key}")
                    } else {
                        Self::map_sdk_error("get_object", service_err)
                    }
                })?;

            let body = resp
                .body
                .collect()
                .await
                .map_err(|e| Self::map_sdk_error("get_object body", e))?;

            Ok(body.into_bytes())
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 delete_object: bucket={} key={}", self.bucket, key);

            // S3 DeleteObject succeeds for absent keys, which is exactly
            // the convergence the delete path needs.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", e))?;

            Ok(())
        })
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_read_policy_targets_bucket() {
        let policy = S3GatewayStore::public_read_policy("curio-objects");
        let parsed: serde_json::Value = serde_json::from_str(&policy).unwrap();
        assert_eq!(parsed["Version"], "2012-10-17");
        assert_eq!(
            parsed["Statement"][0]["Resource"][0],
            "arn:aws:s3:::curio-objects/*"
        );
        assert_eq!(parsed["Statement"][0]["Action"][0], "s3:GetObject");
    }
}
