use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use super::{ArchiveCipher, ColdStore, ColdStoreError, prepare_payload};
use crate::config::{S3ArchiveConfig, S3ServerSideEncryption};

/// S3-compatible cold storage backend.
///
/// Works with AWS S3, MinIO, Cloudflare R2 and other S3-compatible services.
/// Archival storage classes (`GLACIER`, `DEEP_ARCHIVE`) are set per object.
pub struct S3ColdStore {
    config: S3ArchiveConfig,
    client: aws_sdk_s3::Client,
    cipher: Option<ArchiveCipher>,
}

impl S3ColdStore {
    pub async fn new(config: S3ArchiveConfig, cipher: Option<ArchiveCipher>) -> Self {
        info!(bucket = %config.bucket, "Initializing S3 cold storage");

        let mut sdk_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            sdk_config_builder = sdk_config_builder.region(aws_config::Region::new(region.clone()));
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None, // session token
                None, // expiry
                "revision-reaper-config",
            );
            sdk_config_builder = sdk_config_builder.credentials_provider(credentials);
        }

        let sdk_config = sdk_config_builder.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config_builder.build());

        Self {
            config,
            client,
            cipher,
        }
    }
}

#[async_trait]
impl ColdStore for S3ColdStore {
    #[instrument(skip(self, payload), fields(size = payload.len(), bucket = %self.config.bucket))]
    async fn put(&self, key: &str, payload: Vec<u8>, encrypt: bool) -> Result<(), ColdStoreError> {
        let content = prepare_payload(self.cipher.as_ref(), payload, encrypt)?;
        debug!(key, size = content.len(), "Archiving revision to S3");

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(if encrypt {
                "application/octet-stream"
            } else {
                "application/json"
            })
            .body(aws_sdk_s3::primitives::ByteStream::from(content));

        if let Some(storage_class) = &self.config.storage_class {
            request = request.storage_class(storage_class.as_str().into());
        }

        if let Some(sse) = &self.config.server_side_encryption {
            match sse {
                S3ServerSideEncryption::Aes256 => {
                    request = request
                        .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::Aes256);
                }
                S3ServerSideEncryption::Kms { key_id } => {
                    request = request
                        .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::AwsKms)
                        .ssekms_key_id(key_id);
                }
            }
        }

        request.send().await.map_err(|e| {
            error!(key, error = %e, "Failed to upload archive to S3");
            ColdStoreError::S3(e.to_string())
        })?;

        debug!(key, "Revision archived");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<S3ColdStore>();
    }
}
