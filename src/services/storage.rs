use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectCannedAcl, ObjectIdentifier};

use crate::config::SpacesConfig;

/// Object storage contract for slide artifacts and layout manifests.
/// Keys are partitioned by screen id, so concurrent regenerations for
/// different screens never touch the same prefix.
#[async_trait]
pub trait SlideStore: Send + Sync {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
    async fn delete_objects(&self, keys: &[String]) -> Result<usize>;
    /// Publicly readable URL for a key, as playback devices will fetch it.
    fn public_url(&self, key: &str) -> String;
}

/// DigitalOcean Spaces (S3-compatible) implementation. The SDK region is a
/// placeholder; Spaces routes by endpoint.
pub struct SpacesStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl SpacesStore {
    pub async fn from_config(config: Option<&SpacesConfig>) -> Option<Self> {
        let config = config?;
        if config.key.trim().is_empty() || config.secret.trim().is_empty() {
            tracing::warn!("Spaces credentials missing; object storage unavailable");
            return None;
        }

        let credentials = Credentials::new(
            config.key.trim(),
            config.secret.trim(),
            None,
            None,
            "spaces-config",
        );
        let endpoint = format!("https://{}.digitaloceanspaces.com", config.region);
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let public_base = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| {
                format!(
                    "https://{}.{}.digitaloceanspaces.com",
                    config.bucket, config.region
                )
            })
            .trim_end_matches('/')
            .to_string();

        Some(Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            public_base,
        })
    }
}

#[async_trait]
impl SlideStore for SpacesStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            // Devices poll these URLs; they must revalidate on every fetch.
            .cache_control("public, max-age=0, must-revalidate")
            .send()
            .await
            .map_err(|e| anyhow!("put {} failed: {}", key, e))?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let page = request
                .send()
                .await
                .map_err(|e| anyhow!("list {} failed: {}", prefix, e))?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            if page.is_truncated() == Some(true) {
                continuation_token = page.next_continuation_token().map(|t| t.to_string());
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<usize> {
        let mut deleted = 0;
        // The S3 delete call accepts at most 1000 objects per request.
        for chunk in keys.chunks(1000) {
            let identifiers = chunk
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| anyhow!("invalid delete key {}: {}", key, e))
                })
                .collect::<Result<Vec<_>>>()?;

            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .quiet(true)
                .build()
                .map_err(|e| anyhow!("delete request invalid: {}", e))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| anyhow!("delete failed: {}", e))?;
            deleted += chunk.len();
        }
        Ok(deleted)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory store that records every mutation in order, so tests can
    /// assert the publish ordering invariant.
    #[derive(Default)]
    pub struct MemoryStore {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
        pub events: Mutex<Vec<String>>,
        pub fail_puts: Mutex<HashSet<String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_put(&self, key: &str) {
            self.fail_puts.lock().unwrap().insert(key.to_string());
        }

        pub fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        pub fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        pub fn insert(&self, key: &str, bytes: Vec<u8>) {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
        }
    }

    #[async_trait]
    impl SlideStore for MemoryStore {
        async fn put_object(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
            if self.fail_puts.lock().unwrap().contains(key) {
                return Err(anyhow!("simulated upload failure for {}", key));
            }
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            self.events.lock().unwrap().push(format!("put {}", key));
            Ok(())
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            let mut keys: Vec<String> = self
                .objects
                .lock()
                .unwrap()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        }

        async fn delete_objects(&self, keys: &[String]) -> Result<usize> {
            let mut objects = self.objects.lock().unwrap();
            let mut events = self.events.lock().unwrap();
            let mut deleted = 0;
            for key in keys {
                if objects.remove(key).is_some() {
                    deleted += 1;
                }
                events.push(format!("delete {}", key));
            }
            Ok(deleted)
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://cdn.test/{}", key)
        }
    }
}
