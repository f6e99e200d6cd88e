use serde::Deserialize;

/// Connection settings for an S3-compatible object store.
#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStoreConfig {
    /// Bucket holding the blobs. Default: "stowage".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Region name sent with signed requests. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint URL, e.g. "http://localhost:9000" for MinIO.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

fn default_bucket() -> String {
    "stowage".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_endpoint() -> String {
    "http://localhost:9000".into()
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: default_endpoint(),
            access_key: None,
            secret_key: None,
        }
    }
}
