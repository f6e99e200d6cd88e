use std::net::SocketAddr;
use std::sync::Arc;

use common::storage::memory::MemoryBlobStore;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;

use stowage_server::config::AppConfig;
use stowage_server::metadata::MemoryMetadataStore;
use stowage_server::references::MemoryReferences;
use stowage_server::state::AppState;

pub mod routes {
    pub const FILES: &str = "/api/v1/files";
    pub const GC: &str = "/api/v1/admin/gc";

    pub fn file(unique_name: &str) -> String {
        format!("/api/v1/files/{unique_name}")
    }

    pub fn file_metadata(unique_name: &str) -> String {
        format!("/api/v1/files/{unique_name}/metadata")
    }
}

/// A running test server over in-memory stores.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub blobs: Arc<MemoryBlobStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub references: Arc<MemoryReferences>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a customized configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        config.server.port = 0;
        configure(&mut config);

        let blobs = Arc::new(MemoryBlobStore::with_max_size(config.storage.max_blob_size));
        let metadata = Arc::new(MemoryMetadataStore::new());
        let references = Arc::new(MemoryReferences::new());

        let state = AppState::new(
            config,
            blobs.clone(),
            metadata.clone(),
            references.clone(),
        )
        .expect("Failed to build application state");

        let app = stowage_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            blobs,
            metadata,
            references,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn upload(
        &self,
        owner_type: &str,
        file_name: &str,
        file_bytes: &[u8],
        mime_type: Option<&str>,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes.to_vec()).file_name(file_name.to_string());
        let mut form = reqwest::multipart::Form::new()
            .text("owner_type", owner_type.to_string())
            .part("file", part);
        if let Some(mime) = mime_type {
            form = form.text("mime_type", mime.to_string());
        }
        self.post_multipart(form).await
    }

    pub async fn post_multipart(&self, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::FILES))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");

        TestResponse::from_response(res).await
    }

    /// Upload and return the unique name, asserting success.
    pub async fn upload_ok(&self, owner_type: &str, file_name: &str, file_bytes: &[u8]) -> String {
        let res = self.upload(owner_type, file_name, file_bytes, None).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.body);
        res.body["unique_name"]
            .as_str()
            .expect("response body should contain 'unique_name'")
            .to_string()
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_if_none_match(&self, path: &str, etag: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("If-None-Match", etag)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
