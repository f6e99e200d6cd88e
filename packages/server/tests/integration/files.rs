use crate::common::{TestApp, routes};

const HELLO_SHA1_BASE64: &str = "qvTGHdzF6KLavt4PO0gs2a6pQ00=";

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_unique_name_with_cleaned_extension() {
        let app = TestApp::spawn().await;

        let res = app.upload("doc", "Report.TXT", b"hello", None).await;

        assert_eq!(res.status, 201);
        let name = res.body["unique_name"].as_str().unwrap();
        assert!(name.ends_with(".txt"));
        assert_eq!(name.len(), 36 + 4);
        assert_eq!(app.blobs.len(), 1);

        let meta = app.get(&routes::file_metadata(name)).await;
        assert_eq!(meta.body["extension"], "TXT");
    }

    #[tokio::test]
    async fn same_content_gets_distinct_names() {
        let app = TestApp::spawn().await;

        let first = app.upload_ok("doc", "a.txt", b"same").await;
        let second = app.upload_ok("doc", "a.txt", b"same").await;

        assert_ne!(first, second);
        assert_eq!(app.blobs.len(), 2);
    }

    #[tokio::test]
    async fn explicit_mime_type_overrides_guess() {
        let app = TestApp::spawn().await;

        let res = app.upload("img", "pic", b"\xff\xd8\xff", Some("image/jpeg")).await;
        assert_eq!(res.status, 201);
        let name = res.body["unique_name"].as_str().unwrap();
        assert!(!name.contains('.'));

        let meta = app.get(&routes::file_metadata(name)).await;
        assert_eq!(meta.body["mime_type"], "image/jpeg");
        assert_eq!(meta.body["original_name"], "pic");
        assert!(meta.body["extension"].is_null());
    }

    #[tokio::test]
    async fn missing_owner_type_is_rejected() {
        let app = TestApp::spawn().await;
        let part = reqwest::multipart::Part::bytes(b"data".to_vec()).file_name("a.txt");
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = app.post_multipart(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.blobs.is_empty());
        assert!(app.metadata.is_empty());
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("owner_type", "doc");

        let res = app.post_multipart(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn invalid_owner_type_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload("../doc", "a.txt", b"data", None).await;

        assert_eq!(res.status, 400);
        assert!(app.metadata.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_without_metadata() {
        let app = TestApp::spawn_with(|c| c.file.max_upload_size = 4).await;

        let res = app.upload("doc", "big.bin", b"more than four bytes", None).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert!(app.blobs.is_empty());
        assert!(app.metadata.is_empty());
    }

    #[tokio::test]
    async fn storage_limit_leaves_pending_metadata() {
        let app = TestApp::spawn_with(|c| c.storage.max_blob_size = 4).await;

        let res = app.upload("doc", "big.bin", b"more than four bytes", None).await;

        assert_eq!(res.status, 413);
        assert!(app.blobs.is_empty());
        assert_eq!(app.metadata.len(), 1);
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn download_returns_content_and_headers() {
        let app = TestApp::spawn().await;
        let name = app.upload_ok("doc", "a.txt", b"hello").await;

        let res = app.get(&routes::file(&name)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"hello");
        assert_eq!(res.header("content-type"), Some("text/plain"));
        assert_eq!(res.header("content-length"), Some("5"));
        assert_eq!(
            res.header("etag"),
            Some(format!("\"{HELLO_SHA1_BASE64}\"").as_str())
        );
        assert!(res.header("cache-control").is_none());
        assert!(res.header("content-disposition").is_none());
    }

    #[tokio::test]
    async fn matching_if_none_match_returns_304() {
        let app = TestApp::spawn().await;
        let name = app.upload_ok("doc", "a.txt", b"hello").await;
        let etag = app.get(&routes::file(&name)).await.header("etag").unwrap().to_string();

        let res = app.get_if_none_match(&routes::file(&name), &etag).await;
        assert_eq!(res.status, 304);
        assert!(res.bytes.is_empty());

        let bare = app
            .get_if_none_match(&routes::file(&name), HELLO_SHA1_BASE64)
            .await;
        assert_eq!(bare.status, 304);

        let stale = app
            .get_if_none_match(&routes::file(&name), "\"something-else\"")
            .await;
        assert_eq!(stale.status, 200);
        assert_eq!(stale.bytes, b"hello");
    }

    #[tokio::test]
    async fn configured_cache_control_and_disposition() {
        let app = TestApp::spawn_with(|c| {
            c.download.cache_control_max_age_secs = 86_400;
            c.download.keep_original_name = true;
        })
        .await;
        let name = app.upload_ok("doc", "report.pdf", b"%PDF").await;

        let res = app.get(&routes::file(&name)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("cache-control"), Some("public, max-age=86400"));
        assert_eq!(
            res.header("content-disposition"),
            Some("attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf")
        );
        assert_eq!(res.header("content-type"), Some("application/pdf"));
    }

    #[tokio::test]
    async fn large_files_are_streamed() {
        let app = TestApp::spawn_with(|c| c.download.stream_threshold_bytes = 8).await;
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
        let name = app.upload_ok("doc", "blob.bin", &data).await;

        let res = app.get(&routes::file(&name)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, data);
    }

    #[tokio::test]
    async fn short_and_unknown_names_are_not_found() {
        let app = TestApp::spawn().await;

        let short = app.get(&routes::file("abc")).await;
        assert_eq!(short.status, 404);
        assert_eq!(short.body["code"], "NOT_FOUND");

        let unknown = app.get(&routes::file(&uuid::Uuid::new_v4().to_string())).await;
        assert_eq!(unknown.status, 404);

        let unknown_meta = app
            .get(&routes::file_metadata(&uuid::Uuid::new_v4().to_string()))
            .await;
        assert_eq!(unknown_meta.status, 404);
    }

    #[tokio::test]
    async fn pending_files_are_not_served() {
        use stowage_server::metadata::{FileMetadata, MetadataStore};

        let app = TestApp::spawn().await;
        let name = uuid::Uuid::new_v4().to_string();
        app.metadata
            .insert(FileMetadata {
                unique_name: name.clone(),
                owner_type: "doc".to_string(),
                original_name: Some("slow.bin".to_string()),
                extension: Some("bin".to_string()),
                mime_type: None,
                size: None,
                checksum: None,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(app.get(&routes::file(&name)).await.status, 404);

        let meta = app.get(&routes::file_metadata(&name)).await;
        assert_eq!(meta.status, 200);
        assert!(meta.body["size"].is_null());
        assert!(meta.body["checksum"].is_null());
    }
}

mod metadata {
    use super::*;

    #[tokio::test]
    async fn metadata_reports_size_and_checksum() {
        let app = TestApp::spawn().await;
        let name = app.upload_ok("doc", "a.txt", b"hello").await;

        let res = app.get(&routes::file_metadata(&name)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["unique_name"], name.as_str());
        assert_eq!(res.body["owner_type"], "doc");
        assert_eq!(res.body["original_name"], "a.txt");
        assert_eq!(res.body["extension"], "txt");
        assert_eq!(res.body["mime_type"], "text/plain");
        assert_eq!(res.body["size"], 5);
        assert_eq!(res.body["checksum"], HELLO_SHA1_BASE64);
        assert!(res.body["created_at"].is_string());
    }

    #[tokio::test]
    async fn hex_encoding_is_configurable() {
        let app = TestApp::spawn_with(|c| {
            c.file.checksum_encoding = common::storage::ChecksumEncoding::Hex;
        })
        .await;
        let name = app.upload_ok("doc", "a.txt", b"hello").await;

        let res = app.get(&routes::file_metadata(&name)).await;

        assert_eq!(
            res.body["checksum"],
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }
}
