use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn sweep_deletes_unreferenced_files_only() {
    let app = TestApp::spawn().await;
    let kept = app.upload_ok("doc", "kept.txt", b"kept").await;
    let orphan = app.upload_ok("doc", "orphan.txt", b"orphan").await;
    let avatar = app.upload_ok("avatar", "me.png", b"png").await;
    app.references.add(kept.clone());

    // Warm the caches for the file about to be swept.
    assert_eq!(app.get(&routes::file(&orphan)).await.status, 200);

    let res = app.post_json(routes::GC, &json!({ "owner_types": ["doc"] })).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["scanned"], 2);
    assert_eq!(res.body["referenced"], 1);
    assert_eq!(res.body["deleted"], json!([orphan]));
    assert_eq!(res.body["failed"], json!([]));

    assert_eq!(app.get(&routes::file(&orphan)).await.status, 404);
    assert_eq!(app.get(&routes::file_metadata(&orphan)).await.status, 404);
    assert_eq!(app.get(&routes::file(&kept)).await.status, 200);
    assert_eq!(app.get(&routes::file(&avatar)).await.status, 200);
    assert_eq!(app.blobs.len(), 2);
}

#[tokio::test]
async fn repeated_sweep_is_a_no_op() {
    let app = TestApp::spawn().await;
    app.upload_ok("doc", "a.txt", b"a").await;

    let first = app.post_json(routes::GC, &json!({ "owner_types": ["doc"] })).await;
    assert_eq!(first.body["deleted"].as_array().unwrap().len(), 1);

    let second = app.post_json(routes::GC, &json!({ "owner_types": ["doc"] })).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.body["deleted"], json!([]));
}

#[tokio::test]
async fn sweep_falls_back_to_configured_owner_types() {
    let app = TestApp::spawn_with(|c| c.gc.owner_types = vec!["tmp".to_string()]).await;
    let scratch = app.upload_ok("tmp", "scratch.txt", b"x").await;
    app.upload_ok("doc", "keep.txt", b"y").await;

    let res = app.post_json(routes::GC, &json!({})).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["deleted"], json!([scratch]));
    assert_eq!(app.metadata.len(), 1);
}

#[tokio::test]
async fn sweep_without_owner_types_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app.post_json(routes::GC, &json!({ "owner_types": [] })).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}
