use reqwest::Method;

use crate::common::{TestApp, routes};

const CONTENT: &[u8] = b"{\"goal\":\"brush teeth\"}";

#[tokio::test]
async fn download_streams_the_blob_as_an_attachment() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;
    let (_, blob_id) = app.create_workflow(&alice, CONTENT).await;

    let res = app.get(&routes::file(&blob_id), Some(&alice.token)).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.bytes, CONTENT);
    assert_eq!(res.header("content-type"), Some("application/octet-stream"));
    assert_eq!(
        res.header("content-length"),
        Some(CONTENT.len().to_string().as_str())
    );
    assert_eq!(
        res.header("content-disposition"),
        Some(format!("attachment; filename*=UTF-8''{blob_id}").as_str())
    );
}

#[tokio::test]
async fn any_principal_may_download() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;
    let bob = app.create_user("bob", false).await;
    let (_, blob_id) = app.create_workflow(&alice, CONTENT).await;

    let res = app.get(&routes::file(&blob_id), Some(&bob.token)).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.bytes, CONTENT);
}

#[tokio::test]
async fn head_returns_headers_only() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;
    let (_, blob_id) = app.create_workflow(&alice, CONTENT).await;

    let res = app
        .send(app.request(Method::HEAD, &routes::file(&blob_id), Some(&alice.token)))
        .await;

    assert_eq!(res.status, 200);
    assert!(res.bytes.is_empty());
    assert_eq!(res.header("content-type"), Some("application/octet-stream"));
}

#[tokio::test]
async fn anonymous_callers_are_forbidden_whatever_the_path() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;
    let (_, blob_id) = app.create_workflow(&alice, CONTENT).await;

    let nested = format!("abc/{blob_id}");
    let trailing = format!("{blob_id}/");
    for id in [
        blob_id.as_str(),
        "AAAAAAAAAAAA",
        "short",
        "waytoolongidentifier",
        "abc-def_ghij",
        "a/b",
        nested.as_str(),
        trailing.as_str(),
    ] {
        let res = app.get(&routes::file(id), None).await;
        assert_eq!(res.status, 403, "{id}");
        assert_eq!(res.body["code"], "NOT_AUTHENTICATED", "{id}");
    }
    assert_eq!(app.get(routes::FILES, None).await.status, 403);
}

#[tokio::test]
async fn malformed_ids_are_not_found() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;

    for id in [
        "short",
        "aaaaaaaaaaaaa",
        "abc-def_ghij",
        "abc.defghijk",
        "%C3%A4bcdefghijk",
        "a/b",
        "abcDEF123456/",
        "abc/abcDEF123456",
    ] {
        let res = app.get(&routes::file(id), Some(&alice.token)).await;
        assert_eq!(res.status, 404, "{id}");
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn missing_blob_is_not_found() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;

    let res = app.get(&routes::file("AAAAAAAAAAAA"), Some(&alice.token)).await;

    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn empty_id_is_refused_even_when_authenticated() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;

    let res = app.get(routes::FILES, Some(&alice.token)).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}
