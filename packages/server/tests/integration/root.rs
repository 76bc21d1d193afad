use reqwest::Method;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn index_is_public_and_empty() {
    let app = TestApp::spawn().await;

    let res = app.get("/", None).await;

    assert_eq!(res.status, 200);
    assert!(res.text.is_empty());
}

#[tokio::test]
async fn api_root_links_collections_for_staff() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin", true).await;

    let res = app.get(routes::API_ROOT, Some(&admin.token)).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["users"], app.url(routes::USERS).as_str());
    assert_eq!(res.body["workflows"], app.url(routes::WORKFLOWS).as_str());
}

#[tokio::test]
async fn api_root_is_staff_only() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;

    assert_eq!(app.get(routes::API_ROOT, Some(&alice.token)).await.status, 403);
    assert_eq!(app.get(routes::API_ROOT, None).await.status, 403);
}

#[tokio::test]
async fn retired_api_is_gone() {
    let app = TestApp::spawn().await;

    for (method, path) in [
        (Method::GET, "/api/v1/"),
        (Method::GET, "/api/v1/workflows/"),
        (Method::POST, "/api/v1/workflows/"),
        (Method::DELETE, "/api/v1/users/abc/"),
    ] {
        let res = app.send(app.request(method.clone(), path, None)).await;
        assert_eq!(res.status, 410, "{method} {path}");
        assert_eq!(res.body["code"], "GONE");
    }
}

#[tokio::test]
async fn schema_describes_the_api() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::SCHEMA, None).await;

    assert_eq!(res.status, 200);
    assert!(res.body["openapi"].is_string());
    assert!(res.body["paths"]["/api/v2/workflows/{id}/"].is_object());
    assert!(res.body["paths"]["/api/v2/files/{id}"].is_object());
}

#[tokio::test]
async fn host_header_drives_absolute_links() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("admin", true).await;

    let res = app
        .send(
            app.request(Method::GET, routes::API_ROOT, Some(&admin.token))
                .header("Host", "rehagoal.example.org")
                .header("X-Forwarded-Proto", "https"),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["users"], "https://rehagoal.example.org/api/v2/users/");
}
