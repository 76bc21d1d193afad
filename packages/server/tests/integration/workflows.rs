use reqwest::Method;
use serde_json::json;

use crate::common::{TestApp, TestOptions, routes};

const CONTENT: &[u8] = br#"{"workflows":[{"name":"Morning routine"}]}"#;

mod create {
    use super::*;

    #[tokio::test]
    async fn upload_creates_a_workflow_owned_by_the_caller() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;

        let res = app
            .upload(Method::POST, routes::WORKFLOWS, CONTENT.to_vec(), Some(&alice.token))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        let blob_id = res.blob_id();
        assert_eq!(id.len(), 12);
        assert_eq!(blob_id.len(), 12);
        assert_ne!(id, blob_id);
        assert_eq!(
            res.body["owner"],
            app.url(&routes::user(&alice.profile_id)).as_str()
        );
        assert_eq!(res.body["content"], app.url(&routes::file(&blob_id)).as_str());

        let file = app.get(&routes::file(&blob_id), Some(&alice.token)).await;
        assert_eq!(file.status, 200);
        assert_eq!(file.bytes, CONTENT);
    }

    #[tokio::test]
    async fn client_supplied_id_and_owner_are_ignored() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let bob = app.create_user("bob", false).await;

        let part = reqwest::multipart::Part::bytes(CONTENT.to_vec()).file_name("w.json");
        let form = reqwest::multipart::Form::new()
            .text("id", "AAAAAAAAAAAA")
            .text("owner", app.url(&routes::user(&bob.profile_id)))
            .part("content", part);
        let res = app
            .send(
                app.request(Method::POST, routes::WORKFLOWS, Some(&alice.token))
                    .multipart(form),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_ne!(res.id(), "AAAAAAAAAAAA");
        assert_eq!(
            res.body["owner"],
            app.url(&routes::user(&alice.profile_id)).as_str()
        );
    }

    #[tokio::test]
    async fn missing_content_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;

        let form = reqwest::multipart::Form::new().text("owner", "whatever");
        let res = app
            .send(
                app.request(Method::POST, routes::WORKFLOWS, Some(&alice.token))
                    .multipart(form),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["fields"]["content"][0], "No file was submitted.");
    }

    #[tokio::test]
    async fn json_body_is_not_an_upload() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;

        let res = app
            .post_json(routes::WORKFLOWS, &json!({"content": "x"}), Some(&alice.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["fields"]["content"][0], "No file was submitted.");
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;

        let res = app
            .upload(Method::POST, routes::WORKFLOWS, Vec::new(), Some(&alice.token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn anonymous_upload_is_forbidden() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(Method::POST, routes::WORKFLOWS, CONTENT.to_vec(), None)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(app.blob_count(), 0);
    }
}

mod size_limit {
    use super::*;

    const LIMIT: u64 = 64;

    async fn app() -> TestApp {
        TestApp::spawn_with(TestOptions {
            max_content_size: LIMIT,
            ..Default::default()
        })
        .await
    }

    #[tokio::test]
    async fn content_of_exactly_the_limit_is_accepted() {
        let app = app().await;
        let alice = app.create_user("alice", false).await;
        let bytes = vec![b'a'; LIMIT as usize];

        let res = app
            .upload(Method::POST, routes::WORKFLOWS, bytes.clone(), Some(&alice.token))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let file = app
            .get(&routes::file(&res.blob_id()), Some(&alice.token))
            .await;
        assert_eq!(file.bytes, bytes);
    }

    #[tokio::test]
    async fn one_byte_over_the_limit_persists_nothing() {
        let app = app().await;
        let alice = app.create_user("alice", false).await;

        let res = app
            .upload(
                Method::POST,
                routes::WORKFLOWS,
                vec![b'a'; LIMIT as usize + 1],
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(
            res.body["fields"]["content"][0],
            "Invalid file size. The file may not be larger than 64 bytes. Actual file size was 65 bytes"
        );
        assert_eq!(app.blob_count(), 0);
        let list = app.get(routes::WORKFLOWS, Some(&alice.token)).await;
        assert_eq!(list.body["count"], 0);
    }

    #[tokio::test]
    async fn oversized_replacement_keeps_the_old_content() {
        let app = app().await;
        let alice = app.create_user("alice", false).await;
        let (id, blob_id) = app.create_workflow(&alice, b"small").await;

        let res = app
            .upload(
                Method::PUT,
                &routes::workflow(&id),
                vec![b'a'; LIMIT as usize + 1],
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 400);
        let current = app.get(&routes::workflow(&id), Some(&alice.token)).await;
        assert_eq!(current.blob_id(), blob_id);
        assert_eq!(app.blob_count(), 1);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn regular_principals_see_only_their_own() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let bob = app.create_user("bob", false).await;
        let (mine, _) = app.create_workflow(&alice, CONTENT).await;
        app.create_workflow(&bob, CONTENT).await;

        let res = app.get(routes::WORKFLOWS, Some(&alice.token)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["results"][0]["id"], mine.as_str());
    }

    #[tokio::test]
    async fn staff_see_everything_in_id_order() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin", true).await;
        let alice = app.create_user("alice", false).await;
        let bob = app.create_user("bob", false).await;
        let mut ids = vec![
            app.create_workflow(&alice, CONTENT).await.0,
            app.create_workflow(&bob, CONTENT).await.0,
            app.create_workflow(&bob, CONTENT).await.0,
        ];
        ids.sort();

        let res = app.get(routes::WORKFLOWS, Some(&admin.token)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 3);
        let listed: Vec<&str> = res.body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["id"].as_str().unwrap())
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn options_advertises_upload() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;

        let res = app
            .send(app.request(Method::OPTIONS, routes::WORKFLOWS, Some(&alice.token)))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("allow"), Some("GET, POST, HEAD, OPTIONS"));
    }

    #[tokio::test]
    async fn anonymous_options_is_forbidden() {
        let app = TestApp::spawn().await;

        let res = app
            .send(app.request(Method::OPTIONS, routes::WORKFLOWS, None))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "NOT_AUTHENTICATED");
        assert!(res.header("allow").is_none());
    }
}

mod retrieve {
    use super::*;

    #[tokio::test]
    async fn any_principal_may_retrieve_any_workflow() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let bob = app.create_user("bob", false).await;
        let (id, blob_id) = app.create_workflow(&alice, CONTENT).await;

        let res = app.get(&routes::workflow(&id), Some(&bob.token)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.id(), id);
        assert_eq!(res.blob_id(), blob_id);
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;

        let res = app
            .get(&routes::workflow("AAAAAAAAAAAA"), Some(&alice.token))
            .await;

        assert_eq!(res.status, 404);
    }
}

mod ownership {
    use super::*;

    #[tokio::test]
    async fn non_owner_mutations_look_like_missing_workflows() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let mallory = app.create_user("mallory", false).await;
        let (id, blob_id) = app.create_workflow(&alice, CONTENT).await;
        let path = routes::workflow(&id);

        for method in [Method::PUT, Method::PATCH] {
            let res = app
                .upload(method.clone(), &path, b"evil".to_vec(), Some(&mallory.token))
                .await;
            assert_eq!(res.status, 404, "{method}: {}", res.text);
        }
        let res = app.delete(&path, Some(&mallory.token)).await;
        assert_eq!(res.status, 404);

        let current = app.get(&path, Some(&alice.token)).await;
        assert_eq!(current.status, 200);
        assert_eq!(current.blob_id(), blob_id);
        let file = app.get(&routes::file(&blob_id), Some(&alice.token)).await;
        assert_eq!(file.bytes, CONTENT);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn staff_may_not_modify_workflows_they_do_not_own() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin", true).await;
        let alice = app.create_user("alice", false).await;
        let (id, _) = app.create_workflow(&alice, CONTENT).await;
        let path = routes::workflow(&id);

        let res = app.delete(&path, Some(&admin.token)).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app
            .upload(Method::PUT, &path, b"x".to_vec(), Some(&admin.token))
            .await;
        assert_eq!(res.status, 403);

        assert_eq!(app.get(&path, Some(&alice.token)).await.status, 200);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn staff_may_modify_their_own_workflows() {
        let app = TestApp::spawn().await;
        let admin = app.create_user("admin", true).await;
        let (id, _) = app.create_workflow(&admin, CONTENT).await;

        let res = app.delete(&routes::workflow(&id), Some(&admin.token)).await;

        assert_eq!(res.status, 204);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn put_replaces_content_and_removes_the_old_blob() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, old_blob) = app.create_workflow(&alice, b"version one").await;

        let res = app
            .upload(
                Method::PUT,
                &routes::workflow(&id),
                b"version two".to_vec(),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.id(), id);
        let new_blob = res.blob_id();
        assert_ne!(new_blob, old_blob);
        assert_eq!(app.blob_count(), 1);

        let old = app.get(&routes::file(&old_blob), Some(&alice.token)).await;
        assert_eq!(old.status, 404);
        let new = app.get(&routes::file(&new_blob), Some(&alice.token)).await;
        assert_eq!(new.bytes, b"version two");
    }

    #[tokio::test]
    async fn put_without_content_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, blob_id) = app.create_workflow(&alice, CONTENT).await;

        let form = reqwest::multipart::Form::new().text("owner", "ignored");
        let res = app
            .send(
                app.request(Method::PUT, &routes::workflow(&id), Some(&alice.token))
                    .multipart(form),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["fields"]["content"][0], "No file was submitted.");
        let current = app.get(&routes::workflow(&id), Some(&alice.token)).await;
        assert_eq!(current.blob_id(), blob_id);
    }

    #[tokio::test]
    async fn patch_without_content_keeps_the_blob() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, blob_id) = app.create_workflow(&alice, CONTENT).await;

        let form = reqwest::multipart::Form::new().text("owner", "ignored");
        let res = app
            .send(
                app.request(Method::PATCH, &routes::workflow(&id), Some(&alice.token))
                    .multipart(form),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.blob_id(), blob_id);
        let file = app.get(&routes::file(&blob_id), Some(&alice.token)).await;
        assert_eq!(file.bytes, CONTENT);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn patch_with_content_replaces_it() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, old_blob) = app.create_workflow(&alice, CONTENT).await;

        let res = app
            .upload(
                Method::PATCH,
                &routes::workflow(&id),
                b"patched".to_vec(),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_ne!(res.blob_id(), old_blob);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn options_lists_detail_methods() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, _) = app.create_workflow(&alice, CONTENT).await;

        let res = app
            .send(app.request(Method::OPTIONS, &routes::workflow(&id), Some(&alice.token)))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(
            res.header("allow"),
            Some("GET, PUT, PATCH, DELETE, HEAD, OPTIONS")
        );
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_record_and_blob() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, blob_id) = app.create_workflow(&alice, CONTENT).await;

        let res = app.delete(&routes::workflow(&id), Some(&alice.token)).await;
        assert_eq!(res.status, 204);

        assert_eq!(
            app.get(&routes::workflow(&id), Some(&alice.token)).await.status,
            404
        );
        assert_eq!(
            app.get(&routes::file(&blob_id), Some(&alice.token)).await.status,
            404
        );
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn anonymous_delete_is_forbidden() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", false).await;
        let (id, _) = app.create_workflow(&alice, CONTENT).await;

        let res = app.delete(&routes::workflow(&id), None).await;

        assert_eq!(res.status, 403);
        assert_eq!(app.blob_count(), 1);
    }
}
