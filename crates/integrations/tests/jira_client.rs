//! Jira REST client against a mock Jira.

use integrations::{IssueTracker, JiraClient, NewIssue};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> JiraClient {
    JiraClient::new(&format!("{}/", server.uri()), "bot@example.com", "token").unwrap()
}

#[tokio::test]
async fn test_get_issue_description() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/OPS-1"))
        .and(query_param("fields", "description"))
        .and(basic_auth("bot@example.com", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "OPS-1",
            "fields": {"description": "Set up CI for r1"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/OPS-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "OPS-2",
            "fields": {"description": null}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(
        client.get_issue_description("OPS-1").await.unwrap().as_deref(),
        Some("Set up CI for r1")
    );
    assert_eq!(client.get_issue_description("OPS-2").await.unwrap(), None);
}

#[tokio::test]
async fn test_add_comment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/OPS-1/comment"))
        .and(body_json(json!({"body": "Processed 1 tasks"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "10000"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .await
        .add_comment("OPS-1", "Processed 1 tasks")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transition_matches_name_case_insensitively() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/OPS-1/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transitions": [
                {"id": "11", "name": "In Progress"},
                {"id": "31", "name": "Done"},
                {"id": "41", "name": "Failed"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/OPS-1/transitions"))
        .and(body_json(json!({"transition": {"id": "31"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.transition_issue("OPS-1", "done").await.unwrap());
}

#[tokio::test]
async fn test_missing_transition_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/OPS-1/transitions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"transitions": [{"id": "11", "name": "In Progress"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/OPS-1/transitions"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(!client.transition_issue("OPS-1", "Failed").await.unwrap());
}

#[tokio::test]
async fn test_create_issue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .and(body_json(json!({
            "fields": {
                "project": {"key": "CUSTOMER_PORTAL"},
                "summary": "Deploy the portal",
                "description": "Deploy the portal\nto staging",
                "issuetype": {"name": "Task"},
                "labels": ["devops"]
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "10042",
            "key": "CUSTOMER_PORTAL-7",
            "self": "https://example.atlassian.net/rest/api/2/issue/10042"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let key = client_for(&server)
        .await
        .create_issue(&NewIssue::devops_task(
            "CUSTOMER_PORTAL",
            "Deploy the portal\nto staging",
        ))
        .await
        .unwrap();
    assert_eq!(key, "CUSTOMER_PORTAL-7");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .add_comment("OPS-1", "hello")
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("403"), "{message}");
    assert!(message.contains("forbidden"), "{message}");
}
