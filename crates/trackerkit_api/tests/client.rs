use mockito::{Matcher, Server};
use serde_json::json;
use trackerkit_api::{TrackerClient, TrackerConfig, TrackerError};

fn client_for(server: &Server) -> TrackerClient {
    let config = TrackerConfig::new(server.url(), "token-123");
    TrackerClient::new(config).expect("client should build")
}

#[tokio::test]
async fn get_transitions_unwraps_envelope() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/api/3/issue/OPS-7/transitions")
        .match_header("authorization", "Bearer token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transitions": [
                    {"id": "11", "name": "To Do", "to": {"id": "1", "name": "To Do"}},
                    {"id": 31, "name": "Done"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let transitions = client.get_transitions("OPS-7").await.expect("transitions");

    mock.assert_async().await;
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[0].id.as_deref(), Some("11"));
    assert_eq!(transitions[0].destination_name().as_deref(), Some("To Do"));
    assert_eq!(transitions[1].id.as_deref(), Some("31"));
    assert_eq!(transitions[1].display_name().as_deref(), Some("Done"));
}

#[tokio::test]
async fn execute_transition_sends_comment_update() {
    let mut server = Server::new_async().await;
    let body = json!({"type": "doc", "version": 1, "content": []});
    let mock = server
        .mock("POST", "/rest/api/3/issue/OPS-7/transitions")
        .match_body(Matcher::Json(json!({
            "transition": {"id": "21"},
            "update": {"comment": [{"add": {"body": body.clone()}}]}
        })))
        .with_status(204)
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .execute_transition("OPS-7", "21", Some(&body))
        .await
        .expect("transition executes");

    mock.assert_async().await;
}

#[tokio::test]
async fn update_description_puts_fields() {
    let mut server = Server::new_async().await;
    let doc = json!({"type": "doc", "version": 1, "content": [{"type": "paragraph", "content": []}]});
    let mock = server
        .mock("PUT", "/rest/api/3/issue/OPS-9")
        .match_body(Matcher::Json(json!({"fields": {"description": doc.clone()}})))
        .with_status(204)
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .update_description("OPS-9", &doc)
        .await
        .expect("description updates");

    mock.assert_async().await;
}

#[tokio::test]
async fn get_queues_follows_pages() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/rest/servicedeskapi/servicedesk/4/queue")
        .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "size": 1, "start": 0, "limit": 1, "isLastPage": false,
                "values": [{"id": "10", "name": "Open", "jql": "status = Open"}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", "/rest/servicedeskapi/servicedesk/4/queue")
        .match_query(Matcher::UrlEncoded("start".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "size": 1, "start": 1, "limit": 1, "isLastPage": true,
                "values": [{"id": 11, "name": "Escalated", "issueCount": 3}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let queues = client.get_queues("4").await.expect("queues");

    first.assert_async().await;
    second.assert_async().await;
    let names: Vec<&str> = queues.iter().map(|queue| queue.name.as_str()).collect();
    assert_eq!(names, vec!["Open", "Escalated"]);
    assert_eq!(queues[1].id.as_deref(), Some("11"));
    assert_eq!(queues[1].issue_count, Some(3));
}

#[tokio::test]
async fn not_found_maps_to_typed_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/3/issue/NOPE-1/comment")
        .with_status(404)
        .with_body(r#"{"errorMessages":["Issue does not exist or you do not have permission to see it."]}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get_comments("NOPE-1").await.unwrap_err();

    match err {
        TrackerError::NotFound(message) => assert!(message.contains("Issue does not exist")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn validation_errors_keep_messages() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/rest/api/3/issue/OPS-1/comment")
        .with_status(400)
        .with_body(r#"{"errorMessages":[],"errors":{"comment":"Comment body can not be empty!"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .add_comment("OPS-1", &json!({"type": "doc", "version": 1, "content": []}))
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|status| status.as_u16()), Some(400));
    match err {
        TrackerError::Http { messages, .. } => {
            assert_eq!(messages, vec!["comment: Comment body can not be empty!".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
