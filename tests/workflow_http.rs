use mockito::{Matcher, Server};
use serde_json::json;
use trackerkit::api::{TrackerClient, TrackerConfig};
use trackerkit::{markdown_to_doc, Intent, IssueWorkflow, ResponseCache, Settings, SettingsManager};

fn workflow_for(server: &Server, cache_dir: &std::path::Path) -> IssueWorkflow<TrackerClient> {
    let config = TrackerConfig::new(server.url(), "token-123");
    let client = TrackerClient::new(config).expect("client should build");
    IssueWorkflow::new(client, ResponseCache::open(cache_dir))
}

#[tokio::test]
async fn reopen_with_comment_posts_resolved_transition() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let list = server
        .mock("GET", "/rest/api/3/issue/OPS-3/transitions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transitions": [
                    {"id": "11", "name": "Back to To Do"},
                    {"id": "41", "name": "Reopen"},
                    {"name": "broken entry"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let execute = server
        .mock("POST", "/rest/api/3/issue/OPS-3/transitions")
        .match_body(Matcher::Json(json!({
            "transition": {"id": "41"},
            "update": {"comment": [{"add": {"body": markdown_to_doc("Regressed in *2.1*").to_value()}}]}
        })))
        .with_status(204)
        .create_async()
        .await;

    let flow = workflow_for(&server, dir.path());
    let taken = flow
        .transition("OPS-3", &Intent::Reopen, Some("Regressed in *2.1*"))
        .await
        .expect("transition");

    list.assert_async().await;
    execute.assert_async().await;
    assert_eq!(taken.id, "41");
}

#[tokio::test]
async fn queue_listing_is_served_from_cache_on_second_read() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let queues = server
        .mock("GET", "/rest/servicedeskapi/servicedesk/2/queue")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"isLastPage": true, "values": [{"id": 5, "name": "Incidents"}]}).to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let flow = workflow_for(&server, dir.path());
    let first = flow.queues("2").await.expect("first read");
    let second = flow.queues("2").await.expect("second read");

    queues.assert_async().await;
    assert_eq!(first, second);
    assert_eq!(second[0].id.as_deref(), Some("5"));
}

#[tokio::test]
async fn connect_uses_cache_directory_from_settings() {
    let server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = SettingsManager::with_paths(dir.path().join("settings.json"), dir.path().join("default"));
    manager
        .save(&Settings {
            cache_dir: Some(dir.path().join("override")),
            ..Settings::default()
        })
        .unwrap();

    let flow = IssueWorkflow::connect_with(TrackerConfig::new(server.url(), "t"), &manager)
        .expect("connect");

    assert_eq!(flow.cache().dir(), dir.path().join("override"));
    assert!(!dir.path().join("override").exists());
}
