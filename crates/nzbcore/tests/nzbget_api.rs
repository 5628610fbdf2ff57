//! NZBGet adapter tests against a mocked JSON-RPC endpoint.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nzbcore::downloader::{AddNzbOptions, Downloader, NzbgetClient};
use nzbcore::options::DownloaderOptions;
use nzbcore::DownloaderType;

fn client_for(server: &MockServer) -> NzbgetClient {
    let mut options = DownloaderOptions::new(
        "Default",
        DownloaderType::Nzbget,
        format!("{}/jsonrpc", server.uri()),
    );
    options.username = Some("nzbget".to_string());
    options.password = Some("tegbzn6789".to_string());
    NzbgetClient::new(&options).unwrap()
}

async fn mock_rpc(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": result })))
        .mount(server)
        .await;
}

async fn mock_config(server: &MockServer) {
    mock_rpc(
        server,
        "config",
        json!([
            { "Name": "MainDir", "Value": "/downloads" },
            { "Name": "Category1.Name", "Value": "movies" },
            { "Name": "Category1.DestDir", "Value": "" },
            { "Name": "Category2.Name", "Value": "tv" }
        ]),
    )
    .await;
}

#[tokio::test]
async fn test_get_queue_standby_paused() {
    let server = MockServer::start().await;
    mock_config(&server).await;
    mock_rpc(
        &server,
        "status",
        json!({
            "ServerStandBy": true,
            "DownloadPaused": true,
            "DownloadRate": 0,
            "DownloadLimit": 0,
            "RemainingSizeMB": 250.0
        }),
    )
    .await;
    mock_rpc(&server, "listgroups", json!([])).await;

    let queue = client_for(&server).get_queue().await.unwrap();
    assert_eq!(queue.status, "Paused");
    assert_eq!(queue.speed_bytes, 0);
    assert_eq!(queue.time_remaining, "∞");
    assert_eq!(queue.categories, vec!["movies".to_string(), "tv".to_string()]);
}

#[tokio::test]
async fn test_get_queue_downloading_derives_times() {
    let server = MockServer::start().await;
    mock_config(&server).await;
    mock_rpc(
        &server,
        "status",
        json!({
            "ServerStandBy": false,
            "DownloadPaused": false,
            "DownloadRate": 1048576,
            "DownloadLimit": 2097152,
            "RemainingSizeMB": 250.0
        }),
    )
    .await;
    mock_rpc(
        &server,
        "listgroups",
        json!([{
            "NZBID": 42,
            "Status": "DOWNLOADING",
            "NZBName": "ubuntu.iso",
            "Category": "movies",
            "FileSizeMB": 1000.0,
            "RemainingSizeMB": 250.0
        }]),
    )
    .await;

    let queue = client_for(&server).get_queue().await.unwrap();
    assert_eq!(queue.status, "Downloading");
    assert_eq!(queue.speed_bytes, 1048576);
    assert_eq!(queue.max_speed_bytes, 2097152);
    // 250 MB at 1 MB/s
    assert_eq!(queue.time_remaining, "4:10");

    let item = &queue.queue[0];
    assert_eq!(item.id, "42");
    assert_eq!(item.status, "Downloading");
    assert_eq!(item.percentage, 75);
    assert_eq!(item.time_remaining, "4:10");
}

#[tokio::test]
async fn test_get_queue_idle_standby() {
    let server = MockServer::start().await;
    mock_config(&server).await;
    mock_rpc(
        &server,
        "status",
        json!({
            "ServerStandBy": true,
            "DownloadPaused": false,
            "DownloadRate": 0,
            "DownloadLimit": 0,
            "RemainingSizeMB": 0.0
        }),
    )
    .await;
    mock_rpc(&server, "listgroups", json!([])).await;

    let queue = client_for(&server).get_queue().await.unwrap();
    assert_eq!(queue.status, "Idle");
    assert!(queue.queue.is_empty());
}

#[tokio::test]
async fn test_add_url_builds_append_tuple() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({
            "method": "append",
            "params": ["My Download", "http://indexer/get/123.nzb", "movies", 0, false, true]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let options = AddNzbOptions {
        category: Some("movies".to_string()),
        name: Some("My Download".to_string()),
        paused: true,
        extra: Vec::new(),
    };
    let added = client_for(&server)
        .add_url("http://indexer/get/123.nzb", &options)
        .await;

    assert!(added.success);
    assert_eq!(added.result.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_add_file_sends_base64_content() {
    let server = MockServer::start().await;
    let encoded = BASE64.encode(b"<nzb/>");
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({
            "method": "append",
            "params": ["ubuntu.nzb", encoded]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let added = client_for(&server)
        .add_file("ubuntu.nzb", b"<nzb/>".to_vec(), &AddNzbOptions::default())
        .await;

    assert!(added.success);
    assert_eq!(added.result.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_append_rejection_is_failure() {
    let server = MockServer::start().await;
    mock_rpc(&server, "append", json!(0)).await;

    let added = client_for(&server)
        .add_url("http://indexer/get/123.nzb", &AddNzbOptions::default())
        .await;
    assert!(!added.success);
}

#[tokio::test]
async fn test_group_controls_use_editqueue() {
    let server = MockServer::start().await;
    for command in ["GroupDelete", "GroupPause", "GroupResume"] {
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_partial_json(json!({
                "method": "editqueue",
                "params": [command, "", [42]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    assert!(client.remove_id("42").await.success);
    assert!(client.pause_id("42").await.success);
    assert!(client.resume_id("42").await.success);
}

#[tokio::test]
async fn test_non_numeric_id_fails_without_request() {
    let server = MockServer::start().await;
    let result = client_for(&server).remove_id("SABnzbd_nzo_1").await;
    assert!(!result.success);
    // no POST ever reached the server
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_rpc_error_envelope_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": { "name": "JsonRpcError", "code": 1, "message": "Access denied" }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).test().await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Access denied"));
}

#[tokio::test]
async fn test_http_401_reports_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client_for(&server).test().await;
    assert!(!result.success);
    assert!(result.error.unwrap_or_default().contains("authentication"));
}

#[tokio::test]
async fn test_set_max_speed_converts_to_kilobytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({ "method": "rate", "params": [512] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server).set_max_speed(512 * 1024).await;
    assert!(result.success);
}
