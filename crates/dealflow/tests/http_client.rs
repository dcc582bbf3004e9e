mod common;

use common::unused_address;
use dealflow::{
    AnalysisApi, ClientConfig, ErrorKind, HttpAnalysisClient, JobTracker, PollPolicy, RecordStore,
    RunHandle, RunState, StartOptions, StartOutcome,
};
use dealflow_protocol::AnalysisStatus;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: &str, cookie: Option<&str>) -> HttpAnalysisClient {
    HttpAnalysisClient::new(&ClientConfig {
        base_url: Url::parse(base_url).unwrap(),
        timeout: Duration::from_secs(5),
        session_cookie: cookie.map(str::to_string),
    })
    .unwrap()
}

fn json(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.as_bytes().to_vec(), "application/json")
}

async fn mount(server: &MockServer, verb: &str, route: &str, response: ResponseTemplate) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

const STARTUPS_BODY: &str = r#"[
    {
        "name": "Acme Labs",
        "first_interaction_date": "2023-11-02",
        "last_interaction_date": "2024-02-14",
        "total_interactions": 7,
        "company_contact": "jane@acme.io",
        "analysis_date": "2024-03-01T09:30:00"
    },
    {
        "name": "Globex",
        "first_interaction_date": "2024-01-05",
        "last_interaction_date": "2024-01-20",
        "total_interactions": 2,
        "company_contact": null,
        "analysis_date": "Fri, 01 Mar 2024 09:30:00 GMT"
    }
]"#;

#[tokio::test]
async fn test_start_posts_options_with_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start_analysis"))
        .and(header("cookie", "session=abc123"))
        .respond_with(json(202, r#"{"message": "Analysis started"}"#))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), Some("session=abc123"));

    client
        .start(StartOptions {
            full_reanalysis: true,
        })
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["full_reanalysis"], true);
}

#[tokio::test]
async fn test_poll_decodes_progress() {
    let server = MockServer::start().await;
    mount(
        &server,
        "GET",
        "/check_progress",
        json(
            200,
            r#"{"status": "InProgress", "processed_emails": 120, "total_emails": 400,
                "analyzed_companies": 3, "total_companies": null, "current_step": "Classifying"}"#,
        ),
    )
    .await;
    let client = client_for(&server.uri(), None);

    let snapshot = client.poll(&RunHandle::new()).await.unwrap();
    assert_eq!(snapshot.status, AnalysisStatus::InProgress);
    assert_eq!(snapshot.processed_emails, 120);
    assert_eq!(snapshot.total_emails, 400);
    assert_eq!(snapshot.total_companies, 0);
    assert_eq!(snapshot.current_step.as_deref(), Some("Classifying"));
}

#[tokio::test]
async fn test_fetch_records_normalizes_wire_values() {
    let server = MockServer::start().await;
    mount(&server, "GET", "/startups", json(200, STARTUPS_BODY)).await;
    let client = client_for(&server.uri(), None);

    let records = client.fetch_records().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Acme Labs");
    assert_eq!(records[0].analysis_date.to_string(), "2024-03-01");
    assert_eq!(records[1].contact, "");
    assert_eq!(records[1].analysis_date.to_string(), "2024-03-01");
}

#[tokio::test]
async fn test_delete_percent_encodes_name() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/startups/Acme%20Labs%2FEU"))
        .respond_with(json(200, r#"{"message": "Startup deleted successfully"}"#))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), None);

    client.delete_record("Acme Labs/EU").await.unwrap();
}

#[tokio::test]
async fn test_delete_of_dot_names_never_reaches_collection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(json(200, r#"{"message": "Startup deleted successfully"}"#))
        .expect(0)
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), None);

    for name in [".", ".."] {
        let err = client.delete_record(name).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.context.record.as_deref(), Some(name));
    }

    let store = RecordStore::new(&client);
    let err = store.delete("..").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_keeps_encoded_dots_literal() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/startups/%252E%252E"))
        .respond_with(json(200, r#"{"message": "Startup deleted successfully"}"#))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), None);

    client.delete_record("%2E%2E").await.unwrap();
}

#[tokio::test]
async fn test_delete_of_missing_record_is_not_found() {
    let server = MockServer::start().await;
    mount(
        &server,
        "DELETE",
        "/startups/Ghost",
        json(404, r#"{"error": "Startup not found"}"#),
    )
    .await;
    let client = client_for(&server.uri(), None);

    let err = client.delete_record("Ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.context.record.as_deref(), Some("Ghost"));
}

#[tokio::test]
async fn test_server_error_message_comes_from_body() {
    let server = MockServer::start().await;
    mount(
        &server,
        "GET",
        "/startups",
        json(
            500,
            r#"{"error": "Failed to fetch startups", "details": "no such table: company"}"#,
        ),
    )
    .await;
    let client = client_for(&server.uri(), None);

    let err = client.fetch_records().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server { status: 500 });
    assert_eq!(
        err.message,
        "Failed to fetch startups (no such table: company)"
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    mount(
        &server,
        "GET",
        "/check_progress",
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;
    let client = client_for(&server.uri(), None);

    let err = client.check_progress().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = client_for(&unused_address().await, None);

    let err = client.fetch_records().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_session_endpoints() {
    let server = MockServer::start().await;
    mount(&server, "GET", "/check_auth", json(200, r#"{"is_authenticated": false}"#)).await;
    mount(
        &server,
        "GET",
        "/login",
        json(
            200,
            r#"{"authorization_url": "https://accounts.example.com/o/oauth2/auth?state=xyz"}"#,
        ),
    )
    .await;
    mount(
        &server,
        "GET",
        "/last-analysis-date",
        json(200, r#"{"last_analysis_date": "2024-03-01T09:30:00+00:00"}"#),
    )
    .await;
    let client = client_for(&server.uri(), None);

    assert!(!client.check_auth().await.unwrap());
    assert_eq!(
        client.login_url().await.unwrap(),
        "https://accounts.example.com/o/oauth2/auth?state=xyz"
    );
    let last = client.last_analysis_date().await.unwrap().unwrap();
    assert_eq!(last.to_rfc3339(), "2024-03-01T09:30:00+00:00");
}

#[tokio::test]
async fn test_cookies_set_by_server_are_sent_back() {
    let server = MockServer::start().await;
    mount(
        &server,
        "GET",
        "/check_auth",
        json(200, r#"{"is_authenticated": true}"#)
            .insert_header("Set-Cookie", "session=fromserver; Path=/"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/startups"))
        .and(header("cookie", "session=fromserver"))
        .respond_with(json(200, "[]"))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), None);

    assert!(client.check_auth().await.unwrap());
    client.fetch_records().await.unwrap();
}

#[tokio::test]
async fn test_tracker_and_store_over_http() {
    let server = MockServer::start().await;
    mount(
        &server,
        "POST",
        "/start_analysis",
        json(202, r#"{"message": "Analysis started"}"#),
    )
    .await;
    mount(
        &server,
        "GET",
        "/check_progress",
        json(
            200,
            r#"{"status": "Completed", "processed_emails": 40, "total_emails": 40,
                "analyzed_companies": 2, "total_companies": 2, "num_startups": 2}"#,
        ),
    )
    .await;
    mount(&server, "GET", "/startups", json(200, STARTUPS_BODY)).await;
    let client = client_for(&server.uri(), None);
    let policy = PollPolicy {
        interval: Duration::from_millis(10),
        ..PollPolicy::default()
    };

    let mut tracker = JobTracker::new(&client, policy);
    let outcome = tracker.start(StartOptions::default()).await.unwrap();
    assert!(matches!(outcome, StartOutcome::Accepted(_)));
    let run = tracker.run_until_terminal().await.clone();
    assert_eq!(run.state, RunState::Completed);
    assert_eq!(run.result_count, Some(2));

    let store = RecordStore::new(&client);
    store.load().await.unwrap();
    assert_eq!(store.len(), 2);
}
