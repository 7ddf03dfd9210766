use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use lightcast::{Client, ClientConfig, QuotaWindow, build_query};
use serde_json::{Value, json};
use std::time::{Duration, Instant};

fn mock_auth(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/connect/token")
            .body_contains("grant_type=client_credentials")
            .body_contains("scope=agnitio");
        then.status(200)
            .json_body(json!({"access_token": "tok", "expires_in": 3600, "token_type": "Bearer"}));
    })
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        username: "u".into(),
        password: "p".into(),
        url: server.url("/"),
        auth_url: server.url("/connect/token"),
        verify: true,
    }
}

fn client(server: &MockServer) -> Client {
    Client::with_config(config(server)).unwrap()
}

#[test]
fn token_is_fetched_once_at_construction() {
    let server = MockServer::start();
    let auth = mock_auth(&server);
    let meta = server.mock(|when, then| {
        when.method(GET).path("/meta").header("authorization", "Bearer tok");
        then.status(200).json_body(json!({"datasets": []}));
    });

    let mut c = client(&server);
    let body = c.get_meta().unwrap();
    c.get_meta().unwrap();

    assert_eq!(body, json!({"datasets": []}));
    auth.assert_hits(1);
    meta.assert_hits(2);
}

#[test]
fn refresh_token_requests_a_new_token() {
    let server = MockServer::start();
    let auth = mock_auth(&server);
    let mut c = client(&server);
    c.refresh_token().unwrap();
    auth.assert_hits(2);
}

#[test]
fn rejected_credentials_fail_construction() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/connect/token");
        then.status(400).json_body(json!({"error": "invalid_client"}));
    });

    let err = Client::with_config(config(&server)).unwrap_err().to_string();
    assert!(err.contains("invalid_client"), "{}", err);
    assert!(err.contains("LCAPI_USER"), "{}", err);
}

#[test]
fn every_dispatch_consumes_one_call() {
    let server = MockServer::start();
    mock_auth(&server);
    server.mock(|when, then| {
        when.method(GET).path("/meta/definitions");
        then.status(200).json_body(json!({}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/meta/missing");
        then.status(404).body("not here");
    });

    let mut c = client(&server);
    assert_eq!(c.quota().remaining(), 300);

    c.dispatch("meta/definitions", None, false).unwrap();
    assert_eq!(c.quota().remaining(), 299);

    c.dispatch("meta/missing", None, false).unwrap();
    assert_eq!(c.quota().remaining(), 298);
}

fn mock_meta(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/meta");
        then.status(200).json_body(json!({"datasets": []}));
    })
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let started = Instant::now();
    let out = f();
    (out, started.elapsed())
}

#[test]
fn smart_limit_spaces_calls_by_time_left_over_budget() {
    let server = MockServer::start();
    mock_auth(&server);
    let meta = mock_meta(&server);

    let mut c = client(&server);
    let (_, plain) = timed(|| c.dispatch("meta", None, false).unwrap());
    // A fresh window spreads 300 calls over 300 s: about one second apart.
    let (resp, limited) = timed(|| c.dispatch("meta", None, true).unwrap());

    assert!(resp.is_success());
    assert!(plain < Duration::from_millis(500), "{:?}", plain);
    assert!(limited >= Duration::from_millis(900), "{:?}", limited);
    assert!(limited < Duration::from_secs(5), "{:?}", limited);
    assert_eq!(c.quota().remaining(), 298);
    meta.assert_hits(2);
}

#[test]
fn exhausted_budget_waits_even_without_smart_limit() {
    let server = MockServer::start();
    mock_auth(&server);
    let meta = mock_meta(&server);

    let ends = Instant::now() + Duration::from_secs(1);
    let mut c = client(&server).with_quota(QuotaWindow::resuming(ends, 0));
    let (_, waited) = timed(|| c.dispatch("meta", None, false).unwrap());

    assert!(waited >= Duration::from_millis(700), "{:?}", waited);
    assert!(waited < Duration::from_secs(5), "{:?}", waited);
    assert!(Instant::now() >= ends);
    meta.assert_hits(1);
}

#[test]
fn expired_exhausted_window_resets_before_the_call() {
    let server = MockServer::start();
    mock_auth(&server);
    let meta = mock_meta(&server);

    let expired = QuotaWindow::resuming(Instant::now(), 0);
    let mut c = client(&server).with_quota(expired);
    let (_, waited) = timed(|| c.dispatch("meta", None, false).unwrap());

    // The new window restores the budget, so the wait is one even share.
    assert!(waited >= Duration::from_millis(900), "{:?}", waited);
    assert!(waited < Duration::from_secs(5), "{:?}", waited);
    assert_eq!(c.quota().remaining(), 299);
    meta.assert_hits(1);
}

#[test]
fn debug_output_hides_credentials() {
    let server = MockServer::start();
    mock_auth(&server);
    let c = Client::with_config(ClientConfig {
        password: "hunter2-secret".into(),
        ..config(&server)
    })
    .unwrap();

    let shown = format!("{:?}", c);
    assert!(!shown.contains("hunter2-secret"), "{}", shown);
    assert!(!shown.contains("\"tok\""), "{}", shown);
    assert!(shown.contains("<redacted>"), "{}", shown);
}

#[test]
fn non_200_is_returned_not_raised() {
    let server = MockServer::start();
    mock_auth(&server);
    server.mock(|when, then| {
        when.method(POST).path("/emsi.us.occupation/2025.3");
        then.status(400).body("{\"errors\":[\"bad metric\"]}");
    });

    let mut c = client(&server);
    let payload = json!({"metrics": [{"name": "Nope"}], "constraints": []});
    let resp = c
        .dispatch("emsi.us.occupation/2025.3", Some(&payload), false)
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    assert!(!resp.is_success());
    assert_eq!(resp.text(), "{\"errors\":[\"bad metric\"]}");
    assert_eq!(resp.url(), server.url("/emsi.us.occupation/2025.3"));
    let parsed: Value = resp.json().unwrap();
    assert_eq!(parsed["errors"][0], "bad metric");
}

#[test]
fn json_wrappers_propagate_parse_failures() {
    let server = MockServer::start();
    mock_auth(&server);
    server.mock(|when, then| {
        when.method(GET).path("/meta");
        then.status(502).body("<html>Bad Gateway</html>");
    });

    let mut c = client(&server);
    let err = c.get_meta().unwrap_err().to_string();
    assert!(err.contains("failed to parse API JSON"), "{}", err);
    assert_eq!(c.quota().remaining(), 299);
}

#[test]
fn metadata_paths_follow_the_url_templates() {
    let server = MockServer::start();
    mock_auth(&server);
    let dataset = server.mock(|when, then| {
        when.method(GET).path("/meta/dataset/emsi.us.occupation/2025.3");
        then.status(200).json_body(json!({"dimensions": []}));
    });
    let dimension = server.mock(|when, then| {
        when.method(GET)
            .path("/meta/dataset/emsi.us.occupation/2025.3/Occupation");
        then.status(200).json_body(json!({"hierarchy": []}));
    });

    let mut c = client(&server);
    c.get_meta_dataset("emsi.us.occupation", "2025.3").unwrap();
    c.get_meta_dataset_dimension("emsi.us.occupation", "Occupation", "2025.3")
        .unwrap();

    dataset.assert();
    dimension.assert();
}

#[test]
fn query_results_become_a_table() {
    let server = MockServer::start();
    mock_auth(&server);
    let query = build_query(&["Jobs.2022", "Area"], vec![]);
    let m = server.mock(|when, then| {
        when.method(POST)
            .path("/emsi.us.occupation/2025.3")
            .json_body(query.clone());
        then.status(200).json_body(json!({
            "data": [
                {"name": "Jobs.2022", "rows": [1, 2, 3]},
                {"name": "Area", "rows": ["a", "b", "c"]}
            ]
        }));
    });

    let mut c = client(&server);
    let table = c
        .post_retrieve_table("emsi.us.occupation", &query, "2025.3")
        .unwrap();

    m.assert();
    assert_eq!(table.column_names(), vec!["Jobs.2022", "Area"]);
    assert_eq!(table.len(), 3);
    assert_eq!(table.row(0).unwrap(), vec![&json!(1), &json!("a")]);
}

#[test]
fn hierarchy_becomes_a_table() {
    let server = MockServer::start();
    mock_auth(&server);
    server.mock(|when, then| {
        when.method(GET)
            .path("/meta/dataset/emsi.us.occupation/2025.3/Occupation");
        then.status(200).json_body(json!({"hierarchy": [
            {"id": "00-0000", "name": "All Occupations", "level": 0},
            {"id": "11-0000", "name": "Management Occupations", "level": 1}
        ]}));
    });

    let mut c = client(&server);
    let table = c
        .get_dimension_hierarchy_table("emsi.us.occupation", "Occupation", "2025.3")
        .unwrap();

    assert_eq!(table.column_names(), vec!["id", "name", "level"]);
    assert_eq!(
        table.to_csv_string().unwrap(),
        "id,name,level\n00-0000,All Occupations,0\n11-0000,Management Occupations,1\n"
    );
}

#[test]
fn missing_hierarchy_key_is_an_error() {
    let server = MockServer::start();
    mock_auth(&server);
    server.mock(|when, then| {
        when.method(GET).path("/meta/dataset/d/r/X");
        then.status(200).json_body(json!({"message": "unknown dimension"}));
    });

    let mut c = client(&server);
    let err = c.get_dimension_hierarchy_table("d", "X", "r").unwrap_err();
    assert!(err.to_string().contains("hierarchy"));
}
