//! Integration tests for request assembly and response capture.

use std::time::Duration;

use ouroboros_req::{
    body_json, ingredients, Cookie, DumpFormat, ErrorCategory, Header, Host, HttpClient,
    HttpClientConfig, Ingredient, Method, Param, QueryParam, ReqError,
};
use serde::Deserialize;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    HttpClient::new(HttpClientConfig::new().timeout(Duration::from_secs(5)))
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_get_sends_form_and_query_params_in_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("a", "1"))
        .and(query_param("b", "2"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"hits": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/search", server.uri());
    let req = client()
        .get(
            &url,
            ingredients![
                QueryParam::from([("q", "rust")]),
                Param::from([("b", "2"), ("a", "1")]),
            ],
        )
        .await
        .expect("Request failed");

    assert_eq!(req.request().url_str(), format!("{}?a=1&b=2&q=rust", url));
    assert!(req.request().body().is_none());
    assert!(req.response().unwrap().is_success());
    assert!(req.is_buffered());

    #[derive(Deserialize)]
    struct Hits {
        hits: u32,
    }
    let hits: Hits = req.to_json().expect("Failed to decode JSON");
    assert_eq!(hits.hits, 3);
}

#[tokio::test]
async fn test_post_sends_form_params_in_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header(
            "content-type",
            "application/x-www-form-urlencoded; charset=UTF-8",
        ))
        .and(body_string("a=1&b=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/login", server.uri());
    let req = client()
        .post(&url, ingredients![Param::from([("a", "1"), ("b", "2")])])
        .await
        .expect("Request failed");

    assert_eq!(req.request().url_str(), url);
    assert_eq!(req.text(), "ok");
    assert_eq!(req.request_body().unwrap().as_ref(), b"a=1&b=2");
    assert_eq!(format!("{}", req), format!("POST {} a=1&b=2 ok", url));
}

#[tokio::test]
async fn test_body_with_form_params_is_rejected_without_io() {
    let server = MockServer::start().await;

    let err = client()
        .post(
            &format!("{}/submit", server.uri()),
            ingredients!["raw payload", Param::from([("a", "1")])],
        )
        .await
        .unwrap_err();

    assert!(matches!(err.error(), ReqError::ConflictingBody { .. }));
    assert!(err.req().is_none());
    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_error_ingredient_aborts_before_io() {
    let server = MockServer::start().await;

    #[derive(serde::Serialize)]
    struct Unencodable {
        map: std::collections::HashMap<Vec<u8>, u8>,
    }
    let mut map = std::collections::HashMap::new();
    map.insert(vec![1u8], 1u8);

    let err = client()
        .post(&server.uri(), ingredients![body_json(&Unencodable { map })])
        .await
        .unwrap_err();
    assert!(matches!(err.error(), ReqError::Serialization(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_body_sets_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/items/7"))
        .and(header("content-type", "application/json; charset=UTF-8"))
        .and(body_string(r#"{"name":"widget"}"#))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let req = client()
        .put(
            &format!("{}/items/7", server.uri()),
            ingredients![body_json(&serde_json::json!({"name": "widget"}))],
        )
        .await
        .expect("Request failed");
    assert_eq!(req.response().unwrap().status_code(), 204);
    assert!(req.bytes().is_empty());
}

#[tokio::test]
async fn test_binary_response_is_left_unread_and_downloadable() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/archive.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(payload.clone(), "application/octet-stream"))
        .mount(&server)
        .await;

    let mut req = client()
        .get(&format!("{}/archive.bin", server.uri()), Vec::new())
        .await
        .expect("Request failed");
    assert!(!req.is_buffered());
    assert!(req.bytes().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("archive.bin");
    let written = req.to_file(&target).await.expect("Download failed");
    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), payload);

    // The stream is consumed by the download
    assert!(matches!(req.to_file(&target).await, Err(ReqError::NoResponse)));
}

#[tokio::test]
async fn test_unread_response_can_be_buffered_later() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"\x00\x01\x02".to_vec(), "image/png"))
        .mount(&server)
        .await;

    let mut req = client().get(&server.uri(), Vec::new()).await.unwrap();
    assert!(!req.is_buffered());
    let data = req.buffer().await.unwrap().clone();
    assert_eq!(data.as_ref(), b"\x00\x01\x02");
    assert_eq!(req.bytes(), b"\x00\x01\x02");
}

#[tokio::test]
async fn test_buffered_text_response_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("line one\nline two"))
        .mount(&server)
        .await;

    let mut req = client().get(&server.uri(), Vec::new()).await.unwrap();
    assert!(req.is_buffered());

    let file = tempfile::NamedTempFile::new().unwrap();
    req.to_file(file.path()).await.unwrap();
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "line one\nline two");
    // Buffered bodies survive the write
    assert_eq!(req.text(), "line one\nline two");
}

#[tokio::test]
async fn test_xml_response_decodes() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<user><name>Ann</name><age>30</age></user>", "application/xml"),
        )
        .mount(&server)
        .await;

    #[derive(Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    let req = client()
        .get(&format!("{}/user", server.uri()), Vec::new())
        .await
        .expect("Request failed");
    let user: User = req.to_xml()?;
    assert_eq!(user.name, "Ann");
    assert_eq!(user.age, 30);
    assert!(req.to_json::<serde_json::Value>().is_err());
    Ok(())
}

#[tokio::test]
async fn test_cookies_host_and_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("cookie", "session=abc; lang=en"))
        .and(header("x-trace", "t-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let req = client()
        .get(
            &server.uri(),
            ingredients![
                Header::from([("X-Trace", "t-1")]),
                Cookie::new("session", "abc"),
                Cookie::new("lang", "en"),
                Host::from("api.internal"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(req.request().header("host"), Some("api.internal"));

    let received = server.received_requests().await.unwrap();
    assert_eq!(
        received[0].headers.get("host").and_then(|v| v.to_str().ok()),
        Some("api.internal")
    );
}

#[tokio::test]
async fn test_transport_override_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-via", "custom-transport"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut defaults = http::HeaderMap::new();
    defaults.insert("x-via", http::HeaderValue::from_static("custom-transport"));
    let transport = reqwest::Client::builder()
        .default_headers(defaults)
        .build()
        .unwrap();

    let req = client()
        .get(&server.uri(), ingredients![transport])
        .await
        .unwrap();
    assert!(req.transport().is_some());
    assert!(req.response().unwrap().is_success());
}

#[tokio::test]
async fn test_transport_failure_keeps_the_wrapper() {
    let client = HttpClient::new(HttpClientConfig::new().connect_timeout(Duration::from_secs(2)))
        .unwrap();
    // Nothing listens on the discard port
    let err = client
        .post("http://127.0.0.1:9/ingest", ingredients!["payload"])
        .await
        .unwrap_err();

    assert!(matches!(err.error(), ReqError::Transport(_)));
    let req = err.req().expect("wrapper should be attached");
    assert_eq!(req.request().url_str(), "http://127.0.0.1:9/ingest");
    assert_eq!(req.request_body().unwrap().as_ref(), b"payload");
    assert!(req.response().is_none());
}

#[tokio::test]
async fn test_timeout_is_categorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig::new().timeout(Duration::from_millis(100)))
        .unwrap();
    let err = client.get(&server.uri(), Vec::new()).await.unwrap_err();
    assert_eq!(err.error().category(), ErrorCategory::Timeout);
    assert!(err.req().unwrap().cost() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_prepare_is_repeatable() {
    let client = client();
    let build = || -> Vec<Ingredient> {
        ingredients![
            Header::from([("Accept", "application/json")]),
            Param::from([("b", "2"), ("a", "1")]),
            QueryParam::from([("v", "1")]),
        ]
    };

    let first = client
        .prepare(Method::POST, "http://example.com/api", build())
        .await
        .unwrap();
    let second = client
        .prepare(Method::POST, "http://example.com/api", build())
        .await
        .unwrap();

    assert_eq!(first.request().url_str(), second.request().url_str());
    assert_eq!(first.request().headers(), second.request().headers());
    assert_eq!(first.request().body(), second.request().body());
    assert_eq!(first.request_body(), second.request_body());
}

#[tokio::test]
async fn test_dump_formats() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created\nid=9"))
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig::new().debug(true)).unwrap();
    let req = client
        .post(&server.uri(), ingredients!["name=x"])
        .await
        .unwrap();

    let pretty = format!("{:+}", req);
    assert_eq!(pretty, req.dump());
    assert!(pretty.starts_with(&format!("POST {}", server.uri())));
    assert!(pretty.contains("HTTP/1.1 201 Created"));
    assert!(pretty.ends_with("\n\ncreated\nid=9"));

    assert_eq!(
        format!("{:-}", req),
        format!("POST {} name=x created id=9", server.uri())
    );
    assert_eq!(
        format!("{}", req),
        format!("POST {}\nname=x\ncreated\nid=9", server.uri())
    );
    assert_eq!(req.render(DumpFormat::Auto), format!("{}", req));
}

#[tokio::test]
async fn test_show_cost_in_dump() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig::new().show_cost(true)).unwrap();
    let req = client.get(&server.uri(), Vec::new()).await.unwrap();
    assert_eq!(format!("{}", req), format!("GET {} {:?}", server.uri(), req.cost()));
}

#[tokio::test]
async fn test_shared_client_helpers() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("gone"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(204).insert_header("allow", "GET, DELETE"))
        .expect(1)
        .mount(&server)
        .await;

    let req = ouroboros_req::delete(&format!("{}/items/1", server.uri()), Vec::new())
        .await
        .unwrap();
    assert_eq!(req.text(), "gone");

    let req = ouroboros_req::options(&server.uri(), Vec::new()).await.unwrap();
    assert_eq!(req.response().unwrap().header("allow"), Some("GET, DELETE"));
}

#[tokio::test]
async fn test_truncated_textual_body_keeps_the_wrapper() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"partial\"",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let err = client()
        .get(&format!("http://{}/report", addr), Vec::new())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(err.error(), ReqError::ResponseRead(_)));
    let req = err.req().expect("wrapper should be attached");
    let head = req.response().expect("response head should be kept");
    assert_eq!(head.status_code(), 200);
    assert!(head.is_json());
    assert!(!req.is_buffered());
}
