use serde::Deserialize;
use tracely_common_http::{
    headers, parse_json, HttpClient, HttpConfig, HttpError, Method, RequestBuilder,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Apps {
    apps: Vec<serde_json::Value>,
}

#[tokio::test]
async fn test_get_sends_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/apps"))
        .and(header("authorization", "Bearer t1"))
        .and(query_param("appID", "a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"apps": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = RequestBuilder::new()
        .base_url(server.uri())
        .bearer_auth("t1")
        .query("appID", "a1");

    let response = client.send(Method::GET, "/api/apps", &request).await.unwrap();
    let response = HttpClient::check_response(response).await.unwrap();
    let apps: Apps = parse_json(response).await.unwrap();
    assert!(apps.apps.is_empty());
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/report/active"))
        .and(header(headers::X_APP_ID, "a1"))
        .and(body_json(serde_json::json!({"page": "/a", "duration": 5})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = RequestBuilder::new()
        .base_url(server.uri())
        .json_content()
        .header(headers::X_APP_ID, "a1");

    let response = client
        .send_json(
            Method::POST,
            "/report/active",
            &request,
            &serde_json::json!({"page": "/a", "duration": 5}),
        )
        .await
        .unwrap();
    assert!(HttpClient::check_response(response).await.is_ok());
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(path("/unauthorized"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = RequestBuilder::new().base_url(server.uri());

    let response = client.send(Method::GET, "/unauthorized", &request).await.unwrap();
    assert!(matches!(
        HttpClient::check_response(response).await,
        Err(HttpError::Unauthorized)
    ));

    let response = client.send(Method::GET, "/broken", &request).await.unwrap();
    match HttpClient::check_response(response).await {
        Err(HttpError::ServerError { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected server error, got {:?}", other),
    }

    let response = client.send(Method::GET, "/missing", &request).await.unwrap();
    assert!(matches!(
        HttpClient::check_response(response).await,
        Err(HttpError::ClientError { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client =
        HttpClient::with_config(HttpConfig::with_timeout(std::time::Duration::from_millis(50)))
            .unwrap();
    let request = RequestBuilder::new().base_url(server.uri());

    let result = client.send(Method::GET, "/slow", &request).await;
    assert!(matches!(result, Err(HttpError::Timeout)));
}
