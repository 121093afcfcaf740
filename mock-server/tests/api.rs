use axum::http::{self, Request, StatusCode};
use axum::response::Response;
use axum::routing::RouterIntoService;
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

type App = RouterIntoService<String>;

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Token {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn empty_request(method: &str, uri: &str, token: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Token {token}"))
        .body(String::new())
        .unwrap()
}

async fn call(app: &mut App, request: Request<String>) -> Response {
    ServiceExt::ready(app).await.unwrap().call(request).await.unwrap()
}

async fn login(app: &mut App) -> String {
    let resp = call(
        app,
        json_request("POST", "/api/token-auth/", None, r#"{"username":"root","password":"PRODEX"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    body["token"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn token_auth_rejects_bad_password() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/token-auth/",
            None,
            r#"{"username":"root","password":"nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn list_requires_token() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/projects/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- routing ---

#[tokio::test]
async fn unknown_endpoint_returns_404() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let resp = call(&mut app, empty_request("GET", "/api/cameras/", &token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_lookup_returns_400() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let resp = call(&mut app, empty_request("GET", "/api/shots/?id__year__gte=2020", &token)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- schema ---

#[tokio::test]
async fn schema_routes() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let resp = call(&mut app, empty_request("GET", "/api/shots/fields/", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fields: Vec<String> = body_json(resp).await;
    assert!(fields.contains(&"assets".to_string()));

    let resp = call(&mut app, empty_request("OPTIONS", "/api/shots/", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let meta: Value = body_json(resp).await;
    assert_eq!(meta["actions"]["POST"]["id"]["read_only"], true);
}

// --- multipart ---

#[tokio::test]
async fn create_accepts_multipart_thumbnail() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let body = concat!(
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
        "sh010\r\n",
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"assets\"\r\n\r\n",
        "4\r\n",
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"thumbnail\"; filename=\"sh010.png\"\r\n",
        "Content-Type: image/png\r\n\r\n",
        "PNG\r\n",
        "--XYZ--\r\n",
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/shots/")
        .header(http::header::AUTHORIZATION, format!("Token {token}"))
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
        .body(body.to_string())
        .unwrap();
    let resp = call(&mut app, request).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let shot: Value = body_json(resp).await;
    assert_eq!(shot["name"], "sh010");
    assert_eq!(shot["assets"], json!([4]));
    assert_eq!(shot["thumbnail"], "/media/thumbnails/sh010.png");
}

#[tokio::test]
async fn create_rejects_file_then_value_in_list_field() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let body = concat!(
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"assets\"; filename=\"a.png\"\r\n",
        "Content-Type: image/png\r\n\r\n",
        "PNG\r\n",
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"assets\"\r\n\r\n",
        "4\r\n",
        "--XYZ--\r\n",
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/shots/")
        .header(http::header::AUTHORIZATION, format!("Token {token}"))
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
        .body(body.to_string())
        .unwrap();
    let resp = call(&mut app, request).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = body_json(resp).await;
    assert!(error["detail"].as_str().unwrap().contains("assets"));
}

// --- full lifecycle ---

#[tokio::test]
async fn trash_lifecycle() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    // create
    let resp = call(
        &mut app,
        json_request("POST", "/api/projects/", Some(&token), r#"{"name":"Strawberry"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = body_json(resp).await;
    let id = created["id"].as_u64().unwrap();
    assert!(created["trashed_at"].is_null());

    call(
        &mut app,
        json_request("POST", "/api/projects/", Some(&token), r#"{"name":"Apple"}"#),
    )
    .await;

    // list with filter, projection and ordering
    let resp = call(
        &mut app,
        empty_request("GET", "/api/projects/?name__startswith=S&fields=id,name&ordering=-name", &token),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let projects: Vec<Value> = body_json(resp).await;
    assert_eq!(projects, vec![json!({"id": id, "name": "Strawberry"})]);

    // partial update
    let resp = call(
        &mut app,
        json_request("PATCH", &format!("/api/projects/{id}/"), Some(&token), r#"{"description":"red"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = body_json(resp).await;
    assert_eq!(updated["name"], "Strawberry"); // unchanged
    assert_eq!(updated["description"], "red");

    // soft delete
    let resp = call(&mut app, empty_request("DELETE", &format!("/api/projects/{id}/"), &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let trashed: Value = body_json(resp).await;
    assert!(trashed["trashed_at"].is_string());

    // trashed records are hidden from lists
    let resp = call(&mut app, empty_request("GET", "/api/projects/", &token)).await;
    let projects: Vec<Value> = body_json(resp).await;
    assert_eq!(projects.len(), 1);

    // restore
    let resp = call(&mut app, empty_request("PATCH", &format!("/api/projects/{id}/restore/"), &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let restored: Value = body_json(resp).await;
    assert!(restored["trashed_at"].is_null());

    // delete twice — second one is permanent
    call(&mut app, empty_request("DELETE", &format!("/api/projects/{id}/"), &token)).await;
    let resp = call(&mut app, empty_request("DELETE", &format!("/api/projects/{id}/"), &token)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = call(&mut app, empty_request("PATCH", &format!("/api/projects/{id}/restore/"), &token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
