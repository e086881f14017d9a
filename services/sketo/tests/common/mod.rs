use axum::Router;
use axum::body::Body;
use axum::http::Request;
use sketo::app::{AppState, build_router};
use sketo::repo::Repository;
use sketo_store::Store;
use tempfile::TempDir;

/// Full application over a scratch store. Keep the `TempDir` alive for the
/// duration of the test.
pub fn test_app() -> (TempDir, Repository, Router) {
    let dir = TempDir::new().expect("tempdir");
    let repo = Repository::new(Store::open(dir.path()).expect("open store"));
    let router = build_router(AppState { repo: repo.clone() });
    (dir, repo, router)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
