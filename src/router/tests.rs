use super::{ApiRouter, RouteError};
use crate::dispatcher::{ApiRequest, Endpoint, EndpointOptions};
use crate::schema::SchemaRegistry;
use crate::typed::{callable, Typed};
use http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

fn endpoint(name: &str, registry: &SchemaRegistry) -> Endpoint {
    let c = callable(name.to_string(), vec![], |_| Ok(Typed::Raw(json!({"ok": true}))));
    Endpoint::new(Arc::new(c), EndpointOptions::new(), registry).unwrap()
}

#[test]
fn routes_are_namespaced_by_app() {
    let registry = SchemaRegistry::new();
    let mut router = ApiRouter::new("/api/");
    assert_eq!(router.mount("users", endpoint("list", &registry)).unwrap(), "/api/users/list/");
    assert_eq!(router.mount("posts", endpoint("list", &registry)).unwrap(), "/api/posts/list/");
    assert_eq!(router.len(), 2);
    assert!(router.route("/api/users/list").is_some());
    assert!(router.route("/api/users/list/").is_some());
}

#[test]
fn empty_prefix_starts_at_app_label() {
    let registry = SchemaRegistry::new();
    let mut router = ApiRouter::new("");
    assert_eq!(router.mount("users", endpoint("get", &registry)).unwrap(), "/users/get/");
}

#[test]
fn duplicates_and_bad_segments_are_rejected() {
    let registry = SchemaRegistry::new();
    let mut router = ApiRouter::new("api");
    router.mount("users", endpoint("list", &registry)).unwrap();
    assert_eq!(
        router.mount("users", endpoint("list", &registry)),
        Err(RouteError::Duplicate("/api/users/list/".to_string()))
    );
    assert!(matches!(
        router.mount("a/b", endpoint("x", &registry)),
        Err(RouteError::InvalidSegment(_))
    ));
}

#[test]
fn unknown_path_is_not_found() {
    let registry = SchemaRegistry::new();
    let mut router = ApiRouter::new("api");
    router.mount("users", endpoint("list", &registry)).unwrap();

    let hit = Arc::new(ApiRequest::new(Method::GET, "/api/users/list/"));
    assert_eq!(router.respond(&hit), json!({"ok": true}));

    let miss = Arc::new(ApiRequest::new(Method::GET, "/api/users/gone/"));
    let body: Value = router.respond(&miss);
    assert_eq!(body, json!({"code": 17, "detail": "Not Found Error"}));
}
