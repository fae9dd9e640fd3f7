//! End-to-end dispatch through [`Router`]: matching, chains, groups and
//! static files.

use std::fs;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use switchyard_core::{handler, Context, Handler, Request, Response};
use switchyard_server::{RouteError, RouteLookup, Router, RouterConfig};
use tempfile::TempDir;

fn request(method: Method, path: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap()
}

async fn body(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn reply(text: &'static str) -> Handler {
    handler(move |ctx: &mut Context| ctx.text(StatusCode::OK, text))
}

fn echo_param(name: &'static str) -> Handler {
    handler(move |ctx: &mut Context| {
        let value = ctx.param(name).unwrap_or("<none>").to_string();
        ctx.text(StatusCode::OK, value);
    })
}

/// Appends `name` to the `trail` entry, then continues.
fn mark(name: &'static str) -> Handler {
    handler(move |ctx: &mut Context| {
        if !ctx.contains_key("trail") {
            ctx.set("trail", Vec::<&'static str>::new());
        }
        if let Some(trail) = ctx.get_mut::<Vec<&'static str>>("trail") {
            trail.push(name);
        }
        ctx.next();
    })
}

fn write_trail() -> Handler {
    handler(|ctx: &mut Context| {
        let trail = ctx
            .get::<Vec<&'static str>>("trail")
            .map(|t| t.join(","))
            .unwrap_or_default();
        ctx.text(StatusCode::OK, trail);
    })
}

#[tokio::test]
async fn static_route_has_no_params() {
    for config in [RouterConfig { trie_enabled: true }, RouterConfig { trie_enabled: false }] {
        let router = Router::with_config(config);
        router.get("/users", [reply("list")]).unwrap();

        match router.find(&Method::GET, "/users") {
            RouteLookup::Found { params, pattern, .. } => {
                assert!(params.is_empty());
                assert_eq!(&*pattern, "/users");
            }
            other => panic!("expected match, got {other:?}"),
        }

        let response = router.dispatch(request(Method::GET, "/users"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "list");
    }
}

#[tokio::test]
async fn param_route_and_wrong_method() {
    let router = Router::new();
    router.get("/users/:id", [echo_param("id")]).unwrap();

    let response = router.dispatch(request(Method::GET, "/users/42"));
    assert_eq!(body(response).await, "42");

    let response = router.dispatch(request(Method::POST, "/users/42"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[http::header::ALLOW], "GET");
}

#[tokio::test]
async fn static_segment_beats_param() {
    let router = Router::new();
    router.get("/users/:id", [echo_param("id")]).unwrap();
    router.get("/users/me", [reply("me")]).unwrap();

    let response = router.dispatch(request(Method::GET, "/users/me"));
    assert_eq!(body(response).await, "me");

    let response = router.dispatch(request(Method::GET, "/users/7"));
    assert_eq!(body(response).await, "7");
}

#[tokio::test]
async fn wildcard_captures_remainder() {
    let router = Router::new();
    router.get("/files/*path", [echo_param("path")]).unwrap();

    let response = router.dispatch(request(Method::GET, "/files/a/b/c.txt"));
    assert_eq!(body(response).await, "a/b/c.txt");
}

#[tokio::test]
async fn regex_constraint_rejects_non_matching_segment() {
    let router = Router::new();
    router.get(r"/posts/:id(\d+)", [echo_param("id")]).unwrap();

    let response = router.dispatch(request(Method::GET, "/posts/123"));
    assert_eq!(body(response).await, "123");

    let response = router.dispatch(request(Method::GET, "/posts/abc"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn middleware_runs_in_registration_order() {
    let router = Router::new();
    router.use_middleware([mark("a"), mark("b")]);
    router.get("/", [mark("h"), write_trail()]).unwrap();

    let response = router.dispatch(request(Method::GET, "/"));
    assert_eq!(body(response).await, "a,b,h");
}

#[tokio::test]
async fn abort_skips_remaining_handlers() {
    let router = Router::new();
    router.use_middleware([handler(|ctx: &mut Context| {
        ctx.abort_with_status(StatusCode::UNAUTHORIZED);
    })]);
    router.get("/secret", [reply("leaked")]).unwrap();

    let response = router.dispatch(request(Method::GET, "/secret"));
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(response).await, "");
}

#[tokio::test]
async fn next_after_abort_is_noop() {
    let router = Router::new();
    router
        .get(
            "/",
            [
                handler(|ctx: &mut Context| {
                    ctx.text(StatusCode::OK, "first");
                    ctx.abort();
                    ctx.next();
                    ctx.next();
                }),
                reply("second"),
            ],
        )
        .unwrap();

    let response = router.dispatch(request(Method::GET, "/"));
    assert_eq!(body(response).await, "first");
}

#[tokio::test]
async fn group_inherits_parent_middleware() {
    let router = Router::new();
    router.use_middleware([mark("root")]);
    let api = router.group("/api");
    api.use_middleware([mark("api")]);
    api.get("/ping", [write_trail()]).unwrap();

    // Added after the group was created, so the group does not see it
    router.use_middleware([mark("late")]);

    let response = router.dispatch(request(Method::GET, "/api/ping"));
    assert_eq!(body(response).await, "root,api");

    let paths: Vec<_> = router.routes().into_iter().map(|r| r.pattern).collect();
    assert_eq!(paths, ["/api/ping"]);
}

#[tokio::test]
async fn allowed_methods_union_across_groups() {
    let router = Router::new();
    router.get("/items", [reply("root")]).unwrap();
    let group = router.group("/");
    group.put("/items", [reply("group")]).unwrap();

    let response = router.dispatch(request(Method::DELETE, "/items"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[http::header::ALLOW], "GET, PUT");

    let response = router.dispatch(request(Method::PUT, "/items"));
    assert_eq!(body(response).await, "group");
}

#[tokio::test]
async fn custom_fallbacks_run_after_root_middleware() {
    let router = Router::new();
    router.use_middleware([mark("root")]);
    router.get("/only-get", [reply("ok")]).unwrap();
    router.no_route([handler(|ctx: &mut Context| {
        let trail = ctx
            .get::<Vec<&'static str>>("trail")
            .map(|t| t.join(","))
            .unwrap_or_default();
        ctx.text(StatusCode::NOT_FOUND, format!("missing after {trail}"));
    })]);
    router.no_method([handler(|ctx: &mut Context| {
        let allow = ctx
            .response_mut()
            .headers_mut()
            .get(http::header::ALLOW)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        ctx.text(StatusCode::METHOD_NOT_ALLOWED, format!("try {allow}"));
    })]);

    let response = router.dispatch(request(Method::GET, "/nowhere"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await, "missing after root");

    let response = router.dispatch(request(Method::POST, "/only-get"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body(response).await, "try GET");
}

#[tokio::test]
async fn removed_group_stops_matching() {
    let router = Router::new();
    router.get("/health", [reply("ok")]).unwrap();
    let baseline = router.route_count();

    for _ in 0..5 {
        let temp = router.group("/temp");
        temp.get("/a", [reply("a")]).unwrap();
        temp.get("/b/:id", [echo_param("id")]).unwrap();
        assert_eq!(router.route_count(), baseline + 2);

        let response = router.dispatch(request(Method::GET, "/temp/b/9"));
        assert_eq!(body(response).await, "9");

        assert!(router.remove_group("/temp"));
        assert_eq!(router.route_count(), baseline);
        let response = router.dispatch(request(Method::GET, "/temp/a"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    assert!(!router.remove_group("/temp"));
}

#[tokio::test]
async fn nested_group_removed_through_ancestor() {
    let router = Router::new();
    let api = router.group("/api");
    api.get("/status", [reply("up")]).unwrap();
    let v1 = api.group("/v1");
    v1.get("/users", [reply("v1 users")]).unwrap();
    let v2 = api.group("/v2");
    v2.get("/users", [reply("v2 users")]).unwrap();
    assert_eq!(router.route_count(), 3);

    assert!(router.remove_group("/api/v1"));
    assert_eq!(router.route_count(), 2);
    let response = router.dispatch(request(Method::GET, "/api/v1/users"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = router.dispatch(request(Method::GET, "/api/v2/users"));
    assert_eq!(body(response).await, "v2 users");

    // relative to the router it is called on
    assert!(api.remove_group("/v2"));
    assert!(!router.remove_group("/api/v1"));
    assert!(!router.remove_group("/ap"));
    assert_eq!(router.route_count(), 1);
}

#[test]
fn registration_errors() {
    let router = Router::new();
    assert!(matches!(
        router.get("/empty", Vec::<Handler>::new()),
        Err(RouteError::EmptyChain { .. })
    ));
    assert!(matches!(
        router.get("/files/*path/extra", [reply("x")]),
        Err(RouteError::Pattern { .. })
    ));
}

fn site() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
    let router = Router::new();
    router.static_files("/assets", dir.path()).unwrap();
    (dir, router)
}

#[tokio::test]
async fn static_files_are_served() {
    let (_dir, router) = site();

    let response = router.dispatch(request(Method::GET, "/assets/app.js"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[http::header::CONTENT_TYPE],
        "text/javascript; charset=utf-8"
    );
    assert_eq!(body(response).await, "console.log(1)");

    let response = router.dispatch(request(Method::HEAD, "/assets/app.js"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[http::header::CONTENT_LENGTH], "14");
    assert_eq!(body(response).await, "");

    let response = router.dispatch(request(Method::GET, "/assets/missing.css"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_traversal_is_forbidden() {
    let (_dir, router) = site();

    for path in [
        "/assets/%2e%2e/secret",
        "/assets/%2E%2E%2F%2E%2E%2Fetc%2Fpasswd",
        "/assets/..%5C..%5Cwindows",
        "/assets/%2Fetc%2Fpasswd",
    ] {
        let response = router.dispatch(request(Method::GET, path));
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
        assert!(body(response).await.contains("FORBIDDEN"), "{path}");
    }
}

#[test]
fn static_root_must_exist() {
    let router = Router::new();
    assert!(matches!(
        router.static_files("/assets", "/no/such/directory"),
        Err(RouteError::StaticRoot { .. })
    ));
}
